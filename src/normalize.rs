//! URL normalization: tracking-parameter removal, hostname extraction and
//! social-platform classification.

use std::fmt;
use url::Url;

use crate::error::UrlError;

/// Social platforms recognised by hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Reddit,
    Bluesky,
    X,
    Instagram,
    Facebook,
    TikTok,
    Threads,
    LinkedIn,
}

impl Platform {
    pub const ALL: [Platform; 8] = [
        Platform::Reddit,
        Platform::Bluesky,
        Platform::X,
        Platform::Instagram,
        Platform::Facebook,
        Platform::TikTok,
        Platform::Threads,
        Platform::LinkedIn,
    ];

    /// Registrable domains owned by the platform. Subdomains also match.
    fn domains(self) -> &'static [&'static str] {
        match self {
            Platform::Reddit => &["reddit.com", "redd.it"],
            Platform::Bluesky => &["bsky.app", "bsky.social"],
            Platform::X => &["x.com", "twitter.com"],
            Platform::Instagram => &["instagram.com"],
            Platform::Facebook => &["facebook.com", "fb.com", "fb.watch"],
            Platform::TikTok => &["tiktok.com"],
            Platform::Threads => &["threads.net", "threads.com"],
            Platform::LinkedIn => &["linkedin.com", "lnkd.in"],
        }
    }

    pub fn from_host(host: &str) -> Option<Platform> {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        Platform::ALL.into_iter().find(|platform| {
            platform
                .domains()
                .iter()
                .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
        })
    }

    /// Key used for per-platform environment overrides, e.g. `MIRROR_HOSTS_X`.
    pub fn env_key(self) -> &'static str {
        match self {
            Platform::Reddit => "REDDIT",
            Platform::Bluesky => "BLUESKY",
            Platform::X => "X",
            Platform::Instagram => "INSTAGRAM",
            Platform::Facebook => "FACEBOOK",
            Platform::TikTok => "TIKTOK",
            Platform::Threads => "THREADS",
            Platform::LinkedIn => "LINKEDIN",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Reddit => "reddit",
            Platform::Bluesky => "bluesky",
            Platform::X => "x",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::TikTok => "tiktok",
            Platform::Threads => "threads",
            Platform::LinkedIn => "linkedin",
        };
        f.write_str(name)
    }
}

/// A URL after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    /// Canonical form without tracking parameters, fragment or trailing separators.
    pub canonical: String,
    /// Hostname with any leading `www.` removed.
    pub hostname: String,
    pub platform: Option<Platform>,
    parsed: Url,
}

impl NormalizedUrl {
    pub fn is_social_platform(&self) -> bool {
        self.platform.is_some()
    }

    pub fn url(&self) -> &Url {
        &self.parsed
    }

    /// Non-empty path segments of the canonical URL.
    pub fn path_segments(&self) -> Vec<&str> {
        self.parsed
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}

const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "igshid", "igsh", "si", "ref", "ref_src", "ref_url",
    "share_id", "mc_cid", "mc_eid", "_ga", "_gl", "yclid",
];

/// Query parameters that only carry share/tracking meaning on X.
const X_TRACKING_PARAMS: &[&str] = &["s", "t"];

fn is_tracking_param(name: &str, platform: Option<Platform>) -> bool {
    let name = name.to_ascii_lowercase();
    name.starts_with("utm_")
        || TRACKING_PARAMS.contains(&name.as_str())
        || (platform == Some(Platform::X) && X_TRACKING_PARAMS.contains(&name.as_str()))
}

/// Normalizes a raw URL string.
///
/// A missing scheme is tolerated and treated as `https`. Anything that still
/// cannot be parsed as an http(s) URL with a host fails with [`UrlError`].
pub fn normalize_url(raw: &str) -> Result<NormalizedUrl, UrlError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut parsed = Url::parse(&candidate).map_err(|source| UrlError::Invalid {
        url: raw.to_string(),
        source,
    })?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(UrlError::UnsupportedScheme(parsed.scheme().to_string()));
    }

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| UrlError::MissingHost(raw.to_string()))?
        .to_ascii_lowercase();
    let hostname = host.strip_prefix("www.").unwrap_or(&host).to_string();
    let platform = Platform::from_host(&hostname);

    let total = parsed.query_pairs().count();
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(name, _)| !is_tracking_param(name, platform))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    // An untouched query keeps its original encoding.
    if kept.is_empty() {
        parsed.set_query(None);
    } else if kept.len() < total {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }
    parsed.set_fragment(None);

    let canonical = parsed
        .as_str()
        .trim_end_matches(['/', '?', '&', '#'])
        .to_string();
    // Re-parse so the stored Url matches the trimmed canonical form.
    let parsed = Url::parse(&canonical).map_err(|source| UrlError::Invalid {
        url: raw.to_string(),
        source,
    })?;

    Ok(NormalizedUrl {
        canonical,
        hostname,
        platform,
        parsed,
    })
}
