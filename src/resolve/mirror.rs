//! Mirror-proxy scraping: re-fetch a social post from a scrape-friendly
//! mirror host through the relay and read its meta description.

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use super::client::WebClient;
use super::html::extract_page_meta;
use super::types::{ContentOrigin, ContentResolver};
use crate::environment::get_env_var_as_vec;
use crate::normalize::{NormalizedUrl, Platform};

/// Known mirror hosts per platform, in the order they are tried.
pub fn default_mirror_hosts(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::X => &["fxtwitter.com", "vxtwitter.com", "fixupx.com"],
        Platform::Instagram => &["ddinstagram.com", "kkinstagram.com"],
        Platform::TikTok => &["tnktok.com", "vxtiktok.com"],
        Platform::Threads => &["fixthreads.net", "vxthreads.net"],
        Platform::Facebook => &["facebed.com"],
        Platform::LinkedIn => &["linkedin.com"],
        Platform::Reddit | Platform::Bluesky => &[],
    }
}

/// Mirror hosts for `platform`, honouring a `MIRROR_HOSTS_<PLATFORM>`
/// override (semicolon-separated).
pub fn mirror_hosts(platform: Platform) -> Vec<String> {
    let overridden: Vec<String> = get_env_var_as_vec(&format!("MIRROR_HOSTS_{}", platform.env_key()), ';')
        .into_iter()
        .filter(|h| !h.is_empty())
        .collect();
    if overridden.is_empty() {
        default_mirror_hosts(platform)
            .iter()
            .map(|h| h.to_string())
            .collect()
    } else {
        overridden
    }
}

/// One `(platform, mirror host)` strategy.
pub struct MirrorResolver {
    web: WebClient,
    platform: Platform,
    mirror_host: String,
}

impl MirrorResolver {
    pub fn new(web: WebClient, platform: Platform, mirror_host: impl Into<String>) -> Self {
        Self {
            web,
            platform,
            mirror_host: mirror_host.into(),
        }
    }
}

/// Rewrites the target URL onto `mirror_host`, keeping path and query.
pub fn mirror_url(target: &Url, mirror_host: &str) -> Option<String> {
    let mut mirrored = target.clone();
    mirrored.set_host(Some(mirror_host)).ok()?;
    mirrored.set_scheme("https").ok()?;
    mirrored.set_port(None).ok()?;
    Some(mirrored.to_string())
}

#[async_trait]
impl ContentResolver for MirrorResolver {
    fn name(&self) -> String {
        format!("mirror:{}", self.mirror_host)
    }

    fn origin(&self, _target: &NormalizedUrl) -> ContentOrigin {
        ContentOrigin::ProxyScrape(self.mirror_host.clone())
    }

    fn handles(&self, target: &NormalizedUrl) -> bool {
        target.platform == Some(self.platform)
    }

    async fn resolve(&self, target: &NormalizedUrl) -> Result<Option<String>> {
        let Some(mirrored) = mirror_url(target.url(), &self.mirror_host) else {
            return Ok(None);
        };
        let Some(html) = self.web.get_html(&self.web.relayed(&mirrored)).await? else {
            return Ok(None);
        };
        Ok(extract_page_meta(&html).excerpt())
    }
}
