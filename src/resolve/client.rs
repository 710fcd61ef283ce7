//! HTTP access for resolvers: direct and CORS-relayed reads.

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};
use reqwest::{header, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::TARGET_WEB_REQUEST;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Shared HTTP client plus the optional relay that page reads go through.
#[derive(Clone, Debug)]
pub struct WebClient {
    http: reqwest::Client,
    relay_prefix: Option<String>,
}

impl WebClient {
    pub fn new(relay_prefix: Option<String>, request_timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .timeout(request_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self {
            http,
            relay_prefix: relay_prefix.filter(|p| !p.trim().is_empty()),
        })
    }

    /// Wraps `target` in the relay URL, or returns it unchanged when no relay
    /// is configured.
    pub fn relayed(&self, target: &str) -> String {
        match &self.relay_prefix {
            Some(prefix) => {
                let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
                format!("{}{}", prefix, encoded)
            }
            None => target.to_string(),
        }
    }

    /// GET a JSON document. Non-2xx responses and bodies that are not JSON
    /// mean "nothing there" and yield `Ok(None)`.
    pub async fn get_json(&self, url: &str) -> Result<Option<serde_json::Value>> {
        let Some(body) = self.get_text(url, "application/json").await? else {
            return Ok(None);
        };
        match serde_json::from_str(&body) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                debug!(target: TARGET_WEB_REQUEST, "Response from {} is not JSON: {}", url, err);
                Ok(None)
            }
        }
    }

    /// GET a page as text, decoding it with the charset the server declared.
    pub async fn get_html(&self, url: &str) -> Result<Option<String>> {
        self.get_text(url, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .await
    }

    async fn get_text(&self, url: &str, accept: &str) -> Result<Option<String>> {
        debug!(target: TARGET_WEB_REQUEST, "GET {}", url);
        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, accept)
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(target: TARGET_WEB_REQUEST, "Rate limited by {}", url);
            } else {
                debug!(target: TARGET_WEB_REQUEST, "Non-success status {} from {}", status, url);
            }
            return Ok(None);
        }

        let charset = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .and_then(charset_from_content_type);
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("failed to read body from {}", url))?;

        Ok(Some(decode_body(&bytes, charset.as_deref())))
    }
}

/// Pulls the `charset=` parameter out of a Content-Type header value.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|part| {
            let (key, value) = part.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
        })
}

/// Decodes a body with the declared charset, falling back to UTF-8.
pub fn decode_body(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}
