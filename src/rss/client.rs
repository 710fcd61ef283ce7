//! HTTP client creation and request handling for feeds.

use anyhow::{anyhow, Result};
use reqwest::{cookie::Jar, header};
use std::sync::Arc;
use tokio::time::error::Elapsed;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

use super::types::{BROWSER_ACCEPT, BROWSER_USER_AGENT, FEED_ACCEPT, STANDARD_USER_AGENT};
use crate::TARGET_WEB_REQUEST;

fn default_headers(browser_emulation: bool) -> header::HeaderMap {
    let mut headers = header::HeaderMap::new();
    if !browser_emulation {
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(STANDARD_USER_AGENT));
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(FEED_ACCEPT));
        return headers;
    }

    let browser = [
        (header::USER_AGENT, BROWSER_USER_AGENT),
        (header::ACCEPT, BROWSER_ACCEPT),
        (header::ACCEPT_LANGUAGE, "en-US,en;q=0.5"),
        (header::ACCEPT_ENCODING, "gzip, deflate, br"),
        (header::DNT, "1"),
        (header::UPGRADE_INSECURE_REQUESTS, "1"),
    ];
    for (name, value) in browser {
        headers.insert(name, header::HeaderValue::from_static(value));
    }
    let fetch_metadata = [
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "none"),
        ("sec-fetch-user", "?1"),
    ];
    for (name, value) in fetch_metadata {
        headers.insert(name, header::HeaderValue::from_static(value));
    }
    headers
}

/// Create a client with either standard or browser emulation settings
pub fn create_http_client(browser_emulation: bool) -> Result<reqwest::Client> {
    if browser_emulation {
        debug!(target: TARGET_WEB_REQUEST, "Creating browser emulation HTTP client");
    } else {
        debug!(target: TARGET_WEB_REQUEST, "Creating standard HTTP client");
    }

    reqwest::Client::builder()
        .cookie_store(true)
        .cookie_provider(Arc::new(Jar::default()))
        .gzip(true)
        .default_headers(default_headers(browser_emulation))
        .redirect(reqwest::redirect::Policy::default())
        .build()
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))
}

fn describe(
    result: &Result<reqwest::Result<reqwest::Response>, Elapsed>,
    limit: Duration,
) -> String {
    match result {
        Ok(Ok(resp)) => format!("HTTP {}", resp.status()),
        Ok(Err(err)) => format!("request failed: {}", err),
        Err(_) => format!("timed out after {} seconds", limit.as_secs()),
    }
}

/// Fetch `url` with a plain feed-reader request, retrying once with
/// browser-like headers when that fails. The flag reports whether the
/// retry was needed.
pub async fn fetch_with_fallback(
    url: &str,
    limit: Duration,
) -> Result<(reqwest::Response, bool)> {
    debug!(target: TARGET_WEB_REQUEST, "Attempting standard request to {}", url);

    let standard_client = create_http_client(false)?;
    let standard_result = timeout(limit, standard_client.get(url).send()).await;

    let standard_failure = match standard_result {
        Ok(Ok(resp)) if resp.status().is_success() => {
            debug!(target: TARGET_WEB_REQUEST, "Standard request to {} succeeded", url);
            return Ok((resp, false));
        }
        other => describe(&other, limit),
    };
    debug!(target: TARGET_WEB_REQUEST, "Standard request to {} failed ({}), trying browser emulation", url, standard_failure);

    let browser_client = create_http_client(true)?;
    let browser_result = timeout(limit, browser_client.get(url).send()).await;

    match browser_result {
        Ok(Ok(resp)) if resp.status().is_success() => {
            info!(target: TARGET_WEB_REQUEST, "Browser emulation request to {} succeeded", url);
            Ok((resp, true))
        }
        other => Err(anyhow!(
            "standard request: {}; browser emulation: {}",
            standard_failure,
            describe(&other, limit)
        )),
    }
}
