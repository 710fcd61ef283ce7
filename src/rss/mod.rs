//! Feed fetching for the top-story helper.
//!
//! Fetches an RSS, Atom, or JSON feed and returns the link of its first
//! entry.

mod client;
mod parser;
mod types;
mod util;

pub use self::client::{create_http_client, fetch_with_fallback};
pub use self::parser::{parse_entries, top_story};
pub use self::types::*;
pub use self::util::{cleanup_xml, decompress_body, try_decompressions};

use anyhow::Context;
use reqwest::header;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::FeedError;
use crate::normalize::normalize_url;
use crate::resolve::client::{charset_from_content_type, decode_body};
use crate::util::{bounded_call, CallError};
use crate::TARGET_WEB_REQUEST;

struct FeedBody {
    text: String,
    content_type: Option<String>,
}

async fn fetch_feed(url: &str, limit: Duration) -> anyhow::Result<FeedBody> {
    let (response, browser_emulation_used) = fetch_with_fallback(url, limit).await?;
    if browser_emulation_used {
        info!(target: TARGET_WEB_REQUEST, "Browser emulation was required for {}", url);
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(|s| s.to_lowercase());
    let content_encoding = response
        .headers()
        .get(header::CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_lowercase());

    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("failed to read feed body from {}", url))?;
    let decompressed = decompress_body(&bytes, content_encoding.as_deref(), url);
    let charset = content_type.as_deref().and_then(charset_from_content_type);

    Ok(FeedBody {
        text: decode_body(&decompressed, charset.as_deref()),
        content_type,
    })
}

/// Returns the URL of the most recent story in the feed at `feed_url`.
///
/// The fetch, including its browser-emulation retry, is bounded by
/// `limit` per attempt and abandoned when `cancel` fires.
pub async fn resolve_top_story_url(
    feed_url: &str,
    limit: Duration,
    cancel: &CancellationToken,
) -> Result<String, FeedError> {
    let target = normalize_url(feed_url)?;
    let url = target.canonical.as_str();

    let body = bounded_call(cancel, limit * 2, fetch_feed(url, limit))
        .await
        .map_err(|e| match e {
            CallError::Cancelled => FeedError::Cancelled,
            CallError::TimedOut(limit) => FeedError::Fetch {
                url: url.to_string(),
                source: anyhow::anyhow!("timed out after {} seconds", limit.as_secs()),
            },
            CallError::Failed(source) => FeedError::Fetch {
                url: url.to_string(),
                source,
            },
        })?;

    let entries = parse_entries(&body.text, body.content_type.as_deref(), url).map_err(|reason| {
        FeedError::Parse {
            url: url.to_string(),
            reason,
        }
    })?;
    debug!(target: TARGET_WEB_REQUEST, "Feed {} has {} entries", url, entries.len());

    top_story(&entries, url).ok_or_else(|| FeedError::NoEntries(url.to_string()))
}
