//! Feed parsing for RSS, Atom, and JSON Feed documents.

use feed_rs::parser;
use std::io::Cursor;
use tracing::{debug, warn};
use url::Url;

use super::types::{FeedEntry, JsonFeed};
use super::util::cleanup_xml;
use crate::TARGET_WEB_REQUEST;

fn is_json(body: &str, content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.contains("json"))
        || body.trim_start_matches('\u{FEFF}').trim_start().starts_with('{')
}

fn entries_from_json(body: &str) -> Result<Vec<FeedEntry>, String> {
    let feed: JsonFeed = serde_json::from_str(body).map_err(|e| format!("invalid JSON feed: {}", e))?;
    Ok(feed
        .items
        .into_iter()
        .map(|item| FeedEntry {
            title: item.title,
            url: item.url.or(item.id),
        })
        .collect())
}

fn entries_from_xml(body: &str) -> Result<Vec<FeedEntry>, parser::ParseFeedError> {
    let feed = parser::parse(Cursor::new(body.as_bytes()))?;
    Ok(feed
        .entries
        .into_iter()
        .map(|entry| FeedEntry {
            title: entry.title.map(|t| t.content),
            url: entry
                .links
                .first()
                .map(|link| link.href.clone())
                .or_else(|| Some(entry.id).filter(|id| id.starts_with("http"))),
        })
        .collect())
}

/// Parses a feed body into entries, retrying malformed XML once after
/// cleanup.
pub fn parse_entries(
    body: &str,
    content_type: Option<&str>,
    feed_url: &str,
) -> Result<Vec<FeedEntry>, String> {
    if is_json(body, content_type) {
        debug!(target: TARGET_WEB_REQUEST, "Processing as JSON feed: {}", feed_url);
        return entries_from_json(body);
    }

    debug!(target: TARGET_WEB_REQUEST, "Processing as XML feed: {}", feed_url);
    match entries_from_xml(body) {
        Ok(entries) => Ok(entries),
        Err(first_err) => {
            let cleaned = cleanup_xml(body);
            if !(cleaned.contains("<rss") || cleaned.contains("<feed") || cleaned.contains("<rdf")) {
                let preview: String = body.chars().take(100).collect();
                return Err(format!(
                    "document is not RSS, Atom, or JSON Feed. Content preview: {}",
                    preview
                ));
            }
            match entries_from_xml(&cleaned) {
                Ok(entries) => {
                    warn!(target: TARGET_WEB_REQUEST, "Feed {} parsed only after XML cleanup", feed_url);
                    Ok(entries)
                }
                Err(second_err) => Err(format!(
                    "failed to parse feed even after cleanup. First error: {}. Second error: {}",
                    first_err, second_err
                )),
            }
        }
    }
}

/// The link of the first entry that has one, made absolute against the
/// feed URL.
pub fn top_story(entries: &[FeedEntry], feed_url: &str) -> Option<String> {
    let base = Url::parse(feed_url).ok();
    entries.iter().find_map(|entry| {
        let link = entry.url.as_deref().map(str::trim).filter(|l| !l.is_empty())?;
        let absolute = match Url::parse(link) {
            Ok(url) => url,
            Err(_) => base.as_ref()?.join(link).ok()?,
        };
        matches!(absolute.scheme(), "http" | "https").then(|| absolute.to_string())
    })
}
