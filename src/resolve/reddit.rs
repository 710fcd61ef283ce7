//! Reddit posts through the public `.json` listing endpoint.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::client::WebClient;
use super::types::{ContentOrigin, ContentResolver};
use crate::normalize::{NormalizedUrl, Platform};
use crate::TARGET_WEB_REQUEST;

const REDDIT_BASE: &str = "https://www.reddit.com";

pub struct RedditResolver {
    web: WebClient,
    base_url: String,
}

impl RedditResolver {
    pub fn new(web: WebClient) -> Self {
        Self {
            web,
            base_url: REDDIT_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

/// Maps a post URL to its JSON listing URL. Only links that identify a post
/// (a `comments/<id>` path or a `redd.it/<id>` short link) are resolvable.
pub fn listing_url(base_url: &str, target: &NormalizedUrl) -> Option<String> {
    let segments = target.path_segments();
    if target.hostname.ends_with("redd.it") {
        let id = segments.first()?;
        return Some(format!("{}/comments/{}.json", base_url, id));
    }
    let comments = segments.iter().position(|s| *s == "comments")?;
    segments.get(comments + 1)?;
    Some(format!("{}/{}.json", base_url, segments.join("/")))
}

/// Extracts title and body from a post listing response.
pub fn parse_listing(listing: &Value) -> Option<String> {
    let post = listing
        .get(0)
        .unwrap_or(listing)
        .pointer("/data/children/0/data")?;
    let title = post.get("title")?.as_str()?.trim();
    if title.is_empty() {
        return None;
    }

    let mut excerpt = title.to_string();
    let subreddit = post.get("subreddit_name_prefixed").and_then(Value::as_str);
    if let Some(subreddit) = subreddit {
        excerpt = format!("[{}] {}", subreddit, excerpt);
    }

    let body = post
        .get("selftext")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if !body.is_empty() {
        excerpt.push_str("\n\n");
        excerpt.push_str(body);
    }

    let is_self = post.get("is_self").and_then(Value::as_bool).unwrap_or(true);
    if !is_self {
        if let Some(link) = post.get("url_overridden_by_dest").or_else(|| post.get("url")).and_then(Value::as_str) {
            excerpt.push_str(&format!("\n\nLinked: {}", link));
        }
    }

    Some(excerpt)
}

#[async_trait]
impl ContentResolver for RedditResolver {
    fn name(&self) -> String {
        "reddit-api".to_string()
    }

    fn origin(&self, _target: &NormalizedUrl) -> ContentOrigin {
        ContentOrigin::RedditApi
    }

    fn handles(&self, target: &NormalizedUrl) -> bool {
        target.platform == Some(Platform::Reddit)
    }

    async fn resolve(&self, target: &NormalizedUrl) -> Result<Option<String>> {
        let Some(url) = listing_url(&self.base_url, target) else {
            debug!(target: TARGET_WEB_REQUEST, "Not a Reddit post URL: {}", target.canonical);
            return Ok(None);
        };
        let listing = self.web.get_json(&url).await?;
        Ok(listing.as_ref().and_then(parse_listing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_url;
    use crate::testing::{direct_web_client, route, StubServer};
    use serde_json::json;

    #[test]
    fn test_listing_url() {
        let target = normalize_url("https://old.reddit.com/r/news/comments/1abcde/some_title/?utm_source=share").unwrap();
        assert_eq!(
            listing_url(REDDIT_BASE, &target).as_deref(),
            Some("https://www.reddit.com/r/news/comments/1abcde/some_title.json")
        );

        let short = normalize_url("https://redd.it/1abcde").unwrap();
        assert_eq!(
            listing_url(REDDIT_BASE, &short).as_deref(),
            Some("https://www.reddit.com/comments/1abcde.json")
        );

        let subreddit = normalize_url("https://www.reddit.com/r/news/").unwrap();
        assert_eq!(listing_url(REDDIT_BASE, &subreddit), None);
    }

    #[test]
    fn test_parse_self_post() {
        let listing = json!([
            {"data": {"children": [{"data": {
                "title": "City council approves new budget",
                "selftext": "Details inside.",
                "subreddit_name_prefixed": "r/news",
                "is_self": true
            }}]}},
            {"data": {"children": []}}
        ]);
        assert_eq!(
            parse_listing(&listing).as_deref(),
            Some("[r/news] City council approves new budget\n\nDetails inside.")
        );
    }

    #[test]
    fn test_parse_link_post() {
        let listing = json!([{"data": {"children": [{"data": {
            "title": "Headline",
            "selftext": "",
            "is_self": false,
            "url_overridden_by_dest": "https://example.com/story"
        }}]}}]);
        assert_eq!(
            parse_listing(&listing).as_deref(),
            Some("Headline\n\nLinked: https://example.com/story")
        );
    }

    #[test]
    fn test_parse_missing_fields() {
        assert_eq!(parse_listing(&json!([])), None);
        assert_eq!(parse_listing(&json!({"error": 404})), None);
        assert_eq!(
            parse_listing(&json!([{"data": {"children": [{"data": {"title": "  "}}]}}])),
            None
        );
    }

    #[tokio::test]
    async fn test_resolve_against_listing_endpoint() {
        let listing = json!([{"data": {"children": [{"data": {
            "title": "Budget passes",
            "selftext": "Vote was 7-2.",
            "is_self": true
        }}]}}]);
        let server = StubServer::start(vec![
            route("/r/news/comments/abc/budget.json", 200, listing.to_string()),
            route("/r/news/comments/gone/", 404, r#"{"error": 404}"#),
            route("/r/news/comments/blocked/", 200, "<html>Are you a robot?</html>"),
        ])
        .await;
        let resolver = RedditResolver::new(direct_web_client()).with_base_url(server.base_url());

        let found = normalize_url("https://www.reddit.com/r/news/comments/abc/budget/").unwrap();
        assert_eq!(
            resolver.resolve(&found).await.unwrap().as_deref(),
            Some("Budget passes\n\nVote was 7-2.")
        );

        let gone = normalize_url("https://www.reddit.com/r/news/comments/gone/x").unwrap();
        assert_eq!(resolver.resolve(&gone).await.unwrap(), None);

        let blocked = normalize_url("https://www.reddit.com/r/news/comments/blocked/x").unwrap();
        assert_eq!(resolver.resolve(&blocked).await.unwrap(), None);

        assert_eq!(
            server.targets(),
            vec![
                "/r/news/comments/abc/budget.json",
                "/r/news/comments/gone/x.json",
                "/r/news/comments/blocked/x.json",
            ]
        );
    }
}
