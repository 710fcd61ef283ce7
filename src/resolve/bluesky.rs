//! Bluesky posts through the public AppView XRPC endpoints.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::client::WebClient;
use super::types::{ContentOrigin, ContentResolver};
use crate::normalize::{NormalizedUrl, Platform};
use crate::TARGET_WEB_REQUEST;

const BLUESKY_APPVIEW: &str = "https://public.api.bsky.app";

pub struct BlueskyResolver {
    web: WebClient,
    base_url: String,
}

/// The `(actor, record key)` pair a `bsky.app/profile/<actor>/post/<rkey>` URL names.
#[derive(Debug, PartialEq, Eq)]
pub struct PostRef<'a> {
    pub actor: &'a str,
    pub rkey: &'a str,
}

pub fn post_ref(target: &NormalizedUrl) -> Option<PostRef<'_>> {
    match target.path_segments().as_slice() {
        ["profile", actor, "post", rkey, ..] => Some(PostRef {
            actor: *actor,
            rkey: *rkey,
        }),
        _ => None,
    }
}

/// Extracts author and text from a `getPostThread` response.
pub fn parse_thread(thread: &Value) -> Option<String> {
    let post = thread.pointer("/thread/post")?;
    let text = post
        .pointer("/record/text")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();

    let external_title = post
        .pointer("/embed/external/title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let external_description = post
        .pointer("/embed/external/description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty());

    if text.is_empty() && external_title.is_none() {
        return None;
    }

    let handle = post.pointer("/author/handle").and_then(Value::as_str);
    let display_name = post
        .pointer("/author/displayName")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty());

    let mut excerpt = match (display_name, handle) {
        (Some(name), Some(handle)) => format!("Post by {} (@{}):", name, handle),
        (None, Some(handle)) => format!("Post by @{}:", handle),
        (Some(name), None) => format!("Post by {}:", name),
        (None, None) => "Post:".to_string(),
    };
    if !text.is_empty() {
        excerpt.push('\n');
        excerpt.push_str(text);
    }
    if let Some(title) = external_title {
        excerpt.push_str(&format!("\n\nLinked article: {}", title));
        if let Some(description) = external_description {
            excerpt.push_str(&format!("\n{}", description));
        }
    }
    Some(excerpt)
}

impl BlueskyResolver {
    pub fn new(web: WebClient) -> Self {
        Self {
            web,
            base_url: BLUESKY_APPVIEW.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn resolve_did(&self, actor: &str) -> Result<Option<String>> {
        if actor.starts_with("did:") {
            return Ok(Some(actor.to_string()));
        }
        let url = format!(
            "{}/xrpc/com.atproto.identity.resolveHandle?handle={}",
            self.base_url, actor
        );
        let response = self.web.get_json(&url).await?;
        Ok(response
            .as_ref()
            .and_then(|r| r.get("did"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

#[async_trait]
impl ContentResolver for BlueskyResolver {
    fn name(&self) -> String {
        "bluesky-api".to_string()
    }

    fn origin(&self, _target: &NormalizedUrl) -> ContentOrigin {
        ContentOrigin::BlueskyApi
    }

    fn handles(&self, target: &NormalizedUrl) -> bool {
        target.platform == Some(Platform::Bluesky)
    }

    async fn resolve(&self, target: &NormalizedUrl) -> Result<Option<String>> {
        let Some(post) = post_ref(target) else {
            debug!(target: TARGET_WEB_REQUEST, "Not a Bluesky post URL: {}", target.canonical);
            return Ok(None);
        };
        let Some(did) = self.resolve_did(post.actor).await? else {
            debug!(target: TARGET_WEB_REQUEST, "Could not resolve Bluesky handle {}", post.actor);
            return Ok(None);
        };

        let at_uri = format!("at://{}/app.bsky.feed.post/{}", did, post.rkey);
        let encoded: String = url::form_urlencoded::byte_serialize(at_uri.as_bytes()).collect();
        let url = format!(
            "{}/xrpc/app.bsky.feed.getPostThread?uri={}&depth=0&parentHeight=0",
            self.base_url, encoded
        );
        let thread = self.web.get_json(&url).await?;
        Ok(thread.as_ref().and_then(parse_thread))
    }
}
