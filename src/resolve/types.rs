//! Type definitions for content resolution.

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

use crate::llm::ImageAttachment;
use crate::normalize::NormalizedUrl;

/// Excerpts longer than this are cut before they reach a prompt.
pub const MAX_EXCERPT_CHARS: usize = 4000;

/// Where a resolved excerpt came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentOrigin {
    RedditApi,
    BlueskyApi,
    ProxyScrape(String),
    ArticleExtract(String),
    None,
}

impl fmt::Display for ContentOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentOrigin::RedditApi => f.write_str("reddit-api"),
            ContentOrigin::BlueskyApi => f.write_str("bluesky-api"),
            ContentOrigin::ProxyScrape(host) => write!(f, "proxy-scrape:{}", host),
            ContentOrigin::ArticleExtract(host) => write!(f, "article-extract:{}", host),
            ContentOrigin::None => f.write_str("none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    pub excerpt: Option<String>,
    pub origin: ContentOrigin,
}

/// Context a caller supplies when automated resolution is not possible.
#[derive(Debug, Clone, Default)]
pub struct ManualContext {
    pub text: Option<String>,
    pub image: Option<ImageAttachment>,
}

impl ManualContext {
    pub fn new(text: Option<String>, image: Option<ImageAttachment>) -> Self {
        Self {
            text: text.filter(|t| !t.trim().is_empty()),
            image: image.filter(|i| !i.data.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, |t| t.trim().is_empty())
            && self.image.as_ref().map_or(true, |i| i.data.is_empty())
    }
}

/// The single source of context a reaction prompt is built from.
#[derive(Debug, Clone)]
pub enum GenerationContext {
    NoContext,
    ScrapedText(ResolvedContent),
    UserSupplied(ManualContext),
    GroundedSearch,
}

impl GenerationContext {
    pub fn mode(&self) -> &'static str {
        match self {
            GenerationContext::NoContext => "no-context",
            GenerationContext::ScrapedText(_) => "direct-content",
            GenerationContext::UserSupplied(_) => "user-supplied",
            GenerationContext::GroundedSearch => "grounded-search",
        }
    }
}

/// A strategy that tries to pull a short text excerpt for a URL.
///
/// Absence of content is `Ok(None)`. `Err` is reserved for transport
/// failures; callers still treat it as no content.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    fn name(&self) -> String;

    fn origin(&self, target: &NormalizedUrl) -> ContentOrigin;

    fn handles(&self, target: &NormalizedUrl) -> bool;

    async fn resolve(&self, target: &NormalizedUrl) -> Result<Option<String>>;
}
