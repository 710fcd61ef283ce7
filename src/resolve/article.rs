//! Readability extraction for ordinary article pages. Only registered when
//! article extraction is enabled in the configuration.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use readability::extractor;

use super::client::WebClient;
use super::types::{ContentOrigin, ContentResolver, MAX_EXCERPT_CHARS};
use crate::normalize::NormalizedUrl;
use crate::util::{collapse_whitespace, take_chars};

/// Articles with less extracted text than this are treated as empty
/// (cookie walls, paywalls, JS-only shells).
const MIN_ARTICLE_CHARS: usize = 200;

pub struct ArticleResolver {
    web: WebClient,
}

impl ArticleResolver {
    pub fn new(web: WebClient) -> Self {
        Self { web }
    }
}

pub fn extract_article(html: &str, target: &NormalizedUrl) -> Result<Option<String>> {
    let product = extractor::extract(&mut html.as_bytes(), target.url())
        .map_err(|e| anyhow!("readability failed for {}: {:?}", target.canonical, e))?;
    let text = collapse_whitespace(&product.text);
    if text.chars().count() < MIN_ARTICLE_CHARS {
        return Ok(None);
    }
    let body = take_chars(&text, MAX_EXCERPT_CHARS);
    let title = product.title.trim();
    Ok(Some(if title.is_empty() {
        body.to_string()
    } else {
        format!("Title: {}\nBody: {}", title, body)
    }))
}

#[async_trait]
impl ContentResolver for ArticleResolver {
    fn name(&self) -> String {
        "article-extract".to_string()
    }

    fn origin(&self, target: &NormalizedUrl) -> ContentOrigin {
        ContentOrigin::ArticleExtract(target.hostname.clone())
    }

    fn handles(&self, target: &NormalizedUrl) -> bool {
        !target.is_social_platform()
    }

    async fn resolve(&self, target: &NormalizedUrl) -> Result<Option<String>> {
        let Some(html) = self.web.get_html(&target.canonical).await? else {
            return Ok(None);
        };
        extract_article(&html, target)
    }
}
