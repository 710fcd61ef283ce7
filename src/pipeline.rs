//! Request-level entry points: reaction, image, and the assembled post.

use serde::Serialize;
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::Viewpoint;
use crate::environment::Config;
use crate::error::{ConfigError, FeedError, GenerationError, ImageError};
use crate::image::{self, ImageParams, PostImage};
use crate::llm::{GeneratedImage, ImageGenerator, LLMParams, Source, TextGenerator};
use crate::reaction::{self, ReactionParams, ReactionResult};
use crate::resolve::{default_resolvers, ContentResolver, ManualContext, WebClient};
use crate::rss;

/// A finished post, ready to display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPost {
    pub image_url: String,
    pub long_text: String,
    pub short_text: String,
    pub sources: Vec<Source>,
    pub image_is_placeholder: bool,
    #[serde(skip)]
    pub image: PostImage,
}

#[derive(Debug, Clone)]
pub enum PostOutcome {
    Post(GeneratedPost),
    /// Automated resolution failed; retry with manual context.
    NeedsManualContext,
}

pub struct Reactor {
    text_generator: Arc<dyn TextGenerator>,
    image_generator: Arc<dyn ImageGenerator>,
    resolvers: Vec<Box<dyn ContentResolver>>,
    resolve_timeout: Duration,
    generation_timeout: Duration,
}

impl Reactor {
    pub fn new(
        text_generator: Arc<dyn TextGenerator>,
        image_generator: Arc<dyn ImageGenerator>,
        resolvers: Vec<Box<dyn ContentResolver>>,
        resolve_timeout: Duration,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            text_generator,
            image_generator,
            resolvers,
            resolve_timeout,
            generation_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let web = WebClient::new(config.cors_relay.clone(), config.http_timeout)?;
        let llm_http = reqwest::Client::builder().build()?;
        let llm_params = Arc::new(LLMParams::from_config(config, llm_http)?);
        let resolvers = default_resolvers(&web, config.article_extraction);
        info!(
            "Configured {} resolvers (relay: {})",
            resolvers.len(),
            config.cors_relay.as_deref().unwrap_or("direct")
        );

        Ok(Self::new(
            llm_params.clone(),
            llm_params,
            resolvers,
            config.http_timeout,
            config.llm_timeout,
        ))
    }

    pub async fn generate_reaction(
        &self,
        url: &str,
        viewpoint: &Viewpoint,
        manual: Option<ManualContext>,
        cancel: &CancellationToken,
    ) -> Result<ReactionResult, GenerationError> {
        let params = ReactionParams {
            generator: self.text_generator.as_ref(),
            resolvers: &self.resolvers,
            resolve_timeout: self.resolve_timeout,
            generation_timeout: self.generation_timeout,
            cancel,
        };
        reaction::generate_reaction(url, viewpoint, manual, &params).await
    }

    pub async fn generate_image(
        &self,
        post_text: &str,
        cancel: &CancellationToken,
    ) -> Result<GeneratedImage, ImageError> {
        let params = ImageParams {
            text_generator: self.text_generator.as_ref(),
            image_generator: self.image_generator.as_ref(),
            timeout: self.generation_timeout,
            cancel,
        };
        image::generate_image(post_text, &params).await
    }

    /// Reaction plus illustration. Image failures degrade to the bundled
    /// placeholder; only cancellation aborts the image step.
    pub async fn generate_post(
        &self,
        url: &str,
        viewpoint: &Viewpoint,
        manual: Option<ManualContext>,
        cancel: &CancellationToken,
    ) -> Result<PostOutcome, GenerationError> {
        let reaction = self.generate_reaction(url, viewpoint, manual, cancel).await?;
        if reaction.requires_manual_context {
            return Ok(PostOutcome::NeedsManualContext);
        }

        let image = match self.generate_image(&reaction.long_text, cancel).await {
            Ok(image) => PostImage::Generated(image),
            Err(ImageError::Cancelled) => return Err(GenerationError::Cancelled),
            Err(e) => {
                warn!("Image generation failed, using placeholder: {:?}", e);
                PostImage::Placeholder
            }
        };

        Ok(PostOutcome::Post(GeneratedPost {
            image_url: image.data_url(),
            long_text: reaction.long_text,
            short_text: reaction.short_text,
            sources: reaction.sources,
            image_is_placeholder: image.is_placeholder(),
            image,
        }))
    }

    pub async fn resolve_top_story_url(
        &self,
        feed_url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, FeedError> {
        rss::resolve_top_story_url(feed_url, self.resolve_timeout, cancel).await
    }
}
