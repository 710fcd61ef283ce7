//! Turns a content URL into a viewpoint-styled reaction post.
//!
//! The URL is normalized, content is resolved through platform resolvers
//! (or grounded search, or caller-supplied context), a reaction is
//! generated and parsed into long and short sections, and an illustration
//! is produced with a placeholder fallback.

pub mod catalog;
pub mod environment;
pub mod error;
pub mod image;
pub mod llm;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod reaction;
pub mod resolve;
pub mod rss;
pub mod util;

#[cfg(test)]
mod testing;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_LLM_REQUEST: &str = "llm_request";

pub use catalog::{Catalog, NewsSource, Viewpoint};
pub use environment::Config;
pub use error::{CatalogError, ConfigError, FeedError, GenerationError, ImageError, UrlError};
pub use image::PostImage;
pub use normalize::{normalize_url, NormalizedUrl, Platform};
pub use pipeline::{GeneratedPost, PostOutcome, Reactor};
pub use reaction::ReactionResult;
pub use resolve::{GenerationContext, ManualContext};
