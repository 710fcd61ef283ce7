//! Error types surfaced by the public entry points.
//!
//! Resolver and transport failures never appear here: they are logged and
//! treated as "no content" where they happen. A request that needs manual
//! context is not an error either, see `ReactionResult::requires_manual_context`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UrlError {
    #[error("invalid URL '{url}': {source}")]
    Invalid {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported URL scheme '{0}', expected http or https")]
    UnsupportedScheme(String),
    #[error("URL has no host: {0}")]
    MissingHost(String),
}

/// Failure of the text-generation step. Fatal for the request.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    InvalidUrl(#[from] UrlError),
    #[error("Failed to generate post content from the AI model.")]
    Failed(#[source] anyhow::Error),
    #[error("Failed to generate post content from the AI model: the response was empty, the content may be blocked.")]
    EmptyResponse,
    #[error("Generation timed out after {0} seconds.")]
    TimedOut(u64),
    #[error("Request was cancelled.")]
    Cancelled,
}

/// Failure of the image step. Callers recover from this with a placeholder.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Failed to generate an image from the AI model.")]
    Failed(#[source] anyhow::Error),
    #[error("The image model did not return any image data.")]
    NoImageData,
    #[error("Image generation timed out after {0} seconds.")]
    TimedOut(u64),
    #[error("Image generation was cancelled.")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    InvalidUrl(#[from] UrlError),
    #[error("Failed to fetch feed {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to parse feed {url}: {reason}")]
    Parse { url: String, reason: String },
    #[error("Feed {0} has no entries with a link")]
    NoEntries(String),
    #[error("Feed fetch was cancelled.")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Unknown viewpoint '{0}'")]
    UnknownViewpoint(String),
    #[error("Unknown news source '{0}'")]
    UnknownSource(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is required for the selected provider")]
    Missing(&'static str),
    #[error("Environment variable {name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
