//! Reaction generation: prompt, generate, parse, and fall back until both
//! sections are populated.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::Viewpoint;
use crate::error::GenerationError;
use crate::llm::{GenerationRequest, GenerationResponse, Source, TextGenerator};
use crate::normalize::{normalize_url, NormalizedUrl};
use crate::prompt::{
    reaction_request, short_post_prompt, LONG_HEADER, SECTION_DELIMITER, SHORT_HEADER,
    SHORT_POST_MAX_CHARS,
};
use crate::resolve::{
    settle, ContentResolver, GenerationContext, ManualContext, Orchestrator, Resolution,
    Settlement,
};
use crate::util::{bounded_call, char_len, take_chars, CallError};
use crate::TARGET_LLM_REQUEST;

/// Characters kept from the long text when the short text is truncated.
pub const TRUNCATED_CHARS: usize = SHORT_POST_MAX_CHARS - ELLIPSIS.len();
pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionResult {
    pub long_text: String,
    pub short_text: String,
    pub sources: Vec<Source>,
    /// Automated resolution gave up; the other fields are empty.
    pub requires_manual_context: bool,
}

impl ReactionResult {
    pub fn needs_manual_context() -> Self {
        Self {
            requires_manual_context: true,
            ..Default::default()
        }
    }
}

pub struct ReactionParams<'a> {
    pub generator: &'a dyn TextGenerator,
    pub resolvers: &'a [Box<dyn ContentResolver>],
    /// Bound for each resolver call.
    pub resolve_timeout: Duration,
    /// Bound for each generation call.
    pub generation_timeout: Duration,
    pub cancel: &'a CancellationToken,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Sections {
    pub long: String,
    pub short: String,
}

/// Splits a structured response into its two sections. Returns `None`
/// unless both headers are present with the delimiter between them and
/// the long section is non-empty.
pub fn parse_sections(text: &str) -> Option<Sections> {
    let long_start = text.find(LONG_HEADER)? + LONG_HEADER.len();
    let short_header = long_start + text[long_start..].find(SHORT_HEADER)?;
    let between = &text[long_start..short_header];
    let delimiter = between.rfind(SECTION_DELIMITER)?;

    let long = between[..delimiter].trim();
    if long.is_empty() {
        return None;
    }
    Some(Sections {
        long: long.to_string(),
        short: text[short_header + SHORT_HEADER.len()..].trim().to_string(),
    })
}

/// Last-resort short text: the long text itself when it fits, otherwise
/// its first 277 characters and an ellipsis.
pub fn truncate_short_text(long_text: &str) -> String {
    if char_len(long_text) <= SHORT_POST_MAX_CHARS {
        long_text.to_string()
    } else {
        format!("{}{}", take_chars(long_text, TRUNCATED_CHARS), ELLIPSIS)
    }
}

/// Grounding citations with an empty title are dropped; repeated uris keep
/// their first occurrence.
pub fn dedupe_sources(citations: Vec<Source>) -> Vec<Source> {
    let mut seen = HashSet::new();
    citations
        .into_iter()
        .filter(Source::is_attributable)
        .filter(|s| seen.insert(s.uri.clone()))
        .collect()
}

fn attribute_sources(
    target: &NormalizedUrl,
    context: &GenerationContext,
    citations: Vec<Source>,
) -> Vec<Source> {
    match context {
        GenerationContext::GroundedSearch => dedupe_sources(citations),
        GenerationContext::ScrapedText(_) | GenerationContext::UserSupplied(_) => vec![Source {
            uri: target.canonical.clone(),
            title: target.hostname.clone(),
        }],
        GenerationContext::NoContext => Vec::new(),
    }
}

async fn call_generator(
    request: &GenerationRequest,
    params: &ReactionParams<'_>,
) -> Result<GenerationResponse, GenerationError> {
    bounded_call(
        params.cancel,
        params.generation_timeout,
        params.generator.generate(request),
    )
    .await
    .map_err(|e| match e {
        CallError::TimedOut(limit) => GenerationError::TimedOut(limit.as_secs()),
        CallError::Cancelled => GenerationError::Cancelled,
        CallError::Failed(err) => GenerationError::Failed(err),
    })
}

/// Second tier of the short-text fallback. Only cancellation escapes; any
/// other failure means the caller truncates instead.
async fn summarize(
    long_text: &str,
    params: &ReactionParams<'_>,
) -> Result<Option<String>, GenerationError> {
    let request = GenerationRequest::text(short_post_prompt(long_text));
    match call_generator(&request, params).await {
        Ok(response) => {
            let summary = response.text.trim().trim_matches('"').trim();
            if summary.is_empty() {
                warn!(target: TARGET_LLM_REQUEST, "Summarization returned no text");
                return Ok(None);
            }
            if char_len(summary) > SHORT_POST_MAX_CHARS {
                warn!(target: TARGET_LLM_REQUEST, "Summary is {} characters, truncating", char_len(summary));
                return Ok(Some(truncate_short_text(summary)));
            }
            Ok(Some(summary.to_string()))
        }
        Err(GenerationError::Cancelled) => Err(GenerationError::Cancelled),
        Err(e) => {
            warn!(target: TARGET_LLM_REQUEST, "Summarization failed: {:?}", e);
            Ok(None)
        }
    }
}

/// Turns `url` into a reaction written from `viewpoint`.
///
/// Returns `requires_manual_context` instead of an error when automated
/// resolution of a social post failed; the caller can retry with
/// `manual` context.
pub async fn generate_reaction(
    url: &str,
    viewpoint: &Viewpoint,
    manual: Option<ManualContext>,
    params: &ReactionParams<'_>,
) -> Result<ReactionResult, GenerationError> {
    let target = normalize_url(url)?;

    let orchestrator = Orchestrator::new(
        params.resolvers,
        params.resolve_timeout,
        params.generator.supports_web_search(),
    );
    let context = match orchestrator.resolve(&target, manual, params.cancel).await {
        Resolution::Context(context) => context,
        Resolution::NeedsContext => return Ok(ReactionResult::needs_manual_context()),
        Resolution::Cancelled => return Err(GenerationError::Cancelled),
    };
    info!(target: TARGET_LLM_REQUEST, "Generating {} reaction for {} ({})", viewpoint.id, target.canonical, context.mode());

    let request = reaction_request(viewpoint, &context, &target.canonical);
    let response = call_generator(&request, params).await?;
    if response.text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    if settle(&target, &context, &response.citations) == Settlement::NeedsContext {
        return Ok(ReactionResult::needs_manual_context());
    }

    let (long_text, short_text) = match parse_sections(&response.text) {
        Some(Sections { long, short }) if !short.is_empty() => {
            if char_len(&short) > SHORT_POST_MAX_CHARS {
                warn!(target: TARGET_LLM_REQUEST, "Short post is {} characters, truncating", char_len(&short));
                (long, truncate_short_text(&short))
            } else {
                (long, short)
            }
        }
        parsed => {
            let long = match parsed {
                Some(sections) => sections.long,
                None => {
                    warn!(target: TARGET_LLM_REQUEST, "Response for {} is not in the two-section format, using it as the full post", target.canonical);
                    response.text.trim().to_string()
                }
            };
            let short = match summarize(&long, params).await? {
                Some(summary) => summary,
                None => {
                    warn!(target: TARGET_LLM_REQUEST, "Falling back to truncation for the short post");
                    truncate_short_text(&long)
                }
            };
            (long, short)
        }
    };

    Ok(ReactionResult {
        long_text,
        short_text,
        sources: attribute_sources(&target, &context, response.citations),
        requires_manual_context: false,
    })
}
