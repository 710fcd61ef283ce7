//! Content resolution state machine.
//!
//! `START -> RESOLVING_DIRECT -> {RESOLVED | GROUNDED_SEARCH | NEEDS_CONTEXT}`
//!
//! Manual context always wins. Otherwise the resolvers that handle the URL
//! are tried in order and the first excerpt wins. Without an excerpt the
//! request goes to grounded search, and a social URL whose grounded search
//! comes back without citations ends in `NEEDS_CONTEXT`.

use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{
    ContentResolver, GenerationContext, ManualContext, ResolvedContent, MAX_EXCERPT_CHARS,
};
use crate::llm::Source;
use crate::normalize::NormalizedUrl;
use crate::util::{bounded_call, take_chars, CallError};
use crate::TARGET_WEB_REQUEST;

#[derive(Debug)]
pub enum ResolutionState {
    Start,
    ResolvingDirect,
    Resolved(GenerationContext),
    GroundedSearch,
    NeedsContext,
}

/// What the orchestrator hands to the reaction generator.
#[derive(Debug)]
pub enum Resolution {
    Context(GenerationContext),
    NeedsContext,
    Cancelled,
}

/// The request's cancellation token fired while resolvers were running.
#[derive(Debug, PartialEq, Eq)]
pub struct ResolutionCancelled;

/// Decision taken after the generation call returned.
#[derive(Debug, PartialEq, Eq)]
pub enum Settlement {
    Accept,
    NeedsContext,
}

pub struct Orchestrator<'a> {
    resolvers: &'a [Box<dyn ContentResolver>],
    call_timeout: Duration,
    search_available: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        resolvers: &'a [Box<dyn ContentResolver>],
        call_timeout: Duration,
        search_available: bool,
    ) -> Self {
        Self {
            resolvers,
            call_timeout,
            search_available,
        }
    }

    /// Tries every resolver that handles `target`, strictly in order, and
    /// returns the first non-empty excerpt. Failures and timeouts count as
    /// no content.
    pub async fn first_success(
        &self,
        target: &NormalizedUrl,
        cancel: &CancellationToken,
    ) -> Result<Option<ResolvedContent>, ResolutionCancelled> {
        for resolver in self.resolvers.iter().filter(|r| r.handles(target)) {
            let name = resolver.name();
            debug!(target: TARGET_WEB_REQUEST, "Trying resolver {} for {}", name, target.canonical);

            match bounded_call(cancel, self.call_timeout, resolver.resolve(target)).await {
                Ok(Some(excerpt)) if !excerpt.trim().is_empty() => {
                    info!(target: TARGET_WEB_REQUEST, "Resolver {} produced content for {}", name, target.canonical);
                    return Ok(Some(ResolvedContent {
                        excerpt: Some(take_chars(excerpt.trim(), MAX_EXCERPT_CHARS).to_string()),
                        origin: resolver.origin(target),
                    }));
                }
                Ok(_) => {
                    debug!(target: TARGET_WEB_REQUEST, "Resolver {} found no content", name);
                }
                Err(CallError::Cancelled) => return Err(ResolutionCancelled),
                Err(CallError::TimedOut(limit)) => {
                    warn!(target: TARGET_WEB_REQUEST, "Resolver {} timed out after {:?}", name, limit);
                }
                Err(CallError::Failed(err)) => {
                    warn!(target: TARGET_WEB_REQUEST, "Resolver {} failed: {:#}", name, err);
                }
            }
        }
        Ok(None)
    }

    /// Runs the state machine up to the point where generation can start.
    pub async fn resolve(
        &self,
        target: &NormalizedUrl,
        manual: Option<ManualContext>,
        cancel: &CancellationToken,
    ) -> Resolution {
        let mut manual = manual.filter(|m| !m.is_empty());
        let mut state = ResolutionState::Start;

        loop {
            debug!(target: TARGET_WEB_REQUEST, "Resolution state for {}: {:?}", target.canonical, state);
            state = match state {
                ResolutionState::Start => match manual.take() {
                    Some(context) => {
                        ResolutionState::Resolved(GenerationContext::UserSupplied(context))
                    }
                    None => ResolutionState::ResolvingDirect,
                },
                ResolutionState::ResolvingDirect => match self.first_success(target, cancel).await {
                    Err(ResolutionCancelled) => return Resolution::Cancelled,
                    Ok(Some(content)) => {
                        ResolutionState::Resolved(GenerationContext::ScrapedText(content))
                    }
                    Ok(None) if self.search_available => ResolutionState::GroundedSearch,
                    Ok(None) if target.is_social_platform() => ResolutionState::NeedsContext,
                    Ok(None) => {
                        warn!(target: TARGET_WEB_REQUEST, "No content and no web search available for {}, generating without context", target.canonical);
                        ResolutionState::Resolved(GenerationContext::NoContext)
                    }
                },
                ResolutionState::Resolved(context) => return Resolution::Context(context),
                ResolutionState::GroundedSearch => {
                    return Resolution::Context(GenerationContext::GroundedSearch)
                }
                ResolutionState::NeedsContext => return Resolution::NeedsContext,
            };
        }
    }
}

/// Decides whether generated output stands once the citations are known.
///
/// Only grounded search on a social URL can surrender here. A non-social
/// URL keeps its output even without citations. Citations without a title
/// do not count.
pub fn settle(
    target: &NormalizedUrl,
    context: &GenerationContext,
    citations: &[Source],
) -> Settlement {
    let attributable = citations.iter().any(Source::is_attributable);
    match context {
        GenerationContext::GroundedSearch if !attributable => {
            if target.is_social_platform() {
                info!(target: TARGET_WEB_REQUEST, "Grounded search found no citations for social URL {}, manual context required", target.canonical);
                Settlement::NeedsContext
            } else {
                // Accepted as-is; the model answered from prior knowledge.
                warn!(target: TARGET_WEB_REQUEST, "Grounded search returned no citations for {}, accepting ungrounded output", target.canonical);
                Settlement::Accept
            }
        }
        _ => Settlement::Accept,
    }
}
