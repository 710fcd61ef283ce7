use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use thiserror::Error;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Outcome of an external call that did not produce a value.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("call timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
    #[error("call cancelled")]
    Cancelled,
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Runs an external call with an upper time bound, abandoning it as soon as
/// `cancel` fires.
pub async fn bounded_call<T, F>(
    cancel: &CancellationToken,
    limit: Duration,
    future: F,
) -> Result<T, CallError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CallError::Cancelled),
        result = timeout(limit, future) => match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(CallError::Failed(err)),
            Err(_) => Err(CallError::TimedOut(limit)),
        },
    }
}

/// Collapses whitespace runs into single spaces and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// Returns at most `max_chars` characters of `text`, counted as Unicode
/// scalar values rather than bytes.
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_chars_respects_multibyte() {
        let text = "héllo wörld";
        assert_eq!(take_chars(text, 4), "héll");
        assert_eq!(take_chars(text, 100), text);
        assert_eq!(take_chars("", 3), "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\n b\t c  "), "a b c");
    }

    #[tokio::test]
    async fn test_bounded_call_success() {
        let cancel = CancellationToken::new();
        let result = bounded_call(&cancel, Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_bounded_call_timeout() {
        let cancel = CancellationToken::new();
        let result: Result<(), _> = bounded_call(&cancel, Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(CallError::TimedOut(_))));
    }

    #[tokio::test]
    async fn test_bounded_call_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<(), _> = bounded_call(&cancel, Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(CallError::Cancelled)));
    }

    #[tokio::test]
    async fn test_bounded_call_failure() {
        let cancel = CancellationToken::new();
        let result: Result<(), _> =
            bounded_call(&cancel, Duration::from_secs(1), async { Err(anyhow::anyhow!("boom")) })
                .await;
        assert!(matches!(result, Err(CallError::Failed(_))));
    }
}
