//! External AI adapter contract.
//!
//! The generative backend lives outside this crate; only its request and
//! response shapes matter here. The adapter is the single stage of the
//! waterfall that may suspend on I/O, and every round trip is bounded by
//! the configured deadline.

use std::time::Duration;

use async_trait::async_trait;
use wayfinder_core::{ActionCandidate, Error, Fingerprint, Language};

use crate::normalize::NormalizedIntent;

/// Adapter-boundary failures. Both are recoverable inside the resolver:
/// the action waterfall falls back to its best earlier candidate.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// Backend unreachable or returned an unusable response.
    #[error("adapter unavailable: {0}")]
    Unavailable(String),

    /// Round trip exceeded the caller-supplied deadline. Retryable, but
    /// retry policy belongs to the caller.
    #[error("adapter exceeded {0}ms deadline")]
    Timeout(u64),
}

impl From<AiError> for Error {
    fn from(err: AiError) -> Self {
        match err {
            AiError::Unavailable(msg) => Error::AiUnavailable(msg),
            AiError::Timeout(ms) => Error::AiTimeout(ms),
        }
    }
}

/// One ranked answer from the adapter's action resolution.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    /// Index into the candidate list the adapter was given.
    pub candidate_index: usize,
    /// Adapter-estimated probability that this is the intended element.
    pub probability: f64,
    pub reasoning: Option<String>,
}

/// Contract with the external generative backend.
#[async_trait]
pub trait AiAdapter: Send + Sync {
    /// Rank candidates for an intent. Results ordered by probability.
    async fn resolve_action(
        &self, intent: &NormalizedIntent, candidates: &[ActionCandidate],
    ) -> Result<Vec<RankedCandidate>, AiError>;

    /// Generate a page description from its fingerprint context.
    async fn describe(&self, fingerprint: &Fingerprint, language: &Language) -> Result<String, AiError>;

    /// Generate an article summary from its fingerprint context.
    async fn summarize(&self, fingerprint: &Fingerprint, language: &Language) -> Result<String, AiError>;
}

/// Run an adapter call under the deadline, mapping elapsed time to
/// [`AiError::Timeout`].
pub(crate) async fn bounded<T, F>(deadline: Duration, fut: F) -> Result<T, AiError>
where
    F: Future<Output = Result<T, AiError>> + Send,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(AiError::Timeout(deadline.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let result = bounded(Duration::from_millis(200), async { Ok::<_, AiError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<(), AiError> = bounded(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(AiError::Timeout(20))));
    }

    #[tokio::test]
    async fn test_bounded_propagates_adapter_error() {
        let result: Result<(), AiError> =
            bounded(Duration::from_millis(200), async { Err(AiError::Unavailable("down".into())) }).await;
        assert!(matches!(result, Err(AiError::Unavailable(_))));
    }
}
