//! Deadline enforcement.
//!
//! # Responsibilities
//! - Race a pipeline future against a wall-clock deadline
//! - Drop (and thereby cancel) the future when the deadline fires
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Expiry is a distinct error kind (`Timeout`)
//! - A deadline of zero or less disables enforcement

use std::future::Future;
use std::time::Duration;

use crate::pipeline::{PipelineError, PipelineResult};

/// Run `fut` with a deadline of `timeout_ms` milliseconds.
///
/// On expiry the future is dropped before this returns, so any child process
/// or HTTP call it owns is torn down and its late result can never surface.
pub async fn with_deadline<T, F>(timeout_ms: i64, fut: F) -> PipelineResult<T>
where
    F: Future<Output = PipelineResult<T>>,
{
    if timeout_ms <= 0 {
        return fut.await;
    }

    let after_ms = timeout_ms as u64;
    match tokio::time::timeout(Duration::from_millis(after_ms), fut).await {
        Ok(result) => result,
        Err(_) => Err(PipelineError::Timeout { after_ms }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let result = with_deadline(1_000, async { Ok::<_, PipelineError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_expires() {
        let started = Instant::now();
        let result: PipelineResult<()> = with_deadline(5, std::future::pending()).await;

        assert!(matches!(result, Err(PipelineError::Timeout { after_ms: 5 })));
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: PipelineResult<()> =
            with_deadline(1_000, async { Err(PipelineError::MissingPageSelector) }).await;
        assert!(matches!(result, Err(PipelineError::MissingPageSelector)));
    }

    #[tokio::test]
    async fn test_non_positive_disables() {
        for timeout_ms in [0, -1] {
            let result = with_deadline(timeout_ms, async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, PipelineError>("late")
            })
            .await;
            assert_eq!(result.unwrap(), "late");
        }
    }
}
