//! Per-call timeout enforcement for remote generation.
//!
//! Each remote call is raced against its own timer. The losing future is
//! dropped, so a call that answers after its deadline can never be observed,
//! persisted or counted.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use super::cancel::CancelToken;

/// Default timeout for image generation calls
pub const IMAGE_CALL_TIMEOUT: Duration = Duration::from_millis(120_000);

/// Failure of a single remote call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Remote call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Remote call failed: {0}")]
    CallFailure(String),

    #[error("Remote call cancelled")]
    Cancelled,
}

impl RemoteError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Run `operation`, failing with [`RemoteError::Timeout`] if it does not
/// settle within `timeout`
pub async fn call_with_timeout<T, F>(operation: F, timeout: Duration) -> Result<T, RemoteError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(RemoteError::CallFailure(format!("{:#}", e))),
        Err(_) => Err(RemoteError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Same as [`call_with_timeout`], also abandoning the call when `cancel` fires
pub async fn call_with_cancel<T, F>(
    operation: F,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<T, RemoteError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(RemoteError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RemoteError::Cancelled),
        result = call_with_timeout(operation, timeout) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fast_call_succeeds() {
        let result =
            call_with_timeout(async { Ok::<_, anyhow::Error>(42) }, Duration::from_millis(100))
                .await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_error_is_call_failure() {
        let result: Result<(), _> = call_with_timeout(
            async { Err::<(), _>(anyhow::anyhow!("quota exceeded")) },
            Duration::from_millis(100),
        )
        .await;

        match result {
            Err(RemoteError::CallFailure(msg)) => assert!(msg.contains("quota exceeded")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let result = call_with_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, anyhow::Error>(())
            },
            Duration::from_millis(20),
        )
        .await;

        assert_eq!(result, Err(RemoteError::Timeout { timeout_ms: 20 }));
        assert!(result.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_precancelled_call_never_runs() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let token = CancelToken::new();
        token.cancel();
        let polled = AtomicBool::new(false);

        let result = call_with_cancel(
            async {
                polled.store(true, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(())
            },
            Duration::from_secs(1),
            &token,
        )
        .await;

        assert_eq!(result, Err(RemoteError::Cancelled));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(IMAGE_CALL_TIMEOUT.as_millis(), 120_000);
    }
}
