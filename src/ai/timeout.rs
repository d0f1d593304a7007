//! Timeout helper for async operations

use std::future::Future;
use std::time::Duration;

use crate::types::{InsightsError, Result};

/// Execute an async operation with a timeout
///
/// Returns [`InsightsError::Timeout`] naming `operation_name` when the
/// operation does not complete in time. The future is dropped on expiry.
///
/// ```ignore
/// let response = with_timeout(
///     Duration::from_secs(180),
///     provider.generate(&prompt, &schema),
///     "LLM request",
/// )
/// .await?;
/// ```
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(InsightsError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, InsightsError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, InsightsError>(42)
            },
            "slow operation",
        )
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("slow operation"));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: Result<()> = with_timeout(
            Duration::from_secs(1),
            async { Err(InsightsError::config("bad")) },
            "failing operation",
        )
        .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Configuration);
    }
}
