//! Degrade-to-default wrapper for advisory calls.

use crate::TrackiflyError;
use std::future::Future;
use tracing::warn;

/// Await `operation`; on any error log it and return `default()` instead.
///
/// The caller never sees the error. `name` identifies the operation in logs.
pub async fn or_fallback<T, Fut, D>(name: &'static str, operation: Fut, default: D) -> T
where
    Fut: Future<Output = Result<T, TrackiflyError>>,
    D: FnOnce() -> T,
{
    match operation.await {
        Ok(value) => value,
        Err(e) => {
            warn!(operation = name, error = %e, "Falling back to default value");
            default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_passes_through() {
        let value = or_fallback("ok", async { Ok::<_, TrackiflyError>(7) }, || 0).await;
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_error_returns_default() {
        let value = or_fallback(
            "broken",
            async { Err::<u32, _>(TrackiflyError::EmptyResponse) },
            || 42,
        )
        .await;
        assert_eq!(value, 42);
    }

    #[test]
    fn test_default_is_lazy_on_success() {
        let value = tokio_test::block_on(or_fallback(
            "lazy",
            async { Ok::<_, TrackiflyError>("real") },
            || panic!("default must not be built"),
        ));
        assert_eq!(value, "real");
    }
}
