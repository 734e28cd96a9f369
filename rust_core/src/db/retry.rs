//! Retry with exponential backoff for transient database failures.

use crate::error::StoreError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF_MS: u64 = 2_000;

/// SQLSTATE codes worth another attempt: serialization failure, deadlock,
/// too many connections, admin shutdown, connection failures.
const TRANSIENT_SQLSTATES: &[&str] = &["40001", "40P01", "53300", "57P01", "08000", "08003", "08006"];

/// Run `f` until it succeeds, fails with a non-transient error, or
/// `max_attempts` is reached. `NotFound` is never retried.
pub async fn execute_with_retry<F, Fut, T>(mut f: F, max_attempts: u32) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_attempts && is_retriable_error(&e) => {
                let backoff_ms = (BASE_BACKOFF_MS * 2_u64.pow(attempt - 1)).min(MAX_BACKOFF_MS);
                warn!(
                    "Database operation failed (attempt {}/{}): {}. Retrying in {}ms",
                    attempt, max_attempts, e, backoff_ms
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

pub fn is_retriable_error(e: &StoreError) -> bool {
    match e {
        StoreError::NotFound(_) => false,
        StoreError::Database(err) => match err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::WorkerCrashed => true,
            sqlx::Error::Database(db) => db
                .code()
                .is_some_and(|code| TRANSIENT_SQLSTATES.contains(&&*code)),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn io_error() -> StoreError {
        StoreError::Database(sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        )))
    }

    #[test]
    fn test_is_retriable_error() {
        assert!(is_retriable_error(&io_error()));
        assert!(is_retriable_error(&StoreError::Database(sqlx::Error::PoolTimedOut)));

        assert!(!is_retriable_error(&StoreError::NotFound("game")));
        assert!(!is_retriable_error(&StoreError::Database(sqlx::Error::RowNotFound)));
        assert!(!is_retriable_error(&StoreError::Database(sqlx::Error::ColumnNotFound(
            "quarter".into()
        ))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_eventually() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = execute_with_retry(
            || {
                let count = counter.clone();
                async move {
                    if count.fetch_add(1, Ordering::SeqCst) + 1 < 3 {
                        Err(io_error())
                    } else {
                        Ok(42)
                    }
                }
            },
            3,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_max_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<(), StoreError> = execute_with_retry(
            || {
                let count = counter.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err(io_error())
                }
            },
            3,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_returned_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<(), StoreError> = execute_with_retry(
            || {
                let count = counter.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err(StoreError::NotFound("team"))
                }
            },
            3,
        )
        .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
