//! Bounded retry loops for S3 eventual consistency.
//!
//! S3 reports a just-created bucket as missing, a just-deleted bucket as
//! present, and rejects concurrent configuration writes with
//! `OperationAborted`. Each helper re-runs an operation with exponential
//! backoff and jitter while the error matches, until a deadline. When the
//! deadline passes the last error is returned inside
//! [`ProviderError::Timeout`].

use std::future::Future;
use std::time::Duration;

use rand::RngExt;
use tfs3_model::S3ErrorCode;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// First backoff delay.
const BASE_DELAY: Duration = Duration::from_millis(200);
/// Upper bound for a single backoff delay (before jitter).
const MAX_DELAY: Duration = Duration::from_secs(5);

/// Delay before retry number `attempt` (zero based), with 10-30% jitter.
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2_u32.saturating_pow(attempt.min(16));
    let capped = BASE_DELAY.saturating_mul(factor).min(MAX_DELAY);

    let mut rng = rand::rng();
    let mut buf = [0u8; 1];
    rng.fill(&mut buf);
    // 0.10 + (0..=255)/255 * 0.20
    let jitter = 0.1 + f64::from(buf[0]) / 255.0 * 0.2;
    capped + capped.mul_f64(jitter)
}

/// Run `f` until it succeeds or fails with an error `retryable` rejects.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tfs3_provider::error::ProviderError;
/// use tfs3_provider::retry::retry_when;
///
/// # tokio_test::block_on(async {
/// let mut calls = 0;
/// let value = retry_when(
///     Duration::from_secs(5),
///     || {
///         calls += 1;
///         let attempt = calls;
///         async move {
///             if attempt < 2 {
///                 Err(ProviderError::UnexpectedState("not yet".to_owned()))
///             } else {
///                 Ok(attempt)
///             }
///         }
///     },
///     |e| matches!(e, ProviderError::UnexpectedState(_)),
/// )
/// .await
/// .unwrap();
/// assert_eq!(value, 2);
/// # });
/// ```
///
/// # Errors
///
/// Returns the first non-retryable error, or [`ProviderError::Timeout`]
/// wrapping the last retryable error once `timeout` has elapsed.
pub async fn retry_when<T, F, Fut, P>(
    timeout: Duration,
    mut f: F,
    mut retryable: P,
) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
    P: FnMut(&ProviderError) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) if retryable(&e) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(ProviderError::Timeout(Box::new(e)));
                }
                let delay = backoff_delay(attempt).min(deadline - now);
                debug!(attempt, ?delay, error = %e, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Retry while the error carries one of `codes`.
pub async fn retry_when_aws_err_code_equals<T, F, Fut>(
    timeout: Duration,
    f: F,
    codes: &[S3ErrorCode],
) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    retry_when(timeout, f, |e| e.code_is(codes)).await
}

/// Retry while the error carries `code` and its message contains `fragment`.
pub async fn retry_when_aws_err_message_contains<T, F, Fut>(
    timeout: Duration,
    f: F,
    code: &S3ErrorCode,
    fragment: &str,
) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    retry_when(timeout, f, |e| e.message_contains(code, fragment)).await
}

/// Retry while the bucket is reported as missing.
pub async fn retry_when_no_such_bucket<T, F, Fut>(timeout: Duration, f: F) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    retry_when_aws_err_code_equals(timeout, f, &[S3ErrorCode::NoSuchBucket]).await
}

/// Retry while `f` reports a not-found error. Used right after a create.
pub async fn retry_when_not_found<T, F, Fut>(timeout: Duration, f: F) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    retry_when(timeout, f, ProviderError::is_not_found).await
}

/// Poll `f` until it reports a not-found error. Used right after a delete.
///
/// # Errors
///
/// Returns any error other than not-found, or [`ProviderError::Timeout`] if
/// the resource is still visible when `timeout` elapses.
pub async fn retry_until_not_found<T, F, Fut>(timeout: Duration, mut f: F) -> ProviderResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let result: ProviderResult<()> = retry_when(
        timeout,
        || {
            let fut = f();
            async move {
                match fut.await {
                    Ok(_) => Err(ProviderError::UnexpectedState(
                        "resource still exists".to_owned(),
                    )),
                    Err(e) => Err(e),
                }
            }
        },
        |e| matches!(e, ProviderError::UnexpectedState(_)),
    )
    .await;

    match result {
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
        Ok(()) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tfs3_model::S3Error;

    use super::*;

    fn api_err(code: S3ErrorCode) -> ProviderError {
        ProviderError::api("testing", "b", S3Error::new(code))
    }

    #[test]
    fn test_should_bound_backoff_delay() {
        for attempt in 0..40 {
            let delay = backoff_delay(attempt);
            assert!(delay >= BASE_DELAY);
            assert!(delay <= MAX_DELAY.mul_f64(1.3));
        }
        let first = backoff_delay(0);
        assert!(first >= BASE_DELAY.mul_f64(1.1));
        assert!(first <= BASE_DELAY.mul_f64(1.3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_retry_listed_codes_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = &calls;
        let result = retry_when_no_such_bucket(Duration::from_secs(60), || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                Err(api_err(S3ErrorCode::NoSuchBucket))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_not_retry_other_codes() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: ProviderResult<()> =
            retry_when_no_such_bucket(Duration::from_secs(60), || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(api_err(S3ErrorCode::AccessDenied))
            })
            .await;
        assert!(result.unwrap_err().code_is(&[S3ErrorCode::AccessDenied]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_wrap_last_error_on_timeout() {
        let result: ProviderResult<()> = retry_when_aws_err_code_equals(
            Duration::from_secs(3),
            || async { Err(api_err(S3ErrorCode::OperationAborted)) },
            &[S3ErrorCode::OperationAborted],
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
        assert_eq!(err.error_code(), Some(&S3ErrorCode::OperationAborted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_match_message_fragment() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry_when_aws_err_message_contains(
            Duration::from_secs(60),
            || async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ProviderError::api(
                        "testing",
                        "b",
                        S3Error::invalid_request("Versioning must be 'Enabled' on the bucket"),
                    ))
                } else {
                    Ok("done")
                }
            },
            &S3ErrorCode::InvalidRequest,
            "Versioning must be 'Enabled'",
        )
        .await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_wait_until_visible_after_create() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry_when_not_found(Duration::from_secs(60), || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::not_found("S3 Bucket", "b"))
            } else {
                Ok(())
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_poll_until_gone_after_delete() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry_until_not_found(Duration::from_secs(60), || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(())
            } else {
                Err(ProviderError::not_found("S3 Bucket", "b"))
            }
        })
        .await;
        assert!(result.is_ok());

        let result = retry_until_not_found(Duration::from_secs(2), || async { Ok(()) }).await;
        assert!(matches!(result.unwrap_err(), ProviderError::Timeout(_)));
    }
}
