//! Provider error types.
//!
//! Defines [`ProviderError`], the error returned by every resource operation.
//! S3 failures keep their [`S3Error`] (and therefore their error code) so
//! that callers can branch on retry, ignore and treat-as-absent conditions.
//!
//! # Usage
//!
//! ```
//! use tfs3_model::{S3Error, S3ErrorCode};
//! use tfs3_provider::error::ProviderError;
//!
//! let source = S3Error::no_such_bucket("my-bucket");
//! let err = ProviderError::api("reading S3 Bucket", "my-bucket", source);
//! assert_eq!(err.error_code(), Some(&S3ErrorCode::NoSuchBucket));
//! assert_eq!(
//!     err.to_string(),
//!     "reading S3 Bucket (my-bucket): NoSuchBucket: The specified bucket does not exist"
//! );
//! ```

use tfs3_core::CoreError;
use tfs3_model::{S3Error, S3ErrorCode, S3Result};

/// Provider error type.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    // -----------------------------------------------------------------------
    // Remote errors
    // -----------------------------------------------------------------------
    /// An S3 call failed.
    #[error("{operation} ({resource}): {source}")]
    Api {
        /// What was being done, e.g. `"creating S3 Bucket"`.
        operation: &'static str,
        /// The bucket, key or ID the call addressed.
        resource: String,
        /// The S3 error.
        #[source]
        source: S3Error,
    },

    /// The addressed resource does not exist.
    #[error("{kind} ({id}) not found")]
    NotFound {
        /// Kind of resource, e.g. `"S3 Bucket"`.
        kind: &'static str,
        /// Resource identifier.
        id: String,
        /// The S3 error that reported the absence, if any.
        #[source]
        source: Option<S3Error>,
    },

    /// A retry loop gave up. Wraps the last error observed.
    #[error("timeout while waiting: {0}")]
    Timeout(#[source] Box<ProviderError>),

    /// A resource did not reach the expected state.
    #[error("unexpected state: {0}")]
    UnexpectedState(String),

    // -----------------------------------------------------------------------
    // Local errors
    // -----------------------------------------------------------------------
    /// The configuration is invalid.
    #[error("{0}")]
    Validation(String),

    /// A resource ID could not be parsed.
    #[error("invalid resource ID ({id}): {reason}")]
    InvalidId {
        /// The offending ID.
        id: String,
        /// Why it was rejected.
        reason: String,
    },

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Provider configuration or static table lookup failed.
    #[error(transparent)]
    Config(#[from] CoreError),
}

/// Convenience result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    /// Wrap an S3 error with the operation and resource it belongs to.
    #[must_use]
    pub fn api(operation: &'static str, resource: impl Into<String>, source: S3Error) -> Self {
        Self::Api {
            operation,
            resource: resource.into(),
            source,
        }
    }

    /// A not-found error without an underlying S3 error.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
            source: None,
        }
    }

    /// A validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// An ID parsing error.
    #[must_use]
    pub fn invalid_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error means the resource is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Timeout(inner) => inner.is_not_found(),
            _ => false,
        }
    }

    /// The S3 error carried by this error, looking through timeouts.
    #[must_use]
    pub fn s3_error(&self) -> Option<&S3Error> {
        match self {
            Self::Api { source, .. } => Some(source),
            Self::NotFound { source, .. } => source.as_ref(),
            Self::Timeout(inner) => inner.s3_error(),
            _ => None,
        }
    }

    /// The S3 error code carried by this error.
    #[must_use]
    pub fn error_code(&self) -> Option<&S3ErrorCode> {
        self.s3_error().map(|e| &e.code)
    }

    /// Whether the error carries one of the given S3 error codes.
    #[must_use]
    pub fn code_is(&self, codes: &[S3ErrorCode]) -> bool {
        self.s3_error().is_some_and(|e| e.code_is(codes))
    }

    /// Whether the error carries `code` with a message containing `fragment`.
    #[must_use]
    pub fn message_contains(&self, code: &S3ErrorCode, fragment: &str) -> bool {
        self.s3_error()
            .is_some_and(|e| e.message_contains(code, fragment))
    }
}

/// Attach operation context to S3 results.
pub trait S3ResultExt<T> {
    /// Convert the S3 error into [`ProviderError::Api`].
    fn context(self, operation: &'static str, resource: &str) -> ProviderResult<T>;

    /// Convert the listed codes into [`ProviderError::NotFound`] and every
    /// other error into [`ProviderError::Api`].
    fn not_found_on(
        self,
        codes: &[S3ErrorCode],
        kind: &'static str,
        operation: &'static str,
        resource: &str,
    ) -> ProviderResult<T>;
}

impl<T> S3ResultExt<T> for S3Result<T> {
    fn context(self, operation: &'static str, resource: &str) -> ProviderResult<T> {
        self.map_err(|e| ProviderError::api(operation, resource, e))
    }

    fn not_found_on(
        self,
        codes: &[S3ErrorCode],
        kind: &'static str,
        operation: &'static str,
        resource: &str,
    ) -> ProviderResult<T> {
        self.map_err(|e| {
            if e.code_is(codes) {
                ProviderError::NotFound {
                    kind,
                    id: resource.to_owned(),
                    source: Some(e),
                }
            } else {
                ProviderError::api(operation, resource, e)
            }
        })
    }
}

/// Turn a not-found error into `None`.
pub trait OptionalExt<T> {
    /// `Ok(None)` when the error is a not-found error.
    fn optional(self) -> ProviderResult<Option<T>>;
}

impl<T> OptionalExt<T> for ProviderResult<T> {
    fn optional(self) -> ProviderResult<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_listed_codes_to_not_found() {
        let res: S3Result<()> = Err(S3Error::new(S3ErrorCode::NoSuchCORSConfiguration));
        let err = res
            .not_found_on(
                &[S3ErrorCode::NoSuchCORSConfiguration],
                "S3 Bucket CORS Configuration",
                "reading S3 Bucket CORS Configuration",
                "b",
            )
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.error_code(), Some(&S3ErrorCode::NoSuchCORSConfiguration));
    }

    #[test]
    fn test_should_keep_other_codes_as_api_errors() {
        let res: S3Result<()> = Err(S3Error::access_denied("b"));
        let err = res
            .not_found_on(&[S3ErrorCode::NoSuchBucket], "S3 Bucket", "reading S3 Bucket", "b")
            .unwrap_err();
        assert!(!err.is_not_found());
        assert!(err.code_is(&[S3ErrorCode::AccessDenied]));
    }

    #[test]
    fn test_should_look_through_timeouts() {
        let inner = ProviderError::not_found("S3 Bucket", "b");
        let err = ProviderError::Timeout(Box::new(inner));
        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("timeout while waiting: S3 Bucket (b) not found"));
    }

    #[test]
    fn test_should_convert_not_found_to_none() {
        let res: ProviderResult<u8> = Err(ProviderError::not_found("S3 Bucket", "b"));
        assert_eq!(res.optional().unwrap(), None);
        let res: ProviderResult<u8> = Err(ProviderError::validation("bad"));
        assert!(res.optional().is_err());
    }
}
