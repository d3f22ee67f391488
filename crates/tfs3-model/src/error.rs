//! S3 API error codes and the error value returned by S3 connections.
//!
//! Resources branch on error codes rather than on HTTP statuses: a missing
//! sub-configuration, an eventual-consistency race, and a feature that a
//! partition does not support all arrive as distinct codes.

use std::fmt;

/// Well-known S3 error codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum S3ErrorCode {
    /// AccessDenied error.
    AccessDenied,
    /// AccessControlListNotSupported error (bucket owner enforced ownership).
    AccessControlListNotSupported,
    /// BucketAlreadyExists error.
    BucketAlreadyExists,
    /// BucketAlreadyOwnedByYou error.
    BucketAlreadyOwnedByYou,
    /// BucketNotEmpty error.
    BucketNotEmpty,
    /// InternalError error.
    #[default]
    InternalError,
    /// InvalidArgument error.
    InvalidArgument,
    /// InvalidBucketName error.
    InvalidBucketName,
    /// InvalidBucketState error.
    InvalidBucketState,
    /// InvalidObjectState error.
    InvalidObjectState,
    /// InvalidRequest error.
    InvalidRequest,
    /// MalformedPolicy error.
    MalformedPolicy,
    /// MalformedXML error.
    MalformedXML,
    /// MethodNotAllowed error.
    MethodNotAllowed,
    /// NoSuchBucket error.
    NoSuchBucket,
    /// NoSuchBucketPolicy error.
    NoSuchBucketPolicy,
    /// NoSuchCORSConfiguration error.
    NoSuchCORSConfiguration,
    /// NoSuchKey error.
    NoSuchKey,
    /// NoSuchLifecycleConfiguration error.
    NoSuchLifecycleConfiguration,
    /// NoSuchObjectLockConfiguration error.
    NoSuchObjectLockConfiguration,
    /// NoSuchPublicAccessBlockConfiguration error.
    NoSuchPublicAccessBlockConfiguration,
    /// NoSuchTagSet error.
    NoSuchTagSet,
    /// NoSuchVersion error.
    NoSuchVersion,
    /// NoSuchWebsiteConfiguration error.
    NoSuchWebsiteConfiguration,
    /// NotFound error (HEAD requests carry no error body).
    NotFound,
    /// NotImplemented error.
    NotImplemented,
    /// ObjectLockConfigurationNotFoundError error.
    ObjectLockConfigurationNotFoundError,
    /// OperationAborted error (conflicting concurrent bucket operation).
    OperationAborted,
    /// ReplicationConfigurationNotFoundError error.
    ReplicationConfigurationNotFoundError,
    /// ServerSideEncryptionConfigurationNotFoundError error.
    ServerSideEncryptionConfigurationNotFoundError,
    /// UnsupportedArgument error.
    UnsupportedArgument,
    /// UnsupportedOperation error.
    UnsupportedOperation,
    /// XNotImplemented error (returned by some third-party implementations).
    XNotImplemented,
    /// An error code not in the well-known set.
    Other(String),
}

impl S3ErrorCode {
    /// Returns the error code as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::AccessControlListNotSupported => "AccessControlListNotSupported",
            Self::BucketAlreadyExists => "BucketAlreadyExists",
            Self::BucketAlreadyOwnedByYou => "BucketAlreadyOwnedByYou",
            Self::BucketNotEmpty => "BucketNotEmpty",
            Self::InternalError => "InternalError",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidBucketName => "InvalidBucketName",
            Self::InvalidBucketState => "InvalidBucketState",
            Self::InvalidObjectState => "InvalidObjectState",
            Self::InvalidRequest => "InvalidRequest",
            Self::MalformedPolicy => "MalformedPolicy",
            Self::MalformedXML => "MalformedXML",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchBucketPolicy => "NoSuchBucketPolicy",
            Self::NoSuchCORSConfiguration => "NoSuchCORSConfiguration",
            Self::NoSuchKey => "NoSuchKey",
            Self::NoSuchLifecycleConfiguration => "NoSuchLifecycleConfiguration",
            Self::NoSuchObjectLockConfiguration => "NoSuchObjectLockConfiguration",
            Self::NoSuchPublicAccessBlockConfiguration => "NoSuchPublicAccessBlockConfiguration",
            Self::NoSuchTagSet => "NoSuchTagSet",
            Self::NoSuchVersion => "NoSuchVersion",
            Self::NoSuchWebsiteConfiguration => "NoSuchWebsiteConfiguration",
            Self::NotFound => "NotFound",
            Self::NotImplemented => "NotImplemented",
            Self::ObjectLockConfigurationNotFoundError => "ObjectLockConfigurationNotFoundError",
            Self::OperationAborted => "OperationAborted",
            Self::ReplicationConfigurationNotFoundError => "ReplicationConfigurationNotFoundError",
            Self::ServerSideEncryptionConfigurationNotFoundError => {
                "ServerSideEncryptionConfigurationNotFoundError"
            }
            Self::UnsupportedArgument => "UnsupportedArgument",
            Self::UnsupportedOperation => "UnsupportedOperation",
            Self::XNotImplemented => "XNotImplemented",
            Self::Other(s) => s,
        }
    }

    /// Parse a wire error code. Unknown codes are kept verbatim.
    ///
    /// # Examples
    ///
    /// ```
    /// use tfs3_model::S3ErrorCode;
    ///
    /// assert_eq!(S3ErrorCode::from_code("NoSuchBucket"), S3ErrorCode::NoSuchBucket);
    /// assert_eq!(
    ///     S3ErrorCode::from_code("SlowDown"),
    ///     S3ErrorCode::Other("SlowDown".to_owned())
    /// );
    /// ```
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "AccessDenied" => Self::AccessDenied,
            "AccessControlListNotSupported" => Self::AccessControlListNotSupported,
            "BucketAlreadyExists" => Self::BucketAlreadyExists,
            "BucketAlreadyOwnedByYou" => Self::BucketAlreadyOwnedByYou,
            "BucketNotEmpty" => Self::BucketNotEmpty,
            "InternalError" => Self::InternalError,
            "InvalidArgument" => Self::InvalidArgument,
            "InvalidBucketName" => Self::InvalidBucketName,
            "InvalidBucketState" => Self::InvalidBucketState,
            "InvalidObjectState" => Self::InvalidObjectState,
            "InvalidRequest" => Self::InvalidRequest,
            "MalformedPolicy" => Self::MalformedPolicy,
            "MalformedXML" => Self::MalformedXML,
            "MethodNotAllowed" => Self::MethodNotAllowed,
            "NoSuchBucket" => Self::NoSuchBucket,
            "NoSuchBucketPolicy" => Self::NoSuchBucketPolicy,
            "NoSuchCORSConfiguration" => Self::NoSuchCORSConfiguration,
            "NoSuchKey" => Self::NoSuchKey,
            "NoSuchLifecycleConfiguration" => Self::NoSuchLifecycleConfiguration,
            "NoSuchObjectLockConfiguration" => Self::NoSuchObjectLockConfiguration,
            "NoSuchPublicAccessBlockConfiguration" => Self::NoSuchPublicAccessBlockConfiguration,
            "NoSuchTagSet" => Self::NoSuchTagSet,
            "NoSuchVersion" => Self::NoSuchVersion,
            "NoSuchWebsiteConfiguration" => Self::NoSuchWebsiteConfiguration,
            "NotFound" => Self::NotFound,
            "NotImplemented" => Self::NotImplemented,
            "ObjectLockConfigurationNotFoundError" => Self::ObjectLockConfigurationNotFoundError,
            "OperationAborted" => Self::OperationAborted,
            "ReplicationConfigurationNotFoundError" => Self::ReplicationConfigurationNotFoundError,
            "ServerSideEncryptionConfigurationNotFoundError" => {
                Self::ServerSideEncryptionConfigurationNotFoundError
            }
            "UnsupportedArgument" => Self::UnsupportedArgument,
            "UnsupportedOperation" => Self::UnsupportedOperation,
            "XNotImplemented" => Self::XNotImplemented,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns the default HTTP status code for this error.
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::InvalidArgument
            | Self::InvalidBucketName
            | Self::InvalidRequest
            | Self::MalformedPolicy
            | Self::MalformedXML
            | Self::AccessControlListNotSupported
            | Self::UnsupportedArgument
            | Self::UnsupportedOperation => http::StatusCode::BAD_REQUEST,
            Self::AccessDenied | Self::InvalidObjectState => http::StatusCode::FORBIDDEN,
            Self::NoSuchBucket
            | Self::NoSuchBucketPolicy
            | Self::NoSuchCORSConfiguration
            | Self::NoSuchKey
            | Self::NoSuchLifecycleConfiguration
            | Self::NoSuchObjectLockConfiguration
            | Self::NoSuchPublicAccessBlockConfiguration
            | Self::NoSuchTagSet
            | Self::NoSuchVersion
            | Self::NoSuchWebsiteConfiguration
            | Self::NotFound
            | Self::ObjectLockConfigurationNotFoundError
            | Self::ReplicationConfigurationNotFoundError
            | Self::ServerSideEncryptionConfigurationNotFoundError => http::StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::BucketAlreadyExists
            | Self::BucketAlreadyOwnedByYou
            | Self::BucketNotEmpty
            | Self::InvalidBucketState
            | Self::OperationAborted => http::StatusCode::CONFLICT,
            Self::NotImplemented | Self::XNotImplemented => http::StatusCode::NOT_IMPLEMENTED,
            Self::InternalError | Self::Other(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the default message for this error.
    #[must_use]
    pub fn default_message(&self) -> &str {
        match self {
            Self::AccessDenied => "Access Denied",
            Self::AccessControlListNotSupported => "The bucket does not allow ACLs",
            Self::BucketAlreadyExists => "The requested bucket name is not available",
            Self::BucketAlreadyOwnedByYou => "The bucket is already owned by you",
            Self::BucketNotEmpty => "The bucket you tried to delete is not empty",
            Self::InternalError => "Internal server error",
            Self::InvalidArgument => "Invalid Argument",
            Self::InvalidBucketName => "The specified bucket is not valid",
            Self::InvalidBucketState => {
                "The request is not valid with the current state of the bucket"
            }
            Self::InvalidObjectState => {
                "The operation is not valid for the current state of the object"
            }
            Self::InvalidRequest => "Invalid Request",
            Self::MalformedPolicy => "Policies must be valid JSON",
            Self::MalformedXML => "The XML you provided was not well-formed",
            Self::MethodNotAllowed => "The specified method is not allowed against this resource",
            Self::NoSuchBucket => "The specified bucket does not exist",
            Self::NoSuchBucketPolicy => "The bucket policy does not exist",
            Self::NoSuchCORSConfiguration => "The CORS configuration does not exist",
            Self::NoSuchKey => "The specified key does not exist",
            Self::NoSuchLifecycleConfiguration => "The lifecycle configuration does not exist",
            Self::NoSuchObjectLockConfiguration | Self::ObjectLockConfigurationNotFoundError => {
                "Object Lock configuration does not exist for this bucket"
            }
            Self::NoSuchPublicAccessBlockConfiguration => {
                "The public access block configuration was not found"
            }
            Self::NoSuchTagSet => "The TagSet does not exist",
            Self::NoSuchVersion => "The specified version does not exist",
            Self::NoSuchWebsiteConfiguration => "The specified bucket does not have a website configuration",
            Self::NotFound => "Not Found",
            Self::NotImplemented | Self::XNotImplemented => {
                "A header you provided implies functionality that is not implemented"
            }
            Self::OperationAborted => {
                "A conflicting conditional operation is currently in progress against this resource"
            }
            Self::ReplicationConfigurationNotFoundError => {
                "The replication configuration was not found"
            }
            Self::ServerSideEncryptionConfigurationNotFoundError => {
                "The server side encryption configuration was not found"
            }
            Self::UnsupportedArgument => "The argument is not supported",
            Self::UnsupportedOperation => "The operation is not supported",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for S3ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An S3 error response.
#[derive(Debug)]
pub struct S3Error {
    /// The error code.
    pub code: S3ErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The resource that caused the error.
    pub resource: Option<String>,
    /// The request ID.
    pub request_id: Option<String>,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for S3Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(request_id) = &self.request_id {
            write!(f, " (request id: {request_id})")?;
        }
        Ok(())
    }
}

impl std::error::Error for S3Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl S3Error {
    /// Create a new S3Error from an error code.
    #[must_use]
    pub fn new(code: S3ErrorCode) -> Self {
        let status_code = code.default_status_code();
        let message = code.default_message().to_owned();
        Self {
            code,
            message,
            resource: None,
            request_id: None,
            status_code,
            source: None,
        }
    }

    /// Create a new S3Error with a custom message.
    #[must_use]
    pub fn with_message(code: S3ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            resource: None,
            request_id: None,
            source: None,
        }
    }

    /// Set the resource that caused this error.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Override the HTTP status code.
    #[must_use]
    pub fn with_status(mut self, status_code: http::StatusCode) -> Self {
        self.status_code = status_code;
        self
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether the error carries one of the given codes.
    #[must_use]
    pub fn code_is(&self, codes: &[S3ErrorCode]) -> bool {
        codes.contains(&self.code)
    }

    /// Whether the error carries `code` and its message contains `fragment`.
    #[must_use]
    pub fn message_contains(&self, code: &S3ErrorCode, fragment: &str) -> bool {
        self.code == *code && self.message.contains(fragment)
    }

    /// Create a NoSuchBucket error.
    #[must_use]
    pub fn no_such_bucket(bucket_name: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::NoSuchBucket).with_resource(bucket_name)
    }

    /// Create a NoSuchKey error.
    #[must_use]
    pub fn no_such_key(key: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::NoSuchKey).with_resource(key)
    }

    /// Create a BucketAlreadyExists error.
    #[must_use]
    pub fn bucket_already_exists(bucket_name: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::BucketAlreadyExists).with_resource(bucket_name)
    }

    /// Create a BucketAlreadyOwnedByYou error.
    #[must_use]
    pub fn bucket_already_owned_by_you(bucket_name: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::BucketAlreadyOwnedByYou).with_resource(bucket_name)
    }

    /// Create a BucketNotEmpty error.
    #[must_use]
    pub fn bucket_not_empty(bucket_name: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::BucketNotEmpty).with_resource(bucket_name)
    }

    /// Create an AccessDenied error.
    #[must_use]
    pub fn access_denied(resource: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::AccessDenied).with_resource(resource)
    }

    /// Create an InternalError error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(S3ErrorCode::InternalError, message)
    }

    /// Create an InvalidArgument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::with_message(S3ErrorCode::InvalidArgument, message)
    }

    /// Create an InvalidRequest error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::with_message(S3ErrorCode::InvalidRequest, message)
    }
}

/// Convenience result type for S3 calls.
pub type S3Result<T> = Result<T, S3Error>;

/// Create an S3Error from an error code.
///
/// # Examples
///
/// ```
/// use tfs3_model::s3_error;
/// use tfs3_model::error::S3ErrorCode;
///
/// let err = s3_error!(NoSuchBucket);
/// assert_eq!(err.code, S3ErrorCode::NoSuchBucket);
///
/// let err = s3_error!(OperationAborted, "try again");
/// assert_eq!(err.message, "try again");
/// ```
#[macro_export]
macro_rules! s3_error {
    ($code:ident) => {
        $crate::error::S3Error::new($crate::error::S3ErrorCode::$code)
    };
    ($code:ident, $msg:expr) => {
        $crate::error::S3Error::with_message($crate::error::S3ErrorCode::$code, $msg)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_round_trip_known_codes() {
        for code in [
            S3ErrorCode::NoSuchBucket,
            S3ErrorCode::OperationAborted,
            S3ErrorCode::ServerSideEncryptionConfigurationNotFoundError,
            S3ErrorCode::XNotImplemented,
        ] {
            assert_eq!(S3ErrorCode::from_code(code.as_str()), code);
        }
    }

    #[test]
    fn test_should_map_not_found_codes_to_404() {
        assert_eq!(
            S3ErrorCode::NoSuchCORSConfiguration.default_status_code(),
            http::StatusCode::NOT_FOUND
        );
        assert_eq!(
            S3ErrorCode::Other("Throttling".to_owned()).default_status_code(),
            http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_should_match_code_and_message_fragment() {
        let err = S3Error::invalid_request("Versioning must be 'Enabled' on the bucket");
        assert!(err.code_is(&[S3ErrorCode::NoSuchBucket, S3ErrorCode::InvalidRequest]));
        assert!(err.message_contains(&S3ErrorCode::InvalidRequest, "Versioning must be"));
        assert!(!err.message_contains(&S3ErrorCode::NoSuchBucket, "Versioning must be"));
    }

    #[test]
    fn test_should_display_code_and_request_id() {
        let err = s3_error!(NoSuchBucket).with_request_id("abc");
        assert_eq!(
            err.to_string(),
            "NoSuchBucket: The specified bucket does not exist (request id: abc)"
        );
    }
}
