//! Error types for the tfs3 core.

/// Core error type for tfs3 infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Invalid AWS account ID format.
    #[error("invalid AWS account ID: {0} (must be 12-digit numeric string)")]
    InvalidAccountId(String),

    /// No Route 53 hosted zone is known for the region.
    #[error("unsupported AWS Region ({0}) for S3 hosted zone ID")]
    UnknownHostedZoneRegion(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for tfs3 core operations.
pub type CoreResult<T> = Result<T, CoreError>;
