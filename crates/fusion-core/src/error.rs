//! Error types for the gateway with S3-compatible error codes.

use thiserror::Error;

/// A specialized `Result` type for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// S3-compatible error codes surfaced at the frontend boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum S3ErrorCode {
    /// The specified bucket does not exist.
    NoSuchBucket,
    /// The specified key does not exist.
    NoSuchKey,
    /// The specified upload does not exist.
    NoSuchUpload,
    /// The specified bucket already exists.
    BucketAlreadyExists,
    /// The specified bucket name is not valid.
    InvalidBucketName,
    /// The specified argument is not valid.
    InvalidArgument,
    /// The requested range is not satisfiable.
    InvalidRange,
    /// Internal server error.
    InternalError,
    /// The functionality is not implemented.
    NotImplemented,
}

impl S3ErrorCode {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::NoSuchBucket | Self::NoSuchKey | Self::NoSuchUpload => 404,
            Self::BucketAlreadyExists => 409,
            Self::InvalidBucketName | Self::InvalidArgument => 400,
            Self::InvalidRange => 416,
            Self::InternalError => 500,
            Self::NotImplemented => 501,
        }
    }

    /// Returns the HTTP status code as an `http::StatusCode`.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(self.http_status())
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns the S3 error code string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchKey => "NoSuchKey",
            Self::NoSuchUpload => "NoSuchUpload",
            Self::BucketAlreadyExists => "BucketAlreadyExists",
            Self::InvalidBucketName => "InvalidBucketName",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidRange => "InvalidRange",
            Self::InternalError => "InternalError",
            Self::NotImplemented => "NotImplemented",
        }
    }
}

impl std::fmt::Display for S3ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during gateway operations.
///
/// Errors are never retried internally; each operation is a single RPC with
/// a fixed deadline or a single streaming call, and the first failure is
/// surfaced to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// The vbucket does not exist.
    #[error("bucket {0:?} not found")]
    BucketNotFound(String),

    /// The object record does not exist at the metadata service.
    #[error("object {bucket:?}/{object:?} not found")]
    ObjectNotFound {
        /// The vbucket name.
        bucket: String,
        /// The object key.
        object: String,
    },

    /// The multipart upload does not exist at the metadata service.
    #[error("upload {0:?} not found")]
    UploadNotFound(String),

    /// An internal inconsistency: a recorded pool, physical bucket or
    /// adapter could not be resolved.
    #[error("placement unresolved: {0}")]
    PlacementUnresolved(String),

    /// An error reported by a vendor SDK.
    #[error("backend error: {0}")]
    Backend(String),

    /// A non-OK status from MGS or MDS, or an RPC transport failure.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// The requested range is invalid or not supported by the backend.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// The completion ETag did not match the stat ETag after a multipart
    /// complete. The physical object is left behind for reconciliation.
    #[error("etag mismatch: completion etag {completion:?} != stat etag {stat:?}")]
    EtagMismatch {
        /// ETag reported by the completion response.
        completion: String,
        /// ETag reported by a subsequent stat of the physical object.
        stat: String,
    },

    /// The operation is deliberately unsupported.
    #[error("not implemented")]
    NotImplemented,

    /// A request parameter failed validation before any RPC was issued.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The bucket name failed validation.
    #[error("invalid bucket name {0:?}")]
    InvalidBucketName(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a backend error with a formatted message.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Shorthand for a metadata error with a formatted message.
    #[must_use]
    pub fn metadata(message: impl Into<String>) -> Self {
        Self::Metadata(message.into())
    }

    /// Maps this error to the S3 code the frontend should answer with.
    #[must_use]
    pub const fn s3_code(&self) -> S3ErrorCode {
        match self {
            Self::BucketNotFound(_) | Self::InvalidBucketName(_) => S3ErrorCode::NoSuchBucket,
            Self::ObjectNotFound { .. } => S3ErrorCode::NoSuchKey,
            Self::UploadNotFound(_) => S3ErrorCode::NoSuchUpload,
            Self::InvalidRange(_) => S3ErrorCode::InvalidRange,
            Self::NotImplemented => S3ErrorCode::NotImplemented,
            Self::InvalidArgument(_) => S3ErrorCode::InvalidArgument,
            Self::PlacementUnresolved(_)
            | Self::Backend(_)
            | Self::Metadata(_)
            | Self::EtagMismatch { .. }
            | Self::Io(_) => S3ErrorCode::InternalError,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.s3_code().http_status()
    }

    /// Whether this error means the addressed entity does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::BucketNotFound(_) | Self::ObjectNotFound { .. } | Self::UploadNotFound(_)
        )
    }
}
