//! Engine error types.

use crate::backend::BackendError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine entry points.
pub type EngineResult<T> = Result<T, EngineError>;

/// Fatal configuration problems, raised before any file is traversed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot proceed without a bucket name")]
    MissingBucket,

    #[error("cannot proceed without an upload directory")]
    MissingUploadDir,

    #[error("upload directory not found: {}", .0.display())]
    UploadDirMissing(PathBuf),

    #[error("upload path is not a directory: {}", .0.display())]
    UploadDirNotDirectory(PathBuf),

    #[error(
        "exclude prefix {} is not part of upload directory {}",
        .prefix.display(),
        .upload_dir.display()
    )]
    ExcludePrefixOutsideRoot { prefix: PathBuf, upload_dir: PathBuf },

    #[error("exclude prefix not found under upload directory: {}", .0.display())]
    ExcludePrefixMissing(PathBuf),

    #[error("worker concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("bucket {0} was not found")]
    BucketNotFound(String),

    #[error("preflight check failed: {0}")]
    Preflight(#[from] BackendError),
}

/// Reasons a local path cannot be turned into an object key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("{} is not under the upload directory", .0.display())]
    OutsideRoot(PathBuf),

    #[error("path contains a component that is not valid UTF-8: {}", .0.display())]
    NonUtf8(PathBuf),

    #[error("path {} maps to an empty object key", .0.display())]
    Empty(PathBuf),
}

/// Errors surfaced by the engine's public operations.
///
/// Per-file problems never show up here; they are collected in
/// [`UploadResult::failures`](crate::result::UploadResult::failures).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to start worker thread: {0}")]
    WorkerPool(#[source] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
