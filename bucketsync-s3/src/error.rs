//! Errors raised while setting up the S3 transport.
//!
//! Per-request failures are reported as [`BackendError`] through the storage
//! trait; these only cover construction.
//!
//! [`BackendError`]: bucketsync_engine::BackendError

use thiserror::Error;

pub type S3Result<T> = Result<T, S3Error>;

#[derive(Debug, Error)]
pub enum S3Error {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("invalid S3 configuration: {0}")]
    Config(String),
}
