//! S3-compatible storage backend for the bucketsync engine.
//!
//! Wraps `aws-sdk-s3` behind the engine's blocking [`StorageBackend`] trait.
//! The SDK owns connection pooling, retries and timeouts; this crate only
//! wires configuration through and maps errors.
//!
//! [`StorageBackend`]: bucketsync_engine::StorageBackend

pub mod error;
pub mod options;
pub mod transport;

pub use error::{S3Error, S3Result};
pub use options::{S3Options, StaticCredentials};
pub use transport::S3Transport;
