//! Directory-to-bucket synchronization engine.
//!
//! Mirrors a local directory tree into an object storage bucket:
//! - Path filtering (dot files, file/folder exclusions) with subtree pruning
//! - Object key derivation with exclude-prefix stripping and a destination prefix
//! - Overwrite protection via a per-key existence check
//! - Sequential and bounded worker-pool upload modes
//! - Periodic progress metadata snapshots
//! - Tree rendering of remote keys
//!
//! Storage access goes through the [`StorageBackend`] trait.

pub mod backend;
pub mod config;
pub mod error;
pub mod executor;
pub mod filter;
pub mod gate;
pub mod keys;
pub mod logging;
pub mod progress;
pub mod result;
pub mod tree;
pub mod walker;

pub use backend::{BackendError, BackendResult, ObjectBody, ObjectEntry, StorageBackend};
pub use config::{EngineConfig, MetadataConfig, RetryMode, RetryPolicy, ValidatedConfig};
pub use error::{ConfigError, EngineError, EngineResult, KeyError};
pub use executor::Engine;
pub use result::{FailureKind, ObjectRecord, UploadFailure, UploadResult, UploadTask};
