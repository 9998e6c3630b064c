//! Object storage capability consumed by the engine.
//!
//! The engine never talks to a storage service directly. Whatever sits behind
//! this trait owns connection pooling, credentials and retry/backoff; the
//! engine only decides what to upload and records how it went.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by a storage backend after its own retries are exhausted.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("backend runtime error: {0}")]
    Runtime(String),
}

/// A remote object as returned by a listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

/// Content handed to [`StorageBackend::put`].
///
/// File bodies stay on disk; backends are expected to stream them. The path
/// is kept so a backend can reopen the file when a request is retried.
#[derive(Debug)]
pub enum ObjectBody {
    File {
        /// Already opened by the engine. Backends that stream from `path`
        /// may ignore it.
        file: File,
        path: PathBuf,
        len: u64,
    },
    Bytes(Vec<u8>),
}

impl ObjectBody {
    pub fn from_file(file: File, path: impl Into<PathBuf>, len: u64) -> Self {
        Self::File {
            file,
            path: path.into(),
            len,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }

    /// Length of the body in bytes.
    pub fn len(&self) -> u64 {
        match self {
            Self::File { len, .. } => *len,
            Self::Bytes(bytes) => bytes.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the whole body into memory. Meant for backends that keep objects
    /// in memory anyway; streaming backends should match on the variants.
    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        match self {
            Self::File { mut file, len, .. } => {
                let mut buf = Vec::with_capacity(len as usize);
                file.read_to_end(&mut buf)?;
                Ok(buf)
            }
            Self::Bytes(bytes) => Ok(bytes),
        }
    }
}

/// Blocking object storage operations used by the engine.
///
/// Implementations are shared across worker threads and must tolerate
/// concurrent calls.
pub trait StorageBackend: Send + Sync {
    /// Stores `body` under `key`, replacing any existing object.
    fn put(&self, key: &str, body: ObjectBody) -> BackendResult<()>;

    /// Returns true if an object with exactly this key exists.
    fn exists(&self, key: &str) -> BackendResult<bool>;

    /// Fetches a whole object, or `None` if the key does not exist.
    /// Only used for small engine-owned objects such as the progress snapshot.
    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>>;

    /// Lists every object under `prefix`, or the whole bucket when `None`.
    fn list_tree(&self, prefix: Option<&str>) -> BackendResult<Vec<ObjectEntry>>;

    /// Checks that the target bucket is reachable. Default: always OK.
    fn bucket_exists(&self) -> BackendResult<bool> {
        Ok(true)
    }
}
