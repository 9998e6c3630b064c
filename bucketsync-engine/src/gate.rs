//! Overwrite protection.
//!
//! The existence check and the following upload are two separate backend
//! calls. Another writer can create the same key in between; the backend
//! offers no conditional put at this layer, so that race is accepted.

use crate::backend::{BackendResult, StorageBackend};

/// Decides whether an upload should be skipped because the key is taken.
pub struct ExistenceGate<'a> {
    backend: &'a dyn StorageBackend,
    overwrite: bool,
}

impl<'a> ExistenceGate<'a> {
    pub fn new(backend: &'a dyn StorageBackend, overwrite: bool) -> Self {
        Self { backend, overwrite }
    }

    /// Never queries the backend when overwriting is allowed. A failed query
    /// is returned as an error rather than treated as "absent".
    pub fn should_skip(&self, key: &str) -> BackendResult<bool> {
        if self.overwrite {
            return Ok(false);
        }
        self.backend.exists(key)
    }
}
