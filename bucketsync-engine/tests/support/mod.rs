//! Shared test helpers: an in-memory storage backend and temp-dir fixtures.

#![allow(dead_code)]

use bucketsync_engine::{BackendError, BackendResult, ObjectBody, ObjectEntry, StorageBackend};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

type Hook = Box<dyn Fn(&str) + Send + Sync>;

/// Thread-safe in-memory bucket with per-key failure injection.
///
/// Hooks run with the key before the matching operation does anything else.
#[derive(Default)]
pub struct MemoryBackend {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    history: Mutex<Vec<(String, Vec<u8>)>>,
    put_hook: Option<Hook>,
    exists_hook: Option<Hook>,
    fail_put: Mutex<HashSet<String>>,
    fail_exists: Mutex<HashSet<String>>,
    missing_bucket: bool,
    put_calls: AtomicUsize,
    exists_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_bucket() -> Self {
        Self {
            missing_bucket: true,
            ..Self::default()
        }
    }

    pub fn with_object(self, key: &str, data: &[u8]) -> Self {
        self.objects.lock().unwrap().insert(key.to_string(), data.to_vec());
        self
    }

    pub fn fail_put_on(self, key: &str) -> Self {
        self.fail_put.lock().unwrap().insert(key.to_string());
        self
    }

    pub fn fail_exists_on(self, key: &str) -> Self {
        self.fail_exists.lock().unwrap().insert(key.to_string());
        self
    }

    pub fn with_put_hook(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.put_hook = Some(Box::new(hook));
        self
    }

    pub fn with_exists_hook(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.exists_hook = Some(Box::new(hook));
        self
    }

    /// Every body successfully stored under `key`, oldest first.
    pub fn history(&self, key: &str) -> Vec<Vec<u8>> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, data)| data.clone())
            .collect()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }
}

impl StorageBackend for MemoryBackend {
    fn put(&self, key: &str, body: ObjectBody) -> BackendResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.put_hook {
            hook(key);
        }
        if self.fail_put.lock().unwrap().contains(key) {
            return Err(BackendError::Transfer(format!("injected failure for {key}")));
        }
        let data = body.into_bytes()?;
        self.history.lock().unwrap().push((key.to_string(), data.clone()));
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    fn exists(&self, key: &str) -> BackendResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.exists_hook {
            hook(key);
        }
        if self.fail_exists.lock().unwrap().contains(key) {
            return Err(BackendError::Transfer(format!("injected HEAD failure for {key}")));
        }
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    fn list_tree(&self, prefix: Option<&str>) -> BackendResult<Vec<ObjectEntry>> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .filter(|(key, _)| prefix.is_none_or(|p| key.starts_with(p)))
            .map(|(key, data)| ObjectEntry {
                key: key.clone(),
                size: data.len() as u64,
            })
            .collect())
    }

    fn bucket_exists(&self) -> BackendResult<bool> {
        Ok(!self.missing_bucket)
    }
}

/// Writes `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Temp directory populated with `(relative path, contents)` pairs.
pub fn fixture(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (relative, contents) in files {
        write_file(dir.path(), relative, contents);
    }
    dir
}
