//! Engine configuration.

use crate::error::ConfigError;
use crate::filter::PathFilter;
use crate::keys::KeyMapper;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Worker count used when the host parallelism cannot be determined.
const FALLBACK_WORKERS: usize = 5;
/// Upper bound for the automatically chosen worker count.
const MAX_DEFAULT_WORKERS: usize = 8;

/// Retry strategy handed to the storage backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryMode {
    Standard,
    /// Standard retries plus client-side rate limiting with jitter.
    Adaptive,
}

/// Retry and timeout settings threaded through to the backend client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub mode: RetryMode,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            mode: RetryMode::Adaptive,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 20_000,
            connect_timeout_secs: 5,
            read_timeout_secs: 30,
        }
    }
}

impl RetryPolicy {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Periodic progress snapshot uploaded alongside the data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Object key of the snapshot, relative to the bucket root.
    pub filename: String,
    pub interval_secs: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            filename: "METADATA.json".to_string(),
            interval_secs: 300,
        }
    }
}

impl MetadataConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Configuration for one engine instance.
///
/// Defaults: dot files skipped, overwrite protection on, worker count
/// derived from the host's available parallelism.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Target bucket name.
    pub bucket: String,

    /// Local directory whose contents are mirrored into the bucket.
    pub upload_dir: PathBuf,

    /// Logical folder prepended to every object key.
    pub s3_prefix: Option<String>,

    /// Sub-path of `upload_dir` stripped from object keys. May be given
    /// relative to `upload_dir` or as an absolute path inside it.
    pub exclude_prefix: Option<PathBuf>,

    pub skip_dot_files: bool,

    /// When false, files whose key already exists remotely are skipped.
    pub overwrite: bool,

    /// File base names never uploaded.
    pub file_exclusion: BTreeSet<String>,

    /// Directory base names whose whole subtree is never uploaded.
    pub folder_exclusion: BTreeSet<String>,

    pub follow_symlinks: bool,

    /// Worker threads for parallel runs. `None` picks a host-based default.
    pub concurrency: Option<usize>,

    pub retry: RetryPolicy,

    pub metadata: Option<MetadataConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            upload_dir: PathBuf::new(),
            s3_prefix: None,
            exclude_prefix: None,
            skip_dot_files: true,
            overwrite: false,
            file_exclusion: BTreeSet::new(),
            folder_exclusion: BTreeSet::new(),
            follow_symlinks: false,
            concurrency: None,
            retry: RetryPolicy::default(),
            metadata: None,
        }
    }
}

impl EngineConfig {
    pub fn new(bucket: impl Into<String>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            bucket: bucket.into(),
            upload_dir: upload_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_s3_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.s3_prefix = Some(prefix.into());
        self
    }

    pub fn with_exclude_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.exclude_prefix = Some(prefix.into());
        self
    }

    pub fn with_skip_dot_files(mut self, skip: bool) -> Self {
        self.skip_dot_files = skip;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn exclude_file(mut self, name: impl Into<String>) -> Self {
        self.file_exclusion.insert(name.into());
        self
    }

    pub fn exclude_folder(mut self, name: impl Into<String>) -> Self {
        self.folder_exclusion.insert(name.into());
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = Some(workers);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataConfig) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Checks the configuration against the local filesystem and resolves
    /// the upload root and exclude-prefix into their canonical forms.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::MissingBucket);
        }
        if self.upload_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingUploadDir);
        }

        let metadata = fs::metadata(&self.upload_dir)
            .map_err(|_| ConfigError::UploadDirMissing(self.upload_dir.clone()))?;
        if !metadata.is_dir() {
            return Err(ConfigError::UploadDirNotDirectory(self.upload_dir.clone()));
        }
        let upload_dir = fs::canonicalize(&self.upload_dir)
            .map_err(|_| ConfigError::UploadDirMissing(self.upload_dir.clone()))?;

        let exclude_prefix = self
            .exclude_prefix
            .as_deref()
            .map(|prefix| resolve_exclude_prefix(&upload_dir, prefix))
            .transpose()?
            .filter(|prefix| !prefix.as_os_str().is_empty());

        let workers = match self.concurrency {
            Some(0) => return Err(ConfigError::InvalidConcurrency),
            Some(n) => n,
            None => default_workers(),
        };

        let filter = PathFilter::new(
            self.skip_dot_files,
            self.file_exclusion.clone(),
            self.folder_exclusion.clone(),
        );
        let mapper = KeyMapper::new(
            upload_dir.clone(),
            exclude_prefix.clone(),
            self.s3_prefix.as_deref(),
        );

        Ok(ValidatedConfig {
            config: Self {
                upload_dir,
                exclude_prefix,
                ..self.clone()
            },
            workers,
            filter,
            mapper,
        })
    }
}

/// Default pool size: host parallelism capped at [`MAX_DEFAULT_WORKERS`].
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get().min(MAX_DEFAULT_WORKERS))
        .unwrap_or(FALLBACK_WORKERS)
}

/// Turns a configured exclude-prefix into a path relative to `upload_dir`.
fn resolve_exclude_prefix(upload_dir: &Path, prefix: &Path) -> Result<PathBuf, ConfigError> {
    let outside = || ConfigError::ExcludePrefixOutsideRoot {
        prefix: prefix.to_path_buf(),
        upload_dir: upload_dir.to_path_buf(),
    };

    let relative = if prefix.is_absolute() {
        let canonical = fs::canonicalize(prefix)
            .map_err(|_| ConfigError::ExcludePrefixMissing(prefix.to_path_buf()))?;
        canonical
            .strip_prefix(upload_dir)
            .map_err(|_| outside())?
            .to_path_buf()
    } else {
        let mut relative = PathBuf::new();
        for component in prefix.components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                _ => return Err(outside()),
            }
        }
        relative
    };

    if !upload_dir.join(&relative).is_dir() {
        return Err(ConfigError::ExcludePrefixMissing(prefix.to_path_buf()));
    }
    Ok(relative)
}

/// Configuration that passed [`EngineConfig::validate`].
///
/// The upload root is absolute and canonical; the exclude-prefix, if any,
/// is relative to it.
#[derive(Clone, Debug)]
pub struct ValidatedConfig {
    config: EngineConfig,
    workers: usize,
    filter: PathFilter,
    mapper: KeyMapper,
}

impl ValidatedConfig {
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    pub fn upload_dir(&self) -> &Path {
        &self.config.upload_dir
    }

    pub fn exclude_prefix(&self) -> Option<&Path> {
        self.config.exclude_prefix.as_deref()
    }

    pub fn s3_prefix(&self) -> Option<&str> {
        self.config.s3_prefix.as_deref()
    }

    pub fn overwrite(&self) -> bool {
        self.config.overwrite
    }

    pub fn follow_symlinks(&self) -> bool {
        self.config.follow_symlinks
    }

    /// Resolved worker count for parallel runs.
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.config.retry
    }

    pub fn metadata(&self) -> Option<&MetadataConfig> {
        self.config.metadata.as_ref()
    }

    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    pub fn key_mapper(&self) -> &KeyMapper {
        &self.mapper
    }

    /// The normalized configuration this was built from.
    pub fn as_config(&self) -> &EngineConfig {
        &self.config
    }
}
