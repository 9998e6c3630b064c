//! Upload executor.
//!
//! Both entry points share one per-file pipeline:
//! walk → filter → key mapping → existence gate → streamed transfer.
//!
//! `run` processes files one at a time on the calling thread.
//! `run_in_parallel` hands them to a fixed pool of worker threads over a
//! bounded channel. In both modes the walk and key planning finish on the
//! calling thread before the first upload starts.
//! Workers report outcomes over a second channel; nothing else is shared.

use crate::backend::{ObjectBody, StorageBackend};
use crate::config::{EngineConfig, ValidatedConfig};
use crate::error::{ConfigError, EngineError, EngineResult};
use crate::gate::ExistenceGate;
use crate::progress::{MetadataReporter, Progress, snapshot_key_writable};
use crate::result::{FailureKind, ObjectRecord, TaskOutcome, UploadFailure, UploadResult, UploadTask};
use crate::tree::render_tree;
use crate::walker::{Candidate, Walker};
use crossbeam_channel::{bounded, unbounded};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{Dispatch, debug, error, info, info_span, warn};
use uuid::Uuid;

/// Tasks buffered per worker before the planner blocks.
const QUEUE_DEPTH_PER_WORKER: usize = 2;

/// Directory-to-bucket synchronization engine.
pub struct Engine {
    config: ValidatedConfig,
    backend: Arc<dyn StorageBackend>,
    dispatch: Dispatch,
}

impl Engine {
    /// Validates `config` and binds it to `backend`.
    ///
    /// Logging goes to whatever dispatcher is the default on the calling
    /// thread at construction time; see [`Engine::with_dispatch`].
    pub fn new(config: EngineConfig, backend: Arc<dyn StorageBackend>) -> EngineResult<Self> {
        let config = config.validate()?;
        let dispatch = tracing::dispatcher::get_default(Dispatch::clone);
        Ok(Self {
            config,
            backend,
            dispatch,
        })
    }

    /// Routes this engine's logs (including worker threads) to `dispatch`.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Uploads every eligible file sequentially.
    pub fn run(&self) -> EngineResult<UploadResult> {
        tracing::dispatcher::with_default(&self.dispatch, || self.run_sequential())
    }

    /// Uploads every eligible file using the bounded worker pool.
    pub fn run_in_parallel(&self) -> EngineResult<UploadResult> {
        tracing::dispatcher::with_default(&self.dispatch, || self.run_pooled())
    }

    /// Renders the remote objects under `prefix` as an indented tree.
    pub fn render_tree(&self, prefix: Option<&str>) -> EngineResult<String> {
        tracing::dispatcher::with_default(&self.dispatch, || {
            let entries = self.backend.list_tree(prefix)?;
            debug!(count = entries.len(), prefix = ?prefix, "listed remote objects");
            Ok(render_tree(entries.iter().map(|entry| entry.key.as_str())))
        })
    }

    /// Prints [`Engine::render_tree`] to stdout.
    pub fn print_tree(&self, prefix: Option<&str>) -> EngineResult<()> {
        let rendered = self.render_tree(prefix)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    fn run_sequential(&self) -> EngineResult<UploadResult> {
        let mut run = self.begin("sequential")?;
        let span = info_span!("upload", run_id = %run.result.run_id, mode = "sequential");
        let _guard = span.enter();

        info!(
            "files from '{}' will be uploaded to '{}' sequentially",
            self.config.upload_dir().display(),
            self.config.bucket()
        );

        let tasks = self.plan(&mut run);
        self.start_reporter(&mut run)?;
        for task in &tasks {
            let outcome = self.process(task, &run.progress);
            run.result.record(outcome);
        }

        Ok(run.complete())
    }

    fn run_pooled(&self) -> EngineResult<UploadResult> {
        let mut run = self.begin("parallel")?;
        let workers = self.config.workers();
        let span = info_span!("upload", run_id = %run.result.run_id, mode = "parallel", workers);
        let _guard = span.enter();

        info!(
            "files from '{}' will be uploaded to '{}' with maximum concurrency of {workers}",
            self.config.upload_dir().display(),
            self.config.bucket()
        );

        let tasks = self.plan(&mut run);
        self.start_reporter(&mut run)?;

        let (outcome_tx, outcome_rx) = unbounded::<TaskOutcome>();
        let progress = &run.progress;

        thread::scope(|scope| -> EngineResult<()> {
            let (task_tx, task_rx) = bounded::<UploadTask>(workers * QUEUE_DEPTH_PER_WORKER);

            for id in 0..workers {
                let task_rx = task_rx.clone();
                let outcome_tx = outcome_tx.clone();
                let span = span.clone();
                thread::Builder::new()
                    .name(format!("bucketsync-worker-{id}"))
                    .spawn_scoped(scope, move || {
                        tracing::dispatcher::with_default(&self.dispatch, || {
                            let _guard = span.enter();
                            for task in task_rx {
                                let outcome = self.process(&task, progress);
                                if outcome_tx.send(outcome).is_err() {
                                    break;
                                }
                            }
                        })
                    })
                    .map_err(EngineError::WorkerPool)?;
            }
            drop(task_rx);
            drop(outcome_tx);

            for task in tasks {
                if task_tx.send(task).is_err() {
                    // Every worker is gone; nothing left to hand work to.
                    error!("worker pool shut down before all tasks were scheduled");
                    break;
                }
            }
            Ok(())
        })?;

        for outcome in outcome_rx {
            run.result.record(outcome);
        }

        Ok(run.complete())
    }

    /// Drains the walk into a task list before anything is uploaded, so the
    /// progress counters hold the whole workload from the first snapshot on.
    /// Walk, key and collision failures go straight into the result.
    fn plan(&self, run: &mut Run) -> Vec<UploadTask> {
        let mut planner = Planner::new(&self.config);
        let mut walker = self.walker();
        let mut tasks = Vec::new();
        for item in walker.by_ref() {
            match planner.plan(item) {
                Ok(task) => {
                    run.progress.discover(task.size);
                    tasks.push(task);
                }
                Err(failure) => run.result.record(TaskOutcome::Failed(failure)),
            }
        }
        run.result.filtered = walker.filtered();
        debug!(tasks = tasks.len(), filtered = run.result.filtered, "walk planned");
        tasks
    }

    /// Starts the metadata reporter, unless none is configured or its key
    /// belongs to somebody else.
    fn start_reporter(&self, run: &mut Run) -> EngineResult<()> {
        let Some(metadata) = self.config.metadata() else {
            return Ok(());
        };
        if !snapshot_key_writable(
            self.backend.as_ref(),
            &metadata.filename,
            self.config.overwrite(),
        ) {
            return Ok(());
        }

        let reporter = MetadataReporter::spawn(
            Arc::clone(&self.backend),
            Arc::clone(&run.progress),
            metadata,
            self.dispatch.clone(),
        )
        .map_err(EngineError::WorkerPool)?;
        run.reporter = Some(reporter);
        Ok(())
    }

    /// Runs the gate and the transfer for one task.
    fn process(&self, task: &UploadTask, progress: &Progress) -> TaskOutcome {
        let gate = ExistenceGate::new(self.backend.as_ref(), self.config.overwrite());
        match gate.should_skip(&task.key) {
            Ok(true) => {
                info!(key = %task.key, "object exists, skipping");
                progress.settle(task.size);
                return TaskOutcome::Skipped(task.record(task.size));
            }
            Ok(false) => {}
            Err(e) => {
                warn!(key = %task.key, "existence check failed: {e}");
                return TaskOutcome::Failed(task.failure(FailureKind::ExistenceCheck, e));
            }
        }

        let (file, len) = match open_for_upload(task) {
            Ok(opened) => opened,
            Err(e) => {
                warn!(path = %task.path.display(), "cannot read file: {e}");
                return TaskOutcome::Failed(task.failure(FailureKind::Read, e));
            }
        };

        match self.backend.put(&task.key, ObjectBody::from_file(file, &task.path, len)) {
            Ok(()) => {
                debug!(key = %task.key, bytes = len, "uploaded");
                progress.settle(len);
                TaskOutcome::Uploaded(task.record(len))
            }
            Err(e) => {
                error!(key = %task.key, "upload failed: {e}");
                TaskOutcome::Failed(task.failure(FailureKind::Transfer, e))
            }
        }
    }

    fn walker(&self) -> Walker<'_> {
        Walker::new(
            self.config.upload_dir(),
            self.config.filter(),
            self.config.follow_symlinks(),
        )
    }

    /// Preflight checks, then fresh counters for the run.
    fn begin(&self, mode: &'static str) -> EngineResult<Run> {
        let upload_dir = self.config.upload_dir();
        if !upload_dir.is_dir() {
            return Err(ConfigError::UploadDirMissing(upload_dir.to_path_buf()).into());
        }
        match self.backend.bucket_exists() {
            Ok(true) => {}
            Ok(false) => {
                return Err(ConfigError::BucketNotFound(self.config.bucket().to_string()).into());
            }
            Err(e) => return Err(ConfigError::Preflight(e).into()),
        }

        let run_id = Uuid::now_v7();
        debug!(%run_id, mode, "starting run");
        Ok(Run {
            result: UploadResult::new(run_id),
            progress: Arc::new(Progress::new()),
            reporter: None,
            started: Instant::now(),
        })
    }
}

/// Mutable state of one run, owned by the calling thread.
struct Run {
    result: UploadResult,
    progress: Arc<Progress>,
    reporter: Option<MetadataReporter>,
    started: Instant,
}

impl Run {
    fn complete(mut self) -> UploadResult {
        if let Some(reporter) = self.reporter.take() {
            reporter.finish();
        }
        self.result.elapsed = self.started.elapsed();

        let result = self.result;
        let success = result.uploaded_count();
        let failed = result.failed_count();
        if success + result.skipped_count() + failed == 0 {
            warn!("no files found to upload");
        }
        info!(
            "Total number of uploads: {}, skipped: {}, success: {success}, failed: {failed}",
            success + failed,
            result.skipped_count(),
        );
        info!("Run time: {:.2?}", result.elapsed);
        result
    }
}

/// Turns walker output into tasks, enforcing one file per key.
struct Planner<'a> {
    config: &'a ValidatedConfig,
    claimed: HashMap<String, PathBuf>,
    /// Key written by the metadata reporter; no file may take it.
    reserved: Option<&'a str>,
}

impl<'a> Planner<'a> {
    fn new(config: &'a ValidatedConfig) -> Self {
        Self {
            config,
            claimed: HashMap::new(),
            reserved: config.metadata().map(|metadata| metadata.filename.as_str()),
        }
    }

    fn plan(&mut self, item: Result<Candidate, walkdir::Error>) -> Result<UploadTask, UploadFailure> {
        let candidate = item.map_err(|e| {
            warn!("directory walk error: {e}");
            UploadFailure {
                path: e.path().map(PathBuf::from).unwrap_or_default(),
                key: None,
                kind: FailureKind::Walk,
                message: e.to_string(),
            }
        })?;

        let key = self
            .config
            .key_mapper()
            .to_object_key(&candidate.path)
            .map_err(|e| {
                warn!(path = %candidate.path.display(), "cannot derive object key: {e}");
                UploadFailure {
                    path: candidate.path.clone(),
                    key: None,
                    kind: FailureKind::Key,
                    message: e.to_string(),
                }
            })?;

        if self.reserved == Some(key.as_str()) {
            warn!(
                key = %key,
                path = %candidate.path.display(),
                "object key is reserved for the progress snapshot"
            );
            return Err(UploadFailure {
                message: format!("object key {key} is reserved for the progress snapshot"),
                path: candidate.path,
                key: Some(key),
                kind: FailureKind::KeyCollision,
            });
        }

        if let Some(owner) = self.claimed.get(&key) {
            warn!(
                key = %key,
                path = %candidate.path.display(),
                "object key already claimed by {}",
                owner.display()
            );
            return Err(UploadFailure {
                message: format!("object key {key} already claimed by {}", owner.display()),
                path: candidate.path,
                key: Some(key),
                kind: FailureKind::KeyCollision,
            });
        }
        self.claimed.insert(key.clone(), candidate.path.clone());

        Ok(UploadTask {
            path: candidate.path,
            key,
            size: candidate.size,
        })
    }
}

impl UploadTask {
    fn record(&self, size: u64) -> ObjectRecord {
        ObjectRecord {
            path: self.path.clone(),
            key: self.key.clone(),
            size,
        }
    }

    fn failure(&self, kind: FailureKind, error: impl std::fmt::Display) -> UploadFailure {
        UploadFailure {
            path: self.path.clone(),
            key: Some(self.key.clone()),
            kind,
            message: error.to_string(),
        }
    }
}

/// Opens the file and reads its current length; it may have changed since the walk.
fn open_for_upload(task: &UploadTask) -> io::Result<(File, u64)> {
    let file = File::open(&task.path)?;
    let len = file.metadata()?.len();
    Ok((file, len))
}
