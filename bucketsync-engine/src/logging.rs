//! Default logging sink for callers that don't bring their own subscriber.
//!
//! The engine only ever logs through the `tracing::Dispatch` it was given,
//! so nothing here installs a global subscriber.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use thiserror::Error;
use tracing::Dispatch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Where the default sink writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    #[default]
    Stdout,
    /// A timestamped file under `logs/` in the working directory.
    File,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLogLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Builds the default dispatcher. `RUST_LOG` directives, when set, take
/// precedence over `level`.
pub fn build_dispatch(target: LogTarget, level: LogLevel) -> io::Result<Dispatch> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(level).into())
        .from_env_lossy();

    let dispatch = match target {
        LogTarget::Stdout => Dispatch::new(
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .finish(),
        ),
        LogTarget::File => {
            let path = log_file_path(Path::new("logs"))?;
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Dispatch::new(
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .finish(),
            )
        }
    };
    Ok(dispatch)
}

/// Creates `dir` if needed and returns a per-minute log file path inside it.
pub fn log_file_path(dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let name = Local::now().format("bucketsync_%d-%m-%Y_%H-%M.log").to_string();
    Ok(dir.join(name))
}
