use bucketsync_engine::logging::{LogLevel, LogTarget, build_dispatch, log_file_path};
use tracing::level_filters::LevelFilter;

#[test]
fn log_level_parses_case_insensitively() {
    assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
    assert_eq!("Info".parse::<LogLevel>().unwrap(), LogLevel::Info);
    assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
    assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
    assert_eq!(" error ".parse::<LogLevel>().unwrap(), LogLevel::Error);
}

#[test]
fn unknown_log_level_rejected() {
    let err = "verbose".parse::<LogLevel>().unwrap_err();
    assert_eq!(err.to_string(), "unknown log level: verbose");
}

#[test]
fn log_level_maps_to_filter() {
    assert_eq!(LevelFilter::from(LogLevel::Debug), LevelFilter::DEBUG);
    assert_eq!(LevelFilter::from(LogLevel::Warning), LevelFilter::WARN);
}

#[test]
fn defaults_are_stdout_and_debug() {
    assert_eq!(LogTarget::default(), LogTarget::Stdout);
    assert_eq!(LogLevel::default(), LogLevel::Debug);
}

#[test]
fn stdout_dispatch_builds() {
    let dispatch = build_dispatch(LogTarget::Stdout, LogLevel::Info).unwrap();
    tracing::dispatcher::with_default(&dispatch, || tracing::info!("dispatch is live"));
}

#[test]
fn log_file_path_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("logs");
    let path = log_file_path(&logs).unwrap();
    assert!(logs.is_dir());
    assert_eq!(path.parent().unwrap(), logs);
    let name = path.file_name().unwrap().to_string_lossy();
    assert!(name.starts_with("bucketsync_") && name.ends_with(".log"));
}
