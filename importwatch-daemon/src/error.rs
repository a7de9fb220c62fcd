use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the watcher service and its tasks.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("registry error: {0}")]
    Registry(#[from] importwatch_core::RegistryError),

    #[error("configuration error: {0}")]
    Config(#[from] importwatch_core::ConfigError),

    #[error("report error: {0}")]
    Report(#[from] importwatch_artifacts::ReportError),

    #[error("notification error: {0}")]
    Notification(#[from] importwatch_notify::NotifyError),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("watch folder {path} is not a directory")]
    WatchFolderMissing { path: PathBuf },

    #[error("watcher service is already running")]
    AlreadyRunning,

    #[error("{task} task join failure: {message}")]
    Join { task: &'static str, message: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
