use std::path::{Path, PathBuf};

use crate::error::{io_err, DaemonError};
use crate::service::WatcherService;

/// Log line format for the foreground service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Start the watcher service and block the current thread until it exits.
pub fn start_blocking(config_path: &Path, format: LogFormat) -> Result<(), DaemonError> {
    init_tracing(format);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config_path.to_path_buf()))
}

/// Run the service until ctrl-c or until one of its tasks exits.
pub async fn run(config_path: PathBuf) -> Result<(), DaemonError> {
    let mut service = WatcherService::new(config_path);
    if let Err(err) = service.start().await {
        tracing::error!(
            config = %service.config_path().display(),
            error = %err,
            "watcher service failed to start",
        );
        return Err(err);
    }

    let Some(mut shutdown_rx) = service.shutdown_signal() else {
        return Ok(());
    };
    tokio::select! {
        _ = shutdown_rx.recv() => {
            tracing::warn!("service task exited, shutting down");
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                tracing::error!(error = %err, "ctrl-c handler failed");
            } else {
                tracing::info!("received ctrl-c, shutting down");
            }
        }
    }
    service.stop().await
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
