//! WatcherService: the composition root.
//!
//! `Stopped --start()--> Running --stop()--> Stopped`. Starting wires the
//! registry task, the observer (with its filesystem watcher) and the
//! scheduler; stopping broadcasts shutdown and joins all three.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use notify::{recommended_watcher, Event, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use importwatch_artifacts::{ArtifactClassifier, ArtifactLayout};
use importwatch_core::{Config, RecordStore, YamlStore};
use importwatch_notify::{Dispatcher, Notifier};

use crate::error::DaemonError;
use crate::observer::{observer_task, FileEventObserver, NameFilter, StampedEvent};
use crate::registry_actor::{spawn_registry, RegistryHandle};
use crate::scheduler::{ReconciliationScheduler, SchedulerSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Running,
}

type TaskHandle = JoinHandle<Result<(), DaemonError>>;

struct Running {
    config: Config,
    registry: RegistryHandle,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<(&'static str, TaskHandle)>,
    registry_task: JoinHandle<()>,
}

pub struct WatcherService {
    config_path: PathBuf,
    running: Option<Running>,
}

impl WatcherService {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            running: None,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn state(&self) -> ServiceState {
        if self.running.is_some() {
            ServiceState::Running
        } else {
            ServiceState::Stopped
        }
    }

    /// Configuration in effect while running.
    pub fn config(&self) -> Option<&Config> {
        self.running.as_ref().map(|r| &r.config)
    }

    pub fn registry(&self) -> Option<RegistryHandle> {
        self.running.as_ref().map(|r| r.registry.clone())
    }

    /// Fires when any service task exits or [`stop`](Self::stop) is called.
    pub fn shutdown_signal(&self) -> Option<broadcast::Receiver<()>> {
        self.running.as_ref().map(|r| r.shutdown_tx.subscribe())
    }

    /// Load configuration and start with the YAML registry and the configured
    /// mail channel. On error the service stays stopped.
    pub async fn start(&mut self) -> Result<(), DaemonError> {
        if self.running.is_some() {
            return Err(DaemonError::AlreadyRunning);
        }
        let config = Config::load_at(&self.config_path)?;
        let registry_path = config.resolved_registry_path()?;
        let store = YamlStore::open_at(&registry_path)?;
        let dispatcher = Dispatcher::from_config(&config)?;
        tracing::info!(
            config = %self.config_path.display(),
            registry = %registry_path.display(),
            channel = dispatcher.channel(),
            "configuration loaded",
        );
        self.start_with(config, Box::new(store), dispatcher).await
    }

    /// Start with an explicit store and notifier.
    pub async fn start_with<N: Notifier>(
        &mut self,
        config: Config,
        store: Box<dyn RecordStore>,
        notifier: N,
    ) -> Result<(), DaemonError> {
        if self.running.is_some() {
            return Err(DaemonError::AlreadyRunning);
        }
        if !config.active_folder.is_dir() {
            return Err(DaemonError::WatchFolderMissing {
                path: config.active_folder.clone(),
            });
        }
        let classifier = Arc::new(ArtifactClassifier::new(ArtifactLayout::from_config(
            &config,
        ))?);

        // Arm the watcher before spawning anything so a failure leaves nothing behind.
        let (event_tx, event_rx) = mpsc::unbounded_channel::<StampedEvent>();
        let mut watcher = recommended_watcher(move |event: notify::Result<Event>| {
            let _ = event_tx.send((Utc::now(), event));
        })?;
        watcher.watch(&config.active_folder, RecursiveMode::NonRecursive)?;

        let (registry, registry_task) = spawn_registry(store);
        let (shutdown_tx, _) = broadcast::channel::<()>(16);

        let observer_handle = {
            let shutdown = shutdown_tx.clone();
            let shutdown_rx = shutdown.subscribe();
            let observer = FileEventObserver::new(registry.clone(), NameFilter::from_config(&config));
            tokio::spawn(async move {
                let result = observer_task(observer, watcher, event_rx, shutdown_rx).await;
                let _ = shutdown.send(());
                result
            })
        };

        let scheduler_handle = {
            let shutdown = shutdown_tx.clone();
            let shutdown_rx = shutdown.subscribe();
            let scheduler = ReconciliationScheduler::new(
                registry.clone(),
                classifier,
                Arc::new(notifier),
                SchedulerSettings::from_config(&config),
            );
            tokio::spawn(async move {
                let result = scheduler.run(shutdown_rx).await;
                let _ = shutdown.send(());
                result
            })
        };

        tracing::info!(
            folder = %config.active_folder.display(),
            interval_secs = config.wait_in_seconds,
            debounce_secs = config.debounce_seconds(),
            "watcher service started",
        );
        self.running = Some(Running {
            config,
            registry,
            shutdown_tx,
            tasks: vec![("observer", observer_handle), ("scheduler", scheduler_handle)],
            registry_task,
        });
        Ok(())
    }

    /// Stop observation and the scheduler, then shut the registry down after
    /// its queued commands. Calling it while stopped is a no-op.
    pub async fn stop(&mut self) -> Result<(), DaemonError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        let Running {
            registry,
            shutdown_tx,
            tasks,
            registry_task,
            ..
        } = running;
        let _ = shutdown_tx.send(());

        let mut first_error = None;
        for (name, handle) in tasks {
            if let Err(err) = handle_join(name, handle.await) {
                tracing::error!(task = name, error = %err, "task ended with error");
                first_error.get_or_insert(err);
            }
        }

        // Handles handed out by `registry()` may still be alive.
        registry.shutdown().await;
        drop(registry);
        if let Err(err) = registry_task.await {
            first_error.get_or_insert(DaemonError::Join {
                task: "registry",
                message: err.to_string(),
            });
        }
        tracing::info!("watcher service stopped");
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for WatcherService {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            let _ = running.shutdown_tx.send(());
        }
    }
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join {
            task,
            message: err.to_string(),
        }),
    }
}
