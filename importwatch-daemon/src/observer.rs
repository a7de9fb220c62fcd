//! FileEventObserver: turns filesystem notifications into registry mutations.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use tokio::sync::{broadcast, mpsc};

use importwatch_core::{Config, ImportRecord, NewImport, RegistryError};

use crate::error::DaemonError;
use crate::registry_actor::RegistryHandle;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    Deleted,
}

/// One create/delete observation for a file in the watched folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub kind: FileEventKind,
    pub file_name: String,
    pub at: DateTime<Utc>,
}

impl FileEvent {
    pub fn created(file_name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind: FileEventKind::Created,
            file_name: file_name.into(),
            at,
        }
    }

    pub fn deleted(file_name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind: FileEventKind::Deleted,
            file_name: file_name.into(),
            at,
        }
    }
}

/// Map a raw notify event to create/delete observations.
///
/// Renames count as a delete of the old name and a create of the new one.
pub fn file_events(event: &Event) -> Vec<(FileEventKind, PathBuf)> {
    match &event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .iter()
            .map(|p| (FileEventKind::Created, p.clone()))
            .collect(),
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .iter()
            .map(|p| (FileEventKind::Deleted, p.clone()))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => vec![
            (FileEventKind::Deleted, event.paths[0].clone()),
            (FileEventKind::Created, event.paths[1].clone()),
        ],
        _ => vec![],
    }
}

// ---------------------------------------------------------------------------
// Name filter
// ---------------------------------------------------------------------------

/// `<prefix>*.<extension>`, compared byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFilter {
    pub prefix: String,
    pub extension: String,
}

impl NameFilter {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.file_prefix, &config.file_extension)
    }

    pub fn matches(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.prefix)
            && Path::new(file_name)
                .extension()
                .is_some_and(|ext| ext.to_string_lossy() == self.extension.as_str())
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Name does not match the watch pattern.
    NameFiltered,
    /// Created for a name that already has an open record.
    AlreadyTracked,
    /// Deleted for a name with no open record.
    NotTracked,
}

/// What handling one [`FileEvent`] did to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedOutcome {
    Tracked(ImportRecord),
    MarkedDeleted(ImportRecord),
    Ignored {
        file_name: String,
        reason: IgnoreReason,
    },
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileEventObserver {
    registry: RegistryHandle,
    filter: NameFilter,
}

impl FileEventObserver {
    pub fn new(registry: RegistryHandle, filter: NameFilter) -> Self {
        Self { registry, filter }
    }

    pub fn filter(&self) -> &NameFilter {
        &self.filter
    }

    /// Apply one event. Registry failures are returned, not retried.
    pub async fn handle(&self, event: FileEvent) -> Result<ObservedOutcome, DaemonError> {
        if !self.filter.matches(&event.file_name) {
            return Ok(ignored(event.file_name, IgnoreReason::NameFiltered));
        }
        match event.kind {
            FileEventKind::Created => {
                match self
                    .registry
                    .create(NewImport::new(&event.file_name, event.at))
                    .await
                {
                    Ok(record) => Ok(ObservedOutcome::Tracked(record)),
                    Err(DaemonError::Registry(RegistryError::AlreadyTracked { .. })) => {
                        Ok(ignored(event.file_name, IgnoreReason::AlreadyTracked))
                    }
                    Err(err) => Err(err),
                }
            }
            FileEventKind::Deleted => {
                let Some(mut record) = self.registry.find_by_file_name(&event.file_name).await?
                else {
                    return Ok(ignored(event.file_name, IgnoreReason::NotTracked));
                };
                // Clock skew between create and delete must not invert the order.
                record.date_deleted = Some(event.at.max(record.date_created));
                let record = self.registry.update(record).await?;
                Ok(ObservedOutcome::MarkedDeleted(record))
            }
        }
    }
}

fn ignored(file_name: String, reason: IgnoreReason) -> ObservedOutcome {
    ObservedOutcome::Ignored { file_name, reason }
}

/// A watcher event with the time the watcher callback saw it.
pub(crate) type StampedEvent = (DateTime<Utc>, notify::Result<Event>);

/// Drain watcher events until shutdown. Owns the watcher so that dropping the
/// task stops observation.
pub(crate) async fn observer_task<W: Send + 'static>(
    observer: FileEventObserver,
    _watcher: W,
    mut event_rx: mpsc::UnboundedReceiver<StampedEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = event_rx.recv() => {
                let Some((at, event)) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                for (kind, path) in file_events(&event) {
                    let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                        continue;
                    };
                    let file_event = FileEvent { kind, file_name, at };
                    log_outcome(&file_event, observer.handle(file_event.clone()).await);
                }
            }
        }
    }
    Ok(())
}

fn log_outcome(event: &FileEvent, outcome: Result<ObservedOutcome, DaemonError>) {
    match outcome {
        Ok(ObservedOutcome::Tracked(record)) => {
            tracing::info!(file_name = %record.file_name, record_id = record.id.0, "tracking new batch file");
        }
        Ok(ObservedOutcome::MarkedDeleted(record)) => {
            tracing::info!(file_name = %record.file_name, record_id = record.id.0, "batch file deleted, awaiting check");
        }
        Ok(ObservedOutcome::Ignored { file_name, reason }) => {
            tracing::debug!(file_name = %file_name, reason = ?reason, "file event ignored");
        }
        Err(err) => {
            tracing::error!(file_name = %event.file_name, kind = ?event.kind, error = %err, "file event dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
