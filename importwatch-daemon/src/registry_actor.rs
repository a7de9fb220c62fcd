//! Single owner of the [`RecordStore`].
//!
//! The observer and the scheduler never touch the store directly. They send
//! commands through a [`RegistryHandle`]; one blocking task applies them in
//! arrival order, so no two mutations ever interleave.

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use importwatch_core::{ImportRecord, NewImport, RecordStore, RegistryError};

use crate::error::DaemonError;

const QUEUE_DEPTH: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, RegistryError>>;

enum RegistryCommand {
    Create {
        new: NewImport,
        respond_to: Reply<ImportRecord>,
    },
    Update {
        record: ImportRecord,
        respond_to: Reply<ImportRecord>,
    },
    FindByFileName {
        file_name: String,
        respond_to: Reply<Option<ImportRecord>>,
    },
    FindEligible {
        debounce_seconds: u64,
        now: DateTime<Utc>,
        respond_to: Reply<Vec<ImportRecord>>,
    },
    List {
        respond_to: Reply<Vec<ImportRecord>>,
    },
    /// Stop serving; later requests see a closed channel.
    Shutdown,
}

/// Cloneable client of the registry task.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    tx: mpsc::Sender<RegistryCommand>,
}

impl std::fmt::Debug for RegistryCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RegistryCommand::Create { .. } => "Create",
            RegistryCommand::Update { .. } => "Update",
            RegistryCommand::FindByFileName { .. } => "FindByFileName",
            RegistryCommand::FindEligible { .. } => "FindEligible",
            RegistryCommand::List { .. } => "List",
            RegistryCommand::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

/// Move `store` onto a blocking task and return a handle to it.
///
/// The task ends on [`RegistryHandle::shutdown`] or once every handle has
/// been dropped.
pub fn spawn_registry(store: Box<dyn RecordStore>) -> (RegistryHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    let task = tokio::task::spawn_blocking(move || registry_loop(store, rx));
    (RegistryHandle { tx }, task)
}

fn registry_loop(mut store: Box<dyn RecordStore>, mut rx: mpsc::Receiver<RegistryCommand>) {
    // A dropped reply means the caller was cancelled; the mutation still stands.
    while let Some(command) = rx.blocking_recv() {
        match command {
            RegistryCommand::Create { new, respond_to } => {
                let _ = respond_to.send(store.create(new));
            }
            RegistryCommand::Update { record, respond_to } => {
                let _ = respond_to.send(store.update(&record));
            }
            RegistryCommand::FindByFileName {
                file_name,
                respond_to,
            } => {
                let _ = respond_to.send(store.find_by_file_name(&file_name));
            }
            RegistryCommand::FindEligible {
                debounce_seconds,
                now,
                respond_to,
            } => {
                let _ = respond_to.send(store.find_eligible(debounce_seconds, now));
            }
            RegistryCommand::List { respond_to } => {
                let _ = respond_to.send(store.list());
            }
            RegistryCommand::Shutdown => break,
        }
    }
    tracing::debug!("registry task exiting");
}

impl RegistryHandle {
    pub async fn create(&self, new: NewImport) -> Result<ImportRecord, DaemonError> {
        self.request(|respond_to| RegistryCommand::Create { new, respond_to })
            .await
    }

    pub async fn update(&self, record: ImportRecord) -> Result<ImportRecord, DaemonError> {
        self.request(|respond_to| RegistryCommand::Update { record, respond_to })
            .await
    }

    pub async fn find_by_file_name(
        &self,
        file_name: &str,
    ) -> Result<Option<ImportRecord>, DaemonError> {
        let file_name = file_name.to_owned();
        self.request(|respond_to| RegistryCommand::FindByFileName {
            file_name,
            respond_to,
        })
        .await
    }

    pub async fn find_eligible(
        &self,
        debounce_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ImportRecord>, DaemonError> {
        self.request(|respond_to| RegistryCommand::FindEligible {
            debounce_seconds,
            now,
            respond_to,
        })
        .await
    }

    pub async fn list(&self) -> Result<Vec<ImportRecord>, DaemonError> {
        self.request(|respond_to| RegistryCommand::List { respond_to })
            .await
    }

    /// Ask the registry task to exit after the commands already queued.
    /// Handles still held elsewhere get `ChannelClosed` from then on.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(RegistryCommand::Shutdown).await;
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> RegistryCommand,
    ) -> Result<T, DaemonError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(command(tx))
            .await
            .map_err(|_| DaemonError::ChannelClosed("registry queue"))?;
        let outcome = rx
            .await
            .map_err(|_| DaemonError::ChannelClosed("registry response"))?;
        Ok(outcome?)
    }
}
