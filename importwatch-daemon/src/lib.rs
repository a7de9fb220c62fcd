//! importwatch daemon runtime: registry task + file-event observer + reconciliation scheduler.

mod error;
pub mod observer;
pub mod registry_actor;
pub mod runtime;
pub mod scheduler;
pub mod service;

pub use error::DaemonError;
pub use observer::{FileEvent, FileEventKind, FileEventObserver, IgnoreReason, NameFilter, ObservedOutcome};
pub use registry_actor::{spawn_registry, RegistryHandle};
pub use runtime::{init_tracing, run, start_blocking, LogFormat};
pub use scheduler::{
    NotificationStatus, ReconcileOutcome, ReconcileStage, ReconciliationScheduler, RecordFailure,
    SchedulerSettings, TickReport,
};
pub use service::{ServiceState, WatcherService};
