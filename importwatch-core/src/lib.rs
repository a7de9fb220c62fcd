//! importwatch core library: domain types, registry persistence, configuration and errors.
//!
//! Public API surface:
//! - [`types`]: [`ImportRecord`] and its newtypes
//! - [`registry`]: the [`RecordStore`] contract plus YAML-file and in-memory stores
//! - [`config`]: service configuration load / validate
//! - [`error`]: [`RegistryError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use config::{Config, DbMailConfig, MailChannelKind, SmtpMailConfig};
pub use error::{ConfigError, RegistryError};
pub use registry::{MemoryStore, RecordStore, YamlStore};
pub use types::{ImportRecord, ImportResult, NewImport, RecordId, RecordState};
