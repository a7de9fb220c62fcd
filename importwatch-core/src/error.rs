//! Error types for importwatch-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::RecordId;

/// All errors that can arise from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure, with the path that was being touched.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse registry at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `update` was called for an id the store never assigned.
    #[error("record {id} not found")]
    RecordNotFound { id: RecordId },

    /// The record already carries a verdict and may not change again.
    #[error("record {id} is terminal and cannot be modified")]
    TerminalRecord { id: RecordId },

    /// A second record was requested for a file that is still being tracked.
    #[error("{file_name} is already tracked by record {id}")]
    AlreadyTracked { file_name: String, id: RecordId },

    /// An update tried to rewrite a field that is immutable or set-once.
    #[error("record {id}: field `{field}` cannot be changed once set")]
    ImmutableField { id: RecordId, field: &'static str },

    /// A verdict was supplied before the record was claimed.
    #[error("record {id}: a result requires date_checked to be set")]
    VerdictWithoutCheck { id: RecordId },
}

/// All errors that can arise while loading the service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration not found at {path}")]
    NotFound { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Neither `registry_path` nor a platform data directory is available.
    #[error("cannot determine a registry location; set `registry_path`")]
    NoRegistryPath,
}

/// Convenience constructor for [`RegistryError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.into(),
        source,
    }
}
