//! Error types for importwatch-artifacts.

use thiserror::Error;

/// Errors from report rendering. Artifact reads never produce one: an
/// unreadable artifact is an absent artifact.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),
}
