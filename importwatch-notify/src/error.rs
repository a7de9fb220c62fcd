//! Error types for importwatch-notify.

use thiserror::Error;

/// Why a notification was not delivered.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification has no recipients")]
    NoRecipients,

    #[error("invalid mail address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("mail relay database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("'{0}' is not a valid stored procedure name")]
    InvalidProcedure(String),

    /// The configured channel has no connection section.
    #[error("mail channel {0} is selected but not configured")]
    MissingChannelConfig(&'static str),
}
