//! # importwatch-notify
//!
//! Failure notifications over one of two mail channels, chosen once from
//! configuration:
//!
//! - [`DbMailNotifier`]: calls a stored procedure on a mail-relay database
//! - [`SmtpNotifier`]: talks to an SMTP server directly
//!
//! Both implement [`Notifier`]; [`Dispatcher`] is the configured choice.

pub mod dbmail;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod smtp;

pub use dbmail::DbMailNotifier;
pub use dispatcher::{Dispatcher, Notifier};
pub use error::NotifyError;
pub use message::Notification;
pub use smtp::SmtpNotifier;
