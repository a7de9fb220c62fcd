//! The [`Notifier`] seam and the configured [`Dispatcher`].

use std::future::Future;

use importwatch_core::{Config, MailChannelKind};

use crate::dbmail::DbMailNotifier;
use crate::error::NotifyError;
use crate::message::Notification;
use crate::smtp::SmtpNotifier;

/// Something that can deliver a [`Notification`].
///
/// Implementations report delivery failures as errors and never panic; the
/// caller decides whether to log, ignore, or alert.
pub trait Notifier: Send + Sync + 'static {
    /// Short channel label for logs.
    fn channel(&self) -> &'static str;

    fn send(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Mail channel selected by `default_mail`, built once at startup.
#[derive(Debug, Clone)]
pub enum Dispatcher {
    DbMail(DbMailNotifier),
    Smtp(SmtpNotifier),
}

impl Dispatcher {
    pub fn from_config(config: &Config) -> Result<Self, NotifyError> {
        match config.default_mail {
            MailChannelKind::DbMail => {
                let db = config
                    .db_mail
                    .clone()
                    .ok_or(NotifyError::MissingChannelConfig("db_mail"))?;
                Ok(Dispatcher::DbMail(DbMailNotifier::new(db)?))
            }
            MailChannelKind::Smtp => {
                let smtp = config
                    .smtp_mail
                    .clone()
                    .ok_or(NotifyError::MissingChannelConfig("smtp"))?;
                Ok(Dispatcher::Smtp(SmtpNotifier::new(smtp)))
            }
        }
    }
}

impl Notifier for Dispatcher {
    fn channel(&self) -> &'static str {
        match self {
            Dispatcher::DbMail(_) => "db_mail",
            Dispatcher::Smtp(_) => "smtp",
        }
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        match self {
            Dispatcher::DbMail(notifier) => notifier.send(notification).await,
            Dispatcher::Smtp(notifier) => notifier.send(notification).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use importwatch_core::{DbMailConfig, SmtpMailConfig};
    use std::path::PathBuf;

    fn config(kind: MailChannelKind) -> Config {
        Config {
            wait_in_seconds: 10,
            debounce_seconds: None,
            initial_delay_ms: 1_000,
            active_folder: PathBuf::from("/in"),
            error_folder: PathBuf::from("/err"),
            summary_folder: PathBuf::from("/sum"),
            registry_path: None,
            file_prefix: "WOH".into(),
            file_extension: "txt".into(),
            summary_extension: "sum".into(),
            error_extension: "err".into(),
            success_marker: "<order_number 1>".into(),
            email_tos: vec!["ops@example.com".into()],
            reply_to: None,
            default_mail: kind,
            db_mail: Some(DbMailConfig {
                url: "postgres://localhost/mail".into(),
                stored_procedure: "sp_send_dbmail".into(),
                profile: "ops".into(),
                ..DbMailConfig::default()
            }),
            smtp_mail: Some(SmtpMailConfig {
                smtp_host: "localhost".into(),
                smtp_port: 25,
                smtp_user: String::new(),
                smtp_pass: String::new(),
                enable_ssl: false,
                email_from: "w@example.com".into(),
            }),
        }
    }

    #[test]
    fn default_mail_selects_the_channel() {
        let db = Dispatcher::from_config(&config(MailChannelKind::DbMail)).expect("db");
        assert_eq!(db.channel(), "db_mail");
        let smtp = Dispatcher::from_config(&config(MailChannelKind::Smtp)).expect("smtp");
        assert_eq!(smtp.channel(), "smtp");
    }

    #[test]
    fn selected_channel_without_section_fails() {
        let mut cfg = config(MailChannelKind::Smtp);
        cfg.smtp_mail = None;
        let err = Dispatcher::from_config(&cfg).unwrap_err();
        assert!(matches!(err, NotifyError::MissingChannelConfig("smtp")));
    }
}
