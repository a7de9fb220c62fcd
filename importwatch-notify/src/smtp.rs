//! Direct SMTP delivery through lettre's tokio transport.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use importwatch_core::SmtpMailConfig;

use crate::error::NotifyError;
use crate::message::Notification;

#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    config: SmtpMailConfig,
}

impl SmtpNotifier {
    pub fn new(config: SmtpMailConfig) -> Self {
        Self { config }
    }

    /// From/To/Subject/HTML body (+ Reply-To when set).
    pub fn build_message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        if notification.recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }
        let mut builder = Message::builder()
            .from(mailbox(&self.config.email_from)?)
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_HTML);
        for to in &notification.recipients {
            builder = builder.to(mailbox(to)?);
        }
        if let Some(reply_to) = &notification.reply_to {
            builder = builder.reply_to(mailbox(reply_to)?);
        }
        Ok(builder.body(notification.html_body.clone())?)
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
        let builder = if self.config.enable_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host)
        };
        let mut builder = builder.port(self.config.smtp_port);
        if !self.config.smtp_user.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.smtp_user.clone(),
                self.config.smtp_pass.clone(),
            ));
        }
        Ok(builder.build())
    }

    pub async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let message = self.build_message(notification)?;
        let response = self.transport()?.send(message).await?;
        tracing::debug!(code = %response.code(), "smtp server accepted message");
        Ok(())
    }
}

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|source| NotifyError::Address {
        address: address.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> SmtpNotifier {
        SmtpNotifier::new(SmtpMailConfig {
            smtp_host: "127.0.0.1".into(),
            smtp_port: 2525,
            smtp_user: String::new(),
            smtp_pass: String::new(),
            enable_ssl: false,
            email_from: "watcher@example.com".into(),
        })
    }

    fn notification(to: &[&str]) -> Notification {
        Notification::import_failure(
            "WOH1001.txt",
            to.iter().map(|s| s.to_string()).collect(),
            "<p>boom</p>".into(),
            Some("ops-lead@example.com".into()),
        )
    }

    #[test]
    fn message_carries_headers_and_html_body() {
        let message = notifier()
            .build_message(&notification(&["a@example.com", "b@example.com"]))
            .expect("message");
        let raw = String::from_utf8(message.formatted()).expect("utf8");
        assert!(raw.contains("Subject: Import Error - WOH1001.txt"), "got: {raw}");
        assert!(raw.contains("From: watcher@example.com"));
        assert!(raw.contains("a@example.com"));
        assert!(raw.contains("b@example.com"));
        assert!(raw.contains("Reply-To: ops-lead@example.com"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("<p>boom</p>"));
    }

    #[test]
    fn bad_recipient_is_an_address_error() {
        let err = notifier()
            .build_message(&notification(&["not an address"]))
            .unwrap_err();
        assert!(matches!(err, NotifyError::Address { .. }), "got: {err}");
    }

    #[test]
    fn no_recipients_is_rejected() {
        let err = notifier().build_message(&notification(&[])).unwrap_err();
        assert!(matches!(err, NotifyError::NoRecipients));
    }
}
