//! Database-mediated mail: a stored procedure on the relay database queues
//! the message.
//!
//! Parameter order of the call:
//!
//! | # | Parameter               | Value                          |
//! |---|-------------------------|--------------------------------|
//! | 1 | `profile_name`          | `db_mail.profile`              |
//! | 2 | `recipients`            | `a@x;b@y;`                     |
//! | 3 | `copy_recipients`       | `''`                           |
//! | 4 | `blind_copy_recipients` | `''`                           |
//! | 5 | `subject`               | `Import Error - <file>`        |
//! | 6 | `body`                  | HTML report                    |
//! | 7 | `body_format`           | `'HTML'`                       |
//! | 8 | `reply_to`              | `NULL` unless configured       |

use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};

use importwatch_core::{config::is_procedure_name, DbMailConfig};

use crate::error::NotifyError;
use crate::message::Notification;

pub const BODY_FORMAT: &str = "HTML";

#[derive(Debug, Clone)]
pub struct DbMailNotifier {
    config: DbMailConfig,
}

impl DbMailNotifier {
    pub fn new(config: DbMailConfig) -> Result<Self, NotifyError> {
        if !is_procedure_name(&config.stored_procedure) {
            return Err(NotifyError::InvalidProcedure(config.stored_procedure));
        }
        Ok(Self { config })
    }

    /// `CALL <procedure>($1, …, $8)`.
    pub fn call_statement(&self) -> String {
        format!(
            "CALL {}($1, $2, $3, $4, $5, $6, $7, $8)",
            self.config.stored_procedure
        )
    }

    /// `url` when set, otherwise the `server`/`database`/`user`/`password`
    /// parts. Unset parts fall back to the libpq environment defaults.
    pub fn connect_options(&self) -> Result<PgConnectOptions, NotifyError> {
        let config = &self.config;
        if !config.url.trim().is_empty() {
            return Ok(config.url.parse()?);
        }
        let mut options = PgConnectOptions::new();
        if let Some(server) = config.server.as_deref() {
            let host_port = server
                .rsplit_once(':')
                .and_then(|(host, port)| Some((host, port.parse::<u16>().ok()?)));
            options = match host_port {
                Some((host, port)) => options.host(host).port(port),
                None => options.host(server),
            };
        }
        if let Some(database) = config.database.as_deref() {
            options = options.database(database);
        }
        if let Some(user) = config.user.as_deref() {
            options = options.username(user);
        }
        if let Some(password) = config.password.as_deref() {
            options = options.password(password);
        }
        Ok(options)
    }

    /// Open a connection, run the procedure once, close the connection.
    pub async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if notification.recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }
        let mut conn = PgConnection::connect_with(&self.connect_options()?).await?;
        let statement = self.call_statement();
        let outcome = sqlx::query(&statement)
            .bind(self.config.profile.as_str())
            .bind(notification.joined_recipients())
            .bind("")
            .bind("")
            .bind(notification.subject.as_str())
            .bind(notification.html_body.as_str())
            .bind(BODY_FORMAT)
            .bind(notification.reply_to.as_deref())
            .execute(&mut conn)
            .await;
        if let Err(err) = conn.close().await {
            tracing::debug!(error = %err, "closing mail relay connection failed");
        }
        outcome?;
        Ok(())
    }
}
