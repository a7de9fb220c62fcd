#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use importwatch_artifacts::{ArtifactClassifier, ArtifactLayout};
use importwatch_core::{
    Config, ImportRecord, MailChannelKind, MemoryStore, NewImport, RecordStore, RegistryError,
    SmtpMailConfig,
};
use importwatch_daemon::SchedulerSettings;
use importwatch_notify::{Notification, Notifier, NotifyError};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
}

pub fn secs(n: i64) -> chrono::Duration {
    chrono::Duration::seconds(n)
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

pub struct Folders {
    pub root: TempDir,
}

impl Folders {
    pub fn new() -> Self {
        let root = TempDir::new().expect("tempdir");
        for dir in ["active", "errors", "summary"] {
            fs::create_dir_all(root.path().join(dir)).expect("mkdir");
        }
        Self { root }
    }

    pub fn active(&self) -> PathBuf {
        self.root.path().join("active")
    }

    pub fn errors(&self) -> PathBuf {
        self.root.path().join("errors")
    }

    pub fn summary(&self) -> PathBuf {
        self.root.path().join("summary")
    }

    pub fn write(&self, dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).expect("write artifact");
    }

    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout {
            error_folder: self.errors(),
            summary_folder: self.summary(),
            summary_extension: "sum".into(),
            error_extension: "err".into(),
            success_marker: "<order_number 1>".into(),
        }
    }

    pub fn classifier(&self) -> Arc<ArtifactClassifier> {
        Arc::new(ArtifactClassifier::new(self.layout()).expect("classifier"))
    }

    pub fn config(&self, wait_in_seconds: u64, debounce_seconds: u64) -> Config {
        Config {
            wait_in_seconds,
            debounce_seconds: Some(debounce_seconds),
            initial_delay_ms: 50,
            active_folder: self.active(),
            error_folder: self.errors(),
            summary_folder: self.summary(),
            registry_path: Some(self.root.path().join("registry.yaml")),
            file_prefix: "WOH".into(),
            file_extension: "txt".into(),
            summary_extension: "sum".into(),
            error_extension: "err".into(),
            success_marker: "<order_number 1>".into(),
            email_tos: vec!["ops@example.com".into()],
            reply_to: None,
            default_mail: MailChannelKind::Smtp,
            db_mail: None,
            smtp_mail: Some(SmtpMailConfig {
                smtp_host: "127.0.0.1".into(),
                smtp_port: 1,
                smtp_user: String::new(),
                smtp_pass: String::new(),
                enable_ssl: false,
                email_from: "watcher@example.com".into(),
            }),
        }
    }
}

pub fn settings(debounce_seconds: u64) -> SchedulerSettings {
    SchedulerSettings {
        debounce_seconds,
        poll_interval: Duration::from_secs(10),
        initial_delay: Duration::ZERO,
        recipients: vec!["ops@example.com".into()],
        reply_to: None,
    }
}

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

/// Notifier that keeps every message it was asked to send.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
    panic: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Panics inside `send`, taking the reconcile task down with it.
    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn channel(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.panic {
            panic!("notifier blew up for {}", notification.subject);
        }
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            Err(NotifyError::NoRecipients)
        } else {
            Ok(())
        }
    }
}

/// Which updates a [`FlakyStore`] refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Claim,
    Verdict,
}

/// In-memory store whose updates fail at one reconciliation stage.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_on: FailOn,
}

impl RecordStore for FlakyStore {
    fn create(&mut self, new: NewImport) -> Result<ImportRecord, RegistryError> {
        self.inner.create(new)
    }

    fn update(&mut self, record: &ImportRecord) -> Result<ImportRecord, RegistryError> {
        let stored = self
            .inner
            .list()?
            .into_iter()
            .find(|r| r.id == record.id);
        let claim = stored.is_some_and(|s| s.date_checked.is_none()) && record.date_checked.is_some();
        let verdict = !claim && record.date_checked.is_some();
        if (claim && self.fail_on == FailOn::Claim) || (verdict && self.fail_on == FailOn::Verdict) {
            return Err(RegistryError::RecordNotFound { id: record.id });
        }
        self.inner.update(record)
    }

    fn find_by_file_name(&self, file_name: &str) -> Result<Option<ImportRecord>, RegistryError> {
        self.inner.find_by_file_name(file_name)
    }

    fn find_eligible(
        &self,
        debounce_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ImportRecord>, RegistryError> {
        self.inner.find_eligible(debounce_seconds, now)
    }

    fn list(&self) -> Result<Vec<ImportRecord>, RegistryError> {
        self.inner.list()
    }
}
