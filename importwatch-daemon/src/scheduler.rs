//! ReconciliationScheduler: periodic verdicts for deleted batch files.
//!
//! Each tick asks the registry for eligible records and reconciles every one
//! of them on its own task:
//!
//! 1. claim: persist `date_checked` so the record is never selected again
//! 2. classify from the summary artifact
//! 3. on failure, render the report and send a notification
//! 4. persist the verdict
//!
//! A record whose claim fails is skipped and stays eligible for the next tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};

use importwatch_artifacts::{ArtifactClassifier, Classification, FailureReason};
use importwatch_core::{Config, ImportRecord, ImportResult, RecordId};
use importwatch_notify::{Notification, Notifier};

use crate::error::DaemonError;
use crate::registry_actor::RegistryHandle;

// ---------------------------------------------------------------------------
// Settings and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub debounce_seconds: u64,
    pub poll_interval: Duration,
    pub initial_delay: Duration,
    pub recipients: Vec<String>,
    pub reply_to: Option<String>,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce_seconds: config.debounce_seconds(),
            poll_interval: config.poll_interval(),
            initial_delay: config.initial_delay(),
            recipients: config.recipients(),
            reply_to: config.reply_to.clone(),
        }
    }
}

/// What happened to the failure notification for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    /// The file was imported; nothing to send.
    NotRequired,
    Sent,
    /// Delivery failed; never retried.
    Failed(String),
}

/// A record that received its verdict this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub record: ImportRecord,
    pub verdict: Classification,
    pub notification: NotificationStatus,
}

/// Which registry write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStage {
    /// The record was not claimed and stays eligible.
    Claim,
    /// Claimed but the verdict was lost; the record is left interrupted.
    Verdict,
    /// The task panicked. Claimed records are left interrupted, unclaimed
    /// ones stay eligible.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub id: RecordId,
    pub file_name: String,
    pub stage: ReconcileStage,
    /// Set when the failure happened after the notification step.
    pub notification: Option<NotificationStatus>,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub reconciled: Vec<ReconcileOutcome>,
    pub failures: Vec<RecordFailure>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.reconciled.is_empty() && self.failures.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct ReconciliationScheduler<N: Notifier> {
    registry: RegistryHandle,
    classifier: Arc<ArtifactClassifier>,
    notifier: Arc<N>,
    settings: Arc<SchedulerSettings>,
}

impl<N: Notifier> Clone for ReconciliationScheduler<N> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            classifier: Arc::clone(&self.classifier),
            notifier: Arc::clone(&self.notifier),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<N: Notifier> ReconciliationScheduler<N> {
    pub fn new(
        registry: RegistryHandle,
        classifier: Arc<ArtifactClassifier>,
        notifier: Arc<N>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            registry,
            classifier,
            notifier,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Reconcile every record eligible at `now`.
    ///
    /// Only the eligibility query can fail the whole tick; per-record
    /// failures are collected in the report.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, DaemonError> {
        let eligible = self
            .registry
            .find_eligible(self.settings.debounce_seconds, now)
            .await?;

        let mut set = JoinSet::new();
        let mut in_flight = HashMap::with_capacity(eligible.len());
        for record in eligible {
            let this = self.clone();
            let task_record = record.clone();
            let handle = set.spawn(async move { this.reconcile(task_record, now).await });
            in_flight.insert(handle.id(), record);
        }

        let mut report = TickReport::default();
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((_, Ok(outcome))) => report.reconciled.push(outcome),
                Ok((_, Err(failure))) => report.failures.push(failure),
                Err(err) => match in_flight.get(&err.id()) {
                    Some(record) => report.failures.push(failure(
                        record,
                        ReconcileStage::Aborted,
                        None,
                        DaemonError::Join {
                            task: "reconcile",
                            message: err.to_string(),
                        },
                    )),
                    None => tracing::error!(error = %err, "reconcile task join failure"),
                },
            }
        }
        report.reconciled.sort_by_key(|o| o.record.id);
        report.failures.sort_by_key(|f| f.id);
        Ok(report)
    }

    async fn reconcile(
        &self,
        mut record: ImportRecord,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, RecordFailure> {
        record.date_checked = Some(now);
        let mut record = self
            .registry
            .update(record.clone())
            .await
            .map_err(|err| failure(&record, ReconcileStage::Claim, None, err))?;

        let verdict = self.classify(&record.file_name).await;
        let notification = match &verdict {
            Classification::Imported => {
                record.result = ImportResult::Imported;
                NotificationStatus::NotRequired
            }
            Classification::Failed(reason) => {
                record.result = ImportResult::Failed;
                tracing::debug!(file_name = %record.file_name, reason = %reason, "import failed");
                self.notify_failure(&record.file_name).await
            }
        };

        match self.registry.update(record.clone()).await {
            Ok(record) => Ok(ReconcileOutcome {
                record,
                verdict,
                notification,
            }),
            Err(err) => Err(failure(
                &record,
                ReconcileStage::Verdict,
                Some(notification),
                err,
            )),
        }
    }

    async fn classify(&self, file_name: &str) -> Classification {
        let classifier = Arc::clone(&self.classifier);
        let name = file_name.to_owned();
        match tokio::task::spawn_blocking(move || classifier.classify(&name)).await {
            Ok(verdict) => verdict,
            Err(err) => Classification::Failed(FailureReason::SummaryUnreadable {
                path: self.classifier.layout().paths_for(file_name).summary,
                message: err.to_string(),
            }),
        }
    }

    async fn notify_failure(&self, file_name: &str) -> NotificationStatus {
        let body = self.report_body(file_name).await;
        let notification = Notification::import_failure(
            file_name,
            self.settings.recipients.clone(),
            body,
            self.settings.reply_to.clone(),
        );
        match self.notifier.send(&notification).await {
            Ok(()) => NotificationStatus::Sent,
            Err(err) => NotificationStatus::Failed(err.to_string()),
        }
    }

    async fn report_body(&self, file_name: &str) -> String {
        let classifier = Arc::clone(&self.classifier);
        let name = file_name.to_owned();
        let rendered = tokio::task::spawn_blocking(move || classifier.report(&name))
            .await
            .map_err(|err| err.to_string())
            .and_then(|body| body.map_err(|err| err.to_string()));
        match rendered {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(file_name = %file_name, error = %err, "report render failed, sending fallback body");
                fallback_body(file_name, &err)
            }
        }
    }

    /// Tick after the initial delay, then every poll interval, until shutdown.
    pub(crate) async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<(), DaemonError> {
        let start = Instant::now() + self.settings.initial_delay;
        let mut ticker = tokio::time::interval_at(start, self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        report = self.tick(Utc::now()) => log_report(self.notifier.channel(), report),
                    }
                }
            }
        }
        Ok(())
    }
}

fn failure(
    record: &ImportRecord,
    stage: ReconcileStage,
    notification: Option<NotificationStatus>,
    err: DaemonError,
) -> RecordFailure {
    RecordFailure {
        id: record.id,
        file_name: record.file_name.clone(),
        stage,
        notification,
        error: err.to_string(),
    }
}

/// Plain body used when the HTML report cannot be rendered.
pub fn fallback_body(file_name: &str, error: &str) -> String {
    format!(
        "<p>Import of {} failed. The artifact report could not be rendered: {}</p>",
        escape(file_name),
        escape(error)
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn log_report(channel: &str, report: Result<TickReport, DaemonError>) {
    let report = match report {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(error = %err, "reconciliation tick failed");
            return;
        }
    };
    for outcome in &report.reconciled {
        let record = &outcome.record;
        tracing::info!(
            file_name = %record.file_name,
            record_id = record.id.0,
            result = %record.result,
            "reconciled",
        );
        if let NotificationStatus::Failed(err) = &outcome.notification {
            tracing::warn!(
                file_name = %record.file_name,
                channel,
                error = %err,
                "failure notification not delivered",
            );
        }
    }
    for failure in &report.failures {
        tracing::error!(
            file_name = %failure.file_name,
            record_id = failure.id.0,
            stage = ?failure.stage,
            error = %failure.error,
            "reconciliation write failed",
        );
    }
    if !report.is_empty() {
        tracing::debug!(
            reconciled = report.reconciled.len(),
            failed = report.failures.len(),
            "tick complete",
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry_actor::spawn_registry;
    use importwatch_artifacts::ArtifactLayout;
    use importwatch_core::{MemoryStore, NewImport, RecordState};
    use importwatch_notify::NotifyError;

    struct Silent;

    impl Notifier for Silent {
        fn channel(&self) -> &'static str {
            "silent"
        }

        async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn loop_ticks_after_initial_delay_and_stops_on_shutdown() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let classifier = ArtifactClassifier::new(ArtifactLayout {
            error_folder: dir.path().join("errors"),
            summary_folder: dir.path().join("summary"),
            summary_extension: "sum".into(),
            error_extension: "err".into(),
            success_marker: "<order_number 1>".into(),
        })
        .expect("classifier");
        let (registry, _task) = spawn_registry(Box::new(MemoryStore::new()));
        let mut record = registry
            .create(NewImport::new("WOH1.txt", Utc::now()))
            .await
            .expect("create");
        record.date_deleted = Some(Utc::now());
        registry.update(record).await.expect("delete");

        let scheduler = ReconciliationScheduler::new(
            registry.clone(),
            Arc::new(classifier),
            Arc::new(Silent),
            SchedulerSettings {
                debounce_seconds: 0,
                poll_interval: Duration::from_millis(50),
                initial_delay: Duration::from_millis(20),
                recipients: vec!["ops@example.com".into()],
                reply_to: None,
            },
        );
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        let mut reconciled = false;
        for _ in 0..100 {
            let records = registry.list().await.expect("list");
            if records[0].state() == RecordState::Terminal {
                reconciled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(reconciled, "record was never reconciled");

        shutdown_tx.send(()).expect("send shutdown");
        handle.await.expect("join").expect("loop result");
    }

    #[test]
    fn fallback_body_is_escaped() {
        let body = fallback_body("WOH1.txt", "unexpected <tag> & more");
        assert!(body.contains("WOH1.txt"));
        assert!(body.contains("&lt;tag&gt; &amp; more"));
    }

    #[test]
    fn empty_report_is_empty() {
        assert!(TickReport::default().is_empty());
    }
}
