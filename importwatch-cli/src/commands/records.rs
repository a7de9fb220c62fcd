//! `importwatch records`: registry contents for operators.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use importwatch_core::{ImportRecord, ImportResult, RecordState, RecordStore, YamlStore};

use super::ConfigArg;

#[derive(Args, Debug)]
pub struct RecordsArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Show only records with this outcome.
    #[arg(long, value_enum)]
    pub result: Option<ResultFilter>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResultFilter {
    /// No verdict yet and not claimed.
    Pending,
    Imported,
    Failed,
    /// Claimed by reconciliation but the verdict was never written.
    Interrupted,
}

impl ResultFilter {
    fn matches(self, record: &ImportRecord) -> bool {
        let state = record.state();
        match self {
            ResultFilter::Pending => {
                matches!(state, RecordState::Tracking | RecordState::AwaitingCheck)
            }
            ResultFilter::Imported => record.result == ImportResult::Imported,
            ResultFilter::Failed => record.result == ImportResult::Failed,
            ResultFilter::Interrupted => state == RecordState::Interrupted,
        }
    }
}

impl RecordsArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        let path = config
            .resolved_registry_path()
            .context("could not determine registry location")?;
        let store = YamlStore::open_at(&path)
            .with_context(|| format!("failed to open registry at {}", path.display()))?;

        let mut records = store.list().context("failed to list registry records")?;
        if let Some(filter) = self.result {
            records.retain(|r| filter.matches(r));
        }

        if self.json {
            let payload: Vec<RecordJson> = records.iter().map(RecordJson::from).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize records JSON")?
            );
            return Ok(());
        }

        print_table(&records);
        Ok(())
    }
}

#[derive(Serialize)]
struct RecordJson {
    id: u64,
    file_name: String,
    state: String,
    result: String,
    date_created: DateTime<Utc>,
    date_deleted: Option<DateTime<Utc>>,
    date_checked: Option<DateTime<Utc>>,
}

impl From<&ImportRecord> for RecordJson {
    fn from(record: &ImportRecord) -> Self {
        Self {
            id: record.id.0,
            file_name: record.file_name.clone(),
            state: record.state().to_string(),
            result: record.result.to_string(),
            date_created: record.date_created,
            date_deleted: record.date_deleted,
            date_checked: record.date_checked,
        }
    }
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "id")]
    id: u64,
    #[tabled(rename = "file")]
    file_name: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "result")]
    result: String,
    #[tabled(rename = "created")]
    created: String,
    #[tabled(rename = "deleted")]
    deleted: String,
    #[tabled(rename = "checked")]
    checked: String,
}

fn print_table(records: &[ImportRecord]) {
    if records.is_empty() {
        println!("No records.");
        return;
    }
    let failed = records
        .iter()
        .filter(|r| r.result == ImportResult::Failed)
        .count();
    let interrupted = records
        .iter()
        .filter(|r| r.state() == RecordState::Interrupted)
        .count();

    let rows: Vec<RecordRow> = records
        .iter()
        .map(|r| RecordRow {
            id: r.id.0,
            file_name: r.file_name.clone(),
            state: r.state().to_string(),
            result: result_label(r.result),
            created: format_time(Some(r.date_created)),
            deleted: format_time(r.date_deleted),
            checked: format_time(r.date_checked),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!(
        "{} records | {} failed | {} interrupted",
        records.len(),
        failed,
        interrupted
    );
    if interrupted > 0 {
        println!(
            "{}",
            "Interrupted records were claimed but never judged; inspect their artifacts manually."
                .yellow()
        );
    }
}

fn result_label(result: ImportResult) -> String {
    match result {
        ImportResult::Pending => "-".bright_black().to_string(),
        ImportResult::Imported => "imported".green().to_string(),
        ImportResult::Failed => "failed".red().to_string(),
    }
}

fn format_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
