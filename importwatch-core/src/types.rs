//! Domain types for the import registry.
//!
//! All timestamps are `DateTime<Utc>`. All types are serializable via
//! serde + serde_yaml.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// Largest value chrono accepts for `Duration::seconds`.
const MAX_DEBOUNCE_SECONDS: u64 = (i64::MAX / 1_000) as u64;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Store-assigned identity of an [`ImportRecord`]. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Verdict stored on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ImportResult {
    #[default]
    #[serde(rename = "")]
    Pending,
    Imported,
    Failed,
}

impl fmt::Display for ImportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportResult::Pending => write!(f, "pending"),
            ImportResult::Imported => write!(f, "imported"),
            ImportResult::Failed => write!(f, "failed"),
        }
    }
}

/// Where a record sits in its lifecycle, derived from its timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordState {
    /// File present in the watched folder; no deletion seen yet.
    Tracking,
    /// Deleted, waiting for the debounce window and a reconciliation tick.
    AwaitingCheck,
    /// Claimed by reconciliation but no verdict was ever persisted.
    Interrupted,
    /// Verdict persisted; never mutated again.
    Terminal,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordState::Tracking => write!(f, "tracking"),
            RecordState::AwaitingCheck => write!(f, "awaiting-check"),
            RecordState::Interrupted => write!(f, "interrupted"),
            RecordState::Terminal => write!(f, "terminal"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Input to [`crate::RecordStore::create`]; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImport {
    pub file_name: String,
    pub date_created: DateTime<Utc>,
}

impl NewImport {
    pub fn new(file_name: impl Into<String>, date_created: DateTime<Utc>) -> Self {
        Self {
            file_name: file_name.into(),
            date_created,
        }
    }
}

/// One observed batch file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub id: RecordId,
    pub file_name: String,
    pub date_created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_deleted: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_checked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: ImportResult,
}

impl ImportRecord {
    pub fn state(&self) -> RecordState {
        match (self.date_deleted, self.date_checked, self.result) {
            (_, Some(_), ImportResult::Pending) => RecordState::Interrupted,
            (_, Some(_), _) => RecordState::Terminal,
            (None, None, _) => RecordState::Tracking,
            (Some(_), None, _) => RecordState::AwaitingCheck,
        }
    }

    /// A verdict has been persisted.
    pub fn is_terminal(&self) -> bool {
        self.state() == RecordState::Terminal
    }

    /// Still waiting for its Deleted event.
    pub fn is_awaiting_deletion(&self) -> bool {
        self.date_deleted.is_none() && self.date_checked.is_none()
    }

    /// Eligible for reconciliation at `now`: deleted, unchecked, and at least
    /// `debounce_seconds` past the deletion.
    pub fn is_eligible(&self, debounce_seconds: u64, now: DateTime<Utc>) -> bool {
        if self.date_checked.is_some() {
            return false;
        }
        let Some(deleted) = self.date_deleted else {
            return false;
        };
        let secs = debounce_seconds.min(MAX_DEBOUNCE_SECONDS) as i64;
        let debounce = Duration::seconds(secs);
        now.signed_duration_since(deleted) >= debounce
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
