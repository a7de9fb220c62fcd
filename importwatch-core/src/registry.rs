//! Import registry: durable store of [`ImportRecord`]s.
//!
//! # Storage layout
//!
//! ```text
//! <registry_path>            (default: <data_local_dir>/importwatch/registry.yaml, mode 0600)
//!   version: 1
//!   next_id: 43
//!   records:
//!     - id: 42
//!       file_name: WOH1001.txt
//!       date_created: …
//!       date_deleted: …
//!       date_checked: …
//!       result: Failed
//! ```
//!
//! # Contract
//!
//! [`RecordStore`] is the narrow interface the daemon consumes. Both
//! implementations share [`check_update`], so the lifecycle invariants hold
//! regardless of the backing medium:
//!
//! - `file_name` and `date_created` never change
//! - `date_deleted` and `date_checked` are set at most once
//! - `result` leaves `Pending` at most once, and only after `date_checked`
//! - a record with a verdict is terminal

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, RegistryError};
use crate::types::{ImportRecord, ImportResult, NewImport, RecordId};

pub const REGISTRY_VERSION: u32 = 1;

/// Storage contract for import records. Each call is individually atomic.
pub trait RecordStore: Send {
    /// Persist a new record and return it with its assigned id.
    ///
    /// Fails with [`RegistryError::AlreadyTracked`] when a record for the same
    /// name is still waiting for its deletion.
    fn create(&mut self, new: NewImport) -> Result<ImportRecord, RegistryError>;

    /// Replace the stored record with `record` after validating the transition.
    fn update(&mut self, record: &ImportRecord) -> Result<ImportRecord, RegistryError>;

    /// Most recent record named `file_name` that has not been deleted or checked.
    fn find_by_file_name(&self, file_name: &str) -> Result<Option<ImportRecord>, RegistryError>;

    /// Records with `date_deleted` set, `date_checked` unset, and
    /// `now - date_deleted >= debounce_seconds`, ordered by id.
    fn find_eligible(
        &self,
        debounce_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ImportRecord>, RegistryError>;

    /// Every record, ordered by id.
    fn list(&self) -> Result<Vec<ImportRecord>, RegistryError>;
}

// ---------------------------------------------------------------------------
// 1. Shared document + transition rules
// ---------------------------------------------------------------------------

/// On-disk registry payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryFile {
    pub version: u32,
    pub next_id: u64,
    #[serde(default)]
    pub records: Vec<ImportRecord>,
}

impl Default for RegistryFile {
    fn default() -> Self {
        Self {
            version: REGISTRY_VERSION,
            next_id: 1,
            records: Vec::new(),
        }
    }
}

impl RegistryFile {
    fn create(&mut self, new: NewImport) -> Result<ImportRecord, RegistryError> {
        if let Some(existing) = self.find_by_file_name(&new.file_name) {
            return Err(RegistryError::AlreadyTracked {
                file_name: new.file_name,
                id: existing.id,
            });
        }
        let record = ImportRecord {
            id: RecordId(self.next_id),
            file_name: new.file_name,
            date_created: new.date_created,
            date_deleted: None,
            date_checked: None,
            result: ImportResult::Pending,
        };
        self.next_id += 1;
        self.records.push(record.clone());
        Ok(record)
    }

    fn update(&mut self, record: &ImportRecord) -> Result<ImportRecord, RegistryError> {
        let stored = self
            .records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(RegistryError::RecordNotFound { id: record.id })?;
        check_update(stored, record)?;
        *stored = record.clone();
        Ok(record.clone())
    }

    fn find_by_file_name(&self, file_name: &str) -> Option<&ImportRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| r.file_name == file_name && r.is_awaiting_deletion())
    }

    fn find_eligible(&self, debounce_seconds: u64, now: DateTime<Utc>) -> Vec<ImportRecord> {
        let mut eligible: Vec<ImportRecord> = self
            .records
            .iter()
            .filter(|r| r.is_eligible(debounce_seconds, now))
            .cloned()
            .collect();
        eligible.sort_by_key(|r| r.id);
        eligible
    }

    fn sorted(&self) -> Vec<ImportRecord> {
        let mut all = self.records.clone();
        all.sort_by_key(|r| r.id);
        all
    }
}

/// Validate replacing `stored` with `incoming`.
pub fn check_update(stored: &ImportRecord, incoming: &ImportRecord) -> Result<(), RegistryError> {
    let id = stored.id;
    if stored.is_terminal() {
        return Err(RegistryError::TerminalRecord { id });
    }
    if stored.file_name != incoming.file_name {
        return Err(RegistryError::ImmutableField { id, field: "file_name" });
    }
    if stored.date_created != incoming.date_created {
        return Err(RegistryError::ImmutableField { id, field: "date_created" });
    }
    if stored.date_deleted.is_some() && stored.date_deleted != incoming.date_deleted {
        return Err(RegistryError::ImmutableField { id, field: "date_deleted" });
    }
    if stored.date_checked.is_some() && stored.date_checked != incoming.date_checked {
        return Err(RegistryError::ImmutableField { id, field: "date_checked" });
    }
    if incoming.result != ImportResult::Pending && incoming.date_checked.is_none() {
        return Err(RegistryError::VerdictWithoutCheck { id });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 2. In-memory store
// ---------------------------------------------------------------------------

/// Non-persistent [`RecordStore`]; same semantics as [`YamlStore`].
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    file: RegistryFile,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn create(&mut self, new: NewImport) -> Result<ImportRecord, RegistryError> {
        self.file.create(new)
    }

    fn update(&mut self, record: &ImportRecord) -> Result<ImportRecord, RegistryError> {
        self.file.update(record)
    }

    fn find_by_file_name(&self, file_name: &str) -> Result<Option<ImportRecord>, RegistryError> {
        Ok(self.file.find_by_file_name(file_name).cloned())
    }

    fn find_eligible(
        &self,
        debounce_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ImportRecord>, RegistryError> {
        Ok(self.file.find_eligible(debounce_seconds, now))
    }

    fn list(&self) -> Result<Vec<ImportRecord>, RegistryError> {
        Ok(self.file.sorted())
    }
}

// ---------------------------------------------------------------------------
// 3. YAML file store (atomic)
// ---------------------------------------------------------------------------

/// [`RecordStore`] backed by a single YAML document.
///
/// The document is held in memory and rewritten atomically after every
/// mutation. A failed write leaves both the file and the in-memory copy at the
/// previous state.
#[derive(Debug)]
pub struct YamlStore {
    path: PathBuf,
    file: RegistryFile,
}

impl YamlStore {
    /// Open the registry at `path`; a missing file is an empty registry.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let file = load_at(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate<T>(
        &mut self,
        op: impl FnOnce(&mut RegistryFile) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let mut next = self.file.clone();
        let out = op(&mut next)?;
        save_at(&self.path, &next)?;
        self.file = next;
        Ok(out)
    }
}

impl RecordStore for YamlStore {
    fn create(&mut self, new: NewImport) -> Result<ImportRecord, RegistryError> {
        self.mutate(|file| file.create(new))
    }

    fn update(&mut self, record: &ImportRecord) -> Result<ImportRecord, RegistryError> {
        self.mutate(|file| file.update(record))
    }

    fn find_by_file_name(&self, file_name: &str) -> Result<Option<ImportRecord>, RegistryError> {
        Ok(self.file.find_by_file_name(file_name).cloned())
    }

    fn find_eligible(
        &self,
        debounce_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ImportRecord>, RegistryError> {
        Ok(self.file.find_eligible(debounce_seconds, now))
    }

    fn list(&self) -> Result<Vec<ImportRecord>, RegistryError> {
        Ok(self.file.sorted())
    }
}

/// Load the registry document at `path`.
///
/// Returns an empty document if the file does not exist,
/// `RegistryError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<RegistryFile, RegistryError> {
    if !path.exists() {
        return Ok(RegistryFile::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Atomically save the registry document to `path`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// The `.tmp` file lives in the same directory as the target so the rename
/// never crosses filesystems.
pub fn save_at(path: &Path, file: &RegistryFile) -> Result<(), RegistryError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp_path = tmp_path_for(path);

    let yaml = serde_yaml::to_string(file)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

/// `<registry>.tmp` sibling used during atomic saves; pure, no I/O.
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "registry.yaml".into());
    name.push(".tmp");
    path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
