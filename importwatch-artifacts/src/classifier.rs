//! Verdicts from import-job artifacts.
//!
//! For a batch file `WOH5001.txt` the import job may leave:
//!
//! | Artifact | Location                                  | Meaning                          |
//! |----------|-------------------------------------------|----------------------------------|
//! | summary  | `<summary_folder>/WOH5001.<summary_ext>`  | success iff a line has the marker |
//! | errors   | `<error_folder>/*5001.<error_ext>`        | one file per failure             |
//!
//! Filesystem errors are never surfaced: an unreadable summary counts as a
//! missing one, so it can only ever produce a failure.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use importwatch_core::Config;

use crate::error::ReportError;
use crate::report::{ReportRenderer, ReportSection};

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("digit pattern is valid"));

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Where the import job writes its artifacts and how to read them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub error_folder: PathBuf,
    pub summary_folder: PathBuf,
    /// Without the leading dot, e.g. `sum`.
    pub summary_extension: String,
    /// Without the leading dot, e.g. `err`.
    pub error_extension: String,
    pub success_marker: String,
}

impl ArtifactLayout {
    pub fn from_config(config: &Config) -> Self {
        Self {
            error_folder: config.error_folder.clone(),
            summary_folder: config.summary_folder.clone(),
            summary_extension: config.summary_extension.clone(),
            error_extension: config.error_extension.clone(),
            success_marker: config.success_marker.clone(),
        }
    }

    /// Summary path and error-file suffix for `file_name`; pure, no I/O.
    pub fn paths_for(&self, file_name: &str) -> ArtifactPaths {
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_owned());
        ArtifactPaths {
            summary: self
                .summary_folder
                .join(format!("{stem}.{}", self.summary_extension)),
            error_suffix: numeric_token(file_name)
                .map(|digits| format!("{digits}.{}", self.error_extension)),
        }
    }
}

/// Derived artifact locations for one batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub summary: PathBuf,
    /// Error files match `*<suffix>`; `None` when the file name has no digits.
    pub error_suffix: Option<String>,
}

/// Outcome of inspecting a file's summary artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Imported,
    Failed(FailureReason),
}

impl Classification {
    pub fn is_imported(&self) -> bool {
        matches!(self, Classification::Imported)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    SummaryMissing { path: PathBuf },
    MarkerAbsent { path: PathBuf },
    SummaryUnreadable { path: PathBuf, message: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SummaryMissing { path } => {
                write!(f, "summary {} not found", path.display())
            }
            FailureReason::MarkerAbsent { path } => {
                write!(f, "summary {} has no success marker", path.display())
            }
            FailureReason::SummaryUnreadable { path, message } => {
                write!(f, "summary {} unreadable: {message}", path.display())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Judges batch files from their artifacts. Performs reads only.
#[derive(Debug)]
pub struct ArtifactClassifier {
    layout: ArtifactLayout,
    renderer: ReportRenderer,
}

impl ArtifactClassifier {
    pub fn new(layout: ArtifactLayout) -> Result<Self, ReportError> {
        Ok(Self {
            layout,
            renderer: ReportRenderer::new()?,
        })
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// `Imported` iff the summary exists and one of its lines contains the
    /// success marker.
    pub fn classify(&self, file_name: &str) -> Classification {
        let path = self.layout.paths_for(file_name).summary;
        if !path.is_file() {
            return Classification::Failed(FailureReason::SummaryMissing { path });
        }
        match read_lossy(&path) {
            Ok(text) => {
                if text
                    .lines()
                    .any(|line| line.contains(&self.layout.success_marker))
                {
                    Classification::Imported
                } else {
                    Classification::Failed(FailureReason::MarkerAbsent { path })
                }
            }
            Err(err) => Classification::Failed(FailureReason::SummaryUnreadable {
                path,
                message: err.to_string(),
            }),
        }
    }

    /// Error artifacts sharing `file_name`'s numeric token, sorted by path.
    ///
    /// Missing or unreadable error folders yield an empty list.
    pub fn error_artifacts(&self, file_name: &str) -> Vec<PathBuf> {
        let Some(suffix) = self.layout.paths_for(file_name).error_suffix else {
            return vec![];
        };
        let Ok(entries) = fs::read_dir(&self.layout.error_folder) else {
            return vec![];
        };
        let mut found: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|e| e.file_name().to_string_lossy().ends_with(&suffix))
            .map(|e| e.path())
            .collect();
        found.sort();
        found
    }

    /// Summary text (if any) followed by every matching error artifact.
    /// Artifacts that cannot be read are left out.
    pub fn report_sections(&self, file_name: &str) -> Vec<ReportSection> {
        let summary = self.layout.paths_for(file_name).summary;
        std::iter::once(summary)
            .filter(|p| p.is_file())
            .chain(self.error_artifacts(file_name))
            .filter_map(|path| {
                read_lossy(&path)
                    .ok()
                    .map(|text| ReportSection::new(&path, &text))
            })
            .collect()
    }

    /// HTML failure report for `file_name`.
    pub fn report(&self, file_name: &str) -> Result<String, ReportError> {
        self.renderer
            .render(file_name, &self.report_sections(file_name))
    }
}

/// First run of ASCII digits in `file_name`.
pub fn numeric_token(file_name: &str) -> Option<&str> {
    DIGITS.find(file_name).map(|m| m.as_str())
}

fn read_lossy(path: &Path) -> std::io::Result<String> {
    fs::read(path).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
