//! # importwatch-artifacts
//!
//! Reads the artifacts the external import job leaves behind for a batch file
//! and turns them into a verdict and, on failure, an HTML report body.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use importwatch_artifacts::{ArtifactClassifier, ArtifactLayout};
//!
//! fn judge(layout: ArtifactLayout) {
//!     if let Ok(classifier) = ArtifactClassifier::new(layout) {
//!         let verdict = classifier.classify("WOH1001.txt");
//!         if !verdict.is_imported() {
//!             if let Ok(body) = classifier.report("WOH1001.txt") {
//!                 println!("{body}");
//!             }
//!         }
//!     }
//! }
//! ```

pub mod classifier;
pub mod error;
pub mod report;

pub use classifier::{
    numeric_token, ArtifactClassifier, ArtifactLayout, ArtifactPaths, Classification,
    FailureReason,
};
pub use error::ReportError;
pub use report::{ReportRenderer, ReportSection};
