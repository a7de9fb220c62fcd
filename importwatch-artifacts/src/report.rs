//! Tera-rendered HTML body for failure notifications.
//!
//! Each artifact becomes a bold heading (its path) followed by a paragraph
//! whose lines are joined with `<br />`. All text is HTML-escaped.

use std::path::Path;

use serde::Serialize;
use tera::{Context, Tera};

use crate::error::ReportError;

// `.html` suffix turns on tera's autoescaping.
const REPORT_TEMPLATE: &str = "report.html";
const REPORT_SOURCE: &str = include_str!("templates/report.html.tera");

/// One artifact's contribution to the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub heading: String,
    pub lines: Vec<String>,
}

impl ReportSection {
    pub fn new(path: &Path, text: &str) -> Self {
        Self {
            heading: path.display().to_string(),
            lines: text.lines().map(str::to_owned).collect(),
        }
    }
}

#[derive(Serialize)]
struct ReportContext<'a> {
    file_name: &'a str,
    sections: &'a [ReportSection],
}

/// Holds the compiled report template.
#[derive(Debug)]
pub struct ReportRenderer {
    tera: Tera,
}

impl ReportRenderer {
    pub fn new() -> Result<Self, ReportError> {
        let mut tera = Tera::default();
        tera.add_raw_template(REPORT_TEMPLATE, REPORT_SOURCE)?;
        Ok(Self { tera })
    }

    pub fn render(&self, file_name: &str, sections: &[ReportSection]) -> Result<String, ReportError> {
        let ctx = Context::from_serialize(ReportContext {
            file_name,
            sections,
        })?;
        Ok(self.tera.render(REPORT_TEMPLATE, &ctx)?)
    }
}
