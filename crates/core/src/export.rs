use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{RecordId, WireId};

/// Name the backend's single-flight arbiter knows the export operation by.
pub const EXPORT_OPERATION: &str = "export";
/// Global status flag the backend raises while an export is running.
pub const EXPORTING_FLAG: &str = "exporting";

/// A confirmed export request. Built when the user confirms the export
/// dialog and consumed by exactly one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    pub id: Uuid,
    pub selected_ids: Vec<RecordId>,
    pub count: u32,
    pub destination: String,
}

impl ExportJob {
    /// Returns `None` when the destination is empty.
    pub fn new(selected_ids: Vec<RecordId>, count: u32, destination: impl Into<String>) -> Option<Self> {
        let destination = destination.into();
        if destination.is_empty() {
            return None;
        }
        Some(Self {
            id: Uuid::new_v4(),
            selected_ids,
            count: count.max(1),
            destination,
        })
    }
}

/// Parses the "number of backups per game" input the way a browser
/// `parseInt` would read it: leading whitespace, optional `+`, then digits.
/// Anything unparsable, zero or negative becomes 1.
pub fn parse_export_count(raw: &str) -> u32 {
    let trimmed = raw.trim_start();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

/// A per-record failure returned by an export that otherwise completed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "WireFailure")]
pub struct ExportFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub message: String,
}

impl fmt::Display for ExportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{id}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireFailure {
    Message(String),
    Detail {
        #[serde(default, alias = "wiki_page_id")]
        id: Option<WireId>,
        #[serde(alias = "error")]
        message: String,
    },
    Other(serde_json::Value),
}

impl From<WireFailure> for ExportFailure {
    fn from(wire: WireFailure) -> Self {
        match wire {
            WireFailure::Message(message) => Self { id: None, message },
            WireFailure::Detail { id, message } => Self {
                id: id.map(Into::into),
                message,
            },
            WireFailure::Other(value) => Self {
                id: None,
                message: value.to_string(),
            },
        }
    }
}

/// The backend's reply to an export call that did not reject.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ExportReport {
    pub errors: Vec<ExportFailure>,
}

/// Everything the summary view needs about a finished export.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExportResult {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<ExportFailure>,
    pub destination: String,
    pub total_selected_size: u64,
}

impl ExportResult {
    /// Splits a job's selection into succeeded and failed counts.
    /// `total_selected_size` is filled in by the summary from the live selection.
    pub fn from_report(job: &ExportJob, report: ExportReport) -> Self {
        let failed = report.errors.len();
        Self {
            succeeded: job.selected_ids.len().saturating_sub(failed),
            failed,
            errors: report.errors,
            destination: job.destination.clone(),
            total_selected_size: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    Start,
    End,
}
