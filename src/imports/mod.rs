//! Shared plumbing for the CSV importers: the row policy, the per-request
//! report and the spooled upload file.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, AppResult};

pub mod table;
pub mod upload;

pub use table::{CsvRow, CsvTable};
pub use upload::SpooledUpload;

/// What to do with a row that fails validation or cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowPolicy {
    /// Fail the whole import; nothing is persisted.
    Abort,
    /// Leave the row out and keep going.
    Skip,
}

impl FromStr for RowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(RowPolicy::Abort),
            "skip" => Ok(RowPolicy::Skip),
            other => Err(format!("unknown row policy '{other}', expected abort or skip")),
        }
    }
}

impl fmt::Display for RowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RowPolicy::Abort => "abort",
            RowPolicy::Skip => "skip",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowRejection {
    pub line: u64,
    pub reason: String,
}

/// Outcome of an import request.
#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub message: String,
    pub inserted: usize,
    pub skipped: Vec<RowRejection>,
}

/// Collects accepted rows and applies the policy to rejected ones.
pub struct RowSink<T> {
    policy: RowPolicy,
    accepted: Vec<T>,
    skipped: Vec<RowRejection>,
}

impl<T> RowSink<T> {
    pub fn new(policy: RowPolicy) -> Self {
        Self {
            policy,
            accepted: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn accept(&mut self, item: T) {
        self.accepted.push(item);
    }

    /// Under `Abort` this is the error that ends the import.
    pub fn reject(&mut self, line: u64, reason: impl Into<String>) -> AppResult<()> {
        let reason = reason.into();
        match self.policy {
            RowPolicy::Abort => Err(AppError::validation(format!("Row {line}: {reason}"))),
            RowPolicy::Skip => {
                warn!(line, %reason, "csv row skipped");
                self.skipped.push(RowRejection { line, reason });
                Ok(())
            }
        }
    }

    pub fn finish(self) -> (Vec<T>, Vec<RowRejection>) {
        (self.accepted, self.skipped)
    }
}
