//! Types for test run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of a single test's baseline comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// No baseline existed (or overwrite mode): the capture became the baseline
    BaselineCreated,

    /// Capture matched the baseline exactly
    Pass,

    /// Capture differed from the baseline
    Fail {
        /// Mismatch percentage reported by the differ
        mismatch: f64,
        /// Path of the persisted diff artifact
        diff_path: PathBuf,
    },
}

/// Failure taxonomy for recorded errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The pipeline threw during navigation/capture, retries exhausted
    FailToRun,

    /// Nonzero pixel mismatch against the baseline
    FailToMatch,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::FailToRun => write!(f, "fail to run"),
            FailureKind::FailToMatch => write!(f, "fail to match"),
        }
    }
}

/// One recorded failure or error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Display name of the test
    pub test_name: String,

    /// URL path of the test
    pub url: String,

    /// Failure classification
    pub kind: FailureKind,

    /// Human-readable detail (error message or mismatch report)
    pub detail: String,
}

/// Summary of a complete run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of tests in the effective run set
    pub total: usize,

    /// Registered tests excluded by focus or ignore selection
    pub skipped: usize,

    /// Number of focused registrations
    pub focused: usize,

    /// Number of tests with a recorded failure
    pub failed: usize,

    /// Number of tests that passed or created a baseline
    pub passed: usize,

    /// Ordered failure/error records
    pub failures: Vec<FailureRecord>,

    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,

    /// When the run finished
    #[serde(with = "chrono::serde::ts_seconds")]
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Process exit status for this run: nonzero iff anything failed
    pub fn exit_code(&self) -> i32 {
        if self.failures.is_empty() { 0 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_clean_run() {
        let summary = RunSummary {
            total: 2,
            skipped: 0,
            focused: 0,
            failed: 0,
            passed: 2,
            failures: Vec::new(),
            duration_ms: 10,
            finished_at: Utc::now(),
        };
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_exit_code_with_failures() {
        let summary = RunSummary {
            total: 2,
            skipped: 0,
            focused: 0,
            failed: 1,
            passed: 1,
            failures: vec![FailureRecord {
                test_name: "/a".to_string(),
                url: "/a".to_string(),
                kind: FailureKind::FailToMatch,
                detail: "mismatch 2.5%".to_string(),
            }],
            duration_ms: 10,
            finished_at: Utc::now(),
        };
        assert_eq!(summary.exit_code(), 1);
    }
}
