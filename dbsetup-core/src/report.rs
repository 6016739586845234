//! Aggregation of execution outcomes and the process-level run status.

use crate::error::DbSetupError;
use crate::models::ExecutionOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate result of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Per-file outcomes in execution order
    pub outcomes: Vec<ExecutionOutcome>,
    /// Files that committed
    pub succeeded: usize,
    /// Files that failed
    pub failed: usize,
    /// When the batch started
    pub started_at: DateTime<Utc>,
    /// When the summary was produced
    pub finished_at: DateTime<Utc>,
}

impl ExecutionSummary {
    /// Number of files run.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Failed outcomes in execution order.
    pub fn failures(&self) -> impl Iterator<Item = &ExecutionOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.success)
    }

    /// Wall-clock duration of the batch in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.finished_at
            .signed_duration_since(self.started_at)
            .num_milliseconds()
            .try_into()
            .unwrap_or(0)
    }

    /// Run status for this batch.
    pub fn status(&self) -> RunStatus {
        if self.outcomes.is_empty() {
            RunStatus::NothingToRun
        } else if self.failed > 0 {
            RunStatus::CompletedWithFailures
        } else {
            RunStatus::Succeeded
        }
    }

    /// Serializes the summary as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns a serialization error if encoding fails.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| DbSetupError::Serialization {
            context: "Execution summary serialization".to_string(),
            source: e,
        })
    }
}

/// Counts successes and failures. Pure; the outcomes keep their order.
pub fn summarize(outcomes: Vec<ExecutionOutcome>, started_at: DateTime<Utc>) -> ExecutionSummary {
    let succeeded = outcomes.iter().filter(|outcome| outcome.success).count();
    let failed = outcomes.len().saturating_sub(succeeded);
    ExecutionSummary {
        outcomes,
        succeeded,
        failed,
        started_at,
        finished_at: Utc::now(),
    }
}

/// Process-level result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every file committed
    Succeeded,
    /// The filter selected no files
    NothingToRun,
    /// Configuration, rule or connection failure; no file was touched
    SetupFailed,
    /// The batch ran and at least one file failed
    CompletedWithFailures,
}

impl RunStatus {
    /// Process exit code.
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Succeeded | Self::NothingToRun => 0,
            Self::SetupFailed => 1,
            Self::CompletedWithFailures => 2,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Succeeded => "all files executed successfully",
            Self::NothingToRun => "no SQL files to execute",
            Self::SetupFailed => "setup failed; no files executed",
            Self::CompletedWithFailures => "completed with failures",
        };
        f.write_str(text)
    }
}
