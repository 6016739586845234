//! The discover → classify → filter → execute → summarize pipeline.
//!
//! Front-ends only resolve the connection, pick the target framework and
//! present the results; everything in between goes through [`Pipeline`].

use crate::Result;
use crate::discovery::discover_sql_files;
use crate::executor::{ProgressEvent, SqlConnection, execute_batch};
use crate::filter::{ExecutionPlan, FileFilter, PlannedFile};
use crate::models::{ExecutionOutcome, Framework, SqlFile};
use crate::report::{ExecutionSummary, summarize};
use crate::rules::RuleSet;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Core operations bound to one rule set.
#[derive(Debug, Clone)]
pub struct Pipeline {
    rules: Arc<RuleSet>,
    filter: FileFilter,
}

impl Pipeline {
    /// Creates a pipeline over the given rule tables.
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            filter: FileFilter::new(Arc::clone(&rules)),
            rules,
        }
    }

    /// Pipeline over the built-in tables.
    ///
    /// # Errors
    /// Only fails if the built-in tables are broken.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(Arc::new(RuleSet::builtin()?)))
    }

    /// Rule tables in use.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Finds SQL files below `root`.
    ///
    /// # Errors
    /// Returns an I/O error if `root` is not an accessible directory.
    pub fn discover(&self, root: &Path) -> Result<Vec<SqlFile>> {
        discover_sql_files(root)
    }

    /// Classifies one file.
    pub fn classify(&self, file: &SqlFile) -> Framework {
        self.filter.classifier().classify(file)
    }

    /// Builds the per-file verdicts for `target`.
    pub fn filter(&self, files: &[SqlFile], target: Framework) -> ExecutionPlan {
        let plan = self.filter.evaluate(files, target);
        info!(
            "{} of {} SQL files selected for {}",
            plan.included_count(),
            files.len(),
            target.label()
        );
        plan
    }

    /// Discovers and filters in one step.
    ///
    /// # Errors
    /// Returns an I/O error if `root` is not an accessible directory.
    pub fn plan(&self, root: &Path, target: Framework) -> Result<ExecutionPlan> {
        let files = self.discover(root)?;
        Ok(self.filter(&files, target))
    }

    /// Runs the given files and closes the connection.
    pub async fn execute<F>(
        &self,
        conn: &mut dyn SqlConnection,
        files: &[PlannedFile],
        on_progress: F,
    ) -> Vec<ExecutionOutcome>
    where
        F: FnMut(ProgressEvent<'_>) + Send,
    {
        execute_batch(conn, files, on_progress).await
    }

    /// Aggregates outcomes.
    pub fn summarize(
        &self,
        outcomes: Vec<ExecutionOutcome>,
        started_at: DateTime<Utc>,
    ) -> ExecutionSummary {
        summarize(outcomes, started_at)
    }

    /// Executes a plan's execution set and summarizes it.
    pub async fn run<F>(
        &self,
        conn: &mut dyn SqlConnection,
        plan: &ExecutionPlan,
        on_progress: F,
    ) -> ExecutionSummary
    where
        F: FnMut(ProgressEvent<'_>) + Send,
    {
        let started_at = Utc::now();
        let entries = plan.execution_entries();
        let outcomes = self.execute(conn, &entries, on_progress).await;
        let summary = self.summarize(outcomes, started_at);
        info!(
            "Executed {} files: {} succeeded, {} failed",
            summary.total(),
            summary.succeeded,
            summary.failed
        );
        summary
    }
}
