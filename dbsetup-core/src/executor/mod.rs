//! Sequential execution of SQL files, one transaction per file.
//!
//! # Module Structure
//! - `mysql`: [`SqlConnection`] backed by a single sqlx MySQL connection
//!   (feature `mysql`)
//!
//! A file's content is split on `;`, fragments are trimmed and empty ones
//! dropped, and each remaining fragment runs as one statement in textual
//! order. The transaction commits only if every statement succeeded and is
//! rolled back explicitly otherwise. A failed file never stops the batch.
//!
//! Splitting is textual: a `;` inside a string literal, comment or stored
//! routine body splits the statement as well.

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "mysql")]
pub use mysql::MySqlSession;

use crate::Result;
use crate::error::DbSetupError;
use crate::filter::PlannedFile;
use crate::models::{ExecutionOutcome, Framework, SqlFile};
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Statement delimiter.
pub const STATEMENT_DELIMITER: char = ';';

/// A single database connection able to run raw statements in a transaction.
///
/// # Object Safety
/// This trait is object-safe, so the executor works with
/// `&mut dyn SqlConnection` and tests can substitute an in-memory recorder.
#[async_trait]
pub trait SqlConnection: Send {
    /// Starts a transaction.
    ///
    /// # Errors
    /// Returns a transaction error if the server rejects it.
    async fn begin(&mut self) -> Result<()>;

    /// Runs one statement inside the current transaction.
    ///
    /// # Errors
    /// Returns the driver's message for a failing statement.
    async fn execute(&mut self, statement: &str) -> Result<()>;

    /// Commits the current transaction.
    ///
    /// # Errors
    /// Returns a transaction error if the commit fails.
    async fn commit(&mut self) -> Result<()>;

    /// Rolls back the current transaction.
    ///
    /// # Errors
    /// Returns a transaction error if the rollback fails.
    async fn rollback(&mut self) -> Result<()>;

    /// Closes the connection. Further calls fail.
    ///
    /// # Errors
    /// Returns a connection error if the shutdown handshake fails.
    async fn close(&mut self) -> Result<()>;
}

/// Splits SQL text into trimmed, non-empty statements.
pub fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(STATEMENT_DELIMITER)
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .collect()
}

/// Executes one file in its own transaction.
///
/// Returns `None` on success and the error message otherwise.
pub async fn execute_file(file: &SqlFile, conn: &mut dyn SqlConnection) -> Option<String> {
    run_file(file, conn).await.err().map(|e| e.to_string())
}

async fn run_file(file: &SqlFile, conn: &mut dyn SqlConnection) -> Result<usize> {
    let content = file.content().map_err(|e| {
        DbSetupError::io(format!("Failed to read {}", file.relative_path()), e)
    })?;
    let statements = split_statements(content);

    conn.begin().await?;

    let mut executed: usize = 0;
    for statement in &statements {
        let index = executed.saturating_add(1);
        if let Err(e) = conn.execute(statement).await {
            rollback_quietly(conn, file).await;
            return Err(match e {
                DbSetupError::Statement { message, .. } => {
                    DbSetupError::statement_failed(index, message)
                }
                other => DbSetupError::statement_failed(index, other.to_string()),
            });
        }
        executed = index;
    }

    if let Err(e) = conn.commit().await {
        rollback_quietly(conn, file).await;
        return Err(e);
    }

    Ok(executed)
}

async fn rollback_quietly(conn: &mut dyn SqlConnection, file: &SqlFile) {
    if let Err(e) = conn.rollback().await {
        warn!("Rollback of {} failed: {}", file.relative_path(), e);
    }
}

/// Executes one planned file and records the outcome.
pub async fn execute_planned(
    planned: &PlannedFile,
    conn: &mut dyn SqlConnection,
) -> ExecutionOutcome {
    let framework = planned.classification.unwrap_or(Framework::Other);
    let path = planned.file.relative_path();
    let started = Instant::now();

    let outcome = match run_file(&planned.file, conn).await {
        Ok(statements) => {
            info!("Executed {} ({} statements)", path, statements);
            ExecutionOutcome::succeeded(path, framework).with_statements(statements)
        }
        Err(e) => {
            error!("Failed {}: {}", path, e);
            let succeeded = match &e {
                DbSetupError::Statement { index, .. } => index.saturating_sub(1),
                _ => 0,
            };
            ExecutionOutcome::failed(path, framework, e.to_string()).with_statements(succeeded)
        }
    };

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    outcome.with_duration_ms(elapsed_ms)
}

/// Progress notification emitted by [`execute_batch`].
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent<'a> {
    /// A file is about to run
    Started {
        /// Zero-based position in the batch
        index: usize,
        /// Batch size
        total: usize,
        /// Relative path of the file
        path: &'a str,
    },
    /// A file has finished
    Finished {
        /// Zero-based position in the batch
        index: usize,
        /// Batch size
        total: usize,
        /// Result for the file
        outcome: &'a ExecutionOutcome,
    },
}

impl ProgressEvent<'_> {
    /// Share of the batch completed, 0 to 100.
    pub fn percent(&self) -> u8 {
        let (done, total) = match *self {
            Self::Started { index, total, .. } => (index, total),
            Self::Finished { index, total, .. } => (index.saturating_add(1), total),
        };
        let percent = done
            .saturating_mul(100)
            .checked_div(total)
            .unwrap_or(100)
            .min(100);
        u8::try_from(percent).unwrap_or(100)
    }
}

/// Runs every file strictly in order and closes the connection afterwards.
///
/// Returns one outcome per file, in input order. A close failure is logged;
/// it does not change any outcome.
pub async fn execute_batch<F>(
    conn: &mut dyn SqlConnection,
    files: &[PlannedFile],
    mut on_progress: F,
) -> Vec<ExecutionOutcome>
where
    F: FnMut(ProgressEvent<'_>) + Send,
{
    let total = files.len();
    let mut outcomes = Vec::with_capacity(total);

    for (index, planned) in files.iter().enumerate() {
        on_progress(ProgressEvent::Started {
            index,
            total,
            path: planned.file.relative_path(),
        });
        let outcome = execute_planned(planned, conn).await;
        on_progress(ProgressEvent::Finished {
            index,
            total,
            outcome: &outcome,
        });
        outcomes.push(outcome);
    }

    if let Err(e) = conn.close().await {
        warn!("Closing the database connection failed: {}", e);
    } else {
        debug!("Database connection closed");
    }

    outcomes
}
