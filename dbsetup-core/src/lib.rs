//! Core library for dbsetup, the FiveM database setup tool.
//!
//! A FiveM server tree contains SQL migrations for several game frameworks
//! (QBCore, QBX, OX, ESX). This crate decides which of those files belong to
//! the server's framework and runs them against MySQL, one transaction per
//! file.
//!
//! # Architecture
//! - `rules`: framework keyword/pattern tables and the path policy, as data
//! - `classifier`: best-guess framework of one SQL file
//! - `filter`: the ordered execution set for a target framework
//! - `executor`: sequential per-file transactions over a [`SqlConnection`]
//! - `report`: outcome aggregation and the process-level [`RunStatus`]
//! - `connection` / `discovery`: connection-string resolution and file search
//! - `pipeline`: the above bundled behind one [`Pipeline`] value
//!
//! # Security Guarantees
//! - Passwords are zeroed on drop and never logged or displayed
//! - Connection strings are redacted in error messages

pub mod classifier;
pub mod connection;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod filter;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod rules;

// Re-export commonly used types
pub use classifier::Classifier;
pub use connection::{
    ConnectionParams, ConnectionSource, ResolvedConnection, parse_connection_string,
    resolve_connection,
};
pub use discovery::discover_sql_files;
pub use error::{DbSetupError, Result};
pub use executor::{ProgressEvent, SqlConnection, execute_batch, execute_file};
pub use filter::{ExecutionPlan, FileFilter, PlannedFile, Reason};
pub use models::{ExecutionOutcome, Framework, ParseFrameworkError, SqlFile};
pub use pipeline::Pipeline;
pub use report::{ExecutionSummary, RunStatus, summarize};
pub use rules::{RuleSet, RuleSetSpec};

#[cfg(feature = "mysql")]
pub use executor::MySqlSession;
