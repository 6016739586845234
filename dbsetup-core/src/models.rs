//! Core data models shared by the classifier, filter and executor.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Game-server framework a SQL file belongs to.
///
/// `Other` is the "run everything" target and is never produced by the
/// classifier; `Unknown` is the classifier's no-match result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    /// QBCore
    QbCore,
    /// QBX, the QBCore fork built on OX resources
    Qbx,
    /// OX (overextended)
    Ox,
    /// ESX (es_extended)
    Esx,
    /// Run every file; a target only
    Other,
    /// No rule matched; a classification only
    Unknown,
}

impl Framework {
    /// Frameworks a user may select as a run target, in menu order.
    pub const TARGETS: [Self; 5] = [Self::QbCore, Self::Qbx, Self::Ox, Self::Esx, Self::Other];

    /// Lower-case identifier used in rule tables, logs and reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QbCore => "qbcore",
            Self::Qbx => "qbx",
            Self::Ox => "ox",
            Self::Esx => "esx",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }

    /// Human-facing label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::QbCore => "QBCore",
            Self::Qbx => "QBX (QBCore fork for OX)",
            Self::Ox => "OX",
            Self::Esx => "ESX",
            Self::Other => "Other (run all)",
            Self::Unknown => "Generic",
        }
    }

    /// True for the four real frameworks.
    pub const fn is_concrete(self) -> bool {
        !matches!(self, Self::Other | Self::Unknown)
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a framework name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown framework '{0}' (expected one of: qbcore, qbx, ox, esx, other)")]
pub struct ParseFrameworkError(pub String);

impl std::str::FromStr for Framework {
    type Err = ParseFrameworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qbcore" | "qb" => Ok(Self::QbCore),
            "qbx" => Ok(Self::Qbx),
            "ox" | "oxcore" => Ok(Self::Ox),
            "esx" => Ok(Self::Esx),
            "other" | "all" => Ok(Self::Other),
            "unknown" => Ok(Self::Unknown),
            other => Err(ParseFrameworkError(other.to_string())),
        }
    }
}

/// One discovered SQL migration file.
///
/// The content is read at most once, on first use, and decoded lossily so a
/// file with invalid UTF-8 still classifies and executes.
#[derive(Debug, Clone)]
pub struct SqlFile {
    path: PathBuf,
    relative_path: String,
    file_name: String,
    content: OnceLock<String>,
}

impl SqlFile {
    /// Creates a file rooted at `root`; the relative path is derived from it.
    pub fn new(path: impl Into<PathBuf>, root: &Path) -> Self {
        let path = path.into();
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let relative_path = normalize_separators(&relative.to_string_lossy());
        Self::with_relative_path(path, relative_path)
    }

    /// Creates a file with an explicit relative path.
    pub fn with_relative_path(path: impl Into<PathBuf>, relative_path: impl Into<String>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            relative_path: relative_path.into(),
            file_name,
            content: OnceLock::new(),
        }
    }

    /// Creates a file whose content is already known. Nothing is read from
    /// disk for it.
    pub fn from_content(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        let relative_path = normalize_separators(&relative_path.into());
        let file = Self::with_relative_path(PathBuf::from(&relative_path), relative_path);
        let _ = file.content.set(content.into());
        file
    }

    /// Path on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to the scan root, with `/` separators.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Base file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Reads (once) and returns the file content.
    ///
    /// # Errors
    /// Returns the I/O error if the file cannot be read. Invalid UTF-8 is not
    /// an error; malformed sequences are replaced.
    pub fn content(&self) -> std::io::Result<&str> {
        if let Some(text) = self.content.get() {
            return Ok(text);
        }
        let bytes = std::fs::read(&self.path)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(self.content.get_or_init(|| text))
    }
}

impl PartialEq for SqlFile {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.relative_path == other.relative_path
    }
}

impl Eq for SqlFile {}

/// Replaces `\` with `/` so paths compare the same on every platform.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Result of executing one SQL file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Path relative to the scan root
    pub relative_path: String,
    /// Classifier label for the file
    pub framework: Framework,
    /// Whether every statement ran and the transaction committed
    pub success: bool,
    /// Error text, present iff `success` is false
    pub error: Option<String>,
    /// Number of statements that succeeded
    pub statements_executed: usize,
    /// Wall-clock time spent on the file
    pub duration_ms: u64,
}

impl ExecutionOutcome {
    /// Creates a successful outcome.
    pub fn succeeded(relative_path: impl Into<String>, framework: Framework) -> Self {
        Self {
            relative_path: relative_path.into(),
            framework,
            success: true,
            error: None,
            statements_executed: 0,
            duration_ms: 0,
        }
    }

    /// Creates a failed outcome. An empty message is replaced so a failure
    /// always carries non-empty error text.
    pub fn failed(
        relative_path: impl Into<String>,
        framework: Framework,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            "unknown error".to_string()
        } else {
            error
        };
        Self {
            relative_path: relative_path.into(),
            framework,
            success: false,
            error: Some(error),
            statements_executed: 0,
            duration_ms: 0,
        }
    }

    /// Sets the statement count.
    #[must_use]
    pub const fn with_statements(mut self, statements: usize) -> Self {
        self.statements_executed = statements;
        self
    }

    /// Sets the elapsed time.
    #[must_use]
    pub const fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}
