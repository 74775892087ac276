//! Error types for the benchmark harness.
//!
//! One enum per subsystem:
//! - Dataset loading and parsing
//! - Agent invocation (subprocess + retry layer)
//! - Grading / sandboxed test execution
//! - Report serialization and persistence

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while loading a benchmark dataset.
///
/// All of these are fatal startup errors: a run never starts against a
/// missing or unreadable dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse dataset record at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Dataset contains no tasks: {0}")]
    Empty(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while invoking the external agent binary.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The agent binary is missing from PATH. A configuration error, never
    /// retried; terminates the whole run.
    #[error("Agent binary not found: {0}")]
    BinaryMissing(String),

    #[error("Failed to spawn agent process: {0}")]
    Spawn(String),

    /// A single attempt exceeded the per-call timeout. Transient; the
    /// invoker's retry loop consumes this internally.
    #[error("Agent invocation timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while setting up sandboxed grading.
///
/// Test failures themselves are never errors; they are recorded verdicts.
/// This enum covers environmental problems only.
#[derive(Debug, Error)]
pub enum GradeError {
    #[error("Failed to set up grading sandbox: {0}")]
    Setup(String),

    #[error("Python interpreter not found: {0}")]
    InterpreterMissing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while writing the run report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
