//! agent-bench: benchmark execution harness for CLI coding agents.
//!
//! Samples tasks from a code-generation dataset, invokes an external agent
//! binary per task with timeout and retry, extracts a code or diff candidate
//! from the agent's output, grades it in a sandboxed Python run, and writes
//! an aggregated JSON report.

pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod grader;
pub mod harness;
pub mod invoker;
pub mod report;
pub mod sampler;

// Re-export commonly used error types
pub use error::{DatasetError, GradeError, InvokeError, ReportError};
