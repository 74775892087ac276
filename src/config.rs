//! Run configuration for the benchmark harness.
//!
//! A `BenchConfig` is built once by the CLI layer and never mutated after
//! that point. All knobs the environment used to control flow through here.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dataset::BenchKind;

/// Default RNG seed for task sampling. Fixed so two runs with the same
/// dataset and count grade the same task subset.
pub const DEFAULT_SEED: u64 = 42;

/// Default per-call timeout for one agent invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of transient-failure retries per task.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default initial backoff before the first retry. Doubles per attempt.
pub const DEFAULT_BACKOFF_SECS: u64 = 5;

/// Default wall-clock limit for one sandboxed test run.
pub const DEFAULT_TEST_TIMEOUT_SECS: u64 = 30;

/// Immutable configuration for a single benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Which benchmark family is being run.
    pub bench: BenchKind,
    /// Path to the task dataset (JSONL, optionally gzip-compressed).
    pub dataset_path: PathBuf,
    /// Number of tasks to sample. Saturates at the dataset size.
    pub count: usize,
    /// Explicit task-ID allowlist. When present it overrides `count`.
    pub task_ids: Option<Vec<String>>,
    /// Seed for the sampling shuffle.
    pub seed: u64,
    /// Provider name forwarded to the agent binary.
    pub provider: String,
    /// Model identifier forwarded to the agent binary.
    pub model: String,
    /// Name (or path) of the agent executable.
    pub agent_bin: String,
    /// Whether the agent may use its tool suite.
    pub allow_tools: bool,
    /// Sampling temperature forwarded to the agent.
    pub temperature: f64,
    /// Output token ceiling forwarded to the agent.
    pub max_output_tokens: u32,
    /// Request the agent's JSON output envelope (enables token accounting).
    pub agent_json: bool,
    /// Per-call timeout for one agent invocation.
    pub timeout: Duration,
    /// Retry budget for transient failures (timeouts, rate limits).
    pub max_retries: u32,
    /// Initial backoff before the first retry.
    pub initial_backoff: Duration,
    /// Pause between consecutive tasks. Zero disables it.
    pub sleep_between: Duration,
    /// Wall-clock limit for one sandboxed test run.
    pub test_timeout: Duration,
    /// Python interpreter used for grading.
    pub python_bin: String,
    /// Price per 1k input tokens in USD. Zero means unknown.
    pub price_per_1k_input: f64,
    /// Price per 1k output tokens in USD. Zero means unknown.
    pub price_per_1k_output: f64,
    /// Directory where run reports are written.
    pub reports_dir: PathBuf,
}

impl BenchConfig {
    /// Create a configuration with defaults for everything except the
    /// benchmark kind and dataset location.
    pub fn new(bench: BenchKind, dataset_path: PathBuf) -> Self {
        Self {
            bench,
            dataset_path,
            count: bench.default_count(),
            task_ids: None,
            seed: DEFAULT_SEED,
            provider: "openrouter".to_string(),
            model: "openai/gpt-5.2-codex:nitro".to_string(),
            agent_bin: "agent".to_string(),
            allow_tools: false,
            temperature: 0.2,
            max_output_tokens: 4096,
            agent_json: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
            sleep_between: Duration::ZERO,
            test_timeout: Duration::from_secs(DEFAULT_TEST_TIMEOUT_SECS),
            python_bin: "python3".to_string(),
            price_per_1k_input: 0.0,
            price_per_1k_output: 0.0,
            reports_dir: PathBuf::from("./reports"),
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_task_ids(mut self, ids: Vec<String>) -> Self {
        self.task_ids = Some(ids);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_agent_bin(mut self, bin: impl Into<String>) -> Self {
        self.agent_bin = bin.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn with_reports_dir(mut self, dir: PathBuf) -> Self {
        self.reports_dir = dir;
        self
    }
}
