//! Run results, summary statistics, and report persistence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReportError;
use crate::grader::TAIL_NO_CODE;

/// Token counts for one invocation. Field names tolerate both the agent's
/// and upstream providers' conventions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default, alias = "prompt_tokens")]
    pub input_tokens: u64,
    #[serde(default, alias = "completion_tokens")]
    pub output_tokens: u64,
}

/// Final record for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedResult {
    pub task_id: String,
    pub passed: bool,
    pub gen_latency_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_latency_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err_tail: Option<String>,
    pub gen_timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_bytes: Option<usize>,
}

/// Run identity and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: Uuid,
    pub bench: String,
    pub provider: String,
    pub model: String,
    pub seed: u64,
    pub requested_count: usize,
    pub started_at: DateTime<Utc>,
}

/// Aggregate statistics over a run's results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub n: usize,
    pub passed: usize,
    pub pass_rate: f64,
    pub latency_p50_secs: f64,
    pub latency_p90_secs: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// Present only when both per-1k prices were configured. Absent means
    /// unknown, not free.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_estimate_usd: Option<f64>,
    /// Tasks that failed in the generation layer (timeout or no extracted
    /// code) rather than in grading.
    pub gen_errors: usize,
}

/// Nearest-rank percentile: index = round(q * (n - 1)), clamped.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Build summary statistics from graded results.
pub fn summarize(results: &[GradedResult], price_in_per_1k: f64, price_out_per_1k: f64) -> Summary {
    let n = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    let latencies: Vec<f64> = results.iter().map(|r| r.gen_latency_secs).collect();

    let total_input_tokens: u64 = results
        .iter()
        .filter_map(|r| r.usage.map(|u| u.input_tokens))
        .sum();
    let total_output_tokens: u64 = results
        .iter()
        .filter_map(|r| r.usage.map(|u| u.output_tokens))
        .sum();

    let cost_estimate_usd = if price_in_per_1k > 0.0 && price_out_per_1k > 0.0 {
        Some(
            total_input_tokens as f64 / 1000.0 * price_in_per_1k
                + total_output_tokens as f64 / 1000.0 * price_out_per_1k,
        )
    } else {
        None
    };

    let gen_errors = results
        .iter()
        .filter(|r| r.gen_timed_out || r.err_tail.as_deref() == Some(TAIL_NO_CODE))
        .count();

    Summary {
        n,
        passed,
        pass_rate: if n == 0 { 0.0 } else { passed as f64 / n as f64 },
        latency_p50_secs: percentile(&latencies, 0.5),
        latency_p90_secs: percentile(&latencies, 0.9),
        total_input_tokens,
        total_output_tokens,
        cost_estimate_usd,
        gen_errors,
    }
}

/// Replace every non-alphanumeric character so model names are safe in
/// filenames.
pub fn sanitize_model(model: &str) -> String {
    model
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Complete run report as persisted to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: RunMeta,
    pub summary: Summary,
    pub results: Vec<GradedResult>,
}

impl Report {
    /// Write the report to `<dir>/<bench>_<timestamp>_<model>_<n>.json` and
    /// return the path.
    pub fn write(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(dir)?;
        let filename = format!(
            "{}_{}_{}_{}.json",
            self.meta.bench,
            self.meta.started_at.format("%Y%m%d-%H%M%S"),
            sanitize_model(&self.meta.model),
            self.summary.n
        );
        let path = dir.join(filename);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_nearest_rank() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.5), 3.0);
        assert_eq!(percentile(&values, 0.9), 5.0);
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 1.0), 5.0);
    }

    #[test]
    fn percentile_empty_is_zero() {
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn percentile_sorts_input() {
        let values = [5.0, 1.0, 3.0, 2.0, 4.0];
        assert_eq!(percentile(&values, 0.5), 3.0);
    }

    fn result(passed: bool, latency: f64, usage: Option<TokenUsage>) -> GradedResult {
        GradedResult {
            task_id: "t".to_string(),
            passed,
            gen_latency_secs: latency,
            test_latency_secs: None,
            err_tail: None,
            gen_timed_out: false,
            usage,
            diff_bytes: None,
        }
    }

    #[test]
    fn cost_absent_without_both_prices() {
        let usage = Some(TokenUsage {
            input_tokens: 1000,
            output_tokens: 500,
        });
        let results = vec![result(true, 1.0, usage)];

        assert!(summarize(&results, 0.0, 0.0).cost_estimate_usd.is_none());
        assert!(summarize(&results, 0.01, 0.0).cost_estimate_usd.is_none());
        assert!(summarize(&results, 0.0, 0.03).cost_estimate_usd.is_none());

        let cost = summarize(&results, 0.01, 0.03).cost_estimate_usd.unwrap();
        assert!((cost - (0.01 + 0.015)).abs() < 1e-9);
    }

    #[test]
    fn gen_errors_counts_timeouts_and_no_code() {
        let mut timed_out = result(false, 120.0, None);
        timed_out.gen_timed_out = true;
        let mut no_code = result(false, 2.0, None);
        no_code.err_tail = Some(TAIL_NO_CODE.to_string());
        let mut test_fail = result(false, 2.0, None);
        test_fail.err_tail = Some("AssertionError".to_string());

        let summary = summarize(&[timed_out, no_code, test_fail], 0.0, 0.0);
        assert_eq!(summary.gen_errors, 2);
        assert_eq!(summary.passed, 0);
    }

    #[test]
    fn model_name_sanitized_for_filenames() {
        assert_eq!(
            sanitize_model("openai/gpt-5.2-codex:nitro"),
            "openai-gpt-5-2-codex-nitro"
        );
    }

    #[test]
    fn report_written_with_expected_filename() {
        let dir = tempfile::tempdir().unwrap();
        let started_at = "2026-08-23T10:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let results = vec![result(true, 1.5, None)];
        let report = Report {
            meta: RunMeta {
                run_id: Uuid::new_v4(),
                bench: "humaneval".to_string(),
                provider: "openrouter".to_string(),
                model: "org/model:tag".to_string(),
                seed: 42,
                requested_count: 1,
                started_at,
            },
            summary: summarize(&results, 0.0, 0.0),
            results,
        };

        let path = report.write(dir.path()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "humaneval_20260823-103000_org-model-tag_1.json"
        );
        let reloaded: Report =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded.summary.n, 1);
    }
}
