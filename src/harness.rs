//! Sequential benchmark driver.
//!
//! One task in flight at a time: invoke the agent, extract a candidate,
//! grade it, append the result. Aggregation and report persistence happen
//! once at the end. Per-task failures are logged at debug level only; the
//! single console hint fires when the whole run passed nothing.

use anyhow::Context;
use chrono::Utc;
use uuid::Uuid;

use crate::config::BenchConfig;
use crate::dataset::{GradingMode, Task};
use crate::extract;
use crate::grader::Grader;
use crate::invoker::{AgentEndpoint, Invoker, RetryPolicy};
use crate::report::{summarize, GradedResult, Report, RunMeta};
use crate::sampler::TaskSampler;

pub struct Harness<E: AgentEndpoint> {
    config: BenchConfig,
    invoker: Invoker<E>,
    grader: Grader,
}

impl<E: AgentEndpoint> Harness<E> {
    pub fn new(config: BenchConfig, endpoint: E) -> Self {
        let invoker = Invoker::new(
            endpoint,
            RetryPolicy {
                max_retries: config.max_retries,
                initial_backoff: config.initial_backoff,
            },
            config.timeout,
        );
        let grader = Grader::new(config.python_bin.clone(), config.test_timeout);
        Self {
            config,
            invoker,
            grader,
        }
    }

    /// Run the benchmark over the loaded dataset and persist the report.
    ///
    /// Returns `Ok` for any completed run, including a 0% pass rate. Errors
    /// are setup problems only (agent binary missing, report unwritable).
    pub async fn run(&self, tasks: &[Task]) -> anyhow::Result<Report> {
        let started_at = Utc::now();
        let sampler = TaskSampler::new(self.config.seed);

        let (selected, requested_count) = match &self.config.task_ids {
            Some(ids) => (sampler.select(tasks, ids), ids.len()),
            None => (sampler.sample(tasks, self.config.count), self.config.count),
        };

        tracing::info!(
            bench = self.config.bench.label(),
            model = %self.config.model,
            n = selected.len(),
            seed = self.config.seed,
            "Starting benchmark run"
        );

        let mut results = Vec::with_capacity(selected.len());
        for (i, task) in selected.iter().enumerate() {
            let result = self.run_task(task).await?;
            tracing::debug!(
                task_id = %result.task_id,
                passed = result.passed,
                gen_latency_secs = result.gen_latency_secs,
                err_tail = result.err_tail.as_deref(),
                "Task graded"
            );
            results.push(result);

            if !self.config.sleep_between.is_zero() && i + 1 < selected.len() {
                tokio::time::sleep(self.config.sleep_between).await;
            }
        }

        let summary = summarize(
            &results,
            self.config.price_per_1k_input,
            self.config.price_per_1k_output,
        );
        let report = Report {
            meta: RunMeta {
                run_id: Uuid::new_v4(),
                bench: self.config.bench.label().to_string(),
                provider: self.config.provider.clone(),
                model: self.config.model.clone(),
                seed: self.config.seed,
                requested_count,
                started_at,
            },
            summary,
            results,
        };

        let path = report
            .write(&self.config.reports_dir)
            .context("Failed to write run report")?;
        tracing::info!(
            path = %path.display(),
            pass_rate = report.summary.pass_rate,
            "Benchmark run complete"
        );

        if report.summary.n > 0 && report.summary.passed == 0 {
            println!(
                "Pass rate is 0. {} of {} tasks failed in the generation layer \
                 (timeout or no extracted code); check agent connectivity and \
                 model settings.",
                report.summary.gen_errors, report.summary.n
            );
        }

        Ok(report)
    }

    async fn run_task(&self, task: &Task) -> anyhow::Result<GradedResult> {
        let prompt = self.config.bench.render_prompt(task);
        let invocation = self
            .invoker
            .invoke(&prompt)
            .await
            .with_context(|| format!("Agent invocation failed for task {}", task.id))?;

        let outcome = match self.config.bench.grading() {
            GradingMode::Code => {
                let candidate =
                    extract::extract_code(&invocation.text, self.config.bench.fence_tag());
                self.grader
                    .grade_code(&candidate, task)
                    .await
                    .with_context(|| format!("Grading failed for task {}", task.id))?
            }
            GradingMode::DiffOnly => {
                let diff = extract::extract_diff(&invocation.text);
                self.grader.grade_diff(&diff)
            }
        };

        Ok(GradedResult {
            task_id: task.id.clone(),
            passed: outcome.passed,
            gen_latency_secs: invocation.latency_secs,
            test_latency_secs: outcome.test_latency_secs,
            err_tail: outcome.err_tail,
            gen_timed_out: invocation.timed_out,
            usage: invocation.usage,
            diff_bytes: outcome.diff_bytes,
        })
    }
}
