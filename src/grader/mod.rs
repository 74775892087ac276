//! Candidate grading.
//!
//! Code mode runs the benchmark's hidden tests against the candidate inside
//! a temporary-directory sandbox and checks for a success sentinel. Diff
//! mode only checks that a non-empty patch was produced.

mod sandbox;

pub use sandbox::Sandbox;

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::time::timeout;

use crate::dataset::Task;
use crate::error::GradeError;

/// Token the synthesized test driver prints when every check passes.
pub const SUCCESS_SENTINEL: &str = "ALL_TESTS_PASSED";

/// Maximum length of a recorded error tail.
const ERR_TAIL_CHARS: usize = 1000;

/// Error tail recorded when extraction produced nothing.
pub const TAIL_NO_CODE: &str = "no_code";

/// Error tail recorded when the test run hit its wall-clock limit.
pub const TAIL_TIMEOUT: &str = "timeout";

/// Verdict for one graded candidate. Grading failures are verdicts, not
/// errors; `GradeError` covers environmental problems only.
#[derive(Debug, Clone)]
pub struct GradeOutcome {
    pub passed: bool,
    pub test_latency_secs: Option<f64>,
    pub err_tail: Option<String>,
    pub diff_bytes: Option<usize>,
}

impl GradeOutcome {
    fn fail(tail: &str) -> Self {
        Self {
            passed: false,
            test_latency_secs: None,
            err_tail: Some(tail.to_string()),
            diff_bytes: None,
        }
    }
}

pub struct Grader {
    python_bin: String,
    test_timeout: Duration,
}

impl Grader {
    pub fn new(python_bin: impl Into<String>, test_timeout: Duration) -> Self {
        Self {
            python_bin: python_bin.into(),
            test_timeout,
        }
    }

    /// Grade a Python candidate against the task's hidden tests.
    pub async fn grade_code(
        &self,
        candidate: &str,
        task: &Task,
    ) -> Result<GradeOutcome, GradeError> {
        if candidate.trim().is_empty() {
            return Ok(GradeOutcome::fail(TAIL_NO_CODE));
        }
        let Some(test_src) = &task.hidden_test else {
            return Ok(GradeOutcome::fail("no_hidden_tests"));
        };

        let sandbox = Sandbox::create()?;
        self.execute_tests(&sandbox, candidate, test_src, task.entry_point.as_deref())
            .await
    }

    /// Grade a diff candidate. No execution; presence and size only.
    pub fn grade_diff(&self, diff: &str) -> GradeOutcome {
        let diff = diff.trim();
        if diff.is_empty() {
            return GradeOutcome::fail(TAIL_NO_CODE);
        }
        GradeOutcome {
            passed: true,
            test_latency_secs: None,
            err_tail: None,
            diff_bytes: Some(diff.len()),
        }
    }

    async fn execute_tests(
        &self,
        sandbox: &Sandbox,
        candidate: &str,
        test_src: &str,
        entry_point: Option<&str>,
    ) -> Result<GradeOutcome, GradeError> {
        sandbox.write_file("candidate.py", candidate)?;
        sandbox.write_file("run_tests.py", &build_test_driver(test_src, entry_point))?;

        let mut cmd = Command::new(&self.python_bin);
        cmd.arg("run_tests.py")
            .current_dir(sandbox.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GradeError::InterpreterMissing(self.python_bin.clone())
            } else {
                GradeError::Setup(e.to_string())
            }
        })?;

        let output = match timeout(self.test_timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Ok(GradeOutcome {
                    passed: false,
                    test_latency_secs: Some(self.test_timeout.as_secs_f64()),
                    err_tail: Some(TAIL_TIMEOUT.to_string()),
                    diff_bytes: None,
                });
            }
        };

        let elapsed = started.elapsed().as_secs_f64();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() && stdout.contains(SUCCESS_SENTINEL) {
            Ok(GradeOutcome {
                passed: true,
                test_latency_secs: Some(elapsed),
                err_tail: None,
                diff_bytes: None,
            })
        } else {
            let combined = format!("{stdout}{stderr}");
            let tail = if combined.trim().is_empty() {
                "no_output".to_string()
            } else {
                truncate_tail(&combined, ERR_TAIL_CHARS)
            };
            Ok(GradeOutcome {
                passed: false,
                test_latency_secs: Some(elapsed),
                err_tail: Some(tail),
                diff_bytes: None,
            })
        }
    }
}

/// Synthesize the test driver executed inside the sandbox. Imports the
/// candidate module, runs the hidden tests, calls `check(entry_point)` when
/// an entry point is known, and prints the sentinel last.
fn build_test_driver(test_src: &str, entry_point: Option<&str>) -> String {
    let mut driver = String::from("from candidate import *\n\n");
    driver.push_str(test_src);
    driver.push('\n');
    if let Some(entry) = entry_point {
        driver.push_str(&format!("check({entry})\n"));
    }
    driver.push_str(&format!("print(\"{SUCCESS_SENTINEL}\")\n"));
    driver
}

/// Last `max_chars` characters of `text`, on a char boundary.
fn truncate_tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        text.to_string()
    } else {
        text.chars().skip(count - max_chars).collect()
    }
}
