//! Benchmark kinds and dataset loading.
//!
//! Datasets are local JSONL files (optionally gzip-compressed) with one task
//! per line. Field names vary between published benchmark dumps, so the
//! loader tolerates the common aliases.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// Which benchmark family a run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchKind {
    HumanEval,
    Mbpp,
    SweLite,
}

/// How a benchmark's candidates are graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradingMode {
    /// Run the hidden tests against the candidate in a sandbox.
    Code,
    /// Accept any non-empty extracted diff; no execution.
    DiffOnly,
}

impl BenchKind {
    /// Default number of tasks to sample when no count is given.
    pub fn default_count(&self) -> usize {
        match self {
            BenchKind::HumanEval => 164,
            BenchKind::Mbpp => 50,
            BenchKind::SweLite => 25,
        }
    }

    /// Fence tag the agent is asked to emit its answer in.
    pub fn fence_tag(&self) -> &'static str {
        match self {
            BenchKind::HumanEval | BenchKind::Mbpp => "python",
            BenchKind::SweLite => "diff",
        }
    }

    pub fn grading(&self) -> GradingMode {
        match self {
            BenchKind::HumanEval | BenchKind::Mbpp => GradingMode::Code,
            BenchKind::SweLite => GradingMode::DiffOnly,
        }
    }

    /// Short label used in report filenames and metadata.
    pub fn label(&self) -> &'static str {
        match self {
            BenchKind::HumanEval => "humaneval",
            BenchKind::Mbpp => "mbpp",
            BenchKind::SweLite => "swe_lite",
        }
    }

    /// Wrap a task's prompt with the instruction preamble for this benchmark.
    pub fn render_prompt(&self, task: &Task) -> String {
        match self {
            BenchKind::HumanEval => format!(
                "Complete the following Python function. Respond with the \
                 full function implementation inside a single ```python code \
                 block and nothing else.\n\n{}",
                task.prompt
            ),
            BenchKind::Mbpp => {
                let mut prompt = format!(
                    "Write a Python function that solves the following \
                     problem. Respond with the full implementation inside a \
                     single ```python code block and nothing else.\n\n{}",
                    task.prompt
                );
                if let Some(entry) = &task.entry_point {
                    prompt.push_str(&format!(
                        "\n\nName the top-level function `{entry}`."
                    ));
                }
                prompt
            }
            BenchKind::SweLite => format!(
                "Produce a unified diff that fixes the issue described \
                 below. Respond with the patch inside a single ```diff code \
                 block and nothing else.\n\n{}",
                task.prompt
            ),
        }
    }
}

impl FromStr for BenchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "humaneval" | "human-eval" | "human_eval" => Ok(BenchKind::HumanEval),
            "mbpp" => Ok(BenchKind::Mbpp),
            "swe-lite" | "swe_lite" | "swelite" => Ok(BenchKind::SweLite),
            other => Err(format!(
                "Unknown benchmark '{other}' (expected humaneval, mbpp, or swe-lite)"
            )),
        }
    }
}

/// One benchmark task. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub prompt: String,
    /// Hidden test source executed against the candidate in code mode.
    pub hidden_test: Option<String>,
    /// Symbol the hidden tests' `check` routine is called with.
    pub entry_point: Option<String>,
}

/// Raw JSONL record with the field aliases seen across benchmark dumps.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    task_id: Option<serde_json::Value>,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    problem_statement: Option<String>,
    #[serde(default)]
    test: Option<String>,
    #[serde(default)]
    tests: Option<String>,
    #[serde(default)]
    test_list: Option<Vec<String>>,
    #[serde(default)]
    entry_point: Option<String>,
}

impl RawRecord {
    fn into_task(self, line: usize) -> Result<Task, DatasetError> {
        let id = self
            .task_id
            .or(self.id)
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .ok_or_else(|| DatasetError::Parse {
                line,
                message: "missing task_id/id".to_string(),
            })?;

        let prompt = self
            .prompt
            .or(self.text)
            .or(self.problem_statement)
            .ok_or_else(|| DatasetError::Parse {
                line,
                message: "missing prompt/text/problem_statement".to_string(),
            })?;

        let hidden_test = self
            .test
            .or(self.tests)
            .or_else(|| self.test_list.map(|lines| lines.join("\n")));

        Ok(Task {
            id,
            prompt,
            hidden_test,
            entry_point: self.entry_point,
        })
    }
}

/// Load every task from a JSONL or JSONL.GZ dataset file.
pub fn load_dataset(path: &Path) -> Result<Vec<Task>, DatasetError> {
    if !path.exists() {
        return Err(DatasetError::NotFound(path.display().to_string()));
    }

    let file = File::open(path)?;
    let reader: Box<dyn Read> = if path.extension().is_some_and(|e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut tasks = Vec::new();
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let raw: RawRecord =
            serde_json::from_str(&line).map_err(|e| DatasetError::Parse {
                line: line_no,
                message: e.to_string(),
            })?;
        tasks.push(raw.into_task(line_no)?);
    }

    if tasks.is_empty() {
        return Err(DatasetError::Empty(path.display().to_string()));
    }

    Ok(tasks)
}
