//! End-to-end harness tests with a scripted agent endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use agent_bench::config::BenchConfig;
use agent_bench::dataset::{BenchKind, Task};
use agent_bench::harness::Harness;
use agent_bench::invoker::{AgentCall, AgentEndpoint};
use agent_bench::InvokeError;

/// Replays a fixed sequence of stdout payloads, one per call.
struct ScriptedAgent {
    outputs: Vec<String>,
    cursor: AtomicUsize,
}

impl ScriptedAgent {
    fn new(outputs: Vec<&str>) -> Self {
        Self {
            outputs: outputs.into_iter().map(String::from).collect(),
            cursor: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AgentEndpoint for ScriptedAgent {
    async fn call(&self, _prompt: &str) -> Result<AgentCall, InvokeError> {
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
        let stdout = self
            .outputs
            .get(idx)
            .cloned()
            .unwrap_or_else(|| panic!("agent called more than {} times", self.outputs.len()));
        Ok(AgentCall {
            stdout,
            stderr: String::new(),
            exit_code: 0,
            latency: Duration::from_millis(25),
        })
    }
}

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .is_ok()
}

fn add_task(id: &str) -> Task {
    Task {
        id: id.to_string(),
        prompt: "def add(a, b):\n    \"\"\"Return the sum of a and b.\"\"\"\n".to_string(),
        hidden_test: Some(
            "def check(fn):\n    assert fn(1, 2) == 3\n    assert fn(0, 0) == 0\n".to_string(),
        ),
        entry_point: Some("add".to_string()),
    }
}

#[tokio::test]
async fn three_task_run_produces_expected_report() {
    if !python_available() {
        eprintln!("python3 not available, skipping");
        return;
    }

    let tasks = vec![add_task("t1"), add_task("t2"), add_task("t3")];
    let agent = ScriptedAgent::new(vec![
        "Here you go:\n```python\ndef add(a, b):\n    return a + b\n```",
        "```python\ndef add(a, b):\n    return a + b\n```\nDone.",
        "",
    ]);

    let reports_dir = tempfile::tempdir().unwrap();
    let config = BenchConfig::new(BenchKind::HumanEval, "unused.jsonl".into())
        .with_count(3)
        .with_reports_dir(reports_dir.path().to_path_buf());

    let report = Harness::new(config, agent).run(&tasks).await.unwrap();

    assert_eq!(report.summary.n, 3);
    assert_eq!(report.summary.passed, 2);
    assert!((report.summary.pass_rate - 2.0 / 3.0).abs() < 1e-9);

    let no_code: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.err_tail.as_deref() == Some("no_code"))
        .collect();
    assert_eq!(no_code.len(), 1);
    assert_eq!(report.summary.gen_errors, 1);

    // The report file landed in the configured directory and parses back.
    let entries: Vec<_> = std::fs::read_dir(reports_dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);
    let reloaded: agent_bench::report::Report =
        serde_json::from_str(&std::fs::read_to_string(&entries[0]).unwrap()).unwrap();
    assert_eq!(reloaded.summary.n, 3);
    assert_eq!(reloaded.summary.passed, 2);
}

#[tokio::test]
async fn diff_benchmark_grades_without_python() {
    let tasks = vec![
        Task {
            id: "swe-1".to_string(),
            prompt: "Fix the off-by-one in pager.py".to_string(),
            hidden_test: None,
            entry_point: None,
        },
        Task {
            id: "swe-2".to_string(),
            prompt: "Fix the crash in loader.py".to_string(),
            hidden_test: None,
            entry_point: None,
        },
    ];
    let agent = ScriptedAgent::new(vec![
        "```diff\n--- a/pager.py\n+++ b/pager.py\n@@ -1 +1 @@\n-x\n+y\n```",
        "I could not produce a patch.",
    ]);

    let reports_dir = tempfile::tempdir().unwrap();
    let config = BenchConfig::new(BenchKind::SweLite, "unused.jsonl".into())
        .with_count(2)
        .with_reports_dir(reports_dir.path().to_path_buf());

    let report = Harness::new(config, agent).run(&tasks).await.unwrap();

    assert_eq!(report.summary.n, 2);
    assert_eq!(report.summary.passed, 2);
    let with_diff: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.diff_bytes.is_some())
        .collect();
    assert_eq!(with_diff.len(), 2);
}

#[tokio::test]
async fn task_id_allowlist_limits_the_run() {
    if !python_available() {
        eprintln!("python3 not available, skipping");
        return;
    }

    let tasks = vec![add_task("t1"), add_task("t2"), add_task("t3")];
    let agent = ScriptedAgent::new(vec![
        "```python\ndef add(a, b):\n    return a + b\n```",
    ]);

    let reports_dir = tempfile::tempdir().unwrap();
    let config = BenchConfig::new(BenchKind::HumanEval, "unused.jsonl".into())
        .with_task_ids(vec!["t2".to_string()])
        .with_reports_dir(reports_dir.path().to_path_buf());

    let report = Harness::new(config, agent).run(&tasks).await.unwrap();

    assert_eq!(report.summary.n, 1);
    assert_eq!(report.results[0].task_id, "t2");
    assert_eq!(report.meta.requested_count, 1);
}
