//! CLI command definitions for agent-bench.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use crate::config::{
    BenchConfig, DEFAULT_BACKOFF_SECS, DEFAULT_MAX_RETRIES, DEFAULT_SEED,
    DEFAULT_TEST_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS,
};
use crate::dataset::{load_dataset, BenchKind};
use crate::harness::Harness;
use crate::invoker::CliAgent;
use crate::report::Report;

/// Benchmark harness for command-line coding agents.
#[derive(Parser)]
#[command(name = "agent-bench")]
#[command(about = "Run code-generation benchmarks against a CLI coding agent")]
#[command(version)]
#[command(
    long_about = "agent-bench samples tasks from a benchmark dataset, invokes an \
external agent binary per task, extracts and grades the answer, and writes a \
JSON report.\n\nExample usage:\n  agent-bench run --bench humaneval --dataset \
./data/humaneval.jsonl.gz -n 20 -m openai/gpt-5.2-codex:nitro"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run a benchmark against the configured agent.
    Run(RunArgs),

    /// Reload an existing report and print its summary.
    Summarize(SummarizeArgs),
}

/// Arguments for `agent-bench run`. Every knob has an environment-variable
/// fallback so runs can be driven from CI configuration.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Benchmark kind: humaneval, mbpp, or swe-lite.
    #[arg(long, env = "BENCH_KIND", default_value = "humaneval")]
    pub bench: String,

    /// Path to the task dataset (JSONL, optionally .gz).
    #[arg(short, long, env = "BENCH_DATASET")]
    pub dataset: PathBuf,

    /// Number of tasks to sample (default: the benchmark's standard count).
    #[arg(short = 'n', long, env = "BENCH_COUNT")]
    pub count: Option<usize>,

    /// Comma-separated task IDs to run instead of sampling.
    #[arg(long, env = "BENCH_TASK_IDS")]
    pub task_ids: Option<String>,

    /// Sampling seed.
    #[arg(long, env = "BENCH_SEED", default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Provider name forwarded to the agent.
    #[arg(long, env = "BENCH_PROVIDER", default_value = "openrouter")]
    pub provider: String,

    /// Model identifier forwarded to the agent.
    #[arg(
        short,
        long,
        env = "BENCH_MODEL",
        default_value = "openai/gpt-5.2-codex:nitro"
    )]
    pub model: String,

    /// Agent executable name or path.
    #[arg(long, env = "BENCH_AGENT_BIN", default_value = "agent")]
    pub agent_bin: String,

    /// Allow the agent to use its tool suite.
    #[arg(long, env = "BENCH_ALLOW_TOOLS")]
    pub allow_tools: bool,

    /// Sampling temperature forwarded to the agent.
    #[arg(long, env = "BENCH_TEMPERATURE", default_value_t = 0.2)]
    pub temperature: f64,

    /// Output token ceiling forwarded to the agent.
    #[arg(long, env = "BENCH_MAX_OUTPUT_TOKENS", default_value_t = 4096)]
    pub max_output_tokens: u32,

    /// Per-call agent timeout in seconds.
    #[arg(long, env = "BENCH_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Retry budget for transient failures.
    #[arg(long, env = "BENCH_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Initial retry backoff in seconds (doubles per retry).
    #[arg(long, env = "BENCH_BACKOFF_SECS", default_value_t = DEFAULT_BACKOFF_SECS)]
    pub backoff: u64,

    /// Pause between tasks in seconds.
    #[arg(long, env = "BENCH_SLEEP_SECS", default_value_t = 0)]
    pub sleep_between: u64,

    /// Wall-clock limit for one sandboxed test run, in seconds.
    #[arg(long, env = "BENCH_TEST_TIMEOUT_SECS", default_value_t = DEFAULT_TEST_TIMEOUT_SECS)]
    pub test_timeout: u64,

    /// Python interpreter used for grading.
    #[arg(long, env = "BENCH_PYTHON", default_value = "python3")]
    pub python_bin: String,

    /// Price per 1k input tokens in USD (0 = unknown).
    #[arg(long, env = "BENCH_PRICE_IN_PER_1K", default_value_t = 0.0)]
    pub price_in: f64,

    /// Price per 1k output tokens in USD (0 = unknown).
    #[arg(long, env = "BENCH_PRICE_OUT_PER_1K", default_value_t = 0.0)]
    pub price_out: f64,

    /// Directory for run reports.
    #[arg(short = 'o', long, env = "BENCH_REPORTS_DIR", default_value = "./reports")]
    pub reports_dir: PathBuf,

    /// Request the agent's JSON output envelope (enables token accounting).
    #[arg(long, env = "BENCH_AGENT_JSON")]
    pub agent_json: bool,

    /// Print the full report as JSON instead of the summary table.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `agent-bench summarize`.
#[derive(Parser, Debug)]
pub struct SummarizeArgs {
    /// Path to an existing report JSON file.
    pub report: PathBuf,
}

/// Parse CLI arguments without running commands. Useful for extracting
/// configuration (like log level) before initializing logging.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => {
            run_benchmark_command(args).await?;
        }
        Commands::Summarize(args) => {
            run_summarize_command(args)?;
        }
    }
    Ok(())
}

async fn run_benchmark_command(args: RunArgs) -> anyhow::Result<()> {
    let bench: BenchKind = args
        .bench
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let tasks = load_dataset(&args.dataset)?;
    info!(
        dataset = %args.dataset.display(),
        tasks = tasks.len(),
        "Dataset loaded"
    );

    let mut config = BenchConfig::new(bench, args.dataset.clone())
        .with_seed(args.seed)
        .with_provider(args.provider)
        .with_model(args.model)
        .with_agent_bin(args.agent_bin)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_max_retries(args.max_retries)
        .with_initial_backoff(Duration::from_secs(args.backoff))
        .with_reports_dir(args.reports_dir);
    if let Some(count) = args.count {
        config = config.with_count(count);
    }
    if let Some(ids) = args.task_ids {
        let ids: Vec<String> = ids
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !ids.is_empty() {
            config = config.with_task_ids(ids);
        }
    }
    config.allow_tools = args.allow_tools;
    config.temperature = args.temperature;
    config.max_output_tokens = args.max_output_tokens;
    config.agent_json = args.agent_json;
    config.sleep_between = Duration::from_secs(args.sleep_between);
    config.test_timeout = Duration::from_secs(args.test_timeout);
    config.python_bin = args.python_bin;
    config.price_per_1k_input = args.price_in;
    config.price_per_1k_output = args.price_out;

    let endpoint = CliAgent::from_config(&config);
    let harness = Harness::new(config, endpoint);
    let report = harness.run(&tasks).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn run_summarize_command(args: SummarizeArgs) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(&args.report)?;
    let report: Report = serde_json::from_str(&contents)?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &Report) {
    println!("Benchmark: {}", report.meta.bench);
    println!("Model:     {} ({})", report.meta.model, report.meta.provider);
    println!("Seed:      {}", report.meta.seed);
    println!(
        "Tasks:     {} graded ({} requested)",
        report.summary.n, report.meta.requested_count
    );
    println!(
        "Pass rate: {:.1}% ({}/{})",
        report.summary.pass_rate * 100.0,
        report.summary.passed,
        report.summary.n
    );
    println!(
        "Latency:   p50 {:.2}s / p90 {:.2}s",
        report.summary.latency_p50_secs, report.summary.latency_p90_secs
    );
    println!(
        "Tokens:    {} in / {} out",
        report.summary.total_input_tokens, report.summary.total_output_tokens
    );
    if let Some(cost) = report.summary.cost_estimate_usd {
        println!("Cost:      ${cost:.4}");
    }
    if report.summary.gen_errors > 0 {
        println!("Gen errors: {}", report.summary.gen_errors);
    }
}
