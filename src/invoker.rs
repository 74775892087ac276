//! Agent invocation: subprocess execution with timeout, retry, and backoff.
//!
//! `AgentEndpoint` is the seam between the retry logic and the actual
//! process spawn, so tests can script attempt sequences without a binary.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::BenchConfig;
use crate::error::InvokeError;
use crate::report::TokenUsage;

/// Raw outcome of one agent attempt.
#[derive(Debug, Clone)]
pub struct AgentCall {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub latency: Duration,
}

/// Final outcome of an invocation after the retry loop settles.
#[derive(Debug, Clone)]
pub struct InvocationResult {
    /// Authoritative response text (from the JSON envelope when present,
    /// otherwise raw stdout).
    pub text: String,
    pub latency_secs: f64,
    pub exit_code: i32,
    /// True when every attempt timed out. Latency then equals the
    /// configured timeout ceiling.
    pub timed_out: bool,
    pub usage: Option<TokenUsage>,
}

/// One attempt against the agent.
#[async_trait]
pub trait AgentEndpoint: Send + Sync {
    async fn call(&self, prompt: &str) -> Result<AgentCall, InvokeError>;
}

/// Production endpoint: shells out to the agent CLI.
#[derive(Debug, Clone)]
pub struct CliAgent {
    binary: String,
    provider: String,
    model: String,
    allow_tools: bool,
    temperature: f64,
    max_output_tokens: u32,
    json_output: bool,
    timeout: Duration,
}

impl CliAgent {
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            binary: config.agent_bin.clone(),
            provider: config.provider.clone(),
            model: config.model.clone(),
            allow_tools: config.allow_tools,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            json_output: config.agent_json,
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl AgentEndpoint for CliAgent {
    async fn call(&self, prompt: &str) -> Result<AgentCall, InvokeError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--provider")
            .arg(&self.provider)
            .arg("--model")
            .arg(&self.model);
        if self.json_output {
            cmd.arg("--output-format").arg("json");
        }
        cmd.arg("ask").arg(prompt);

        cmd.env("AGENT_TEMPERATURE", self.temperature.to_string())
            .env(
                "AGENT_MAX_OUTPUT_TOKENS",
                self.max_output_tokens.to_string(),
            );
        if self.allow_tools {
            cmd.env("AGENT_ENABLE_TOOLS", "1");
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                InvokeError::BinaryMissing(self.binary.clone())
            } else {
                InvokeError::Spawn(e.to_string())
            }
        })?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(InvokeError::Timeout(self.timeout)),
        };

        Ok(AgentCall {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
            latency: started.elapsed(),
        })
    }
}

/// Retry budget and backoff schedule for transient failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles per subsequent retry.
    pub initial_backoff: Duration,
}

/// States of the per-task retry loop.
#[derive(Debug)]
enum RetryState {
    Attempting { attempt: u32, backoff: Duration },
    Backoff { attempt: u32, backoff: Duration },
    Succeeded(AgentCall),
    Exhausted { last: Option<AgentCall>, timed_out: bool },
}

/// Drives an endpoint through the retry state machine.
pub struct Invoker<E: AgentEndpoint> {
    endpoint: E,
    policy: RetryPolicy,
    timeout: Duration,
}

impl<E: AgentEndpoint> Invoker<E> {
    pub fn new(endpoint: E, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            endpoint,
            policy,
            timeout,
        }
    }

    /// Invoke the agent for one prompt, retrying transient failures.
    ///
    /// Transient: attempt timeout, rate-limit markers in stdout, non-zero
    /// exit. Everything else (binary missing, spawn failure) is fatal and
    /// propagates immediately.
    pub async fn invoke(&self, prompt: &str) -> Result<InvocationResult, InvokeError> {
        let mut state = RetryState::Attempting {
            attempt: 0,
            backoff: self.policy.initial_backoff,
        };

        loop {
            state = match state {
                RetryState::Attempting { attempt, backoff } => {
                    match self.endpoint.call(prompt).await {
                        Ok(call) => {
                            if is_rate_limited(&call.stdout) || call.exit_code != 0 {
                                if attempt < self.policy.max_retries {
                                    tracing::warn!(
                                        attempt = attempt + 1,
                                        exit_code = call.exit_code,
                                        "Transient agent failure, backing off"
                                    );
                                    RetryState::Backoff { attempt, backoff }
                                } else {
                                    RetryState::Exhausted {
                                        last: Some(call),
                                        timed_out: false,
                                    }
                                }
                            } else {
                                RetryState::Succeeded(call)
                            }
                        }
                        Err(InvokeError::Timeout(_)) => {
                            if attempt < self.policy.max_retries {
                                tracing::warn!(
                                    attempt = attempt + 1,
                                    "Agent attempt timed out, backing off"
                                );
                                RetryState::Backoff { attempt, backoff }
                            } else {
                                RetryState::Exhausted {
                                    last: None,
                                    timed_out: true,
                                }
                            }
                        }
                        Err(other) => return Err(other),
                    }
                }
                RetryState::Backoff { attempt, backoff } => {
                    tokio::time::sleep(backoff).await;
                    RetryState::Attempting {
                        attempt: attempt + 1,
                        backoff: backoff * 2,
                    }
                }
                RetryState::Succeeded(call) => {
                    return Ok(result_from_call(call));
                }
                RetryState::Exhausted { last, timed_out } => {
                    return Ok(match last {
                        // Rate-limit exhaustion: hand back whatever was
                        // last produced so extraction can still try.
                        Some(call) => result_from_call(call),
                        None => InvocationResult {
                            text: String::new(),
                            latency_secs: self.timeout.as_secs_f64(),
                            exit_code: -1,
                            timed_out,
                            usage: None,
                        },
                    });
                }
            };
        }
    }
}

fn result_from_call(call: AgentCall) -> InvocationResult {
    let (text, usage) = parse_agent_output(&call.stdout);
    InvocationResult {
        text,
        latency_secs: call.latency.as_secs_f64(),
        exit_code: call.exit_code,
        timed_out: false,
        usage,
    }
}

/// Rate-limit detection reads stdout only. Stderr carries diagnostic noise
/// from the agent's own logging and is never inspected.
fn is_rate_limited(stdout: &str) -> bool {
    let lower = stdout.to_lowercase();
    lower.contains("429") || lower.contains("rate limit") || lower.contains("ratelimit")
}

#[derive(Debug, serde::Deserialize)]
struct Envelope {
    response: EnvelopeResponse,
}

#[derive(Debug, serde::Deserialize)]
struct EnvelopeResponse {
    #[serde(default)]
    content: serde_json::Value,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

/// Parse the agent's stdout into response text plus optional token usage.
///
/// When stdout is the JSON envelope `{"response": {"content", "usage"}}`
/// its fields are authoritative. Otherwise the raw text is returned with a
/// best-effort scan for an embedded `"usage": {...}` object.
pub fn parse_agent_output(stdout: &str) -> (String, Option<TokenUsage>) {
    if let Ok(envelope) = serde_json::from_str::<Envelope>(stdout.trim()) {
        let text = match envelope.response.content {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        return (text, envelope.response.usage);
    }

    let usage = regex::Regex::new(r#""usage"\s*:\s*(\{[^{}]*\})"#)
        .ok()
        .and_then(|re| {
            let m = re.captures(stdout)?;
            serde_json::from_str::<TokenUsage>(m.get(1)?.as_str()).ok()
        });

    (stdout.to_string(), usage)
}
