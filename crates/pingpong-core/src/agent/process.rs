//! Runs the agent as a child process, one process per invocation.
//!
//! The user message is written verbatim to the child's stdin. It is never
//! spliced into the bootstrap script or the argument vector.

use std::collections::HashMap;
use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pingpong_traits::{AgentError, AgentReply, AgentRunner};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::config::AgentConfig;

pub const DEFAULT_AGENT_MODULE: &str = "oflo_agent_protocol.examples.ping_pong";
pub const DEFAULT_AGENT_CLASS: &str = "PingPongAgent";

/// Environment variables read by the bootstrap script.
pub const AGENT_MODULE_ENV: &str = "PINGPONG_AGENT_MODULE";
pub const AGENT_CLASS_ENV: &str = "PINGPONG_AGENT_CLASS";

const BOOTSTRAP_SCRIPT: &str = include_str!("bootstrap.py");

/// Default timeout for a single invocation in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ProcessAgentRunner {
    program: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    timeout: Duration,
}

impl ProcessAgentRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: HashMap::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Python interpreter running the bundled bootstrap for `module.class`.
    pub fn python(program: impl Into<String>, module: &str, class: &str) -> Self {
        Self::new(
            program,
            vec!["-c".to_string(), BOOTSTRAP_SCRIPT.to_string()],
        )
        .with_env(AGENT_MODULE_ENV, module)
        .with_env(AGENT_CLASS_ENV, class)
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        let runner = match &config.args {
            Some(args) => Self::new(config.program.clone(), args.clone())
                .with_env(AGENT_MODULE_ENV, &config.module)
                .with_env(AGENT_CLASS_ENV, &config.class),
            None => Self::python(config.program.clone(), &config.module, &config.class),
        };

        config
            .env
            .iter()
            .fold(runner, |runner, (key, value)| runner.with_env(key, value))
            .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

#[async_trait]
impl AgentRunner for ProcessAgentRunner {
    fn name(&self) -> &str {
        &self.program
    }

    async fn invoke(&self, message: &str) -> Result<AgentReply, AgentError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let started = Instant::now();
        debug!(program = %self.program, pid = ?child.id(), "Spawned agent process");

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("agent stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("agent stderr was not captured"))?;

        // Feed input and drain both streams while waiting, so a chatty child never
        // blocks on a full pipe.
        let run = async {
            let (_, stdout, stderr, status) = tokio::try_join!(
                send_message(stdin, message),
                collect_stream(stdout),
                collect_stream(stderr),
                child.wait(),
            )?;
            Ok::<_, io::Error>((status, stdout, stderr))
        };

        let outcome = timeout(self.timeout, run).await;
        let (status, stdout, stderr) = match outcome {
            Ok(result) => result?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed out agent process");
                }
                error!(
                    program = %self.program,
                    timeout_secs = self.timeout.as_secs(),
                    "Agent process timed out"
                );
                return Err(AgentError::Timeout(self.timeout));
            }
        };

        let stderr = String::from_utf8_lossy(&stderr).into_owned();
        if !status.success() {
            error!(
                exit_code = ?status.code(),
                stderr = %stderr,
                "Agent process failed"
            );
            return Err(AgentError::Invocation {
                status: status.code(),
                stderr,
            });
        }

        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr, "Agent process wrote diagnostics");
        }

        let stdout = String::from_utf8(stdout).map_err(|e| {
            let raw = String::from_utf8_lossy(e.as_bytes()).into_owned();
            AgentError::protocol(format!("output is not valid UTF-8: {}", e), raw)
        })?;

        let reply = AgentReply::from_agent_output(&stdout);
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = reply.is_ok(),
            "Agent process finished"
        );
        reply
    }
}

async fn send_message(stdin: Option<ChildStdin>, message: &str) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };

    match stdin.write_all(message.as_bytes()).await {
        Ok(()) => stdin.shutdown().await.or_else(ignore_broken_pipe),
        // An agent that exits without reading its input is judged by its exit status.
        Err(e) => ignore_broken_pipe(e),
    }
}

fn ignore_broken_pipe(e: io::Error) -> io::Result<()> {
    if e.kind() == io::ErrorKind::BrokenPipe {
        Ok(())
    } else {
        Err(e)
    }
}

async fn collect_stream<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer).await?;
    Ok(buffer)
}
