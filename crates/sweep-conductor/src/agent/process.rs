//! Agent adapter that drives a command-line agent as a child process.
//!
//! Each task spawns `<program> <args..> <prompt>`. Stdout lines become agent
//! messages; a line holding a JSON object with `kind`/`text` fields is taken
//! as a structured message. Pressing the primary button answers `y` on the
//! child's stdin and then closes it.

use crate::agent::handle::{AgentHandle, AgentMessage, AgentResolver, MessageKind, TaskStatus};
use crate::error::BatchError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;

/// Structured stdout line.
#[derive(Debug, Deserialize)]
struct WireMessage {
    kind: MessageKind,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    files: Vec<String>,
}

fn parse_line(line: &str) -> AgentMessage {
    let trimmed = line.trim();
    if trimmed.starts_with('{') {
        if let Ok(wire) = serde_json::from_str::<WireMessage>(trimmed) {
            return AgentMessage {
                ts: time::OffsetDateTime::now_utc(),
                kind: wire.kind,
                text: wire.text,
                reasoning: wire.reasoning,
                files: wire.files,
            };
        }
    }
    AgentMessage::say(line.trim_end())
}

struct RunningTask {
    child: Child,
    stdin: Option<ChildStdin>,
    messages: Arc<Mutex<Vec<AgentMessage>>>,
    reader: Option<JoinHandle<()>>,
}

/// A command-line agent run once per task.
pub struct ProcessAgent {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    task: tokio::sync::Mutex<Option<RunningTask>>,
}

impl ProcessAgent {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            cwd: None,
            task: tokio::sync::Mutex::new(None),
        }
    }

    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }
}

#[async_trait::async_trait]
impl AgentHandle for ProcessAgent {
    async fn start_new_task(&self, prompt: &str) -> Result<()> {
        let mut slot = self.task.lock().await;
        if let Some(mut previous) = slot.take() {
            // a new task replaces whatever is still running
            previous.child.kill().await.ok();
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(prompt)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning agent {}", self.program.display()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("failed to capture stdout"))?;
        let stdin = child.stdin.take();

        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                if let Ok(mut buf) = sink.lock() {
                    buf.push(parse_line(&line));
                }
            }
        });

        *slot = Some(RunningTask {
            child,
            stdin,
            messages,
            reader: Some(reader),
        });
        Ok(())
    }

    async fn press_primary_button(&self) -> Result<()> {
        let mut slot = self.task.lock().await;
        let task = slot
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("no task to confirm"))?;
        // the one answer is all the child ever gets; dropping the pipe sends EOF
        let Some(mut stdin) = task.stdin.take() else {
            return Ok(());
        };
        if task.child.try_wait()?.is_some() {
            return Ok(());
        }
        stdin.write_all(b"y\n").await.context("answering agent")?;
        stdin.flush().await.context("answering agent")?;
        Ok(())
    }

    async fn get_task_status(&self) -> Result<TaskStatus> {
        let mut slot = self.task.lock().await;
        let Some(task) = slot.as_mut() else {
            return Ok(TaskStatus::None);
        };
        Ok(match task.child.try_wait()? {
            None => TaskStatus::Active,
            Some(exit) if exit.success() => TaskStatus::Completed,
            Some(_) => TaskStatus::Cancelled,
        })
    }

    async fn get_task_messages(&self) -> Result<Vec<AgentMessage>> {
        let mut slot = self.task.lock().await;
        let Some(task) = slot.as_mut() else {
            return Ok(vec![]);
        };
        if task.child.try_wait()?.is_some() {
            if let Some(reader) = task.reader.take() {
                // let the reader drain what the child wrote before exiting
                let _ = tokio::time::timeout(Duration::from_secs(1), reader).await;
            }
        }
        let messages = task
            .messages
            .lock()
            .map_err(|_| anyhow::anyhow!("message buffer poisoned"))?
            .clone();
        Ok(messages)
    }
}

/// Verifies the agent binary runs, then hands out a [`ProcessAgent`].
pub struct ProcessAgentResolver {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Arguments used to probe the binary.
    pub probe_args: Vec<String>,
}

impl ProcessAgentResolver {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            cwd: None,
            probe_args: vec!["--version".into()],
        }
    }

    pub fn with_probe_args(mut self, probe_args: Vec<String>) -> Self {
        self.probe_args = probe_args;
        self
    }

    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }
}

#[async_trait::async_trait]
impl AgentResolver for ProcessAgentResolver {
    async fn resolve(&self) -> Result<Arc<dyn AgentHandle>, BatchError> {
        let status = Command::new(&self.program)
            .args(&self.probe_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(s) if s.success() => {}
            Ok(s) => {
                return Err(BatchError::AgentUnavailable(format!(
                    "{} exited with {s} when probed",
                    self.program.display()
                )))
            }
            Err(e) => {
                return Err(BatchError::AgentUnavailable(format!(
                    "{} not found: {e}",
                    self.program.display()
                )))
            }
        }

        let mut agent = ProcessAgent::new(self.program.clone(), self.args.clone());
        if let Some(cwd) = &self.cwd {
            agent = agent.with_cwd(cwd.clone());
        }
        Ok(Arc::new(agent))
    }
}
