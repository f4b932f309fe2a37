use crate::error::BatchError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

/// Task status as reported by the agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    None,
    Active,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// No further progress is expected from a terminal status.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Active)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Ask,
    Say,
}

/// One unit of agent output for a file's task. Only ever logged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentMessage {
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl AgentMessage {
    pub fn say(text: impl Into<String>) -> Self {
        Self {
            ts: OffsetDateTime::now_utc(),
            kind: MessageKind::Say,
            text: Some(text.into()),
            reasoning: None,
            files: Vec::new(),
        }
    }

    pub fn ask(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Ask,
            ..Self::say(text)
        }
    }
}

/// Control surface of the external AI agent.
#[async_trait::async_trait]
pub trait AgentHandle: Send + Sync {
    async fn start_new_task(&self, prompt: &str) -> Result<()>;
    /// Accept whatever the agent is currently proposing.
    async fn press_primary_button(&self) -> Result<()>;
    async fn get_task_status(&self) -> Result<TaskStatus>;
    /// Messages of the current task, oldest first.
    async fn get_task_messages(&self) -> Result<Vec<AgentMessage>>;
}

/// Locates the agent before a run starts.
#[async_trait::async_trait]
pub trait AgentResolver: Send + Sync {
    async fn resolve(&self) -> Result<Arc<dyn AgentHandle>, BatchError>;
}

/// Resolves to an agent that is already at hand.
pub struct FixedResolver(pub Arc<dyn AgentHandle>);

#[async_trait::async_trait]
impl AgentResolver for FixedResolver {
    async fn resolve(&self) -> Result<Arc<dyn AgentHandle>, BatchError> {
        Ok(self.0.clone())
    }
}

/// Always reports the agent as missing.
pub struct UnavailableResolver(pub String);

#[async_trait::async_trait]
impl AgentResolver for UnavailableResolver {
    async fn resolve(&self) -> Result<Arc<dyn AgentHandle>, BatchError> {
        Err(BatchError::AgentUnavailable(self.0.clone()))
    }
}

/// Scripted agent for testing.
///
/// Each task reports `Active` for `active_polls` status calls, then
/// `Completed`. Prompts containing a string from `reject_if_contains` are
/// refused at submission.
pub struct MockAgent {
    inner: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    active_polls: Option<u32>,
    reject_if_contains: Vec<String>,
    fail_confirm: bool,
    prompts: Vec<String>,
    confirms: u32,
    polls_this_task: u32,
    status_calls: u32,
}

impl Default for MockAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAgent {
    /// Completes every task on the first poll.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockState {
                active_polls: Some(0),
                ..Default::default()
            }),
        }
    }

    /// Stays active for `n` polls per task before completing.
    pub fn with_active_polls(self, n: u32) -> Self {
        self.inner.lock().unwrap().active_polls = Some(n);
        self
    }

    /// Never leaves `Active`.
    pub fn never_finishing() -> Self {
        let agent = Self::new();
        agent.inner.lock().unwrap().active_polls = None;
        agent
    }

    pub fn rejecting(self, needle: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .reject_if_contains
            .push(needle.to_string());
        self
    }

    pub fn failing_confirm(self) -> Self {
        self.inner.lock().unwrap().fail_confirm = true;
        self
    }

    /// Every prompt submitted so far, including rejected ones.
    pub fn prompts(&self) -> Vec<String> {
        self.inner.lock().unwrap().prompts.clone()
    }

    pub fn confirms(&self) -> u32 {
        self.inner.lock().unwrap().confirms
    }

    pub fn status_calls(&self) -> u32 {
        self.inner.lock().unwrap().status_calls
    }
}

#[async_trait::async_trait]
impl AgentHandle for MockAgent {
    async fn start_new_task(&self, prompt: &str) -> Result<()> {
        let mut s = self.inner.lock().unwrap();
        s.prompts.push(prompt.to_string());
        s.polls_this_task = 0;
        if s.reject_if_contains.iter().any(|n| prompt.contains(n.as_str())) {
            anyhow::bail!("task refused");
        }
        Ok(())
    }

    async fn press_primary_button(&self) -> Result<()> {
        let mut s = self.inner.lock().unwrap();
        if s.fail_confirm {
            anyhow::bail!("no button to press");
        }
        s.confirms += 1;
        Ok(())
    }

    async fn get_task_status(&self) -> Result<TaskStatus> {
        let mut s = self.inner.lock().unwrap();
        s.status_calls += 1;
        s.polls_this_task += 1;
        match s.active_polls {
            Some(n) if s.polls_this_task > n => Ok(TaskStatus::Completed),
            _ => Ok(TaskStatus::Active),
        }
    }

    async fn get_task_messages(&self) -> Result<Vec<AgentMessage>> {
        let s = self.inner.lock().unwrap();
        let Some(prompt) = s.prompts.last() else {
            return Ok(vec![]);
        };
        Ok(vec![
            AgentMessage::say(format!("(mock) received: {}", first_line(prompt))),
            AgentMessage::ask("(mock) apply changes?"),
        ])
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or_default()
}
