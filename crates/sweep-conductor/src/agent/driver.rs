use crate::agent::handle::{AgentHandle, TaskStatus};
use crate::error::TaskError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

/// Pause after submitting a task before confirming it.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);
/// Interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Longest a single file's task is waited for.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(10 * 60);

/// Timing knobs for [`TaskAgentDriver`]. Stored in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DriverTiming {
    pub settle_ms: u64,
    pub poll_interval_ms: u64,
    pub max_wait_ms: u64,
}

impl Default for DriverTiming {
    fn default() -> Self {
        Self {
            settle_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_wait_ms: DEFAULT_MAX_WAIT.as_millis() as u64,
        }
    }
}

impl DriverTiming {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        // a zero interval would spin
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

/// How a file's task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Last status observed. `Active` when the wait budget ran out.
    pub status: TaskStatus,
    pub polls: u32,
    pub timed_out: bool,
    pub elapsed: Duration,
}

/// Runs one file's task through the agent: submit, confirm, wait.
pub struct TaskAgentDriver {
    timing: DriverTiming,
}

impl Default for TaskAgentDriver {
    fn default() -> Self {
        Self::new(DriverTiming::default())
    }
}

impl TaskAgentDriver {
    pub fn new(timing: DriverTiming) -> Self {
        Self { timing }
    }

    /// Drive the task for `file` to a terminal status.
    ///
    /// The agent gets a single confirmation after the settle delay. Running
    /// out of wait budget is not an error: the outcome is marked
    /// `timed_out` and the batch moves on.
    pub async fn run_on_file(
        &self,
        agent: &dyn AgentHandle,
        file: &Path,
        intent: &str,
    ) -> Result<TaskOutcome, TaskError> {
        let start = Instant::now();
        let prompt = build_file_prompt(file, intent);

        agent
            .start_new_task(&prompt)
            .await
            .map_err(TaskError::Rejected)?;
        tracing::debug!(file = %file.display(), "task submitted");

        tokio::time::sleep(self.timing.settle()).await;
        agent
            .press_primary_button()
            .await
            .map_err(TaskError::Confirm)?;

        let deadline = start + self.timing.max_wait();
        let mut polls = 0u32;
        loop {
            let status = agent.get_task_status().await.map_err(TaskError::Status)?;
            polls += 1;
            if status.is_terminal() {
                tracing::debug!(file = %file.display(), ?status, polls, "task finished");
                return Ok(TaskOutcome {
                    status,
                    polls,
                    timed_out: false,
                    elapsed: start.elapsed(),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    file = %file.display(),
                    waited_secs = start.elapsed().as_secs(),
                    "task did not finish within the wait budget; moving on"
                );
                return Ok(TaskOutcome {
                    status,
                    polls,
                    timed_out: true,
                    elapsed: start.elapsed(),
                });
            }
            let remaining = deadline.saturating_duration_since(now);
            tokio::time::sleep(self.timing.poll_interval().min(remaining)).await;
        }
    }
}

/// Prompt for one file. References the file by path only; the agent reads
/// the content itself.
pub fn build_file_prompt(file: &Path, intent: &str) -> String {
    format!(
        "Apply the following task to the file `{}`.\n\
         Only modify this file.\n\n\
         ## Task\n{}\n",
        file.display(),
        intent.trim()
    )
}
