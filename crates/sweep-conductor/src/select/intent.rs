use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::PathBuf;

/// What the agent should do to every file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskIntent {
    /// Instruction sent with every file.
    pub instruction: String,
    /// Glob-like patterns carried into the log header. Not enforced.
    pub file_patterns: Vec<String>,
}

impl TaskIntent {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            file_patterns: Vec::new(),
        }
    }
}

/// Structured task description, usually loaded from a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescription {
    pub summary: String,
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_patterns: Vec<String>,
}

impl TaskDescription {
    /// Join the summary and numbered items into one instruction.
    pub fn combine(&self) -> String {
        let summary = self.summary.trim();
        let items: Vec<&str> = self
            .items
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .collect();
        if items.is_empty() {
            return summary.to_string();
        }
        let mut out = format!("{summary}\n\nDetails:");
        for (i, d) in items.iter().enumerate() {
            out.push_str(&format!("\n{}. {d}", i + 1));
        }
        out
    }

    pub fn into_intent(self) -> Option<TaskIntent> {
        let instruction = self.combine();
        if instruction.trim().is_empty() {
            return None;
        }
        Some(TaskIntent {
            instruction,
            file_patterns: self.file_patterns,
        })
    }
}

/// Obtains the task for a run. `Ok(None)` means the user backed out.
#[async_trait::async_trait]
pub trait IntentSource: Send + Sync {
    async fn resolve(&self) -> Result<Option<TaskIntent>>;
}

/// An intent known up front. A blank instruction counts as cancelled.
pub struct FixedIntent(pub TaskIntent);

#[async_trait::async_trait]
impl IntentSource for FixedIntent {
    async fn resolve(&self) -> Result<Option<TaskIntent>> {
        if self.0.instruction.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(self.0.clone()))
    }
}

/// Reads a [`TaskDescription`] from JSON, or YAML for `.yaml`/`.yml` files.
pub struct DescriptionFileIntent {
    path: PathBuf,
}

impl DescriptionFileIntent {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

pub fn parse_description(content: &str, yaml: bool) -> Result<TaskDescription> {
    if yaml {
        serde_yaml::from_str(content).context("parsing task description as YAML")
    } else {
        serde_json::from_str(content).context("parsing task description as JSON")
    }
}

#[async_trait::async_trait]
impl IntentSource for DescriptionFileIntent {
    async fn resolve(&self) -> Result<Option<TaskIntent>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let yaml = matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        Ok(parse_description(&content, yaml)?.into_intent())
    }
}

/// Asks for the task on stdin. An empty line or end of input cancels.
pub struct PromptIntent;

#[async_trait::async_trait]
impl IntentSource for PromptIntent {
    async fn resolve(&self) -> Result<Option<TaskIntent>> {
        let line = tokio::task::spawn_blocking(|| -> Result<Option<String>> {
            eprint!("Task to apply to each file: ");
            let mut line = String::new();
            let n = std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("reading task from stdin")?;
            Ok((n > 0).then_some(line))
        })
        .await
        .context("prompt task panicked")??;

        Ok(line
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .map(TaskIntent::new))
    }
}
