use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix that marks a hook command as a host command rather than shell text.
pub const HOST_COMMAND_PREFIX: &str = "command:";

/// Points in a batch run where hooks fire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum LifecyclePoint {
    BeforeBatch,
    AfterBatch,
    BeforeFile,
    AfterFile,
    OnError,
}

impl LifecyclePoint {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecyclePoint::BeforeBatch => "beforeBatch",
            LifecyclePoint::AfterBatch => "afterBatch",
            LifecyclePoint::BeforeFile => "beforeFile",
            LifecyclePoint::AfterFile => "afterFile",
            LifecyclePoint::OnError => "onError",
        }
    }
}

impl fmt::Display for LifecyclePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// What a hook runs. Decided once when the hook is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookCommand {
    Shell { text: String },
    Host { name: String },
}

impl HookCommand {
    /// Classify a configured command string.
    pub fn parse(raw: &str) -> Self {
        match raw.trim_start().strip_prefix(HOST_COMMAND_PREFIX) {
            Some(name) => HookCommand::Host {
                name: name.trim().to_string(),
            },
            None => HookCommand::Shell {
                text: raw.to_string(),
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HookCommand::Shell { .. } => "shell",
            HookCommand::Host { .. } => "host",
        }
    }
}

impl fmt::Display for HookCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookCommand::Shell { text } => f.write_str(text),
            HookCommand::Host { name } => write!(f, "{HOST_COMMAND_PREFIX}{name}"),
        }
    }
}

/// A hook as written in the hooks document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHook {
    pub name: String,
    #[serde(default)]
    pub condition: Option<String>,
    pub command: String,
    pub run_at: LifecyclePoint,
}

/// A loaded hook. Immutable for the length of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookDefinition {
    pub name: String,
    /// Empty means always true.
    pub condition: String,
    pub command: HookCommand,
    pub run_at: LifecyclePoint,
}

impl HookDefinition {
    pub fn new(name: &str, run_at: LifecyclePoint, command: &str) -> Self {
        Self {
            name: name.to_string(),
            condition: String::new(),
            command: HookCommand::parse(command),
            run_at,
        }
    }

    pub fn with_condition(mut self, condition: &str) -> Self {
        self.condition = condition.to_string();
        self
    }
}

impl TryFrom<RawHook> for HookDefinition {
    type Error = String;

    fn try_from(raw: RawHook) -> Result<Self, Self::Error> {
        if raw.name.trim().is_empty() {
            return Err("hook name is empty".into());
        }
        let command = HookCommand::parse(&raw.command);
        match &command {
            HookCommand::Shell { text } if text.trim().is_empty() => {
                return Err(format!("hook \"{}\" has an empty command", raw.name));
            }
            HookCommand::Host { name } if name.is_empty() => {
                return Err(format!("hook \"{}\" names no host command", raw.name));
            }
            _ => {}
        }
        Ok(Self {
            name: raw.name,
            condition: raw.condition.unwrap_or_default(),
            command,
            run_at: raw.run_at,
        })
    }
}
