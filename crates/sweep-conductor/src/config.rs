use crate::agent::driver::DriverTiming;
use crate::hook::runner::DEFAULT_HOOK_GRACE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use sweep_store::StorePaths;

/// Engine settings read from `config.json`. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub timing: DriverTiming,
    pub hook_grace_ms: u64,
    /// Agent command; the prompt is appended as its last argument.
    pub agent_program: String,
    pub agent_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timing: DriverTiming::default(),
            hook_grace_ms: DEFAULT_HOOK_GRACE.as_millis() as u64,
            agent_program: "claude".to_string(),
            agent_args: vec!["-p".to_string()],
        }
    }
}

impl EngineConfig {
    /// Load from the store's `config.json`. Falls back to defaults if the
    /// file is missing or unreadable.
    pub fn load(paths: &StorePaths) -> Self {
        Self::load_from(&paths.config_json)
    }

    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read config; using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid config; using defaults");
                Self::default()
            }
        }
    }

    pub fn hook_grace(&self) -> Duration {
        Duration::from_millis(self.hook_grace_ms)
    }
}
