use anyhow::Result;
use std::path::{Path, PathBuf};

/// Dispatches host commands (hooks written as `command:<name>`) by name.
#[async_trait::async_trait]
pub trait HostCommandBus: Send + Sync {
    async fn execute(&self, name: &str, file: Option<&Path>) -> Result<()>;
}

/// Used when no host is attached: every host command fails.
pub struct NoHostBus;

#[async_trait::async_trait]
impl HostCommandBus for NoHostBus {
    async fn execute(&self, name: &str, _file: Option<&Path>) -> Result<()> {
        anyhow::bail!("no host command bus attached; cannot run \"{name}\"")
    }
}

/// Records dispatched commands (for testing). Names listed in `failing`
/// return an error.
pub struct RecordingHostBus {
    calls: std::sync::Mutex<Vec<(String, Option<PathBuf>)>>,
    failing: Vec<String>,
}

impl Default for RecordingHostBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingHostBus {
    pub fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(Vec::new()),
            failing: Vec::new(),
        }
    }

    pub fn failing(names: &[&str]) -> Self {
        Self {
            calls: std::sync::Mutex::new(Vec::new()),
            failing: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> Vec<(String, Option<PathBuf>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl HostCommandBus for RecordingHostBus {
    async fn execute(&self, name: &str, file: Option<&Path>) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), file.map(Path::to_path_buf)));
        if self.failing.iter().any(|f| f == name) {
            anyhow::bail!("host command \"{name}\" failed");
        }
        Ok(())
    }
}
