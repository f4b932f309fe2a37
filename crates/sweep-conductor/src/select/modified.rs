use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tokio::process::Command;

/// Counts files the run has left modified in the workspace.
#[async_trait::async_trait]
pub trait ModifiedCountProbe: Send + Sync {
    async fn count(&self) -> Result<u64>;
}

/// Counts entries in `git status --porcelain`, untracked files included.
pub struct GitStatusProbe {
    cwd: PathBuf,
}

impl GitStatusProbe {
    pub fn new(cwd: PathBuf) -> Self {
        Self { cwd }
    }
}

#[async_trait::async_trait]
impl ModifiedCountProbe for GitStatusProbe {
    async fn count(&self) -> Result<u64> {
        let output = Command::new("git")
            .args(["status", "--porcelain"])
            .current_dir(&self.cwd)
            .output()
            .await
            .context("git not available")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git status failed: {}", stderr.trim());
        }
        Ok(count_porcelain(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn count_porcelain(stdout: &str) -> u64 {
    stdout.lines().filter(|l| !l.trim().is_empty()).count() as u64
}

/// Reports a fixed count.
pub struct FixedCount(pub u64);

#[async_trait::async_trait]
impl ModifiedCountProbe for FixedCount {
    async fn count(&self) -> Result<u64> {
        Ok(self.0)
    }
}
