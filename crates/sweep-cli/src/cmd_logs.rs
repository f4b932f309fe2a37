use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use sweep_store::StorePaths;

/// Run logs under `dir`, newest first.
fn recent_logs(dir: &Path, limit: usize) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut logs = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("batch-") && n.ends_with(".log"));
        if is_log {
            logs.push(path);
        }
    }
    // names embed the start time, so name order is start order
    logs.sort();
    logs.reverse();
    logs.truncate(limit);
    Ok(logs)
}

/// Execute `sweep logs`
pub fn execute(store: &StorePaths, limit: usize) -> Result<()> {
    let logs = recent_logs(&store.logs_dir, limit)?;
    if logs.is_empty() {
        println!("No run logs in {}.", store.logs_dir.display());
        return Ok(());
    }
    for path in logs {
        println!("{}", path.display());
    }
    Ok(())
}
