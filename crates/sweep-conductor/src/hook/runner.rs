use crate::error::HookError;
use crate::hook::condition;
use crate::hook::host::HostCommandBus;
use crate::hook::schema::{HookCommand, HookDefinition, LifecyclePoint};
use crate::state::stats::RunStatistics;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Time given to a shell hook after it is spawned before the runner moves on.
/// The hook's own exit status is never awaited.
pub const DEFAULT_HOOK_GRACE: Duration = Duration::from_secs(2);

/// Shell program and args for the current platform.
#[cfg(windows)]
fn shell_cmd(cmd: &str) -> (String, Vec<String>) {
    // Prefer PowerShell over cmd.exe for better Unix-ism support
    static SHELL: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    let shell = SHELL.get_or_init(|| {
        if which_exists("pwsh") {
            "pwsh".into()
        } else if which_exists("powershell") {
            "powershell".into()
        } else {
            "cmd.exe".into()
        }
    });

    if shell == "cmd.exe" {
        (shell.clone(), vec!["/C".into(), cmd.into()])
    } else {
        (
            shell.clone(),
            vec!["-NoProfile".into(), "-Command".into(), cmd.into()],
        )
    }
}

#[cfg(not(windows))]
fn shell_cmd(cmd: &str) -> (String, Vec<String>) {
    ("sh".into(), vec!["-c".into(), cmd.into()])
}

#[cfg(windows)]
fn which_exists(name: &str) -> bool {
    std::process::Command::new("where")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Outcome of one hook in a lifecycle invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookStatus {
    Completed,
    Skipped,
    Failed(String),
}

/// Everything that happened at one lifecycle point.
#[derive(Debug, Clone, Default)]
pub struct HookRunReport {
    /// Timestamped log lines, in execution order.
    pub lines: Vec<String>,
    pub outcomes: Vec<(String, HookStatus)>,
}

impl HookRunReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn executed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, s)| *s != HookStatus::Skipped)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, s)| matches!(s, HookStatus::Failed(_)))
            .count()
    }
}

/// Runs the hooks registered for a lifecycle point, one after another.
pub struct HookRunner {
    host: Arc<dyn HostCommandBus>,
    grace: Duration,
    cwd: Option<PathBuf>,
}

impl HookRunner {
    pub fn new(host: Arc<dyn HostCommandBus>) -> Self {
        Self {
            host,
            grace: DEFAULT_HOOK_GRACE,
            cwd: None,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Working directory for shell hooks. Defaults to the process cwd.
    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Run every hook whose `run_at` matches, in load order. Never fails:
    /// a broken hook is recorded and the next one still runs.
    pub async fn run(
        &self,
        hooks: &[HookDefinition],
        run_at: LifecyclePoint,
        stats: &RunStatistics,
        file: Option<&Path>,
    ) -> HookRunReport {
        let matching: Vec<&HookDefinition> = hooks.iter().filter(|h| h.run_at == run_at).collect();
        let mut report = HookRunReport::default();
        if matching.is_empty() {
            return report;
        }

        let names = matching
            .iter()
            .map(|h| h.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let line = |report: &mut HookRunReport, hook: &str, event: &str| {
            report
                .lines
                .push(format!("[{}] {run_at} [{names}] {hook}: {event}", now_rfc3339()));
        };

        for hook in matching {
            if !condition::evaluate(&hook.condition, stats) {
                tracing::debug!(hook = %hook.name, %run_at, condition = %hook.condition, "hook skipped");
                line(
                    &mut report,
                    &hook.name,
                    &format!("skipped (condition \"{}\" is false)", hook.condition),
                );
                report.outcomes.push((hook.name.clone(), HookStatus::Skipped));
                continue;
            }

            line(&mut report, &hook.name, &format!("started `{}`", hook.command));
            match self.execute(hook, run_at, stats, file).await {
                Ok(()) => {
                    tracing::info!(hook = %hook.name, %run_at, "hook completed");
                    line(&mut report, &hook.name, "completed");
                    report.outcomes.push((hook.name.clone(), HookStatus::Completed));
                }
                Err(e) => {
                    tracing::warn!(hook = %hook.name, %run_at, error = %e, "hook failed");
                    line(&mut report, &hook.name, &format!("failed: {e}"));
                    report
                        .outcomes
                        .push((hook.name.clone(), HookStatus::Failed(e.to_string())));
                }
            }
        }
        report
    }

    async fn execute(
        &self,
        hook: &HookDefinition,
        run_at: LifecyclePoint,
        stats: &RunStatistics,
        file: Option<&Path>,
    ) -> Result<(), HookError> {
        match &hook.command {
            HookCommand::Host { name } => {
                self.host
                    .execute(name, file)
                    .await
                    .map_err(|e| HookError::Host {
                        command: name.clone(),
                        message: format!("{e:#}"),
                    })
            }
            HookCommand::Shell { text } => {
                self.spawn_shell(&hook.name, text, run_at, stats, file)?;
                tokio::time::sleep(self.grace).await;
                Ok(())
            }
        }
    }

    /// Start the shell command and leave it running.
    fn spawn_shell(
        &self,
        hook_name: &str,
        text: &str,
        run_at: LifecyclePoint,
        stats: &RunStatistics,
        file: Option<&Path>,
    ) -> Result<(), HookError> {
        let (shell, args) = shell_cmd(text);
        let mut cmd = Command::new(&shell);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .env("SWEEP_RUN_AT", run_at.as_str())
            .env("SWEEP_TOTAL_FILES", stats.total_files.to_string())
            .env("SWEEP_PROCESSED_FILES", stats.processed_files.to_string())
            .env("SWEEP_ERROR_COUNT", stats.error_count.to_string());
        if let Some(f) = file {
            cmd.env("SWEEP_FILE", f);
        }
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.spawn().map(drop).map_err(|source| HookError::Spawn {
            hook: hook_name.to_string(),
            source,
        })
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
