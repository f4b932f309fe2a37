use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sweep_conductor::agent::driver::TaskAgentDriver;
use sweep_conductor::agent::process::ProcessAgentResolver;
use sweep_conductor::config::EngineConfig;
use sweep_conductor::hook::host::NoHostBus;
use sweep_conductor::hook::loader::FileHookSource;
use sweep_conductor::hook::runner::HookRunner;
use sweep_conductor::runner::dashboard::{DashboardRegistry, StatusFileSubscriber};
use sweep_conductor::runner::notify::{StdoutNotifier, StdoutProgress};
use sweep_conductor::runner::orchestrator::{BatchOrchestrator, RunOutcome};
use sweep_conductor::select::files::PathSelector;
use sweep_conductor::select::intent::{
    DescriptionFileIntent, FixedIntent, IntentSource, PromptIntent, TaskIntent,
};
use sweep_conductor::select::modified::GitStatusProbe;
use sweep_store::StorePaths;
use tokio_util::sync::CancellationToken;

pub struct RunParams<'a> {
    pub store: &'a StorePaths,
    pub paths: Vec<PathBuf>,
    pub task: Option<String>,
    pub task_file: Option<PathBuf>,
    pub project_root: Option<PathBuf>,
    pub agent_cmd: Option<String>,
    pub agent_args: Vec<String>,
    pub no_git: bool,
    pub poll_secs: Option<u64>,
    pub max_wait_secs: Option<u64>,
}

/// Flags win over `config.json`.
fn apply_overrides(config: &mut EngineConfig, params: &RunParams<'_>) {
    if let Some(cmd) = &params.agent_cmd {
        config.agent_program = cmd.clone();
        config.agent_args = params.agent_args.clone();
    } else if !params.agent_args.is_empty() {
        config.agent_args = params.agent_args.clone();
    }
    if let Some(secs) = params.poll_secs {
        config.timing.poll_interval_ms = secs.saturating_mul(1000);
    }
    if let Some(secs) = params.max_wait_secs {
        config.timing.max_wait_ms = secs.saturating_mul(1000);
    }
}

fn intent_source(task: Option<String>, task_file: Option<PathBuf>) -> Arc<dyn IntentSource> {
    match (task, task_file) {
        (Some(text), _) => Arc::new(FixedIntent(TaskIntent::new(text))),
        (None, Some(path)) => Arc::new(DescriptionFileIntent::new(path)),
        (None, None) => Arc::new(PromptIntent),
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    let path = if path.is_relative() {
        std::env::current_dir()?.join(path)
    } else {
        path.to_path_buf()
    };
    Ok(path.canonicalize().unwrap_or(path))
}

/// Execute `sweep run <paths..>`
pub fn execute(params: RunParams<'_>) -> Result<()> {
    let mut config = EngineConfig::load(params.store);
    apply_overrides(&mut config, &params);

    let project_root = match &params.project_root {
        Some(p) => absolute(p)?,
        None => absolute(Path::new("."))?,
    };
    if !project_root.is_dir() {
        anyhow::bail!("project root {} is not a directory", project_root.display());
    }

    let resolver = ProcessAgentResolver::new(
        PathBuf::from(&config.agent_program),
        config.agent_args.clone(),
    )
    .with_cwd(project_root.clone());
    let selector = PathSelector::new(project_root.clone(), params.paths);
    let intent = intent_source(params.task, params.task_file);

    let dashboard = DashboardRegistry::new();
    let _status = StatusFileSubscriber::new(params.store.status_json.clone()).attach(&dashboard);

    let mut orchestrator = BatchOrchestrator::new(
        Arc::new(resolver),
        Arc::new(selector),
        intent,
        params.store.logs_dir.clone(),
    )
    .with_hooks(Arc::new(FileHookSource::new(params.store.hooks_json.clone())))
    .with_hook_runner(
        HookRunner::new(Arc::new(NoHostBus))
            .with_grace(config.hook_grace())
            .with_cwd(project_root.clone()),
    )
    .with_driver(TaskAgentDriver::new(config.timing))
    .with_notifier(Arc::new(StdoutNotifier))
    .with_progress(Arc::new(StdoutProgress::new()))
    .with_dashboard(dashboard);
    if !params.no_git {
        orchestrator =
            orchestrator.with_modified_probe(Arc::new(GitStatusProbe::new(project_root.clone())));
    }

    let cancel = CancellationToken::new();
    ctrlc_cancel(cancel.clone());

    let rt = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let outcome = rt.block_on(orchestrator.run(cancel))?;

    match &outcome {
        RunOutcome::Completed(report) | RunOutcome::Cancelled(report) => {
            if let (Some(path), Some(run)) = (&report.log_path, &report.run_id) {
                println!("Log: {} (run {run})", path.display());
            }
            if matches!(outcome, RunOutcome::Cancelled(_)) {
                println!("Cancelled. Re-run with the remaining files to continue.");
            }
        }
        RunOutcome::NoFiles | RunOutcome::IntentCancelled => {}
    }
    Ok(())
}

fn ctrlc_cancel(cancel: CancellationToken) {
    let _ = ctrlc::set_handler(move || {
        eprintln!("\nStopping after the current file...");
        cancel.cancel();
    });
}
