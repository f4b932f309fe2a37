use crate::agent::driver::{TaskAgentDriver, TaskOutcome};
use crate::agent::handle::{AgentHandle, AgentResolver, TaskStatus};
use crate::error::BatchError;
use crate::hook::host::NoHostBus;
use crate::hook::loader::{HookSource, StaticHooks};
use crate::hook::runner::HookRunner;
use crate::hook::schema::{HookDefinition, LifecyclePoint};
use crate::runner::batch_log::{
    hook_run_block, summary_block, task_completed_block, BatchLog, LogBlock,
};
use crate::runner::dashboard::DashboardRegistry;
use crate::runner::notify::{NoticeLevel, Notifier, ProgressReporter, StdoutNotifier, StdoutProgress};
use crate::select::files::FileSelector;
use crate::select::intent::IntentSource;
use crate::select::modified::ModifiedCountProbe;
use crate::state::machine::{BatchMachine, BatchPhase};
use crate::state::stats::{format_elapsed, RunStatistics};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Final statistics of a run that reached its per-file loop.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: RunStatistics,
    /// `None` when the log could not be created.
    pub log_path: Option<PathBuf>,
    /// Run id from the log header, when a log was written.
    pub run_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunReport),
    Cancelled(RunReport),
    /// Nothing matched the selection; no hooks ran and no log was written.
    NoFiles,
    /// The user backed out of the task prompt.
    IntentCancelled,
}

impl RunOutcome {
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Completed(r) | RunOutcome::Cancelled(r) => Some(r),
            RunOutcome::NoFiles | RunOutcome::IntentCancelled => None,
        }
    }
}

/// Drives one batch: resolve the agent, pick files and task, then run each
/// file through the agent in order with hooks around it.
pub struct BatchOrchestrator {
    resolver: Arc<dyn AgentResolver>,
    selector: Arc<dyn FileSelector>,
    intent: Arc<dyn IntentSource>,
    hooks: Arc<dyn HookSource>,
    hook_runner: HookRunner,
    driver: TaskAgentDriver,
    notifier: Arc<dyn Notifier>,
    progress: Arc<dyn ProgressReporter>,
    dashboard: DashboardRegistry,
    modified: Option<Arc<dyn ModifiedCountProbe>>,
    log_dir: PathBuf,
}

impl BatchOrchestrator {
    pub fn new(
        resolver: Arc<dyn AgentResolver>,
        selector: Arc<dyn FileSelector>,
        intent: Arc<dyn IntentSource>,
        log_dir: PathBuf,
    ) -> Self {
        Self {
            resolver,
            selector,
            intent,
            hooks: Arc::new(StaticHooks(vec![])),
            hook_runner: HookRunner::new(Arc::new(NoHostBus)),
            driver: TaskAgentDriver::default(),
            notifier: Arc::new(StdoutNotifier),
            progress: Arc::new(StdoutProgress::new()),
            dashboard: DashboardRegistry::new(),
            modified: None,
            log_dir,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn HookSource>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_hook_runner(mut self, runner: HookRunner) -> Self {
        self.hook_runner = runner;
        self
    }

    pub fn with_driver(mut self, driver: TaskAgentDriver) -> Self {
        self.driver = driver;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_dashboard(mut self, dashboard: DashboardRegistry) -> Self {
        self.dashboard = dashboard;
        self
    }

    pub fn with_modified_probe(mut self, probe: Arc<dyn ModifiedCountProbe>) -> Self {
        self.modified = Some(probe);
        self
    }

    pub fn dashboard(&self) -> &DashboardRegistry {
        &self.dashboard
    }

    /// Run a batch to completion or cancellation.
    ///
    /// Errors only before the per-file loop starts. Once files are being
    /// processed, agent, hook and logging failures are recorded and the
    /// batch carries on.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunOutcome, BatchError> {
        let mut machine = BatchMachine::new();

        let agent = self.resolver.resolve().await?;
        machine.advance(BatchPhase::AgentResolved)?;

        let selection = self.selector.select().await.map_err(BatchError::Selection)?;
        for warning in &selection.warnings {
            self.notifier.notify(NoticeLevel::Warning, warning).await;
        }
        machine.advance(BatchPhase::FilesSelected)?;
        let files = selection.files;
        if files.is_empty() {
            self.notifier
                .notify(NoticeLevel::Info, "No files selected; nothing to do.")
                .await;
            return Ok(RunOutcome::NoFiles);
        }

        let Some(intent) = self.intent.resolve().await.map_err(BatchError::Intent)? else {
            self.notifier
                .notify(NoticeLevel::Info, "No task given; batch not started.")
                .await;
            return Ok(RunOutcome::IntentCancelled);
        };
        machine.advance(BatchPhase::IntentResolved)?;

        let hooks = self.hooks.load();
        let mut stats = RunStatistics::new(files.len() as u64);
        let mut log = match BatchLog::open(&self.log_dir, &hooks, &stats, &intent) {
            Ok(log) => Some(log),
            Err(e) => {
                tracing::warn!(error = %e, "continuing without a run log");
                self.notifier
                    .notify(
                        NoticeLevel::Warning,
                        &format!("Run log unavailable, continuing without it: {e}"),
                    )
                    .await;
                None
            }
        };
        machine.advance(BatchPhase::HooksLoaded)?;

        tracing::info!(files = files.len(), hooks = hooks.len(), "batch started");
        self.notifier
            .notify(
                NoticeLevel::Info,
                &format!("Processing {} file(s) with {} hook(s)", files.len(), hooks.len()),
            )
            .await;

        self.refresh_modified(&mut stats).await;
        self.run_point_block(&hooks, LifecyclePoint::BeforeBatch, &stats, &mut log)
            .await;
        machine.advance(BatchPhase::Running(0))?;

        let total = files.len();
        let increment = 100.0 / total as f64;
        let mut cancelled = false;
        for (i, file) in files.iter().enumerate() {
            if i > 0 {
                machine.advance(BatchPhase::Running(i))?;
            }
            if cancel.is_cancelled() {
                tracing::info!(processed = stats.processed_files, "batch cancelled");
                cancelled = true;
                break;
            }

            self.progress
                .report(
                    &format!("processing {} of {total}: {}", i + 1, file.display()),
                    increment,
                )
                .await;
            self.process_file(
                agent.as_ref(),
                &hooks,
                file,
                i,
                &intent.instruction,
                &mut stats,
                &mut log,
            )
            .await;
        }

        machine.advance(if cancelled {
            BatchPhase::Cancelled
        } else {
            BatchPhase::Completed
        })?;

        stats.finish();
        self.refresh_modified(&mut stats).await;
        self.run_point_block(&hooks, LifecyclePoint::AfterBatch, &stats, &mut log)
            .await;
        let status = if cancelled { "cancelled" } else { "completed" };
        append(&mut log, &summary_block(&stats, status));

        self.dashboard.publish(&stats);
        self.notifier
            .notify(NoticeLevel::Info, &summary_line(&stats, status))
            .await;

        let report = RunReport {
            stats,
            log_path: log.as_ref().map(|l| l.path().to_path_buf()),
            run_id: log.as_ref().map(|l| l.run_id().to_string()),
        };
        Ok(if cancelled {
            RunOutcome::Cancelled(report)
        } else {
            RunOutcome::Completed(report)
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_file(
        &self,
        agent: &dyn AgentHandle,
        hooks: &[HookDefinition],
        file: &Path,
        index: usize,
        instruction: &str,
        stats: &mut RunStatistics,
        log: &mut Option<BatchLog>,
    ) {
        self.refresh_modified(stats).await;
        let mut hook_lines = self
            .hook_runner
            .run(hooks, LifecyclePoint::BeforeFile, stats, Some(file))
            .await
            .lines;

        let result = match self.driver.run_on_file(agent, file, instruction).await {
            Ok(outcome) => {
                stats.record_success();
                describe_outcome(&outcome)
            }
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "task failed");
                self.notifier
                    .notify(NoticeLevel::Error, &format!("{} failed: {e}", file.display()))
                    .await;
                stats.record_failure();
                hook_lines.extend(
                    self.hook_runner
                        .run(hooks, LifecyclePoint::OnError, stats, Some(file))
                        .await
                        .lines,
                );
                format!("failed: {e}")
            }
        };

        self.refresh_modified(stats).await;
        hook_lines.extend(
            self.hook_runner
                .run(hooks, LifecyclePoint::AfterFile, stats, Some(file))
                .await
                .lines,
        );

        let messages = match agent.get_task_messages().await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "could not fetch agent messages");
                Vec::new()
            }
        };
        append(
            log,
            &task_completed_block(index, stats.total_files, file, &result, &messages, &hook_lines),
        );
    }

    async fn run_point_block(
        &self,
        hooks: &[HookDefinition],
        point: LifecyclePoint,
        stats: &RunStatistics,
        log: &mut Option<BatchLog>,
    ) {
        let report = self.hook_runner.run(hooks, point, stats, None).await;
        if report.failures() > 0 {
            self.notifier
                .notify(
                    NoticeLevel::Warning,
                    &format!("{} {point} hook(s) failed; see the run log", report.failures()),
                )
                .await;
        }
        append(log, &hook_run_block(point, &report));
    }

    async fn refresh_modified(&self, stats: &mut RunStatistics) {
        let Some(probe) = &self.modified else {
            return;
        };
        match probe.count().await {
            Ok(n) => stats.modified_files = n,
            Err(e) => tracing::warn!(
                error = %e,
                kept = stats.modified_files,
                "modified-file count unavailable, keeping the previous value"
            ),
        }
    }
}

fn append(log: &mut Option<BatchLog>, block: &LogBlock) {
    if let Some(log) = log.as_mut() {
        log.append(block);
    }
}

fn describe_outcome(outcome: &TaskOutcome) -> String {
    if outcome.timed_out {
        return format!("timed out after {}", format_elapsed(outcome.elapsed));
    }
    match outcome.status {
        TaskStatus::Completed => "completed".to_string(),
        TaskStatus::Cancelled => "cancelled by agent".to_string(),
        TaskStatus::None => "no active task".to_string(),
        TaskStatus::Active => "still active".to_string(),
    }
}

fn summary_line(stats: &RunStatistics, status: &str) -> String {
    format!(
        "Batch {status} in {}: {}/{} processed, {} succeeded, {} failed, {} modified",
        format_elapsed(stats.duration()),
        stats.processed_files,
        stats.total_files,
        stats.successful_files,
        stats.failed_files,
        stats.modified_files,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::driver::DriverTiming;
    use crate::agent::handle::{FixedResolver, MockAgent, UnavailableResolver};
    use crate::hook::host::RecordingHostBus;
    use crate::runner::notify::{CollectNotifier, CollectProgress};
    use crate::select::files::StaticSelection;
    use crate::select::intent::{FixedIntent, TaskIntent};
    use crate::select::modified::FixedCount;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fast_driver() -> TaskAgentDriver {
        TaskAgentDriver::new(DriverTiming {
            settle_ms: 1,
            poll_interval_ms: 2,
            max_wait_ms: 1_000,
        })
    }

    struct Fixture {
        agent: Arc<MockAgent>,
        host: Arc<RecordingHostBus>,
        notifier: Arc<CollectNotifier>,
        progress: Arc<CollectProgress>,
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new(agent: MockAgent) -> Self {
            Self {
                agent: Arc::new(agent),
                host: Arc::new(RecordingHostBus::new()),
                notifier: Arc::new(CollectNotifier::new()),
                progress: Arc::new(CollectProgress::new()),
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn log_dir(&self) -> PathBuf {
            self.dir.path().join("logs")
        }

        fn orchestrator(&self, files: &[&str], intent: &str) -> BatchOrchestrator {
            BatchOrchestrator::new(
                Arc::new(FixedResolver(self.agent.clone())),
                Arc::new(StaticSelection(files.iter().map(PathBuf::from).collect())),
                Arc::new(FixedIntent(TaskIntent::new(intent))),
                self.log_dir(),
            )
            .with_driver(fast_driver())
            .with_hook_runner(
                HookRunner::new(self.host.clone()).with_grace(Duration::from_millis(1)),
            )
            .with_notifier(self.notifier.clone())
            .with_progress(self.progress.clone())
        }
    }

    fn read_log(report: &RunReport) -> String {
        std::fs::read_to_string(report.log_path.as_ref().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn three_files_add_comments() {
        let fx = Fixture::new(MockAgent::new());
        let orch = fx.orchestrator(&["src/a.rs", "src/b.rs", "src/c.rs"], "add comments");
        let outcome = orch.run(CancellationToken::new()).await.unwrap();

        let RunOutcome::Completed(report) = outcome else {
            panic!("expected completed run");
        };
        let s = &report.stats;
        assert_eq!(s.total_files, 3);
        assert_eq!(s.processed_files, 3);
        assert_eq!(s.successful_files, 3);
        assert_eq!(s.failed_files, 0);
        assert_eq!(s.error_count, 0);
        assert!(s.end_time.is_some());

        let log = read_log(&report);
        assert_eq!(log.matches("-- Task Completed --").count(), 3);
        assert_eq!(log.matches("-- Batch Summary --").count(), 1);
        assert!(log.contains("status: completed\n"));
        assert!(log.contains("processedFiles: 3\n"));
        assert!(log.contains("successfulFiles: 3\n"));
        assert!(log.contains("-- Hooks: beforeBatch --"));
        assert!(log.contains("-- Hooks: afterBatch --"));
        assert!(log.contains("(mock) received: Apply the following task to the file `src/b.rs`."));

        let prompts = fx.agent.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(|p| p.contains("add comments")));

        let reports = fx.progress.reports();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].0, "processing 1 of 3: src/a.rs");
        assert!((reports[0].1 - 100.0 / 3.0).abs() < 1e-9);

        assert_eq!(orch.dashboard().last().as_ref(), Some(s));
        assert!(fx.notifier.texts().last().unwrap().starts_with("Batch completed"));
    }

    #[tokio::test]
    async fn failures_count_and_fire_on_error_hooks() {
        let fx = Fixture::new(MockAgent::new().rejecting("b.rs"));
        let hooks = vec![
            HookDefinition::new("report", LifecyclePoint::OnError, "command:report-failure"),
            HookDefinition::new("after", LifecyclePoint::AfterFile, "command:after-file")
                .with_condition("errorCount == 0"),
        ];
        let orch = fx
            .orchestrator(&["a.rs", "b.rs", "c.rs"], "x")
            .with_hooks(Arc::new(StaticHooks(hooks)));
        let outcome = orch.run(CancellationToken::new()).await.unwrap();
        let report = outcome.report().unwrap();

        let s = &report.stats;
        assert_eq!(s.processed_files, 3);
        assert_eq!(s.successful_files + s.failed_files, 3);
        assert_eq!(s.failed_files, 1);
        assert_eq!(s.error_count, 1);

        let calls = fx.host.calls();
        let names: Vec<&str> = calls.iter().map(|(n, _)| n.as_str()).collect();
        // afterFile stops firing once errorCount is non-zero
        assert_eq!(names, vec!["after-file", "report-failure"]);
        assert_eq!(calls[1].1.as_deref(), Some(Path::new("b.rs")));

        let log = read_log(report);
        assert!(log.contains("result: failed: agent rejected the task"));
        assert!(log.contains("after: skipped"));
        assert!(log.contains(&format!("run: {}", report.run_id.as_deref().unwrap())));

        let errors: Vec<String> = fx
            .notifier
            .messages()
            .into_iter()
            .filter(|(level, _)| *level == NoticeLevel::Error)
            .map(|(_, text)| text)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("b.rs failed"));
    }

    struct CancelOnReport {
        token: CancellationToken,
        after: usize,
        seen: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ProgressReporter for CancelOnReport {
        async fn report(&self, _message: &str, _increment: f64) {
            if self.seen.fetch_add(1, Ordering::SeqCst) + 1 == self.after {
                self.token.cancel();
            }
        }
    }

    #[tokio::test]
    async fn cancellation_stops_at_next_file() {
        let fx = Fixture::new(MockAgent::new());
        let token = CancellationToken::new();
        let hooks = vec![HookDefinition::new("wrap", LifecyclePoint::AfterBatch, "command:wrap-up")];
        let orch = fx
            .orchestrator(&["a.rs", "b.rs", "c.rs", "d.rs"], "x")
            .with_hooks(Arc::new(StaticHooks(hooks)))
            .with_progress(Arc::new(CancelOnReport {
                token: token.clone(),
                after: 2,
                seen: AtomicUsize::new(0),
            }));

        let outcome = orch.run(token).await.unwrap();
        let RunOutcome::Cancelled(report) = outcome else {
            panic!("expected cancelled run");
        };
        // the file in flight when cancel arrived still finishes
        assert_eq!(report.stats.processed_files, 2);
        assert_eq!(report.stats.total_files, 4);
        assert_eq!(fx.agent.prompts().len(), 2);
        assert!(report.stats.end_time.is_some());

        // completion steps still run
        assert_eq!(fx.host.calls().len(), 1);
        let log = read_log(&report);
        assert!(log.contains("status: cancelled\n"));
        assert_eq!(log.matches("-- Task Completed --").count(), 2);
    }

    #[tokio::test]
    async fn cancelled_before_start_processes_nothing() {
        let fx = Fixture::new(MockAgent::new());
        let token = CancellationToken::new();
        token.cancel();
        let outcome = fx.orchestrator(&["a.rs"], "x").run(token).await.unwrap();
        let RunOutcome::Cancelled(report) = outcome else {
            panic!("expected cancelled run");
        };
        assert_eq!(report.stats.processed_files, 0);
        assert!(fx.agent.prompts().is_empty());
    }

    #[tokio::test]
    async fn stuck_agent_times_out_and_batch_moves_on() {
        let fx = Fixture::new(MockAgent::never_finishing());
        let orch = fx
            .orchestrator(&["a.rs", "b.rs"], "x")
            .with_driver(TaskAgentDriver::new(DriverTiming {
                settle_ms: 1,
                poll_interval_ms: 5,
                max_wait_ms: 20,
            }));
        let outcome = orch.run(CancellationToken::new()).await.unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.stats.processed_files, 2);
        assert_eq!(report.stats.successful_files, 2);
        assert_eq!(read_log(report).matches("result: timed out").count(), 2);
    }

    #[tokio::test]
    async fn no_files_writes_nothing() {
        let fx = Fixture::new(MockAgent::new());
        let hooks = vec![HookDefinition::new("pre", LifecyclePoint::BeforeBatch, "command:pre")];
        let orch = fx.orchestrator(&[], "x").with_hooks(Arc::new(StaticHooks(hooks)));
        let outcome = orch.run(CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, RunOutcome::NoFiles));
        assert!(!fx.log_dir().exists());
        assert!(fx.host.calls().is_empty());
        assert!(orch.dashboard().last().is_none());
    }

    #[tokio::test]
    async fn blank_intent_cancels_before_start() {
        let fx = Fixture::new(MockAgent::new());
        let outcome = fx
            .orchestrator(&["a.rs"], "   ")
            .run(CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(outcome, RunOutcome::IntentCancelled));
        assert!(!fx.log_dir().exists());
        assert!(fx.agent.prompts().is_empty());
    }

    #[tokio::test]
    async fn missing_agent_fails_before_run() {
        let fx = Fixture::new(MockAgent::new());
        let orch = BatchOrchestrator::new(
            Arc::new(UnavailableResolver("agent not installed".into())),
            Arc::new(StaticSelection(vec![PathBuf::from("a.rs")])),
            Arc::new(FixedIntent(TaskIntent::new("x"))),
            fx.log_dir(),
        )
        .with_notifier(fx.notifier.clone());
        let err = orch.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, BatchError::AgentUnavailable(_)));
        assert!(!fx.log_dir().exists());
    }

    #[tokio::test]
    async fn hooks_run_in_load_order_with_skips() {
        let fx = Fixture::new(MockAgent::new());
        let hooks = vec![
            HookDefinition::new("first", LifecyclePoint::BeforeBatch, "command:one"),
            HookDefinition::new("big-only", LifecyclePoint::BeforeBatch, "command:big")
                .with_condition("totalFiles >= 5"),
            HookDefinition::new("second", LifecyclePoint::BeforeBatch, "command:two"),
        ];
        let orch = fx
            .orchestrator(&["a.rs"], "x")
            .with_hooks(Arc::new(StaticHooks(hooks)));
        let report = orch.run(CancellationToken::new()).await.unwrap();

        let names: Vec<String> = fx.host.calls().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["one", "two"]);
        let log = read_log(report.report().unwrap());
        assert!(log.contains("big-only: skipped (condition \"totalFiles >= 5\" is false)"));
    }

    #[tokio::test]
    async fn failing_hooks_do_not_stop_the_batch() {
        let fx = Fixture::new(MockAgent::new());
        let host = Arc::new(RecordingHostBus::failing(&["broken"]));
        let hooks = vec![
            HookDefinition::new("bad", LifecyclePoint::BeforeFile, "command:broken"),
            HookDefinition::new("good", LifecyclePoint::BeforeFile, "command:fine"),
        ];
        let orch = fx
            .orchestrator(&["a.rs", "b.rs"], "x")
            .with_hooks(Arc::new(StaticHooks(hooks)))
            .with_hook_runner(HookRunner::new(host.clone()).with_grace(Duration::from_millis(1)));
        let outcome = orch.run(CancellationToken::new()).await.unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.stats.successful_files, 2);
        assert_eq!(host.calls().len(), 4);
        assert_eq!(read_log(report).matches("bad: failed").count(), 2);
    }

    #[tokio::test]
    async fn unwritable_log_dir_warns_once_and_continues() {
        let fx = Fixture::new(MockAgent::new());
        std::fs::write(fx.log_dir(), "not a directory").unwrap();
        let outcome = fx
            .orchestrator(&["a.rs", "b.rs"], "x")
            .run(CancellationToken::new())
            .await
            .unwrap();
        let report = outcome.report().unwrap();
        assert!(report.log_path.is_none());
        assert!(report.run_id.is_none());
        assert_eq!(report.stats.processed_files, 2);
        let warnings: Vec<_> = fx
            .notifier
            .messages()
            .into_iter()
            .filter(|(level, _)| *level == NoticeLevel::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].1.contains("Run log unavailable"));
    }

    /// Succeeds once, then every later count fails.
    struct CountThenFail {
        first: u64,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ModifiedCountProbe for CountThenFail {
        async fn count(&self) -> anyhow::Result<u64> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(self.first)
            } else {
                anyhow::bail!("git status failed")
            }
        }
    }

    #[tokio::test]
    async fn failed_modified_count_keeps_prior_value() {
        let fx = Fixture::new(MockAgent::new());
        let probe = Arc::new(CountThenFail {
            first: 3,
            calls: AtomicUsize::new(0),
        });
        let outcome = fx
            .orchestrator(&["a.rs", "b.rs"], "x")
            .with_modified_probe(probe.clone())
            .run(CancellationToken::new())
            .await
            .unwrap();
        let RunOutcome::Completed(report) = outcome else {
            panic!("expected completed run");
        };
        assert!(probe.calls.load(Ordering::SeqCst) > 1);
        assert_eq!(report.stats.modified_files, 3);
        assert_eq!(report.stats.successful_files, 2);
    }

    #[tokio::test]
    async fn modified_count_comes_from_probe() {
        let fx = Fixture::new(MockAgent::new());
        let outcome = fx
            .orchestrator(&["a.rs"], "x")
            .with_modified_probe(Arc::new(FixedCount(4)))
            .run(CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.report().unwrap().stats.modified_files, 4);
    }

    #[test]
    fn outcome_descriptions() {
        let out = TaskOutcome {
            status: TaskStatus::Active,
            polls: 3,
            timed_out: true,
            elapsed: Duration::from_secs(600),
        };
        assert_eq!(describe_outcome(&out), "timed out after 10m0s");
        let out = TaskOutcome {
            status: TaskStatus::Cancelled,
            timed_out: false,
            ..out
        };
        assert_eq!(describe_outcome(&out), "cancelled by agent");
    }
}
