//! Human-readable run log.
//!
//! One file per run under the log directory, named
//! `batch-<start time>.log`. The file is only ever appended to: a header
//! block at open, then hook-run and task-completion blocks as the batch
//! progresses, then a summary block. Every block has the same shape:
//!
//! ```text
//! -- Title --
//! key: value
//!
//! body lines
//! ```

use crate::agent::handle::{AgentMessage, MessageKind};
use crate::error::LoggingError;
use crate::hook::runner::HookRunReport;
use crate::hook::schema::{HookDefinition, LifecyclePoint};
use crate::select::intent::TaskIntent;
use crate::state::stats::{format_elapsed, RunStatistics};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// One structured section of the run log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogBlock {
    pub title: String,
    pub meta: Vec<(String, String)>,
    pub body: Vec<String>,
}

impl LogBlock {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn meta(mut self, key: &str, value: impl ToString) -> Self {
        self.meta.push((key.to_string(), value.to_string()));
        self
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.body.push(line.into());
        self
    }

    pub fn lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body.extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn render(&self) -> String {
        let mut out = format!("-- {} --\n", self.title);
        for (k, v) in &self.meta {
            out.push_str(&format!("{k}: {v}\n"));
        }
        if !self.body.is_empty() {
            out.push('\n');
            for line in &self.body {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

/// Mask common secret patterns before they reach the log.
pub fn mask_secrets(text: &str) -> String {
    let patterns = [
        (r"sk-[a-zA-Z0-9_\-]{20,}", "[MASKED]"),
        (r"gh[pousr]_[a-zA-Z0-9]{20,}", "[MASKED]"),
        (r"Bearer\s+[a-zA-Z0-9._\-]+", "Bearer [MASKED]"),
        (
            r"(?i)(password|secret|token|api_key|apikey)=[^\s&]+",
            "$1=[MASKED]",
        ),
    ];

    let mut result = text.to_string();
    for (pattern, replacement) in patterns {
        if let Ok(re) = regex::Regex::new(pattern) {
            result = re.replace_all(&result, replacement).into_owned();
        }
    }
    result
}

fn rfc3339(t: OffsetDateTime) -> String {
    t.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

/// `2026-03-01T10:15:30.5Z` becomes `2026-03-01T10-15-30-5Z`.
pub fn log_file_stem(start: OffsetDateTime) -> String {
    format!("batch-{}", rfc3339(start).replace([':', '.'], "-"))
}

// ── Block builders ──

pub fn header_block(
    run_id: &str,
    stats: &RunStatistics,
    intent: &TaskIntent,
    hooks: &[HookDefinition],
) -> LogBlock {
    let patterns = if intent.file_patterns.is_empty() {
        "(none)".to_string()
    } else {
        intent.file_patterns.join(", ")
    };
    let mut block = LogBlock::new("Batch Started")
        .meta("run", run_id)
        .meta("started", rfc3339(stats.start_time))
        .meta("totalFiles", stats.total_files)
        .meta("hooks", hooks.len())
        .meta("filePatterns", patterns)
        .line("Task:")
        .lines(intent.instruction.lines().map(|l| format!("  {l}")));
    if !hooks.is_empty() {
        block = block.line("Hooks:").lines(hooks.iter().map(|h| {
            let cond = if h.condition.trim().is_empty() {
                String::new()
            } else {
                format!(" if {}", h.condition.trim())
            };
            format!("  {} [{}, {}]{cond}", h.name, h.run_at, h.command.kind())
        }));
    }
    block
}

pub fn hook_run_block(point: LifecyclePoint, report: &HookRunReport) -> LogBlock {
    LogBlock::new(format!("Hooks: {point}"))
        .meta("matched", report.outcomes.len())
        .meta("executed", report.executed().len())
        .meta("failed", report.failures())
        .lines(report.lines.iter().cloned())
}

fn message_lines(msg: &AgentMessage) -> Vec<String> {
    let kind = match msg.kind {
        MessageKind::Ask => "ASK",
        MessageKind::Say => "SAY",
    };
    let mut out = vec![format!(
        "[{}] {kind}: {}",
        rfc3339(msg.ts),
        mask_secrets(msg.text.as_deref().unwrap_or(""))
    )];
    if let Some(reasoning) = msg.reasoning.as_deref().filter(|r| !r.trim().is_empty()) {
        out.push(format!("  reasoning: {}", mask_secrets(reasoning)));
    }
    if !msg.files.is_empty() {
        out.push(format!("  files: {}", msg.files.join(", ")));
    }
    out
}

/// One file's task. `result` is a short outcome such as `completed` or
/// `failed: <reason>`.
pub fn task_completed_block(
    index: usize,
    total: u64,
    file: &Path,
    result: &str,
    messages: &[AgentMessage],
    hook_lines: &[String],
) -> LogBlock {
    let mut block = LogBlock::new("Task Completed")
        .meta("file", file.display())
        .meta("position", format!("{} of {total}", index + 1))
        .meta("result", result)
        .meta("messages", messages.len());
    if !messages.is_empty() {
        block = block
            .line("Messages:")
            .lines(messages.iter().flat_map(message_lines));
    }
    if !hook_lines.is_empty() {
        block = block.line("Hooks:").lines(hook_lines.iter().cloned());
    }
    block
}

pub fn summary_block(stats: &RunStatistics, status: &str) -> LogBlock {
    let mut block = LogBlock::new("Batch Summary")
        .meta("status", status)
        .meta("duration", format_elapsed(stats.duration()));
    if let Some(end) = stats.end_time {
        block = block.meta("finished", rfc3339(end));
    }
    block
        .meta("totalFiles", stats.total_files)
        .meta("processedFiles", stats.processed_files)
        .meta("successfulFiles", stats.successful_files)
        .meta("failedFiles", stats.failed_files)
        .meta("modifiedFiles", stats.modified_files)
        .meta("errorCount", stats.error_count)
}

// ── BatchLog ──

/// Append-only writer for one run's log file.
#[derive(Debug)]
pub struct BatchLog {
    path: PathBuf,
    run_id: String,
}

impl BatchLog {
    /// Create the run log under `dir` and write the header block.
    ///
    /// An existing log is never reused: a numeric suffix is added when a
    /// file with the same start time is already there.
    pub fn open(
        dir: &Path,
        hooks: &[HookDefinition],
        stats: &RunStatistics,
        intent: &TaskIntent,
    ) -> Result<Self, LoggingError> {
        fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let stem = log_file_stem(stats.start_time);
        let mut attempt = 0u32;
        let (path, mut file) = loop {
            let name = if attempt == 0 {
                format!("{stem}.log")
            } else {
                format!("{stem}-{attempt}.log")
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < 1000 => {
                    attempt += 1;
                }
                Err(source) => return Err(LoggingError::CreateFile { path, source }),
            }
        };

        let run_id = ulid::Ulid::new().to_string();
        let header = header_block(&run_id, stats, intent, hooks).render();
        writeln!(file, "{header}").map_err(|source| LoggingError::CreateFile {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), %run_id, "run log opened");
        Ok(Self { path, run_id })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Append one block followed by a blank line. Best-effort: a failed
    /// write is reported as a warning and the run carries on.
    pub fn append(&mut self, block: &LogBlock) {
        let result = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{}", block.render()));
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to append to run log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::runner::HookStatus;

    fn at(secs: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(secs).unwrap()
    }

    #[test]
    fn render_shape() {
        let block = LogBlock::new("Task Completed")
            .meta("file", "a.rs")
            .line("hello");
        assert_eq!(block.render(), "-- Task Completed --\nfile: a.rs\n\nhello\n");
        assert_eq!(LogBlock::new("Empty").render(), "-- Empty --\n");
    }

    #[test]
    fn file_stem_is_filesystem_safe() {
        let t = at(1_772_000_000) + time::Duration::milliseconds(250);
        let stem = log_file_stem(t);
        assert!(stem.starts_with("batch-"));
        assert!(!stem.contains(':'));
        assert!(!stem.contains('.'));
    }

    #[test]
    fn mask_api_keys_and_tokens() {
        let masked = mask_secrets("key sk-ant1234567890abcdefghij and password=hunter2");
        assert!(!masked.contains("sk-ant"));
        assert!(masked.contains("password=[MASKED]"));
        assert_eq!(mask_secrets("added 3 comments"), "added 3 comments");
    }

    #[test]
    fn header_lists_intent_and_hooks() {
        let stats = RunStatistics::started_at(3, at(0));
        let mut intent = TaskIntent::new("add comments\nkeep style");
        intent.file_patterns = vec!["*.rs".into()];
        let hooks = vec![HookDefinition::new("fmt", LifecyclePoint::AfterFile, "cargo fmt")
            .with_condition("errorCount == 0")];
        let text = header_block("01ABC", &stats, &intent, &hooks).render();
        assert!(text.starts_with("-- Batch Started --\n"));
        assert!(text.contains("run: 01ABC\n"));
        assert!(text.contains("totalFiles: 3\n"));
        assert!(text.contains("filePatterns: *.rs\n"));
        assert!(text.contains("  add comments\n  keep style\n"));
        assert!(text.contains("  fmt [afterFile, shell] if errorCount == 0\n"));
    }

    #[test]
    fn task_block_masks_messages() {
        let mut msg = AgentMessage::say("using token=abc123");
        msg.reasoning = Some("Bearer xyz.abc".into());
        msg.files = vec!["a.rs".into()];
        let text = task_completed_block(
            0,
            2,
            Path::new("a.rs"),
            "completed",
            &[msg],
            &["[t] afterFile [lint] lint: completed".into()],
        )
        .render();
        assert!(text.contains("position: 1 of 2\n"));
        assert!(text.contains("result: completed\n"));
        assert!(text.contains("SAY: using token=[MASKED]"));
        assert!(text.contains("  reasoning: Bearer [MASKED]"));
        assert!(text.contains("  files: a.rs"));
        assert!(text.contains("Hooks:\n[t] afterFile [lint] lint: completed\n"));
    }

    #[test]
    fn hook_block_counts() {
        let report = HookRunReport {
            lines: vec!["l1".into(), "l2".into()],
            outcomes: vec![
                ("a".into(), HookStatus::Completed),
                ("b".into(), HookStatus::Skipped),
                ("c".into(), HookStatus::Failed("boom".into())),
            ],
        };
        let text = hook_run_block(LifecyclePoint::BeforeBatch, &report).render();
        assert!(text.starts_with("-- Hooks: beforeBatch --\n"));
        assert!(text.contains("matched: 3\nexecuted: 2\nfailed: 1\n"));
        assert!(text.ends_with("l1\nl2\n"));
    }

    #[test]
    fn open_writes_header_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let stats = RunStatistics::started_at(1, at(100));
        let intent = TaskIntent::new("x");

        let mut log = BatchLog::open(&logs, &[], &stats, &intent).unwrap();
        assert_eq!(log.run_id().len(), 26);
        log.append(&summary_block(&stats, "completed"));

        let content = fs::read_to_string(log.path()).unwrap();
        assert!(content.starts_with("-- Batch Started --"));
        assert!(content.contains("\n\n-- Batch Summary --\nstatus: completed\n"));
    }

    #[test]
    fn same_start_time_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let stats = RunStatistics::started_at(1, at(100));
        let intent = TaskIntent::new("x");
        let a = BatchLog::open(dir.path(), &[], &stats, &intent).unwrap();
        let b = BatchLog::open(dir.path(), &[], &stats, &intent).unwrap();
        assert_ne!(a.path(), b.path());
        assert!(b.path().to_string_lossy().ends_with("-1.log"));
    }

    #[test]
    fn open_fails_when_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("logs");
        fs::write(&blocker, "").unwrap();
        let stats = RunStatistics::new(1);
        let err = BatchLog::open(&blocker, &[], &stats, &TaskIntent::new("x")).unwrap_err();
        assert!(matches!(err, LoggingError::CreateDir { .. }));
    }
}
