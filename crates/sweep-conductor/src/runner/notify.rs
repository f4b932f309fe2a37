use std::fmt;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        })
    }
}

/// Notification interface for batch events.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, level: NoticeLevel, message: &str);
}

/// Prints to stdout.
pub struct StdoutNotifier;

#[async_trait::async_trait]
impl Notifier for StdoutNotifier {
    async fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => println!("[sweep] {message}"),
            _ => println!("[sweep] {level}: {message}"),
        }
    }
}

/// Collects notices in memory (for testing).
#[derive(Default)]
pub struct CollectNotifier {
    messages: std::sync::Mutex<Vec<(NoticeLevel, String)>>,
}

impl CollectNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(NoticeLevel, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages().into_iter().map(|(_, m)| m).collect()
    }
}

#[async_trait::async_trait]
impl Notifier for CollectNotifier {
    async fn notify(&self, level: NoticeLevel, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}

/// Receives per-file progress while a batch runs.
#[async_trait::async_trait]
pub trait ProgressReporter: Send + Sync {
    /// `increment` is the share of the batch, in percent, that just finished.
    async fn report(&self, message: &str, increment: f64);
}

/// Prints a running percentage to stderr.
#[derive(Default)]
pub struct StdoutProgress {
    done: std::sync::Mutex<f64>,
}

impl StdoutProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ProgressReporter for StdoutProgress {
    async fn report(&self, message: &str, increment: f64) {
        let done = {
            let mut done = self.done.lock().unwrap_or_else(|e| e.into_inner());
            *done = (*done + increment).min(100.0);
            *done
        };
        eprintln!("[{done:>3.0}%] {message}");
    }
}

/// Collects progress reports in memory (for testing).
#[derive(Default)]
pub struct CollectProgress {
    reports: std::sync::Mutex<Vec<(String, f64)>>,
}

impl CollectProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(String, f64)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ProgressReporter for CollectProgress {
    async fn report(&self, message: &str, increment: f64) {
        self.reports
            .lock()
            .unwrap()
            .push((message.to_string(), increment));
    }
}
