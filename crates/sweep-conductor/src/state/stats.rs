use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;

/// Live counters for one batch run.
///
/// Owned by the orchestrator for the length of a run; every other component
/// receives `&RunStatistics`. The mutators keep
/// `processed_files == successful_files + failed_files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatistics {
    pub total_files: u64,
    pub processed_files: u64,
    pub successful_files: u64,
    pub failed_files: u64,
    /// Point-in-time external measurement, refreshed at lifecycle boundaries.
    pub modified_files: u64,
    pub error_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
}

/// Names accepted by hook conditions, in declaration order.
pub const FIELD_NAMES: [&str; 6] = [
    "totalFiles",
    "processedFiles",
    "successfulFiles",
    "failedFiles",
    "modifiedFiles",
    "errorCount",
];

impl RunStatistics {
    pub fn new(total_files: u64) -> Self {
        Self::started_at(total_files, OffsetDateTime::now_utc())
    }

    pub fn started_at(total_files: u64, start_time: OffsetDateTime) -> Self {
        Self {
            total_files,
            processed_files: 0,
            successful_files: 0,
            failed_files: 0,
            modified_files: 0,
            error_count: 0,
            start_time,
            end_time: None,
        }
    }

    pub fn record_success(&mut self) {
        self.successful_files += 1;
        self.processed_files += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed_files += 1;
        self.error_count += 1;
        self.processed_files += 1;
    }

    /// Set `end_time` once; later calls keep the first value.
    pub fn finish(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(OffsetDateTime::now_utc());
        }
    }

    /// Look up a counter by its wire name.
    pub fn field(&self, name: &str) -> Option<u64> {
        match name {
            "totalFiles" => Some(self.total_files),
            "processedFiles" => Some(self.processed_files),
            "successfulFiles" => Some(self.successful_files),
            "failedFiles" => Some(self.failed_files),
            "modifiedFiles" => Some(self.modified_files),
            "errorCount" => Some(self.error_count),
            _ => None,
        }
    }

    /// Elapsed time from start to end, or to now while running.
    pub fn duration(&self) -> Duration {
        let end = self.end_time.unwrap_or_else(OffsetDateTime::now_utc);
        let elapsed = end - self.start_time;
        elapsed.try_into().unwrap_or(Duration::ZERO)
    }
}

pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
