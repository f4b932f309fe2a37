use anyhow::Result;
use sweep_conductor::hook::condition;
use sweep_conductor::state::stats::RunStatistics;

pub struct Counters {
    pub total: u64,
    pub processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub modified: u64,
    pub errors: u64,
}

fn to_stats(c: &Counters) -> RunStatistics {
    let mut stats = RunStatistics::new(c.total);
    stats.processed_files = c.processed;
    stats.successful_files = c.successful;
    stats.failed_files = c.failed;
    stats.modified_files = c.modified;
    stats.error_count = c.errors;
    stats
}

/// Execute `sweep check "<condition>"`
pub fn execute(cond: &str, counters: Counters) -> Result<()> {
    let stats = to_stats(&counters);
    match condition::try_evaluate(cond, &stats) {
        Ok(value) => println!("{value}"),
        Err(e) => println!("false ({e}; the hook would never fire)"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_map_to_stats() {
        let stats = to_stats(&Counters {
            total: 5,
            processed: 3,
            successful: 2,
            failed: 1,
            modified: 4,
            errors: 1,
        });
        assert!(condition::evaluate(
            "totalFiles >= 5 && failedFiles == 1 && modifiedFiles > 3",
            &stats
        ));
        assert!(!condition::evaluate("errorCount == 0", &stats));
    }
}
