use anyhow::Result;
use sweep_conductor::runner::dashboard::read_status;
use sweep_conductor::state::stats::format_elapsed;
use sweep_store::StorePaths;

/// Execute `sweep status`
pub fn execute(store: &StorePaths, json: bool) -> Result<()> {
    if !store.status_json.exists() {
        println!("No runs recorded yet.");
        return Ok(());
    }
    let snapshot = read_status(&store.status_json)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let s = &snapshot.stats;
    println!("Last run: {} ({})", snapshot.status, format_elapsed(s.duration()));
    println!("  files:      {}/{} processed", s.processed_files, s.total_files);
    println!("  succeeded:  {}", s.successful_files);
    println!("  failed:     {}", s.failed_files);
    println!("  modified:   {}", s.modified_files);
    println!("  errors:     {}", s.error_count);
    Ok(())
}
