use anyhow::Result;
use sweep_conductor::hook::loader::{FileHookSource, HookSource};
use sweep_store::StorePaths;

/// Execute `sweep hooks`
pub fn execute(store: &StorePaths) -> Result<()> {
    let source = FileHookSource::new(store.hooks_json.clone());
    let hooks = source.load();
    if hooks.is_empty() {
        println!("No hooks configured ({}).", source.path().display());
        return Ok(());
    }

    println!("Hooks from {}:", source.path().display());
    for hook in &hooks {
        let condition = if hook.condition.trim().is_empty() {
            "always".to_string()
        } else {
            hook.condition.clone()
        };
        println!(
            "  {:<20} {:<12} {:<6} {:<30} {}",
            hook.name,
            hook.run_at,
            hook.command.kind(),
            condition,
            hook.command
        );
    }
    Ok(())
}
