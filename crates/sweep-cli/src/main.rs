mod cmd_check;
mod cmd_hooks;
mod cmd_logs;
mod cmd_run;
mod cmd_status;
mod logging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sweep", version, about = "Apply one agent task to many files, in order")]
struct Cli {
    /// Show info-level diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a batch over files and directories
    Run {
        /// Files or directories to process (directories are walked)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Task text applied to every file
        #[arg(long, conflicts_with = "task_file")]
        task: Option<String>,
        /// Task description document (JSON, or YAML by extension)
        #[arg(long)]
        task_file: Option<PathBuf>,
        /// Project root; paths outside it are skipped (default: current dir)
        #[arg(long)]
        project_root: Option<PathBuf>,
        /// Agent program (overrides config)
        #[arg(long)]
        agent_cmd: Option<String>,
        /// Argument passed to the agent before the prompt (repeatable)
        #[arg(long = "agent-arg", allow_hyphen_values = true)]
        agent_args: Vec<String>,
        /// Do not count modified files with git
        #[arg(long)]
        no_git: bool,
        /// Seconds between agent status polls
        #[arg(long)]
        poll_secs: Option<u64>,
        /// Longest wait for one file, in seconds
        #[arg(long)]
        max_wait_secs: Option<u64>,
    },
    /// List configured hooks
    Hooks,
    /// Evaluate a hook condition against given counters
    Check {
        /// Condition, e.g. "processedFiles >= 10 && errorCount == 0"
        condition: String,
        #[arg(long, default_value = "0")]
        total: u64,
        #[arg(long, default_value = "0")]
        processed: u64,
        #[arg(long, default_value = "0")]
        successful: u64,
        #[arg(long, default_value = "0")]
        failed: u64,
        #[arg(long, default_value = "0")]
        modified: u64,
        #[arg(long, default_value = "0")]
        errors: u64,
    },
    /// List recent run logs
    Logs {
        /// Maximum number of logs to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Show the statistics of the last run
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let store = sweep_store::StorePaths::discover();

    match cli.cmd {
        Command::Run {
            paths,
            task,
            task_file,
            project_root,
            agent_cmd,
            agent_args,
            no_git,
            poll_secs,
            max_wait_secs,
        } => cmd_run::execute(cmd_run::RunParams {
            store: &store,
            paths,
            task,
            task_file,
            project_root,
            agent_cmd,
            agent_args,
            no_git,
            poll_secs,
            max_wait_secs,
        }),
        Command::Hooks => cmd_hooks::execute(&store),
        Command::Check {
            condition,
            total,
            processed,
            successful,
            failed,
            modified,
            errors,
        } => cmd_check::execute(
            &condition,
            cmd_check::Counters {
                total,
                processed,
                successful,
                failed,
                modified,
                errors,
            },
        ),
        Command::Logs { limit } => cmd_logs::execute(&store, limit),
        Command::Status { json } => cmd_status::execute(&store, json),
    }
}
