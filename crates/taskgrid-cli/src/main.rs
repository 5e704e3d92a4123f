use std::path::PathBuf;

use clap::{Parser, Subcommand};
use taskgrid_policy::PolicyKind;

mod commands;

#[derive(Parser)]
#[command(
    name = "taskgrid",
    about = "taskgrid — benchmark job-to-VM assignment policies on a simulated cluster",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run repeated trials of one dataset file
    Run {
        /// Dataset file: one job length (MI) per line
        #[arg(short, long)]
        dataset: PathBuf,
        /// Label for reports (default: file stem)
        #[arg(short, long)]
        label: Option<String>,
        /// Assignment policy: rr or pso
        #[arg(short, long, default_value = "pso")]
        policy: PolicyKind,
        #[command(flatten)]
        common: commands::CommonArgs,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Run every dataset of several folders and write per-folder CSVs.
    ///
    /// Each folder produces `<out>/<folder>.csv` with one row per trial and
    /// `<out>/<folder>_summary.csv` with mean/stddev per dataset.
    Batch {
        /// Directory containing the dataset folders
        #[arg(short, long, default_value = "datasets")]
        root: PathBuf,
        /// Comma-separated folder names under the root
        #[arg(
            long,
            value_delimiter = ',',
            default_value = "randomSimple,randomStratified,SDSC"
        )]
        folders: Vec<String>,
        #[arg(short, long, default_value = "pso")]
        policy: PolicyKind,
        #[command(flatten)]
        common: commands::CommonArgs,
    },
    /// Write a taskgrid.toml with the default configuration
    Init {
        #[arg(short, long, default_value = "taskgrid.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("taskgrid=info".parse()?);
    if cli.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Commands::Run {
            dataset,
            label,
            policy,
            common,
            format,
        } => commands::run::run(&dataset, label.as_deref(), policy, &common, &format),
        Commands::Batch {
            root,
            folders,
            policy,
            common,
        } => commands::batch::batch(root, folders, policy, &common),
        Commands::Init { path, force } => commands::init::init(&path, force),
    }
}
