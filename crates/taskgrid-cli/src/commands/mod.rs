pub mod batch;
pub mod init;
pub mod run;

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use taskgrid_core::SimConfig;
use tracing::debug;

/// Flags shared by `run` and `batch`; each one overrides the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Path to taskgrid.toml (default: built-in configuration)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Trials per dataset
    #[arg(short, long)]
    pub trials: Option<u32>,
    /// Directory for CSV reports
    #[arg(short, long, default_value = "out")]
    pub out: PathBuf,
    /// Run the trials of a dataset on all cores
    #[arg(long)]
    pub parallel: bool,
    /// Keep workload order fixed across trials
    #[arg(long)]
    pub no_shuffle: bool,
}

impl CommonArgs {
    pub fn load_config(&self) -> anyhow::Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SimConfig::default(),
        };
        if let Some(trials) = self.trials {
            config.trials.trials = trials;
        }
        if self.parallel {
            config.trials.parallel = true;
        }
        if self.no_shuffle {
            config.trials.shuffle = false;
        }
        config.validate()?;
        debug!(
            trials = config.trials.trials,
            parallel = config.trials.parallel,
            vms = config.cluster.vm_count(),
            "configuration loaded"
        );
        Ok(config)
    }
}
