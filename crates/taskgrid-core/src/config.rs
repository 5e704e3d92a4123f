//! taskgrid.toml configuration parser.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterSpec;
use crate::error::{SimError, SimResult};

/// Tolerance for the swarm move probabilities summing to one.
const PROBABILITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub cluster: ClusterSpec,
    pub swarm: SwarmParams,
    pub trials: TrialSettings,
}

/// Particle-swarm search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmParams {
    pub particles: usize,
    pub iterations: usize,
    /// Probability of keeping the current VM for a job.
    pub keep: f64,
    /// Probability of adopting the particle's personal-best VM.
    pub pbest: f64,
    /// Probability of adopting the swarm's global-best VM.
    pub gbest: f64,
    /// Independent chance of overriding a move with a random VM.
    pub mutation: f64,
}

impl Default for SwarmParams {
    fn default() -> Self {
        Self {
            particles: 30,
            iterations: 100,
            keep: 0.4,
            pbest: 0.3,
            gbest: 0.3,
            mutation: 0.02,
        }
    }
}

impl SwarmParams {
    pub fn validate(&self) -> SimResult<()> {
        if self.particles == 0 {
            return Err(SimError::config("swarm needs at least one particle"));
        }
        for (name, p) in [
            ("keep", self.keep),
            ("pbest", self.pbest),
            ("gbest", self.gbest),
            ("mutation", self.mutation),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimError::config(format!(
                    "swarm probability {name} must be in [0, 1], got {p}"
                )));
            }
        }
        let total = self.keep + self.pbest + self.gbest;
        if (total - 1.0).abs() > PROBABILITY_EPSILON {
            return Err(SimError::config(format!(
                "keep + pbest + gbest must equal 1, got {total}"
            )));
        }
        Ok(())
    }
}

/// Base seeds for the independent random streams of a trial.
///
/// Trial `t` (1-based) seeds each stream with `base + t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedPlan {
    pub shuffle: u64,
    pub vm_rate: u64,
    pub policy: u64,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            shuffle: 12_345,
            vm_rate: 999,
            policy: 2_025,
        }
    }
}

impl SeedPlan {
    pub fn shuffle_seed(&self, trial: u32) -> u64 {
        self.shuffle.wrapping_add(u64::from(trial))
    }

    pub fn vm_rate_seed(&self, trial: u32) -> u64 {
        self.vm_rate.wrapping_add(u64::from(trial))
    }

    pub fn policy_seed(&self, trial: u32) -> u64 {
        self.policy.wrapping_add(u64::from(trial))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialSettings {
    /// Repetitions per dataset.
    pub trials: u32,
    /// Reshuffle the workload before every trial.
    pub shuffle: bool,
    /// Perturb VM rates per trial by `cluster.mips_variation`.
    pub vary_vm_mips: bool,
    /// Run the trials of a dataset on the rayon pool.
    pub parallel: bool,
    pub seeds: SeedPlan,
}

impl Default for TrialSettings {
    fn default() -> Self {
        Self {
            trials: 10,
            shuffle: true,
            vary_vm_mips: true,
            parallel: false,
            seeds: SeedPlan::default(),
        }
    }
}

impl SimConfig {
    pub fn from_file(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> SimResult<Self> {
        let config: SimConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> SimResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every section; run before any simulation starts.
    pub fn validate(&self) -> SimResult<()> {
        self.cluster.validate()?;
        self.swarm.validate()?;
        if self.trials.trials == 0 {
            return Err(SimError::config("at least one trial per dataset is required"));
        }
        Ok(())
    }
}
