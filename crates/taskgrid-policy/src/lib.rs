//! taskgrid-policy — job → VM assignment policies.
//!
//! A policy turns the trial's jobs and VMs into an [`Assignment`] before
//! execution starts. The orchestrator builds a fresh policy per trial, so
//! any state a policy keeps (a round-robin cursor, a seeded random source)
//! never leaks across trials.
//!
//! # Components
//!
//! - **`round_robin`** — deterministic cyclic baseline
//! - **`swarm`** — discrete particle-swarm search minimizing estimated makespan

pub mod round_robin;
pub mod swarm;

use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use taskgrid_core::{Assignment, Job, SimResult, SwarmParams, Vm};

pub use round_robin::RoundRobin;
pub use swarm::{ParticleSwarm, SwarmOutcome, estimate_makespan};

/// Capability shared by all assignment policies.
pub trait AssignmentPolicy: Send {
    fn name(&self) -> &'static str;

    /// Bind every job to exactly one of `vms`.
    fn assign(&mut self, jobs: &[Job], vms: &[Vm]) -> SimResult<Assignment>;
}

/// Selects which policy the orchestrator builds for each trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    RoundRobin,
    ParticleSwarm,
}

impl PolicyKind {
    /// Fresh policy instance; `seed` drives any randomness it uses.
    pub fn build(&self, params: &SwarmParams, seed: u64) -> SimResult<Box<dyn AssignmentPolicy>> {
        Ok(match self {
            PolicyKind::RoundRobin => Box::new(RoundRobin::new()),
            PolicyKind::ParticleSwarm => Box::new(ParticleSwarm::new(
                params.clone(),
                StdRng::seed_from_u64(seed),
            )?),
        })
    }

    /// Short tag used in report file names.
    pub fn tag(&self) -> &'static str {
        match self {
            PolicyKind::RoundRobin => "RR",
            PolicyKind::ParticleSwarm => "PSO",
        }
    }

    /// Whether trial rows for this policy carry an energy estimate.
    pub fn reports_energy(&self) -> bool {
        matches!(self, PolicyKind::ParticleSwarm)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::RoundRobin => f.write_str("round-robin"),
            PolicyKind::ParticleSwarm => f.write_str("particle-swarm"),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rr" | "round-robin" | "roundrobin" => Ok(PolicyKind::RoundRobin),
            "pso" | "particle-swarm" | "swarm" => Ok(PolicyKind::ParticleSwarm),
            other => Err(format!("unknown policy '{other}' (expected rr or pso)")),
        }
    }
}
