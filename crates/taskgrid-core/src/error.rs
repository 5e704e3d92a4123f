//! Simulation error types.

use thiserror::Error;

use crate::{JobId, VmId};

/// Errors that can occur while configuring or running a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid cluster or policy parameters. Fatal before any simulation starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A job is mapped to a VM that does not exist in the cluster.
    #[error("job {job_id} assigned to unknown vm {vm_id}")]
    InvalidAssignment { job_id: JobId, vm_id: VmId },

    /// A job has no entry in the assignment.
    #[error("job {0} has no vm assignment")]
    UnassignedJob(JobId),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Shorthand for a [`SimError::Configuration`].
    pub fn config(msg: impl Into<String>) -> Self {
        SimError::Configuration(msg.into())
    }

    /// Whether this error only invalidates the trial it happened in.
    pub fn is_trial_local(&self) -> bool {
        matches!(
            self,
            SimError::InvalidAssignment { .. } | SimError::UnassignedJob(_)
        )
    }
}

pub type SimResult<T> = Result<T, SimError>;
