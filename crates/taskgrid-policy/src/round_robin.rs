//! Round-robin assignment.
//!
//! Binds jobs to VMs in cyclic order using a per-instance counter,
//! ignoring job length and VM capacity.

use tracing::debug;

use taskgrid_core::{Assignment, Job, SimError, SimResult, Vm};

use crate::AssignmentPolicy;

/// Cyclic job → VM binding.
///
/// The counter only ever grows; the VM index is the counter modulo the
/// number of VMs at the time of selection.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self { counter: 0 }
    }

    /// Next VM index for `count` VMs; `count` must be non-zero.
    fn advance(&mut self, count: usize) -> usize {
        let idx = self.counter % count;
        self.counter += 1;
        idx
    }
}

impl AssignmentPolicy for RoundRobin {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn assign(&mut self, jobs: &[Job], vms: &[Vm]) -> SimResult<Assignment> {
        if vms.is_empty() {
            return Err(SimError::config("round-robin needs at least one vm"));
        }

        let mut assignment = Assignment::new();
        for job in jobs {
            let idx = self.advance(vms.len());
            assignment.bind(job.id, vms[idx].id)?;
        }

        debug!(jobs = jobs.len(), vms = vms.len(), cursor = self.counter, "round-robin assignment");
        Ok(assignment)
    }
}
