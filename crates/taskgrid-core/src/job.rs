//! Jobs and the per-trial assignment of jobs to VMs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cluster::JobSpec;
use crate::error::{SimError, SimResult};
use crate::{JobId, VmId};

/// A unit of computational work.
///
/// The timing fields start empty and are filled by the execution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Length in millions of instructions.
    pub length: u64,
    pub pes: u32,
    pub file_size: u64,
    pub output_size: u64,
    pub submission_time: f64,
    pub start_time: Option<f64>,
    pub finish_time: Option<f64>,
    /// Processing received so far, in millions of instructions.
    pub processed_mi: f64,
    /// VM capacity consumed, in seconds of the VM's full rate.
    pub cpu_time: f64,
    pub vm: Option<VmId>,
}

impl Job {
    pub fn new(id: JobId, length: u64, spec: &JobSpec) -> Self {
        Self {
            id,
            length,
            pes: spec.pes,
            file_size: spec.file_size,
            output_size: spec.output_size,
            submission_time: 0.0,
            start_time: None,
            finish_time: None,
            processed_mi: 0.0,
            cpu_time: 0.0,
            vm: None,
        }
    }

    /// Build one job per length, ids in sequence order.
    pub fn from_lengths(lengths: &[u64], spec: &JobSpec) -> Vec<Self> {
        lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| Job::new(i as JobId, len, spec))
            .collect()
    }

    /// Time between submission and first share of a VM.
    pub fn wait_time(&self) -> f64 {
        self.start_time
            .map(|start| start - self.submission_time)
            .unwrap_or(0.0)
    }

    /// Wall-clock residence on the VM, finish minus start.
    pub fn exec_time(&self) -> f64 {
        match (self.start_time, self.finish_time) {
            (Some(start), Some(finish)) => finish - start,
            _ => 0.0,
        }
    }
}

/// Mapping job id → VM id, built once per trial by a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    entries: BTreeMap<JobId, VmId>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair each job with the VM at the same position of `vm_ids`.
    pub fn from_pairs(jobs: &[Job], vm_ids: impl IntoIterator<Item = VmId>) -> Self {
        Self {
            entries: jobs.iter().map(|j| j.id).zip(vm_ids).collect(),
        }
    }

    /// Record `job → vm`. Re-binding a job is a configuration error.
    pub fn bind(&mut self, job: JobId, vm: VmId) -> SimResult<()> {
        if let Some(existing) = self.entries.insert(job, vm) {
            self.entries.insert(job, existing);
            return Err(SimError::config(format!(
                "job {job} already bound to vm {existing}"
            )));
        }
        Ok(())
    }

    pub fn vm_for(&self, job: JobId) -> Option<VmId> {
        self.entries.get(&job).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_get_sequential_ids_and_spec_fields() {
        let spec = JobSpec::default();
        let jobs = Job::from_lengths(&[10, 20, 30], &spec);

        assert_eq!(jobs.iter().map(|j| j.id).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(jobs.iter().all(|j| j.pes == 1 && j.file_size == 300));
        assert!(jobs.iter().all(|j| j.finish_time.is_none()));
    }

    #[test]
    fn timing_helpers_default_to_zero() {
        let mut job = Job::new(0, 100, &JobSpec::default());
        assert_eq!(job.wait_time(), 0.0);
        assert_eq!(job.exec_time(), 0.0);

        job.submission_time = 1.0;
        job.start_time = Some(1.5);
        job.finish_time = Some(4.0);
        assert_eq!(job.wait_time(), 0.5);
        assert_eq!(job.exec_time(), 2.5);
    }

    #[test]
    fn bind_rejects_duplicates() {
        let mut a = Assignment::new();
        a.bind(0, 3).unwrap();
        assert!(a.bind(0, 4).is_err());
        assert_eq!(a.vm_for(0), Some(3));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn from_pairs_binds_by_position() {
        let jobs = Job::from_lengths(&[1, 1, 1, 1], &JobSpec::default());
        let a = Assignment::from_pairs(&jobs, [0, 1, 0, 0]);

        assert_eq!(a.vm_for(1), Some(1));
        assert_eq!(a.vm_for(2), Some(0));
        assert_eq!(a.len(), 4);
    }
}
