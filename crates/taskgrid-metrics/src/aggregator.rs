//! Per-trial metrics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use taskgrid_core::{Cluster, Vm, VmId};
use taskgrid_engine::TrialResult;

/// Constant-draw energy estimate inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyModel {
    pub power_watts: f64,
    pub active_hosts: usize,
}

impl EnergyModel {
    /// Every host holding a VM draws `power_watts` for the whole makespan.
    pub fn for_cluster(cluster: &Cluster, power_watts: f64) -> Self {
        Self {
            power_watts,
            active_hosts: cluster.active_host_count(),
        }
    }
}

/// Scalar performance metrics of one trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    pub job_count: usize,
    pub total_cpu_time: f64,
    pub total_wait_time: f64,
    pub avg_start_time: f64,
    pub avg_exec_time: f64,
    pub avg_finish_time: f64,
    /// Jobs per second of makespan.
    pub throughput: f64,
    pub makespan: f64,
    pub imbalance_degree: f64,
    pub utilization_pct: f64,
    /// Watt-seconds; only present when an energy model was supplied.
    pub total_energy: Option<f64>,
}

impl MetricsRow {
    /// Row for a trial with no jobs.
    pub fn zero(with_energy: bool) -> Self {
        Self {
            total_energy: with_energy.then_some(0.0),
            ..Self::default()
        }
    }

    /// Named scalar fields in report order; energy is listed only when present.
    pub fn fields(&self) -> Vec<(&'static str, f64)> {
        let mut fields = vec![
            ("job_count", self.job_count as f64),
            ("total_cpu_time", self.total_cpu_time),
            ("total_wait_time", self.total_wait_time),
            ("avg_start_time", self.avg_start_time),
            ("avg_exec_time", self.avg_exec_time),
            ("avg_finish_time", self.avg_finish_time),
            ("throughput", self.throughput),
            ("makespan", self.makespan),
            ("imbalance_degree", self.imbalance_degree),
            ("utilization_pct", self.utilization_pct),
        ];
        if let Some(energy) = self.total_energy {
            fields.push(("total_energy", energy));
        }
        fields
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

/// Compute the metrics row of a finished trial.
///
/// Per-VM aggregate processing time is the CPU time of the jobs bound to
/// each VM in `vms`; idle VMs count with zero.
pub fn measure(result: &TrialResult, vms: &[Vm], energy: Option<EnergyModel>) -> MetricsRow {
    if result.is_empty() {
        return MetricsRow::zero(energy.is_some());
    }

    let n = result.len() as f64;
    let mut total_cpu = 0.0;
    let mut total_wait = 0.0;
    let mut sum_start = 0.0;
    let mut sum_exec = 0.0;
    let mut sum_finish = 0.0;
    let mut min_submit = f64::INFINITY;
    let mut max_finish = 0.0_f64;

    let mut per_vm: BTreeMap<VmId, f64> = vms.iter().map(|vm| (vm.id, 0.0)).collect();

    for job in &result.jobs {
        let finish = job.finish_time.unwrap_or(0.0);
        total_cpu += job.cpu_time;
        total_wait += job.wait_time();
        sum_start += job.start_time.unwrap_or(0.0);
        sum_exec += job.exec_time();
        sum_finish += finish;
        min_submit = min_submit.min(job.submission_time);
        max_finish = max_finish.max(finish);
        if let Some(vm) = job.vm {
            *per_vm.entry(vm).or_insert(0.0) += job.cpu_time;
        }
    }

    let mut makespan = max_finish - min_submit;
    if !(makespan > 0.0) {
        makespan = max_finish;
    }

    let imbalance_degree = if per_vm.is_empty() {
        0.0
    } else {
        let max = per_vm.values().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = per_vm.values().copied().fold(f64::INFINITY, f64::min);
        let avg = per_vm.values().sum::<f64>() / per_vm.len() as f64;
        ratio(max - min, avg)
    };

    let utilization_pct = ratio(total_cpu, vms.len() as f64 * makespan) * 100.0;
    let total_energy =
        energy.map(|e| e.active_hosts as f64 * e.power_watts * makespan.max(0.0));

    let row = MetricsRow {
        job_count: result.len(),
        total_cpu_time: total_cpu,
        total_wait_time: total_wait,
        avg_start_time: sum_start / n,
        avg_exec_time: sum_exec / n,
        avg_finish_time: sum_finish / n,
        throughput: ratio(n, makespan),
        makespan,
        imbalance_degree,
        utilization_pct,
        total_energy,
    };
    debug!(
        jobs = row.job_count,
        makespan = row.makespan,
        utilization = row.utilization_pct,
        "trial measured"
    );
    row
}
