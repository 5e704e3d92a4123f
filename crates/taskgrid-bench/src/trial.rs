//! Trial orchestration: assign → execute → measure, repeated per dataset.
//!
//! Each trial builds its own cluster, jobs and policy from three random
//! streams seeded from the trial number, so trials share nothing mutable
//! and any single trial can be replayed in isolation.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use taskgrid_core::{BrokerId, Cluster, Job, SimConfig, SimResult};
use taskgrid_engine::FairShareEngine;
use taskgrid_metrics::{DatasetSummary, EnergyModel, MetricsRow, measure};
use taskgrid_policy::{AssignmentPolicy, PolicyKind};

use crate::workload::Workload;

const BROKER_ID: BrokerId = 1;

/// Everything a trial reads; shared read-only across trials.
#[derive(Debug, Clone, Copy)]
pub struct TrialContext<'a> {
    pub workload: &'a Workload,
    pub config: &'a SimConfig,
    pub policy: PolicyKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialRecord {
    /// 1-based trial number.
    pub trial: u32,
    pub metrics: MetricsRow,
    /// Set when the workload had no jobs.
    pub degenerate: bool,
    pub events: usize,
}

/// A trial that aborted without affecting its siblings.
#[derive(Debug, Clone, Serialize)]
pub struct FailedTrial {
    pub trial: u32,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    pub dataset: String,
    pub policy: PolicyKind,
    pub trials: Vec<TrialRecord>,
    pub failed: Vec<FailedTrial>,
    /// Statistics over the successful trials.
    pub summary: DatasetSummary,
}

/// Run trial number `trial` (1-based).
pub fn run_trial(ctx: TrialContext<'_>, trial: u32) -> SimResult<TrialRecord> {
    run_trial_with(ctx, trial, &|t| default_policy(ctx, t))
}

fn default_policy(ctx: TrialContext<'_>, trial: u32) -> SimResult<Box<dyn AssignmentPolicy>> {
    ctx.policy
        .build(&ctx.config.swarm, ctx.config.trials.seeds.policy_seed(trial))
}

fn run_trial_with<F>(ctx: TrialContext<'_>, trial: u32, make_policy: &F) -> SimResult<TrialRecord>
where
    F: Fn(u32) -> SimResult<Box<dyn AssignmentPolicy>>,
{
    let settings = &ctx.config.trials;
    let seeds = settings.seeds;

    let mut lengths = ctx.workload.lengths.clone();
    if settings.shuffle {
        lengths.shuffle(&mut StdRng::seed_from_u64(seeds.shuffle_seed(trial)));
    }

    let spec = &ctx.config.cluster;
    let cluster = if settings.vary_vm_mips {
        Cluster::build(
            spec,
            BROKER_ID,
            &mut StdRng::seed_from_u64(seeds.vm_rate_seed(trial)),
        )?
    } else {
        Cluster::build_uniform(spec, BROKER_ID)?
    };
    let energy = ctx
        .policy
        .reports_energy()
        .then(|| EnergyModel::for_cluster(&cluster, spec.host.power_watts));

    if lengths.is_empty() {
        return Ok(TrialRecord {
            trial,
            metrics: MetricsRow::zero(energy.is_some()),
            degenerate: true,
            events: 0,
        });
    }

    let jobs = Job::from_lengths(&lengths, &spec.job);
    let mut policy = make_policy(trial)?;
    let assignment = policy.assign(&jobs, &cluster.vms)?;

    let result = FairShareEngine::new(&cluster).execute(jobs, &assignment)?;
    let metrics = measure(&result, &cluster.vms, energy);

    debug!(
        dataset = %ctx.workload.label,
        policy = policy.name(),
        trial,
        bound = assignment.len(),
        events = result.events,
        makespan = metrics.makespan,
        "trial complete"
    );

    Ok(TrialRecord {
        trial,
        metrics,
        degenerate: false,
        events: result.events,
    })
}

/// Run every configured trial of one dataset and summarize them.
///
/// Configuration problems abort before the first trial. A trial whose
/// assignment turns out invalid is recorded in `failed` and left out of
/// the summary; the remaining trials still run.
pub fn run_dataset(ctx: TrialContext<'_>) -> SimResult<DatasetReport> {
    run_dataset_with(ctx, |t| default_policy(ctx, t))
}

/// [`run_dataset`] with the per-trial policy supplied by `make_policy`.
pub(crate) fn run_dataset_with<F>(ctx: TrialContext<'_>, make_policy: F) -> SimResult<DatasetReport>
where
    F: Fn(u32) -> SimResult<Box<dyn AssignmentPolicy>> + Sync,
{
    ctx.config.validate()?;

    let label = &ctx.workload.label;
    if ctx.workload.is_empty() {
        warn!(
            dataset = %label,
            skipped = ctx.workload.skipped,
            "empty workload; recording zero-job trials"
        );
    }

    let numbers: Vec<u32> = (1..=ctx.config.trials.trials).collect();
    let outcomes: Vec<(u32, SimResult<TrialRecord>)> = if ctx.config.trials.parallel {
        numbers
            .par_iter()
            .map(|&t| (t, run_trial_with(ctx, t, &make_policy)))
            .collect()
    } else {
        numbers
            .iter()
            .map(|&t| (t, run_trial_with(ctx, t, &make_policy)))
            .collect()
    };

    let mut trials = Vec::with_capacity(outcomes.len());
    let mut failed = Vec::new();
    for (trial, outcome) in outcomes {
        match outcome {
            Ok(record) => trials.push(record),
            Err(e) if e.is_trial_local() => {
                error!(dataset = %label, trial, error = %e, "trial failed");
                failed.push(FailedTrial {
                    trial,
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    let rows: Vec<MetricsRow> = trials.iter().map(|t| t.metrics.clone()).collect();
    let summary = DatasetSummary::from_rows(label, &rows);

    info!(
        dataset = %label,
        policy = %ctx.policy,
        jobs = ctx.workload.len(),
        trials = trials.len(),
        failed = failed.len(),
        makespan_mean = summary.makespan.mean,
        "dataset complete"
    );

    Ok(DatasetReport {
        dataset: label.clone(),
        policy: ctx.policy,
        trials,
        failed,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskgrid_core::{Assignment, ClusterSpec, SimError, SwarmParams, TrialSettings, Vm};

    /// Binds every job to a VM id the cluster does not have.
    struct UnknownVm;

    impl AssignmentPolicy for UnknownVm {
        fn name(&self) -> &'static str {
            "unknown-vm"
        }

        fn assign(&mut self, jobs: &[Job], _vms: &[Vm]) -> SimResult<Assignment> {
            let mut assignment = Assignment::new();
            for job in jobs {
                assignment.bind(job.id, 9_999)?;
            }
            Ok(assignment)
        }
    }

    fn small_config() -> SimConfig {
        SimConfig {
            cluster: ClusterSpec {
                datacenters: 1,
                hosts_per_datacenter: 2,
                vms_per_host: 2,
                ..ClusterSpec::default()
            },
            swarm: SwarmParams {
                particles: 5,
                iterations: 10,
                ..SwarmParams::default()
            },
            trials: TrialSettings {
                trials: 4,
                ..TrialSettings::default()
            },
        }
    }

    fn workload() -> Workload {
        Workload::from_lengths("w", (1..=30).map(|i| i * 1_000).collect())
    }

    #[test]
    fn trial_is_reproducible() {
        let config = small_config();
        let w = workload();
        let ctx = TrialContext {
            workload: &w,
            config: &config,
            policy: PolicyKind::ParticleSwarm,
        };

        let a = run_trial(ctx, 3).unwrap();
        let b = run_trial(ctx, 3).unwrap();
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.metrics.job_count, 30);
        assert!(a.metrics.total_energy.is_some());
    }

    #[test]
    fn trials_differ_by_seed() {
        let config = small_config();
        let w = workload();
        let ctx = TrialContext {
            workload: &w,
            config: &config,
            policy: PolicyKind::RoundRobin,
        };

        let a = run_trial(ctx, 1).unwrap();
        let b = run_trial(ctx, 2).unwrap();
        assert_ne!(a.metrics.makespan, b.metrics.makespan);
        assert_eq!(a.metrics.total_energy, None);
    }

    #[test]
    fn empty_workload_records_degenerate_rows() {
        let config = small_config();
        let w = Workload::from_lengths("empty", Vec::new());
        let ctx = TrialContext {
            workload: &w,
            config: &config,
            policy: PolicyKind::ParticleSwarm,
        };

        let report = run_dataset(ctx).unwrap();
        assert_eq!(report.trials.len(), 4);
        assert!(report.trials.iter().all(|t| t.degenerate && t.metrics.job_count == 0));
        assert_eq!(report.summary.makespan.mean, 0.0);
        assert_eq!(report.summary.total_energy.map(|e| e.mean), Some(0.0));
    }

    #[test]
    fn invalid_config_is_fatal_before_any_trial() {
        let mut config = small_config();
        config.swarm.keep = 0.9;
        let w = workload();
        let ctx = TrialContext {
            workload: &w,
            config: &config,
            policy: PolicyKind::RoundRobin,
        };

        assert!(matches!(run_dataset(ctx), Err(SimError::Configuration(_))));
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut config = small_config();
        let w = workload();

        let sequential = run_dataset(TrialContext {
            workload: &w,
            config: &config,
            policy: PolicyKind::ParticleSwarm,
        })
        .unwrap();

        config.trials.parallel = true;
        let parallel = run_dataset(TrialContext {
            workload: &w,
            config: &config,
            policy: PolicyKind::ParticleSwarm,
        })
        .unwrap();

        let seq: Vec<&MetricsRow> = sequential.trials.iter().map(|t| &t.metrics).collect();
        let par: Vec<&MetricsRow> = parallel.trials.iter().map(|t| &t.metrics).collect();
        assert_eq!(seq, par);
        assert_eq!(sequential.summary, parallel.summary);
    }

    #[test]
    fn fixed_rates_without_shuffle_make_round_robin_trials_identical() {
        let mut config = small_config();
        config.trials.shuffle = false;
        config.trials.vary_vm_mips = false;
        let w = workload();

        let report = run_dataset(TrialContext {
            workload: &w,
            config: &config,
            policy: PolicyKind::RoundRobin,
        })
        .unwrap();

        assert_eq!(report.summary.makespan.stddev, 0.0);
        assert_eq!(report.summary.job_count.mean, 30.0);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn invalid_assignment_fails_only_its_own_trial() {
        let config = small_config();
        let w = workload();
        let ctx = TrialContext {
            workload: &w,
            config: &config,
            policy: PolicyKind::ParticleSwarm,
        };

        let baseline = run_dataset(ctx).unwrap();
        let report = run_dataset_with(ctx, |t| {
            if t == 2 {
                Ok(Box::new(UnknownVm) as Box<dyn AssignmentPolicy>)
            } else {
                default_policy(ctx, t)
            }
        })
        .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].trial, 2);
        assert!(report.failed[0].error.contains("9999"));

        let survivors: Vec<u32> = report.trials.iter().map(|t| t.trial).collect();
        assert_eq!(survivors, vec![1, 3, 4]);
        for record in &report.trials {
            let same = &baseline.trials[record.trial as usize - 1];
            assert_eq!(record.metrics, same.metrics);
        }
        assert_eq!(report.summary.trials, 3);
    }

    #[test]
    fn policy_construction_errors_stay_fatal() {
        let config = small_config();
        let w = workload();
        let ctx = TrialContext {
            workload: &w,
            config: &config,
            policy: PolicyKind::RoundRobin,
        };

        let result = run_dataset_with(ctx, |_| Err(SimError::config("no policy")));
        assert!(matches!(result, Err(SimError::Configuration(_))));
    }
}
