//! Event-driven max-min fair-share engine.
//!
//! Jobs sharing a VM all receive the same rate, so they finish in order of
//! length and a VM's rate split only changes at its own completions. Each
//! VM is therefore tracked as a lane with one shared progress level (MI
//! delivered to every still-active job), advanced lazily when the lane's
//! next completion is popped from a cluster-wide min-heap.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::Serialize;
use tracing::debug;

use taskgrid_core::{Assignment, Cluster, Job, SimError, SimResult, VmId};

/// Completions closer than this (relative to the current time) form one event.
const SIMULTANEOUS_EPSILON: f64 = 1e-12;

/// Interval during which a VM's share was constant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateSegment {
    pub vm: VmId,
    pub start: f64,
    pub end: f64,
    pub active_jobs: usize,
    pub per_job_mips: f64,
    /// Sum of the rates handed to the active jobs.
    pub delivered_mips: f64,
    pub rated_mips: f64,
}

/// Finished jobs of one trial, in completion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrialResult {
    pub jobs: Vec<Job>,
    /// Completion events processed; simultaneous completions count once.
    pub events: usize,
    /// Populated only when the engine runs with tracing enabled.
    pub trace: Vec<RateSegment>,
}

impl TrialResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Jobs resident on one VM.
struct Lane {
    vm: VmId,
    mips: f64,
    /// Job indices sorted by length, then id.
    order: Vec<usize>,
    /// First unfinished position in `order`.
    next: usize,
    /// MI delivered to each active job so far.
    level: f64,
    since: f64,
}

impl Lane {
    fn active(&self) -> usize {
        self.order.len() - self.next
    }

    fn next_completion(&self, jobs: &[Job]) -> Option<f64> {
        let k = self.active();
        if k == 0 {
            return None;
        }
        let target = jobs[self.order[self.next]].length as f64;
        Some(self.since + (target - self.level) * k as f64 / self.mips)
    }
}

/// Heap entry: the time lane `lane` retires its next job(s).
#[derive(Debug, Clone, Copy)]
struct Completion {
    time: f64,
    lane: usize,
}

impl PartialEq for Completion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Completion {}

impl PartialOrd for Completion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Completion {
    // Reversed so `BinaryHeap` pops the earliest completion first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.lane.cmp(&self.lane))
    }
}

/// Runs assigned jobs on a cluster under fair-share time sharing.
pub struct FairShareEngine<'a> {
    cluster: &'a Cluster,
    trace: bool,
}

impl<'a> FairShareEngine<'a> {
    pub fn new(cluster: &'a Cluster) -> Self {
        Self {
            cluster,
            trace: false,
        }
    }

    /// Record a [`RateSegment`] for every constant-share interval.
    pub fn with_trace(mut self) -> Self {
        self.trace = true;
        self
    }

    /// Execute `jobs` on the VMs chosen by `assignment`.
    ///
    /// An empty job list yields an empty result. A job without an
    /// assignment entry, or bound to a VM outside the cluster, fails the
    /// whole run before any simulated time passes.
    pub fn execute(&self, mut jobs: Vec<Job>, assignment: &Assignment) -> SimResult<TrialResult> {
        if jobs.is_empty() {
            return Ok(TrialResult::empty());
        }

        let lane_of: HashMap<VmId, usize> = self
            .cluster
            .vms
            .iter()
            .enumerate()
            .map(|(i, vm)| (vm.id, i))
            .collect();

        let mut lanes: Vec<Lane> = self
            .cluster
            .vms
            .iter()
            .map(|vm| Lane {
                vm: vm.id,
                mips: vm.mips,
                order: Vec::new(),
                next: 0,
                level: 0.0,
                since: 0.0,
            })
            .collect();

        for (idx, job) in jobs.iter_mut().enumerate() {
            let vm_id = assignment
                .vm_for(job.id)
                .ok_or(SimError::UnassignedJob(job.id))?;
            let lane = *lane_of.get(&vm_id).ok_or(SimError::InvalidAssignment {
                job_id: job.id,
                vm_id,
            })?;
            job.vm = Some(vm_id);
            job.start_time = Some(job.submission_time);
            job.finish_time = None;
            job.processed_mi = 0.0;
            job.cpu_time = 0.0;
            lanes[lane].order.push(idx);
        }

        let mut heap = BinaryHeap::with_capacity(lanes.len());
        for (i, lane) in lanes.iter_mut().enumerate() {
            lane.order.sort_by_key(|&idx| (jobs[idx].length, jobs[idx].id));
            if let Some(time) = lane.next_completion(&jobs) {
                heap.push(Completion { time, lane: i });
            }
        }

        let mut trace = Vec::new();
        let mut events = 0;
        let mut now = 0.0_f64;
        let mut due = Vec::new();

        while let Some(first) = heap.pop() {
            now = now.max(first.time);
            due.clear();
            due.push(first.lane);
            let horizon = now + SIMULTANEOUS_EPSILON * now.abs().max(1.0);
            while heap.peek().is_some_and(|c| c.time <= horizon) {
                if let Some(c) = heap.pop() {
                    due.push(c.lane);
                }
            }
            events += 1;

            for &i in &due {
                let lane = &mut lanes[i];
                let k = lane.active();
                if self.trace && now > lane.since {
                    let per_job = lane.mips / k as f64;
                    trace.push(RateSegment {
                        vm: lane.vm,
                        start: lane.since,
                        end: now,
                        active_jobs: k,
                        per_job_mips: per_job,
                        delivered_mips: per_job * k as f64,
                        rated_mips: lane.mips,
                    });
                }

                // Snap to the finishing length so no rounding leaks into progress.
                lane.level = jobs[lane.order[lane.next]].length as f64;
                lane.since = now;

                while lane.next < lane.order.len()
                    && jobs[lane.order[lane.next]].length as f64 <= lane.level
                {
                    let job = &mut jobs[lane.order[lane.next]];
                    job.finish_time = Some(now);
                    job.processed_mi = job.length as f64;
                    job.cpu_time = job.length as f64 / lane.mips;
                    lane.next += 1;
                }

                if let Some(time) = lane.next_completion(&jobs) {
                    heap.push(Completion { time, lane: i });
                }
            }
        }

        jobs.sort_by(|a, b| {
            let fa = a.finish_time.unwrap_or(f64::INFINITY);
            let fb = b.finish_time.unwrap_or(f64::INFINITY);
            fa.total_cmp(&fb).then_with(|| a.id.cmp(&b.id))
        });

        debug!(jobs = jobs.len(), events, end_time = now, "fair-share run complete");

        Ok(TrialResult {
            jobs,
            events,
            trace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use taskgrid_core::JobSpec;

    fn jobs(lengths: &[u64]) -> Vec<Job> {
        Job::from_lengths(lengths, &JobSpec::default())
    }

    fn finish_of(result: &TrialResult, id: u32) -> f64 {
        result
            .jobs
            .iter()
            .find(|j| j.id == id)
            .and_then(|j| j.finish_time)
            .unwrap()
    }

    #[test]
    fn empty_job_list_is_not_an_error() {
        let cluster = Cluster::with_vm_rates(&[1000.0]).unwrap();
        let result = FairShareEngine::new(&cluster)
            .execute(Vec::new(), &Assignment::new())
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.events, 0);
    }

    #[test]
    fn single_job_runs_at_full_rate() {
        let cluster = Cluster::with_vm_rates(&[500.0]).unwrap();
        let js = jobs(&[2000]);
        let a = Assignment::from_pairs(&js, [0]);

        let result = FairShareEngine::new(&cluster).execute(js, &a).unwrap();

        assert_eq!(finish_of(&result, 0), 4.0);
        assert_eq!(result.jobs[0].start_time, Some(0.0));
        assert_eq!(result.jobs[0].wait_time(), 0.0);
    }

    #[test]
    fn equal_pairs_on_equal_vms_finish_together() {
        let cluster = Cluster::with_vm_rates(&[1000.0, 1000.0]).unwrap();
        let js = jobs(&[3000, 3000, 3000, 3000]);
        let a = Assignment::from_pairs(&js, [0, 0, 1, 1]);

        let result = FairShareEngine::new(&cluster).execute(js, &a).unwrap();

        let solo = 3000.0 / 1000.0;
        for id in 0..4 {
            assert_eq!(finish_of(&result, id), 2.0 * solo);
        }
        // Both VMs complete at the same instant: one event.
        assert_eq!(result.events, 1);
    }

    #[test]
    fn rate_rises_when_co_resident_job_finishes() {
        let cluster = Cluster::with_vm_rates(&[100.0]).unwrap();
        let js = jobs(&[300, 100]);
        let a = Assignment::from_pairs(&js, [0, 0]);

        let result = FairShareEngine::new(&cluster).execute(js, &a).unwrap();

        // 50 MIPS each until t=2, then the long job alone at 100 MIPS.
        assert_eq!(finish_of(&result, 1), 2.0);
        assert_eq!(finish_of(&result, 0), 4.0);
        assert_eq!(result.jobs[0].id, 1, "completion order");
        assert_eq!(result.events, 2);
    }

    #[test]
    fn idle_vm_contributes_nothing() {
        let cluster = Cluster::with_vm_rates(&[100.0, 100.0, 100.0]).unwrap();
        let js = jobs(&[100]);
        let a = Assignment::from_pairs(&js, [2]);

        let result = FairShareEngine::new(&cluster)
            .with_trace()
            .execute(js, &a)
            .unwrap();

        assert_eq!(finish_of(&result, 0), 1.0);
        assert!(result.trace.iter().all(|s| s.vm == 2));
    }

    #[test]
    fn unknown_vm_is_invalid_assignment() {
        let cluster = Cluster::with_vm_rates(&[100.0]).unwrap();
        let js = jobs(&[10, 20]);
        let a = Assignment::from_pairs(&js, [0, 9]);

        let err = FairShareEngine::new(&cluster).execute(js, &a).unwrap_err();
        assert!(matches!(err, SimError::InvalidAssignment { job_id: 1, vm_id: 9 }));
    }

    #[test]
    fn missing_entry_is_unassigned() {
        let cluster = Cluster::with_vm_rates(&[100.0]).unwrap();
        let js = jobs(&[10, 20]);
        let mut a = Assignment::new();
        a.bind(0, 0).unwrap();

        let err = FairShareEngine::new(&cluster).execute(js, &a).unwrap_err();
        assert!(matches!(err, SimError::UnassignedJob(1)));
    }

    #[test]
    fn zero_length_job_finishes_immediately() {
        let cluster = Cluster::with_vm_rates(&[100.0]).unwrap();
        let js = jobs(&[0, 100]);
        let a = Assignment::from_pairs(&js, [0, 0]);

        let result = FairShareEngine::new(&cluster).execute(js, &a).unwrap();
        assert_eq!(finish_of(&result, 0), 0.0);
        assert_eq!(finish_of(&result, 1), 1.0);
    }

    fn random_case(seed: u64) -> (Cluster, Vec<Job>, Assignment) {
        let mut rng = StdRng::seed_from_u64(seed);
        let vm_count = rng.gen_range(1..6);
        let rates: Vec<f64> = (0..vm_count).map(|_| rng.gen_range(50.0..2000.0)).collect();
        let cluster = Cluster::with_vm_rates(&rates).unwrap();
        let lengths: Vec<u64> = (0..rng.gen_range(1..40))
            .map(|_| rng.gen_range(1..50_000))
            .collect();
        let js = jobs(&lengths);
        let vm_ids: Vec<u32> = js.iter().map(|_| rng.gen_range(0..vm_count)).collect();
        let a = Assignment::from_pairs(&js, vm_ids);
        (cluster, js, a)
    }

    #[test]
    fn delivered_rate_never_exceeds_rated_mips() {
        for seed in 0..50 {
            let (cluster, js, a) = random_case(seed);
            let result = FairShareEngine::new(&cluster)
                .with_trace()
                .execute(js, &a)
                .unwrap();

            for seg in &result.trace {
                assert!(
                    seg.delivered_mips <= seg.rated_mips * (1.0 + 1e-12),
                    "vm {} delivered {} over rating {}",
                    seg.vm,
                    seg.delivered_mips,
                    seg.rated_mips
                );
                assert!(seg.end > seg.start);
            }
        }
    }

    #[test]
    fn work_is_conserved_and_nothing_is_lost() {
        for seed in 100..150 {
            let (cluster, js, a) = random_case(seed);
            let count = js.len();
            let mut assigned: HashMap<VmId, f64> = HashMap::new();
            for job in &js {
                *assigned.entry(a.vm_for(job.id).unwrap()).or_default() += job.length as f64;
            }

            let result = FairShareEngine::new(&cluster)
                .with_trace()
                .execute(js, &a)
                .unwrap();

            let mut delivered: HashMap<VmId, f64> = HashMap::new();
            for seg in &result.trace {
                let mi = seg.delivered_mips * (seg.end - seg.start);
                *delivered.entry(seg.vm).or_default() += mi;
            }
            for (vm, work) in &assigned {
                let got = delivered.get(vm).copied().unwrap_or(0.0);
                assert!(
                    (got - work).abs() <= 1e-9 * work.max(1.0),
                    "seed {seed} vm {vm}: delivered {got} MI for {work} MI of work"
                );
            }
            assert_eq!(delivered.len(), assigned.len());
            assert_eq!(result.len(), count);
            let mut ids: Vec<u32> = result.jobs.iter().map(|j| j.id).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), count);
            assert!(result.events <= count);
        }
    }

    #[test]
    fn timing_invariants_hold() {
        for seed in 200..230 {
            let (cluster, js, a) = random_case(seed);
            let result = FairShareEngine::new(&cluster).execute(js, &a).unwrap();

            for job in &result.jobs {
                let start = job.start_time.unwrap();
                let finish = job.finish_time.unwrap();
                assert!(start >= job.submission_time);
                assert!(finish >= start);
                let vm = cluster.vms.iter().find(|v| job.vm == Some(v.id)).unwrap();
                // Sharing can only slow a job down.
                assert!(finish >= job.length as f64 / vm.mips * (1.0 - 1e-12));
            }
        }
    }

    #[test]
    fn vm_busy_time_matches_its_total_work() {
        for seed in 300..330 {
            let (cluster, js, a) = random_case(seed);
            let result = FairShareEngine::new(&cluster).execute(js, &a).unwrap();
            assert_vm_finishes_at_work_over_rate(&cluster, &result);
        }
    }

    #[test]
    fn near_equal_completions_on_different_vms_are_one_event() {
        // vm0 finishes its 3 MI job at 3/10 = 0.3; vm1 reaches the same
        // instant as 0.2 + 0.1, one ulp later.
        let cluster = Cluster::with_vm_rates(&[10.0, 10.0]).unwrap();
        let js = jobs(&[3, 1, 2]);
        let a = Assignment::from_pairs(&js, [0, 1, 1]);

        let result = FairShareEngine::new(&cluster).execute(js, &a).unwrap();

        assert_eq!(result.events, 2);
        let finish = |id: u32| {
            let job = result.jobs.iter().find(|j| j.id == id).unwrap();
            job.finish_time.unwrap()
        };
        assert_eq!(finish(1), 0.2);
        assert_eq!(finish(0), finish(2));
    }

    fn assert_vm_finishes_at_work_over_rate(cluster: &Cluster, result: &TrialResult) {
        for vm in &cluster.vms {
            let on_vm: Vec<&Job> = result.jobs.iter().filter(|j| j.vm == Some(vm.id)).collect();
            let Some(last) = on_vm.iter().filter_map(|j| j.finish_time).reduce(f64::max) else {
                continue;
            };
            let work: f64 = on_vm.iter().map(|j| j.length as f64).sum();
            // The VM never idles while it has work, so it finishes at work / rate.
            assert!((last - work / vm.mips).abs() <= 1e-6 * last.max(1.0));
        }
    }
}
