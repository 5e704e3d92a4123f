//! Discrete particle-swarm search over job → VM vectors.
//!
//! Each particle is a full assignment vector (one VM index per job). Moves
//! are probabilistic per component: keep the current VM, copy the
//! particle's personal best, copy the swarm's global best, or pick a fresh
//! random VM, with an independent small mutation on top.
//!
//! Fitness is an estimated makespan that assumes each VM runs its jobs one
//! after another: `max over VMs of Σ length / mips`. The engine shares VM
//! capacity concurrently instead; the estimate is only used to rank
//! candidates, reported metrics always come from a real engine run.

use rand::Rng;
use serde::Serialize;
use tracing::{debug, trace};

use taskgrid_core::{Assignment, Job, SimError, SimResult, SwarmParams, Vm};

use crate::AssignmentPolicy;

/// Estimated makespan of `positions` under sequential per-VM execution.
pub fn estimate_makespan(lengths: &[u64], vm_mips: &[f64], positions: &[usize]) -> f64 {
    let mut load = vec![0.0; vm_mips.len()];
    for (&len, &vm) in lengths.iter().zip(positions) {
        load[vm] += len as f64 / vm_mips[vm];
    }
    load.into_iter().fold(0.0, f64::max)
}

/// Result of one optimization episode.
#[derive(Debug, Clone, Serialize)]
pub struct SwarmOutcome {
    /// Global-best VM index per job.
    pub positions: Vec<usize>,
    pub best_fitness: f64,
    /// Fitness of each particle's random starting vector.
    pub initial_fitness: Vec<f64>,
    pub iterations: usize,
}

struct Particle {
    position: Vec<usize>,
    best_position: Vec<usize>,
    best_fitness: f64,
}

/// Particle-swarm assignment policy driven by an injected random source.
///
/// Two swarms built with equally seeded sources produce identical
/// trajectories and results.
pub struct ParticleSwarm<R> {
    params: SwarmParams,
    rng: R,
}

impl<R: Rng> ParticleSwarm<R> {
    pub fn new(params: SwarmParams, rng: R) -> SimResult<Self> {
        params.validate()?;
        Ok(Self { params, rng })
    }

    /// Search for the assignment vector with the lowest estimated makespan.
    pub fn optimize(&mut self, lengths: &[u64], vm_mips: &[f64]) -> SimResult<SwarmOutcome> {
        let m = vm_mips.len();
        if m == 0 {
            return Err(SimError::config("particle swarm needs at least one vm"));
        }
        if let Some(bad) = vm_mips.iter().find(|r| !(**r > 0.0)) {
            return Err(SimError::config(format!("vm mips must be positive, got {bad}")));
        }
        let n = lengths.len();
        if n == 0 {
            return Ok(SwarmOutcome {
                positions: Vec::new(),
                best_fitness: 0.0,
                initial_fitness: Vec::new(),
                iterations: 0,
            });
        }

        let SwarmParams {
            particles,
            iterations,
            keep,
            pbest,
            gbest,
            mutation,
        } = self.params.clone();
        let rng = &mut self.rng;

        let mut swarm: Vec<Particle> = (0..particles)
            .map(|_| {
                let position: Vec<usize> = (0..n).map(|_| rng.gen_range(0..m)).collect();
                let fitness = estimate_makespan(lengths, vm_mips, &position);
                Particle {
                    best_position: position.clone(),
                    position,
                    best_fitness: fitness,
                }
            })
            .collect();
        let initial_fitness: Vec<f64> = swarm.iter().map(|p| p.best_fitness).collect();

        // First particle wins ties.
        let mut leader = 0;
        for (i, p) in swarm.iter().enumerate() {
            if p.best_fitness < swarm[leader].best_fitness {
                leader = i;
            }
        }
        let mut global_position = swarm[leader].best_position.clone();
        let mut global_fitness = swarm[leader].best_fitness;

        let keep_cut = keep;
        let pbest_cut = keep + pbest;
        let gbest_cut = keep + pbest + gbest;

        for iteration in 0..iterations {
            for particle in swarm.iter_mut() {
                for i in 0..n {
                    let r: f64 = rng.gen_range(0.0..1.0);
                    if r < keep_cut {
                        // stay
                    } else if r < pbest_cut {
                        particle.position[i] = particle.best_position[i];
                    } else if r < gbest_cut {
                        particle.position[i] = global_position[i];
                    } else {
                        particle.position[i] = rng.gen_range(0..m);
                    }
                    if rng.gen_range(0.0..1.0) < mutation {
                        particle.position[i] = rng.gen_range(0..m);
                    }
                }

                let fitness = estimate_makespan(lengths, vm_mips, &particle.position);
                if fitness < particle.best_fitness {
                    particle.best_fitness = fitness;
                    particle.best_position.clone_from(&particle.position);
                    if fitness < global_fitness {
                        global_fitness = fitness;
                        global_position.clone_from(&particle.position);
                    }
                }
            }
            trace!(iteration, global_fitness, "swarm iteration");
        }

        debug!(
            jobs = n,
            vms = m,
            particles,
            iterations,
            best_fitness = global_fitness,
            "swarm search finished"
        );

        Ok(SwarmOutcome {
            positions: global_position,
            best_fitness: global_fitness,
            initial_fitness,
            iterations,
        })
    }
}

impl<R: Rng + Send> AssignmentPolicy for ParticleSwarm<R> {
    fn name(&self) -> &'static str {
        "particle-swarm"
    }

    fn assign(&mut self, jobs: &[Job], vms: &[Vm]) -> SimResult<Assignment> {
        let lengths: Vec<u64> = jobs.iter().map(|j| j.length).collect();
        let mips: Vec<f64> = vms.iter().map(|vm| vm.mips).collect();

        let outcome = self.optimize(&lengths, &mips)?;

        let mut assignment = Assignment::new();
        for (job, &idx) in jobs.iter().zip(&outcome.positions) {
            assignment.bind(job.id, vms[idx].id)?;
        }
        Ok(assignment)
    }
}
