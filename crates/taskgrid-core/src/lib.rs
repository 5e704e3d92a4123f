//! taskgrid-core — shared types for the cluster scheduling simulator.
//!
//! - **`cluster`** — datacenters, hosts, VMs and their placement
//! - **`job`** — jobs and the job → VM assignment
//! - **`config`** — `taskgrid.toml` parsing and validation
//! - **`error`** — the simulation error type

pub mod cluster;
pub mod config;
pub mod error;
pub mod job;

pub use cluster::{
    Cluster, ClusterSpec, Datacenter, Host, HostSpec, JobSpec, Pe, SchedulingDiscipline, Vm,
    VmSpec,
};
pub use config::{SeedPlan, SimConfig, SwarmParams, TrialSettings};
pub use error::{SimError, SimResult};
pub use job::{Assignment, Job};

pub type JobId = u32;
pub type VmId = u32;
pub type HostId = u32;
pub type DatacenterId = u32;
pub type BrokerId = u32;
