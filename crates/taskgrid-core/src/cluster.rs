//! Static cluster topology: datacenters, hosts, and the VMs placed on them.
//!
//! A [`Cluster`] is built once per trial from a [`ClusterSpec`]. VM rates
//! may be perturbed by an injected random source so that repeated trials
//! see slightly different hardware while each stays reproducible.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::{BrokerId, DatacenterId, HostId, VmId};

/// Host hardware shared by every host in the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSpec {
    /// Processing elements per host.
    pub pes: u32,
    /// Rating of each processing element.
    pub pe_mips: f64,
    pub ram_mb: u64,
    pub bandwidth: u64,
    pub storage_mb: u64,
    /// Constant power draw while the host is active, in watts.
    pub power_watts: f64,
    /// Descriptive only; not part of any metric.
    pub cost_per_sec: f64,
}

impl Default for HostSpec {
    fn default() -> Self {
        Self {
            pes: 1,
            pe_mips: 6000.0,
            ram_mb: 6144,
            bandwidth: 10_000,
            storage_mb: 1_000_000,
            power_watts: 200.0,
            cost_per_sec: 3.0,
        }
    }
}

/// VM template; `mips` is the base rate before per-trial variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmSpec {
    pub mips: f64,
    pub pes: u32,
    pub ram_mb: u64,
    pub bandwidth: u64,
    pub storage_mb: u64,
    pub vmm: String,
}

impl Default for VmSpec {
    fn default() -> Self {
        Self {
            mips: 1000.0,
            pes: 1,
            ram_mb: 512,
            bandwidth: 1_000,
            storage_mb: 10_000,
            vmm: "Xen".to_string(),
        }
    }
}

/// Per-job resource needs applied to every job built from a workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSpec {
    pub pes: u32,
    pub file_size: u64,
    pub output_size: u64,
}

impl Default for JobSpec {
    fn default() -> Self {
        Self {
            pes: 1,
            file_size: 300,
            output_size: 300,
        }
    }
}

/// Shape of the simulated cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSpec {
    pub datacenters: u32,
    pub hosts_per_datacenter: u32,
    pub vms_per_host: u32,
    /// Relative spread of VM rates around `vm.mips`, in `[0, 1)`.
    pub mips_variation: f64,
    pub host: HostSpec,
    pub vm: VmSpec,
    pub job: JobSpec,
}

impl Default for ClusterSpec {
    fn default() -> Self {
        Self {
            datacenters: 6,
            hosts_per_datacenter: 3,
            vms_per_host: 3,
            mips_variation: 0.1,
            host: HostSpec::default(),
            vm: VmSpec::default(),
            job: JobSpec::default(),
        }
    }
}

impl ClusterSpec {
    pub fn host_count(&self) -> u32 {
        self.datacenters * self.hosts_per_datacenter
    }

    pub fn vm_count(&self) -> u32 {
        self.host_count() * self.vms_per_host
    }

    /// Reject topologies that cannot host a single VM.
    pub fn validate(&self) -> SimResult<()> {
        if self.datacenters == 0 || self.hosts_per_datacenter == 0 {
            return Err(SimError::config("cluster must contain at least one host"));
        }
        if self.vms_per_host == 0 {
            return Err(SimError::config("cluster must contain at least one vm"));
        }
        if self.host.pes == 0 || !(self.host.pe_mips > 0.0) {
            return Err(SimError::config("host processing capacity must be positive"));
        }
        if self.vm.pes == 0 || !(self.vm.mips > 0.0) {
            return Err(SimError::config("vm mips must be positive"));
        }
        if !(0.0..1.0).contains(&self.mips_variation) {
            return Err(SimError::config(format!(
                "mips_variation must be in [0, 1), got {}",
                self.mips_variation
            )));
        }
        if self.host.power_watts < 0.0 {
            return Err(SimError::config("host power draw cannot be negative"));
        }
        Ok(())
    }
}

/// Time-sharing discipline of a VM. Only fair share is modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchedulingDiscipline {
    #[default]
    FairShare,
}

/// A processing element of a host.
#[derive(Debug, Clone, Serialize)]
pub struct Pe {
    pub id: u32,
    pub mips: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Host {
    pub id: HostId,
    pub datacenter: DatacenterId,
    pub pes: Vec<Pe>,
    pub ram_mb: u64,
    pub bandwidth: u64,
    pub storage_mb: u64,
    pub power_watts: f64,
}

impl Host {
    /// Total processing capacity across all PEs.
    pub fn total_mips(&self) -> f64 {
        self.pes.iter().map(|pe| pe.mips).sum()
    }

    fn max_pe_mips(&self) -> f64 {
        self.pes.iter().map(|pe| pe.mips).fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Datacenter {
    pub id: DatacenterId,
    pub name: String,
    pub hosts: Vec<HostId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Vm {
    pub id: VmId,
    pub broker: BrokerId,
    pub host: HostId,
    /// Rated processing capacity shared by every job running on the VM.
    pub mips: f64,
    pub pes: u32,
    pub ram_mb: u64,
    pub bandwidth: u64,
    pub storage_mb: u64,
    pub vmm: String,
    pub discipline: SchedulingDiscipline,
}

/// Remaining capacity of a host during VM placement.
struct HostUsage {
    mips: f64,
    ram_mb: u64,
    bandwidth: u64,
    storage_mb: u64,
}

/// Datacenters, hosts and placed VMs for one trial.
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    pub datacenters: Vec<Datacenter>,
    pub hosts: Vec<Host>,
    pub vms: Vec<Vm>,
}

impl Cluster {
    /// Build a cluster, drawing each VM's rate from `rng` when the spec
    /// asks for variation.
    pub fn build<R: Rng + ?Sized>(
        spec: &ClusterSpec,
        broker: BrokerId,
        rng: &mut R,
    ) -> SimResult<Self> {
        spec.validate()?;
        let base = spec.vm.mips;
        let spread = spec.mips_variation;
        let rates = (0..spec.vm_count())
            .map(|_| {
                if spread > 0.0 {
                    let factor = 1.0 - spread + rng.gen_range(0.0..1.0) * 2.0 * spread;
                    (base * factor).round().max(1.0)
                } else {
                    base
                }
            })
            .collect();
        Self::assemble(spec, broker, rates)
    }

    /// Build a cluster where every VM runs at the base rate.
    pub fn build_uniform(spec: &ClusterSpec, broker: BrokerId) -> SimResult<Self> {
        spec.validate()?;
        let rates = vec![spec.vm.mips; spec.vm_count() as usize];
        Self::assemble(spec, broker, rates)
    }

    /// One datacenter with one dedicated host per VM, sized to the VM rate.
    pub fn with_vm_rates(rates: &[f64]) -> SimResult<Self> {
        if rates.is_empty() {
            return Err(SimError::config("cluster must contain at least one vm"));
        }
        if let Some(bad) = rates.iter().find(|r| !(**r > 0.0)) {
            return Err(SimError::config(format!("vm mips must be positive, got {bad}")));
        }

        let template = VmSpec::default();
        let host_template = HostSpec::default();
        let mut hosts = Vec::with_capacity(rates.len());
        let mut vms = Vec::with_capacity(rates.len());
        for (i, &mips) in rates.iter().enumerate() {
            let id = i as u32;
            hosts.push(Host {
                id,
                datacenter: 0,
                pes: vec![Pe { id: 0, mips }],
                ram_mb: host_template.ram_mb,
                bandwidth: host_template.bandwidth,
                storage_mb: host_template.storage_mb,
                power_watts: host_template.power_watts,
            });
            vms.push(Vm {
                id,
                broker: 0,
                host: id,
                mips,
                pes: 1,
                ram_mb: template.ram_mb,
                bandwidth: template.bandwidth,
                storage_mb: template.storage_mb,
                vmm: template.vmm.clone(),
                discipline: SchedulingDiscipline::FairShare,
            });
        }

        Ok(Self {
            datacenters: vec![Datacenter {
                id: 0,
                name: "DC_0".to_string(),
                hosts: hosts.iter().map(|h| h.id).collect(),
            }],
            hosts,
            vms,
        })
    }

    fn assemble(spec: &ClusterSpec, broker: BrokerId, rates: Vec<f64>) -> SimResult<Self> {
        let mut datacenters = Vec::with_capacity(spec.datacenters as usize);
        let mut hosts = Vec::with_capacity(spec.host_count() as usize);

        for dc in 0..spec.datacenters {
            let mut members = Vec::with_capacity(spec.hosts_per_datacenter as usize);
            for _ in 0..spec.hosts_per_datacenter {
                let id = hosts.len() as HostId;
                hosts.push(Host {
                    id,
                    datacenter: dc,
                    pes: (0..spec.host.pes)
                        .map(|p| Pe { id: p, mips: spec.host.pe_mips })
                        .collect(),
                    ram_mb: spec.host.ram_mb,
                    bandwidth: spec.host.bandwidth,
                    storage_mb: spec.host.storage_mb,
                    power_watts: spec.host.power_watts,
                });
                members.push(id);
            }
            datacenters.push(Datacenter {
                id: dc,
                name: format!("DC_{dc}"),
                hosts: members,
            });
        }

        let mut usage: Vec<HostUsage> = hosts
            .iter()
            .map(|h| HostUsage {
                mips: h.total_mips(),
                ram_mb: h.ram_mb,
                bandwidth: h.bandwidth,
                storage_mb: h.storage_mb,
            })
            .collect();

        let mut vms = Vec::with_capacity(rates.len());
        for (i, mips) in rates.into_iter().enumerate() {
            let id = i as VmId;
            let demand = mips * f64::from(spec.vm.pes);

            // Most free capacity first, lowest host id on ties.
            let mut chosen: Option<usize> = None;
            for (h, free) in usage.iter().enumerate() {
                let fits = free.mips >= demand
                    && hosts[h].max_pe_mips() >= mips
                    && free.ram_mb >= spec.vm.ram_mb
                    && free.bandwidth >= spec.vm.bandwidth
                    && free.storage_mb >= spec.vm.storage_mb;
                if fits && chosen.is_none_or(|c| free.mips > usage[c].mips) {
                    chosen = Some(h);
                }
            }
            let Some(h) = chosen else {
                return Err(SimError::config(format!(
                    "vm {id} ({mips} mips) does not fit on any host"
                )));
            };

            let free = &mut usage[h];
            free.mips -= demand;
            free.ram_mb -= spec.vm.ram_mb;
            free.bandwidth -= spec.vm.bandwidth;
            free.storage_mb -= spec.vm.storage_mb;

            vms.push(Vm {
                id,
                broker,
                host: hosts[h].id,
                mips,
                pes: spec.vm.pes,
                ram_mb: spec.vm.ram_mb,
                bandwidth: spec.vm.bandwidth,
                storage_mb: spec.vm.storage_mb,
                vmm: spec.vm.vmm.clone(),
                discipline: SchedulingDiscipline::FairShare,
            });
        }

        debug!(
            datacenters = datacenters.len(),
            hosts = hosts.len(),
            vms = vms.len(),
            "cluster assembled"
        );

        Ok(Self {
            datacenters,
            hosts,
            vms,
        })
    }

    /// Hosts that hold at least one VM.
    pub fn active_host_count(&self) -> usize {
        self.hosts
            .iter()
            .filter(|h| self.vms.iter().any(|vm| vm.host == h.id))
            .count()
    }
}
