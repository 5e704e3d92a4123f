//! Folder-by-folder batch runs and single-dataset runs.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use taskgrid_core::SimConfig;
use taskgrid_policy::PolicyKind;

use crate::error::BenchResult;
use crate::report::{SummaryCsv, TrialCsv, write_trial_file};
use crate::trial::{DatasetReport, TrialContext, run_dataset};
use crate::workload::{Workload, folder_tag, list_datasets, sanitize_label};

pub const DEFAULT_FOLDERS: [&str; 3] = ["randomSimple", "randomStratified", "SDSC"];

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Directory holding one sub-folder per dataset family.
    pub root: PathBuf,
    pub folders: Vec<String>,
    pub out_dir: PathBuf,
    pub policy: PolicyKind,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("datasets"),
            folders: DEFAULT_FOLDERS.iter().map(|s| s.to_string()).collect(),
            out_dir: PathBuf::from("out"),
            policy: PolicyKind::ParticleSwarm,
        }
    }
}

/// Everything produced for one dataset folder.
#[derive(Debug, Clone, Serialize)]
pub struct FolderReport {
    pub folder: String,
    pub datasets: Vec<DatasetReport>,
    pub trial_csv: PathBuf,
    pub summary_csv: PathBuf,
}

/// Run every dataset of every configured folder.
///
/// Each folder gets `<out>/<folder>.csv` with one row per trial and
/// `<out>/<folder>_summary.csv` with one row per dataset. Folders with no
/// dataset files and files that cannot be read are logged and skipped.
pub fn run_batch(opts: &BatchOptions, config: &SimConfig) -> BenchResult<Vec<FolderReport>> {
    config.validate()?;
    let with_energy = opts.policy.reports_energy();
    let mut reports = Vec::new();

    for folder in &opts.folders {
        let dir = opts.root.join(folder);
        let files = list_datasets(&dir);
        if files.is_empty() {
            warn!(folder = %folder, dir = %dir.display(), "no datasets found; skipping folder");
            continue;
        }

        let name = sanitize_label(folder);
        let trial_csv = opts.out_dir.join(format!("{name}.csv"));
        let summary_csv = opts.out_dir.join(format!("{name}_summary.csv"));
        let mut trial_out = TrialCsv::create(&trial_csv, with_energy)?;
        let mut summary_out = SummaryCsv::create(&summary_csv, with_energy)?;

        info!(folder = %folder, datasets = files.len(), policy = %opts.policy, "batch folder");

        let mut datasets = Vec::with_capacity(files.len());
        for path in &files {
            let workload = match Workload::from_file(path, None) {
                Ok(w) => w,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "unreadable dataset; skipping");
                    continue;
                }
            };
            let report = run_dataset(TrialContext {
                workload: &workload,
                config,
                policy: opts.policy,
            })?;
            trial_out.append(&report)?;
            summary_out.append(&report)?;
            datasets.push(report);
        }

        trial_out.finish()?;
        summary_out.finish()?;
        info!(
            folder = %folder,
            trials = %trial_csv.display(),
            summary = %summary_csv.display(),
            "batch folder written"
        );

        reports.push(FolderReport {
            folder: folder.clone(),
            datasets,
            trial_csv,
            summary_csv,
        });
    }

    Ok(reports)
}

/// `<out>/<folderTag>_<label>_<POLICY>.csv` for a single dataset run.
pub fn single_output_path(
    out_dir: &Path,
    dataset: &Path,
    label: &str,
    policy: PolicyKind,
) -> PathBuf {
    out_dir.join(format!(
        "{}_{}_{}.csv",
        sanitize_label(&folder_tag(dataset)),
        sanitize_label(label),
        policy.tag()
    ))
}

/// Run one dataset file and write its trial rows.
pub fn run_single(
    path: &Path,
    label: Option<&str>,
    out_dir: &Path,
    policy: PolicyKind,
    config: &SimConfig,
) -> BenchResult<(DatasetReport, PathBuf)> {
    let workload = Workload::from_file(path, label)?;
    let report = run_dataset(TrialContext {
        workload: &workload,
        config,
        policy,
    })?;

    let out = single_output_path(out_dir, path, &workload.label, policy);
    write_trial_file(&out, &report)?;
    info!(dataset = %workload.label, path = %out.display(), "trial rows written");

    Ok((report, out))
}
