//! taskgrid-bench — repeated, seeded benchmark trials of assignment policies.
//!
//! Runs the assign → execute → measure pipeline several times per dataset,
//! each trial with its own freshly seeded random streams, and aggregates
//! the per-trial metrics into mean/stddev summaries.
//!
//! # Components
//!
//! - **`workload`** — dataset file parsing and discovery
//! - **`trial`** — single trials and per-dataset repetition
//! - **`batch`** — folder-by-folder runs writing CSV reports
//! - **`report`** — CSV emission for trial rows and summaries

pub mod batch;
pub mod error;
pub mod report;
pub mod trial;
pub mod workload;

pub use batch::{
    BatchOptions, DEFAULT_FOLDERS, FolderReport, run_batch, run_single, single_output_path,
};
pub use error::{BenchError, BenchResult};
pub use report::{SummaryCsv, TrialCsv, write_trial_file};
pub use trial::{DatasetReport, FailedTrial, TrialContext, TrialRecord, run_dataset, run_trial};
pub use workload::{Workload, default_label, folder_tag, list_datasets, sanitize_label};
