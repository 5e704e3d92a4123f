use std::path::PathBuf;

use taskgrid_bench::{BatchOptions, run_batch};
use taskgrid_metrics::render_summary;
use taskgrid_policy::PolicyKind;

use super::CommonArgs;

pub fn batch(
    root: PathBuf,
    folders: Vec<String>,
    policy: PolicyKind,
    common: &CommonArgs,
) -> anyhow::Result<()> {
    let config = common.load_config()?;
    let opts = BatchOptions {
        root,
        folders,
        out_dir: common.out.clone(),
        policy,
    };

    let reports = run_batch(&opts, &config)?;
    if reports.is_empty() {
        anyhow::bail!("no datasets found under {}", opts.root.display());
    }

    for folder in &reports {
        println!("== {} ({}) ==", folder.folder, policy);
        for dataset in &folder.datasets {
            print!("{}", render_summary(&dataset.summary));
        }
        println!("✓ Wrote {}", folder.trial_csv.display());
        println!("✓ Wrote {}", folder.summary_csv.display());
    }

    Ok(())
}
