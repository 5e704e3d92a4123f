use std::path::Path;

use serde_json::json;
use taskgrid_metrics::{render_summary, render_trial_line};
use taskgrid_policy::PolicyKind;

use super::CommonArgs;

pub fn run(
    dataset: &Path,
    label: Option<&str>,
    policy: PolicyKind,
    common: &CommonArgs,
    format: &str,
) -> anyhow::Result<()> {
    let config = common.load_config()?;
    let (report, csv) = taskgrid_bench::run_single(dataset, label, &common.out, policy, &config)?;

    match format {
        "json" => {
            let out = json!({ "report": report, "csv": csv });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        _ => {
            println!("{} on {} ({} trials)", policy, report.dataset, report.trials.len());
            for record in &report.trials {
                println!("{}", render_trial_line(record.trial, &record.metrics));
            }
            for failed in &report.failed {
                println!("trial {} | failed: {}", failed.trial, failed.error);
            }
            println!();
            print!("{}", render_summary(&report.summary));
            println!("✓ Wrote {}", csv.display());
        }
    }

    Ok(())
}
