//! Plain-text console rendering of trial rows and dataset summaries.

use crate::aggregator::MetricsRow;
use crate::stats::DatasetSummary;

/// One line per trial, e.g. `trial 3 | jobs=1000, total_cpu=...`.
pub fn render_trial_line(trial: u32, row: &MetricsRow) -> String {
    let mut out = format!(
        "trial {trial} | jobs={}, total_cpu={:.4}, total_wait={:.4}, avg_start={:.4}, avg_exec={:.4}, avg_finish={:.4}, throughput={:.6}, makespan={:.4}, imbalance={:.6}, util={:.4}%",
        row.job_count,
        row.total_cpu_time,
        row.total_wait_time,
        row.avg_start_time,
        row.avg_exec_time,
        row.avg_finish_time,
        row.throughput,
        row.makespan,
        row.imbalance_degree,
        row.utilization_pct,
    );
    if let Some(energy) = row.total_energy {
        out.push_str(&format!(", energy={energy:.4}"));
    }
    out
}

/// Multi-line `name: mean ± stddev` block for a dataset.
pub fn render_summary(summary: &DatasetSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "dataset {}: mean ± stddev over {} trial(s)\n",
        summary.dataset, summary.trials
    ));
    let width = summary
        .fields()
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0);
    for (name, s) in summary.fields() {
        out.push_str(&format!(
            "  {name:<width$}  {:>16.6} ± {:.6}\n",
            s.mean, s.stddev
        ));
    }
    out
}
