//! CSV emission for trial rows and dataset summaries.
//!
//! Both writers emit their header on construction and then accept one
//! [`DatasetReport`] at a time, so a batch can stream every dataset of a
//! folder into the same pair of files.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use taskgrid_metrics::{MetricsRow, MetricSummary};

use crate::error::BenchResult;
use crate::trial::DatasetReport;

const ENERGY: &str = "total_energy";

fn metric_names(with_energy: bool) -> Vec<&'static str> {
    MetricsRow::zero(with_energy)
        .fields()
        .into_iter()
        .map(|(name, _)| name)
        .collect()
}

fn format_value(name: &str, value: f64) -> String {
    if name == "job_count" {
        format!("{value:.0}")
    } else {
        format!("{value:.6}")
    }
}

fn create_file(path: &Path) -> BenchResult<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

/// One row per trial: `dataset, policy, trial, <metrics...>`.
pub struct TrialCsv<W: Write> {
    writer: csv::Writer<W>,
    with_energy: bool,
}

impl TrialCsv<File> {
    /// Create (or truncate) `path`, creating parent directories as needed.
    pub fn create(path: &Path, with_energy: bool) -> BenchResult<Self> {
        Self::new(create_file(path)?, with_energy)
    }
}

impl<W: Write> TrialCsv<W> {
    pub fn new(inner: W, with_energy: bool) -> BenchResult<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        let mut header = vec!["dataset", "policy", "trial"];
        header.extend(metric_names(with_energy));
        writer.write_record(&header)?;
        Ok(Self {
            writer,
            with_energy,
        })
    }

    pub fn append(&mut self, report: &DatasetReport) -> BenchResult<()> {
        for record in &report.trials {
            let mut row = vec![
                report.dataset.clone(),
                report.policy.tag().to_string(),
                record.trial.to_string(),
            ];
            row.extend(
                record
                    .metrics
                    .fields()
                    .into_iter()
                    .filter(|(name, _)| *name != ENERGY)
                    .map(|(name, value)| format_value(name, value)),
            );
            if self.with_energy {
                row.push(format_value(
                    ENERGY,
                    record.metrics.total_energy.unwrap_or(0.0),
                ));
            }
            self.writer.write_record(&row)?;
        }
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> BenchResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}

/// One row per dataset: `dataset, policy, trials, failed, mean_<m>, std_<m>...`.
pub struct SummaryCsv<W: Write> {
    writer: csv::Writer<W>,
    with_energy: bool,
}

impl SummaryCsv<File> {
    pub fn create(path: &Path, with_energy: bool) -> BenchResult<Self> {
        Self::new(create_file(path)?, with_energy)
    }
}

impl<W: Write> SummaryCsv<W> {
    pub fn new(inner: W, with_energy: bool) -> BenchResult<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        let mut header: Vec<String> = ["dataset", "policy", "trials", "failed"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for name in metric_names(with_energy) {
            header.push(format!("mean_{name}"));
            header.push(format!("std_{name}"));
        }
        writer.write_record(&header)?;
        Ok(Self {
            writer,
            with_energy,
        })
    }

    pub fn append(&mut self, report: &DatasetReport) -> BenchResult<()> {
        let summary = &report.summary;
        let mut row = vec![
            report.dataset.clone(),
            report.policy.tag().to_string(),
            summary.trials.to_string(),
            report.failed.len().to_string(),
        ];

        let push = |row: &mut Vec<String>, s: MetricSummary| {
            row.push(format!("{:.6}", s.mean));
            row.push(format!("{:.6}", s.stddev));
        };
        for (name, s) in summary.fields() {
            if name != ENERGY {
                push(&mut row, s);
            }
        }
        if self.with_energy {
            push(&mut row, summary.total_energy.unwrap_or_default());
        }

        self.writer.write_record(&row)?;
        Ok(())
    }

    pub fn finish(self) -> BenchResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}

/// Write a single dataset's trial rows to `path`.
pub fn write_trial_file(path: &Path, report: &DatasetReport) -> BenchResult<()> {
    let mut out = TrialCsv::create(path, report.policy.reports_energy())?;
    out.append(report)?;
    out.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::{FailedTrial, TrialRecord};
    use taskgrid_metrics::DatasetSummary;
    use taskgrid_policy::PolicyKind;

    fn report(policy: PolicyKind) -> DatasetReport {
        let energy = policy.reports_energy();
        let rows = vec![
            MetricsRow {
                job_count: 4,
                makespan: 6.0,
                throughput: 4.0 / 6.0,
                total_energy: energy.then_some(1200.0),
                ..MetricsRow::default()
            },
            MetricsRow {
                job_count: 4,
                makespan: 8.0,
                throughput: 0.5,
                total_energy: energy.then_some(1600.0),
                ..MetricsRow::default()
            },
        ];
        DatasetReport {
            dataset: "RandSimple100".into(),
            policy,
            trials: rows
                .iter()
                .enumerate()
                .map(|(i, m)| TrialRecord {
                    trial: i as u32 + 1,
                    metrics: m.clone(),
                    degenerate: false,
                    events: 2,
                })
                .collect(),
            failed: vec![FailedTrial {
                trial: 3,
                error: "boom".into(),
            }],
            summary: DatasetSummary::from_rows("RandSimple100", &rows),
        }
    }

    fn render_trials(policy: PolicyKind) -> String {
        let mut out = TrialCsv::new(Vec::new(), policy.reports_energy()).unwrap();
        out.append(&report(policy)).unwrap();
        String::from_utf8(out.finish().unwrap()).unwrap()
    }

    #[test]
    fn trial_rows_without_energy() {
        let text = render_trials(PolicyKind::RoundRobin);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("dataset,policy,trial,job_count,total_cpu_time"));
        assert!(!lines[0].contains("total_energy"));
        assert!(lines[1].starts_with("RandSimple100,RR,1,4,"));
        assert!(lines[1].contains("6.000000"));
        assert!(lines[1].contains("0.666667"));
    }

    #[test]
    fn trial_rows_with_energy() {
        let text = render_trials(PolicyKind::ParticleSwarm);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].ends_with(",total_energy"));
        assert!(lines[2].starts_with("RandSimple100,PSO,2,4,"));
        assert!(lines[2].ends_with(",1600.000000"));
        let columns = lines[0].split(',').count();
        assert!(lines.iter().all(|l| l.split(',').count() == columns));
    }

    #[test]
    fn summary_row_has_mean_and_std_pairs() {
        let mut out = SummaryCsv::new(Vec::new(), true).unwrap();
        out.append(&report(PolicyKind::ParticleSwarm)).unwrap();
        let text = String::from_utf8(out.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("dataset,policy,trials,failed,mean_job_count,std_job_count"));
        assert!(lines[0].ends_with("mean_total_energy,std_total_energy"));
        assert!(lines[1].starts_with("RandSimple100,PSO,2,1,4.000000,0.000000"));
        assert!(lines[1].contains("7.000000"));
        assert!(lines[1].contains("1400.000000"));
        assert_eq!(lines[0].split(',').count(), lines[1].split(',').count());
    }

    #[test]
    fn create_makes_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.csv");

        write_trial_file(&path, &report(PolicyKind::RoundRobin)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
