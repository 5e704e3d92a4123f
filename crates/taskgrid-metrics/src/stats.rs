//! Cross-trial statistics.

use serde::Serialize;

use crate::aggregator::MetricsRow;

/// Arithmetic mean; 0 for an empty series.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (N − 1 divisor); 0 for fewer than two samples.
pub fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (sq / (values.len() - 1) as f64).sqrt()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub stddev: f64,
}

impl MetricSummary {
    pub fn of(values: &[f64]) -> Self {
        Self {
            mean: mean(values),
            stddev: sample_stddev(values),
        }
    }
}

/// Mean and standard deviation of each metric across one dataset's trials.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub dataset: String,
    pub trials: usize,
    pub job_count: MetricSummary,
    pub total_cpu_time: MetricSummary,
    pub total_wait_time: MetricSummary,
    pub avg_start_time: MetricSummary,
    pub avg_exec_time: MetricSummary,
    pub avg_finish_time: MetricSummary,
    pub throughput: MetricSummary,
    pub makespan: MetricSummary,
    pub imbalance_degree: MetricSummary,
    pub utilization_pct: MetricSummary,
    /// Present when every row carries an energy estimate.
    pub total_energy: Option<MetricSummary>,
}

impl DatasetSummary {
    pub fn from_rows(dataset: &str, rows: &[MetricsRow]) -> Self {
        let col = |f: fn(&MetricsRow) -> f64| {
            let values: Vec<f64> = rows.iter().map(f).collect();
            MetricSummary::of(&values)
        };

        let energies: Option<Vec<f64>> = rows.iter().map(|r| r.total_energy).collect();
        let total_energy = energies
            .filter(|e| !e.is_empty())
            .map(|e| MetricSummary::of(&e));

        Self {
            dataset: dataset.to_string(),
            trials: rows.len(),
            job_count: col(|r| r.job_count as f64),
            total_cpu_time: col(|r| r.total_cpu_time),
            total_wait_time: col(|r| r.total_wait_time),
            avg_start_time: col(|r| r.avg_start_time),
            avg_exec_time: col(|r| r.avg_exec_time),
            avg_finish_time: col(|r| r.avg_finish_time),
            throughput: col(|r| r.throughput),
            makespan: col(|r| r.makespan),
            imbalance_degree: col(|r| r.imbalance_degree),
            utilization_pct: col(|r| r.utilization_pct),
            total_energy,
        }
    }

    /// Named summaries in report order.
    pub fn fields(&self) -> Vec<(&'static str, MetricSummary)> {
        let mut fields = vec![
            ("job_count", self.job_count),
            ("total_cpu_time", self.total_cpu_time),
            ("total_wait_time", self.total_wait_time),
            ("avg_start_time", self.avg_start_time),
            ("avg_exec_time", self.avg_exec_time),
            ("avg_finish_time", self.avg_finish_time),
            ("throughput", self.throughput),
            ("makespan", self.makespan),
            ("imbalance_degree", self.imbalance_degree),
            ("utilization_pct", self.utilization_pct),
        ];
        if let Some(energy) = self.total_energy {
            fields.push(("total_energy", energy));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_sample_has_zero_stddev() {
        assert_eq!(sample_stddev(&[42.0]), 0.0);
        assert_eq!(sample_stddev(&[]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn identical_values() {
        let values = [3.5; 10];
        assert_eq!(mean(&values), 3.5);
        assert_eq!(sample_stddev(&values), 0.0);
    }

    #[test]
    fn uses_n_minus_one_divisor() {
        // mean 5, squared deviations sum to 32, 32 / 7 for n = 8.
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert!((sample_stddev(&values) - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn summary_over_rows() {
        let rows = vec![
            MetricsRow {
                job_count: 10,
                makespan: 4.0,
                total_energy: Some(100.0),
                ..MetricsRow::default()
            },
            MetricsRow {
                job_count: 10,
                makespan: 6.0,
                total_energy: Some(300.0),
                ..MetricsRow::default()
            },
        ];

        let summary = DatasetSummary::from_rows("d1", &rows);

        assert_eq!(summary.dataset, "d1");
        assert_eq!(summary.trials, 2);
        assert_eq!(summary.job_count, MetricSummary { mean: 10.0, stddev: 0.0 });
        assert_eq!(summary.makespan.mean, 5.0);
        assert!((summary.makespan.stddev - 2.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(summary.total_energy.map(|e| e.mean), Some(200.0));
    }

    #[test]
    fn energy_dropped_when_any_row_lacks_it() {
        let rows = vec![MetricsRow::zero(true), MetricsRow::zero(false)];
        assert_eq!(DatasetSummary::from_rows("d", &rows).total_energy, None);
        assert_eq!(DatasetSummary::from_rows("d", &[]).total_energy, None);
    }

    #[test]
    fn empty_rows_summarize_to_zero() {
        let summary = DatasetSummary::from_rows("empty", &[]);
        assert_eq!(summary.trials, 0);
        assert_eq!(summary.throughput, MetricSummary::default());
        assert_eq!(summary.fields().len(), 10);
    }
}
