//! taskgrid-metrics — turning finished trials into comparable numbers.
//!
//! # Architecture
//!
//! ```text
//! TrialResult + VMs
//!   └── measure() → MetricsRow (one per trial)
//!
//! [MetricsRow; trials]
//!   └── DatasetSummary::from_rows() → mean / sample stddev per field
//!
//! Text rendering
//!   └── render_trial_line() / render_summary() for the console
//! ```
//!
//! Every ratio guards its denominator and yields 0 instead of failing, so a
//! degenerate trial still produces a complete row.

pub mod aggregator;
pub mod render;
pub mod stats;

pub use aggregator::{EnergyModel, MetricsRow, measure};
pub use render::{render_summary, render_trial_line};
pub use stats::{DatasetSummary, MetricSummary, mean, sample_stddev};
