//! Benchmark harness error types.

use thiserror::Error;

use taskgrid_core::SimError;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error(transparent)]
    Sim(#[from] SimError),

    #[error("report write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BenchResult<T> = Result<T, BenchError>;
