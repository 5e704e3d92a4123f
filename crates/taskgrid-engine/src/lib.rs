//! taskgrid-engine — fair-share execution of assigned jobs.
//!
//! Every job is present on its VM from time zero. At any instant a VM's
//! rated MIPS is split equally among its unfinished jobs, so a job speeds
//! up whenever a co-resident job completes. Time advances from one
//! completion event to the next; there are no fixed time slices.
//!
//! ```text
//! FairShareEngine
//!   ├── one lane per VM (jobs sorted by length, shared progress level)
//!   └── min-heap of next completion time per lane
//! ```

pub mod engine;

pub use engine::{FairShareEngine, RateSegment, TrialResult};
