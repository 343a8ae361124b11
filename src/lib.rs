//! Shared types, measurement engine and data-access strategies for rowbench.
//!
//! rowbench times a data-access strategy against a seeded SQLite store over
//! repeated trials while background threads sample process counters on a
//! fixed cadence. Each metric accumulates into a [`Sample`]; at the end of a
//! run the samples are reduced to trimmed summary statistics and written to
//! the console and to a tab-separated output file.
//!
//! The moving parts:
//!
//! - [`CounterHub`]: process-wide cache of named operational counters
//!   (resident set, CPU time, page faults). Missing counters read as 0.0.
//! - [`Sample`]: an append-only series of observations for one metric, with
//!   a display unit and formatter. Gauges report trimmed-average plus raw
//!   min/max; monotonic counters report the delta over the window.
//! - [`Sampler`]: one background thread per monitored counter, polling on a
//!   fixed interval until cancelled. Stopping is synchronous: every thread
//!   is joined before the samples are read for output.
//! - [`Repeater`]: drives N repetitions of a timed operation concurrently
//!   with the sampler, validates each repetition's row count, and emits the
//!   report.

pub mod counters;
pub mod dataset;
pub mod repeater;
pub mod report;
pub mod sample;
pub mod sampler;
pub mod scenarios;
pub mod store;

pub use counters::{CounterHub, CounterSpec, DEFAULT_COUNTERS};
pub use repeater::{Repeater, RunSummary};
pub use sample::{Sample, SampleSummary};
pub use sampler::{Sampler, SamplerProbe};
pub use store::{AddressRecord, EmployeeRecord, EmployeeStore};

// ────────────────────────────────────────────────────────────────────────────────
// Error type
// ────────────────────────────────────────────────────────────────────────────────

pub type BenchResult<T> = std::result::Result<T, BenchError>;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("unknown scenario '{0}' (use --list to see available scenarios)")]
    UnknownScenario(String),

    /// A timed operation silently returned partial or duplicate data, which
    /// invalidates the whole measurement. Fatal to the run, no retry.
    #[error(
        "scenario '{scenario}' repetition {repetition}: expected {expected} rows, got {actual}"
    )]
    RowCountMismatch {
        scenario: String,
        repetition: usize,
        expected: usize,
        actual: usize,
    },
}

impl From<rusqlite::Error> for BenchError {
    fn from(e: rusqlite::Error) -> Self {
        BenchError::Database(e.to_string())
    }
}
