//! Repeated-measurement orchestration.
//!
//! `Repeater::run` drives N repetitions of a timed operation while the
//! background sampler polls the process counters, then reduces every sample
//! to its summary, prints the per-sample console lines and appends the
//! short-CSV rows to the output file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::counters::{CounterHub, DEFAULT_COUNTERS};
use crate::report;
use crate::sample::{fmt_two_decimals, Sample, SampleSummary};
use crate::sampler::{Sampler, SamplerProbe};
use crate::{BenchError, BenchResult};

/// Default polling cadence for the counter sampler.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Serializable record of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub scenario: String,
    pub repeat: usize,
    pub expected_rows: usize,
    pub output_file: PathBuf,
    pub samples: Vec<SampleSummary>,
}

pub struct Repeater {
    hub: Arc<CounterHub>,
    poll_interval: Duration,
}

impl Repeater {
    pub fn new(hub: Arc<CounterHub>) -> Self {
        Self::with_poll_interval(hub, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(hub: Arc<CounterHub>, poll_interval: Duration) -> Self {
        Self { hub, poll_interval }
    }

    /// Run `timed_op` `repeat` times with the counter sampler polling in the
    /// background. Every repetition must return exactly `expected_rows` rows;
    /// a mismatch means the operation silently produced partial or duplicate
    /// data and fails the run immediately.
    ///
    /// The sampler is stopped (cancelled and joined) before the samples are
    /// read, on the error paths as well as on success.
    pub fn run<T, F>(
        &self,
        scenario: &str,
        repeat: usize,
        expected_rows: usize,
        mut timed_op: F,
        output_file: &Path,
    ) -> BenchResult<RunSummary>
    where
        F: FnMut() -> BenchResult<Vec<T>>,
    {
        let counter_samples: Vec<Arc<Sample>> = DEFAULT_COUNTERS
            .iter()
            .map(|spec| {
                Arc::new(Sample::with_unit(
                    spec.category,
                    spec.counter,
                    spec.unit,
                    spec.format,
                ))
            })
            .collect();
        let duration_sample = Arc::new(Sample::with_unit(
            "custom",
            "duration",
            "ms",
            fmt_two_decimals,
        ));

        let probes = counter_samples
            .iter()
            .zip(DEFAULT_COUNTERS)
            .map(|(sample, spec)| {
                let hub = self.hub.clone();
                SamplerProbe {
                    sample: sample.clone(),
                    read: Box::new(move || hub.read(spec.category, spec.counter)),
                }
            })
            .collect();
        let mut sampler = Sampler::start(probes, self.poll_interval)?;

        tracing::info!(scenario, repeat, expected_rows, "starting run");

        for repetition in 1..=repeat {
            let start = Instant::now();
            let rows = match timed_op() {
                Ok(rows) => rows,
                Err(e) => {
                    sampler.stop();
                    return Err(e);
                }
            };
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            duration_sample.add_value(elapsed_ms);

            if rows.len() != expected_rows {
                sampler.stop();
                return Err(BenchError::RowCountMismatch {
                    scenario: scenario.to_string(),
                    repetition,
                    expected: expected_rows,
                    actual: rows.len(),
                });
            }
        }

        sampler.stop();

        // Counter samples first, the synthetic duration sample last.
        let mut samples = counter_samples;
        samples.push(duration_sample);

        for sample in &samples {
            println!("{}", sample.to_human_string());
        }
        report::append_short_csv(output_file, scenario, &samples)?;
        tracing::info!(scenario, output = %output_file.display(), "run complete");

        Ok(RunSummary {
            scenario: scenario.to_string(),
            repeat,
            expected_rows,
            output_file: output_file.to_path_buf(),
            samples: samples.iter().map(|s| s.summary()).collect(),
        })
    }
}
