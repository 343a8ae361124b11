//! Periodic background sampling of counter probes.
//!
//! One named thread per monitored counter, all watching a single
//! cancellation channel. Each cycle blocks on the channel for the polling
//! interval; a timeout means "not cancelled yet" and triggers one read.
//! Exactly one thread ever appends to a given sample, so appends need no
//! coordination beyond the sample's own buffer lock.
//!
//! `stop` is synchronous: it signals cancellation once and joins every
//! thread before returning, so callers can read the samples afterwards
//! without racing a straggling writer.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use crate::sample::Sample;
use crate::BenchResult;

/// One monitored counter: the sample to append to and the read that
/// produces its next observation.
pub struct SamplerProbe {
    pub sample: Arc<Sample>,
    pub read: Box<dyn Fn() -> f64 + Send + 'static>,
}

pub struct Sampler {
    cancel: Option<Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl Sampler {
    /// Spawn one polling thread per probe. Threads take their first reading
    /// after the first full interval elapses.
    pub fn start(probes: Vec<SamplerProbe>, interval: Duration) -> BenchResult<Self> {
        let (cancel, cancelled) = bounded::<()>(0);
        let mut handles = Vec::with_capacity(probes.len());

        for probe in probes {
            let cancelled = cancelled.clone();
            let name = format!("rowbench-{}", probe.sample.counter());
            let handle = thread::Builder::new().name(name).spawn(move || loop {
                match cancelled.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        probe.sample.add_value((probe.read)());
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
            handles.push(handle);
        }

        Ok(Self {
            cancel: Some(cancel),
            handles,
        })
    }

    /// Signal cancellation and block until every sampling thread has
    /// observed it and returned. A probe that panicked killed only its own
    /// thread; that surfaces here as a warning and a short sample.
    pub fn stop(&mut self) {
        // Dropping the sender disconnects the channel, which every thread
        // observes within one polling interval.
        self.cancel.take();
        for handle in self.handles.drain(..) {
            let name = handle
                .thread()
                .name()
                .unwrap_or("rowbench-sampler")
                .to_string();
            if handle.join().is_err() {
                tracing::warn!("sampling thread {} panicked; its sample is incomplete", name);
            }
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn samples_accumulate_until_stop() {
        let sample = Arc::new(Sample::new("test", "ticks"));
        let reads = Arc::new(AtomicUsize::new(0));
        let reads_in_probe = reads.clone();
        let sample_in_probe = sample.clone();

        let probes = vec![SamplerProbe {
            sample: sample_in_probe,
            read: Box::new(move || {
                reads_in_probe.fetch_add(1, Ordering::SeqCst) as f64
            }),
        }];

        let mut sampler = Sampler::start(probes, Duration::from_millis(5)).unwrap();
        thread::sleep(Duration::from_millis(60));
        sampler.stop();

        let observed = sample.len();
        assert!(observed > 0, "expected at least one poll in 60ms");
        assert_eq!(observed, reads.load(Ordering::SeqCst));

        // no writer is left running after stop()
        thread::sleep(Duration::from_millis(20));
        assert_eq!(sample.len(), observed);
    }

    #[test]
    fn stop_before_first_interval_leaves_sample_empty() {
        let sample = Arc::new(Sample::new("test", "ticks"));
        let probes = vec![SamplerProbe {
            sample: sample.clone(),
            read: Box::new(|| 1.0),
        }];

        let mut sampler = Sampler::start(probes, Duration::from_secs(3600)).unwrap();
        sampler.stop();
        assert!(sample.is_empty());
    }

    #[test]
    fn one_cancel_stops_every_thread() {
        let samples: Vec<Arc<Sample>> = (0..4)
            .map(|i| Arc::new(Sample::new("test", &format!("c{}", i))))
            .collect();
        let probes = samples
            .iter()
            .map(|s| SamplerProbe {
                sample: s.clone(),
                read: Box::new(|| 1.0),
            })
            .collect();

        let mut sampler = Sampler::start(probes, Duration::from_millis(5)).unwrap();
        thread::sleep(Duration::from_millis(30));
        sampler.stop();

        let lens: Vec<usize> = samples.iter().map(|s| s.len()).collect();
        thread::sleep(Duration::from_millis(20));
        for (sample, len) in samples.iter().zip(lens) {
            assert_eq!(sample.len(), len);
        }
    }

    #[test]
    fn panicking_probe_kills_only_its_own_thread() {
        let healthy = Arc::new(Sample::new("test", "healthy"));
        let probes = vec![
            SamplerProbe {
                sample: Arc::new(Sample::new("test", "doomed")),
                read: Box::new(|| panic!("probe failure")),
            },
            SamplerProbe {
                sample: healthy.clone(),
                read: Box::new(|| 1.0),
            },
        ];

        let mut sampler = Sampler::start(probes, Duration::from_millis(5)).unwrap();
        thread::sleep(Duration::from_millis(40));
        sampler.stop();

        assert!(!healthy.is_empty());
    }
}
