//! Process-counter lookup with lazy resolution and zero-on-missing reads.
//!
//! Counters are addressed as `(category, counter)` pairs and resolved
//! against the current process exactly once. A counter that does not exist
//! on this host (wrong platform, missing `/proc` field) is cached as a
//! missing sentinel and reads as 0.0 from then on — absence of a counter is
//! not an error. On non-Linux hosts every probe resolves as missing.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::sample::{fmt_megabytes, fmt_whole, ValueFormatter};

/// Linux reports utime/stime in USER_HZ ticks; the value is 100 on every
/// mainstream kernel configuration.
#[cfg(target_os = "linux")]
const MS_PER_CLOCK_TICK: f64 = 1000.0 / 100.0;

/// Static description of one monitored counter: identity, display unit and
/// formatter. Unit `"#"` marks a monotonic counter reported as a windowed
/// delta rather than min/avg/max.
pub struct CounterSpec {
    pub category: &'static str,
    pub counter: &'static str,
    pub unit: &'static str,
    pub format: ValueFormatter,
}

/// The default set of monitored process counters: working set and memory
/// gauges, plus the monotonic CPU-time and fault counters whose deltas
/// approximate the cost of the measured window.
pub const DEFAULT_COUNTERS: &[CounterSpec] = &[
    CounterSpec {
        category: "process",
        counter: "resident-set",
        unit: "MB",
        format: fmt_megabytes,
    },
    CounterSpec {
        category: "process",
        counter: "virtual-memory",
        unit: "MB",
        format: fmt_megabytes,
    },
    CounterSpec {
        category: "process",
        counter: "threads",
        unit: "",
        format: fmt_whole,
    },
    CounterSpec {
        category: "process",
        counter: "cpu-time",
        unit: "#",
        format: fmt_whole,
    },
    CounterSpec {
        category: "process",
        counter: "minor-faults",
        unit: "#",
        format: fmt_whole,
    },
    CounterSpec {
        category: "process",
        counter: "major-faults",
        unit: "#",
        format: fmt_whole,
    },
];

/// How a resolved counter is read. Field indices for `/proc/self/stat`
/// count from the token after the parenthesized comm field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    /// `/proc/self/status` line, e.g. `VmRSS:` in kB, scaled to bytes.
    StatusField { field: &'static str, scale_kb: bool },
    /// Single numeric field of `/proc/self/stat`.
    StatField { index: usize },
    /// utime + stime from `/proc/self/stat`, in milliseconds.
    CpuTimeMs,
}

/// Process-wide counter cache. Construct once, pass by reference to every
/// call site; probes resolved here are reused for the hub's lifetime.
pub struct CounterHub {
    probes: Mutex<HashMap<(String, String), Option<Probe>>>,
}

impl CounterHub {
    pub fn new() -> Self {
        Self {
            probes: Mutex::new(HashMap::new()),
        }
    }

    /// Current value of `(category, counter)`, or 0.0 if the counter is
    /// unsupported on this host or its source momentarily fails to read.
    pub fn read(&self, category: &str, counter: &str) -> f64 {
        let probe = {
            let mut probes = self.probes.lock();
            *probes
                .entry((category.to_string(), counter.to_string()))
                .or_insert_with(|| resolve(category, counter))
        };
        match probe {
            Some(p) => read_probe(p).unwrap_or(0.0),
            None => 0.0,
        }
    }
}

impl Default for CounterHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a counter identity to a concrete probe, verifying it reads on this
/// host. A failed trial read caches the counter as missing.
fn resolve(category: &str, counter: &str) -> Option<Probe> {
    let probe = match (category, counter) {
        ("process", "resident-set") => Probe::StatusField {
            field: "VmRSS:",
            scale_kb: true,
        },
        ("process", "virtual-memory") => Probe::StatusField {
            field: "VmSize:",
            scale_kb: true,
        },
        ("process", "threads") => Probe::StatusField {
            field: "Threads:",
            scale_kb: false,
        },
        ("process", "minor-faults") => Probe::StatField { index: 7 },
        ("process", "major-faults") => Probe::StatField { index: 9 },
        ("process", "cpu-time") => Probe::CpuTimeMs,
        _ => return None,
    };
    read_probe(probe).map(|_| probe)
}

#[cfg(target_os = "linux")]
fn read_probe(probe: Probe) -> Option<f64> {
    match probe {
        Probe::StatusField { field, scale_kb } => {
            let status = std::fs::read_to_string("/proc/self/status").ok()?;
            let value = status
                .lines()
                .find(|l| l.starts_with(field))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|n| n.parse::<f64>().ok())?;
            Some(if scale_kb { value * 1024.0 } else { value })
        }
        Probe::StatField { index } => Some(read_stat_field(index)? as f64),
        Probe::CpuTimeMs => {
            // utime and stime are the 11th and 12th fields after comm.
            let utime = read_stat_field(11)?;
            let stime = read_stat_field(12)?;
            Some((utime + stime) as f64 * MS_PER_CLOCK_TICK)
        }
    }
}

/// Numeric field of `/proc/self/stat`, indexed from the token after the
/// parenthesized comm field (which may itself contain spaces).
#[cfg(target_os = "linux")]
fn read_stat_field(index: usize) -> Option<u64> {
    let stat = std::fs::read_to_string("/proc/self/stat").ok()?;
    let after_comm = stat.rsplit_once(')')?.1;
    after_comm
        .split_whitespace()
        .nth(index)
        .and_then(|n| n.parse::<u64>().ok())
}

#[cfg(not(target_os = "linux"))]
fn read_probe(_probe: Probe) -> Option<f64> {
    None
}
