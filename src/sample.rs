//! Accumulating series of observations for one named metric.
//!
//! A `Sample` is written by exactly one producer (the repeat loop for the
//! duration metric, one sampler thread per counter metric) and read only
//! after the sampler has been stopped. Values are append-only; aggregation
//! always works on a copy so the recorded series keeps its temporal order.

use parking_lot::Mutex;
use serde::Serialize;

const EMPTY: &str = "Empty";

/// Pure value-to-text formatter applied to aggregates before display.
pub type ValueFormatter = fn(f64) -> String;

/// Two decimal places. The default formatter.
pub fn fmt_two_decimals(v: f64) -> String {
    format!("{:.2}", v)
}

/// Whole number, no decimals.
pub fn fmt_whole(v: f64) -> String {
    format!("{:.0}", v)
}

/// Bytes rendered as megabytes with two decimals.
pub fn fmt_megabytes(v: f64) -> String {
    format!("{:.2}", v / (1024.0 * 1024.0))
}

pub struct Sample {
    category: String,
    counter: String,
    unit: String,
    format: ValueFormatter,
    values: Mutex<Vec<f64>>,
}

impl Sample {
    /// A unitless sample with the default two-decimal formatter.
    pub fn new(category: &str, counter: &str) -> Self {
        Self::with_unit(category, counter, "", fmt_two_decimals)
    }

    /// A sample with a display unit. Unit `"#"` flags a monotonic counter:
    /// it reports the delta over the sampling window instead of min/avg/max.
    pub fn with_unit(category: &str, counter: &str, unit: &str, format: ValueFormatter) -> Self {
        Self {
            category: category.to_string(),
            counter: counter.to_string(),
            unit: unit.to_string(),
            format,
            values: Mutex::new(Vec::new()),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn counter(&self) -> &str {
        &self.counter
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The `category-counter` label used in every output form.
    pub fn label(&self) -> String {
        format!("{}-{}", self.category, self.counter)
    }

    pub fn is_counter(&self) -> bool {
        self.unit == "#"
    }

    pub fn add_value(&self, v: f64) {
        self.values.lock().push(v);
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    /// Snapshot of the recorded series in insertion (temporal) order.
    pub fn values(&self) -> Vec<f64> {
        self.values.lock().clone()
    }

    /// Sorted copy with `floor(n * 0.1)` values dropped from each end.
    /// The recorded series itself is never reordered.
    pub fn trim(&self) -> Vec<f64> {
        let mut sorted = self.values.lock().clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let trim_by = (sorted.len() as f64 * 0.1).floor() as usize;
        let keep = sorted.len().saturating_sub(trim_by * 2);
        sorted.into_iter().skip(trim_by).take(keep).collect()
    }

    /// Net increase of a monotonic counter over the window: `last - first`.
    pub fn count(&self) -> i64 {
        let values = self.values.lock();
        match (values.first(), values.last()) {
            (Some(first), Some(last)) => (last - first) as i64,
            _ => 0,
        }
    }

    /// Minimum over the full untrimmed series. `None` when empty.
    pub fn raw_min(&self) -> Option<f64> {
        self.values
            .lock()
            .iter()
            .copied()
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
    }

    /// Maximum over the full untrimmed series. `None` when empty.
    pub fn raw_max(&self) -> Option<f64> {
        self.values
            .lock()
            .iter()
            .copied()
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }

    /// Mean over the trimmed series. Outlier trimming protects only the
    /// average; min/max intentionally keep the extremes.
    pub fn trimmed_average(&self) -> Option<f64> {
        let trimmed = self.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.iter().sum::<f64>() / trimmed.len() as f64)
        }
    }

    fn render(&self, aggregate: Option<f64>, format: impl Fn(f64) -> String) -> String {
        aggregate.map_or_else(|| EMPTY.to_string(), format)
    }

    /// Formatter with the unit suffix appended, for human-readable output.
    fn format_with_unit(&self, v: f64) -> String {
        if self.unit.is_empty() {
            (self.format)(v)
        } else {
            format!("{} {}", (self.format)(v), self.unit)
        }
    }

    /// One console line:
    /// `category-counter min: .. average: .. max: ..` for gauges,
    /// `category-counter #: count` for counter-flagged samples.
    pub fn to_human_string(&self) -> String {
        if self.is_counter() {
            return format!("{} #: {}", self.label(), self.count());
        }
        format!(
            "{} min: {} average: {} max: {}",
            self.label(),
            self.render(self.raw_min(), |v| self.format_with_unit(v)),
            self.render(self.trimmed_average(), |v| self.format_with_unit(v)),
            self.render(self.raw_max(), |v| self.format_with_unit(v)),
        )
    }

    /// One tab-separated row for the appended output file, prefixed with the
    /// scenario label for later spreadsheet pivoting. Gauges fill the three
    /// stat fields and leave the count field empty; counters do the reverse.
    pub fn to_short_csv_row(&self, scenario: &str) -> String {
        if self.is_counter() {
            return format!("{}\t{}\t\t\t\t{}", scenario, self.label(), self.count());
        }
        format!(
            "{}\t{}\t{}\t{}\t{}\t",
            scenario,
            self.label(),
            self.render(self.raw_min(), self.format),
            self.render(self.trimmed_average(), self.format),
            self.render(self.raw_max(), self.format),
        )
    }

    /// Every raw observation tab-separated, for offline analysis.
    pub fn to_csv_row(&self) -> String {
        let values = self.values.lock();
        let rendered: Vec<String> = values.iter().map(|v| (self.format)(*v)).collect();
        format!(
            "{}\t{}\t{}",
            self.category,
            self.counter,
            rendered.join("\t")
        )
    }

    /// Numeric reduction for structured export.
    pub fn summary(&self) -> SampleSummary {
        if self.is_counter() {
            SampleSummary {
                category: self.category.clone(),
                counter: self.counter.clone(),
                unit: self.unit.clone(),
                observations: self.len(),
                min: None,
                average: None,
                max: None,
                count: Some(self.count()),
            }
        } else {
            SampleSummary {
                category: self.category.clone(),
                counter: self.counter.clone(),
                unit: self.unit.clone(),
                observations: self.len(),
                min: self.raw_min(),
                average: self.trimmed_average(),
                max: self.raw_max(),
                count: None,
            }
        }
    }
}

/// Serializable reduction of one sample.
#[derive(Debug, Clone, Serialize)]
pub struct SampleSummary {
    pub category: String,
    pub counter: String,
    pub unit: String,
    pub observations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_with(values: &[f64]) -> Sample {
        let s = Sample::new("test", "metric");
        for &v in values {
            s.add_value(v);
        }
        s
    }

    #[test]
    fn trim_drops_ten_percent_each_end() {
        let s = sample_with(&[
            100.0, 1.0, 9.0, 2.0, 8.0, 3.0, 7.0, 4.0, 6.0, 5.0, // n = 10, trim 1 each end
        ]);
        let trimmed = s.trim();
        assert_eq!(trimmed.len(), 8);
        assert_eq!(trimmed.first(), Some(&2.0));
        assert_eq!(trimmed.last(), Some(&9.0));
        // remainder is sorted ascending
        let mut sorted = trimmed.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(trimmed, sorted);
    }

    #[test]
    fn trim_keeps_everything_below_ten_values() {
        let s = sample_with(&[3.0, 1.0, 2.0]);
        assert_eq!(s.trim(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn trim_does_not_reorder_recorded_series() {
        let s = sample_with(&[5.0, 1.0, 3.0]);
        let _ = s.trim();
        assert_eq!(s.values(), vec![5.0, 1.0, 3.0]);
    }

    #[test]
    fn empty_sample_renders_empty() {
        let s = Sample::new("test", "metric");
        assert_eq!(
            s.to_human_string(),
            "test-metric min: Empty average: Empty max: Empty"
        );
        assert_eq!(s.count(), 0);
    }

    #[test]
    fn count_is_last_minus_first() {
        let s = sample_with(&[100.0, 140.0, 180.0]);
        assert_eq!(s.count(), 80);
    }

    #[test]
    fn min_max_use_raw_set_average_uses_trimmed() {
        // 10 ones plus two outliers; trim drops one value per end.
        let mut values = vec![1.0; 10];
        values.push(0.0);
        values.push(100.0);
        let s = sample_with(&values);

        assert_eq!(s.raw_min(), Some(0.0));
        assert_eq!(s.raw_max(), Some(100.0));
        // trimmed set is the ten 1.0 values
        let avg = s.trimmed_average().unwrap();
        assert!((avg - 1.0).abs() < 1e-9);
    }

    #[test]
    fn counter_sample_renders_only_count() {
        let s = Sample::with_unit("process", "minor-faults", "#", fmt_whole);
        s.add_value(100.0);
        s.add_value(180.0);
        assert_eq!(s.to_human_string(), "process-minor-faults #: 80");
        assert_eq!(
            s.to_short_csv_row("scn"),
            "scn\tprocess-minor-faults\t\t\t\t80"
        );
        assert!(!s.to_human_string().contains("min:"));
    }

    #[test]
    fn gauge_sample_never_renders_bare_count() {
        let s = Sample::with_unit("process", "resident-set", "MB", fmt_megabytes);
        s.add_value(1024.0 * 1024.0);
        let human = s.to_human_string();
        assert!(human.contains("min: 1.00 MB"));
        assert!(!human.contains("#:"));
    }

    #[test]
    fn short_csv_field_order_is_stable() {
        let s = sample_with(&[2.0, 4.0]);
        assert_eq!(s.to_short_csv_row("scn"), "scn\ttest-metric\t2.00\t3.00\t4.00\t");
    }

    #[test]
    fn unit_suffix_only_in_human_output() {
        let s = Sample::with_unit("process", "resident-set", "MB", fmt_megabytes);
        s.add_value(2.0 * 1024.0 * 1024.0);
        assert!(s.to_human_string().contains("2.00 MB"));
        assert!(!s.to_short_csv_row("scn").contains("MB"));
    }

    #[test]
    fn csv_row_lists_raw_values() {
        let s = sample_with(&[1.0, 2.5]);
        assert_eq!(s.to_csv_row(), "test\tmetric\t1.00\t2.50");
    }

    #[test]
    fn summary_splits_gauge_and_counter_fields() {
        let gauge = sample_with(&[1.0, 2.0]);
        let summary = gauge.summary();
        assert_eq!(summary.min, Some(1.0));
        assert_eq!(summary.count, None);

        let counter = Sample::with_unit("c", "n", "#", fmt_whole);
        counter.add_value(5.0);
        counter.add_value(9.0);
        let summary = counter.summary();
        assert_eq!(summary.count, Some(4));
        assert_eq!(summary.min, None);
    }
}
