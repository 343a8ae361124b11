//! Report rendering: console summary table, tab-separated file output,
//! JSON export and output-file naming.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

use crate::repeater::RunSummary;
use crate::sample::Sample;
use crate::BenchResult;

// ────────────────────────────────────────────────────────────────────────────────
// Output file
// ────────────────────────────────────────────────────────────────────────────────

/// Append one short-CSV row per sample, each prefixed with the scenario
/// label. Best-effort sequential append; the file has a single writer.
pub fn append_short_csv(path: &Path, scenario: &str, samples: &[Arc<Sample>]) -> BenchResult<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for sample in samples {
        writeln!(file, "{}", sample.to_short_csv_row(scenario))?;
    }
    Ok(())
}

/// Strip characters that are illegal in file names on mainstream hosts and
/// collapse any trailing dots.
pub fn sanitize_file_name(name: &str) -> String {
    const INVALID: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
    let cleaned: String = name
        .chars()
        .filter(|c| !INVALID.contains(c) && !c.is_control())
        .collect();
    cleaned.trim_end_matches('.').to_string()
}

/// Default output name for a scenario: `"{scenario} short {epoch}.csv"`,
/// sanitized. A simple seconds-since-epoch stamp keeps repeated runs apart
/// without pulling in a date crate.
pub fn derive_output_name(scenario: &str) -> PathBuf {
    let epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    PathBuf::from(sanitize_file_name(&format!(
        "{} short {}.csv",
        scenario, epoch
    )))
}

// ────────────────────────────────────────────────────────────────────────────────
// Structured export
// ────────────────────────────────────────────────────────────────────────────────

/// Write the numeric summary as a tab-delimited table with a header row.
pub fn export_summary_csv(summary: &RunSummary, path: &Path) -> BenchResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|e| std::io::Error::other(e))?;

    wtr.write_record([
        "scenario",
        "metric",
        "unit",
        "observations",
        "min",
        "average",
        "max",
        "count",
    ])
    .map_err(|e| std::io::Error::other(e))?;

    for s in &summary.samples {
        let fmt_opt = |v: Option<f64>| v.map(|v| format!("{:.4}", v)).unwrap_or_default();
        wtr.write_record([
            summary.scenario.clone(),
            format!("{}-{}", s.category, s.counter),
            s.unit.clone(),
            s.observations.to_string(),
            fmt_opt(s.min),
            fmt_opt(s.average),
            fmt_opt(s.max),
            s.count.map(|c| c.to_string()).unwrap_or_default(),
        ])
        .map_err(|e| std::io::Error::other(e))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the full run summary as pretty JSON.
pub fn export_summary_json(summary: &RunSummary, path: &Path) -> BenchResult<()> {
    let json = serde_json::to_string_pretty(summary).map_err(|e| std::io::Error::other(e))?;
    std::fs::write(path, json)?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────────
// Console
// ────────────────────────────────────────────────────────────────────────────────

/// Print the end-of-run summary table.
pub fn print_run_summary(summary: &RunSummary) {
    println!(
        "\n{}",
        format!(
            "━━━ {} ({} repetitions, {} rows) ━━━",
            summary.scenario, summary.repeat, summary.expected_rows
        )
        .bold()
        .cyan()
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(vec!["Metric", "Unit", "Samples", "Min", "Average", "Max", "Δ"]);

    for s in &summary.samples {
        let fmt_opt = |v: Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_default();
        table.add_row(vec![
            format!("{}-{}", s.category, s.counter),
            s.unit.clone(),
            s.observations.to_string(),
            fmt_opt(s.min),
            fmt_opt(s.average),
            fmt_opt(s.max),
            s.count.map(|c| c.to_string()).unwrap_or_default(),
        ]);
    }

    println!("{table}");
    println!(
        "  short CSV appended to {}",
        summary.output_file.display().to_string().dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_invalid_characters() {
        assert_eq!(sanitize_file_name("scn: what?"), "scn what");
        assert_eq!(sanitize_file_name("a/b\\c|d"), "abcd");
    }

    #[test]
    fn sanitize_collapses_trailing_dots() {
        assert_eq!(sanitize_file_name("report..."), "report");
        // interior dots survive
        assert_eq!(sanitize_file_name("run short 123.csv"), "run short 123.csv");
    }

    #[test]
    fn derived_name_is_safe_and_csv() {
        let name = derive_output_name("joined: fetch?");
        let name = name.to_string_lossy();
        assert!(name.ends_with(".csv"));
        assert!(!name.contains(':'));
        assert!(!name.contains('?'));
    }

    #[test]
    fn short_csv_appends_scenario_prefixed_lines() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out.csv");
        let samples = vec![
            Arc::new(Sample::new("a", "x")),
            Arc::new(Sample::new("a", "y")),
        ];
        samples[0].add_value(1.0);

        append_short_csv(&path, "scn", &samples).unwrap();
        append_short_csv(&path, "scn", &samples).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
        assert!(content.lines().all(|l| l.starts_with("scn\ta-")));
    }

    #[test]
    fn summary_exports_round_trip() {
        use crate::sample::SampleSummary;

        let tmp = tempfile::TempDir::new().unwrap();
        let summary = RunSummary {
            scenario: "scn".into(),
            repeat: 2,
            expected_rows: 10,
            output_file: tmp.path().join("short.csv"),
            samples: vec![SampleSummary {
                category: "custom".into(),
                counter: "duration".into(),
                unit: "ms".into(),
                observations: 2,
                min: Some(1.0),
                average: Some(1.5),
                max: Some(2.0),
                count: None,
            }],
        };

        let csv_path = tmp.path().join("summary.csv");
        export_summary_csv(&summary, &csv_path).unwrap();
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert!(csv.starts_with("scenario\tmetric\tunit"));
        assert!(csv.contains("custom-duration"));

        let json_path = tmp.path().join("summary.json");
        export_summary_json(&summary, &json_path).unwrap();
        let json = std::fs::read_to_string(&json_path).unwrap();
        assert!(json.contains("\"scenario\": \"scn\""));
        // counter field is omitted for gauges
        assert!(!json.contains("\"count\""));
    }
}
