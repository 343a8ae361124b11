//! rowbench — micro-benchmark runner for SQLite data-access strategies.
//!
//! Usage:
//!   rowbench --list
//!   rowbench --scenario join-dedup
//!   rowbench --scenario two-query --rows 10000 --repeat 20
//!   rowbench --scenario per-employee --db bench.sqlite3 --out results.csv
//!   rowbench --scenario join-ordered --export results/

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rowbench::counters::CounterHub;
use rowbench::repeater::Repeater;
use rowbench::store::EmployeeStore;
use rowbench::{report, scenarios, BenchError, BenchResult};

#[derive(Parser, Debug)]
#[command(name = "rowbench")]
#[command(about = "Micro-benchmark harness for SQLite data-access strategies")]
#[command(version)]
struct Cli {
    /// Scenario to run (see --list).
    #[arg(long)]
    scenario: Option<String>,

    /// List available scenarios and exit.
    #[arg(long)]
    list: bool,

    /// Repetitions of the timed operation.
    #[arg(long, default_value = "50")]
    repeat: usize,

    /// Seeded employee count; every repetition must return exactly this
    /// many rows.
    #[arg(long, default_value = "100000")]
    rows: usize,

    /// Addresses per employee in the seeded dataset.
    #[arg(long, default_value = "2")]
    addresses: usize,

    /// Counter polling interval in milliseconds.
    #[arg(long, default_value = "200")]
    interval_ms: u64,

    /// Store path. Defaults to a temporary database seeded for this run.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Output file for appended short-CSV rows. Defaults to a sanitized
    /// "<scenario> short <timestamp>.csv" in the working directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Directory for the structured summary exports (CSV + JSON).
    #[arg(long)]
    export: Option<PathBuf>,

    /// Seed for the deterministic dataset generator.
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,
}

fn main() -> BenchResult<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.list {
        println!("{}", "Available scenarios:".bold());
        for scenario in scenarios::SCENARIOS {
            println!("  {:<14} {}", scenario.name.green(), scenario.description);
        }
        return Ok(());
    }

    let name = cli.scenario.as_deref().ok_or_else(|| {
        BenchError::Config("--scenario is required unless --list is given".into())
    })?;
    let scenario = scenarios::find(name)?;

    println!(
        "\n{}",
        format!(
            "▶ rowbench  scenario: {}  rows: {}  repeat: {}  poll: {}ms",
            scenario.name, cli.rows, cli.repeat, cli.interval_ms
        )
        .bold()
        .blue()
    );

    // A temporary store lives exactly as long as this run.
    let tmp;
    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => {
            tmp = tempfile::TempDir::new()?;
            tmp.path().join("rowbench.sqlite3")
        }
    };

    let mut store = EmployeeStore::open(&db_path)?;
    store.ensure_seeded(cli.rows, cli.addresses, cli.seed)?;

    let out_path = cli
        .out
        .clone()
        .unwrap_or_else(|| report::derive_output_name(scenario.name));

    let hub = Arc::new(CounterHub::new());
    let repeater = Repeater::with_poll_interval(hub, Duration::from_millis(cli.interval_ms));
    let summary = repeater.run(
        scenario.name,
        cli.repeat,
        cli.rows,
        || (scenario.run)(&mut store),
        &out_path,
    )?;

    report::print_run_summary(&summary);

    if let Some(dir) = &cli.export {
        std::fs::create_dir_all(dir)?;
        let base = report::sanitize_file_name(scenario.name);
        let csv_path = dir.join(format!("{}-summary.csv", base));
        let json_path = dir.join(format!("{}-summary.json", base));
        report::export_summary_csv(&summary, &csv_path)?;
        report::export_summary_json(&summary, &json_path)?;
        println!(
            "  summary exported to {} and {}",
            csv_path.display(),
            json_path.display()
        );
    }

    Ok(())
}
