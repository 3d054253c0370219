mod config;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::{AnalyzeArgs, AppConfig, Command, SweepArgs};
use structure_recon::analysis::{analyze, compute_atr, detect_zscore_events, run_sweep};
use structure_recon::loader::{load_bars_from_csv, validate_series};
use structure_recon::output::{
    analysis_artifact_name, print_events, print_report, print_sweep, sweep_artifact_name,
    write_artifact,
};
use structure_recon::synthetic::generate_bars;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::parse();
    match &config.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Sweep(args) => run_sweep_command(args),
    }
}

fn run_analyze(args: &AnalyzeArgs) -> Result<()> {
    let params = args.detection.params();
    params.validate()?;

    let input_path = &args.input_path;
    if !input_path.exists() {
        bail!("input file {:?} does not exist", input_path);
    }
    let bars = load_bars_from_csv(input_path, args.timezone)
        .with_context(|| format!("failed to load input data from {:?}", input_path))?;
    validate_series(&bars, params.atr_period)?;
    info!(bars = bars.len(), timezone = %args.timezone, "loaded bar series");

    let report = analyze(&bars, &params)?;
    info!(
        zones = report.zones.len(),
        trendlines = report.resistance_lines.len() + report.support_lines.len(),
        events = report.events.len(),
        "analysis finished"
    );
    print_report(&report, &bars);

    if let Some(dir) = &args.json_out {
        let label = input_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("bars");
        let now = Local::now();
        let path = write_artifact(dir, &analysis_artifact_name(label, now), &bars, &report, now)?;
        info!(path = %path.display(), "wrote analysis artifact");
    }

    Ok(())
}

fn run_sweep_command(args: &SweepArgs) -> Result<()> {
    let synthetic = args.synthetic();
    let grid = args.grid();
    grid.validate()?;

    let bars = generate_bars(&synthetic)?;
    info!(
        points = bars.len(),
        seed = synthetic.seed,
        shift_at = synthetic.shift_index(),
        shift = synthetic.shift_magnitude,
        "generated synthetic series"
    );

    let atr = compute_atr(&bars, args.atr_period)?;
    let outcomes = run_sweep(&bars, &atr, &grid)?;
    print_sweep(&outcomes);

    match detect_zscore_events(&bars, args.zscore_window, args.zscore_threshold) {
        Ok(events) => {
            println!(
                "Z-score reference (window {}, |z| > {:.2}):",
                args.zscore_window, args.zscore_threshold
            );
            print_events(&events);
        }
        Err(err) => warn!(error = %err, "skipping z-score reference detector"),
    }

    if let Some(dir) = &args.json_out {
        let now = Local::now();
        for outcome in &outcomes {
            let name = sweep_artifact_name(&outcome.params, now);
            let path = write_artifact(dir, &name, &bars, outcome, now)?;
            info!(path = %path.display(), events = outcome.event_count, "wrote sweep artifact");
        }
    }

    Ok(())
}
