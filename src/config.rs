use std::path::PathBuf;

use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};

use structure_recon::analysis::{AnalysisParams, EventParams, SweepGrid};
use structure_recon::synthetic::SyntheticConfig;

/// Command-line configuration for the structure recon tool.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Detect zones, trendlines and breakouts in a CSV bar file.
    Analyze(AnalyzeArgs),
    /// Compare breakout sensitivity settings on synthetic data.
    Sweep(SweepArgs),
}

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    /// Input CSV file path containing OHLC data.
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input_path: PathBuf,

    /// IANA timezone used to interpret naive timestamps.
    #[arg(long, default_value = "UTC")]
    pub timezone: Tz,

    /// Directory for the JSON artifact consumed by the chart renderer.
    #[arg(long, value_name = "DIR")]
    pub json_out: Option<PathBuf>,

    #[command(flatten)]
    pub detection: DetectionArgs,
}

#[derive(Debug, Clone, Args)]
pub struct DetectionArgs {
    /// ATR period for volatility estimation.
    #[arg(long, default_value_t = 14)]
    pub atr_period: usize,

    /// Bars on each side a swing high/low must dominate.
    #[arg(long, default_value_t = 5)]
    pub extremum_radius: usize,

    /// Cluster distance in ATR multiples.
    #[arg(long, default_value_t = 1.0)]
    pub cluster_multiplier: f64,

    /// Minimum extrema per zone.
    #[arg(long, default_value_t = 2)]
    pub min_cluster_strength: usize,

    /// Minimum anchors per trendline.
    #[arg(long, default_value_t = 3)]
    pub min_anchors: usize,

    /// Trendline residual tolerance in ATR multiples.
    #[arg(long, default_value_t = 0.5)]
    pub fit_tolerance: f64,

    /// Most recent extrema per kind considered for trendlines.
    #[arg(long, default_value_t = 12)]
    pub trend_window: usize,

    /// Rolling envelope length for breakout detection.
    #[arg(long, default_value_t = 20)]
    pub breakout_window: usize,

    /// Breakout margin in ATR multiples.
    #[arg(long, default_value_t = 1.0)]
    pub breakout_multiplier: f64,

    /// Zone padding in ATR multiples.
    #[arg(long, default_value_t = 1.0)]
    pub zone_band_multiplier: f64,

    /// Lookahead bars for reaction evaluation.
    #[arg(long, default_value_t = 20)]
    pub reaction_lookahead: usize,

    /// Reaction move threshold in ATR multiples.
    #[arg(long, default_value_t = 0.5)]
    pub reaction_move_atr: f64,
}

impl DetectionArgs {
    pub fn params(&self) -> AnalysisParams {
        AnalysisParams {
            atr_period: self.atr_period,
            extremum_radius: self.extremum_radius,
            cluster_multiplier: self.cluster_multiplier,
            min_cluster_strength: self.min_cluster_strength,
            min_anchors: self.min_anchors,
            fit_tolerance: self.fit_tolerance,
            trend_window: self.trend_window,
            events: EventParams::new(self.breakout_window, self.breakout_multiplier),
            zone_band_multiplier: self.zone_band_multiplier,
            reaction_lookahead: self.reaction_lookahead,
            reaction_move_atr: self.reaction_move_atr,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct SweepArgs {
    /// Number of synthetic 15-minute bars.
    #[arg(long, default_value_t = 300)]
    pub points: usize,

    /// RNG seed for reproducible data.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Standard deviation of the random-walk steps.
    #[arg(long, default_value_t = 0.5)]
    pub noise_std: f64,

    /// Level shift injected at the midpoint.
    #[arg(long, default_value_t = 15.0)]
    pub shift: f64,

    /// ATR period used to scale the breakout margin.
    #[arg(long, default_value_t = 14)]
    pub atr_period: usize,

    /// Breakout windows (R) to sweep.
    #[arg(long, value_delimiter = ',', default_values_t = vec![10, 20, 40])]
    pub windows: Vec<usize>,

    /// Breakout multipliers (k3) to sweep.
    #[arg(long, value_delimiter = ',', default_values_t = vec![0.5, 1.0, 2.0])]
    pub multipliers: Vec<f64>,

    /// Rolling window for the z-score reference detector.
    #[arg(long, default_value_t = 40)]
    pub zscore_window: usize,

    /// Z-score cutoff for the reference detector.
    #[arg(long, default_value_t = 3.0)]
    pub zscore_threshold: f64,

    /// Directory for one JSON artifact per sweep configuration.
    #[arg(long, value_name = "DIR")]
    pub json_out: Option<PathBuf>,
}

impl SweepArgs {
    pub fn synthetic(&self) -> SyntheticConfig {
        SyntheticConfig {
            points: self.points,
            seed: self.seed,
            noise_std: self.noise_std,
            shift_magnitude: self.shift,
            ..Default::default()
        }
    }

    pub fn grid(&self) -> SweepGrid {
        SweepGrid {
            windows: self.windows.clone(),
            multipliers: self.multipliers.clone(),
        }
    }
}
