pub mod atr;
pub mod clustering;
pub mod events;
pub mod extrema;
pub mod levels;
pub mod params;
pub mod pipeline;
pub mod stats;
pub mod sweep;
pub mod trendlines;

pub use atr::{compute_atr, AtrSeries};
pub use clustering::cluster_extrema;
pub use events::{detect_breakouts, detect_zscore_events};
pub use extrema::detect_extrema;
pub use levels::build_zones;
pub use params::{AnalysisParams, EventParams};
pub use pipeline::{analyze, AnalysisReport};
pub use stats::evaluate_zones;
pub use sweep::{run_sweep, SweepGrid, SweepOutcome};
pub use trendlines::fit_trendlines;
