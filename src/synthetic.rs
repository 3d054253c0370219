use chrono::{DateTime, Duration, TimeZone};
use chrono_tz::{Tz, UTC};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::data::Bar;
use crate::error::{AnalysisError, Result};

/// Seeded random-walk bars with one injected level shift.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntheticConfig {
    pub points: usize,
    pub seed: u64,
    pub base_price: f64,
    pub noise_std: f64,
    /// Added to every close from `points / 2` onward.
    pub shift_magnitude: f64,
    pub start: DateTime<Tz>,
    pub interval_minutes: i64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            points: 300,
            seed: 42,
            base_price: 100.0,
            noise_std: 0.5,
            shift_magnitude: 15.0,
            start: UTC.with_ymd_and_hms(2025, 10, 1, 9, 0, 0).unwrap(),
            interval_minutes: 15,
        }
    }
}

impl SyntheticConfig {
    pub fn shift_index(&self) -> usize {
        self.points / 2
    }
}

/// Generate a reproducible bar sequence.
///
/// Closes follow `base + 0.5 * cumsum(N(0, noise_std))`, shifted by
/// `shift_magnitude` from the midpoint. Each bar opens at the previous close
/// and its wicks extend beyond the body by `|N(0, noise_std / 2)|`.
pub fn generate_bars(config: &SyntheticConfig) -> Result<Vec<Bar>> {
    if config.points == 0 {
        return Err(AnalysisError::invalid("points", "must be at least 1"));
    }
    if config.interval_minutes <= 0 {
        return Err(AnalysisError::invalid("interval_minutes", "must be positive"));
    }
    if !(config.noise_std.is_finite() && config.noise_std >= 0.0) {
        return Err(AnalysisError::invalid(
            "noise_std",
            format!("must be a non-negative finite number, got {}", config.noise_std),
        ));
    }
    let step = Normal::new(0.0, config.noise_std)
        .map_err(|err| AnalysisError::invalid("noise_std", err.to_string()))?;
    let wick = Normal::new(0.0, config.noise_std / 2.0)
        .map_err(|err| AnalysisError::invalid("noise_std", err.to_string()))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let shift_at = config.shift_index();
    let mut walk = 0.0;
    let mut prev_close = config.base_price;
    let mut bars = Vec::with_capacity(config.points);

    for idx in 0..config.points {
        walk += step.sample(&mut rng) * 0.5;
        let shift = if idx >= shift_at {
            config.shift_magnitude
        } else {
            0.0
        };
        let close = config.base_price + walk + shift;
        let open = if idx == 0 { close } else { prev_close };
        let high = open.max(close) + wick.sample(&mut rng).abs();
        let low = open.min(close) - wick.sample(&mut rng).abs();
        bars.push(Bar {
            timestamp: config.start + Duration::minutes(config.interval_minutes * idx as i64),
            open,
            high,
            low,
            close,
        });
        prev_close = close;
    }

    Ok(bars)
}
