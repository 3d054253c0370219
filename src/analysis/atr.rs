use serde::Serialize;

use crate::data::Bar;
use crate::error::{AnalysisError, Result};

/// ATR values aligned to the bar sequence; `None` before the lookback fills.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtrSeries {
    period: usize,
    values: Vec<Option<f64>>,
}

impl AtrSeries {
    pub fn period(&self) -> usize {
        self.period
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Mean over the defined values, or zero if none are defined.
    pub fn mean(&self) -> f64 {
        let defined: Vec<f64> = self.values.iter().flatten().copied().collect();
        if defined.is_empty() {
            0.0
        } else {
            defined.iter().sum::<f64>() / defined.len() as f64
        }
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }
}

pub fn true_range(bars: &[Bar], idx: usize) -> f64 {
    let bar = &bars[idx];
    let high_low = bar.high - bar.low;
    let tr = if idx == 0 {
        high_low
    } else {
        let prev_close = bars[idx - 1].close;
        let high_close = (bar.high - prev_close).abs();
        let low_close = (bar.low - prev_close).abs();
        high_low.max(high_close).max(low_close)
    };
    tr.max(0.0)
}

/// Compute a Wilder-smoothed Average True Range series.
///
/// ATR[period - 1] is the simple mean of the first `period` true ranges; later
/// values follow `(prev * (period - 1) + tr) / period`.
pub fn compute_atr(bars: &[Bar], period: usize) -> Result<AtrSeries> {
    if period == 0 {
        return Err(AnalysisError::invalid("atr_period", "must be at least 1"));
    }
    if bars.len() < period {
        return Err(AnalysisError::InsufficientData {
            required: period,
            actual: bars.len(),
        });
    }

    let true_ranges: Vec<f64> = (0..bars.len()).map(|idx| true_range(bars, idx)).collect();

    let mut values = vec![None; bars.len()];
    let initial = true_ranges[..period].iter().sum::<f64>() / period as f64;
    values[period - 1] = Some(initial);

    let mut prev_atr = initial;
    for idx in period..true_ranges.len() {
        prev_atr = (prev_atr * (period as f64 - 1.0) + true_ranges[idx]) / period as f64;
        values[idx] = Some(prev_atr);
    }

    Ok(AtrSeries { period, values })
}
