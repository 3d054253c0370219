use std::collections::VecDeque;

use statrs::statistics::Statistics;
use tracing::debug;

use crate::analysis::atr::AtrSeries;
use crate::analysis::params::EventParams;
use crate::data::{Bar, BreakoutDirection, StructuralEvent};
use crate::error::{AnalysisError, Result};

/// Detect closes that break out of the trailing high/low envelope.
///
/// At bar `i` the envelope is the max high and min low of the `window` bars
/// before `i`. An up event fires when `close[i] > envelope_high + multiplier *
/// ATR[i]`, a down event mirrors it. After an event the envelope restarts at
/// `i`, so the next evaluation happens `window` bars later (cooldown). Bars
/// with undefined ATR are not evaluated. Runs in a single pass with monotonic
/// deques; the function holds no state between calls.
pub fn detect_breakouts(
    bars: &[Bar],
    atr: &AtrSeries,
    params: &EventParams,
) -> Result<Vec<StructuralEvent>> {
    params.validate()?;
    let window = params.window;
    if bars.len() <= window {
        return Err(AnalysisError::InsufficientData {
            required: window.saturating_add(1),
            actual: bars.len(),
        });
    }

    let mut events = Vec::new();
    let mut anchor = 0usize;
    let mut highs: VecDeque<usize> = VecDeque::with_capacity(window + 1);
    let mut lows: VecDeque<usize> = VecDeque::with_capacity(window + 1);

    for (idx, bar) in bars.iter().enumerate() {
        let start = idx.saturating_sub(window).max(anchor);
        while highs.front().is_some_and(|&front| front < start) {
            highs.pop_front();
        }
        while lows.front().is_some_and(|&front| front < start) {
            lows.pop_front();
        }

        if idx - anchor >= window {
            if let (Some(atr_value), Some(&hi), Some(&lo)) =
                (atr.get(idx), highs.front(), lows.front())
            {
                let upper = bars[hi].high + params.multiplier * atr_value;
                let lower = bars[lo].low - params.multiplier * atr_value;
                let fired = if bar.close > upper {
                    Some((BreakoutDirection::Up, bars[hi].high, bar.close - bars[hi].high))
                } else if bar.close < lower {
                    Some((BreakoutDirection::Down, bars[lo].low, bars[lo].low - bar.close))
                } else {
                    None
                };

                if let Some((direction, reference, magnitude)) = fired {
                    events.push(StructuralEvent {
                        index: idx,
                        timestamp: bar.timestamp,
                        direction,
                        close: bar.close,
                        reference,
                        magnitude,
                    });
                    anchor = idx;
                    highs.clear();
                    lows.clear();
                }
            }
        }

        while highs.back().is_some_and(|&back| bars[back].high <= bar.high) {
            highs.pop_back();
        }
        highs.push_back(idx);
        while lows.back().is_some_and(|&back| bars[back].low >= bar.low) {
            lows.pop_back();
        }
        lows.push_back(idx);
    }

    debug!(
        window,
        multiplier = params.multiplier,
        events = events.len(),
        "envelope breakout scan"
    );
    Ok(events)
}

/// Flag closes whose rolling z-score exceeds `threshold` in magnitude.
///
/// The rolling window covers the `window` closes ending at bar `i` inclusive;
/// z uses the sample standard deviation plus a small epsilon so flat stretches
/// never divide by zero.
pub fn detect_zscore_events(
    bars: &[Bar],
    window: usize,
    threshold: f64,
) -> Result<Vec<StructuralEvent>> {
    const EPSILON: f64 = 1e-6;

    if window < 2 {
        return Err(AnalysisError::invalid("zscore_window", "must be at least 2"));
    }
    if !(threshold.is_finite() && threshold > 0.0) {
        return Err(AnalysisError::invalid(
            "zscore_threshold",
            format!("must be a positive finite number, got {threshold}"),
        ));
    }
    if bars.len() < window {
        return Err(AnalysisError::InsufficientData {
            required: window,
            actual: bars.len(),
        });
    }

    let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
    let mut events = Vec::new();
    for idx in window - 1..closes.len() {
        let slice = &closes[idx + 1 - window..=idx];
        let mean = slice.iter().mean();
        let std_dev = slice.iter().std_dev();
        let z = (closes[idx] - mean) / (std_dev + EPSILON);
        if z.abs() <= threshold {
            continue;
        }
        events.push(StructuralEvent {
            index: idx,
            timestamp: bars[idx].timestamp,
            direction: if z > 0.0 {
                BreakoutDirection::Up
            } else {
                BreakoutDirection::Down
            },
            close: closes[idx],
            reference: mean,
            magnitude: z.abs(),
        });
    }

    debug!(window, threshold, events = events.len(), "z-score scan");
    Ok(events)
}
