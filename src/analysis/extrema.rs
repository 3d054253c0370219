use crate::data::{Bar, Extremum, ExtremumKind};
use crate::error::{AnalysisError, Result};

/// Detect swing highs and lows with a symmetric window of `radius` bars.
///
/// A bar is a swing high when its high is strictly above every earlier
/// neighbour in the window and not below any later one, so a flat top yields
/// only its first bar. Lows mirror this. Bars closer than `radius` to either end
/// are never candidates. Output is ordered by index; a bar may be both a swing
/// high and a swing low (outside bars).
pub fn detect_extrema(bars: &[Bar], radius: usize) -> Result<Vec<Extremum>> {
    if radius == 0 {
        return Err(AnalysisError::invalid("extremum_radius", "must be at least 1"));
    }
    if bars.len() <= radius.saturating_mul(2) {
        return Ok(Vec::new());
    }

    let mut extrema = Vec::new();
    for idx in radius..bars.len() - radius {
        if dominates(bars, idx, radius, |bar| bar.high, |a, b| a > b) {
            extrema.push(extremum(bars, idx, ExtremumKind::High));
        }
        if dominates(bars, idx, radius, |bar| bar.low, |a, b| a < b) {
            extrema.push(extremum(bars, idx, ExtremumKind::Low));
        }
    }
    Ok(extrema)
}

/// Extrema of one kind, index ordered.
pub fn of_kind(extrema: &[Extremum], kind: ExtremumKind) -> Vec<Extremum> {
    extrema.iter().filter(|e| e.kind == kind).cloned().collect()
}

fn dominates(
    bars: &[Bar],
    idx: usize,
    radius: usize,
    value: impl Fn(&Bar) -> f64,
    beats: impl Fn(f64, f64) -> bool,
) -> bool {
    let current = value(&bars[idx]);
    bars[idx - radius..idx]
        .iter()
        .all(|bar| beats(current, value(bar)))
        && bars[idx + 1..=idx + radius]
            .iter()
            .all(|bar| !beats(value(bar), current))
}

fn extremum(bars: &[Bar], idx: usize, kind: ExtremumKind) -> Extremum {
    let bar = &bars[idx];
    Extremum {
        index: idx,
        timestamp: bar.timestamp,
        price: match kind {
            ExtremumKind::High => bar.high,
            ExtremumKind::Low => bar.low,
        },
        kind,
    }
}
