use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::debug;

use crate::analysis::atr::AtrSeries;
use crate::analysis::clustering::PRICE_EPSILON;
use crate::data::{Extremum, ExtremumKind, LevelType, Trendline};

#[derive(Debug, Clone)]
struct Anchor {
    extremum: Extremum,
    atr: f64,
}

impl Anchor {
    fn x(&self) -> f64 {
        self.extremum.index as f64
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    anchors: Vec<Anchor>,
    slope: f64,
    intercept: f64,
    sse: f64,
}

impl Candidate {
    fn indices(&self) -> BTreeSet<usize> {
        self.anchors.iter().map(|a| a.extremum.index).collect()
    }

    fn first_index(&self) -> usize {
        self.anchors.first().map(|a| a.extremum.index).unwrap_or(0)
    }
}

/// Fit sloped support (lows) or resistance (highs) through same-kind extrema.
///
/// Candidates are contiguous runs of at least `min_anchors` extrema taken from
/// the `trend_window` most recent ones with a defined ATR. Each run gets an
/// ordinary least squares fit of price on bar index, one pass dropping anchors
/// whose residual exceeds `tolerance * ATR[anchor]`, and a refit on the
/// survivors, which must all sit inside their tolerance.
///
/// Competing fits are ranked by anchor count, then by sum of squared residuals.
/// No two returned lines share `min_anchors - 1` or more anchors: near-parallel
/// pairs are merged and refit, otherwise the better-ranked line wins.
pub fn fit_trendlines(
    extrema: &[Extremum],
    kind: ExtremumKind,
    atr: &AtrSeries,
    min_anchors: usize,
    tolerance: f64,
    trend_window: usize,
) -> Vec<Trendline> {
    let min_anchors = min_anchors.max(2);
    let mut points: Vec<Anchor> = extrema
        .iter()
        .filter(|e| e.kind == kind)
        .filter_map(|e| {
            atr.get(e.index).map(|value| Anchor {
                extremum: e.clone(),
                atr: value,
            })
        })
        .collect();
    points.sort_by_key(|a| a.extremum.index);
    if points.len() > trend_window {
        points.drain(..points.len() - trend_window);
    }
    if points.len() < min_anchors {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for start in 0..points.len() {
        for end in start + min_anchors..=points.len() {
            if let Some(candidate) = fit_candidate(&points[start..end], tolerance, min_anchors) {
                candidates.push(candidate);
            }
        }
    }
    let evaluated = candidates.len();
    candidates.sort_by(rank);

    let mut accepted: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let indices = candidate.indices();
        if accepted.iter().any(|a| indices.is_subset(&a.indices())) {
            continue;
        }
        accepted.push(candidate);
    }

    let mut resolved = resolve_conflicts(accepted, tolerance, min_anchors);
    resolved.sort_by_key(Candidate::first_index);

    debug!(
        ?kind,
        extrema = points.len(),
        evaluated,
        lines = resolved.len(),
        "fitted trendlines"
    );

    resolved
        .into_iter()
        .map(|c| Trendline {
            kind: LevelType::from(kind),
            slope: c.slope,
            intercept: c.intercept,
            anchors: c.anchors.into_iter().map(|a| a.extremum).collect(),
            fit_error: c.sse,
        })
        .collect()
}

fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.anchors
        .len()
        .cmp(&a.anchors.len())
        .then(a.sse.partial_cmp(&b.sse).unwrap_or(Ordering::Equal))
        .then(a.first_index().cmp(&b.first_index()))
}

fn fit_candidate(points: &[Anchor], tolerance: f64, min_anchors: usize) -> Option<Candidate> {
    let (slope, intercept) = least_squares(points)?;
    let kept: Vec<Anchor> = points
        .iter()
        .filter(|a| within_tolerance(a, slope, intercept, tolerance))
        .cloned()
        .collect();
    if kept.len() < min_anchors {
        return None;
    }
    validated_fit(kept, tolerance)
}

/// Refit `anchors` and accept only if every anchor sits inside its tolerance.
fn validated_fit(anchors: Vec<Anchor>, tolerance: f64) -> Option<Candidate> {
    let (slope, intercept) = least_squares(&anchors)?;
    if !anchors
        .iter()
        .all(|a| within_tolerance(a, slope, intercept, tolerance))
    {
        return None;
    }
    let sse: f64 = anchors
        .iter()
        .map(|a| (a.extremum.price - (slope * a.x() + intercept)).powi(2))
        .sum();
    Some(Candidate {
        anchors,
        slope,
        intercept,
        sse,
    })
}

fn within_tolerance(anchor: &Anchor, slope: f64, intercept: f64, tolerance: f64) -> bool {
    let residual = (anchor.extremum.price - (slope * anchor.x() + intercept)).abs();
    residual <= tolerance * anchor.atr + PRICE_EPSILON
}

/// Ordinary least squares of price on bar index; `None` for fewer than two distinct indices.
fn least_squares(points: &[Anchor]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(Anchor::x).sum::<f64>() / n;
    let mean_y = points.iter().map(|a| a.extremum.price).sum::<f64>() / n;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for point in points {
        let dx = point.x() - mean_x;
        sxx += dx * dx;
        sxy += dx * (point.extremum.price - mean_y);
    }
    if sxx <= f64::EPSILON {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

fn resolve_conflicts(
    mut lines: Vec<Candidate>,
    tolerance: f64,
    min_anchors: usize,
) -> Vec<Candidate> {
    let overlap_limit = min_anchors - 1;
    loop {
        lines.sort_by(rank);
        let conflict = (0..lines.len()).find_map(|i| {
            let left = lines[i].indices();
            (i + 1..lines.len())
                .find(|&j| left.intersection(&lines[j].indices()).count() >= overlap_limit)
                .map(|j| (i, j))
        });
        let Some((better, worse)) = conflict else {
            return lines;
        };

        let merged = if near_parallel(&lines[better], &lines[worse], tolerance) {
            merge(&lines[better], &lines[worse], tolerance)
        } else {
            None
        };
        if let Some(merged) = merged {
            lines[better] = merged;
        }
        lines.remove(worse);
    }
}

/// Two lines are near-parallel when their slopes diverge by less than the mean
/// anchor tolerance across the combined span.
fn near_parallel(a: &Candidate, b: &Candidate, tolerance: f64) -> bool {
    let anchors: Vec<&Anchor> = a.anchors.iter().chain(b.anchors.iter()).collect();
    let first = anchors.iter().map(|x| x.extremum.index).min().unwrap_or(0);
    let last = anchors.iter().map(|x| x.extremum.index).max().unwrap_or(0);
    let span = (last - first).max(1) as f64;
    let mean_atr = anchors.iter().map(|x| x.atr).sum::<f64>() / anchors.len().max(1) as f64;
    (a.slope - b.slope).abs() * span <= tolerance * mean_atr + PRICE_EPSILON
}

fn merge(a: &Candidate, b: &Candidate, tolerance: f64) -> Option<Candidate> {
    let mut anchors: Vec<Anchor> = a.anchors.clone();
    for anchor in &b.anchors {
        if !anchors
            .iter()
            .any(|x| x.extremum.index == anchor.extremum.index)
        {
            anchors.push(anchor.clone());
        }
    }
    anchors.sort_by_key(|x| x.extremum.index);
    validated_fit(anchors, tolerance)
}
