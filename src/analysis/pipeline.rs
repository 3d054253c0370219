use serde::Serialize;
use tracing::debug;

use crate::analysis::atr::{compute_atr, AtrSeries};
use crate::analysis::clustering::cluster_extrema;
use crate::analysis::events::detect_breakouts;
use crate::analysis::extrema::detect_extrema;
use crate::analysis::levels::build_zones;
use crate::analysis::params::AnalysisParams;
use crate::analysis::stats::evaluate_zones;
use crate::analysis::trendlines::fit_trendlines;
use crate::data::{Bar, Cluster, Extremum, ExtremumKind, StructuralEvent, Trendline, Zone};
use crate::error::Result;

/// Everything one run produces; plain data for the rendering stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub params: AnalysisParams,
    pub bar_count: usize,
    pub atr: AtrSeries,
    pub extrema: Vec<Extremum>,
    pub resistance_clusters: Vec<Cluster>,
    pub support_clusters: Vec<Cluster>,
    pub zones: Vec<Zone>,
    pub resistance_lines: Vec<Trendline>,
    pub support_lines: Vec<Trendline>,
    pub events: Vec<StructuralEvent>,
}

/// Run ATR, clustering, trendline fitting and breakout detection over `bars`.
///
/// Parameters are validated before any computation. The result depends only on
/// the inputs.
pub fn analyze(bars: &[Bar], params: &AnalysisParams) -> Result<AnalysisReport> {
    params.validate()?;
    let atr = compute_atr(bars, params.atr_period)?;
    let extrema = detect_extrema(bars, params.extremum_radius)?;

    let clusters_for = |kind| {
        cluster_extrema(
            &extrema,
            kind,
            &atr,
            params.cluster_multiplier,
            params.min_cluster_strength,
            bars.len(),
        )
    };
    let resistance_clusters = clusters_for(ExtremumKind::High);
    let support_clusters = clusters_for(ExtremumKind::Low);

    let mut zones = build_zones(&resistance_clusters, &atr, params.zone_band_multiplier);
    zones.extend(build_zones(&support_clusters, &atr, params.zone_band_multiplier));
    let zones = evaluate_zones(
        zones,
        bars,
        &atr,
        params.reaction_lookahead,
        params.reaction_move_atr,
    );

    let lines_for = |kind| {
        fit_trendlines(
            &extrema,
            kind,
            &atr,
            params.min_anchors,
            params.fit_tolerance,
            params.trend_window,
        )
    };
    let resistance_lines = lines_for(ExtremumKind::High);
    let support_lines = lines_for(ExtremumKind::Low);

    let events = detect_breakouts(bars, &atr, &params.events)?;

    debug!(
        bars = bars.len(),
        extrema = extrema.len(),
        zones = zones.len(),
        lines = resistance_lines.len() + support_lines.len(),
        events = events.len(),
        "analysis complete"
    );

    Ok(AnalysisReport {
        params: params.clone(),
        bar_count: bars.len(),
        atr,
        extrema,
        resistance_clusters,
        support_clusters,
        zones,
        resistance_lines,
        support_lines,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::ranging_bars;
    use crate::error::AnalysisError;

    #[test]
    fn invalid_params_fail_before_data_checks() {
        let params = AnalysisParams {
            min_anchors: 1,
            ..Default::default()
        };
        assert!(matches!(
            analyze(&[], &params),
            Err(AnalysisError::InvalidParameter { name: "min_anchors", .. })
        ));
    }

    #[test]
    fn short_input_is_insufficient() {
        let bars = ranging_bars(10, 100.0);
        assert!(matches!(
            analyze(&bars, &AnalysisParams::default()),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }

    #[test]
    fn oversized_windows_do_not_overflow() {
        let bars = ranging_bars(120, 100.0);
        let params = AnalysisParams {
            extremum_radius: usize::MAX,
            reaction_lookahead: usize::MAX,
            ..Default::default()
        };
        let report = analyze(&bars, &params).unwrap();
        assert!(report.extrema.is_empty());
        assert!(report.zones.is_empty());

        let params = AnalysisParams {
            events: crate::analysis::params::EventParams::new(usize::MAX, 1.0),
            ..Default::default()
        };
        assert!(matches!(
            analyze(&bars, &params),
            Err(AnalysisError::InsufficientData { required: usize::MAX, .. })
        ));
    }

    #[test]
    fn ranging_market_yields_no_events() {
        let bars = ranging_bars(120, 100.0);
        let report = analyze(&bars, &AnalysisParams::default()).unwrap();
        assert_eq!(report.bar_count, 120);
        assert!(report.events.is_empty());
        assert!(report.zones.iter().all(|z| z.strength >= 2));
    }
}
