use serde::Serialize;

use crate::error::{AnalysisError, Result};

/// Tuning surface for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisParams {
    /// ATR lookback (N).
    pub atr_period: usize,
    /// Bars on each side a swing must dominate (W).
    pub extremum_radius: usize,
    /// Cluster distance in ATR multiples (k).
    pub cluster_multiplier: f64,
    pub min_cluster_strength: usize,
    /// Minimum trendline anchors (M).
    pub min_anchors: usize,
    /// Trendline residual tolerance in ATR multiples (k2).
    pub fit_tolerance: f64,
    /// Most recent extrema per kind considered for trendlines (K).
    pub trend_window: usize,
    pub events: EventParams,
    /// Zone half-width padding in mean member ATR multiples.
    pub zone_band_multiplier: f64,
    pub reaction_lookahead: usize,
    pub reaction_move_atr: f64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            atr_period: 14,
            extremum_radius: 5,
            cluster_multiplier: 1.0,
            min_cluster_strength: 2,
            min_anchors: 3,
            fit_tolerance: 0.5,
            trend_window: 12,
            events: EventParams::default(),
            zone_band_multiplier: 1.0,
            reaction_lookahead: 20,
            reaction_move_atr: 0.5,
        }
    }
}

impl AnalysisParams {
    pub fn validate(&self) -> Result<()> {
        if self.atr_period == 0 {
            return Err(AnalysisError::invalid("atr_period", "must be at least 1"));
        }
        if self.extremum_radius == 0 {
            return Err(AnalysisError::invalid("extremum_radius", "must be at least 1"));
        }
        positive("cluster_multiplier", self.cluster_multiplier)?;
        if self.min_cluster_strength == 0 {
            return Err(AnalysisError::invalid(
                "min_cluster_strength",
                "must be at least 1",
            ));
        }
        if self.min_anchors < 2 {
            return Err(AnalysisError::invalid("min_anchors", "must be at least 2"));
        }
        positive("fit_tolerance", self.fit_tolerance)?;
        if self.trend_window < self.min_anchors {
            return Err(AnalysisError::invalid(
                "trend_window",
                format!("must be at least min_anchors ({})", self.min_anchors),
            ));
        }
        non_negative("zone_band_multiplier", self.zone_band_multiplier)?;
        non_negative("reaction_move_atr", self.reaction_move_atr)?;
        self.events.validate()
    }
}

/// Envelope breakout detector settings (R, k3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EventParams {
    pub window: usize,
    pub multiplier: f64,
}

impl Default for EventParams {
    fn default() -> Self {
        Self {
            window: 20,
            multiplier: 1.0,
        }
    }
}

impl EventParams {
    pub fn new(window: usize, multiplier: f64) -> Self {
        Self { window, multiplier }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(AnalysisError::invalid("breakout_window", "must be at least 1"));
        }
        non_negative("breakout_multiplier", self.multiplier)
    }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::invalid(
            name,
            format!("must be a positive finite number, got {value}"),
        ))
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::invalid(
            name,
            format!("must be a non-negative finite number, got {value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AnalysisParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_domain_values() {
        let cases: Vec<(AnalysisParams, &str)> = vec![
            (
                AnalysisParams {
                    atr_period: 0,
                    ..Default::default()
                },
                "atr_period",
            ),
            (
                AnalysisParams {
                    extremum_radius: 0,
                    ..Default::default()
                },
                "extremum_radius",
            ),
            (
                AnalysisParams {
                    min_anchors: 1,
                    ..Default::default()
                },
                "min_anchors",
            ),
            (
                AnalysisParams {
                    cluster_multiplier: f64::NAN,
                    ..Default::default()
                },
                "cluster_multiplier",
            ),
            (
                AnalysisParams {
                    trend_window: 2,
                    ..Default::default()
                },
                "trend_window",
            ),
            (
                AnalysisParams {
                    events: EventParams::new(0, 1.0),
                    ..Default::default()
                },
                "breakout_window",
            ),
            (
                AnalysisParams {
                    events: EventParams::new(20, -0.5),
                    ..Default::default()
                },
                "breakout_multiplier",
            ),
        ];

        for (params, expected) in cases {
            match params.validate() {
                Err(AnalysisError::InvalidParameter { name, .. }) => assert_eq!(name, expected),
                other => panic!("expected InvalidParameter for {expected}, got {other:?}"),
            }
        }
    }
}
