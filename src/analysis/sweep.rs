use itertools::iproduct;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::analysis::atr::AtrSeries;
use crate::analysis::events::detect_breakouts;
use crate::analysis::params::EventParams;
use crate::data::{Bar, StructuralEvent};
use crate::error::{AnalysisError, Result};

/// Cartesian grid of breakout windows (R) and multipliers (k3).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepGrid {
    pub windows: Vec<usize>,
    pub multipliers: Vec<f64>,
}

impl Default for SweepGrid {
    fn default() -> Self {
        Self {
            windows: vec![10, 20, 40],
            multipliers: vec![0.5, 1.0, 2.0],
        }
    }
}

impl SweepGrid {
    /// Every combination, windows outer and multipliers inner.
    pub fn combinations(&self) -> Vec<EventParams> {
        iproduct!(self.windows.iter(), self.multipliers.iter())
            .map(|(&window, &multiplier)| EventParams::new(window, multiplier))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.windows.is_empty() {
            return Err(AnalysisError::invalid("sweep_windows", "must not be empty"));
        }
        if self.multipliers.is_empty() {
            return Err(AnalysisError::invalid("sweep_multipliers", "must not be empty"));
        }
        self.combinations().iter().try_for_each(EventParams::validate)
    }
}

/// Detector output for one grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepOutcome {
    pub params: EventParams,
    pub event_count: usize,
    pub first_event: Option<usize>,
    pub events: Vec<StructuralEvent>,
}

/// Run the breakout detector once per grid point.
///
/// Grid points are independent and read the same immutable bars and ATR, so
/// they run on the rayon pool; results keep grid order. Every grid point is
/// validated before any detector runs.
pub fn run_sweep(bars: &[Bar], atr: &AtrSeries, grid: &SweepGrid) -> Result<Vec<SweepOutcome>> {
    grid.validate()?;
    let combinations = grid.combinations();
    debug!(runs = combinations.len(), bars = bars.len(), "starting sweep");

    combinations
        .par_iter()
        .map(|params| -> Result<SweepOutcome> {
            let events = detect_breakouts(bars, atr, params)?;
            Ok(SweepOutcome {
                params: *params,
                event_count: events.len(),
                first_event: events.first().map(|e| e.index),
                events,
            })
        })
        .collect()
}
