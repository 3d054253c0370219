use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

/// Single OHLC bar sampled at a nominal fixed interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub timestamp: DateTime<Tz>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExtremumKind {
    High,
    Low,
}

/// Local swing high or swing low.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extremum {
    pub index: usize,
    pub timestamp: DateTime<Tz>,
    pub price: f64,
    pub kind: ExtremumKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LevelType {
    Support,
    Resistance,
}

impl From<ExtremumKind> for LevelType {
    fn from(kind: ExtremumKind) -> Self {
        match kind {
            ExtremumKind::High => LevelType::Resistance,
            ExtremumKind::Low => LevelType::Support,
        }
    }
}

/// Group of same-kind extrema sitting within an ATR-scaled distance of each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub kind: ExtremumKind,
    pub members: Vec<Extremum>,
    pub representative_price: f64,
    pub strength: usize,
    /// Sum of `(index + 1) / bar_count` over members; later touches weigh more.
    pub recency_strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub touches: usize,
    pub hit_rate: f64,
    pub avg_reaction: f64,
    pub max_favorable_excursion: f64,
    pub avg_reaction_bars: f64,
}

impl PerformanceStats {
    pub fn empty() -> Self {
        Self {
            touches: 0,
            hit_rate: 0.0,
            avg_reaction: 0.0,
            max_favorable_excursion: 0.0,
            avg_reaction_bars: 0.0,
        }
    }
}

/// Horizontal support/resistance zone derived from one cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    pub level_type: LevelType,
    pub price: f64,
    pub lower: f64,
    pub upper: f64,
    pub strength: usize,
    pub recency_strength: f64,
    pub last_touch_index: usize,
    pub performance: PerformanceStats,
}

/// Sloped support or resistance fitted through same-kind extrema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trendline {
    pub kind: LevelType,
    pub slope: f64,
    pub intercept: f64,
    pub anchors: Vec<Extremum>,
    /// Sum of squared residuals over the anchors.
    pub fit_error: f64,
}

impl Trendline {
    pub fn value_at(&self, index: usize) -> f64 {
        self.slope * index as f64 + self.intercept
    }

    pub fn first_index(&self) -> usize {
        self.anchors.first().map(|a| a.index).unwrap_or(0)
    }

    pub fn last_index(&self) -> usize {
        self.anchors.last().map(|a| a.index).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BreakoutDirection {
    Up,
    Down,
}

/// Discrete structural-change event.
///
/// `reference` is the envelope edge (or rolling mean for the z-score detector)
/// that was crossed; `magnitude` is the excess beyond the edge in price units
/// for envelope breakouts and `|z|` for z-score events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralEvent {
    pub index: usize,
    pub timestamp: DateTime<Tz>,
    pub direction: BreakoutDirection,
    pub close: f64,
    pub reference: f64,
    pub magnitude: f64,
}
