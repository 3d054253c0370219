use crate::analysis::atr::AtrSeries;
use crate::data::{Cluster, LevelType, PerformanceStats, Zone};

/// Reduce clusters to horizontal zones.
///
/// The zone spans the member price range, padded on both sides by
/// `band_multiplier` times the mean member ATR. Zones are ordered by strength,
/// then recency.
pub fn build_zones(clusters: &[Cluster], atr: &AtrSeries, band_multiplier: f64) -> Vec<Zone> {
    let mut zones: Vec<Zone> = clusters
        .iter()
        .filter(|cluster| !cluster.members.is_empty())
        .map(|cluster| {
            let member_atr: Vec<f64> = cluster
                .members
                .iter()
                .filter_map(|m| atr.get(m.index))
                .collect();
            let mean_atr = if member_atr.is_empty() {
                0.0
            } else {
                member_atr.iter().sum::<f64>() / member_atr.len() as f64
            };
            let padding = mean_atr * band_multiplier;
            let (min_price, max_price) = cluster.members.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), m| (lo.min(m.price), hi.max(m.price)),
            );
            Zone {
                level_type: LevelType::from(cluster.kind),
                price: cluster.representative_price,
                lower: min_price - padding,
                upper: max_price + padding,
                strength: cluster.strength,
                recency_strength: cluster.recency_strength,
                last_touch_index: cluster.members.iter().map(|m| m.index).max().unwrap_or(0),
                performance: PerformanceStats::empty(),
            }
        })
        .collect();

    zones.sort_by(|a, b| {
        b.strength.cmp(&a.strength).then(
            b.recency_strength
                .partial_cmp(&a.recency_strength)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });
    zones
}
