use tracing::debug;

use crate::analysis::atr::AtrSeries;
use crate::data::{Cluster, Extremum, ExtremumKind};

/// Absolute slack for float comparisons against ATR-scaled distances.
pub(crate) const PRICE_EPSILON: f64 = 1e-9;

/// Group same-kind extrema into price clusters with an ATR-scaled greedy pass.
///
/// Extrema are visited in price order. A candidate joins the open cluster when
/// it sits within `multiplier * ATR[candidate.index]` of the cluster's running
/// mean, otherwise the open cluster is closed and a new one starts. Extrema
/// whose ATR is still undefined are skipped.
///
/// Closed clusters are re-checked against their final mean: members farther
/// than their own ATR allowance are evicted (and dropped) until the mean is
/// stable. Clusters with fewer than `min_strength` members are discarded.
pub fn cluster_extrema(
    extrema: &[Extremum],
    kind: ExtremumKind,
    atr: &AtrSeries,
    multiplier: f64,
    min_strength: usize,
    bar_count: usize,
) -> Vec<Cluster> {
    let mut sorted: Vec<(&Extremum, f64)> = extrema
        .iter()
        .filter(|e| e.kind == kind)
        .filter_map(|e| atr.get(e.index).map(|value| (e, value)))
        .collect();
    if sorted.is_empty() || multiplier <= 0.0 || !multiplier.is_finite() {
        return Vec::new();
    }
    sorted.sort_by(|a, b| {
        a.0.price
            .partial_cmp(&b.0.price)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.index.cmp(&b.0.index))
    });

    let mut clusters = Vec::new();
    let mut buffer: Vec<(&Extremum, f64)> = Vec::new();
    let mut running_mean = 0.0;

    for &(extremum, atr_value) in &sorted {
        if buffer.is_empty() {
            buffer.push((extremum, atr_value));
            running_mean = extremum.price;
            continue;
        }

        let threshold = multiplier * atr_value;
        if (extremum.price - running_mean).abs() <= threshold + PRICE_EPSILON {
            buffer.push((extremum, atr_value));
            running_mean += (extremum.price - running_mean) / buffer.len() as f64;
        } else {
            maybe_emit_cluster(&mut clusters, &buffer, kind, multiplier, min_strength, bar_count);
            buffer.clear();
            buffer.push((extremum, atr_value));
            running_mean = extremum.price;
        }
    }
    maybe_emit_cluster(&mut clusters, &buffer, kind, multiplier, min_strength, bar_count);

    debug!(
        ?kind,
        candidates = sorted.len(),
        clusters = clusters.len(),
        "clustered extrema"
    );
    clusters
}

fn maybe_emit_cluster(
    clusters: &mut Vec<Cluster>,
    buffer: &[(&Extremum, f64)],
    kind: ExtremumKind,
    multiplier: f64,
    min_strength: usize,
    bar_count: usize,
) {
    let mut members = buffer.to_vec();
    let mut representative_price = mean_price(&members);
    loop {
        let before = members.len();
        members.retain(|(extremum, atr_value)| {
            (extremum.price - representative_price).abs() <= multiplier * atr_value + PRICE_EPSILON
        });
        if members.is_empty() || members.len() == before {
            break;
        }
        representative_price = mean_price(&members);
    }

    if members.len() < min_strength || members.is_empty() {
        return;
    }

    let mut members: Vec<Extremum> = members.into_iter().map(|(e, _)| e.clone()).collect();
    members.sort_by_key(|e| e.index);
    let scale = bar_count.max(1) as f64;
    let recency_strength: f64 = members.iter().map(|e| (e.index + 1) as f64 / scale).sum();

    clusters.push(Cluster {
        kind,
        strength: members.len(),
        representative_price,
        recency_strength,
        members,
    });
}

fn mean_price(members: &[(&Extremum, f64)]) -> f64 {
    if members.is_empty() {
        return 0.0;
    }
    members.iter().map(|(e, _)| e.price).sum::<f64>() / members.len() as f64
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;
    use crate::analysis::atr::compute_atr;
    use crate::data::fixtures::bars_from;

    /// Bars with a constant 1.0 true range and extrema placed by hand.
    fn setup(prices: &[(usize, f64)], kind: ExtremumKind) -> (Vec<Extremum>, AtrSeries, usize) {
        let len = prices.iter().map(|(idx, _)| idx + 1).max().unwrap_or(0).max(3);
        let bars = bars_from(&vec![(1.0, 0.0, 0.5); len]);
        let atr = compute_atr(&bars, 1).unwrap();
        let extrema = prices
            .iter()
            .map(|&(index, price)| Extremum {
                index,
                timestamp: bars[index].timestamp,
                price,
                kind,
            })
            .collect();
        (extrema, atr, len)
    }

    #[test]
    fn groups_nearby_prices_and_drops_weak_clusters() {
        let (extrema, atr, len) = setup(
            &[(1, 10.0), (4, 10.4), (7, 10.2), (9, 20.0), (12, 30.0), (15, 30.5)],
            ExtremumKind::High,
        );
        let clusters = cluster_extrema(&extrema, ExtremumKind::High, &atr, 1.0, 2, len);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].strength, 3);
        assert!((clusters[0].representative_price - 10.2).abs() < 1e-9);
        assert_eq!(
            clusters[0].members.iter().map(|e| e.index).collect::<Vec<_>>(),
            vec![1, 4, 7]
        );
        assert_eq!(clusters[1].strength, 2);
        assert!((clusters[1].representative_price - 30.25).abs() < 1e-9);
    }

    #[test]
    fn skips_extrema_without_atr() {
        let bars = bars_from(&vec![(1.0, 0.0, 0.5); 10]);
        let atr = compute_atr(&bars, 5).unwrap();
        let extrema: Vec<Extremum> = [(1usize, 10.0), (2, 10.1), (6, 10.2), (8, 10.3)]
            .iter()
            .map(|&(index, price)| Extremum {
                index,
                timestamp: bars[index].timestamp,
                price,
                kind: ExtremumKind::Low,
            })
            .collect();
        let clusters = cluster_extrema(&extrema, ExtremumKind::Low, &atr, 1.0, 1, bars.len());
        assert_eq!(clusters.len(), 1);
        assert_eq!(
            clusters[0].members.iter().map(|e| e.index).collect::<Vec<_>>(),
            vec![6, 8]
        );
    }

    #[test]
    fn ignores_other_kind() {
        let (extrema, atr, len) = setup(&[(1, 10.0), (2, 10.1)], ExtremumKind::High);
        assert!(cluster_extrema(&extrema, ExtremumKind::Low, &atr, 1.0, 1, len).is_empty());
    }

    #[test]
    fn evicts_members_outside_final_mean() {
        // Each step stays within 1 ATR of the running mean, but 10.0 ends up
        // 1.12 away from the settled mean.
        let (extrema, atr, len) = setup(
            &[(1, 10.0), (2, 10.8), (3, 11.3), (4, 11.6), (5, 11.9)],
            ExtremumKind::High,
        );
        let clusters = cluster_extrema(&extrema, ExtremumKind::High, &atr, 1.0, 1, len);
        assert_eq!(clusters.len(), 1);
        assert_eq!(
            clusters[0].members.iter().map(|e| e.index).collect::<Vec<_>>(),
            vec![2, 3, 4, 5]
        );
        assert!((clusters[0].representative_price - 11.4).abs() < 1e-9);
        for cluster in &clusters {
            for member in &cluster.members {
                assert!((member.price - cluster.representative_price).abs() <= 1.0 + 1e-9);
            }
        }
        assert!(clusters.iter().all(|c| !c.members.iter().any(|m| m.index == 1)));
    }

    proptest! {
        #[test]
        fn members_are_disjoint_and_within_bounds(
            prices in proptest::collection::vec(90.0f64..110.0, 1..40),
            multiplier in 0.2f64..3.0,
        ) {
            let placed: Vec<(usize, f64)> = prices.iter().enumerate().map(|(i, &p)| (i, p)).collect();
            let (extrema, atr, len) = setup(&placed, ExtremumKind::Low);
            let clusters = cluster_extrema(&extrema, ExtremumKind::Low, &atr, multiplier, 1, len);
            let mut seen = HashSet::new();
            for cluster in &clusters {
                prop_assert_eq!(cluster.strength, cluster.members.len());
                for member in &cluster.members {
                    prop_assert!(seen.insert(member.index));
                    let allowance = multiplier * atr.get(member.index).unwrap();
                    prop_assert!(
                        (member.price - cluster.representative_price).abs() <= allowance + PRICE_EPSILON
                    );
                }
            }
        }
    }
}
