use structure_recon::analysis::{
    analyze, compute_atr, detect_breakouts, run_sweep, AnalysisParams, EventParams, SweepGrid,
};
use structure_recon::data::{BreakoutDirection, ExtremumKind};
use structure_recon::synthetic::{generate_bars, SyntheticConfig};
use structure_recon::AnalysisError;

#[test]
fn full_pipeline_is_a_pure_function_of_its_inputs() {
    let bars = generate_bars(&SyntheticConfig::default()).unwrap();
    let params = AnalysisParams::default();
    let first = analyze(&bars, &params).unwrap();
    let second = analyze(&bars, &params).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.bar_count, bars.len());
}

#[test]
fn clusters_stay_single_kind_and_within_atr_bounds() {
    let bars = generate_bars(&SyntheticConfig {
        points: 600,
        seed: 11,
        ..Default::default()
    })
    .unwrap();
    let params = AnalysisParams::default();
    let report = analyze(&bars, &params).unwrap();

    for (clusters, kind) in [
        (&report.resistance_clusters, ExtremumKind::High),
        (&report.support_clusters, ExtremumKind::Low),
    ] {
        let mut seen = std::collections::HashSet::new();
        for cluster in clusters.iter() {
            assert!(cluster.strength >= params.min_cluster_strength);
            for member in &cluster.members {
                assert_eq!(member.kind, kind);
                assert!(seen.insert(member.index));
                let allowance = params.cluster_multiplier * report.atr.get(member.index).unwrap();
                assert!((member.price - cluster.representative_price).abs() <= allowance + 1e-9);
            }
        }
    }

    for line in report.resistance_lines.iter().chain(report.support_lines.iter()) {
        assert!(line.anchors.len() >= params.min_anchors);
        for anchor in &line.anchors {
            let allowance = params.fit_tolerance * report.atr.get(anchor.index).unwrap();
            assert!((anchor.price - line.value_at(anchor.index)).abs() <= allowance + 1e-9);
        }
    }
}

#[test]
fn injected_shift_is_detected_at_the_shift_bar() {
    let config = SyntheticConfig {
        noise_std: 0.05,
        ..Default::default()
    };
    let bars = generate_bars(&config).unwrap();
    let atr = compute_atr(&bars, 14).unwrap();
    let events = detect_breakouts(&bars, &atr, &EventParams::new(20, 3.0)).unwrap();
    assert!(events
        .iter()
        .any(|e| e.index == config.shift_index() && e.direction == BreakoutDirection::Up));
}

#[test]
fn sweep_results_match_isolated_runs() {
    let bars = generate_bars(&SyntheticConfig::default()).unwrap();
    let atr = compute_atr(&bars, 14).unwrap();

    let combined = run_sweep(
        &bars,
        &atr,
        &SweepGrid {
            windows: vec![10, 20],
            multipliers: vec![1.0, 2.0],
        },
    )
    .unwrap();

    for (window, multiplier) in [(10, 1.0), (20, 2.0)] {
        let alone = run_sweep(
            &bars,
            &atr,
            &SweepGrid {
                windows: vec![window],
                multipliers: vec![multiplier],
            },
        )
        .unwrap();
        let matching = combined
            .iter()
            .find(|o| o.params == EventParams::new(window, multiplier))
            .unwrap();
        assert_eq!(&alone[0], matching);
    }
}

#[test]
fn atr_boundary_lengths() {
    let bars = generate_bars(&SyntheticConfig {
        points: 14,
        ..Default::default()
    })
    .unwrap();
    let atr = compute_atr(&bars, 14).unwrap();
    assert!((0..13).all(|idx| atr.get(idx).is_none()));
    assert!(atr.get(13).is_some());

    assert_eq!(
        compute_atr(&bars[..13], 14),
        Err(AnalysisError::InsufficientData {
            required: 14,
            actual: 13
        })
    );
}
