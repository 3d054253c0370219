use crate::analysis::atr::AtrSeries;
use crate::data::{Bar, LevelType, PerformanceStats, Zone};

/// Score how price reacted each time it entered a zone.
///
/// A touch is a bar overlapping the zone band whose predecessor did not. A
/// touch counts as a hit when, within `reaction_lookahead` bars, price moves
/// away from the zone (up from support, down from resistance) by at least
/// `reaction_move_atr * ATR` measured at the touch bar.
///
/// These figures describe how the zone has behaved in the supplied history.
/// They are zone metadata for reports, not trade simulation: no entries, exits
/// or position sizing are modelled.
pub fn evaluate_zones(
    mut zones: Vec<Zone>,
    bars: &[Bar],
    atr: &AtrSeries,
    reaction_lookahead: usize,
    reaction_move_atr: f64,
) -> Vec<Zone> {
    if bars.is_empty() {
        return zones;
    }
    let mean_atr = atr.mean();

    for zone in &mut zones {
        let mut touches = 0usize;
        let mut hits = 0usize;
        let mut total_reaction = 0.0;
        let mut max_reaction: f64 = 0.0;
        let mut total_reaction_bars = 0.0;
        let mut inside_previous = false;

        for (idx, bar) in bars.iter().enumerate() {
            let inside = bar.low <= zone.upper && bar.high >= zone.lower;
            let entered = inside && !inside_previous;
            inside_previous = inside;
            if !entered {
                continue;
            }
            touches += 1;
            let atr_ref = atr.get(idx).unwrap_or(mean_atr).max(1e-6);

            let mut best_move = 0.0;
            let mut bars_to_best = 0usize;
            let mut success = false;
            let end = idx
                .saturating_add(reaction_lookahead)
                .saturating_add(1)
                .min(bars.len());
            for (forward_idx, forward_bar) in bars.iter().enumerate().take(end).skip(idx + 1) {
                let movement = match zone.level_type {
                    LevelType::Support => forward_bar.high - zone.price,
                    LevelType::Resistance => zone.price - forward_bar.low,
                };
                if movement > best_move {
                    best_move = movement;
                    bars_to_best = forward_idx - idx;
                }
                if movement >= reaction_move_atr * atr_ref {
                    success = true;
                }
            }
            if success {
                hits += 1;
            }
            total_reaction += best_move;
            max_reaction = max_reaction.max(best_move);
            total_reaction_bars += bars_to_best as f64;
        }

        zone.performance = if touches > 0 {
            PerformanceStats {
                touches,
                hit_rate: hits as f64 / touches as f64,
                avg_reaction: total_reaction / touches as f64,
                max_favorable_excursion: max_reaction,
                avg_reaction_bars: total_reaction_bars / touches as f64,
            }
        } else {
            PerformanceStats::empty()
        };
    }

    zones
}
