use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::analysis::{AnalysisReport, EventParams, SweepOutcome};
use crate::data::{Bar, BreakoutDirection, LevelType, StructuralEvent, Trendline};

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Band")]
    band: String,
    #[tabled(rename = "Strength")]
    strength: usize,
    #[tabled(rename = "Recency")]
    recency: String,
    #[tabled(rename = "Touches")]
    touches: String,
    #[tabled(rename = "Hit Rate")]
    hit_rate: String,
    #[tabled(rename = "Avg React")]
    avg_reaction: String,
    #[tabled(rename = "Max Move")]
    max_move: String,
}

#[derive(Tabled)]
struct TrendlineRow {
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Slope/bar")]
    slope: String,
    #[tabled(rename = "Anchors")]
    anchors: usize,
    #[tabled(rename = "SSE")]
    fit_error: String,
    #[tabled(rename = "Now")]
    projected: String,
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Bar")]
    index: usize,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Direction")]
    direction: &'static str,
    #[tabled(rename = "Close")]
    close: String,
    #[tabled(rename = "Reference")]
    reference: String,
    #[tabled(rename = "Magnitude")]
    magnitude: String,
}

#[derive(Tabled)]
struct SweepRow {
    #[tabled(rename = "R")]
    window: usize,
    #[tabled(rename = "k3")]
    multiplier: String,
    #[tabled(rename = "Events")]
    count: usize,
    #[tabled(rename = "First")]
    first: String,
    #[tabled(rename = "Up/Down")]
    split: String,
}

fn level_label(level_type: LevelType) -> &'static str {
    match level_type {
        LevelType::Support => "Support",
        LevelType::Resistance => "Resistance",
    }
}

fn direction_label(direction: BreakoutDirection) -> &'static str {
    match direction {
        BreakoutDirection::Up => "Breakout Up",
        BreakoutDirection::Down => "Breakout Down",
    }
}

fn dash_unless(tests: usize, value: String) -> String {
    if tests > 0 {
        value
    } else {
        "-".to_string()
    }
}

pub fn print_report(report: &AnalysisReport, bars: &[Bar]) {
    println!("\n=== Structure Recon ===\n");
    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        println!(
            "Bars: {} ({} to {})",
            bars.len(),
            first.timestamp.format("%Y-%m-%d %H:%M"),
            last.timestamp.format("%Y-%m-%d %H:%M")
        );
        println!("Last Close: {:.5}", last.close);
    }
    if let Some(atr) = report.atr.last() {
        println!("ATR({}): {:.5}", report.atr.period(), atr);
    }
    println!(
        "Extrema: {} | Zones: {} | Trendlines: {} | Events: {}",
        report.extrema.len(),
        report.zones.len(),
        report.resistance_lines.len() + report.support_lines.len(),
        report.events.len()
    );

    if report.zones.is_empty() {
        println!("\nNo support/resistance zones identified.");
    } else {
        let rows: Vec<ZoneRow> = report
            .zones
            .iter()
            .map(|zone| {
                let stats = &zone.performance;
                ZoneRow {
                    kind: level_label(zone.level_type),
                    price: format!("{:.5}", zone.price),
                    band: format!("{:.5} - {:.5}", zone.lower, zone.upper),
                    strength: zone.strength,
                    recency: format!("{:.2}", zone.recency_strength),
                    touches: dash_unless(stats.touches, stats.touches.to_string()),
                    hit_rate: dash_unless(
                        stats.touches,
                        format!("{:.1}%", stats.hit_rate * 100.0),
                    ),
                    avg_reaction: dash_unless(stats.touches, format!("{:.5}", stats.avg_reaction)),
                    max_move: dash_unless(
                        stats.touches,
                        format!("{:.5}", stats.max_favorable_excursion),
                    ),
                }
            })
            .collect();
        print_table(rows);
    }

    let lines: Vec<&Trendline> = report
        .resistance_lines
        .iter()
        .chain(report.support_lines.iter())
        .collect();
    if lines.is_empty() {
        println!("No trendlines identified.");
    } else {
        let now = bars.len().saturating_sub(1);
        let rows: Vec<TrendlineRow> = lines
            .iter()
            .map(|line| TrendlineRow {
                kind: level_label(line.kind),
                from: format!("#{} @ {:.5}", line.first_index(), line.value_at(line.first_index())),
                to: format!("#{} @ {:.5}", line.last_index(), line.value_at(line.last_index())),
                slope: format!("{:+.6}", line.slope),
                anchors: line.anchors.len(),
                fit_error: format!("{:.6}", line.fit_error),
                projected: format!("{:.5}", line.value_at(now)),
            })
            .collect();
        print_table(rows);
    }

    print_events(&report.events);
}

pub fn print_events(events: &[StructuralEvent]) {
    if events.is_empty() {
        println!("No structural-change events detected.");
        return;
    }
    let rows: Vec<EventRow> = events
        .iter()
        .map(|event| EventRow {
            index: event.index,
            time: event.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            direction: direction_label(event.direction),
            close: format!("{:.5}", event.close),
            reference: format!("{:.5}", event.reference),
            magnitude: format!("{:.5}", event.magnitude),
        })
        .collect();
    print_table(rows);
}

pub fn print_sweep(outcomes: &[SweepOutcome]) {
    println!("\n=== Sensitivity Sweep ===");
    if outcomes.is_empty() {
        println!("No sweep configurations were run.");
        return;
    }
    let rows: Vec<SweepRow> = outcomes
        .iter()
        .map(|outcome| {
            let ups = outcome
                .events
                .iter()
                .filter(|e| e.direction == BreakoutDirection::Up)
                .count();
            SweepRow {
                window: outcome.params.window,
                multiplier: format!("{:.2}", outcome.params.multiplier),
                count: outcome.event_count,
                first: outcome
                    .first_event
                    .map(|idx| idx.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                split: format!("{}/{}", ups, outcome.event_count - ups),
            }
        })
        .collect();
    print_table(rows);
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("\n{table}\n");
}

/// Artifact name for one sweep configuration, e.g. `sr_detection_R20_k1.00_20251110_205730.json`.
pub fn sweep_artifact_name(params: &EventParams, generated_at: DateTime<Local>) -> String {
    format!(
        "sr_detection_R{}_k{:.2}_{}.json",
        params.window,
        params.multiplier,
        generated_at.format("%Y%m%d_%H%M%S")
    )
}

pub fn analysis_artifact_name(label: &str, generated_at: DateTime<Local>) -> String {
    let safe: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{safe}_analysis_{}.json", generated_at.format("%Y%m%d_%H%M%S"))
}

/// Payload handed to the chart renderer: the bars plus whatever was detected.
#[derive(Serialize)]
pub struct Artifact<'a, T: Serialize> {
    pub generated_at: String,
    pub bars: &'a [Bar],
    pub detection: &'a T,
}

pub fn write_artifact<T: Serialize>(
    dir: &Path,
    name: &str,
    bars: &[Bar],
    detection: &T,
    generated_at: DateTime<Local>,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {:?}", dir))?;
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("failed to create {:?}", path))?;
    let artifact = Artifact {
        generated_at: generated_at.to_rfc3339(),
        bars,
        detection,
    };
    serde_json::to_writer_pretty(BufWriter::new(file), &artifact)
        .with_context(|| format!("failed to write {:?}", path))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::data::fixtures::ranging_bars;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 11, 10, 20, 57, 30).unwrap()
    }

    #[test]
    fn sweep_names_encode_parameters_and_time() {
        let name = sweep_artifact_name(&EventParams::new(20, 1.5), fixed_time());
        assert_eq!(name, "sr_detection_R20_k1.50_20251110_205730.json");
    }

    #[test]
    fn analysis_names_are_filesystem_safe() {
        let name = analysis_artifact_name("AUDCAD=X", fixed_time());
        assert_eq!(name, "AUDCAD_X_analysis_20251110_205730.json");
    }

    #[test]
    fn artifact_round_trips_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let bars = ranging_bars(3, 10.0);
        let detection = vec![1usize, 2, 3];
        let path = write_artifact(dir.path(), "out.json", &bars, &detection, fixed_time()).unwrap();
        let value: serde_json::Value =
            serde_json::from_reader(File::open(path).unwrap()).unwrap();
        assert_eq!(value["bars"].as_array().unwrap().len(), 3);
        assert_eq!(value["detection"][2], 3);
    }
}
