use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::deltas::MetricFamily;
use crate::evidence::EvidenceFlag;
use crate::narrative::UnitKind;
use crate::pipeline::BatchOutcome;
use crate::report::{Analysis, NarrativeReport};
use crate::severity::{Band, SeverityTier, ThresholdTable};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn tier_cell(tier: SeverityTier) -> Cell {
    let cell = Cell::new(tier.to_string().to_uppercase());
    match tier {
        SeverityTier::High => cell.fg(Color::Red),
        SeverityTier::Moderate => cell.fg(Color::Yellow),
        SeverityTier::Low => cell,
    }
}

pub fn render_deltas_table(analysis: &Analysis) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Metric", "Current", "Future", "Change", "Relative", "Unit", "Tier",
    ]);
    for delta in &analysis.deltas.deltas {
        let tier = analysis
            .severity
            .tier(delta.metric)
            .unwrap_or(SeverityTier::Low);
        table.add_row(Row::from(vec![
            Cell::new(delta.metric.to_string()),
            Cell::new(format!("{:.1}", delta.current_value)),
            Cell::new(format!("{:.1}", delta.future_value)),
            Cell::new(format!("{:+.1}", delta.absolute_change)),
            Cell::new(
                delta
                    .relative_change
                    .map(|r| format!("{r:+.1}%"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(delta.unit.symbol()),
            tier_cell(tier),
        ]));
    }
    for composite in &analysis.severity.composites {
        let components = composite
            .components
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(" + ");
        table.add_row(Row::from(vec![
            Cell::new(format!("composite.{}", composite.kind)),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new(components),
            Cell::new("-"),
            Cell::new("-"),
            tier_cell(composite.tier),
        ]));
    }
    table.to_string()
}

pub fn render_evidence_table(flags: &[EvidenceFlag]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Claim", "Supported", "Confidence", "Reason"]);
    for flag in flags {
        let supported = if flag.supported {
            Cell::new("YES").fg(Color::Green)
        } else {
            Cell::new("NO").fg(Color::Red)
        };
        table.add_row(Row::from(vec![
            Cell::new(flag.claim.to_string()),
            supported,
            Cell::new(flag.confidence.to_string()),
            Cell::new(&flag.reason),
        ]));
    }
    table.to_string()
}

pub fn render_thresholds_table(thresholds: &ThresholdTable) -> String {
    let mut table = new_table();
    table.set_header(vec!["Family", "Absolute (mod / high)", "Relative % (mod / high)"]);
    let band = |band: Option<Band>| {
        band.map(|b| format!("{} / {}", b.moderate, b.high))
            .unwrap_or_else(|| "-".to_string())
    };
    for family in MetricFamily::ALL {
        let rule = thresholds.rule(family);
        table.add_row(vec![
            family.to_string(),
            band(rule.absolute),
            band(rule.relative),
        ]);
    }
    table.to_string()
}

pub fn render_report_table(report: &NarrativeReport) -> String {
    let mut table = new_table();
    table.set_header(vec!["Section", "Kind", "Tier", "Text"]);
    for section in &report.sections {
        for unit in &section.units {
            let kind = match unit.kind {
                UnitKind::Finding => "finding",
                UnitKind::MinorNote => "minor",
                UnitKind::Hedged => "hedged",
                UnitKind::NoSignificantChange => "-",
            };
            table.add_row(Row::from(vec![
                Cell::new(section.kind.title()),
                Cell::new(kind),
                tier_cell(unit.severity),
                Cell::new(&unit.text),
            ]));
        }
    }
    table.to_string()
}

pub fn render_batch_table(outcomes: &[BatchOutcome]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Source", "Status", "Location", "Detail"]);
    for outcome in outcomes {
        let (status, location, detail) = match (&outcome.report, &outcome.error) {
            (Some(report), _) => (
                Cell::new("OK").fg(Color::Green),
                report.location.clone().unwrap_or_else(|| "-".to_string()),
                format!(
                    "{} to {}, {} units",
                    report.current_year,
                    report.future_year,
                    report.unit_count()
                ),
            ),
            (None, Some(err)) => (
                Cell::new("FAILED").fg(Color::Red),
                "-".to_string(),
                format!("{}: {}", err.kind, err.message),
            ),
            (None, None) => (Cell::new("-"), "-".to_string(), String::new()),
        };
        table.add_row(Row::from(vec![
            Cell::new(&outcome.source),
            status,
            Cell::new(location),
            Cell::new(detail),
        ]));
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::raw::RawClimateRecord;
    use crate::pipeline::NarrativeEngine;

    #[test]
    fn thresholds_table_lists_every_family() {
        let rendered = render_thresholds_table(&ThresholdTable::default());
        for family in MetricFamily::ALL {
            assert!(rendered.contains(family.as_slug()), "{family}");
        }
    }

    #[test]
    fn deltas_table_includes_composites() {
        let (_, analysis) = NarrativeEngine::default()
            .analyze(&RawClimateRecord::sample())
            .expect("analysis");
        let rendered = render_deltas_table(&analysis);
        assert!(rendered.contains("temperature_mean"));
        assert!(rendered.contains("composite.humid_heat"));
    }
}
