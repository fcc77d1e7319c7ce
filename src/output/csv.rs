use anyhow::Result;

use crate::evidence::EvidenceFlag;
use crate::report::Analysis;
use crate::severity::SeverityTier;

pub fn deltas_to_csv(analysis: &Analysis) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "metric",
        "current",
        "future",
        "absolute_change",
        "relative_change_pct",
        "unit",
        "tier",
    ])?;
    for delta in &analysis.deltas.deltas {
        let tier = analysis
            .severity
            .tier(delta.metric)
            .unwrap_or(SeverityTier::Low);
        writer.write_record([
            delta.metric.to_string(),
            format!("{:.2}", delta.current_value),
            format!("{:.2}", delta.future_value),
            format!("{:.2}", delta.absolute_change),
            delta
                .relative_change
                .map(|r| format!("{r:.2}"))
                .unwrap_or_default(),
            delta.unit.symbol().to_string(),
            tier.to_string(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn evidence_to_csv(flags: &[EvidenceFlag]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["claim", "supported", "confidence", "supporting", "reason"])?;
    for flag in flags {
        writer.write_record([
            flag.claim.to_string(),
            flag.supported.to_string(),
            flag.confidence.to_string(),
            flag.supporting
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(";"),
            flag.reason.clone(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::raw::RawClimateRecord;
    use crate::pipeline::NarrativeEngine;

    #[test]
    fn one_row_per_delta_plus_header() {
        let (_, analysis) = NarrativeEngine::default()
            .analyze(&RawClimateRecord::sample())
            .expect("analysis");
        let csv = deltas_to_csv(&analysis).expect("csv");
        let lines = csv.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), analysis.deltas.len() + 1);
        assert!(lines[0].starts_with("metric,current,future"));
        assert!(lines
            .iter()
            .any(|l| l.starts_with("temperature_mean,15.00,17.80,2.80,18.67,°C,high")));
    }

    #[test]
    fn evidence_rows_list_supporting_metrics() {
        let (_, analysis) = NarrativeEngine::default()
            .analyze(&RawClimateRecord::sample())
            .expect("analysis");
        let csv = evidence_to_csv(&analysis.evidence).expect("csv");
        assert_eq!(csv.lines().count(), 6);
        assert!(csv.contains("heat_health_risk,true,medium"));
    }
}
