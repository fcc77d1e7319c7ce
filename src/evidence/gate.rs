use tracing::debug;

use crate::deltas::{DeltaSet, MetricId};
use crate::evidence::{ClaimKind, EvidenceFlag, EvidenceSettings};
use crate::metrics::{Confidence, ExtremeKind, ProjectionMetadata};
use crate::severity::{SeverityAssessment, SeverityTier};

/// Decides, per claim, whether the classified deltas corroborate it strongly
/// enough to be asserted. Unsupported claims may only be hedged.
#[derive(Debug, Clone)]
pub struct EvidenceGate {
    settings: EvidenceSettings,
}

impl EvidenceGate {
    pub fn new(settings: EvidenceSettings) -> Self {
        Self { settings }
    }

    pub fn evaluate_all(
        &self,
        set: &DeltaSet,
        severity: &SeverityAssessment,
        metadata: &ProjectionMetadata,
    ) -> Vec<EvidenceFlag> {
        let flags = ClaimKind::ALL
            .iter()
            .map(|claim| self.evaluate(*claim, set, severity, metadata))
            .collect::<Vec<_>>();
        debug!(
            supported = flags.iter().filter(|f| f.supported).count(),
            total = flags.len(),
            "gated claims"
        );
        flags
    }

    pub fn evaluate(
        &self,
        claim: ClaimKind,
        set: &DeltaSet,
        severity: &SeverityAssessment,
        metadata: &ProjectionMetadata,
    ) -> EvidenceFlag {
        let requirement = claim.requirement();

        let mut supporting = requirement
            .corroborations
            .iter()
            .filter(|(metric, expect)| {
                let Some(delta) = set.get(*metric) else {
                    return false;
                };
                let notable = severity
                    .tier(*metric)
                    .map(SeverityTier::is_notable)
                    .unwrap_or(false);
                notable && expect.matches(delta)
            })
            .map(|(metric, _)| *metric)
            .collect::<Vec<_>>();
        supporting.sort();
        supporting.dedup();
        let corroborations = supporting.len();

        let extreme_signal = requirement
            .extreme_signals
            .iter()
            .copied()
            .find(|kind| self.has_extreme_signal(*kind, set, severity));
        if let Some(kind) = extreme_signal {
            if let Some(extreme) = set.extreme(kind) {
                if !supporting.contains(&extreme.frequency.metric) {
                    supporting.push(extreme.frequency.metric);
                    supporting.sort();
                }
            }
        }

        let required = self.settings.min_corroborations;
        let supported = corroborations >= required || extreme_signal.is_some();

        let raw_confidence = match (corroborations, extreme_signal.is_some()) {
            (n, _) if n >= 3 => Confidence::High,
            (n, true) if n >= 2 => Confidence::High,
            (n, _) if n >= 2 => Confidence::Medium,
            (_, true) => Confidence::Medium,
            _ => Confidence::Low,
        };
        let confidence = raw_confidence.min(metadata.model_agreement);

        let reason = describe(
            corroborations,
            required,
            &supporting,
            extreme_signal,
            set,
            supported,
        );

        EvidenceFlag {
            claim,
            supported,
            confidence,
            reason,
            supporting,
            extreme_signal,
        }
    }

    fn has_extreme_signal(
        &self,
        kind: ExtremeKind,
        set: &DeltaSet,
        severity: &SeverityAssessment,
    ) -> bool {
        let Some(extreme) = set.extreme(kind) else {
            return false;
        };
        let frequency_tier = severity
            .tier(extreme.frequency.metric)
            .unwrap_or(SeverityTier::Low);
        extreme.frequency.is_increase()
            && frequency_tier.is_notable()
            && extreme.support >= self.settings.extreme_signal_min_support
    }
}

impl Default for EvidenceGate {
    fn default() -> Self {
        Self::new(EvidenceSettings::default())
    }
}

fn describe(
    corroborations: usize,
    required: usize,
    supporting: &[MetricId],
    extreme_signal: Option<ExtremeKind>,
    set: &DeltaSet,
    supported: bool,
) -> String {
    let listed = if supporting.is_empty() {
        "none".to_string()
    } else {
        supporting
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    match (supported, extreme_signal) {
        (true, Some(kind)) => {
            let support = set
                .extreme(kind)
                .map(|e| e.support.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            format!(
                "{corroborations} corroborating change(s) ({listed}) and a rising {kind} extreme signal with {support} support"
            )
        }
        (true, None) => format!("{corroborations} corroborating changes ({listed})"),
        (false, _) => format!(
            "only {corroborations} of {required} required corroborating changes ({listed}) and no qualifying extreme-event signal"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deltas::compute_deltas;
    use crate::evidence::flag_for;
    use crate::metrics::normalize::normalize_record;
    use crate::metrics::raw::RawClimateRecord;
    use crate::metrics::SnapshotPair;
    use crate::severity::{classify_all, ThresholdTable};

    fn run(raw: &RawClimateRecord) -> (SnapshotPair, Vec<EvidenceFlag>) {
        let pair = normalize_record(raw).expect("valid");
        let set = compute_deltas(&pair);
        let severity = classify_all(&set, &ThresholdTable::default());
        let flags = EvidenceGate::default().evaluate_all(&set, &severity, &pair.metadata);
        (pair, flags)
    }

    #[test]
    fn every_claim_gets_a_flag() {
        let (_, flags) = run(&RawClimateRecord::sample());
        assert_eq!(flags.len(), ClaimKind::ALL.len());
    }

    #[test]
    fn heat_health_risk_is_supported_by_sample() {
        let (_, flags) = run(&RawClimateRecord::sample());
        let flag = flag_for(&flags, ClaimKind::HeatHealthRisk).unwrap();
        assert!(flag.supported);
        assert_eq!(flag.extreme_signal, Some(ExtremeKind::Heat));
        assert!(flag.supporting.contains(&MetricId::TemperatureMax));
        assert!(flag.supporting.contains(&MetricId::HotDays));
        // capped by medium model agreement
        assert_eq!(flag.confidence, Confidence::Medium);
    }

    #[test]
    fn single_weak_corroboration_leaves_disease_vector_unsupported() {
        let mut raw = RawClimateRecord::sample();
        // only the mean temperature rise clears its threshold
        raw.future.humidity_max = Some(86.0);
        raw.future.precipitation_annual = Some(820.0);
        if let Some(winter) = raw.future.seasons.winter.as_mut() {
            winter.temperature_mean = Some(5.5);
        }
        let (_, flags) = run(&raw);
        let flag = flag_for(&flags, ClaimKind::DiseaseVectorShift).unwrap();
        assert!(!flag.supported);
        assert_eq!(flag.supporting, vec![MetricId::TemperatureMean]);
        assert_eq!(flag.confidence, Confidence::Low);
        assert!(flag.reason.contains("only 1 of 2"));
    }

    #[test]
    fn two_independent_changes_support_disease_vector() {
        let (_, flags) = run(&RawClimateRecord::sample());
        let flag = flag_for(&flags, ClaimKind::DiseaseVectorShift).unwrap();
        // temperature_mean (High), humidity_max (+5pp), winter +2.4
        assert!(flag.supported);
        assert!(flag.supporting.len() >= 2);
    }

    #[test]
    fn low_support_extreme_is_not_a_signal() {
        let mut raw = RawClimateRecord::sample();
        raw.future.wind_max = Some(40.0);
        raw.future.precipitation_monthly_max = Some(141.0);
        raw.future.temperature_max = Some(31.5);
        raw.future.extremes.high_wind_days = Some(9.0);
        raw.future.extremes.heavy_rain_days = Some(3.0);
        let (_, flags) = run(&raw);
        let flag = flag_for(&flags, ClaimKind::InfrastructureStress).unwrap();
        // rising wind frequency only has low support
        assert!(!flag.supported);
        assert!(flag.extreme_signal.is_none());
    }

    #[test]
    fn stricter_gate_requires_more_corroboration() {
        let pair = normalize_record(&RawClimateRecord::sample()).expect("valid");
        let set = compute_deltas(&pair);
        let severity = classify_all(&set, &ThresholdTable::default());
        let gate = EvidenceGate::new(EvidenceSettings {
            min_corroborations: 4,
            extreme_signal_min_support: Confidence::High,
        });
        let flag = gate.evaluate(
            ClaimKind::DiseaseVectorShift,
            &set,
            &severity,
            &pair.metadata,
        );
        assert!(!flag.supported);
    }

    #[test]
    fn water_supply_needs_drying_signals() {
        let (_, flags) = run(&RawClimateRecord::sample());
        let flag = flag_for(&flags, ClaimKind::WaterSupplyStress).unwrap();
        // snowfall down sharply and summer rain down, annual rain up slightly
        assert!(flag.supported);
        assert!(!flag.supporting.contains(&MetricId::PrecipitationAnnual));
    }
}
