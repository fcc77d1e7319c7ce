use std::path::PathBuf;

use climate_narrative::deltas::MetricId;
use climate_narrative::evidence::{flag_for, ClaimKind};
use climate_narrative::metrics::raw::RawClimateRecord;
use climate_narrative::metrics::{Confidence, Window};
use climate_narrative::narrative::{SectionKind, UnitKind};
use climate_narrative::output::json::render_json;
use climate_narrative::output::tagged::{render_tagged, top_level_tags};
use climate_narrative::report::NarrativeReport;
use climate_narrative::severity::SeverityTier;
use climate_narrative::{NarrativeEngine, NarrativeError};
use proptest::prelude::*;

fn fixture(name: &str) -> RawClimateRecord {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    RawClimateRecord::load(&path).expect("fixture should load")
}

fn generate(name: &str) -> NarrativeReport {
    NarrativeEngine::default()
        .generate(&fixture(name))
        .expect("report should generate")
}

fn section(report: &NarrativeReport, kind: SectionKind) -> &climate_narrative::narrative::NarrativeSection {
    report.section(kind).expect("section present")
}

#[test]
fn fixture_matches_built_in_sample() {
    assert_eq!(fixture("lyon.json"), RawClimateRecord::sample());
}

#[test]
fn warming_of_2_8_degrees_leads_key_changes() {
    let report = generate("lyon.json");
    let first = &section(&report, SectionKind::KeyChanges).units[0];
    assert_eq!(first.claim, "change.temperature_mean");
    assert_eq!(first.severity, SeverityTier::High);
    assert!(first.text.contains("15.0°C to 17.8°C"));
}

#[test]
fn small_rainfall_change_stays_out_of_key_changes() {
    let report = generate("lyon.json");
    let key = section(&report, SectionKind::KeyChanges);
    assert!(key.units.iter().all(|u| !u.backing.deltas.contains(&MetricId::PrecipitationAnnual)));

    let seasonal = section(&report, SectionKind::SeasonalDetails);
    let note = seasonal
        .units
        .iter()
        .find(|u| u.claim == "change.precipitation_annual")
        .expect("minor note in seasonal details");
    assert_eq!(note.kind, UnitKind::MinorNote);
    assert_eq!(note.severity, SeverityTier::Low);
}

#[test]
fn weak_disease_vector_claim_is_only_hedged() {
    let raw = fixture("weak_disease_vector.json");
    let engine = NarrativeEngine::default();
    let (_, analysis) = engine.analyze(&raw).expect("analysis");
    let flag = flag_for(&analysis.evidence, ClaimKind::DiseaseVectorShift).expect("flag");
    assert!(!flag.supported);

    let report = engine.generate(&raw).expect("report");
    let health = section(&report, SectionKind::PhysicalHealth);
    assert!(health.units.iter().all(|u| u.backing.evidence != Some(ClaimKind::DiseaseVectorShift)));

    let notes = section(&report, SectionKind::UncertaintyNotes);
    let hedged = notes
        .units
        .iter()
        .find(|u| u.backing.evidence == Some(ClaimKind::DiseaseVectorShift))
        .expect("hedged in uncertainty notes");
    assert_eq!(hedged.kind, UnitKind::Hedged);

    let mentions = report
        .sections
        .iter()
        .filter(|s| s.units.iter().any(|u| u.claim == "claim.disease_vector_shift"))
        .map(|s| s.kind)
        .collect::<Vec<_>>();
    assert_eq!(mentions, vec![SectionKind::UncertaintyNotes]);
}

#[test]
fn missing_current_humidity_max_is_rejected_by_name() {
    let err = NarrativeEngine::default()
        .generate(&fixture("missing_humidity.json"))
        .unwrap_err();
    assert_eq!(err.kind(), "data_validation");
    let NarrativeError::DataValidation(inner) = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(inner.field_id(), "CURRENT_HUMIDITY_MAX");
    assert_eq!(inner.window, Some(Window::Current));
    assert!(err.to_string().contains("CURRENT_HUMIDITY_MAX"));
}

#[test]
fn reruns_are_byte_identical() {
    let raw = fixture("lyon.json");
    let first = NarrativeEngine::default().generate(&raw).expect("first");
    let second = NarrativeEngine::default().generate(&raw).expect("second");
    assert_eq!(render_tagged(&first), render_tagged(&second));
    assert_eq!(
        render_json(&first).expect("json"),
        render_json(&second).expect("json")
    );
}

#[test]
fn document_has_exactly_the_eleven_sections() {
    for name in ["lyon.json", "phoenix.json", "weak_disease_vector.json"] {
        let report = generate(name);
        let kinds = report.sections.iter().map(|s| s.kind).collect::<Vec<_>>();
        assert_eq!(kinds, SectionKind::ALL.to_vec(), "{name}");
        assert!(report.sections.iter().all(|s| !s.units.is_empty()), "{name}");

        let tags = top_level_tags(&render_tagged(&report));
        let expected = SectionKind::ALL
            .iter()
            .map(|k| k.as_tag().to_string())
            .collect::<Vec<_>>();
        assert_eq!(tags, expected, "{name}");
    }
}

#[test]
fn every_claim_is_backed() {
    for name in ["lyon.json", "phoenix.json", "weak_disease_vector.json"] {
        let raw = fixture(name);
        let engine = NarrativeEngine::default();
        let (_, analysis) = engine.analyze(&raw).expect("analysis");
        let report = engine.generate(&raw).expect("report");
        for section in &report.sections {
            for unit in &section.units {
                if unit.kind == UnitKind::NoSignificantChange {
                    assert!(section.units.len() == 1);
                    continue;
                }
                assert!(!unit.backing.is_empty(), "{name}: {} has no backing", unit.claim);
                for metric in &unit.backing.deltas {
                    assert!(analysis.deltas.contains(*metric), "{name}: {metric}");
                }
                if let Some(claim) = unit.backing.evidence {
                    let flag = flag_for(&analysis.evidence, claim).expect("flag");
                    assert!(flag.supported || unit.kind == UnitKind::Hedged);
                }
            }
        }
    }
}

#[test]
fn tone_always_follows_severity() {
    let report = generate("lyon.json");
    for unit in report.sections.iter().flat_map(|s| &s.units) {
        assert_eq!(
            unit.tone,
            climate_narrative::narrative::Tone::for_tier(unit.severity),
            "{}",
            unit.claim
        );
    }
}

#[test]
fn arid_record_without_snow_has_no_snow_content() {
    let raw = fixture("phoenix.json");
    let engine = NarrativeEngine::default();
    let (pair, analysis) = engine.analyze(&raw).expect("analysis");
    assert!(pair.current.snowfall.is_none());
    assert!(!analysis.deltas.contains(MetricId::SnowfallAnnual));

    let report = engine.generate(&raw).expect("report");
    assert_eq!(report.location.as_deref(), Some("Phoenix"));
    assert_eq!(report.future_year, 2050);
    // high model agreement adds no agreement caveat
    let notes = section(&report, SectionKind::UncertaintyNotes);
    assert!(notes.units.iter().all(|u| u.claim != "uncertainty.model_agreement"));
    // heat claim is stated directly
    let health = section(&report, SectionKind::PhysicalHealth);
    assert!(health.units.iter().any(|u| u.claim == "claim.heat_health_risk"));
}

#[test]
fn narrower_key_changes_from_settings() {
    use climate_narrative::evidence::EvidenceSettings;
    use climate_narrative::narrative::ComposerSettings;
    use climate_narrative::severity::ThresholdTable;

    let engine = NarrativeEngine::new(
        ThresholdTable::default(),
        EvidenceSettings::default(),
        ComposerSettings { max_key_changes: 2 },
    );
    let report = engine.generate(&fixture("lyon.json")).expect("report");
    let key = section(&report, SectionKind::KeyChanges);
    assert_eq!(key.units.len(), 2);
    assert_eq!(key.units[0].claim, "change.temperature_mean");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn perturbed_records_stay_complete_and_deterministic(
        temperature_mean in 1.0f64..30.0,
        humidity_max in 50.0f64..100.0,
        precipitation_annual in 0.0f64..2000.0,
        hot_days in 0.0f64..60.0,
        agreement in prop_oneof![
            Just(Confidence::Low),
            Just(Confidence::Medium),
            Just(Confidence::High),
        ],
    ) {
        let mut raw = RawClimateRecord::sample();
        raw.future.temperature_mean = Some(temperature_mean);
        raw.future.humidity_max = Some(humidity_max);
        raw.future.precipitation_annual = Some(precipitation_annual);
        raw.future.extremes.hot_days = Some(hot_days);
        raw.metadata.model_agreement = Some(agreement);

        let engine = NarrativeEngine::default();
        let first = engine.generate(&raw).expect("valid perturbation");
        let second = engine.generate(&raw).expect("valid perturbation");
        prop_assert_eq!(render_tagged(&first), render_tagged(&second));
        prop_assert_eq!(first.sections.len(), SectionKind::ALL.len());
        let key = first.section(SectionKind::KeyChanges).expect("key changes");
        prop_assert!(key.units.len() <= 8);
    }
}
