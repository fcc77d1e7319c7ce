//! One pass from raw record to validated report. Each run owns everything it
//! builds; runs share only the read-only engine settings.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::deltas::compute_deltas;
use crate::error::NarrativeError;
use crate::evidence::{EvidenceGate, EvidenceSettings};
use crate::metrics::normalize::normalize_record;
use crate::metrics::raw::RawClimateRecord;
use crate::metrics::SnapshotPair;
use crate::narrative::{ComposerSettings, SectionComposer};
use crate::report::{validate_report, Analysis, NarrativeReport};
use crate::severity::{classify_all, ThresholdTable};

#[derive(Debug, Clone, Default)]
pub struct NarrativeEngine {
    thresholds: ThresholdTable,
    gate: EvidenceGate,
    composer: SectionComposer,
}

impl NarrativeEngine {
    pub fn new(
        thresholds: ThresholdTable,
        evidence: EvidenceSettings,
        composer: ComposerSettings,
    ) -> Self {
        Self {
            thresholds,
            gate: EvidenceGate::new(evidence),
            composer: SectionComposer::new(composer),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.thresholds.clone(),
            config.evidence.clone(),
            config.composer.clone(),
        )
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    /// Normalize, compute deltas, classify and gate.
    pub fn analyze(&self, raw: &RawClimateRecord) -> Result<(SnapshotPair, Analysis), NarrativeError> {
        let pair = normalize_record(raw)?;
        let deltas = compute_deltas(&pair);
        let severity = classify_all(&deltas, &self.thresholds);
        let evidence = self.gate.evaluate_all(&deltas, &severity, &pair.metadata);
        let analysis = Analysis {
            location: pair.location_name().map(str::to_string),
            deltas,
            severity,
            evidence,
        };
        Ok((pair, analysis))
    }

    /// All-or-nothing: the report is only returned once it has passed
    /// validation.
    pub fn generate(&self, raw: &RawClimateRecord) -> Result<NarrativeReport, NarrativeError> {
        let (pair, analysis) = self.analyze(raw)?;
        info!(
            location = pair.location_name().unwrap_or("unnamed"),
            current = pair.current.period.center_year,
            future = pair.future.period.center_year,
            deltas = analysis.deltas.len(),
            "composing narrative"
        );

        let sections = self.composer.compose(
            &pair,
            &analysis.deltas,
            &analysis.severity,
            &analysis.evidence,
        );
        let report = NarrativeReport {
            location: analysis.location.clone(),
            current_year: pair.current.period.center_year,
            future_year: pair.future.period.center_year,
            sections,
        };
        validate_report(&report, &analysis.deltas, &analysis.evidence)?;
        debug!(units = report.unit_count(), "report validated");
        Ok(report)
    }
}

/// Outcome of one record in a batch. Failures stay per record.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<NarrativeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchError {
    pub kind: String,
    pub message: String,
}

impl BatchOutcome {
    fn from_result(source: String, result: Result<NarrativeReport, NarrativeError>) -> Self {
        match result {
            Ok(report) => Self {
                source,
                report: Some(report),
                error: None,
            },
            Err(err) => Self {
                source,
                report: None,
                error: Some(BatchError {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                }),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs independent records on the blocking pool, one task per record.
/// Outcomes come back in input order.
pub async fn generate_batch(
    engine: Arc<NarrativeEngine>,
    records: Vec<(String, RawClimateRecord)>,
) -> Result<Vec<BatchOutcome>> {
    let total = records.len();
    let mut tasks = JoinSet::new();
    for (index, (source, raw)) in records.into_iter().enumerate() {
        let engine = Arc::clone(&engine);
        tasks.spawn_blocking(move || {
            let result = engine.generate(&raw);
            (index, BatchOutcome::from_result(source, result))
        });
    }

    let mut outcomes = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        let (index, outcome) = joined.context("batch worker panicked")?;
        if let Some(err) = &outcome.error {
            warn!(source = %outcome.source, kind = %err.kind, "record failed: {}", err.message);
        }
        outcomes.push((index, outcome));
    }
    outcomes.sort_by_key(|(index, _)| *index);
    Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
}
