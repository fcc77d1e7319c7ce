use tracing::warn;

use crate::deltas::DeltaSet;
use crate::error::NarrativeError;
use crate::evidence::{flag_for, EvidenceFlag};
use crate::narrative::{NarrativeSection, SectionKind, UnitKind};
use crate::report::NarrativeReport;

/// Last gate before emission. Structure is checked before backing so a
/// malformed report is reported as incomplete rather than unsupported.
pub fn validate_report(
    report: &NarrativeReport,
    deltas: &DeltaSet,
    flags: &[EvidenceFlag],
) -> Result<(), NarrativeError> {
    let result = check_structure(&report.sections)
        .and_then(|_| check_backing(&report.sections, deltas, flags));
    if let Err(err) = &result {
        warn!(kind = err.kind(), error = %err, "report rejected");
    }
    result
}

fn check_structure(sections: &[NarrativeSection]) -> Result<(), NarrativeError> {
    if sections.len() != SectionKind::ALL.len() {
        return Err(NarrativeError::IncompleteOutput {
            section: "report".to_string(),
            rule: format!(
                "expected {} sections, found {}",
                SectionKind::ALL.len(),
                sections.len()
            ),
        });
    }

    for (expected, section) in SectionKind::ALL.iter().zip(sections) {
        if section.kind != *expected {
            let rule = if sections.iter().filter(|s| s.kind == section.kind).count() > 1 {
                format!("duplicated section, expected {expected} at this position")
            } else {
                format!("out of order, expected {expected} at this position")
            };
            return Err(NarrativeError::IncompleteOutput {
                section: section.kind.to_string(),
                rule,
            });
        }
        if section.units.is_empty() {
            return Err(incomplete(section, "section is empty"));
        }
        let markers = section
            .units
            .iter()
            .filter(|u| u.kind == UnitKind::NoSignificantChange)
            .count();
        if markers > 0 && section.units.len() > 1 {
            return Err(incomplete(
                section,
                "no-change marker mixed with other content",
            ));
        }
    }
    Ok(())
}

fn check_backing(
    sections: &[NarrativeSection],
    deltas: &DeltaSet,
    flags: &[EvidenceFlag],
) -> Result<(), NarrativeError> {
    for section in sections {
        for unit in &section.units {
            let unsupported = |rule: String| NarrativeError::UnsupportedClaim {
                section: section.kind,
                claim: unit.claim.clone(),
                rule,
            };

            if unit.kind == UnitKind::NoSignificantChange {
                continue;
            }
            if unit.backing.is_empty() {
                return Err(unsupported("no backing delta or evidence flag".to_string()));
            }
            if let Some(metric) = unit.backing.deltas.iter().find(|m| !deltas.contains(**m)) {
                return Err(unsupported(format!("backing metric {metric} is not in the delta set")));
            }
            if let Some(claim) = unit.backing.evidence {
                let Some(flag) = flag_for(flags, claim) else {
                    return Err(unsupported(format!("no evidence flag for {claim}")));
                };
                if unit.kind != UnitKind::Hedged && !flag.supported {
                    return Err(unsupported(format!(
                        "evidence flag for {claim} is not supported"
                    )));
                }
            }
            if unit.kind == UnitKind::Hedged && section.kind != SectionKind::UncertaintyNotes {
                return Err(unsupported(
                    "hedged content outside uncertainty_notes".to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn incomplete(section: &NarrativeSection, rule: &str) -> NarrativeError {
    NarrativeError::IncompleteOutput {
        section: section.kind.to_string(),
        rule: rule.to_string(),
    }
}
