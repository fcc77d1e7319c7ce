pub mod validator;

use serde::{Deserialize, Serialize};

use crate::deltas::DeltaSet;
use crate::evidence::EvidenceFlag;
use crate::narrative::{NarrativeSection, SectionKind};
use crate::severity::SeverityAssessment;

pub use validator::validate_report;

/// The emitted document: eleven sections and nothing else, built fresh per
/// run and only returned once validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NarrativeReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub current_year: i32,
    pub future_year: i32,
    pub sections: Vec<NarrativeSection>,
}

impl NarrativeReport {
    pub fn section(&self, kind: SectionKind) -> Option<&NarrativeSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn unit_count(&self) -> usize {
        self.sections.iter().map(|s| s.units.len()).sum()
    }
}

/// Intermediate results of one run, for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub deltas: DeltaSet,
    pub severity: SeverityAssessment,
    pub evidence: Vec<EvidenceFlag>,
}
