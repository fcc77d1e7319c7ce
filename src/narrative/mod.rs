pub mod composer;
pub mod tone;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deltas::MetricId;
use crate::evidence::ClaimKind;
use crate::severity::SeverityTier;

pub use composer::{ComposerSettings, SectionComposer};
pub use tone::Tone;

/// The eleven report sections, declared in their required output order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    KeyChanges,
    DailyExperience,
    EconomicImpacts,
    PhysicalHealth,
    EnvironmentChanges,
    ComfortAnalysis,
    EnergyImplications,
    SeasonalDetails,
    OutdoorActivities,
    AdaptationNeeds,
    UncertaintyNotes,
}

impl SectionKind {
    pub const ALL: [SectionKind; 11] = [
        SectionKind::KeyChanges,
        SectionKind::DailyExperience,
        SectionKind::EconomicImpacts,
        SectionKind::PhysicalHealth,
        SectionKind::EnvironmentChanges,
        SectionKind::ComfortAnalysis,
        SectionKind::EnergyImplications,
        SectionKind::SeasonalDetails,
        SectionKind::OutdoorActivities,
        SectionKind::AdaptationNeeds,
        SectionKind::UncertaintyNotes,
    ];

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::KeyChanges => "key_changes",
            Self::DailyExperience => "daily_experience",
            Self::EconomicImpacts => "economic_impacts",
            Self::PhysicalHealth => "physical_health",
            Self::EnvironmentChanges => "environment_changes",
            Self::ComfortAnalysis => "comfort_analysis",
            Self::EnergyImplications => "energy_implications",
            Self::SeasonalDetails => "seasonal_details",
            Self::OutdoorActivities => "outdoor_activities",
            Self::AdaptationNeeds => "adaptation_needs",
            Self::UncertaintyNotes => "uncertainty_notes",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::KeyChanges => "Key changes",
            Self::DailyExperience => "Daily experience",
            Self::EconomicImpacts => "Economic impacts",
            Self::PhysicalHealth => "Physical health",
            Self::EnvironmentChanges => "Environment changes",
            Self::ComfortAnalysis => "Comfort",
            Self::EnergyImplications => "Energy",
            Self::SeasonalDetails => "Seasonal details",
            Self::OutdoorActivities => "Outdoor activities",
            Self::AdaptationNeeds => "Adaptation needs",
            Self::UncertaintyNotes => "Uncertainty notes",
        }
    }

    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|kind| kind == self)
            .unwrap_or(Self::ALL.len())
    }
}

impl Display for SectionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

#[derive(Debug, Error)]
#[error("unknown section tag: {0}")]
pub struct SectionParseError(pub String);

impl FromStr for SectionKind {
    type Err = SectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_tag() == normalized)
            .ok_or_else(|| SectionParseError(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Stated directly; backed by classified deltas and, for gated claims, a
    /// supported evidence flag.
    Finding,
    /// Low-tier change mentioned for completeness.
    MinorNote,
    /// Claim the evidence gate rejected; only allowed in `uncertainty_notes`.
    Hedged,
    /// Explicit marker for a section with nothing to report.
    NoSignificantChange,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Backing {
    pub deltas: Vec<MetricId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<ClaimKind>,
}

impl Backing {
    pub fn deltas(deltas: impl IntoIterator<Item = MetricId>) -> Self {
        Self {
            deltas: deltas.into_iter().collect(),
            evidence: None,
        }
    }

    pub fn claim(claim: ClaimKind, deltas: impl IntoIterator<Item = MetricId>) -> Self {
        Self {
            deltas: deltas.into_iter().collect(),
            evidence: Some(claim),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty() && self.evidence.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentUnit {
    pub kind: UnitKind,
    /// Stable identifier of what is asserted, e.g. `change.temperature_mean`.
    pub claim: String,
    pub text: String,
    pub severity: SeverityTier,
    pub tone: Tone,
    pub backing: Backing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NarrativeSection {
    pub kind: SectionKind,
    pub units: Vec<ContentUnit>,
}

impl NarrativeSection {
    pub fn is_no_change(&self) -> bool {
        self.units.len() == 1 && self.units[0].kind == UnitKind::NoSignificantChange
    }

    pub fn claims(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|u| u.claim.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eleven_sections_in_declared_order() {
        assert_eq!(SectionKind::ALL.len(), 11);
        let mut sorted = SectionKind::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, SectionKind::ALL.to_vec());
        assert_eq!(SectionKind::KeyChanges.position(), 0);
        assert_eq!(SectionKind::UncertaintyNotes.position(), 10);
    }

    #[test]
    fn tags_parse_back() {
        for kind in SectionKind::ALL {
            assert_eq!(SectionKind::from_str(kind.as_tag()).unwrap(), kind);
        }
        assert!(SectionKind::from_str("weather_patterns").is_err());
    }

    #[test]
    fn backing_emptiness() {
        assert!(Backing::default().is_empty());
        assert!(!Backing::deltas([MetricId::WindMax]).is_empty());
        assert!(!Backing::claim(ClaimKind::HeatHealthRisk, []).is_empty());
    }
}
