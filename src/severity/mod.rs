pub mod classifier;
pub mod thresholds;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::deltas::MetricId;

pub use classifier::{classify_all, classify_delta, combine_tiers};
pub use thresholds::{Band, ThresholdRule, ThresholdTable};

/// Practical significance of a change, `Low < Moderate < High`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    Low,
    Moderate,
    High,
}

impl SeverityTier {
    pub const ALL: [SeverityTier; 3] = [
        SeverityTier::Low,
        SeverityTier::Moderate,
        SeverityTier::High,
    ];

    pub fn is_notable(self) -> bool {
        self >= SeverityTier::Moderate
    }
}

impl Display for SeverityTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        };
        write!(f, "{label}")
    }
}

/// Claims that combine two metrics and must not be carried by one alone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CompositeKind {
    HumidHeat,
    Downpour,
}

impl CompositeKind {
    pub const ALL: [CompositeKind; 2] = [CompositeKind::HumidHeat, CompositeKind::Downpour];

    pub fn components(&self) -> [MetricId; 2] {
        match self {
            Self::HumidHeat => [MetricId::TemperatureMax, MetricId::HumidityMax],
            Self::Downpour => [MetricId::PrecipitationMonthlyMax, MetricId::HeavyRainDays],
        }
    }

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::HumidHeat => "humid_heat",
            Self::Downpour => "downpour",
        }
    }
}

impl Display for CompositeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompositeAssessment {
    pub kind: CompositeKind,
    pub components: Vec<MetricId>,
    /// Component tiers after discarding non-increasing components.
    pub component_tiers: Vec<SeverityTier>,
    pub tier: SeverityTier,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SeverityAssessment {
    pub tiers: BTreeMap<MetricId, SeverityTier>,
    pub composites: Vec<CompositeAssessment>,
}

impl SeverityAssessment {
    pub fn tier(&self, metric: MetricId) -> Option<SeverityTier> {
        self.tiers.get(&metric).copied()
    }

    pub fn composite(&self, kind: CompositeKind) -> Option<&CompositeAssessment> {
        self.composites.iter().find(|c| c.kind == kind)
    }

    pub fn histogram(&self) -> BTreeMap<SeverityTier, usize> {
        let mut out = BTreeMap::new();
        for tier in self.tiers.values() {
            *out.entry(*tier).or_insert(0) += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_totally_ordered() {
        assert!(SeverityTier::Low < SeverityTier::Moderate);
        assert!(SeverityTier::Moderate < SeverityTier::High);
        assert_eq!(
            SeverityTier::ALL.iter().max(),
            Some(&SeverityTier::High)
        );
        assert!(!SeverityTier::Low.is_notable());
        assert!(SeverityTier::Moderate.is_notable());
    }

    #[test]
    fn histogram_counts_each_tier() {
        let mut assessment = SeverityAssessment::default();
        assessment
            .tiers
            .insert(MetricId::TemperatureMean, SeverityTier::High);
        assessment
            .tiers
            .insert(MetricId::CloudCover, SeverityTier::Low);
        assessment.tiers.insert(MetricId::WindMax, SeverityTier::Low);
        let histogram = assessment.histogram();
        assert_eq!(histogram.get(&SeverityTier::Low), Some(&2));
        assert_eq!(histogram.get(&SeverityTier::High), Some(&1));
        assert_eq!(histogram.get(&SeverityTier::Moderate), None);
    }
}
