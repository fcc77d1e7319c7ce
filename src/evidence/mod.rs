pub mod gate;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deltas::{Delta, MetricId};
use crate::metrics::{Confidence, ExtremeKind, Season};

pub use gate::EvidenceGate;

/// Claims that need more than one metric (or an extreme-event signal) before
/// they may be stated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    DiseaseVectorShift,
    HeatHealthRisk,
    InfrastructureStress,
    WaterSupplyStress,
    EconomicCascade,
}

impl ClaimKind {
    pub const ALL: [ClaimKind; 5] = [
        ClaimKind::DiseaseVectorShift,
        ClaimKind::HeatHealthRisk,
        ClaimKind::InfrastructureStress,
        ClaimKind::WaterSupplyStress,
        ClaimKind::EconomicCascade,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::DiseaseVectorShift => "disease_vector_shift",
            Self::HeatHealthRisk => "heat_health_risk",
            Self::InfrastructureStress => "infrastructure_stress",
            Self::WaterSupplyStress => "water_supply_stress",
            Self::EconomicCascade => "economic_cascade",
        }
    }

    pub fn requirement(&self) -> EvidenceRequirement {
        use Expect::{Any, Down, Up};
        match self {
            Self::DiseaseVectorShift => EvidenceRequirement {
                corroborations: vec![
                    (MetricId::TemperatureMean, Up),
                    (MetricId::HumidityMax, Up),
                    (MetricId::PrecipitationAnnual, Up),
                    (MetricId::SeasonalTemperature(Season::Winter), Up),
                ],
                extreme_signals: vec![],
            },
            Self::HeatHealthRisk => EvidenceRequirement {
                corroborations: vec![
                    (MetricId::TemperatureMax, Up),
                    (MetricId::HotDays, Up),
                    (MetricId::HumidityMax, Up),
                ],
                extreme_signals: vec![ExtremeKind::Heat],
            },
            Self::InfrastructureStress => EvidenceRequirement {
                corroborations: vec![
                    (MetricId::PrecipitationMonthlyMax, Up),
                    (MetricId::WindMax, Up),
                    (MetricId::TemperatureMax, Up),
                ],
                extreme_signals: vec![ExtremeKind::Precipitation, ExtremeKind::Wind],
            },
            Self::WaterSupplyStress => EvidenceRequirement {
                corroborations: vec![
                    (MetricId::PrecipitationAnnual, Down),
                    (MetricId::SnowfallAnnual, Down),
                    (MetricId::SeasonalPrecipitation(Season::Summer), Down),
                ],
                extreme_signals: vec![],
            },
            Self::EconomicCascade => EvidenceRequirement {
                corroborations: vec![
                    (MetricId::TemperatureMean, Up),
                    (MetricId::PrecipitationAnnual, Any),
                    (MetricId::HotDays, Up),
                    (MetricId::HeavyRainDays, Up),
                ],
                extreme_signals: vec![ExtremeKind::Heat, ExtremeKind::Precipitation],
            },
        }
    }
}

impl Display for ClaimKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

/// Direction a corroborating change must have.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Expect {
    Up,
    Down,
    Any,
}

impl Expect {
    pub fn matches(&self, delta: &Delta) -> bool {
        match self {
            Self::Up => delta.is_increase(),
            Self::Down => delta.is_decrease(),
            Self::Any => !matches!(delta.direction(), crate::deltas::Direction::Unchanged),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceRequirement {
    pub corroborations: Vec<(MetricId, Expect)>,
    pub extreme_signals: Vec<ExtremeKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceFlag {
    pub claim: ClaimKind,
    pub supported: bool,
    pub confidence: Confidence,
    pub reason: String,
    /// Deltas that corroborate the claim, in `MetricId` order.
    pub supporting: Vec<MetricId>,
    pub extreme_signal: Option<ExtremeKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceSettings {
    #[serde(default = "default_min_corroborations")]
    pub min_corroborations: usize,
    #[serde(default = "default_extreme_signal_min_support")]
    pub extreme_signal_min_support: Confidence,
}

impl Default for EvidenceSettings {
    fn default() -> Self {
        Self {
            min_corroborations: default_min_corroborations(),
            extreme_signal_min_support: default_extreme_signal_min_support(),
        }
    }
}

/// Fewer than two corroborating deltas would let a single metric assert a claim.
pub const MIN_CORROBORATIONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvidenceSettingsError {
    #[error("min_corroborations must be at least {MIN_CORROBORATIONS}, got {0}")]
    TooFewCorroborations(usize),
}

impl EvidenceSettings {
    pub fn validate(&self) -> Result<(), EvidenceSettingsError> {
        if self.min_corroborations < MIN_CORROBORATIONS {
            return Err(EvidenceSettingsError::TooFewCorroborations(
                self.min_corroborations,
            ));
        }
        Ok(())
    }
}

fn default_min_corroborations() -> usize {
    2
}

fn default_extreme_signal_min_support() -> Confidence {
    Confidence::Medium
}

/// Lookup helper over the gate's output.
pub fn flag_for(flags: &[EvidenceFlag], claim: ClaimKind) -> Option<&EvidenceFlag> {
    flags.iter().find(|f| f.claim == claim)
}
