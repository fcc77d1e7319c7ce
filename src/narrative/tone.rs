//! Phrasing register lookup. The register is a pure function of the severity
//! tier; sentences never pick their own.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::deltas::{Delta, Direction, Unit};
use crate::severity::SeverityTier;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    /// Serious, plain statement for High-tier content.
    Direct,
    Measured,
    Mild,
}

impl Tone {
    pub fn for_tier(tier: SeverityTier) -> Self {
        match tier {
            SeverityTier::High => Self::Direct,
            SeverityTier::Moderate => Self::Measured,
            SeverityTier::Low => Self::Mild,
        }
    }

    pub fn change_verb(&self, direction: Direction) -> &'static str {
        match (self, direction) {
            (_, Direction::Unchanged) => "holds steady",
            (Self::Direct, Direction::Increase) => "rises sharply",
            (Self::Direct, Direction::Decrease) => "falls sharply",
            (Self::Measured, Direction::Increase) => "rises noticeably",
            (Self::Measured, Direction::Decrease) => "falls noticeably",
            (Self::Mild, Direction::Increase) => "edges up",
            (Self::Mild, Direction::Decrease) => "edges down",
        }
    }

    pub fn qualifier(&self) -> &'static str {
        match self {
            Self::Direct => "substantial",
            Self::Measured => "noticeable",
            Self::Mild => "slight",
        }
    }

    pub fn likelihood(&self) -> &'static str {
        match self {
            Self::Direct => "will",
            Self::Measured => "is likely to",
            Self::Mild => "may",
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::Direct => "Prioritise",
            Self::Measured => "Plan for",
            Self::Mild => "Consider",
        }
    }
}

impl Display for Tone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Direct => "direct",
            Self::Measured => "measured",
            Self::Mild => "mild",
        };
        write!(f, "{label}")
    }
}

pub fn format_value(value: f64, unit: Unit) -> String {
    match unit {
        Unit::Celsius | Unit::Percent => format!("{value:.1}{}", unit.symbol()),
        _ => format!("{value:.1} {}", unit.symbol()),
    }
}

pub fn format_change(delta: &Delta) -> String {
    let absolute = match delta.unit {
        Unit::Celsius => format!("{:+.1}{}", delta.absolute_change, delta.unit.change_symbol()),
        _ => format!("{:+.1} {}", delta.absolute_change, delta.unit.change_symbol()),
    };
    match (delta.unit, delta.relative_change) {
        // Relative change of a temperature or a percentage reads as noise.
        (Unit::Celsius | Unit::Percent, _) | (_, None) => absolute,
        (_, Some(pct)) => format!("{absolute}, {pct:+.0}%"),
    }
}

/// "Average temperature rises sharply from 15.0°C to 17.8°C (+2.8°C)."
pub fn describe_change(delta: &Delta, tone: Tone) -> String {
    let sentence = format!(
        "{} {} from {} to {} ({}).",
        delta.metric.label(),
        tone.change_verb(delta.direction()),
        format_value(delta.current_value, delta.unit),
        format_value(delta.future_value, delta.unit),
        format_change(delta)
    );
    capitalize(&sentence)
}

pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deltas::MetricId;

    #[test]
    fn tone_is_a_pure_lookup_on_tier() {
        assert_eq!(Tone::for_tier(SeverityTier::High), Tone::Direct);
        assert_eq!(Tone::for_tier(SeverityTier::Moderate), Tone::Measured);
        assert_eq!(Tone::for_tier(SeverityTier::Low), Tone::Mild);
    }

    #[test]
    fn describes_temperature_change() {
        let delta = Delta::between(MetricId::TemperatureMean, 15.0, 17.8);
        assert_eq!(
            describe_change(&delta, Tone::Direct),
            "Average temperature rises sharply from 15.0°C to 17.8°C (+2.8°C)."
        );
    }

    #[test]
    fn describes_rainfall_with_relative_change() {
        let delta = Delta::between(MetricId::PrecipitationAnnual, 800.0, 820.0);
        assert_eq!(
            describe_change(&delta, Tone::Mild),
            "Annual rainfall edges up from 800.0 mm to 820.0 mm (+20.0 mm, +2%)."
        );
    }

    #[test]
    fn humidity_changes_in_points() {
        let delta = Delta::between(MetricId::HumidityMax, 85.0, 90.0);
        assert_eq!(format_change(&delta), "+5.0 pp");
    }

    #[test]
    fn capitalize_handles_empty() {
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("winter"), "Winter");
    }
}
