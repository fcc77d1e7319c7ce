//! Rules table mapping change magnitude to a severity tier, one rule per
//! metric family. The cutoffs are configuration: they are loaded from the
//! `[thresholds]` section of the config file and default to the values below.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deltas::{Delta, MetricFamily};
use crate::severity::SeverityTier;

/// Magnitudes below `moderate` are Low, up to and including `high` Moderate,
/// above `high` High.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Band {
    pub moderate: f64,
    pub high: f64,
}

impl Band {
    pub const fn new(moderate: f64, high: f64) -> Self {
        Self { moderate, high }
    }

    pub fn tier(&self, magnitude: f64) -> SeverityTier {
        if magnitude > self.high {
            SeverityTier::High
        } else if magnitude >= self.moderate {
            SeverityTier::Moderate
        } else {
            SeverityTier::Low
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ThresholdRule {
    /// Band on |absolute change| in the metric's unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute: Option<Band>,
    /// Band on |relative change| in percent; skipped when the relative change
    /// is undefined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative: Option<Band>,
}

impl ThresholdRule {
    pub const fn absolute(moderate: f64, high: f64) -> Self {
        Self {
            absolute: Some(Band::new(moderate, high)),
            relative: None,
        }
    }

    pub const fn relative(moderate: f64, high: f64) -> Self {
        Self {
            absolute: None,
            relative: Some(Band::new(moderate, high)),
        }
    }

    pub const fn both(absolute: Band, relative: Band) -> Self {
        Self {
            absolute: Some(absolute),
            relative: Some(relative),
        }
    }

    /// Higher of the absolute and relative tiers.
    pub fn tier(&self, delta: &Delta) -> SeverityTier {
        let by_absolute = self
            .absolute
            .map(|band| band.tier(delta.absolute_change.abs()))
            .unwrap_or(SeverityTier::Low);
        let by_relative = match (self.relative, delta.relative_change) {
            (Some(band), Some(pct)) => band.tier(pct.abs()),
            _ => SeverityTier::Low,
        };
        by_absolute.max(by_relative)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("threshold rule for {0} has neither an absolute nor a relative band")]
    EmptyRule(MetricFamily),
    #[error("threshold band for {family} ({basis}) is not finite and non-negative")]
    InvalidBand {
        family: MetricFamily,
        basis: &'static str,
    },
    #[error("threshold band for {family} ({basis}) has moderate {moderate} above high {high}")]
    InvertedBand {
        family: MetricFamily,
        basis: &'static str,
        moderate: f64,
        high: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdTable {
    pub temperature: ThresholdRule,
    pub temperature_extreme: ThresholdRule,
    pub precipitation: ThresholdRule,
    pub precipitation_intensity: ThresholdRule,
    pub snowfall: ThresholdRule,
    pub humidity: ThresholdRule,
    pub cloud_cover: ThresholdRule,
    pub solar_radiation: ThresholdRule,
    pub wind: ThresholdRule,
    pub extreme_frequency: ThresholdRule,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            temperature: ThresholdRule::absolute(1.0, 2.5),
            temperature_extreme: ThresholdRule::absolute(1.5, 3.0),
            precipitation: ThresholdRule::relative(10.0, 25.0),
            precipitation_intensity: ThresholdRule::relative(15.0, 40.0),
            snowfall: ThresholdRule::both(Band::new(5.0, 20.0), Band::new(20.0, 50.0)),
            humidity: ThresholdRule::absolute(3.0, 8.0),
            cloud_cover: ThresholdRule::absolute(3.0, 8.0),
            solar_radiation: ThresholdRule::relative(3.0, 8.0),
            wind: ThresholdRule::relative(5.0, 15.0),
            extreme_frequency: ThresholdRule::both(Band::new(2.0, 6.0), Band::new(25.0, 75.0)),
        }
    }
}

impl ThresholdTable {
    pub fn rule(&self, family: MetricFamily) -> &ThresholdRule {
        match family {
            MetricFamily::Temperature => &self.temperature,
            MetricFamily::TemperatureExtreme => &self.temperature_extreme,
            MetricFamily::Precipitation => &self.precipitation,
            MetricFamily::PrecipitationIntensity => &self.precipitation_intensity,
            MetricFamily::Snowfall => &self.snowfall,
            MetricFamily::Humidity => &self.humidity,
            MetricFamily::CloudCover => &self.cloud_cover,
            MetricFamily::SolarRadiation => &self.solar_radiation,
            MetricFamily::Wind => &self.wind,
            MetricFamily::ExtremeFrequency => &self.extreme_frequency,
        }
    }

    pub fn validate(&self) -> Result<(), ThresholdError> {
        for family in MetricFamily::ALL {
            let rule = self.rule(family);
            if rule.absolute.is_none() && rule.relative.is_none() {
                return Err(ThresholdError::EmptyRule(family));
            }
            for (basis, band) in [("absolute", rule.absolute), ("relative", rule.relative)] {
                let Some(band) = band else {
                    continue;
                };
                let valid = |v: f64| v.is_finite() && v >= 0.0;
                if !valid(band.moderate) || !valid(band.high) {
                    return Err(ThresholdError::InvalidBand { family, basis });
                }
                if band.moderate > band.high {
                    return Err(ThresholdError::InvertedBand {
                        family,
                        basis,
                        moderate: band.moderate,
                        high: band.high,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deltas::MetricId;

    #[test]
    fn band_edges_follow_documented_policy() {
        let band = Band::new(1.0, 2.5);
        assert_eq!(band.tier(0.99), SeverityTier::Low);
        assert_eq!(band.tier(1.0), SeverityTier::Moderate);
        assert_eq!(band.tier(2.5), SeverityTier::Moderate);
        assert_eq!(band.tier(2.51), SeverityTier::High);
    }

    #[test]
    fn default_table_is_valid() {
        assert_eq!(ThresholdTable::default().validate(), Ok(()));
    }

    #[test]
    fn inverted_band_is_rejected() {
        let mut table = ThresholdTable::default();
        table.wind = ThresholdRule::relative(20.0, 10.0);
        assert!(matches!(
            table.validate(),
            Err(ThresholdError::InvertedBand {
                family: MetricFamily::Wind,
                ..
            })
        ));
    }

    #[test]
    fn empty_rule_is_rejected() {
        let mut table = ThresholdTable::default();
        table.humidity = ThresholdRule::default();
        assert_eq!(
            table.validate(),
            Err(ThresholdError::EmptyRule(MetricFamily::Humidity))
        );
    }

    #[test]
    fn negative_band_is_rejected() {
        let mut table = ThresholdTable::default();
        table.cloud_cover = ThresholdRule::absolute(-1.0, 3.0);
        assert!(matches!(
            table.validate(),
            Err(ThresholdError::InvalidBand { .. })
        ));
    }

    #[test]
    fn undefined_relative_change_falls_back_to_absolute_band() {
        let table = ThresholdTable::default();
        let delta = Delta::between(MetricId::SnowfallAnnual, 0.0, 25.0);
        assert!(delta.relative_change.is_none());
        assert_eq!(table.snowfall.tier(&delta), SeverityTier::High);

        let rain = Delta::between(MetricId::PrecipitationAnnual, 0.0, 25.0);
        assert_eq!(table.precipitation.tier(&rain), SeverityTier::Low);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let table: ThresholdTable = toml::from_str(
            r#"
[temperature]
absolute = { moderate = 0.5, high = 2.0 }
"#,
        )
        .expect("valid toml");
        assert_eq!(table.temperature, ThresholdRule::absolute(0.5, 2.0));
        assert_eq!(table.wind, ThresholdTable::default().wind);
    }
}
