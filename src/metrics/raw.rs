use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::metrics::Confidence;

/// Input record as delivered by the data layer. Every field is optional at the
/// serde level so a missing key surfaces as a named validation error instead of
/// a generic parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawClimateRecord {
    #[serde(default)]
    pub location: Option<RawLocation>,
    #[serde(default)]
    pub current: RawSnapshot,
    #[serde(default)]
    pub future: RawSnapshot,
    #[serde(default)]
    pub extreme_support: RawExtremeSupport,
    #[serde(default)]
    pub metadata: RawMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawLocation {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawWindow {
    pub center_year: Option<i32>,
    pub span_years: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawSnapshot {
    #[serde(default)]
    pub window: RawWindow,
    pub temperature_mean: Option<f64>,
    pub temperature_max: Option<f64>,
    pub temperature_min: Option<f64>,
    pub precipitation_annual: Option<f64>,
    pub precipitation_monthly_max: Option<f64>,
    pub snowfall_annual: Option<f64>,
    pub snowfall_monthly_max: Option<f64>,
    pub humidity_min: Option<f64>,
    pub humidity_max: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub solar_radiation: Option<f64>,
    pub wind_max: Option<f64>,
    #[serde(default)]
    pub seasons: RawSeasons,
    #[serde(default)]
    pub extremes: RawExtremes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawSeasons {
    pub winter: Option<RawSeason>,
    pub spring: Option<RawSeason>,
    pub summer: Option<RawSeason>,
    #[serde(alias = "fall")]
    pub autumn: Option<RawSeason>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawSeason {
    pub temperature_mean: Option<f64>,
    pub precipitation_total: Option<f64>,
    pub snowfall_total: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawExtremes {
    pub hot_days: Option<f64>,
    pub heavy_rain_days: Option<f64>,
    pub high_wind_days: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawExtremeSupport {
    pub heat: Option<Confidence>,
    pub precipitation: Option<Confidence>,
    pub wind: Option<Confidence>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawMetadata {
    pub model_agreement: Option<Confidence>,
    pub interannual_variability: Option<f64>,
    pub trend_per_decade: Option<f64>,
    #[serde(default)]
    pub models: Vec<String>,
}

impl RawClimateRecord {
    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data).context("failed parsing climate record JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed reading climate record: {}", path.display()))?;
        Self::from_json(&data)
            .with_context(|| format!("invalid climate record: {}", path.display()))
    }

    /// Temperate mid-latitude sample used by `--sample` and the tests.
    pub fn sample() -> Self {
        let current = RawSnapshot {
            window: RawWindow {
                center_year: Some(2024),
                span_years: Some(5),
            },
            temperature_mean: Some(15.0),
            temperature_max: Some(31.0),
            temperature_min: Some(-2.0),
            precipitation_annual: Some(800.0),
            precipitation_monthly_max: Some(140.0),
            snowfall_annual: Some(12.0),
            snowfall_monthly_max: Some(6.0),
            humidity_min: Some(45.0),
            humidity_max: Some(85.0),
            cloud_cover: Some(55.0),
            solar_radiation: Some(14.0),
            wind_max: Some(40.0),
            seasons: RawSeasons {
                winter: Some(RawSeason {
                    temperature_mean: Some(5.0),
                    precipitation_total: Some(230.0),
                    snowfall_total: Some(11.0),
                }),
                spring: Some(RawSeason {
                    temperature_mean: Some(13.0),
                    precipitation_total: Some(190.0),
                    snowfall_total: Some(1.0),
                }),
                summer: Some(RawSeason {
                    temperature_mean: Some(24.0),
                    precipitation_total: Some(160.0),
                    snowfall_total: Some(0.0),
                }),
                autumn: Some(RawSeason {
                    temperature_mean: Some(16.0),
                    precipitation_total: Some(220.0),
                    snowfall_total: Some(0.0),
                }),
            },
            extremes: RawExtremes {
                hot_days: Some(4.0),
                heavy_rain_days: Some(3.0),
                high_wind_days: Some(3.0),
            },
        };

        let future = RawSnapshot {
            window: RawWindow {
                center_year: Some(2045),
                span_years: Some(5),
            },
            temperature_mean: Some(17.8),
            temperature_max: Some(34.6),
            temperature_min: Some(0.2),
            precipitation_annual: Some(820.0),
            precipitation_monthly_max: Some(180.0),
            snowfall_annual: Some(5.0),
            snowfall_monthly_max: Some(3.0),
            humidity_min: Some(44.0),
            humidity_max: Some(90.0),
            cloud_cover: Some(54.0),
            solar_radiation: Some(14.3),
            wind_max: Some(41.0),
            seasons: RawSeasons {
                winter: Some(RawSeason {
                    temperature_mean: Some(7.4),
                    precipitation_total: Some(260.0),
                    snowfall_total: Some(4.5),
                }),
                spring: Some(RawSeason {
                    temperature_mean: Some(15.0),
                    precipitation_total: Some(195.0),
                    snowfall_total: Some(0.5),
                }),
                summer: Some(RawSeason {
                    temperature_mean: Some(27.1),
                    precipitation_total: Some(130.0),
                    snowfall_total: Some(0.0),
                }),
                autumn: Some(RawSeason {
                    temperature_mean: Some(18.4),
                    precipitation_total: Some(235.0),
                    snowfall_total: Some(0.0),
                }),
            },
            extremes: RawExtremes {
                hot_days: Some(11.0),
                heavy_rain_days: Some(5.0),
                high_wind_days: Some(3.2),
            },
        };

        Self {
            location: Some(RawLocation {
                name: Some("Lyon".to_string()),
                latitude: Some(45.76),
                longitude: Some(4.84),
            }),
            current,
            future,
            extreme_support: RawExtremeSupport {
                heat: Some(Confidence::High),
                precipitation: Some(Confidence::Medium),
                wind: Some(Confidence::Low),
            },
            metadata: RawMetadata {
                model_agreement: Some(Confidence::Medium),
                interannual_variability: Some(0.7),
                trend_per_decade: Some(0.13),
                models: vec!["MRI_AGCM3_2_S".to_string(), "EC_Earth3P_HR".to_string()],
            },
        }
    }
}
