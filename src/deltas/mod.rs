pub mod compute;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::{Confidence, ExtremeKind, Season};

pub use compute::compute_deltas;

/// Every comparable quantity of a snapshot pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(into = "String", try_from = "String")]
pub enum MetricId {
    TemperatureMean,
    TemperatureMax,
    TemperatureMin,
    PrecipitationAnnual,
    PrecipitationMonthlyMax,
    SnowfallAnnual,
    SnowfallMonthlyMax,
    HumidityMin,
    HumidityMax,
    CloudCover,
    SolarRadiation,
    WindMax,
    HotDays,
    HeavyRainDays,
    HighWindDays,
    SeasonalTemperature(Season),
    SeasonalPrecipitation(Season),
    SeasonalSnowfall(Season),
}

/// Metric families share a unit, a relative-change epsilon and a threshold rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MetricFamily {
    Temperature,
    TemperatureExtreme,
    Precipitation,
    PrecipitationIntensity,
    Snowfall,
    Humidity,
    CloudCover,
    SolarRadiation,
    Wind,
    ExtremeFrequency,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 10] = [
        MetricFamily::Temperature,
        MetricFamily::TemperatureExtreme,
        MetricFamily::Precipitation,
        MetricFamily::PrecipitationIntensity,
        MetricFamily::Snowfall,
        MetricFamily::Humidity,
        MetricFamily::CloudCover,
        MetricFamily::SolarRadiation,
        MetricFamily::Wind,
        MetricFamily::ExtremeFrequency,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::TemperatureExtreme => "temperature_extreme",
            Self::Precipitation => "precipitation",
            Self::PrecipitationIntensity => "precipitation_intensity",
            Self::Snowfall => "snowfall",
            Self::Humidity => "humidity",
            Self::CloudCover => "cloud_cover",
            Self::SolarRadiation => "solar_radiation",
            Self::Wind => "wind",
            Self::ExtremeFrequency => "extreme_frequency",
        }
    }

    /// Below this |current| the relative change is left undefined.
    pub fn relative_epsilon(&self) -> f64 {
        match self {
            Self::Temperature | Self::TemperatureExtreme => 1.0,
            Self::Precipitation | Self::PrecipitationIntensity => 1.0,
            Self::Snowfall => 0.5,
            Self::Humidity | Self::CloudCover => 1.0,
            Self::SolarRadiation | Self::Wind | Self::ExtremeFrequency => 0.1,
        }
    }
}

impl Display for MetricFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Celsius,
    Millimetres,
    Centimetres,
    Percent,
    MegajoulesPerSquareMetre,
    KilometresPerHour,
    DaysPerYear,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Millimetres => "mm",
            Self::Centimetres => "cm",
            Self::Percent => "%",
            Self::MegajoulesPerSquareMetre => "MJ/m²",
            Self::KilometresPerHour => "km/h",
            Self::DaysPerYear => "days/yr",
        }
    }

    /// Symbol for a difference; percentages change by percentage points.
    pub fn change_symbol(&self) -> &'static str {
        match self {
            Self::Percent => "pp",
            other => other.symbol(),
        }
    }
}

impl MetricId {
    pub fn family(&self) -> MetricFamily {
        match self {
            Self::TemperatureMean | Self::SeasonalTemperature(_) => MetricFamily::Temperature,
            Self::TemperatureMax | Self::TemperatureMin => MetricFamily::TemperatureExtreme,
            Self::PrecipitationAnnual | Self::SeasonalPrecipitation(_) => {
                MetricFamily::Precipitation
            }
            Self::PrecipitationMonthlyMax => MetricFamily::PrecipitationIntensity,
            Self::SnowfallAnnual | Self::SnowfallMonthlyMax | Self::SeasonalSnowfall(_) => {
                MetricFamily::Snowfall
            }
            Self::HumidityMin | Self::HumidityMax => MetricFamily::Humidity,
            Self::CloudCover => MetricFamily::CloudCover,
            Self::SolarRadiation => MetricFamily::SolarRadiation,
            Self::WindMax => MetricFamily::Wind,
            Self::HotDays | Self::HeavyRainDays | Self::HighWindDays => {
                MetricFamily::ExtremeFrequency
            }
        }
    }

    pub fn unit(&self) -> Unit {
        match self.family() {
            MetricFamily::Temperature | MetricFamily::TemperatureExtreme => Unit::Celsius,
            MetricFamily::Precipitation | MetricFamily::PrecipitationIntensity => Unit::Millimetres,
            MetricFamily::Snowfall => Unit::Centimetres,
            MetricFamily::Humidity | MetricFamily::CloudCover => Unit::Percent,
            MetricFamily::SolarRadiation => Unit::MegajoulesPerSquareMetre,
            MetricFamily::Wind => Unit::KilometresPerHour,
            MetricFamily::ExtremeFrequency => Unit::DaysPerYear,
        }
    }

    pub fn season(&self) -> Option<Season> {
        match self {
            Self::SeasonalTemperature(s)
            | Self::SeasonalPrecipitation(s)
            | Self::SeasonalSnowfall(s) => Some(*s),
            _ => None,
        }
    }

    /// Human-readable noun phrase used when slot-filling narrative text.
    pub fn label(&self) -> String {
        match self {
            Self::TemperatureMean => "average temperature".to_string(),
            Self::TemperatureMax => "hottest-day temperature".to_string(),
            Self::TemperatureMin => "coldest-night temperature".to_string(),
            Self::PrecipitationAnnual => "annual rainfall".to_string(),
            Self::PrecipitationMonthlyMax => "wettest-month rainfall".to_string(),
            Self::SnowfallAnnual => "annual snowfall".to_string(),
            Self::SnowfallMonthlyMax => "snowiest-month snowfall".to_string(),
            Self::HumidityMin => "lowest relative humidity".to_string(),
            Self::HumidityMax => "peak relative humidity".to_string(),
            Self::CloudCover => "cloud cover".to_string(),
            Self::SolarRadiation => "daily sunshine energy".to_string(),
            Self::WindMax => "strongest winds".to_string(),
            Self::HotDays => "extreme heat days".to_string(),
            Self::HeavyRainDays => "heavy rain events".to_string(),
            Self::HighWindDays => "high wind days".to_string(),
            Self::SeasonalTemperature(s) => format!("{s} average temperature"),
            Self::SeasonalPrecipitation(s) => format!("{s} rainfall"),
            Self::SeasonalSnowfall(s) => format!("{s} snowfall"),
        }
    }
}

impl Display for MetricId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TemperatureMean => write!(f, "temperature_mean"),
            Self::TemperatureMax => write!(f, "temperature_max"),
            Self::TemperatureMin => write!(f, "temperature_min"),
            Self::PrecipitationAnnual => write!(f, "precipitation_annual"),
            Self::PrecipitationMonthlyMax => write!(f, "precipitation_monthly_max"),
            Self::SnowfallAnnual => write!(f, "snowfall_annual"),
            Self::SnowfallMonthlyMax => write!(f, "snowfall_monthly_max"),
            Self::HumidityMin => write!(f, "humidity_min"),
            Self::HumidityMax => write!(f, "humidity_max"),
            Self::CloudCover => write!(f, "cloud_cover"),
            Self::SolarRadiation => write!(f, "solar_radiation"),
            Self::WindMax => write!(f, "wind_max"),
            Self::HotDays => write!(f, "hot_days"),
            Self::HeavyRainDays => write!(f, "heavy_rain_days"),
            Self::HighWindDays => write!(f, "high_wind_days"),
            Self::SeasonalTemperature(s) => write!(f, "seasonal_temperature.{s}"),
            Self::SeasonalPrecipitation(s) => write!(f, "seasonal_precipitation.{s}"),
            Self::SeasonalSnowfall(s) => write!(f, "seasonal_snowfall.{s}"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown metric id: {0}")]
pub struct MetricIdParseError(pub String);

impl FromStr for MetricId {
    type Err = MetricIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        if let Some((prefix, season)) = normalized.split_once('.') {
            let season =
                Season::from_str(season).map_err(|_| MetricIdParseError(s.to_string()))?;
            return match prefix {
                "seasonal_temperature" => Ok(Self::SeasonalTemperature(season)),
                "seasonal_precipitation" => Ok(Self::SeasonalPrecipitation(season)),
                "seasonal_snowfall" => Ok(Self::SeasonalSnowfall(season)),
                _ => Err(MetricIdParseError(s.to_string())),
            };
        }
        let id = match normalized.as_str() {
            "temperature_mean" | "temp_mean" => Self::TemperatureMean,
            "temperature_max" | "temp_max" => Self::TemperatureMax,
            "temperature_min" | "temp_min" => Self::TemperatureMin,
            "precipitation_annual" | "precip_annual" => Self::PrecipitationAnnual,
            "precipitation_monthly_max" | "precip_monthly_max" => Self::PrecipitationMonthlyMax,
            "snowfall_annual" | "snow_annual" => Self::SnowfallAnnual,
            "snowfall_monthly_max" | "snow_monthly_max" => Self::SnowfallMonthlyMax,
            "humidity_min" => Self::HumidityMin,
            "humidity_max" => Self::HumidityMax,
            "cloud_cover" => Self::CloudCover,
            "solar_radiation" | "radiation" => Self::SolarRadiation,
            "wind_max" => Self::WindMax,
            "hot_days" => Self::HotDays,
            "heavy_rain_days" => Self::HeavyRainDays,
            "high_wind_days" => Self::HighWindDays,
            _ => return Err(MetricIdParseError(s.to_string())),
        };
        Ok(id)
    }
}

impl From<MetricId> for String {
    fn from(value: MetricId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for MetricId {
    type Error = MetricIdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MetricId::from_str(&value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increase,
    Decrease,
    Unchanged,
}

/// Change of one metric between the current and future window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delta {
    pub metric: MetricId,
    pub current_value: f64,
    pub future_value: f64,
    pub absolute_change: f64,
    /// Percent of the current value; `None` when the current value is too
    /// close to zero for a ratio to mean anything.
    pub relative_change: Option<f64>,
    pub unit: Unit,
}

impl Delta {
    pub fn between(metric: MetricId, current_value: f64, future_value: f64) -> Self {
        let absolute_change = future_value - current_value;
        let relative_change = if current_value.abs() > metric.family().relative_epsilon() {
            Some(absolute_change / current_value.abs() * 100.0)
        } else {
            None
        };
        Self {
            metric,
            current_value,
            future_value,
            absolute_change,
            relative_change,
            unit: metric.unit(),
        }
    }

    pub fn direction(&self) -> Direction {
        if self.absolute_change > f64::EPSILON {
            Direction::Increase
        } else if self.absolute_change < -f64::EPSILON {
            Direction::Decrease
        } else {
            Direction::Unchanged
        }
    }

    pub fn is_increase(&self) -> bool {
        self.direction() == Direction::Increase
    }

    pub fn is_decrease(&self) -> bool {
        self.direction() == Direction::Decrease
    }
}

/// Qualitative reading of one season's temperature and rainfall changes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalShift {
    WarmerWetter,
    WarmerDrier,
    Warmer,
    CoolerWetter,
    CoolerDrier,
    Cooler,
    Wetter,
    Drier,
    Stable,
}

impl SeasonalShift {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::WarmerWetter => "warmer and wetter",
            Self::WarmerDrier => "warmer and drier",
            Self::Warmer => "warmer",
            Self::CoolerWetter => "cooler and wetter",
            Self::CoolerDrier => "cooler and drier",
            Self::Cooler => "cooler",
            Self::Wetter => "wetter",
            Self::Drier => "drier",
            Self::Stable => "broadly unchanged",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonalMetric {
    pub season: Season,
    pub temperature: Delta,
    pub precipitation: Delta,
    pub snowfall: Option<Delta>,
    pub shift: SeasonalShift,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtremeEventMetric {
    pub kind: ExtremeKind,
    pub frequency: Delta,
    pub intensity: Delta,
    pub support: Confidence,
}

/// All deltas of one run, in `MetricId` order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeltaSet {
    pub deltas: Vec<Delta>,
    pub seasons: Vec<SeasonalMetric>,
    pub extremes: Vec<ExtremeEventMetric>,
}

impl DeltaSet {
    pub fn get(&self, metric: MetricId) -> Option<&Delta> {
        self.deltas.iter().find(|d| d.metric == metric)
    }

    pub fn contains(&self, metric: MetricId) -> bool {
        self.get(metric).is_some()
    }

    pub fn extreme(&self, kind: ExtremeKind) -> Option<&ExtremeEventMetric> {
        self.extremes.iter().find(|e| e.kind == kind)
    }

    pub fn season(&self, season: Season) -> Option<&SeasonalMetric> {
        self.seasons.iter().find(|s| s.season == season)
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}
