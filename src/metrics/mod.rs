pub mod normalize;
pub mod raw;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    Current,
    Future,
}

impl Window {
    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Future => "future",
        }
    }
}

impl Display for Window {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

/// Meteorological seasons (northern convention: winter = Dec-Feb).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub const ALL: [Season; 4] = [
        Season::Winter,
        Season::Spring,
        Season::Summer,
        Season::Autumn,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
        }
    }
}

impl Display for Season {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Error)]
#[error("unknown season: {0}")]
pub struct SeasonParseError(pub String);

impl FromStr for Season {
    type Err = SeasonParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "winter" => Ok(Self::Winter),
            "spring" => Ok(Self::Spring),
            "summer" => Ok(Self::Summer),
            "autumn" | "fall" => Ok(Self::Autumn),
            _ => Err(SeasonParseError(s.to_string())),
        }
    }
}

/// Ordinal confidence / support level, `Low < Medium < High`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Display for Confidence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ExtremeKind {
    Heat,
    Precipitation,
    Wind,
}

impl ExtremeKind {
    pub const ALL: [ExtremeKind; 3] = [
        ExtremeKind::Heat,
        ExtremeKind::Precipitation,
        ExtremeKind::Wind,
    ];
}

impl Display for ExtremeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Heat => "heat",
            Self::Precipitation => "precipitation",
            Self::Wind => "wind",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProjectionWindow {
    pub center_year: i32,
    pub span_years: u32,
}

impl ProjectionWindow {
    pub fn first_year(&self) -> i32 {
        self.center_year - (self.span_years as i32) / 2
    }

    pub fn last_year(&self) -> i32 {
        self.center_year + (self.span_years as i32) / 2
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TemperatureStats {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

/// Accumulated quantity (precipitation in mm, snowfall in cm).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Accumulation {
    pub annual: f64,
    pub monthly_max: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HumidityRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SeasonStats {
    pub temperature_mean: f64,
    pub precipitation_total: f64,
    /// `None` = not applicable (no snow regime), never a stand-in for zero.
    pub snowfall_total: Option<f64>,
}

/// Days per year above the window's 95th percentile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExtremeFrequencies {
    pub hot_days: f64,
    pub heavy_rain_days: f64,
    pub high_wind_days: f64,
}

impl ExtremeFrequencies {
    pub fn get(&self, kind: ExtremeKind) -> f64 {
        match kind {
            ExtremeKind::Heat => self.hot_days,
            ExtremeKind::Precipitation => self.heavy_rain_days,
            ExtremeKind::Wind => self.high_wind_days,
        }
    }
}

/// Canonical, validated climate metrics for one projection window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClimateSnapshot {
    pub window: Window,
    pub period: ProjectionWindow,
    pub temperature: TemperatureStats,
    pub precipitation: Accumulation,
    /// `None` = not applicable.
    pub snowfall: Option<Accumulation>,
    pub humidity: HumidityRange,
    pub cloud_cover: f64,
    pub solar_radiation: f64,
    pub wind_max: f64,
    pub seasons: BTreeMap<Season, SeasonStats>,
    pub extremes: ExtremeFrequencies,
}

impl ClimateSnapshot {
    pub fn seasonal_temperature(&self) -> BTreeMap<Season, f64> {
        self.seasons
            .iter()
            .map(|(season, stats)| (*season, stats.temperature_mean))
            .collect()
    }

    pub fn season(&self, season: Season) -> Option<&SeasonStats> {
        self.seasons.get(&season)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExtremeSupport {
    pub heat: Confidence,
    pub precipitation: Confidence,
    pub wind: Confidence,
}

impl ExtremeSupport {
    pub fn get(&self, kind: ExtremeKind) -> Confidence {
        match kind {
            ExtremeKind::Heat => self.heat,
            ExtremeKind::Precipitation => self.precipitation,
            ExtremeKind::Wind => self.wind,
        }
    }
}

/// Trend, variability and model-uncertainty context for the projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectionMetadata {
    pub model_agreement: Confidence,
    pub interannual_variability: Option<f64>,
    pub trend_per_decade: Option<f64>,
    pub models: Vec<String>,
}

/// Normalized input for one run: both snapshots plus their shared context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotPair {
    pub location: Option<Location>,
    pub current: ClimateSnapshot,
    pub future: ClimateSnapshot,
    pub extreme_support: ExtremeSupport,
    pub metadata: ProjectionMetadata,
}

impl SnapshotPair {
    pub fn location_name(&self) -> Option<&str> {
        self.location.as_ref().map(|l| l.name.as_str())
    }

    pub fn horizon_years(&self) -> i32 {
        self.future.period.center_year - self.current.period.center_year
    }
}
