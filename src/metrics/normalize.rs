use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{DataValidationError, ValidationProblem};
use crate::metrics::raw::{RawClimateRecord, RawLocation, RawSeason, RawSnapshot};
use crate::metrics::{
    Accumulation, ClimateSnapshot, ExtremeFrequencies, ExtremeSupport, HumidityRange, Location,
    ProjectionMetadata, ProjectionWindow, Season, SeasonStats, SnapshotPair, TemperatureStats,
    Window,
};

const TEMPERATURE_RANGE: (f64, f64) = (-90.0, 60.0);
const PERCENT_RANGE: (f64, f64) = (0.0, 100.0);
const NON_NEGATIVE: (f64, f64) = (0.0, f64::INFINITY);
const UNBOUNDED: (f64, f64) = (f64::NEG_INFINITY, f64::INFINITY);
const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);
const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);
const DEFAULT_SPAN_YEARS: u32 = 5;

type FieldResult<T> = Result<T, DataValidationError>;

/// Reads raw optional values for one window (or the record itself) and turns
/// gaps or implausible values into named errors.
struct FieldReader {
    window: Option<Window>,
}

impl FieldReader {
    fn error(&self, field: &str, problem: ValidationProblem) -> DataValidationError {
        DataValidationError::new(self.window, field, problem)
    }

    fn required(&self, field: &str, value: Option<f64>, range: (f64, f64)) -> FieldResult<f64> {
        let value = value.ok_or_else(|| self.error(field, ValidationProblem::Missing))?;
        self.check(field, value, range)
    }

    fn optional(
        &self,
        field: &str,
        value: Option<f64>,
        range: (f64, f64),
    ) -> FieldResult<Option<f64>> {
        value.map(|v| self.check(field, v, range)).transpose()
    }

    fn check(&self, field: &str, value: f64, (min, max): (f64, f64)) -> FieldResult<f64> {
        if !value.is_finite() {
            return Err(self.error(field, ValidationProblem::NonFinite));
        }
        if value < min || value > max {
            return Err(self.error(
                field,
                ValidationProblem::OutOfRange { value, min, max },
            ));
        }
        Ok(value)
    }

    fn inconsistent(&self, field: &str, detail: impl Into<String>) -> DataValidationError {
        self.error(
            field,
            ValidationProblem::Inconsistent {
                detail: detail.into(),
            },
        )
    }
}

pub fn normalize_record(raw: &RawClimateRecord) -> FieldResult<SnapshotPair> {
    let record = FieldReader { window: None };

    let location = raw
        .location
        .as_ref()
        .map(|loc| normalize_location(&record, loc))
        .transpose()?;
    let current = normalize_snapshot(Window::Current, &raw.current)?;
    let future = normalize_snapshot(Window::Future, &raw.future)?;

    if future.period.center_year <= current.period.center_year {
        return Err(FieldReader {
            window: Some(Window::Future),
        }
        .inconsistent(
            "window.center_year",
            format!(
                "future window ({}) must be centered after the current window ({})",
                future.period.center_year, current.period.center_year
            ),
        ));
    }

    let extreme_support = ExtremeSupport {
        heat: raw
            .extreme_support
            .heat
            .ok_or_else(|| DataValidationError::missing(None, "extreme_support.heat"))?,
        precipitation: raw
            .extreme_support
            .precipitation
            .ok_or_else(|| DataValidationError::missing(None, "extreme_support.precipitation"))?,
        wind: raw
            .extreme_support
            .wind
            .ok_or_else(|| DataValidationError::missing(None, "extreme_support.wind"))?,
    };

    let metadata = ProjectionMetadata {
        model_agreement: raw
            .metadata
            .model_agreement
            .ok_or_else(|| DataValidationError::missing(None, "metadata.model_agreement"))?,
        interannual_variability: record.optional(
            "metadata.interannual_variability",
            raw.metadata.interannual_variability,
            NON_NEGATIVE,
        )?,
        trend_per_decade: record.optional(
            "metadata.trend_per_decade",
            raw.metadata.trend_per_decade,
            UNBOUNDED,
        )?,
        models: raw
            .metadata
            .models
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect(),
    };

    debug!(
        location = location.as_ref().map(|l| l.name.as_str()).unwrap_or("-"),
        current_year = current.period.center_year,
        future_year = future.period.center_year,
        "normalized snapshot pair"
    );

    Ok(SnapshotPair {
        location,
        current,
        future,
        extreme_support,
        metadata,
    })
}

fn normalize_location(reader: &FieldReader, raw: &RawLocation) -> FieldResult<Location> {
    let name = raw
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| reader.error("location.name", ValidationProblem::Missing))?;
    Ok(Location {
        name: name.to_string(),
        latitude: reader.required("location.latitude", raw.latitude, LATITUDE_RANGE)?,
        longitude: reader.required("location.longitude", raw.longitude, LONGITUDE_RANGE)?,
    })
}

pub fn normalize_snapshot(window: Window, raw: &RawSnapshot) -> FieldResult<ClimateSnapshot> {
    let reader = FieldReader {
        window: Some(window),
    };

    let center_year = raw
        .window
        .center_year
        .ok_or_else(|| reader.error("window.center_year", ValidationProblem::Missing))?;
    let span_years = raw.window.span_years.unwrap_or(DEFAULT_SPAN_YEARS);
    if span_years == 0 {
        return Err(reader.inconsistent("window.span_years", "window must span at least one year"));
    }

    let temperature = TemperatureStats {
        mean: reader.required("temperature_mean", raw.temperature_mean, TEMPERATURE_RANGE)?,
        max: reader.required("temperature_max", raw.temperature_max, TEMPERATURE_RANGE)?,
        min: reader.required("temperature_min", raw.temperature_min, TEMPERATURE_RANGE)?,
    };
    if !(temperature.min <= temperature.mean && temperature.mean <= temperature.max) {
        return Err(reader.inconsistent(
            "temperature_mean",
            format!(
                "expected min <= mean <= max, got {} / {} / {}",
                temperature.min, temperature.mean, temperature.max
            ),
        ));
    }

    let precipitation = Accumulation {
        annual: reader.required(
            "precipitation_annual",
            raw.precipitation_annual,
            NON_NEGATIVE,
        )?,
        monthly_max: reader.required(
            "precipitation_monthly_max",
            raw.precipitation_monthly_max,
            NON_NEGATIVE,
        )?,
    };

    let snowfall = match (
        reader.optional("snowfall_annual", raw.snowfall_annual, NON_NEGATIVE)?,
        reader.optional(
            "snowfall_monthly_max",
            raw.snowfall_monthly_max,
            NON_NEGATIVE,
        )?,
    ) {
        (Some(annual), Some(monthly_max)) => Some(Accumulation {
            annual,
            monthly_max,
        }),
        (None, None) => None,
        (Some(_), None) => {
            return Err(reader.error("snowfall_monthly_max", ValidationProblem::Missing))
        }
        (None, Some(_)) => return Err(reader.error("snowfall_annual", ValidationProblem::Missing)),
    };

    let humidity = HumidityRange {
        min: reader.required("humidity_min", raw.humidity_min, PERCENT_RANGE)?,
        max: reader.required("humidity_max", raw.humidity_max, PERCENT_RANGE)?,
    };
    if humidity.min > humidity.max {
        return Err(reader.inconsistent(
            "humidity_min",
            format!(
                "humidity min {} exceeds max {}",
                humidity.min, humidity.max
            ),
        ));
    }

    let cloud_cover = reader.required("cloud_cover", raw.cloud_cover, PERCENT_RANGE)?;
    let solar_radiation = reader.required("solar_radiation", raw.solar_radiation, NON_NEGATIVE)?;
    let wind_max = reader.required("wind_max", raw.wind_max, NON_NEGATIVE)?;

    let mut seasons = BTreeMap::new();
    for season in Season::ALL {
        let raw_season = match season {
            Season::Winter => raw.seasons.winter.as_ref(),
            Season::Spring => raw.seasons.spring.as_ref(),
            Season::Summer => raw.seasons.summer.as_ref(),
            Season::Autumn => raw.seasons.autumn.as_ref(),
        };
        let stats = normalize_season(&reader, season, raw_season)?;
        seasons.insert(season, stats);
    }

    let extremes = ExtremeFrequencies {
        hot_days: reader.required("extremes.hot_days", raw.extremes.hot_days, NON_NEGATIVE)?,
        heavy_rain_days: reader.required(
            "extremes.heavy_rain_days",
            raw.extremes.heavy_rain_days,
            NON_NEGATIVE,
        )?,
        high_wind_days: reader.required(
            "extremes.high_wind_days",
            raw.extremes.high_wind_days,
            NON_NEGATIVE,
        )?,
    };

    Ok(ClimateSnapshot {
        window,
        period: ProjectionWindow {
            center_year,
            span_years,
        },
        temperature,
        precipitation,
        snowfall,
        humidity,
        cloud_cover,
        solar_radiation,
        wind_max,
        seasons,
        extremes,
    })
}

fn normalize_season(
    reader: &FieldReader,
    season: Season,
    raw: Option<&RawSeason>,
) -> FieldResult<SeasonStats> {
    let prefix = format!("seasons.{season}");
    let raw = raw.ok_or_else(|| reader.error(&prefix, ValidationProblem::Missing))?;
    Ok(SeasonStats {
        temperature_mean: reader.required(
            &format!("{prefix}.temperature_mean"),
            raw.temperature_mean,
            TEMPERATURE_RANGE,
        )?,
        precipitation_total: reader.required(
            &format!("{prefix}.precipitation_total"),
            raw.precipitation_total,
            NON_NEGATIVE,
        )?,
        snowfall_total: reader.optional(
            &format!("{prefix}.snowfall_total"),
            raw.snowfall_total,
            NON_NEGATIVE,
        )?,
    })
}
