use tracing::debug;

use crate::deltas::{Delta, DeltaSet, ExtremeEventMetric, MetricId, SeasonalMetric, SeasonalShift};
use crate::metrics::{Accumulation, ClimateSnapshot, ExtremeKind, Season, SnapshotPair};

/// Cutoffs for calling a season warmer/cooler or wetter/drier.
const SHIFT_TEMPERATURE_C: f64 = 1.0;
const SHIFT_PRECIPITATION_PCT: f64 = 10.0;

pub fn compute_deltas(pair: &SnapshotPair) -> DeltaSet {
    let current = &pair.current;
    let future = &pair.future;
    let mut deltas = Vec::new();

    let mut push = |metric: MetricId, from: f64, to: f64| {
        deltas.push(Delta::between(metric, from, to));
    };

    push(
        MetricId::TemperatureMean,
        current.temperature.mean,
        future.temperature.mean,
    );
    push(
        MetricId::TemperatureMax,
        current.temperature.max,
        future.temperature.max,
    );
    push(
        MetricId::TemperatureMin,
        current.temperature.min,
        future.temperature.min,
    );
    push(
        MetricId::PrecipitationAnnual,
        current.precipitation.annual,
        future.precipitation.annual,
    );
    push(
        MetricId::PrecipitationMonthlyMax,
        current.precipitation.monthly_max,
        future.precipitation.monthly_max,
    );
    if let Some((from, to)) = pair_snow(current.snowfall, future.snowfall, |s| s.annual) {
        push(MetricId::SnowfallAnnual, from, to);
    }
    if let Some((from, to)) = pair_snow(current.snowfall, future.snowfall, |s| s.monthly_max) {
        push(MetricId::SnowfallMonthlyMax, from, to);
    }
    // Bounds are compared independently so a narrowing range stays visible.
    push(MetricId::HumidityMin, current.humidity.min, future.humidity.min);
    push(MetricId::HumidityMax, current.humidity.max, future.humidity.max);
    push(MetricId::CloudCover, current.cloud_cover, future.cloud_cover);
    push(
        MetricId::SolarRadiation,
        current.solar_radiation,
        future.solar_radiation,
    );
    push(MetricId::WindMax, current.wind_max, future.wind_max);
    push(
        MetricId::HotDays,
        current.extremes.hot_days,
        future.extremes.hot_days,
    );
    push(
        MetricId::HeavyRainDays,
        current.extremes.heavy_rain_days,
        future.extremes.heavy_rain_days,
    );
    push(
        MetricId::HighWindDays,
        current.extremes.high_wind_days,
        future.extremes.high_wind_days,
    );

    let mut seasons = Vec::with_capacity(Season::ALL.len());
    for season in Season::ALL {
        let Some(metric) = seasonal_metric(season, current, future) else {
            continue;
        };
        deltas.push(metric.temperature.clone());
        deltas.push(metric.precipitation.clone());
        if let Some(snow) = &metric.snowfall {
            deltas.push(snow.clone());
        }
        seasons.push(metric);
    }

    deltas.sort_by(|a, b| a.metric.cmp(&b.metric));

    let extremes = ExtremeKind::ALL
        .iter()
        .filter_map(|kind| extreme_metric(*kind, &deltas, pair))
        .collect::<Vec<_>>();

    debug!(
        deltas = deltas.len(),
        seasons = seasons.len(),
        extremes = extremes.len(),
        "computed deltas"
    );

    DeltaSet {
        deltas,
        seasons,
        extremes,
    }
}

/// Snow that is not applicable in one window counts as zero there; absent in
/// both windows yields no comparison.
fn pair_snow(
    current: Option<Accumulation>,
    future: Option<Accumulation>,
    pick: impl Fn(&Accumulation) -> f64,
) -> Option<(f64, f64)> {
    match (current, future) {
        (None, None) => None,
        (from, to) => Some((
            from.as_ref().map(&pick).unwrap_or(0.0),
            to.as_ref().map(&pick).unwrap_or(0.0),
        )),
    }
}

fn seasonal_metric(
    season: Season,
    current: &ClimateSnapshot,
    future: &ClimateSnapshot,
) -> Option<SeasonalMetric> {
    let before = current.season(season)?;
    let after = future.season(season)?;

    let temperature = Delta::between(
        MetricId::SeasonalTemperature(season),
        before.temperature_mean,
        after.temperature_mean,
    );
    let precipitation = Delta::between(
        MetricId::SeasonalPrecipitation(season),
        before.precipitation_total,
        after.precipitation_total,
    );
    let snowfall = match (before.snowfall_total, after.snowfall_total) {
        (None, None) => None,
        (from, to) => Some(Delta::between(
            MetricId::SeasonalSnowfall(season),
            from.unwrap_or(0.0),
            to.unwrap_or(0.0),
        )),
    };
    let shift = classify_shift(&temperature, &precipitation);

    Some(SeasonalMetric {
        season,
        temperature,
        precipitation,
        snowfall,
        shift,
    })
}

pub fn classify_shift(temperature: &Delta, precipitation: &Delta) -> SeasonalShift {
    let warm = if temperature.absolute_change >= SHIFT_TEMPERATURE_C {
        1
    } else if temperature.absolute_change <= -SHIFT_TEMPERATURE_C {
        -1
    } else {
        0
    };
    let wet = match precipitation.relative_change {
        Some(pct) if pct >= SHIFT_PRECIPITATION_PCT => 1,
        Some(pct) if pct <= -SHIFT_PRECIPITATION_PCT => -1,
        Some(_) => 0,
        None if precipitation.absolute_change > 0.0 => 1,
        None => 0,
    };
    match (warm, wet) {
        (1, 1) => SeasonalShift::WarmerWetter,
        (1, -1) => SeasonalShift::WarmerDrier,
        (1, _) => SeasonalShift::Warmer,
        (-1, 1) => SeasonalShift::CoolerWetter,
        (-1, -1) => SeasonalShift::CoolerDrier,
        (-1, _) => SeasonalShift::Cooler,
        (_, 1) => SeasonalShift::Wetter,
        (_, -1) => SeasonalShift::Drier,
        _ => SeasonalShift::Stable,
    }
}

fn extreme_metric(
    kind: ExtremeKind,
    deltas: &[Delta],
    pair: &SnapshotPair,
) -> Option<ExtremeEventMetric> {
    let (frequency_id, intensity_id) = match kind {
        ExtremeKind::Heat => (MetricId::HotDays, MetricId::TemperatureMax),
        ExtremeKind::Precipitation => (MetricId::HeavyRainDays, MetricId::PrecipitationMonthlyMax),
        ExtremeKind::Wind => (MetricId::HighWindDays, MetricId::WindMax),
    };
    let find = |id: MetricId| deltas.iter().find(|d| d.metric == id).cloned();
    Some(ExtremeEventMetric {
        kind,
        frequency: find(frequency_id)?,
        intensity: find(intensity_id)?,
        support: pair.extreme_support.get(kind),
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::metrics::normalize::normalize_record;
    use crate::metrics::raw::RawClimateRecord;
    use crate::metrics::Confidence;

    fn sample_pair() -> SnapshotPair {
        normalize_record(&RawClimateRecord::sample()).expect("sample is valid")
    }

    #[test]
    fn one_delta_per_metric_in_id_order() {
        let set = compute_deltas(&sample_pair());
        // 15 scalar metrics + 4 seasons x (temperature, precipitation, snowfall)
        assert_eq!(set.len(), 27);
        let ids = set.deltas.iter().map(|d| d.metric).collect::<Vec<_>>();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(set.seasons.len(), 4);
        assert_eq!(set.extremes.len(), 3);
    }

    #[test]
    fn temperature_mean_delta_matches_inputs() {
        let set = compute_deltas(&sample_pair());
        let delta = set.get(MetricId::TemperatureMean).expect("present");
        assert_relative_eq!(delta.absolute_change, 2.8, epsilon = 1e-9);
        assert_relative_eq!(delta.current_value, 15.0);
        assert_relative_eq!(delta.future_value, 17.8);
    }

    #[test]
    fn humidity_bounds_are_compared_independently() {
        let set = compute_deltas(&sample_pair());
        let min = set.get(MetricId::HumidityMin).expect("min");
        let max = set.get(MetricId::HumidityMax).expect("max");
        assert!(min.is_decrease());
        assert!(max.is_increase());
    }

    #[test]
    fn snow_absent_in_both_windows_emits_nothing() {
        let mut pair = sample_pair();
        pair.current.snowfall = None;
        pair.future.snowfall = None;
        let set = compute_deltas(&pair);
        assert!(!set.contains(MetricId::SnowfallAnnual));
        assert!(!set.contains(MetricId::SnowfallMonthlyMax));
    }

    #[test]
    fn snow_disappearing_compares_against_zero() {
        let mut pair = sample_pair();
        pair.future.snowfall = None;
        let set = compute_deltas(&pair);
        let delta = set.get(MetricId::SnowfallAnnual).expect("present");
        assert_relative_eq!(delta.future_value, 0.0);
        assert_relative_eq!(delta.relative_change.unwrap(), -100.0, epsilon = 1e-9);
    }

    #[test]
    fn emerging_snow_has_undefined_relative_change() {
        let mut pair = sample_pair();
        pair.current.snowfall = None;
        let set = compute_deltas(&pair);
        let delta = set.get(MetricId::SnowfallAnnual).expect("present");
        assert!(delta.relative_change.is_none());
    }

    #[test]
    fn seasonal_shift_reads_temperature_and_rain() {
        let set = compute_deltas(&sample_pair());
        assert_eq!(
            set.season(Season::Summer).unwrap().shift,
            SeasonalShift::WarmerDrier
        );
        assert_eq!(
            set.season(Season::Winter).unwrap().shift,
            SeasonalShift::WarmerWetter
        );
        assert_eq!(set.season(Season::Spring).unwrap().shift, SeasonalShift::Warmer);
    }

    #[test]
    fn extremes_carry_frequency_intensity_and_support() {
        let set = compute_deltas(&sample_pair());
        let heat = set.extreme(ExtremeKind::Heat).expect("heat");
        assert_eq!(heat.frequency.metric, MetricId::HotDays);
        assert_eq!(heat.intensity.metric, MetricId::TemperatureMax);
        assert_eq!(heat.support, Confidence::High);
        let wind = set.extreme(ExtremeKind::Wind).expect("wind");
        assert_eq!(wind.support, Confidence::Low);
    }

    #[test]
    fn identical_pairs_give_identical_deltas() {
        let pair = sample_pair();
        assert_eq!(compute_deltas(&pair), compute_deltas(&pair.clone()));
    }
}
