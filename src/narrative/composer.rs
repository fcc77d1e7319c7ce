use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::deltas::{Delta, DeltaSet, Direction, MetricId, SeasonalShift};
use crate::evidence::{flag_for, ClaimKind, EvidenceFlag};
use crate::metrics::{Confidence, ExtremeKind, Season, SnapshotPair};
use crate::narrative::tone::{capitalize, describe_change, format_change};
use crate::narrative::{Backing, ContentUnit, NarrativeSection, SectionKind, Tone, UnitKind};
use crate::severity::{CompositeAssessment, CompositeKind, SeverityAssessment, SeverityTier};

pub const NO_CHANGE_CLAIM: &str = "no_significant_change";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComposerSettings {
    #[serde(default = "default_max_key_changes")]
    pub max_key_changes: usize,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            max_key_changes: default_max_key_changes(),
        }
    }
}

fn default_max_key_changes() -> usize {
    8
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposerSettingsError {
    #[error("max_key_changes must be at least 1")]
    NoKeyChanges,
}

impl ComposerSettings {
    /// A zero cap would turn notable changes into a no-change marker.
    pub fn validate(&self) -> Result<(), ComposerSettingsError> {
        if self.max_key_changes == 0 {
            return Err(ComposerSettingsError::NoKeyChanges);
        }
        Ok(())
    }
}

/// Tie-break order inside `key_changes` once severity is equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PriorityGroup {
    Temperature,
    PrecipitationAndExtremes,
    SeasonalShift,
    Secondary,
}

impl PriorityGroup {
    pub fn for_metric(metric: MetricId) -> Self {
        match metric {
            MetricId::TemperatureMean | MetricId::TemperatureMax | MetricId::TemperatureMin => {
                Self::Temperature
            }
            MetricId::PrecipitationAnnual
            | MetricId::PrecipitationMonthlyMax
            | MetricId::SnowfallAnnual
            | MetricId::SnowfallMonthlyMax
            | MetricId::WindMax
            | MetricId::HotDays
            | MetricId::HeavyRainDays
            | MetricId::HighWindDays => Self::PrecipitationAndExtremes,
            MetricId::SeasonalTemperature(_)
            | MetricId::SeasonalPrecipitation(_)
            | MetricId::SeasonalSnowfall(_) => Self::SeasonalShift,
            MetricId::HumidityMin
            | MetricId::HumidityMax
            | MetricId::CloudCover
            | MetricId::SolarRadiation => Self::Secondary,
        }
    }

    pub fn for_composite(kind: CompositeKind) -> Self {
        match kind {
            CompositeKind::Downpour => Self::PrecipitationAndExtremes,
            CompositeKind::HumidHeat => Self::Secondary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum KeyItem {
    Metric(MetricId),
    Composite(CompositeKind),
}

/// Read-only view over everything upstream produced for one run.
struct Facts<'a> {
    pair: &'a SnapshotPair,
    set: &'a DeltaSet,
    severity: &'a SeverityAssessment,
    flags: &'a [EvidenceFlag],
}

impl<'a> Facts<'a> {
    fn tier(&self, metric: MetricId) -> SeverityTier {
        self.severity.tier(metric).unwrap_or(SeverityTier::Low)
    }

    fn max_tier(&self, metrics: &[MetricId]) -> SeverityTier {
        metrics
            .iter()
            .map(|m| self.tier(*m))
            .max()
            .unwrap_or(SeverityTier::Low)
    }

    fn notable(&self, metric: MetricId) -> Option<(&'a Delta, SeverityTier)> {
        let set: &'a DeltaSet = self.set;
        let delta = set.get(metric)?;
        let tier = self.tier(metric);
        tier.is_notable().then_some((delta, tier))
    }

    fn rising(&self, metric: MetricId) -> Option<(&'a Delta, SeverityTier)> {
        self.notable(metric).filter(|(delta, _)| delta.is_increase())
    }

    fn falling(&self, metric: MetricId) -> Option<(&'a Delta, SeverityTier)> {
        self.notable(metric).filter(|(delta, _)| delta.is_decrease())
    }

    fn rising_among(&self, metrics: &[MetricId]) -> Vec<MetricId> {
        metrics
            .iter()
            .copied()
            .filter(|m| self.rising(*m).is_some())
            .collect()
    }

    fn supported(&self, claim: ClaimKind) -> Option<&'a EvidenceFlag> {
        let flags: &'a [EvidenceFlag] = self.flags;
        flag_for(flags, claim).filter(|flag| flag.supported)
    }

    fn composite(&self, kind: CompositeKind) -> Option<&'a CompositeAssessment> {
        let severity: &'a SeverityAssessment = self.severity;
        severity
            .composite(kind)
            .filter(|composite| composite.tier.is_notable())
    }

    /// "hottest-day temperature +3.6°C; extreme heat days +7.0 days/yr, +175%"
    fn detail(&self, metrics: &[MetricId]) -> String {
        metrics
            .iter()
            .filter_map(|m| self.set.get(*m))
            .map(|delta| format!("{} {}", delta.metric.label(), format_change(delta)))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Maps classified deltas and gated claims onto the eleven fixed sections.
/// Inputs are only read; every unit it emits names the deltas or the evidence
/// flag that back it.
#[derive(Debug, Clone, Default)]
pub struct SectionComposer {
    settings: ComposerSettings,
}

impl SectionComposer {
    pub fn new(settings: ComposerSettings) -> Self {
        Self { settings }
    }

    pub fn compose(
        &self,
        pair: &SnapshotPair,
        set: &DeltaSet,
        severity: &SeverityAssessment,
        flags: &[EvidenceFlag],
    ) -> Vec<NarrativeSection> {
        let facts = Facts {
            pair,
            set,
            severity,
            flags,
        };
        let sections = SectionKind::ALL
            .iter()
            .map(|kind| {
                let mut units = self.units_for(*kind, &facts);
                if units.is_empty() {
                    units.push(no_change(*kind));
                }
                NarrativeSection { kind: *kind, units }
            })
            .collect::<Vec<_>>();
        debug!(
            units = sections.iter().map(|s| s.units.len()).sum::<usize>(),
            empty = sections.iter().filter(|s| s.is_no_change()).count(),
            "composed sections"
        );
        sections
    }

    fn units_for(&self, kind: SectionKind, facts: &Facts<'_>) -> Vec<ContentUnit> {
        match kind {
            SectionKind::KeyChanges => self.key_changes(facts),
            SectionKind::DailyExperience => daily_experience(facts),
            SectionKind::EconomicImpacts => economic_impacts(facts),
            SectionKind::PhysicalHealth => physical_health(facts),
            SectionKind::EnvironmentChanges => environment_changes(facts),
            SectionKind::ComfortAnalysis => comfort_analysis(facts),
            SectionKind::EnergyImplications => energy_implications(facts),
            SectionKind::SeasonalDetails => seasonal_details(facts),
            SectionKind::OutdoorActivities => outdoor_activities(facts),
            SectionKind::AdaptationNeeds => adaptation_needs(facts),
            SectionKind::UncertaintyNotes => uncertainty_notes(facts),
        }
    }

    fn key_changes(&self, facts: &Facts<'_>) -> Vec<ContentUnit> {
        let mut items = facts
            .set
            .deltas
            .iter()
            .filter_map(|delta| {
                let tier = facts.tier(delta.metric);
                tier.is_notable().then_some((
                    tier,
                    PriorityGroup::for_metric(delta.metric),
                    KeyItem::Metric(delta.metric),
                ))
            })
            .chain(facts.severity.composites.iter().filter_map(|composite| {
                composite.tier.is_notable().then_some((
                    composite.tier,
                    PriorityGroup::for_composite(composite.kind),
                    KeyItem::Composite(composite.kind),
                ))
            }))
            .collect::<Vec<_>>();
        items.sort_by_key(|(tier, group, item)| (Reverse(*tier), *group, *item));
        items.truncate(self.settings.max_key_changes);

        items
            .into_iter()
            .filter_map(|(tier, _, item)| match item {
                KeyItem::Metric(metric) => facts.set.get(metric).map(|d| change_unit(d, tier)),
                KeyItem::Composite(kind) => {
                    facts.composite(kind).map(|c| composite_unit(c, facts))
                }
            })
            .collect()
    }
}

fn daily_experience(facts: &Facts<'_>) -> Vec<ContentUnit> {
    let mut units = [
        MetricId::TemperatureMean,
        MetricId::TemperatureMax,
        MetricId::TemperatureMin,
        MetricId::PrecipitationAnnual,
        MetricId::SnowfallAnnual,
        MetricId::CloudCover,
    ]
    .iter()
    .filter_map(|metric| {
        let (delta, tier) = facts.notable(*metric)?;
        let tail = daily_tail(*metric, delta.direction())?;
        Some(change_with(delta, tier, tail))
    })
    .collect::<Vec<_>>();

    if let Some(composite) = facts.composite(CompositeKind::HumidHeat) {
        units.push(composite_unit(composite, facts));
    }
    units
}

fn daily_tail(metric: MetricId, direction: Direction) -> Option<&'static str> {
    use Direction::{Decrease, Increase};
    let tail = match (metric, direction) {
        (MetricId::TemperatureMean, Increase) => "Ordinary days feel warmer than they do today.",
        (MetricId::TemperatureMean, Decrease) => "Ordinary days feel cooler than they do today.",
        (MetricId::TemperatureMax, Increase) => "Hot afternoons get hotter.",
        (MetricId::TemperatureMax, Decrease) => "Summer afternoons are less fierce.",
        (MetricId::TemperatureMin, Increase) => "Nights stay warmer.",
        (MetricId::TemperatureMin, Decrease) => "Nights get colder.",
        (MetricId::PrecipitationAnnual, Increase) => "Umbrellas come out more often.",
        (MetricId::PrecipitationAnnual, Decrease) => "Dry spells become more common.",
        (MetricId::SnowfallAnnual, Increase) => "Snowy mornings become more common.",
        (MetricId::SnowfallAnnual, Decrease) => "Snowy mornings become rarer.",
        (MetricId::CloudCover, Increase) => "Grey, overcast days become more common.",
        (MetricId::CloudCover, Decrease) => "Clear skies become more common.",
        _ => return None,
    };
    Some(tail)
}

fn economic_impacts(facts: &Facts<'_>) -> Vec<ContentUnit> {
    let mut units = Vec::new();
    if let Some(flag) = facts.supported(ClaimKind::EconomicCascade) {
        units.push(claim_unit(flag, facts, |tone, labels| {
            format!(
                "The cost of living {} rise as {labels} push up energy, insurance and food costs.",
                tone.likelihood()
            )
        }));
    }
    if let Some(flag) = facts.supported(ClaimKind::InfrastructureStress) {
        units.push(claim_unit(flag, facts, |tone, labels| {
            format!(
                "Local infrastructure {} face more frequent repair and disruption costs, driven by {labels}.",
                tone.likelihood()
            )
        }));
    }
    units
}

fn physical_health(facts: &Facts<'_>) -> Vec<ContentUnit> {
    let mut units = Vec::new();
    if let Some(flag) = facts.supported(ClaimKind::HeatHealthRisk) {
        units.push(claim_unit(flag, facts, |tone, labels| {
            format!(
                "Heat-related illness {} become a more common health concern, driven by {labels}.",
                tone.likelihood()
            )
        }));
    }
    if let Some(flag) = facts.supported(ClaimKind::DiseaseVectorShift) {
        units.push(claim_unit(flag, facts, |tone, labels| {
            format!(
                "The range of disease-carrying insects such as mosquitoes and ticks {} expand as {labels} change.",
                tone.likelihood()
            )
        }));
    }
    // The recovery framing is a heat-health statement and needs the gated claim.
    if facts.supported(ClaimKind::HeatHealthRisk).is_some() {
        if let Some((delta, tier)) = facts.rising(MetricId::TemperatureMin) {
            units.push(change_with(
                delta,
                tier,
                "Warmer nights give the body less chance to recover from daytime heat.",
            ));
        }
    }
    units
}

fn environment_changes(facts: &Facts<'_>) -> Vec<ContentUnit> {
    let mut units = [
        MetricId::PrecipitationAnnual,
        MetricId::SnowfallAnnual,
        MetricId::SnowfallMonthlyMax,
        MetricId::CloudCover,
        MetricId::SolarRadiation,
    ]
    .iter()
    .filter_map(|metric| facts.notable(*metric))
    .map(|(delta, tier)| change_unit(delta, tier))
    .collect::<Vec<_>>();

    if let Some(composite) = facts.composite(CompositeKind::Downpour) {
        units.push(composite_unit(composite, facts));
    }
    if let Some(flag) = facts.supported(ClaimKind::WaterSupplyStress) {
        units.push(claim_unit(flag, facts, |tone, labels| {
            format!(
                "Pressure on local water supplies {} grow as {labels} decline.",
                tone.likelihood()
            )
        }));
    }
    units
}

fn comfort_analysis(facts: &Facts<'_>) -> Vec<ContentUnit> {
    let mut units = Vec::new();
    if let Some(composite) = facts.composite(CompositeKind::HumidHeat) {
        units.push(composite_unit(composite, facts));
    }
    for (metric, tail) in [
        (MetricId::HumidityMax, "Muggy days feel more oppressive."),
        (MetricId::HumidityMin, "The driest days feel different on skin and breath."),
        (MetricId::WindMax, "Blustery days change how exposed spaces feel."),
    ] {
        if let Some((delta, tier)) = facts.notable(metric) {
            units.push(change_with(delta, tier, tail));
        }
    }
    units
}

fn energy_implications(facts: &Facts<'_>) -> Vec<ContentUnit> {
    let mut units = Vec::new();

    let cooling = facts.rising_among(&[
        MetricId::TemperatureMax,
        MetricId::SeasonalTemperature(Season::Summer),
        MetricId::HotDays,
    ]);
    if !cooling.is_empty() {
        let tier = facts.max_tier(&cooling);
        let tone = Tone::for_tier(tier);
        units.push(finding(
            "energy.cooling_demand",
            format!(
                "Cooling demand {} grow ({}).",
                tone.likelihood(),
                facts.detail(&cooling)
            ),
            tier,
            Backing::deltas(cooling),
        ));
    }

    let winter = MetricId::SeasonalTemperature(Season::Winter);
    if let Some((delta, tier)) = facts.notable(winter) {
        let tone = Tone::for_tier(tier);
        let text = if delta.is_increase() {
            format!(
                "Heating needs {} shrink as winters warm ({}).",
                tone.likelihood(),
                facts.detail(&[winter])
            )
        } else {
            format!(
                "Heating needs {} grow as winters cool ({}).",
                tone.likelihood(),
                facts.detail(&[winter])
            )
        };
        units.push(finding("energy.heating_demand", text, tier, Backing::deltas([winter])));
    }

    if let Some((delta, tier)) = facts.notable(MetricId::SolarRadiation) {
        let tone = Tone::for_tier(tier);
        let verb = if delta.is_increase() { "rise" } else { "fall" };
        units.push(finding(
            "energy.solar_output",
            format!(
                "Rooftop solar output {} {verb} ({}).",
                tone.likelihood(),
                facts.detail(&[MetricId::SolarRadiation])
            ),
            tier,
            Backing::deltas([MetricId::SolarRadiation]),
        ));
    }
    units
}

fn seasonal_details(facts: &Facts<'_>) -> Vec<ContentUnit> {
    let mut units = Vec::new();
    for season in Season::ALL {
        let Some(metric) = facts.set.season(season) else {
            continue;
        };
        let mut backing = vec![metric.temperature.metric, metric.precipitation.metric];
        let mut tier = facts.max_tier(&backing);

        let name = capitalize(season.as_slug());
        let mut text = match metric.shift {
            SeasonalShift::Stable => format!("{name} stays broadly unchanged"),
            shift => format!("{name} turns {}", shift.describe()),
        };
        text.push_str(&format!(
            ": temperature {}, rainfall {}.",
            format_change(&metric.temperature),
            format_change(&metric.precipitation)
        ));
        if let Some(snow) = &metric.snowfall {
            let snow_tier = facts.tier(snow.metric);
            if snow_tier.is_notable() {
                text.push_str(&format!(" Snowfall {}.", format_change(snow)));
                backing.push(snow.metric);
                tier = tier.max(snow_tier);
            }
        }

        let tone = Tone::for_tier(tier);
        units.push(ContentUnit {
            kind: if tier.is_notable() {
                UnitKind::Finding
            } else {
                UnitKind::MinorNote
            },
            claim: format!("season.{season}"),
            text,
            severity: tier,
            tone,
            backing: Backing::deltas(backing),
        });
    }

    // Annual totals too small for key_changes still get a mention here.
    for metric in [MetricId::PrecipitationAnnual, MetricId::SnowfallAnnual] {
        if let Some(delta) = facts.set.get(metric) {
            let tier = facts.tier(metric);
            if !tier.is_notable() {
                units.push(change_unit(delta, tier));
            }
        }
    }
    units
}

fn outdoor_activities(facts: &Facts<'_>) -> Vec<ContentUnit> {
    let mut units = Vec::new();
    for (metric, tail) in [
        (
            MetricId::HotDays,
            "Strenuous outdoor activity moves to mornings and evenings more often.",
        ),
        (
            MetricId::HeavyRainDays,
            "More outdoor plans get cut short or called off after heavy rain.",
        ),
        (
            MetricId::HighWindDays,
            "Windy days disrupt water sports and hill walks more often.",
        ),
        (
            MetricId::SeasonalTemperature(Season::Spring),
            "The outdoor season starts earlier in spring.",
        ),
        (
            MetricId::SeasonalTemperature(Season::Autumn),
            "Mild autumn evenings stretch the outdoor season later.",
        ),
    ] {
        if let Some((delta, tier)) = facts.rising(metric) {
            units.push(change_with(delta, tier, tail));
        }
    }
    if let Some((delta, tier)) = facts.falling(MetricId::SnowfallAnnual) {
        units.push(change_with(
            delta,
            tier,
            "Sledging, skiing and other snow-dependent pastimes get shorter seasons.",
        ));
    }
    units
}

fn adaptation_needs(facts: &Facts<'_>) -> Vec<ContentUnit> {
    let mut units = Vec::new();

    if let Some(flag) = facts.supported(ClaimKind::HeatHealthRisk) {
        units.push(action_unit(
            "adaptation.heat",
            "heat protection: shaded outdoor space, better ventilation and a plan for checking on vulnerable neighbours during hot spells.",
            Backing::claim(flag.claim, flag.supporting.clone()),
            facts,
        ));
    }

    let flood = facts.rising_among(&[MetricId::PrecipitationMonthlyMax, MetricId::HeavyRainDays]);
    if !flood.is_empty() {
        units.push(action_unit(
            "adaptation.flooding",
            "drainage and flood resilience: clear gutters, check drains and look at property-level flood protection.",
            Backing::deltas(flood),
            facts,
        ));
    }

    if let Some(flag) = facts.supported(ClaimKind::WaterSupplyStress) {
        units.push(action_unit(
            "adaptation.water",
            "water saving: rainwater collection and drought-tolerant planting.",
            Backing::claim(flag.claim, flag.supporting.clone()),
            facts,
        ));
    }

    if facts.falling(MetricId::SnowfallAnnual).is_some() {
        units.push(action_unit(
            "adaptation.snow",
            "winter plans that do not rely on dependable snow cover.",
            Backing::deltas([MetricId::SnowfallAnnual]),
            facts,
        ));
    }

    let wind = facts.rising_among(&[MetricId::WindMax, MetricId::HighWindDays]);
    if !wind.is_empty() {
        units.push(action_unit(
            "adaptation.wind",
            "securing roofs, fences and loose outdoor items against stronger winds.",
            Backing::deltas(wind),
            facts,
        ));
    }
    units
}

fn uncertainty_notes(facts: &Facts<'_>) -> Vec<ContentUnit> {
    let mut units = facts
        .flags
        .iter()
        .filter(|flag| !flag.supported && !flag.supporting.is_empty())
        .map(|flag| hedged_unit(flag, facts))
        .collect::<Vec<_>>();

    let metadata = &facts.pair.metadata;
    let anchor = MetricId::TemperatureMean;
    let Some(mean) = facts.set.get(anchor) else {
        return units;
    };

    if metadata.model_agreement < Confidence::High {
        let models = match metadata.models.len() {
            0 => String::new(),
            1 => " across 1 model".to_string(),
            n => format!(" across {n} models"),
        };
        units.push(note(
            "uncertainty.model_agreement",
            format!(
                "Model agreement is {}{models}, so treat the exact figures as indicative rather than certain.",
                metadata.model_agreement
            ),
            Backing::deltas([anchor]),
        ));
    }

    if let Some(variability) = metadata.interannual_variability {
        if mean.absolute_change.abs() <= variability {
            units.push(note(
                "uncertainty.variability",
                format!(
                    "The average temperature change ({}) is within normal year-to-year swings of ±{variability:.1}°C, so individual years may feel no different.",
                    format_change(mean)
                ),
                Backing::deltas([anchor]),
            ));
        }
    }

    if let Some(trend) = metadata.trend_per_decade {
        units.push(note(
            "uncertainty.trend",
            format!(
                "The recent trend is {trend:+.1}°C per decade; these projections look {} years ahead and the path between now and then will not be smooth.",
                facts.pair.horizon_years()
            ),
            Backing::deltas([anchor]),
        ));
    }

    for extreme in &facts.set.extremes {
        let frequency = extreme.frequency.metric;
        if extreme.support == Confidence::Low && facts.tier(frequency).is_notable() {
            units.push(note(
                "uncertainty.extreme_support",
                format!(
                    "The projected change in {} extremes ({}) rests on low model support and may not materialise.",
                    extreme_noun(extreme.kind),
                    facts.detail(&[frequency])
                ),
                Backing::deltas([frequency]),
            ));
        }
    }
    units
}

fn extreme_noun(kind: ExtremeKind) -> &'static str {
    match kind {
        ExtremeKind::Heat => "heat",
        ExtremeKind::Precipitation => "rainfall",
        ExtremeKind::Wind => "wind",
    }
}

fn claim_phrase(claim: ClaimKind) -> &'static str {
    match claim {
        ClaimKind::DiseaseVectorShift => "a shift in disease-carrying insects",
        ClaimKind::HeatHealthRisk => "a rise in heat-related illness",
        ClaimKind::InfrastructureStress => "added stress on local infrastructure",
        ClaimKind::WaterSupplyStress => "pressure on water supplies",
        ClaimKind::EconomicCascade => "knock-on economic costs",
    }
}

fn join_labels(metrics: &[MetricId]) -> String {
    let labels = metrics.iter().map(|m| m.label()).collect::<Vec<_>>();
    match labels.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

fn change_unit(delta: &Delta, tier: SeverityTier) -> ContentUnit {
    let tone = Tone::for_tier(tier);
    ContentUnit {
        kind: if tier.is_notable() {
            UnitKind::Finding
        } else {
            UnitKind::MinorNote
        },
        claim: format!("change.{}", delta.metric),
        text: describe_change(delta, tone),
        severity: tier,
        tone,
        backing: Backing::deltas([delta.metric]),
    }
}

fn change_with(delta: &Delta, tier: SeverityTier, tail: &str) -> ContentUnit {
    let mut unit = change_unit(delta, tier);
    unit.text = format!("{} {tail}", unit.text);
    unit
}

fn finding(claim: &str, text: String, tier: SeverityTier, backing: Backing) -> ContentUnit {
    ContentUnit {
        kind: UnitKind::Finding,
        claim: claim.to_string(),
        text,
        severity: tier,
        tone: Tone::for_tier(tier),
        backing,
    }
}

fn note(claim: &str, text: String, backing: Backing) -> ContentUnit {
    finding(claim, text, SeverityTier::Low, backing)
}

fn composite_unit(composite: &CompositeAssessment, facts: &Facts<'_>) -> ContentUnit {
    let tone = Tone::for_tier(composite.tier);
    let detail = facts.detail(&composite.components);
    let text = match composite.kind {
        CompositeKind::HumidHeat => format!(
            "Heat and humidity rise together ({detail}), a {} increase in muggy discomfort.",
            tone.qualifier()
        ),
        CompositeKind::Downpour => format!(
            "Rain arrives in heavier bursts ({detail}), a {} shift towards downpours.",
            tone.qualifier()
        ),
    };
    finding(
        &format!("composite.{}", composite.kind),
        text,
        composite.tier,
        Backing::deltas(composite.components.iter().copied()),
    )
}

fn claim_unit(
    flag: &EvidenceFlag,
    facts: &Facts<'_>,
    render: impl Fn(Tone, &str) -> String,
) -> ContentUnit {
    let tier = facts.max_tier(&flag.supporting);
    let text = render(Tone::for_tier(tier), &join_labels(&flag.supporting));
    finding(
        &format!("claim.{}", flag.claim),
        text,
        tier,
        Backing::claim(flag.claim, flag.supporting.iter().copied()),
    )
}

fn hedged_unit(flag: &EvidenceFlag, facts: &Facts<'_>) -> ContentUnit {
    let detail = facts.detail(&flag.supporting);
    ContentUnit {
        kind: UnitKind::Hedged,
        claim: format!("claim.{}", flag.claim),
        text: capitalize(&format!(
            "{detail} could point to {}, but the data do not corroborate it strongly enough to state: {}.",
            claim_phrase(flag.claim),
            flag.reason
        )),
        severity: SeverityTier::Low,
        tone: Tone::Mild,
        backing: Backing::claim(flag.claim, flag.supporting.iter().copied()),
    }
}

fn action_unit(claim: &str, what: &str, backing: Backing, facts: &Facts<'_>) -> ContentUnit {
    let tier = facts.max_tier(&backing.deltas);
    let tone = Tone::for_tier(tier);
    finding(claim, format!("{} {what}", tone.action()), tier, backing)
}

fn no_change(kind: SectionKind) -> ContentUnit {
    let text = match kind {
        SectionKind::UncertaintyNotes => {
            "No caveats beyond the usual limits of climate projections.".to_string()
        }
        other => format!(
            "No significant change is projected for {}.",
            other.title().to_lowercase()
        ),
    };
    ContentUnit {
        kind: UnitKind::NoSignificantChange,
        claim: NO_CHANGE_CLAIM.to_string(),
        text,
        severity: SeverityTier::Low,
        tone: Tone::Mild,
        backing: Backing::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deltas::compute_deltas;
    use crate::evidence::EvidenceGate;
    use crate::metrics::normalize::normalize_record;
    use crate::metrics::raw::RawClimateRecord;
    use crate::severity::{classify_all, ThresholdTable};

    fn compose(raw: &RawClimateRecord, settings: ComposerSettings) -> Vec<NarrativeSection> {
        let pair = normalize_record(raw).expect("valid");
        let set = compute_deltas(&pair);
        let severity = classify_all(&set, &ThresholdTable::default());
        let flags = EvidenceGate::default().evaluate_all(&set, &severity, &pair.metadata);
        SectionComposer::new(settings).compose(&pair, &set, &severity, &flags)
    }

    fn section(sections: &[NarrativeSection], kind: SectionKind) -> &NarrativeSection {
        sections.iter().find(|s| s.kind == kind).expect("section present")
    }

    #[test]
    fn emits_all_sections_in_order() {
        let sections = compose(&RawClimateRecord::sample(), ComposerSettings::default());
        let kinds = sections.iter().map(|s| s.kind).collect::<Vec<_>>();
        assert_eq!(kinds, SectionKind::ALL.to_vec());
        assert!(sections.iter().all(|s| !s.units.is_empty()));
    }

    #[test]
    fn key_changes_lead_with_mean_temperature() {
        let sections = compose(&RawClimateRecord::sample(), ComposerSettings::default());
        let key = section(&sections, SectionKind::KeyChanges);
        assert_eq!(key.units[0].claim, "change.temperature_mean");
        assert_eq!(key.units[0].severity, SeverityTier::High);
        assert_eq!(key.units[0].tone, Tone::Direct);
        assert!(key.units.len() <= 8);
        assert!(key.units.iter().all(|u| u.severity.is_notable()));
        let tiers = key.units.iter().map(|u| u.severity).collect::<Vec<_>>();
        assert!(tiers.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn key_changes_respect_the_cap() {
        let sections = compose(
            &RawClimateRecord::sample(),
            ComposerSettings { max_key_changes: 3 },
        );
        assert_eq!(section(&sections, SectionKind::KeyChanges).units.len(), 3);
    }

    #[test]
    fn small_rainfall_change_is_a_seasonal_minor_note() {
        let sections = compose(&RawClimateRecord::sample(), ComposerSettings::default());
        let key = section(&sections, SectionKind::KeyChanges);
        assert!(key.claims().all(|c| c != "change.precipitation_annual"));
        let seasonal = section(&sections, SectionKind::SeasonalDetails);
        let note = seasonal
            .units
            .iter()
            .find(|u| u.claim == "change.precipitation_annual")
            .expect("minor note");
        assert_eq!(note.kind, UnitKind::MinorNote);
        assert_eq!(note.tone, Tone::Mild);
    }

    #[test]
    fn every_season_is_described() {
        let sections = compose(&RawClimateRecord::sample(), ComposerSettings::default());
        let seasonal = section(&sections, SectionKind::SeasonalDetails);
        for season in Season::ALL {
            assert!(seasonal.claims().any(|c| c == format!("season.{season}")));
        }
        let summer = seasonal
            .units
            .iter()
            .find(|u| u.claim == "season.summer")
            .unwrap();
        assert!(summer.text.starts_with("Summer turns warmer and drier"));
    }

    #[test]
    fn unsupported_claims_are_only_hedged() {
        let mut raw = RawClimateRecord::sample();
        raw.future.humidity_max = Some(86.0);
        if let Some(winter) = raw.future.seasons.winter.as_mut() {
            winter.temperature_mean = Some(5.5);
        }
        let sections = compose(&raw, ComposerSettings::default());
        for s in &sections {
            let mentions = s.claims().any(|c| c == "claim.disease_vector_shift");
            if s.kind == SectionKind::UncertaintyNotes {
                let unit = s
                    .units
                    .iter()
                    .find(|u| u.claim == "claim.disease_vector_shift")
                    .expect("hedged note");
                assert_eq!(unit.kind, UnitKind::Hedged);
            } else {
                assert!(!mentions, "{} mentions an unsupported claim", s.kind);
            }
        }
    }

    #[test]
    fn medium_agreement_adds_a_caveat() {
        let sections = compose(&RawClimateRecord::sample(), ComposerSettings::default());
        let notes = section(&sections, SectionKind::UncertaintyNotes);
        let unit = notes
            .units
            .iter()
            .find(|u| u.claim == "uncertainty.model_agreement")
            .expect("agreement note");
        assert!(unit.text.contains("medium across 2 models"));
    }

    #[test]
    fn low_support_extremes_are_flagged() {
        let mut raw = RawClimateRecord::sample();
        raw.future.extremes.high_wind_days = Some(9.0);
        let sections = compose(&raw, ComposerSettings::default());
        let notes = section(&sections, SectionKind::UncertaintyNotes);
        assert!(notes.claims().any(|c| c == "uncertainty.extreme_support"));
    }

    #[test]
    fn quiet_record_gets_no_change_markers() {
        let mut raw = RawClimateRecord::sample();
        let current = raw.current.clone();
        raw.future = current;
        raw.future.window.center_year = Some(2045);
        raw.metadata.model_agreement = Some(Confidence::High);
        raw.metadata.trend_per_decade = None;
        let sections = compose(&raw, ComposerSettings::default());
        for kind in [
            SectionKind::KeyChanges,
            SectionKind::EconomicImpacts,
            SectionKind::PhysicalHealth,
            SectionKind::EnergyImplications,
            SectionKind::AdaptationNeeds,
        ] {
            assert!(section(&sections, kind).is_no_change(), "{kind}");
        }
        // identical windows sit inside the interannual variability
        let notes = section(&sections, SectionKind::UncertaintyNotes);
        assert!(notes.claims().any(|c| c == "uncertainty.variability"));
    }

    #[test]
    fn join_labels_reads_naturally() {
        assert_eq!(join_labels(&[]), "");
        assert_eq!(join_labels(&[MetricId::HotDays]), "extreme heat days");
        assert_eq!(
            join_labels(&[MetricId::TemperatureMax, MetricId::HotDays, MetricId::HumidityMax]),
            "hottest-day temperature, extreme heat days and peak relative humidity"
        );
    }

    #[test]
    fn equal_tiers_follow_family_priority() {
        let mut raw = RawClimateRecord::sample();
        raw.future.temperature_max = Some(35.0);
        raw.future.humidity_max = Some(94.0);
        raw.future.extremes.hot_days = Some(14.0);
        if let Some(summer) = raw.future.seasons.summer.as_mut() {
            summer.temperature_mean = Some(28.0);
        }
        let sections = compose(&raw, ComposerSettings { max_key_changes: 40 });
        let key = section(&sections, SectionKind::KeyChanges);
        let watched = [
            "change.temperature_mean",
            "change.temperature_max",
            "change.hot_days",
            "change.seasonal_temperature.summer",
            "change.humidity_max",
            "composite.humid_heat",
        ];
        let high = key
            .units
            .iter()
            .filter(|u| watched.contains(&u.claim.as_str()))
            .map(|u| {
                assert_eq!(u.severity, SeverityTier::High, "{}", u.claim);
                u.claim.as_str()
            })
            .collect::<Vec<_>>();
        assert_eq!(high, watched.to_vec());
    }

    #[test]
    fn unsupported_heat_health_is_not_stated() {
        let mut raw = RawClimateRecord::sample();
        // only the hottest-day temperature moves
        raw.future.extremes.hot_days = raw.current.extremes.hot_days;
        raw.future.humidity_max = raw.current.humidity_max;
        let pair = normalize_record(&raw).expect("valid");
        let set = compute_deltas(&pair);
        let severity = classify_all(&set, &ThresholdTable::default());
        let flags = EvidenceGate::default().evaluate_all(&set, &severity, &pair.metadata);
        let flag = flag_for(&flags, ClaimKind::HeatHealthRisk).expect("flag");
        assert!(!flag.supported);
        assert_eq!(flag.supporting, vec![MetricId::TemperatureMax]);
        assert!(severity.tier(MetricId::TemperatureMin).unwrap().is_notable());

        let sections = SectionComposer::default().compose(&pair, &set, &severity, &flags);
        let wording = [
            "heat-related illness",
            "recover from daytime heat",
            "vulnerable neighbours",
        ];
        for s in sections.iter().filter(|s| s.kind != SectionKind::UncertaintyNotes) {
            for unit in &s.units {
                assert_ne!(unit.backing.evidence, Some(ClaimKind::HeatHealthRisk), "{}", s.kind);
                assert_ne!(unit.claim, "adaptation.heat");
                for phrase in wording {
                    assert!(!unit.text.contains(phrase), "{}: {}", s.kind, unit.text);
                }
            }
        }
        let notes = section(&sections, SectionKind::UncertaintyNotes);
        let hedged = notes
            .units
            .iter()
            .find(|u| u.claim == "claim.heat_health_risk")
            .expect("hedged heat claim");
        assert_eq!(hedged.kind, UnitKind::Hedged);
    }

    #[test]
    fn supported_heat_health_reaches_health_and_adaptation() {
        let sections = compose(&RawClimateRecord::sample(), ComposerSettings::default());
        let health = section(&sections, SectionKind::PhysicalHealth);
        assert!(health.claims().any(|c| c == "claim.heat_health_risk"));
        assert!(health
            .units
            .iter()
            .any(|u| u.text.contains("recover from daytime heat")));
        let adaptation = section(&sections, SectionKind::AdaptationNeeds);
        let heat = adaptation
            .units
            .iter()
            .find(|u| u.claim == "adaptation.heat")
            .expect("heat adaptation");
        assert_eq!(heat.backing.evidence, Some(ClaimKind::HeatHealthRisk));
    }

    #[test]
    fn priority_groups_order_ties() {
        assert!(
            PriorityGroup::for_metric(MetricId::TemperatureMax)
                < PriorityGroup::for_metric(MetricId::HotDays)
        );
        assert!(
            PriorityGroup::for_metric(MetricId::SeasonalTemperature(Season::Summer))
                < PriorityGroup::for_metric(MetricId::HumidityMax)
        );
        assert_eq!(
            PriorityGroup::for_composite(CompositeKind::Downpour),
            PriorityGroup::PrecipitationAndExtremes
        );
    }
}
