use std::collections::BTreeMap;

use tracing::debug;

use crate::deltas::{Delta, DeltaSet};
use crate::severity::{
    CompositeAssessment, CompositeKind, SeverityAssessment, SeverityTier, ThresholdTable,
};

pub fn classify_delta(delta: &Delta, table: &ThresholdTable) -> SeverityTier {
    table.rule(delta.metric.family()).tier(delta)
}

/// Both components must reach Moderate before the composite can take the
/// higher tier; a single strong component is capped at Moderate.
pub fn combine_tiers(a: SeverityTier, b: SeverityTier) -> SeverityTier {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if lo >= SeverityTier::Moderate {
        hi
    } else if hi >= SeverityTier::Moderate {
        SeverityTier::Moderate
    } else {
        SeverityTier::Low
    }
}

pub fn classify_all(set: &DeltaSet, table: &ThresholdTable) -> SeverityAssessment {
    let tiers = set
        .deltas
        .iter()
        .map(|delta| (delta.metric, classify_delta(delta, table)))
        .collect::<BTreeMap<_, _>>();

    let composites = CompositeKind::ALL
        .iter()
        .filter_map(|kind| classify_composite(*kind, set, &tiers))
        .collect::<Vec<_>>();

    let assessment = SeverityAssessment { tiers, composites };
    debug!(histogram = ?assessment.histogram(), "classified deltas");
    assessment
}

fn classify_composite(
    kind: CompositeKind,
    set: &DeltaSet,
    tiers: &BTreeMap<crate::deltas::MetricId, SeverityTier>,
) -> Option<CompositeAssessment> {
    let components = kind.components();
    let mut component_tiers = Vec::with_capacity(components.len());
    for metric in components {
        let delta = set.get(metric)?;
        let tier = tiers.get(&metric).copied()?;
        // A falling component cannot support a worsening composite.
        component_tiers.push(if delta.is_increase() {
            tier
        } else {
            SeverityTier::Low
        });
    }
    let tier = combine_tiers(component_tiers[0], component_tiers[1]);
    Some(CompositeAssessment {
        kind,
        components: components.to_vec(),
        component_tiers,
        tier,
    })
}
