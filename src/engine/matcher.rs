use indexmap::IndexMap;

use crate::models::{ComparisonPair, MetricResult};

/// Pairs every current entity with its previous-window counterpart by exact name.
///
/// Output order follows `current`. A previous entry with zero runs is treated
/// as absent. Entities that only exist in `previous` are not reported.
pub fn match_entities(
    current: &IndexMap<String, MetricResult>,
    previous: &IndexMap<String, MetricResult>,
) -> Vec<ComparisonPair> {
    current
        .values()
        .map(|result| ComparisonPair {
            current: result.clone(),
            previous: previous
                .get(&result.name)
                .filter(|prev| prev.total_runs() > 0)
                .cloned(),
        })
        .collect()
}

/// Number of previous-window entities with no current-window counterpart.
pub fn count_dropped(
    current: &IndexMap<String, MetricResult>,
    previous: &IndexMap<String, MetricResult>,
) -> usize {
    previous
        .keys()
        .filter(|name| !current.contains_key(*name))
        .count()
}
