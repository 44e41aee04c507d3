use indexmap::IndexMap;

use crate::error::{Result, TrendError};
use crate::models::{FailureGroup, FailureGroupSummary, MetricResult};

/// Count, mean and median failures across failure-group runs.
///
/// The median is the element at `count / 2` after sorting failure counts
/// ascending. Empty input summarizes to all zeros.
pub fn summarize_failure_groups(groups: &[FailureGroup]) -> FailureGroupSummary {
    let count = groups.len();
    if count == 0 {
        return FailureGroupSummary {
            count: 0,
            mean: 0.0,
            median: 0,
        };
    }

    let mut failures: Vec<u64> = groups.iter().map(|g| g.test_failures).collect();
    failures.sort_unstable();

    #[allow(clippy::cast_precision_loss)]
    let mean = failures.iter().map(|&f| u128::from(f)).sum::<u128>() as f64 / count as f64;

    FailureGroupSummary {
        count,
        mean,
        median: failures[count / 2],
    }
}

/// Sums counts of all entities sharing a group key.
///
/// Groups appear in order of first occurrence. Pass percentages of the
/// output are derived from the summed counts. A group whose runs no longer
/// fit in a `u64` is reported as `CountOverflow`.
pub fn reduce_by_group<'a, I, F>(
    entities: I,
    group_key: F,
) -> Result<IndexMap<String, MetricResult>>
where
    I: IntoIterator<Item = &'a MetricResult>,
    F: Fn(&MetricResult) -> String,
{
    let mut groups: IndexMap<String, MetricResult> = IndexMap::new();

    for entity in entities {
        let key = group_key(entity);
        let group = groups
            .entry(key.clone())
            .or_insert_with(|| MetricResult::new(key, 0, 0, 0));

        let summed = MetricResult {
            name: group.name.clone(),
            successes: checked_sum(group.successes, entity.successes, &group.name)?,
            failures: checked_sum(group.failures, entity.failures, &group.name)?,
            flakes: checked_sum(group.flakes, entity.flakes, &group.name)?,
        };
        if summed.checked_runs().is_none() {
            return Err(overflow(&group.name));
        }
        *group = summed;
    }

    Ok(groups)
}

/// Single summary result named `name` over every entity.
pub fn reduce_all<'a, I>(entities: I, name: &str) -> Result<MetricResult>
where
    I: IntoIterator<Item = &'a MetricResult>,
{
    Ok(reduce_by_group(entities, |_| name.to_string())?
        .swap_remove(name)
        .unwrap_or_else(|| MetricResult::new(name, 0, 0, 0)))
}

fn checked_sum(total: u64, count: u64, group: &str) -> Result<u64> {
    total.checked_add(count).ok_or_else(|| overflow(group))
}

fn overflow(group: &str) -> TrendError {
    TrendError::CountOverflow {
        entity: group.to_string(),
    }
}

/// Historically reliable tests that still failed at least once.
///
/// Highest pass percentage first, ties broken by name, at most `limit`.
pub fn canary_tests<'a, I>(tests: I, limit: usize) -> Vec<MetricResult>
where
    I: IntoIterator<Item = &'a MetricResult>,
{
    let mut candidates: Vec<&MetricResult> = tests.into_iter().filter(|t| t.failures > 0).collect();

    candidates.sort_by(|a, b| {
        b.pass_percentage()
            .partial_cmp(&a.pass_percentage())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    candidates.into_iter().take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn groups(failures: &[u64]) -> Vec<FailureGroup> {
        failures
            .iter()
            .enumerate()
            .map(|(i, &test_failures)| FailureGroup {
                job: format!("job-{i}"),
                url: format!("https://prow.example/run/{i}"),
                test_failures,
            })
            .collect()
    }

    #[test]
    fn test_summarize_sorts_before_median() {
        let summary = summarize_failure_groups(&groups(&[3, 7, 1, 9, 5]));

        assert_eq!(summary.count, 5);
        assert_eq!(summary.median, 5);
        assert!((summary.mean - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summarize_even_count_takes_upper_middle() {
        let summary = summarize_failure_groups(&groups(&[40, 10, 30, 20]));

        assert_eq!(summary.median, 30);
        assert!((summary.mean - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summarize_mean_is_fractional() {
        let summary = summarize_failure_groups(&groups(&[10, 11]));

        assert!((summary.mean - 10.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize_failure_groups(&[]);

        assert_eq!(
            summary,
            FailureGroupSummary {
                count: 0,
                mean: 0.0,
                median: 0,
            }
        );
    }

    #[test]
    fn test_reduce_recomputes_percentage_from_sums() {
        let jobs = vec![
            MetricResult::new("e2e-aws", 1, 0, 0),
            MetricResult::new("e2e-aws-serial", 49, 50, 3),
            MetricResult::new("e2e-gcp", 7, 3, 1),
        ];

        let by_platform = reduce_by_group(&jobs, |j| {
            j.name.split('-').nth(1).unwrap_or_default().to_string()
        })
        .unwrap();

        let aws = &by_platform["aws"];
        assert_eq!(aws, &MetricResult::new("aws", 50, 50, 3));
        // 100% and 49.5% averaged would be 74.75
        assert_eq!(aws.pass_percentage(), Some(50.0));
        assert_eq!(by_platform["gcp"].pass_percentage(), Some(70.0));
    }

    #[test]
    fn test_reduce_keeps_first_occurrence_order() {
        let jobs = vec![
            MetricResult::new("b-1", 1, 0, 0),
            MetricResult::new("a-1", 1, 0, 0),
            MetricResult::new("b-2", 1, 0, 0),
        ];

        let keys: Vec<_> = reduce_by_group(&jobs, |j| j.name[..1].to_string())
            .unwrap()
            .into_keys()
            .collect();

        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_reduce_all() {
        let tests = vec![
            MetricResult::new("a", 9, 1, 0),
            MetricResult::new("b", 1, 9, 2),
        ];

        assert_eq!(
            reduce_all(&tests, "all").unwrap(),
            MetricResult::new("all", 10, 10, 2)
        );
    }

    #[test]
    fn test_reduce_all_empty_has_no_data() {
        let all = reduce_all(&[], "all").unwrap();

        assert_eq!(all, MetricResult::new("all", 0, 0, 0));
        assert_eq!(all.pass_percentage(), None);
    }

    #[test]
    fn test_reduce_overflow_is_an_error() {
        let jobs = vec![
            MetricResult::new("e2e-aws-1", u64::MAX - 1, 0, 0),
            MetricResult::new("e2e-aws-2", 2, 0, 0),
        ];

        let err = reduce_by_group(&jobs, |_| "aws".to_string()).unwrap_err();

        assert!(matches!(err, TrendError::CountOverflow { ref entity } if entity == "aws"));
    }

    #[test]
    fn test_reduce_overflow_across_fields_is_an_error() {
        let jobs = vec![
            MetricResult::new("a", u64::MAX / 2 + 1, 0, 0),
            MetricResult::new("b", 0, u64::MAX / 2 + 1, 0),
        ];

        assert!(reduce_all(&jobs, "all").is_err());
    }

    #[test]
    fn test_summarize_large_failure_counts() {
        let summary = summarize_failure_groups(&groups(&[u64::MAX, u64::MAX]));

        assert_eq!(summary.median, u64::MAX);
        #[allow(clippy::cast_precision_loss)]
        let expected = u64::MAX as f64;
        assert!((summary.mean - expected).abs() <= expected * f64::EPSILON);
    }

    #[test]
    fn test_canary_tests_most_reliable_failures_first() {
        let tests = vec![
            MetricResult::new("always-passes", 100, 0, 0),
            MetricResult::new("flaky", 50, 50, 0),
            MetricResult::new("solid", 99, 1, 0),
            MetricResult::new("steady", 98, 2, 0),
            MetricResult::new("also-solid", 99, 1, 0),
        ];

        let names: Vec<_> = canary_tests(&tests, 3).into_iter().map(|t| t.name).collect();

        assert_eq!(names, vec!["also-solid", "solid", "steady"]);
    }

    proptest! {
        #[test]
        fn test_reduce_preserves_sums(
            counts in prop::collection::vec((0u64..1000, 0u64..1000, 0u64..100, 0usize..4), 0..50)
        ) {
            let entities: Vec<_> = counts
                .iter()
                .enumerate()
                .map(|(i, &(s, f, fl, _))| MetricResult::new(format!("e{i}"), s, f, fl))
                .collect();
            let group_of = |r: &MetricResult| {
                let index: usize = r.name[1..].parse().unwrap();
                format!("g{}", counts[index].3)
            };

            let groups = reduce_by_group(&entities, group_of).unwrap();

            for (key, group) in &groups {
                let members: Vec<_> = entities.iter().filter(|e| &group_of(e) == key).collect();
                prop_assert_eq!(group.successes, members.iter().map(|e| e.successes).sum::<u64>());
                prop_assert_eq!(group.failures, members.iter().map(|e| e.failures).sum::<u64>());
                prop_assert_eq!(group.flakes, members.iter().map(|e| e.flakes).sum::<u64>());
            }
            prop_assert_eq!(
                groups.values().map(|g| g.successes).sum::<u64>(),
                entities.iter().map(|e| e.successes).sum::<u64>()
            );
        }
    }
}
