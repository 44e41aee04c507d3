use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::ReportConfig;
use crate::engine::aggregate::{canary_tests, reduce_all, summarize_failure_groups};
use crate::engine::health::{self, BandSet};
use crate::engine::matcher::{count_dropped, match_entities};
use crate::engine::significance::{self, SignificanceThresholds};
use crate::error::Result;
use crate::models::{
    ComparisonPair, FailureGroup, FailureGroupSummary, HealthBand, MetricResult, Trend,
};
use crate::snapshot::WindowSnapshot;

const ALL_TESTS: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    pub name: String,
    pub successes: u64,
    pub failures: u64,
    pub flakes: u64,
    pub total_runs: u64,
    pub runs_including_flakes: u64,
    pub pass_percentage: Option<f64>,
}

impl From<&MetricResult> for EntitySummary {
    fn from(result: &MetricResult) -> Self {
        Self {
            name: result.name.clone(),
            successes: result.successes,
            failures: result.failures,
            flakes: result.flakes,
            total_runs: result.total_runs(),
            runs_including_flakes: result.runs_including_flakes(),
            pass_percentage: result.pass_percentage(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRow {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub current: EntitySummary,
    pub previous: Option<EntitySummary>,
    pub trend: Trend,
    pub delta: Option<f64>,
    pub health: HealthBand,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bugs: Vec<String>,
}

/// Failing tests, least reliable first, split by whether a bug is already filed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopFailingTests {
    pub without_bug: Vec<EntityRow>,
    pub with_bug: Vec<EntityRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureGroupReport {
    pub current: FailureGroupSummary,
    pub previous: FailureGroupSummary,
    pub runs: Vec<FailureGroup>,
}

/// Test-by-variant grid for install and upgrade tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantGrid {
    pub variants: Vec<String>,
    pub overall: Option<IndexMap<String, EntityRow>>,
    pub tests: IndexMap<String, IndexMap<String, EntityRow>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub generated_at: DateTime<Utc>,
    pub config: ReportConfig,
    pub summary: EntityRow,
    pub failure_groups: FailureGroupReport,
    pub platforms: Vec<EntityRow>,
    pub tests: Vec<EntityRow>,
    pub top_failing_tests: TopFailingTests,
    pub jobs: Vec<EntityRow>,
    pub canaries: Vec<EntitySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_upgrade: Option<VariantGrid>,
}

pub fn build_report(
    current: &WindowSnapshot,
    previous: &WindowSnapshot,
    config: &ReportConfig,
) -> Result<TrendReport> {
    let thresholds = &config.significance;
    let bands = &config.bands;
    let no_urls = IndexMap::new();

    let summary = build_row(
        &ComparisonPair {
            current: reduce_all(current.tests.values(), ALL_TESTS)?,
            previous: Some(reduce_all(previous.tests.values(), ALL_TESTS)?)
                .filter(|p| p.total_runs() > 0),
        },
        thresholds,
        &bands.tests,
        None,
        &[],
    );

    let mut runs = current.failure_groups.clone();
    runs.sort_by(|a, b| b.test_failures.cmp(&a.test_failures));

    let failure_groups = FailureGroupReport {
        current: summarize_failure_groups(&current.failure_groups),
        previous: summarize_failure_groups(&previous.failure_groups),
        runs,
    };

    let tests = compare_section(
        "test",
        &current.tests,
        &previous.tests,
        thresholds,
        &bands.tests,
        &no_urls,
        &current.test_bugs,
    );
    let top_failing_tests = top_failing(&tests, config.top_failing_limit);

    let install_upgrade = (!current.variants.is_empty())
        .then(|| build_variant_grid(current, previous, config));

    Ok(TrendReport {
        generated_at: Utc::now(),
        config: config.clone(),
        summary,
        failure_groups,
        platforms: compare_section(
            "platform",
            &current.platforms,
            &previous.platforms,
            thresholds,
            &bands.platforms,
            &no_urls,
            &IndexMap::new(),
        ),
        tests,
        top_failing_tests,
        jobs: compare_section(
            "job",
            &current.jobs,
            &previous.jobs,
            thresholds,
            &bands.jobs,
            &current.job_urls,
            &IndexMap::new(),
        ),
        canaries: canary_tests(current.tests.values(), config.canary_limit)
            .iter()
            .map(EntitySummary::from)
            .collect(),
        install_upgrade,
    })
}

/// Rows with at least one current failure, in section order, up to `limit` per list.
fn top_failing(rows: &[EntityRow], limit: usize) -> TopFailingTests {
    let (without_bug, with_bug): (Vec<&EntityRow>, Vec<&EntityRow>) = rows
        .iter()
        .filter(|row| row.current.failures > 0)
        .partition(|row| row.bugs.is_empty());

    TopFailingTests {
        without_bug: without_bug.into_iter().take(limit).cloned().collect(),
        with_bug: with_bug.into_iter().take(limit).cloned().collect(),
    }
}

/// Orders entities ascending by pass percentage, no-data entities first, ties by name.
pub fn sort_by_pass_rate(
    entities: &IndexMap<String, MetricResult>,
) -> IndexMap<String, MetricResult> {
    let mut sorted = entities.clone();
    sorted.sort_by(|_, a, _, b| {
        a.pass_percentage()
            .partial_cmp(&b.pass_percentage())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    sorted
}

fn compare_section(
    granularity: &str,
    current: &IndexMap<String, MetricResult>,
    previous: &IndexMap<String, MetricResult>,
    thresholds: &SignificanceThresholds,
    bands: &BandSet,
    urls: &IndexMap<String, String>,
    bugs: &IndexMap<String, Vec<String>>,
) -> Vec<EntityRow> {
    if current.is_empty() {
        warn!("No current {granularity} results to compare");
    }

    let dropped = count_dropped(current, previous);
    if dropped > 0 {
        warn!(
            "{dropped} {granularity} entries only exist in the previous window and are not compared"
        );
    }

    let pairs = match_entities(&sort_by_pass_rate(current), previous);
    let rows: Vec<EntityRow> = pairs
        .par_iter()
        .map(|pair| {
            let url = urls.get(&pair.current.name).map(String::as_str);
            let bugs = bugs.get(&pair.current.name).map_or(&[][..], Vec::as_slice);
            build_row(pair, thresholds, bands, url, bugs)
        })
        .collect();

    debug!(
        "Classified {} {granularity} entries: {} improved, {} regressed",
        rows.len(),
        rows.iter().filter(|r| r.trend == Trend::Improved).count(),
        rows.iter().filter(|r| r.trend == Trend::Regressed).count()
    );

    rows
}

fn build_row(
    pair: &ComparisonPair,
    thresholds: &SignificanceThresholds,
    bands: &BandSet,
    url: Option<&str>,
    bugs: &[String],
) -> EntityRow {
    let classification = significance::classify(pair, thresholds);
    let health = health::classify(
        pair.current.pass_percentage(),
        pair.current.total_runs(),
        bands,
    );

    EntityRow {
        name: pair.current.name.clone(),
        url: url.map(str::to_string),
        current: EntitySummary::from(&pair.current),
        previous: pair.previous.as_ref().map(EntitySummary::from),
        trend: classification.trend,
        delta: classification.delta,
        health,
        bugs: bugs.to_vec(),
    }
}

fn build_variant_grid(
    current: &WindowSnapshot,
    previous: &WindowSnapshot,
    config: &ReportConfig,
) -> VariantGrid {
    let thresholds = &config.significance;
    let aggregate_test = config.aggregate_test.as_deref();
    let no_tests = IndexMap::new();

    let mut variants: Vec<String> = current.variants.keys().cloned().collect();
    variants.sort();

    let test_names: BTreeSet<&str> = current
        .variants
        .values()
        .flat_map(|tests| tests.keys().map(String::as_str))
        .filter(|name| Some(*name) != aggregate_test)
        .collect();

    let mut tests: IndexMap<String, IndexMap<String, EntityRow>> = test_names
        .iter()
        .map(|name| ((*name).to_string(), IndexMap::new()))
        .collect();
    let mut overall = IndexMap::new();

    for variant in &variants {
        let Some(current_tests) = current.variants.get(variant) else {
            continue;
        };
        let previous_tests = previous.variants.get(variant).unwrap_or(&no_tests);

        for pair in match_entities(current_tests, previous_tests) {
            if Some(pair.current.name.as_str()) == aggregate_test {
                let row = build_row(
                    &pair,
                    thresholds,
                    &config.bands.install_upgrade_overall,
                    None,
                    &[],
                );
                overall.insert(variant.clone(), row);
            } else if let Some(cells) = tests.get_mut(&pair.current.name) {
                let row = build_row(&pair, thresholds, &config.bands.install_upgrade, None, &[]);
                cells.insert(variant.clone(), row);
            }
        }
    }

    VariantGrid {
        variants,
        overall: (!overall.is_empty()).then_some(overall),
        tests,
    }
}
