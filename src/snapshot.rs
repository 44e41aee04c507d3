use indexmap::IndexMap;
use log::{info, warn};
use serde::Deserialize;
use std::path::Path;

use crate::engine::aggregate::reduce_by_group;
use crate::engine::platform::{platform_of, UNKNOWN_PLATFORM};
use crate::error::{Result, TrendError};
use crate::models::{FailureGroup, MetricResult};

#[derive(Debug, Deserialize)]
struct RawEntity {
    name: String,
    #[serde(default)]
    successes: i64,
    #[serde(default)]
    failures: i64,
    #[serde(default)]
    flakes: i64,
    /// Known bug links, only read for tests.
    #[serde(default)]
    bugs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawJob {
    name: String,
    #[serde(default)]
    successes: i64,
    #[serde(default)]
    failures: i64,
    #[serde(default)]
    flakes: i64,
    platform: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVariant {
    name: String,
    #[serde(default)]
    tests: Vec<RawEntity>,
}

#[derive(Debug, Deserialize)]
struct RawFailureGroup {
    job: String,
    #[serde(default)]
    url: String,
    test_failures: i64,
}

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    tests: Vec<RawEntity>,
    #[serde(default)]
    jobs: Vec<RawJob>,
    platforms: Option<Vec<RawEntity>>,
    #[serde(default)]
    variants: Vec<RawVariant>,
    #[serde(default)]
    failure_groups: Vec<RawFailureGroup>,
}

/// Validated, already-aggregated counts for one time window.
#[derive(Debug, Clone, Default)]
pub struct WindowSnapshot {
    pub tests: IndexMap<String, MetricResult>,
    pub test_bugs: IndexMap<String, Vec<String>>,
    pub jobs: IndexMap<String, MetricResult>,
    pub job_platforms: IndexMap<String, String>,
    pub job_urls: IndexMap<String, String>,
    pub platforms: IndexMap<String, MetricResult>,
    pub variants: IndexMap<String, IndexMap<String, MetricResult>>,
    pub failure_groups: Vec<FailureGroup>,
}

impl WindowSnapshot {
    pub fn load(path: &Path, window: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&json, window)?;

        info!(
            "Loaded {window} window from {}: {} tests, {} jobs, {} platforms, {} variants, {} failure groups",
            path.display(),
            snapshot.tests.len(),
            snapshot.jobs.len(),
            snapshot.platforms.len(),
            snapshot.variants.len(),
            snapshot.failure_groups.len()
        );

        Ok(snapshot)
    }

    pub fn from_json(json: &str, window: &str) -> Result<Self> {
        let raw: RawSnapshot = serde_json::from_str(json)?;
        Self::validate(raw, window)
    }

    fn validate(raw: RawSnapshot, window: &str) -> Result<Self> {
        let test_bugs: IndexMap<String, Vec<String>> = raw
            .tests
            .iter()
            .filter(|test| !test.bugs.is_empty())
            .map(|test| (test.name.clone(), test.bugs.clone()))
            .collect();
        let tests = collect_entities(window, "test", raw.tests)?;

        let mut job_platforms = IndexMap::new();
        let mut job_urls = IndexMap::new();
        let mut jobs = IndexMap::new();
        for job in raw.jobs {
            let result = to_metric(window, &job.name, job.successes, job.failures, job.flakes)?;
            if jobs.contains_key(&job.name) {
                return Err(duplicate(window, "job", job.name));
            }
            job_platforms.insert(
                job.name.clone(),
                platform_of(&job.name, job.platform.as_deref()),
            );
            if let Some(url) = job.url {
                job_urls.insert(job.name.clone(), url);
            }
            jobs.insert(job.name, result);
        }

        let platforms = match raw.platforms {
            Some(platforms) => collect_entities(window, "platform", platforms)?,
            None => reduce_by_group(jobs.values(), |job| {
                job_platforms
                    .get(&job.name)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_PLATFORM.to_string())
            })?,
        };

        let mut variants = IndexMap::new();
        for variant in raw.variants {
            if variants.contains_key(&variant.name) {
                return Err(duplicate(window, "variant", variant.name));
            }
            let tests = collect_entities(window, "variant test", variant.tests)?;
            variants.insert(variant.name, tests);
        }

        let failure_groups = raw
            .failure_groups
            .into_iter()
            .map(|group| {
                Ok(FailureGroup {
                    test_failures: non_negative(
                        window,
                        &group.job,
                        "test_failures",
                        group.test_failures,
                    )?,
                    job: group.job,
                    url: group.url,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if tests.is_empty() {
            warn!("{window} window has no test results");
        }
        if jobs.is_empty() {
            warn!("{window} window has no job results");
        }

        Ok(Self {
            tests,
            test_bugs,
            jobs,
            job_platforms,
            job_urls,
            platforms,
            variants,
            failure_groups,
        })
    }
}

fn collect_entities(
    window: &str,
    granularity: &'static str,
    raw: Vec<RawEntity>,
) -> Result<IndexMap<String, MetricResult>> {
    let mut entities = IndexMap::with_capacity(raw.len());
    for entity in raw {
        let result = to_metric(
            window,
            &entity.name,
            entity.successes,
            entity.failures,
            entity.flakes,
        )?;
        if entities.contains_key(&entity.name) {
            return Err(duplicate(window, granularity, entity.name));
        }
        entities.insert(entity.name, result);
    }
    Ok(entities)
}

fn to_metric(
    window: &str,
    name: &str,
    successes: i64,
    failures: i64,
    flakes: i64,
) -> Result<MetricResult> {
    let result = MetricResult::new(
        name,
        non_negative(window, name, "successes", successes)?,
        non_negative(window, name, "failures", failures)?,
        non_negative(window, name, "flakes", flakes)?,
    );

    if result.checked_runs().is_none() {
        return Err(TrendError::CountOverflow {
            entity: name.to_string(),
        });
    }
    Ok(result)
}

fn non_negative(window: &str, entity: &str, field: &'static str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| TrendError::NegativeCount {
        window: window.to_string(),
        entity: entity.to_string(),
        field,
        value,
    })
}

fn duplicate(window: &str, granularity: &'static str, name: String) -> TrendError {
    TrendError::DuplicateEntity {
        window: window.to_string(),
        granularity,
        name,
    }
}
