use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::engine::health::{Band, BandSet};
use crate::engine::significance::SignificanceThresholds;
use crate::error::{Result, TrendError};

pub const DEFAULT_CANARY_LIMIT: usize = 10;
pub const DEFAULT_TOP_FAILING_LIMIT: usize = 25;

/// Health band cutoffs per report section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionBands {
    pub tests: BandSet,
    pub jobs: BandSet,
    pub platforms: BandSet,
    pub install_upgrade: BandSet,
    pub install_upgrade_overall: BandSet,
}

impl Default for SectionBands {
    fn default() -> Self {
        Self {
            tests: BandSet::standard(),
            jobs: BandSet::standard(),
            platforms: BandSet::standard(),
            install_upgrade: BandSet::install_upgrade(),
            install_upgrade_overall: BandSet::install_upgrade_overall(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportConfig {
    pub significance: SignificanceThresholds,
    pub bands: SectionBands,
    pub canary_limit: usize,
    /// Maximum rows in each of the top failing test lists.
    pub top_failing_limit: usize,
    /// Test whose per-variant results form the overall row of the install/upgrade grid.
    pub aggregate_test: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            significance: SignificanceThresholds::default(),
            bands: SectionBands::default(),
            canary_limit: DEFAULT_CANARY_LIMIT,
            top_failing_limit: DEFAULT_TOP_FAILING_LIMIT,
            aggregate_test: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSectionBands {
    tests: Option<Vec<Band>>,
    jobs: Option<Vec<Band>>,
    platforms: Option<Vec<Band>>,
    install_upgrade: Option<Vec<Band>>,
    install_upgrade_overall: Option<Vec<Band>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawReportConfig {
    significance: SignificanceThresholds,
    bands: RawSectionBands,
    canary_limit: Option<usize>,
    top_failing_limit: Option<usize>,
    aggregate_test: Option<String>,
}

impl ReportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;

        debug!("Loaded report configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawReportConfig = serde_json::from_str(json)?;
        let defaults = SectionBands::default();

        let config = Self {
            significance: raw.significance,
            bands: SectionBands {
                tests: section_bands("tests", raw.bands.tests, defaults.tests)?,
                jobs: section_bands("jobs", raw.bands.jobs, defaults.jobs)?,
                platforms: section_bands("platforms", raw.bands.platforms, defaults.platforms)?,
                install_upgrade: section_bands(
                    "install_upgrade",
                    raw.bands.install_upgrade,
                    defaults.install_upgrade,
                )?,
                install_upgrade_overall: section_bands(
                    "install_upgrade_overall",
                    raw.bands.install_upgrade_overall,
                    defaults.install_upgrade_overall,
                )?,
            },
            canary_limit: raw.canary_limit.unwrap_or(DEFAULT_CANARY_LIMIT),
            top_failing_limit: raw.top_failing_limit.unwrap_or(DEFAULT_TOP_FAILING_LIMIT),
            aggregate_test: raw.aggregate_test,
        };

        config.validate()?;
        Ok(config)
    }

    /// Band sets are validated on construction, so only thresholds remain.
    pub fn validate(&self) -> Result<()> {
        self.significance.validate()
    }
}

fn section_bands(section: &str, raw: Option<Vec<Band>>, default: BandSet) -> Result<BandSet> {
    let Some(bands) = raw else {
        return Ok(default);
    };

    BandSet::new(bands).map_err(|err| match err {
        TrendError::Config(message) => TrendError::Config(format!("bands.{section}: {message}")),
        other => other,
    })
}
