use serde::{Deserialize, Serialize};

use crate::error::{Result, TrendError};
use crate::models::HealthBand;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min_percent: f64,
    pub label: String,
}

/// Ordered severity bands, most severe first, lower bounds strictly ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Band>", into = "Vec<Band>")]
pub struct BandSet {
    bands: Vec<Band>,
}

impl BandSet {
    pub fn new(bands: Vec<Band>) -> Result<Self> {
        if bands.is_empty() {
            return Err(TrendError::Config(
                "band set must contain at least one band".to_string(),
            ));
        }

        if let Some(band) = bands
            .iter()
            .find(|b| !(0.0..=100.0).contains(&b.min_percent))
        {
            return Err(TrendError::Config(format!(
                "band {:?} has min_percent {} outside [0, 100]",
                band.label, band.min_percent
            )));
        }

        if let Some(pair) = bands
            .windows(2)
            .find(|w| w[0].min_percent >= w[1].min_percent)
        {
            return Err(TrendError::Config(format!(
                "band {:?} must have a higher min_percent than {:?}",
                pair[1].label, pair[0].label
            )));
        }

        Ok(Self { bands })
    }

    /// Failing / at-risk / healthy cutoffs.
    fn traffic_light(at_risk: f64, healthy: f64) -> Self {
        Self {
            bands: vec![
                Band {
                    min_percent: 0.0,
                    label: "failing".to_string(),
                },
                Band {
                    min_percent: at_risk,
                    label: "at-risk".to_string(),
                },
                Band {
                    min_percent: healthy,
                    label: "healthy".to_string(),
                },
            ],
        }
    }

    pub fn standard() -> Self {
        Self::traffic_light(60.0, 80.0)
    }

    pub fn install_upgrade() -> Self {
        Self::traffic_light(90.0, 95.0)
    }

    pub fn install_upgrade_overall() -> Self {
        Self::traffic_light(85.0, 90.0)
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    fn band(&self, severity: usize) -> HealthBand {
        HealthBand {
            label: self.bands[severity].label.clone(),
            severity,
        }
    }
}

impl TryFrom<Vec<Band>> for BandSet {
    type Error = TrendError;

    fn try_from(bands: Vec<Band>) -> Result<Self> {
        Self::new(bands)
    }
}

impl From<BandSet> for Vec<Band> {
    fn from(set: BandSet) -> Self {
        set.bands
    }
}

/// Picks the least severe band whose lower bound the pass percentage reaches.
///
/// No runs, or a percentage below every cutoff, yields the most severe band.
pub fn classify(pass_percentage: Option<f64>, total_runs: u64, bands: &BandSet) -> HealthBand {
    let Some(percentage) = pass_percentage.filter(|_| total_runs > 0) else {
        return bands.band(0);
    };

    let severity = bands
        .bands
        .iter()
        .rposition(|b| b.min_percent <= percentage)
        .unwrap_or(0);

    bands.band(severity)
}
