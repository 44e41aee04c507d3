use serde::{Deserialize, Serialize};

use crate::error::{Result, TrendError};
use crate::models::{Classification, ComparisonPair, Trend};

/// Deltas are rounded to nine decimal places so that percentage rounding noise
/// cannot push an exact threshold move over the boundary.
const DELTA_SCALE: f64 = 1e9;

/// Sample-size-adaptive thresholds, in percentage points.
///
/// When the current window has more than `min_runs_for_high_confidence` runs
/// the tighter `high_confidence_threshold` applies, otherwise the looser
/// `low_confidence_threshold` absorbs small-sample noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceThresholds {
    pub min_runs_for_high_confidence: u64,
    pub high_confidence_threshold: f64,
    pub low_confidence_threshold: f64,
}

impl Default for SignificanceThresholds {
    fn default() -> Self {
        Self {
            min_runs_for_high_confidence: 80,
            high_confidence_threshold: 2.0,
            low_confidence_threshold: 5.0,
        }
    }
}

impl SignificanceThresholds {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("high_confidence_threshold", self.high_confidence_threshold),
            ("low_confidence_threshold", self.low_confidence_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TrendError::Config(format!(
                    "{field} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn threshold_for(&self, current_runs: u64) -> f64 {
        if current_runs > self.min_runs_for_high_confidence {
            self.high_confidence_threshold
        } else {
            self.low_confidence_threshold
        }
    }
}

pub fn classify(pair: &ComparisonPair, thresholds: &SignificanceThresholds) -> Classification {
    let Some(previous_percentage) = pair.previous.as_ref().and_then(|p| p.pass_percentage())
    else {
        return Classification {
            trend: Trend::NoPreviousData,
            delta: None,
        };
    };

    let Some(current_percentage) = pair.current.pass_percentage() else {
        return Classification {
            trend: Trend::NoData,
            delta: None,
        };
    };

    let delta = round_delta(current_percentage - previous_percentage);
    let threshold = thresholds.threshold_for(pair.current.total_runs());

    let trend = if delta > threshold {
        Trend::Improved
    } else if delta < -threshold {
        Trend::Regressed
    } else {
        Trend::Flat
    };

    Classification {
        trend,
        delta: Some(delta),
    }
}

fn round_delta(delta: f64) -> f64 {
    (delta * DELTA_SCALE).round() / DELTA_SCALE
}
