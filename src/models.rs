use serde::{Deserialize, Serialize};

/// Outcome counts for one named entity (test, job or platform) in one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricResult {
    pub name: String,
    pub successes: u64,
    pub failures: u64,
    pub flakes: u64,
}

impl MetricResult {
    pub fn new(name: impl Into<String>, successes: u64, failures: u64, flakes: u64) -> Self {
        Self {
            name: name.into(),
            successes,
            failures,
            flakes,
        }
    }

    /// All runs including flakes, or `None` if the sum does not fit in a `u64`.
    pub fn checked_runs(&self) -> Option<u64> {
        self.successes
            .checked_add(self.failures)?
            .checked_add(self.flakes)
    }

    /// Runs that count towards the pass percentage. Flakes are excluded.
    pub fn total_runs(&self) -> u64 {
        self.successes + self.failures
    }

    pub fn runs_including_flakes(&self) -> u64 {
        self.successes + self.failures + self.flakes
    }

    /// `None` when the entity has no runs in the window.
    pub fn pass_percentage(&self) -> Option<f64> {
        let total = self.total_runs();
        if total == 0 {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let percentage = 100.0 * self.successes as f64 / total as f64;
        Some(percentage)
    }
}

/// A current-window result and its previous-window counterpart, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonPair {
    pub current: MetricResult,
    pub previous: Option<MetricResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improved,
    Regressed,
    Flat,
    NoPreviousData,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub trend: Trend,
    /// Current minus previous pass percentage, when both are defined.
    pub delta: Option<f64>,
}

/// One job run with a cluster of simultaneous test failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureGroup {
    pub job: String,
    pub url: String,
    pub test_failures: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailureGroupSummary {
    pub count: usize,
    pub mean: f64,
    pub median: u64,
}

/// Severity band assigned to a single result. `severity` 0 is the most severe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthBand {
    pub label: String,
    pub severity: usize,
}
