//! Win/loss statistics with a normal-approximation confidence interval.

use serde::{Deserialize, Serialize};

use crate::config::PlayerStrategy;
use crate::trial::TrialResult;

/// z-score for a two-sided 95% interval.
pub const Z_95: f64 = 1.96;

/// Lower and upper bound of a confidence interval, clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// Aggregate over a set of trial results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStats {
    pub total_runs: u64,
    pub wins: u64,
    pub losses: u64,
    /// `wins / total_runs`, or 0 when there are no runs.
    pub win_rate: f64,
    pub standard_error: f64,
    pub confidence_interval: ConfidenceInterval,
}

impl SimulationStats {
    /// Derive the full record from raw counts.
    ///
    /// `wins` is capped at `total_runs`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_counts(total_runs: u64, wins: u64) -> Self {
        let wins = wins.min(total_runs);
        if total_runs == 0 {
            return Self::default();
        }

        let n = total_runs as f64;
        let win_rate = wins as f64 / n;
        let standard_error = (win_rate * (1.0 - win_rate) / n).sqrt();
        let margin = Z_95 * standard_error;

        Self {
            total_runs,
            wins,
            losses: total_runs - wins,
            win_rate,
            standard_error,
            confidence_interval: ConfidenceInterval {
                lower: (win_rate - margin).max(0.0),
                upper: (win_rate + margin).min(1.0),
            },
        }
    }
}

/// Running win/loss tally.
///
/// Pushing results chunk by chunk and calling [`finish`](Self::finish) gives
/// the same stats as [`compute_statistics`] over the concatenation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsAccumulator {
    total_runs: u64,
    wins: u64,
}

impl StatsAccumulator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            total_runs: 0,
            wins: 0,
        }
    }

    pub fn push(&mut self, result: &TrialResult) {
        self.total_runs += 1;
        if result.win {
            self.wins += 1;
        }
    }

    #[must_use]
    pub const fn total_runs(&self) -> u64 {
        self.total_runs
    }

    #[must_use]
    pub fn finish(&self) -> SimulationStats {
        SimulationStats::from_counts(self.total_runs, self.wins)
    }
}

impl<'a> Extend<&'a TrialResult> for StatsAccumulator {
    fn extend<I: IntoIterator<Item = &'a TrialResult>>(&mut self, iter: I) {
        for result in iter {
            self.push(result);
        }
    }
}

/// Reduce any collection of results into [`SimulationStats`].
#[must_use]
pub fn compute_statistics<'a, I>(results: I) -> SimulationStats
where
    I: IntoIterator<Item = &'a TrialResult>,
{
    let mut acc = StatsAccumulator::new();
    acc.extend(results);
    acc.finish()
}

/// Per-strategy stats side by side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyComparison {
    pub always_switch: SimulationStats,
    pub never_switch: SimulationStats,
    pub random_switch: SimulationStats,
}

impl StrategyComparison {
    #[must_use]
    pub const fn get(&self, strategy: PlayerStrategy) -> &SimulationStats {
        match strategy {
            PlayerStrategy::AlwaysSwitch => &self.always_switch,
            PlayerStrategy::NeverSwitch => &self.never_switch,
            PlayerStrategy::RandomSwitch => &self.random_switch,
        }
    }

    pub fn get_mut(&mut self, strategy: PlayerStrategy) -> &mut SimulationStats {
        match strategy {
            PlayerStrategy::AlwaysSwitch => &mut self.always_switch,
            PlayerStrategy::NeverSwitch => &mut self.never_switch,
            PlayerStrategy::RandomSwitch => &mut self.random_switch,
        }
    }

    /// `(strategy, stats)` rows in canonical order.
    pub fn rows(&self) -> impl Iterator<Item = (PlayerStrategy, &SimulationStats)> {
        PlayerStrategy::ALL
            .into_iter()
            .map(move |strategy| (strategy, self.get(strategy)))
    }
}

/// Split results by the strategy that produced them and aggregate each group.
#[must_use]
pub fn compare_by_strategy<'a, I>(results: I) -> StrategyComparison
where
    I: IntoIterator<Item = &'a TrialResult>,
{
    let mut always = StatsAccumulator::new();
    let mut never = StatsAccumulator::new();
    let mut random = StatsAccumulator::new();
    for result in results {
        match result.strategy {
            PlayerStrategy::AlwaysSwitch => always.push(result),
            PlayerStrategy::NeverSwitch => never.push(result),
            PlayerStrategy::RandomSwitch => random.push(result),
        }
    }
    StrategyComparison {
        always_switch: always.finish(),
        never_switch: never.finish(),
        random_switch: random.finish(),
    }
}
