//! Side-by-side run of every player strategy on one random stream.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::batch::{BatchRunner, Progress};
use crate::config::{PlayerStrategy, SimulationConfig};
use crate::error::ConfigError;
use crate::rng::RandomSource;
use crate::stats::StrategyComparison;
use crate::trial::TrialResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub runs_per_strategy: u64,
    /// Trial records in draw order; empty unless requested.
    pub records: Vec<TrialResult>,
    pub comparison: StrategyComparison,
    pub cancelled: bool,
}

/// Run `total_runs / 3` trials for each strategy, in [`PlayerStrategy::ALL`]
/// order, all drawing from `rng`.
///
/// `config.player_strategy` is overridden per group; every other field is
/// shared. `on_progress` is called after each chunk with progress over the
/// whole comparison and may stop it between chunks. Trial records are kept
/// only when `keep_records` is set; the per-strategy stats never need them.
///
/// # Errors
///
/// Returns a [`ConfigError`] if `config` is invalid.
pub fn run_strategy_comparison<R, F>(
    config: &SimulationConfig,
    rng: &mut R,
    total_runs: u64,
    chunk_size: usize,
    keep_records: bool,
    mut on_progress: F,
) -> Result<ComparisonReport, ConfigError>
where
    R: RandomSource + ?Sized,
    F: FnMut(Progress) -> ControlFlow<()>,
{
    config.validate()?;
    let per_strategy = total_runs / 3;
    let total = per_strategy * 3;

    let mut records = Vec::new();
    let mut comparison = StrategyComparison::default();
    let mut cancelled = false;

    for (index, strategy) in (0_u64..).zip(PlayerStrategy::ALL) {
        let offset = index * per_strategy;
        let runner = BatchRunner::new(config.with_strategy(strategy), &mut *rng, per_strategy)?
            .keep_results(keep_records);
        let mut stop = false;
        let outcome = runner.run_to_completion(chunk_size, |progress, _| {
            let flow = on_progress(Progress {
                completed: offset + progress.completed,
                total,
            });
            stop |= flow.is_break();
            flow
        })?;
        *comparison.get_mut(strategy) = outcome.stats;
        records.extend(outcome.results);
        if stop {
            cancelled = outcome.cancelled || offset + per_strategy < total;
            break;
        }
    }

    info!(
        runs_per_strategy = per_strategy,
        always_switch = comparison.always_switch.win_rate,
        never_switch = comparison.never_switch.win_rate,
        random_switch = comparison.random_switch.win_rate,
        cancelled,
        "strategy comparison complete"
    );
    Ok(ComparisonReport {
        runs_per_strategy: per_strategy,
        records,
        comparison,
        cancelled,
    })
}
