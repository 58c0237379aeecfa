//! Batch runner: many trials, one ordered random stream.
//!
//! Trials run strictly in sequence. Splitting a batch into chunks never
//! reorders or skips draws, so the concatenated chunks of a seeded run equal a
//! single [`run_batch`] call with the same seed.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{PlayerStrategy, SimulationConfig};
use crate::error::ConfigError;
use crate::rng::RandomSource;
use crate::stats::{SimulationStats, StatsAccumulator};
use crate::trial::{TrialResult, simulate};

/// Upper bound on up-front allocation for result vectors; longer runs grow.
const PREALLOC_LIMIT: u64 = 1 << 16;

/// Run `count` trials in draw order.
///
/// The configuration is validated once; an invalid one aborts before any
/// trial runs.
///
/// # Errors
///
/// Returns a [`ConfigError`] if `config` is invalid.
pub fn run_batch<R: RandomSource + ?Sized>(
    config: &SimulationConfig,
    rng: &mut R,
    count: u64,
) -> Result<Vec<TrialResult>, ConfigError> {
    config.validate()?;
    let results = simulate_n(config, rng, count)?;
    info!(
        trials = results.len(),
        host_model = %config.host_model,
        strategy = %config.player_strategy,
        "batch complete"
    );
    Ok(results)
}

/// Run one chunk of at most `chunk_size` trials.
///
/// Callers with their own scheduler call this repeatedly against the same
/// `rng` and concatenate the chunks in call order.
///
/// # Errors
///
/// Returns a [`ConfigError`] if `config` is invalid.
pub fn run_chunk<R: RandomSource + ?Sized>(
    config: &SimulationConfig,
    rng: &mut R,
    chunk_size: usize,
) -> Result<Vec<TrialResult>, ConfigError> {
    config.validate()?;
    simulate_n(config, rng, u64::try_from(chunk_size).unwrap_or(u64::MAX))
}

fn simulate_n<R: RandomSource + ?Sized>(
    config: &SimulationConfig,
    rng: &mut R,
    count: u64,
) -> Result<Vec<TrialResult>, ConfigError> {
    let mut results = Vec::with_capacity(prealloc(count));
    for _ in 0..count {
        results.push(simulate(config, rng)?);
    }
    Ok(results)
}

fn prealloc(count: u64) -> usize {
    usize::try_from(count.min(PREALLOC_LIMIT)).unwrap_or_default()
}

/// How far a chunked run has got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub completed: u64,
    pub total: u64,
}

impl Progress {
    /// `completed / total`; a run with nothing to do counts as done.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

/// Everything a chunked run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    /// Every trial in draw order; empty when the runner discards results.
    pub results: Vec<TrialResult>,
    pub stats: SimulationStats,
    /// True if the caller stopped the run between chunks.
    pub cancelled: bool,
}

/// Chunked batch with explicit progress.
///
/// Holds the random source exclusively for the lifetime of the batch. The
/// caller drives it with [`next_chunk`](Self::next_chunk) from its own loop
/// or scheduler, or hands control to
/// [`run_to_completion`](Self::run_to_completion). Stopping between chunks is
/// the only form of cancellation; a trial is never interrupted.
///
/// By default [`run_to_completion`](Self::run_to_completion) keeps every
/// trial record. [`keep_results(false)`](Self::keep_results) makes it keep
/// only the running stats, so memory stays bounded by the chunk size.
#[derive(Debug)]
pub struct BatchRunner<'a, R: RandomSource + ?Sized> {
    config: SimulationConfig,
    rng: &'a mut R,
    total: u64,
    completed: u64,
    tally: StatsAccumulator,
    keep_results: bool,
}

impl<'a, R: RandomSource + ?Sized> BatchRunner<'a, R> {
    /// Validate `config` and prepare a run of `total_runs` trials.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` is invalid.
    pub fn new(
        config: SimulationConfig,
        rng: &'a mut R,
        total_runs: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.player_strategy != PlayerStrategy::RandomSwitch
            && (config.switch_probability - 0.5).abs() > f64::EPSILON
        {
            warn!(
                strategy = %config.player_strategy,
                switch_probability = config.switch_probability,
                "switchProbability only applies to randomSwitch; ignoring it"
            );
        }
        Ok(Self {
            config,
            rng,
            total: total_runs,
            completed: 0,
            tally: StatsAccumulator::new(),
            keep_results: true,
        })
    }

    /// Whether [`run_to_completion`](Self::run_to_completion) collects the
    /// trial records or only their stats.
    #[must_use]
    pub const fn keep_results(mut self, keep: bool) -> Self {
        self.keep_results = keep;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    #[must_use]
    pub const fn progress(&self) -> Progress {
        Progress {
            completed: self.completed,
            total: self.total,
        }
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.completed >= self.total
    }

    /// Stats over every trial run so far.
    #[must_use]
    pub fn stats(&self) -> SimulationStats {
        self.tally.finish()
    }

    /// Run up to `chunk_size` more trials (at least one).
    ///
    /// Returns `Ok(None)` once the batch is finished.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a weighted host choice cannot be made.
    pub fn next_chunk(&mut self, chunk_size: usize) -> Result<Option<Vec<TrialResult>>, ConfigError> {
        if self.is_finished() {
            return Ok(None);
        }
        let wanted = u64::try_from(chunk_size.max(1)).unwrap_or(u64::MAX);
        let size = wanted.min(self.total - self.completed);

        let chunk = simulate_n(&self.config, &mut *self.rng, size)?;
        self.tally.extend(&chunk);
        self.completed += size;
        debug!(
            completed = self.completed,
            total = self.total,
            chunk = size,
            "chunk complete"
        );
        Ok(Some(chunk))
    }

    /// Drive the batch chunk by chunk until done or told to stop.
    ///
    /// `on_chunk` sees the progress and the chunk just produced; returning
    /// [`ControlFlow::Break`] stops before the next chunk.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a weighted host choice cannot be made.
    pub fn run_to_completion<F>(mut self, chunk_size: usize, mut on_chunk: F) -> Result<BatchOutcome, ConfigError>
    where
        F: FnMut(Progress, &[TrialResult]) -> ControlFlow<()>,
    {
        let mut results = Vec::new();
        let mut cancelled = false;

        while let Some(chunk) = self.next_chunk(chunk_size)? {
            if self.keep_results {
                results.extend_from_slice(&chunk);
            }
            if on_chunk(self.progress(), &chunk).is_break() && !self.is_finished() {
                cancelled = true;
                info!(
                    completed = self.completed,
                    total = self.total,
                    "batch cancelled between chunks"
                );
                break;
            }
        }

        let stats = self.stats();
        if !cancelled {
            info!(
                trials = stats.total_runs,
                wins = stats.wins,
                win_rate = stats.win_rate,
                "batch complete"
            );
        }
        Ok(BatchOutcome {
            results,
            stats,
            cancelled,
        })
    }
}
