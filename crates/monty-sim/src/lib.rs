//! monty-sim library: seeded Monty Hall trials, batches and statistics.
//!
//! # Conventions
//!
//! - **Errors**: Domain errors are `thiserror` enums with stable `code()`s;
//!   file loading returns `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`). The
//!   library never installs a subscriber.
//! - **Randomness**: Every draw goes through a [`RandomSource`]; a seeded
//!   [`DeterministicRng`] replays bit-identical runs.

pub mod batch;
pub mod compare;
pub mod config;
pub mod error;
pub mod game;
pub mod rng;
pub mod stats;
pub mod trial;

pub use batch::{BatchOutcome, BatchRunner, Progress, run_batch, run_chunk};
pub use compare::{ComparisonReport, run_strategy_comparison};
pub use config::{
    HostBias, HostModel, PlayerStrategy, Preset, RunPlan, Seed, SimulationConfig, load_run_plan,
};
pub use error::{ConfigError, ManualGameError};
pub use game::{Decision, ManualGame, Outcome, Step};
pub use rng::{DeterministicRng, RandomSource, create_random_source};
pub use stats::{
    ConfidenceInterval, SimulationStats, StatsAccumulator, StrategyComparison, compare_by_strategy,
    compute_statistics,
};
pub use trial::{TrialResult, run_single_trial};
