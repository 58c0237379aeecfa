pub mod compare;
pub mod completions;
pub mod import;
pub mod play;
pub mod run;

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use clap::Args;
use monty_sim::{HostBias, HostModel, PlayerStrategy, Preset, RunPlan, Seed, load_run_plan};
use tracing::{debug, warn};

/// Flags shared by `monty run` and `monty compare`.
///
/// Precedence, highest first: explicit flag, `--config` file, `--preset`,
/// built-in defaults.
#[derive(Args, Debug, Default)]
pub struct PlanArgs {
    /// TOML run plan to start from.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Named parameter set: quick, standard, advanced.
    #[arg(long)]
    pub preset: Option<Preset>,

    /// Number of trials to run.
    #[arg(long, short = 'n')]
    pub runs: Option<u64>,

    /// Trials per chunk between progress updates.
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Number of doors (at least 3).
    #[arg(long)]
    pub doors: Option<usize>,

    /// Host model: classic, ignorant, biased, sometimes-silent.
    #[arg(long)]
    pub host: Option<HostModel>,

    /// Player strategy: always-switch, never-switch, random-switch.
    #[arg(long)]
    pub strategy: Option<PlayerStrategy>,

    /// Switch probability for the random-switch strategy.
    #[arg(long)]
    pub switch_probability: Option<f64>,

    /// Host door weight as DOOR=WEIGHT (repeatable).
    #[arg(long = "weight", value_name = "DOOR=WEIGHT", value_parser = parse_weight)]
    pub weights: Vec<(usize, f64)>,

    /// Probability that a sometimes-silent host opens a door.
    #[arg(long)]
    pub open_probability: Option<f64>,

    /// Seed for a reproducible run (number or text).
    #[arg(long, value_parser = parse_seed)]
    pub seed: Option<Seed>,
}

impl PlanArgs {
    /// Build and validate the run plan these flags describe.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or the resulting
    /// plan is invalid.
    pub fn resolve(&self) -> Result<RunPlan> {
        let mut plan = match (&self.config, self.preset) {
            (Some(path), preset) => {
                if preset.is_some() {
                    warn!(path = %path.display(), "--config takes precedence over --preset");
                }
                load_run_plan(path)?
            }
            (None, Some(preset)) => preset.plan(),
            (None, None) => RunPlan::default(),
        };

        if let Some(runs) = self.runs {
            plan.total_runs = runs;
        }
        if let Some(chunk_size) = self.chunk_size {
            plan.chunk_size = chunk_size;
        }

        let sim = &mut plan.simulation;
        if let Some(doors) = self.doors {
            sim.door_count = doors;
        }
        if let Some(host) = self.host {
            sim.host_model = host;
        }
        if let Some(strategy) = self.strategy {
            sim.player_strategy = strategy;
        }
        if let Some(p) = self.switch_probability {
            sim.switch_probability = p;
        }
        if !self.weights.is_empty() || self.open_probability.is_some() {
            let bias = sim.host_bias.get_or_insert_with(HostBias::default);
            bias.weights.extend(self.weights.iter().copied());
            if let Some(p) = self.open_probability {
                bias.open_probability = Some(p);
            }
        }
        if let Some(seed) = &self.seed {
            sim.seed = Some(seed.clone());
        }

        plan.validate().context("invalid run plan")?;
        debug!(?plan, "resolved run plan");
        Ok(plan)
    }
}

/// Digits become [`Seed::Number`], anything else [`Seed::Text`].
pub fn parse_seed(raw: &str) -> std::result::Result<Seed, std::convert::Infallible> {
    raw.parse()
}

fn parse_weight(raw: &str) -> std::result::Result<(usize, f64), String> {
    let (door, weight) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected DOOR=WEIGHT, got `{raw}`"))?;
    let door = door
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("door `{door}` is not an index"))?;
    let weight = weight
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("weight `{weight}` is not a number"))?;
    Ok((door, weight))
}

/// Open `path` for writing, or stdout when `None`.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create output file {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

/// Single-line progress on stderr, only when a human is watching.
#[derive(Debug)]
pub struct ProgressLine {
    enabled: bool,
}

impl ProgressLine {
    pub fn new(pretty: bool) -> Self {
        Self {
            enabled: pretty && io::stderr().is_terminal(),
        }
    }

    pub fn update(&self, progress: monty_sim::Progress) {
        if self.enabled {
            eprint!(
                "\r{:>6.1}% ({}/{})",
                progress.fraction() * 100.0,
                progress.completed,
                progress.total
            );
        }
    }

    pub fn finish(&self) {
        if self.enabled {
            eprint!("\r{:<40}\r", "");
        }
    }
}

/// Reject flag combinations that only make sense with an export.
pub fn require_export(flag: &str, present: bool, exporting: bool) -> Result<()> {
    if present && !exporting {
        bail!("{flag} only applies together with --export");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use monty_sim::ConfigError;

    #[test]
    fn parse_weight_accepts_door_equals_weight() {
        assert_eq!(parse_weight("1=0.8"), Ok((1, 0.8)));
        assert_eq!(parse_weight(" 2 = 3 "), Ok((2, 3.0)));
        assert!(parse_weight("1").is_err());
        assert!(parse_weight("x=1").is_err());
        assert!(parse_weight("1=heavy").is_err());
    }

    #[test]
    fn defaults_resolve_to_default_plan() {
        let plan = PlanArgs::default().resolve().expect("valid");
        assert_eq!(plan, RunPlan::default());
    }

    #[test]
    fn flags_override_preset() {
        let args = PlanArgs {
            preset: Some(Preset::Advanced),
            runs: Some(50),
            strategy: Some(PlayerStrategy::NeverSwitch),
            weights: vec![(2, 0.5)],
            seed: Some(Seed::from("s")),
            ..PlanArgs::default()
        };
        let plan = args.resolve().expect("valid");
        assert_eq!(plan.total_runs, 50);
        assert_eq!(plan.simulation.door_count, 5);
        assert_eq!(plan.simulation.host_model, HostModel::Biased);
        assert_eq!(plan.simulation.player_strategy, PlayerStrategy::NeverSwitch);
        let bias = plan.simulation.host_bias.expect("bias");
        assert!((bias.weight(1) - 0.8).abs() < f64::EPSILON);
        assert!((bias.weight(2) - 0.5).abs() < f64::EPSILON);
        assert_eq!(plan.simulation.seed, Some(Seed::from("s")));
    }

    #[test]
    fn config_file_beats_preset_and_flags_beat_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plan.toml");
        std::fs::write(
            &path,
            "totalRuns = 300\n[simulation]\ndoorCount = 4\nhostModel = \"ignorant\"\n",
        )
        .expect("write");

        let args = PlanArgs {
            config: Some(path),
            preset: Some(Preset::Advanced),
            doors: Some(6),
            ..PlanArgs::default()
        };
        let plan = args.resolve().expect("valid");
        assert_eq!(plan.total_runs, 300);
        assert_eq!(plan.simulation.host_model, HostModel::Ignorant);
        assert_eq!(plan.simulation.door_count, 6);
    }

    #[test]
    fn invalid_result_is_rejected_with_code() {
        let args = PlanArgs {
            doors: Some(2),
            ..PlanArgs::default()
        };
        let err = args.resolve().expect_err("two doors");
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::TooFewDoors(2))
        );
    }

    #[test]
    fn open_probability_creates_bias() {
        let args = PlanArgs {
            host: Some(HostModel::SometimesSilent),
            open_probability: Some(0.25),
            ..PlanArgs::default()
        };
        let plan = args.resolve().expect("valid");
        assert!((plan.simulation.open_probability() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn export_only_flags_need_export() {
        assert!(require_export("--raw", true, false).is_err());
        assert!(require_export("--raw", true, true).is_ok());
        assert!(require_export("--raw", false, false).is_ok());
    }
}
