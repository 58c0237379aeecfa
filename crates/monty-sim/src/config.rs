//! Simulation configuration, run plans, and presets.
//!
//! Field names serialize in camelCase (`doorCount`, `hostModel`, ...) so that
//! exported documents and TOML plan files share one shape.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Seed for the random source. A number `N` seeds exactly like the text `"N"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seed {
    Number(u64),
    Text(String),
}

impl Seed {
    /// Text form fed to the seed hash.
    #[must_use]
    pub fn canonical(&self) -> Cow<'_, str> {
        match self {
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<u64> for Seed {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Seed {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl FromStr for Seed {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(s.parse::<u64>().map_or_else(|_| Self::from(s), Self::Number))
    }
}

/// Fold `sometimes-silent`, `sometimes_silent` and `SometimesSilent` together.
fn normalize_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Policy the host follows when opening a door.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostModel {
    /// Always opens a goat door the player did not pick.
    #[default]
    Classic,
    /// Opens any door the player did not pick, possibly revealing the prize.
    Ignorant,
    /// Opens a goat door chosen by per-door weights.
    Biased,
    /// Acts like `Classic` with probability `openProbability`, otherwise opens nothing.
    SometimesSilent,
}

impl HostModel {
    pub const ALL: [Self; 4] = [
        Self::Classic,
        Self::Ignorant,
        Self::Biased,
        Self::SometimesSilent,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Ignorant => "ignorant",
            Self::Biased => "biased",
            Self::SometimesSilent => "sometimesSilent",
        }
    }
}

impl fmt::Display for HostModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = normalize_name(s);
        Self::ALL
            .into_iter()
            .find(|model| normalize_name(model.as_str()) == wanted)
            .ok_or_else(|| ConfigError::UnknownHostModel(s.to_string()))
    }
}

/// Policy the player follows once the host has acted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerStrategy {
    #[default]
    AlwaysSwitch,
    NeverSwitch,
    /// Switch with probability `switchProbability`.
    RandomSwitch,
}

impl PlayerStrategy {
    pub const ALL: [Self; 3] = [Self::AlwaysSwitch, Self::NeverSwitch, Self::RandomSwitch];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlwaysSwitch => "alwaysSwitch",
            Self::NeverSwitch => "neverSwitch",
            Self::RandomSwitch => "randomSwitch",
        }
    }
}

impl fmt::Display for PlayerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = normalize_name(s);
        Self::ALL
            .into_iter()
            .find(|strategy| normalize_name(strategy.as_str()) == wanted)
            .ok_or_else(|| ConfigError::UnknownStrategy(s.to_string()))
    }
}

/// Extra host parameters for the `biased` and `sometimesSilent` models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostBias {
    /// Sparse door-index → weight map. Unlisted doors weigh 1.
    #[serde(default, with = "door_weights", skip_serializing_if = "BTreeMap::is_empty")]
    pub weights: BTreeMap<usize, f64>,
    /// Probability the host opens a door at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_probability: Option<f64>,
}

impl HostBias {
    /// Weight for `door`, defaulting to 1.
    #[must_use]
    pub fn weight(&self, door: usize) -> f64 {
        self.weights.get(&door).copied().unwrap_or(1.0)
    }

    /// Sum of every door's weight, summed in door order.
    ///
    /// Any eligible subset the host draws from sums to no more than this.
    #[must_use]
    pub fn total_weight(&self, door_count: usize) -> f64 {
        (0..door_count).map(|door| self.weight(door)).sum()
    }
}

/// Door weights keyed by stringified index, so JSON objects and TOML tables
/// both round-trip.
mod door_weights {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        weights: &BTreeMap<usize, f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let keyed: BTreeMap<String, f64> = weights
            .iter()
            .map(|(door, weight)| (door.to_string(), *weight))
            .collect();
        keyed.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<usize, f64>, D::Error> {
        let keyed = BTreeMap::<String, f64>::deserialize(deserializer)?;
        keyed
            .into_iter()
            .map(|(key, weight)| {
                key.trim()
                    .parse::<usize>()
                    .map(|door| (door, weight))
                    .map_err(|_| D::Error::custom(format!("door index `{key}` is not a number")))
            })
            .collect()
    }
}

/// Parameters of one Monty Hall experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    #[serde(default = "default_door_count")]
    pub door_count: usize,
    #[serde(default)]
    pub host_model: HostModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_bias: Option<HostBias>,
    #[serde(default)]
    pub player_strategy: PlayerStrategy,
    /// Only consulted by [`PlayerStrategy::RandomSwitch`].
    #[serde(default = "default_switch_probability")]
    pub switch_probability: f64,
    /// `None` seeds from OS entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<Seed>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            door_count: default_door_count(),
            host_model: HostModel::default(),
            host_bias: None,
            player_strategy: PlayerStrategy::default(),
            switch_probability: default_switch_probability(),
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Check every constraint the trial engine relies on.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.door_count < 3 {
            return Err(ConfigError::TooFewDoors(self.door_count));
        }
        check_probability("switchProbability", self.switch_probability)?;

        if let Some(bias) = &self.host_bias {
            for (&door, &weight) in &bias.weights {
                if door >= self.door_count {
                    return Err(ConfigError::WeightDoorOutOfRange {
                        door,
                        door_count: self.door_count,
                    });
                }
                if !(weight.is_finite() && weight > 0.0) {
                    return Err(ConfigError::NonPositiveWeight { door, weight });
                }
            }
            let total = bias.total_weight(self.door_count);
            if !total.is_finite() {
                return Err(ConfigError::NonPositiveTotalWeight(total));
            }
            if let Some(p) = bias.open_probability {
                check_probability("hostBias.openProbability", p)?;
            }
        }

        match self.host_model {
            HostModel::Biased if self.host_bias.is_none() => Err(ConfigError::MissingHostBias {
                model: HostModel::Biased.as_str(),
                field: "weights",
            }),
            HostModel::SometimesSilent
                if self
                    .host_bias
                    .as_ref()
                    .and_then(|bias| bias.open_probability)
                    .is_none() =>
            {
                Err(ConfigError::MissingHostBias {
                    model: HostModel::SometimesSilent.as_str(),
                    field: "openProbability",
                })
            }
            _ => Ok(()),
        }
    }

    /// Copy of this config with a different player strategy.
    #[must_use]
    pub fn with_strategy(&self, strategy: PlayerStrategy) -> Self {
        Self {
            player_strategy: strategy,
            ..self.clone()
        }
    }

    /// Probability the `sometimesSilent` host acts. Defaults to 1.
    #[must_use]
    pub fn open_probability(&self) -> f64 {
        self.host_bias
            .as_ref()
            .and_then(|bias| bias.open_probability)
            .unwrap_or(1.0)
    }
}

fn check_probability(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange { field, value })
    }
}

/// A configuration plus how many trials to run and how to chunk them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPlan {
    #[serde(default = "default_total_runs")]
    pub total_runs: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for RunPlan {
    fn default() -> Self {
        Self {
            total_runs: default_total_runs(),
            chunk_size: default_chunk_size(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl RunPlan {
    /// Validate configuration before running.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.total_runs == 0 {
            bail!("totalRuns must be > 0");
        }
        if self.chunk_size == 0 {
            bail!("chunkSize must be > 0");
        }
        self.simulation.validate()?;
        Ok(())
    }
}

/// Load a [`RunPlan`] from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed. The plan is not
/// validated; call [`RunPlan::validate`] after applying overrides.
pub fn load_run_plan(path: &Path) -> Result<RunPlan> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<RunPlan>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Canned parameter combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Preset {
    /// 1 000 classic runs, for a fast sanity check.
    Quick,
    /// 10 000 classic runs.
    Standard,
    /// 100 000 runs on 5 doors with a biased host and a coin-flip player.
    Advanced,
}

impl Preset {
    #[must_use]
    pub fn plan(self) -> RunPlan {
        match self {
            Self::Quick => RunPlan {
                total_runs: 1_000,
                ..RunPlan::default()
            },
            Self::Standard => RunPlan {
                total_runs: 10_000,
                ..RunPlan::default()
            },
            Self::Advanced => RunPlan {
                total_runs: 100_000,
                chunk_size: default_chunk_size(),
                simulation: SimulationConfig {
                    door_count: 5,
                    host_model: HostModel::Biased,
                    host_bias: Some(HostBias {
                        weights: BTreeMap::from([(1, 0.8)]),
                        open_probability: Some(0.8),
                    }),
                    player_strategy: PlayerStrategy::RandomSwitch,
                    ..SimulationConfig::default()
                },
            },
        }
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "quick" => Ok(Self::Quick),
            "standard" => Ok(Self::Standard),
            "advanced" => Ok(Self::Advanced),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}

const fn default_door_count() -> usize {
    3
}

const fn default_switch_probability() -> f64 {
    0.5
}

const fn default_total_runs() -> u64 {
    10_000
}

const fn default_chunk_size() -> usize {
    1_000
}
