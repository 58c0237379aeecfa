use crate::game::Step;

/// Invalid simulation configuration.
///
/// Raised before any random draw is made, so a rejected configuration never
/// advances the random stream.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("door count must be at least 3, got {0}")]
    TooFewDoors(usize),

    #[error("{field} must be a probability in [0, 1], got {value}")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },

    #[error("host model `{model}` requires hostBias.{field}")]
    MissingHostBias {
        model: &'static str,
        field: &'static str,
    },

    #[error("weight for door {door} must be positive and finite, got {weight}")]
    NonPositiveWeight { door: usize, weight: f64 },

    #[error("weight given for door {door}, but only {door_count} doors exist")]
    WeightDoorOutOfRange { door: usize, door_count: usize },

    #[error("total weight of eligible doors must be positive and finite, got {0}")]
    NonPositiveTotalWeight(f64),

    #[error("unknown host model `{0}` (expected classic, ignorant, biased, sometimesSilent)")]
    UnknownHostModel(String),

    #[error("unknown player strategy `{0}` (expected alwaysSwitch, neverSwitch, randomSwitch)")]
    UnknownStrategy(String),

    #[error("unknown preset `{0}` (expected quick, standard, advanced)")]
    UnknownPreset(String),
}

impl ConfigError {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::TooFewDoors(_) => "E1001",
            Self::ProbabilityOutOfRange { .. } => "E1002",
            Self::MissingHostBias { .. } => "E1003",
            Self::NonPositiveWeight { .. } => "E1004",
            Self::WeightDoorOutOfRange { .. } => "E1005",
            Self::NonPositiveTotalWeight(_) => "E1006",
            Self::UnknownHostModel(_) => "E1101",
            Self::UnknownStrategy(_) => "E1102",
            Self::UnknownPreset(_) => "E1103",
        }
    }
}

/// Action taken against a manual game that cannot accept it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ManualGameError {
    #[error("cannot {action} while the game is {step}")]
    WrongStep { action: &'static str, step: Step },

    #[error("door {door} does not exist (doors 0..{door_count})")]
    NoSuchDoor { door: usize, door_count: usize },

    #[error("door {0} was opened by the host")]
    DoorAlreadyOpen(usize),

    #[error("door {0} is the current pick; switching must move to another door")]
    SwitchToSamePick(usize),

    #[error("saved game is inconsistent: {0}")]
    InconsistentState(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ManualGameError {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::WrongStep { .. } => "E2001",
            Self::NoSuchDoor { .. } => "E2002",
            Self::DoorAlreadyOpen(_) => "E2003",
            Self::SwitchToSamePick(_) => "E2004",
            Self::InconsistentState(_) => "E2005",
            Self::Config(inner) => inner.code(),
        }
    }
}
