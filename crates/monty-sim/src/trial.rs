//! One Monty Hall round: hide the prize, take the first pick, let the host act,
//! apply the player's strategy, score the result.
//!
//! Draw order per trial is fixed: prize door, first pick, host draws, player
//! draws. Changing it changes every seeded result.

use serde::{Deserialize, Serialize};

use crate::config::{HostModel, PlayerStrategy, SimulationConfig};
use crate::error::ConfigError;
use crate::rng::RandomSource;

/// Outcome of a single trial.
///
/// `host_opened_door`, when present, is never `first_pick`. Under `classic`,
/// `biased` and `sometimesSilent` it is never `prize_door` either. Under
/// `ignorant` it may be, and then `can_switch` is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialResult {
    pub host_model: HostModel,
    pub strategy: PlayerStrategy,
    pub prize_door: usize,
    pub first_pick: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_opened_door: Option<usize>,
    /// Whether the player was offered a meaningful switch.
    pub can_switch: bool,
    pub switched: bool,
    pub final_pick: usize,
    pub win: bool,
}

/// Simulate one round.
///
/// # Errors
///
/// Returns a [`ConfigError`] if `config` is invalid. Validation happens before
/// any draw, so `rng` is untouched on error.
pub fn run_single_trial<R: RandomSource + ?Sized>(
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<TrialResult, ConfigError> {
    config.validate()?;
    simulate(config, rng)
}

/// Simulate one round against an already-validated config.
pub(crate) fn simulate<R: RandomSource + ?Sized>(
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<TrialResult, ConfigError> {
    let doors = config.door_count;
    let prize_door = rng.next_int(doors);
    let first_pick = rng.next_int(doors);

    let (host_opened_door, can_switch) = match config.host_model {
        HostModel::Classic => (
            Some(pick_excluding(rng, doors, &[first_pick, prize_door])),
            true,
        ),
        HostModel::Ignorant => {
            let opened = pick_excluding(rng, doors, &[first_pick]);
            // Host spoiled the game: the prize is on show, switching means nothing.
            (Some(opened), opened != prize_door)
        }
        HostModel::Biased => {
            let bias = config.host_bias.as_ref();
            let opened = pick_weighted(rng, doors, &[first_pick, prize_door], |door| {
                bias.map_or(1.0, |b| b.weight(door))
            })?;
            (Some(opened), true)
        }
        HostModel::SometimesSilent => {
            if rng.next_f64() < config.open_probability() {
                (
                    Some(pick_excluding(rng, doors, &[first_pick, prize_door])),
                    true,
                )
            } else {
                (None, false)
            }
        }
    };

    let switched = can_switch
        && match config.player_strategy {
            PlayerStrategy::NeverSwitch => false,
            PlayerStrategy::AlwaysSwitch => true,
            PlayerStrategy::RandomSwitch => rng.next_f64() < config.switch_probability,
        };

    let final_pick = if switched {
        match host_opened_door {
            Some(opened) => pick_excluding(rng, doors, &[first_pick, opened]),
            None => pick_excluding(rng, doors, &[first_pick]),
        }
    } else {
        first_pick
    };

    Ok(TrialResult {
        host_model: config.host_model,
        strategy: config.player_strategy,
        prize_door,
        first_pick,
        host_opened_door,
        can_switch,
        switched,
        final_pick,
        win: final_pick == prize_door,
    })
}

/// Doors in `0..door_count` not in `excluded`, ascending.
fn eligible_doors(door_count: usize, excluded: &[usize]) -> impl Iterator<Item = usize> + '_ {
    (0..door_count).filter(move |door| !excluded.contains(door))
}

/// Uniform choice among the eligible doors, indexed in ascending order.
///
/// `excluded` may repeat a door (e.g. first pick == prize door).
fn pick_excluding<R: RandomSource + ?Sized>(
    rng: &mut R,
    door_count: usize,
    excluded: &[usize],
) -> usize {
    let eligible = eligible_doors(door_count, excluded).count();
    let index = rng.next_int(eligible);
    eligible_doors(door_count, excluded)
        .nth(index)
        .unwrap_or_default()
}

/// Weighted choice among the eligible doors.
///
/// Walks the doors subtracting weights from `u * total` and stops at the first
/// door that brings the remainder to zero or below. Floating-point leftovers
/// land on the last eligible door.
fn pick_weighted<R, W>(
    rng: &mut R,
    door_count: usize,
    excluded: &[usize],
    weight: W,
) -> Result<usize, ConfigError>
where
    R: RandomSource + ?Sized,
    W: Fn(usize) -> f64,
{
    let total: f64 = eligible_doors(door_count, excluded).map(&weight).sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(ConfigError::NonPositiveTotalWeight(total));
    }

    let mut remaining = rng.next_f64() * total;
    let mut last = 0;
    for door in eligible_doors(door_count, excluded) {
        last = door;
        remaining -= weight(door);
        if remaining <= 0.0 {
            return Ok(door);
        }
    }
    Ok(last)
}
