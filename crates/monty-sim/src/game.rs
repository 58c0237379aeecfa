//! Interactive round driven one step at a time by a human player.
//!
//! The host always follows the classic rule here: it opens a goat door the
//! player did not pick, chosen uniformly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{HostModel, PlayerStrategy};
use crate::error::{ConfigError, ManualGameError};
use crate::rng::RandomSource;
use crate::trial::TrialResult;

/// Where a manual game currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    AwaitingPick,
    Deciding,
    Finished,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AwaitingPick => "awaiting a pick",
            Self::Deciding => "waiting for a switch decision",
            Self::Finished => "finished",
        })
    }
}

/// The player's answer to "do you want to switch?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Stay,
    /// Switch to a uniformly chosen closed door.
    Switch,
    /// Switch to a specific closed door.
    SwitchTo(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Win,
    Lose,
}

/// A manual round in progress.
///
/// Deserializing re-checks every door index and the fields each [`Step`]
/// requires, so a restored game upholds the same invariants as a played one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SavedGame")]
pub struct ManualGame {
    door_count: usize,
    prize_door: usize,
    picked_door: Option<usize>,
    opened_door: Option<usize>,
    final_door: Option<usize>,
    switched: bool,
    step: Step,
}

/// Unchecked wire form of [`ManualGame`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedGame {
    door_count: usize,
    prize_door: usize,
    picked_door: Option<usize>,
    opened_door: Option<usize>,
    final_door: Option<usize>,
    switched: bool,
    step: Step,
}

impl TryFrom<SavedGame> for ManualGame {
    type Error = ManualGameError;

    fn try_from(saved: SavedGame) -> Result<Self, Self::Error> {
        if saved.door_count < 3 {
            return Err(ConfigError::TooFewDoors(saved.door_count).into());
        }
        let game = Self {
            door_count: saved.door_count,
            prize_door: saved.prize_door,
            picked_door: saved.picked_door,
            opened_door: saved.opened_door,
            final_door: saved.final_door,
            switched: saved.switched,
            step: saved.step,
        };
        for door in [Some(game.prize_door), game.picked_door, game.opened_door, game.final_door]
            .into_iter()
            .flatten()
        {
            game.check_door(door)?;
        }
        game.check_step_fields()?;
        Ok(game)
    }
}

impl ManualGame {
    /// Hide the prize behind one of `door_count` doors.
    ///
    /// # Errors
    ///
    /// Fails if `door_count < 3`.
    pub fn start<R: RandomSource + ?Sized>(
        door_count: usize,
        rng: &mut R,
    ) -> Result<Self, ManualGameError> {
        if door_count < 3 {
            return Err(ConfigError::TooFewDoors(door_count).into());
        }
        Ok(Self {
            door_count,
            prize_door: rng.next_int(door_count),
            picked_door: None,
            opened_door: None,
            final_door: None,
            switched: false,
            step: Step::AwaitingPick,
        })
    }

    #[must_use]
    pub const fn step(&self) -> Step {
        self.step
    }

    #[must_use]
    pub const fn door_count(&self) -> usize {
        self.door_count
    }

    #[must_use]
    pub const fn picked_door(&self) -> Option<usize> {
        self.picked_door
    }

    #[must_use]
    pub const fn opened_door(&self) -> Option<usize> {
        self.opened_door
    }

    #[must_use]
    pub const fn final_door(&self) -> Option<usize> {
        self.final_door
    }

    /// Prize location, revealed only once the game is finished.
    #[must_use]
    pub fn revealed_prize(&self) -> Option<usize> {
        (self.step == Step::Finished).then_some(self.prize_door)
    }

    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        let final_door = self.final_door?;
        Some(if final_door == self.prize_door {
            Outcome::Win
        } else {
            Outcome::Lose
        })
    }

    /// Doors still closed and not picked: the valid switch targets.
    #[must_use]
    pub fn switch_targets(&self) -> Vec<usize> {
        (0..self.door_count)
            .filter(|door| Some(*door) != self.picked_door && Some(*door) != self.opened_door)
            .collect()
    }

    /// Record the first pick; the host answers by opening a goat door.
    ///
    /// Returns the door the host opened.
    ///
    /// # Errors
    ///
    /// Fails outside [`Step::AwaitingPick`] or if `door` does not exist.
    pub fn pick<R: RandomSource + ?Sized>(
        &mut self,
        door: usize,
        rng: &mut R,
    ) -> Result<usize, ManualGameError> {
        self.expect_step(Step::AwaitingPick, "pick a door")?;
        self.check_door(door)?;

        let candidates: Vec<usize> = (0..self.door_count)
            .filter(|d| *d != door && *d != self.prize_door)
            .collect();
        let opened = candidates[rng.next_int(candidates.len())];

        self.picked_door = Some(door);
        self.opened_door = Some(opened);
        self.step = Step::Deciding;
        Ok(opened)
    }

    /// Stay or switch, then reveal.
    ///
    /// # Errors
    ///
    /// Fails outside [`Step::Deciding`], or when a `SwitchTo` target is the
    /// current pick, the opened door, or out of range.
    pub fn decide<R: RandomSource + ?Sized>(
        &mut self,
        decision: Decision,
        rng: &mut R,
    ) -> Result<Outcome, ManualGameError> {
        self.expect_step(Step::Deciding, "decide")?;
        let picked = self.picked_door.unwrap_or_default();

        let final_door = match decision {
            Decision::Stay => picked,
            Decision::Switch => {
                let targets = self.switch_targets();
                targets[rng.next_int(targets.len())]
            }
            Decision::SwitchTo(door) => {
                self.check_door(door)?;
                if door == picked {
                    return Err(ManualGameError::SwitchToSamePick(door));
                }
                if Some(door) == self.opened_door {
                    return Err(ManualGameError::DoorAlreadyOpen(door));
                }
                door
            }
        };

        self.final_door = Some(final_door);
        self.switched = final_door != picked;
        self.step = Step::Finished;
        Ok(if final_door == self.prize_door {
            Outcome::Win
        } else {
            Outcome::Lose
        })
    }

    /// The finished game as a trial record.
    #[must_use]
    pub fn to_trial_result(&self) -> Option<TrialResult> {
        let final_pick = self.final_door?;
        let first_pick = self.picked_door?;
        Some(TrialResult {
            host_model: HostModel::Classic,
            strategy: if self.switched {
                PlayerStrategy::AlwaysSwitch
            } else {
                PlayerStrategy::NeverSwitch
            },
            prize_door: self.prize_door,
            first_pick,
            host_opened_door: self.opened_door,
            can_switch: true,
            switched: self.switched,
            final_pick,
            win: final_pick == self.prize_door,
        })
    }

    fn expect_step(&self, wanted: Step, action: &'static str) -> Result<(), ManualGameError> {
        if self.step == wanted {
            Ok(())
        } else {
            Err(ManualGameError::WrongStep {
                action,
                step: self.step,
            })
        }
    }

    fn check_step_fields(&self) -> Result<(), ManualGameError> {
        use ManualGameError::InconsistentState;

        let (picked, opened) = match (self.step, self.picked_door, self.opened_door) {
            (Step::AwaitingPick, None, None) if self.final_door.is_none() && !self.switched => {
                return Ok(());
            }
            (Step::AwaitingPick, ..) => {
                return Err(InconsistentState("nothing is picked before the first pick"));
            }
            (_, Some(picked), Some(opened)) => (picked, opened),
            _ => return Err(InconsistentState("a picked game needs a pick and an opened door")),
        };
        if opened == picked || opened == self.prize_door {
            return Err(InconsistentState("the host opened the pick or the prize"));
        }
        match (self.step, self.final_door) {
            (Step::Deciding, None) if !self.switched => Ok(()),
            (Step::Finished, Some(final_door))
                if final_door != opened && self.switched == (final_door != picked) =>
            {
                Ok(())
            }
            _ => Err(InconsistentState("final door does not match the step")),
        }
    }

    const fn check_door(&self, door: usize) -> Result<(), ManualGameError> {
        if door < self.door_count {
            Ok(())
        } else {
            Err(ManualGameError::NoSuchDoor {
                door,
                door_count: self.door_count,
            })
        }
    }
}
