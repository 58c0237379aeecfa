//! `monty play`: one manual round, step by step.

use std::io::Write;

use anyhow::{Context as _, Result};
use clap::Args;
use monty_sim::{Decision, ManualGame, Outcome, Seed, TrialResult, create_random_source};
use serde::Serialize;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Number of doors (at least 3).
    #[arg(long, default_value = "3")]
    pub doors: usize,

    /// Door to pick first (0-based).
    #[arg(long, default_value = "0")]
    pub pick: usize,

    /// Switch to a random closed door after the host opens one.
    #[arg(long, conflicts_with = "switch_to")]
    pub switch: bool,

    /// Switch to this closed door after the host opens one.
    #[arg(long, value_name = "DOOR")]
    pub switch_to: Option<usize>,

    /// Seed for a reproducible round.
    #[arg(long, value_parser = super::parse_seed)]
    pub seed: Option<Seed>,
}

impl PlayArgs {
    const fn decision(&self) -> Decision {
        match (self.switch, self.switch_to) {
            (_, Some(door)) => Decision::SwitchTo(door),
            (true, None) => Decision::Switch,
            (false, None) => Decision::Stay,
        }
    }
}

/// JSON output for `monty play`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayOutput {
    seed: String,
    door_count: usize,
    first_pick: usize,
    host_opened: usize,
    switched: bool,
    final_pick: usize,
    prize_door: usize,
    outcome: Outcome,
    record: TrialResult,
}

/// Execute `monty play`.
pub fn run_play(args: &PlayArgs, output: OutputMode) -> Result<()> {
    let mut rng = create_random_source(args.seed.clone());

    let mut game = ManualGame::start(args.doors, &mut rng)?;
    let host_opened = game.pick(args.pick, &mut rng)?;
    let outcome = game.decide(args.decision(), &mut rng)?;

    let record = game
        .to_trial_result()
        .context("round did not finish")?;
    let out = PlayOutput {
        seed: rng.seed().to_string(),
        door_count: game.door_count(),
        first_pick: record.first_pick,
        host_opened,
        switched: record.switched,
        final_pick: record.final_pick,
        prize_door: record.prize_door,
        outcome,
        record,
    };
    render_mode(output, &out, render_text, render_pretty)
}

fn render_text(out: &PlayOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "play seed={} doors={} pick={} host_opened={} switched={} final={} prize={} outcome={}",
        out.seed,
        out.door_count,
        out.first_pick,
        out.host_opened,
        out.switched,
        out.final_pick,
        out.prize_door,
        outcome_word(out.outcome)
    )
}

fn render_pretty(out: &PlayOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Monty Hall: {} doors", out.door_count))?;
    writeln!(w, "1. The prize is hidden behind one of doors 0..{}.", out.door_count)?;
    writeln!(w, "2. You pick door {}.", out.first_pick)?;
    writeln!(w, "3. The host opens door {}: a goat.", out.host_opened)?;
    if out.switched {
        writeln!(w, "4. You switch to door {}.", out.final_pick)?;
    } else {
        writeln!(w, "4. You stay with door {}.", out.final_pick)?;
    }
    writeln!(w, "5. The prize was behind door {}.", out.prize_door)?;
    writeln!(w)?;
    pretty_kv(w, "Outcome", outcome_word(out.outcome))?;
    pretty_kv(w, "Seed", &out.seed)
}

const fn outcome_word(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Win => "win",
        Outcome::Lose => "lose",
    }
}
