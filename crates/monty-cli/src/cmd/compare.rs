//! `monty compare`: every strategy against the same host, side by side.

use std::io::Write;
use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use monty_sim::{PlayerStrategy, StrategyComparison, create_random_source, run_strategy_comparison};
use serde::Serialize;

use super::{PlanArgs, ProgressLine, open_output, require_export};
use crate::export::write_csv;
use crate::output::{OutputMode, percent, pretty_kv, pretty_rule, pretty_section, text_stats};

#[derive(Args, Debug)]
pub struct CompareArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Write the comparison as CSV, one row per strategy.
    #[arg(long)]
    pub csv: bool,

    /// CSV destination (defaults to stdout).
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// JSON output for `monty compare`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareOutput {
    seed: String,
    door_count: usize,
    host_model: String,
    runs_per_strategy: u64,
    comparison: StrategyComparison,
    cancelled: bool,
}

/// Execute `monty compare`.
pub fn run_compare(args: &CompareArgs, output: OutputMode) -> Result<()> {
    require_export("--output", args.output.is_some(), args.csv)?;

    let plan = args.plan.resolve()?;
    let mut rng = create_random_source(plan.simulation.seed.clone());

    let progress = ProgressLine::new(output.is_pretty() && !args.csv);
    let report = run_strategy_comparison(
        &plan.simulation,
        &mut rng,
        plan.total_runs,
        plan.chunk_size,
        false,
        |p| {
            progress.update(p);
            ControlFlow::Continue(())
        },
    )?;
    progress.finish();

    if args.csv {
        let mut out = open_output(args.output.as_deref())?;
        write_csv(
            &mut out,
            report
                .comparison
                .rows()
                .map(|(strategy, stats)| (strategy.as_str(), stats)),
        )?;
        out.flush().context("failed to flush export")?;
        return Ok(());
    }

    let out = CompareOutput {
        seed: rng.seed().to_string(),
        door_count: plan.simulation.door_count,
        host_model: plan.simulation.host_model.to_string(),
        runs_per_strategy: report.runs_per_strategy,
        comparison: report.comparison,
        cancelled: report.cancelled,
    };
    crate::output::render_mode(output, &out, render_text, render_pretty)
}

fn render_text(out: &CompareOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "compare seed={} doors={} host={} runs_per_strategy={}",
        out.seed, out.door_count, out.host_model, out.runs_per_strategy
    )?;
    for (strategy, stats) in out.comparison.rows() {
        text_stats(w, strategy.as_str(), stats)?;
    }
    Ok(())
}

fn render_pretty(out: &CompareOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Strategy Comparison")?;
    pretty_kv(w, "Doors", out.door_count.to_string())?;
    pretty_kv(w, "Host", &out.host_model)?;
    pretty_kv(w, "Runs each", out.runs_per_strategy.to_string())?;
    pretty_kv(w, "Seed", &out.seed)?;
    writeln!(w)?;
    writeln!(
        w,
        "{:<14} {:>9} {:>9} {:>9} {:>19}",
        "Strategy", "Wins", "Losses", "Win rate", "95% CI"
    )?;
    pretty_rule(w)?;
    for (strategy, stats) in out.comparison.rows() {
        writeln!(
            w,
            "{:<14} {:>9} {:>9} {:>9} {:>19}",
            strategy.as_str(),
            stats.wins,
            stats.losses,
            percent(stats.win_rate),
            format!(
                "{} - {}",
                percent(stats.confidence_interval.lower),
                percent(stats.confidence_interval.upper)
            )
        )?;
    }
    let best = out
        .comparison
        .rows()
        .max_by(|a, b| a.1.win_rate.total_cmp(&b.1.win_rate))
        .map_or(PlayerStrategy::AlwaysSwitch, |(strategy, _)| strategy);
    writeln!(w)?;
    pretty_kv(w, "Best", best.as_str())
}
