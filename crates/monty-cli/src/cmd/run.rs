//! `monty run`: one configured batch, rendered or exported.

use std::io::Write;
use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};
use monty_sim::{BatchRunner, RunPlan, SimulationStats, create_random_source};
use serde::Serialize;
use tracing::debug;

use super::{PlanArgs, ProgressLine, open_output, require_export};
use crate::export::{ExportDocument, OVERALL_LABEL, write_csv, write_json};
use crate::output::{
    OutputMode, percent, pretty_kv, pretty_section, pretty_stats, render_mode, text_stats,
};

/// Export document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Write an export document instead of the summary.
    #[arg(long, value_enum)]
    pub export: Option<ExportFormat>,

    /// Include every trial record in a JSON export.
    #[arg(long)]
    pub raw: bool,

    /// Export destination (defaults to stdout).
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// JSON output for `monty run`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunOutput<'a> {
    seed: String,
    plan: &'a RunPlan,
    stats: SimulationStats,
    cancelled: bool,
}

/// Execute `monty run`.
pub fn run_run(args: &RunArgs, output: OutputMode) -> Result<()> {
    require_export("--raw", args.raw, args.export.is_some())?;
    require_export("--output", args.output.is_some(), args.export.is_some())?;

    let mut plan = args.plan.resolve()?;
    let mut rng = create_random_source(plan.simulation.seed.clone());
    // Record the drawn seed so the export replays exactly.
    plan.simulation.seed = Some(rng.seed().clone());

    let progress = ProgressLine::new(output.is_pretty() && args.export.is_none());
    let keep_raw = args.raw && args.export == Some(ExportFormat::Json);
    let runner = BatchRunner::new(plan.simulation.clone(), &mut rng, plan.total_runs)?
        .keep_results(keep_raw);
    let outcome = runner.run_to_completion(plan.chunk_size, |p, _| {
        progress.update(p);
        ControlFlow::Continue(())
    })?;
    progress.finish();
    debug!(seed = %rng.seed(), "run finished");

    if let Some(format) = args.export {
        let mut out = open_output(args.output.as_deref())?;
        match format {
            ExportFormat::Json => {
                let raw = args.raw.then_some(outcome.results);
                let doc = ExportDocument::new(plan, outcome.stats, raw);
                write_json(&mut out, &doc)?;
            }
            ExportFormat::Csv => write_csv(&mut out, [(OVERALL_LABEL, &outcome.stats)])?,
        }
        out.flush().context("failed to flush export")?;
        return Ok(());
    }

    let out = RunOutput {
        seed: rng.seed().to_string(),
        plan: &plan,
        stats: outcome.stats,
        cancelled: outcome.cancelled,
    };
    render_mode(output, &out, render_text, render_pretty)
}

fn render_text(out: &RunOutput<'_>, w: &mut dyn Write) -> std::io::Result<()> {
    let sim = &out.plan.simulation;
    writeln!(
        w,
        "run seed={} doors={} host={} strategy={} runs={}",
        out.seed, sim.door_count, sim.host_model, sim.player_strategy, out.plan.total_runs
    )?;
    text_stats(w, "stats", &out.stats)
}

fn render_pretty(out: &RunOutput<'_>, w: &mut dyn Write) -> std::io::Result<()> {
    let sim = &out.plan.simulation;
    pretty_section(w, "Monty Hall Simulation")?;
    pretty_kv(w, "Doors", sim.door_count.to_string())?;
    pretty_kv(w, "Host", sim.host_model.as_str())?;
    pretty_kv(w, "Strategy", sim.player_strategy.as_str())?;
    if sim.player_strategy == monty_sim::PlayerStrategy::RandomSwitch {
        pretty_kv(w, "Switch chance", percent(sim.switch_probability))?;
    }
    pretty_kv(w, "Seed", &out.seed)?;
    writeln!(w)?;
    pretty_section(w, "Results")?;
    pretty_stats(w, &out.stats)
}
