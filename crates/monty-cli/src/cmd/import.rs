//! `monty import`: validate an export document and re-check its raw data.

use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::{Context as _, Result};
use clap::Args;
use monty_sim::{RunPlan, SimulationStats};
use serde::Serialize;
use tracing::warn;

use crate::export::{RawDataCheck, check_raw_data, parse_export};
use crate::output::{OutputMode, pretty_kv, pretty_section, pretty_stats, render_mode, text_stats};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Export document (JSON) to read.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// JSON output for `monty import`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportOutput {
    file: String,
    version: String,
    export_time: String,
    config: RunPlan,
    stats: SimulationStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_data: Option<RawDataCheck>,
}

/// Execute `monty import`.
///
/// Exits with status 1 when raw data is present and disagrees with the
/// stored stats.
pub fn run_import(args: &ImportArgs, output: OutputMode) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let doc = parse_export(&content)
        .with_context(|| format!("failed to import {}", args.file.display()))?;

    let raw_data = check_raw_data(&doc);
    let mismatch = raw_data.as_ref().is_some_and(|check| !check.matches_stored);
    if mismatch {
        warn!(file = %args.file.display(), "stored stats disagree with raw data");
    }

    let out = ImportOutput {
        file: args.file.display().to_string(),
        version: doc.version,
        export_time: doc.export_time,
        config: doc.config,
        stats: doc.stats,
        raw_data,
    };
    render_mode(output, &out, render_text, render_pretty)?;

    if mismatch {
        process::exit(1);
    }
    Ok(())
}

fn render_text(out: &ImportOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let sim = &out.config.simulation;
    writeln!(
        w,
        "import file={} version={} export_time={} doors={} host={} strategy={} runs={}",
        out.file,
        out.version,
        out.export_time,
        sim.door_count,
        sim.host_model,
        sim.player_strategy,
        out.config.total_runs
    )?;
    text_stats(w, "stored", &out.stats)?;
    match &out.raw_data {
        Some(check) => {
            text_stats(w, "recomputed", &check.recomputed)?;
            writeln!(w, "raw_data records={} matches={}", check.records, check.matches_stored)
        }
        None => writeln!(w, "raw_data absent"),
    }
}

fn render_pretty(out: &ImportOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let sim = &out.config.simulation;
    pretty_section(w, "Imported Export")?;
    pretty_kv(w, "File", &out.file)?;
    pretty_kv(w, "Version", &out.version)?;
    pretty_kv(w, "Exported", &out.export_time)?;
    pretty_kv(w, "Doors", sim.door_count.to_string())?;
    pretty_kv(w, "Host", sim.host_model.as_str())?;
    pretty_kv(w, "Strategy", sim.player_strategy.as_str())?;
    if let Some(seed) = &sim.seed {
        pretty_kv(w, "Seed", seed.to_string())?;
    }
    writeln!(w)?;
    pretty_section(w, "Stored Stats")?;
    pretty_stats(w, &out.stats)?;
    writeln!(w)?;
    match &out.raw_data {
        Some(check) => {
            pretty_section(w, "Raw Data")?;
            pretty_kv(w, "Records", check.records.to_string())?;
            pretty_kv(
                w,
                "Consistent",
                if check.matches_stored {
                    "yes, recomputed stats match"
                } else {
                    "NO, recomputed stats differ"
                },
            )?;
            if !check.matches_stored {
                pretty_stats(w, &check.recomputed)?;
            }
            Ok(())
        }
        None => pretty_kv(w, "Raw data", "not included"),
    }
}
