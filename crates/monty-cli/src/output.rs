//! Shared output layer for pretty/text/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly: pretty output for humans, compact `key=value` text for
//! scripts, or stable JSON.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` / hidden `--json` flag
//! 2. `FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 3. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.

use clap::ValueEnum;
use monty_sim::SimulationStats;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<16} {}", format!("{key}:"), value.as_ref())
}

/// Pretty block for one set of stats.
pub fn pretty_stats(w: &mut dyn Write, stats: &SimulationStats) -> io::Result<()> {
    pretty_kv(w, "Runs", stats.total_runs.to_string())?;
    pretty_kv(
        w,
        "Wins / losses",
        format!("{} / {}", stats.wins, stats.losses),
    )?;
    pretty_kv(w, "Win rate", percent(stats.win_rate))?;
    pretty_kv(w, "Std. error", format!("{:.4}", stats.standard_error))?;
    pretty_kv(
        w,
        "95% CI",
        format!(
            "[{}, {}]",
            percent(stats.confidence_interval.lower),
            percent(stats.confidence_interval.upper)
        ),
    )
}

/// One `key=value` line for one set of stats.
pub fn text_stats(w: &mut dyn Write, label: &str, stats: &SimulationStats) -> io::Result<()> {
    writeln!(
        w,
        "{label} runs={} wins={} losses={} win_rate={:.6} standard_error={:.6} ci_lower={:.6} ci_upper={:.6}",
        stats.total_runs,
        stats.wins,
        stats.losses,
        stats.win_rate,
        stats.standard_error,
        stats.confidence_interval.lower,
        stats.confidence_interval.upper
    )
}

/// `0.6667` → `"66.67%"`.
pub fn percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized output (sections, aligned key/value lines).
    Pretty,
    /// Plain `key=value` lines for scripts and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    /// Returns `true` if pretty output was requested.
    pub const fn is_pretty(self) -> bool {
        matches!(self, Self::Pretty)
    }
}

/// Core resolution logic, separated from I/O for testability.
///
/// `format_flag`: explicit `--format` value if provided.
/// `json_flag`: hidden `--json` alias.
/// `format_env`: the value of `FORMAT` if set.
/// `is_tty`: true if stdout is a TTY.
fn resolve_output_mode_inner(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&str>,
    is_tty: bool,
) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }

    if json_flag {
        return OutputMode::Json;
    }

    if let Some(val) = format_env {
        match val.to_lowercase().as_str() {
            "json" => return OutputMode::Json,
            "text" => return OutputMode::Text,
            "pretty" => return OutputMode::Pretty,
            _ => {} // unknown value, use TTY detection
        }
    }

    if is_tty {
        OutputMode::Pretty
    } else {
        OutputMode::Text
    }
}

/// Resolve the output mode from CLI flags, environment, and TTY defaults.
pub fn resolve_output_mode(format_flag: Option<OutputMode>, json_flag: bool) -> OutputMode {
    let env_val = std::env::var("FORMAT").ok();
    let is_tty = io::stdout().is_terminal();
    resolve_output_mode_inner(format_flag, json_flag, env_val.as_deref(), is_tty)
}

/// Render a serializable value with explicit pretty/text renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    render_to(&mut out, mode, value, text_fn, pretty_fn)
}

fn render_to<T: Serialize>(
    out: &mut dyn Write,
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, out)?,
        OutputMode::Pretty => pretty_fn(value, out)?,
    }
    Ok(())
}

/// A structured error with an optional machine-readable code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message, including its context chain.
    pub message: String,
    /// Stable code (e.g. `E1001`) when the failure maps to a typed error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl From<&anyhow::Error> for CliError {
    fn from(err: &anyhow::Error) -> Self {
        Self {
            message: format!("{err:#}"),
            error_code: crate::error_code(err).map(str::to_string),
        }
    }
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(&mut out, mode, error)
}

fn write_error(out: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut *out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            write!(out, "error: {}", error.message)?;
            match &error.error_code {
                Some(code) => writeln!(out, " [{code}]")?,
                None => writeln!(out)?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use monty_sim::ConfigError;

    #[test]
    fn output_mode_predicates() {
        assert!(OutputMode::Json.is_json());
        assert!(!OutputMode::Text.is_json());
        assert!(OutputMode::Pretty.is_pretty());
        assert!(!OutputMode::Json.is_pretty());
    }

    #[test]
    fn resolve_format_flag_wins_over_json_and_env() {
        let mode = resolve_output_mode_inner(Some(OutputMode::Text), true, Some("json"), true);
        assert_eq!(mode, OutputMode::Text);
    }

    #[test]
    fn resolve_json_flag_wins_over_env() {
        let mode = resolve_output_mode_inner(None, true, Some("pretty"), true);
        assert_eq!(mode, OutputMode::Json);
    }

    #[test]
    fn resolve_format_env_case_insensitive() {
        assert_eq!(
            resolve_output_mode_inner(None, false, Some("JSON"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode_inner(None, false, Some("Text"), true),
            OutputMode::Text
        );
        assert_eq!(
            resolve_output_mode_inner(None, false, Some("pretty"), false),
            OutputMode::Pretty
        );
    }

    #[test]
    fn resolve_format_env_unknown_falls_through_to_tty() {
        assert_eq!(
            resolve_output_mode_inner(None, false, Some("yaml"), true),
            OutputMode::Pretty
        );
        assert_eq!(
            resolve_output_mode_inner(None, false, Some("yaml"), false),
            OutputMode::Text
        );
    }

    #[test]
    fn resolve_default_follows_tty() {
        assert_eq!(
            resolve_output_mode_inner(None, false, None, true),
            OutputMode::Pretty
        );
        assert_eq!(
            resolve_output_mode_inner(None, false, None, false),
            OutputMode::Text
        );
    }

    #[test]
    fn render_json_output() {
        let mut buf = Vec::new();
        let stats = SimulationStats::from_counts(10, 7);
        render_to(&mut buf, OutputMode::Json, &stats, |_, _| Ok(()), |_, _| Ok(()))
            .expect("render");
        let json: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(json["wins"], 7);
        assert_eq!(json["totalRuns"], 10);
    }

    #[test]
    fn render_text_and_pretty_use_their_closures() {
        let stats = SimulationStats::from_counts(4, 1);

        let mut buf = Vec::new();
        render_to(
            &mut buf,
            OutputMode::Text,
            &stats,
            |s, w| text_stats(w, "overall", s),
            |_, w| writeln!(w, "pretty"),
        )
        .expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("overall runs=4 wins=1 losses=3 win_rate=0.250000"));

        let mut buf = Vec::new();
        render_to(
            &mut buf,
            OutputMode::Pretty,
            &stats,
            |_, w| writeln!(w, "text"),
            |s, w| pretty_stats(w, s),
        )
        .expect("render");
        let pretty = String::from_utf8(buf).expect("utf8");
        assert!(pretty.contains("Win rate:        25.00%"));
        assert!(pretty.contains("Wins / losses:   1 / 3"));
    }

    #[test]
    fn pretty_section_draws_rule() {
        let mut buf = Vec::new();
        pretty_section(&mut buf, "Results").expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Results"));
        assert_eq!(lines.next().map(str::len), Some(PRETTY_RULE_WIDTH));
    }

    #[test]
    fn error_carries_code_from_typed_cause() {
        let err = anyhow::Error::new(ConfigError::TooFewDoors(2)).context("invalid run plan");
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E1001"));
        assert!(cli.message.starts_with("invalid run plan: door count"));

        let mut buf = Vec::new();
        write_error(&mut buf, OutputMode::Json, &cli).expect("write");
        let json: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(json["error"]["error_code"], "E1001");

        let mut buf = Vec::new();
        write_error(&mut buf, OutputMode::Text, &cli).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("error: invalid run plan"));
        assert!(text.trim_end().ends_with("[E1001]"));
    }

    #[test]
    fn error_without_typed_cause_has_no_code() {
        let err = anyhow::anyhow!("disk on fire");
        let cli = CliError::from(&err);
        assert!(cli.error_code.is_none());
        assert_eq!(cli.message, "disk on fire");
    }
}
