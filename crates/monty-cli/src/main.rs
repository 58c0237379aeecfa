#![forbid(unsafe_code)]

mod cmd;
mod export;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use monty_sim::{ConfigError, ManualGameError};
use output::{CliError, OutputMode};
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::export::ImportFormatError;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "monty: deterministic Monty Hall simulator",
    long_about = None
)]
struct Cli {
    /// Output format: pretty, text, or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for --format json.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Simulation",
        about = "Run a batch of trials",
        long_about = "Run one configured batch of Monty Hall trials and report win statistics.\n\
                      Parameters come from flags, a TOML plan (--config), or a preset.",
        after_help = "EXAMPLES:\n    # 10,000 classic rounds, always switching\n    monty run\n\n\
                      # Reproducible run with a biased host\n    monty run --host biased --weight 1=0.8 --seed 12345\n\n\
                      # Full JSON export with every trial\n    monty run --preset quick --export json --raw -o run.json"
    )]
    Run(cmd::run::RunArgs),

    #[command(
        next_help_heading = "Simulation",
        about = "Compare player strategies",
        long_about = "Run alwaysSwitch, neverSwitch and randomSwitch against the same host,\n\
                      splitting --runs evenly and drawing from one seeded stream.",
        after_help = "EXAMPLES:\n    # Compare strategies on 30,000 rounds\n    monty compare --runs 30000\n\n\
                      # Ignorant host, CSV out\n    monty compare --host ignorant --csv -o compare.csv\n\n\
                      # Machine-readable output\n    monty compare --format json"
    )]
    Compare(cmd::compare::CompareArgs),

    #[command(
        next_help_heading = "Simulation",
        about = "Play one round by hand",
        long_about = "Play a single round: pick a door, watch the host open a goat door,\n\
                      then stay or switch.",
        after_help = "EXAMPLES:\n    # Pick door 1 and stay\n    monty play --pick 1\n\n\
                      # Pick door 0 and switch to door 2\n    monty play --switch-to 2\n\n\
                      # Five doors, random switch\n    monty play --doors 5 --switch"
    )]
    Play(cmd::play::PlayArgs),

    #[command(
        next_help_heading = "Interoperability",
        about = "Validate an export document",
        long_about = "Read a JSON export, validate its format, and re-check stored stats\n\
                      against raw data when present. Exits 1 on a mismatch.",
        after_help = "EXAMPLES:\n    # Check an export\n    monty import run.json\n\n\
                      # Machine-readable output\n    monty import run.json --json"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        next_help_heading = "Shell",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    monty completions bash\n\n\
                      # Generate zsh completions\n    monty completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MONTY_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "monty=debug,info"
        } else {
            "monty=info,warn"
        })
    });
    let format = env::var("MONTY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);
    match format.as_str() {
        "json" => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_ansi(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Stable code of the first typed error in `err`'s chain.
pub fn error_code(err: &anyhow::Error) -> Option<&'static str> {
    err.chain().find_map(|cause| {
        cause
            .downcast_ref::<ConfigError>()
            .map(ConfigError::code)
            .or_else(|| cause.downcast_ref::<ManualGameError>().map(ManualGameError::code))
            .or_else(|| {
                cause
                    .downcast_ref::<ImportFormatError>()
                    .map(ImportFormatError::code)
            })
    })
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let output = cli.output_mode();
    debug!(?output, "output mode resolved");

    let result = match &cli.command {
        Commands::Run(args) => cmd::run::run_run(args, output),
        Commands::Compare(args) => cmd::compare::run_compare(args, output),
        Commands::Play(args) => cmd::play::run_play(args, output),
        Commands::Import(args) => cmd::import::run_import(args, output),
        Commands::Completions(args) => {
            cmd::completions::run_completions(args, &mut Cli::command())
        }
    };

    match result {
        Err(err) if output.is_json() => {
            output::render_error(output, &CliError::from(&err))?;
            std::process::exit(1);
        }
        other => other,
    }
}
