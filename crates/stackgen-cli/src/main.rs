//! stackgen CLI tool.

use clap::{ArgAction, Parser, Subcommand};
use stackgen_synth::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "stackgen")]
#[command(version, about = "Synthesize deployment manifests from stack declarations", long_about = None)]
struct Cli {
    /// Path to the stack declaration
    #[arg(short, long, global = true, env = "STACKGEN_FILE", default_value = "stackgen.kdl")]
    file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the manifest for one environment
    Synth {
        /// Environment to synthesize (defaults to the first declared)
        #[arg(short, long, env = "STACKGEN_ENV")]
        env: Option<String>,
        /// Output format (json or yaml)
        #[arg(long, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Write the manifest to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate the declaration against every environment
    Validate,
    /// Show the build order and dependencies
    Graph,
    /// Show the stack outputs for one environment
    Outputs {
        /// Environment to synthesize (defaults to the first declared)
        #[arg(short, long, env = "STACKGEN_ENV")]
        env: Option<String>,
        /// Output format (json or yaml)
        #[arg(long, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    run(cli).inspect_err(|err| {
        let names = commands::involved_names(err);
        if !names.is_empty() {
            eprintln!("Resources involved: {}", names.join(", "));
        }
    })
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Synth {
            env,
            format,
            output,
        } => {
            commands::synth::synth(&cli.file, env.as_deref(), format, output.as_deref())?;
        }
        Commands::Validate => {
            commands::validate(&cli.file)?;
        }
        Commands::Graph => {
            commands::graph(&cli.file)?;
        }
        Commands::Outputs { env, format } => {
            commands::synth::outputs(&cli.file, env.as_deref(), format)?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout only ever carries the rendered manifest.
/// `RUST_LOG` overrides the verbosity flags.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
