//! Interpose command-line tool
//!
//! Inspects the proxy specification the engine derives for a type, and
//! renders or compiles its proxy descriptor.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "interpose")]
#[command(about = "Inspect and render intercepting proxies", long_about = None)]
#[command(version)]
struct Cli {
    /// Options file (reads its [proxy] table); defaults to ./interpose.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in types
    Types,

    /// Show the proxy specification for a type
    Inspect {
        /// Full type name
        type_name: String,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Print the proxy descriptor for a type
    Render {
        /// Full type name
        type_name: String,
        /// Also compile the descriptor and report the result
        #[arg(long)]
        check: bool,
    },
}

/// Output format for `inspect`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable listing
    Text,
    /// Pretty-printed JSON
    Json,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("INTERPOSE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = config::load_options(cli.config.as_deref())?;

    match cli.command {
        Commands::Types => commands::types::execute(),
        Commands::Inspect { type_name, format } => {
            commands::inspect::execute(&type_name, format, options)
        }
        Commands::Render { type_name, check } => {
            commands::render::execute(&type_name, check, options)
        }
    }
}
