//! Sqlgraph CLI - SQL Server dependency graphs from the command line.
//!
//! Reads an export of object definitions (JSON array or JSON Lines), builds
//! the dependency graph and answers questions about it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::build::OutputFormat;

/// Sqlgraph: dependency graphs for SQL Server code.
#[derive(Parser)]
#[command(name = "sqlgraph")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Analysis configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the dependency graph and print it
    Build {
        /// Object export (JSON array or JSON Lines)
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Analyze each catalog on its own thread
        #[arg(short, long)]
        parallel: bool,
    },

    /// Detect circular dependencies
    Cycles {
        /// Object export (JSON array or JSON Lines)
        input: PathBuf,
    },

    /// Show everything downstream of an object
    Impact {
        /// Object export (JSON array or JSON Lines)
        input: PathBuf,

        /// Object name, e.g. "dbo.Orders" or "[Sales].[dbo].[Orders]"
        object: String,

        /// Maximum number of edges to follow
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Show who reads, writes and calls an object
    Usage {
        /// Object export (JSON array or JSON Lines)
        input: PathBuf,

        /// Object name, e.g. "dbo.Orders" or "[Sales].[dbo].[Orders]"
        object: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Build {
            input,
            format,
            parallel,
        } => cli::build::run(&input, config, format, parallel),
        Commands::Cycles { input } => cli::cycles::run(&input, config),
        Commands::Impact {
            input,
            object,
            depth,
        } => cli::impact::run(&input, config, &object, depth),
        Commands::Usage { input, object } => cli::usage::run(&input, config, &object),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            // Show cause chain for nested errors
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  {}: {cause}", "caused by".dimmed());
                source = std::error::Error::source(cause);
            }
            ExitCode::FAILURE
        }
    }
}
