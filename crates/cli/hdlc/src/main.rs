//! HDL elaboration CLI
//!
//! Runs elaboration passes over a serialized design tree

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod assert_pre;

#[derive(Parser)]
#[command(name = "hdlc")]
#[command(about = "HDL elaboration passes", long_about = None)]
#[command(version)]
struct Cli {
    /// Log pass activity at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// How to print the rewritten tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Indented tree dump
    Dump,
    /// Serialized JSON design
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind clocks to assertions in a design tree
    AssertPre {
        /// Path to the JSON design tree
        tree: PathBuf,

        /// Driver options file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Tree dump level for every pass
        #[arg(long)]
        dump_tree: Option<u32>,

        /// Directory receiving tree dumps
        #[arg(long)]
        dump_dir: Option<PathBuf>,

        /// Print the rewritten tree
        #[arg(long, value_enum, num_args = 0..=1, default_missing_value = "dump")]
        emit: Option<Emit>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    if let Err(error) = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
    {
        eprintln!("failed to install log subscriber: {error}");
    }
}


fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let passed = match cli.command {
        Commands::AssertPre {
            tree,
            config,
            dump_tree,
            dump_dir,
            emit,
        } => assert_pre::assert_pre(&assert_pre::Args {
            tree,
            config,
            dump_tree,
            dump_dir,
            emit,
        })?,
    };

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
