// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Mapforge command-line interface.
//!
//! This is the main entry point for the `mapforge` command.

use clap::{ArgAction, Parser, Subcommand};
use miette::Result;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod diagnostic;

/// Mapforge: expression and in-place update generation for mapping methods
#[derive(Debug, Parser)]
#[command(name = "mapforge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate artifacts for a typed compilation unit
    Generate(commands::UnitArgs),

    /// Check that generated artifacts on disk are up to date
    Check(commands::UnitArgs),
}

fn main() -> Result<()> {
    // Install miette's fancy error handler
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(cli.verbose))),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Generate(args) => commands::generate::run(&args),
        Command::Check(args) => commands::check::run(&args),
    };

    // Exit with appropriate code
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{e:?}");
            std::process::exit(1);
        }
    }
}

fn directive_for_verbosity(v: u8) -> &'static str {
    match v {
        0 => "mapforge_cli=warn,mapforge_core=warn",
        1 => "mapforge_cli=debug,mapforge_core=debug",
        _ => "mapforge_cli=trace,mapforge_core=trace",
    }
}
