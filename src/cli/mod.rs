//! Command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "smelter",
    version,
    about = "Closed-loop smell remediation for generated unit tests"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate tests, then remediate smells to convergence
    Run(commands::run::RunArgs),

    /// One-shot smell detection pass over the generated tests
    Detect(commands::detect::DetectArgs),

    /// Measure JaCoCo coverage for target classes
    Coverage(commands::coverage::CoverageArgs),
}

/// Report a fatal error and exit non-zero.
pub fn handle_error(err: &anyhow::Error) -> ! {
    eprintln!("error: {err:#}");
    std::process::exit(1);
}
