//! # readygate CLI Module
//!
//! ## Available Commands
//!
//! - `run` - Replay a scenario and print the run report
//! - `check` - Resolve every submission in a scenario without running it
//! - `states` - List the engine lifecycle states in order
//! - `operations` - List the bridge operations a scenario may submit

mod commands;

use clap::{Parser, Subcommand};
use readygate::ScenarioError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// readygate - replay engine startup scenarios against a readiness gate
#[derive(Parser, Debug)]
#[command(name = "readygate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a scenario file
    Run {
        /// Path to the scenario (TOML)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Validate a scenario file without running it
    Check {
        /// Path to the scenario (TOML)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List lifecycle states
    States,

    /// List bridge operations and their signatures
    Operations,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), ScenarioError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Run { file } => cmd_run(&file, json_mode),
        Commands::Check { file } => cmd_check(&file, json_mode),
        Commands::States => {
            cmd_states(json_mode);
            Ok(())
        }
        Commands::Operations => cmd_operations(json_mode),
    }
}
