//! CLI argument parsing and command dispatch.
//!
//! This module provides the command-line interface for shepherd using clap's
//! derive API.
//!
//! # Commands
//!
//! - `init`: Point shepherd at a project board
//! - `move`: Update fields on one or more issues, optionally with their
//!   sub-issues
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! shepherd init --repo acme/widgets --number 7
//! shepherd move 10 --status ready --branch v2.0 -r --depth 5
//! shepherd move 42 43 --status done --dry-run
//! shepherd move 12 --backlog -y
//! ```

mod args;
mod execute;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{InitArgs, MoveArgs};

pub use validators::{validate_depth, validate_field_value, validate_owner, validate_repo};

/// Shepherd - bulk issue transitions on a project board
///
/// Moves issues, and optionally their whole sub-issue trees, through the
/// workflow together. Every issue is validated before anything is changed.
#[derive(Parser, Debug)]
#[command(name = "shepherd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize shepherd in the current directory
    ///
    /// Creates `.shepherd/` with a configuration file and an empty board
    /// snapshot.
    Init(InitArgs),

    /// Update fields on issues
    ///
    /// Sets status, priority, sprint or branch on every target. With
    /// `--recursive` the same change is applied to all sub-issues. Nothing is
    /// changed unless every issue passes the workflow rules.
    Move(MoveArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    ///
    /// # Errors
    ///
    /// Returns the clap error for invalid arguments.
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or, for `move`, if any issue
    /// could not be updated.
    pub async fn execute(&self) -> Result<()> {
        use crate::app::App;
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        match &self.command {
            Some(Commands::Init(args)) => execute::execute_init(args, output_mode).await,
            Some(Commands::Move(args)) => {
                let app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_move(&app, args, output_mode).await
            }
            None => {
                println!("Shepherd bulk issue transitions");
                println!("Use --help for more information");
                Ok(())
            }
        }
    }
}
