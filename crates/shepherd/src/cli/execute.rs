//! Command execution logic.

use anyhow::Result;
use std::io;

use super::args::{InitArgs, MoveArgs};
use crate::app::App;
use crate::output::{self, OutputConfig, OutputMode};
use crate::prompt::StdinReader;
use crate::transition::{self, Console, TransitionEngine};

/// Execute the init command
pub async fn execute_init(args: &InitArgs, output_mode: OutputMode) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;
    let quiet = args.quiet || output_mode == OutputMode::Json;

    if !quiet {
        println!("Initializing shepherd...");
    }

    let result = init::init(
        &current_dir,
        args.owner.as_deref(),
        args.number,
        args.repo.as_ref(),
    )
    .await?;

    match output_mode {
        OutputMode::Json => {
            output::print_json(&serde_json::json!({
                "shepherd_dir": result.shepherd_dir.display().to_string(),
                "config_file": result.config_file.display().to_string(),
                "board_file": result.board_file.display().to_string(),
                "owner": result.owner,
                "number": result.number,
            }))?;
        }
        OutputMode::Text if !args.quiet => {
            println!("Initialized shepherd in {}", result.shepherd_dir.display());
            println!("  Config:  {}", result.config_file.display());
            println!("  Board:   {}", result.board_file.display());
            println!("  Project: {} #{}", result.owner, result.number);
        }
        OutputMode::Text => {}
    }

    Ok(())
}

/// Execute the move command
pub async fn execute_move(app: &App, args: &MoveArgs, output_mode: OutputMode) -> Result<()> {
    let settings = app.settings(args.repo.clone())?;
    let engine = TransitionEngine::new(app.board(), &settings);
    let request = args.request();

    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();
    let mut input = StdinReader;
    let mut console = Console {
        out: &mut out,
        err: &mut err,
        input: &mut input,
        mode: output_mode,
        config: OutputConfig::from_env(),
    };

    let outcome = transition::run(&engine, &request, &mut console).await?;
    tracing::debug!(status = ?outcome.status, "Move finished");

    if let Some(message) = outcome.failure_message() {
        anyhow::bail!("{message}");
    }

    Ok(())
}
