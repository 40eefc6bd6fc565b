//! CLI argument structs for all commands.
//!
//! Each command has its own argument struct with clap derive attributes
//! for parsing and validation.

use clap::Parser;

use super::validators::{validate_depth, validate_field_value, validate_owner, validate_repo};
use crate::domain::RepoName;
use crate::expand::DEFAULT_MAX_DEPTH;
use crate::fields::{FieldRequest, FieldTarget};
use crate::transition::TransitionRequest;

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Owner of the project board (user or organization)
    ///
    /// Defaults to the owner of `--repo`.
    #[arg(short, long, value_parser = validate_owner)]
    pub owner: Option<String>,

    /// Project board number
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub number: Option<u64>,

    /// Default repository for bare issue numbers (owner/repo)
    #[arg(long, value_parser = validate_repo)]
    pub repo: Option<RepoName>,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `move` command
#[derive(Parser, Debug, Clone)]
pub struct MoveArgs {
    /// Issues to update: N, #N, owner/repo#N or an issue URL
    #[arg(required = true, num_args = 1..)]
    pub targets: Vec<String>,

    /// New status (e.g. ready, in_progress, done)
    #[arg(short, long, value_parser = validate_field_value)]
    pub status: Option<String>,

    /// New priority
    #[arg(short, long, value_parser = validate_field_value)]
    pub priority: Option<String>,

    /// Sprint name, or "current" for the active microsprint
    #[arg(long, visible_alias = "microsprint", value_parser = validate_field_value)]
    pub sprint: Option<String>,

    /// Branch name, or "current" for the open branch tracker
    #[arg(short, long, value_parser = validate_field_value)]
    pub branch: Option<String>,

    /// Return to backlog: clear branch and sprint
    #[arg(long, conflicts_with_all = ["sprint", "branch"])]
    pub backlog: bool,

    /// Include sub-issues of every target
    #[arg(short, long)]
    pub recursive: bool,

    /// How many sub-issue levels to include with --recursive
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH, value_parser = validate_depth)]
    pub depth: usize,

    /// Show what would change without updating anything
    #[arg(long)]
    pub dry_run: bool,

    /// Allow moving issues with unchecked checklist items
    #[arg(long)]
    pub force: bool,

    /// Skip the confirmation prompt for multi-issue updates
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Repository for bare issue numbers (overrides the configured one)
    #[arg(long, value_parser = validate_repo)]
    pub repo: Option<RepoName>,
}

impl MoveArgs {
    /// The field changes these arguments ask for.
    pub fn field_request(&self) -> FieldRequest {
        let target = |value: &Option<String>| value.as_deref().map(FieldTarget::parse);
        FieldRequest {
            status: target(&self.status),
            priority: target(&self.priority),
            sprint: target(&self.sprint),
            branch: target(&self.branch),
            backlog: self.backlog,
        }
    }

    /// The transition these arguments ask for.
    pub fn request(&self) -> TransitionRequest {
        TransitionRequest {
            targets: self.targets.clone(),
            fields: self.field_request(),
            recursive: self.recursive,
            max_depth: self.depth,
            dry_run: self.dry_run,
            force: self.force,
            assume_yes: self.yes,
        }
    }
}
