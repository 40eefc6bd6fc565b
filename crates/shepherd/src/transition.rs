//! The bulk transition pipeline.
//!
//! A run moves through fixed phases, each finishing before the next starts:
//!
//! 1. Parse the target references (bad tokens are collected, not fatal).
//! 2. Index the project's items.
//! 3. Expand the roots into their sub-issue trees, when recursive.
//! 4. Resolve the requested field values.
//! 5. Validate every candidate against the workflow rules.
//! 6. Preview and confirm, or stop for a dry run.
//! 7. Apply the updates and save the board.
//!
//! Phases 1 to 5 produce a [`TransitionPlan`] without mutating anything.
//! Only a plan whose validation passed can be turned into an
//! [`ApprovedPlan`], and only an approved plan can be executed, so a batch
//! with any blocking validation error never reaches the board.

use crate::board::{Project, ProjectBoard};
use crate::config::ShepherdConfig;
use crate::domain::{CandidateIssue, IssueRef, RepoName};
use crate::error::{Error, Result};
use crate::executor::{BatchExecutor, ExecutionReport, RetryPolicy, UpdatePlan};
use crate::expand::{DEFAULT_MAX_DEPTH, TreeExpander};
use crate::fields::{
    BoardTrackers, FieldNames, FieldRequest, FieldResolver, Resolution, Tracker, TrackerKind,
    TrackerLabels, TrackerLookup,
};
use crate::index::ProjectIndex;
use crate::output::{self, OutputConfig, OutputMode};
use crate::prompt::{LineReader, confirm};
use crate::reference::resolve_references;
use crate::workflow::{ValidationErrors, ValidationReport, WorkflowValidator};
use std::io::{self, Write};

/// Settings that come from configuration rather than the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionSettings {
    /// Owner of the project board
    pub project_owner: String,

    /// Project number
    pub project_number: u64,

    /// Repository for bare issue numbers
    pub default_repo: Option<RepoName>,

    /// Board field names
    pub field_names: FieldNames,

    /// Tracker issue labels
    pub tracker_labels: TrackerLabels,

    /// Whether workflow rules are enforced
    pub workflow_enabled: bool,

    /// Retry policy for sequential updates
    pub retry: RetryPolicy,
}

impl TransitionSettings {
    /// Default settings for project `number` owned by `owner`.
    pub fn new(owner: &str, number: u64) -> Self {
        Self {
            project_owner: owner.to_string(),
            project_number: number,
            default_repo: None,
            field_names: FieldNames::default(),
            tracker_labels: TrackerLabels::default(),
            workflow_enabled: true,
            retry: RetryPolicy::default(),
        }
    }

    /// Settings from `config`, with `repo_override` replacing the configured
    /// default repository.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configured repository is malformed.
    pub fn from_config(config: &ShepherdConfig, repo_override: Option<RepoName>) -> Result<Self> {
        let default_repo = match repo_override {
            Some(repo) => Some(repo),
            None => config.default_repo()?,
        };
        Ok(Self {
            project_owner: config.project.owner.clone(),
            project_number: config.project.number,
            default_repo,
            field_names: config.fields.clone(),
            tracker_labels: config.trackers.clone(),
            workflow_enabled: config.workflow.enabled,
            retry: RetryPolicy::new(config.retry.attempts).with_delay(config.retry.delay()),
        })
    }
}

/// What the user asked for in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    /// Issue reference tokens
    pub targets: Vec<String>,

    /// Field changes
    pub fields: FieldRequest,

    /// Include sub-issues
    pub recursive: bool,

    /// Maximum sub-issue depth below the roots
    pub max_depth: usize,

    /// Preview only
    pub dry_run: bool,

    /// Waive the checklist rule
    pub force: bool,

    /// Skip the multi-issue confirmation
    pub assume_yes: bool,
}

impl TransitionRequest {
    /// A non-recursive live request for `targets`.
    pub fn new<S: Into<String>>(targets: impl IntoIterator<Item = S>, fields: FieldRequest) -> Self {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            fields,
            recursive: false,
            max_depth: DEFAULT_MAX_DEPTH,
            dry_run: false,
            force: false,
            assume_yes: false,
        }
    }

    /// Whether the run touches a single issue named directly
    pub fn is_single(&self) -> bool {
        self.targets.len() == 1 && !self.recursive
    }
}

/// Everything decided before any mutation.
#[derive(Debug)]
pub struct TransitionPlan {
    /// Tokens that did not resolve to an issue
    pub reference_errors: Vec<Error>,

    /// The project being updated
    pub project: Project,

    /// Roots and their descendants, each subtree contiguous
    pub candidates: Vec<CandidateIssue>,

    /// Resolved field values and active branches
    pub resolution: Resolution,

    /// `(field, value)` pairs to write on every tracked candidate
    pub assignments: Vec<(String, String)>,

    /// One verdict per candidate
    pub validation: ValidationReport,

    /// The updates that would be submitted
    pub updates: UpdatePlan,
}

impl TransitionPlan {
    /// Approve the plan for execution.
    ///
    /// # Errors
    ///
    /// Returns every blocking validation error if any candidate failed.
    pub fn approve(&self) -> std::result::Result<ApprovedPlan<'_>, ValidationErrors> {
        if self.validation.is_blocking() {
            Err(self.validation.errors())
        } else {
            Ok(ApprovedPlan { plan: self })
        }
    }
}

/// A plan that passed validation.
#[derive(Debug, Clone, Copy)]
pub struct ApprovedPlan<'p> {
    plan: &'p TransitionPlan,
}

impl ApprovedPlan<'_> {
    /// The underlying plan
    pub fn plan(&self) -> &TransitionPlan {
        self.plan
    }
}

/// Plans and executes transitions against one board.
pub struct TransitionEngine<'a> {
    board: &'a dyn ProjectBoard,
    settings: &'a TransitionSettings,
}

impl<'a> TransitionEngine<'a> {
    /// Create an engine for `board`.
    pub fn new(board: &'a dyn ProjectBoard, settings: &'a TransitionSettings) -> Self {
        Self { board, settings }
    }

    /// Build a plan, looking up trackers on the board.
    ///
    /// # Errors
    ///
    /// - Conflicting or invalid field requests, before any board call
    /// - `Error::NoActiveTracker` when a `current` lookup finds nothing
    /// - Board errors from fetching the project, items or trackers
    pub async fn plan(&self, request: &TransitionRequest) -> Result<TransitionPlan> {
        request.fields.check()?;

        let resolved = resolve_references(&request.targets, self.settings.default_repo.as_ref());
        let tracker_repo = self
            .settings
            .default_repo
            .clone()
            .or_else(|| resolved.refs.first().map(IssueRef::repo_name));
        let trackers = tracker_repo.map(|repo| {
            BoardTrackers::new(self.board, repo, self.settings.tracker_labels.clone())
        });

        let lookup = trackers.as_ref().map(|t| t as &dyn TrackerLookup);
        self.plan_with(request, resolved.refs, resolved.errors, lookup)
            .await
    }

    /// Build a plan using `trackers` for `current` lookups.
    ///
    /// # Errors
    ///
    /// Same as [`TransitionEngine::plan`].
    pub async fn plan_with_trackers(
        &self,
        request: &TransitionRequest,
        trackers: &dyn TrackerLookup,
    ) -> Result<TransitionPlan> {
        request.fields.check()?;
        let resolved = resolve_references(&request.targets, self.settings.default_repo.as_ref());
        self.plan_with(request, resolved.refs, resolved.errors, Some(trackers))
            .await
    }

    async fn plan_with(
        &self,
        request: &TransitionRequest,
        refs: Vec<IssueRef>,
        mut reference_errors: Vec<Error>,
        trackers: Option<&dyn TrackerLookup>,
    ) -> Result<TransitionPlan> {
        for error in &reference_errors {
            tracing::debug!(error = %error, "Skipping unresolved reference");
        }

        let project = self
            .board
            .project(&self.settings.project_owner, self.settings.project_number)
            .await?;
        let index = ProjectIndex::build(self.board, &project, &refs, request.recursive).await?;

        let mut roots = Vec::with_capacity(refs.len());
        for reference in &refs {
            if index.item_id(reference).is_some() {
                roots.push(index.candidate(reference, 0, "", ""));
                continue;
            }
            match self.board.issue(reference).await {
                Ok(issue) => roots.push(index.candidate(reference, 0, &issue.title, &issue.body)),
                Err(e @ Error::IssueNotFound(_)) => {
                    tracing::debug!(issue = %reference, "Issue not found");
                    reference_errors.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        let candidates = if request.recursive && !roots.is_empty() {
            TreeExpander::new(self.board, &index, request.max_depth)
                .expand_trees(&roots)
                .await
        } else {
            roots
        };

        let resolution = if candidates.is_empty() {
            Resolution::default()
        } else {
            match trackers {
                Some(trackers) => FieldResolver::new(trackers).resolve(&request.fields).await?,
                None => FieldResolver::new(&NoTrackers).resolve(&request.fields).await?,
            }
        };

        let names = &self.settings.field_names;
        let assignments = resolution.fields.assignments(names);
        let validation = WorkflowValidator::new(self.settings.workflow_enabled, request.force)
            .validate_all(
                &candidates,
                names,
                &resolution.fields,
                &resolution.active_branches,
            );
        let updates = UpdatePlan::build(&candidates, &assignments);

        tracing::debug!(
            candidates = candidates.len(),
            updates = updates.updates.len(),
            skipped = updates.skipped.len(),
            blocking = validation.is_blocking(),
            "Planned transition"
        );

        Ok(TransitionPlan {
            reference_errors,
            project,
            candidates,
            resolution,
            assignments,
            validation,
            updates,
        })
    }

    /// Apply an approved plan and save the board.
    ///
    /// # Errors
    ///
    /// Returns the board error if saving fails. Failed field updates are not
    /// errors; they are reported in the [`ExecutionReport`].
    pub async fn execute(&self, approved: ApprovedPlan<'_>) -> Result<ExecutionReport> {
        let plan = approved.plan();
        let report = BatchExecutor::new(self.board, &plan.project, self.settings.retry)
            .execute(&plan.updates)
            .await;
        if !report.outcomes.is_empty() {
            self.board.save().await?;
        }
        Ok(report)
    }
}

/// Lookup used when no repository is known; finds nothing.
struct NoTrackers;

#[async_trait::async_trait]
impl TrackerLookup for NoTrackers {
    async fn trackers(&self, _kind: TrackerKind) -> Result<Vec<Tracker>> {
        Ok(Vec::new())
    }
}

/// Terminal streams and settings for an interactive run.
pub struct Console<'a> {
    /// Results: preview, summary, JSON
    pub out: &'a mut dyn Write,

    /// Prompts, warnings and errors
    pub err: &'a mut dyn Write,

    /// Answers to prompts
    pub input: &'a mut dyn LineReader,

    /// Text or JSON
    pub mode: OutputMode,

    /// Colors, icons and width
    pub config: OutputConfig,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// No reference resolved to an issue
    NoTargets,

    /// Preview shown, nothing applied
    DryRun,

    /// Validation failed; nothing applied
    Rejected(ValidationErrors),

    /// The user declined a confirmation; nothing applied
    Declined,

    /// Updates were applied
    Executed(ExecutionReport),
}

/// Result of [`run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Number of targets that did not resolve
    pub reference_errors: usize,

    /// How the run ended
    pub status: RunStatus,
}

impl RunOutcome {
    /// Whether the process should exit successfully.
    pub fn succeeded(&self) -> bool {
        if self.reference_errors > 0 {
            return false;
        }
        match &self.status {
            RunStatus::DryRun | RunStatus::Declined => true,
            RunStatus::NoTargets | RunStatus::Rejected(_) => false,
            RunStatus::Executed(report) => !report.has_failures(),
        }
    }

    /// One-line reason for a failed run.
    pub fn failure_message(&self) -> Option<String> {
        if self.succeeded() {
            return None;
        }
        let message = match &self.status {
            RunStatus::Rejected(errors) => {
                format!("validation failed with {} error(s); no changes were made", errors.len())
            }
            RunStatus::Executed(report) if report.has_failures() => format!(
                "{} of {} issue(s) failed to update",
                report.failed.len(),
                report.failed.len() + report.updated.len()
            ),
            RunStatus::NoTargets => "no issues to update".to_string(),
            _ => format!("{} reference(s) could not be resolved", self.reference_errors),
        };
        Some(message)
    }
}

/// Plan, preview, confirm and execute a transition.
///
/// Multi-issue runs ask for confirmation unless `assume_yes` is set. Runs
/// where `--force` waived a rule always ask, whatever `assume_yes` says.
///
/// # Errors
///
/// Returns fatal planning errors (conflicting options, missing trackers,
/// board failures) and IO errors writing to the console.
pub async fn run(
    engine: &TransitionEngine<'_>,
    request: &TransitionRequest,
    console: &mut Console<'_>,
) -> Result<RunOutcome> {
    let plan = engine.plan(request).await?;
    drive(engine, request, &plan, console).await
}

/// Everything after planning: preview, confirmation and execution.
///
/// # Errors
///
/// Same as [`run`], minus planning errors.
pub async fn drive(
    engine: &TransitionEngine<'_>,
    request: &TransitionRequest,
    plan: &TransitionPlan,
    console: &mut Console<'_>,
) -> Result<RunOutcome> {
    let reference_errors = plan.reference_errors.len();
    let outcome = |status| RunOutcome {
        reference_errors,
        status,
    };
    let json = console.mode == OutputMode::Json;

    if !json {
        output::write_reference_errors(&mut *console.err, &plan.reference_errors, &console.config)?;
    }

    if plan.candidates.is_empty() {
        if json {
            output::write_json(&mut *console.out, &output::json::preview(plan, request.dry_run))?;
        } else {
            writeln!(console.err, "No issues to update.")?;
        }
        return Ok(outcome(RunStatus::NoTargets));
    }

    if request.dry_run {
        if json {
            output::write_json(&mut *console.out, &output::json::preview(plan, true))?;
        } else {
            output::write_preview(&mut *console.out, plan, &console.config)?;
            writeln!(console.out)?;
            writeln!(console.out, "Dry run: no changes were made.")?;
        }
        return Ok(outcome(RunStatus::DryRun));
    }

    let approved = match plan.approve() {
        Ok(approved) => approved,
        Err(errors) => {
            if json {
                output::write_json(&mut *console.out, &output::json::rejected(plan, &errors))?;
            } else {
                output::write_validation_errors(&mut *console.err, &errors, &console.config)?;
            }
            return Ok(outcome(RunStatus::Rejected(errors)));
        }
    };

    if !request.is_single() && !request.assume_yes {
        if !json {
            output::write_preview(&mut *console.err, plan, &console.config)?;
            writeln!(console.err)?;
        }
        let question = format!(
            "Apply {} field update(s) to {} issue(s)?",
            plan.updates.updates.len(),
            plan.updates.tracked.len()
        );
        if !ask(console, &question)? {
            return declined(console, outcome(RunStatus::Declined));
        }
    }

    let forced = plan.validation.forced();
    if !forced.is_empty() {
        output::write_forced_warning(&mut *console.err, &forced, &console.config)?;
        if !ask(console, "Proceed despite the waived checklist rule?")? {
            return declined(console, outcome(RunStatus::Declined));
        }
    }

    let report = engine.execute(approved).await?;

    if json {
        output::write_json(&mut *console.out, &output::json::executed(plan, &report))?;
    } else if request.is_single() {
        output::write_single(&mut *console.out, plan, &report, &console.config)?;
    } else {
        output::write_summary(&mut *console.out, &report, &console.config)?;
    }
    Ok(outcome(RunStatus::Executed(report)))
}

fn ask(console: &mut Console<'_>, question: &str) -> io::Result<bool> {
    confirm(&mut *console.input, &mut *console.err, question)
}

fn declined(console: &mut Console<'_>, outcome: RunOutcome) -> Result<RunOutcome> {
    if console.mode == OutputMode::Json {
        output::write_json(&mut *console.out, &serde_json::json!({ "declined": true }))?;
    } else {
        writeln!(console.err, "Cancelled; no changes were made.")?;
    }
    Ok(outcome)
}
