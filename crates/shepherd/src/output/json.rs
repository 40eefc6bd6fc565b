//! JSON views of transition plans and reports.
//!
//! These borrow from the plan so nothing is cloned just to be printed.

use crate::domain::{BatchOutcome, IssueRef};
use crate::executor::{ExecutionReport, FieldFailure, Summary};
use crate::transition::TransitionPlan;
use crate::workflow::{ValidationError, ValidationErrors, Verdict};
use serde::Serialize;

/// One candidate and its verdict.
#[derive(Debug, Serialize)]
pub struct CandidateJson<'a> {
    /// Issue reference
    pub issue: &'a IssueRef,
    /// Issue title
    pub title: &'a str,
    /// Depth below its root
    pub depth: usize,
    /// Whether the issue is on the board
    pub tracked: bool,
    /// `pass`, `pass_with_force`, `fail` or `skip_not_tracked`
    pub verdict: &'static str,
    /// Errors behind a failed or forced verdict
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub errors: &'a [ValidationError],
}

/// One field change.
#[derive(Debug, Serialize)]
pub struct ChangeJson<'a> {
    /// Board field name
    pub field: &'a str,
    /// New value; `null` clears the field
    pub value: Option<&'a str>,
}

/// Preview of a plan, as printed by `--dry-run --json`.
#[derive(Debug, Serialize)]
pub struct PreviewJson<'a> {
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Whether any verdict blocks execution
    pub blocked: bool,
    /// Every candidate in display order
    pub candidates: Vec<CandidateJson<'a>>,
    /// Changes applied to every tracked candidate
    pub changes: Vec<ChangeJson<'a>>,
    /// Tokens that did not resolve
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference_errors: Vec<String>,
}

/// A run rejected by validation.
#[derive(Debug, Serialize)]
pub struct RejectedJson<'a> {
    /// Always true
    pub rejected: bool,
    /// Every blocking error
    pub errors: &'a ValidationErrors,
    /// Tokens that did not resolve
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference_errors: Vec<String>,
}

/// Issues whose updates failed.
#[derive(Debug, Serialize)]
pub struct FailedJson<'a> {
    /// Issue reference
    pub issue: &'a IssueRef,
    /// Fields that could not be set
    pub fields: &'a [FieldFailure],
}

/// Result of an executed run.
#[derive(Debug, Serialize)]
pub struct ExecutedJson<'a> {
    /// Counts
    pub summary: Summary,
    /// Issues fully updated
    pub updated: &'a [IssueRef],
    /// Issues not on the board
    pub skipped: &'a [IssueRef],
    /// Issues with at least one failed field
    pub failed: Vec<FailedJson<'a>>,
    /// Whether updates were applied one by one after the batch failed
    pub fell_back: bool,
    /// One row per submitted update
    pub outcomes: &'a [BatchOutcome],
    /// Tokens that did not resolve
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference_errors: Vec<String>,
}

fn verdict_name(verdict: &Verdict) -> &'static str {
    match verdict {
        Verdict::Pass => "pass",
        Verdict::PassWithForce(_) => "pass_with_force",
        Verdict::Fail(_) => "fail",
        Verdict::SkipNotTracked => "skip_not_tracked",
    }
}

fn reference_errors(plan: &TransitionPlan) -> Vec<String> {
    plan.reference_errors.iter().map(ToString::to_string).collect()
}

/// Preview view of `plan`.
pub fn preview(plan: &TransitionPlan, dry_run: bool) -> PreviewJson<'_> {
    let candidates = plan
        .candidates
        .iter()
        .map(|candidate| {
            let verdict = plan.validation.verdict(&candidate.reference);
            let errors: &[ValidationError] = match verdict {
                Some(Verdict::Fail(errors) | Verdict::PassWithForce(errors)) => errors,
                _ => &[],
            };
            CandidateJson {
                issue: &candidate.reference,
                title: &candidate.title,
                depth: candidate.depth,
                tracked: candidate.is_tracked(),
                verdict: verdict.map_or("skip_not_tracked", verdict_name),
                errors,
            }
        })
        .collect();
    let changes = plan
        .assignments
        .iter()
        .map(|(field, value)| ChangeJson {
            field,
            value: (!value.is_empty()).then_some(value.as_str()),
        })
        .collect();

    PreviewJson {
        dry_run,
        blocked: plan.validation.is_blocking(),
        candidates,
        changes,
        reference_errors: reference_errors(plan),
    }
}

/// Rejection view of `plan`.
pub fn rejected<'a>(plan: &TransitionPlan, errors: &'a ValidationErrors) -> RejectedJson<'a> {
    RejectedJson {
        rejected: true,
        errors,
        reference_errors: reference_errors(plan),
    }
}

/// Execution view of `report`.
pub fn executed<'a>(plan: &TransitionPlan, report: &'a ExecutionReport) -> ExecutedJson<'a> {
    ExecutedJson {
        summary: report.summary(),
        updated: &report.updated,
        skipped: &report.skipped,
        failed: report
            .failed
            .iter()
            .map(|(issue, fields)| FailedJson { issue, fields })
            .collect(),
        fell_back: report.fell_back,
        outcomes: &report.outcomes,
        reference_errors: reference_errors(plan),
    }
}
