//! Workflow rules for status transitions.
//!
//! Every candidate issue is checked against the proposed change before
//! anything is written. The rules:
//!
//! 1. Moving from backlog into `ready` or `in_progress` needs a branch,
//!    either already set or assigned in the same change.
//! 2. Moving into `in_review` or `done` needs a non-empty body.
//! 3. Moving into `in_review` or `done` needs every checklist item ticked.
//!    `--force` waives this rule, and only this rule.
//! 4. An assigned branch must be one of the open branch trackers, when any
//!    are known.
//!
//! Each issue gets a [`Verdict`]; a batch proceeds only when no verdict is a
//! failure.

mod checklist;

pub use checklist::{ChecklistCounts, scan_checklist, unchecked_items};

use crate::domain::{CandidateIssue, IssueRef, Stage};
use crate::fields::{FieldNames, ResolvedFields};
use serde::Serialize;
use std::fmt;

/// The rule a [`ValidationError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Starting work needs a branch
    BranchRequired,

    /// Review and completion need a description
    BodyRequired,

    /// Review and completion need a finished checklist
    ChecklistComplete,

    /// Assigned branches must be active
    ActiveBranch,
}

impl Rule {
    /// Whether `--force` may waive this rule
    pub fn waivable(self) -> bool {
        matches!(self, Self::ChecklistComplete)
    }
}

/// One rule violation on one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Issue the violation is about
    pub issue: IssueRef,

    /// Which rule was violated
    pub rule: Rule,

    /// What is wrong
    pub message: String,

    /// How to fix it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.issue, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

/// Ordered collection of violations. Empty means "no errors".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Whether there are no errors
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of errors
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate in the order the errors were found
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }
}

impl Extend<ValidationError> for ValidationErrors {
    fn extend<T: IntoIterator<Item = ValidationError>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl FromIterator<ValidationError> for ValidationErrors {
    fn from_iter<T: IntoIterator<Item = ValidationError>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

/// The per-issue view the rules look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationContext {
    /// Issue the rules are checked for
    pub issue: IssueRef,

    /// Current status; empty when unset
    pub current_status: String,

    /// Current branch; empty when unset
    pub current_branch: String,

    /// Issue body
    pub body: String,

    /// Open branch names; empty disables rule 4
    pub active_branches: Vec<String>,
}

impl ValidationContext {
    /// Build the context for `candidate`.
    pub fn for_candidate(
        candidate: &CandidateIssue,
        names: &FieldNames,
        active_branches: &[String],
    ) -> Self {
        let field = |name: &str| candidate.fields.get(name).unwrap_or_default().to_string();
        Self {
            issue: candidate.reference.clone(),
            current_status: field(&names.status),
            current_branch: field(&names.branch),
            body: candidate.body.clone(),
            active_branches: active_branches.to_vec(),
        }
    }
}

/// The part of a change the rules care about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposedChange {
    /// New status, if the status changes
    pub status: Option<String>,

    /// New branch, if the branch changes; `Some("")` clears it
    pub branch: Option<String>,
}

impl From<&ResolvedFields> for ProposedChange {
    fn from(fields: &ResolvedFields) -> Self {
        Self {
            status: fields.status.clone(),
            branch: fields.branch.clone(),
        }
    }
}

/// Outcome of validating one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "errors", rename_all = "snake_case")]
pub enum Verdict {
    /// Every rule passed
    Pass,

    /// Passed because `--force` waived these violations
    PassWithForce(Vec<ValidationError>),

    /// At least one violation that cannot be waived (or was not)
    Fail(Vec<ValidationError>),

    /// The issue is not on the board and will be skipped
    SkipNotTracked,
}

impl Verdict {
    /// Whether this verdict blocks the batch
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail(_))
    }

    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::PassWithForce(_) => "pass (forced)",
            Self::Fail(_) => "fail",
            Self::SkipNotTracked => "skip (not tracked)",
        }
    }
}

/// Verdicts for a whole batch, in candidate order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// One verdict per candidate
    pub verdicts: Vec<(IssueRef, Verdict)>,
}

impl ValidationReport {
    /// Violations that block the batch
    pub fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        for (_, verdict) in &self.verdicts {
            if let Verdict::Fail(list) = verdict {
                errors.extend(list.iter().cloned());
            }
        }
        errors
    }

    /// Violations waived by `--force`
    pub fn forced(&self) -> ValidationErrors {
        let mut forced = ValidationErrors::default();
        for (_, verdict) in &self.verdicts {
            if let Verdict::PassWithForce(list) = verdict {
                forced.extend(list.iter().cloned());
            }
        }
        forced
    }

    /// Whether any verdict is a failure
    pub fn is_blocking(&self) -> bool {
        self.verdicts.iter().any(|(_, v)| v.is_failure())
    }

    /// Verdict for `issue`
    pub fn verdict(&self, issue: &IssueRef) -> Option<&Verdict> {
        self.verdicts
            .iter()
            .find(|(r, _)| r == issue)
            .map(|(_, v)| v)
    }
}

/// Checks proposed changes against the workflow rules.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowValidator {
    enabled: bool,
    force: bool,
}

impl WorkflowValidator {
    /// Create a validator. A disabled workflow passes everything.
    pub fn new(enabled: bool, force: bool) -> Self {
        Self { enabled, force }
    }

    /// Every violation of every rule for one issue, in rule order.
    pub fn check(&self, ctx: &ValidationContext, change: &ProposedChange) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        if !self.enabled {
            return errors;
        }

        let current = Stage::parse(&ctx.current_status);
        let target = change.status.as_deref().and_then(Stage::parse);

        if let Some(target) = target {
            // Rule 1
            let starting = matches!(target, Stage::Ready | Stage::InProgress);
            if starting && current == Some(Stage::Backlog) {
                let branch = change.branch.as_deref().unwrap_or(&ctx.current_branch);
                if branch.trim().is_empty() {
                    errors.push(ValidationError {
                        issue: ctx.issue.clone(),
                        rule: Rule::BranchRequired,
                        message: format!("cannot move to {target} without a branch"),
                        suggestion: Some("assign one with --branch <name> or --branch current".to_string()),
                    });
                }
            }

            let finishing = matches!(target, Stage::InReview | Stage::Done);
            if finishing {
                // Rule 2
                if ctx.body.trim().is_empty() {
                    errors.push(ValidationError {
                        issue: ctx.issue.clone(),
                        rule: Rule::BodyRequired,
                        message: format!("cannot move to {target} with an empty body"),
                        suggestion: Some("add a description to the issue first".to_string()),
                    });
                }

                // Rule 3
                let unchecked = unchecked_items(&ctx.body);
                if unchecked > 0 {
                    errors.push(ValidationError {
                        issue: ctx.issue.clone(),
                        rule: Rule::ChecklistComplete,
                        message: format!(
                            "cannot move to {target} with {unchecked} unchecked checklist item(s)"
                        ),
                        suggestion: Some("complete the checklist or pass --force".to_string()),
                    });
                }
            }
        }

        // Rule 4
        if let Some(branch) = change.branch.as_deref().filter(|b| !b.is_empty()) {
            let known = !ctx.active_branches.is_empty();
            if known
                && !ctx
                    .active_branches
                    .iter()
                    .any(|active| active.eq_ignore_ascii_case(branch))
            {
                errors.push(ValidationError {
                    issue: ctx.issue.clone(),
                    rule: Rule::ActiveBranch,
                    message: format!("branch '{branch}' is not an active branch"),
                    suggestion: Some(format!(
                        "valid options: {}",
                        ctx.active_branches.join(", ")
                    )),
                });
            }
        }

        errors
    }

    /// The verdict for one candidate.
    pub fn verdict(&self, candidate: &CandidateIssue, ctx: &ValidationContext, change: &ProposedChange) -> Verdict {
        if !candidate.is_tracked() {
            return Verdict::SkipNotTracked;
        }

        let errors = self.check(ctx, change);
        if errors.is_empty() {
            return Verdict::Pass;
        }

        let (waived, blocking): (Vec<_>, Vec<_>) = errors
            .0
            .into_iter()
            .partition(|e| self.force && e.rule.waivable());
        if blocking.is_empty() {
            Verdict::PassWithForce(waived)
        } else {
            Verdict::Fail(blocking)
        }
    }

    /// Validate every candidate. Nothing short-circuits: the report holds
    /// every problem in the batch.
    pub fn validate_all(
        &self,
        candidates: &[CandidateIssue],
        names: &FieldNames,
        fields: &ResolvedFields,
        active_branches: &[String],
    ) -> ValidationReport {
        let change = ProposedChange::from(fields);
        let verdicts = candidates
            .iter()
            .map(|candidate| {
                let ctx = ValidationContext::for_candidate(candidate, names, active_branches);
                let verdict = self.verdict(candidate, &ctx, &change);
                (candidate.reference.clone(), verdict)
            })
            .collect::<Vec<_>>();

        let failed = verdicts.iter().filter(|(_, v)| v.is_failure()).count();
        tracing::debug!(
            candidates = candidates.len(),
            failed,
            enabled = self.enabled,
            force = self.force,
            "Validated batch"
        );
        ValidationReport { verdicts }
    }
}
