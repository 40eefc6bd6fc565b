//! Batch mutation execution.
//!
//! The approved field values are turned into one [`FieldUpdate`] per
//! (tracked issue, field) pair. The whole list is submitted with a single
//! batched call. If that call fails as a whole, the same list is replayed
//! one update at a time, each retried a bounded number of times. Entries the
//! batch rejected with a transient error go through the same retry path;
//! permanent rejections fail at once.
//!
//! The update list is never modified once built; outcomes are appended to a
//! separate list, one per update, whichever path produced them.

use crate::board::{Project, ProjectBoard};
use crate::domain::{BatchOutcome, CandidateIssue, FieldUpdate, IssueRef};
use crate::error::Error;
use backon::{ConstantBuilder, Retryable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Pause between attempts when none is configured
pub const DEFAULT_RETRY_DELAY_MS: u64 = 200;

/// How often, and how far apart, a single update is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Total attempts per update, at least 1
    pub attempts: u32,

    /// Pause between attempts, in milliseconds
    pub delay_ms: u64,
}

impl RetryPolicy {
    /// Create a policy with the default delay. Zero is raised to one attempt.
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
            delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }

    /// The same policy with a different pause between attempts.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Pause between attempts
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Field updates for a batch, plus which issues they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Every update to submit, grouped by issue in candidate order
    pub updates: Vec<FieldUpdate>,

    /// Tracked issues and their item ids, in candidate order
    pub tracked: Vec<(IssueRef, String)>,

    /// Issues skipped because they are not on the board
    pub skipped: Vec<IssueRef>,
}

impl UpdatePlan {
    /// Build one update per tracked candidate and assignment.
    ///
    /// `assignments` are `(field, value)` pairs; an empty value clears the
    /// field.
    pub fn build(candidates: &[CandidateIssue], assignments: &[(String, String)]) -> Self {
        let mut plan = Self::default();
        for candidate in candidates {
            let Some(item_id) = &candidate.item_id else {
                plan.skipped.push(candidate.reference.clone());
                continue;
            };
            plan.tracked.push((candidate.reference.clone(), item_id.clone()));
            plan.updates.extend(
                assignments
                    .iter()
                    .map(|(field, value)| FieldUpdate::new(item_id, field, value)),
            );
        }
        plan
    }
}

/// Updated/skipped/failed counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Issues whose every update succeeded
    pub updated: usize,

    /// Issues not on the board
    pub skipped: usize,

    /// Issues with at least one failed update
    pub failed: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} updated, {} skipped, {} failed",
            self.updated, self.skipped, self.failed
        )
    }
}

/// A field update that failed after every retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldFailure {
    /// Board field name
    pub field: String,

    /// Last error seen
    pub error: String,
}

/// What happened to each issue in a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    /// One outcome per submitted update, in submission order
    pub outcomes: Vec<BatchOutcome>,

    /// Issues fully updated
    pub updated: Vec<IssueRef>,

    /// Issues skipped as untracked
    pub skipped: Vec<IssueRef>,

    /// Issues with failed updates, and which fields failed
    pub failed: Vec<(IssueRef, Vec<FieldFailure>)>,

    /// Whether the batched call failed and updates were replayed one by one
    pub fell_back: bool,
}

impl ExecutionReport {
    /// Tally outcomes per issue. An issue counts as updated only if all its
    /// updates succeeded.
    pub fn tally(plan: &UpdatePlan, outcomes: Vec<BatchOutcome>, fell_back: bool) -> Self {
        let mut by_item: HashMap<&str, Vec<&BatchOutcome>> = HashMap::new();
        for outcome in &outcomes {
            by_item.entry(&outcome.item_id).or_default().push(outcome);
        }

        let mut updated = Vec::new();
        let mut failed = Vec::new();
        for (issue, item_id) in &plan.tracked {
            let failures: Vec<FieldFailure> = by_item
                .get(item_id.as_str())
                .into_iter()
                .flatten()
                .filter(|o| !o.success)
                .map(|o| FieldFailure {
                    field: o.field.clone(),
                    error: o.error.clone().unwrap_or_default(),
                })
                .collect();
            if failures.is_empty() {
                updated.push(issue.clone());
            } else {
                failed.push((issue.clone(), failures));
            }
        }

        Self {
            updated,
            skipped: plan.skipped.clone(),
            failed,
            outcomes,
            fell_back,
        }
    }

    /// Counts for the summary line
    pub fn summary(&self) -> Summary {
        Summary {
            updated: self.updated.len(),
            skipped: self.skipped.len(),
            failed: self.failed.len(),
        }
    }

    /// Whether any issue failed
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Applies field updates to the board.
pub struct BatchExecutor<'a> {
    board: &'a dyn ProjectBoard,
    project: &'a Project,
    retry: RetryPolicy,
}

impl<'a> BatchExecutor<'a> {
    /// Create an executor for `project`.
    pub fn new(board: &'a dyn ProjectBoard, project: &'a Project, retry: RetryPolicy) -> Self {
        Self {
            board,
            project,
            retry,
        }
    }

    /// Apply every update in `plan` and report per-issue results.
    pub async fn execute(&self, plan: &UpdatePlan) -> ExecutionReport {
        let (outcomes, fell_back) = self.apply(&plan.updates).await;
        let report = ExecutionReport::tally(plan, outcomes, fell_back);
        tracing::debug!(
            updates = plan.updates.len(),
            fell_back,
            summary = %report.summary(),
            "Applied field updates"
        );
        report
    }

    /// Apply `updates`, returning exactly one outcome per update and whether
    /// the sequential fallback was used.
    pub async fn apply(&self, updates: &[FieldUpdate]) -> (Vec<BatchOutcome>, bool) {
        if updates.is_empty() {
            return (Vec::new(), false);
        }

        match self.board.set_fields(self.project, updates).await {
            Ok(results) if results.len() == updates.len() => {
                let mut outcomes = Vec::with_capacity(updates.len());
                for (update, result) in updates.iter().zip(results) {
                    let outcome = match result {
                        Ok(()) => BatchOutcome::succeeded(update),
                        Err(e) if e.is_transient() && self.retry.attempts > 1 => {
                            tracing::debug!(
                                item = %update.item_id,
                                field = %update.field,
                                error = %e,
                                "Update rejected in batch, retrying"
                            );
                            self.apply_with_retry(update, self.retry.attempts - 1).await
                        }
                        Err(e) => {
                            tracing::warn!(item = %update.item_id, field = %update.field, error = %e, "Update rejected");
                            BatchOutcome::failed(update, e.to_string())
                        }
                    };
                    outcomes.push(outcome);
                }
                (outcomes, false)
            }
            Ok(results) => {
                tracing::warn!(
                    expected = updates.len(),
                    received = results.len(),
                    "Batched update returned the wrong number of results, applying one by one"
                );
                (self.apply_sequentially(updates).await, true)
            }
            Err(e) => {
                tracing::warn!(
                    updates = updates.len(),
                    error = %e,
                    "Batched update failed, applying one by one"
                );
                (self.apply_sequentially(updates).await, true)
            }
        }
    }

    async fn apply_sequentially(&self, updates: &[FieldUpdate]) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(updates.len());
        for update in updates {
            outcomes.push(self.apply_with_retry(update, self.retry.attempts).await);
        }
        outcomes
    }

    /// Send `update` on its own, up to `attempts` times. Only transient
    /// errors are retried.
    async fn apply_with_retry(&self, update: &FieldUpdate, attempts: u32) -> BatchOutcome {
        let retries = usize::try_from(attempts.saturating_sub(1)).unwrap_or(usize::MAX);
        let backoff = ConstantBuilder::default()
            .with_delay(self.retry.delay())
            .with_max_times(retries);

        let result = (|| self.board.set_field(self.project, update))
            .retry(backoff)
            .when(Error::is_transient)
            .notify(|e: &Error, delay: Duration| {
                tracing::debug!(
                    item = %update.item_id,
                    field = %update.field,
                    error = %e,
                    ?delay,
                    "Update failed, retrying"
                );
            })
            .await;

        match result {
            Ok(()) => BatchOutcome::succeeded(update),
            Err(e) => {
                tracing::warn!(
                    item = %update.item_id,
                    field = %update.field,
                    error = %e,
                    "Update failed"
                );
                BatchOutcome::failed(update, e.to_string())
            }
        }
    }
}
