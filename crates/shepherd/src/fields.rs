//! Field value resolution.
//!
//! Turns what the user asked for ("status ready", "the current sprint",
//! "back to backlog") into concrete board field values. Resolution happens
//! once per run, before validation, because the workflow rules need the
//! concrete target values.
//!
//! "Current" sprints and branches are discovered through a
//! [`TrackerLookup`]. The board-backed implementation finds open tracker
//! issues by label and reads their titles with [`parse_tracker`], the only
//! place that knows the title convention.

use crate::board::ProjectBoard;
use crate::domain::RepoName;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel accepted by sprint and branch options.
pub const CURRENT: &str = "current";

/// Board field names for the four fields shepherd manages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// Workflow status field
    pub status: String,

    /// Priority field
    pub priority: String,

    /// Sprint field
    pub sprint: String,

    /// Branch field
    pub branch: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            status: "Status".to_string(),
            priority: "Priority".to_string(),
            sprint: "Microsprint".to_string(),
            branch: "Branch".to_string(),
        }
    }
}

/// A requested value: a literal, or whatever tracker is active right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    /// Use the value as given
    Literal(String),

    /// Use the active tracker's name
    Current,
}

impl FieldTarget {
    /// Parse a user value. `current` (any case) becomes [`FieldTarget::Current`].
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case(CURRENT) {
            Self::Current
        } else {
            Self::Literal(value.to_string())
        }
    }
}

/// Everything the user asked to change in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRequest {
    /// New status
    pub status: Option<FieldTarget>,

    /// New priority
    pub priority: Option<FieldTarget>,

    /// New sprint
    pub sprint: Option<FieldTarget>,

    /// New branch
    pub branch: Option<FieldTarget>,

    /// Return to backlog: clear branch and sprint
    pub backlog: bool,
}

impl FieldRequest {
    /// Check the request for contradictions. Makes no board calls.
    ///
    /// # Errors
    ///
    /// - `Error::ConflictingFields` if `backlog` is combined with an explicit
    ///   sprint or branch, or nothing was requested at all
    /// - `Error::InvalidFieldValue` if `current` is used for status or
    ///   priority, or a status/priority literal is empty
    pub fn check(&self) -> Result<()> {
        if self.backlog {
            let mut clashes = Vec::new();
            if self.branch.is_some() {
                clashes.push("--branch");
            }
            if self.sprint.is_some() {
                clashes.push("--sprint");
            }
            if !clashes.is_empty() {
                return Err(Error::ConflictingFields(format!(
                    "--backlog clears branch and sprint and cannot be combined with {}",
                    clashes.join(" or ")
                )));
            }
        }

        for (field, target) in [("status", &self.status), ("priority", &self.priority)] {
            match target {
                Some(FieldTarget::Current) => {
                    return Err(Error::InvalidFieldValue {
                        field: field.to_string(),
                        value: CURRENT.to_string(),
                        reason: "'current' is only supported for sprint and branch".to_string(),
                    });
                }
                Some(FieldTarget::Literal(value)) if value.is_empty() => {
                    return Err(Error::InvalidFieldValue {
                        field: field.to_string(),
                        value: String::new(),
                        reason: "value cannot be empty".to_string(),
                    });
                }
                _ => {}
            }
        }

        if self.is_empty() {
            return Err(Error::ConflictingFields(
                "nothing to change: specify --status, --priority, --sprint, --branch or --backlog"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Whether no field change was requested
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.sprint.is_none()
            && self.branch.is_none()
            && !self.backlog
    }

    fn wants_current(&self, kind: TrackerKind) -> bool {
        let target = match kind {
            TrackerKind::Sprint => &self.sprint,
            TrackerKind::Branch => &self.branch,
        };
        matches!(target, Some(FieldTarget::Current))
    }
}

/// Concrete values to write. `Some("")` clears a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedFields {
    /// Status value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Priority value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    /// Sprint value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint: Option<String>,

    /// Branch value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl ResolvedFields {
    /// `(board field name, value)` pairs in a fixed order: status, priority,
    /// sprint, branch.
    pub fn assignments(&self, names: &FieldNames) -> Vec<(String, String)> {
        [
            (&names.status, &self.status),
            (&names.priority, &self.priority),
            (&names.sprint, &self.sprint),
            (&names.branch, &self.branch),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name.clone(), v.clone())))
        .collect()
    }

    /// Whether nothing would be written
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.sprint.is_none()
            && self.branch.is_none()
    }
}

/// Category of tracker issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerKind {
    /// A time-boxed sprint
    Sprint,

    /// A release branch
    Branch,
}

impl TrackerKind {
    /// Title prefix used by this kind of tracker
    pub fn title_prefix(self) -> &'static str {
        match self {
            Self::Sprint => "Microsprint:",
            Self::Branch => "Branch:",
        }
    }
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sprint => write!(f, "microsprint"),
            Self::Branch => write!(f, "branch"),
        }
    }
}

/// An open tracker issue, as read from its title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracker {
    /// Tracker name without the title prefix
    pub name: String,

    /// Whether the tracker counts as current
    pub is_active: bool,
}

/// Read a tracker from an issue title.
///
/// Sprint titles look like `Microsprint: 2026-01-15-a` and are active when
/// the name starts with `today` as `YYYY-MM-DD`. Branch titles look like
/// `Branch: release/v2.0`; every open branch tracker is active. The prefix
/// is matched case-insensitively. Returns `None` for titles that do not
/// follow the convention.
pub fn parse_tracker(kind: TrackerKind, title: &str, today: NaiveDate) -> Option<Tracker> {
    let prefix = kind.title_prefix();
    let head = title.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let name = title[prefix.len()..].trim();
    if name.is_empty() {
        return None;
    }

    let is_active = match kind {
        TrackerKind::Sprint => name.starts_with(&today.format("%Y-%m-%d").to_string()),
        TrackerKind::Branch => true,
    };
    Some(Tracker {
        name: name.to_string(),
        is_active,
    })
}

/// Discovers open trackers of a kind.
#[async_trait]
pub trait TrackerLookup: Send + Sync {
    /// All open trackers of `kind`, active or not.
    async fn trackers(&self, kind: TrackerKind) -> Result<Vec<Tracker>>;
}

/// Labels identifying tracker issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TrackerLabels {
    /// Label on sprint trackers
    pub sprint_label: String,

    /// Label on branch trackers
    pub branch_label: String,
}

impl Default for TrackerLabels {
    fn default() -> Self {
        Self {
            sprint_label: "microsprint".to_string(),
            branch_label: "branch".to_string(),
        }
    }
}

/// Tracker lookup backed by labelled issues on the board.
pub struct BoardTrackers<'a> {
    board: &'a dyn ProjectBoard,
    repo: RepoName,
    labels: TrackerLabels,
    today: NaiveDate,
}

impl<'a> BoardTrackers<'a> {
    /// Look up trackers in `repo`, judging sprint activity against the local
    /// date.
    pub fn new(board: &'a dyn ProjectBoard, repo: RepoName, labels: TrackerLabels) -> Self {
        Self::on_date(board, repo, labels, chrono::Local::now().date_naive())
    }

    /// Like [`BoardTrackers::new`] with a fixed date.
    pub fn on_date(
        board: &'a dyn ProjectBoard,
        repo: RepoName,
        labels: TrackerLabels,
        today: NaiveDate,
    ) -> Self {
        Self {
            board,
            repo,
            labels,
            today,
        }
    }
}

#[async_trait]
impl TrackerLookup for BoardTrackers<'_> {
    async fn trackers(&self, kind: TrackerKind) -> Result<Vec<Tracker>> {
        let label = match kind {
            TrackerKind::Sprint => &self.labels.sprint_label,
            TrackerKind::Branch => &self.labels.branch_label,
        };
        let issues = self.board.open_issues_with_label(&self.repo, label).await?;
        let trackers: Vec<Tracker> = issues
            .iter()
            .filter_map(|issue| {
                let tracker = parse_tracker(kind, &issue.title, self.today);
                if tracker.is_none() {
                    tracing::debug!(issue = %issue.reference, title = %issue.title, "Ignoring mislabelled tracker");
                }
                tracker
            })
            .collect();
        tracing::debug!(kind = %kind, repo = %self.repo, found = trackers.len(), "Looked up trackers");
        Ok(trackers)
    }
}

/// Resolved field values plus the branch names known to be active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Values to write
    pub fields: ResolvedFields,

    /// Open branch names; empty when unknown
    pub active_branches: Vec<String>,
}

/// Resolves a [`FieldRequest`] into concrete values.
pub struct FieldResolver<'a> {
    trackers: &'a dyn TrackerLookup,
}

impl<'a> FieldResolver<'a> {
    /// Create a resolver that discovers trackers through `trackers`.
    pub fn new(trackers: &'a dyn TrackerLookup) -> Self {
        Self { trackers }
    }

    /// Resolve every requested field.
    ///
    /// Active branches are looked up whenever a branch is being assigned, so
    /// the validator can check the assignment against them.
    ///
    /// # Errors
    ///
    /// - Any error from [`FieldRequest::check`], raised before any lookup
    /// - `Error::NoActiveTracker` if `current` was requested and nothing is
    ///   active
    /// - Board errors from the tracker lookup
    pub async fn resolve(&self, request: &FieldRequest) -> Result<Resolution> {
        request.check()?;

        let assigns_branch = matches!(&request.branch, Some(FieldTarget::Literal(v)) if !v.is_empty())
            || request.wants_current(TrackerKind::Branch);
        let branches = if assigns_branch {
            self.trackers.trackers(TrackerKind::Branch).await?
        } else {
            Vec::new()
        };
        let active_branches: Vec<String> = branches
            .iter()
            .filter(|t| t.is_active)
            .map(|t| t.name.clone())
            .collect();

        let sprint = match &request.sprint {
            Some(FieldTarget::Current) => Some(self.current_sprint().await?),
            Some(FieldTarget::Literal(v)) => Some(v.clone()),
            None if request.backlog => Some(String::new()),
            None => None,
        };
        let branch = match &request.branch {
            Some(FieldTarget::Current) => Some(current_branch(&active_branches)?),
            Some(FieldTarget::Literal(v)) => Some(v.clone()),
            None if request.backlog => Some(String::new()),
            None => None,
        };

        let literal = |target: &Option<FieldTarget>| match target {
            Some(FieldTarget::Literal(v)) => Some(v.clone()),
            _ => None,
        };

        let fields = ResolvedFields {
            status: literal(&request.status),
            priority: literal(&request.priority),
            sprint,
            branch,
        };
        tracing::debug!(?fields, active_branches = active_branches.len(), "Resolved field values");
        Ok(Resolution {
            fields,
            active_branches,
        })
    }

    async fn current_sprint(&self) -> Result<String> {
        let mut active: Vec<String> = self
            .trackers
            .trackers(TrackerKind::Sprint)
            .await?
            .into_iter()
            .filter(|t| t.is_active)
            .map(|t| t.name)
            .collect();
        // Several sprints on one day: the latest suffix wins.
        active.sort();
        active.pop().ok_or_else(|| Error::NoActiveTracker {
            kind: TrackerKind::Sprint.to_string(),
        })
    }
}

fn current_branch(active: &[String]) -> Result<String> {
    match active {
        [] => Err(Error::NoActiveTracker {
            kind: TrackerKind::Branch.to_string(),
        }),
        [only] => Ok(only.clone()),
        [first, ..] => {
            tracing::warn!(
                branches = %active.join(", "),
                chosen = %first,
                "Several open branch trackers, using the first"
            );
            Ok(first.clone())
        }
    }
}
