//! Project board abstraction.
//!
//! The project board is the remote service that holds issues and their
//! tracked items. Everything shepherd reads or mutates goes through the
//! [`ProjectBoard`] trait, so the transition engine never depends on a wire
//! format. Two implementations ship with the crate:
//!
//! - [`InMemoryBoard`]: all state in RAM, with call counters and failure
//!   injection for exercising fallback and retry paths in tests
//! - [`SnapshotBoard`]: an in-memory board loaded from, and saved back to, a
//!   JSON snapshot file
//!
//! # Example
//!
//! ```
//! use shepherd::board::{InMemoryBoard, IssueSeed, Project, ProjectBoard};
//! use shepherd::domain::IssueRef;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> shepherd::error::Result<()> {
//!     let board = InMemoryBoard::builder(Project::standard("acme", 1))
//!         .issue(IssueSeed::new(IssueRef::new("acme", "widgets", 1), "Ship it").on_board())
//!         .build();
//!
//!     let project = board.project("acme", 1).await?;
//!     let items = board.items(&project, None).await?;
//!     assert_eq!(items.len(), 1);
//!     Ok(())
//! }
//! ```

use crate::domain::{FieldUpdate, FieldValues, IssueRef, RepoName, normalize_stage};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod in_memory;
mod snapshot;

pub use in_memory::{CallCounts, InMemoryBoard, InMemoryBoardBuilder, IssueSeed};
pub use snapshot::{BoardSnapshot, SnapshotBoard, SnapshotIssue, SnapshotItem};

/// Project metadata, including the field schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Opaque project identifier
    pub id: String,

    /// Owner (user or organisation) of the project
    pub owner: String,

    /// Project number within the owner
    pub number: u64,

    /// Human-readable title
    pub title: String,

    /// Field schema
    pub fields: Vec<FieldDef>,
}

impl Project {
    /// A project with the standard workflow fields: `Status`, `Priority`,
    /// `Microsprint` and `Branch`.
    pub fn standard(owner: &str, number: u64) -> Self {
        let single_select = |name: &str, options: &[&str]| FieldDef {
            name: name.to_string(),
            kind: FieldKind::SingleSelect {
                options: options.iter().map(|o| (*o).to_string()).collect(),
            },
        };
        let text = |name: &str| FieldDef {
            name: name.to_string(),
            kind: FieldKind::Text,
        };

        Self {
            id: format!("project-{owner}-{number}"),
            owner: owner.to_string(),
            number,
            title: format!("{owner} project {number}"),
            fields: vec![
                single_select(
                    "Status",
                    &["Backlog", "Ready", "In Progress", "In Review", "Done"],
                ),
                single_select("Priority", &["P0", "P1", "P2", "P3"]),
                text("Microsprint"),
                text("Branch"),
            ],
        }
    }

    /// Look up a field definition by name (case-insensitive).
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

/// A field in the project schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name as shown on the board
    pub name: String,

    /// Field type
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Type of a project field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text
    Text,

    /// One of a fixed list of options
    SingleSelect {
        /// Allowed option names
        options: Vec<String>,
    },
}

impl FieldDef {
    /// Map a requested value onto the value the board stores.
    ///
    /// Single-select options match case- and separator-insensitively and
    /// resolve to the canonical option name. Returns `None` when the field
    /// has no such option. An empty value (clear) is always accepted.
    pub fn canonical_value(&self, value: &str) -> Option<String> {
        if value.is_empty() {
            return Some(String::new());
        }
        match &self.kind {
            FieldKind::Text => Some(value.to_string()),
            FieldKind::SingleSelect { options } => {
                let wanted = normalize_stage(value);
                options
                    .iter()
                    .find(|option| normalize_stage(option) == wanted)
                    .cloned()
            }
        }
    }
}

/// An issue as it appears on the project board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectItem {
    /// Tracked item identifier
    pub item_id: String,

    /// The issue this item tracks
    pub issue: IssueRef,

    /// Issue title
    pub title: String,

    /// Issue body
    pub body: String,

    /// Current field values
    pub fields: FieldValues,
}

/// An issue as returned by issue and sub-issue queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    /// Issue identity
    pub reference: IssueRef,

    /// Issue title
    pub title: String,

    /// Issue body
    pub body: String,

    /// Whether the issue is open
    pub open: bool,

    /// Labels on the issue
    pub labels: Vec<String>,
}

/// Operations shepherd needs from the remote project service.
///
/// Implementations must be `Send + Sync`. Calls are issued sequentially by
/// the transition engine; batch variants exist purely to save round trips.
///
/// # Errors
///
/// Transport problems surface as `Error::Transport`. Lookups of unknown
/// entities return `Error::IssueNotFound` / `Error::ItemNotFound`; mutations
/// against unknown fields or options return `Error::UnknownField` /
/// `Error::UnknownOption`.
#[async_trait]
pub trait ProjectBoard: Send + Sync {
    /// Fetch project metadata by owner and number.
    async fn project(&self, owner: &str, number: u64) -> Result<Project>;

    /// Fetch tracked items, either all of them or only those tracking `only`.
    async fn items(&self, project: &Project, only: Option<&[IssueRef]>)
    -> Result<Vec<ProjectItem>>;

    /// Fetch a single issue.
    async fn issue(&self, reference: &IssueRef) -> Result<IssueSummary>;

    /// Fetch the direct children of one issue, in the board's order.
    async fn children(&self, parent: &IssueRef) -> Result<Vec<IssueSummary>>;

    /// Fetch the direct children of several issues in one repository with a
    /// single round trip. Every requested parent appears in the result.
    async fn children_batch(
        &self,
        repo: &RepoName,
        parents: &[u64],
    ) -> Result<HashMap<u64, Vec<IssueSummary>>>;

    /// Apply a single field update.
    async fn set_field(&self, project: &Project, update: &FieldUpdate) -> Result<()>;

    /// Apply many field updates in one round trip.
    ///
    /// The outer `Result` fails when the call as a whole failed and nothing
    /// is known about individual updates. Otherwise the inner results line
    /// up one-to-one with `updates`.
    async fn set_fields(&self, project: &Project, updates: &[FieldUpdate])
    -> Result<Vec<Result<()>>>;

    /// Fetch open issues in `repo` carrying `label`.
    async fn open_issues_with_label(&self, repo: &RepoName, label: &str)
    -> Result<Vec<IssueSummary>>;

    /// Persist any buffered state. A no-op for remote or purely in-memory
    /// boards.
    async fn save(&self) -> Result<()>;
}
