//! JSON snapshot persistence for the in-memory board.
//!
//! A snapshot file holds the project schema and every issue with its parent
//! link and tracked item:
//!
//! ```json
//! {
//!   "project": { "id": "p1", "owner": "acme", "number": 1, "title": "Roadmap",
//!                "fields": [{ "name": "Status", "type": "single_select",
//!                             "options": ["Backlog", "Ready", "Done"] }] },
//!   "issues": [
//!     { "owner": "acme", "repo": "widgets", "number": 10, "title": "Epic",
//!       "body": "- [ ] design", "item": { "id": "item-10", "fields": { "Status": "Backlog" } } },
//!     { "owner": "acme", "repo": "widgets", "number": 11, "title": "Child", "parent": "#10" }
//!   ]
//! }
//! ```
//!
//! Writes go to a `.tmp` sibling first and are renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.

use super::in_memory::{IssueRecord, TrackedItem};
use super::{InMemoryBoard, IssueSummary, Project, ProjectBoard, ProjectItem};
use crate::domain::{FieldUpdate, FieldValues, IssueRef, RepoName};
use crate::error::{Error, Result};
use crate::reference::{canonical, parse_reference};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// On-disk form of a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Project metadata and field schema
    pub project: Project,

    /// All issues known to the board, in child order
    #[serde(default)]
    pub issues: Vec<SnapshotIssue>,
}

/// On-disk form of an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotIssue {
    /// Repository owner
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Issue number
    pub number: u64,

    /// Issue title
    pub title: String,

    /// Issue body
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,

    /// Whether the issue is open
    #[serde(default = "default_open")]
    pub open: bool,

    /// Labels
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    /// Parent issue, `#N` for the same repository or `owner/repo#N`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Tracked item, absent when the issue is not on the board
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<SnapshotItem>,
}

/// On-disk form of a tracked item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotItem {
    /// Item identifier
    pub id: String,

    /// Field values
    #[serde(default)]
    pub fields: FieldValues,
}

fn default_open() -> bool {
    true
}

impl BoardSnapshot {
    /// An empty snapshot for `project`.
    pub fn empty(project: Project) -> Self {
        Self {
            project,
            issues: Vec::new(),
        }
    }

    fn into_parts(self) -> Result<(Project, Vec<IssueRecord>)> {
        let mut records = Vec::with_capacity(self.issues.len());
        for issue in self.issues {
            let reference = canonical(&RepoName::new(issue.owner, issue.repo), issue.number);
            let parent = issue
                .parent
                .as_deref()
                .map(|p| parse_reference(p, Some(&reference.repo_name())))
                .transpose()
                .map_err(|e| Error::Config(format!("bad parent of {reference}: {e}")))?;

            records.push(IssueRecord {
                summary: IssueSummary {
                    reference,
                    title: issue.title,
                    body: issue.body,
                    open: issue.open,
                    labels: issue.labels,
                },
                parent,
                item: issue.item.map(|item| TrackedItem {
                    id: item.id,
                    fields: item.fields,
                }),
            });
        }
        Ok((self.project, records))
    }

    fn from_parts(project: Project, records: Vec<IssueRecord>) -> Self {
        let issues = records
            .into_iter()
            .map(|record| {
                let reference = record.summary.reference;
                let parent = record.parent.map(|p| {
                    if p.owner == reference.owner && p.repo == reference.repo {
                        format!("#{}", p.number)
                    } else {
                        p.to_string()
                    }
                });
                SnapshotIssue {
                    owner: reference.owner,
                    repo: reference.repo,
                    number: reference.number,
                    title: record.summary.title,
                    body: record.summary.body,
                    open: record.summary.open,
                    labels: record.summary.labels,
                    parent,
                    item: record.item.map(|item| SnapshotItem {
                        id: item.id,
                        fields: item.fields,
                    }),
                }
            })
            .collect();
        Self { project, issues }
    }
}

/// A board backed by a JSON snapshot file.
///
/// All reads and writes go to an [`InMemoryBoard`]; [`ProjectBoard::save`]
/// writes the current state back to the file.
#[derive(Debug)]
pub struct SnapshotBoard {
    inner: InMemoryBoard,
    path: PathBuf,
}

impl SnapshotBoard {
    /// Load a board from a snapshot file.
    ///
    /// # Errors
    ///
    /// - `Error::Io` if the file cannot be read
    /// - `Error::Json` if it is not a valid snapshot
    /// - `Error::Config` if a parent reference does not parse
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let snapshot: BoardSnapshot = serde_json::from_str(&content)?;
        let (project, records) = snapshot.into_parts()?;
        tracing::debug!(
            path = %path.display(),
            issues = records.len(),
            "Loaded board snapshot"
        );
        Ok(Self {
            inner: InMemoryBoard::from_parts(project, records),
            path: path.to_path_buf(),
        })
    }

    /// Write `snapshot` to `path`, replacing any existing file.
    pub async fn write(path: &Path, snapshot: &BoardSnapshot) -> Result<()> {
        let content = serde_json::to_string_pretty(snapshot)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, format!("{content}\n")).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ProjectBoard for SnapshotBoard {
    async fn project(&self, owner: &str, number: u64) -> Result<Project> {
        self.inner.project(owner, number).await
    }

    async fn items(
        &self,
        project: &Project,
        only: Option<&[IssueRef]>,
    ) -> Result<Vec<ProjectItem>> {
        self.inner.items(project, only).await
    }

    async fn issue(&self, reference: &IssueRef) -> Result<IssueSummary> {
        self.inner.issue(reference).await
    }

    async fn children(&self, parent: &IssueRef) -> Result<Vec<IssueSummary>> {
        self.inner.children(parent).await
    }

    async fn children_batch(
        &self,
        repo: &RepoName,
        parents: &[u64],
    ) -> Result<HashMap<u64, Vec<IssueSummary>>> {
        self.inner.children_batch(repo, parents).await
    }

    async fn set_field(&self, project: &Project, update: &FieldUpdate) -> Result<()> {
        self.inner.set_field(project, update).await
    }

    async fn set_fields(
        &self,
        project: &Project,
        updates: &[FieldUpdate],
    ) -> Result<Vec<Result<()>>> {
        self.inner.set_fields(project, updates).await
    }

    async fn open_issues_with_label(
        &self,
        repo: &RepoName,
        label: &str,
    ) -> Result<Vec<IssueSummary>> {
        self.inner.open_issues_with_label(repo, label).await
    }

    async fn save(&self) -> Result<()> {
        let (project, records) = self.inner.parts().await;
        Self::write(&self.path, &BoardSnapshot::from_parts(project, records)).await?;
        tracing::debug!(path = %self.path.display(), "Saved board snapshot");
        Ok(())
    }
}
