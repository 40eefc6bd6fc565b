//! In-memory project board.
//!
//! Holds issues, their parent links and tracked items in RAM behind an
//! `Arc<Mutex<..>>`. Field updates are checked against the project schema
//! exactly as a remote board would check them.
//!
//! The board also records how many calls of each kind it served and can be
//! told to fail specific calls, which is how the batch fallback, retry and
//! all-or-nothing paths are exercised in tests.

use super::{IssueSummary, Project, ProjectBoard, ProjectItem};
use crate::domain::{FieldUpdate, FieldValues, IssueRef, RepoName};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A tracked item as stored by the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct TrackedItem {
    pub(super) id: String,
    pub(super) fields: FieldValues,
}

/// An issue as stored by the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct IssueRecord {
    pub(super) summary: IssueSummary,
    pub(super) parent: Option<IssueRef>,
    pub(super) item: Option<TrackedItem>,
}

/// Counters of calls served, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `items` calls
    pub items: usize,
    /// `children` calls
    pub children: usize,
    /// `children_batch` calls
    pub children_batch: usize,
    /// `set_field` calls
    pub set_field: usize,
    /// `set_fields` calls
    pub set_fields: usize,
    /// `open_issues_with_label` calls
    pub label_queries: usize,
}

impl CallCounts {
    /// Total number of mutation calls (single and batched).
    pub fn mutations(&self) -> usize {
        self.set_field + self.set_fields
    }
}

#[derive(Debug, Default)]
struct Failures {
    batch_updates: bool,
    children_batch: bool,
    children: HashSet<IssueRef>,
    issues: HashSet<IssueRef>,
    field_updates: HashMap<(String, String), usize>,
}

#[derive(Debug)]
pub(super) struct BoardState {
    pub(super) project: Project,
    pub(super) issues: Vec<IssueRecord>,
    index: HashMap<IssueRef, usize>,
    failures: Failures,
    calls: CallCounts,
}

impl BoardState {
    fn new(project: Project, issues: Vec<IssueRecord>) -> Self {
        let index = issues
            .iter()
            .enumerate()
            .map(|(i, record)| (record.summary.reference.clone(), i))
            .collect();
        Self {
            project,
            issues,
            index,
            failures: Failures::default(),
            calls: CallCounts::default(),
        }
    }

    fn children_of(&self, parent: &IssueRef) -> Vec<IssueSummary> {
        self.issues
            .iter()
            .filter(|record| record.parent.as_ref() == Some(parent))
            .map(|record| record.summary.clone())
            .collect()
    }

    /// Consume one injected failure for `update`, if any are left.
    fn take_field_failure(&mut self, update: &FieldUpdate) -> bool {
        let key = (update.item_id.clone(), update.field.to_lowercase());
        match self.failures.field_updates.get_mut(&key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn apply(&mut self, update: &FieldUpdate) -> Result<()> {
        if self.take_field_failure(update) {
            return Err(Error::Transport(format!(
                "update of {} on {} rejected",
                update.field, update.item_id
            )));
        }

        let field = self
            .project
            .field(&update.field)
            .ok_or_else(|| Error::UnknownField(update.field.clone()))?;
        let field_name = field.name.clone();
        let value = field
            .canonical_value(&update.value)
            .ok_or_else(|| Error::UnknownOption {
                field: field_name.clone(),
                value: update.value.clone(),
            })?;

        let item = self
            .issues
            .iter_mut()
            .filter_map(|record| record.item.as_mut())
            .find(|item| item.id == update.item_id)
            .ok_or_else(|| Error::ItemNotFound(update.item_id.clone()))?;
        item.fields.set(&field_name, &value);
        Ok(())
    }
}

/// Thread-safe in-memory project board.
///
/// Cloning is cheap and clones share state, so a test can keep a handle for
/// inspection while the engine owns another.
#[derive(Debug, Clone)]
pub struct InMemoryBoard {
    state: Arc<Mutex<BoardState>>,
}

impl InMemoryBoard {
    /// Start building a board for `project`.
    pub fn builder(project: Project) -> InMemoryBoardBuilder {
        InMemoryBoardBuilder {
            project,
            issues: Vec::new(),
        }
    }

    pub(super) fn from_parts(project: Project, issues: Vec<IssueRecord>) -> Self {
        Self {
            state: Arc::new(Mutex::new(BoardState::new(project, issues))),
        }
    }

    pub(super) async fn parts(&self) -> (Project, Vec<IssueRecord>) {
        let state = self.state.lock().await;
        (state.project.clone(), state.issues.clone())
    }

    /// Calls served so far.
    pub async fn calls(&self) -> CallCounts {
        self.state.lock().await.calls
    }

    /// Current field values of the item tracking `issue`, if it is tracked.
    pub async fn field_values(&self, issue: &IssueRef) -> Option<FieldValues> {
        let state = self.state.lock().await;
        let i = *state.index.get(issue)?;
        state.issues[i].item.as_ref().map(|item| item.fields.clone())
    }

    /// Make every batched `set_fields` call fail as a whole.
    pub async fn fail_batch_updates(&self, fail: bool) {
        self.state.lock().await.failures.batch_updates = fail;
    }

    /// Make every batched `children_batch` call fail as a whole.
    pub async fn fail_children_batch(&self, fail: bool) {
        self.state.lock().await.failures.children_batch = fail;
    }

    /// Make single `children` calls for `parent` fail.
    pub async fn fail_children_of(&self, parent: &IssueRef) {
        self.state
            .lock()
            .await
            .failures
            .children
            .insert(parent.clone());
    }

    /// Make `issue` lookups for `reference` fail with a transport error.
    pub async fn fail_issue_fetch(&self, reference: &IssueRef) {
        self.state
            .lock()
            .await
            .failures
            .issues
            .insert(reference.clone());
    }

    /// Reject the next `times` updates of `field` on `item_id`, whether they
    /// arrive singly or inside a batch.
    pub async fn fail_field_updates(&self, item_id: &str, field: &str, times: usize) {
        self.state
            .lock()
            .await
            .failures
            .field_updates
            .insert((item_id.to_string(), field.to_lowercase()), times);
    }
}

#[async_trait]
impl ProjectBoard for InMemoryBoard {
    async fn project(&self, owner: &str, number: u64) -> Result<Project> {
        let state = self.state.lock().await;
        if state.project.owner.eq_ignore_ascii_case(owner) && state.project.number == number {
            Ok(state.project.clone())
        } else {
            Err(Error::Config(format!("project {owner}/{number} not found")))
        }
    }

    async fn items(
        &self,
        _project: &Project,
        only: Option<&[IssueRef]>,
    ) -> Result<Vec<ProjectItem>> {
        let mut state = self.state.lock().await;
        state.calls.items += 1;

        let wanted: Option<HashSet<&IssueRef>> = only.map(|refs| refs.iter().collect());
        let items = state
            .issues
            .iter()
            .filter(|record| {
                wanted
                    .as_ref()
                    .is_none_or(|w| w.contains(&record.summary.reference))
            })
            .filter_map(|record| {
                record.item.as_ref().map(|item| ProjectItem {
                    item_id: item.id.clone(),
                    issue: record.summary.reference.clone(),
                    title: record.summary.title.clone(),
                    body: record.summary.body.clone(),
                    fields: item.fields.clone(),
                })
            })
            .collect();
        Ok(items)
    }

    async fn issue(&self, reference: &IssueRef) -> Result<IssueSummary> {
        let state = self.state.lock().await;
        if state.failures.issues.contains(reference) {
            return Err(Error::Transport(format!("lookup of {reference} failed")));
        }
        state
            .index
            .get(reference)
            .map(|i| state.issues[*i].summary.clone())
            .ok_or_else(|| Error::IssueNotFound(reference.to_string()))
    }

    async fn children(&self, parent: &IssueRef) -> Result<Vec<IssueSummary>> {
        let mut state = self.state.lock().await;
        state.calls.children += 1;
        if state.failures.children.contains(parent) {
            return Err(Error::Transport(format!("sub-issue query for {parent} failed")));
        }
        Ok(state.children_of(parent))
    }

    async fn children_batch(
        &self,
        repo: &RepoName,
        parents: &[u64],
    ) -> Result<HashMap<u64, Vec<IssueSummary>>> {
        let mut state = self.state.lock().await;
        state.calls.children_batch += 1;
        if state.failures.children_batch {
            return Err(Error::Transport(format!(
                "batched sub-issue query for {repo} failed"
            )));
        }
        Ok(parents
            .iter()
            .map(|n| (*n, state.children_of(&IssueRef::in_repo(repo, *n))))
            .collect())
    }

    async fn set_field(&self, _project: &Project, update: &FieldUpdate) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.set_field += 1;
        state.apply(update)
    }

    async fn set_fields(
        &self,
        _project: &Project,
        updates: &[FieldUpdate],
    ) -> Result<Vec<Result<()>>> {
        let mut state = self.state.lock().await;
        state.calls.set_fields += 1;
        if state.failures.batch_updates {
            return Err(Error::Transport(format!(
                "batched update of {} field(s) failed",
                updates.len()
            )));
        }
        Ok(updates.iter().map(|update| state.apply(update)).collect())
    }

    async fn open_issues_with_label(
        &self,
        repo: &RepoName,
        label: &str,
    ) -> Result<Vec<IssueSummary>> {
        let mut state = self.state.lock().await;
        state.calls.label_queries += 1;
        Ok(state
            .issues
            .iter()
            .map(|record| &record.summary)
            .filter(|summary| {
                summary.open
                    && summary.reference.repo_name() == *repo
                    && summary.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
            })
            .cloned()
            .collect())
    }

    async fn save(&self) -> Result<()> {
        Ok(())
    }
}

/// Builder for [`InMemoryBoard`].
#[derive(Debug)]
pub struct InMemoryBoardBuilder {
    project: Project,
    issues: Vec<IssueRecord>,
}

impl InMemoryBoardBuilder {
    /// Add an issue. Issues keep their insertion order, which is also the
    /// order in which children are returned.
    #[must_use]
    pub fn issue(mut self, seed: IssueSeed) -> Self {
        self.issues.push(seed.into_record());
        self
    }

    /// Finish building.
    pub fn build(self) -> InMemoryBoard {
        InMemoryBoard::from_parts(self.project, self.issues)
    }
}

/// Description of an issue to seed an [`InMemoryBoard`] with.
#[derive(Debug, Clone)]
pub struct IssueSeed {
    reference: IssueRef,
    title: String,
    body: String,
    open: bool,
    labels: Vec<String>,
    parent: Option<IssueRef>,
    item_id: Option<String>,
    fields: FieldValues,
}

impl IssueSeed {
    /// An open, untracked issue with an empty body.
    pub fn new(reference: IssueRef, title: impl Into<String>) -> Self {
        Self {
            reference,
            title: title.into(),
            body: String::new(),
            open: true,
            labels: Vec::new(),
            parent: None,
            item_id: None,
            fields: FieldValues::new(),
        }
    }

    /// Set the issue body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Mark the issue closed.
    #[must_use]
    pub fn closed(mut self) -> Self {
        self.open = false;
        self
    }

    /// Add a label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Make this issue a sub-issue of `parent`.
    #[must_use]
    pub fn child_of(mut self, parent: &IssueRef) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Put the issue on the board with a generated item id.
    #[must_use]
    pub fn on_board(self) -> Self {
        let id = format!(
            "item-{}-{}-{}",
            self.reference.owner, self.reference.repo, self.reference.number
        );
        self.tracked(id)
    }

    /// Put the issue on the board with the given item id.
    #[must_use]
    pub fn tracked(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    /// Set a field value on the tracked item.
    #[must_use]
    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.fields.set(name, value);
        self
    }

    fn into_record(self) -> IssueRecord {
        IssueRecord {
            summary: IssueSummary {
                reference: self.reference,
                title: self.title,
                body: self.body,
                open: self.open,
                labels: self.labels,
            },
            parent: self.parent,
            item: self.item_id.map(|id| TrackedItem {
                id,
                fields: self.fields,
            }),
        }
    }
}
