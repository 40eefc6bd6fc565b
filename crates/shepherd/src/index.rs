//! Project item index.
//!
//! One snapshot of the board's items, keyed by fully-qualified issue
//! reference. Built once per run and never refreshed: later phases read it
//! but mutations are not reflected back into it.

use crate::board::{Project, ProjectBoard, ProjectItem};
use crate::domain::{CandidateIssue, FieldValues, IssueRef};
use crate::error::Result;
use std::collections::HashMap;

/// Title, body and current field values of a tracked item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDetails {
    /// Issue title
    pub title: String,

    /// Issue body
    pub body: String,

    /// Current field values
    pub fields: FieldValues,
}

/// Lookup tables from issue reference to tracked item.
#[derive(Debug, Clone, Default)]
pub struct ProjectIndex {
    item_ids: HashMap<IssueRef, String>,
    details: HashMap<IssueRef, ItemDetails>,
}

impl ProjectIndex {
    /// Fetch the items needed for a run and index them.
    ///
    /// Non-recursive runs only need the roots, so only those items are
    /// requested. Recursive runs fetch every item because descendants are not
    /// known until the tree is expanded.
    ///
    /// # Errors
    ///
    /// Propagates the board error if the items query fails.
    pub async fn build(
        board: &dyn ProjectBoard,
        project: &Project,
        roots: &[IssueRef],
        recursive: bool,
    ) -> Result<Self> {
        let only = if recursive { None } else { Some(roots) };
        let items = board.items(project, only).await?;
        let index = Self::from_items(items);
        tracing::debug!(
            recursive,
            roots = roots.len(),
            items = index.len(),
            "Indexed project items"
        );
        Ok(index)
    }

    /// Index an already-fetched list of items. Later duplicates of the same
    /// issue are ignored.
    pub fn from_items(items: Vec<ProjectItem>) -> Self {
        let mut index = Self::default();
        for item in items {
            if index.item_ids.contains_key(&item.issue) {
                tracing::warn!(issue = %item.issue, "Issue tracked twice on the board, keeping first item");
                continue;
            }
            index.item_ids.insert(item.issue.clone(), item.item_id);
            index.details.insert(
                item.issue,
                ItemDetails {
                    title: item.title,
                    body: item.body,
                    fields: item.fields,
                },
            );
        }
        index
    }

    /// Item id tracking `issue`, if it is on the board.
    pub fn item_id(&self, issue: &IssueRef) -> Option<&str> {
        self.item_ids.get(issue).map(String::as_str)
    }

    /// Details of the item tracking `issue`, if it is on the board.
    pub fn details(&self, issue: &IssueRef) -> Option<&ItemDetails> {
        self.details.get(issue)
    }

    /// Build a candidate for `issue` at `depth`.
    ///
    /// Tracked issues take title, body and fields from the index; untracked
    /// ones use the given fallback title and body and have no fields.
    pub fn candidate(
        &self,
        issue: &IssueRef,
        depth: usize,
        fallback_title: &str,
        fallback_body: &str,
    ) -> CandidateIssue {
        match (self.item_id(issue), self.details(issue)) {
            (Some(item_id), Some(details)) => CandidateIssue {
                reference: issue.clone(),
                title: details.title.clone(),
                body: details.body.clone(),
                item_id: Some(item_id.to_string()),
                depth,
                fields: details.fields.clone(),
            },
            _ => CandidateIssue {
                reference: issue.clone(),
                title: fallback_title.to_string(),
                body: fallback_body.to_string(),
                item_id: None,
                depth,
                fields: FieldValues::new(),
            },
        }
    }

    /// Number of indexed items
    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    /// Whether no items are indexed
    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{InMemoryBoard, IssueSeed};

    fn r(n: u64) -> IssueRef {
        IssueRef::new("acme", "widgets", n)
    }

    fn board() -> InMemoryBoard {
        InMemoryBoard::builder(Project::standard("acme", 1))
            .issue(
                IssueSeed::new(r(1), "One")
                    .body("body one")
                    .tracked("item-1")
                    .field("Status", "Ready"),
            )
            .issue(IssueSeed::new(r(2), "Two").tracked("item-2"))
            .issue(IssueSeed::new(r(3), "Three"))
            .build()
    }

    #[tokio::test]
    async fn test_build_non_recursive_fetches_only_roots() {
        let board = board();
        let project = board.project("acme", 1).await.unwrap();

        let index = ProjectIndex::build(&board, &project, &[r(1), r(3)], false)
            .await
            .unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.item_id(&r(1)), Some("item-1"));
        assert_eq!(index.item_id(&r(2)), None);
        assert_eq!(index.item_id(&r(3)), None);
    }

    #[tokio::test]
    async fn test_build_recursive_fetches_everything() {
        let board = board();
        let project = board.project("acme", 1).await.unwrap();

        let index = ProjectIndex::build(&board, &project, &[r(1)], true)
            .await
            .unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.item_id(&r(2)), Some("item-2"));
        assert_eq!(board.calls().await.items, 1);
    }

    #[tokio::test]
    async fn test_candidate_tracked_and_untracked() {
        let board = board();
        let project = board.project("acme", 1).await.unwrap();
        let index = ProjectIndex::build(&board, &project, &[], true)
            .await
            .unwrap();

        let tracked = index.candidate(&r(1), 0, "ignored", "ignored");
        assert!(tracked.is_tracked());
        assert_eq!(tracked.title, "One");
        assert_eq!(tracked.body, "body one");
        assert_eq!(tracked.fields.get("Status"), Some("Ready"));

        let untracked = index.candidate(&r(3), 2, "Three", "text");
        assert!(!untracked.is_tracked());
        assert_eq!(untracked.depth, 2);
        assert_eq!(untracked.title, "Three");
        assert!(untracked.fields.is_empty());
    }

    #[test]
    fn test_duplicate_items_keep_first() {
        let item = |id: &str| ProjectItem {
            item_id: id.to_string(),
            issue: r(1),
            title: "One".to_string(),
            body: String::new(),
            fields: FieldValues::new(),
        };
        let index = ProjectIndex::from_items(vec![item("a"), item("b")]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.item_id(&r(1)), Some("a"));
    }
}
