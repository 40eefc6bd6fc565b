//! Sub-issue tree expansion.
//!
//! Expands root issues into all their descendants, level by level:
//!
//! 1. The parents still to expand at the current level are grouped by
//!    repository, and each group is fetched with one batched sub-issue query.
//!    If a batched query fails, that group falls back to one query per parent.
//! 2. Every child not seen before becomes a node one level deeper than its
//!    parent and joins the next level's frontier.
//! 3. Expansion stops when the frontier is empty or the next level would
//!    exceed the depth limit.
//!
//! The traversal uses an explicit arena and frontier rather than recursion,
//! so deep trees cannot exhaust the stack. An issue reachable through more
//! than one parent is kept once, under the parent that reached it first.
//!
//! Descendants are listed subtree by subtree (parent before children,
//! siblings in the order the board returned them), which is what the
//! reporter's indentation relies on. When the roots are included they all
//! come first, in the order given, ahead of every descendant.

use crate::board::{IssueSummary, ProjectBoard};
use crate::domain::{CandidateIssue, IssueRef, RepoName};
use crate::index::ProjectIndex;
use std::collections::{HashMap, HashSet};

/// Default maximum expansion depth.
pub const DEFAULT_MAX_DEPTH: usize = 10;

#[derive(Debug)]
struct Node {
    candidate: CandidateIssue,
    children: Vec<usize>,
}

/// Expands root issues into their sub-issue trees.
pub struct TreeExpander<'a> {
    board: &'a dyn ProjectBoard,
    index: &'a ProjectIndex,
    max_depth: usize,
}

impl<'a> TreeExpander<'a> {
    /// Create an expander that descends at most `max_depth` levels below the
    /// roots.
    pub fn new(board: &'a dyn ProjectBoard, index: &'a ProjectIndex, max_depth: usize) -> Self {
        Self {
            board,
            index,
            max_depth,
        }
    }

    /// Return every descendant of `roots` (roots themselves excluded), each
    /// tagged with its depth.
    pub async fn expand(&self, roots: &[CandidateIssue]) -> Vec<CandidateIssue> {
        let (arena, root_count) = self.grow(roots).await;
        flatten(arena, root_count, false)
    }

    /// Return every root, then every descendant in subtree order.
    pub async fn expand_trees(&self, roots: &[CandidateIssue]) -> Vec<CandidateIssue> {
        let (arena, root_count) = self.grow(roots).await;
        flatten(arena, root_count, true)
    }

    async fn grow(&self, roots: &[CandidateIssue]) -> (Vec<Node>, usize) {
        let mut arena: Vec<Node> = Vec::new();
        let mut visited: HashSet<IssueRef> = HashSet::new();
        let mut frontier: Vec<usize> = Vec::new();

        for root in roots {
            if visited.insert(root.reference.clone()) {
                frontier.push(arena.len());
                arena.push(Node {
                    candidate: root.clone(),
                    children: Vec::new(),
                });
            }
        }
        let root_count = arena.len();

        let mut depth = 0;
        while !frontier.is_empty() && depth < self.max_depth {
            let parents: Vec<IssueRef> = frontier
                .iter()
                .map(|&i| arena[i].candidate.reference.clone())
                .collect();
            let children = self.fetch_level(&parents).await;

            let mut next = Vec::new();
            for &parent in &frontier {
                let parent_ref = arena[parent].candidate.reference.clone();
                let Some(kids) = children.get(&parent_ref) else {
                    continue;
                };
                for kid in kids {
                    if !visited.insert(kid.reference.clone()) {
                        tracing::debug!(issue = %kid.reference, "Sub-issue already expanded, skipping");
                        continue;
                    }
                    let candidate =
                        self.index
                            .candidate(&kid.reference, depth + 1, &kid.title, &kid.body);
                    let node = arena.len();
                    arena.push(Node {
                        candidate,
                        children: Vec::new(),
                    });
                    arena[parent].children.push(node);
                    next.push(node);
                }
            }

            depth += 1;
            tracing::debug!(depth, parents = frontier.len(), children = next.len(), "Expanded level");
            frontier = next;
        }

        (arena, root_count)
    }

    /// Fetch the children of every parent in one level.
    async fn fetch_level(&self, parents: &[IssueRef]) -> HashMap<IssueRef, Vec<IssueSummary>> {
        let mut groups: Vec<(RepoName, Vec<u64>)> = Vec::new();
        for parent in parents {
            let repo = parent.repo_name();
            match groups.iter_mut().find(|(r, _)| *r == repo) {
                Some((_, numbers)) => numbers.push(parent.number),
                None => groups.push((repo, vec![parent.number])),
            }
        }

        let mut children = HashMap::new();
        for (repo, numbers) in groups {
            match self.board.children_batch(&repo, &numbers).await {
                Ok(batch) => {
                    for (number, kids) in batch {
                        children.insert(IssueRef::in_repo(&repo, number), kids);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        repo = %repo,
                        parents = numbers.len(),
                        error = %e,
                        "Batched sub-issue query failed, falling back to one query per parent"
                    );
                    for number in numbers {
                        let parent = IssueRef::in_repo(&repo, number);
                        match self.board.children(&parent).await {
                            Ok(kids) => {
                                children.insert(parent, kids);
                            }
                            Err(e) => {
                                tracing::warn!(issue = %parent, error = %e, "Sub-issue query failed, treating as leaf");
                            }
                        }
                    }
                }
            }
        }
        children
    }
}

/// Flatten the arena into subtree order.
fn flatten(arena: Vec<Node>, root_count: usize, include_roots: bool) -> Vec<CandidateIssue> {
    let mut order = Vec::with_capacity(arena.len());
    let mut stack: Vec<usize> = Vec::new();

    if include_roots {
        order.extend(0..root_count);
    }
    for root in 0..root_count {
        stack.extend(arena[root].children.iter().rev());
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(arena[node].children.iter().rev());
        }
    }

    let mut slots: Vec<Option<CandidateIssue>> =
        arena.into_iter().map(|node| Some(node.candidate)).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}
