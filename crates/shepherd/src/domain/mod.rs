//! Domain types for bulk workflow transitions.
//!
//! This module contains the identity and value types shared by every phase
//! of a transition: issue references, candidate issues, field updates and
//! their outcomes, and the workflow stage vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A repository on the remote service, `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoName {
    /// Repository owner (user or organisation)
    pub owner: String,

    /// Repository name
    pub repo: String,
}

impl RepoName {
    /// Create a new repository name
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((owner, repo)) = s.split_once('/') else {
            return Err(format!("expected owner/repo, got '{s}'"));
        };
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(format!("expected owner/repo, got '{s}'"));
        }
        if !owner.chars().all(is_name_char) || !repo.chars().all(is_name_char) {
            return Err(format!("invalid characters in repository '{s}'"));
        }
        Ok(Self::new(owner, repo))
    }
}

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Fully-qualified reference to an issue: `owner/repo#number`.
///
/// This is the identity key for every index in a transition run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssueRef {
    /// Repository owner
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Issue number within the repository
    pub number: u64,
}

impl IssueRef {
    /// Create a new issue reference
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
        }
    }

    /// Reference to issue `number` in `repo`
    pub fn in_repo(repo: &RepoName, number: u64) -> Self {
        Self::new(repo.owner.clone(), repo.repo.clone(), number)
    }

    /// The repository this issue belongs to
    pub fn repo_name(&self) -> RepoName {
        RepoName::new(self.owner.clone(), self.repo.clone())
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Ordered set of `(field name, value)` pairs on a tracked item.
///
/// Field names are matched case-insensitively; insertion order is kept so
/// that rendering is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues(Vec<(String, String)>);

impl FieldValues {
    /// Create an empty set of field values
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a field value by name.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(field))
            .map(|(_, value)| value.as_str())
    }

    /// Set a field value, replacing any existing value. An empty value
    /// removes the field.
    pub fn set(&mut self, field: &str, value: &str) {
        let position = self
            .0
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(field));
        match (position, value.is_empty()) {
            (Some(i), true) => {
                self.0.remove(i);
            }
            (Some(i), false) => self.0[i].1 = value.to_string(),
            (None, true) => {}
            (None, false) => self.0.push((field.to_string(), value.to_string())),
        }
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of fields with a value
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no field has a value
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for FieldValues {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut values = Self::new();
        for (name, value) in iter {
            values.set(&name.into(), &value.into());
        }
        values
    }
}

// Serialized as a JSON object in insertion order rather than as a list of pairs.
impl Serialize for FieldValues {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldValues {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldValuesVisitor;

        impl<'de> serde::de::Visitor<'de> for FieldValuesVisitor {
            type Value = FieldValues;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to values")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut access: A,
            ) -> Result<Self::Value, A::Error> {
                let mut values = FieldValues::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    values.set(&name, &value);
                }
                Ok(values)
            }
        }

        deserializer.deserialize_map(FieldValuesVisitor)
    }
}

/// An issue selected for a transition, either a root or an expanded descendant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateIssue {
    /// Issue identity
    #[serde(rename = "issue")]
    pub reference: IssueRef,

    /// Issue title
    pub title: String,

    /// Issue body
    #[serde(skip)]
    pub body: String,

    /// Project item id; `None` means the issue is not on the board
    pub item_id: Option<String>,

    /// 0 for roots, parent depth + 1 for descendants
    pub depth: usize,

    /// Current values of the item's fields
    pub fields: FieldValues,
}

impl CandidateIssue {
    /// Whether the issue has a tracked item on the board
    pub fn is_tracked(&self) -> bool {
        self.item_id.is_some()
    }
}

/// A single field mutation on one tracked item. An empty value clears the field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldUpdate {
    /// Project item id
    pub item_id: String,

    /// Board field name
    pub field: String,

    /// New value, `""` to clear
    pub value: String,
}

impl FieldUpdate {
    /// Create a new field update
    pub fn new(
        item_id: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether this update clears the field
    pub fn is_clear(&self) -> bool {
        self.value.is_empty()
    }
}

/// Result of applying one [`FieldUpdate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Project item id
    pub item_id: String,

    /// Board field name
    pub field: String,

    /// Whether the update was applied
    pub success: bool,

    /// Error message when the update ultimately failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOutcome {
    /// Successful outcome for `update`
    pub fn succeeded(update: &FieldUpdate) -> Self {
        Self {
            item_id: update.item_id.clone(),
            field: update.field.clone(),
            success: true,
            error: None,
        }
    }

    /// Failed outcome for `update`
    pub fn failed(update: &FieldUpdate, error: impl Into<String>) -> Self {
        Self {
            item_id: update.item_id.clone(),
            field: update.field.clone(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Normalise a workflow stage name for comparison.
///
/// Stages compare case-insensitively with `_` and spaces interchangeable, so
/// `"In Progress"`, `"in_progress"` and `"IN  PROGRESS"` are all the same
/// stage.
pub fn normalize_stage(name: &str) -> String {
    name.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Workflow stages the validator knows rules for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Not yet scheduled
    Backlog,

    /// Scheduled and ready to start
    Ready,

    /// Being worked on
    InProgress,

    /// Awaiting review
    InReview,

    /// Completed
    Done,
}

impl Stage {
    /// Parse a board status value into a known stage, if it is one.
    ///
    /// An empty status is treated as backlog.
    pub fn parse(status: &str) -> Option<Self> {
        match normalize_stage(status).as_str() {
            "" | "backlog" => Some(Self::Backlog),
            "ready" => Some(Self::Ready),
            "in_progress" => Some(Self::InProgress),
            "in_review" => Some(Self::InReview),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backlog => write!(f, "backlog"),
            Self::Ready => write!(f, "ready"),
            Self::InProgress => write!(f, "in_progress"),
            Self::InReview => write!(f, "in_review"),
            Self::Done => write!(f, "done"),
        }
    }
}
