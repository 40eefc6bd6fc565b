//! Configuration management for shepherd.
//!
//! Configuration lives in `.shepherd/config.yaml` at the repository root:
//!
//! ```yaml
//! project:
//!   owner: acme
//!   number: 7
//! repository: acme/widgets
//! board:
//!   data-file: .shepherd/board.json
//! workflow:
//!   enabled: true
//! fields:
//!   status: Status
//!   priority: Priority
//!   sprint: Microsprint
//!   branch: Branch
//! trackers:
//!   sprint-label: microsprint
//!   branch-label: branch
//! retry:
//!   attempts: 3
//!   delay-ms: 200
//! ```
//!
//! Only `project` is required; every other section has defaults.

use crate::domain::RepoName;
use crate::error::{Error, Result};
use crate::executor::RetryPolicy;
use crate::fields::{FieldNames, TrackerLabels};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the shepherd directory
pub const SHEPHERD_DIR_NAME: &str = ".shepherd";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the board snapshot file
pub const BOARD_FILE_NAME: &str = "board.json";

/// Maximum directory depth to traverse when searching for the shepherd root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Configuration file structure for shepherd
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShepherdConfig {
    /// The project board to operate on
    pub project: ProjectConfig,

    /// Default repository for bare issue numbers, `owner/repo`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Board storage
    #[serde(default)]
    pub board: BoardConfig,

    /// Workflow rules
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Board field names
    #[serde(default)]
    pub fields: FieldNames,

    /// Tracker issue labels
    #[serde(default)]
    pub trackers: TrackerLabels,

    /// Retry policy for sequential updates
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// Project section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Owner of the project board
    pub owner: String,

    /// Project number
    pub number: u64,
}

/// Board storage section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct BoardConfig {
    /// Snapshot file, relative to the repository root
    pub data_file: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            data_file: format!("{SHEPHERD_DIR_NAME}/{BOARD_FILE_NAME}"),
        }
    }
}

/// Workflow section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Whether transition rules are enforced
    pub enabled: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ShepherdConfig {
    /// Create a configuration for project `number` owned by `owner`.
    pub fn new(owner: &str, number: u64, repository: Option<&RepoName>) -> Self {
        Self {
            project: ProjectConfig {
                owner: owner.to_string(),
                number,
            },
            repository: repository.map(ToString::to_string),
            board: BoardConfig::default(),
            workflow: WorkflowConfig::default(),
            fields: FieldNames::default(),
            trackers: TrackerLabels::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Load and validate configuration from a file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Check values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first invalid key.
    pub fn validate(&self) -> Result<()> {
        if self.project.owner.trim().is_empty() {
            return Err(Error::Config("project.owner cannot be empty".to_string()));
        }
        if self.project.number == 0 {
            return Err(Error::Config("project.number must be at least 1".to_string()));
        }
        self.default_repo()?;
        if self.retry.attempts == 0 {
            return Err(Error::Config("retry.attempts must be at least 1".to_string()));
        }
        for (key, name) in [
            ("fields.status", &self.fields.status),
            ("fields.priority", &self.fields.priority),
            ("fields.sprint", &self.fields.sprint),
            ("fields.branch", &self.fields.branch),
            ("trackers.sprint-label", &self.trackers.sprint_label),
            ("trackers.branch-label", &self.trackers.branch_label),
        ] {
            if name.trim().is_empty() {
                return Err(Error::Config(format!("{key} cannot be empty")));
            }
        }
        Ok(())
    }

    /// The configured default repository, if any.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `repository` is not `owner/repo`.
    pub fn default_repo(&self) -> Result<Option<RepoName>> {
        self.repository
            .as_deref()
            .map(|r| {
                r.parse::<RepoName>()
                    .map_err(|e| Error::Config(format!("repository: {e}")))
            })
            .transpose()
    }

    /// Absolute path of the board snapshot for a repository rooted at `root`.
    pub fn data_path(&self, root: &Path) -> PathBuf {
        root.join(&self.board.data_file)
    }
}

/// Find the shepherd root directory by searching up the directory tree.
///
/// Starts from the given directory and traverses parent directories
/// until a `.shepherd/` directory is found, the filesystem root is reached,
/// or the maximum traversal depth is exceeded.
pub fn find_shepherd_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(SHEPHERD_DIR_NAME).is_dir() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
