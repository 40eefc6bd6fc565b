//! Implementation of the `init` command.
//!
//! Creates the `.shepherd/` directory with a configuration file and an
//! empty board snapshot using the standard workflow fields.

use crate::board::{BoardSnapshot, Project, SnapshotBoard};
use crate::config::{CONFIG_FILE_NAME, SHEPHERD_DIR_NAME, ShepherdConfig};
use crate::domain::RepoName;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Project number used when none is given
pub const DEFAULT_PROJECT_NUMBER: u64 = 1;

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created shepherd directory
    pub shepherd_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created board snapshot
    pub board_file: PathBuf,
    /// Owner of the project board
    pub owner: String,
    /// Project number
    pub number: u64,
}

/// Initialize shepherd in `base_dir`.
///
/// The project owner defaults to the owner of `repository`.
///
/// # Errors
///
/// Returns an error if:
/// - `.shepherd/` already exists
/// - No owner was given and none can be taken from `repository`
/// - File system operations fail
pub async fn init(
    base_dir: &Path,
    owner: Option<&str>,
    number: Option<u64>,
    repository: Option<&RepoName>,
) -> Result<InitResult> {
    let owner = owner
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(ToString::to_string)
        .or_else(|| repository.map(|r| r.owner.clone()))
        .ok_or_else(|| {
            Error::Config("a project owner is required: pass --owner or --repo".to_string())
        })?;
    let number = number.unwrap_or(DEFAULT_PROJECT_NUMBER);

    let shepherd_dir = base_dir.join(SHEPHERD_DIR_NAME);
    if shepherd_dir.exists() {
        return Err(Error::Config(format!(
            "Shepherd is already initialized in this directory. Found existing '{SHEPHERD_DIR_NAME}'"
        )));
    }

    let config = ShepherdConfig::new(&owner, number, repository);
    config.validate()?;

    fs::create_dir_all(&shepherd_dir).await?;

    let config_file = shepherd_dir.join(CONFIG_FILE_NAME);
    config.save(&config_file).await?;

    let board_file = config.data_path(base_dir);
    if let Some(parent) = board_file.parent() {
        fs::create_dir_all(parent).await?;
    }
    let snapshot = BoardSnapshot::empty(Project::standard(&owner, number));
    SnapshotBoard::write(&board_file, &snapshot).await?;

    tracing::debug!(dir = %shepherd_dir.display(), owner = %owner, number, "Initialized shepherd");

    Ok(InitResult {
        shepherd_dir,
        config_file,
        board_file,
        owner,
        number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ProjectBoard;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_config_and_board() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path(), Some("acme"), Some(7), None)
            .await
            .unwrap();

        assert!(result.shepherd_dir.is_dir());
        let config = ShepherdConfig::load(&result.config_file).await.unwrap();
        assert_eq!(config.project.owner, "acme");
        assert_eq!(config.project.number, 7);

        let board = SnapshotBoard::load(&result.board_file).await.unwrap();
        let project = board.project("acme", 7).await.unwrap();
        assert!(project.field("Status").is_some());
        assert!(project.field("Microsprint").is_some());
    }

    #[tokio::test]
    async fn test_init_takes_owner_from_repository() {
        let temp_dir = TempDir::new().unwrap();
        let repo = RepoName::new("acme", "widgets");

        let result = init(temp_dir.path(), None, None, Some(&repo)).await.unwrap();

        assert_eq!(result.owner, "acme");
        assert_eq!(result.number, DEFAULT_PROJECT_NUMBER);
        let config = ShepherdConfig::load(&result.config_file).await.unwrap();
        assert_eq!(config.repository.as_deref(), Some("acme/widgets"));
    }

    #[tokio::test]
    async fn test_init_requires_owner() {
        let temp_dir = TempDir::new().unwrap();

        let err = init(temp_dir.path(), None, None, None).await.unwrap_err();

        assert!(err.to_string().contains("--owner"));
        assert!(!temp_dir.path().join(SHEPHERD_DIR_NAME).exists());
    }

    #[tokio::test]
    async fn test_init_fails_if_already_initialized() {
        let temp_dir = TempDir::new().unwrap();
        init(temp_dir.path(), Some("acme"), None, None).await.unwrap();

        let err = init(temp_dir.path(), Some("acme"), None, None)
            .await
            .unwrap_err();

        assert!(err.to_string().to_lowercase().contains("already initialized"));
    }
}
