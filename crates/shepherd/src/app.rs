//! Application context for CLI command execution.
//!
//! # Example
//!
//! ```no_run
//! use shepherd::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     println!("{} issue board at {}", app.config().project.owner, app.root().display());
//!     Ok(())
//! }
//! ```

use crate::board::{ProjectBoard, SnapshotBoard};
use crate::config::{CONFIG_FILE_NAME, SHEPHERD_DIR_NAME, ShepherdConfig, find_shepherd_root};
use crate::domain::RepoName;
use crate::error::{Error, Result};
use crate::transition::TransitionSettings;
use std::path::{Path, PathBuf};

/// Application context for CLI operations.
///
/// Holds the loaded configuration and the project board it points at.
pub struct App {
    board: Box<dyn ProjectBoard>,
    config: ShepherdConfig,
    root: PathBuf,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("board", &"<dyn ProjectBoard>")
            .finish()
    }
}

impl App {
    /// Create an App from the given working directory.
    ///
    /// Searches up the directory tree for `.shepherd/`, loads the
    /// configuration and opens the board snapshot it names.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No shepherd repository is found in the directory tree
    /// - Configuration cannot be loaded or is invalid
    /// - The board snapshot cannot be loaded
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root = find_shepherd_root(working_dir).ok_or(Error::NotInitialized)?;
        let config_path = root.join(SHEPHERD_DIR_NAME).join(CONFIG_FILE_NAME);
        let config = ShepherdConfig::load(&config_path).await?;

        let board = SnapshotBoard::load(&config.data_path(&root)).await?;
        tracing::debug!(root = %root.display(), "Loaded shepherd repository");

        Ok(Self {
            board: Box::new(board),
            config,
            root,
        })
    }

    /// Create an App around an existing board.
    pub fn with_board(board: Box<dyn ProjectBoard>, config: ShepherdConfig, root: PathBuf) -> Self {
        Self {
            board,
            config,
            root,
        }
    }

    /// The project board.
    pub fn board(&self) -> &dyn ProjectBoard {
        self.board.as_ref()
    }

    /// The loaded configuration.
    pub fn config(&self) -> &ShepherdConfig {
        &self.config
    }

    /// The directory containing `.shepherd/`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Transition settings from the configuration, with `repo_override`
    /// replacing the configured default repository.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configured repository is malformed.
    pub fn settings(&self, repo_override: Option<RepoName>) -> Result<TransitionSettings> {
        TransitionSettings::from_config(&self.config, repo_override)
    }
}
