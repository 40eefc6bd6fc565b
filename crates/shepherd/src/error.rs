//! Error types for shepherd operations.
//!
//! Workflow rule violations are not errors in this sense: they are collected
//! into [`crate::workflow::ValidationErrors`] and carried by the transition
//! plan so that every problem is reported in one pass.

use std::io;
use thiserror::Error;

/// The error type for shepherd operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No `.shepherd/` directory was found above the working directory.
    #[error("Not a shepherd repository (or any of the parent directories). Run 'shepherd init' first.")]
    NotInitialized,

    /// A bare issue number was given and no default repository is configured.
    #[error("no repository specified for '{token}' (use owner/repo#{token} or --repo)")]
    MissingRepository {
        /// The offending token.
        token: String,
    },

    /// A token could not be parsed as an issue reference.
    #[error("invalid issue reference '{token}': {reason}")]
    InvalidReference {
        /// The offending token.
        token: String,
        /// Why parsing failed.
        reason: String,
    },

    /// Two field requests that cannot be combined in one invocation.
    #[error("{0}")]
    ConflictingFields(String),

    /// A requested field value is not acceptable for that field.
    #[error("invalid value '{value}' for {field}: {reason}")]
    InvalidFieldValue {
        /// Field the value was meant for.
        field: String,
        /// The rejected value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A "current" lookup found no active tracker.
    #[error("no active {kind} found")]
    NoActiveTracker {
        /// Tracker category, e.g. "microsprint" or "branch".
        kind: String,
    },

    /// The project has no field with this name.
    #[error("project has no field named '{0}'")]
    UnknownField(String),

    /// A single-select field does not offer this option.
    #[error("field '{field}' has no option '{value}'")]
    UnknownOption {
        /// Field name.
        field: String,
        /// The requested option.
        value: String,
    },

    /// No tracked item with this identifier exists.
    #[error("project item not found: {0}")]
    ItemNotFound(String),

    /// No issue with this reference exists.
    #[error("issue not found: {0}")]
    IssueNotFound(String),

    /// The project board could not be reached or rejected the request.
    #[error("board request failed: {0}")]
    Transport(String),
}

impl Error {
    /// Whether retrying the same request could succeed.
    ///
    /// Schema and lookup errors are permanent; transport and IO failures are
    /// not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io(_))
    }
}

/// A specialized Result type for shepherd operations.
pub type Result<T> = std::result::Result<T, Error>;
