//! CLI input validation functions.
//!
//! These validators are used by clap's `value_parser` attribute to validate
//! user input at parse time, providing immediate feedback for invalid values.

use crate::domain::RepoName;

/// Deepest sub-issue level `--depth` accepts
pub const MAX_DEPTH_LIMIT: usize = 64;

/// Maximum length of a field value given on the command line
pub const MAX_FIELD_VALUE_LENGTH: usize = 200;

/// Validate an `owner/repo` repository name.
pub fn validate_repo(s: &str) -> Result<RepoName, String> {
    s.trim().parse()
}

/// Validate the `--depth` limit.
pub fn validate_depth(s: &str) -> Result<usize, String> {
    let depth: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    if depth > MAX_DEPTH_LIMIT {
        return Err(format!(
            "depth cannot exceed {MAX_DEPTH_LIMIT}, got {depth}"
        ));
    }
    Ok(depth)
}

/// Validate a field value such as a status, branch or sprint name.
///
/// Values are single-line text. `current` is passed through and checked
/// later against the field it is used for.
pub fn validate_field_value(s: &str) -> Result<String, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Value cannot be empty".to_string());
    }

    if s.chars().count() > MAX_FIELD_VALUE_LENGTH {
        return Err(format!(
            "Value cannot exceed {MAX_FIELD_VALUE_LENGTH} characters"
        ));
    }

    if let Some(pos) = s.chars().position(char::is_control) {
        return Err(format!(
            "Value contains invalid control character at position {pos}"
        ));
    }

    Ok(s.to_string())
}

/// Validate a project owner login.
pub fn validate_owner(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Owner cannot be empty".to_string());
    }
    if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(format!(
            "Invalid owner '{s}': only letters, digits, '-' and '_' are allowed"
        ));
    }
    Ok(s.to_string())
}
