//! Issue reference parsing.
//!
//! Turns user-supplied tokens into fully-qualified [`IssueRef`]s. Accepted
//! forms:
//!
//! - `42` or `#42` (needs a default repository)
//! - `owner/repo#42`
//! - `https://<host>/owner/repo/issues/42`
//!
//! Owner and repository names are case-insensitive on the board and are
//! lowercased here, so `Acme/Widgets#1` and `acme/widgets#1` are the same
//! issue.
//!
//! Parse failures are collected per token rather than aborting the batch, so
//! valid references keep flowing through the pipeline.

use crate::domain::{IssueRef, RepoName};
use crate::error::{Error, Result};
use std::collections::HashSet;

/// Outcome of resolving a list of tokens.
#[derive(Debug, Default)]
pub struct ResolvedReferences {
    /// Successfully parsed references, de-duplicated, in input order
    pub refs: Vec<IssueRef>,

    /// One error per token that could not be parsed
    pub errors: Vec<Error>,
}

/// Parse a single token into an issue reference.
///
/// # Errors
///
/// - `Error::MissingRepository` for a bare number with no default repository
/// - `Error::InvalidReference` for anything else that does not parse
pub fn parse_reference(token: &str, default_repo: Option<&RepoName>) -> Result<IssueRef> {
    let trimmed = token.trim();
    let invalid = |reason: &str| Error::InvalidReference {
        token: trimmed.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("empty reference"));
    }

    if let Some(rest) = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
    {
        return parse_url_path(rest).ok_or_else(|| invalid("expected .../owner/repo/issues/N"));
    }

    match trimmed.split_once('#') {
        Some(("", number)) => {
            let number = parse_number(number).ok_or_else(|| invalid("not an issue number"))?;
            qualify(trimmed, number, default_repo)
        }
        Some((repo, number)) => {
            let repo: RepoName = repo.parse().map_err(|e: String| invalid(&e))?;
            let number = parse_number(number).ok_or_else(|| invalid("not an issue number"))?;
            Ok(canonical(&repo, number))
        }
        None => {
            let number = parse_number(trimmed)
                .ok_or_else(|| invalid("expected N, #N, owner/repo#N or an issue URL"))?;
            qualify(trimmed, number, default_repo)
        }
    }
}

/// Parse every token, collecting errors instead of failing fast.
///
/// The same issue given twice yields a single reference.
pub fn resolve_references<S: AsRef<str>>(
    tokens: &[S],
    default_repo: Option<&RepoName>,
) -> ResolvedReferences {
    let mut resolved = ResolvedReferences::default();
    let mut seen = HashSet::new();

    for token in tokens {
        match parse_reference(token.as_ref(), default_repo) {
            Ok(reference) => {
                if seen.insert(reference.clone()) {
                    resolved.refs.push(reference);
                }
            }
            Err(e) => {
                tracing::debug!(token = token.as_ref(), error = %e, "Rejected issue reference");
                resolved.errors.push(e);
            }
        }
    }

    resolved
}

fn qualify(token: &str, number: u64, default_repo: Option<&RepoName>) -> Result<IssueRef> {
    default_repo
        .map(|repo| canonical(repo, number))
        .ok_or_else(|| Error::MissingRepository {
            token: token.trim_start_matches('#').to_string(),
        })
}

/// Lowercased reference to issue `number` in `repo`.
pub(crate) fn canonical(repo: &RepoName, number: u64) -> IssueRef {
    IssueRef::new(repo.owner.to_lowercase(), repo.repo.to_lowercase(), number)
}

fn parse_number(s: &str) -> Option<u64> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok().filter(|n| *n > 0)
}

fn parse_url_path(rest: &str) -> Option<IssueRef> {
    let segments: Vec<&str> = rest.trim_end_matches('/').split('/').collect();
    match segments.as_slice() {
        [_host, owner, repo, "issues", number] => {
            let repo: RepoName = format!("{owner}/{repo}").parse().ok()?;
            Some(canonical(&repo, parse_number(number)?))
        }
        _ => None,
    }
}
