//! Output formatting for the transition pipeline.
//!
//! Text output is written for people: a preview of every candidate with its
//! verdict, the field changes about to be applied, and a summary once the
//! updates have run. JSON output carries the same data for scripts.
//!
//! Submodules:
//! - [`color`]: Color and styling helpers (semantic colors, icons)
//! - [`json`]: Serializable views of plans and reports

pub mod color;
pub mod json;

use crate::board::Project;
use crate::error::Error;
use crate::executor::ExecutionReport;
use crate::transition::TransitionPlan;
use crate::workflow::{ValidationError, ValidationErrors, Verdict};
use serde::Serialize;
use std::collections::HashSet;
use std::env;
use std::io::{self, Write};

pub use color::{error, success, warning};

use color::{arrow, bold, colorize_ref, colorize_status, colorize_verdict, dimmed, outcome_icon};

// ============================================================================
// Output Configuration
// ============================================================================

const DEFAULT_TERMINAL_WIDTH: u16 = 80;
const DEFAULT_MAX_CONTENT_WIDTH: usize = 100;
const MIN_TITLE_WIDTH: usize = 12;

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Maximum content width; long titles are truncated to fit.
    pub max_width: usize,
    /// Whether to use ASCII-only icons instead of Unicode.
    pub use_ascii: bool,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create a new `OutputConfig` with explicit values.
    pub fn new(max_width: usize, use_ascii: bool, use_colors: bool) -> Self {
        Self {
            max_width,
            use_ascii,
            use_colors,
        }
    }

    /// Create an `OutputConfig` from environment variables.
    ///
    /// Reads:
    /// - `SHEPHERD_MAX_WIDTH`: Maximum content width (default: 100)
    /// - `SHEPHERD_ASCII`: "1" or "true" for ASCII-only icons
    /// - `NO_COLOR`: any value disables colors
    /// - `SHEPHERD_COLOR`: "0" or "false" disables colors
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Like [`OutputConfig::from_env`], reading variables through `lookup`.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let max_width = match lookup("SHEPHERD_MAX_WIDTH") {
            Some(s) if !s.is_empty() => match s.parse() {
                Ok(width) => width,
                Err(_) => {
                    tracing::warn!(
                        env_var = "SHEPHERD_MAX_WIDTH",
                        value = %s,
                        default = DEFAULT_MAX_CONTENT_WIDTH,
                        "Invalid value, using default"
                    );
                    DEFAULT_MAX_CONTENT_WIDTH
                }
            },
            _ => DEFAULT_MAX_CONTENT_WIDTH,
        };

        let use_ascii = match lookup("SHEPHERD_ASCII") {
            Some(v) if v == "1" || v.eq_ignore_ascii_case("true") => true,
            Some(v) if v == "0" || v.eq_ignore_ascii_case("false") || v.is_empty() => false,
            Some(v) => {
                tracing::warn!(
                    env_var = "SHEPHERD_ASCII",
                    value = %v,
                    "Invalid value (expected '1', 'true', '0', or 'false'), using default"
                );
                false
            }
            None => false,
        };

        // https://no-color.org/
        let use_colors = lookup("NO_COLOR").is_none()
            && lookup("SHEPHERD_COLOR")
                .is_none_or(|v| v != "0" && !v.eq_ignore_ascii_case("false"));

        Self {
            max_width,
            use_ascii,
            use_colors,
        }
    }

    fn content_width(&self) -> usize {
        get_terminal_width().min(self.max_width)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_CONTENT_WIDTH,
            use_ascii: false,
            use_colors: true,
        }
    }
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Get the current terminal width, falling back to default if detection fails.
fn get_terminal_width() -> usize {
    terminal_size::terminal_size()
        .map_or(DEFAULT_TERMINAL_WIDTH as usize, |(w, _)| w.0 as usize)
}

/// Shorten `text` to at most `width` characters.
fn truncate(text: &str, width: usize, config: &OutputConfig) -> String {
    let width = width.max(MIN_TITLE_WIDTH);
    if text.chars().count() <= width {
        return text.to_string();
    }
    let ellipsis = if config.use_ascii { "..." } else { "…" };
    let keep = width.saturating_sub(ellipsis.chars().count());
    let mut short: String = text.chars().take(keep).collect();
    short.push_str(ellipsis);
    short
}

/// A field value as the board will store it; empty means cleared.
fn display_value(project: &Project, field: &str, value: &str) -> String {
    if value.is_empty() {
        return "(clear)".to_string();
    }
    project
        .field(field)
        .and_then(|def| def.canonical_value(value))
        .unwrap_or_else(|| value.to_string())
}

// ============================================================================
// JSON
// ============================================================================

/// Print any serializable value as pretty JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, value)
}

/// Write any serializable value as pretty JSON.
pub fn write_json<W: Write + ?Sized, T: Serialize>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(w, "{json}")
}

// ============================================================================
// Text Formatting
// ============================================================================

/// Write every candidate, indented by depth with its verdict, followed by
/// the field changes that would be applied.
pub fn write_preview<W: Write + ?Sized>(
    w: &mut W,
    plan: &TransitionPlan,
    config: &OutputConfig,
) -> io::Result<()> {
    let width = config.content_width();

    writeln!(w, "{} ({}):", bold("Issues", config), plan.candidates.len())?;
    for candidate in &plan.candidates {
        let indent = "  ".repeat(candidate.depth + 1);
        let reference = candidate.reference.to_string();
        match plan.validation.verdict(&candidate.reference) {
            Some(verdict) => {
                let used = indent.len() + verdict.label().len() + reference.len() + 4;
                writeln!(
                    w,
                    "{indent}{} {} {}",
                    colorize_verdict(verdict, config),
                    colorize_ref(&candidate.reference, config),
                    truncate(&candidate.title, width.saturating_sub(used), config)
                )?;
                let details: &[ValidationError] = match verdict {
                    Verdict::Fail(errors) | Verdict::PassWithForce(errors) => errors,
                    _ => &[],
                };
                for detail in details {
                    writeln!(w, "{indent}    {}", detail.message)?;
                }
            }
            None => {
                let used = indent.len() + reference.len() + 1;
                writeln!(
                    w,
                    "{indent}{} {}",
                    colorize_ref(&candidate.reference, config),
                    truncate(&candidate.title, width.saturating_sub(used), config)
                )?;
            }
        }
    }

    writeln!(w)?;
    if plan.assignments.is_empty() {
        writeln!(w, "{}", dimmed("No field changes.", config))?;
        return Ok(());
    }
    writeln!(w, "{}:", bold("Changes", config))?;
    for (field, value) in &plan.assignments {
        let shown = display_value(&plan.project, field, value);
        writeln!(
            w,
            "  {} {} {}",
            dimmed(field, config),
            arrow(config),
            colorize_status(&shown, config)
        )?;
    }
    Ok(())
}

/// Write the validation errors that blocked a run.
pub fn write_validation_errors<W: Write + ?Sized>(
    w: &mut W,
    errors: &ValidationErrors,
    config: &OutputConfig,
) -> io::Result<()> {
    let issues = errors.iter().map(|e| &e.issue).collect::<HashSet<_>>().len();
    let header = format!("Validation failed for {issues} issue(s); no changes were made:");
    writeln!(w, "{}", error(&header, config))?;
    write_error_list(w, errors, config)
}

/// Write the rule violations `--force` waived.
pub fn write_forced_warning<W: Write + ?Sized>(
    w: &mut W,
    waived: &ValidationErrors,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "{}",
        warning(
            &format!(
                "Warning: --force waives {} checklist violation(s):",
                waived.len()
            ),
            config
        )
    )?;
    write_error_list(w, waived, config)
}

fn write_error_list<W: Write + ?Sized>(
    w: &mut W,
    errors: &ValidationErrors,
    config: &OutputConfig,
) -> io::Result<()> {
    for e in errors {
        writeln!(
            w,
            "  {} {}: {}",
            outcome_icon(Some(false), config),
            e.issue,
            e.message
        )?;
        if let Some(suggestion) = &e.suggestion {
            writeln!(w, "      {}", dimmed(suggestion, config))?;
        }
    }
    Ok(())
}

/// Write tokens that did not resolve to an issue.
pub fn write_reference_errors<W: Write + ?Sized>(
    w: &mut W,
    errors: &[Error],
    config: &OutputConfig,
) -> io::Result<()> {
    for e in errors {
        writeln!(w, "{} {e}", outcome_icon(Some(false), config))?;
    }
    Ok(())
}

/// Write the counts line and any per-issue failures.
pub fn write_summary<W: Write + ?Sized>(
    w: &mut W,
    report: &ExecutionReport,
    config: &OutputConfig,
) -> io::Result<()> {
    let summary = report.summary();
    let line = summary.to_string();
    let line = if summary.failed > 0 {
        error(&line, config)
    } else {
        success(&line, config)
    };
    writeln!(w, "{line}")?;

    for reference in &report.skipped {
        writeln!(
            w,
            "  {} {} {}",
            outcome_icon(None, config),
            colorize_ref(reference, config),
            dimmed("not on the project board", config)
        )?;
    }
    for (reference, failures) in &report.failed {
        for failure in failures {
            writeln!(
                w,
                "  {} {} {}: {}",
                outcome_icon(Some(false), config),
                colorize_ref(reference, config),
                failure.field,
                failure.error
            )?;
        }
    }
    if report.fell_back {
        writeln!(
            w,
            "{}",
            dimmed("(batched update failed; updates were applied one by one)", config)
        )?;
    }
    Ok(())
}

/// Write the abbreviated result of a single-issue run.
pub fn write_single<W: Write + ?Sized>(
    w: &mut W,
    plan: &TransitionPlan,
    report: &ExecutionReport,
    config: &OutputConfig,
) -> io::Result<()> {
    if let Some(reference) = report.skipped.first() {
        return writeln!(
            w,
            "{} {}: {}",
            outcome_icon(None, config),
            colorize_ref(reference, config),
            dimmed("not on the project board, skipped", config)
        );
    }
    if let Some((reference, failures)) = report.failed.first() {
        let reasons = failures
            .iter()
            .map(|f| format!("{}: {}", f.field, f.error))
            .collect::<Vec<_>>()
            .join("; ");
        return writeln!(
            w,
            "{} {}: {}",
            outcome_icon(Some(false), config),
            colorize_ref(reference, config),
            error(&reasons, config)
        );
    }
    let Some(reference) = report.updated.first() else {
        return Ok(());
    };
    let changes = plan
        .assignments
        .iter()
        .map(|(field, value)| {
            let shown = display_value(&plan.project, field, value);
            format!("{field} {} {}", arrow(config), colorize_status(&shown, config))
        })
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(
        w,
        "{} {}: {changes}",
        outcome_icon(Some(true), config),
        colorize_ref(reference, config)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IssueRef;
    use crate::executor::FieldFailure;
    use rstest::rstest;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn plain() -> OutputConfig {
        OutputConfig::new(80, true, false)
    }

    #[test]
    fn test_output_config_defaults() {
        let config = OutputConfig::from_vars(vars(&[]));
        assert_eq!(config, OutputConfig::default());
    }

    #[rstest]
    #[case::width(&[("SHEPHERD_MAX_WIDTH", "120")], 120, false, true)]
    #[case::bad_width(&[("SHEPHERD_MAX_WIDTH", "wide")], DEFAULT_MAX_CONTENT_WIDTH, false, true)]
    #[case::ascii(&[("SHEPHERD_ASCII", "true")], DEFAULT_MAX_CONTENT_WIDTH, true, true)]
    #[case::ascii_garbage(&[("SHEPHERD_ASCII", "maybe")], DEFAULT_MAX_CONTENT_WIDTH, false, true)]
    #[case::no_color(&[("NO_COLOR", "1")], DEFAULT_MAX_CONTENT_WIDTH, false, false)]
    #[case::no_color_empty(&[("NO_COLOR", "")], DEFAULT_MAX_CONTENT_WIDTH, false, false)]
    #[case::color_off(&[("SHEPHERD_COLOR", "FALSE")], DEFAULT_MAX_CONTENT_WIDTH, false, false)]
    #[case::color_on(&[("SHEPHERD_COLOR", "1")], DEFAULT_MAX_CONTENT_WIDTH, false, true)]
    fn test_output_config_from_vars(
        #[case] pairs: &[(&str, &str)],
        #[case] width: usize,
        #[case] ascii: bool,
        #[case] colors: bool,
    ) {
        let config = OutputConfig::from_vars(vars(pairs));
        assert_eq!(config, OutputConfig::new(width, ascii, colors));
    }

    #[rstest]
    #[case("short", 20, "short")]
    #[case("a rather long issue title", 15, "a rather lon...")]
    #[case("tiny width still keeps some", 3, "tiny widt...")]
    fn test_truncate(#[case] text: &str, #[case] width: usize, #[case] expected: &str) {
        assert_eq!(truncate(text, width, &plain()), expected);
    }

    #[test]
    fn test_display_value_uses_option_name() {
        let project = Project::standard("acme", 1);
        assert_eq!(display_value(&project, "Status", "in_review"), "In Review");
        assert_eq!(display_value(&project, "Branch", "v2"), "v2");
        assert_eq!(display_value(&project, "Branch", ""), "(clear)");
    }

    #[test]
    fn test_write_json() {
        let mut buffer = Vec::new();
        write_json(&mut buffer, &serde_json::json!({ "updated": 3 })).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed["updated"], 3);
    }

    #[test]
    fn test_summary_lists_failures_and_skips() {
        let report = ExecutionReport {
            updated: vec![IssueRef::new("acme", "widgets", 1)],
            skipped: vec![IssueRef::new("acme", "widgets", 2)],
            failed: vec![(
                IssueRef::new("acme", "widgets", 3),
                vec![FieldFailure {
                    field: "Status".to_string(),
                    error: "board request failed: timeout".to_string(),
                }],
            )],
            fell_back: true,
            ..Default::default()
        };
        let mut buffer = Vec::new();

        write_summary(&mut buffer, &report, &plain()).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "1 updated, 1 skipped, 1 failed");
        assert_eq!(lines[1], "  - acme/widgets#2 not on the project board");
        assert_eq!(lines[2], "  x acme/widgets#3 Status: board request failed: timeout");
        assert!(lines[3].contains("one by one"));
    }

    #[test]
    fn test_validation_errors_include_suggestions() {
        let errors: ValidationErrors = [
            ValidationError {
                issue: IssueRef::new("acme", "widgets", 42),
                rule: crate::workflow::Rule::BodyRequired,
                message: "cannot move to done with an empty body".to_string(),
                suggestion: Some("add a description to the issue first".to_string()),
            },
        ]
        .into_iter()
        .collect();
        let mut buffer = Vec::new();

        write_validation_errors(&mut buffer, &errors, &plain()).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with("Validation failed for 1 issue(s)"));
        assert!(output.contains("  x acme/widgets#42: cannot move to done with an empty body"));
        assert!(output.contains("      add a description"));
    }

    #[test]
    fn test_validation_errors_count_issues_across_repositories() {
        let violation = |owner: &str, repo: &str, rule: crate::workflow::Rule| ValidationError {
            issue: IssueRef::new(owner, repo, 5),
            rule,
            message: "blocked".to_string(),
            suggestion: None,
        };
        let errors: ValidationErrors = [
            violation("acme", "widgets", crate::workflow::Rule::BodyRequired),
            violation("acme", "docs", crate::workflow::Rule::BodyRequired),
            violation("acme", "widgets", crate::workflow::Rule::ChecklistComplete),
        ]
        .into_iter()
        .collect();
        let mut buffer = Vec::new();

        write_validation_errors(&mut buffer, &errors, &plain()).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with("Validation failed for 2 issue(s)"), "got: {output}");
        assert!(output.contains("  x acme/docs#5: blocked"));
    }

    #[test]
    fn test_reference_errors() {
        let errors = vec![Error::MissingRepository {
            token: "7".to_string(),
        }];
        let mut buffer = Vec::new();

        write_reference_errors(&mut buffer, &errors, &plain()).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with("x no repository specified for '7'"));
    }
}
