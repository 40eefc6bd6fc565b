//! Color and styling helpers for CLI output.
//!
//! Semantic Color Theme:
//!   - Success/Pass:   green   (updated issues, passing verdicts)
//!   - Warning/Forced: yellow  (forced verdicts, waived rules, skips)
//!   - Error/Fail:     red     (failed verdicts, failed updates)
//!   - Info/Reference: cyan    (issue references, arrows)
//!   - Muted:          dimmed  (field labels, suggestions, depth guides)
//!   - Emphasis:       bold    (section headers)

use crate::domain::{IssueRef, Stage};
use crate::workflow::Verdict;
use colored::Colorize;

use super::OutputConfig;

/// Apply semantic "success" color (green) to text.
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply semantic "error" color (red) to text.
pub fn error(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.red().to_string()
}

/// Apply semantic "warning" color (yellow) to text.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Apply dimmed style to text (for labels and hints).
pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

/// Apply bold style to text (for section headers).
pub(crate) fn bold(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}

/// Colorize an issue reference (cyan).
pub(crate) fn colorize_ref(reference: &IssueRef, config: &OutputConfig) -> String {
    let text = reference.to_string();
    if !config.use_colors {
        return text;
    }
    text.cyan().to_string()
}

/// Colorize a status value by the workflow stage it names.
pub(crate) fn colorize_status(status: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return status.to_string();
    }
    match Stage::parse(status) {
        Some(Stage::Done) => status.green().to_string(),
        Some(Stage::InProgress | Stage::InReview) => status.yellow().to_string(),
        Some(Stage::Ready) => status.cyan().to_string(),
        Some(Stage::Backlog) | None => status.to_string(),
    }
}

/// Arrow between an old and a new value, with ASCII fallback.
pub(crate) fn arrow(config: &OutputConfig) -> String {
    let icon = if config.use_ascii { "->" } else { "→" };
    if !config.use_colors {
        return icon.to_string();
    }
    icon.cyan().to_string()
}

/// Icon for a verdict, with ASCII fallback support.
pub(crate) fn verdict_icon(verdict: &Verdict, config: &OutputConfig) -> &'static str {
    if config.use_ascii {
        match verdict {
            Verdict::Pass => "+",
            Verdict::PassWithForce(_) => "!",
            Verdict::Fail(_) => "x",
            Verdict::SkipNotTracked => "-",
        }
    } else {
        match verdict {
            Verdict::Pass => "✓",
            Verdict::PassWithForce(_) => "⚠",
            Verdict::Fail(_) => "✗",
            Verdict::SkipNotTracked => "○",
        }
    }
}

/// Colored verdict icon and label, e.g. `✓ pass`.
pub(crate) fn colorize_verdict(verdict: &Verdict, config: &OutputConfig) -> String {
    let text = format!("{} {}", verdict_icon(verdict, config), verdict.label());
    if !config.use_colors {
        return text;
    }
    match verdict {
        Verdict::Pass => text.green().to_string(),
        Verdict::PassWithForce(_) => text.yellow().to_string(),
        Verdict::Fail(_) => text.red().to_string(),
        Verdict::SkipNotTracked => text.dimmed().to_string(),
    }
}

/// Icon for a finished update: done, failed or skipped.
pub(crate) fn outcome_icon(applied: Option<bool>, config: &OutputConfig) -> String {
    let icon = match (applied, config.use_ascii) {
        (Some(true), true) => "+",
        (Some(false), true) => "x",
        (None, true) => "-",
        (Some(true), false) => "✓",
        (Some(false), false) => "✗",
        (None, false) => "○",
    };
    match applied {
        Some(true) => success(icon, config),
        Some(false) => error(icon, config),
        None => dimmed(icon, config),
    }
}
