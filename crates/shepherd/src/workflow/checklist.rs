//! Markdown checklist scanning.
//!
//! Counts `- [ ]` and `- [x]` task-list lines in an issue body. Lines inside
//! fenced code blocks are ignored: a fence opens with three or more
//! backticks or tildes (optionally followed by an info string such as a
//! language tag) and closes with a bare fence of the same character that is
//! at least as long. An unclosed fence runs to the end of the body.

/// Checklist item counts for one body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChecklistCounts {
    /// `- [x]` items
    pub checked: usize,

    /// `- [ ]` items
    pub unchecked: usize,
}

impl ChecklistCounts {
    /// Total number of checklist items
    pub fn total(&self) -> usize {
        self.checked + self.unchecked
    }
}

#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: char,
    len: usize,
}

/// Count checklist items outside fenced code blocks.
pub fn scan_checklist(body: &str) -> ChecklistCounts {
    let mut counts = ChecklistCounts::default();
    let mut open_fence: Option<Fence> = None;

    for line in body.lines() {
        let trimmed = line.trim_start();

        if let Some(fence) = open_fence {
            if closes(trimmed, fence) {
                open_fence = None;
            }
            continue;
        }

        if let Some(fence) = opens(trimmed) {
            open_fence = Some(fence);
            continue;
        }

        match checkbox(trimmed) {
            Some(true) => counts.checked += 1,
            Some(false) => counts.unchecked += 1,
            None => {}
        }
    }

    counts
}

/// Number of unchecked items outside fenced code blocks.
pub fn unchecked_items(body: &str) -> usize {
    scan_checklist(body).unchecked
}

fn fence_run(line: &str) -> Option<Fence> {
    let marker = line.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = line.chars().take_while(|c| *c == marker).count();
    (len >= 3).then_some(Fence { marker, len })
}

fn opens(line: &str) -> Option<Fence> {
    let fence = fence_run(line)?;
    // A backtick fence's info string may not itself contain backticks.
    let info = &line[fence.len * fence.marker.len_utf8()..];
    if fence.marker == '`' && info.contains('`') {
        return None;
    }
    Some(fence)
}

fn closes(line: &str, open: Fence) -> bool {
    match fence_run(line) {
        Some(fence) => {
            let rest = &line[fence.len * fence.marker.len_utf8()..];
            fence.marker == open.marker && fence.len >= open.len && rest.trim().is_empty()
        }
        None => false,
    }
}

/// `Some(checked)` when the line is a checklist item.
fn checkbox(line: &str) -> Option<bool> {
    let rest = line.strip_prefix("- [")?;
    let mut chars = rest.chars();
    let mark = chars.next()?;
    if chars.next()? != ']' {
        return None;
    }
    match mark {
        ' ' => Some(false),
        'x' | 'X' => Some(true),
        _ => None,
    }
}
