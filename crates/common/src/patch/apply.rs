// Exact-substring application of parsed patch blocks.
//
// Blocks run in order against the content left by the previous block. Each
// block gets exactly one outcome; a failing block never rolls back earlier
// successes. Text written by an earlier block of the same batch is off
// limits to later blocks.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::parser::PatchBlock;
use super::suggest::{DiceSuggester, Suggester, Suggestion};

const PREVIEW_MAX_LINES: usize = 3;
const PREVIEW_MAX_CHARS: usize = 120;

/// What happened to one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BlockOutcome {
    /// Replaced the single match; `line` is where the replacement starts (1-based).
    Applied { line: usize, removed_lines: usize, added_lines: usize },
    /// Content already has the replacement and no search match outside it.
    AlreadyApplied,
    NotFound { suggestion: Option<Suggestion> },
    MultipleMatches { count: usize },
    /// The only match touches text an earlier block of this batch wrote.
    OverlapsEarlierEdit,
}

impl BlockOutcome {
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::AlreadyApplied => "already_applied",
            Self::NotFound { .. } => "not_found",
            Self::MultipleMatches { .. } => "multiple_matches",
            Self::OverlapsEarlierEdit => "overlaps_earlier_edit",
        }
    }

    /// `applied` and `already_applied` both count as success.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Applied { .. } | Self::AlreadyApplied)
    }

    pub const fn changed_content(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockReport {
    /// Position of the block in the batch (0-based).
    pub index: usize,
    /// Truncated search text for display.
    pub search_preview: String,
    pub outcome: BlockOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchReport {
    pub new_content: String,
    pub applied_count: usize,
    pub outcomes: Vec<BlockReport>,
}

impl PatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|report| report.outcome.is_success())
    }

    pub fn changed_content(&self) -> bool {
        self.outcomes.iter().any(|report| report.outcome.changed_content())
    }

    pub fn failures(&self) -> impl Iterator<Item = &BlockReport> {
        self.outcomes.iter().filter(|report| !report.outcome.is_success())
    }
}

/// Applies `blocks` with the default suggestion heuristic.
pub fn apply_blocks(content: &str, blocks: &[PatchBlock]) -> PatchReport {
    apply_blocks_with(content, blocks, &DiceSuggester::default())
}

pub fn apply_blocks_with(
    content: &str,
    blocks: &[PatchBlock],
    suggester: &dyn Suggester,
) -> PatchReport {
    let mut current = normalize_line_endings(content);
    let mut written: Vec<Range<usize>> = Vec::new();
    let mut outcomes = Vec::with_capacity(blocks.len());
    let mut applied_count = 0usize;

    for (index, block) in blocks.iter().enumerate() {
        let search = normalize_line_endings(&block.search);
        let replace = normalize_line_endings(&block.replace);

        let outcome = apply_one(&mut current, &mut written, &search, &replace, suggester);
        if outcome.is_success() {
            applied_count += 1;
        }
        outcomes.push(BlockReport { index, search_preview: preview(&search), outcome });
    }

    PatchReport { new_content: current, applied_count, outcomes }
}

fn apply_one(
    content: &mut String,
    written: &mut Vec<Range<usize>>,
    search: &str,
    replace: &str,
    suggester: &dyn Suggester,
) -> BlockOutcome {
    if is_already_applied(content, search, replace) {
        return BlockOutcome::AlreadyApplied;
    }

    let mut matches = content.match_indices(search).map(|(offset, _)| offset);
    let Some(offset) = matches.next() else {
        return BlockOutcome::NotFound { suggestion: suggester.suggest(content, search) };
    };
    let extra = matches.count();
    if extra > 0 {
        return BlockOutcome::MultipleMatches { count: extra + 1 };
    }

    let target = offset..offset + search.len();
    if written.iter().any(|range| overlaps(&target, range)) {
        return BlockOutcome::OverlapsEarlierEdit;
    }

    let line = content[..offset].matches('\n').count() + 1;
    content.replace_range(target.clone(), replace);
    shift_written(written, &target, replace.len());

    BlockOutcome::Applied {
        line,
        removed_lines: line_count(search),
        added_lines: line_count(replace),
    }
}

// The replacement is present and every remaining search match sits inside a
// copy of it. Covers append-style blocks whose replacement repeats the search.
fn is_already_applied(content: &str, search: &str, replace: &str) -> bool {
    if !content.contains(replace) {
        return false;
    }
    if !content.contains(search) {
        return true;
    }
    if replace.is_empty() || !replace.contains(search) {
        return false;
    }
    let copies: Vec<Range<usize>> = content
        .match_indices(replace)
        .map(|(offset, _)| offset..offset + replace.len())
        .collect();
    content.match_indices(search).all(|(offset, _)| {
        let end = offset + search.len();
        copies.iter().any(|copy| copy.start <= offset && end <= copy.end)
    })
}

// Zero-width ranges (deletions) still block a match that spans them.
fn overlaps(target: &Range<usize>, written: &Range<usize>) -> bool {
    if written.is_empty() {
        return target.start < written.start && written.start < target.end;
    }
    target.start < written.end && written.start < target.end
}

fn shift_written(written: &mut Vec<Range<usize>>, replaced: &Range<usize>, new_len: usize) {
    let old_len = replaced.end - replaced.start;
    for range in written.iter_mut() {
        if range.start >= replaced.end {
            range.start = range.start + new_len - old_len;
            range.end = range.end + new_len - old_len;
        }
    }
    written.push(replaced.start..replaced.start + new_len);
}

fn line_count(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.lines().count().max(1)
    }
}

pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// First few lines of `text`, capped for notification display.
pub fn preview(text: &str) -> String {
    let mut lines = text.lines();
    let mut out = lines.by_ref().take(PREVIEW_MAX_LINES).collect::<Vec<_>>().join("\n");
    let mut truncated = lines.next().is_some();
    if out.chars().count() > PREVIEW_MAX_CHARS {
        out = out.chars().take(PREVIEW_MAX_CHARS).collect();
        truncated = true;
    }
    if truncated {
        out.push('…');
    }
    out
}
