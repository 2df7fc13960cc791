// Patch engine: SEARCH/REPLACE parsing and application.

pub mod apply;
pub mod parser;
pub mod suggest;

pub use apply::{apply_blocks, apply_blocks_with, BlockOutcome, BlockReport, PatchReport};
pub use parser::{
    parse_patch, ParseError, ParsedPatch, PatchBlock, DIVIDER_MARKER, REPLACE_MARKER,
    SEARCH_MARKER,
};
pub use suggest::{
    dice_coefficient, DiceSuggester, Suggester, Suggestion, DEFAULT_SUGGESTION_THRESHOLD,
};

use crate::diff::{generate_diff, DiffLine};

/// Stateless facade bundling the parser, the applier and the suggestion
/// heuristic it was configured with.
pub struct PatchEngine {
    suggester: Box<dyn Suggester>,
}

impl PatchEngine {
    pub fn new(suggester: Box<dyn Suggester>) -> Self {
        Self { suggester }
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self::new(Box::new(DiceSuggester::with_threshold(threshold)))
    }

    pub fn parse(&self, raw: &str) -> ParsedPatch {
        parse_patch(raw)
    }

    pub fn apply(&self, content: &str, blocks: &[PatchBlock]) -> PatchReport {
        apply_blocks_with(content, blocks, self.suggester.as_ref())
    }

    pub fn generate_diff(&self, old_content: &str, new_content: &str) -> Vec<DiffLine> {
        generate_diff(old_content, new_content)
    }
}

impl Default for PatchEngine {
    fn default() -> Self {
        Self::new(Box::new(DiceSuggester::default()))
    }
}

impl std::fmt::Debug for PatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchEngine").finish_non_exhaustive()
    }
}
