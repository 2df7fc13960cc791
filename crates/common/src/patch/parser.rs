// SEARCH/REPLACE block parser.
//
// Single pass over the payload lines. `<file path="...">` envelopes only tag
// the blocks inside them, so every block is parsed exactly once. Malformed
// blocks are recorded and skipped; parsing always continues.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SEARCH_MARKER: &str = "<<<<<<< SEARCH";
pub const DIVIDER_MARKER: &str = "=======";
pub const REPLACE_MARKER: &str = ">>>>>>> REPLACE";

const FILE_OPEN_PREFIX: &str = "<file";
const FILE_PATH_ATTR: &str = "path=\"";
const FILE_CLOSE: &str = "</file>";

/// One find/replace instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchBlock {
    pub search: String,
    pub replace: String,
    /// Set when the block sat inside a `<file path="...">` envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,
}

impl PatchBlock {
    pub fn new(search: impl Into<String>, replace: impl Into<String>) -> Self {
        Self { search: search.into(), replace: replace.into(), target_path: None }
    }

    /// Renders the block back into the wire format (without envelope).
    pub fn to_patch_text(&self) -> String {
        format!(
            "{SEARCH_MARKER}\n{}\n{DIVIDER_MARKER}\n{}\n{REPLACE_MARKER}\n",
            self.search, self.replace
        )
    }
}

/// Recoverable problem found while parsing. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("block {block} (line {line}): SEARCH section is empty")]
    EmptySearch { block: usize, line: usize },
    #[error("block {block} (line {line}): SEARCH marker has no `{DIVIDER_MARKER}` divider")]
    MissingDivider { block: usize, line: usize },
    #[error("block {block} (line {line}): divider has no `{REPLACE_MARKER}` marker")]
    MissingReplace { block: usize, line: usize },
    #[error("line {line}: `<file>` envelope for `{path}` is never closed")]
    UnclosedEnvelope { line: usize, path: String },
    #[error("line {line}: `<file>` envelope opened inside another envelope")]
    NestedEnvelope { line: usize },
    #[error("line {line}: `<file>` tag has no path attribute")]
    MalformedEnvelope { line: usize },
}

/// Parser output: every well-formed block plus every error hit on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPatch {
    pub blocks: Vec<PatchBlock>,
    pub errors: Vec<ParseError>,
}

impl ParsedPatch {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

enum State {
    Outside,
    Search { block: usize, line: usize, lines: Vec<String> },
    Replace { block: usize, line: usize, search: Vec<String>, lines: Vec<String> },
}

struct Envelope {
    path: String,
    line: usize,
}

/// Parses a raw patch payload. Never fails; see [`ParsedPatch::errors`].
pub fn parse_patch(raw: &str) -> ParsedPatch {
    let mut parsed = ParsedPatch::default();
    let mut state = State::Outside;
    let mut envelope: Option<Envelope> = None;
    let mut block_count = 0usize;

    for (index, raw_line) in raw.split('\n').enumerate() {
        let line_no = index + 1;
        let text = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        let marker = text.trim();

        if marker == SEARCH_MARKER {
            abandon(&mut parsed, std::mem::replace(&mut state, State::Outside));
            block_count += 1;
            state = State::Search { block: block_count, line: line_no, lines: Vec::new() };
            continue;
        }

        if marker == FILE_CLOSE {
            abandon(&mut parsed, std::mem::replace(&mut state, State::Outside));
            envelope = None;
            continue;
        }

        state = match state {
            State::Outside => {
                if is_envelope_open(marker) {
                    open_envelope(&mut parsed, &mut envelope, marker, line_no);
                }
                State::Outside
            }
            State::Search { block, line, mut lines } => {
                if marker == DIVIDER_MARKER {
                    State::Replace { block, line, search: lines, lines: Vec::new() }
                } else if marker == REPLACE_MARKER {
                    parsed.errors.push(ParseError::MissingDivider { block, line });
                    State::Outside
                } else {
                    lines.push(text.to_owned());
                    State::Search { block, line, lines }
                }
            }
            State::Replace { block, line, search, mut lines } => {
                if marker == REPLACE_MARKER {
                    finish_block(&mut parsed, &envelope, block, line, search, lines);
                    State::Outside
                } else {
                    lines.push(text.to_owned());
                    State::Replace { block, line, search, lines }
                }
            }
        };
    }

    abandon(&mut parsed, state);
    if let Some(open) = envelope {
        parsed.errors.push(ParseError::UnclosedEnvelope { line: open.line, path: open.path });
    }

    parsed
}

fn open_envelope(
    parsed: &mut ParsedPatch,
    envelope: &mut Option<Envelope>,
    tag: &str,
    line: usize,
) {
    let Some(path) = envelope_path(tag) else {
        parsed.errors.push(ParseError::MalformedEnvelope { line });
        return;
    };
    if envelope.is_some() {
        // The outer envelope keeps its target.
        parsed.errors.push(ParseError::NestedEnvelope { line });
        return;
    }
    *envelope = Some(Envelope { path, line });
}

fn is_envelope_open(marker: &str) -> bool {
    marker.strip_prefix(FILE_OPEN_PREFIX).is_some_and(|rest| rest.starts_with([' ', '>']))
}

fn envelope_path(tag: &str) -> Option<String> {
    let rest = tag.strip_prefix(FILE_OPEN_PREFIX)?.strip_suffix('>')?;
    let start = rest.find(FILE_PATH_ATTR)? + FILE_PATH_ATTR.len();
    let len = rest[start..].find('"')?;
    let path = rest[start..start + len].trim();
    (!path.is_empty()).then(|| path.to_owned())
}

fn finish_block(
    parsed: &mut ParsedPatch,
    envelope: &Option<Envelope>,
    block: usize,
    line: usize,
    search: Vec<String>,
    replace: Vec<String>,
) {
    let search = search.join("\n");
    if search.trim().is_empty() {
        parsed.errors.push(ParseError::EmptySearch { block, line });
        return;
    }
    parsed.blocks.push(PatchBlock {
        search,
        replace: replace.join("\n"),
        target_path: envelope.as_ref().map(|open| open.path.clone()),
    });
}

fn abandon(parsed: &mut ParsedPatch, state: State) {
    match state {
        State::Outside => {}
        State::Search { block, line, .. } => {
            parsed.errors.push(ParseError::MissingDivider { block, line });
        }
        State::Replace { block, line, .. } => {
            parsed.errors.push(ParseError::MissingReplace { block, line });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_patch, ParseError, PatchBlock};

    #[test]
    fn parses_single_block() {
        let raw = "<<<<<<< SEARCH\nlet a = 1;\n=======\nlet a = 2;\n>>>>>>> REPLACE\n";
        let parsed = parse_patch(raw);

        assert!(parsed.is_clean());
        assert_eq!(parsed.blocks, vec![PatchBlock::new("let a = 1;", "let a = 2;")]);
    }

    #[test]
    fn keeps_multiline_sections_and_ignores_surrounding_prose() {
        let raw = "Here is the fix:\n\
                   <<<<<<< SEARCH\n\
                   fn a() {\n    old();\n}\n\
                   =======\n\
                   fn a() {\n    new();\n}\n\
                   >>>>>>> REPLACE\n\
                   Done.";
        let parsed = parse_patch(raw);

        assert!(parsed.is_clean());
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.blocks[0].search, "fn a() {\n    old();\n}");
        assert_eq!(parsed.blocks[0].replace, "fn a() {\n    new();\n}");
    }

    #[test]
    fn empty_replace_is_a_deletion() {
        let parsed = parse_patch("<<<<<<< SEARCH\nremove me\n=======\n>>>>>>> REPLACE");
        assert!(parsed.is_clean());
        assert_eq!(parsed.blocks[0].replace, "");
    }

    #[test]
    fn accepts_crlf_payloads() {
        let raw = "<<<<<<< SEARCH\r\nold\r\n=======\r\nnew\r\n>>>>>>> REPLACE\r\n";
        let parsed = parse_patch(raw);
        assert_eq!(parsed.blocks, vec![PatchBlock::new("old", "new")]);
    }

    #[test]
    fn empty_search_is_reported_and_later_blocks_still_parse() {
        let raw = "<<<<<<< SEARCH\n   \n=======\nx\n>>>>>>> REPLACE\n\
                   <<<<<<< SEARCH\nkeep\n=======\nkept\n>>>>>>> REPLACE\n";
        let parsed = parse_patch(raw);

        assert_eq!(parsed.errors, vec![ParseError::EmptySearch { block: 1, line: 1 }]);
        assert_eq!(parsed.blocks, vec![PatchBlock::new("keep", "kept")]);
    }

    #[test]
    fn unterminated_blocks_are_reported() {
        let raw = "<<<<<<< SEARCH\nno divider\n\
                   <<<<<<< SEARCH\nok\n=======\nfine\n>>>>>>> REPLACE\n\
                   <<<<<<< SEARCH\ntail\n=======\nnever closed";
        let parsed = parse_patch(raw);

        assert_eq!(
            parsed.errors,
            vec![
                ParseError::MissingDivider { block: 1, line: 1 },
                ParseError::MissingReplace { block: 3, line: 8 },
            ]
        );
        assert_eq!(parsed.blocks, vec![PatchBlock::new("ok", "fine")]);
    }

    #[test]
    fn replace_marker_without_divider_is_reported() {
        let parsed = parse_patch("<<<<<<< SEARCH\nold\n>>>>>>> REPLACE\n");
        assert_eq!(parsed.errors, vec![ParseError::MissingDivider { block: 1, line: 1 }]);
        assert!(parsed.blocks.is_empty());
    }

    #[test]
    fn envelopes_tag_blocks_once() {
        let raw = "<file path=\"src/auth.js\">\n\
                   <<<<<<< SEARCH\na\n=======\nb\n>>>>>>> REPLACE\n\
                   <<<<<<< SEARCH\nc\n=======\nd\n>>>>>>> REPLACE\n\
                   </file>\n\
                   <<<<<<< SEARCH\ne\n=======\nf\n>>>>>>> REPLACE\n";
        let parsed = parse_patch(raw);

        assert!(parsed.is_clean());
        assert_eq!(parsed.blocks.len(), 3);
        assert_eq!(parsed.blocks[0].target_path.as_deref(), Some("src/auth.js"));
        assert_eq!(parsed.blocks[1].target_path.as_deref(), Some("src/auth.js"));
        assert_eq!(parsed.blocks[2].target_path, None);
    }

    #[test]
    fn envelope_errors_are_collected() {
        let raw = "<file>\n\
                   <file path=\"a.md\">\n\
                   <file path=\"b.md\">\n\
                   <<<<<<< SEARCH\nx\n=======\ny\n>>>>>>> REPLACE\n";
        let parsed = parse_patch(raw);

        assert_eq!(
            parsed.errors,
            vec![
                ParseError::MalformedEnvelope { line: 1 },
                ParseError::NestedEnvelope { line: 3 },
                ParseError::UnclosedEnvelope { line: 2, path: "a.md".into() },
            ]
        );
        assert_eq!(parsed.blocks[0].target_path.as_deref(), Some("a.md"));
    }

    #[test]
    fn block_rendering_parses_back() {
        let block = PatchBlock::new("one\ntwo", "three");
        let parsed = parse_patch(&block.to_patch_text());
        assert_eq!(parsed.blocks, vec![block]);
    }
}
