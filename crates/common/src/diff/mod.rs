// Line diffs for human-facing display.

pub mod lines;

pub use lines::{
    generate_diff, generate_diff_with_context, render_diff, DiffLine, DiffLineKind,
    DEFAULT_CONTEXT_LINES,
};
