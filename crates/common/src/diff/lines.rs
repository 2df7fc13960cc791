use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffLineKind {
    Context,
    Added,
    Removed,
    /// Unchanged lines elided between two hunks.
    Gap,
}

/// One display row. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
    pub text: String,
}

impl DiffLine {
    pub fn render(&self) -> String {
        match self.kind {
            DiffLineKind::Context => format!("  {}", self.text),
            DiffLineKind::Added => format!("+ {}", self.text),
            DiffLineKind::Removed => format!("- {}", self.text),
            DiffLineKind::Gap => "  ⋯".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEdit<'a> {
    Equal(&'a str),
    Insert(&'a str),
    Delete(&'a str),
}

/// Line diff from `old_content` to `new_content` with a 3-line context window.
///
/// Display only; patches never reconcile through this.
pub fn generate_diff(old_content: &str, new_content: &str) -> Vec<DiffLine> {
    generate_diff_with_context(old_content, new_content, DEFAULT_CONTEXT_LINES)
}

pub fn generate_diff_with_context(
    old_content: &str,
    new_content: &str,
    context: usize,
) -> Vec<DiffLine> {
    if old_content == new_content {
        return Vec::new();
    }

    let old_lines: Vec<&str> = old_content.lines().collect();
    let new_lines: Vec<&str> = new_content.lines().collect();
    let rows = number_edits(&myers_line_edits(&old_lines, &new_lines));
    window_rows(rows, context)
}

/// Renders diff rows as plain text, one row per line.
pub fn render_diff(lines: &[DiffLine]) -> String {
    lines.iter().map(DiffLine::render).collect::<Vec<_>>().join("\n")
}

fn number_edits(edits: &[LineEdit<'_>]) -> Vec<DiffLine> {
    let mut old_line = 0usize;
    let mut new_line = 0usize;
    edits
        .iter()
        .map(|edit| match edit {
            LineEdit::Equal(text) => {
                old_line += 1;
                new_line += 1;
                DiffLine {
                    kind: DiffLineKind::Context,
                    old_line: Some(old_line),
                    new_line: Some(new_line),
                    text: (*text).to_owned(),
                }
            }
            LineEdit::Delete(text) => {
                old_line += 1;
                DiffLine {
                    kind: DiffLineKind::Removed,
                    old_line: Some(old_line),
                    new_line: None,
                    text: (*text).to_owned(),
                }
            }
            LineEdit::Insert(text) => {
                new_line += 1;
                DiffLine {
                    kind: DiffLineKind::Added,
                    old_line: None,
                    new_line: Some(new_line),
                    text: (*text).to_owned(),
                }
            }
        })
        .collect()
}

fn window_rows(rows: Vec<DiffLine>, context: usize) -> Vec<DiffLine> {
    let mut visible = vec![false; rows.len()];
    for (index, row) in rows.iter().enumerate() {
        if row.kind == DiffLineKind::Context {
            continue;
        }
        let start = index.saturating_sub(context);
        let end = (index + context + 1).min(rows.len());
        visible[start..end].iter_mut().for_each(|flag| *flag = true);
    }

    let mut out = Vec::new();
    let mut last_shown: Option<usize> = None;
    for (index, row) in rows.into_iter().enumerate() {
        if !visible[index] {
            continue;
        }
        if last_shown.is_some_and(|last| index > last + 1) {
            out.push(DiffLine {
                kind: DiffLineKind::Gap,
                old_line: None,
                new_line: None,
                text: String::new(),
            });
        }
        out.push(row);
        last_shown = Some(index);
    }
    out
}

fn myers_line_edits<'a>(old_lines: &[&'a str], new_lines: &[&'a str]) -> Vec<LineEdit<'a>> {
    let old_len = old_lines.len();
    let new_len = new_lines.len();

    if old_len == 0 {
        return new_lines.iter().copied().map(LineEdit::Insert).collect();
    }
    if new_len == 0 {
        return old_lines.iter().copied().map(LineEdit::Delete).collect();
    }

    let max = old_len + new_len;
    let offset = max as isize;
    let mut v = vec![0isize; 2 * max + 1];
    let mut trace: Vec<Vec<isize>> = Vec::with_capacity(max + 1);
    let mut solved_d = 0usize;

    'outer: for d in 0..=max {
        trace.push(v.clone());

        let d_isize = d as isize;
        let mut k = -d_isize;
        while k <= d_isize {
            let k_idx = (k + offset) as usize;
            let mut x = if k == -d_isize
                || (k != d_isize && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize])
            {
                v[(k + 1 + offset) as usize]
            } else {
                v[(k - 1 + offset) as usize] + 1
            };
            let mut y = x - k;

            while x < old_len as isize
                && y < new_len as isize
                && old_lines[x as usize] == new_lines[y as usize]
            {
                x += 1;
                y += 1;
            }

            v[k_idx] = x;

            if x >= old_len as isize && y >= new_len as isize {
                solved_d = d;
                break 'outer;
            }

            k += 2;
        }
    }

    backtrack_line_edits(old_lines, new_lines, &trace, solved_d, offset)
}

fn backtrack_line_edits<'a>(
    old_lines: &[&'a str],
    new_lines: &[&'a str],
    trace: &[Vec<isize>],
    solved_d: usize,
    offset: isize,
) -> Vec<LineEdit<'a>> {
    let mut edits = Vec::new();
    let mut x = old_lines.len() as isize;
    let mut y = new_lines.len() as isize;

    for d in (0..=solved_d).rev() {
        let v = &trace[d];
        let k = x - y;
        let d_isize = d as isize;

        let prev_k = if d == 0 {
            0
        } else if k == -d_isize
            || (k != d_isize && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize])
        {
            k + 1
        } else {
            k - 1
        };
        let prev_x = if d == 0 { 0 } else { v[(prev_k + offset) as usize] };
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            edits.push(LineEdit::Equal(old_lines[(x - 1) as usize]));
            x -= 1;
            y -= 1;
        }

        if d == 0 {
            break;
        }

        if x == prev_x {
            edits.push(LineEdit::Insert(new_lines[(y - 1) as usize]));
            y -= 1;
        } else {
            edits.push(LineEdit::Delete(old_lines[(x - 1) as usize]));
            x -= 1;
        }
    }

    edits.reverse();
    edits
}

#[cfg(test)]
mod tests {
    use super::{generate_diff, generate_diff_with_context, render_diff, DiffLineKind};

    fn kinds(old: &str, new: &str, context: usize) -> Vec<DiffLineKind> {
        generate_diff_with_context(old, new, context).iter().map(|line| line.kind).collect()
    }

    #[test]
    fn identical_content_has_no_rows() {
        assert!(generate_diff("a\nb", "a\nb").is_empty());
    }

    #[test]
    fn single_line_change_shows_removed_then_added() {
        let rows = generate_diff("a\nb\nc", "a\nB\nc");
        let rendered = render_diff(&rows);
        assert_eq!(rendered, "  a\n- b\n+ B\n  c");
        assert_eq!(rows[1].old_line, Some(2));
        assert_eq!(rows[2].new_line, Some(2));
    }

    #[test]
    fn insert_into_and_delete_from_empty_content() {
        assert_eq!(kinds("", "x\ny", 3), vec![DiffLineKind::Added, DiffLineKind::Added]);
        assert_eq!(kinds("x", "", 3), vec![DiffLineKind::Removed]);
    }

    #[test]
    fn distant_changes_are_split_by_a_gap() {
        let old: Vec<String> = (1..=20).map(|n| format!("line {n}")).collect();
        let mut new = old.clone();
        new[1] = "changed 2".into();
        new[18] = "changed 19".into();

        let rows = generate_diff_with_context(&old.join("\n"), &new.join("\n"), 1);
        let gaps = rows.iter().filter(|row| row.kind == DiffLineKind::Gap).count();
        assert_eq!(gaps, 1);
        // 1 context + change pair + 1 context on each side of the gap.
        assert_eq!(rows.len(), 9);
        assert_eq!(rows.first().and_then(|row| row.old_line), Some(1));
        assert_eq!(rows.last().and_then(|row| row.old_line), Some(20));
    }

    #[test]
    fn context_window_trims_far_unchanged_lines() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8";
        let new = "1\n2\n3\n4\n5\n6\n7\n8\n9";
        let rows = generate_diff(old, new);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].text, "6");
        assert_eq!(rows[3].kind, DiffLineKind::Added);
        assert_eq!(rows[3].new_line, Some(9));
    }
}
