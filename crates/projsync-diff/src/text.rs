//! Line-based diff of multi-line strings
//!
//! Output is a unified-diff-like block: `- ` lines exist only in the remote
//! value, `+ ` lines only in the local value, and unchanged lines are kept as
//! context (two-space prefix). Runs of unchanged lines longer than the
//! context allows are elided with a `...` line.

use similar::{ChangeTag, TextDiff};

/// Marker printed in place of elided unchanged lines
pub const ELLIPSIS: &str = "...";

/// Default number of unchanged lines kept around each change
pub const DEFAULT_CONTEXT_LINES: usize = 2;

enum Run<'a> {
    Equal(Vec<&'a str>),
    Changed(Vec<(ChangeTag, &'a str)>),
}

/// Diff two texts line by line
///
/// Returns `None` when the texts are equal.
pub fn diff_text(remote: &str, local: &str, context: usize) -> Option<String> {
    if remote == local {
        return None;
    }

    let diff = TextDiff::from_lines(remote, local);
    let mut runs: Vec<Run<'_>> = Vec::new();
    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches(['\n', '\r']);
        match (change.tag(), runs.last_mut()) {
            (ChangeTag::Equal, Some(Run::Equal(lines))) => lines.push(line),
            (ChangeTag::Equal, _) => runs.push(Run::Equal(vec![line])),
            (tag, Some(Run::Changed(lines))) => lines.push((tag, line)),
            (tag, _) => runs.push(Run::Changed(vec![(tag, line)])),
        }
    }

    let last = runs.len() - 1;
    let mut out: Vec<String> = Vec::new();
    for (index, run) in runs.iter().enumerate() {
        match run {
            Run::Changed(lines) => {
                for (tag, line) in lines {
                    let mark = if *tag == ChangeTag::Delete { "-" } else { "+" };
                    out.push(format!("{mark} {line}").trim_end().to_string());
                }
            }
            Run::Equal(lines) => {
                let (head, tail) = match (index == 0, index == last) {
                    (true, _) => (0, context),
                    (_, true) => (context, 0),
                    _ => (context, context),
                };
                push_context(&mut out, lines, head, tail);
            }
        }
    }

    Some(out.join("\n"))
}

fn push_context(out: &mut Vec<String>, lines: &[&str], head: usize, tail: usize) {
    let context_line = |line: &str| format!("  {line}").trim_end().to_string();

    if lines.len() <= head + tail {
        out.extend(lines.iter().map(|l| context_line(l)));
        return;
    }

    out.extend(lines[..head].iter().map(|l| context_line(l)));
    out.push(ELLIPSIS.to_string());
    out.extend(lines[lines.len() - tail..].iter().map(|l| context_line(l)));
}
