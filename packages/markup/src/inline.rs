//! Offset arithmetic over inline content.
//!
//! Offsets count characters of text runs; every other inline node (image,
//! hard break, opaque element) occupies exactly one offset.

use crate::ast::{Inline, Mark, MarkSet};

/// Length of one inline node in offsets
pub fn node_len(inline: &Inline) -> usize {
    match inline {
        Inline::Text { text, .. } => text.chars().count(),
        _ => 1,
    }
}

/// Total length of inline content in offsets
pub fn content_len(content: &[Inline]) -> usize {
    content.iter().map(node_len).sum()
}

/// Merge adjacent text runs with identical marks and drop empty runs
pub fn normalize(content: &mut Vec<Inline>) {
    let mut merged: Vec<Inline> = Vec::with_capacity(content.len());

    for inline in content.drain(..) {
        if let Inline::Text { text, marks } = &inline {
            if text.is_empty() {
                continue;
            }
            if let Some(Inline::Text {
                text: prev_text,
                marks: prev_marks,
            }) = merged.last_mut()
            {
                if prev_marks == marks {
                    prev_text.push_str(text);
                    continue;
                }
            }
        }
        merged.push(inline);
    }

    *content = merged;
}

/// Split content at `offset` (clamped to the content length)
pub fn split_at(content: Vec<Inline>, offset: usize) -> (Vec<Inline>, Vec<Inline>) {
    let mut before = Vec::new();
    let mut after = Vec::new();
    let mut remaining = offset;

    for inline in content {
        if remaining == 0 {
            after.push(inline);
            continue;
        }

        let len = node_len(&inline);
        if len <= remaining {
            remaining -= len;
            before.push(inline);
            continue;
        }

        // Only text runs are longer than one offset
        match inline {
            Inline::Text { text, marks } => {
                let byte = text
                    .char_indices()
                    .nth(remaining)
                    .map(|(i, _)| i)
                    .unwrap_or(text.len());
                let (head, tail) = text.split_at(byte);
                before.push(Inline::Text {
                    text: head.to_string(),
                    marks: marks.clone(),
                });
                after.push(Inline::Text {
                    text: tail.to_string(),
                    marks,
                });
            }
            other => after.push(other),
        }
        remaining = 0;
    }

    (before, after)
}

/// Insert nodes at `offset`
pub fn insert_at(content: &mut Vec<Inline>, offset: usize, nodes: Vec<Inline>) {
    let (mut before, after) = split_at(std::mem::take(content), offset);
    before.extend(nodes);
    before.extend(after);
    normalize(&mut before);
    *content = before;
}

/// Remove the nodes in `start..end`
pub fn delete_range(content: &mut Vec<Inline>, start: usize, end: usize) {
    if start >= end {
        return;
    }
    let (mut before, rest) = split_at(std::mem::take(content), start);
    let (_, after) = split_at(rest, end - start);
    before.extend(after);
    normalize(&mut before);
    *content = before;
}

/// Whether `start..end` overlaps any text run
pub fn range_has_text(content: &[Inline], start: usize, end: usize) -> bool {
    let mut offset = 0;
    content.iter().any(|inline| {
        let node_start = offset;
        offset += node_len(inline);
        matches!(inline, Inline::Text { .. }) && offset > start && node_start < end
    })
}

/// Whether every text character in `start..end` carries `mark`.
///
/// Ranges without text never count as marked.
pub fn range_has_mark(content: &[Inline], start: usize, end: usize, mark: Mark) -> bool {
    let mut offset = 0;
    let mut saw_text = false;

    for inline in content {
        let len = node_len(inline);
        let node_start = offset;
        offset += len;

        if offset <= start || node_start >= end {
            continue;
        }
        if let Inline::Text { marks, .. } = inline {
            saw_text = true;
            if !marks.contains(&mark) {
                return false;
            }
        }
    }

    saw_text
}

/// Add or remove `mark` on text in `start..end`
pub fn set_mark(content: &mut Vec<Inline>, start: usize, end: usize, mark: Mark, on: bool) {
    if start >= end {
        return;
    }

    let (mut before, rest) = split_at(std::mem::take(content), start);
    let (mut middle, after) = split_at(rest, end - start);

    for inline in &mut middle {
        if let Inline::Text { marks, .. } = inline {
            if on {
                marks.insert(mark);
            } else {
                marks.remove(&mark);
            }
        }
    }

    before.append(&mut middle);
    before.extend(after);
    normalize(&mut before);
    *content = before;
}

/// Marks of the text run ending at `offset`, used for typing continuation
pub fn marks_at(content: &[Inline], offset: usize) -> MarkSet {
    let mut position = 0;
    let mut marks = MarkSet::new();

    for inline in content {
        if position >= offset {
            break;
        }
        position += node_len(inline);
        marks = match inline {
            Inline::Text { marks, .. } => marks.clone(),
            _ => MarkSet::new(),
        };
    }

    marks
}
