//! Balanced-parenthesis matching and top-level argument splitting.

use std::ops::Range;

/// The span ended before the parenthesis at this offset was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unbalanced {
    pub open: usize,
}

/// Byte offset of the `)` matching the `(` at byte offset `open`
pub fn matching_close(text: &str, open: usize) -> Result<usize, Unbalanced> {
    debug_assert_eq!(text.as_bytes().get(open), Some(&b'('));

    let mut depth = 0usize;
    for (offset, byte) in text.as_bytes()[open..].iter().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(open + offset);
                }
            }
            _ => {}
        }
    }
    Err(Unbalanced { open })
}

/// Split the interior of a call into the byte ranges of its argument values
///
/// Commas split only outside nested parentheses. Each piece is trimmed, except
/// that a piece wrapped whole in one outer pair of parentheses loses the pair
/// and keeps its interior verbatim. A blank interior means no arguments at all.
pub fn split_arguments(interior: &str) -> Vec<Range<usize>> {
    if interior.trim().is_empty() {
        return Vec::new();
    }

    split_top_level(interior)
        .into_iter()
        .map(|raw| unwrap_argument(interior, raw))
        .collect()
}

fn split_top_level(interior: &str) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (offset, byte) in interior.bytes().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                pieces.push(start..offset);
                start = offset + 1;
            }
            _ => {}
        }
    }
    pieces.push(start..interior.len());
    pieces
}

fn unwrap_argument(interior: &str, raw: Range<usize>) -> Range<usize> {
    let piece = &interior[raw.clone()];
    let end = raw.start + piece.trim_end().len();
    let start = end - piece.trim().len();
    let trimmed = &interior[start..end];
    if trimmed.starts_with('(') && matching_close(trimmed, 0) == Ok(trimmed.len() - 1) {
        start + 1..end - 1
    } else {
        start..end
    }
}
