//! LSP feature providers organized by capability

pub mod definition;
pub mod references;
pub mod symbols;

pub use definition::DefinitionProvider;
pub use references::ReferencesProvider;
pub use symbols::SymbolsProvider;

use crate::core::position::{Position, Range};

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Extract the identifier under (or immediately left of) a cursor position:
/// the maximal `[A-Za-z0-9_]` span containing it. Returns the word and its
/// range, or None when the cursor is not on a word.
pub fn word_at_position(text: &str, pos: Position) -> Option<(String, Range)> {
    let line = text.split('\n').nth(pos.line as usize)?;
    let bytes = line.as_bytes();
    let mut col = (pos.character as usize).min(bytes.len());

    if (col >= bytes.len() || !is_word_byte(bytes[col])) && col > 0 && is_word_byte(bytes[col - 1])
    {
        col -= 1;
    }
    if col >= bytes.len() || !is_word_byte(bytes[col]) {
        return None;
    }

    let mut start = col;
    while start > 0 && is_word_byte(bytes[start - 1]) {
        start -= 1;
    }
    let mut end = col + 1;
    while end < bytes.len() && is_word_byte(bytes[end]) {
        end += 1;
    }

    Some((
        line[start..end].to_string(),
        Range::new(
            Position::new(pos.line, start as u32),
            Position::new(pos.line, end as u32),
        ),
    ))
}
