//! Position arithmetic shared by the extractor, parser and index.
//!
//! Internally every column is a UTF-8 byte offset within its line. The LSP
//! wire speaks UTF-16 code units, so the message handler converts at the
//! boundary with [`to_wire_range`] / [`from_wire_position`]; nothing else in
//! the crate touches UTF-16.

/// A zero-indexed position. `character` is a byte offset within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open `[start, end)` range of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Canonical case fold used for every name-keyed lookup. VBScript identifiers
/// are compared case-insensitively, so all of `by_name`, reference matching
/// and terminator matching key through this single function.
pub fn casefold(name: &str) -> String {
    name.to_lowercase()
}

/// Precomputed byte offsets of each line start, for offset → position lookups.
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset into a (line, column) position. Offsets past the
    /// end of the text clamp to the final line.
    pub fn position(&self, offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        Position::new(line as u32, (offset - self.line_starts[line]) as u32)
    }
}

/// Shift a fragment-relative position into original-file coordinates.
///
/// Lines add unconditionally; the column offset applies only to positions on
/// the fragment's first line (later lines already start at column zero of the
/// original file).
pub fn apply_fragment_offset(pos: Position, fragment_start: Position) -> Position {
    if pos.line == 0 {
        Position::new(fragment_start.line, fragment_start.character + pos.character)
    } else {
        Position::new(fragment_start.line + pos.line, pos.character)
    }
}

pub fn apply_fragment_offset_range(range: Range, fragment_start: Position) -> Range {
    Range::new(
        apply_fragment_offset(range.start, fragment_start),
        apply_fragment_offset(range.end, fragment_start),
    )
}

fn line_text(text: &str, line: u32) -> Option<&str> {
    text.split('\n').nth(line as usize)
}

fn utf8_to_utf16_col(line: &str, byte_col: u32) -> u32 {
    let clamped = (byte_col as usize).min(line.len());
    line[..clamped].chars().map(|c| c.len_utf16() as u32).sum()
}

fn utf16_to_utf8_col(line: &str, utf16_col: u32) -> u32 {
    let mut units = 0u32;
    for (byte_idx, c) in line.char_indices() {
        if units >= utf16_col {
            return byte_idx as u32;
        }
        units += c.len_utf16() as u32;
    }
    line.len() as u32
}

/// Convert an internal range to an LSP wire range (UTF-16 columns).
pub fn to_wire_range(text: &str, range: Range) -> lsp_types::Range {
    lsp_types::Range {
        start: to_wire_position(text, range.start),
        end: to_wire_position(text, range.end),
    }
}

pub fn to_wire_position(text: &str, pos: Position) -> lsp_types::Position {
    let character = match line_text(text, pos.line) {
        Some(line) => utf8_to_utf16_col(line, pos.character),
        None => pos.character,
    };
    lsp_types::Position::new(pos.line, character)
}

/// Convert an LSP wire position (UTF-16 columns) to internal byte columns.
pub fn from_wire_position(text: &str, pos: lsp_types::Position) -> Position {
    let character = match line_text(text, pos.line) {
        Some(line) => utf16_to_utf8_col(line, pos.character),
        None => pos.character,
    };
    Position::new(pos.line, character)
}
