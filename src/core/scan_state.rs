//! Shared comment/string scanner for VBScript lines.
//!
//! The parser, the reference scanner and the terminator matcher all need the
//! same judgement: is this byte inside code, a `"…"` string literal, or a
//! `'`/`REM` line comment? VBScript strings and comments never span lines, so
//! the state machine resets at every newline and a per-line scan suffices.
//! `""` inside a string is an embedded quote, not a terminator.

/// Classification of a single line: where the comment starts (if anywhere)
/// and which byte ranges are string literals.
#[derive(Debug, Clone)]
pub struct LineScan {
    comment_start: Option<usize>,
    string_ranges: Vec<(usize, usize)>,
}

impl LineScan {
    pub fn new(line: &str) -> Self {
        let comment_start = find_comment_start(line);
        let effective = match comment_start {
            Some(pos) => &line[..pos],
            None => line,
        };
        Self {
            comment_start,
            string_ranges: find_string_ranges(effective),
        }
    }

    /// True when the byte at `pos` is plain code (not comment, not string).
    pub fn in_code(&self, pos: usize) -> bool {
        if let Some(comment) = self.comment_start {
            if pos >= comment {
                return false;
            }
        }
        !self
            .string_ranges
            .iter()
            .any(|&(start, end)| pos >= start && pos < end)
    }

    pub fn comment_start(&self) -> Option<usize> {
        self.comment_start
    }
}

/// Find where a line comment begins, honoring quotes: a `'` inside a string
/// literal does not open a comment. `REM` opens a comment when it stands as
/// its own word.
fn find_comment_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_string = !in_string,
            b'\'' if !in_string => return Some(i),
            b'r' | b'R' if !in_string => {
                let word_start = i == 0 || !is_word_byte(bytes[i - 1]);
                if word_start
                    && i + 3 <= bytes.len()
                    && bytes[i..i + 3].eq_ignore_ascii_case(b"rem")
                {
                    let word_end = i + 3 >= bytes.len() || !is_word_byte(bytes[i + 3]);
                    if word_end {
                        return Some(i);
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Byte ranges (half-open) of string literals in a line. An unterminated
/// string extends to the end of the line.
fn find_string_ranges(line: &str) -> Vec<(usize, usize)> {
    let bytes = line.as_bytes();
    let mut ranges = Vec::new();
    let mut in_string = false;
    let mut string_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            if in_string {
                if i + 1 < bytes.len() && bytes[i + 1] == b'"' {
                    // Embedded quote: "" stays inside the literal.
                    i += 2;
                    continue;
                }
                ranges.push((string_start, i + 1));
                in_string = false;
            } else {
                string_start = i;
                in_string = true;
            }
        }
        i += 1;
    }
    if in_string {
        ranges.push((string_start, bytes.len()));
    }
    ranges
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Iterate maximal identifier tokens (`[A-Za-z_][A-Za-z0-9_]*`) that lie in
/// code, yielding `(start_byte, token)` pairs.
pub fn code_identifiers<'a>(line: &'a str, scan: &'a LineScan) -> impl Iterator<Item = (usize, &'a str)> + 'a {
    let bytes = line.as_bytes();
    let mut i = 0;
    std::iter::from_fn(move || {
        while i < bytes.len() {
            if bytes[i].is_ascii_alphabetic() || bytes[i] == b'_' {
                let start = i;
                while i < bytes.len() && is_word_byte(bytes[i]) {
                    i += 1;
                }
                if scan.in_code(start) {
                    return Some((start, &line[start..i]));
                }
            } else {
                i += 1;
            }
        }
        None
    })
}
