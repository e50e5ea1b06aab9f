//! ASP block extraction.
//!
//! Lifts server-side VBScript fragments out of mixed HTML/VBScript text while
//! keeping exact original-file positions. Three forms are recognized:
//! `<% … %>` server blocks, `<%= … %>` output expressions (recorded but never
//! parsed for symbols), and `<script … runat="server" …>…</script>` tags.
//! Classic ASP does not nest or overlap blocks, so a single forward pass is
//! sufficient; a `%>` always ends the open block, even inside a VBScript
//! string literal.

use crate::core::position::{LineIndex, Position};

/// A VBScript fragment extracted from an ASP file.
///
/// `start` is the position of the first content byte (just past the `<%`
/// delimiter or the opening tag), so fragment-relative positions compose
/// additively with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
    pub content: String,
    pub start: Position,
    pub end: Position,
    /// True for `<%= … %>` output expressions.
    pub is_inline: bool,
}

/// Extracts VBScript blocks from ASP file content.
#[derive(Debug)]
pub struct AspExtractor;

impl AspExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract all script blocks in document order. An unterminated `<%` or
    /// server `<script>` extends to the end of the file; no error is raised.
    pub fn extract(&self, content: &str) -> Vec<ScriptBlock> {
        let index = LineIndex::new(content);
        let bytes = content.as_bytes();
        let mut blocks = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != b'<' {
                i += 1;
                continue;
            }

            if content[i..].starts_with("<%") {
                let is_inline = bytes.get(i + 2) == Some(&b'=');
                let content_start = i + if is_inline { 3 } else { 2 };
                let (content_end, next) = match find_at(content, "%>", content_start) {
                    Some(close) => (close, close + 2),
                    None => (content.len(), content.len()),
                };
                blocks.push(ScriptBlock {
                    content: content[content_start..content_end].to_string(),
                    start: index.position(content_start),
                    end: index.position(content_end),
                    is_inline,
                });
                i = next;
                continue;
            }

            if let Some((attr_text, tag_end)) = script_tag_at(content, i) {
                if has_runat_server(attr_text) {
                    let content_start = tag_end + 1;
                    let (content_end, next) = match find_ci(content, "</script", content_start) {
                        Some(close) => {
                            let tag_close = find_at(content, ">", close)
                                .map(|p| p + 1)
                                .unwrap_or(content.len());
                            (close, tag_close)
                        }
                        None => (content.len(), content.len()),
                    };
                    blocks.push(ScriptBlock {
                        content: content[content_start..content_end].to_string(),
                        start: index.position(content_start),
                        end: index.position(content_end),
                        is_inline: false,
                    });
                    i = next;
                    continue;
                }
            }

            i += 1;
        }

        blocks
    }
}

impl Default for AspExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// If `content[at..]` opens a `<script …>` tag, return its attribute text and
/// the byte offset of the closing `>`.
fn script_tag_at(content: &str, at: usize) -> Option<(&str, usize)> {
    let rest = &content[at..];
    if rest.len() < 7 || !rest[..7].eq_ignore_ascii_case("<script") {
        return None;
    }
    let after = rest.as_bytes().get(7)?;
    if !after.is_ascii_whitespace() && *after != b'>' {
        return None;
    }
    let tag_end = find_at(content, ">", at + 7)?;
    Some((&content[at + 7..tag_end], tag_end))
}

/// Case-insensitive check for a `runat="server"` / `runat='server'` attribute.
fn has_runat_server(attrs: &str) -> bool {
    let lower = attrs.to_lowercase();
    let mut from = 0;
    while let Some(rel) = lower[from..].find("runat") {
        let pos = from + rel;
        let mut rest = lower[pos + 5..].trim_start();
        if let Some(stripped) = rest.strip_prefix('=') {
            rest = stripped.trim_start();
            for quote in ['"', '\''] {
                if let Some(value) = rest.strip_prefix(quote) {
                    if let Some(end) = value.find(quote) {
                        if value[..end].trim() == "server" {
                            return true;
                        }
                    }
                }
            }
        }
        from = pos + 5;
    }
    false
}

fn find_at(content: &str, needle: &str, from: usize) -> Option<usize> {
    content[from..].find(needle).map(|rel| from + rel)
}

fn find_ci(content: &str, needle: &str, from: usize) -> Option<usize> {
    if from > content.len() {
        return None;
    }
    let haystack = content.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| {
        haystack[i..i + needle.len()].eq_ignore_ascii_case(needle)
    })
}
