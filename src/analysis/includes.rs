//! Classic ASP include directives.
//!
//! Extracts `<!--#include file="…"-->` and `<!--#include virtual="…"-->`
//! comments and resolves their targets to file URIs. Resolution is purely
//! lexical: no filesystem access happens here, existence is the include
//! graph's (or the lazy loader's) problem.

use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use lsp_types::Uri;
use regex::Regex;

use crate::core::position::{LineIndex, Range};

static INCLUDE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<!--\s*#include\s+(file|virtual)\s*=\s*(?:"([^"]*)"|'([^']*)')\s*-->"#)
        .expect("include directive pattern")
});

/// How an include target is rooted: `file` is relative to the including
/// document, `virtual` to the configured workspace root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    File,
    Virtual,
}

/// One include directive as written in the source, with its resolution
/// outcome. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirective {
    pub kind: IncludeKind,
    /// The path exactly as written between the quotes.
    pub raw_path: String,
    pub resolved_uri: Option<Uri>,
    /// Range of the whole `<!--…-->` directive.
    pub range: Range,
    pub is_valid: bool,
    pub error_message: Option<String>,
}

/// Parser for include directives in ASP/VBScript sources.
#[derive(Debug)]
pub struct IncludeDirectiveParser {
    workspace_root: Option<PathBuf>,
}

impl IncludeDirectiveParser {
    pub fn new(workspace_root: Option<PathBuf>) -> Self {
        Self { workspace_root }
    }

    /// Scan `content` for include directives. Every match yields a directive;
    /// unresolvable paths come back with `is_valid = false` rather than being
    /// dropped.
    pub fn extract_includes(&self, content: &str, source_uri: &Uri) -> Vec<IncludeDirective> {
        let index = LineIndex::new(content);
        let mut directives = Vec::new();

        for captures in INCLUDE_PATTERN.captures_iter(content) {
            let whole = captures.get(0).expect("match group 0");
            let kind = if captures[1].eq_ignore_ascii_case("file") {
                IncludeKind::File
            } else {
                IncludeKind::Virtual
            };
            let raw_path = captures
                .get(2)
                .or_else(|| captures.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default()
                .to_string();

            let (resolved_uri, is_valid, error_message) =
                self.resolve_path(kind, &raw_path, source_uri);

            directives.push(IncludeDirective {
                kind,
                raw_path,
                resolved_uri,
                range: Range::new(index.position(whole.start()), index.position(whole.end())),
                is_valid,
                error_message,
            });
        }

        directives
    }

    fn resolve_path(
        &self,
        kind: IncludeKind,
        raw_path: &str,
        source_uri: &Uri,
    ) -> (Option<Uri>, bool, Option<String>) {
        if raw_path.is_empty() {
            return (
                None,
                false,
                Some("empty path in include directive".to_string()),
            );
        }

        match kind {
            IncludeKind::File => {
                let Some(source_path) = uri_to_path(source_uri) else {
                    return (
                        None,
                        false,
                        Some("source document has no file path".to_string()),
                    );
                };
                let source_dir = source_path.parent().unwrap_or(Path::new("/"));
                let joined = source_dir.join(raw_path.replace('\\', "/"));
                (Some(path_to_uri(&normalize_path(&joined))), true, None)
            }
            IncludeKind::Virtual => {
                let Some(root) = &self.workspace_root else {
                    return (
                        None,
                        false,
                        Some("cannot resolve virtual path: workspace root not configured".to_string()),
                    );
                };
                let relative = raw_path.trim_start_matches('/').replace('\\', "/");
                let joined = root.join(relative);
                (Some(path_to_uri(&normalize_path(&joined))), true, None)
            }
        }
    }
}

/// Lexically normalize a path: fold `.` away and resolve `..` against the
/// preceding segment, without consulting the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(Component::ParentDir);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Extract the filesystem path from a `file://` URI, undoing percent
/// encoding.
pub fn uri_to_path(uri: &Uri) -> Option<PathBuf> {
    let raw = uri.as_str().strip_prefix("file://")?;
    Some(PathBuf::from(percent_decode(raw)))
}

/// Build a `file://` URI from a filesystem path, percent-encoding every byte
/// outside the URI unreserved set (plus `/`). Workspace paths can carry
/// spaces, `#`, quotes or raw Shift_JIS-era non-ASCII names; escaping them
/// all keeps the URI valid by construction, so parsing cannot fail.
pub fn path_to_uri(path: &Path) -> Uri {
    let raw = path.as_os_str().as_encoded_bytes();
    let mut escaped = String::with_capacity(raw.len());
    for &byte in raw {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~' | b'/') {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{byte:02X}"));
        }
    }
    Uri::from_str(&format!("file://{escaped}")).expect("escaped file uri")
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
