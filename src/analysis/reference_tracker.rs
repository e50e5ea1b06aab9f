//! Identifier reference tracking.
//!
//! Scans document text for identifier occurrences outside comments and string
//! literals and keeps them queryable by case-folded name. Every non-keyword
//! identifier is recorded, not just names currently known to the symbol
//! index, so find-references results do not depend on the order documents
//! were indexed in.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use lsp_types::Uri;

use crate::analysis::parser::ParsedSymbol;
use crate::core::position::{casefold, Position, Range};
use crate::core::scan_state::{code_identifiers, LineScan};

/// A textual identifier occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Original casing at the occurrence site.
    pub name: String,
    pub uri: Uri,
    /// The identifier token only.
    pub range: Range,
    /// True when this occurrence is a declaration's name token.
    pub is_definition: bool,
    /// Innermost enclosing declaration, if any.
    pub container_name: Option<String>,
}

/// VBScript keywords and common built-ins, excluded from reference tracking.
static KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // Statement keywords
        "and", "as", "byref", "byval", "call", "case", "class", "const", "dim", "do", "each",
        "else", "elseif", "empty", "end", "eqv", "erase", "error", "execute", "exit", "explicit",
        "false", "for", "function", "get", "goto", "if", "imp", "in", "is", "let", "loop", "mod",
        "new", "next", "not", "nothing", "null", "on", "option", "or", "preserve", "private",
        "property", "public", "redim", "rem", "resume", "select", "set", "step", "sub", "then",
        "to", "true", "until", "wend", "while", "with", "xor",
        // Built-in functions
        "abs", "array", "asc", "cbool", "cbyte", "ccur", "cdate", "cdbl", "chr", "cint", "clng",
        "createobject", "csng", "cstr", "date", "dateadd", "datediff", "datepart", "dateserial",
        "datevalue", "day", "escape", "eval", "exp", "filter", "fix", "formatcurrency",
        "formatdatetime", "formatnumber", "formatpercent", "getlocale", "getobject", "getref",
        "hex", "hour", "inputbox", "instr", "instrrev", "int", "isarray", "isdate", "isempty",
        "isnull", "isnumeric", "isobject", "join", "lbound", "lcase", "left", "len",
        "loadpicture", "log", "ltrim", "mid", "minute", "month", "monthname", "msgbox", "now",
        "oct", "replace", "rgb", "right", "rnd", "round", "rtrim", "scriptengine",
        "scriptenginebuildversion", "scriptenginemajorversion", "scriptengineminorversion",
        "second", "setlocale", "sgn", "sin", "space", "split", "sqr", "strcomp", "string",
        "strreverse", "tan", "time", "timer", "timeserial", "timevalue", "trim", "typename",
        "ubound", "ucase", "unescape", "vartype", "weekday", "weekdayname", "year",
    ]
    .into_iter()
    .collect()
});

/// Tracks identifier references across documents, keyed by URI and by
/// case-folded name.
#[derive(Debug, Default)]
pub struct ReferenceTracker {
    by_uri: HashMap<Uri, Vec<Reference>>,
    by_name: HashMap<String, Vec<Reference>>,
}

impl ReferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rescan a document, replacing its previous references. `symbols` marks
    /// which occurrences are declarations (a reference is a definition when
    /// its range equals a symbol's selection range).
    pub fn update(&mut self, uri: &Uri, content: &str, symbols: &[ParsedSymbol]) {
        self.remove(uri);

        let mut selection_ranges: HashMap<Range, String> = HashMap::new();
        let mut containers: Vec<(Range, String)> = Vec::new();
        collect_symbol_spans(symbols, &mut selection_ranges, &mut containers);

        let mut references = Vec::new();
        for (line_no, line) in content.split('\n').enumerate() {
            let scan = LineScan::new(line);
            for (start, token) in code_identifiers(line, &scan) {
                if KEYWORDS.contains(casefold(token).as_str()) {
                    continue;
                }
                let range = Range::new(
                    Position::new(line_no as u32, start as u32),
                    Position::new(line_no as u32, (start + token.len()) as u32),
                );
                let is_definition = selection_ranges
                    .get(&range)
                    .is_some_and(|name| casefold(name) == casefold(token));
                references.push(Reference {
                    name: token.to_string(),
                    uri: uri.clone(),
                    range,
                    is_definition,
                    container_name: enclosing_container(&containers, range),
                });
            }
        }

        for reference in &references {
            self.by_name
                .entry(casefold(&reference.name))
                .or_default()
                .push(reference.clone());
        }
        self.by_uri.insert(uri.clone(), references);
    }

    /// Drop all references recorded for `uri`.
    pub fn remove(&mut self, uri: &Uri) {
        let Some(references) = self.by_uri.remove(uri) else {
            return;
        };
        for reference in references {
            let key = casefold(&reference.name);
            if let Some(entries) = self.by_name.get_mut(&key) {
                entries.retain(|r| &r.uri != uri);
                if entries.is_empty() {
                    self.by_name.remove(&key);
                }
            }
        }
    }

    /// All references to `name`, workspace-wide, deduplicated by (uri, range)
    /// and ordered by uri then start position. Declarations are filtered out
    /// unless `include_declaration` is set.
    pub fn find_references(&self, name: &str, include_declaration: bool) -> Vec<Reference> {
        let Some(entries) = self.by_name.get(&casefold(name)) else {
            return Vec::new();
        };
        let mut seen: HashSet<(String, Range)> = HashSet::new();
        let mut result: Vec<Reference> = entries
            .iter()
            .filter(|r| include_declaration || !r.is_definition)
            .filter(|r| seen.insert((r.uri.as_str().to_string(), r.range)))
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            a.uri
                .as_str()
                .cmp(b.uri.as_str())
                .then(a.range.start.cmp(&b.range.start))
        });
        result
    }

    /// All references recorded in one document.
    pub fn references_in_document(&self, uri: &Uri) -> &[Reference] {
        self.by_uri.get(uri).map(Vec::as_slice).unwrap_or_default()
    }
}

fn collect_symbol_spans(
    symbols: &[ParsedSymbol],
    selection_ranges: &mut HashMap<Range, String>,
    containers: &mut Vec<(Range, String)>,
) {
    for symbol in symbols {
        selection_ranges.insert(symbol.selection_range, symbol.name.clone());
        containers.push((symbol.range, symbol.name.clone()));
        collect_symbol_spans(&symbol.children, selection_ranges, containers);
    }
}

/// Innermost declaration whose range contains `range`, skipping the
/// declaration whose own name token this is.
fn enclosing_container(containers: &[(Range, String)], range: Range) -> Option<String> {
    containers
        .iter()
        .filter(|(outer, _)| {
            outer.start.line <= range.start.line && range.start.line <= outer.end.line
        })
        .last()
        .map(|(_, name)| name.clone())
}
