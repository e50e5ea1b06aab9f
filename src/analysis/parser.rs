//! Tolerant line-oriented VBScript parser.
//!
//! Extracts Function, Sub, Class and Property declarations from possibly
//! malformed source. The parser never fails: unclosed constructs extend to
//! the end of the input, openers hidden in comments or string literals are
//! ignored, and anything unrecognized is skipped.
//!
//! All positions are produced in the original file's coordinate system: a
//! fragment from an ASP file carries its start offset, applied once when the
//! fragment's symbols are finalized.

use crate::analysis::asp::AspExtractor;
use crate::core::position::{
    apply_fragment_offset_range, Position, Range,
};
use crate::core::scan_state::LineScan;

/// The closed set of symbol kinds this server reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Functions and Subs (LSP has no Sub kind).
    Function,
    Class,
    Property,
    /// Include directives surfaced in the document outline.
    File,
}

impl SymbolKind {
    pub fn to_lsp(self) -> lsp_types::SymbolKind {
        match self {
            SymbolKind::Function => lsp_types::SymbolKind::FUNCTION,
            SymbolKind::Class => lsp_types::SymbolKind::CLASS,
            SymbolKind::Property => lsp_types::SymbolKind::PROPERTY,
            SymbolKind::File => lsp_types::SymbolKind::FILE,
        }
    }
}

/// A declaration extracted from source, with nested class members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSymbol {
    /// Original casing as written.
    pub name: String,
    pub kind: SymbolKind,
    /// Full declaration, opener line through terminator line end.
    pub range: Range,
    /// The name token on the opener line.
    pub selection_range: Range,
    pub children: Vec<ParsedSymbol>,
}

/// Statement families used for terminator matching. Function and Sub close
/// with distinct `End` statements, so they are tracked separately even though
/// both report as [`SymbolKind::Function`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Function,
    Sub,
    Class,
    Property,
}

impl Family {
    fn kind(self) -> SymbolKind {
        match self {
            Family::Function | Family::Sub => SymbolKind::Function,
            Family::Class => SymbolKind::Class,
            Family::Property => SymbolKind::Property,
        }
    }
}

struct OpenScope {
    family: Family,
    symbol: ParsedSymbol,
    /// Whether the enclosing scope at open time was a Class. Openers inside a
    /// leaf (Function/Sub/Property body) belong to the file, not the leaf.
    attach_to_class: bool,
}

/// Parser for VBScript and ASP sources.
#[derive(Debug)]
pub struct VbScriptParser {
    extractor: AspExtractor,
}

impl VbScriptParser {
    pub fn new() -> Self {
        Self {
            extractor: AspExtractor::new(),
        }
    }

    /// Parse a document, dispatching on its suffix: `.asp` content goes
    /// through the block extractor, everything else parses as pure VBScript.
    pub fn parse(&self, content: &str, uri: &str) -> Vec<ParsedSymbol> {
        if uri.to_lowercase().ends_with(".asp") {
            self.parse_asp(content)
        } else {
            self.parse_fragment(content, Position::new(0, 0))
        }
    }

    /// Parse an ASP file by extracting its server-side fragments and parsing
    /// each with its original-file offset. Output expressions hold no
    /// declarations and are skipped.
    pub fn parse_asp(&self, content: &str) -> Vec<ParsedSymbol> {
        let mut symbols = Vec::new();
        for block in self.extractor.extract(content) {
            if block.is_inline {
                continue;
            }
            symbols.extend(self.parse_fragment(&block.content, block.start));
        }
        sort_symbols(&mut symbols);
        symbols
    }

    /// Parse one VBScript fragment. `offset` is the fragment's start position
    /// in the original file; pure `.vbs`/`.inc` files pass (0, 0).
    pub fn parse_fragment(&self, content: &str, offset: Position) -> Vec<ParsedSymbol> {
        let lines: Vec<&str> = content.split('\n').collect();
        let mut stack: Vec<OpenScope> = Vec::new();
        let mut top_level: Vec<ParsedSymbol> = Vec::new();

        for (line_no, raw) in lines.iter().enumerate() {
            let scan = LineScan::new(raw);
            let indent = raw.len() - raw.trim_start().len();
            if !scan.in_code(indent) {
                continue;
            }

            let Some((w1_start, w1_end, w1)) = next_word(raw, indent) else {
                continue;
            };

            if w1.eq_ignore_ascii_case("end") {
                if let Some((_, _, w2)) = next_word(raw, w1_end) {
                    if let Some(family) = family_keyword(w2) {
                        close_family(&mut stack, &mut top_level, family, line_no as u32, raw);
                    }
                }
                continue;
            }

            // Optional visibility modifier.
            let (_, kw_end, keyword) = if w1.eq_ignore_ascii_case("public")
                || w1.eq_ignore_ascii_case("private")
            {
                match next_word(raw, w1_end) {
                    Some(word) => word,
                    None => continue,
                }
            } else {
                (w1_start, w1_end, w1)
            };

            let opener = if keyword.eq_ignore_ascii_case("function") {
                next_word(raw, kw_end).map(|name| (Family::Function, name))
            } else if keyword.eq_ignore_ascii_case("sub") {
                next_word(raw, kw_end).map(|name| (Family::Sub, name))
            } else if keyword.eq_ignore_ascii_case("class") {
                next_word(raw, kw_end).map(|name| (Family::Class, name))
            } else if keyword.eq_ignore_ascii_case("property") {
                next_word(raw, kw_end).and_then(|(_, acc_end, accessor)| {
                    if accessor.eq_ignore_ascii_case("get")
                        || accessor.eq_ignore_ascii_case("let")
                        || accessor.eq_ignore_ascii_case("set")
                    {
                        next_word(raw, acc_end).map(|name| (Family::Property, name))
                    } else {
                        None
                    }
                })
            } else {
                None
            };

            let Some((family, (name_start, name_end, name))) = opener else {
                continue;
            };

            let line = line_no as u32;
            let attach_to_class = matches!(stack.last(), Some(top) if top.family == Family::Class);
            stack.push(OpenScope {
                family,
                symbol: ParsedSymbol {
                    name: name.to_string(),
                    kind: family.kind(),
                    range: Range::new(
                        Position::new(line, 0),
                        Position::new(line, raw.len() as u32),
                    ),
                    selection_range: Range::new(
                        Position::new(line, name_start as u32),
                        Position::new(line, name_end as u32),
                    ),
                    children: Vec::new(),
                },
                attach_to_class,
            });
        }

        // Unclosed openers extend to the end of the fragment.
        let last_line = lines.len().saturating_sub(1) as u32;
        let eof = Position::new(last_line, lines.last().map_or(0, |l| l.len()) as u32);
        while let Some(mut scope) = stack.pop() {
            scope.symbol.range.end = eof;
            attach(scope, &mut stack, &mut top_level);
        }

        sort_symbols(&mut top_level);
        if offset != Position::new(0, 0) {
            for symbol in &mut top_level {
                offset_symbol(symbol, offset);
            }
        }
        top_level
    }
}

impl Default for VbScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Close the innermost open scope of `family`. Scopes stacked above it were
/// left unterminated; they close on the same line, tolerantly.
fn close_family(
    stack: &mut Vec<OpenScope>,
    top_level: &mut Vec<ParsedSymbol>,
    family: Family,
    line: u32,
    line_text: &str,
) {
    let Some(target) = stack.iter().rposition(|scope| scope.family == family) else {
        return;
    };
    let end = Position::new(line, line_text.len() as u32);
    while stack.len() > target {
        let mut scope = stack.pop().expect("scope above target");
        scope.symbol.range.end = end;
        attach(scope, stack, top_level);
    }
}

fn attach(scope: OpenScope, stack: &mut [OpenScope], top_level: &mut Vec<ParsedSymbol>) {
    if scope.attach_to_class {
        if let Some(class) = stack
            .iter_mut()
            .rev()
            .find(|open| open.family == Family::Class)
        {
            class.symbol.children.push(scope.symbol);
            return;
        }
    }
    top_level.push(scope.symbol);
}

fn family_keyword(word: &str) -> Option<Family> {
    if word.eq_ignore_ascii_case("function") {
        Some(Family::Function)
    } else if word.eq_ignore_ascii_case("sub") {
        Some(Family::Sub)
    } else if word.eq_ignore_ascii_case("class") {
        Some(Family::Class)
    } else if word.eq_ignore_ascii_case("property") {
        Some(Family::Property)
    } else {
        None
    }
}

/// Read the next identifier token at or after `from`, skipping spaces and
/// tabs. Returns (start, end, token); None when the next non-blank byte is
/// not an identifier start.
fn next_word(line: &str, from: usize) -> Option<(usize, usize, &str)> {
    let bytes = line.as_bytes();
    let mut i = from;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    if i >= bytes.len() || !(bytes[i].is_ascii_alphabetic() || bytes[i] == b'_') {
        return None;
    }
    let start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    Some((start, i, &line[start..i]))
}

fn sort_symbols(symbols: &mut [ParsedSymbol]) {
    symbols.sort_by_key(|s| (s.range.start.line, s.range.start.character));
    for symbol in symbols {
        sort_symbols(&mut symbol.children);
    }
}

fn offset_symbol(symbol: &mut ParsedSymbol, offset: Position) {
    symbol.range = apply_fragment_offset_range(symbol.range, offset);
    symbol.selection_range = apply_fragment_offset_range(symbol.selection_range, offset);
    for child in &mut symbol.children {
        offset_symbol(child, offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_vbs(content: &str) -> Vec<ParsedSymbol> {
        VbScriptParser::new().parse(content, "file:///test.vbs")
    }

    #[test]
    fn test_public_function() {
        let symbols = parse_vbs("Public Function AddNumbers(a, b)\n    AddNumbers = a + b\nEnd Function\n");
        assert_eq!(symbols.len(), 1);
        let sym = &symbols[0];
        assert_eq!(sym.name, "AddNumbers");
        assert_eq!(sym.kind, SymbolKind::Function);
        assert_eq!(sym.range.start, Position::new(0, 0));
        assert_eq!(sym.range.end.line, 2);
        assert_eq!(sym.selection_range.start, Position::new(0, 16));
        assert_eq!(sym.selection_range.end, Position::new(0, 26));
    }

    #[test]
    fn test_sub_reports_as_function_kind() {
        let symbols = parse_vbs("Sub DoWork()\nEnd Sub");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].kind, SymbolKind::Function);
        assert_eq!(symbols[0].name, "DoWork");
    }

    #[test]
    fn test_class_with_member() {
        let symbols =
            parse_vbs("Class Calculator\n  Public Sub Add(v)\n    m_R = m_R + v\n  End Sub\nEnd Class\n");
        assert_eq!(symbols.len(), 1);
        let class = &symbols[0];
        assert_eq!(class.name, "Calculator");
        assert_eq!(class.kind, SymbolKind::Class);
        assert_eq!(class.range.start.line, 0);
        assert_eq!(class.range.end.line, 4);
        assert_eq!(class.children.len(), 1);
        let add = &class.children[0];
        assert_eq!(add.name, "Add");
        assert_eq!(add.kind, SymbolKind::Function);
        assert_eq!(add.range.start.line, 1);
        assert_eq!(add.range.end.line, 3);
    }

    #[test]
    fn test_property_accessors() {
        let content = "Class C\n\
                       Public Property Get Value()\nEnd Property\n\
                       Public Property Let Value(v)\nEnd Property\n\
                       Private Property Set Obj(o)\nEnd Property\n\
                       End Class";
        let symbols = parse_vbs(content);
        let class = &symbols[0];
        assert_eq!(class.children.len(), 3);
        assert!(class.children.iter().all(|c| c.kind == SymbolKind::Property));
        assert_eq!(class.children[0].name, "Value");
        assert_eq!(class.children[2].name, "Obj");
    }

    #[test]
    fn test_case_insensitive_keywords() {
        let symbols = parse_vbs("FUNCTION Shout()\nend function\nfUnCtIoN Mixed()\nEND FUNCTION");
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "Shout");
        assert_eq!(symbols[1].name, "Mixed");
    }

    #[test]
    fn test_opener_in_comment_ignored() {
        let symbols = parse_vbs("' Function NotReal()\nFunction Real()\nEnd Function");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "Real");
    }

    #[test]
    fn test_rem_comment_ignored() {
        let symbols = parse_vbs("REM Function NotReal()\nSub Real()\nEnd Sub");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "Real");
    }

    #[test]
    fn test_unclosed_function_extends_to_eof() {
        let symbols = parse_vbs("Function Dangling()\n    x = 1\n    y = 2");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].range.end, Position::new(2, 9));
    }

    #[test]
    fn test_unclosed_class_extends_to_eof() {
        let symbols = parse_vbs("Class Open\n  Sub Inner()\n  End Sub");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].children.len(), 1);
        assert_eq!(symbols[0].range.end.line, 2);
    }

    #[test]
    fn test_duplicate_names_preserved() {
        let symbols = parse_vbs("Function Foo()\nEnd Function\nFunction Foo()\nEnd Function");
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "Foo");
        assert_eq!(symbols[1].name, "Foo");
    }

    #[test]
    fn test_opener_inside_leaf_belongs_to_file() {
        // Nested callables are invalid VBScript; tolerantly they surface at
        // file level rather than as children of the enclosing leaf.
        let symbols = parse_vbs("Function Outer()\nFunction Inner()\nEnd Function\nEnd Function");
        assert_eq!(symbols.len(), 2);
        let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Outer", "Inner"]);
        assert!(symbols.iter().all(|s| s.children.is_empty()));
    }

    #[test]
    fn test_end_class_closes_dangling_member() {
        let symbols = parse_vbs("Class C\n  Sub Leaky()\nEnd Class");
        assert_eq!(symbols.len(), 1);
        let class = &symbols[0];
        assert_eq!(class.range.end.line, 2);
        assert_eq!(class.children.len(), 1);
        assert_eq!(class.children[0].range.end.line, 2);
    }

    #[test]
    fn test_selection_range_is_name_token() {
        let symbols = parse_vbs("  Private Sub  Handle_Click(sender)\nEnd Sub");
        let sym = &symbols[0];
        let line = "  Private Sub  Handle_Click(sender)";
        let start = sym.selection_range.start.character as usize;
        let end = sym.selection_range.end.character as usize;
        assert_eq!(&line[start..end], "Handle_Click");
    }

    #[test]
    fn test_args_spanning_lines() {
        let symbols = parse_vbs("Function Wide(a, _\n    b, c)\n    Wide = a\nEnd Function");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "Wide");
        assert_eq!(symbols[0].range.end.line, 3);
    }

    #[test]
    fn test_asp_fragment_offset_applied() {
        let content = "<%@ Language=\"VBScript\" %>\n<html><%\nFunction Greet()\nEnd Function\n%></html>";
        let symbols = VbScriptParser::new().parse(content, "file:///page.asp");
        assert_eq!(symbols.len(), 1);
        let greet = &symbols[0];
        assert_eq!(greet.name, "Greet");
        assert_eq!(greet.selection_range.start, Position::new(2, 9));
        assert_eq!(greet.selection_range.end, Position::new(2, 14));
    }

    #[test]
    fn test_asp_inline_expression_yields_no_symbols() {
        let content = "<p><%= Greet() %></p>";
        let symbols = VbScriptParser::new().parse(content, "file:///page.asp");
        assert!(symbols.is_empty());
    }

    #[test]
    fn test_asp_symbol_on_block_first_line_gets_column_offset() {
        let content = "<html><%Function Inline()\nEnd Function%></html>";
        let symbols = VbScriptParser::new().parse(content, "file:///page.asp");
        assert_eq!(symbols.len(), 1);
        // Content starts at column 8; "Function " is 9 more bytes.
        assert_eq!(symbols[0].selection_range.start, Position::new(0, 17));
    }

    #[test]
    fn test_asp_parse_matches_line_preserving_plain_vbscript() {
        // Extracting fragments and applying offsets lands symbols on the same
        // lines as parsing the equivalent pure VBScript directly.
        let asp = "<html><%\nFunction A()\nEnd Function\n%></html>";
        let equivalent = "\nFunction A()\nEnd Function\n";

        let parser = VbScriptParser::new();
        let from_asp = parser.parse(asp, "file:///p.asp");
        let from_plain = parser.parse_fragment(equivalent, Position::new(0, 0));

        assert_eq!(from_asp.len(), from_plain.len());
        assert_eq!(from_asp[0].range, from_plain[0].range);
        assert_eq!(from_asp[0].selection_range, from_plain[0].selection_range);
    }

    #[test]
    fn test_inc_file_parses_as_plain_vbscript() {
        let symbols = VbScriptParser::new().parse("Function Helper()\nEnd Function", "file:///lib.inc");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "Helper");
    }

    #[test]
    fn test_recasing_preserves_structure() {
        let lower = parse_vbs("function foo()\nend function\nclass bar\nend class");
        let upper = parse_vbs("FUNCTION FOO()\nEND FUNCTION\nCLASS BAR\nEND CLASS");
        let shape = |symbols: &[ParsedSymbol]| {
            symbols
                .iter()
                .map(|s| (s.kind, s.range))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&lower), shape(&upper));
        assert_eq!(upper[0].name, "FOO");
    }
}
