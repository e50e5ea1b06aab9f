//! Document symbols (outline view).

use lsp_types::{DocumentSymbol, Uri};

use crate::analysis::parser::{ParsedSymbol, SymbolKind, VbScriptParser};
use crate::core::document::DocumentManager;
use crate::core::position::to_wire_range;

/// Provides hierarchical document symbols for VBScript/ASP sources.
pub struct SymbolsProvider {
    parser: VbScriptParser,
}

impl SymbolsProvider {
    pub fn new() -> Self {
        Self {
            parser: VbScriptParser::new(),
        }
    }

    /// Build the outline for a document: the parsed declaration tree plus one
    /// File-kind entry per include directive. Returns None for unknown
    /// documents.
    pub fn provide(
        &self,
        uri: &Uri,
        document_manager: &DocumentManager,
    ) -> Option<Vec<DocumentSymbol>> {
        let text = document_manager.get_text(uri)?;
        let parsed = self.parser.parse(text, uri.as_str());

        let mut symbols: Vec<DocumentSymbol> = parsed
            .iter()
            .map(|symbol| to_document_symbol(symbol, text))
            .collect();

        for directive in document_manager.include_graph().include_directives(uri) {
            #[allow(deprecated)]
            symbols.push(DocumentSymbol {
                name: directive.raw_path.clone(),
                detail: Some("include".to_string()),
                kind: SymbolKind::File.to_lsp(),
                tags: None,
                deprecated: None,
                range: to_wire_range(text, directive.range),
                selection_range: to_wire_range(text, directive.range),
                children: None,
            });
        }

        symbols.sort_by_key(|s| (s.range.start.line, s.range.start.character));
        Some(symbols)
    }
}

impl Default for SymbolsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(deprecated)]
fn to_document_symbol(symbol: &ParsedSymbol, text: &str) -> DocumentSymbol {
    let children: Vec<DocumentSymbol> = symbol
        .children
        .iter()
        .map(|child| to_document_symbol(child, text))
        .collect();

    DocumentSymbol {
        name: symbol.name.clone(),
        detail: None,
        kind: symbol.kind.to_lsp(),
        tags: None,
        deprecated: None,
        range: to_wire_range(text, symbol.range),
        selection_range: to_wire_range(text, symbol.selection_range),
        children: if children.is_empty() {
            None
        } else {
            Some(children)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use lsp_types::{DidOpenTextDocumentParams, TextDocumentItem};
    use std::str::FromStr;

    fn open(manager: &mut DocumentManager, path: &str, text: &str) -> Uri {
        let uri = Uri::from_str(&format!("file://{path}")).unwrap();
        manager.open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "vbscript".to_string(),
                version: 1,
                text: text.to_string(),
            },
        });
        uri
    }

    #[test]
    fn test_function_symbol_shape() {
        let mut manager = DocumentManager::new(ServerConfig::for_tests("/ws"));
        let uri = open(
            &mut manager,
            "/ws/utils.vbs",
            "Public Function AddNumbers(a, b)\n    AddNumbers = a + b\nEnd Function\n",
        );

        let symbols = SymbolsProvider::new().provide(&uri, &manager).unwrap();
        assert_eq!(symbols.len(), 1);
        let sym = &symbols[0];
        assert_eq!(sym.name, "AddNumbers");
        assert_eq!(sym.kind, lsp_types::SymbolKind::FUNCTION);
        assert_eq!(sym.range.start.line, 0);
        assert_eq!(sym.range.end.line, 2);
        assert_eq!(sym.selection_range.start.character, 16);
        assert_eq!(sym.selection_range.end.character, 26);
    }

    #[test]
    fn test_class_children_nested() {
        let mut manager = DocumentManager::new(ServerConfig::for_tests("/ws"));
        let uri = open(
            &mut manager,
            "/ws/classes.vbs",
            "Class Calculator\n  Public Sub Add(v)\n    m_R = m_R + v\n  End Sub\nEnd Class\n",
        );

        let symbols = SymbolsProvider::new().provide(&uri, &manager).unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "Calculator");
        let children = symbols[0].children.as_ref().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "Add");
        assert_eq!(children[0].kind, lsp_types::SymbolKind::FUNCTION);
    }

    #[test]
    fn test_asp_fragment_offsets_in_outline() {
        let mut manager = DocumentManager::new(ServerConfig::for_tests("/ws"));
        let uri = open(
            &mut manager,
            "/ws/page.asp",
            "<%@ Language=\"VBScript\" %>\n<html><%\nFunction Greet()\nEnd Function\n%></html>",
        );

        let symbols = SymbolsProvider::new().provide(&uri, &manager).unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "Greet");
        assert_eq!(symbols[0].selection_range.start.line, 2);
    }

    #[test]
    fn test_include_directive_listed_as_file_symbol() {
        let mut manager = DocumentManager::new(ServerConfig::for_tests("/ws"));
        let uri = open(
            &mut manager,
            "/ws/page.asp",
            "<!--#include file=\"lib.inc\"-->\n<% Sub S()\nEnd Sub %>",
        );

        let symbols = SymbolsProvider::new().provide(&uri, &manager).unwrap();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "lib.inc");
        assert_eq!(symbols[0].kind, lsp_types::SymbolKind::FILE);
        assert_eq!(symbols[1].name, "S");
    }

    #[test]
    fn test_unknown_document_returns_none() {
        let manager = DocumentManager::new(ServerConfig::for_tests("/ws"));
        let uri = Uri::from_str("file:///ws/absent.vbs").unwrap();
        assert!(SymbolsProvider::new().provide(&uri, &manager).is_none());
    }
}
