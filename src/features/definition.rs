//! Go-to-definition, scoped along include-reachable files.

use lsp_types::{GotoDefinitionResponse, Location, Uri};

use crate::analysis::symbol_index::IndexedSymbol;
use crate::core::document::DocumentManager;
use crate::core::position::{from_wire_position, to_wire_range};
use crate::features::word_at_position;

/// Provides go-to-definition.
///
/// VBScript binding follows include order, so the search is scoped: first the
/// origin document, then the files it transitively includes. A definition in
/// an unrelated file does not win.
pub struct DefinitionProvider;

impl DefinitionProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn provide(
        &self,
        uri: &Uri,
        position: lsp_types::Position,
        document_manager: &DocumentManager,
    ) -> Option<GotoDefinitionResponse> {
        let text = document_manager.get_text(uri)?;
        let pos = from_wire_position(text, position);
        let (word, _) = word_at_position(text, pos)?;

        let index = document_manager.symbol_index();
        let mut definitions = index.find_definitions_in_scope(&word, std::slice::from_ref(uri));
        if definitions.is_empty() {
            let scope = document_manager.include_graph().transitive_includes(uri);
            definitions = index.find_definitions_in_scope(&word, &scope);
        }
        if definitions.is_empty() {
            return None;
        }

        let locations: Vec<Location> = definitions
            .iter()
            .map(|symbol| self.to_location(symbol, document_manager))
            .collect();

        Some(if locations.len() == 1 {
            GotoDefinitionResponse::Scalar(locations.into_iter().next().expect("one location"))
        } else {
            GotoDefinitionResponse::Array(locations)
        })
    }

    fn to_location(&self, symbol: &IndexedSymbol, document_manager: &DocumentManager) -> Location {
        // Wire conversion needs the target document's text; indexed documents
        // always have it stored.
        let range = match document_manager.get_text(&symbol.uri) {
            Some(text) => to_wire_range(text, symbol.range),
            None => lsp_types::Range {
                start: lsp_types::Position::new(symbol.range.start.line, symbol.range.start.character),
                end: lsp_types::Position::new(symbol.range.end.line, symbol.range.end.character),
            },
        };
        Location {
            uri: symbol.uri.clone(),
            range,
        }
    }
}

impl Default for DefinitionProvider {
    fn default() -> Self {
        Self::new()
    }
}
