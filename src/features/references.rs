//! Find references, workspace-wide.

use lsp_types::{Location, Uri};

use crate::core::document::DocumentManager;
use crate::core::position::{from_wire_position, to_wire_range};
use crate::features::word_at_position;

/// Provides find-references.
///
/// Unlike go-to-definition, results are not scoped by the include graph: the
/// query asks "where is this name used?", and for refactoring that answer
/// must be exhaustive across the workspace.
pub struct ReferencesProvider;

impl ReferencesProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn provide(
        &self,
        uri: &Uri,
        position: lsp_types::Position,
        include_declaration: bool,
        document_manager: &DocumentManager,
    ) -> Option<Vec<Location>> {
        let text = document_manager.get_text(uri)?;
        let pos = from_wire_position(text, position);
        let (word, _) = word_at_position(text, pos)?;

        let references = document_manager
            .reference_tracker()
            .find_references(&word, include_declaration);

        Some(
            references
                .into_iter()
                .map(|reference| {
                    let range = match document_manager.get_text(&reference.uri) {
                        Some(text) => to_wire_range(text, reference.range),
                        None => lsp_types::Range {
                            start: lsp_types::Position::new(
                                reference.range.start.line,
                                reference.range.start.character,
                            ),
                            end: lsp_types::Position::new(
                                reference.range.end.line,
                                reference.range.end.character,
                            ),
                        },
                    };
                    Location {
                        uri: reference.uri,
                        range,
                    }
                })
                .collect(),
        )
    }
}

impl Default for ReferencesProvider {
    fn default() -> Self {
        Self::new()
    }
}
