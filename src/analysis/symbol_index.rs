//! Workspace-wide symbol index.
//!
//! Flat records of every declaration, stored twice: by document URI in
//! insertion order, and by case-folded name for VBScript's case-insensitive
//! lookup. Document text is retained so cross-file queries can run against
//! files the client never opened.

use std::collections::HashMap;

use lsp_types::Uri;

use crate::analysis::parser::{ParsedSymbol, SymbolKind};
use crate::core::position::{casefold, Range};

/// A declaration flattened out of the parse tree for fast lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedSymbol {
    /// Original casing as written.
    pub name: String,
    pub kind: SymbolKind,
    pub uri: Uri,
    /// Full declaration range.
    pub range: Range,
    /// The name token range.
    pub selection_range: Range,
    /// Enclosing class name, if any.
    pub container_name: Option<String>,
}

/// Index of symbol definitions across the workspace.
///
/// The two maps are kept consistent: a record appears in `by_uri[u]` exactly
/// when it appears in `by_name[casefold(name)]` with `uri == u`. Updates
/// replace a document's records atomically.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    by_uri: HashMap<Uri, Vec<IndexedSymbol>>,
    by_name: HashMap<String, Vec<IndexedSymbol>>,
    content: HashMap<Uri, String>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all records for `uri` with the flattened `symbols`.
    pub fn update(&mut self, uri: &Uri, content: &str, symbols: &[ParsedSymbol]) {
        self.remove(uri);

        let mut indexed = Vec::new();
        flatten(uri, symbols, None, &mut indexed);

        for symbol in &indexed {
            self.by_name
                .entry(casefold(&symbol.name))
                .or_default()
                .push(symbol.clone());
        }
        self.by_uri.insert(uri.clone(), indexed);
        self.content.insert(uri.clone(), content.to_string());
    }

    /// Drop all records and stored content for `uri`.
    pub fn remove(&mut self, uri: &Uri) {
        self.content.remove(uri);
        let Some(symbols) = self.by_uri.remove(uri) else {
            return;
        };
        for symbol in symbols {
            let key = casefold(&symbol.name);
            if let Some(entries) = self.by_name.get_mut(&key) {
                entries.retain(|s| &s.uri != uri);
                if entries.is_empty() {
                    self.by_name.remove(&key);
                }
            }
        }
    }

    /// All definitions matching `name`, case-insensitively, in insertion
    /// order.
    pub fn find_definitions(&self, name: &str) -> Vec<&IndexedSymbol> {
        self.by_name
            .get(&casefold(name))
            .map(|entries| entries.iter().collect())
            .unwrap_or_default()
    }

    /// Definitions of `name` restricted to the given URIs, in `scope` order.
    /// Used by go-to-definition to honor include reachability.
    pub fn find_definitions_in_scope<'a>(
        &'a self,
        name: &str,
        scope: &[Uri],
    ) -> Vec<&'a IndexedSymbol> {
        let Some(entries) = self.by_name.get(&casefold(name)) else {
            return Vec::new();
        };
        scope
            .iter()
            .flat_map(|uri| entries.iter().filter(move |s| &s.uri == uri))
            .collect()
    }

    /// Whether any document is indexed under `uri`.
    pub fn contains(&self, uri: &Uri) -> bool {
        self.content.contains_key(uri)
    }

    pub fn get_document_content(&self, uri: &Uri) -> Option<&str> {
        self.content.get(uri).map(String::as_str)
    }

    /// Flat records for one document, insertion-ordered.
    pub fn symbols_in_document(&self, uri: &Uri) -> &[IndexedSymbol] {
        self.by_uri.get(uri).map(Vec::as_slice).unwrap_or_default()
    }
}

fn flatten(
    uri: &Uri,
    symbols: &[ParsedSymbol],
    container_name: Option<&str>,
    out: &mut Vec<IndexedSymbol>,
) {
    for symbol in symbols {
        out.push(IndexedSymbol {
            name: symbol.name.clone(),
            kind: symbol.kind,
            uri: uri.clone(),
            range: symbol.range,
            selection_range: symbol.selection_range,
            container_name: container_name.map(str::to_string),
        });
        if !symbol.children.is_empty() {
            flatten(uri, &symbol.children, Some(&symbol.name), out);
        }
    }
}
