//! Document management.
//!
//! [`DocumentManager`] owns every piece of analysis state: the open-document
//! cache, the symbol index, the reference tracker and the include graph. All
//! of it lives on the single dispatcher thread; updates are applied
//! atomically per document before the next message is handled.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams, Uri,
};
use tracing::{debug, info, warn};

use crate::analysis::include_graph::IncludeGraph;
use crate::analysis::includes::{path_to_uri, uri_to_path, IncludeDirectiveParser};
use crate::analysis::parser::VbScriptParser;
use crate::analysis::reference_tracker::ReferenceTracker;
use crate::analysis::symbol_index::SymbolIndex;
use crate::analysis::workspace::{collect_source_files, read_source_file};
use crate::config::ServerConfig;

/// A document known to the client, with its latest full text.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub version: i32,
}

impl Document {
    /// Create a test document with minimal setup
    #[allow(dead_code)]
    pub fn new_test(text: String, version: i32) -> Self {
        Self { text, version }
    }
}

/// Manages open documents and all derived analysis state.
#[derive(Debug)]
pub struct DocumentManager {
    documents: HashMap<Uri, Document>,
    symbol_index: SymbolIndex,
    reference_tracker: ReferenceTracker,
    include_graph: IncludeGraph,
    parser: VbScriptParser,
    include_parser: IncludeDirectiveParser,
    config: ServerConfig,
    /// Documents discovered by the workspace scan or loaded as include
    /// targets. These survive `didClose` so cross-file queries keep working.
    discovered: HashSet<Uri>,
    analysis_complete: bool,
}

impl DocumentManager {
    pub fn new(config: ServerConfig) -> Self {
        let include_parser = IncludeDirectiveParser::new(Some(config.workspace_root.clone()));
        Self {
            documents: HashMap::new(),
            symbol_index: SymbolIndex::new(),
            reference_tracker: ReferenceTracker::new(),
            include_graph: IncludeGraph::new(),
            parser: VbScriptParser::new(),
            include_parser,
            config,
            discovered: HashSet::new(),
            analysis_complete: false,
        }
    }

    pub fn symbol_index(&self) -> &SymbolIndex {
        &self.symbol_index
    }

    pub fn reference_tracker(&self) -> &ReferenceTracker {
        &self.reference_tracker
    }

    pub fn include_graph(&self) -> &IncludeGraph {
        &self.include_graph
    }

    pub fn workspace_root(&self) -> &Path {
        &self.config.workspace_root
    }

    pub fn analysis_complete(&self) -> bool {
        self.analysis_complete
    }

    pub fn get(&self, uri: &Uri) -> Option<&Document> {
        self.documents.get(uri)
    }

    /// Latest known text for a document: the client's copy when open,
    /// otherwise whatever the scan or lazy loading indexed.
    pub fn get_text(&self, uri: &Uri) -> Option<&str> {
        self.documents
            .get(uri)
            .map(|doc| doc.text.as_str())
            .or_else(|| self.symbol_index.get_document_content(uri))
    }

    pub fn open(&mut self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!(uri = uri.as_str(), "didOpen");
        let text = params.text_document.text;
        self.documents.insert(
            uri.clone(),
            Document {
                text: text.clone(),
                version: params.text_document.version,
            },
        );
        self.index_document(&uri, &text);
    }

    /// Full-document sync: the last change event carries the new text.
    pub fn change(&mut self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        debug!(uri = uri.as_str(), "didChange");
        self.documents.insert(
            uri.clone(),
            Document {
                text: change.text.clone(),
                version: params.text_document.version,
            },
        );
        self.index_document(&uri, &change.text);
    }

    /// Close drops the client's copy. Scan-discovered documents stay indexed
    /// for cross-file queries; documents the client introduced are evicted
    /// entirely.
    pub fn close(&mut self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!(uri = uri.as_str(), "didClose");
        self.documents.remove(&uri);
        if !self.discovered.contains(&uri) {
            self.symbol_index.remove(&uri);
            self.reference_tracker.remove(&uri);
            self.include_graph.remove(&uri);
        }
    }

    /// The shared indexing pipeline: parse symbols, refresh both indexes,
    /// refresh include edges, then lazily load any newly referenced targets.
    pub fn index_document(&mut self, uri: &Uri, content: &str) {
        let symbols = self.parser.parse(content, uri.as_str());
        self.symbol_index.update(uri, content, &symbols);
        self.reference_tracker.update(uri, content, &symbols);

        let directives = self.include_parser.extract_includes(content, uri);
        let affected = self.include_graph.update(uri, directives);
        for target in affected {
            if &target != uri {
                self.ensure_include_loaded(&target);
            }
        }
    }

    /// Read and index an include target the client never opened. Only files
    /// inside the workspace root are eligible; a target already in the index
    /// is left alone, which also terminates include cycles.
    fn ensure_include_loaded(&mut self, uri: &Uri) {
        if self.symbol_index.contains(uri) {
            return;
        }
        let Some(path) = uri_to_path(uri) else {
            return;
        };
        if !path.starts_with(&self.config.workspace_root) {
            debug!(uri = uri.as_str(), "include target outside workspace root");
            return;
        }
        match read_source_file(&path, self.config.encoding) {
            Ok(content) => {
                debug!(uri = uri.as_str(), "lazily loading include target");
                self.discovered.insert(uri.clone());
                self.index_document(uri, &content);
            }
            Err(err) => {
                warn!(uri = uri.as_str(), error = %err, "failed to load include target");
            }
        }
    }

    /// Initial synchronous scan. Runs before the message loop; every source
    /// file goes through the same pipeline as a client `didOpen`.
    pub fn scan_workspace(&mut self) {
        let root = self.config.workspace_root.clone();
        info!(root = %root.display(), "workspace scan started");

        let mut count = 0usize;
        for path in collect_source_files(&root) {
            debug!(path = %path.display(), "scanning");
            match read_source_file(&path, self.config.encoding) {
                Ok(content) => {
                    let uri = path_to_uri(&path);
                    self.discovered.insert(uri.clone());
                    self.index_document(&uri, &content);
                    count += 1;
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable file");
                }
            }
        }

        self.analysis_complete = true;
        info!("Found {count} source files");
        if count > self.config.file_warn_threshold {
            warn!(
                count,
                threshold = self.config.file_warn_threshold,
                "workspace exceeds the recommended file count"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::str::FromStr;

    fn make_uri(path: &str) -> Uri {
        Uri::from_str(&format!("file://{path}")).unwrap()
    }

    fn open_params(uri: &Uri, text: &str) -> DidOpenTextDocumentParams {
        DidOpenTextDocumentParams {
            text_document: lsp_types::TextDocumentItem {
                uri: uri.clone(),
                language_id: "vbscript".to_string(),
                version: 1,
                text: text.to_string(),
            },
        }
    }

    fn close_params(uri: &Uri) -> DidCloseTextDocumentParams {
        DidCloseTextDocumentParams {
            text_document: lsp_types::TextDocumentIdentifier { uri: uri.clone() },
        }
    }

    fn manager() -> DocumentManager {
        DocumentManager::new(ServerConfig::for_tests("/workspace"))
    }

    #[test]
    fn test_open_indexes_symbols() {
        let mut manager = manager();
        let uri = make_uri("/workspace/test.vbs");
        manager.open(open_params(&uri, "Function TestFunc()\nEnd Function"));

        assert_eq!(manager.symbol_index().find_definitions("TestFunc").len(), 1);
        assert_eq!(manager.get(&uri).unwrap().version, 1);
    }

    #[test]
    fn test_change_replaces_index_entries() {
        let mut manager = manager();
        let uri = make_uri("/workspace/test.vbs");
        manager.open(open_params(&uri, "Function OldFunc()\nEnd Function"));

        manager.change(DidChangeTextDocumentParams {
            text_document: lsp_types::VersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version: 2,
            },
            content_changes: vec![lsp_types::TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: "Function NewFunc()\nEnd Function".to_string(),
            }],
        });

        assert!(manager.symbol_index().find_definitions("OldFunc").is_empty());
        assert_eq!(manager.symbol_index().find_definitions("NewFunc").len(), 1);
        assert_eq!(manager.get(&uri).unwrap().version, 2);
    }

    #[test]
    fn test_close_evicts_client_only_documents() {
        let mut manager = manager();
        let uri = make_uri("/workspace/test.vbs");
        manager.open(open_params(&uri, "Function F()\nEnd Function"));
        manager.close(close_params(&uri));

        assert!(manager.get(&uri).is_none());
        assert!(manager.symbol_index().find_definitions("F").is_empty());
        assert!(manager.get_text(&uri).is_none());
    }

    #[test]
    fn test_close_keeps_scanned_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lib.vbs"), "Function Keep()\nEnd Function").unwrap();

        let mut manager =
            DocumentManager::new(ServerConfig::for_tests(dir.path().to_path_buf()));
        manager.scan_workspace();
        assert!(manager.analysis_complete());
        assert_eq!(manager.symbol_index().find_definitions("Keep").len(), 1);

        let uri = crate::analysis::includes::path_to_uri(&dir.path().join("lib.vbs"));
        manager.open(open_params(&uri, "Function Keep()\nEnd Function"));
        manager.close(close_params(&uri));

        // Still indexed after close: the scan discovered it.
        assert_eq!(manager.symbol_index().find_definitions("Keep").len(), 1);
    }

    #[test]
    fn test_include_edge_triggers_lazy_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("lib.inc"),
            "Function Helper()\nEnd Function",
        )
        .unwrap();

        let mut manager =
            DocumentManager::new(ServerConfig::for_tests(dir.path().to_path_buf()));
        let a_uri = crate::analysis::includes::path_to_uri(&dir.path().join("a.asp"));
        manager.open(open_params(
            &a_uri,
            "<!--#include file=\"lib.inc\"-->\n<% x = Helper() %>",
        ));

        let defs = manager.symbol_index().find_definitions("Helper");
        assert_eq!(defs.len(), 1);
        assert!(defs[0].uri.as_str().ends_with("lib.inc"));
    }

    #[test]
    fn test_missing_include_target_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager =
            DocumentManager::new(ServerConfig::for_tests(dir.path().to_path_buf()));
        let a_uri = crate::analysis::includes::path_to_uri(&dir.path().join("a.asp"));

        manager.open(open_params(&a_uri, "<!--#include file=\"gone.inc\"-->"));

        // The edge exists; the target simply is not indexed.
        assert_eq!(manager.include_graph().direct_includes(&a_uri).len(), 1);
    }

    #[test]
    fn test_include_cycle_terminates_lazy_loading() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.asp"),
            "<!--#include file=\"b.asp\"-->\n<% Function FromA()\nEnd Function %>",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.asp"),
            "<!--#include file=\"a.asp\"-->\n<% Function FromB()\nEnd Function %>",
        )
        .unwrap();

        let mut manager =
            DocumentManager::new(ServerConfig::for_tests(dir.path().to_path_buf()));
        manager.scan_workspace();

        assert_eq!(manager.symbol_index().find_definitions("FromA").len(), 1);
        assert_eq!(manager.symbol_index().find_definitions("FromB").len(), 1);
        let a_uri = crate::analysis::includes::path_to_uri(&dir.path().join("a.asp"));
        assert!(manager.include_graph().has_cycle(&a_uri));
    }

    #[test]
    fn test_scan_counts_and_completes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.vbs"), "Sub A()\nEnd Sub").unwrap();
        fs::write(dir.path().join("two.asp"), "<% Sub B()\nEnd Sub %>").unwrap();
        fs::write(dir.path().join("skip.txt"), "not code").unwrap();

        let mut manager =
            DocumentManager::new(ServerConfig::for_tests(dir.path().to_path_buf()));
        assert!(!manager.analysis_complete());
        manager.scan_workspace();

        assert!(manager.analysis_complete());
        assert_eq!(manager.symbol_index().find_definitions("A").len(), 1);
        assert_eq!(manager.symbol_index().find_definitions("B").len(), 1);
    }

    #[test]
    fn test_get_text_prefers_open_document() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("f.vbs"), "Function Disk()\nEnd Function").unwrap();

        let mut manager =
            DocumentManager::new(ServerConfig::for_tests(dir.path().to_path_buf()));
        manager.scan_workspace();

        let uri = crate::analysis::includes::path_to_uri(&dir.path().join("f.vbs"));
        assert!(manager.get_text(&uri).unwrap().contains("Disk"));

        manager.open(open_params(&uri, "Function Client()\nEnd Function"));
        assert!(manager.get_text(&uri).unwrap().contains("Client"));
    }
}
