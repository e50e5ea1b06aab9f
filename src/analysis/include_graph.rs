//! Include graph over ASP/VBScript files.
//!
//! Directed graph of `#include` relationships with forward and reverse
//! adjacency, kept symmetric on every update. Go-to-definition walks forward
//! edges to scope its search; the reverse index answers "who includes this
//! file". All directives, valid or not, are retained per source URI so the
//! document outline can surface them.

use std::collections::HashMap;
use std::collections::HashSet;

use lsp_types::Uri;
use tracing::warn;

use crate::analysis::includes::IncludeDirective;

/// An include relationship between two files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeEdge {
    pub source_uri: Uri,
    pub target_uri: Uri,
    pub directive: IncludeDirective,
}

/// Tracks include relationships between files.
#[derive(Debug, Default)]
pub struct IncludeGraph {
    /// Forward edges: source URI → outgoing edges.
    edges: HashMap<Uri, Vec<IncludeEdge>>,
    /// Reverse edges: target URI → including URIs.
    reverse: HashMap<Uri, Vec<Uri>>,
    /// Every directive seen per source, including invalid ones.
    directives: HashMap<Uri, Vec<IncludeDirective>>,
}

impl IncludeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the include edges originating from `uri`. Returns the URIs
    /// whose reachable set may have changed, which the caller uses to trigger
    /// lazy loading of newly referenced targets.
    pub fn update(&mut self, uri: &Uri, directives: Vec<IncludeDirective>) -> Vec<Uri> {
        let mut affected = vec![uri.clone()];

        self.remove_edges_from(uri);

        let mut edges = Vec::new();
        for directive in &directives {
            let Some(target) = directive.resolved_uri.clone().filter(|_| directive.is_valid) else {
                continue;
            };

            let reverse = self.reverse.entry(target.clone()).or_default();
            if !reverse.contains(uri) {
                reverse.push(uri.clone());
            }
            if !affected.contains(&target) {
                affected.push(target.clone());
            }
            edges.push(IncludeEdge {
                source_uri: uri.clone(),
                target_uri: target,
                directive: directive.clone(),
            });
        }

        if !edges.is_empty() {
            self.edges.insert(uri.clone(), edges);
        }
        self.directives.insert(uri.clone(), directives);

        affected
    }

    /// Drop a file from the graph: its forward edges, the matching reverse
    /// entries, and its entry as an include target.
    pub fn remove(&mut self, uri: &Uri) -> Vec<Uri> {
        if !self.edges.contains_key(uri) && !self.directives.contains_key(uri) {
            return Vec::new();
        }

        let mut affected = vec![uri.clone()];
        if let Some(edges) = self.edges.get(uri) {
            for edge in edges {
                if !affected.contains(&edge.target_uri) {
                    affected.push(edge.target_uri.clone());
                }
            }
        }

        self.remove_edges_from(uri);
        self.directives.remove(uri);
        self.reverse.remove(uri);

        affected
    }

    /// URIs directly included by `uri`.
    pub fn direct_includes(&self, uri: &Uri) -> Vec<Uri> {
        self.edges
            .get(uri)
            .map(|edges| edges.iter().map(|e| e.target_uri.clone()).collect())
            .unwrap_or_default()
    }

    /// URIs that directly include `uri`.
    pub fn includers(&self, uri: &Uri) -> Vec<Uri> {
        self.reverse.get(uri).cloned().unwrap_or_default()
    }

    /// Every directive recorded for `uri`, invalid ones included.
    pub fn include_directives(&self, uri: &Uri) -> Vec<IncludeDirective> {
        self.directives.get(uri).cloned().unwrap_or_default()
    }

    /// All URIs reachable from `uri` over forward edges, in discovery order,
    /// excluding `uri` itself. Cycles are skipped with a warning; the walk
    /// always terminates.
    pub fn transitive_includes(&self, uri: &Uri) -> Vec<Uri> {
        let mut result = Vec::new();
        let mut visited: HashSet<Uri> = HashSet::from([uri.clone()]);
        let mut pending = self.direct_includes(uri);
        pending.reverse();

        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                warn!(uri = current.as_str(), "circular include skipped");
                continue;
            }
            result.push(current.clone());
            let mut next = self.direct_includes(&current);
            next.reverse();
            pending.append(&mut next);
        }

        result
    }

    /// Whether a cycle is reachable from `uri` (gray/black DFS).
    pub fn has_cycle(&self, uri: &Uri) -> bool {
        let mut path = HashSet::new();
        let mut visited = HashSet::new();
        self.cycle_dfs(uri, &mut path, &mut visited)
    }

    fn cycle_dfs(
        &self,
        uri: &Uri,
        path: &mut HashSet<Uri>,
        visited: &mut HashSet<Uri>,
    ) -> bool {
        if path.contains(uri) {
            warn!(uri = uri.as_str(), "circular include detected");
            return true;
        }
        if visited.contains(uri) {
            return false;
        }
        path.insert(uri.clone());
        visited.insert(uri.clone());

        for target in self.direct_includes(uri) {
            if self.cycle_dfs(&target, path, visited) {
                return true;
            }
        }

        path.remove(uri);
        false
    }

    fn remove_edges_from(&mut self, uri: &Uri) {
        let Some(edges) = self.edges.remove(uri) else {
            return;
        };
        for edge in edges {
            if let Some(sources) = self.reverse.get_mut(&edge.target_uri) {
                sources.retain(|source| source != uri);
                if sources.is_empty() {
                    self.reverse.remove(&edge.target_uri);
                }
            }
        }
    }
}
