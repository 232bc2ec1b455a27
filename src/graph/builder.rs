//! Graph construction collaborators.
//!
//! The engine does not parse source itself; the hosting application supplies
//! a [`ReferenceGraphBuilder`] that turns the files in scope into a
//! [`SymbolGraph`]. A build failure is fatal for the run, unlike tool
//! failures which are isolated.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use super::SymbolGraph;
use crate::orchestrator::CancelFlag;

/// Enumerates the files under analysis and answers membership queries.
pub trait ScopeProvider: Send + Sync {
    /// Paths of all files in the analysis scope.
    fn files(&self) -> Vec<PathBuf>;

    /// Whether a file belongs to the scope.
    fn contains(&self, file: &Path) -> bool;
}

/// Scope over a fixed path list.
#[derive(Debug, Clone, Default)]
pub struct PathScope {
    paths: Vec<PathBuf>,
}

impl PathScope {
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl ScopeProvider for PathScope {
    fn files(&self) -> Vec<PathBuf> {
        self.paths.clone()
    }

    fn contains(&self, file: &Path) -> bool {
        self.paths.iter().any(|p| p == file)
    }
}

/// Builds the symbol graph for one run.
///
/// `resolve_references` is false when only per-file tools were selected;
/// implementations may then skip cross-file reference resolution and return
/// just the ownership tree.
pub trait ReferenceGraphBuilder: Send + Sync {
    fn build(
        &self,
        scope: &dyn ScopeProvider,
        resolve_references: bool,
        cancel: &CancelFlag,
    ) -> Result<SymbolGraph>;
}

/// Builder over a pre-assembled graph, for tests and hosts that construct
/// graphs elsewhere. Hands out the graph it was given, once.
pub struct MemoryGraphBuilder {
    graph: std::sync::Mutex<Option<SymbolGraph>>,
}

impl MemoryGraphBuilder {
    pub fn new(graph: SymbolGraph) -> Arc<Self> {
        Arc::new(Self {
            graph: std::sync::Mutex::new(Some(graph)),
        })
    }
}

impl ReferenceGraphBuilder for MemoryGraphBuilder {
    fn build(
        &self,
        _scope: &dyn ScopeProvider,
        _resolve_references: bool,
        _cancel: &CancelFlag,
    ) -> Result<SymbolGraph> {
        self.graph
            .lock()
            .expect("graph builder lock")
            .take()
            .ok_or_else(|| anyhow::anyhow!("graph already consumed by a previous run"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EntityKind;

    #[test]
    fn path_scope_membership() {
        let scope = PathScope::new(["src/a.rs", "src/b.rs"]);
        assert!(scope.contains(Path::new("src/a.rs")));
        assert!(!scope.contains(Path::new("src/c.rs")));
        assert_eq!(scope.files().len(), 2);
    }

    #[test]
    fn memory_builder_hands_out_graph_once() {
        let mut graph = SymbolGraph::new();
        graph.insert(EntityKind::File, "a.rs");
        let builder = MemoryGraphBuilder::new(graph);
        let scope = PathScope::default();
        let cancel = CancelFlag::new();

        let first = builder.build(&scope, true, &cancel);
        assert_eq!(first.expect("first build succeeds").len(), 1);

        let second = builder.build(&scope, true, &cancel);
        assert!(second.is_err());
    }
}
