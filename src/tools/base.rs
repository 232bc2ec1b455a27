//! Base tool traits and execution result types
//!
//! Tools come in two kinds. Local tools inspect one file at a time and never
//! look across files; the engine may run them in parallel over the scope.
//! Global tools run once against the whole symbol graph, serialized, and may
//! defer work into usage-search rounds through the [`UsageSearch`]
//! capability.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use crate::graph::{Entity, SymbolGraph};
use crate::ledger::LedgerWriter;
use crate::models::{ProblemDescriptor, Severity, ToolIdentity};
use crate::orchestrator::SearchQueue;

/// Which execution phase a tool belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Per-file, no cross-reference access.
    Local,
    /// Whole-graph, may annotate the reference graph and queue usage searches.
    Global,
}

/// A per-file analysis tool.
pub trait LocalTool: Send + Sync {
    fn identity(&self) -> &ToolIdentity;

    /// Inspect one file entity and return findings for its symbols.
    ///
    /// The graph parameter only exposes the file's own subtree; local tools
    /// must not depend on symbols of other files being resolved.
    fn visit(&self, file: &Entity, graph: &SymbolGraph) -> Result<Vec<ProblemDescriptor>>;
}

/// A whole-graph analysis tool.
pub trait GlobalTool: Send + Sync {
    fn identity(&self) -> &ToolIdentity;

    /// Run once against the graph, writing findings through `writer`.
    fn run(&self, graph: &SymbolGraph, writer: &LedgerWriter<'_>) -> Result<()>;

    /// Capability hook for tools that need deferred usage searches.
    fn usage_search(&self) -> Option<&dyn UsageSearch> {
        None
    }
}

/// Capability of a global tool to request usage-search rounds.
pub trait UsageSearch: Send + Sync {
    /// Queue search requests for symbols whose external usages matter.
    ///
    /// Returns true when the tool wants to be asked again after the next
    /// round completes, false when it is done queueing.
    fn query_external_usages(&self, queue: &SearchQueue) -> bool;
}

/// An instantiated tool, tagged by kind.
#[derive(Clone)]
pub enum ToolInstance {
    Local(Arc<dyn LocalTool>),
    Global(Arc<dyn GlobalTool>),
}

impl ToolInstance {
    pub fn identity(&self) -> &ToolIdentity {
        match self {
            ToolInstance::Local(t) => t.identity(),
            ToolInstance::Global(t) => t.identity(),
        }
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            ToolInstance::Local(_) => ToolKind::Local,
            ToolInstance::Global(_) => ToolKind::Global,
        }
    }
}

/// Result of running a single tool to completion.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub tool_id: String,
    pub findings: usize,
    pub duration_ms: u64,
    pub success: bool,
    /// Failure note attached to the tool's results. Never silently dropped.
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn success(tool_id: impl Into<String>, findings: usize, duration_ms: u64) -> Self {
        Self {
            tool_id: tool_id.into(),
            findings,
            duration_ms,
            success: true,
            error: None,
        }
    }

    pub fn failure(tool_id: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            tool_id: tool_id.into(),
            findings: 0,
            duration_ms,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Aggregate statistics for one run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub tools_run: usize,
    pub tools_succeeded: usize,
    pub tools_failed: usize,
    pub total_findings: usize,
    pub by_severity: HashMap<Severity, usize>,
    pub total_duration_ms: u64,
}

impl RunSummary {
    pub fn add_outcome(&mut self, outcome: &ToolOutcome) {
        self.tools_run += 1;
        self.total_duration_ms += outcome.duration_ms;
        if outcome.success {
            self.tools_succeeded += 1;
            self.total_findings += outcome.findings;
        } else {
            self.tools_failed += 1;
        }
    }

    pub fn count_severity(&mut self, severity: Severity) {
        *self.by_severity.entry(severity).or_insert(0) += 1;
    }
}
