//! Scrutiny - orchestration core for a pluggable code-inspection engine
//!
//! Runs a configurable set of analysis tools over a program's symbol graph,
//! tracks per-symbol findings across runs, resolves source-level
//! suppression directives, and resolves tool severity/enablement through an
//! inheritable configuration profile.
//!
//! Detection logic, result rendering, and persistence formats live in the
//! hosting application; this crate owns scheduling, storage, suppression,
//! and run-to-run comparison.

pub mod graph;
pub mod ledger;
pub mod models;
pub mod orchestrator;
pub mod profile;
pub mod suppression;
pub mod tools;

pub use graph::{
    Entity, EntityId, EntityKind, MemoryGraphBuilder, PathScope, ReferenceGraphBuilder,
    ScopeProvider, SymbolGraph,
};
pub use ledger::{FindingStatus, GroupedFix, LedgerWriter, ProblemLedger, Snapshot};
pub use models::{Location, ProblemDescriptor, QuickFix, Severity, ToolIdentity};
pub use orchestrator::{
    CancelFlag, GraphSearchService, Orchestrator, PendingSearchRequest, Phase, QueryKind,
    RunError, RunOutcome, SearchQueue, SearchService, UsageProcessor,
};
pub use profile::{profile_from_toml, Profile, ProfileHandle, ToolState};
pub use suppression::SuppressionResolver;
pub use tools::{
    GlobalTool, LocalTool, RunSummary, SourceProvider, ToolFactory, ToolInstance, ToolKind,
    ToolOutcome, ToolRegistry, UsageSearch,
};
