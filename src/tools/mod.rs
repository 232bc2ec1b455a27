//! Tool framework: traits, registry, and source access.

mod base;
mod registry;
mod source;

pub use base::{
    GlobalTool, LocalTool, RunSummary, ToolInstance, ToolKind, ToolOutcome, UsageSearch,
};
pub use registry::{ToolFactory, ToolRegistry};
pub use source::{FsSource, MemorySource, SourceProvider};
