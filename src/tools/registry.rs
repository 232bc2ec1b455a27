//! Tool registry and instantiation.
//!
//! The registry is an explicit object handed to the orchestrator, never a
//! process-wide singleton, so tests can assemble isolated tool sets. Tools
//! are created through [`ToolFactory`] implementations owned by the hosting
//! application.

use std::sync::Arc;
use tracing::debug;

use super::base::{ToolInstance, ToolKind};
use crate::models::ToolIdentity;
use crate::profile::ToolState;

/// Creates tool instances for a run.
pub trait ToolFactory: Send + Sync {
    fn identity(&self) -> &ToolIdentity;

    fn kind(&self) -> ToolKind;

    /// The tool's own declared default state, used when no profile entry
    /// exists for its key.
    fn default_state(&self) -> ToolState {
        ToolState::fallback()
    }

    /// Instantiate the tool. Called once per run for each enabled tool.
    fn create(&self) -> ToolInstance;
}

/// The set of tools known to one engine instance.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    factories: Vec<Arc<dyn ToolFactory>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, factory: Arc<dyn ToolFactory>) {
        debug!("registering tool {}", factory.identity().id);
        self.factories.push(factory);
    }

    pub fn register_all(&mut self, factories: impl IntoIterator<Item = Arc<dyn ToolFactory>>) {
        for factory in factories {
            self.register(factory);
        }
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn get(&self, tool_id: &str) -> Option<&Arc<dyn ToolFactory>> {
        self.factories.iter().find(|f| f.identity().id == tool_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ToolFactory>> {
        self.factories.iter()
    }

    /// Declared default state for a tool key, if the tool is registered.
    pub fn default_state(&self, tool_id: &str) -> Option<ToolState> {
        self.get(tool_id).map(|f| f.default_state())
    }

    pub fn tool_ids(&self) -> Vec<&str> {
        self.factories
            .iter()
            .map(|f| f.identity().id.as_str())
            .collect()
    }
}
