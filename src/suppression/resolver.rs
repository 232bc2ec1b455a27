//! Suppression resolution.
//!
//! Resolution is ordered and first-match-wins:
//!
//! 1. a suppression comment immediately preceding the nearest enclosing
//!    statement;
//! 2. a suppression attribute on the nearest enclosing local declaration;
//! 3. walking outward over enclosing members and container types, at each
//!    level checking the structured doc-tag list and the attribute value
//!    (innermost match wins);
//! 4. otherwise not suppressed.
//!
//! Malformed id lists and unresolvable constant references are anomalies,
//! not errors: they match nothing and resolution continues outward.
//!
//! One resolver instance serves both the engine's per-symbol filtering and
//! on-demand queries from hosts, so the two can never disagree.

use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::model::{id_list_matches, split_id_list, ATTR_KEY, TAG_KEY};
use super::parser::{parse_file, FileDirectives};
use crate::graph::{Entity, EntityId, EntityKind, SymbolGraph};
use crate::tools::SourceProvider;

pub struct SuppressionResolver<'g> {
    graph: &'g SymbolGraph,
    source: Arc<dyn SourceProvider>,
    cache: DashMap<PathBuf, Arc<FileDirectives>>,
}

impl<'g> SuppressionResolver<'g> {
    pub fn new(graph: &'g SymbolGraph, source: Arc<dyn SourceProvider>) -> Self {
        Self {
            graph,
            source,
            cache: DashMap::new(),
        }
    }

    /// Whether findings of `tool_id` at `entity` are suppressed.
    pub fn is_suppressed(&self, tool_id: &str, entity: EntityId) -> bool {
        if self.graph.entity(entity).is_none() {
            return false;
        }
        let chain = self.graph.owner_chain(entity);

        // 1. Comment before the nearest enclosing statement.
        if let Some(stmt) = self.first_of_kind(&chain, EntityKind::Statement) {
            if self.statement_comment_matches(tool_id, stmt) {
                return true;
            }
        }

        // 2. Attribute on the nearest enclosing local declaration.
        if let Some(local) = self.first_of_kind(&chain, EntityKind::Local) {
            if self.attribute_matches(tool_id, local.property(ATTR_KEY)) {
                return true;
            }
        }

        // 3. Members, then containers, innermost first.
        for id in &chain {
            let Some(e) = self.graph.entity(*id) else {
                continue;
            };
            if !matches!(e.kind, EntityKind::Member | EntityKind::Container) {
                continue;
            }
            if self.tag_list_matches(tool_id, e.property(TAG_KEY))
                || self.attribute_matches(tool_id, e.property(ATTR_KEY))
            {
                return true;
            }
        }

        false
    }

    fn first_of_kind(&self, chain: &[EntityId], kind: EntityKind) -> Option<&Entity> {
        chain
            .iter()
            .filter_map(|id| self.graph.entity(*id))
            .find(|e| e.kind == kind)
    }

    fn statement_comment_matches(&self, tool_id: &str, stmt: &Entity) -> bool {
        let (Some(file), Some(line)) = (stmt.file.as_deref(), stmt.line_start) else {
            return false;
        };
        let directives = self.directives_for(file.to_path_buf());
        directives
            .preceding(line)
            .map(|d| d.matches(tool_id))
            .unwrap_or(false)
    }

    fn directives_for(&self, path: PathBuf) -> Arc<FileDirectives> {
        if let Some(hit) = self.cache.get(&path) {
            return Arc::clone(&hit);
        }
        let parsed = match self.source.content(&path) {
            Some(text) => Arc::new(parse_file(&text)),
            None => Arc::new(FileDirectives::default()),
        };
        self.cache.insert(path, Arc::clone(&parsed));
        parsed
    }

    /// Match an attribute value: a literal id list, an array of literals, or
    /// a `{"const": "NAME"}` reference into the graph's constant table.
    fn attribute_matches(&self, tool_id: &str, value: Option<&serde_json::Value>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match value {
            serde_json::Value::String(text) => id_list_matches(&split_id_list(text), tool_id),
            serde_json::Value::Array(items) => {
                let mut ids = Vec::new();
                for item in items {
                    match item {
                        serde_json::Value::String(text) => ids.extend(split_id_list(text)),
                        other => {
                            debug!("non-literal suppression list element: {:?}", other);
                        }
                    }
                }
                id_list_matches(&ids, tool_id)
            }
            serde_json::Value::Object(map) => match map.get("const").and_then(|v| v.as_str()) {
                Some(name) => match self.graph.resolve_constant(name) {
                    Some(text) => id_list_matches(&split_id_list(text), tool_id),
                    None => {
                        debug!("unresolvable suppression constant {:?}", name);
                        false
                    }
                },
                None => {
                    debug!("unrecognized suppression attribute object");
                    false
                }
            },
            other => {
                debug!("unrecognized suppression attribute value: {:?}", other);
                false
            }
        }
    }

    fn tag_list_matches(&self, tool_id: &str, value: Option<&serde_json::Value>) -> bool {
        let Some(serde_json::Value::Array(items)) = value else {
            if let Some(other) = value {
                debug!("unrecognized suppression tag list: {:?}", other);
            }
            return false;
        };
        items
            .iter()
            .filter_map(|v| v.as_str())
            .any(|text| id_list_matches(&split_id_list(text), tool_id))
    }
}
