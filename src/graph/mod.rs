//! Symbol graph for inspection runs
//!
//! The graph holds every analyzable entity (module, file, type, member,
//! local, statement) plus two edge kinds: ownership, which forms a tree and
//! drives suppression scoping, and references, which global tools and the
//! usage search walk. The graph is built once per run by a
//! [`ReferenceGraphBuilder`](builder::ReferenceGraphBuilder) and dropped at
//! run end.

mod builder;

pub use builder::{MemoryGraphBuilder, PathScope, ReferenceGraphBuilder, ScopeProvider};

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Opaque identity of one entity. Stable for the lifetime of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub fn new(raw: u64) -> Self {
        EntityId(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// What kind of symbol an entity is.
///
/// The ownership tree nests in this order: a module owns files, a file owns
/// containers, a container owns members, a member owns locals and statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Module,
    File,
    Container,
    Member,
    Local,
    Statement,
}

/// An analyzable program symbol.
///
/// Equality and hashing go by identity, not by content: two lookups of the
/// same symbol always compare equal even if properties were annotated in
/// between.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    /// File the entity lives in. `None` for modules.
    pub file: Option<PathBuf>,
    pub line_start: Option<u32>,
    pub line_end: Option<u32>,
    /// Cleared when the underlying symbol disappears mid-run.
    pub valid: bool,
    /// Free-form metadata: suppression attributes, annotations, metrics.
    pub properties: HashMap<String, serde_json::Value>,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            file: None,
            line_start: None,
            line_end: None,
            valid: true,
            properties: HashMap::new(),
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_lines(mut self, start: u32, end: u32) -> Self {
        self.line_start = Some(start);
        self.line_end = Some(end);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity {}

impl std::hash::Hash for Entity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Edge kinds in the symbol graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Owner → owned. These edges form a tree.
    Owns,
    /// Referrer → referenced symbol.
    References,
}

/// The whole-program symbol graph for one run.
#[derive(Debug, Default)]
pub struct SymbolGraph {
    graph: StableDiGraph<Entity, EdgeKind>,
    index: FxHashMap<EntityId, NodeIndex>,
    next_id: u64,
    /// Named constants a suppression attribute may reference.
    constants: FxHashMap<String, String>,
}

impl SymbolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity built by the caller. Allocates and returns its id.
    pub fn insert(&mut self, kind: EntityKind, name: impl Into<String>) -> EntityId {
        self.insert_entity(|id| Entity::new(id, kind, name))
    }

    /// Insert an entity produced by `make`, which receives the allocated id.
    pub fn insert_entity(&mut self, make: impl FnOnce(EntityId) -> Entity) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        let entity = make(id);
        debug_assert_eq!(entity.id, id);
        let node = self.graph.add_node(entity);
        self.index.insert(id, node);
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.index.get(&id).map(|n| &self.graph[*n])
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.index.get(&id).map(|n| &mut self.graph[*n])
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Make `owner` own `owned`. An entity has at most one owner.
    pub fn set_owner(&mut self, owner: EntityId, owned: EntityId) {
        let (Some(&from), Some(&to)) = (self.index.get(&owner), self.index.get(&owned)) else {
            return;
        };
        debug_assert!(self.owner(owned).is_none(), "entity already has an owner");
        self.graph.add_edge(from, to, EdgeKind::Owns);
    }

    pub fn add_reference(&mut self, from: EntityId, to: EntityId) {
        let (Some(&f), Some(&t)) = (self.index.get(&from), self.index.get(&to)) else {
            return;
        };
        self.graph.add_edge(f, t, EdgeKind::References);
    }

    /// The owning entity, if any.
    pub fn owner(&self, id: EntityId) -> Option<EntityId> {
        let node = *self.index.get(&id)?;
        self.graph
            .edges_directed(node, Direction::Incoming)
            .find(|e| *e.weight() == EdgeKind::Owns)
            .map(|e| self.graph[e.source()].id)
    }

    /// Owner chain starting at `id` itself, walking outward to the root.
    pub fn owner_chain(&self, id: EntityId) -> Vec<EntityId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            if self.entity(c).is_none() {
                break;
            }
            chain.push(c);
            current = self.owner(c);
        }
        chain
    }

    /// Entities directly owned by `id`, in insertion order.
    pub fn owned(&self, id: EntityId) -> Vec<EntityId> {
        let Some(&node) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut ids: Vec<EntityId> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .filter(|e| *e.weight() == EdgeKind::Owns)
            .map(|e| self.graph[e.target()].id)
            .collect();
        // Edge iteration is newest-first; ids are allocation-ordered.
        ids.sort();
        ids
    }

    /// Entities referencing `id`, in insertion order.
    pub fn references_to(&self, id: EntityId) -> Vec<EntityId> {
        let Some(&node) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut ids: Vec<EntityId> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .filter(|e| *e.weight() == EdgeKind::References)
            .map(|e| self.graph[e.source()].id)
            .collect();
        ids.sort();
        ids
    }

    /// All file entities, in insertion order.
    pub fn files(&self) -> Vec<EntityId> {
        let mut files: Vec<&Entity> = self
            .graph
            .node_weights()
            .filter(|e| e.kind == EntityKind::File)
            .collect();
        files.sort_by_key(|e| e.id);
        files.iter().map(|e| e.id).collect()
    }

    /// All entities in the subtree owned by `root`, depth-first, `root` excluded.
    pub fn subtree(&self, root: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack = self.owned(root);
        stack.reverse();
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut children = self.owned(id);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.graph.node_weights()
    }

    pub fn define_constant(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.constants.insert(name.into(), value.into());
    }

    pub fn resolve_constant(&self, name: &str) -> Option<&str> {
        self.constants.get(name).map(|s| s.as_str())
    }

    /// File entity for a path, if present.
    pub fn file_by_path(&self, path: &Path) -> Option<EntityId> {
        self.graph
            .node_weights()
            .find(|e| e.kind == EntityKind::File && e.file.as_deref() == Some(path))
            .map(|e| e.id)
    }

    /// Mark an entity invalid; it stays in the graph but tools skip it.
    pub fn invalidate(&mut self, id: EntityId) {
        if let Some(e) = self.entity_mut(id) {
            e.valid = false;
        }
    }
}
