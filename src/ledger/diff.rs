//! Run-to-run finding comparison.
//!
//! A [`Snapshot`] retains the previous run's records while diff mode is on.
//! Classification compares (owning entity, description template) — never
//! descriptor object identity, since every run recreates its descriptors.

use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

use crate::graph::EntityId;
use crate::models::{finding_fingerprint, ProblemDescriptor};

/// Status of a finding relative to the previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingStatus {
    Added,
    Deleted,
    Unchanged,
}

/// One tool's retained records.
#[derive(Debug, Default, Clone)]
pub struct SnapshotPartition {
    pub active: FxHashMap<EntityId, Vec<Arc<ProblemDescriptor>>>,
    pub ignored: FxHashMap<EntityId, Vec<Arc<ProblemDescriptor>>>,
    fingerprints: FxHashSet<u64>,
}

impl SnapshotPartition {
    pub fn new(
        active: FxHashMap<EntityId, Vec<Arc<ProblemDescriptor>>>,
        ignored: FxHashMap<EntityId, Vec<Arc<ProblemDescriptor>>>,
    ) -> Self {
        let mut fingerprints = FxHashSet::default();
        for (entity, descriptors) in active.iter().chain(ignored.iter()) {
            for d in descriptors {
                fingerprints.insert(finding_fingerprint(*entity, d.template()));
            }
        }
        Self {
            active,
            ignored,
            fingerprints,
        }
    }

    pub fn contains_entity(&self, entity: EntityId) -> bool {
        self.active.contains_key(&entity) || self.ignored.contains_key(&entity)
    }

    pub fn contains_fingerprint(&self, fingerprint: u64) -> bool {
        self.fingerprints.contains(&fingerprint)
    }

    pub fn entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.active.keys().chain(self.ignored.keys()).copied().collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// A previous run's ledger contents, for diffing the current run against.
///
/// Holds independent map copies over the same immutable descriptors, so
/// later mutation of the live ledger cannot corrupt it.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    partitions: FxHashMap<String, SnapshotPartition>,
}

impl Snapshot {
    pub fn new(partitions: FxHashMap<String, SnapshotPartition>) -> Self {
        Self { partitions }
    }

    pub fn partition(&self, tool_id: &str) -> Option<&SnapshotPartition> {
        self.partitions.get(tool_id)
    }

    pub fn contains_entity(&self, tool_id: &str, entity: EntityId) -> bool {
        self.partition(tool_id)
            .map(|p| p.contains_entity(entity))
            .unwrap_or(false)
    }

    pub fn contains_fingerprint(&self, tool_id: &str, fingerprint: u64) -> bool {
        self.partition(tool_id)
            .map(|p| p.contains_fingerprint(fingerprint))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn tool_ids(&self) -> Vec<&str> {
        self.partitions.keys().map(|k| k.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn descriptor(template: &str) -> Arc<ProblemDescriptor> {
        Arc::new(ProblemDescriptor::simple(template, None, Severity::Warning))
    }

    #[test]
    fn fingerprints_cover_active_and_ignored() {
        let e1 = EntityId::new(1);
        let e2 = EntityId::new(2);
        let mut active = FxHashMap::default();
        active.insert(e1, vec![descriptor("unused field")]);
        let mut ignored = FxHashMap::default();
        ignored.insert(e2, vec![descriptor("never called")]);

        let partition = SnapshotPartition::new(active, ignored);
        assert!(partition.contains_fingerprint(finding_fingerprint(e1, "unused field")));
        assert!(partition.contains_fingerprint(finding_fingerprint(e2, "never called")));
        assert!(!partition.contains_fingerprint(finding_fingerprint(e1, "never called")));
        assert!(partition.contains_entity(e2));
    }

    #[test]
    fn recreated_descriptor_matches_by_template() {
        let e = EntityId::new(9);
        let mut active = FxHashMap::default();
        active.insert(e, vec![descriptor("unused field")]);
        let partition = SnapshotPartition::new(active, FxHashMap::default());

        // A different descriptor object with the same template and entity
        // fingerprints identically.
        let recreated = descriptor("unused field");
        assert!(partition.contains_fingerprint(finding_fingerprint(e, recreated.template())));
    }

    #[test]
    fn snapshot_partition_lookup() {
        let e = EntityId::new(1);
        let mut active = FxHashMap::default();
        active.insert(e, vec![descriptor("x")]);
        let mut partitions = FxHashMap::default();
        partitions.insert("dead-code".to_string(), SnapshotPartition::new(active, FxHashMap::default()));
        let snapshot = Snapshot::new(partitions);

        assert!(snapshot.contains_entity("dead-code", e));
        assert!(!snapshot.contains_entity("magic-number", e));
        assert!(!snapshot.is_empty());
    }
}
