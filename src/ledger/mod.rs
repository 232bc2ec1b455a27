//! Problem ledger
//!
//! Per-tool storage of findings for one run. Each tool gets a partition
//! holding the active records, the records a user dismissed ("ignored",
//! retained for diffing), a reverse descriptor→entity index, and the
//! per-entity quick-fix sets. Partitions live in a concurrent map and their
//! interior state moves under one mutex, so parallel per-file analysis can
//! record findings safely while the maps stay mutually consistent.
//!
//! Tools never touch the ledger directly; they get a [`LedgerWriter`] scoped
//! to their own partition.

mod diff;
mod fixes;

pub use diff::{FindingStatus, Snapshot, SnapshotPartition};
pub use fixes::{group_fixes, GroupedFix, GENERIC_FIX_LABEL};

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::graph::EntityId;
use crate::models::{
    finding_fingerprint, DescriptorKey, FixKey, ProblemDescriptor, QuickFix,
};

/// Decides whether a partition accepts a descriptor. Hosts plug in a
/// strategy to split filtering tools from descriptor-providing ones without
/// subclassing the ledger.
pub type ClassificationFn = Arc<dyn Fn(&str, &ProblemDescriptor) -> bool + Send + Sync>;

#[derive(Default)]
struct PartitionInner {
    active: FxHashMap<EntityId, Vec<Arc<ProblemDescriptor>>>,
    ignored: FxHashMap<EntityId, Vec<Arc<ProblemDescriptor>>>,
    /// Exactly one entry per stored descriptor, active or ignored.
    reverse: FxHashMap<DescriptorKey, EntityId>,
    /// Aggregated fix instances per entity, by fix identity, insertion order.
    fix_sets: FxHashMap<EntityId, Vec<Arc<dyn QuickFix>>>,
    /// Descriptors removed one-by-one while the entity was still active.
    dismissed: FxHashMap<EntityId, Vec<Arc<ProblemDescriptor>>>,
    failure: Option<String>,
}

#[derive(Default)]
struct Partition {
    inner: Mutex<PartitionInner>,
}

/// Findings storage for one run.
pub struct ProblemLedger {
    partitions: DashMap<String, Partition>,
    baseline: Option<Snapshot>,
    frozen: AtomicBool,
    accept: Option<ClassificationFn>,
}

impl Default for ProblemLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ProblemLedger {
    pub fn new() -> Self {
        Self {
            partitions: DashMap::new(),
            baseline: None,
            frozen: AtomicBool::new(false),
            accept: None,
        }
    }

    /// Attach the previous run's snapshot; enables status classification.
    pub fn with_baseline(mut self, baseline: Snapshot) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Install a descriptor acceptance strategy.
    pub fn with_classifier(mut self, accept: ClassificationFn) -> Self {
        self.accept = Some(accept);
        self
    }

    /// Writer scoped to one tool's partition.
    pub fn writer<'a>(&'a self, tool_id: &str) -> LedgerWriter<'a> {
        LedgerWriter {
            ledger: self,
            tool_id: tool_id.to_string(),
        }
    }

    /// Stop accepting new findings. Dismissal stays available to hosts.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    pub fn baseline(&self) -> Option<&Snapshot> {
        self.baseline.as_ref()
    }

    fn with_inner<R>(&self, tool_id: &str, f: impl FnOnce(&mut PartitionInner) -> R) -> R {
        let partition = self.partitions.entry(tool_id.to_string()).or_default();
        let mut inner = partition.inner.lock().expect("partition lock");
        f(&mut inner)
    }

    fn read_inner<R>(&self, tool_id: &str, f: impl FnOnce(&PartitionInner) -> R) -> Option<R> {
        let partition = self.partitions.get(tool_id)?;
        let inner = partition.inner.lock().expect("partition lock");
        Some(f(&inner))
    }

    /// Append findings to an entity's active record. Concatenation, never
    /// dedup: recording the same template twice stores it twice.
    pub fn record(
        &self,
        tool_id: &str,
        entity: EntityId,
        descriptors: Vec<ProblemDescriptor>,
    ) -> Vec<Arc<ProblemDescriptor>> {
        if self.is_frozen() {
            warn!("ledger is frozen; dropping {} findings of {}", descriptors.len(), tool_id);
            return Vec::new();
        }
        let accepted: Vec<Arc<ProblemDescriptor>> = descriptors
            .into_iter()
            .filter(|d| match &self.accept {
                Some(accept) => accept(tool_id, d),
                None => true,
            })
            .map(Arc::new)
            .collect();
        if accepted.is_empty() {
            return accepted;
        }

        self.with_inner(tool_id, |inner| {
            let record = inner.active.entry(entity).or_default();
            for descriptor in &accepted {
                record.push(Arc::clone(descriptor));
                inner.reverse.insert(DescriptorKey::of(descriptor), entity);
                let fix_set = inner.fix_sets.entry(entity).or_default();
                for fix in descriptor.fixes() {
                    let key = FixKey::of(fix);
                    if !fix_set.iter().any(|f| FixKey::of(f) == key) {
                        fix_set.push(Arc::clone(fix));
                    }
                }
            }
        });
        accepted
    }

    /// The entity's active findings, in recording order.
    pub fn problems(&self, tool_id: &str, entity: EntityId) -> Vec<Arc<ProblemDescriptor>> {
        self.read_inner(tool_id, |inner| {
            inner.active.get(&entity).cloned().unwrap_or_default()
        })
        .unwrap_or_default()
    }

    /// The entity's ignored findings, if the entity was dismissed aside.
    pub fn ignored_problems(&self, tool_id: &str, entity: EntityId) -> Vec<Arc<ProblemDescriptor>> {
        self.read_inner(tool_id, |inner| {
            inner.ignored.get(&entity).cloned().unwrap_or_default()
        })
        .unwrap_or_default()
    }

    pub fn active_entities(&self, tool_id: &str) -> Vec<EntityId> {
        let mut ids = self
            .read_inner(tool_id, |inner| inner.active.keys().copied().collect::<Vec<_>>())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn ignored_entities(&self, tool_id: &str) -> Vec<EntityId> {
        let mut ids = self
            .read_inner(tool_id, |inner| inner.ignored.keys().copied().collect::<Vec<_>>())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// The entity's aggregated fix set, by fix identity, insertion order.
    pub fn fix_set(&self, tool_id: &str, entity: EntityId) -> Vec<Arc<dyn QuickFix>> {
        self.read_inner(tool_id, |inner| {
            inner.fix_sets.get(&entity).cloned().unwrap_or_default()
        })
        .unwrap_or_default()
    }

    /// Drop an entity's findings entirely: active record, fix set, and the
    /// reverse-index entries of its former descriptors.
    pub fn dismiss(&self, tool_id: &str, entity: EntityId) {
        self.with_inner(tool_id, |inner| {
            if let Some(descriptors) = inner.active.remove(&entity) {
                for d in &descriptors {
                    inner.reverse.remove(&DescriptorKey::of(d));
                }
            }
            if let Some(buffered) = inner.dismissed.remove(&entity) {
                for d in &buffered {
                    inner.reverse.remove(&DescriptorKey::of(d));
                }
            }
            inner.fix_sets.remove(&entity);
        });
    }

    /// Move an entity's record aside, retaining it for diffing.
    pub fn dismiss_to_ignored(&self, tool_id: &str, entity: EntityId) {
        self.with_inner(tool_id, |inner| {
            let mut moved = inner.dismissed.remove(&entity).unwrap_or_default();
            if let Some(active) = inner.active.remove(&entity) {
                moved.extend(active);
            }
            if moved.is_empty() {
                return;
            }
            inner.fix_sets.remove(&entity);
            inner.ignored.entry(entity).or_default().extend(moved);
        });
    }

    /// Restore an entity's ignored record to the active map, rebuilding its
    /// fix set.
    pub fn un_dismiss(&self, tool_id: &str, entity: EntityId) {
        self.with_inner(tool_id, |inner| {
            let Some(restored) = inner.ignored.remove(&entity) else {
                return;
            };
            let fix_set = inner.fix_sets.entry(entity).or_default();
            for descriptor in &restored {
                for fix in descriptor.fixes() {
                    let key = FixKey::of(fix);
                    if !fix_set.iter().any(|f| FixKey::of(f) == key) {
                        fix_set.push(Arc::clone(fix));
                    }
                }
            }
            inner.active.entry(entity).or_default().extend(restored);
        });
    }

    /// Remove one finding from an entity's active record.
    ///
    /// A fix instance stays in the entity's fix set while any remaining
    /// descriptor references it, so dismissing one finding never disables a
    /// sibling that shares the fix. When the record empties, the entity and
    /// its dismissed findings move to the ignored map.
    ///
    /// Returns false when the descriptor is not in the entity's record.
    pub fn dismiss_single_problem(
        &self,
        tool_id: &str,
        entity: EntityId,
        descriptor: &Arc<ProblemDescriptor>,
    ) -> bool {
        self.with_inner(tool_id, |inner| {
            let Some(record) = inner.active.get_mut(&entity) else {
                return false;
            };
            let Some(pos) = record.iter().position(|d| Arc::ptr_eq(d, descriptor)) else {
                return false;
            };
            let removed = record.remove(pos);

            // Drop fixes no remaining descriptor references.
            if let Some(fix_set) = inner.fix_sets.get_mut(&entity) {
                let remaining = inner.active.get(&entity).cloned().unwrap_or_default();
                fix_set.retain(|fix| {
                    let key = FixKey::of(fix);
                    remaining
                        .iter()
                        .any(|d| d.fixes().iter().any(|f| FixKey::of(f) == key))
                });
            }

            // The descriptor stays retained for diffing, so its reverse
            // entry stays too; dismiss() purges both.
            inner.dismissed.entry(entity).or_default().push(Arc::clone(&removed));

            let emptied = inner
                .active
                .get(&entity)
                .map(|r| r.is_empty())
                .unwrap_or(false);
            if emptied {
                inner.active.remove(&entity);
                inner.fix_sets.remove(&entity);
                let buffered = inner.dismissed.remove(&entity).unwrap_or_default();
                inner.ignored.entry(entity).or_default().extend(buffered);
            }
            true
        })
    }

    /// Attach a failure note to a tool's results.
    pub fn record_failure(&self, tool_id: &str, note: impl Into<String>) {
        let note = note.into();
        self.with_inner(tool_id, |inner| {
            inner.failure = Some(note);
        });
    }

    pub fn failure_note(&self, tool_id: &str) -> Option<String> {
        self.read_inner(tool_id, |inner| inner.failure.clone()).flatten()
    }

    /// Entity status against the baseline. `None` without diff mode or when
    /// the entity appears in neither run.
    pub fn entity_status(&self, tool_id: &str, entity: EntityId) -> Option<FindingStatus> {
        let baseline = self.baseline.as_ref()?;
        let current = self
            .read_inner(tool_id, |inner| {
                inner.active.contains_key(&entity) || inner.ignored.contains_key(&entity)
            })
            .unwrap_or(false);
        let prior = baseline.contains_entity(tool_id, entity);
        match (current, prior) {
            (true, true) => Some(FindingStatus::Unchanged),
            (true, false) => Some(FindingStatus::Added),
            (false, true) => Some(FindingStatus::Deleted),
            (false, false) => None,
        }
    }

    /// Descriptor status against the baseline, by (entity, template text).
    pub fn descriptor_status(
        &self,
        tool_id: &str,
        descriptor: &Arc<ProblemDescriptor>,
    ) -> Option<FindingStatus> {
        let baseline = self.baseline.as_ref()?;
        let key = DescriptorKey::of(descriptor);
        let owner = self
            .read_inner(tool_id, |inner| inner.reverse.get(&key).copied())
            .flatten();
        match owner {
            Some(entity) => {
                let fp = finding_fingerprint(entity, descriptor.template());
                if baseline.contains_fingerprint(tool_id, fp) {
                    Some(FindingStatus::Unchanged)
                } else {
                    Some(FindingStatus::Added)
                }
            }
            None => {
                // Not stored this run; a baseline match means it went away.
                let entity = descriptor.location()?.entity;
                let fp = finding_fingerprint(entity, descriptor.template());
                baseline
                    .contains_fingerprint(tool_id, fp)
                    .then_some(FindingStatus::Deleted)
            }
        }
    }

    /// Baseline entities with no record in the current run.
    pub fn deleted_entities(&self, tool_id: &str) -> Vec<EntityId> {
        let Some(baseline) = self.baseline.as_ref() else {
            return Vec::new();
        };
        let Some(partition) = baseline.partition(tool_id) else {
            return Vec::new();
        };
        partition
            .entities()
            .into_iter()
            .filter(|entity| {
                !self
                    .read_inner(tool_id, |inner| {
                        inner.active.contains_key(entity) || inner.ignored.contains_key(entity)
                    })
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Batch quick fixes over the entities' fix sets, grouped by fix
    /// implementation type.
    pub fn quick_fixes(&self, tool_id: &str, entities: &[EntityId]) -> Vec<GroupedFix> {
        let mut pairs = Vec::new();
        for entity in entities {
            for fix in self.fix_set(tool_id, *entity) {
                pairs.push((*entity, fix));
            }
        }
        group_fixes(pairs)
    }

    /// Independent copy of every partition's records, sharing the immutable
    /// descriptors. Later ledger mutation cannot touch it.
    pub fn snapshot(&self) -> Snapshot {
        let mut partitions = FxHashMap::default();
        for entry in self.partitions.iter() {
            let inner = entry.value().inner.lock().expect("partition lock");
            if inner.active.is_empty() && inner.ignored.is_empty() {
                continue;
            }
            partitions.insert(
                entry.key().clone(),
                SnapshotPartition::new(inner.active.clone(), inner.ignored.clone()),
            );
        }
        Snapshot::new(partitions)
    }

    /// Active findings of one tool.
    pub fn findings_count(&self, tool_id: &str) -> usize {
        self.read_inner(tool_id, |inner| {
            inner.active.values().map(Vec::len).sum::<usize>()
        })
        .unwrap_or(0)
    }

    /// Active finding counts across all partitions, by severity.
    pub fn severity_counts(&self) -> std::collections::HashMap<crate::models::Severity, usize> {
        let mut counts = std::collections::HashMap::new();
        for entry in self.partitions.iter() {
            let inner = entry.value().inner.lock().expect("partition lock");
            for descriptors in inner.active.values() {
                for d in descriptors {
                    *counts.entry(d.severity()).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// Total active findings across all partitions.
    pub fn total_findings(&self) -> usize {
        self.partitions
            .iter()
            .map(|entry| {
                let inner = entry.value().inner.lock().expect("partition lock");
                inner.active.values().map(Vec::len).sum::<usize>()
            })
            .sum()
    }

    pub fn tool_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.partitions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

/// Write access scoped to one tool's partition.
pub struct LedgerWriter<'a> {
    ledger: &'a ProblemLedger,
    tool_id: String,
}

impl LedgerWriter<'_> {
    pub fn tool_id(&self) -> &str {
        &self.tool_id
    }

    pub fn record(
        &self,
        entity: EntityId,
        descriptors: Vec<ProblemDescriptor>,
    ) -> Vec<Arc<ProblemDescriptor>> {
        self.ledger.record(&self.tool_id, entity, descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Entity;
    use crate::models::{Location, Severity};

    const TOOL: &str = "dead-code";

    fn descriptor(template: &str, entity: EntityId) -> ProblemDescriptor {
        ProblemDescriptor::simple(template, Some(Location::entity(entity)), Severity::Warning)
    }

    struct NamedFix(&'static str);

    impl QuickFix for NamedFix {
        fn name(&self) -> String {
            self.0.to_string()
        }

        fn family_name(&self) -> Option<String> {
            Some("Remove unused".to_string())
        }

        fn apply(&self, _entity: &Entity) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn descriptor_with_fixes(
        template: &str,
        entity: EntityId,
        fixes: Vec<Arc<dyn QuickFix>>,
    ) -> ProblemDescriptor {
        ProblemDescriptor::new(
            template,
            Some(Location::entity(entity)),
            Severity::Warning,
            fixes,
        )
    }

    #[test]
    fn record_concatenates_in_order() {
        let ledger = ProblemLedger::new();
        let e = EntityId::new(1);
        ledger.record(TOOL, e, vec![descriptor("first", e), descriptor("second", e)]);
        ledger.record(TOOL, e, vec![descriptor("third", e)]);

        let templates: Vec<String> = ledger
            .problems(TOOL, e)
            .iter()
            .map(|d| d.template().to_string())
            .collect();
        assert_eq!(templates, vec!["first", "second", "third"]);
    }

    #[test]
    fn record_does_not_dedup() {
        let ledger = ProblemLedger::new();
        let e = EntityId::new(1);
        ledger.record(TOOL, e, vec![descriptor("same", e)]);
        ledger.record(TOOL, e, vec![descriptor("same", e)]);
        assert_eq!(ledger.problems(TOOL, e).len(), 2);
    }

    #[test]
    fn partitions_are_per_tool() {
        let ledger = ProblemLedger::new();
        let e = EntityId::new(1);
        ledger.record("tool-a", e, vec![descriptor("x", e)]);
        assert!(ledger.problems("tool-b", e).is_empty());
    }

    #[test]
    fn dismiss_purges_record_fixes_and_index() {
        let ledger = ProblemLedger::new();
        let e = EntityId::new(1);
        let fix: Arc<dyn QuickFix> = Arc::new(NamedFix("Remove field"));
        ledger.record(
            TOOL,
            e,
            vec![descriptor_with_fixes("unused", e, vec![fix])],
        );

        let snapshot = ledger.snapshot();
        ledger.dismiss(TOOL, e);
        assert!(ledger.problems(TOOL, e).is_empty());
        assert!(ledger.fix_set(TOOL, e).is_empty());

        // The reverse index was purged: against a baseline that knows the
        // finding, the dismissed descriptor reads as gone, not as current.
        let second = ProblemLedger::new().with_baseline(snapshot);
        let stored_again = second.record(
            TOOL,
            e,
            vec![descriptor_with_fixes("unused", e, vec![Arc::new(NamedFix("Remove field"))])],
        );
        second.dismiss(TOOL, e);
        assert_eq!(
            second.descriptor_status(TOOL, &stored_again[0]),
            Some(FindingStatus::Deleted)
        );
    }

    #[test]
    fn dismiss_to_ignored_and_back() {
        let ledger = ProblemLedger::new();
        let e = EntityId::new(1);
        let fix: Arc<dyn QuickFix> = Arc::new(NamedFix("Remove field"));
        ledger.record(
            TOOL,
            e,
            vec![descriptor_with_fixes("unused", e, vec![fix])],
        );

        ledger.dismiss_to_ignored(TOOL, e);
        assert!(ledger.problems(TOOL, e).is_empty());
        assert_eq!(ledger.ignored_problems(TOOL, e).len(), 1);
        assert!(ledger.fix_set(TOOL, e).is_empty());

        ledger.un_dismiss(TOOL, e);
        assert_eq!(ledger.problems(TOOL, e).len(), 1);
        assert!(ledger.ignored_problems(TOOL, e).is_empty());
        assert_eq!(ledger.fix_set(TOOL, e).len(), 1);
    }

    #[test]
    fn dismiss_single_keeps_shared_fix() {
        let ledger = ProblemLedger::new();
        let e = EntityId::new(1);
        let shared: Arc<dyn QuickFix> = Arc::new(NamedFix("Remove both"));
        let own: Arc<dyn QuickFix> = Arc::new(NamedFix("Remove one"));

        let stored = ledger.record(
            TOOL,
            e,
            vec![
                descriptor_with_fixes("first", e, vec![Arc::clone(&shared), own]),
                descriptor_with_fixes("second", e, vec![Arc::clone(&shared)]),
            ],
        );
        assert_eq!(ledger.fix_set(TOOL, e).len(), 2);

        assert!(ledger.dismiss_single_problem(TOOL, e, &stored[0]));

        // The sibling still references the shared fix: it must survive.
        let remaining = ledger.fix_set(TOOL, e);
        assert_eq!(remaining.len(), 1);
        assert!(remaining.iter().any(|f| FixKey::of(f) == FixKey::of(&shared)));
        assert_eq!(ledger.problems(TOOL, e).len(), 1);
    }

    #[test]
    fn dismissing_last_descriptor_moves_entity_to_ignored() {
        let ledger = ProblemLedger::new();
        let e = EntityId::new(1);
        let stored = ledger.record(TOOL, e, vec![descriptor("only", e)]);

        assert!(ledger.dismiss_single_problem(TOOL, e, &stored[0]));
        assert!(ledger.problems(TOOL, e).is_empty());
        assert_eq!(ledger.ignored_problems(TOOL, e).len(), 1);
        assert_eq!(ledger.active_entities(TOOL), Vec::<EntityId>::new());
        assert_eq!(ledger.ignored_entities(TOOL), vec![e]);
    }

    #[test]
    fn dismiss_single_unknown_descriptor_is_false() {
        let ledger = ProblemLedger::new();
        let e = EntityId::new(1);
        ledger.record(TOOL, e, vec![descriptor("present", e)]);
        let foreign = Arc::new(descriptor("foreign", e));
        assert!(!ledger.dismiss_single_problem(TOOL, e, &foreign));
        assert_eq!(ledger.problems(TOOL, e).len(), 1);
    }

    #[test]
    fn frozen_ledger_rejects_new_findings() {
        let ledger = ProblemLedger::new();
        let e = EntityId::new(1);
        ledger.freeze();
        assert!(ledger.record(TOOL, e, vec![descriptor("late", e)]).is_empty());
        assert!(ledger.problems(TOOL, e).is_empty());
    }

    #[test]
    fn classifier_filters_descriptors() {
        let ledger = ProblemLedger::new().with_classifier(Arc::new(|_tool, d| {
            d.severity() >= Severity::Error
        }));
        let e = EntityId::new(1);
        ledger.record(
            TOOL,
            e,
            vec![
                ProblemDescriptor::simple("kept", Some(Location::entity(e)), Severity::Error),
                ProblemDescriptor::simple("filtered", Some(Location::entity(e)), Severity::Info),
            ],
        );
        let stored = ledger.problems(TOOL, e);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].template(), "kept");
    }

    #[test]
    fn failure_note_is_retained() {
        let ledger = ProblemLedger::new();
        ledger.record_failure(TOOL, "walker exploded");
        assert_eq!(ledger.failure_note(TOOL).as_deref(), Some("walker exploded"));
        assert_eq!(ledger.failure_note("other"), None);
    }

    #[test]
    fn status_classification_against_baseline() {
        // Run N.
        let first = ProblemLedger::new();
        let kept = EntityId::new(1);
        let fixed = EntityId::new(2);
        first.record(TOOL, kept, vec![descriptor("still here", kept)]);
        first.record(TOOL, fixed, vec![descriptor("goes away", fixed)]);
        let snapshot = first.snapshot();

        // Run N+1: `fixed` is gone, `fresh` is new, `kept` recurs with the
        // same template in a brand-new descriptor object.
        let second = ProblemLedger::new().with_baseline(snapshot);
        let fresh = EntityId::new(3);
        let kept_again = second.record(TOOL, kept, vec![descriptor("still here", kept)]);
        let added = second.record(TOOL, fresh, vec![descriptor("brand new", fresh)]);

        assert_eq!(
            second.entity_status(TOOL, kept),
            Some(FindingStatus::Unchanged)
        );
        assert_eq!(second.entity_status(TOOL, fresh), Some(FindingStatus::Added));
        assert_eq!(
            second.entity_status(TOOL, fixed),
            Some(FindingStatus::Deleted)
        );
        assert_eq!(
            second.descriptor_status(TOOL, &kept_again[0]),
            Some(FindingStatus::Unchanged)
        );
        assert_eq!(
            second.descriptor_status(TOOL, &added[0]),
            Some(FindingStatus::Added)
        );
        assert_eq!(second.deleted_entities(TOOL), vec![fixed]);
    }

    #[test]
    fn same_entity_new_template_is_added() {
        let first = ProblemLedger::new();
        let e = EntityId::new(1);
        first.record(TOOL, e, vec![descriptor("old wording", e)]);
        let snapshot = first.snapshot();

        let second = ProblemLedger::new().with_baseline(snapshot);
        let stored = second.record(TOOL, e, vec![descriptor("new wording", e)]);
        assert_eq!(
            second.descriptor_status(TOOL, &stored[0]),
            Some(FindingStatus::Added)
        );
    }

    #[test]
    fn status_is_none_without_baseline() {
        let ledger = ProblemLedger::new();
        let e = EntityId::new(1);
        let stored = ledger.record(TOOL, e, vec![descriptor("x", e)]);
        assert_eq!(ledger.entity_status(TOOL, e), None);
        assert_eq!(ledger.descriptor_status(TOOL, &stored[0]), None);
    }

    #[test]
    fn snapshot_is_immune_to_later_mutation() {
        let ledger = ProblemLedger::new();
        let e = EntityId::new(1);
        ledger.record(TOOL, e, vec![descriptor("x", e)]);
        let snapshot = ledger.snapshot();

        ledger.dismiss(TOOL, e);
        assert!(snapshot.contains_entity(TOOL, e));
    }

    #[test]
    fn quick_fixes_group_across_entities() {
        let ledger = ProblemLedger::new();
        let e1 = EntityId::new(1);
        let e2 = EntityId::new(2);
        let f1: Arc<dyn QuickFix> = Arc::new(NamedFix("Remove a"));
        let f2: Arc<dyn QuickFix> = Arc::new(NamedFix("Remove b"));
        ledger.record(TOOL, e1, vec![descriptor_with_fixes("a", e1, vec![f1])]);
        ledger.record(TOOL, e2, vec![descriptor_with_fixes("b", e2, vec![f2])]);

        let groups = ledger.quick_fixes(TOOL, &[e1, e2]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, "Remove unused");
        assert_eq!(groups[0].targets.len(), 2);
    }

    #[test]
    fn writer_is_scoped_to_its_tool() {
        let ledger = ProblemLedger::new();
        let e = EntityId::new(1);
        let writer = ledger.writer("tool-a");
        writer.record(e, vec![descriptor("x", e)]);

        assert_eq!(ledger.problems("tool-a", e).len(), 1);
        assert!(ledger.problems("tool-b", e).is_empty());
        assert_eq!(writer.tool_id(), "tool-a");
    }
}
