//! Quick-fix aggregation.
//!
//! When a host requests fixes for several entities at once, distinct fix
//! instances that share an implementation type collapse into one grouped
//! action with a merged label.

use std::any::TypeId;
use std::sync::Arc;

use crate::graph::{EntityId, SymbolGraph};
use crate::models::{fix_type_id, FixKey, QuickFix};

/// Label used when a group's fixes do not share a family name.
pub const GENERIC_FIX_LABEL: &str = "Apply similar fixes";

/// One batch action: every collected fix of a single implementation type.
pub struct GroupedFix {
    pub label: String,
    /// Fix instances with the entity each applies to.
    pub targets: Vec<(EntityId, Arc<dyn QuickFix>)>,
}

impl GroupedFix {
    /// Apply every fix in the group. Stops at the first failure.
    pub fn apply_all(&self, graph: &SymbolGraph) -> anyhow::Result<usize> {
        let mut applied = 0;
        for (entity_id, fix) in &self.targets {
            let Some(entity) = graph.entity(*entity_id) else {
                continue;
            };
            if !entity.valid {
                continue;
            }
            fix.apply(entity)?;
            applied += 1;
        }
        Ok(applied)
    }
}

impl std::fmt::Debug for GroupedFix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupedFix")
            .field("label", &self.label)
            .field("targets", &self.targets.len())
            .finish()
    }
}

/// Group `(entity, fix)` pairs by fix implementation type.
///
/// Groups keep first-seen order. The label is the family name when every
/// instance agrees on one, the instance's own name for singleton groups,
/// and a generic label otherwise.
pub fn group_fixes(pairs: Vec<(EntityId, Arc<dyn QuickFix>)>) -> Vec<GroupedFix> {
    let mut order: Vec<TypeId> = Vec::new();
    let mut groups: rustc_hash::FxHashMap<TypeId, Vec<(EntityId, Arc<dyn QuickFix>)>> =
        rustc_hash::FxHashMap::default();
    let mut seen: rustc_hash::FxHashSet<(EntityId, FixKey)> = rustc_hash::FxHashSet::default();

    for (entity, fix) in pairs {
        if !seen.insert((entity, FixKey::of(&fix))) {
            continue;
        }
        let type_id = fix_type_id(fix.as_ref());
        if !groups.contains_key(&type_id) {
            order.push(type_id);
        }
        groups.entry(type_id).or_default().push((entity, fix));
    }

    order
        .into_iter()
        .map(|type_id| {
            let targets = groups.remove(&type_id).expect("group exists");
            GroupedFix {
                label: merged_label(&targets),
                targets,
            }
        })
        .collect()
}

fn merged_label(targets: &[(EntityId, Arc<dyn QuickFix>)]) -> String {
    if targets.len() == 1 {
        return targets[0].1.name();
    }
    let mut family: Option<String> = None;
    for (_, fix) in targets {
        match fix.family_name() {
            Some(name) => match &family {
                Some(existing) if *existing == name => {}
                Some(_) => return GENERIC_FIX_LABEL.to_string(),
                None => family = Some(name),
            },
            None => return GENERIC_FIX_LABEL.to_string(),
        }
    }
    family.unwrap_or_else(|| GENERIC_FIX_LABEL.to_string())
}
