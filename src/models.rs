//! Core data models for Scrutiny
//!
//! These models are shared by every stage of an inspection run:
//! tool identities, finding descriptors, severities, and quick fixes.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

use crate::graph::{Entity, EntityId};

/// Severity levels for findings.
///
/// Ordered so hosts can sort results highest-first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    #[default]
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Parse a severity name, falling back to [`Severity::Warning`] for
    /// unknown or removed values. Configuration with a stale severity keeps
    /// working instead of failing the whole profile load.
    pub fn parse_lossy(value: &str) -> Severity {
        match value.trim().to_ascii_lowercase().as_str() {
            "info" => Severity::Info,
            "warning" => Severity::Warning,
            "error" => Severity::Error,
            "critical" => Severity::Critical,
            other => {
                tracing::warn!("unknown severity {:?}, using warning", other);
                Severity::Warning
            }
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Identity of an analysis tool: short id, display name, and group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolIdentity {
    /// Unique short id, e.g. `"dead-code"`. Used as the profile and ledger key.
    pub id: String,
    /// Human-readable name shown in reports.
    pub display_name: String,
    /// Group used for report sections, e.g. `"Declaration redundancy"`.
    pub group: String,
}

impl ToolIdentity {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            group: group.into(),
        }
    }
}

/// Source location of a finding: the reported symbol plus an optional line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub entity: EntityId,
    pub line_start: Option<u32>,
    pub line_end: Option<u32>,
}

impl Location {
    pub fn entity(entity: EntityId) -> Self {
        Self {
            entity,
            line_start: None,
            line_end: None,
        }
    }

    pub fn at_lines(entity: EntityId, line_start: u32, line_end: u32) -> Self {
        Self {
            entity,
            line_start: Some(line_start),
            line_end: Some(line_end),
        }
    }
}

/// A remediation action attached to a finding.
///
/// Distinct instances may share an implementation type (a "family"); the
/// ledger groups fixes by that type when offering batch application.
pub trait QuickFix: Any + Send + Sync {
    /// Action name shown for this specific fix instance.
    fn name(&self) -> String;

    /// Family name shared by all instances of this fix implementation.
    /// `None` when the implementation has no meaningful group label.
    fn family_name(&self) -> Option<String> {
        None
    }

    /// Apply the fix to the entity the owning finding was reported on.
    fn apply(&self, entity: &Entity) -> anyhow::Result<()>;
}

/// Concrete implementation type of a fix, for family grouping.
pub fn fix_type_id(fix: &dyn QuickFix) -> std::any::TypeId {
    // Upcast before asking: `type_id` on the subtrait object would name the
    // trait-object type itself, not the implementing type.
    let any: &dyn Any = fix;
    any.type_id()
}

/// Identity of one fix instance. Two `Arc` clones of the same fix share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixKey(usize);

impl FixKey {
    pub fn of(fix: &Arc<dyn QuickFix>) -> Self {
        FixKey(Arc::as_ptr(fix) as *const () as usize)
    }
}

/// One diagnostic finding: a description template, an optional location,
/// a severity, and zero or more quick fixes. Immutable once created.
#[derive(Clone)]
pub struct ProblemDescriptor {
    template: String,
    location: Option<Location>,
    severity: Severity,
    fixes: Vec<Arc<dyn QuickFix>>,
}

impl ProblemDescriptor {
    pub fn new(
        template: impl Into<String>,
        location: Option<Location>,
        severity: Severity,
        fixes: Vec<Arc<dyn QuickFix>>,
    ) -> Self {
        Self {
            template: template.into(),
            location,
            severity,
            fixes,
        }
    }

    /// Descriptor without fixes, the common case.
    pub fn simple(
        template: impl Into<String>,
        location: Option<Location>,
        severity: Severity,
    ) -> Self {
        Self::new(template, location, severity, Vec::new())
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn fixes(&self) -> &[Arc<dyn QuickFix>] {
        &self.fixes
    }
}

impl std::fmt::Debug for ProblemDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProblemDescriptor")
            .field("template", &self.template)
            .field("location", &self.location)
            .field("severity", &self.severity)
            .field("fixes", &self.fixes.len())
            .finish()
    }
}

/// Identity of one stored descriptor. Descriptors are recreated each run,
/// so this is only meaningful within a single run's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorKey(usize);

impl DescriptorKey {
    pub fn of(descriptor: &Arc<ProblemDescriptor>) -> Self {
        DescriptorKey(Arc::as_ptr(descriptor) as usize)
    }
}

/// Stable fingerprint of a finding for run-to-run comparison.
///
/// Hashes the owning entity's identity and the description template, never
/// the descriptor object itself, so a finding recreated by the next run
/// fingerprints identically.
pub fn finding_fingerprint(entity: EntityId, template: &str) -> u64 {
    let input = format!("{}\n{}", entity.raw(), template);
    xxhash_rust::xxh3::xxh3_64(input.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_parse_lossy_known_values() {
        assert_eq!(Severity::parse_lossy("error"), Severity::Error);
        assert_eq!(Severity::parse_lossy("  Critical "), Severity::Critical);
        assert_eq!(Severity::parse_lossy("INFO"), Severity::Info);
    }

    #[test]
    fn severity_parse_lossy_falls_back_to_warning() {
        assert_eq!(Severity::parse_lossy("blocker"), Severity::Warning);
        assert_eq!(Severity::parse_lossy(""), Severity::Warning);
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn fingerprint_tracks_entity_and_template() {
        let a = finding_fingerprint(EntityId::new(1), "unused field");
        let b = finding_fingerprint(EntityId::new(1), "unused field");
        let c = finding_fingerprint(EntityId::new(2), "unused field");
        let d = finding_fingerprint(EntityId::new(1), "unused method");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn descriptor_is_immutable_data() {
        let d = ProblemDescriptor::simple(
            "field is never read",
            Some(Location::at_lines(EntityId::new(7), 12, 12)),
            Severity::Warning,
        );
        assert_eq!(d.template(), "field is never read");
        assert_eq!(d.severity(), Severity::Warning);
        assert_eq!(d.location().map(|l| l.entity), Some(EntityId::new(7)));
        assert!(d.fixes().is_empty());
    }
}
