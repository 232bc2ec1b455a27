//! Inspection profiles
//!
//! A profile maps tool ids to (severity, enabled) state. Profiles compose:
//! a profile holds an explicit override map and an optional base profile;
//! lookups fall through the override map to the base chain and finally to a
//! hardcoded default, so resolution always terminates and always answers.
//!
//! Profiles persist across runs. Concurrent readers hold an `Arc` snapshot
//! obtained from a [`ProfileHandle`]; edits build a draft and commit it as a
//! whole, so a half-edited profile is never observable.

mod loader;

pub use loader::{profile_from_toml, ProfileLoadError};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::models::Severity;

/// Per-tool configuration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolState {
    pub severity: Severity,
    pub enabled: bool,
}

impl ToolState {
    /// Hardcoded last-resort state when neither the profile chain nor the
    /// tool's declared default answers.
    pub const fn fallback() -> Self {
        Self {
            severity: Severity::Warning,
            enabled: true,
        }
    }

    pub const fn new(severity: Severity, enabled: bool) -> Self {
        Self { severity, enabled }
    }
}

/// A named, inheritable tool configuration.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    name: String,
    overrides: FxHashMap<String, ToolState>,
    /// Per-tool extra configuration payloads. Deep-copied between profiles,
    /// never aliased.
    options: FxHashMap<String, serde_json::Value>,
    base: Option<Arc<Profile>>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_base(name: impl Into<String>, base: Arc<Profile>) -> Self {
        Self {
            name: name.into(),
            base: Some(base),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Option<&Arc<Profile>> {
        self.base.as_ref()
    }

    /// Resolve a tool's state: explicit override, then the base chain, then
    /// the hardcoded fallback.
    pub fn state_of(&self, key: &str) -> ToolState {
        self.resolve_with_default(key, None)
    }

    /// Like [`state_of`](Self::state_of), but a tool's own declared default
    /// takes precedence over the hardcoded fallback when no profile in the
    /// chain knows the key.
    pub fn resolve_with_default(&self, key: &str, declared: Option<ToolState>) -> ToolState {
        if let Some(state) = self.overrides.get(key) {
            return *state;
        }
        match &self.base {
            Some(base) => base.resolve_with_default(key, declared),
            None => declared.unwrap_or_else(ToolState::fallback),
        }
    }

    /// What the base chain alone would resolve for `key`.
    fn base_resolution(&self, key: &str) -> ToolState {
        match &self.base {
            Some(base) => base.state_of(key),
            None => ToolState::fallback(),
        }
    }

    /// Set a tool's state. Setting a value the base chain already resolves
    /// removes the explicit override instead, keeping the stored diff minimal.
    pub fn set_state(&mut self, key: &str, state: ToolState) {
        if state == self.base_resolution(key) {
            self.overrides.remove(key);
        } else {
            self.overrides.insert(key.to_string(), state);
        }
    }

    /// Whether `key` has an explicit override that differs from the base
    /// resolution. Pure query; see [`compact_overrides`](Self::compact_overrides)
    /// for the trimming pass.
    pub fn is_proper_setting(&self, key: &str) -> bool {
        match self.overrides.get(key) {
            Some(state) => *state != self.base_resolution(key),
            None => false,
        }
    }

    /// Drop every override the base chain now resolves identically.
    /// Idempotent; run by [`ProfileHandle::commit`] before publishing, and
    /// callable whenever a base profile changed underneath this one.
    pub fn compact_overrides(&mut self) {
        let base = self.base.clone();
        self.overrides.retain(|key, state| {
            let resolved = match &base {
                Some(b) => b.state_of(key),
                None => ToolState::fallback(),
            };
            *state != resolved
        });
    }

    /// Remove all explicit overrides, reverting every key to the base chain.
    pub fn reset_to_base(&mut self) {
        self.overrides.clear();
    }

    /// Re-parent this profile onto `base`, keeping its explicit overrides.
    pub fn inherit_from(&mut self, base: Arc<Profile>) {
        self.base = Some(base);
    }

    /// Replace this profile's overrides, options, and base link with copies
    /// of another profile's. Option payloads are deep-cloned.
    pub fn copy_from(&mut self, other: &Profile) {
        self.overrides = other.overrides.clone();
        self.options = other.options.clone();
        self.base = other.base.clone();
    }

    /// Per-tool extra configuration payload.
    pub fn tool_options(&self, key: &str) -> Option<&serde_json::Value> {
        self.options.get(key)
    }

    pub fn set_tool_options(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.options.insert(key.into(), value);
    }

    /// Tool ids with an explicit override in this profile.
    pub fn overridden_keys(&self) -> Vec<&str> {
        self.overrides.keys().map(|k| k.as_str()).collect()
    }
}

/// Shared, atomically-replaceable profile slot.
///
/// Readers take an `Arc` snapshot; [`commit`](Self::commit) compacts a draft
/// and swaps it in whole.
#[derive(Debug)]
pub struct ProfileHandle {
    current: RwLock<Arc<Profile>>,
}

impl ProfileHandle {
    pub fn new(profile: Profile) -> Self {
        Self {
            current: RwLock::new(Arc::new(profile)),
        }
    }

    /// Current profile snapshot. Stays consistent regardless of later commits.
    pub fn get(&self) -> Arc<Profile> {
        Arc::clone(&self.current.read().expect("profile lock"))
    }

    /// Publish an edited profile. Compacts overrides first so readers never
    /// see stale ones.
    pub fn commit(&self, mut draft: Profile) {
        draft.compact_overrides();
        *self.current.write().expect("profile lock") = Arc::new(draft);
    }

    /// Clone-edit-commit convenience.
    pub fn update(&self, edit: impl FnOnce(&mut Profile)) {
        let mut draft = (*self.get()).clone();
        edit(&mut draft);
        self.commit(draft);
    }
}
