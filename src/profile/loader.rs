//! Profile loading from TOML documents.
//!
//! # Format
//!
//! ```toml
//! name = "strict"
//!
//! [tools.dead-code]
//! severity = "error"
//! enabled = true
//!
//! [tools.dead-code.options]
//! report_private_only = true
//! ```
//!
//! A stale severity name degrades to `warning` instead of failing the load.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use super::{Profile, ToolState};
use crate::models::Severity;

#[derive(Debug, Error)]
pub enum ProfileLoadError {
    #[error("malformed profile document: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid options for tool {tool}: {source}")]
    Options {
        tool: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tools: BTreeMap<String, RawToolEntry>,
}

#[derive(Debug, Deserialize)]
struct RawToolEntry {
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    options: Option<toml::Value>,
}

/// Parse a profile document. Each tool table becomes an explicit override.
pub fn profile_from_toml(doc: &str) -> Result<Profile, ProfileLoadError> {
    let raw: RawProfile = toml::from_str(doc)?;
    let mut profile = Profile::new(raw.name.unwrap_or_else(|| "default".to_string()));

    for (tool_id, entry) in raw.tools {
        let severity = entry
            .severity
            .as_deref()
            .map(Severity::parse_lossy)
            .unwrap_or(Severity::Warning);
        let enabled = entry.enabled.unwrap_or(true);
        profile.set_state(&tool_id, ToolState::new(severity, enabled));

        if let Some(options) = entry.options {
            let value =
                serde_json::to_value(&options).map_err(|source| ProfileLoadError::Options {
                    tool: tool_id.clone(),
                    source,
                })?;
            profile.set_tool_options(&tool_id, value);
        }
    }

    debug!(
        "loaded profile {:?} with {} tool entries",
        profile.name(),
        profile.overridden_keys().len()
    );
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_states_and_options() {
        let doc = r#"
            name = "strict"

            [tools.dead-code]
            severity = "error"
            enabled = true

            [tools.dead-code.options]
            report_private_only = true

            [tools.magic-number]
            enabled = false
        "#;
        let profile = profile_from_toml(doc).expect("valid document");

        assert_eq!(profile.name(), "strict");
        assert_eq!(
            profile.state_of("dead-code"),
            ToolState::new(Severity::Error, true)
        );
        // severity omitted: warning
        assert_eq!(
            profile.state_of("magic-number"),
            ToolState::new(Severity::Warning, false)
        );
        assert_eq!(
            profile.tool_options("dead-code"),
            Some(&serde_json::json!({"report_private_only": true}))
        );
    }

    #[test]
    fn unknown_severity_degrades_to_warning() {
        let doc = r#"
            [tools.dead-code]
            severity = "blocker"
        "#;
        let profile = profile_from_toml(doc).expect("valid document");
        assert_eq!(profile.state_of("dead-code").severity, Severity::Warning);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(profile_from_toml("tools = 3").is_err());
    }

    #[test]
    fn empty_document_is_an_empty_profile() {
        let profile = profile_from_toml("").expect("valid document");
        assert_eq!(profile.name(), "default");
        assert!(profile.overridden_keys().is_empty());
    }
}
