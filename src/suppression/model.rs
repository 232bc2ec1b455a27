//! Data structures for suppression directives.

use serde::{Deserialize, Serialize};

/// Wildcard id that suppresses every tool at a scope.
pub const ALL_TOOLS: &str = "ALL";

/// Entity property carrying a suppression attribute value: a string literal,
/// an array of literals, or `{"const": "NAME"}` referencing a named constant.
pub const ATTR_KEY: &str = "suppress";

/// Entity property carrying a structured doc-tag id list (array of strings).
pub const TAG_KEY: &str = "suppress_tags";

/// One parsed suppression comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    /// Tool ids this directive names. Empty when the list was malformed;
    /// an empty list never matches anything.
    pub tool_ids: Vec<String>,
    /// Line the comment appears on (1-indexed).
    pub line: u32,
}

impl Directive {
    pub fn matches(&self, tool_id: &str) -> bool {
        id_list_matches(&self.tool_ids, tool_id)
    }
}

/// Whether an id list names `tool_id`, directly or via the wildcard.
pub fn id_list_matches(ids: &[String], tool_id: &str) -> bool {
    ids.iter().any(|id| id == tool_id || id == ALL_TOOLS)
}

/// Split a raw id-list text into ids. Malformed fragments are dropped; a
/// text that yields nothing is treated as "matches nothing".
pub fn split_id_list(raw: &str) -> Vec<String> {
    raw.split([',', ' ', '\t'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter(|part| is_valid_id(part))
        .map(str::to_string)
        .collect()
}

fn is_valid_id(part: &str) -> bool {
    part.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_matches_listed_id_and_wildcard() {
        let named = Directive {
            tool_ids: vec!["dead-code".into(), "unused-import".into()],
            line: 4,
        };
        assert!(named.matches("dead-code"));
        assert!(!named.matches("magic-number"));

        let all = Directive {
            tool_ids: vec![ALL_TOOLS.into()],
            line: 4,
        };
        assert!(all.matches("anything"));
    }

    #[test]
    fn empty_list_matches_nothing() {
        let empty = Directive {
            tool_ids: vec![],
            line: 1,
        };
        assert!(!empty.matches("dead-code"));
    }

    #[test]
    fn split_accepts_commas_and_whitespace() {
        assert_eq!(
            split_id_list("dead-code, unused-import  magic-number"),
            vec!["dead-code", "unused-import", "magic-number"]
        );
    }

    #[test]
    fn split_drops_malformed_fragments() {
        assert_eq!(split_id_list("dead-code, {oops}"), vec!["dead-code"]);
        assert!(split_id_list("{?} (!)").is_empty());
    }
}
