//! Parser for suppression comments.
//!
//! Recognizes `scrutiny-ignore: id, id2` (or `ALL`) inside `//`, `#`, and
//! `/* */` comments. Parsing is per file and the result is cached by the
//! resolver, so a file is scanned at most once per run.

use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;
use tracing::debug;

use super::model::{split_id_list, Directive};

/// The suppression comment marker.
pub const MARKER: &str = "scrutiny-ignore";

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?://|#|/\*)\s*scrutiny-ignore\s*:\s*([A-Za-z0-9_.\-,\s]*)")
            .expect("valid marker regex")
    })
}

/// Suppression directives of one file, indexed by comment line.
#[derive(Debug, Default, Clone)]
pub struct FileDirectives {
    by_line: FxHashMap<u32, Directive>,
}

impl FileDirectives {
    /// Directive on the line immediately preceding `line`, if any.
    pub fn preceding(&self, line: u32) -> Option<&Directive> {
        line.checked_sub(1).and_then(|prev| self.by_line.get(&prev))
    }

    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_line.len()
    }
}

/// Scan source text for suppression comments.
pub fn parse_file(source: &str) -> FileDirectives {
    let mut by_line = FxHashMap::default();

    for (idx, line) in source.lines().enumerate() {
        let line_num = (idx + 1) as u32;
        let Some(caps) = marker_re().captures(line) else {
            continue;
        };
        let raw = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let tool_ids = split_id_list(raw);
        if tool_ids.is_empty() {
            // Malformed id list: keep the directive so the anomaly is
            // observable, but it matches nothing.
            debug!("malformed suppression id list on line {}: {:?}", line_num, raw);
        }
        by_line.insert(line_num, Directive { tool_ids, line: line_num });
    }

    FileDirectives { by_line }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_line_comments() {
        let source = "\
fn main() {
    // scrutiny-ignore: dead-code
    let unused = 1;
}";
        let directives = parse_file(source);
        assert_eq!(directives.len(), 1);
        let d = directives.preceding(3).expect("directive above line 3");
        assert_eq!(d.tool_ids, vec!["dead-code"]);
        assert!(directives.preceding(2).is_none());
    }

    #[test]
    fn parses_hash_and_block_comments() {
        let source = "\
# scrutiny-ignore: ALL
x = 1
/* scrutiny-ignore: magic-number, dead-code */
y = 2";
        let directives = parse_file(source);
        assert!(directives.preceding(2).expect("line 1").matches("anything"));
        let d = directives.preceding(4).expect("line 3");
        assert!(d.matches("magic-number"));
        assert!(d.matches("dead-code"));
        assert!(!d.matches("unused-import"));
    }

    #[test]
    fn marker_is_case_insensitive() {
        let directives = parse_file("// SCRUTINY-IGNORE: dead-code\nlet x = 1;");
        assert!(directives.preceding(2).expect("line 1").matches("dead-code"));
    }

    #[test]
    fn malformed_list_matches_nothing() {
        let directives = parse_file("// scrutiny-ignore:\nlet x = 1;");
        assert!(!directives.preceding(2).expect("line 1").matches("dead-code"));
    }

    #[test]
    fn plain_comments_are_not_directives() {
        let directives = parse_file("// nothing to see here\nlet x = 1;");
        assert!(directives.is_empty());
    }
}
