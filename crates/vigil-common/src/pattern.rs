//! Space-separated glob pattern lists with `!` negation.
//!
//! Used by template selectors (`os`, `hosts`, `families`) and lookup
//! dimension filters. Entries are tried in order and the first match
//! decides: a plain entry accepts, a `!`-prefixed entry rejects. A value
//! matching no entry is rejected, so `!*offline* *` reads as "everything
//! except offline".

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplePattern {
    entries: Vec<PatternEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PatternEntry {
    negate: bool,
    pattern: String,
}

impl SimplePattern {
    /// Parse a space-separated pattern list. An empty or all-whitespace
    /// input matches everything (equivalent to `*`).
    pub fn parse(s: &str) -> Self {
        let entries: Vec<PatternEntry> = s
            .split_whitespace()
            .map(|tok| match tok.strip_prefix('!') {
                Some(rest) => PatternEntry {
                    negate: true,
                    pattern: rest.to_string(),
                },
                None => PatternEntry {
                    negate: false,
                    pattern: tok.to_string(),
                },
            })
            .collect();
        Self { entries }
    }

    /// A pattern accepting every value.
    pub fn match_all() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        if self.entries.is_empty() {
            return true;
        }
        for entry in &self.entries {
            if glob_match::glob_match(&entry.pattern, value) {
                return !entry.negate;
            }
        }
        false
    }
}

impl Default for SimplePattern {
    fn default() -> Self {
        Self::match_all()
    }
}
