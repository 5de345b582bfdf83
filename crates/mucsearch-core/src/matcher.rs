//! Query string matching
//!
//! The canonical rule is a literal, case-sensitive prefix check against the
//! room name or the room identifier. `MatchMode::PrefixIgnoreCase` exists for
//! deployments that opt in through configuration; nothing switches to it
//! implicitly.

use crate::config::MatchMode;

/// Canonical rule: empty query matches everything, otherwise `name` or
/// `identifier` must start with `query` (exact bytes, no normalization).
pub fn matches(query: &str, name: &str, identifier: &str) -> bool {
    query.is_empty() || name.starts_with(query) || identifier.starts_with(query)
}

/// A query string bound to a match mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher {
    query: String,
    /// Lowercased query, only kept for `PrefixIgnoreCase`
    folded: Option<String>,
}

impl Matcher {
    pub fn new(query: impl Into<String>, mode: MatchMode) -> Self {
        let query = query.into();
        let folded = match mode {
            MatchMode::Prefix => None,
            MatchMode::PrefixIgnoreCase => Some(query.to_lowercase()),
        };
        Self { query, folded }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self, name: &str, identifier: &str) -> bool {
        match &self.folded {
            None => matches(&self.query, name, identifier),
            Some(folded) => {
                folded.is_empty()
                    || name.to_lowercase().starts_with(folded.as_str())
                    || identifier.to_lowercase().starts_with(folded.as_str())
            }
        }
    }
}
