//! Codec for the resolver's CNAME alias list
//!
//! The resolver exposes its alias list as a bracketed string. The two
//! directions use different shapes:
//!
//! ```text
//! read   := "" | "[]" | "[" SP entries SP "]"
//! entries := entry ( ", " entry )*
//! entry  := domain "," target          (unquoted)
//!
//! write  := "[ " quoted ( ", " quoted )* " ]"
//! quoted := '"' domain "," target '"'  (sorted lexicographically)
//! ```
//!
//! Records are keyed on the full `domain,target` string, so retargeting a
//! domain shows up as one removal plus one addition.

use std::collections::BTreeSet;
use std::fmt;

/// Literal the resolver prints for an empty list
pub const EMPTY_LIST_MARKER: &str = "[]";

/// Delimiter between entries in both directions
const ENTRY_DELIMITER: &str = ", ";

/// One CNAME mapping in its raw `domain,target` form
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AliasRecord {
    raw: String,
}

impl AliasRecord {
    /// Build a record from its two halves
    pub fn new(domain: &str, target: &str) -> Self {
        Self {
            raw: format!("{},{}", domain, target),
        }
    }

    /// Parse a raw `domain,target` token; tokens without a comma are rejected
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let token = token
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(token);

        if token.is_empty() || !token.contains(',') {
            return None;
        }

        Some(Self {
            raw: token.to_string(),
        })
    }

    /// Alias source domain
    pub fn domain(&self) -> &str {
        self.raw.split_once(',').map(|(d, _)| d).unwrap_or(&self.raw)
    }

    /// Alias target host
    pub fn target(&self) -> &str {
        self.raw.split_once(',').map(|(_, t)| t).unwrap_or("")
    }

    /// The raw `domain,target` string
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for AliasRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse the resolver's read response into a record set
///
/// Malformed tokens are dropped silently.
pub fn parse_alias_list(response: &str) -> BTreeSet<AliasRecord> {
    let response = response.trim();
    if response.is_empty() || response == EMPTY_LIST_MARKER {
        return BTreeSet::new();
    }

    let inner = response.strip_prefix('[').unwrap_or(response);
    let inner = inner.strip_suffix(']').unwrap_or(inner);

    inner
        .split(ENTRY_DELIMITER)
        .filter_map(AliasRecord::parse)
        .collect()
}

/// Render a record set as the resolver's write argument
pub fn render_alias_list(records: &BTreeSet<AliasRecord>) -> String {
    if records.is_empty() {
        return EMPTY_LIST_MARKER.to_string();
    }

    let quoted: Vec<String> = records.iter().map(|r| format!("\"{}\"", r)).collect();
    format!("[ {} ]", quoted.join(ENTRY_DELIMITER))
}
