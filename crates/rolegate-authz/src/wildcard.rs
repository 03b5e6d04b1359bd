//! Wildcard permission codes.
//!
//! A code is a `.`-separated list of parts; each part is a `,`-separated
//! list of alternatives, and `*` stands for any value. A granted pattern
//! implies a requested code when every requested part is covered by the
//! pattern's part at the same position:
//!
//! - `articles.*` implies `articles.edit`
//! - `articles.edit,delete` implies `articles.delete` but not `articles.view`
//! - `articles` implies `articles.edit.own` (missing parts are implied)
//! - `articles.edit.*` implies `articles.edit`, but `articles.edit.own`
//!   does not (trailing pattern parts must be `*`)

use std::collections::HashSet;

const PART_DELIMITER: char = '.';
const SUBPART_DELIMITER: char = ',';
const WILDCARD_TOKEN: &str = "*";

pub trait PermissionMatcher: Send + Sync {
    /// Whether holding `granted` is enough for `requested`.
    fn implies(&self, granted: &str, requested: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WildcardMatcher;

/// Parse a code into parts, or `None` if it is empty or has an empty
/// part or alternative.
fn parts(code: &str) -> Option<Vec<HashSet<&str>>> {
    if code.is_empty() {
        return None;
    }
    code.split(PART_DELIMITER)
        .map(|part| {
            let alternatives: HashSet<&str> = part.split(SUBPART_DELIMITER).collect();
            (!alternatives.contains("")).then_some(alternatives)
        })
        .collect()
}

impl PermissionMatcher for WildcardMatcher {
    fn implies(&self, granted: &str, requested: &str) -> bool {
        let (Some(granted), Some(requested)) = (parts(granted), parts(requested)) else {
            return false;
        };

        for (index, requested_part) in requested.iter().enumerate() {
            let Some(granted_part) = granted.get(index) else {
                return true;
            };
            if !granted_part.contains(WILDCARD_TOKEN) && !granted_part.is_superset(requested_part) {
                return false;
            }
        }

        granted[requested.len()..]
            .iter()
            .all(|part| part.contains(WILDCARD_TOKEN))
    }
}
