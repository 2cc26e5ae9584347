//! Ranked substring search over the player index.

use crate::index::PlayerIndex;

/// Hard cap on returned matches, applied after the global sort.
pub const MAX_RESULTS: usize = 50;

/// One matching index entry. Built fresh per query, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
}

/// True when the input is a bare decimal account id. Callers route such
/// input straight to the profile fetcher instead of the name search.
pub fn is_account_id(query: &str) -> bool {
    !query.is_empty() && query.chars().all(|c| c.is_ascii_digit())
}

/// Relevance tier of a match; variant order is ranking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchTier {
    Exact,
    Prefix,
    Contains,
}

fn tier_of(name_lower: &str, needle: &str) -> MatchTier {
    if name_lower == needle {
        MatchTier::Exact
    } else if name_lower.starts_with(needle) {
        MatchTier::Prefix
    } else {
        MatchTier::Contains
    }
}

/// Case-insensitive substring filter over `index`, ordered most-relevant
/// first: exact matches, then prefix matches, then contains-anywhere matches,
/// each tier sorted lexicographically by lowercased name (account id as the
/// final tie-break). Truncated to `limit` after the full sort.
///
/// Purely numeric input never belongs here; it yields no results rather than
/// scanning the index for digits.
pub fn rank_matches(index: &PlayerIndex, query: &str, limit: usize) -> Vec<SearchResult> {
    if query.is_empty() || is_account_id(query) {
        return Vec::new();
    }
    let needle = query.to_lowercase();

    let mut matches: Vec<(MatchTier, String, SearchResult)> = index
        .iter()
        .filter_map(|(id, name)| {
            let name_lower = name.to_lowercase();
            if !name_lower.contains(&needle) {
                return None;
            }
            let tier = tier_of(&name_lower, &needle);
            let result = SearchResult {
                id: id.to_string(),
                name: name.to_string(),
            };
            Some((tier, name_lower, result))
        })
        .collect();

    matches.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.id.cmp(&b.2.id))
    });
    matches.truncate(limit);
    matches.into_iter().map(|(_, _, result)| result).collect()
}
