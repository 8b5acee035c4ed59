//! Deduplication of combined provider results.

use std::collections::HashSet;

use crate::subtitle::SearchResult;

/// Drop repeated results, identified by provider and provider-scoped id.
///
/// The first occurrence is kept and the relative order of the survivors is
/// preserved.
pub fn deduplicate_results(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert((r.provider.clone(), r.id.clone())))
        .collect()
}
