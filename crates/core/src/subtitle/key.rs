//! Canonical cache key derivation.

use sha2::{Digest, Sha256};

use super::SearchRequest;

/// Derive the cache key for a request.
///
/// The title is trimmed and lowercased and the language list is reduced to a
/// sorted set, so requests that differ only in language order share a key.
/// Every other field contributes as-is. Fields are length-prefixed before
/// hashing so that no two distinct field tuples produce the same input, and
/// the hex encoding keeps the key usable as a file or row identifier.
pub fn canonical_cache_key(request: &SearchRequest) -> String {
    let mut languages: Vec<String> = request
        .languages
        .iter()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect();
    languages.sort();
    languages.dedup();

    let formats: Vec<&str> = request
        .preferred_formats
        .iter()
        .map(|f| f.extension())
        .collect();

    let mut hasher = Sha256::new();
    push_field(&mut hasher, &request.title.trim().to_lowercase());
    push_field(&mut hasher, &optional(request.year));
    push_field(&mut hasher, request.content_type.as_str());
    push_field(&mut hasher, request.imdb_id.as_deref().unwrap_or(""));
    push_field(&mut hasher, request.file_hash.as_deref().unwrap_or(""));
    push_field(&mut hasher, &languages.join(","));
    push_field(&mut hasher, &formats.join(","));
    push_field(&mut hasher, &optional(request.season));
    push_field(&mut hasher, &optional(request.episode));

    format!("{:x}", hasher.finalize())
}

fn push_field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn optional(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
