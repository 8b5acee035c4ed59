//! Subtitle search data model.
//!
//! Requests, results and the enums shared by every other component, plus the
//! canonical cache key used to index cached result sets.

mod key;
mod language;
mod types;

pub use key::canonical_cache_key;
pub use language::language_name;
pub use types::*;
