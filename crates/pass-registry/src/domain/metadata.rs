//! # Metadata Resolver
//!
//! Stateless composition of a pass's metadata location. Existence of the
//! pass is checked by the registry before this is called.

use super::value_objects::PassId;

/// Suffix appended after the decimal id.
pub const METADATA_SUFFIX: &str = ".json";

/// `base_uri` + decimal `id` + `.json`, with no separator added.
#[must_use]
pub fn compose_uri(base_uri: &str, id: PassId) -> String {
    format!("{base_uri}{id}{METADATA_SUFFIX}")
}
