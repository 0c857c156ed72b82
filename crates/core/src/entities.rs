use std::collections::HashMap;

use crate::models::EntityOccurrence;

/// Text of the first recognized occurrence of `entity_type`, if any.
///
/// A missing type and an empty occurrence list are both reported as `None`.
pub fn extract_first<'a>(
    entities: &'a HashMap<String, Vec<EntityOccurrence>>,
    entity_type: &str,
) -> Option<&'a str> {
    entities
        .get(entity_type)
        .and_then(|occurrences| occurrences.first())
        .map(|occurrence| occurrence.text.as_str())
}
