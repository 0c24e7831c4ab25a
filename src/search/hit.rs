use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use crate::record::FieldValue;
use crate::transport::RawHit;

/// One search result: the document id and its stored fields.
///
/// Equality and hashing look at the id only.
#[derive(Debug, Clone)]
pub struct SearchHit {
    id: u64,
    fields: IndexMap<String, FieldValue>,
}

impl SearchHit {
    pub fn new(id: u64, fields: IndexMap<String, FieldValue>) -> Self {
        Self { id, fields }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn fields(&self) -> &IndexMap<String, FieldValue> {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }
}

impl From<RawHit> for SearchHit {
    fn from(hit: RawHit) -> Self {
        Self::new(hit.id, hit.source)
    }
}

impl PartialEq for SearchHit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SearchHit {}

impl Hash for SearchHit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for SearchHit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn hit(id: u64, title: &str) -> SearchHit {
        let mut fields = IndexMap::new();
        fields.insert("title".to_string(), FieldValue::from(title));
        SearchHit::new(id, fields)
    }

    #[test]
    fn test_identity_is_the_id() {
        assert_eq!(hit(1, "a"), hit(1, "b"));
        assert_ne!(hit(1, "a"), hit(2, "a"));

        let set: HashSet<SearchHit> = [hit(1, "a"), hit(1, "b"), hit(2, "c")].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display_and_access() {
        let h = hit(42, "answer");
        assert_eq!(h.to_string(), "42");
        assert_eq!(h.get("title"), Some(&FieldValue::from("answer")));
        assert!(h.get("body").is_none());
    }
}
