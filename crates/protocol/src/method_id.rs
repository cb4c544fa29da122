use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identity of a captured method: the key aggregates merge on.
///
/// Backed by `Arc<str>` so every aggregate and every merged node can hold
/// the same id without copying it. An empty id marks a synthetic anchor
/// (e.g. the node that groups several selected threads) rather than a real
/// method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MethodId(Arc<str>);

impl MethodId {
    /// The empty id carried by synthetic anchors.
    pub fn synthetic() -> Self {
        Self(Arc::from(""))
    }

    /// Whether this id belongs to a placeholder rather than a method.
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MethodId {
    fn default() -> Self {
        Self::synthetic()
    }
}

impl From<&str> for MethodId {
    #[inline]
    fn from(s: &str) -> Self {
        MethodId(Arc::from(s))
    }
}

impl From<String> for MethodId {
    #[inline]
    fn from(s: String) -> Self {
        MethodId(Arc::from(s))
    }
}

impl From<MethodId> for String {
    fn from(id: MethodId) -> Self {
        id.0.to_string()
    }
}

impl std::fmt::Display for MethodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_id_is_synthetic() {
        assert!(MethodId::synthetic().is_synthetic());
        assert!(MethodId::default().is_synthetic());
        assert!(!MethodId::from("main").is_synthetic());
    }

    #[test]
    fn equal_by_content_not_allocation() {
        let a = MethodId::from("com.example.Foo.run()");
        let b = MethodId::from(String::from("com.example.Foo.run()"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "com.example.Foo.run()");
    }

    #[test]
    fn ids_with_equal_content_share_a_map_slot() {
        let mut counts = HashMap::new();
        counts.insert(MethodId::from("draw"), 3);
        *counts.entry(MethodId::from(String::from("draw"))).or_insert(0) += 1;
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get(&MethodId::from("draw")), Some(&4));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = MethodId::from("onMeasure");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"onMeasure\"");
        let back: MethodId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
