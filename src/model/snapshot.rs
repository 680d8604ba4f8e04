//! Point-in-time view of the whole `orders` collection.

use crate::model::{Order, OrderId};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Complete mapping from order id to raw order record.
///
/// Iteration order is insertion order, which for decoded payloads is the
/// document order of the source JSON. The reconciler relies on it to break
/// timestamp ties deterministically.
///
/// Records are kept undecoded so that a single malformed entry can be reported
/// and skipped without losing the rest of the snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: Vec<(OrderId, Value)>,
    index: HashMap<OrderId, usize>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a collection payload. `null` is an empty collection.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &OrderId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &OrderId) -> Option<&Value> {
        self.index.get(id).map(|&slot| &self.entries[slot].1)
    }

    pub fn get_mut(&mut self, id: &OrderId) -> Option<&mut Value> {
        match self.index.get(id) {
            Some(&slot) => Some(&mut self.entries[slot].1),
            None => None,
        }
    }

    /// Inserts or replaces a record. A replaced record keeps its position.
    pub fn insert(&mut self, id: impl Into<OrderId>, record: Value) -> Option<Value> {
        let id = id.into();
        match self.index.get(&id) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].1, record)),
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, record));
                None
            }
        }
    }

    /// Inserts the wire encoding of `order`.
    pub fn insert_order(&mut self, id: impl Into<OrderId>, order: &Order) -> Option<Value> {
        self.insert(id, order.to_record())
    }

    pub fn remove(&mut self, id: &OrderId) -> Option<Value> {
        let slot = self.index.remove(id)?;
        let (_, record) = self.entries.remove(slot);
        for (later, (entry_id, _)) in self.entries.iter().enumerate().skip(slot) {
            self.index.insert(entry_id.clone(), later);
        }
        Some(record)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn ids(&self) -> impl Iterator<Item = &OrderId> {
        self.entries.iter().map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OrderId, &Value)> {
        self.entries.iter().map(|(id, record)| (id, record))
    }
}

impl<I: Into<OrderId>> FromIterator<(I, Value)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (I, Value)>>(iter: T) -> Self {
        let mut snapshot = Snapshot::new();
        for (id, record) in iter {
            snapshot.insert(id, record);
        }
        snapshot
    }
}

struct SnapshotVisitor;

impl<'de> Visitor<'de> for SnapshotVisitor {
    type Value = Snapshot;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of order id to order record, or null")
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Snapshot, E> {
        Ok(Snapshot::new())
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Snapshot, E> {
        Ok(Snapshot::new())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Snapshot, D::Error> {
        deserializer.deserialize_any(SnapshotVisitor)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Snapshot, A::Error> {
        let mut snapshot = Snapshot::new();
        while let Some((id, record)) = map.next_entry::<String, Value>()? {
            snapshot.insert(id, record);
        }
        Ok(snapshot)
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SnapshotVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_keeps_document_order() {
        let snapshot = Snapshot::from_json(r#"{"zeta": {"a": 1}, "alpha": {"a": 2}, "mid": {}}"#)
            .expect("valid payload");
        let ids: Vec<&str> = snapshot.ids().map(OrderId::as_str).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
        assert_eq!(snapshot.get(&"alpha".into()), Some(&json!({"a": 2})));
    }

    #[test]
    fn test_null_payload_is_empty() {
        assert!(Snapshot::from_json("null").unwrap().is_empty());
        assert!(Snapshot::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_insert_replace_remove() {
        let mut snapshot: Snapshot = [("a", json!(1)), ("b", json!(2)), ("c", json!(3))]
            .into_iter()
            .collect();

        assert_eq!(snapshot.insert("a", json!(10)), Some(json!(1)));
        assert_eq!(snapshot.remove(&"b".into()), Some(json!(2)));
        assert_eq!(snapshot.remove(&"b".into()), None);

        let entries: Vec<(&str, &Value)> =
            snapshot.iter().map(|(id, v)| (id.as_str(), v)).collect();
        assert_eq!(entries, vec![("a", &json!(10)), ("c", &json!(3))]);
        assert_eq!(snapshot.get(&"c".into()), Some(&json!(3)));
        assert_eq!(snapshot.len(), 2);
    }
}
