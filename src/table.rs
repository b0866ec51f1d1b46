//! Authoritative item storage for a single table
//!
//! The store owns deep copies of every item, keyed by primary key and
//! ordered ascending by `(PK, SK)`. Every mutation keeps the index set in
//! step, and everything handed back out is a clone, so callers can never
//! reach into stored state.

use std::collections::BTreeMap;
use std::ops::Bound as RangeBound;

use crate::{
    expr::type_code,
    index::IndexSet,
    keys::{ItemKey, PARTITION_KEY, SORT_KEY},
    AttributeValue, Error, Item,
};

/// The item store and index set of one table
#[derive(Debug, Default)]
pub struct TableState {
    items: BTreeMap<ItemKey, Item>,
    indexes: IndexSet,
}

impl TableState {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of stored items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the table holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// A deep copy of the item stored under a primary key
    pub fn get(&self, key: &ItemKey) -> Option<Item> {
        self.items.get(key).cloned()
    }

    /// A deep copy of the item a canonical key encoding points to
    pub fn get_encoded(&self, encoded: &str) -> Option<Item> {
        ItemKey::decode(encoded).and_then(|key| self.get(&key))
    }

    /// Store an item, replacing any previous item under the same key
    ///
    /// The previous item's index entries are removed before the new item is
    /// indexed from its literal attributes. Returns the previous item.
    pub fn put(&mut self, item: Item) -> Result<Option<Item>, Error> {
        validate_key_attributes(&item)?;
        let key = ItemKey::from_item(&item)
            .expect("key attributes were just validated as strings");
        let encoded = key.encode();
        let previous = self.items.remove(&key);
        if let Some(prev) = &previous {
            self.indexes.remove(&encoded, prev);
        }
        self.indexes.add(&encoded, &item);
        self.items.insert(key, item);
        Ok(previous)
    }

    /// Remove the item under a primary key, returning it
    pub fn delete(&mut self, key: &ItemKey) -> Option<Item> {
        let item = self.items.remove(key)?;
        self.indexes.remove(&key.encode(), &item);
        Some(item)
    }

    /// Iterate stored items ascending by `(PK, SK)`
    ///
    /// With an exclusive start, iteration begins strictly after it.
    pub fn iter_from(
        &self,
        exclusive_start: Option<&ItemKey>,
    ) -> impl Iterator<Item = (&ItemKey, &Item)> {
        let lower = match exclusive_start {
            Some(key) => RangeBound::Excluded(key.clone()),
            None => RangeBound::Unbounded,
        };
        self.items.range((lower, RangeBound::Unbounded))
    }

    /// Deep copies of all items ascending by `(PK, SK)`
    pub fn scan_items(&self, exclusive_start: Option<&ItemKey>) -> Vec<Item> {
        self.iter_from(exclusive_start)
            .map(|(_, item)| item.clone())
            .collect()
    }

    /// The index set maintained alongside the store
    pub fn indexes(&self) -> &IndexSet {
        &self.indexes
    }

    /// A deterministic map from `PK__SK` to a deep copy of each item
    pub fn snapshot(&self) -> BTreeMap<String, Item> {
        self.items
            .iter()
            .map(|(key, item)| (format!("{}__{}", key.partition, key.sort), item.clone()))
            .collect()
    }

    /// Empty the store and every index
    pub fn clear(&mut self) {
        self.items.clear();
        self.indexes.clear();
    }
}

pub(crate) fn validate_key_attributes(item: &Item) -> Result<(), Error> {
    for attr in [PARTITION_KEY, SORT_KEY] {
        match item.get(attr) {
            Some(AttributeValue::S(_)) => {}
            Some(other) => {
                return Err(Error::validation(format!(
                    "One or more parameter values were invalid: \
                     Type mismatch for key {attr} expected: S actual: {}",
                    type_code(other),
                )))
            }
            None => {
                return Err(Error::validation(format!(
                    "One or more parameter values were invalid: \
                     Missing the key {attr} in the item"
                )))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;
    use crate::ordmap::Direction;

    fn row(pk: &str, sk: &str, extra: &[(&str, &str)]) -> Item {
        let mut item = Item::new();
        item.insert(
            PARTITION_KEY.to_owned(),
            AttributeValue::S(pk.to_owned()),
        );
        item.insert(SORT_KEY.to_owned(), AttributeValue::S(sk.to_owned()));
        for (k, v) in extra {
            item.insert((*k).to_owned(), AttributeValue::S((*v).to_owned()));
        }
        item
    }

    #[test]
    fn put_then_get_returns_an_equal_copy() {
        let mut table = TableState::new();
        let item = row("A", "B", &[("name", "x")]);
        table.put(item.clone()).unwrap();

        let mut got = table.get(&ItemKey::new("A", "B")).unwrap();
        assert_eq!(got, item);

        // Mutating the returned copy must not reach stored state.
        got.insert("name".to_owned(), AttributeValue::S("tampered".to_owned()));
        assert_eq!(table.get(&ItemKey::new("A", "B")).unwrap(), item);
    }

    #[test]
    fn put_rejects_missing_or_mistyped_keys() {
        let mut table = TableState::new();

        let mut item = Item::new();
        item.insert("SK".to_owned(), AttributeValue::S("B".to_owned()));
        let err = table.put(item).unwrap_err();
        assert!(err.to_string().contains("Missing the key PK in the item"));

        let mut item = row("A", "B", &[]);
        item.insert("SK".to_owned(), AttributeValue::N("7".to_owned()));
        let err = table.put(item).unwrap_err();
        assert!(err
            .to_string()
            .contains("Type mismatch for key SK expected: S actual: N"));
    }

    #[test]
    fn overwrite_replaces_index_entries() {
        let mut table = TableState::new();
        table
            .put(row("A", "B", &[("GSI2PK", "H"), ("GSI2SK", "old")]))
            .unwrap();
        table
            .put(row("A", "B", &[("GSI2PK", "H"), ("GSI2SK", "new")]))
            .unwrap();

        assert_eq!(table.indexes().entry_count("GSI2"), 1);
        let entries: Vec<_> = table
            .indexes()
            .partition("GSI2", "H")
            .unwrap()
            .iter(Direction::Forward)
            .map(|(entry, _)| entry.to_owned())
            .collect();
        assert_eq!(
            entries,
            vec![keys::entry_key("new", &ItemKey::new("A", "B").encode())]
        );
    }

    #[test]
    fn delete_removes_item_and_index_entries() {
        let mut table = TableState::new();
        table
            .put(row("A", "B", &[("GSI2PK", "H"), ("GSI2SK", "R")]))
            .unwrap();
        let removed = table.delete(&ItemKey::new("A", "B")).unwrap();
        assert_eq!(removed, row("A", "B", &[("GSI2PK", "H"), ("GSI2SK", "R")]));
        assert!(table.is_empty());
        assert_eq!(table.indexes().entry_count("primary"), 0);
        assert_eq!(table.indexes().entry_count("GSI2"), 0);
        assert!(table.delete(&ItemKey::new("A", "B")).is_none());
    }

    #[test]
    fn scan_is_ordered_and_resumable() {
        let mut table = TableState::new();
        for (pk, sk) in [("B", "1"), ("A", "2"), ("A", "1"), ("C", "1")] {
            table.put(row(pk, sk, &[])).unwrap();
        }

        let keys: Vec<_> = table
            .scan_items(None)
            .iter()
            .map(|item| ItemKey::from_item(item).unwrap())
            .collect();
        assert_eq!(
            keys,
            vec![
                ItemKey::new("A", "1"),
                ItemKey::new("A", "2"),
                ItemKey::new("B", "1"),
                ItemKey::new("C", "1"),
            ]
        );

        let resumed: Vec<_> = table
            .scan_items(Some(&ItemKey::new("A", "2")))
            .iter()
            .map(|item| ItemKey::from_item(item).unwrap())
            .collect();
        assert_eq!(resumed, vec![ItemKey::new("B", "1"), ItemKey::new("C", "1")]);
    }

    #[test]
    fn snapshot_keys_are_pk_sk_joined() {
        let mut table = TableState::new();
        table.put(row("A", "1", &[("v", "x")])).unwrap();
        table.put(row("B", "2", &[])).unwrap();

        let snapshot = table.snapshot();
        let keys: Vec<_> = snapshot.keys().cloned().collect();
        assert_eq!(keys, vec!["A__1", "B__2"]);
        assert_eq!(snapshot["A__1"], row("A", "1", &[("v", "x")]));
    }

    #[test]
    fn clear_empties_store_and_indexes() {
        let mut table = TableState::new();
        table
            .put(row("A", "B", &[("GSI4PK", "H"), ("GSI4SK", "R")]))
            .unwrap();
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.indexes().entry_count("primary"), 0);
        assert_eq!(table.indexes().entry_count("GSI4"), 0);
        assert!(table.snapshot().is_empty());
    }
}
