//! Index maintenance for the primary index and the `GSI2..GSI19` family
//!
//! Index membership is sparse: an item appears in an index exactly when the
//! index's hash and range attributes are both present as strings. Entries
//! are maintained synchronously with every table mutation, so no index ever
//! holds a stale pointer.

use std::cmp::Ordering;

use fnv::FnvHashMap;

use crate::{
    keys::{self, IndexDefinition, ALL_INDEXES},
    ordmap::{self, Bound, Direction, OrderedMap, Range},
    Item,
};

/// The position to resume candidate iteration after: an index range value
/// and the encoded item key of the last-seen entry
#[derive(Clone, Copy, Debug)]
pub struct ExclusiveStart<'a> {
    /// The range attribute value of the last-seen entry
    pub range: &'a str,
    /// The encoded item key of the last-seen entry
    pub item_key: &'a str,
}

/// The per-index registry of hash partitions
#[derive(Debug, Default)]
pub struct IndexSet {
    partitions: FnvHashMap<&'static str, FnvHashMap<String, OrderedMap>>,
}

impl IndexSet {
    /// Create an empty index set
    pub fn new() -> Self {
        Self::default()
    }

    /// Index an item under every index it participates in
    pub fn add(&mut self, encoded_item_key: &str, item: &Item) {
        for def in &ALL_INDEXES {
            let Some((hash, range)) = def.key_strings(item) else {
                continue;
            };
            let priority = ordmap::priority(def.index_name, hash, range, encoded_item_key);
            let entry = keys::entry_key(range, encoded_item_key);
            self.partitions
                .entry(def.index_name)
                .or_default()
                .entry(hash.to_owned())
                .or_default()
                .insert(entry, encoded_item_key.to_owned(), priority);
        }
    }

    /// Remove an item's entries, given the exact item that was indexed
    ///
    /// Empty partitions are dropped so iteration never visits them.
    pub fn remove(&mut self, encoded_item_key: &str, item: &Item) {
        for def in &ALL_INDEXES {
            let Some((hash, range)) = def.key_strings(item) else {
                continue;
            };
            let entry = keys::entry_key(range, encoded_item_key);
            let Some(partitions) = self.partitions.get_mut(def.index_name) else {
                continue;
            };
            if let Some(map) = partitions.get_mut(hash) {
                map.remove(&entry);
                if map.is_empty() {
                    partitions.remove(hash);
                }
            }
            if partitions.is_empty() {
                self.partitions.remove(def.index_name);
            }
        }
    }

    /// The ordered map backing one hash partition of one index, if any
    pub fn partition(&self, index_name: &str, hash: &str) -> Option<&OrderedMap> {
        self.partitions.get(index_name)?.get(hash)
    }

    /// The number of entries an index currently holds across all partitions
    pub fn entry_count(&self, index_name: &str) -> usize {
        self.partitions
            .get(index_name)
            .map(|p| p.values().map(OrderedMap::len).sum())
            .unwrap_or(0)
    }

    /// Iterate the candidates of one index partition in order
    ///
    /// `lower`/`upper` narrow the iteration to a range of encoded entry
    /// keys (see [`crate::expr::key`] for how range conditions map onto
    /// them). `exclusive_start` skips every entry at or before (at or
    /// after, in reverse) the entry it names.
    pub fn iterate_candidates(
        &self,
        index: &IndexDefinition,
        hash: &str,
        lower: Option<Bound>,
        upper: Option<Bound>,
        direction: Direction,
        exclusive_start: Option<ExclusiveStart<'_>>,
    ) -> Option<Range<'_>> {
        let map = self.partition(index.index_name, hash)?;
        let (mut lower, mut upper) = (lower, upper);
        if let Some(start) = exclusive_start {
            let resume = Bound::exclusive(keys::entry_key(start.range, start.item_key));
            match direction {
                Direction::Forward => lower = Some(tighter_lower(lower, resume)),
                Direction::Reverse => upper = Some(tighter_upper(upper, resume)),
            }
        }
        Some(map.range(lower, upper, direction))
    }

    /// Drop every entry of every index
    pub fn clear(&mut self) {
        self.partitions.clear();
    }
}

fn tighter_lower(current: Option<Bound>, candidate: Bound) -> Bound {
    match current {
        None => candidate,
        Some(current) => match current.key.cmp(&candidate.key) {
            Ordering::Greater => current,
            Ordering::Less => candidate,
            Ordering::Equal if current.inclusive => candidate,
            Ordering::Equal => current,
        },
    }
}

fn tighter_upper(current: Option<Bound>, candidate: Bound) -> Bound {
    match current {
        None => candidate,
        Some(current) => match current.key.cmp(&candidate.key) {
            Ordering::Less => current,
            Ordering::Greater => candidate,
            Ordering::Equal if current.inclusive => candidate,
            Ordering::Equal => current,
        },
    }
}
