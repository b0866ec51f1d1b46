//! Key attributes and index definitions for the fixed single-table schema
//!
//! The table carries a composite string primary key under the `PK` and `SK`
//! attributes. An item participates in a global secondary index `GSIn`
//! exactly when both `GSInPK` and `GSInSK` are present as strings; indexes
//! are sparse otherwise. `GSI1` is recognized at the wire level but excluded
//! from the in-memory engine by policy (see [`crate::manifest`]).

use crate::{AttributeValue, Item};

/// The partition key attribute of the table
pub const PARTITION_KEY: &str = "PK";

/// The sort key attribute of the table
pub const SORT_KEY: &str = "SK";

/// The name of the primary index
pub const PRIMARY_INDEX_NAME: &str = "primary";

/// Separator between the components of an encoded key
const NUL: char = '\0';

/// The definition of an index over the table
///
/// Both the primary index and every global secondary index have a hash and a
/// range attribute, and every index projects the full item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexDefinition {
    /// The name of the index
    pub index_name: &'static str,

    /// The attribute providing the index hash key
    pub hash_key: &'static str,

    /// The attribute providing the index range key
    pub range_key: &'static str,
}

impl IndexDefinition {
    /// Whether this is the primary index
    #[inline]
    pub fn is_primary(&self) -> bool {
        self.index_name == PRIMARY_INDEX_NAME
    }

    /// Extract this index's `(hash, range)` pair from an item
    ///
    /// Returns `None` unless both attributes are present as strings; an item
    /// without them simply does not participate in the index.
    pub fn key_strings<'a>(&self, item: &'a Item) -> Option<(&'a str, &'a str)> {
        let hash = match item.get(self.hash_key) {
            Some(AttributeValue::S(s)) => s.as_str(),
            _ => return None,
        };
        let range = match item.get(self.range_key) {
            Some(AttributeValue::S(s)) => s.as_str(),
            _ => return None,
        };
        Some((hash, range))
    }
}

/// The primary index over `(PK, SK)`
pub const PRIMARY: IndexDefinition = IndexDefinition {
    index_name: PRIMARY_INDEX_NAME,
    hash_key: PARTITION_KEY,
    range_key: SORT_KEY,
};

macro_rules! gsi_def {
    ($name:ident: $idx:literal, $pk:literal, $sk:literal) => {
        #[doc = "The global secondary index `"]
        #[doc = $idx]
        #[doc = "` over `("]
        #[doc = $pk]
        #[doc = ", "]
        #[doc = $sk]
        #[doc = ")`"]
        pub const $name: IndexDefinition = IndexDefinition {
            index_name: $idx,
            hash_key: $pk,
            range_key: $sk,
        };
    };
}

gsi_def!(GSI2: "GSI2", "GSI2PK", "GSI2SK");
gsi_def!(GSI3: "GSI3", "GSI3PK", "GSI3SK");
gsi_def!(GSI4: "GSI4", "GSI4PK", "GSI4SK");
gsi_def!(GSI5: "GSI5", "GSI5PK", "GSI5SK");
gsi_def!(GSI6: "GSI6", "GSI6PK", "GSI6SK");
gsi_def!(GSI7: "GSI7", "GSI7PK", "GSI7SK");
gsi_def!(GSI8: "GSI8", "GSI8PK", "GSI8SK");
gsi_def!(GSI9: "GSI9", "GSI9PK", "GSI9SK");
gsi_def!(GSI10: "GSI10", "GSI10PK", "GSI10SK");
gsi_def!(GSI11: "GSI11", "GSI11PK", "GSI11SK");
gsi_def!(GSI12: "GSI12", "GSI12PK", "GSI12SK");
gsi_def!(GSI13: "GSI13", "GSI13PK", "GSI13SK");
gsi_def!(GSI14: "GSI14", "GSI14PK", "GSI14SK");
gsi_def!(GSI15: "GSI15", "GSI15PK", "GSI15SK");
gsi_def!(GSI16: "GSI16", "GSI16PK", "GSI16SK");
gsi_def!(GSI17: "GSI17", "GSI17PK", "GSI17SK");
gsi_def!(GSI18: "GSI18", "GSI18PK", "GSI18SK");
gsi_def!(GSI19: "GSI19", "GSI19PK", "GSI19SK");

/// Every global secondary index recognized by the engine, `GSI2..GSI19`
pub const GLOBAL_SECONDARY_INDEXES: [IndexDefinition; 18] = [
    GSI2, GSI3, GSI4, GSI5, GSI6, GSI7, GSI8, GSI9, GSI10, GSI11, GSI12, GSI13, GSI14, GSI15,
    GSI16, GSI17, GSI18, GSI19,
];

/// Every index maintained by the engine, the primary index first
pub const ALL_INDEXES: [IndexDefinition; 19] = [
    PRIMARY, GSI2, GSI3, GSI4, GSI5, GSI6, GSI7, GSI8, GSI9, GSI10, GSI11, GSI12, GSI13, GSI14,
    GSI15, GSI16, GSI17, GSI18, GSI19,
];

/// Look up an index by name
///
/// `GSI1` is not listed here; it is wire-recognized but excluded by policy
/// and rejected through the manifest before any lookup happens.
pub fn index_named(name: &str) -> Option<&'static IndexDefinition> {
    ALL_INDEXES.iter().find(|def| def.index_name == name)
}

/// The primary key of an item: the `(PK, SK)` string pair
///
/// Ordered ascending by partition key, then sort key, which is the iteration
/// order of scans and snapshots.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    /// The partition key value
    pub partition: String,

    /// The sort key value
    pub sort: String,
}

impl ItemKey {
    /// Create a key from its partition and sort components
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }

    /// Read the primary key out of an item
    ///
    /// Returns `None` unless both `PK` and `SK` are present as strings.
    pub fn from_item(item: &Item) -> Option<Self> {
        match (item.get(PARTITION_KEY), item.get(SORT_KEY)) {
            (Some(AttributeValue::S(pk)), Some(AttributeValue::S(sk))) => {
                Some(Self::new(pk.clone(), sk.clone()))
            }
            _ => None,
        }
    }

    /// The canonical string encoding of the key
    ///
    /// Shaped as `len(PK) ":" PK NUL len(SK) ":" SK`. The length prefixes
    /// keep the encoding collision-free when key values contain the
    /// separator; lengths count bytes.
    pub fn encode(&self) -> String {
        format!(
            "{}:{}{NUL}{}:{}",
            self.partition.len(),
            self.partition,
            self.sort.len(),
            self.sort,
        )
    }

    /// Decode a canonical key encoding produced by [`ItemKey::encode`]
    pub fn decode(encoded: &str) -> Option<Self> {
        let (partition, rest) = decode_component(encoded)?;
        let rest = rest.strip_prefix(NUL)?;
        let (sort, rest) = decode_component(rest)?;
        if !rest.is_empty() {
            return None;
        }
        Some(Self::new(partition, sort))
    }

    /// The key as a two-attribute item, `{PK, SK}`
    pub fn to_key_item(&self) -> Item {
        let mut key = Item::with_capacity(2);
        key.insert(
            PARTITION_KEY.to_owned(),
            AttributeValue::S(self.partition.clone()),
        );
        key.insert(SORT_KEY.to_owned(), AttributeValue::S(self.sort.clone()));
        key
    }
}

fn decode_component(input: &str) -> Option<(&str, &str)> {
    let colon = input.find(':')?;
    let len: usize = input[..colon].parse().ok()?;
    let rest = &input[colon + 1..];
    if !rest.is_char_boundary(len) || rest.len() < len {
        return None;
    }
    Some((&rest[..len], &rest[len..]))
}

/// Compose an index entry key from a range value and an encoded item key
///
/// Entry keys order lexicographically by range value first, then by the item
/// key encoding for deterministic tie-breaking.
pub fn entry_key(range: &str, encoded_item_key: &str) -> String {
    format!("{range}{NUL}{encoded_item_key}")
}
