#![doc = include_str!("../docs/sandtable.md")]
#![warn(missing_docs)]
#![deny(missing_debug_implementations)]
#![deny(rustdoc::broken_intra_doc_links)]

mod error;
pub mod client;
pub mod expr;
pub mod index;
pub mod keys;
pub mod manifest;
pub mod ordmap;
pub mod table;
pub mod track;

use std::collections::HashMap;

pub use serde_dynamo::AttributeValue;

pub use crate::{
    client::{
        BatchGetInput, BatchGetOutput, BatchWriteInput, BatchWriteOutput, DeleteInput,
        DeleteOutput, GetInput, GetOutput, MemoryClient, PutInput, PutOutput, QueryInput,
        QueryOutput, ScanInput, ScanOutput, TransactWriteInput, TransactWriteOutput,
        UpdateInput, UpdateOutput,
    },
    error::Error,
    track::ChangeTracker,
};

/// An alias for a stored item: a mapping from attribute name to value
pub type Item = HashMap<String, AttributeValue>;

/// The name of a table hosted by the in-memory engine
#[aliri_braid::braid(serde)]
pub struct TableName;

/// The environment tag under which the in-memory engine may be constructed
pub const TEST_ENVIRONMENT: &str = "test";

/// Configuration for constructing a [`MemoryClient`]
///
/// The in-memory engine stands in for a networked backend and is only legal
/// in test environments; construction under any other environment tag fails.
/// The table name is optional and may be injected after construction by
/// collaborators that only learn it late.
#[derive(Clone, Debug)]
pub struct Config {
    /// The environment tag the host is running under (e.g. `"test"`)
    pub environment: String,

    /// The default table name, when the host wants to inject one
    pub table_name: Option<TableName>,

    /// The cursor-encryption key of the pagination collaborator
    ///
    /// Carried through the host configuration; the in-memory engine itself
    /// never reads it.
    pub cursor_encryption_key: Option<String>,
}

impl Config {
    /// Create a configuration for the given environment tag
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            table_name: None,
            cursor_encryption_key: None,
        }
    }

    /// Set the default table name
    pub fn table_name(mut self, name: impl Into<TableName>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Set the pagination collaborator's cursor-encryption key
    pub fn cursor_encryption_key(mut self, key: impl Into<String>) -> Self {
        self.cursor_encryption_key = Some(key.into());
        self
    }
}
