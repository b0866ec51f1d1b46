//! Mutation tracking and rollback
//!
//! [`ChangeTracker`] wraps a [`MemoryClient`] and watches every write that
//! flows through it. While tracking is enabled, the first write touching a
//! primary key captures that key's pre-image; repeated writes to the same
//! key keep the original capture. [`ChangeTracker::rollback`] replays the
//! journal through batched writes so every touched key is restored to its
//! pre-image, or deleted when it did not exist.
//!
//! Reads pass straight through. Writes performed before
//! [`ChangeTracker::start_tracking`] are not recorded and cannot be rolled
//! back; successive tracking cycles are independent of one another.

use fnv::FnvHashMap;

use crate::{
    client::{
        BatchGetInput, BatchGetOutput, BatchWriteInput, BatchWriteOutput, DeleteInput,
        DeleteOutput, GetInput, GetOutput, PutInput, PutOutput, QueryInput, QueryOutput,
        ScanInput, ScanOutput, TransactWriteInput, TransactWriteOutput, UpdateInput,
        UpdateOutput,
    },
    keys::ItemKey,
    Error, Item, MemoryClient, TableName,
};

#[derive(Debug, Default)]
struct Journal {
    order: Vec<(TableName, ItemKey)>,
    images: FnvHashMap<(TableName, ItemKey), Option<Item>>,
}

/// A document client wrapper that can rewind tracked writes
#[derive(Debug)]
pub struct ChangeTracker {
    client: MemoryClient,
    journal: Option<Journal>,
}

impl ChangeTracker {
    /// Wrap a client; tracking starts disabled
    pub fn new(client: MemoryClient) -> Self {
        Self {
            client,
            journal: None,
        }
    }

    /// The wrapped client
    ///
    /// Writes issued directly against it bypass the tracker and will not be
    /// rolled back.
    pub fn client(&self) -> &MemoryClient {
        &self.client
    }

    /// Unwrap, discarding any active journal
    pub fn into_inner(self) -> MemoryClient {
        self.client
    }

    /// Whether mutations are currently being captured
    pub fn is_tracking(&self) -> bool {
        self.journal.is_some()
    }

    /// Enable capture, discarding any prior journal
    pub fn start_tracking(&mut self) {
        self.journal = Some(Journal::default());
    }

    /// Disable capture and restore every tracked key to its pre-image
    ///
    /// Keys that did not exist when first touched are deleted. Replay goes
    /// through batched writes, twenty-five keys at a time.
    pub fn rollback(&mut self) -> Result<(), Error> {
        let Some(journal) = self.journal.take() else {
            return Ok(());
        };
        tracing::debug!(keys = journal.order.len(), "rolling back tracked writes");

        for chunk in journal.order.chunks(25) {
            let mut batch = BatchWriteInput::new();
            for entry in chunk {
                let image = journal.images.get(entry).and_then(Clone::clone);
                let (table, key) = entry;
                batch = match image {
                    Some(item) => batch.put(table.clone(), item),
                    None => batch.delete(table.clone(), key.to_key_item()),
                };
            }
            self.client.batch_write(batch)?;
        }
        Ok(())
    }

    fn capture(&mut self, table: &TableName, key: ItemKey) {
        let Some(journal) = self.journal.as_mut() else {
            return;
        };
        let entry = (table.clone(), key);
        if journal.images.contains_key(&entry) {
            return;
        }
        let image = self
            .client
            .get(GetInput::new(entry.0.clone(), entry.1.to_key_item()))
            .ok()
            .and_then(|output| output.item);
        journal.order.push(entry.clone());
        journal.images.insert(entry, image);
    }

    fn capture_key_item(&mut self, table: Option<&TableName>, key_item: Option<&Item>) {
        let (Some(table), Some(key_item)) = (table, key_item) else {
            return;
        };
        // A malformed key fails in the underlying operation without
        // mutating anything, so there is nothing to capture.
        if let Some(key) = ItemKey::from_item(key_item) {
            let table = table.clone();
            self.capture(&table, key);
        }
    }

    /// Retrieve a single item; untracked passthrough
    pub fn get(&self, input: GetInput) -> Result<GetOutput, Error> {
        self.client.get(input)
    }

    /// Query an index; untracked passthrough
    pub fn query(&self, input: QueryInput) -> Result<QueryOutput, Error> {
        self.client.query(input)
    }

    /// Scan a table; untracked passthrough
    pub fn scan(&self, input: ScanInput) -> Result<ScanOutput, Error> {
        self.client.scan(input)
    }

    /// Batch-retrieve items; untracked passthrough
    pub fn batch_get(&self, input: BatchGetInput) -> Result<BatchGetOutput, Error> {
        self.client.batch_get(input)
    }

    /// A deterministic snapshot of one table; untracked passthrough
    pub fn snapshot(&self, table: impl AsRef<str>) -> std::collections::BTreeMap<String, Item> {
        self.client.snapshot(table)
    }

    /// Store an item, capturing the pre-image first
    pub fn put(&mut self, input: PutInput) -> Result<PutOutput, Error> {
        self.capture_key_item(input.table_name.as_ref(), input.item.as_ref());
        self.client.put(input)
    }

    /// Update an item, capturing the pre-image first
    pub fn update(&mut self, input: UpdateInput) -> Result<UpdateOutput, Error> {
        self.capture_key_item(input.table_name.as_ref(), input.key.as_ref());
        self.client.update(input)
    }

    /// Delete an item, capturing the pre-image first
    pub fn delete(&mut self, input: DeleteInput) -> Result<DeleteOutput, Error> {
        self.capture_key_item(input.table_name.as_ref(), input.key.as_ref());
        self.client.delete(input)
    }

    /// Apply a batch write, capturing every touched pre-image first
    pub fn batch_write(&mut self, input: BatchWriteInput) -> Result<BatchWriteOutput, Error> {
        if let Some(request_items) = &input.request_items {
            let touched: Vec<(TableName, ItemKey)> = request_items
                .iter()
                .flat_map(|(table, requests)| {
                    requests.iter().filter_map(move |request| {
                        let key_item = request
                            .put_request
                            .as_ref()
                            .and_then(|put| put.item.as_ref())
                            .or_else(|| {
                                request.delete_request.as_ref().and_then(|del| del.key.as_ref())
                            })?;
                        Some((table.clone(), ItemKey::from_item(key_item)?))
                    })
                })
                .collect();
            for (table, key) in touched {
                self.capture(&table, key);
            }
        }
        self.client.batch_write(input)
    }

    /// Apply a transactional write, capturing every touched pre-image first
    pub fn transact_write(
        &mut self,
        input: TransactWriteInput,
    ) -> Result<TransactWriteOutput, Error> {
        if let Some(items) = &input.transact_items {
            let touched: Vec<(TableName, ItemKey)> = items
                .iter()
                .filter_map(|entry| {
                    if let Some(put) = &entry.put {
                        let table = put.table_name.clone()?;
                        return Some((table, ItemKey::from_item(put.item.as_ref()?)?));
                    }
                    if let Some(update) = &entry.update {
                        let table = update.table_name.clone()?;
                        return Some((table, ItemKey::from_item(update.key.as_ref()?)?));
                    }
                    if let Some(delete) = &entry.delete {
                        let table = delete.table_name.clone()?;
                        return Some((table, ItemKey::from_item(delete.key.as_ref()?)?));
                    }
                    None
                })
                .collect();
            for (table, key) in touched {
                self.capture(&table, key);
            }
        }
        self.client.transact_write(input)
    }
}
