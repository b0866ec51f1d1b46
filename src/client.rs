//! The operation surface of the in-memory document store
//!
//! [`MemoryClient`] hosts the nine operations of the emulated service:
//! `get`, `put`, `update`, `delete`, `query`, `scan`, `batch_get`,
//! `batch_write`, and `transact_write`. Inputs and outputs carry the wire
//! field names (`TableName`, `Key`, `ExpressionAttributeValues`, ...) so
//! requests and responses interchange with the hosted service byte for
//! byte. Parameters outside the supported surface land in a flattened
//! extra-parameter map and are rejected through the [`crate::manifest`].
//!
//! Tables are created on first reference; the engine never errors on a
//! missing table, it simply finds nothing there.

use std::collections::{BTreeMap, HashMap};

use fnv::{FnvHashMap, FnvHashSet};
use serde_json::Value as JsonValue;

use crate::{
    expr::{self, Condition, ExprError, Placeholders},
    index::ExclusiveStart,
    keys::{self, IndexDefinition, ItemKey, PARTITION_KEY, SORT_KEY},
    manifest,
    ordmap::Direction,
    table::{validate_key_attributes, TableState},
    AttributeValue, Config, Error, Item, TableName, TableNameRef, TEST_ENVIRONMENT,
};

/// The in-memory document client
///
/// Stands in for the networked document client in tests. All data lives in
/// process memory; every operation is atomic from the caller's point of
/// view and nothing is shared until the caller shares the client itself.
#[derive(Debug, Default)]
pub struct MemoryClient {
    tables: FnvHashMap<TableName, TableState>,
    table_name: Option<TableName>,
}

impl MemoryClient {
    /// Construct the client from a [`Config`]
    ///
    /// Fails outside the `test` environment: the in-memory engine is a test
    /// double, not a place for real data.
    pub fn from_config(config: Config) -> Result<Self, Error> {
        if config.environment != TEST_ENVIRONMENT {
            return Err(Error::validation(format!(
                "The in-memory document store may only be instantiated in the \
                 {TEST_ENVIRONMENT} environment; environment: {}",
                config.environment
            )));
        }
        Ok(Self {
            tables: FnvHashMap::default(),
            table_name: config.table_name,
        })
    }

    /// The injected default table name, if any
    pub fn table_name(&self) -> Option<&TableNameRef> {
        self.table_name.as_deref()
    }

    /// Inject the default table name after construction
    pub fn set_table_name(&mut self, name: impl Into<TableName>) {
        self.table_name = Some(name.into());
    }

    /// A deterministic `PK__SK → item` snapshot of one table
    pub fn snapshot(&self, table: impl AsRef<str>) -> BTreeMap<String, Item> {
        self.tables
            .get(TableNameRef::from_str(table.as_ref()))
            .map(TableState::snapshot)
            .unwrap_or_default()
    }

    fn state(&self, table: &TableName) -> Option<&TableState> {
        self.tables.get(table)
    }

    fn state_mut(&mut self, table: &TableName) -> &mut TableState {
        self.tables.entry(table.clone()).or_default()
    }

    /// Retrieve a single item by primary key
    pub fn get(&self, input: GetInput) -> Result<GetOutput, Error> {
        manifest::check_params("get", &input.extra)?;
        let table = require_table(input.table_name)?;
        let key = require_key(input.key)?;
        let _span = op_span("GetItem", &table).entered();

        let item = self.state(&table).and_then(|state| state.get(&key));
        Ok(GetOutput { item })
    }

    /// Store an item, optionally guarded by a condition expression
    pub fn put(&mut self, input: PutInput) -> Result<PutOutput, Error> {
        manifest::check_params("put", &input.extra)?;
        let table = require_table(input.table_name)?;
        let item = input.item.ok_or_else(|| Error::missing_param("Item"))?;
        let _span = op_span("PutItem", &table).entered();

        let placeholders = Placeholders::new(
            input.expression_attribute_names.as_ref(),
            input.expression_attribute_values.as_ref(),
        );
        let condition = parse_condition_opt(input.condition_expression.as_deref(), &placeholders)?;

        validate_key_attributes(&item)?;
        let key = ItemKey::from_item(&item).expect("key attributes were just validated");
        let state = self.state_mut(&table);
        check_condition(condition.as_ref(), state.get(&key).as_ref())?;
        state.put(item)?;
        Ok(PutOutput {})
    }

    /// Apply an update expression to an item, upserting when absent
    pub fn update(&mut self, input: UpdateInput) -> Result<UpdateOutput, Error> {
        manifest::check_params("update", &input.extra)?;
        let table = require_table(input.table_name)?;
        let key = require_key(input.key)?;
        let expression = input
            .update_expression
            .ok_or_else(|| Error::missing_param("UpdateExpression"))?;
        let all_new = match input.return_values.as_deref() {
            None | Some("NONE") => false,
            Some("ALL_NEW") => true,
            Some(_) => return Err(Error::validation("Return values set to invalid value")),
        };
        let _span = op_span("UpdateItem", &table).entered();

        let placeholders = Placeholders::new(
            input.expression_attribute_names.as_ref(),
            input.expression_attribute_values.as_ref(),
        );
        let update = expr::parse_update(&expression, &placeholders).map_err(expr_error)?;
        let condition = parse_condition_opt(input.condition_expression.as_deref(), &placeholders)?;

        let state = self.state_mut(&table);
        let current = state.get(&key);
        check_condition(condition.as_ref(), current.as_ref())?;

        let mut item = current.unwrap_or_else(|| key.to_key_item());
        update.apply(&mut item).map_err(expr_error)?;

        if all_new {
            state.put(item.clone())?;
            Ok(UpdateOutput {
                attributes: Some(item),
            })
        } else {
            state.put(item)?;
            Ok(UpdateOutput { attributes: None })
        }
    }

    /// Delete an item, optionally guarded by a condition expression
    pub fn delete(&mut self, input: DeleteInput) -> Result<DeleteOutput, Error> {
        manifest::check_params("delete", &input.extra)?;
        let table = require_table(input.table_name)?;
        let key = require_key(input.key)?;
        let _span = op_span("DeleteItem", &table).entered();

        let placeholders = Placeholders::new(
            input.expression_attribute_names.as_ref(),
            input.expression_attribute_values.as_ref(),
        );
        let condition = parse_condition_opt(input.condition_expression.as_deref(), &placeholders)?;

        let state = self.state_mut(&table);
        check_condition(condition.as_ref(), state.get(&key).as_ref())?;
        state.delete(&key);
        Ok(DeleteOutput {})
    }

    /// Query an index partition with a key condition
    pub fn query(&self, input: QueryInput) -> Result<QueryOutput, Error> {
        manifest::check_params("query", &input.extra)?;
        let table = require_table(input.table_name)?;
        let expression = input.key_condition_expression.ok_or_else(|| {
            Error::validation(
                "Either the KeyConditions or KeyConditionExpression parameter must be \
                 specified in the request.",
            )
        })?;
        let index = resolve_index("query", input.index_name.as_deref())?;
        if input.consistent_read == Some(true) && !index.is_primary() {
            return Err(Error::validation(
                "Consistent reads are not supported on global secondary indexes",
            ));
        }
        let limit = validate_limit(input.limit)?;
        let _span = op_span("Query", &table).entered();

        let placeholders = Placeholders::new(
            input.expression_attribute_names.as_ref(),
            input.expression_attribute_values.as_ref(),
        );
        let parsed = expr::parse_key_condition(&expression, &placeholders).map_err(expr_error)?;
        if parsed.hash_attribute != index.hash_key {
            return Err(missed_key_schema(index.hash_key));
        }
        if let Some(range) = &parsed.range {
            if range.attribute != index.range_key {
                return Err(missed_key_schema(index.range_key));
            }
        }
        let filter = parse_condition_opt(input.filter_expression.as_deref(), &placeholders)?;
        let direction = if input.scan_index_forward.unwrap_or(true) {
            Direction::Forward
        } else {
            Direction::Reverse
        };
        let (lower, upper) = parsed
            .range
            .as_ref()
            .map(|range| range.condition.bounds())
            .unwrap_or((None, None));
        let start = input
            .exclusive_start_key
            .as_ref()
            .map(|start| validate_query_start(start, index))
            .transpose()?;

        let mut items = Vec::new();
        let mut scanned_count = 0usize;
        let mut last_evaluated_key = None;

        if let Some(state) = self.state(&table) {
            let start = start.as_ref().map(|(range, encoded)| ExclusiveStart {
                range,
                item_key: encoded,
            });
            let candidates = state.indexes().iterate_candidates(
                index,
                &parsed.hash_value,
                lower,
                upper,
                direction,
                start,
            );
            if let Some(candidates) = candidates {
                for (_, item_key) in candidates {
                    let Some(item) = state.get_encoded(item_key) else {
                        continue;
                    };
                    scanned_count += 1;
                    if let Some(filter) = &filter {
                        if !filter.evaluate(&item) {
                            continue;
                        }
                    }
                    items.push(item);
                    if Some(scanned_count) == limit {
                        let included = items.last().expect("an item was just included");
                        last_evaluated_key = Some(index_key_of(included, index));
                        break;
                    }
                }
            }
        }

        Ok(QueryOutput {
            count: items.len(),
            scanned_count,
            items,
            last_evaluated_key,
        })
    }

    /// Scan the table in ascending `(PK, SK)` order
    pub fn scan(&self, input: ScanInput) -> Result<ScanOutput, Error> {
        manifest::check_params("scan", &input.extra)?;
        let table = require_table(input.table_name)?;
        let limit = validate_limit(input.limit)?;
        let _span = op_span("Scan", &table).entered();

        let placeholders = Placeholders::new(
            input.expression_attribute_names.as_ref(),
            input.expression_attribute_values.as_ref(),
        );
        let filter = parse_condition_opt(input.filter_expression.as_deref(), &placeholders)?;
        let start = input
            .exclusive_start_key
            .as_ref()
            .map(|start| {
                ItemKey::from_item(start)
                    .ok_or_else(|| Error::validation("The provided starting key is invalid"))
            })
            .transpose()?;

        let mut items = Vec::new();
        let mut scanned_count = 0usize;
        let mut last_evaluated_key = None;

        if let Some(state) = self.state(&table) {
            for (key, item) in state.iter_from(start.as_ref()) {
                scanned_count += 1;
                if let Some(filter) = &filter {
                    if !filter.evaluate(item) {
                        continue;
                    }
                }
                items.push(item.clone());
                if Some(scanned_count) == limit {
                    last_evaluated_key = Some(key.to_key_item());
                    break;
                }
            }
        }

        Ok(ScanOutput {
            count: items.len(),
            scanned_count,
            items,
            last_evaluated_key,
        })
    }

    /// Retrieve up to one hundred items per table in one call
    pub fn batch_get(&self, input: BatchGetInput) -> Result<BatchGetOutput, Error> {
        manifest::check_params("batchGet", &input.extra)?;
        let request_items = input
            .request_items
            .ok_or_else(|| Error::missing_param("RequestItems"))?;

        let mut table_names: Vec<&TableName> = request_items.keys().collect();
        table_names.sort();

        let mut responses = HashMap::new();
        for table in table_names {
            let request = &request_items[table];
            manifest::check_nested_params("batchGet", "RequestItems", &request.extra)?;
            let key_list = request
                .keys
                .as_ref()
                .ok_or_else(|| Error::missing_param("Keys"))?;
            if key_list.len() > 100 {
                return Err(Error::validation(
                    "Too many items requested for the BatchGetItem call",
                ));
            }

            let state = self.state(table);
            let mut seen = FnvHashSet::default();
            let mut found = Vec::new();
            for key_item in key_list {
                let key = ItemKey::from_item(key_item).ok_or_else(Error::invalid_key_shape)?;
                if !seen.insert(key.clone()) {
                    return Err(Error::validation(
                        "Provided list of item keys contains duplicates",
                    ));
                }
                if let Some(item) = state.and_then(|state| state.get(&key)) {
                    found.push(item);
                }
            }
            responses.insert(table.clone(), found);
        }

        Ok(BatchGetOutput { responses })
    }

    /// Apply up to twenty-five unconditional writes per table in one call
    pub fn batch_write(&mut self, input: BatchWriteInput) -> Result<BatchWriteOutput, Error> {
        manifest::check_params("batchWrite", &input.extra)?;
        let request_items = input
            .request_items
            .ok_or_else(|| Error::missing_param("RequestItems"))?;

        let mut table_names: Vec<&TableName> = request_items.keys().collect();
        table_names.sort();

        // Validate every request before mutating anything; a malformed
        // batch must not apply partially.
        for table in &table_names {
            let requests = &request_items[*table];
            if requests.len() > 25 {
                return Err(Error::validation(
                    "Too many items requested for the BatchWriteItem call",
                ));
            }
            if requests.is_empty() {
                return Err(Error::validation(
                    "1 validation error detected: Value at 'requestItems' failed to satisfy \
                     constraint: Member must have length greater than or equal to 1",
                ));
            }
            for request in requests {
                if !request.extra.is_empty() {
                    return Err(Error::validation(
                        "One or more parameter values were invalid: A WriteRequest must \
                         specify exactly one of PutRequest or DeleteRequest",
                    ));
                }
                match (&request.put_request, &request.delete_request) {
                    (Some(put), None) => {
                        let item = put
                            .item
                            .as_ref()
                            .ok_or_else(|| Error::missing_param("Item"))?;
                        validate_key_attributes(item)?;
                    }
                    (None, Some(delete)) => {
                        let key = delete
                            .key
                            .as_ref()
                            .ok_or_else(|| Error::missing_param("Key"))?;
                        ItemKey::from_item(key).ok_or_else(Error::invalid_key_shape)?;
                    }
                    _ => {
                        return Err(Error::validation(
                            "One or more parameter values were invalid: A WriteRequest must \
                             specify exactly one of PutRequest or DeleteRequest",
                        ))
                    }
                }
            }
        }

        for table in table_names {
            let requests = &request_items[table];
            let _span = op_span("BatchWriteItem", table).entered();
            let state = self.state_mut(table);
            for request in requests {
                match (&request.put_request, &request.delete_request) {
                    (Some(put), None) => {
                        let item = put.item.clone().expect("validated above");
                        state.put(item)?;
                    }
                    (None, Some(delete)) => {
                        let key = delete.key.as_ref().expect("validated above");
                        let key = ItemKey::from_item(key).expect("validated above");
                        state.delete(&key);
                    }
                    _ => unreachable!("request shapes were validated above"),
                }
            }
        }

        Ok(BatchWriteOutput {
            unprocessed_items: HashMap::new(),
        })
    }

    /// Apply up to one hundred writes atomically, all or nothing
    pub fn transact_write(
        &mut self,
        input: TransactWriteInput,
    ) -> Result<TransactWriteOutput, Error> {
        manifest::check_params("transactWrite", &input.extra)?;
        let items = input
            .transact_items
            .ok_or_else(|| Error::missing_param("TransactItems"))?;
        if items.is_empty() {
            return Err(Error::validation(
                "1 validation error detected: Value at 'transactItems' failed to satisfy \
                 constraint: Member must have length greater than or equal to 1",
            ));
        }
        if items.len() > 100 {
            return Err(Error::validation(
                "1 validation error detected: Value at 'transactItems' failed to satisfy \
                 constraint: Member must have length less than or equal to 100",
            ));
        }

        // Plan first: shapes, key shapes, and duplicate detection happen
        // before any mutation.
        let mut planned = Vec::with_capacity(items.len());
        let mut seen: FnvHashSet<(TableName, ItemKey)> = FnvHashSet::default();
        for entry in &items {
            let op = plan_transact_op(entry)?;
            if !seen.insert((op.table.clone(), op.key.clone())) {
                return Err(Error::validation(
                    "Transaction request cannot include multiple operations on one item",
                ));
            }
            planned.push(op);
        }

        let total = planned.len();
        let mut journal: Vec<(TableName, ItemKey, Option<Item>)> = Vec::new();
        for (position, op) in planned.into_iter().enumerate() {
            match self.apply_transact_op(op, &mut journal) {
                Ok(()) => {}
                Err(TransactFailure::ConditionFailed) => {
                    self.rollback_journal(journal);
                    return Err(Error::TransactionCanceled {
                        reasons: reason_mirror(total, position),
                    });
                }
                Err(TransactFailure::KeyAttribute) => {
                    self.rollback_journal(journal);
                    return Err(Error::TransactionCanceled {
                        reasons: "[ValidationError]".to_owned(),
                    });
                }
                Err(TransactFailure::Validation(error)) => {
                    self.rollback_journal(journal);
                    return Err(error);
                }
            }
        }

        Ok(TransactWriteOutput {})
    }

    fn apply_transact_op(
        &mut self,
        op: PlannedOp<'_>,
        journal: &mut Vec<(TableName, ItemKey, Option<Item>)>,
    ) -> Result<(), TransactFailure> {
        let PlannedOp { table, key, kind } = op;
        let state = self.state_mut(&table);
        let current = state.get(&key);

        match kind {
            TransactOpKind::Put { item, condition } => {
                let condition = parse_condition_opt(condition.expression, &condition.placeholders())
                    .map_err(TransactFailure::Validation)?;
                if !condition_holds(condition.as_ref(), current.as_ref()) {
                    return Err(TransactFailure::ConditionFailed);
                }
                journal.push((table, key, current));
                state
                    .put(item.clone())
                    .map_err(TransactFailure::Validation)?;
            }
            TransactOpKind::Update {
                expression,
                condition,
            } => {
                let placeholders = condition.placeholders();
                let update = expr::parse_update(expression, &placeholders)
                    .map_err(|err| TransactFailure::from_expr(err))?;
                let parsed = parse_condition_opt(condition.expression, &placeholders)
                    .map_err(TransactFailure::Validation)?;
                if !condition_holds(parsed.as_ref(), current.as_ref()) {
                    return Err(TransactFailure::ConditionFailed);
                }
                let mut item = current.clone().unwrap_or_else(|| key.to_key_item());
                update
                    .apply(&mut item)
                    .map_err(|err| TransactFailure::from_expr(err))?;
                journal.push((table, key, current));
                state.put(item).map_err(TransactFailure::Validation)?;
            }
            TransactOpKind::Delete { condition } => {
                let parsed = parse_condition_opt(condition.expression, &condition.placeholders())
                    .map_err(TransactFailure::Validation)?;
                if !condition_holds(parsed.as_ref(), current.as_ref()) {
                    return Err(TransactFailure::ConditionFailed);
                }
                journal.push((table, key.clone(), current));
                state.delete(&key);
            }
            TransactOpKind::ConditionCheck { condition } => {
                let expression = condition
                    .expression
                    .ok_or_else(|| {
                        TransactFailure::Validation(Error::missing_param("ConditionExpression"))
                    })?;
                let parsed = parse_condition_opt(Some(expression), &condition.placeholders())
                    .map_err(TransactFailure::Validation)?;
                if !condition_holds(parsed.as_ref(), current.as_ref()) {
                    return Err(TransactFailure::ConditionFailed);
                }
            }
        }
        Ok(())
    }

    fn rollback_journal(&mut self, journal: Vec<(TableName, ItemKey, Option<Item>)>) {
        tracing::debug!(entries = journal.len(), "rolling back transaction journal");
        for (table, key, image) in journal.into_iter().rev() {
            let state = self.state_mut(&table);
            match image {
                Some(item) => {
                    state
                        .put(item)
                        .expect("pre-image was a previously valid stored item");
                }
                None => {
                    state.delete(&key);
                }
            }
        }
    }
}

fn op_span(operation: &'static str, table: &TableName) -> tracing::Span {
    tracing::debug_span!(
        "sandtable.operation",
        db.operation = operation,
        db.name = %table,
    )
}

fn require_table(table: Option<TableName>) -> Result<TableName, Error> {
    table.ok_or_else(|| Error::missing_param("TableName"))
}

fn require_key(key: Option<Item>) -> Result<ItemKey, Error> {
    let key = key.ok_or_else(|| Error::missing_param("Key"))?;
    ItemKey::from_item(&key).ok_or_else(Error::invalid_key_shape)
}

fn expr_error(err: ExprError) -> Error {
    match err {
        ExprError::Unsupported { message }
        | ExprError::Invalid { message }
        | ExprError::KeyAttribute { message } => Error::Validation { message },
    }
}

fn parse_condition_opt(
    expression: Option<&str>,
    placeholders: &Placeholders<'_>,
) -> Result<Option<Condition>, Error> {
    expression
        .map(|expression| expr::parse_condition(expression, placeholders).map_err(expr_error))
        .transpose()
}

fn condition_holds(condition: Option<&Condition>, current: Option<&Item>) -> bool {
    match condition {
        Some(condition) => {
            let empty = Item::new();
            condition.evaluate(current.unwrap_or(&empty))
        }
        None => true,
    }
}

fn check_condition(condition: Option<&Condition>, current: Option<&Item>) -> Result<(), Error> {
    if condition_holds(condition, current) {
        Ok(())
    } else {
        Err(Error::ConditionalCheckFailed)
    }
}

fn validate_limit(limit: Option<i64>) -> Result<Option<usize>, Error> {
    match limit {
        None => Ok(None),
        Some(n) if n >= 1 => Ok(Some(n as usize)),
        Some(_) => Err(Error::validation("Limit must be greater than or equal to 1")),
    }
}

fn resolve_index(
    method: &'static str,
    index_name: Option<&str>,
) -> Result<&'static IndexDefinition, Error> {
    match index_name {
        None => Ok(&keys::PRIMARY),
        Some(name) if manifest::is_excluded_index(name) => {
            Err(manifest::excluded_index_error(method, name))
        }
        Some(name) => keys::index_named(name).ok_or_else(|| {
            Error::validation(format!("The table does not have the specified index: {name}"))
        }),
    }
}

fn missed_key_schema(attribute: &str) -> Error {
    Error::validation(format!(
        "Query condition missed key schema element: {attribute}"
    ))
}

/// Validate a query `ExclusiveStartKey` and derive the resume position
fn validate_query_start(
    start: &Item,
    index: &IndexDefinition,
) -> Result<(String, String), Error> {
    let invalid = || Error::validation("The provided starting key is invalid");
    let key = ItemKey::from_item(start).ok_or_else(invalid)?;
    if !index.is_primary() {
        match start.get(index.hash_key) {
            Some(AttributeValue::S(_)) => {}
            _ => return Err(invalid()),
        }
    }
    let range = match start.get(index.range_key) {
        Some(AttributeValue::S(s)) => s.clone(),
        _ => return Err(invalid()),
    };
    Ok((range, key.encode()))
}

/// The key object a paginated read stops at: the primary key plus the
/// selected index's hash and range attributes
fn index_key_of(item: &Item, index: &IndexDefinition) -> Item {
    let mut key = Item::new();
    for attribute in [PARTITION_KEY, SORT_KEY, index.hash_key, index.range_key] {
        if let Some(value) = item.get(attribute) {
            key.insert(attribute.to_owned(), value.clone());
        }
    }
    key
}

fn reason_mirror(total: usize, failed_position: usize) -> String {
    let reasons: Vec<&str> = (0..total)
        .map(|i| {
            if i == failed_position {
                "ConditionalCheckFailed"
            } else {
                "None"
            }
        })
        .collect();
    format!("[{}]", reasons.join(", "))
}

struct PlannedOp<'a> {
    table: TableName,
    key: ItemKey,
    kind: TransactOpKind<'a>,
}

enum TransactOpKind<'a> {
    Put {
        item: &'a Item,
        condition: ConditionParts<'a>,
    },
    Update {
        expression: &'a str,
        condition: ConditionParts<'a>,
    },
    Delete {
        condition: ConditionParts<'a>,
    },
    ConditionCheck {
        condition: ConditionParts<'a>,
    },
}

struct ConditionParts<'a> {
    expression: Option<&'a str>,
    names: Option<&'a HashMap<String, String>>,
    values: Option<&'a Item>,
}

impl<'a> ConditionParts<'a> {
    fn placeholders(&self) -> Placeholders<'a> {
        Placeholders::new(self.names, self.values)
    }
}

enum TransactFailure {
    ConditionFailed,
    KeyAttribute,
    Validation(Error),
}

impl TransactFailure {
    fn from_expr(err: ExprError) -> Self {
        match err {
            ExprError::KeyAttribute { .. } => Self::KeyAttribute,
            other => Self::Validation(expr_error(other)),
        }
    }
}

fn plan_transact_op<'a>(entry: &'a TransactWriteItem) -> Result<PlannedOp<'a>, Error> {
    let shape_error = || {
        Error::validation(
            "One or more parameter values were invalid: A TransactWriteItem must specify \
             exactly one of Put, Update, Delete or ConditionCheck",
        )
    };
    let operations_set = [
        entry.put.is_some(),
        entry.update.is_some(),
        entry.delete.is_some(),
        entry.condition_check.is_some(),
    ]
    .into_iter()
    .filter(|set| *set)
    .count();
    if operations_set != 1 || !entry.extra.is_empty() {
        return Err(shape_error());
    }

    if let Some(put) = &entry.put {
        let table = require_table(put.table_name.clone())?;
        let item = put.item.as_ref().ok_or_else(|| Error::missing_param("Item"))?;
        validate_key_attributes(item)?;
        let key = ItemKey::from_item(item).expect("key attributes were just validated");
        return Ok(PlannedOp {
            table,
            key,
            kind: TransactOpKind::Put {
                item,
                condition: ConditionParts {
                    expression: put.condition_expression.as_deref(),
                    names: put.expression_attribute_names.as_ref(),
                    values: put.expression_attribute_values.as_ref(),
                },
            },
        });
    }
    if let Some(update) = &entry.update {
        let table = require_table(update.table_name.clone())?;
        let key = require_key(update.key.clone())?;
        let expression = update
            .update_expression
            .as_deref()
            .ok_or_else(|| Error::missing_param("UpdateExpression"))?;
        return Ok(PlannedOp {
            table,
            key,
            kind: TransactOpKind::Update {
                expression,
                condition: ConditionParts {
                    expression: update.condition_expression.as_deref(),
                    names: update.expression_attribute_names.as_ref(),
                    values: update.expression_attribute_values.as_ref(),
                },
            },
        });
    }
    if let Some(delete) = &entry.delete {
        let table = require_table(delete.table_name.clone())?;
        let key = require_key(delete.key.clone())?;
        return Ok(PlannedOp {
            table,
            key,
            kind: TransactOpKind::Delete {
                condition: ConditionParts {
                    expression: delete.condition_expression.as_deref(),
                    names: delete.expression_attribute_names.as_ref(),
                    values: delete.expression_attribute_values.as_ref(),
                },
            },
        });
    }
    let check = entry.condition_check.as_ref().expect("shape validated above");
    let table = require_table(check.table_name.clone())?;
    let key = require_key(check.key.clone())?;
    Ok(PlannedOp {
        table,
        key,
        kind: TransactOpKind::ConditionCheck {
            condition: ConditionParts {
                expression: check.condition_expression.as_deref(),
                names: check.expression_attribute_names.as_ref(),
                values: check.expression_attribute_values.as_ref(),
            },
        },
    })
}

macro_rules! expression_setters {
    () => {
        /// Set the condition expression
        pub fn condition(mut self, expression: impl Into<String>) -> Self {
            self.condition_expression = Some(expression.into());
            self
        }

        /// Set the `ExpressionAttributeNames` substitutions
        pub fn names(mut self, names: HashMap<String, String>) -> Self {
            self.expression_attribute_names = Some(names);
            self
        }

        /// Set the `ExpressionAttributeValues` substitutions
        pub fn values(mut self, values: Item) -> Self {
            self.expression_attribute_values = Some(values);
            self
        }
    };
}

/// Input to [`MemoryClient::get`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GetInput {
    /// `TableName`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<TableName>,

    /// `Key`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Item>,

    /// `ConsistentRead`; honored trivially, the data is always consistent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// Any parameter outside the supported surface
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

impl GetInput {
    /// Prepare a get for a table and key
    pub fn new(table: impl Into<TableName>, key: Item) -> Self {
        Self {
            table_name: Some(table.into()),
            key: Some(key),
            ..Self::default()
        }
    }

    /// Request a strongly consistent read
    pub fn consistent_read(mut self, consistent: bool) -> Self {
        self.consistent_read = Some(consistent);
        self
    }
}

/// Output of [`MemoryClient::get`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GetOutput {
    /// The found item, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
}

/// Input to [`MemoryClient::put`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PutInput {
    /// `TableName`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<TableName>,

    /// `Item`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,

    /// `ConditionExpression`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// `ExpressionAttributeNames`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_names: Option<HashMap<String, String>>,

    /// `ExpressionAttributeValues`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_values: Option<Item>,

    /// Any parameter outside the supported surface
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

impl PutInput {
    /// Prepare a put of an item into a table
    pub fn new(table: impl Into<TableName>, item: Item) -> Self {
        Self {
            table_name: Some(table.into()),
            item: Some(item),
            ..Self::default()
        }
    }

    expression_setters!();
}

/// Output of [`MemoryClient::put`]
#[derive(Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct PutOutput {}

/// Input to [`MemoryClient::update`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct UpdateInput {
    /// `TableName`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<TableName>,

    /// `Key`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Item>,

    /// `UpdateExpression`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_expression: Option<String>,

    /// `ConditionExpression`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// `ExpressionAttributeNames`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_names: Option<HashMap<String, String>>,

    /// `ExpressionAttributeValues`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_values: Option<Item>,

    /// `ReturnValues`, either `NONE` or `ALL_NEW`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<String>,

    /// Any parameter outside the supported surface
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

impl UpdateInput {
    /// Prepare an update of the item at a key
    pub fn new(table: impl Into<TableName>, key: Item, expression: impl Into<String>) -> Self {
        Self {
            table_name: Some(table.into()),
            key: Some(key),
            update_expression: Some(expression.into()),
            ..Self::default()
        }
    }

    /// Ask for the full post-update item back
    pub fn return_all_new(mut self) -> Self {
        self.return_values = Some("ALL_NEW".to_owned());
        self
    }

    expression_setters!();
}

/// Output of [`MemoryClient::update`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct UpdateOutput {
    /// The full post-update item when `ReturnValues = ALL_NEW`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Item>,
}

/// Input to [`MemoryClient::delete`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DeleteInput {
    /// `TableName`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<TableName>,

    /// `Key`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Item>,

    /// `ConditionExpression`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// `ExpressionAttributeNames`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_names: Option<HashMap<String, String>>,

    /// `ExpressionAttributeValues`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_values: Option<Item>,

    /// Any parameter outside the supported surface
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

impl DeleteInput {
    /// Prepare a delete of the item at a key
    pub fn new(table: impl Into<TableName>, key: Item) -> Self {
        Self {
            table_name: Some(table.into()),
            key: Some(key),
            ..Self::default()
        }
    }

    expression_setters!();
}

/// Output of [`MemoryClient::delete`]
#[derive(Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct DeleteOutput {}

/// Input to [`MemoryClient::query`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct QueryInput {
    /// `TableName`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<TableName>,

    /// `IndexName`; absent means the primary index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// `KeyConditionExpression`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_condition_expression: Option<String>,

    /// `FilterExpression`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// `ExpressionAttributeNames`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_names: Option<HashMap<String, String>>,

    /// `ExpressionAttributeValues`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_values: Option<Item>,

    /// `Limit`; must be at least one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,

    /// `ExclusiveStartKey`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_key: Option<Item>,

    /// `ScanIndexForward`; defaults to true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,

    /// `ConsistentRead`; invalid on global secondary indexes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// Any parameter outside the supported surface
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

impl QueryInput {
    /// Prepare a query with a key-condition expression
    pub fn new(table: impl Into<TableName>, key_condition: impl Into<String>) -> Self {
        Self {
            table_name: Some(table.into()),
            key_condition_expression: Some(key_condition.into()),
            ..Self::default()
        }
    }

    /// Query a global secondary index instead of the primary index
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    /// Set the filter expression
    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filter_expression = Some(expression.into());
        self
    }

    /// Cap the number of scanned items
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after a prior `LastEvaluatedKey`
    pub fn exclusive_start_key(mut self, key: Item) -> Self {
        self.exclusive_start_key = Some(key);
        self
    }

    /// Iterate descending instead of ascending
    pub fn scan_index_backward(mut self) -> Self {
        self.scan_index_forward = Some(false);
        self
    }

    /// Request a strongly consistent read
    pub fn consistent_read(mut self, consistent: bool) -> Self {
        self.consistent_read = Some(consistent);
        self
    }

    /// Set the `ExpressionAttributeNames` substitutions
    pub fn names(mut self, names: HashMap<String, String>) -> Self {
        self.expression_attribute_names = Some(names);
        self
    }

    /// Set the `ExpressionAttributeValues` substitutions
    pub fn values(mut self, values: Item) -> Self {
        self.expression_attribute_values = Some(values);
        self
    }
}

/// Output of [`MemoryClient::query`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct QueryOutput {
    /// The matching items, in iteration order
    pub items: Vec<Item>,

    /// The number of items returned
    pub count: usize,

    /// The number of candidates examined
    pub scanned_count: usize,

    /// Where a limited read stopped, for continuation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<Item>,
}

/// Input to [`MemoryClient::scan`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ScanInput {
    /// `TableName`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<TableName>,

    /// `FilterExpression`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// `ExpressionAttributeNames`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_names: Option<HashMap<String, String>>,

    /// `ExpressionAttributeValues`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_values: Option<Item>,

    /// `Limit`; must be at least one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,

    /// `ExclusiveStartKey`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_key: Option<Item>,

    /// Any parameter outside the supported surface
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

impl ScanInput {
    /// Prepare a scan of a table
    pub fn new(table: impl Into<TableName>) -> Self {
        Self {
            table_name: Some(table.into()),
            ..Self::default()
        }
    }

    /// Set the filter expression
    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filter_expression = Some(expression.into());
        self
    }

    /// Cap the number of scanned items
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after a prior `LastEvaluatedKey`
    pub fn exclusive_start_key(mut self, key: Item) -> Self {
        self.exclusive_start_key = Some(key);
        self
    }

    /// Set the `ExpressionAttributeNames` substitutions
    pub fn names(mut self, names: HashMap<String, String>) -> Self {
        self.expression_attribute_names = Some(names);
        self
    }

    /// Set the `ExpressionAttributeValues` substitutions
    pub fn values(mut self, values: Item) -> Self {
        self.expression_attribute_values = Some(values);
        self
    }
}

/// Output of [`MemoryClient::scan`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ScanOutput {
    /// The matching items, ascending by `(PK, SK)`
    pub items: Vec<Item>,

    /// The number of items returned
    pub count: usize,

    /// The number of items examined
    pub scanned_count: usize,

    /// Where a limited read stopped, for continuation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<Item>,
}

/// One table's portion of a batch get
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct KeysAndAttributes {
    /// The keys to fetch, at most one hundred, no duplicates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<Item>>,

    /// `ConsistentRead`; honored trivially
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// Any parameter outside the supported surface
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

/// Input to [`MemoryClient::batch_get`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct BatchGetInput {
    /// `RequestItems`: table name to keys
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_items: Option<HashMap<TableName, KeysAndAttributes>>,

    /// Any parameter outside the supported surface
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

impl BatchGetInput {
    /// Prepare an empty batch get
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table's keys to the request
    pub fn table(mut self, table: impl Into<TableName>, keys: Vec<Item>) -> Self {
        self.request_items
            .get_or_insert_with(HashMap::new)
            .insert(
                table.into(),
                KeysAndAttributes {
                    keys: Some(keys),
                    consistent_read: None,
                    extra: HashMap::new(),
                },
            );
        self
    }
}

/// Output of [`MemoryClient::batch_get`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct BatchGetOutput {
    /// Found items per table, in the order the keys were requested
    pub responses: HashMap<TableName, Vec<Item>>,
}

/// A single batch-write request: exactly one of put or delete
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct WriteRequest {
    /// `PutRequest`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put_request: Option<PutRequest>,

    /// `DeleteRequest`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_request: Option<DeleteRequest>,

    /// Any parameter outside the supported surface
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

/// The put half of a [`WriteRequest`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PutRequest {
    /// The item to store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
}

/// The delete half of a [`WriteRequest`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DeleteRequest {
    /// The key to remove
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Item>,
}

/// Input to [`MemoryClient::batch_write`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct BatchWriteInput {
    /// `RequestItems`: table name to write requests, at most twenty-five
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_items: Option<HashMap<TableName, Vec<WriteRequest>>>,

    /// Any parameter outside the supported surface
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

impl BatchWriteInput {
    /// Prepare an empty batch write
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unconditional put to a table's request list
    pub fn put(mut self, table: impl Into<TableName>, item: Item) -> Self {
        self.request_items
            .get_or_insert_with(HashMap::new)
            .entry(table.into())
            .or_default()
            .push(WriteRequest {
                put_request: Some(PutRequest { item: Some(item) }),
                ..WriteRequest::default()
            });
        self
    }

    /// Add an unconditional delete to a table's request list
    pub fn delete(mut self, table: impl Into<TableName>, key: Item) -> Self {
        self.request_items
            .get_or_insert_with(HashMap::new)
            .entry(table.into())
            .or_default()
            .push(WriteRequest {
                delete_request: Some(DeleteRequest { key: Some(key) }),
                ..WriteRequest::default()
            });
        self
    }
}

/// Output of [`MemoryClient::batch_write`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct BatchWriteOutput {
    /// Writes the engine could not apply; always empty here
    pub unprocessed_items: HashMap<TableName, Vec<WriteRequest>>,
}

/// A transactional put
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TransactPut {
    /// `TableName`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<TableName>,

    /// `Item`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,

    /// `ConditionExpression`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// `ExpressionAttributeNames`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_names: Option<HashMap<String, String>>,

    /// `ExpressionAttributeValues`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_values: Option<Item>,
}

impl TransactPut {
    /// Prepare a transactional put
    pub fn new(table: impl Into<TableName>, item: Item) -> Self {
        Self {
            table_name: Some(table.into()),
            item: Some(item),
            ..Self::default()
        }
    }

    /// Set the condition expression
    pub fn condition(mut self, expression: impl Into<String>) -> Self {
        self.condition_expression = Some(expression.into());
        self
    }

    /// Set the `ExpressionAttributeValues` substitutions
    pub fn values(mut self, values: Item) -> Self {
        self.expression_attribute_values = Some(values);
        self
    }
}

/// A transactional update
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TransactUpdate {
    /// `TableName`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<TableName>,

    /// `Key`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Item>,

    /// `UpdateExpression`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_expression: Option<String>,

    /// `ConditionExpression`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// `ExpressionAttributeNames`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_names: Option<HashMap<String, String>>,

    /// `ExpressionAttributeValues`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_values: Option<Item>,
}

impl TransactUpdate {
    /// Prepare a transactional update
    pub fn new(table: impl Into<TableName>, key: Item, expression: impl Into<String>) -> Self {
        Self {
            table_name: Some(table.into()),
            key: Some(key),
            update_expression: Some(expression.into()),
            ..Self::default()
        }
    }

    /// Set the condition expression
    pub fn condition(mut self, expression: impl Into<String>) -> Self {
        self.condition_expression = Some(expression.into());
        self
    }

    /// Set the `ExpressionAttributeValues` substitutions
    pub fn values(mut self, values: Item) -> Self {
        self.expression_attribute_values = Some(values);
        self
    }
}

/// A transactional delete
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TransactDelete {
    /// `TableName`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<TableName>,

    /// `Key`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Item>,

    /// `ConditionExpression`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// `ExpressionAttributeNames`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_names: Option<HashMap<String, String>>,

    /// `ExpressionAttributeValues`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_values: Option<Item>,
}

impl TransactDelete {
    /// Prepare a transactional delete
    pub fn new(table: impl Into<TableName>, key: Item) -> Self {
        Self {
            table_name: Some(table.into()),
            key: Some(key),
            ..Self::default()
        }
    }

    /// Set the condition expression
    pub fn condition(mut self, expression: impl Into<String>) -> Self {
        self.condition_expression = Some(expression.into());
        self
    }

    /// Set the `ExpressionAttributeValues` substitutions
    pub fn values(mut self, values: Item) -> Self {
        self.expression_attribute_values = Some(values);
        self
    }
}

/// A transactional condition check, asserting without writing
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TransactConditionCheck {
    /// `TableName`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<TableName>,

    /// `Key`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Item>,

    /// `ConditionExpression`; required
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// `ExpressionAttributeNames`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_names: Option<HashMap<String, String>>,

    /// `ExpressionAttributeValues`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_attribute_values: Option<Item>,
}

impl TransactConditionCheck {
    /// Prepare a condition check at a key
    pub fn new(
        table: impl Into<TableName>,
        key: Item,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            table_name: Some(table.into()),
            key: Some(key),
            condition_expression: Some(condition.into()),
            ..Self::default()
        }
    }

    /// Set the `ExpressionAttributeValues` substitutions
    pub fn values(mut self, values: Item) -> Self {
        self.expression_attribute_values = Some(values);
        self
    }
}

/// One entry of a transactional write: exactly one operation set
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TransactWriteItem {
    /// `Put`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<TransactPut>,

    /// `Update`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<TransactUpdate>,

    /// `Delete`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<TransactDelete>,

    /// `ConditionCheck`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_check: Option<TransactConditionCheck>,

    /// Any parameter outside the supported surface
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

impl From<TransactPut> for TransactWriteItem {
    fn from(op: TransactPut) -> Self {
        Self {
            put: Some(op),
            ..Self::default()
        }
    }
}

impl From<TransactUpdate> for TransactWriteItem {
    fn from(op: TransactUpdate) -> Self {
        Self {
            update: Some(op),
            ..Self::default()
        }
    }
}

impl From<TransactDelete> for TransactWriteItem {
    fn from(op: TransactDelete) -> Self {
        Self {
            delete: Some(op),
            ..Self::default()
        }
    }
}

impl From<TransactConditionCheck> for TransactWriteItem {
    fn from(op: TransactConditionCheck) -> Self {
        Self {
            condition_check: Some(op),
            ..Self::default()
        }
    }
}

/// Input to [`MemoryClient::transact_write`]
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TransactWriteInput {
    /// `TransactItems`: between one and one hundred entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transact_items: Option<Vec<TransactWriteItem>>,

    /// Any parameter outside the supported surface
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

impl TransactWriteInput {
    /// Prepare an empty transactional write
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation
    pub fn operation(mut self, op: impl Into<TransactWriteItem>) -> Self {
        self.transact_items
            .get_or_insert_with(Vec::new)
            .push(op.into());
        self
    }
}

/// Output of [`MemoryClient::transact_write`]
#[derive(Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct TransactWriteOutput {}
