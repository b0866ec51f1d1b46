//! End-to-end behavior of the in-memory document store.

use sandtable::{
    AttributeValue, BatchGetInput, BatchWriteInput, Config, DeleteInput, Error, GetInput, Item,
    MemoryClient, PutInput, QueryInput, ScanInput, TransactWriteInput,
};
use sandtable::client::{
    TransactConditionCheck, TransactPut, TransactUpdate, UpdateInput, WriteRequest,
};
use serde_json::json;

const TABLE: &str = "app-table";

fn client() -> MemoryClient {
    MemoryClient::from_config(Config::new("test")).unwrap()
}

fn item(value: serde_json::Value) -> Item {
    serde_dynamo::to_item(value).unwrap()
}

fn key(pk: &str, sk: &str) -> Item {
    item(json!({ "PK": pk, "SK": sk }))
}

fn attr<'a>(item: &'a Item, name: &str) -> &'a AttributeValue {
    item.get(name)
        .unwrap_or_else(|| panic!("attribute {name} must be present"))
}

fn string_of<'a>(item: &'a Item, name: &str) -> &'a str {
    match attr(item, name) {
        AttributeValue::S(s) => s,
        other => panic!("attribute {name} must be a string, got {other:?}"),
    }
}

#[test_log::test]
fn seed_and_query_with_begins_with() {
    let mut client = client();
    for sk in [
        "PROFILE#001",
        "ORDER#001",
        "ORDER#002",
        "ORDER#003",
        "COMMENT#001",
    ] {
        client
            .put(PutInput::new(
                TABLE,
                item(json!({ "PK": "USER#1", "SK": sk })),
            ))
            .unwrap();
    }

    let result = client
        .query(
            QueryInput::new(TABLE, "PK = :pk AND begins_with(SK, :p)")
                .values(item(json!({ ":pk": "USER#1", ":p": "ORDER#" }))),
        )
        .unwrap();

    let sks: Vec<&str> = result.items.iter().map(|i| string_of(i, "SK")).collect();
    assert_eq!(sks, vec!["ORDER#001", "ORDER#002", "ORDER#003"]);
    assert_eq!(result.count, 3);
    assert_eq!(result.scanned_count, 3);
    assert!(result.last_evaluated_key.is_none());
}

#[test_log::test]
fn gsi_query_with_limit_and_continuation() {
    let mut client = client();
    for i in 0..10 {
        client
            .put(PutInput::new(
                TABLE,
                item(json!({
                    "PK": "USER#X",
                    "SK": format!("S#{i:03}"),
                    "GSI2PK": "E#x@e.com",
                    "GSI2SK": format!("S#{i:03}"),
                })),
            ))
            .unwrap();
    }

    let first = client
        .query(
            QueryInput::new(TABLE, "GSI2PK = :pk")
                .index("GSI2")
                .limit(3)
                .values(item(json!({ ":pk": "E#x@e.com" }))),
        )
        .unwrap();

    assert_eq!(first.count, 3);
    assert_eq!(first.scanned_count, 3);
    let sks: Vec<&str> = first.items.iter().map(|i| string_of(i, "SK")).collect();
    assert_eq!(sks, vec!["S#000", "S#001", "S#002"]);

    let last_key = first.last_evaluated_key.expect("limit stop must set a key");
    assert_eq!(string_of(&last_key, "PK"), "USER#X");
    assert_eq!(string_of(&last_key, "SK"), "S#002");
    assert_eq!(string_of(&last_key, "GSI2PK"), "E#x@e.com");
    assert_eq!(string_of(&last_key, "GSI2SK"), "S#002");

    let second = client
        .query(
            QueryInput::new(TABLE, "GSI2PK = :pk")
                .index("GSI2")
                .limit(3)
                .exclusive_start_key(last_key)
                .values(item(json!({ ":pk": "E#x@e.com" }))),
        )
        .unwrap();
    let sks: Vec<&str> = second.items.iter().map(|i| string_of(i, "SK")).collect();
    assert_eq!(sks, vec!["S#003", "S#004", "S#005"]);
}

#[test_log::test]
fn update_with_if_not_exists_and_arithmetic() {
    let mut client = client();
    client
        .put(PutInput::new(TABLE, item(json!({ "PK": "K", "SK": "S" }))))
        .unwrap();

    let result = client
        .update(
            UpdateInput::new(TABLE, key("K", "S"), "SET count = if_not_exists(count, :z) + :inc")
                .values(item(json!({ ":z": 0, ":inc": 2 })))
                .return_all_new(),
        )
        .unwrap();
    let attributes = result.attributes.unwrap();
    assert_eq!(attr(&attributes, "count"), &AttributeValue::N("2".into()));

    let result = client
        .update(
            UpdateInput::new(TABLE, key("K", "S"), "SET count = if_not_exists(count, :z) + :inc")
                .values(item(json!({ ":z": 0, ":inc": 3 })))
                .return_all_new(),
        )
        .unwrap();
    let attributes = result.attributes.unwrap();
    assert_eq!(attr(&attributes, "count"), &AttributeValue::N("5".into()));
}

#[test_log::test]
fn conditional_put_failure_leaves_no_trace() {
    let mut client = client();
    client
        .put(PutInput::new(
            TABLE,
            item(json!({ "PK": "K", "SK": "S", "status": "active" })),
        ))
        .unwrap();
    let before = client.snapshot(TABLE);

    let err = client
        .put(
            PutInput::new(TABLE, item(json!({ "PK": "K", "SK": "S" })))
                .condition("attribute_not_exists(PK)"),
        )
        .unwrap_err();
    assert!(err.is_conditional_check_failed());
    assert_eq!(err.to_string(), "The conditional request failed");
    assert_eq!(client.snapshot(TABLE), before);
}

#[test_log::test]
fn transaction_rollback_restores_the_seed() {
    let mut client = client();
    client
        .put(PutInput::new(TABLE, item(json!({ "PK": "A", "SK": "A", "v": 1 }))))
        .unwrap();
    client
        .put(PutInput::new(TABLE, item(json!({ "PK": "B", "SK": "B", "v": 2 }))))
        .unwrap();
    let seed = client.snapshot(TABLE);

    let err = client
        .transact_write(
            TransactWriteInput::new()
                .operation(
                    TransactUpdate::new(TABLE, key("A", "A"), "SET v = :v")
                        .values(item(json!({ ":v": 99 }))),
                )
                .operation(TransactConditionCheck::new(
                    TABLE,
                    key("C", "C"),
                    "attribute_exists(PK)",
                )),
        )
        .unwrap_err();

    assert!(err.is_transaction_canceled());
    assert_eq!(
        err.cancellation_reasons(),
        Some("[None, ConditionalCheckFailed]")
    );
    assert_eq!(client.snapshot(TABLE), seed);
}

#[test_log::test]
fn tracking_and_rollback_across_mixed_operations() {
    let mut tracker = sandtable::ChangeTracker::new(client());
    tracker
        .put(PutInput::new(
            TABLE,
            item(json!({ "PK": "A", "SK": "A", "foo": "a" })),
        ))
        .unwrap();

    tracker.start_tracking();
    tracker
        .put(PutInput::new(
            TABLE,
            item(json!({ "PK": "X", "SK": "X", "foo": "x" })),
        ))
        .unwrap();
    tracker
        .update(
            UpdateInput::new(TABLE, key("A", "A"), "SET foo = :b")
                .values(item(json!({ ":b": "b" }))),
        )
        .unwrap();
    tracker.delete(DeleteInput::new(TABLE, key("Y", "Y"))).unwrap();

    tracker.rollback().unwrap();

    let snapshot = tracker.snapshot(TABLE);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(
        snapshot["A__A"],
        item(json!({ "PK": "A", "SK": "A", "foo": "a" }))
    );
}

#[test_log::test]
fn put_get_round_trips_deep_values() {
    let mut client = client();
    let stored = item(json!({
        "PK": "USER#7",
        "SK": "PROFILE#7",
        "name": "Sam",
        "age": 33,
        "flags": { "beta": true, "limits": [1, 2, 3] },
        "nothing": null,
    }));
    client.put(PutInput::new(TABLE, stored.clone())).unwrap();

    let got = client
        .get(GetInput::new(TABLE, key("USER#7", "PROFILE#7")))
        .unwrap()
        .item
        .unwrap();
    assert_eq!(got, stored);
}

#[test_log::test]
fn update_then_get_sees_the_written_value() {
    let mut client = client();
    client
        .put(PutInput::new(TABLE, item(json!({ "PK": "K", "SK": "S" }))))
        .unwrap();
    client
        .update(
            UpdateInput::new(TABLE, key("K", "S"), "SET a = :v")
                .values(item(json!({ ":v": "written" }))),
        )
        .unwrap();

    let got = client.get(GetInput::new(TABLE, key("K", "S"))).unwrap().item.unwrap();
    assert_eq!(attr(&got, "a"), &AttributeValue::S("written".into()));
}

#[test_log::test]
fn put_delete_get_finds_nothing() {
    let mut client = client();
    client
        .put(PutInput::new(TABLE, item(json!({ "PK": "K", "SK": "S" }))))
        .unwrap();
    client.delete(DeleteInput::new(TABLE, key("K", "S"))).unwrap();
    assert!(client
        .get(GetInput::new(TABLE, key("K", "S")))
        .unwrap()
        .item
        .is_none());
}

#[test_log::test]
fn descending_query_mirrors_ascending() {
    let mut client = client();
    for sk in ["S#1", "S#3", "S#2", "S#5", "S#4"] {
        client
            .put(PutInput::new(TABLE, item(json!({ "PK": "P", "SK": sk }))))
            .unwrap();
    }

    let ascending = client
        .query(QueryInput::new(TABLE, "PK = :pk").values(item(json!({ ":pk": "P" }))))
        .unwrap();
    let descending = client
        .query(
            QueryInput::new(TABLE, "PK = :pk")
                .scan_index_backward()
                .values(item(json!({ ":pk": "P" }))),
        )
        .unwrap();

    let mut reversed = ascending.items.clone();
    reversed.reverse();
    assert_eq!(descending.items, reversed);
}

#[test_log::test]
fn iteration_order_is_independent_of_insertion_order() {
    let rows: Vec<Item> = (0..8)
        .map(|i| {
            item(json!({
                "PK": "P",
                "SK": format!("S#{i}"),
                "GSI3PK": "H",
                "GSI3SK": format!("R#{}", 7 - i),
            }))
        })
        .collect();

    let mut forward = client();
    for row in &rows {
        forward.put(PutInput::new(TABLE, row.clone())).unwrap();
    }
    let mut shuffled = client();
    for index in [5, 0, 7, 2, 6, 1, 4, 3] {
        shuffled
            .put(PutInput::new(TABLE, rows[index].clone()))
            .unwrap();
    }

    assert_eq!(forward.snapshot(TABLE), shuffled.snapshot(TABLE));

    let query = |client: &MemoryClient| {
        client
            .query(
                QueryInput::new(TABLE, "GSI3PK = :h")
                    .index("GSI3")
                    .values(item(json!({ ":h": "H" }))),
            )
            .unwrap()
            .items
    };
    assert_eq!(query(&forward), query(&shuffled));
}

#[test_log::test]
fn updates_write_index_attributes_literally() {
    let mut client = client();
    client
        .put(PutInput::new(
            TABLE,
            item(json!({ "PK": "A", "SK": "A", "GSI2PK": "H", "GSI2SK": "old" })),
        ))
        .unwrap();

    client
        .update(
            UpdateInput::new(TABLE, key("A", "A"), "SET GSI2SK = :r")
                .values(item(json!({ ":r": "new" }))),
        )
        .unwrap();

    let result = client
        .query(
            QueryInput::new(TABLE, "GSI2PK = :h AND GSI2SK = :r")
                .index("GSI2")
                .values(item(json!({ ":h": "H", ":r": "new" }))),
        )
        .unwrap();
    assert_eq!(result.count, 1);

    let stale = client
        .query(
            QueryInput::new(TABLE, "GSI2PK = :h AND GSI2SK = :r")
                .index("GSI2")
                .values(item(json!({ ":h": "H", ":r": "old" }))),
        )
        .unwrap();
    assert_eq!(stale.count, 0);
}

#[test_log::test]
fn scan_filters_and_paginates() {
    let mut client = client();
    for (pk, sk, kind) in [
        ("A", "1", "x"),
        ("A", "2", "y"),
        ("B", "1", "x"),
        ("C", "1", "x"),
    ] {
        client
            .put(PutInput::new(
                TABLE,
                item(json!({ "PK": pk, "SK": sk, "kind": kind })),
            ))
            .unwrap();
    }

    let filtered = client
        .scan(ScanInput::new(TABLE).filter("kind = :k").values(item(json!({ ":k": "x" }))))
        .unwrap();
    assert_eq!(filtered.count, 3);
    assert_eq!(filtered.scanned_count, 4);

    let first_page = client.scan(ScanInput::new(TABLE).limit(2)).unwrap();
    assert_eq!(first_page.count, 2);
    let last_key = first_page.last_evaluated_key.unwrap();
    assert_eq!(string_of(&last_key, "PK"), "A");
    assert_eq!(string_of(&last_key, "SK"), "2");

    let second_page = client
        .scan(ScanInput::new(TABLE).exclusive_start_key(last_key))
        .unwrap();
    let keys: Vec<(&str, &str)> = second_page
        .items
        .iter()
        .map(|i| (string_of(i, "PK"), string_of(i, "SK")))
        .collect();
    assert_eq!(keys, vec![("B", "1"), ("C", "1")]);
}

#[test_log::test]
fn batch_get_preserves_request_order_and_omits_missing() {
    let mut client = client();
    for sk in ["1", "2", "3"] {
        client
            .put(PutInput::new(TABLE, item(json!({ "PK": "P", "SK": sk }))))
            .unwrap();
    }

    let result = client
        .batch_get(BatchGetInput::new().table(
            TABLE,
            vec![key("P", "3"), key("P", "missing"), key("P", "1")],
        ))
        .unwrap();

    let found = &result.responses[&sandtable::TableName::from(TABLE)];
    let sks: Vec<&str> = found.iter().map(|i| string_of(i, "SK")).collect();
    assert_eq!(sks, vec!["3", "1"]);
}

#[test_log::test]
fn batch_write_applies_puts_and_deletes() {
    let mut client = client();
    client
        .put(PutInput::new(TABLE, item(json!({ "PK": "OLD", "SK": "OLD" }))))
        .unwrap();

    client
        .batch_write(
            BatchWriteInput::new()
                .put(TABLE, item(json!({ "PK": "N1", "SK": "N1" })))
                .put(TABLE, item(json!({ "PK": "N2", "SK": "N2" })))
                .delete(TABLE, key("OLD", "OLD")),
        )
        .unwrap();

    let snapshot = client.snapshot(TABLE);
    let keys: Vec<&String> = snapshot.keys().collect();
    assert_eq!(keys, vec!["N1__N1", "N2__N2"]);
}

#[test_log::test]
fn limit_zero_fails_validation() {
    let client = client();
    let err = client
        .query(
            QueryInput::new(TABLE, "PK = :pk")
                .limit(0)
                .values(item(json!({ ":pk": "P" }))),
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "Limit must be greater than or equal to 1");
}

#[test_log::test]
fn batch_get_with_101_keys_fails_validation() {
    let client = client();
    let keys: Vec<Item> = (0..101).map(|i| key("P", &format!("S#{i}"))).collect();
    let err = client
        .batch_get(BatchGetInput::new().table(TABLE, keys))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Too many items requested for the BatchGetItem call"
    );
}

#[test_log::test]
fn batch_get_rejects_duplicate_keys() {
    let client = client();
    let err = client
        .batch_get(BatchGetInput::new().table(TABLE, vec![key("P", "1"), key("P", "1")]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Provided list of item keys contains duplicates"
    );
}

#[test_log::test]
fn batch_write_with_26_entries_fails_validation() {
    let mut client = client();
    let mut input = BatchWriteInput::new();
    for i in 0..26 {
        input = input.put(TABLE, item(json!({ "PK": "P", "SK": format!("S#{i}") })));
    }
    let err = client.batch_write(input).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Too many items requested for the BatchWriteItem call"
    );
}

#[test_log::test]
fn batch_write_rejects_ambiguous_request_shapes() {
    let mut client = client();
    let request = WriteRequest::default();
    let mut input = BatchWriteInput::new();
    input
        .request_items
        .get_or_insert_with(Default::default)
        .insert(TABLE.into(), vec![request]);
    let err = client.batch_write(input).unwrap_err();
    assert!(err
        .to_string()
        .contains("exactly one of PutRequest or DeleteRequest"));
}

#[test_log::test]
fn transact_write_entry_counts_are_bounded() {
    let mut client = client();

    let err = client
        .transact_write(TransactWriteInput {
            transact_items: Some(Vec::new()),
            ..TransactWriteInput::default()
        })
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("Member must have length greater than or equal to 1"));

    let mut input = TransactWriteInput::new();
    for i in 0..101 {
        input = input.operation(TransactPut::new(
            TABLE,
            item(json!({ "PK": "P", "SK": format!("S#{i}") })),
        ));
    }
    let err = client.transact_write(input).unwrap_err();
    assert!(err
        .to_string()
        .contains("Member must have length less than or equal to 100"));
}

#[test_log::test]
fn transact_write_rejects_two_operations_on_one_item() {
    let mut client = client();
    let err = client
        .transact_write(
            TransactWriteInput::new()
                .operation(TransactPut::new(TABLE, item(json!({ "PK": "A", "SK": "A" }))))
                .operation(
                    TransactUpdate::new(TABLE, key("A", "A"), "SET v = :v")
                        .values(item(json!({ ":v": 1 }))),
                ),
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Transaction request cannot include multiple operations on one item"
    );
}

#[test_log::test]
fn transact_write_key_mutation_cancels_with_validation_reason() {
    let mut client = client();
    client
        .put(PutInput::new(TABLE, item(json!({ "PK": "A", "SK": "A", "v": 1 }))))
        .unwrap();
    let seed = client.snapshot(TABLE);

    let err = client
        .transact_write(
            TransactWriteInput::new()
                .operation(
                    TransactUpdate::new(TABLE, key("A", "A"), "SET PK = :v")
                        .values(item(json!({ ":v": "other" }))),
                ),
        )
        .unwrap_err();
    assert_eq!(err.cancellation_reasons(), Some("[ValidationError]"));
    assert_eq!(client.snapshot(TABLE), seed);
}

#[test_log::test]
fn consistent_read_on_a_gsi_fails_validation() {
    let client = client();
    let err = client
        .query(
            QueryInput::new(TABLE, "GSI2PK = :pk")
                .index("GSI2")
                .consistent_read(true)
                .values(item(json!({ ":pk": "H" }))),
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Consistent reads are not supported on global secondary indexes"
    );
}

#[test_log::test]
fn missing_expression_value_names_the_token() {
    let mut client = client();

    let err = client.query(QueryInput::new(TABLE, "PK = :pk")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "An expression attribute value used in expression is not defined; \
         attribute value: :pk"
    );

    let err = client
        .put(
            PutInput::new(TABLE, item(json!({ "PK": "A", "SK": "A" })))
                .condition("status = :x"),
        )
        .unwrap_err();
    assert!(err.to_string().contains("attribute value: :x"), "{err}");

    let err = client
        .update(UpdateInput::new(TABLE, key("A", "A"), "SET a = :gone"))
        .unwrap_err();
    assert!(err.to_string().contains("attribute value: :gone"), "{err}");
    assert!(matches!(err, Error::Validation { .. }));
}

#[test_log::test]
fn filtered_query_counts_scanned_separately() {
    let mut client = client();
    for i in 0..6 {
        client
            .put(PutInput::new(
                TABLE,
                item(json!({
                    "PK": "P",
                    "SK": format!("S#{i}"),
                    "even": i % 2 == 0,
                })),
            ))
            .unwrap();
    }

    let result = client
        .query(
            QueryInput::new(TABLE, "PK = :pk")
                .filter("even = :t")
                .values(item(json!({ ":pk": "P", ":t": true }))),
        )
        .unwrap();
    assert_eq!(result.count, 3);
    assert_eq!(result.scanned_count, 6);
    assert!(result.last_evaluated_key.is_none());
}

#[test_log::test]
fn sparse_gsi_only_sees_participating_items() {
    let mut client = client();
    client
        .put(PutInput::new(
            TABLE,
            item(json!({ "PK": "A", "SK": "A", "GSI5PK": "H", "GSI5SK": "1" })),
        ))
        .unwrap();
    client
        .put(PutInput::new(TABLE, item(json!({ "PK": "B", "SK": "B" }))))
        .unwrap();

    let result = client
        .query(
            QueryInput::new(TABLE, "GSI5PK = :h")
                .index("GSI5")
                .values(item(json!({ ":h": "H" }))),
        )
        .unwrap();
    assert_eq!(result.count, 1);
    assert_eq!(string_of(&result.items[0], "PK"), "A");
}
