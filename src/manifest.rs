//! The declarative surface manifest
//!
//! The single source of truth for which methods and parameters the
//! in-memory engine supports. Every operation validates its request against
//! its [`MethodSpec`] before doing anything else; a parameter outside the
//! supported set fails as [`Error::NotSupported`] naming the parameter and
//! its path.

use serde_json::Value;
use std::collections::HashMap;

use crate::Error;

/// The supported and unsupported parameter sets of one method
#[derive(Clone, Copy, Debug)]
pub struct MethodSpec {
    /// The method name
    pub method: &'static str,

    /// Parameters the method honors
    pub supported_params: &'static [&'static str],

    /// Parameters that exist on the wire but are rejected here
    pub unsupported_params: &'static [&'static str],
}

/// The indexes excluded from the in-memory engine by policy
pub const EXCLUDED_INDEXES: &[&str] = &["GSI1"];

/// Every index replicates the full item
pub const PROJECTION: &str = "ALL";

/// Methods that exist on the wire client but not in the in-memory engine
pub const UNSUPPORTED_METHODS: &[&str] = &["transactGet", "createSet"];

/// The per-method manifest
pub const METHODS: &[MethodSpec] = &[
    MethodSpec {
        method: "get",
        supported_params: &["TableName", "Key", "ConsistentRead"],
        unsupported_params: &[
            "ProjectionExpression",
            "ExpressionAttributeNames",
            "ReturnConsumedCapacity",
        ],
    },
    MethodSpec {
        method: "put",
        supported_params: &[
            "TableName",
            "Item",
            "ConditionExpression",
            "ExpressionAttributeNames",
            "ExpressionAttributeValues",
        ],
        unsupported_params: &[
            "ReturnValues",
            "ReturnConsumedCapacity",
            "ReturnItemCollectionMetrics",
            "ConditionalOperator",
            "Expected",
        ],
    },
    MethodSpec {
        method: "update",
        supported_params: &[
            "TableName",
            "Key",
            "UpdateExpression",
            "ConditionExpression",
            "ExpressionAttributeNames",
            "ExpressionAttributeValues",
            "ReturnValues",
        ],
        unsupported_params: &[
            "AttributeUpdates",
            "ConditionalOperator",
            "Expected",
            "ReturnConsumedCapacity",
            "ReturnItemCollectionMetrics",
        ],
    },
    MethodSpec {
        method: "delete",
        supported_params: &[
            "TableName",
            "Key",
            "ConditionExpression",
            "ExpressionAttributeNames",
            "ExpressionAttributeValues",
        ],
        unsupported_params: &[
            "ReturnValues",
            "ConditionalOperator",
            "Expected",
            "ReturnConsumedCapacity",
            "ReturnItemCollectionMetrics",
        ],
    },
    MethodSpec {
        method: "query",
        supported_params: &[
            "TableName",
            "IndexName",
            "KeyConditionExpression",
            "FilterExpression",
            "ExpressionAttributeNames",
            "ExpressionAttributeValues",
            "Limit",
            "ExclusiveStartKey",
            "ScanIndexForward",
            "ConsistentRead",
        ],
        unsupported_params: &[
            "ProjectionExpression",
            "Select",
            "KeyConditions",
            "QueryFilter",
            "ConditionalOperator",
            "ReturnConsumedCapacity",
        ],
    },
    MethodSpec {
        method: "scan",
        supported_params: &[
            "TableName",
            "FilterExpression",
            "ExpressionAttributeNames",
            "ExpressionAttributeValues",
            "Limit",
            "ExclusiveStartKey",
        ],
        unsupported_params: &[
            "IndexName",
            "ProjectionExpression",
            "Select",
            "ScanFilter",
            "ConditionalOperator",
            "ConsistentRead",
            "TotalSegments",
            "Segment",
            "ReturnConsumedCapacity",
        ],
    },
    MethodSpec {
        method: "batchGet",
        supported_params: &["RequestItems"],
        unsupported_params: &["ReturnConsumedCapacity"],
    },
    MethodSpec {
        method: "batchWrite",
        supported_params: &["RequestItems"],
        unsupported_params: &["ReturnConsumedCapacity", "ReturnItemCollectionMetrics"],
    },
    MethodSpec {
        method: "transactWrite",
        supported_params: &["TransactItems"],
        unsupported_params: &[
            "ClientRequestToken",
            "ReturnConsumedCapacity",
            "ReturnItemCollectionMetrics",
        ],
    },
];

/// Look up the manifest entry for a method
pub fn method(name: &str) -> Option<&'static MethodSpec> {
    METHODS.iter().find(|spec| spec.method == name)
}

/// Whether an index name is wire-recognized but excluded by policy
pub fn is_excluded_index(name: &str) -> bool {
    EXCLUDED_INDEXES.contains(&name)
}

/// Reject an excluded index by name
pub fn excluded_index_error(method: &'static str, index: &str) -> Error {
    Error::unsupported(
        method,
        format!("{method}.IndexName.{index}"),
        "the index is excluded from the in-memory store by policy",
    )
}

/// Validate the extra parameters a request carried beyond its typed fields
///
/// Parameters listed as unsupported are rejected by name; anything else
/// present is unknown to the surface and rejected as well. Parameter names
/// are checked in sorted order so the first error is deterministic.
pub fn check_params(
    method_name: &'static str,
    extra: &HashMap<String, Value>,
) -> Result<(), Error> {
    if extra.is_empty() {
        return Ok(());
    }
    const UNKNOWN_METHOD: MethodSpec = MethodSpec {
        method: "unknown",
        supported_params: &[],
        unsupported_params: &[],
    };
    let spec = method(method_name).unwrap_or(&UNKNOWN_METHOD);

    let mut params: Vec<&str> = extra.keys().map(String::as_str).collect();
    params.sort_unstable();

    if let Some(param) = params.first() {
        let reason = if spec.unsupported_params.contains(param) {
            "the parameter is not supported by the in-memory store"
        } else {
            "the parameter is not recognized"
        };
        return Err(Error::unsupported(
            method_name,
            format!("{method_name}.{param}"),
            reason,
        ));
    }
    Ok(())
}

/// Validate extras of a nested request structure, e.g. a batch table entry
pub fn check_nested_params(
    method_name: &'static str,
    context: &str,
    extra: &HashMap<String, Value>,
) -> Result<(), Error> {
    let mut params: Vec<&str> = extra.keys().map(String::as_str).collect();
    params.sort_unstable();
    if let Some(param) = params.first() {
        return Err(Error::unsupported(
            method_name,
            format!("{method_name}.{context}.{param}"),
            "the parameter is not supported by the in-memory store",
        ));
    }
    Ok(())
}
