//! The expression engine
//!
//! Parses and evaluates the restricted expression language of the store:
//! key-condition expressions ([`key`]), condition and filter expressions
//! ([`condition`]), and update expressions ([`update`]), over a shared
//! tokenizer ([`token`]) and document-path machinery ([`path`]).
//!
//! The engine reports failures through [`ExprError`]; the operation surface
//! rewrites those into the crate's public error kinds so the messages match
//! the hosted service where callers rely on them.

pub mod condition;
pub mod key;
pub mod path;
pub mod token;
pub mod update;

use std::borrow::Cow;
use std::collections::HashMap;

pub use self::{
    condition::{parse_condition, Condition},
    key::{parse_key_condition, KeyCondition, RangeCondition},
    path::{DocumentPath, PathSegment},
    update::{parse_update, UpdateExpression},
};
use crate::{AttributeValue, Item};

/// A failure raised while parsing or evaluating an expression
#[derive(Debug, thiserror::Error)]
pub enum ExprError {
    /// The expression uses a feature outside the supported subset
    #[error("{message}")]
    Unsupported {
        /// A message naming the offending feature or token
        message: String,
    },

    /// The expression is malformed or references undefined placeholders
    #[error("{message}")]
    Invalid {
        /// A message matching the hosted service where callers depend on it
        message: String,
    },

    /// The expression attempts to mutate a primary key attribute
    #[error("{message}")]
    KeyAttribute {
        /// The hosted service's key-attribute validation message
        message: String,
    },
}

impl ExprError {
    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub(crate) fn key_attribute(attribute: &str) -> Self {
        Self::KeyAttribute {
            message: format!(
                "One or more parameter values were invalid: \
                 Cannot update attribute {attribute}. This attribute is part of the key"
            ),
        }
    }
}

/// The result type of the expression engine
pub type ExprResult<T> = Result<T, ExprError>;

/// Caller-supplied attribute-name and attribute-value substitutions
#[derive(Clone, Copy, Debug, Default)]
pub struct Placeholders<'a> {
    names: Option<&'a HashMap<String, String>>,
    values: Option<&'a Item>,
}

impl<'a> Placeholders<'a> {
    /// Wrap the `ExpressionAttributeNames` / `ExpressionAttributeValues`
    /// maps of a request
    pub fn new(names: Option<&'a HashMap<String, String>>, values: Option<&'a Item>) -> Self {
        Self { names, values }
    }

    /// Resolve a `#name` token to the attribute name it stands for
    pub fn name(&self, token: &str) -> ExprResult<String> {
        self.names
            .and_then(|names| names.get(token))
            .cloned()
            .ok_or_else(|| {
                ExprError::invalid(format!(
                    "An expression attribute name used in the document path is not defined; \
                     attribute name: {token}"
                ))
            })
    }

    /// Resolve a `:value` token to the value it stands for
    pub fn value(&self, token: &str) -> ExprResult<AttributeValue> {
        self.values
            .and_then(|values| values.get(token))
            .cloned()
            .ok_or_else(|| {
                ExprError::invalid(format!(
                    "An expression attribute value used in expression is not defined; \
                     attribute value: {token}"
                ))
            })
    }
}

/// An operand of a condition clause: a resolved value, a document path, or
/// the size of whatever a document path points at
#[derive(Clone, Debug)]
pub enum Operand {
    /// A literal or placeholder-resolved value
    Value(AttributeValue),
    /// A document path evaluated against the current item
    Path(DocumentPath),
    /// `size(path)` over the current item
    Size(DocumentPath),
}

impl Operand {
    /// Resolve the operand against an item; `None` means MISSING
    pub fn resolve<'a>(&'a self, item: &'a Item) -> Option<Cow<'a, AttributeValue>> {
        match self {
            Operand::Value(value) => Some(Cow::Borrowed(value)),
            Operand::Path(path) => path.resolve(item).map(Cow::Borrowed),
            Operand::Size(path) => path
                .resolve(item)
                .map(|value| Cow::Owned(AttributeValue::N(value_size(value).to_string()))),
        }
    }
}

/// The wire type code of a value: `S`, `N`, `B`, `BOOL`, `NULL`, `M`, `L`,
/// `SS`, `NS`, or `BS`
pub fn type_code(value: &AttributeValue) -> &'static str {
    match value {
        AttributeValue::S(_) => "S",
        AttributeValue::N(_) => "N",
        AttributeValue::B(_) => "B",
        AttributeValue::Bool(_) => "BOOL",
        AttributeValue::Null(_) => "NULL",
        AttributeValue::M(_) => "M",
        AttributeValue::L(_) => "L",
        AttributeValue::Ss(_) => "SS",
        AttributeValue::Ns(_) => "NS",
        AttributeValue::Bs(_) => "BS",
        _ => "UNKNOWN",
    }
}

/// The `size()` of a value: length for strings, binaries, lists, and sets,
/// number of keys for maps
pub fn value_size(value: &AttributeValue) -> usize {
    match value {
        AttributeValue::S(s) => s.len(),
        AttributeValue::N(n) => n.len(),
        AttributeValue::B(b) => b.len(),
        AttributeValue::Bool(_) => 1,
        AttributeValue::Null(_) => 0,
        AttributeValue::M(m) => m.len(),
        AttributeValue::L(l) => l.len(),
        AttributeValue::Ss(s) => s.len(),
        AttributeValue::Ns(s) => s.len(),
        AttributeValue::Bs(s) => s.len(),
        _ => 0,
    }
}

/// Structural equality with numeric semantics for `N` values
pub fn values_equal(a: &AttributeValue, b: &AttributeValue) -> bool {
    match (a, b) {
        (AttributeValue::N(a), AttributeValue::N(b)) => numbers_equal(a, b),
        (AttributeValue::L(a), AttributeValue::L(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (AttributeValue::M(a), AttributeValue::M(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).map_or(false, |bv| values_equal(v, bv)))
        }
        _ => a == b,
    }
}

/// Ordering between two values, when one is defined
///
/// Numbers compare numerically when both sides are numbers; otherwise both
/// sides are coerced to strings and compared lexically. Containers do not
/// order.
pub fn compare_values(a: &AttributeValue, b: &AttributeValue) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (AttributeValue::N(a), AttributeValue::N(b)) => {
            let (a, b) = (parse_number(a)?, parse_number(b)?);
            a.partial_cmp(&b)
        }
        (AttributeValue::B(a), AttributeValue::B(b)) => Some(a.cmp(b)),
        _ => Some(coerce_string(a)?.cmp(&coerce_string(b)?)),
    }
}

/// Coerce a scalar value to its string form; containers have none
pub fn coerce_string(value: &AttributeValue) -> Option<Cow<'_, str>> {
    match value {
        AttributeValue::S(s) => Some(Cow::Borrowed(s)),
        AttributeValue::N(n) => Some(Cow::Borrowed(n)),
        AttributeValue::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
        AttributeValue::Null(_) => Some(Cow::Borrowed("null")),
        _ => None,
    }
}

pub(crate) fn numbers_equal(a: &str, b: &str) -> bool {
    match (parse_number(a), parse_number(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

pub(crate) fn parse_number(text: &str) -> Option<f64> {
    let value: f64 = text.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Format an arithmetic result the way the wire format carries numbers
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_equality_ignores_representation() {
        assert!(values_equal(
            &AttributeValue::N("1.0".into()),
            &AttributeValue::N("1".into()),
        ));
        assert!(!values_equal(
            &AttributeValue::N("1".into()),
            &AttributeValue::S("1".into()),
        ));
    }

    #[test]
    fn numbers_compare_numerically_not_lexically() {
        let nine = AttributeValue::N("9".into());
        let ten = AttributeValue::N("10".into());
        assert_eq!(compare_values(&nine, &ten), Some(std::cmp::Ordering::Less));
    }

    #[test]
    fn mixed_scalars_compare_via_string_coercion() {
        let s = AttributeValue::S("5".into());
        let n = AttributeValue::N("10".into());
        // "5" > "10" lexically
        assert_eq!(compare_values(&s, &n), Some(std::cmp::Ordering::Greater));
    }

    #[test]
    fn containers_do_not_order() {
        let list = AttributeValue::L(vec![]);
        assert_eq!(compare_values(&list, &list), None);
    }

    #[test]
    fn size_counts_map_keys_and_string_bytes() {
        let mut map = std::collections::HashMap::new();
        map.insert("a".to_owned(), AttributeValue::Null(true));
        assert_eq!(value_size(&AttributeValue::M(map)), 1);
        assert_eq!(value_size(&AttributeValue::S("hello".into())), 5);
        assert_eq!(value_size(&AttributeValue::Bs(vec![vec![1], vec![2]])), 2);
    }

    #[test]
    fn format_number_trims_integer_results() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn missing_placeholder_messages_carry_the_token() {
        let placeholders = Placeholders::default();
        let err = placeholders.value(":limit").unwrap_err();
        assert_eq!(
            err.to_string(),
            "An expression attribute value used in expression is not defined; \
             attribute value: :limit"
        );
        let err = placeholders.name("#state").unwrap_err();
        assert_eq!(
            err.to_string(),
            "An expression attribute name used in the document path is not defined; \
             attribute name: #state"
        );
    }
}
