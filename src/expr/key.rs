//! Key-condition expressions and their iteration bounds
//!
//! The grammar is deliberately narrow: a partition clause `hash = value`,
//! optionally followed by exactly one range clause: `begins_with`,
//! `BETWEEN`, or a single comparator. Keywords match case-insensitively.
//! Anything else is a grammar miss and fails validation.

use super::token::{syntax_error, Token, Tokens};
use super::{ExprError, ExprResult, Operand, Placeholders};
use crate::ordmap::Bound;
use crate::AttributeValue;

/// The highest code point, used as an upper-bound sentinel beyond any
/// item-key encoding
const HIGH_SENTINEL: char = '\u{ffff}';

/// Separator between the components of an encoded entry key
const NUL: char = '\0';

/// A parsed key condition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyCondition {
    /// The attribute named by the partition clause
    pub hash_attribute: String,

    /// The partition value, coerced to its string form
    pub hash_value: String,

    /// The range clause, when one was given
    pub range: Option<RangeKeyCondition>,
}

/// The range half of a key condition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeKeyCondition {
    /// The attribute named by the range clause
    pub attribute: String,

    /// The constraint on the range value
    pub condition: RangeCondition,
}

/// A constraint on the index range value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RangeCondition {
    /// `range = v`
    Eq(String),
    /// `range < v`
    Lt(String),
    /// `range <= v`
    Le(String),
    /// `range > v`
    Gt(String),
    /// `range >= v`
    Ge(String),
    /// `range BETWEEN a AND b`
    Between(String, String),
    /// `begins_with(range, v)`
    BeginsWith(String),
}

impl RangeCondition {
    /// The encoded entry-key bounds the condition narrows iteration to
    ///
    /// Entry keys are `range NUL item_key`; the sentinel `\u{ffff}` sorts
    /// above every item-key encoding, so a bound of `v NUL \u{ffff}` covers
    /// exactly the entries whose range value is `v`.
    pub fn bounds(&self) -> (Option<Bound>, Option<Bound>) {
        match self {
            RangeCondition::Eq(v) => (
                Some(Bound::inclusive(format!("{v}{NUL}"))),
                Some(Bound::inclusive(format!("{v}{NUL}{HIGH_SENTINEL}"))),
            ),
            RangeCondition::BeginsWith(v) => (
                Some(Bound::inclusive(format!("{v}{NUL}"))),
                Some(Bound::inclusive(format!("{v}{HIGH_SENTINEL}{NUL}"))),
            ),
            RangeCondition::Between(a, b) => (
                Some(Bound::inclusive(format!("{a}{NUL}"))),
                Some(Bound::inclusive(format!("{b}{NUL}{HIGH_SENTINEL}"))),
            ),
            RangeCondition::Gt(v) => (
                Some(Bound::exclusive(format!("{v}{NUL}{HIGH_SENTINEL}"))),
                None,
            ),
            RangeCondition::Ge(v) => (Some(Bound::inclusive(format!("{v}{NUL}"))), None),
            RangeCondition::Lt(v) => (None, Some(Bound::exclusive(format!("{v}{NUL}")))),
            RangeCondition::Le(v) => (
                None,
                Some(Bound::inclusive(format!("{v}{NUL}{HIGH_SENTINEL}"))),
            ),
        }
    }
}

/// Parse a key-condition expression
pub fn parse_key_condition(
    input: &str,
    placeholders: &Placeholders<'_>,
) -> ExprResult<KeyCondition> {
    let mut tokens = Tokens::lex(input)?;

    let hash_attribute = parse_key_attribute(&mut tokens, placeholders)?;
    tokens.expect(&Token::Eq)?;
    let hash_value = parse_key_value(&mut tokens, placeholders)?;

    let range = if tokens.take_keyword("AND") {
        Some(parse_range_clause(&mut tokens, placeholders)?)
    } else {
        None
    };

    if !tokens.at_end() {
        return Err(grammar_miss());
    }

    Ok(KeyCondition {
        hash_attribute,
        hash_value,
        range,
    })
}

fn parse_range_clause(
    tokens: &mut Tokens,
    placeholders: &Placeholders<'_>,
) -> ExprResult<RangeKeyCondition> {
    if matches!(tokens.peek(), Some(t) if t.is_keyword("begins_with"))
        && tokens.peek_second() == Some(&Token::LParen)
    {
        tokens.bump();
        tokens.expect(&Token::LParen)?;
        let attribute = parse_key_attribute(tokens, placeholders)?;
        tokens.expect(&Token::Comma)?;
        let value = match tokens.parse_operand(placeholders)? {
            Operand::Value(AttributeValue::S(prefix)) => prefix,
            Operand::Value(other) => {
                return Err(ExprError::invalid(format!(
                    "Incorrect operand type for operator or function; \
                     operator or function: begins_with, operand type: {}",
                    super::type_code(&other),
                )))
            }
            _ => return Err(grammar_miss()),
        };
        tokens.expect(&Token::RParen)?;
        return Ok(RangeKeyCondition {
            attribute,
            condition: RangeCondition::BeginsWith(value),
        });
    }

    let attribute = parse_key_attribute(tokens, placeholders)?;

    if tokens.take_keyword("BETWEEN") {
        let low = parse_key_value(tokens, placeholders)?;
        if !tokens.take_keyword("AND") {
            return Err(grammar_miss());
        }
        let high = parse_key_value(tokens, placeholders)?;
        return Ok(RangeKeyCondition {
            attribute,
            condition: RangeCondition::Between(low, high),
        });
    }

    let op = match tokens.bump() {
        Some(Token::Eq) => RangeCondition::Eq,
        Some(Token::Lt) => RangeCondition::Lt,
        Some(Token::Le) => RangeCondition::Le,
        Some(Token::Gt) => RangeCondition::Gt,
        Some(Token::Ge) => RangeCondition::Ge,
        _ => return Err(grammar_miss()),
    };
    let value = parse_key_value(tokens, placeholders)?;
    Ok(RangeKeyCondition {
        attribute,
        condition: op(value),
    })
}

fn parse_key_attribute(
    tokens: &mut Tokens,
    placeholders: &Placeholders<'_>,
) -> ExprResult<String> {
    match tokens.bump() {
        Some(Token::Ident(name)) => Ok(name),
        Some(Token::NamePlaceholder(token)) => placeholders.name(&token),
        Some(other) => Err(syntax_error(&other.text())),
        None => Err(syntax_error("<EOF>")),
    }
}

/// Key values may arrive as strings or numbers; both coerce to the string
/// form the index partitions are keyed by.
fn parse_key_value(tokens: &mut Tokens, placeholders: &Placeholders<'_>) -> ExprResult<String> {
    match tokens.parse_operand(placeholders)? {
        Operand::Value(AttributeValue::S(s)) => Ok(s),
        Operand::Value(AttributeValue::N(n)) => Ok(n),
        _ => Err(grammar_miss()),
    }
}

fn grammar_miss() -> ExprError {
    ExprError::invalid("Query key condition not supported")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Item;

    fn values(pairs: &[(&str, AttributeValue)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn partition_only() {
        let vals = values(&[(":pk", AttributeValue::S("USER#1".to_owned()))]);
        let parsed =
            parse_key_condition("PK = :pk", &Placeholders::new(None, Some(&vals))).unwrap();
        assert_eq!(parsed.hash_attribute, "PK");
        assert_eq!(parsed.hash_value, "USER#1");
        assert!(parsed.range.is_none());
    }

    #[test]
    fn begins_with_clause() {
        let vals = values(&[
            (":pk", AttributeValue::S("USER#1".to_owned())),
            (":p", AttributeValue::S("ORDER#".to_owned())),
        ]);
        let parsed = parse_key_condition(
            "PK = :pk AND begins_with(SK, :p)",
            &Placeholders::new(None, Some(&vals)),
        )
        .unwrap();
        let range = parsed.range.unwrap();
        assert_eq!(range.attribute, "SK");
        assert_eq!(
            range.condition,
            RangeCondition::BeginsWith("ORDER#".to_owned())
        );
    }

    #[test]
    fn keywords_match_case_insensitively() {
        let vals = values(&[
            (":pk", AttributeValue::S("P".to_owned())),
            (":a", AttributeValue::S("A".to_owned())),
            (":b", AttributeValue::S("B".to_owned())),
        ]);
        let parsed = parse_key_condition(
            "PK = :pk and SK between :a and :b",
            &Placeholders::new(None, Some(&vals)),
        )
        .unwrap();
        assert_eq!(
            parsed.range.unwrap().condition,
            RangeCondition::Between("A".to_owned(), "B".to_owned())
        );
    }

    #[test]
    fn begins_with_requires_a_string_operand() {
        let vals = values(&[
            (":pk", AttributeValue::S("P".to_owned())),
            (":n", AttributeValue::N("5".to_owned())),
        ]);
        let err = parse_key_condition(
            "PK = :pk AND begins_with(SK, :n)",
            &Placeholders::new(None, Some(&vals)),
        )
        .unwrap_err();
        assert!(err.to_string().contains("begins_with"));
        assert!(err.to_string().contains("operand type: N"));
    }

    #[test]
    fn grammar_misses_fail_validation() {
        let vals = values(&[(":pk", AttributeValue::S("P".to_owned()))]);
        let placeholders = Placeholders::new(None, Some(&vals));
        for expr in [
            "PK <> :pk",
            "PK = :pk AND SK <> :pk",
            "PK = :pk AND contains(SK, :pk)",
            "PK = :pk AND SK = :pk AND SK = :pk",
        ] {
            assert!(parse_key_condition(expr, &placeholders).is_err(), "{expr}");
        }
    }

    #[test]
    fn equality_bounds_cover_exactly_one_range_value() {
        let (lower, upper) = RangeCondition::Eq("v".to_owned()).bounds();
        let lower = lower.unwrap();
        let upper = upper.unwrap();
        assert!(lower.inclusive && upper.inclusive);

        let inside = format!("v\u{0}3:abc");
        let below = "u\u{0}9:x".to_owned();
        let above = format!("v0\u{0}1:x");
        assert!(lower.key <= inside && inside <= upper.key);
        assert!(below < lower.key);
        assert!(above > upper.key);
    }

    #[test]
    fn begins_with_bounds_cover_the_prefix_family() {
        let (lower, upper) = RangeCondition::BeginsWith("ORDER#".to_owned()).bounds();
        let (lower, upper) = (lower.unwrap(), upper.unwrap());
        for range in ["ORDER#", "ORDER#001", "ORDER#zzz"] {
            let entry = format!("{range}\u{0}1:x");
            assert!(lower.key <= entry && entry <= upper.key, "{range}");
        }
        let outside = "PROFILE#\u{0}1:x".to_owned();
        assert!(outside > upper.key);
    }

    #[test]
    fn strict_comparators_exclude_the_boundary_value() {
        let (lower, _) = RangeCondition::Gt("b".to_owned()).bounds();
        let lower = lower.unwrap();
        assert!(!lower.inclusive);
        // every entry with range exactly "b" sorts at or below the bound
        let at_b = "b\u{0}9:zzzzzzzzz".to_owned();
        assert!(at_b < lower.key);

        let (_, upper) = RangeCondition::Lt("b".to_owned()).bounds();
        let upper = upper.unwrap();
        assert!(!upper.inclusive);
        assert!(at_b > upper.key);
    }
}
