//! Condition and filter expressions
//!
//! Boolean expressions over comparison, `BETWEEN`, existence, prefix,
//! containment, type, and `size()` clauses, combined with `AND`/`OR` and
//! parentheses. Evaluation never fails: a clause whose referenced path is
//! missing is simply false, except `attribute_not_exists`, which is true.

use super::token::{syntax_error, Token, Tokens};
use super::{
    compare_values, values_equal, DocumentPath, ExprError, ExprResult, Operand, Placeholders,
};
use crate::{AttributeValue, Item};

/// A comparison operator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// A wire type code accepted by `attribute_type`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeType {
    /// `S`
    String,
    /// `N`
    Number,
    /// `B`
    Binary,
    /// `BOOL`
    Boolean,
    /// `NULL`
    Null,
    /// `L`
    List,
    /// `M`
    Map,
    /// `SS`
    StringSet,
    /// `NS`
    NumberSet,
    /// `BS`
    BinarySet,
}

impl AttributeType {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" => Some(Self::String),
            "N" => Some(Self::Number),
            "B" => Some(Self::Binary),
            "BOOL" => Some(Self::Boolean),
            "NULL" => Some(Self::Null),
            "L" => Some(Self::List),
            "M" => Some(Self::Map),
            "SS" => Some(Self::StringSet),
            "NS" => Some(Self::NumberSet),
            "BS" => Some(Self::BinarySet),
            _ => None,
        }
    }

    fn matches(self, value: &AttributeValue) -> bool {
        matches!(
            (value, self),
            (AttributeValue::S(_), Self::String)
                | (AttributeValue::N(_), Self::Number)
                | (AttributeValue::B(_), Self::Binary)
                | (AttributeValue::Bool(_), Self::Boolean)
                | (AttributeValue::Null(_), Self::Null)
                | (AttributeValue::L(_), Self::List)
                | (AttributeValue::M(_), Self::Map)
                | (AttributeValue::Ss(_), Self::StringSet)
                | (AttributeValue::Ns(_), Self::NumberSet)
                | (AttributeValue::Bs(_), Self::BinarySet)
        )
    }
}

/// A parsed condition or filter expression
#[derive(Clone, Debug)]
pub enum Condition {
    /// `left op right`
    Compare {
        /// The comparison operator
        op: CompareOp,
        /// The left operand
        left: Operand,
        /// The right operand
        right: Operand,
    },
    /// `target BETWEEN low AND high`
    Between {
        /// The tested operand
        target: Operand,
        /// The inclusive lower bound
        low: Operand,
        /// The inclusive upper bound
        high: Operand,
    },
    /// `attribute_exists(path)`
    AttributeExists(DocumentPath),
    /// `attribute_not_exists(path)`
    AttributeNotExists(DocumentPath),
    /// `begins_with(path, prefix)`
    BeginsWith {
        /// The tested path
        path: DocumentPath,
        /// The required prefix
        prefix: Operand,
    },
    /// `contains(path, operand)`
    Contains {
        /// The container path
        path: DocumentPath,
        /// The sought element or substring
        operand: Operand,
    },
    /// `attribute_type(path, "S")`
    AttributeType {
        /// The tested path
        path: DocumentPath,
        /// The required type
        expected: AttributeType,
    },
    /// Both sides must hold
    And(Box<Condition>, Box<Condition>),
    /// Either side must hold
    Or(Box<Condition>, Box<Condition>),
}

/// Parse a condition or filter expression
pub fn parse_condition(input: &str, placeholders: &Placeholders<'_>) -> ExprResult<Condition> {
    let mut tokens = Tokens::lex(input)?;
    let condition = parse_or(&mut tokens, placeholders)?;
    if !tokens.at_end() {
        return Err(syntax_error(&tokens.describe_next()));
    }
    Ok(condition)
}

fn parse_or(tokens: &mut Tokens, placeholders: &Placeholders<'_>) -> ExprResult<Condition> {
    let mut left = parse_and(tokens, placeholders)?;
    while tokens.take_keyword("OR") {
        let right = parse_and(tokens, placeholders)?;
        left = Condition::Or(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_and(tokens: &mut Tokens, placeholders: &Placeholders<'_>) -> ExprResult<Condition> {
    let mut left = parse_clause(tokens, placeholders)?;
    while tokens.take_keyword("AND") {
        let right = parse_clause(tokens, placeholders)?;
        left = Condition::And(Box::new(left), Box::new(right));
    }
    Ok(left)
}

const CONDITION_FUNCTIONS: &[&str] = &[
    "attribute_exists",
    "attribute_not_exists",
    "begins_with",
    "contains",
    "attribute_type",
    "size",
];

fn parse_clause(tokens: &mut Tokens, placeholders: &Placeholders<'_>) -> ExprResult<Condition> {
    if tokens.take(&Token::LParen) {
        let inner = parse_or(tokens, placeholders)?;
        tokens.expect(&Token::RParen)?;
        return Ok(inner);
    }

    if matches!(tokens.peek(), Some(t) if t.is_keyword("NOT")) {
        return Err(unsupported_token("NOT"));
    }

    let call = match (tokens.peek(), tokens.peek_second()) {
        (Some(Token::Ident(name)), Some(Token::LParen)) => Some(name.clone()),
        _ => None,
    };
    if let Some(name) = call {
        let known = CONDITION_FUNCTIONS
            .iter()
            .copied()
            .find(|f| name.eq_ignore_ascii_case(f));
        match known {
            // size() is an operand, handled by the comparison branch
            Some("size") => {}
            Some(function) => return parse_function(tokens, placeholders, function),
            None => {
                return Err(ExprError::unsupported(format!(
                    "Invalid function name; function: {name}"
                )))
            }
        }
    }

    let left = tokens.parse_operand(placeholders)?;

    if tokens.take_keyword("BETWEEN") {
        let low = tokens.parse_operand(placeholders)?;
        if !tokens.take_keyword("AND") {
            return Err(syntax_error(&tokens.describe_next()));
        }
        let high = tokens.parse_operand(placeholders)?;
        return Ok(Condition::Between {
            target: left,
            low,
            high,
        });
    }

    if matches!(tokens.peek(), Some(t) if t.is_keyword("IN")) {
        return Err(unsupported_token("IN"));
    }

    let op = match tokens.peek() {
        Some(Token::Eq) => CompareOp::Eq,
        Some(Token::Ne) => CompareOp::Ne,
        Some(Token::Lt) => CompareOp::Lt,
        Some(Token::Le) => CompareOp::Le,
        Some(Token::Gt) => CompareOp::Gt,
        Some(Token::Ge) => CompareOp::Ge,
        _ => return Err(syntax_error(&tokens.describe_next())),
    };
    tokens.bump();
    let right = tokens.parse_operand(placeholders)?;
    Ok(Condition::Compare { op, left, right })
}

fn parse_function(
    tokens: &mut Tokens,
    placeholders: &Placeholders<'_>,
    function: &'static str,
) -> ExprResult<Condition> {
    tokens.bump();
    tokens.expect(&Token::LParen)?;
    let path = tokens.parse_path(placeholders)?;

    let condition = match function {
        "attribute_exists" => Condition::AttributeExists(path),
        "attribute_not_exists" => Condition::AttributeNotExists(path),
        "begins_with" => {
            tokens.expect(&Token::Comma)?;
            let prefix = tokens.parse_operand(placeholders)?;
            Condition::BeginsWith { path, prefix }
        }
        "contains" => {
            tokens.expect(&Token::Comma)?;
            let operand = tokens.parse_operand(placeholders)?;
            Condition::Contains { path, operand }
        }
        "attribute_type" => {
            tokens.expect(&Token::Comma)?;
            let operand = tokens.parse_operand(placeholders)?;
            let expected = match &operand {
                Operand::Value(AttributeValue::S(code)) => {
                    AttributeType::from_code(code).ok_or_else(|| {
                        ExprError::invalid(format!(
                            "Invalid attribute type name found; type: {code}"
                        ))
                    })?
                }
                _ => {
                    return Err(ExprError::invalid(
                        "Invalid attribute type name found; type must be a string",
                    ))
                }
            };
            Condition::AttributeType { path, expected }
        }
        _ => unreachable!("unknown condition function {function}"),
    };

    tokens.expect(&Token::RParen)?;
    Ok(condition)
}

fn unsupported_token(token: &str) -> ExprError {
    ExprError::unsupported(format!("Unsupported condition token: \"{token}\""))
}

impl Condition {
    /// Evaluate the condition against an item
    pub fn evaluate(&self, item: &Item) -> bool {
        match self {
            Condition::Compare { op, left, right } => {
                let (Some(left), Some(right)) = (left.resolve(item), right.resolve(item)) else {
                    return false;
                };
                let (left, right) = (left.as_ref(), right.as_ref());
                match op {
                    CompareOp::Eq => values_equal(left, right),
                    CompareOp::Ne => !values_equal(left, right),
                    CompareOp::Lt => {
                        compare_values(left, right).is_some_and(std::cmp::Ordering::is_lt)
                    }
                    CompareOp::Le => {
                        compare_values(left, right).is_some_and(std::cmp::Ordering::is_le)
                    }
                    CompareOp::Gt => {
                        compare_values(left, right).is_some_and(std::cmp::Ordering::is_gt)
                    }
                    CompareOp::Ge => {
                        compare_values(left, right).is_some_and(std::cmp::Ordering::is_ge)
                    }
                }
            }
            Condition::Between { target, low, high } => {
                let (Some(target), Some(low), Some(high)) =
                    (target.resolve(item), low.resolve(item), high.resolve(item))
                else {
                    return false;
                };
                let ge_low = compare_values(target.as_ref(), low.as_ref())
                    .is_some_and(std::cmp::Ordering::is_ge);
                let le_high = compare_values(target.as_ref(), high.as_ref())
                    .is_some_and(std::cmp::Ordering::is_le);
                ge_low && le_high
            }
            Condition::AttributeExists(path) => path.resolve(item).is_some(),
            Condition::AttributeNotExists(path) => path.resolve(item).is_none(),
            Condition::BeginsWith { path, prefix } => {
                let (Some(value), Some(prefix)) = (path.resolve(item), prefix.resolve(item))
                else {
                    return false;
                };
                match (value, prefix.as_ref()) {
                    (AttributeValue::S(s), AttributeValue::S(p)) => s.starts_with(p.as_str()),
                    (AttributeValue::B(b), AttributeValue::B(p)) => b.starts_with(p),
                    _ => false,
                }
            }
            Condition::Contains { path, operand } => {
                let (Some(container), Some(sought)) = (path.resolve(item), operand.resolve(item))
                else {
                    return false;
                };
                contains(container, sought.as_ref())
            }
            Condition::AttributeType { path, expected } => path
                .resolve(item)
                .map_or(false, |value| expected.matches(value)),
            Condition::And(left, right) => left.evaluate(item) && right.evaluate(item),
            Condition::Or(left, right) => left.evaluate(item) || right.evaluate(item),
        }
    }
}

fn contains(container: &AttributeValue, sought: &AttributeValue) -> bool {
    match (container, sought) {
        (AttributeValue::S(s), AttributeValue::S(sub)) => s.contains(sub.as_str()),
        (AttributeValue::L(list), _) => list.iter().any(|v| values_equal(v, sought)),
        (AttributeValue::Ss(set), AttributeValue::S(s)) => set.iter().any(|v| v == s),
        (AttributeValue::Ns(set), AttributeValue::N(n)) => {
            set.iter().any(|v| super::numbers_equal(v, n))
        }
        (AttributeValue::Bs(set), AttributeValue::B(b)) => set.iter().any(|v| v == b),
        (AttributeValue::B(bytes), AttributeValue::B(sub)) => {
            !sub.is_empty() && bytes.windows(sub.len()).any(|w| w == sub.as_slice())
        }
        _ => false,
    }
}
