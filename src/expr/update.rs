//! Update expressions: parsing and application
//!
//! The grammar is `SET ... [REMOVE ...]` or `REMOVE ...`. `SET` assignment
//! right-hand sides may be a value token, a document path, `if_not_exists`,
//! `list_append`, or top-level `+`/`-` arithmetic over those. `ADD` and
//! `DELETE` clauses exist in the wire grammar but are outside the supported
//! subset and are rejected by name.
//!
//! All reads performed while applying an expression see the item as it was
//! before the update started.

use super::token::{Token, Tokens};
use super::{
    format_number, parse_number, type_code, values_equal, DocumentPath, ExprError, ExprResult,
    Operand, PathSegment, Placeholders,
};
use crate::keys::{PARTITION_KEY, SORT_KEY};
use crate::{AttributeValue, Item};

/// An operand of a `SET` assignment
#[derive(Clone, Debug)]
pub enum SetOperand {
    /// A literal or placeholder-resolved value
    Value(AttributeValue),
    /// The current value at a document path
    Path(DocumentPath),
    /// `if_not_exists(path, fallback)`
    IfNotExists(DocumentPath, Box<SetOperand>),
    /// `list_append(left, right)`
    ListAppend(Box<SetOperand>, Box<SetOperand>),
}

/// The right-hand side of a `SET` assignment
#[derive(Clone, Debug)]
pub enum SetValue {
    /// A bare operand
    Operand(SetOperand),
    /// `left + right` over numeric operands
    Add(SetOperand, SetOperand),
    /// `left - right` over numeric operands
    Sub(SetOperand, SetOperand),
}

/// One action of an update expression
#[derive(Clone, Debug)]
pub enum UpdateAction {
    /// Assign a value at a path
    Set {
        /// The assignment target
        path: DocumentPath,
        /// The assigned value
        value: SetValue,
    },
    /// Remove the value at a path
    Remove {
        /// The removal target
        path: DocumentPath,
    },
}

/// A parsed update expression
#[derive(Clone, Debug)]
pub struct UpdateExpression {
    actions: Vec<UpdateAction>,
}

impl UpdateExpression {
    /// The actions, in source order
    pub fn actions(&self) -> &[UpdateAction] {
        &self.actions
    }

    /// Apply the expression to an item in place
    ///
    /// Every operand reference resolves against the item as it stood before
    /// the first action ran.
    pub fn apply(&self, item: &mut Item) -> ExprResult<()> {
        let base = item.clone();
        for action in &self.actions {
            match action {
                UpdateAction::Set { path, value } => {
                    let value = eval_set_value(value, &base)?;
                    set_at_path(item, path, value, &base)?;
                }
                UpdateAction::Remove { path } => remove_at_path(item, path)?,
            }
        }
        Ok(())
    }
}

/// Parse an update expression
pub fn parse_update(input: &str, placeholders: &Placeholders<'_>) -> ExprResult<UpdateExpression> {
    let mut tokens = Tokens::lex(input)?;
    let mut actions = Vec::new();

    reject_unsupported_clause(&tokens)?;

    if tokens.take_keyword("SET") {
        if tokens.at_end() {
            return Err(empty_body("SET"));
        }
        loop {
            let path = tokens.parse_path(placeholders)?;
            tokens.expect(&Token::Eq)?;
            let value = parse_set_value(&mut tokens, placeholders)?;
            actions.push(UpdateAction::Set { path, value });
            if !tokens.take(&Token::Comma) {
                break;
            }
        }
        reject_unsupported_clause(&tokens)?;
    }

    if tokens.take_keyword("REMOVE") {
        if tokens.at_end() {
            return Err(empty_body("REMOVE"));
        }
        loop {
            let path = tokens.parse_path(placeholders)?;
            actions.push(UpdateAction::Remove { path });
            if !tokens.take(&Token::Comma) {
                break;
            }
        }
        reject_unsupported_clause(&tokens)?;
    }

    if actions.is_empty() || !tokens.at_end() {
        return Err(invalid_update_syntax(&tokens.describe_next()));
    }

    Ok(UpdateExpression { actions })
}

fn parse_set_value(tokens: &mut Tokens, placeholders: &Placeholders<'_>) -> ExprResult<SetValue> {
    let left = parse_set_operand(tokens, placeholders)?;
    if tokens.take(&Token::Plus) {
        let right = parse_set_operand(tokens, placeholders)?;
        Ok(SetValue::Add(left, right))
    } else if tokens.take(&Token::Minus) {
        let right = parse_set_operand(tokens, placeholders)?;
        Ok(SetValue::Sub(left, right))
    } else {
        Ok(SetValue::Operand(left))
    }
}

fn parse_set_operand(
    tokens: &mut Tokens,
    placeholders: &Placeholders<'_>,
) -> ExprResult<SetOperand> {
    if let (Some(Token::Ident(name)), Some(Token::LParen)) = (tokens.peek(), tokens.peek_second())
    {
        if name.eq_ignore_ascii_case("if_not_exists") {
            tokens.bump();
            tokens.expect(&Token::LParen)?;
            let path = tokens.parse_path(placeholders)?;
            tokens.expect(&Token::Comma)?;
            let fallback = parse_set_operand(tokens, placeholders)?;
            tokens.expect(&Token::RParen)?;
            return Ok(SetOperand::IfNotExists(path, Box::new(fallback)));
        }
        if name.eq_ignore_ascii_case("list_append") {
            tokens.bump();
            tokens.expect(&Token::LParen)?;
            let left = parse_set_operand(tokens, placeholders)?;
            tokens.expect(&Token::Comma)?;
            let right = parse_set_operand(tokens, placeholders)?;
            tokens.expect(&Token::RParen)?;
            return Ok(SetOperand::ListAppend(Box::new(left), Box::new(right)));
        }
        return Err(ExprError::unsupported(format!(
            "Invalid function name; function: {name}"
        )));
    }

    match tokens.parse_operand(placeholders)? {
        Operand::Value(value) => Ok(SetOperand::Value(value)),
        Operand::Path(path) => Ok(SetOperand::Path(path)),
        Operand::Size(_) => Err(ExprError::unsupported(
            "Invalid function name; function: size",
        )),
    }
}

fn reject_unsupported_clause(tokens: &Tokens) -> ExprResult<()> {
    for clause in ["ADD", "DELETE"] {
        if matches!(tokens.peek(), Some(t) if t.is_keyword(clause)) {
            return Err(ExprError::unsupported(format!(
                "Unsupported update operation: \"{clause}\""
            )));
        }
    }
    Ok(())
}

fn empty_body(keyword: &str) -> ExprError {
    ExprError::invalid(format!(
        "Invalid UpdateExpression: Syntax error; token: \"<EOF>\", near: \"{keyword}\""
    ))
}

fn invalid_update_syntax(token: &str) -> ExprError {
    ExprError::invalid(format!(
        "Invalid UpdateExpression: Syntax error; token: \"{token}\""
    ))
}

fn eval_set_value(value: &SetValue, base: &Item) -> ExprResult<AttributeValue> {
    match value {
        SetValue::Operand(op) => eval_set_operand(op, base),
        SetValue::Add(left, right) => arithmetic(left, right, base, "+"),
        SetValue::Sub(left, right) => arithmetic(left, right, base, "-"),
    }
}

fn arithmetic(
    left: &SetOperand,
    right: &SetOperand,
    base: &Item,
    operator: &str,
) -> ExprResult<AttributeValue> {
    let left = eval_set_operand(left, base)?;
    let right = eval_set_operand(right, base)?;
    let (a, b) = match (&left, &right) {
        (AttributeValue::N(a), AttributeValue::N(b)) => {
            match (parse_number(a), parse_number(b)) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(operand_type_error(operator, "N")),
            }
        }
        (AttributeValue::N(_), other) | (other, _) => {
            return Err(operand_type_error(operator, type_code(other)))
        }
    };
    let result = if operator == "+" { a + b } else { a - b };
    Ok(AttributeValue::N(format_number(result)))
}

fn eval_set_operand(operand: &SetOperand, base: &Item) -> ExprResult<AttributeValue> {
    match operand {
        SetOperand::Value(value) => Ok(value.clone()),
        SetOperand::Path(path) => path.resolve(base).cloned().ok_or_else(|| {
            ExprError::invalid(
                "The provided expression refers to an attribute that does not exist in the item",
            )
        }),
        SetOperand::IfNotExists(path, fallback) => match path.resolve(base) {
            Some(value) => Ok(value.clone()),
            None => eval_set_operand(fallback, base),
        },
        SetOperand::ListAppend(left, right) => {
            let left = eval_set_operand(left, base)?;
            let right = eval_set_operand(right, base)?;
            match (left, right) {
                (AttributeValue::L(mut left), AttributeValue::L(right)) => {
                    left.extend(right);
                    Ok(AttributeValue::L(left))
                }
                (AttributeValue::L(_), other) | (other, _) => {
                    Err(operand_type_error("list_append", type_code(&other)))
                }
            }
        }
    }
}

fn operand_type_error(operator: &str, code: &str) -> ExprError {
    ExprError::invalid(format!(
        "Incorrect operand type for operator or function; \
         operator or function: {operator}, operand type: {code}"
    ))
}

fn invalid_document_path() -> ExprError {
    ExprError::invalid("The document path provided in the update expression is invalid for update")
}

fn is_key_attribute(name: &str) -> bool {
    name == PARTITION_KEY || name == SORT_KEY
}

fn set_at_path(
    item: &mut Item,
    path: &DocumentPath,
    value: AttributeValue,
    base: &Item,
) -> ExprResult<()> {
    let root = path.root();
    if is_key_attribute(root) {
        // The primary key is immutable; writing the current value back is
        // tolerated as a no-op.
        let unchanged = path.is_top_level()
            && base.get(root).map_or(false, |current| values_equal(current, &value));
        if unchanged {
            return Ok(());
        }
        return Err(ExprError::key_attribute(root));
    }

    let segments = path.segments();
    if segments.len() == 1 {
        item.insert(root.to_owned(), value);
        return Ok(());
    }

    let parents = &segments[1..segments.len() - 1];
    let leaf = &segments[segments.len() - 1];

    let mut current = item.get_mut(root).ok_or_else(invalid_document_path)?;
    for segment in parents {
        current = step_mut(current, segment).ok_or_else(invalid_document_path)?;
    }

    match (current, leaf) {
        (AttributeValue::M(map), PathSegment::Attribute(name)) => {
            map.insert(name.clone(), value);
            Ok(())
        }
        (AttributeValue::L(list), PathSegment::Index(idx)) => {
            // A list may grow by exactly one position.
            if *idx < list.len() {
                list[*idx] = value;
                Ok(())
            } else if *idx == list.len() {
                list.push(value);
                Ok(())
            } else {
                Err(invalid_document_path())
            }
        }
        _ => Err(invalid_document_path()),
    }
}

fn remove_at_path(item: &mut Item, path: &DocumentPath) -> ExprResult<()> {
    let root = path.root();
    if is_key_attribute(root) {
        return Err(ExprError::key_attribute(root));
    }

    let segments = path.segments();
    if segments.len() == 1 {
        item.remove(root);
        return Ok(());
    }

    let parents = &segments[1..segments.len() - 1];
    let leaf = &segments[segments.len() - 1];

    let Some(mut current) = item.get_mut(root) else {
        return Ok(());
    };
    for segment in parents {
        match step_mut(current, segment) {
            Some(next) => current = next,
            // Missing intermediate steps are tolerated on REMOVE.
            None => return Ok(()),
        }
    }

    match (current, leaf) {
        (AttributeValue::M(map), PathSegment::Attribute(name)) => {
            map.remove(name);
        }
        (AttributeValue::L(list), PathSegment::Index(idx)) => {
            if *idx < list.len() {
                list.remove(*idx);
            }
        }
        _ => {}
    }
    Ok(())
}

fn step_mut<'a>(
    current: &'a mut AttributeValue,
    segment: &PathSegment,
) -> Option<&'a mut AttributeValue> {
    match (current, segment) {
        (AttributeValue::M(map), PathSegment::Attribute(name)) => map.get_mut(name),
        (AttributeValue::L(list), PathSegment::Index(idx)) => list.get_mut(*idx),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn values(pairs: &[(&str, AttributeValue)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    fn base_item() -> Item {
        let mut item = Item::new();
        item.insert("PK".to_owned(), AttributeValue::S("K".to_owned()));
        item.insert("SK".to_owned(), AttributeValue::S("S".to_owned()));
        item.insert("count".to_owned(), AttributeValue::N("3".to_owned()));
        item.insert(
            "tags".to_owned(),
            AttributeValue::L(vec![AttributeValue::S("a".to_owned())]),
        );
        let mut nested = HashMap::new();
        nested.insert("inner".to_owned(), AttributeValue::N("1".to_owned()));
        item.insert("meta".to_owned(), AttributeValue::M(nested));
        item
    }

    fn apply(expr: &str, vals: &Item, item: &mut Item) -> ExprResult<()> {
        let placeholders = Placeholders::new(None, Some(vals));
        parse_update(expr, &placeholders)?.apply(item)
    }

    #[test]
    fn set_simple_and_nested() {
        let mut item = base_item();
        let vals = values(&[
            (":v", AttributeValue::S("x".to_owned())),
            (":n", AttributeValue::N("9".to_owned())),
        ]);
        apply("SET name = :v, meta.inner = :n", &vals, &mut item).unwrap();
        assert_eq!(item["name"], AttributeValue::S("x".to_owned()));
        let AttributeValue::M(meta) = &item["meta"] else {
            panic!("meta must stay a map");
        };
        assert_eq!(meta["inner"], AttributeValue::N("9".to_owned()));
    }

    #[test]
    fn if_not_exists_with_arithmetic_seeds_and_increments() {
        let mut item = base_item();
        item.remove("count");
        let vals = values(&[
            (":z", AttributeValue::N("0".to_owned())),
            (":inc", AttributeValue::N("2".to_owned())),
        ]);
        apply("SET count = if_not_exists(count, :z) + :inc", &vals, &mut item).unwrap();
        assert_eq!(item["count"], AttributeValue::N("2".to_owned()));

        let vals = values(&[
            (":z", AttributeValue::N("0".to_owned())),
            (":inc", AttributeValue::N("3".to_owned())),
        ]);
        apply("SET count = if_not_exists(count, :z) + :inc", &vals, &mut item).unwrap();
        assert_eq!(item["count"], AttributeValue::N("5".to_owned()));
    }

    #[test]
    fn later_assignments_read_original_values() {
        let mut item = base_item();
        let vals = values(&[(":ten", AttributeValue::N("10".to_owned()))]);
        apply("SET count = :ten, prior = count", &vals, &mut item).unwrap();
        assert_eq!(item["count"], AttributeValue::N("10".to_owned()));
        assert_eq!(item["prior"], AttributeValue::N("3".to_owned()));
    }

    #[test]
    fn list_append_concatenates() {
        let mut item = base_item();
        let vals = values(&[(
            ":more",
            AttributeValue::L(vec![AttributeValue::S("b".to_owned())]),
        )]);
        apply("SET tags = list_append(tags, :more)", &vals, &mut item).unwrap();
        assert_eq!(
            item["tags"],
            AttributeValue::L(vec![
                AttributeValue::S("a".to_owned()),
                AttributeValue::S("b".to_owned()),
            ])
        );
    }

    #[test]
    fn list_append_requires_lists() {
        let mut item = base_item();
        let vals = values(&[(":s", AttributeValue::S("b".to_owned()))]);
        let err = apply("SET tags = list_append(tags, :s)", &vals, &mut item).unwrap_err();
        assert!(err.to_string().contains("list_append"));
        assert!(err.to_string().contains("operand type: S"));
    }

    #[test]
    fn arithmetic_requires_numbers() {
        let mut item = base_item();
        let vals = values(&[(":s", AttributeValue::S("x".to_owned()))]);
        let err = apply("SET count = count + :s", &vals, &mut item).unwrap_err();
        assert!(err.to_string().contains("operator or function: +"));
        assert!(err.to_string().contains("operand type: S"));
    }

    #[test]
    fn lists_extend_by_exactly_one() {
        let mut item = base_item();
        let vals = values(&[(":v", AttributeValue::S("new".to_owned()))]);
        apply("SET tags[1] = :v", &vals, &mut item).unwrap();
        let AttributeValue::L(tags) = &item["tags"] else {
            panic!("tags must stay a list");
        };
        assert_eq!(tags.len(), 2);

        let err = apply("SET tags[9] = :v", &vals, &mut item).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The document path provided in the update expression is invalid for update"
        );
    }

    #[test]
    fn missing_parents_fail_set_but_not_remove() {
        let mut item = base_item();
        let vals = values(&[(":v", AttributeValue::S("x".to_owned()))]);
        let err = apply("SET ghost.child = :v", &vals, &mut item).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The document path provided in the update expression is invalid for update"
        );

        apply("REMOVE ghost.child, meta.inner", &vals, &mut item).unwrap();
        let AttributeValue::M(meta) = &item["meta"] else {
            panic!("meta must stay a map");
        };
        assert!(meta.is_empty());
    }

    #[test]
    fn key_attributes_are_immutable() {
        let mut item = base_item();
        let vals = values(&[(":v", AttributeValue::S("other".to_owned()))]);
        let err = apply("SET PK = :v", &vals, &mut item).unwrap_err();
        assert_eq!(
            err.to_string(),
            "One or more parameter values were invalid: \
             Cannot update attribute PK. This attribute is part of the key"
        );

        let err = apply("REMOVE SK", &vals, &mut item).unwrap_err();
        assert!(err.to_string().contains("Cannot update attribute SK"));

        // Writing the current key back is a tolerated no-op
        let vals = values(&[(":k", AttributeValue::S("K".to_owned()))]);
        apply("SET PK = :k", &vals, &mut item).unwrap();
        assert_eq!(item["PK"], AttributeValue::S("K".to_owned()));
    }

    #[test]
    fn empty_bodies_name_the_keyword_and_eof() {
        let vals = Item::new();
        let placeholders = Placeholders::new(None, Some(&vals));
        let err = parse_update("SET", &placeholders).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid UpdateExpression: Syntax error; token: \"<EOF>\", near: \"SET\""
        );
        let err = parse_update("REMOVE", &placeholders).unwrap_err();
        assert!(err.to_string().contains("\"REMOVE\""));
        assert!(err.to_string().contains("<EOF>"));
    }

    #[test]
    fn add_and_delete_clauses_are_rejected_by_name() {
        let vals = values(&[(":n", AttributeValue::N("1".to_owned()))]);
        let placeholders = Placeholders::new(None, Some(&vals));
        let err = parse_update("ADD count :n", &placeholders).unwrap_err();
        assert!(err.to_string().contains("\"ADD\""));
        let err = parse_update("SET a = :n DELETE tags :n", &placeholders).unwrap_err();
        assert!(err.to_string().contains("\"DELETE\""));
    }

    #[test]
    fn set_then_remove_in_one_expression() {
        let mut item = base_item();
        let vals = values(&[(":v", AttributeValue::S("x".to_owned()))]);
        apply("SET name = :v REMOVE count", &vals, &mut item).unwrap();
        assert_eq!(item["name"], AttributeValue::S("x".to_owned()));
        assert!(!item.contains_key("count"));
    }
}
