//! The shared expression tokenizer
//!
//! All four expression kinds lex through the same tokenizer: attribute
//! identifiers, `#name` and `:value` placeholders, number and string
//! literals, document-path punctuation, comparators, and arithmetic signs.

use super::{ExprError, ExprResult, Operand, Placeholders};
use crate::expr::path::{DocumentPath, PathSegment};
use crate::AttributeValue;

/// A single lexed token
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// A bare identifier: attribute name, keyword, or function name
    Ident(String),
    /// A `#name` attribute-name placeholder, `#` included
    NamePlaceholder(String),
    /// A `:value` placeholder, `:` included
    ValuePlaceholder(String),
    /// A decimal number literal, sign included
    Number(String),
    /// A single- or double-quoted string literal, quotes stripped
    Str(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
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
    /// `+`
    Plus,
    /// `-`
    Minus,
}

impl Token {
    /// The token as it appeared in the source, for error messages
    pub fn text(&self) -> String {
        match self {
            Token::Ident(s) | Token::NamePlaceholder(s) | Token::ValuePlaceholder(s)
            | Token::Number(s) => s.clone(),
            Token::Str(s) => format!("'{s}'"),
            Token::LParen => "(".to_owned(),
            Token::RParen => ")".to_owned(),
            Token::Comma => ",".to_owned(),
            Token::Dot => ".".to_owned(),
            Token::LBracket => "[".to_owned(),
            Token::RBracket => "]".to_owned(),
            Token::Eq => "=".to_owned(),
            Token::Ne => "<>".to_owned(),
            Token::Lt => "<".to_owned(),
            Token::Le => "<=".to_owned(),
            Token::Gt => ">".to_owned(),
            Token::Ge => ">=".to_owned(),
            Token::Plus => "+".to_owned(),
            Token::Minus => "-".to_owned(),
        }
    }

    /// Whether the token is the given keyword, case-insensitively
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(word) if word.eq_ignore_ascii_case(keyword))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_placeholder_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Lex an expression into tokens
pub fn tokenize(input: &str) -> ExprResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' | ':' => {
                chars.next();
                let mut word = String::new();
                if matches!(chars.peek(), Some(&c) if is_ident_start(c)) {
                    while let Some(&c) = chars.peek() {
                        if is_placeholder_continue(c) {
                            word.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                if word.is_empty() {
                    return Err(syntax_error(&c.to_string()));
                }
                let token = format!("{c}{word}");
                tokens.push(if c == '#' {
                    Token::NamePlaceholder(token)
                } else {
                    Token::ValuePlaceholder(token)
                });
            }
            c if c.is_ascii_digit() => {
                tokens.push(Token::Number(lex_number(&mut chars, String::new())));
            }
            '-' => {
                chars.next();
                if matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
                    tokens.push(Token::Number(lex_number(&mut chars, "-".to_owned())));
                } else {
                    tokens.push(Token::Minus);
                }
            }
            c if is_ident_start(c) => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if is_ident_continue(c) {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(word));
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => text.push(c),
                        None => return Err(syntax_error("<EOF>")),
                    }
                }
                tokens.push(Token::Str(text));
            }
            '(' => push_symbol(&mut tokens, &mut chars, Token::LParen),
            ')' => push_symbol(&mut tokens, &mut chars, Token::RParen),
            ',' => push_symbol(&mut tokens, &mut chars, Token::Comma),
            '.' => push_symbol(&mut tokens, &mut chars, Token::Dot),
            '[' => push_symbol(&mut tokens, &mut chars, Token::LBracket),
            ']' => push_symbol(&mut tokens, &mut chars, Token::RBracket),
            '+' => push_symbol(&mut tokens, &mut chars, Token::Plus),
            '=' => push_symbol(&mut tokens, &mut chars, Token::Eq),
            '<' => {
                chars.next();
                match chars.peek() {
                    Some('>') => {
                        chars.next();
                        tokens.push(Token::Ne);
                    }
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Le);
                    }
                    _ => tokens.push(Token::Lt),
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            other => return Err(syntax_error(&other.to_string())),
        }
    }

    Ok(tokens)
}

fn push_symbol(
    tokens: &mut Vec<Token>,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    token: Token,
) {
    chars.next();
    tokens.push(token);
}

fn lex_number(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    mut text: String,
) -> String {
    let mut seen_dot = false;
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            text.push(c);
            chars.next();
        } else if c == '.' && !seen_dot {
            // A dot is only part of the number when a digit follows;
            // otherwise it is path punctuation.
            let mut lookahead = chars.clone();
            lookahead.next();
            if matches!(lookahead.peek(), Some(d) if d.is_ascii_digit()) {
                seen_dot = true;
                text.push(c);
                chars.next();
            } else {
                break;
            }
        } else {
            break;
        }
    }
    text
}

pub(crate) fn syntax_error(token: &str) -> ExprError {
    ExprError::invalid(format!("Syntax error; token: \"{token}\""))
}

/// A cursor over the token stream used by the expression parsers
#[derive(Debug)]
pub struct Tokens {
    list: Vec<Token>,
    pos: usize,
}

impl Tokens {
    /// Lex an input into a cursor
    pub fn lex(input: &str) -> ExprResult<Self> {
        Ok(Self {
            list: tokenize(input)?,
            pos: 0,
        })
    }

    /// The next token, without consuming it
    pub fn peek(&self) -> Option<&Token> {
        self.list.get(self.pos)
    }

    /// The token after next, without consuming anything
    pub fn peek_second(&self) -> Option<&Token> {
        self.list.get(self.pos + 1)
    }

    /// Consume and return the next token
    pub fn bump(&mut self) -> Option<Token> {
        let token = self.list.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Whether every token has been consumed
    pub fn at_end(&self) -> bool {
        self.pos >= self.list.len()
    }

    /// The next token's source text, or `<EOF>`
    pub fn describe_next(&self) -> String {
        self.peek()
            .map(Token::text)
            .unwrap_or_else(|| "<EOF>".to_owned())
    }

    /// Consume the next token if it equals `token`
    pub fn take(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume the next token if it is the given keyword
    pub fn take_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(t) if t.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Require the next token to equal `token`
    pub fn expect(&mut self, token: &Token) -> ExprResult<()> {
        if self.take(token) {
            Ok(())
        } else {
            Err(syntax_error(&self.describe_next()))
        }
    }

    /// Parse a document path at the cursor
    ///
    /// `segment([N])*(.segment([N])*)*` where each segment is a bare
    /// identifier or a resolved `#name` placeholder.
    pub fn parse_path(&mut self, placeholders: &Placeholders<'_>) -> ExprResult<DocumentPath> {
        let mut segments = Vec::new();
        loop {
            let name = match self.bump() {
                Some(Token::Ident(name)) => name,
                Some(Token::NamePlaceholder(token)) => placeholders.name(&token)?,
                Some(other) => return Err(syntax_error(&other.text())),
                None => return Err(syntax_error("<EOF>")),
            };
            segments.push(PathSegment::Attribute(name));
            while self.take(&Token::LBracket) {
                let index = match self.bump() {
                    Some(Token::Number(text)) => text
                        .parse::<usize>()
                        .map_err(|_| syntax_error(&text))?,
                    Some(other) => return Err(syntax_error(&other.text())),
                    None => return Err(syntax_error("<EOF>")),
                };
                self.expect(&Token::RBracket)?;
                segments.push(PathSegment::Index(index));
            }
            if !self.take(&Token::Dot) {
                break;
            }
        }
        Ok(DocumentPath::new(segments))
    }

    /// Parse a value token or document path at the cursor
    ///
    /// Value tokens are number literals, string literals, `true`/`false`/
    /// `null`, `size(path)`, and value placeholders; anything else that
    /// starts like an identifier is a document path.
    pub fn parse_operand(&mut self, placeholders: &Placeholders<'_>) -> ExprResult<Operand> {
        let Some(token) = self.peek().cloned() else {
            return Err(syntax_error("<EOF>"));
        };
        match token {
            Token::ValuePlaceholder(token) => {
                self.bump();
                Ok(Operand::Value(placeholders.value(&token)?))
            }
            Token::Number(text) => {
                self.bump();
                Ok(Operand::Value(AttributeValue::N(text)))
            }
            Token::Str(text) => {
                self.bump();
                Ok(Operand::Value(AttributeValue::S(text)))
            }
            token if token.is_keyword("true") => {
                self.bump();
                Ok(Operand::Value(AttributeValue::Bool(true)))
            }
            token if token.is_keyword("false") => {
                self.bump();
                Ok(Operand::Value(AttributeValue::Bool(false)))
            }
            token if token.is_keyword("null") => {
                self.bump();
                Ok(Operand::Value(AttributeValue::Null(true)))
            }
            token
                if token.is_keyword("size") && self.peek_second() == Some(&Token::LParen) =>
            {
                self.bump();
                self.expect(&Token::LParen)?;
                let path = self.parse_path(placeholders)?;
                self.expect(&Token::RParen)?;
                Ok(Operand::Size(path))
            }
            Token::Ident(_) | Token::NamePlaceholder(_) => {
                Ok(Operand::Path(self.parse_path(placeholders)?))
            }
            other => Err(ExprError::unsupported(format!(
                "Unsupported value token: \"{}\"",
                other.text()
            ))),
        }
    }
}
