// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parser for `start_on` / `stop_on` expressions.
//!
//! The language is a boolean expression over event matches:
//!
//! ```text
//! start_on = "net-up IFACE=eth0 and (filesystem or container)"
//! stop_on  = "net-down IFACE=$IFACE"
//! ```
//!
//! `and` binds tighter than `or`; parentheses group. A match term is an
//! event name followed by argument matchers: `KEY=value` compares the named
//! event variable, `KEY=$VAR` compares against the job environment at
//! evaluation time, and a bare `value` matches event variables positionally.

use thiserror::Error;
use warden_core::operator::{ArgMatch, MatchSpec, Operator, ValueMatch};

/// Errors from expression parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OnParseError {
    #[error("empty expression")]
    Empty,

    #[error("expected event name, found {0:?}")]
    ExpectedEventName(String),

    #[error("unexpected token {0:?}")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unbalanced parenthesis")]
    UnbalancedParen,

    #[error("unterminated quoted string")]
    UnterminatedString,

    #[error("invalid variable reference {0:?}")]
    InvalidReference(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Atom(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, OnParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            _ => {
                // An atom runs to the next delimiter; a double-quoted
                // section inside it (KEY="two words") keeps its spaces.
                let mut atom = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    if c == '"' {
                        chars.next();
                        loop {
                            match chars.next() {
                                Some('"') => break,
                                Some('\\') => match chars.next() {
                                    Some(escaped) => atom.push(escaped),
                                    None => return Err(OnParseError::UnterminatedString),
                                },
                                Some(c) => atom.push(c),
                                None => return Err(OnParseError::UnterminatedString),
                            }
                        }
                        continue;
                    }
                    atom.push(c);
                    chars.next();
                }
                tokens.push(match atom.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    _ => Token::Atom(atom),
                });
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    // expr := and_expr ('or' and_expr)*
    fn expr(&mut self) -> Result<Operator, OnParseError> {
        let mut terms = vec![self.and_expr()?];
        while matches!(self.peek(), Some(Token::Or)) {
            self.next();
            terms.push(self.and_expr()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Operator::or(terms)
        })
    }

    // and_expr := term ('and' term)*
    fn and_expr(&mut self) -> Result<Operator, OnParseError> {
        let mut terms = vec![self.term()?];
        while matches!(self.peek(), Some(Token::And)) {
            self.next();
            terms.push(self.term()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Operator::and(terms)
        })
    }

    // term := '(' expr ')' | match
    fn term(&mut self) -> Result<Operator, OnParseError> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(_) | None => Err(OnParseError::UnbalancedParen),
                }
            }
            Some(Token::Atom(name)) => {
                if name.contains('=') {
                    return Err(OnParseError::ExpectedEventName(name));
                }
                let mut args = Vec::new();
                while let Some(Token::Atom(_)) = self.peek() {
                    if let Some(Token::Atom(atom)) = self.next() {
                        args.push(parse_arg(&atom)?);
                    }
                }
                Ok(Operator::match_event(MatchSpec { name, args }))
            }
            Some(Token::RParen) => Err(OnParseError::UnbalancedParen),
            Some(Token::And) => Err(OnParseError::UnexpectedToken("and".into())),
            Some(Token::Or) => Err(OnParseError::UnexpectedToken("or".into())),
            None => Err(OnParseError::UnexpectedEnd),
        }
    }
}

fn parse_arg(atom: &str) -> Result<ArgMatch, OnParseError> {
    match atom.split_once('=') {
        Some((key, value)) => Ok(ArgMatch::Key {
            key: key.to_string(),
            value: parse_value(value)?,
        }),
        None => Ok(ArgMatch::Positional(parse_value(atom)?)),
    }
}

fn parse_value(value: &str) -> Result<ValueMatch, OnParseError> {
    match value.strip_prefix('$') {
        Some(var) => {
            if var.is_empty() || !var.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(OnParseError::InvalidReference(value.to_string()));
            }
            Ok(ValueMatch::Var(var.to_string()))
        }
        None => Ok(ValueMatch::Literal(value.to_string())),
    }
}

/// Parse an expression into an operator tree.
pub fn parse_on(input: &str) -> Result<Operator, OnParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(OnParseError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let op = parser.expr()?;
    match parser.next() {
        None => Ok(op),
        Some(Token::RParen) => Err(OnParseError::UnbalancedParen),
        Some(Token::Atom(atom)) => Err(OnParseError::UnexpectedToken(atom)),
        Some(Token::And) => Err(OnParseError::UnexpectedToken("and".into())),
        Some(Token::Or) => Err(OnParseError::UnexpectedToken("or".into())),
        Some(Token::LParen) => Err(OnParseError::UnexpectedToken("(".into())),
    }
}

#[cfg(test)]
#[path = "on_expr_tests.rs"]
mod tests;
