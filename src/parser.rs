use crate::lexer::{LexerError, Token, TokenKind};
use crate::types::Value;
use std::iter::Peekable;
use std::vec::IntoIter; // To iterate over Vec<Token>
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse Error: Unexpected end of input during parsing. Expected {0}")]
    UnexpectedEof(String),
    #[error("Lexer Error during parse: {0}")]
    LexerError(#[from] LexerError),
}

// Result type alias for convenience
pub type ParseResult<T> = Result<T, ParseError>;

/// Classifies a single atom: a base-10 signed integer, otherwise a symbol taken verbatim.
pub fn classify(token: &str) -> Value {
    match token.parse::<i64>() {
        Ok(n) => Value::Integer(n),
        Err(_) => Value::Symbol(token.to_string()),
    }
}

pub struct Parser {
    // We iterate over owned Tokens, consuming them.
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into_iter().peekable(),
        }
    }

    // Consumes the next token if available.
    fn next_token(&mut self) -> Option<Token> {
        self.tokens.next()
    }

    /// Parses the rest of a list whose `(` has already been consumed, up to and including
    /// the matching `)`. A list closed before any element is Nil.
    pub fn parse_list(&mut self) -> ParseResult<Value> {
        let mut elements = Vec::new();
        loop {
            match self.next_token() {
                Some(Token {
                    kind: TokenKind::RParen,
                    ..
                }) => {
                    return Ok(if elements.is_empty() {
                        Value::Nil
                    } else {
                        Value::list(elements)
                    });
                }
                Some(Token {
                    kind: TokenKind::LParen,
                    ..
                }) => elements.push(self.parse_list()?),
                Some(Token {
                    kind: TokenKind::Atom(text),
                    ..
                }) => elements.push(classify(&text)),
                None => return Err(ParseError::UnexpectedEof("')'".to_string())),
            }
        }
    }

    /// Parses one top-level form. Tokens after it are discarded.
    pub fn parse(mut self) -> ParseResult<Value> {
        let expr = match self.next_token() {
            Some(Token {
                kind: TokenKind::LParen,
                ..
            }) => self.parse_list()?,
            // A lone `)` closes an empty list
            Some(Token {
                kind: TokenKind::RParen,
                ..
            }) => Value::Nil,
            Some(Token {
                kind: TokenKind::Atom(text),
                ..
            }) => classify(&text),
            None => return Err(ParseError::UnexpectedEof("an expression".to_string())),
        };

        if self.tokens.peek().is_some() {
            debug!(
                discarded = self.tokens.len(),
                "ignoring tokens after the first form"
            );
        }
        Ok(expr)
    }
}

// Helper function to lex and parse a string directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> ParseResult<Value> {
    let tokens = crate::lexer::tokenize(input)?;
    Parser::new(tokens).parse()
}
