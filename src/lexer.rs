use logos::Logos;
use std::fmt;
use thiserror::Error;

use crate::Span;

/// Token kinds. Parentheses always stand alone; everything else between
/// whitespace and parentheses is a single atom, classified later by the parser.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"\s+")] // Skip whitespace
#[logos(error = LexerErrorKind)]
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex(r"[^()\s]+", |lex| lex.slice().to_string())]
    Atom(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Atom(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Error, Default, Debug, Clone, PartialEq)]
pub enum LexerErrorKind {
    #[default]
    #[error("Invalid Token")]
    InvalidToken,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct LexerError {
    pub error: LexerErrorKind,
    pub span: Span,
}

// Result type alias for convenience
type LexerRangedResult<T> = Result<T, LexerError>;

/// Splits raw text into tokens: `(` and `)` on their own, whitespace-separated atoms otherwise.
pub fn tokenize(input: &str) -> LexerRangedResult<Vec<Token>> {
    TokenKind::lexer(input)
        .spanned() // This yields Result<(TokenKind, Range<usize>), LexerErrorKind>
        .map(|(result, range)| match result {
            Ok(kind) => Ok(Token {
                kind,
                span: range.into(),
            }),
            Err(error) => Err(LexerError {
                error,
                span: range.into(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to simplify testing token sequences
    fn assert_tokens(input: &str, expected: Vec<TokenKind>) {
        match tokenize(input) {
            Ok(tokens) => {
                let kinds: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
                assert_eq!(kinds, expected, "Input: '{}'", input);
            }
            Err(e) => panic!("Lexing failed for input '{}': {}", input, e.error),
        }
    }

    fn atom(s: &str) -> TokenKind {
        TokenKind::Atom(s.to_string())
    }

    #[test]
    fn test_empty_input() {
        assert_tokens("", vec![]);
        assert_tokens("  \n\t ", vec![]);
    }

    #[test]
    fn test_parentheses() {
        assert_tokens("()", vec![TokenKind::LParen, TokenKind::RParen]);
        assert_tokens("( )", vec![TokenKind::LParen, TokenKind::RParen]);
        assert_tokens(
            "(()))",
            vec![
                TokenKind::LParen,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::RParen,
                TokenKind::RParen,
            ],
        );
    }

    #[test]
    fn test_parens_split_atoms() {
        // No whitespace needed around parentheses
        assert_tokens(
            "(+ 1(* 2 3))",
            vec![
                TokenKind::LParen,
                atom("+"),
                atom("1"),
                TokenKind::LParen,
                atom("*"),
                atom("2"),
                atom("3"),
                TokenKind::RParen,
                TokenKind::RParen,
            ],
        );
        assert_tokens("a)b", vec![atom("a"), TokenKind::RParen, atom("b")]);
    }

    #[test]
    fn test_atoms_are_verbatim() {
        // No string, comment or quote syntax: everything else is part of an atom
        assert_tokens("set!", vec![atom("set!")]);
        assert_tokens("'x", vec![atom("'x")]);
        assert_tokens("\"hi\"", vec![atom("\"hi\"")]);
        assert_tokens("; not-a-comment", vec![atom(";"), atom("not-a-comment")]);
        assert_tokens("-12", vec![atom("-12")]);
        assert_tokens("🍕+☕", vec![atom("🍕+☕")]);
    }

    #[test]
    fn test_sequences_and_whitespace() {
        assert_tokens(
            "  ( def  id\n (x)\tx )  ",
            vec![
                TokenKind::LParen,
                atom("def"),
                atom("id"),
                TokenKind::LParen,
                atom("x"),
                TokenKind::RParen,
                atom("x"),
                TokenKind::RParen,
            ],
        );
    }

    #[test]
    fn test_tokenize_spans() {
        let input = "(+ 12)";
        let tokens = tokenize(input).expect("Should tokenize successfully");

        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].span, Span::new(0, 1));
        assert_eq!(tokens[1].span, Span::new(1, 2));
        assert_eq!(tokens[2].kind, atom("12"));
        assert_eq!(tokens[2].span, Span::new(3, 5)); // Space is skipped
        assert_eq!(tokens[3].span, Span::new(5, 6));
    }
}
