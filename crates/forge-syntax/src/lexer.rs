//! Lexer for the Forge language.
//!
//! Converts source text into a flat stream of tokens. Forge has no grammar
//! beyond the token level: everything is a literal or a whitespace-delimited
//! bareword, and `#` comments run to end of line.

use crate::token::{Span, Token, TokenKind};
use std::str::Chars;
use thiserror::Error;

/// Lexer error.
#[derive(Debug, Error)]
pub enum LexError {
    #[error("unterminated string literal at {span}")]
    UnterminatedString { span: Span },

    #[error("integer literal out of range at {span}: {text}")]
    IntOutOfRange { text: String, span: Span },
}

impl LexError {
    /// Get the source span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            LexError::UnterminatedString { span } => *span,
            LexError::IntOutOfRange { span, .. } => *span,
        }
    }
}

pub type LexResult<T> = Result<T, LexError>;

/// Tokenize a complete source string.
pub fn lex(source: &str) -> LexResult<Vec<Token>> {
    Lexer::new(source).tokenize()
}

/// Lexer for Forge source code.
pub struct Lexer<'a> {
    /// Source text being lexed.
    source: &'a str,
    /// Character iterator.
    chars: Chars<'a>,
    /// Current byte position.
    pos: usize,
    /// Current line number (1-indexed).
    line: u32,
    /// Current column number (1-indexed).
    column: u32,
    /// Start position of current token.
    token_start: usize,
    /// Start line of current token.
    token_start_line: u32,
    /// Start column of current token.
    token_start_column: u32,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars(),
            pos: 0,
            line: 1,
            column: 1,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
        }
    }

    /// Tokenize the entire source.
    pub fn tokenize(mut self) -> LexResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            self.mark_token_start();

            let Some(c) = self.peek() else {
                break;
            };

            let token = if c == '"' {
                self.lex_string()?
            } else {
                self.lex_bareword()?
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Skip whitespace and `#` line comments.
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    /// Mark the start of a new token.
    fn mark_token_start(&mut self) {
        self.token_start = self.pos;
        self.token_start_line = self.line;
        self.token_start_column = self.column;
    }

    /// Peek at the current character without consuming it.
    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    /// Advance to the next character, returning the current one.
    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// The span from the marked token start to the current position.
    fn current_span(&self) -> Span {
        Span::new(
            self.token_start,
            self.pos,
            self.token_start_line,
            self.token_start_column,
        )
    }

    /// Create a token with the current span.
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.current_span())
    }

    /// Lex a string literal. Forge defines no escape sequences: a backslash
    /// is an ordinary character, and the literal ends at the next `"`.
    /// Strings cannot span lines.
    fn lex_string(&mut self) -> LexResult<Token> {
        // Skip opening quote
        self.advance();

        let content_start = self.pos;
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(LexError::UnterminatedString {
                        span: self.current_span(),
                    });
                }
                Some('"') => {
                    let content = self.source[content_start..self.pos].to_string();
                    self.advance();
                    return Ok(self.make_token(TokenKind::Str(content)));
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    /// Lex a bareword and classify it as an integer, a float, a block
    /// keyword, or a plain word. A `"` or `#` terminates the bareword.
    fn lex_bareword(&mut self) -> LexResult<Token> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '"' || c == '#' {
                break;
            }
            self.advance();
        }

        let text = &self.source[self.token_start..self.pos];

        if let Some(keyword) = TokenKind::keyword(text) {
            return Ok(self.make_token(keyword));
        }

        match classify_number(text) {
            Some(NumberShape::Int) => match text.parse::<i64>() {
                Ok(n) => Ok(self.make_token(TokenKind::Int(n))),
                Err(_) => Err(LexError::IntOutOfRange {
                    text: text.to_string(),
                    span: self.current_span(),
                }),
            },
            Some(NumberShape::Float) => {
                // A sign + digits + single point shape always parses.
                let x = text.parse::<f64>().unwrap_or(f64::INFINITY);
                Ok(self.make_token(TokenKind::Float(x)))
            }
            None => Ok(self.make_token(TokenKind::Word(text.to_string()))),
        }
    }
}

enum NumberShape {
    Int,
    Float,
}

/// Decide whether a bareword spells a number: an optional sign followed by
/// digits is an Int; with additionally a single decimal point, a Float.
fn classify_number(text: &str) -> Option<NumberShape> {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    if body.is_empty() {
        return None;
    }
    let mut digits = 0usize;
    let mut points = 0usize;
    for c in body.chars() {
        if c.is_ascii_digit() {
            digits += 1;
        } else if c == '.' {
            points += 1;
        } else {
            return None;
        }
    }
    match (digits, points) {
        (0, _) => None,
        (_, 0) => Some(NumberShape::Int),
        (_, 1) => Some(NumberShape::Float),
        _ => None,
    }
}
