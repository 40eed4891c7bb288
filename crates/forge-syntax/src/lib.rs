//! Lexer and block resolver for the Forge language.

pub mod lexer;
pub mod resolver;
pub mod token;

pub use lexer::{lex, LexError, Lexer};
pub use resolver::{resolve, Block, BlockKind, Resolution, ResolveError};
pub use token::{Span, Token, TokenKind};
