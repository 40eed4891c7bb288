//! Block resolver for the Forge language.
//!
//! Forge control flow lives in the same postfix stream as data, so the
//! evaluator cannot discover block boundaries on the fly. A single forward
//! pass over the tokens pairs every opener (`if`, `while`, `for`, `times`,
//! `def`) with its `else` (if any) and `end`, producing a jump table the VM
//! consults in O(1), and registers every procedure body.

use crate::token::{Span, Token, TokenKind};
use std::collections::HashMap;
use std::ops::Range;
use thiserror::Error;

/// Resolver error.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("`end` at {span} closes nothing")]
    StrayEnd { span: Span },

    #[error("`else` at {span} has no open block")]
    StrayElse { span: Span },

    #[error("`else` at {span} does not belong to an `if`")]
    ElseOutsideIf { span: Span },

    #[error("duplicate `else` at {span}")]
    DuplicateElse { span: Span },

    #[error("{kind} opened at {span} is never closed with `end`")]
    UnterminatedBlock { kind: BlockKind, span: Span },

    #[error("`def` at {span} must be followed by a procedure name, found {found}")]
    MissingProcName { span: Span, found: String },
}

impl ResolveError {
    /// Get the source span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            ResolveError::StrayEnd { span }
            | ResolveError::StrayElse { span }
            | ResolveError::ElseOutsideIf { span }
            | ResolveError::DuplicateElse { span }
            | ResolveError::UnterminatedBlock { span, .. }
            | ResolveError::MissingProcName { span, .. } => *span,
        }
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// What kind of block an opener starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    If,
    While,
    For,
    Times,
    Def,
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BlockKind::If => "`if`",
            BlockKind::While => "`while`",
            BlockKind::For => "`for`",
            BlockKind::Times => "`times`",
            BlockKind::Def => "`def`",
        };
        write!(f, "{}", s)
    }
}

/// A resolved block: the opener's paired `else` and `end` token indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    /// Index of the `else` token, for `if` blocks that have one.
    pub else_index: Option<usize>,
    /// Index of the matching `end` token.
    pub end_index: usize,
}

/// The jump and procedure tables for a resolved token range.
///
/// All indices are absolute into the token buffer the resolver was given,
/// so tables from successive REPL lines can be merged.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Opener token index → its block.
    pub blocks: HashMap<usize, Block>,
    /// `end` token index → its opener's index.
    pub ends: HashMap<usize, usize>,
    /// `else` token index → the matching `end` index.
    pub elses: HashMap<usize, usize>,
    /// Procedures registered by `def`, with body range `opener+2 .. end`.
    pub procs: Vec<(String, Range<usize>)>,
}

/// An open frame during the scan.
struct OpenBlock {
    kind: BlockKind,
    opener: usize,
    else_index: Option<usize>,
    /// Procedure name, for `def` frames.
    name: Option<String>,
}

/// Resolve the tokens from `start` to the end of the buffer. Every block
/// opened at or after `start` must close before the buffer ends.
pub fn resolve(tokens: &[Token], start: usize) -> ResolveResult<Resolution> {
    let mut resolution = Resolution::default();
    let mut open: Vec<OpenBlock> = Vec::new();

    let mut index = start;
    while index < tokens.len() {
        match &tokens[index].kind {
            TokenKind::If => open.push(OpenBlock {
                kind: BlockKind::If,
                opener: index,
                else_index: None,
                name: None,
            }),
            TokenKind::While => open.push(OpenBlock {
                kind: BlockKind::While,
                opener: index,
                else_index: None,
                name: None,
            }),
            TokenKind::For => open.push(OpenBlock {
                kind: BlockKind::For,
                opener: index,
                else_index: None,
                name: None,
            }),
            TokenKind::Times => open.push(OpenBlock {
                kind: BlockKind::Times,
                opener: index,
                else_index: None,
                name: None,
            }),
            TokenKind::Def => {
                let name = match tokens.get(index + 1).map(|t| &t.kind) {
                    Some(TokenKind::Word(name)) => name.clone(),
                    Some(other) => {
                        return Err(ResolveError::MissingProcName {
                            span: tokens[index].span,
                            found: other.describe(),
                        })
                    }
                    None => {
                        return Err(ResolveError::MissingProcName {
                            span: tokens[index].span,
                            found: "end of input".to_string(),
                        })
                    }
                };
                open.push(OpenBlock {
                    kind: BlockKind::Def,
                    opener: index,
                    else_index: None,
                    name: Some(name),
                });
                // Skip the name so it is not read as a word of the body.
                index += 1;
            }
            TokenKind::Else => {
                let span = tokens[index].span;
                let frame = open.last_mut().ok_or(ResolveError::StrayElse { span })?;
                if frame.kind != BlockKind::If {
                    return Err(ResolveError::ElseOutsideIf { span });
                }
                if frame.else_index.is_some() {
                    return Err(ResolveError::DuplicateElse { span });
                }
                frame.else_index = Some(index);
            }
            TokenKind::End => {
                let span = tokens[index].span;
                let frame = open.pop().ok_or(ResolveError::StrayEnd { span })?;
                resolution.blocks.insert(
                    frame.opener,
                    Block {
                        kind: frame.kind,
                        else_index: frame.else_index,
                        end_index: index,
                    },
                );
                resolution.ends.insert(index, frame.opener);
                if let Some(else_index) = frame.else_index {
                    resolution.elses.insert(else_index, index);
                }
                if let Some(name) = frame.name {
                    resolution.procs.push((name, frame.opener + 2..index));
                }
            }
            _ => {}
        }
        index += 1;
    }

    if let Some(frame) = open.pop() {
        return Err(ResolveError::UnterminatedBlock {
            kind: frame.kind,
            span: tokens[frame.opener].span,
        });
    }

    Ok(resolution)
}
