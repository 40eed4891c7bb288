//! The Forge stack VM.
//!
//! Executes a resolved token stream with a program counter, one operand
//! stack, a flat variable store, and a frame stack for loop iteration state
//! and procedure returns. Control-flow words move the PC through the jump
//! table computed by the resolver; everything else is a literal push or a
//! word dispatch.

use crate::builtins;
use crate::value::Value;
use forge_syntax::resolver::{Block, BlockKind};
use forge_syntax::{lex, resolve, LexError, ResolveError, Token, TokenKind};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::ops::Range;
use thiserror::Error;

/// Runtime error.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("stack underflow")]
    StackUnderflow,

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("unbound variable `{0}`")]
    UnboundVariable(String),

    #[error("unknown word `{0}`")]
    UnknownWord(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of range for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("key not found: {0:?}")]
    KeyNotFound(String),

    #[error("element not found")]
    ElementNotFound,

    #[error("`{0}` on empty list")]
    EmptyList(&'static str),

    #[error("count for `{0}` must be a non-negative integer")]
    BadCount(&'static str),

    #[error("cannot convert {text:?} to {target}")]
    Conversion { text: String, target: &'static str },

    #[error("empty separator")]
    EmptySeparator,

    #[error("`{0}` is not supported by this interpreter")]
    Unsupported(&'static str),

    #[error("input stream is closed")]
    EndOfInput,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Any error a Forge evaluation can produce, across all pipeline stages.
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl ForgeError {
    /// Short name of the error kind, for REPL messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ForgeError::Lex(_) => "lex error",
            ForgeError::Resolve(_) => "syntax error",
            ForgeError::Eval(_) => "runtime error",
        }
    }
}

/// A frame on the control stack: loop iteration state or a procedure return.
enum Frame {
    For { index: i64, hi: i64 },
    Times { remaining: i64 },
    Call { return_pc: usize },
}

/// The Forge virtual machine.
///
/// Holds the growing token buffer and its jump/procedure tables alongside the
/// operand stack and variable store, so successive [`Vm::run`] calls behave
/// like successive REPL lines: procedures and variables defined earlier stay
/// visible, and the stack carries over.
pub struct Vm {
    /// The program so far. `run` appends; nothing is ever rewritten.
    tokens: Vec<Token>,
    /// Opener token index → resolved block.
    blocks: HashMap<usize, Block>,
    /// `end` token index → opener index.
    ends: HashMap<usize, usize>,
    /// `else` token index → matching `end` index.
    elses: HashMap<usize, usize>,
    /// Procedure name → body token range.
    procs: HashMap<String, Range<usize>>,
    /// The operand stack.
    pub(crate) stack: Vec<Value>,
    /// The flat variable store.
    pub(crate) vars: HashMap<String, Value>,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl Vm {
    /// Create a VM reading from stdin and writing to stdout.
    pub fn new() -> Self {
        Self::with_io(
            Box::new(io::BufReader::new(io::stdin())),
            Box::new(io::stdout()),
        )
    }

    /// Create a VM with the given input and output streams.
    pub fn with_io(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Self {
            tokens: Vec::new(),
            blocks: HashMap::new(),
            ends: HashMap::new(),
            elses: HashMap::new(),
            procs: HashMap::new(),
            stack: Vec::new(),
            vars: HashMap::new(),
            input,
            output,
        }
    }

    /// The current operand stack, bottom first.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Tokenize, resolve, and execute one source chunk (a file or one REPL
    /// line). On a lex or resolve error nothing is executed and the program
    /// buffer is left unchanged; on a runtime error the stack and variable
    /// store keep whatever state execution reached.
    pub fn run(&mut self, source: &str) -> Result<(), ForgeError> {
        let mut fresh = lex(source)?;
        let start = self.tokens.len();
        self.tokens.append(&mut fresh);

        let resolution = match resolve(&self.tokens, start) {
            Ok(r) => r,
            Err(e) => {
                self.tokens.truncate(start);
                return Err(e.into());
            }
        };
        self.blocks.extend(resolution.blocks);
        self.ends.extend(resolution.ends);
        self.elses.extend(resolution.elses);
        for (name, body) in resolution.procs {
            self.procs.insert(name, body);
        }

        self.execute(start)?;
        Ok(())
    }

    /// The dispatch loop, starting at token index `pc`.
    fn execute(&mut self, mut pc: usize) -> EvalResult<()> {
        let mut frames: Vec<Frame> = Vec::new();

        while pc < self.tokens.len() {
            let kind = self.tokens[pc].kind.clone();
            match kind {
                TokenKind::Int(n) => {
                    self.push(Value::Int(n));
                    pc += 1;
                }
                TokenKind::Float(x) => {
                    self.push(Value::Float(x));
                    pc += 1;
                }
                TokenKind::Str(s) => {
                    self.push(Value::Str(s));
                    pc += 1;
                }

                TokenKind::If => {
                    let block = self.block_at(pc)?;
                    if self.pop()?.is_truthy() {
                        pc += 1;
                    } else {
                        pc = block.else_index.unwrap_or(block.end_index) + 1;
                    }
                }
                TokenKind::Else => {
                    // Reached by falling through the true branch: skip the
                    // false branch.
                    let end = *self
                        .elses
                        .get(&pc)
                        .ok_or_else(|| internal("unresolved `else`"))?;
                    pc = end + 1;
                }
                TokenKind::While => {
                    // The condition preceding the opener decides entry; the
                    // body re-pushes a condition popped at `end`.
                    let block = self.block_at(pc)?;
                    if self.pop()?.is_truthy() {
                        pc += 1;
                    } else {
                        pc = block.end_index + 1;
                    }
                }
                TokenKind::For => {
                    let block = self.block_at(pc)?;
                    let hi = self.pop_int()?;
                    let lo = self.pop_int()?;
                    if lo > hi {
                        pc = block.end_index + 1;
                    } else {
                        frames.push(Frame::For { index: lo, hi });
                        self.push(Value::Int(lo));
                        pc += 1;
                    }
                }
                TokenKind::Times => {
                    let block = self.block_at(pc)?;
                    let n = self.pop_int()?;
                    if n <= 0 {
                        pc = block.end_index + 1;
                    } else {
                        frames.push(Frame::Times { remaining: n });
                        pc += 1;
                    }
                }
                TokenKind::Def => {
                    // Bodies were registered by the resolver; skip past.
                    let block = self.block_at(pc)?;
                    pc = block.end_index + 1;
                }
                TokenKind::End => {
                    let opener = *self
                        .ends
                        .get(&pc)
                        .ok_or_else(|| internal("unresolved `end`"))?;
                    match self.block_at(opener)?.kind {
                        BlockKind::If => pc += 1,
                        BlockKind::While => {
                            if self.pop()?.is_truthy() {
                                pc = opener + 1;
                            } else {
                                pc += 1;
                            }
                        }
                        BlockKind::For => {
                            // Discard the iteration's index slot.
                            self.pop()?;
                            let Some(Frame::For { index, hi }) = frames.last_mut() else {
                                return Err(internal("`for` frame missing at `end`"));
                            };
                            *index += 1;
                            if *index <= *hi {
                                let next = *index;
                                self.push(Value::Int(next));
                                pc = opener + 1;
                            } else {
                                frames.pop();
                                pc += 1;
                            }
                        }
                        BlockKind::Times => {
                            let Some(Frame::Times { remaining }) = frames.last_mut() else {
                                return Err(internal("`times` frame missing at `end`"));
                            };
                            *remaining -= 1;
                            if *remaining > 0 {
                                pc = opener + 1;
                            } else {
                                frames.pop();
                                pc += 1;
                            }
                        }
                        BlockKind::Def => {
                            // Only a call can reach a `def` body's end.
                            let Some(Frame::Call { return_pc }) = frames.pop() else {
                                return Err(internal("return without call"));
                            };
                            pc = return_pc;
                        }
                    }
                }

                TokenKind::Word(w) => match w.as_str() {
                    "true" => {
                        self.push(Value::Bool(true));
                        pc += 1;
                    }
                    "false" => {
                        self.push(Value::Bool(false));
                        pc += 1;
                    }
                    "none" => {
                        self.push(Value::None);
                        pc += 1;
                    }
                    _ => {
                        if let Some(builtin) = builtins::lookup(&w) {
                            builtin(self)?;
                            pc += 1;
                        } else if let Some(body) = self.procs.get(&w) {
                            frames.push(Frame::Call { return_pc: pc + 1 });
                            pc = body.start;
                        } else {
                            return Err(EvalError::UnknownWord(w));
                        }
                    }
                },
            }
        }
        Ok(())
    }

    fn block_at(&self, pc: usize) -> EvalResult<Block> {
        self.blocks
            .get(&pc)
            .copied()
            .ok_or_else(|| internal("unresolved block opener"))
    }

    // === Stack access for built-in words ===

    pub(crate) fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub(crate) fn pop(&mut self) -> EvalResult<Value> {
        self.stack.pop().ok_or(EvalError::StackUnderflow)
    }

    /// Ensure at least `n` operands are present.
    pub(crate) fn require(&self, n: usize) -> EvalResult<()> {
        if self.stack.len() < n {
            Err(EvalError::StackUnderflow)
        } else {
            Ok(())
        }
    }

    pub(crate) fn pop_int(&mut self) -> EvalResult<i64> {
        match self.pop()? {
            Value::Int(n) => Ok(n),
            other => Err(type_mismatch("Int", &other)),
        }
    }

    pub(crate) fn pop_str(&mut self) -> EvalResult<String> {
        match self.pop()? {
            Value::Str(s) => Ok(s),
            other => Err(type_mismatch("Str", &other)),
        }
    }

    pub(crate) fn pop_list(&mut self) -> EvalResult<crate::value::ListHandle> {
        match self.pop()? {
            Value::List(l) => Ok(l),
            other => Err(type_mismatch("List", &other)),
        }
    }

    pub(crate) fn pop_dict(&mut self) -> EvalResult<crate::value::DictHandle> {
        match self.pop()? {
            Value::Dict(d) => Ok(d),
            other => Err(type_mismatch("Dict", &other)),
        }
    }

    /// Pop a constructor count: a non-negative Int.
    pub(crate) fn pop_count(&mut self, word: &'static str) -> EvalResult<usize> {
        match self.pop()? {
            Value::Int(n) if n >= 0 => Ok(n as usize),
            Value::Int(_) => Err(EvalError::BadCount(word)),
            other => Err(type_mismatch("Int", &other)),
        }
    }

    /// Pop `n` values, returned in push order (first pushed first).
    pub(crate) fn pop_n(&mut self, n: usize) -> EvalResult<Vec<Value>> {
        self.require(n)?;
        let at = self.stack.len() - n;
        Ok(self.stack.split_off(at))
    }

    // === I/O for built-in words ===

    /// Write a line to the VM's output.
    pub(crate) fn write_line(&mut self, s: &str) -> EvalResult<()> {
        writeln!(self.output, "{}", s)?;
        self.output.flush()?;
        Ok(())
    }

    /// Read one line from the VM's input, with the trailing newline
    /// stripped.
    pub(crate) fn read_line(&mut self) -> EvalResult<String> {
        let mut line = String::new();
        let n = self.input.read_line(&mut line)?;
        if n == 0 {
            return Err(EvalError::EndOfInput);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a type mismatch error from an expectation and the offending value.
pub(crate) fn type_mismatch(expected: &str, actual: &Value) -> EvalError {
    EvalError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}

fn internal(msg: &str) -> EvalError {
    EvalError::Internal(msg.to_string())
}
