//! Command-line interface for the Forge interpreter.

use clap::Parser;
use forge_eval::{ForgeError, Vm};
use miette::{Diagnostic, NamedSource, SourceSpan};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI error with source context for pretty printing.
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("failed to read {path}: {message}")]
    IoError { path: String, message: String },

    #[error("lex error: {message}")]
    #[diagnostic(code(forge::lex_error))]
    LexError {
        message: String,
        #[source_code]
        src: NamedSource<Arc<String>>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("syntax error: {message}")]
    #[diagnostic(code(forge::syntax_error))]
    SyntaxError {
        message: String,
        #[source_code]
        src: NamedSource<Arc<String>>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("runtime error: {message}")]
    #[diagnostic(code(forge::runtime_error))]
    RuntimeError { message: String },

    #[error("terminal error: {message}")]
    TerminalError { message: String },
}

impl CliError {
    fn from_forge_error(e: ForgeError, source: Arc<String>, filename: &str) -> Self {
        match e {
            ForgeError::Lex(e) => {
                let span = e.span();
                CliError::LexError {
                    message: e.to_string(),
                    src: NamedSource::new(filename, source),
                    span: (span.start, span.len().max(1)).into(),
                }
            }
            ForgeError::Resolve(e) => {
                let span = e.span();
                CliError::SyntaxError {
                    message: e.to_string(),
                    src: NamedSource::new(filename, source),
                    span: (span.start, span.len().max(1)).into(),
                }
            }
            ForgeError::Eval(e) => CliError::RuntimeError {
                message: e.to_string(),
            },
        }
    }
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "forge", version)]
#[command(
    about = "Interpreter for Forge, a stack-based RPN language",
    long_about = None
)]
struct Cli {
    /// Forge source file to evaluate; starts a REPL when omitted
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    // Install miette's fancy error handler
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let result = match cli.file {
        Some(file) => run_file(&file),
        None => repl(),
    };

    if let Err(e) = result {
        eprintln!("{:?}", miette::Report::new(e));
        std::process::exit(1);
    }
}

/// Evaluate one source file.
fn run_file(path: &PathBuf) -> CliResult<()> {
    let filename = path.display().to_string();
    let source = Arc::new(
        fs::read_to_string(path).map_err(|e| CliError::IoError {
            path: filename.clone(),
            message: e.to_string(),
        })?,
    );

    info!("evaluating {}", filename);
    let mut vm = Vm::new();
    vm.run(&source)
        .map_err(|e| CliError::from_forge_error(e, source.clone(), &filename))
}

/// The interactive prompt loop. Stack, variables, and procedures persist
/// across lines; an error prints and leaves them for inspection.
fn repl() -> CliResult<()> {
    println!("Forge interpreter (type `exit` or press Ctrl-D to quit)");

    let mut editor = DefaultEditor::new().map_err(|e| CliError::TerminalError {
        message: e.to_string(),
    })?;
    let mut vm = Vm::new();

    loop {
        match editor.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "exit" {
                    break;
                }
                let _ = editor.add_history_entry(&line);
                if let Err(e) = vm.run(&line) {
                    eprintln!("{}: {}", e.kind(), e);
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                return Err(CliError::TerminalError {
                    message: e.to_string(),
                })
            }
        }
    }
    Ok(())
}
