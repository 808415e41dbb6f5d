//! Rust front end
//!
//! Builds the checker's program model from Rust source files with `syn`.
//! Each file is one compilation unit; all files together form one program,
//! so a struct declared in one file can be accessed from another.
//!
//! Lowering happens in two passes:
//! - `declare`: Collect named types, trait and inherent methods, type
//!   aliases and associated constructors for the whole program
//! - `lower`: Build records, functions and expressions per file,
//!   resolving local identities and tagging deferred blocks
//!
//! Deferred blocks are written with a scopeguard-style `defer! { .. }`.

mod declare;
mod lower;

use crate::model::{Pos, Program, Span};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub use declare::POINTER_WRAPPERS;

/// Name of the macro that introduces a deferred block.
pub const DEFER_MACRO: &str = "defer";

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}:{line}:{column}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
}

/// Parse in-memory sources into one program. Fails on the first file
/// that does not parse.
pub fn parse_sources(sources: &[(PathBuf, String)]) -> Result<Program, FrontendError> {
    let files = sources
        .iter()
        .map(|(path, content)| parse_file(path, content))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(build_program(files))
}

/// Parse a single in-memory source file.
pub fn parse_source(path: impl Into<PathBuf>, content: &str) -> Result<Program, FrontendError> {
    parse_sources(&[(path.into(), content.to_string())])
}

/// Read and parse files from disk. Files that cannot be read or parsed are
/// skipped and returned as errors next to the program built from the rest.
pub fn parse_files(paths: &[PathBuf]) -> (Program, Vec<FrontendError>) {
    let mut files = Vec::new();
    let mut errors = Vec::new();

    for path in paths {
        let parsed = std::fs::read_to_string(path)
            .map_err(|source| FrontendError::Io {
                path: path.clone(),
                source,
            })
            .and_then(|content| parse_file(path, &content));
        match parsed {
            Ok(file) => files.push(file),
            Err(e) => errors.push(e),
        }
    }

    (build_program(files), errors)
}

fn parse_file(path: &Path, content: &str) -> Result<(PathBuf, syn::File), FrontendError> {
    let ast = syn::parse_file(content).map_err(|e| {
        let start = e.span().start();
        FrontendError::Parse {
            path: path.to_path_buf(),
            line: start.line,
            column: start.column + 1,
            message: e.to_string(),
        }
    })?;
    Ok((path.to_path_buf(), ast))
}

fn build_program(files: Vec<(PathBuf, syn::File)>) -> Program {
    let decls = declare::Declarations::collect(&files);
    let mut ids = lower::IdAllocator::default();

    let units = files
        .iter()
        .enumerate()
        .map(|(index, (path, ast))| {
            debug!(file = %path.display(), items = ast.items.len(), "lowering compilation unit");
            lower::lower_file(&decls, &mut ids, index, path, ast)
        })
        .collect();

    Program {
        units,
        types: decls.into_types(),
    }
}

/// Model position of the start of a token span.
pub(crate) fn pos(span: proc_macro2::Span) -> Pos {
    let start = span.start();
    Pos::new(start.line, start.column + 1)
}

/// Model span covering a syntax node.
pub(crate) fn span_of<T: syn::spanned::Spanned + ?Sized>(node: &T) -> Span {
    let span = node.span();
    let end = span.end();
    Span::new(pos(span), Pos::new(end.line, end.column + 1))
}
