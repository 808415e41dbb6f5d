//! # protected-by
//!
//! Static checker for lock-protected struct fields.
//!
//! A field may declare, in its documentation, which sibling field guards it:
//!
//! ```rust,ignore
//! struct Counter {
//!     /// hits is protected by mu.
//!     hits: u64,
//!     mu: RawLock,
//! }
//! ```
//!
//! Every read or write of `hits` must then be preceded, in the same
//! function and on the same instance, by `counter.mu.lock()` with no
//! `counter.mu.unlock()` in between. Deferred blocks (`defer! { .. }`)
//! are taken into account.
//!
//! This crate provides:
//! - A language-neutral program model (`model`) that the checker consumes
//! - The checker pipeline (`checker`): directive resolution, usage
//!   collection and lock-discipline verification
//! - A Rust front end (`frontend`) that builds the model from source files
//! - The `protectedby` CLI (see `src/bin/protectedby.rs`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use protected_by::{check, frontend, Config};
//!
//! let program = frontend::parse_source("lib.rs", &source)?;
//! let report = check(&program, &Config::default());
//! for diagnostic in &report.diagnostics {
//!     println!("{}", diagnostic);
//! }
//! ```

pub mod checker;
pub mod config;
pub mod error;
pub mod frontend;
pub mod model;
pub mod parser;
pub mod report;

pub use checker::{check, BindingKey, BindingSet, ProtectedBinding, Usage};
pub use config::Config;
pub use error::{CollectionError, DirectiveError, DisciplineError, Finding, ResolutionError};
pub use report::{Diagnostic, Report, Stats};
