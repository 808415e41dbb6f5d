//! CLI modules for protectedby
//!
//! Handles source discovery, filtering and report formatting

pub mod discover;
pub mod filters;
pub mod output;
