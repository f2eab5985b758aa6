//! # gitjournal
//!
//! Devlog and changelog journals generated from git history.
//!
//! This package re-exports [`gitjournal_core`]; the `gitjournal` binary lives
//! in the `gitjournal-cli` crate.

pub use gitjournal_core::*;
