//! # gitjournal-core
//!
//! Core library for gitjournal - devlogs and changelogs from git history.
//!
//! This crate reads commit history, categorizes it, keeps an incremental
//! per-repository cursor so regeneration never duplicates entries, merges
//! several repositories into one timeline and renders the result as Markdown
//! or HTML. [`Journal`] ties the pieces together.

pub mod aggregate;
pub mod categorize;
pub mod config;
pub mod error;
pub mod history;
pub mod hook;
pub mod journal;
pub mod models;
pub mod paths;
pub mod registry;
pub mod render;
pub mod state;
pub mod storage;

pub use categorize::{categorize, Categorizer};
pub use config::Config;
pub use error::{Error, Result};
pub use history::{GitHistory, HistoryDiscontinuity, HistoryProvider, HistoryRead};
pub use journal::{
    AggregateReport, BatchSummary, GenerateOptions, GenerationReport, InitReport, Journal,
};
pub use models::{Category, CommitRecord, Cursor, RepositoryEntry};
pub use paths::JournalHome;
pub use registry::{Registration, Registry, ScanReport};
pub use render::{Format, Mode, RenderOptions, Renderer};
pub use state::{CursorUpdate, StateStore};
