//! sortify - sort the files of a directory into category folders
//!
//! This library classifies files by extension, moves them into per-category
//! subdirectories with collision-free names, records every move in a restore
//! ledger and an audit log, and can replay the ledger to undo those moves.
//! Progress and outcomes are reported to a caller-supplied [`Observer`].

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod history;
pub mod observer;
pub mod output;
pub mod undo;

pub use config::{ConfigError, SkipRules, SortConfig};
pub use file_category::{Category, CategoryTable};
pub use file_organizer::{
    FileOrganizer, OrganizeError, SortOptions, Summary, resolve_unique_name,
};
pub use history::{AuditLog, RestoreEntry, RestoreLedger};
pub use observer::{Event, EventRecorder, NoopObserver, Observer};
pub use undo::{UndoManager, UndoReport};

pub use cli::{Cli, OrganizeCommand, run_cli};
