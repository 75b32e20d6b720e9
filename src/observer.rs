//! Notifications emitted while sorting and undoing.
//!
//! The engines never print anything themselves. Every user-visible outcome is
//! delivered synchronously, in order, to an [`Observer`] supplied by the caller.

use crate::file_organizer::Summary;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// One notification from the sort or undo engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// A file matched the skip rules and was left alone.
    Skipped {
        file_name: String,
        #[serde(serialize_with = "lossy_path")]
        path: PathBuf,
    },
    /// Preview mode: the move that would have happened.
    Previewed {
        file_name: String,
        #[serde(serialize_with = "lossy_path")]
        source: PathBuf,
        category: String,
        final_name: String,
    },
    /// A file was moved into its category folder.
    Moved {
        file_name: String,
        #[serde(serialize_with = "lossy_path")]
        source: PathBuf,
        #[serde(serialize_with = "lossy_path")]
        destination: PathBuf,
        category: String,
        final_name: String,
    },
    /// Undo moved a file back to where it came from.
    Restored {
        #[serde(serialize_with = "lossy_path")]
        from: PathBuf,
        #[serde(serialize_with = "lossy_path")]
        to: PathBuf,
    },
    /// Undo could not process one ledger line.
    RestoreFailed { entry: String, reason: String },
    /// Per-category counts of a finished sort run.
    Summary { counts: Summary },
    /// Undo found no ledger.
    UndoEmpty,
    /// Undo finished processing the ledger.
    UndoComplete { restored: usize },
}

/// Paths are reported as text even when they are not valid UTF-8.
fn lossy_path<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Skipped { file_name, .. } => write!(f, "⏭️ Skipped: {}", file_name),
            Event::Previewed {
                file_name,
                category,
                final_name,
                ..
            } => write!(f, "[DRY RUN] {} → {}/{}", file_name, category, final_name),
            Event::Moved {
                file_name,
                category,
                final_name,
                ..
            } => write!(f, "✅ Moved: {} → {}/{}", file_name, category, final_name),
            Event::Restored { from, to } => {
                write!(f, "↩️ Restored: {} → {}", from.display(), to.display())
            }
            Event::RestoreFailed { entry, reason } => {
                write!(f, "⚠️ Failed to restore: {} ({})", entry, reason)
            }
            Event::Summary { counts } => {
                write!(f, "📊 Summary Report:")?;
                for (category, count) in counts.iter() {
                    write!(f, "\n- {}: {} file(s)", category, count)?;
                }
                Ok(())
            }
            Event::UndoEmpty => write!(f, "❌ No restore log found."),
            Event::UndoComplete { restored } => {
                write!(f, "✅ Undo complete. Restored {} file(s).", restored)
            }
        }
    }
}

/// Receives events and progress ticks from the engines.
pub trait Observer {
    fn on_event(&mut self, event: &Event);

    /// Called after every handled (moved or previewed) file; skips do not tick.
    fn on_progress(&mut self, processed: usize, total: usize);
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_event(&mut self, _event: &Event) {}

    fn on_progress(&mut self, _processed: usize, _total: usize) {}
}

/// Observer that keeps every event and progress tick in memory.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EventRecorder {
    pub events: Vec<Event>,
    pub progress: Vec<(usize, usize)>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events of the given kind, in emission order.
    pub fn events_where<F>(&self, predicate: F) -> Vec<&Event>
    where
        F: Fn(&Event) -> bool,
    {
        self.events.iter().filter(|e| predicate(e)).collect()
    }
}

impl Observer for EventRecorder {
    fn on_event(&mut self, event: &Event) {
        self.events.push(event.clone());
    }

    fn on_progress(&mut self, processed: usize, total: usize) {
        self.progress.push((processed, total));
    }
}
