/// Undo functionality for reverting sort runs.
///
/// Undo replays the restore ledger newest-first, moving each file back to
/// where it came from, then deletes the ledger. Unlike sorting, a failing
/// entry never stops the run: it is reported and the next entry is tried.
use crate::file_organizer::{OrganizeError, OrganizeResult, move_file};
use crate::history::{RestoreEntry, RestoreLedger};
use crate::observer::{Event, Observer};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Represents the result of an undo operation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UndoReport {
    /// Number of files successfully restored.
    pub restored: usize,
    /// Ledger lines that were not restored, with the reason.
    pub failures: Vec<(String, String)>,
}

impl UndoReport {
    /// Returns the total number of ledger lines processed.
    pub fn total_processed(&self) -> usize {
        self.restored + self.failures.len()
    }

    /// Returns true if every ledger line was restored.
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reverses the moves recorded in a restore ledger.
#[derive(Debug, Clone)]
pub struct UndoManager {
    ledger: RestoreLedger,
}

impl UndoManager {
    pub fn new(ledger: RestoreLedger) -> Self {
        Self { ledger }
    }

    /// Undoes every move recorded in the ledger, most recent first.
    ///
    /// A missing ledger is not an error: an `UndoEmpty` event is emitted and
    /// an empty report returned. Otherwise each line is restored or reported
    /// as a `RestoreFailed` event, an `UndoComplete` event follows, and the
    /// ledger is deleted even when some lines failed.
    ///
    /// # Errors
    ///
    /// Only reading or deleting the ledger itself can fail the call.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sortify::history::RestoreLedger;
    /// use sortify::observer::NoopObserver;
    /// use sortify::undo::UndoManager;
    ///
    /// let manager = UndoManager::new(RestoreLedger::default());
    /// match manager.undo(&mut NoopObserver) {
    ///     Ok(report) => println!("Restored {} files", report.restored),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(&self, observer: &mut dyn Observer) -> OrganizeResult<UndoReport> {
        let Some(lines) = self.ledger.read_lines()? else {
            info!(ledger = %self.ledger.path().display(), "no restore ledger");
            observer.on_event(&Event::UndoEmpty);
            return Ok(UndoReport::default());
        };

        info!(entries = lines.len(), "undoing sort");

        let mut report = UndoReport::default();
        for line in lines.iter().rev() {
            let text = String::from_utf8_lossy(line).into_owned();
            match Self::restore_line(line) {
                Ok(entry) => {
                    report.restored += 1;
                    observer.on_event(&Event::Restored {
                        from: entry.new_path,
                        to: entry.original_path,
                    });
                }
                Err(reason) => {
                    warn!(entry = %text, %reason, "restore failed");
                    observer.on_event(&Event::RestoreFailed {
                        entry: text.clone(),
                        reason: reason.clone(),
                    });
                    report.failures.push((text, reason));
                }
            }
        }

        observer.on_event(&Event::UndoComplete {
            restored: report.restored,
        });
        self.ledger.remove()?;

        Ok(report)
    }

    /// Restores the file described by one ledger line.
    fn restore_line(line: &[u8]) -> Result<RestoreEntry, String> {
        let entry = RestoreEntry::parse(line).map_err(|e| e.to_string())?;

        if fs::symlink_metadata(&entry.new_path).is_err() {
            return Err(format!(
                "file not found at {}",
                entry.new_path.display()
            ));
        }

        if fs::symlink_metadata(&entry.original_path).is_ok() {
            return Err(format!(
                "original location {} is occupied",
                entry.original_path.display()
            ));
        }

        if let Some(parent) = entry.original_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                OrganizeError::DirectoryCreationFailed {
                    path: PathBuf::from(parent),
                    source: e,
                }
                .to_string()
            })?;
        }

        move_file(&entry.new_path, &entry.original_path).map_err(|e| e.to_string())?;

        Ok(entry)
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(RestoreLedger::default())
    }
}
