/// Sorting files into category subdirectories.
///
/// This module holds the sort engine ([`FileOrganizer`]) together with the
/// primitives it is built from: collision-free naming, the move itself and
/// the per-category [`Summary`].
use crate::config::SkipRules;
use crate::file_category::{CategoryTable, split_extension};
use crate::history::{self, AuditLog, RestoreEntry, RestoreLedger};
use crate::observer::{Event, Observer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Errors that can occur while sorting or undoing.
#[derive(Error, Debug)]
pub enum OrganizeError {
    /// The root directory could not be resolved.
    #[error("Invalid base path {}: {source}", path.display())]
    InvalidBasePath {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to create a category directory.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to move a file to its destination.
    #[error("Failed to move {} to {}: {error}", from.display(), to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: std::io::Error,
    },
    /// Failed to write or delete the restore ledger.
    #[error("Failed to write restore ledger {}: {source}", path.display())]
    HistoryWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read the restore ledger.
    #[error("Failed to read restore ledger {}: {source}", path.display())]
    HistoryReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A ledger line could not be understood.
    #[error("Invalid restore ledger entry: {reason}")]
    InvalidHistoryFormat { reason: String },
    /// Failed to append to the audit log.
    #[error("Failed to write audit log {}: {source}", path.display())]
    AuditLogWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Number of files moved into each category during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Summary(BTreeMap<String, usize>);

impl Summary {
    /// Counts one more file for `category`.
    pub fn record(&mut self, category: &str) {
        *self.0.entry(category.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, category: &str) -> usize {
        self.0.get(category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Categories in name order with their counts.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(name, count)| (name.as_str(), *count))
    }
}

/// Flags for one sort run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortOptions {
    /// Report planned moves without touching the filesystem.
    pub preview: bool,
    /// Descend into subdirectories of the root.
    pub recursive: bool,
}

/// Returns a name for `file_name` that is free in `destination_dir`.
///
/// The name is returned unchanged when nothing by that name exists;
/// otherwise `stem_1.ext`, `stem_2.ext`, … are probed in order. Dangling
/// symlinks count as occupied. A missing directory has no collisions.
/// Names are handled as OS strings, so non-UTF-8 names are kept intact.
///
/// # Examples
///
/// ```no_run
/// use sortify::file_organizer::resolve_unique_name;
/// use std::path::Path;
///
/// // With PDFs/report.pdf already present:
/// let name = resolve_unique_name(Path::new("/data/PDFs"), "report.pdf");
/// assert_eq!(name, "report_1.pdf");
/// ```
pub fn resolve_unique_name(destination_dir: &Path, file_name: impl AsRef<OsStr>) -> OsString {
    let file_name = file_name.as_ref();
    let occupied = |name: &OsStr| fs::symlink_metadata(destination_dir.join(name)).is_ok();

    if !occupied(file_name) {
        return file_name.to_os_string();
    }

    let (stem, ext) = split_os_extension(file_name);
    let mut counter: u64 = 1;
    loop {
        let mut candidate = stem.clone();
        candidate.push(format!("_{}", counter));
        candidate.push(&ext);
        if !occupied(candidate.as_os_str()) {
            return candidate;
        }
        counter += 1;
    }
}

/// [`split_extension`] for names that may not be valid UTF-8.
fn split_os_extension(file_name: &OsStr) -> (OsString, OsString) {
    if let Some(name) = file_name.to_str() {
        let (stem, ext) = split_extension(name);
        return (stem.into(), ext.into());
    }

    let path = Path::new(file_name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => {
            let mut dotted = OsString::from(".");
            dotted.push(ext);
            (stem.to_os_string(), dotted)
        }
        _ => (file_name.to_os_string(), OsString::new()),
    }
}

/// Moves a file, falling back to copy and delete across filesystems.
pub fn move_file(from: &Path, to: &Path) -> OrganizeResult<()> {
    let failure = |error| OrganizeError::FileMoveFailure {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        error,
    };

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            debug!(from = %from.display(), to = %to.display(), "rename crossed devices, copying");
            fs::copy(from, to).map_err(failure)?;
            fs::remove_file(from).map_err(failure)
        }
        Err(e) => Err(failure(e)),
    }
}

/// An entry captured by the pre-scan.
#[derive(Debug)]
enum ScanEntry {
    Skipped { file_name: OsString, path: PathBuf },
    File { file_name: OsString, path: PathBuf },
}

/// Sorts the files of a directory into category subfolders.
///
/// The engine is bound at construction to its category table, skip rules
/// and the two history files, so several engines with different settings can
/// coexist in one process.
#[derive(Debug, Clone)]
pub struct FileOrganizer {
    categories: CategoryTable,
    skip: SkipRules,
    ledger: RestoreLedger,
    audit_log: AuditLog,
}

impl FileOrganizer {
    pub fn new(
        categories: CategoryTable,
        skip: SkipRules,
        ledger: RestoreLedger,
        audit_log: AuditLog,
    ) -> Self {
        Self {
            categories,
            skip,
            ledger,
            audit_log,
        }
    }

    pub fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    pub fn ledger(&self) -> &RestoreLedger {
        &self.ledger
    }

    /// Sorts the files under `root` into `root/<category>/`.
    ///
    /// `root` must be an existing directory; callers validate it. Category
    /// folders are always created directly under `root`, even for files found
    /// in subdirectories during a recursive run.
    ///
    /// The file list is captured once before anything moves, so the progress
    /// total stays fixed for the whole run. In preview mode nothing on disk
    /// changes. Otherwise the first failing move aborts the run: files already
    /// handled stay moved and recorded.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sortify::file_organizer::{FileOrganizer, SortOptions};
    /// use sortify::observer::NoopObserver;
    /// use std::path::Path;
    ///
    /// let organizer = FileOrganizer::default();
    /// let summary = organizer
    ///     .sort(Path::new("/home/me/Downloads"), SortOptions::default(), &mut NoopObserver)
    ///     .expect("sort failed");
    /// println!("moved {} file(s)", summary.total());
    /// ```
    pub fn sort(
        &self,
        root: &Path,
        options: SortOptions,
        observer: &mut dyn Observer,
    ) -> OrganizeResult<Summary> {
        let root = std::path::absolute(root).map_err(|e| OrganizeError::InvalidBasePath {
            path: root.to_path_buf(),
            source: e,
        })?;

        info!(
            root = %root.display(),
            preview = options.preview,
            recursive = options.recursive,
            "starting sort"
        );

        let entries = self.scan(&root, options.recursive);
        let total = entries
            .iter()
            .filter(|entry| matches!(entry, ScanEntry::File { .. }))
            .count();

        let mut summary = Summary::default();
        let mut processed = 0;

        for entry in entries {
            match entry {
                ScanEntry::Skipped { file_name, path } => {
                    debug!(path = %path.display(), "skipping");
                    observer.on_event(&Event::Skipped {
                        file_name: file_name.to_string_lossy().into_owned(),
                        path,
                    });
                }
                ScanEntry::File { file_name, path } => {
                    self.handle_file(&root, file_name, path, options.preview, &mut summary, observer)?;
                    processed += 1;
                    observer.on_progress(processed, total);
                }
            }
        }

        info!(processed, total, moved = summary.total(), "sort finished");
        observer.on_event(&Event::Summary {
            counts: summary.clone(),
        });

        Ok(summary)
    }

    fn handle_file(
        &self,
        root: &Path,
        file_name: OsString,
        path: PathBuf,
        preview: bool,
        summary: &mut Summary,
        observer: &mut dyn Observer,
    ) -> OrganizeResult<()> {
        let category = self.categories.classify(&file_name.to_string_lossy()).to_string();
        let category_dir = root.join(&category);

        if preview {
            let final_name = resolve_unique_name(&category_dir, &file_name);
            debug!(path = %path.display(), %category, final_name = ?final_name, "would move");
            observer.on_event(&Event::Previewed {
                file_name: file_name.to_string_lossy().into_owned(),
                source: path,
                category,
                final_name: final_name.to_string_lossy().into_owned(),
            });
            return Ok(());
        }

        fs::create_dir_all(&category_dir).map_err(|e| OrganizeError::DirectoryCreationFailed {
            path: category_dir.clone(),
            source: e,
        })?;

        let final_name = resolve_unique_name(&category_dir, &file_name);
        let destination = category_dir.join(&final_name);

        move_file(&path, &destination)?;
        debug!(from = %path.display(), to = %destination.display(), "moved");

        // The ledger line comes first so undo can always find a moved file.
        self.ledger
            .append(&RestoreEntry::new(path.clone(), destination.clone()))?;

        let event = Event::Moved {
            file_name: file_name.to_string_lossy().into_owned(),
            source: path,
            destination,
            category: category.clone(),
            final_name: final_name.to_string_lossy().into_owned(),
        };
        observer.on_event(&event);

        self.audit_log.record(&event.to_string())?;
        summary.record(&category);

        Ok(())
    }

    /// Captures the ordered list of entries to handle.
    ///
    /// Within each directory files come before subdirectories, each group
    /// ordered by name. Symlinks and other non-regular entries are dropped,
    /// as are the engine's own ledger and audit log. Entries that cannot be
    /// read are logged and left out; the rest of the tree is still sorted.
    fn scan(&self, root: &Path, recursive: bool) -> Vec<ScanEntry> {
        let bookkeeping = [
            std::path::absolute(self.ledger.path()).ok(),
            std::path::absolute(self.audit_log.path()).ok(),
        ];

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .follow_links(false)
            .sort_by(|a, b| {
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            });

        let mut entries = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }

            let file_name = entry.file_name().to_os_string();
            let path = entry.into_path();

            if self.skip.is_skipped(&file_name.to_string_lossy()) {
                entries.push(ScanEntry::Skipped { file_name, path });
                continue;
            }

            if !file_type.is_file() {
                debug!(path = %path.display(), "ignoring non-regular entry");
                continue;
            }

            if bookkeeping.iter().flatten().any(|p| *p == path) {
                debug!(path = %path.display(), "ignoring history file");
                continue;
            }

            if !history::is_recordable(&path) {
                warn!(path = %path.display(), "path cannot be recorded for undo, skipping");
                entries.push(ScanEntry::Skipped { file_name, path });
                continue;
            }

            entries.push(ScanEntry::File { file_name, path });
        }

        entries
    }
}

impl Default for FileOrganizer {
    fn default() -> Self {
        Self::new(
            CategoryTable::default(),
            SkipRules::default(),
            RestoreLedger::default(),
            AuditLog::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::EventRecorder;
    use std::fs;
    use tempfile::TempDir;

    fn organizer_in(temp_dir: &TempDir) -> FileOrganizer {
        FileOrganizer::new(
            CategoryTable::default(),
            SkipRules::default(),
            RestoreLedger::new(temp_dir.path().join("restore_log.txt")),
            AuditLog::new(temp_dir.path().join("sort_log.txt")),
        )
    }

    #[test]
    fn test_resolve_unique_name_free() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert_eq!(resolve_unique_name(temp_dir.path(), "report.pdf"), "report.pdf");
    }

    #[test]
    fn test_resolve_unique_name_increments() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("report.pdf"), "a").unwrap();
        assert_eq!(resolve_unique_name(temp_dir.path(), "report.pdf"), "report_1.pdf");

        fs::write(temp_dir.path().join("report_1.pdf"), "b").unwrap();
        assert_eq!(resolve_unique_name(temp_dir.path(), "report.pdf"), "report_2.pdf");
    }

    #[test]
    fn test_resolve_unique_name_without_extension() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("Makefile"), "").unwrap();
        assert_eq!(resolve_unique_name(temp_dir.path(), "Makefile"), "Makefile_1");
    }

    #[test]
    fn test_resolve_unique_name_counts_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("notes.txt")).unwrap();
        assert_eq!(resolve_unique_name(temp_dir.path(), "notes.txt"), "notes_1.txt");
    }

    #[test]
    fn test_resolve_unique_name_missing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let missing = temp_dir.path().join("PDFs");
        assert_eq!(resolve_unique_name(&missing, "report.pdf"), "report.pdf");
    }

    #[test]
    fn test_move_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let from = temp_dir.path().join("a.txt");
        let to = temp_dir.path().join("b.txt");
        fs::write(&from, "content").unwrap();

        move_file(&from, &to).expect("Failed to move file");

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "content");
    }

    #[test]
    fn test_move_file_missing_source_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = move_file(&temp_dir.path().join("nope"), &temp_dir.path().join("b"));
        assert!(matches!(result, Err(OrganizeError::FileMoveFailure { .. })));
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = Summary::default();
        assert!(summary.is_empty());
        summary.record("PDFs");
        summary.record("PDFs");
        summary.record("Images");
        assert_eq!(summary.get("PDFs"), 2);
        assert_eq!(summary.get("Code"), 0);
        assert_eq!(summary.total(), 3);
        assert_eq!(
            summary.iter().collect::<Vec<_>>(),
            vec![("Images", 1), ("PDFs", 2)]
        );
    }

    #[test]
    fn test_sort_creates_category_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("root");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("test.txt"), "test content").unwrap();

        let organizer = organizer_in(&temp_dir);
        let mut recorder = EventRecorder::new();
        let summary = organizer
            .sort(&root, SortOptions::default(), &mut recorder)
            .expect("Failed to sort");

        assert!(root.join("TextFiles").is_dir());
        assert!(root.join("TextFiles/test.txt").is_file());
        assert!(!root.join("test.txt").exists());
        assert_eq!(summary.get("TextFiles"), 1);
        assert_eq!(recorder.progress, vec![(1, 1)]);
    }

    #[test]
    fn test_sort_ignores_history_files_inside_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("restore_log.txt"), "").unwrap();
        fs::write(temp_dir.path().join("photo.png"), "png").unwrap();

        let organizer = organizer_in(&temp_dir);
        let summary = organizer
            .sort(temp_dir.path(), SortOptions::default(), &mut EventRecorder::new())
            .expect("Failed to sort");

        assert_eq!(summary.total(), 1);
        assert!(temp_dir.path().join("restore_log.txt").is_file());
        assert!(temp_dir.path().join("sort_log.txt").is_file());
        assert!(!temp_dir.path().join("TextFiles").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_unique_name_dangling_symlink_is_occupied() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::os::unix::fs::symlink(
            temp_dir.path().join("missing.txt"),
            temp_dir.path().join("notes.txt"),
        )
        .unwrap();

        assert_eq!(resolve_unique_name(temp_dir.path(), "notes.txt"), "notes_1.txt");
    }

    #[cfg(unix)]
    #[test]
    fn test_sort_ignores_symlinks() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("root");
        fs::create_dir(&root).unwrap();
        fs::write(temp_dir.path().join("target.txt"), "x").unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("target.txt"), root.join("link.txt"))
            .unwrap();

        let organizer = organizer_in(&temp_dir);
        let mut recorder = EventRecorder::new();
        let summary = organizer
            .sort(&root, SortOptions::default(), &mut recorder)
            .expect("Failed to sort");

        assert!(summary.is_empty());
        assert!(recorder.progress.is_empty());
        assert!(fs::symlink_metadata(root.join("link.txt")).is_ok());
    }

    #[test]
    fn test_sort_directory_creation_failure_aborts_run() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("root");
        fs::create_dir(&root).unwrap();
        // A plain file where the category folder should go.
        fs::write(root.join("PDFs"), "not a directory").unwrap();
        fs::write(root.join("a.pdf"), "pdf").unwrap();
        fs::write(root.join("b.txt"), "txt").unwrap();

        let organizer = FileOrganizer::new(
            CategoryTable::default(),
            SkipRules::from_filenames(["PDFs"]),
            RestoreLedger::new(temp_dir.path().join("restore_log.txt")),
            AuditLog::new(temp_dir.path().join("sort_log.txt")),
        );
        let result = organizer.sort(&root, SortOptions::default(), &mut EventRecorder::new());

        assert!(matches!(
            result,
            Err(OrganizeError::DirectoryCreationFailed { .. })
        ));
        assert!(root.join("a.pdf").is_file());
        assert!(root.join("b.txt").is_file());
        assert!(!temp_dir.path().join("restore_log.txt").exists());
    }

    #[test]
    fn test_sort_keeps_ledger_line_when_audit_log_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("root");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        // A directory cannot be appended to.
        let audit_dir = temp_dir.path().join("sort_log");
        fs::create_dir(&audit_dir).unwrap();
        let ledger = RestoreLedger::new(temp_dir.path().join("restore_log.txt"));

        let organizer = FileOrganizer::new(
            CategoryTable::default(),
            SkipRules::none(),
            ledger.clone(),
            AuditLog::new(&audit_dir),
        );
        let result = organizer.sort(&root, SortOptions::default(), &mut EventRecorder::new());

        assert!(matches!(
            result,
            Err(OrganizeError::AuditLogWriteFailed { .. })
        ));
        assert!(root.join("TextFiles").join("a.txt").is_file());
        let lines = ledger.read_lines().unwrap().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            RestoreEntry::parse(&lines[0]).unwrap().original_path,
            root.join("a.txt")
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_resolve_unique_name_keeps_non_utf8_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let name = OsStr::from_bytes(b"caf\xe9.txt");
        fs::write(temp_dir.path().join(name), "x").unwrap();

        let resolved = resolve_unique_name(temp_dir.path(), name);

        assert_eq!(resolved.as_bytes(), b"caf\xe9_1.txt");
    }

    #[cfg(unix)]
    #[test]
    fn test_sort_continues_past_unreadable_directory() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("root");
        let locked = root.join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(locked.join("b.txt"), "b").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read the directory anyway; nothing to check.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let organizer = organizer_in(&temp_dir);
        let mut recorder = EventRecorder::new();
        let result = organizer.sort(
            &root,
            SortOptions {
                preview: false,
                recursive: true,
            },
            &mut recorder,
        );
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let summary = result.expect("an unreadable directory must not abort the run");
        assert_eq!(summary.total(), 1);
        assert_eq!(recorder.progress, vec![(1, 1)]);
        assert!(root.join("TextFiles").join("a.txt").is_file());
        assert!(locked.join("b.txt").is_file());
    }
}
