/// Persistent records written by real (non-preview) sort runs.
///
/// Two append-only files are kept:
/// - the restore ledger, one `<original>||<new>` line per move, consumed by undo;
/// - the audit log, one `<timestamp> - <message>` line per move, never read back.
///
/// Ledger paths are stored as their raw bytes on Unix so names that are not
/// valid UTF-8 come back unchanged.
use crate::file_organizer::{OrganizeError, OrganizeResult};
use chrono::{Local, NaiveDateTime};
use std::borrow::Cow;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Field separator of a ledger line.
pub const LEDGER_SEPARATOR: &str = "||";

/// Default ledger location, relative to the working directory.
pub const DEFAULT_RESTORE_LEDGER: &str = "restore_log.txt";

/// Default audit log location, relative to the working directory.
pub const DEFAULT_AUDIT_LOG: &str = "sort_log.txt";

/// One completed move: where the file was and where it went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreEntry {
    pub original_path: PathBuf,
    pub new_path: PathBuf,
}

impl RestoreEntry {
    pub fn new(original_path: PathBuf, new_path: PathBuf) -> Self {
        Self {
            original_path,
            new_path,
        }
    }

    /// Renders the entry as a ledger line, without the trailing newline.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut line = path_to_bytes(&self.original_path).into_owned();
        line.extend_from_slice(LEDGER_SEPARATOR.as_bytes());
        line.extend_from_slice(&path_to_bytes(&self.new_path));
        line
    }

    /// Parses a ledger line; it must split into exactly two fields.
    pub fn parse(line: impl AsRef<[u8]>) -> OrganizeResult<Self> {
        let mut line = line.as_ref();
        while let Some(rest) = line.strip_suffix(b"\n").or_else(|| line.strip_suffix(b"\r")) {
            line = rest;
        }
        let fields = split_fields(line);

        match fields.as_slice() {
            [original, new] => Ok(Self::new(path_from_bytes(original), path_from_bytes(new))),
            _ => Err(OrganizeError::InvalidHistoryFormat {
                reason: format!(
                    "expected 2 '{}'-separated fields, found {}",
                    LEDGER_SEPARATOR,
                    fields.len()
                ),
            }),
        }
    }
}

/// Splits `line` on every non-overlapping separator, left to right.
fn split_fields(line: &[u8]) -> Vec<&[u8]> {
    let separator = LEDGER_SEPARATOR.as_bytes();
    let mut fields = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i + separator.len() <= line.len() {
        if &line[i..i + separator.len()] == separator {
            fields.push(&line[start..i]);
            i += separator.len();
            start = i;
        } else {
            i += 1;
        }
    }
    fields.push(&line[start..]);

    fields
}

/// Whether `path` survives a trip through the ledger unchanged.
pub fn is_recordable(path: &Path) -> bool {
    cfg!(unix) || path.to_str().is_some()
}

#[cfg(unix)]
fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(text) => Cow::Borrowed(text.as_bytes()),
        Cow::Owned(text) => Cow::Owned(text.into_bytes()),
    }
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Append-only record of moves, replayed in reverse and deleted by undo.
#[derive(Debug, Clone)]
pub struct RestoreLedger {
    path: PathBuf,
}

impl RestoreLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Appends one entry, creating the ledger if needed.
    pub fn append(&self, entry: &RestoreEntry) -> OrganizeResult<()> {
        append_line(&self.path, &entry.to_bytes()).map_err(|e| OrganizeError::HistoryWriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Reads every line in recorded order, or `None` when there is no ledger.
    ///
    /// Lines are raw bytes without their terminator.
    pub fn read_lines(&self) -> OrganizeResult<Option<Vec<Vec<u8>>>> {
        match fs::read(&self.path) {
            Ok(content) => {
                let mut lines: Vec<Vec<u8>> = content
                    .split(|&b| b == b'\n')
                    .map(|line| line.strip_suffix(b"\r").unwrap_or(line).to_vec())
                    .collect();
                if content.is_empty() || content.ends_with(b"\n") {
                    lines.pop();
                }
                Ok(Some(lines))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OrganizeError::HistoryReadFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Deletes the ledger file. A ledger that is already gone is fine.
    pub fn remove(&self) -> OrganizeResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OrganizeError::HistoryWriteFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

impl Default for RestoreLedger {
    fn default() -> Self {
        Self::new(DEFAULT_RESTORE_LEDGER)
    }
}

/// Timestamped, human-readable trail of every real move.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `message` stamped with the current local time.
    pub fn record(&self, message: &str) -> OrganizeResult<()> {
        self.record_at(Local::now().naive_local(), message)
    }

    /// Appends `message` stamped with `timestamp`.
    pub fn record_at(&self, timestamp: NaiveDateTime, message: &str) -> OrganizeResult<()> {
        let line = format!(
            "{} - {}",
            timestamp.format("%Y-%m-%d %H:%M:%S%.6f"),
            message
        );
        append_line(&self.path, line.as_bytes()).map_err(|e| OrganizeError::AuditLogWriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_LOG)
    }
}

fn append_line(path: &Path, line: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut record = Vec::with_capacity(line.len() + 1);
    record.extend_from_slice(line);
    record.push(b'\n');
    file.write_all(&record)
}
