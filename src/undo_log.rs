//! Session-scoped undo log.
//!
//! Each organize session owns one JSON Lines file under the undo directory,
//! named after the session id. Every successful move becomes one line, and
//! the line is on stable storage before the mover continues. All appends go
//! through a single writer thread, so log order is the order in which moves
//! were acknowledged.

use crate::error::{OrganizeError, OrganizeResult};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

const LOG_EXTENSION: &str = "jsonl";

/// One recorded move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoLogEntry {
    pub session_id: String,
    /// RFC 3339 time of the move.
    pub timestamp: String,
    pub original_path: PathBuf,
    pub destination_path: PathBuf,
}

/// Generates a session id that sorts by start time.
pub fn new_session_id() -> String {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S-%3f");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", stamp, &suffix[..8])
}

enum WriterCommand {
    Append(UndoLogEntry, Sender<io::Result<()>>),
}

/// An open organize session and its log writer.
///
/// The log file is created on the first recorded move, so a session with no
/// moves leaves nothing behind. Dropping the session closes the writer.
pub struct Session {
    id: String,
    log_path: PathBuf,
    sender: Option<Sender<WriterCommand>>,
    worker: Option<JoinHandle<usize>>,
}

/// What a closed session left on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: String,
    pub entries: usize,
    /// Path of the log, if any move was recorded.
    pub log_path: Option<PathBuf>,
}

impl Session {
    /// Starts a session whose log lives in `undo_dir`.
    pub fn start(undo_dir: &Path) -> Self {
        Self::with_id(undo_dir, new_session_id())
    }

    /// Starts a session with a caller-chosen id.
    pub fn with_id(undo_dir: &Path, id: String) -> Self {
        let log_path = undo_dir.join(format!("{}.{}", id, LOG_EXTENSION));
        let (sender, receiver) = mpsc::channel();
        let path = log_path.clone();
        let worker = std::thread::spawn(move || run_writer(&path, receiver));
        log::info!("Started session {} (log {})", id, log_path.display());
        Self {
            id,
            log_path,
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Records a completed move and waits until it is durable.
    ///
    /// # Errors
    ///
    /// Returns `LogWriteFailed` if the entry could not be written and synced.
    pub fn record(&self, original: &Path, destination: &Path) -> OrganizeResult<UndoLogEntry> {
        let entry = UndoLogEntry {
            session_id: self.id.clone(),
            timestamp: chrono::Local::now().to_rfc3339(),
            original_path: original.to_path_buf(),
            destination_path: destination.to_path_buf(),
        };

        let (ack, done) = mpsc::channel();
        let closed = || OrganizeError::LogWriteFailed {
            path: self.log_path.clone(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "undo log writer stopped"),
        };
        self.sender
            .as_ref()
            .ok_or_else(closed)?
            .send(WriterCommand::Append(entry.clone(), ack))
            .map_err(|_| closed())?;

        match done.recv() {
            Ok(Ok(())) => Ok(entry),
            Ok(Err(e)) => Err(OrganizeError::LogWriteFailed {
                path: self.log_path.clone(),
                source: e,
            }),
            Err(_) => Err(closed()),
        }
    }

    /// Stops the writer and reports what was recorded.
    pub fn close(mut self) -> OrganizeResult<SessionSummary> {
        let entries = self.shutdown().ok_or_else(|| OrganizeError::LogWriteFailed {
            path: self.log_path.clone(),
            source: io::Error::other("undo log writer panicked"),
        })?;
        log::info!("Closed session {} with {} recorded moves", self.id, entries);
        Ok(SessionSummary {
            session_id: self.id.clone(),
            entries,
            log_path: (entries > 0).then(|| self.log_path.clone()),
        })
    }

    fn shutdown(&mut self) -> Option<usize> {
        drop(self.sender.take());
        self.worker.take().and_then(|w| w.join().ok())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_writer(path: &Path, receiver: Receiver<WriterCommand>) -> usize {
    let mut file: Option<File> = None;
    let mut written = 0;
    for command in receiver {
        match command {
            WriterCommand::Append(entry, ack) => {
                let result = append_entry(path, &mut file, &entry);
                if result.is_ok() {
                    written += 1;
                }
                let _ = ack.send(result);
            }
        }
    }
    written
}

fn append_entry(path: &Path, file: &mut Option<File>, entry: &UndoLogEntry) -> io::Result<()> {
    if file.is_none() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        *file = Some(OpenOptions::new().create(true).append(true).open(path)?);
    }
    let mut line = serde_json::to_string(entry).map_err(io::Error::other)?;
    line.push('\n');

    let Some(handle) = file.as_mut() else {
        return Err(io::Error::other("undo log not open"));
    };
    handle.write_all(line.as_bytes())?;
    handle.flush()?;
    handle.sync_data()
}

/// Reads a session log in recorded order.
///
/// A final line without a trailing newline is kept when it parses. If it
/// does not, it is the remains of an interrupted append and is ignored, as
/// long as complete entries precede it.
///
/// # Errors
///
/// Returns `LogReadFailed` if the file cannot be read and `LogCorrupt` if
/// any complete line fails to parse or names a different session.
pub fn read_log(path: &Path) -> OrganizeResult<Vec<UndoLogEntry>> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData => OrganizeError::LogCorrupt {
            path: path.to_path_buf(),
            line: 0,
            reason: e.to_string(),
        },
        _ => OrganizeError::LogReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let mut lines: Vec<&str> = content.split('\n').collect();
    // a trailing newline leaves an empty last element; anything else lacks one
    let tail = lines.pop().filter(|last| !last.trim().is_empty());

    let mut entries: Vec<UndoLogEntry> = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = parse_line(path, index + 1, line)?;
        push_entry(path, index + 1, &mut entries, entry)?;
    }

    if let Some(tail) = tail {
        let line = lines.len() + 1;
        match parse_line(path, line, tail) {
            Ok(entry) => push_entry(path, line, &mut entries, entry)?,
            // only an append interrupted after earlier complete ones is torn
            Err(e) if entries.is_empty() => return Err(e),
            Err(_) => log::warn!(
                "Ignoring incomplete final line in {}: {}",
                path.display(),
                tail
            ),
        }
    }

    Ok(entries)
}

fn parse_line(path: &Path, line: usize, text: &str) -> OrganizeResult<UndoLogEntry> {
    serde_json::from_str(text).map_err(|e| OrganizeError::LogCorrupt {
        path: path.to_path_buf(),
        line,
        reason: e.to_string(),
    })
}

fn push_entry(
    path: &Path,
    line: usize,
    entries: &mut Vec<UndoLogEntry>,
    entry: UndoLogEntry,
) -> OrganizeResult<()> {
    if let Some(first) = entries.first()
        && first.session_id != entry.session_id
    {
        return Err(OrganizeError::LogCorrupt {
            path: path.to_path_buf(),
            line,
            reason: format!(
                "session '{}' does not match '{}'",
                entry.session_id, first.session_id
            ),
        });
    }
    entries.push(entry);
    Ok(())
}

/// Finds the most recent session log in `undo_dir`.
pub fn latest_log(undo_dir: &Path) -> OrganizeResult<Option<PathBuf>> {
    if !undo_dir.exists() {
        return Ok(None);
    }
    let entries = fs::read_dir(undo_dir).map_err(|e| OrganizeError::LogReadFailed {
        path: undo_dir.to_path_buf(),
        source: e,
    })?;

    Ok(entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == LOG_EXTENSION))
        .max())
}
