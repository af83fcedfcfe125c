/// Undo functionality for reverting an organize session.
///
/// The undo log of a session is replayed backwards: the last recorded move
/// is reversed first. A failed entry is reported and the rest still run.
/// The log is deleted only when every entry was restored.
use crate::error::{OrganizeError, OrganizeResult};
use crate::file_organizer::move_file;
use crate::undo_log::{UndoLogEntry, read_log};
use std::fs;
use std::path::{Path, PathBuf};

/// Represents the result of an undo operation.
#[derive(Debug)]
pub struct UndoReport {
    /// The replayed log.
    pub log_path: PathBuf,
    /// Per-entry outcomes in processing order, newest move first.
    pub outcomes: Vec<(UndoLogEntry, OrganizeResult<()>)>,
    /// True when the log was fully consumed and removed.
    pub log_consumed: bool,
}

impl UndoReport {
    /// Number of files moved back to their original location.
    pub fn restored_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_ok()).count()
    }

    /// Entries that could not be restored.
    pub fn failures(&self) -> impl Iterator<Item = (&UndoLogEntry, &OrganizeError)> {
        self.outcomes
            .iter()
            .filter_map(|(entry, result)| result.as_ref().err().map(|e| (entry, e)))
    }

    /// Returns true if the undo was completely successful.
    pub fn is_complete_success(&self) -> bool {
        self.outcomes.iter().all(|(_, r)| r.is_ok())
    }
}

/// Replays undo logs.
pub struct UndoManager;

impl UndoManager {
    /// Reverses every move recorded in `log_path`.
    ///
    /// The log is expected at `<output root>/<undo dir>/<session>.jsonl`.
    /// After a complete restore the log is deleted and directories left
    /// empty under the output root are removed. The output root itself is
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns `LogReadFailed` or `LogCorrupt` if the log cannot be loaded.
    /// Per-entry problems are `RestoreFailed` outcomes inside the report.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use organize::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// let log = Path::new("/out/.organize_undo/20260101-120000-abcdef12.jsonl");
    /// match UndoManager::undo(log) {
    ///     Ok(report) => println!("Restored {} files", report.restored_count()),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(log_path: &Path) -> OrganizeResult<UndoReport> {
        let entries = read_log(log_path)?;
        log::info!(
            "Undoing {} moves from {}",
            entries.len(),
            log_path.display()
        );

        // undo is LIFO
        let outcomes: Vec<_> = entries
            .into_iter()
            .rev()
            .map(|entry| {
                let result = Self::restore_file(&entry);
                if let Err(e) = &result {
                    log::warn!("{}", e);
                }
                (entry, result)
            })
            .collect();

        let mut report = UndoReport {
            log_path: log_path.to_path_buf(),
            outcomes,
            log_consumed: false,
        };

        if report.is_complete_success() {
            match fs::remove_file(log_path) {
                Ok(()) => {
                    report.log_consumed = true;
                    log::info!("Consumed undo log {}", log_path.display());
                    Self::remove_empty_dirs(log_path, &report.outcomes);
                }
                Err(e) => log::warn!(
                    "Could not delete undo log {}: {}",
                    log_path.display(),
                    e
                ),
            }
        }

        Ok(report)
    }

    /// Moves a single file back to where it came from.
    fn restore_file(entry: &UndoLogEntry) -> OrganizeResult<()> {
        let failed = |reason: String| OrganizeError::RestoreFailed {
            original: entry.original_path.clone(),
            destination: entry.destination_path.clone(),
            reason,
        };

        if !entry.destination_path.exists() {
            return Err(failed("file is no longer at its destination".to_string()));
        }
        if entry.original_path.exists() {
            return Err(failed("original path is occupied".to_string()));
        }

        if let Some(parent) = entry.original_path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .map_err(|e| failed(format!("cannot recreate {}: {}", parent.display(), e)))?;
        }

        move_file(&entry.destination_path, &entry.original_path)
            .map_err(|e| failed(e.to_string()))?;
        log::debug!(
            "Restored {} -> {}",
            entry.destination_path.display(),
            entry.original_path.display()
        );
        Ok(())
    }

    /// Removes directories emptied by the undo, stopping at the output root.
    fn remove_empty_dirs(log_path: &Path, outcomes: &[(UndoLogEntry, OrganizeResult<()>)]) {
        let Some(undo_dir) = log_path.parent() else {
            return;
        };
        let Some(output_root) = undo_dir.parent() else {
            return;
        };

        let mut candidates: Vec<&Path> = vec![undo_dir];
        candidates.extend(
            outcomes
                .iter()
                .filter_map(|(entry, _)| entry.destination_path.parent()),
        );

        for start in candidates {
            let mut dir = start;
            while dir != output_root && dir.starts_with(output_root) {
                // fails on non-empty directories, which ends the climb
                if fs::remove_dir(dir).is_err() {
                    break;
                }
                match dir.parent() {
                    Some(parent) => dir = parent,
                    None => break,
                }
            }
        }
    }
}
