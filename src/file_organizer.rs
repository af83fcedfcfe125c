/// Plan execution.
///
/// This module carries out an organization plan: it creates destination
/// directories, moves files, and records every successful move in the
/// session's undo log before touching the next file. A failed entry is
/// reported and the rest of the plan still runs.
use crate::error::{OrganizeError, OrganizeResult};
use crate::planner::{OrganizationPlan, PlanEntry};
use crate::undo_log::Session;
use indicatif::ProgressBar;
use std::fs;
use std::io;
use std::path::Path;

/// Result of one plan entry.
#[derive(Debug)]
pub enum MoveStatus {
    /// Dry run: nothing was touched.
    WouldMove,
    /// The file was moved and the move is in the undo log.
    Moved,
    /// The file was left where it was.
    Failed(OrganizeError),
}

/// A plan entry together with what happened to it.
#[derive(Debug)]
pub struct MoveOutcome {
    pub entry: PlanEntry,
    pub status: MoveStatus,
}

impl MoveOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, MoveStatus::Failed(_))
    }
}

/// Executes organization plans.
pub struct FileOrganizer {
    progress: Option<ProgressBar>,
}

impl FileOrganizer {
    pub fn new() -> Self {
        Self { progress: None }
    }

    /// Advances `progress` once per processed entry.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Executes `plan` in order, recording moves in `session`.
    ///
    /// With `dry_run` every entry is reported as `WouldMove` and neither
    /// the filesystem nor the undo log is touched.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use organize::file_organizer::FileOrganizer;
    /// use organize::planner::OrganizationPlan;
    /// use organize::undo_log::Session;
    /// use std::path::Path;
    ///
    /// let plan = OrganizationPlan::default();
    /// let session = Session::start(Path::new("/out/.organize_undo"));
    /// let outcomes = FileOrganizer::new().execute(&plan, &session, false);
    /// println!("{} entries processed", outcomes.len());
    /// ```
    pub fn execute(
        &self,
        plan: &OrganizationPlan,
        session: &Session,
        dry_run: bool,
    ) -> Vec<MoveOutcome> {
        let mut outcomes = Vec::with_capacity(plan.entries.len());

        for entry in &plan.entries {
            let status = if dry_run {
                MoveStatus::WouldMove
            } else {
                match Self::move_and_record(entry, session) {
                    Ok(()) => MoveStatus::Moved,
                    Err(e) => {
                        log::warn!("{}", e);
                        MoveStatus::Failed(e)
                    }
                }
            };
            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
            outcomes.push(MoveOutcome {
                entry: entry.clone(),
                status,
            });
        }

        outcomes
    }

    /// Moves one file and logs it; reverts the move if logging fails.
    fn move_and_record(entry: &PlanEntry, session: &Session) -> OrganizeResult<()> {
        let failed = |reason: String| OrganizeError::MoveFailed {
            source: entry.source.clone(),
            destination: entry.destination.clone(),
            reason,
        };

        if let Some(dir) = entry.destination.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| failed(format!("cannot create {}: {}", dir.display(), e)))?;
        }
        if entry.destination.exists() {
            return Err(failed("destination is already occupied".to_string()));
        }

        move_file(&entry.source, &entry.destination).map_err(|e| failed(e.to_string()))?;
        log::debug!(
            "Moved {} -> {}",
            entry.source.display(),
            entry.destination.display()
        );

        if let Err(log_error) = session.record(&entry.source, &entry.destination) {
            return match move_file(&entry.destination, &entry.source) {
                Ok(()) => Err(failed(format!("{}; move reverted", log_error))),
                Err(revert) => Err(failed(format!(
                    "{}; could not revert move: {}",
                    log_error, revert
                ))),
            };
        }

        Ok(())
    }
}

impl Default for FileOrganizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Renames a file, copying across filesystems when rename cannot.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from).inspect_err(|_| {
                let _ = fs::remove_file(to);
            })
        }
        Err(e) => Err(e),
    }
}
