//! organize - sort a directory into a category tree, reversibly
//!
//! Files are scanned, classified through a fallback chain (local LLM,
//! extension, keyword, catch-all), planned into collision-free destinations
//! and moved. Every move is recorded in a per-session undo log so the whole
//! session can be reverted.

pub mod analyzer;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod file_category;
pub mod file_organizer;
pub mod output;
pub mod planner;
pub mod scanner;
pub mod undo;
pub mod undo_log;

pub use analyzer::{AnalysisRequest, AnalyzerBackend, AnalyzerError, OllamaBackend};
pub use classifier::{ClassificationMethod, ClassificationResult, Classifier};
pub use config::{CompiledFilters, ConfigError, OrganizerConfig};
pub use error::{OrganizeError, OrganizeResult};
pub use file_category::{Category, CategoryRegistry};
pub use file_organizer::{FileOrganizer, MoveOutcome, MoveStatus};
pub use planner::{OrganizationPlan, PlanEntry, Planner, SkipReason};
pub use scanner::{FileRecord, Scanner};
pub use undo::{UndoManager, UndoReport};
pub use undo_log::{Session, UndoLogEntry};

pub use cli::{Cli, run_cli};
