//! Command-line interface module for organize.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Organization orchestration (scan, plan, execute)
//! - Undo and category listing
//! - Exit codes

use crate::analyzer::{AnalyzerBackend, OllamaBackend};
use crate::classifier::Classifier;
use crate::config::OrganizerConfig;
use crate::error::{OrganizeError, OrganizeResult};
use crate::file_category::CategoryRegistry;
use crate::file_organizer::FileOrganizer;
use crate::output::OutputFormatter;
use crate::planner::Planner;
use crate::scanner::Scanner;
use crate::undo::UndoManager;
use crate::undo_log::{Session, latest_log};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything worked, including dry runs and complete undos.
pub const EXIT_SUCCESS: i32 = 0;
/// The run completed but at least one move or restore failed.
pub const EXIT_PARTIAL_FAILURE: i32 = 1;
/// Nothing was done: bad arguments, unreadable source, corrupt log.
pub const EXIT_FATAL: i32 = 2;

/// Sort a directory into categorized folders, reversibly.
#[derive(Debug, Parser)]
#[command(name = "organize", version)]
pub struct Cli {
    /// Directory to organize
    pub source: Option<PathBuf>,

    /// Output root [default: SOURCE/Organized]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Show the plan without moving anything
    #[arg(short = 'n', long, conflicts_with_all = ["undo", "categories"])]
    pub dry_run: bool,

    /// Skip the AI analyzer and classify by rules only
    #[arg(short, long)]
    pub fast: bool,

    /// Descend into subdirectories (default)
    #[arg(short, long, overrides_with = "no_recursive")]
    pub recursive: bool,

    /// Only organize files directly inside SOURCE
    #[arg(long, overrides_with = "recursive")]
    pub no_recursive: bool,

    /// Analyzer model name
    #[arg(short, long, value_name = "NAME")]
    pub model: Option<String>,

    /// Revert the most recent organize session
    #[arg(short, long, conflicts_with = "categories")]
    pub undo: bool,

    /// List the available categories
    #[arg(short, long)]
    pub categories: bool,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn is_recursive(&self) -> bool {
        !self.no_recursive
    }
}

/// Runs the CLI and returns the process exit code.
///
/// Fatal errors are printed here and map to [`EXIT_FATAL`].
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use organize::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["organize", "/path/to/directory", "--dry-run"]);
/// std::process::exit(run_cli(&cli));
/// ```
pub fn run_cli(cli: &Cli) -> i32 {
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            OutputFormatter::error(&e.to_string());
            EXIT_FATAL
        }
    }
}

/// Runs the CLI, returning fatal errors to the caller.
pub fn run(cli: &Cli) -> OrganizeResult<i32> {
    if cli.categories {
        OutputFormatter::categories_table(&CategoryRegistry::builtin());
        return Ok(EXIT_SUCCESS);
    }

    let mut config = OrganizerConfig::load(cli.config.as_deref())?;
    if let Some(model) = &cli.model {
        config.analyzer.model = model.clone();
    }

    if cli.undo {
        undo_latest(cli, &config)
    } else {
        organize(cli, &config)
    }
}

/// Resolves the output root: `--output`, else under the source, else under
/// the working directory.
pub fn output_root(cli: &Cli, config: &OrganizerConfig) -> PathBuf {
    match (&cli.output, &cli.source) {
        (Some(output), _) => output.clone(),
        (None, Some(source)) => source.join(&config.output.dir_name),
        (None, None) => PathBuf::from(&config.output.dir_name),
    }
}

fn organize(cli: &Cli, config: &OrganizerConfig) -> OrganizeResult<i32> {
    let source = cli
        .source
        .as_deref()
        .ok_or_else(|| OrganizeError::InvalidArgument {
            reason: "a source directory is required".to_string(),
        })?;
    let source = fs::canonicalize(source).map_err(|e| OrganizeError::SourceUnreadable {
        path: source.to_path_buf(),
        source: e,
    })?;
    let output_root = match &cli.output {
        Some(output) => absolute_output(output)?,
        None => source.join(&config.output.dir_name),
    };
    let dry_run = cli.dry_run;
    let recursive = cli.is_recursive();

    if dry_run {
        OutputFormatter::dry_run_notice(&format!("Analyzing {}", source.display()));
    } else {
        OutputFormatter::info(&format!("Organizing {}", source.display()));
    }

    let records = Scanner::new(&config.scan)
        .prune(&output_root)
        .scan(&source, recursive)?;
    if records.is_empty() {
        OutputFormatter::info("No files found to organize.");
        return Ok(EXIT_SUCCESS);
    }

    let backend = if cli.fast {
        OutputFormatter::info("Fast mode: classifying by extension and keywords.");
        None
    } else {
        match OllamaBackend::connect(&config.analyzer) {
            Ok(backend) => {
                OutputFormatter::info(&format!("Using AI analyzer ({})", backend.model()));
                Some(backend)
            }
            Err(e) => {
                OutputFormatter::warning(&format!(
                    "AI analyzer unavailable ({}); using rule-based classification.",
                    e
                ));
                None
            }
        }
    };

    let registry = CategoryRegistry::builtin();
    let classifier = Classifier::new(
        &registry,
        backend.as_ref().map(|b| b as &dyn AnalyzerBackend),
    );
    let filters = config.compile_filters()?;

    let progress = OutputFormatter::create_progress_bar(records.len() as u64, "Classifying");
    let plan = Planner::new(&classifier)
        .with_filters(&filters)
        .with_max_file_size(config.scan.max_file_size_bytes())
        .with_max_concurrency(config.analyzer.max_concurrency)
        .with_progress(progress.clone())
        .plan(&source, &records, &output_root, recursive);
    progress.finish_and_clear();

    if plan.is_empty() {
        OutputFormatter::info("Nothing to organize after filtering.");
        return Ok(EXIT_SUCCESS);
    }

    OutputFormatter::plan_table(&plan);
    OutputFormatter::method_summary(&plan);

    let session = Session::start(&output_root.join(&config.output.undo_dir_name));
    let progress = OutputFormatter::create_progress_bar(plan.len() as u64, "Moving");
    let outcomes = FileOrganizer::new()
        .with_progress(progress.clone())
        .execute(&plan, &session, dry_run);
    progress.finish_and_clear();
    let summary = session.close()?;

    OutputFormatter::organize_summary(&outcomes, dry_run);

    if dry_run {
        OutputFormatter::success("Dry run complete. No files were modified.");
    } else if summary.log_path.is_some() {
        OutputFormatter::success(&format!(
            "Moved {} files. Run 'organize --undo --output {}' to revert.",
            summary.entries,
            output_root.display()
        ));
    }

    let failed = outcomes.iter().filter(|o| o.is_failure()).count();
    if failed > 0 {
        OutputFormatter::warning(&format!("{} files could not be organized.", failed));
        return Ok(EXIT_PARTIAL_FAILURE);
    }
    Ok(EXIT_SUCCESS)
}

fn undo_latest(cli: &Cli, config: &OrganizerConfig) -> OrganizeResult<i32> {
    let output_root = absolute_output(&output_root(cli, config))?;
    let undo_dir = output_root.join(&config.output.undo_dir_name);
    let log_path = latest_log(&undo_dir)?.ok_or_else(|| OrganizeError::InvalidArgument {
        reason: format!("no organize session to undo in {}", undo_dir.display()),
    })?;

    OutputFormatter::info(&format!("Undoing session {}", log_path.display()));
    let report = UndoManager::undo(&log_path)?;
    OutputFormatter::undo_summary(&report);

    if report.is_complete_success() {
        OutputFormatter::success("Undo complete.");
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_PARTIAL_FAILURE)
    }
}

fn absolute_output(path: &Path) -> OrganizeResult<PathBuf> {
    if path.exists() {
        return fs::canonicalize(path).map_err(|e| OrganizeError::InvalidArgument {
            reason: format!("cannot resolve output {}: {}", path.display(), e),
        });
    }
    std::path::absolute(path).map_err(|e| OrganizeError::InvalidArgument {
        reason: format!("cannot resolve output {}: {}", path.display(), e),
    })
}
