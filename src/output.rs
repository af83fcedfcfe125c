//! Output formatting and styling module.
//!
//! All user-facing terminal output goes through [`OutputFormatter`]: colored
//! status lines, progress bars, the plan table and the run summaries.
//! Diagnostics belong to the `log` facade instead.

use crate::classifier::ClassificationMethod;
use crate::file_category::CategoryRegistry;
use crate::file_organizer::{MoveOutcome, MoveStatus};
use crate::planner::OrganizationPlan;
use crate::undo::UndoReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::Path;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use organize::output::OutputFormatter;
    /// OutputFormatter::success("Organization complete");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar labelled with `message`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use organize::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100, "Classifying");
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        let pb = ProgressBar::new(total);
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb
    }

    /// Colors a confidence value: green from 0.8, yellow from 0.5, red below.
    pub fn confidence(value: f64) -> ColoredString {
        let text = format!("{:.0}%", value * 100.0);
        if value >= 0.8 {
            text.green()
        } else if value >= 0.5 {
            text.yellow()
        } else {
            text.red()
        }
    }

    /// Prints the registry as a table.
    pub fn categories_table(registry: &CategoryRegistry) {
        Self::header("CATEGORIES");
        let key_width = registry
            .all_categories()
            .iter()
            .map(|c| c.key.len())
            .max()
            .unwrap_or(0)
            .max(3);
        let path_width = registry
            .all_categories()
            .iter()
            .map(|c| c.path.len())
            .max()
            .unwrap_or(0)
            .max(11);

        println!(
            "{:<kw$} | {:<pw$} | {}",
            "Key".bold(),
            "Destination".bold(),
            "Description".bold(),
            kw = key_width,
            pw = path_width
        );
        println!("{}", "-".repeat(key_width + path_width + 40));
        for category in registry.all_categories() {
            println!(
                "{:<kw$} | {:<pw$} | {}",
                category.key.cyan(),
                category.path,
                category.description,
                kw = key_width,
                pw = path_width
            );
        }
    }

    /// Prints one row per planned move.
    pub fn plan_table(plan: &OrganizationPlan) {
        Self::header("PLAN");
        let rows: Vec<(String, &str, String, ClassificationMethod, f64)> = plan
            .entries
            .iter()
            .map(|entry| {
                let file = relative_display(&entry.source, &plan.source_root);
                let destination = relative_display(&entry.destination, &plan.output_root);
                (
                    file,
                    entry.category.name.as_str(),
                    destination,
                    entry.method,
                    entry.confidence(),
                )
            })
            .collect();

        let file_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(0).max(4);
        let category_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(0).max(8);
        let destination_width = rows.iter().map(|r| r.2.len()).max().unwrap_or(0).max(11);

        println!(
            "{:<fw$} | {:<cw$} | {:<dw$} | {:<9} | {}",
            "File".bold(),
            "Category".bold(),
            "Destination".bold(),
            "Method".bold(),
            "Confidence".bold(),
            fw = file_width,
            cw = category_width,
            dw = destination_width
        );
        println!(
            "{}",
            "-".repeat(file_width + category_width + destination_width + 36)
        );
        for (file, category, destination, method, confidence) in &rows {
            println!(
                "{:<fw$} | {:<cw$} | {:<dw$} | {:<9} | {}",
                file,
                category,
                destination,
                method.as_str(),
                Self::confidence(*confidence),
                fw = file_width,
                cw = category_width,
                dw = destination_width
            );
        }

        if !plan.skipped.is_empty() {
            Self::header("SKIPPED");
            for (path, reason) in &plan.skipped {
                println!(
                    " - {} ({})",
                    relative_display(path, &plan.source_root),
                    reason
                );
            }
        }
    }

    /// Prints how many entries each classification method produced.
    pub fn method_summary(plan: &OrganizationPlan) {
        Self::header("CLASSIFICATION METHODS");
        for (method, count) in plan.method_counts() {
            println!(
                "  {:<9} {:>4}  ({})",
                method.as_str(),
                count,
                Self::confidence(method.confidence())
            );
        }
    }

    /// Prints the per-category and per-method results of a run.
    pub fn organize_summary(outcomes: &[MoveOutcome], dry_run: bool) {
        Self::header(if dry_run { "DRY RUN SUMMARY" } else { "SUMMARY" });

        let mut by_category: BTreeMap<&str, usize> = BTreeMap::new();
        let mut by_method: BTreeMap<ClassificationMethod, usize> = BTreeMap::new();
        for outcome in outcomes.iter().filter(|o| !o.is_failure()) {
            *by_category.entry(outcome.entry.category.name.as_str()).or_insert(0) += 1;
            *by_method.entry(outcome.entry.method).or_insert(0) += 1;
        }
        let succeeded: usize = by_category.values().sum();

        let width = by_category
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(8);
        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));
        for (category, count) in &by_category {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                file_word(*count),
                width = width
            );
        }
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            succeeded.to_string().green().bold(),
            file_word(succeeded),
            width = width
        );

        if !by_method.is_empty() {
            let methods: Vec<String> = by_method
                .iter()
                .map(|(method, count)| format!("{} {}", method, count))
                .collect();
            println!("By method: {}", methods.join(", "));
        }

        let failures: Vec<&MoveOutcome> = outcomes.iter().filter(|o| o.is_failure()).collect();
        if !failures.is_empty() {
            Self::header("FAILED");
            for outcome in failures {
                if let MoveStatus::Failed(e) = &outcome.status {
                    Self::error(&e.to_string());
                }
            }
        }
    }

    /// Prints the restored count and every failed restore.
    pub fn undo_summary(report: &UndoReport) {
        Self::header("UNDO SUMMARY");
        println!(
            "Restored: {} {}",
            report.restored_count().to_string().green(),
            file_word(report.restored_count())
        );

        let failures: Vec<_> = report.failures().collect();
        if !failures.is_empty() {
            println!("Failed: {}", failures.len().to_string().red());
            for (_, e) in failures {
                Self::error(&e.to_string());
            }
            Self::warning(&kept_log_hint(&report.log_path));
        }
    }
}

fn file_word(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Shown when a partial undo keeps its log.
fn kept_log_hint(log_path: &Path) -> String {
    format!(
        "Undo log kept at {}. Entries restored in this run will be reported \
         as missing if --undo is run again; restore the failed files by hand, \
         then delete the log.",
        log_path.display()
    )
}

fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
