/// Organization planning.
///
/// The planner turns scanned files into an ordered list of moves. It
/// classifies files in parallel on a bounded pool, restores scan order, then
/// allocates collision-free destinations one entry at a time. It never
/// touches the filesystem beyond existence checks.
use crate::classifier::{ClassificationMethod, ClassificationResult, Classifier};
use crate::config::CompiledFilters;
use crate::file_category::Category;
use crate::scanner::{FileRecord, split_name};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One planned move.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntry {
    pub source: PathBuf,
    /// Absolute destination inside the output root, unique within the plan.
    pub destination: PathBuf,
    pub category: Category,
    pub method: ClassificationMethod,
}

impl PlanEntry {
    pub fn confidence(&self) -> f64 {
        self.method.confidence()
    }
}

/// Why a scanned file was left out of the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Larger than the size ceiling.
    TooLarge,
    /// Rejected by the exclusion rules.
    Excluded,
    /// Below the top level in a non-recursive run, or not under the source.
    OutsideScope,
    /// Already inside the output root.
    InsideOutput,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SkipReason::TooLarge => "too large",
            SkipReason::Excluded => "excluded",
            SkipReason::OutsideScope => "outside scope",
            SkipReason::InsideOutput => "inside output",
        };
        f.write_str(text)
    }
}

/// Ordered moves plus the files left alone.
#[derive(Debug, Clone, Default)]
pub struct OrganizationPlan {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub entries: Vec<PlanEntry>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
}

impl OrganizationPlan {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry count per classification method, in chain order.
    pub fn method_counts(&self) -> Vec<(ClassificationMethod, usize)> {
        ClassificationMethod::ALL
            .iter()
            .map(|&m| (m, self.entries.iter().filter(|e| e.method == m).count()))
            .filter(|&(_, count)| count > 0)
            .collect()
    }
}

/// Builds organization plans.
pub struct Planner<'a> {
    classifier: &'a Classifier<'a>,
    filters: Option<&'a CompiledFilters>,
    max_file_size: Option<u64>,
    max_concurrency: usize,
    progress: Option<ProgressBar>,
}

impl<'a> Planner<'a> {
    pub fn new(classifier: &'a Classifier<'a>) -> Self {
        Self {
            classifier,
            filters: None,
            max_file_size: None,
            max_concurrency: 1,
            progress: None,
        }
    }

    /// Excludes files rejected by `filters`.
    pub fn with_filters(mut self, filters: &'a CompiledFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Skips files strictly larger than `bytes`.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    /// Bounds the number of files classified at once.
    pub fn with_max_concurrency(mut self, workers: usize) -> Self {
        self.max_concurrency = workers.max(1);
        self
    }

    /// Advances `progress` once per classified file.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Plans moves for `records` into `output_root`.
    ///
    /// Entries keep the order of `records`. Destinations are
    /// `output_root/<category path>/<file name>`, suffixed `_1`, `_2`, ...
    /// before the extension when the path exists or was already allocated.
    pub fn plan(
        &self,
        source_root: &Path,
        records: &[FileRecord],
        output_root: &Path,
        recursive: bool,
    ) -> OrganizationPlan {
        let mut plan = OrganizationPlan {
            source_root: source_root.to_path_buf(),
            output_root: output_root.to_path_buf(),
            ..Default::default()
        };

        let mut candidates = Vec::with_capacity(records.len());
        for record in records {
            match self.skip_reason(source_root, output_root, record, recursive) {
                Some(reason) => {
                    log::debug!("Skipping {} ({})", record.path.display(), reason);
                    plan.skipped.push((record.path.clone(), reason));
                }
                None => candidates.push(record),
            }
        }

        let results = self.classify_all(&candidates);

        let mut allocated = HashSet::new();
        for (record, result) in candidates.into_iter().zip(results) {
            let dir = category_dir(output_root, &result.category);
            let destination = unique_destination(&dir, record, &allocated);
            allocated.insert(destination.clone());
            plan.entries.push(PlanEntry {
                source: record.path.clone(),
                destination,
                category: result.category,
                method: result.method,
            });
        }

        plan
    }

    fn skip_reason(
        &self,
        source_root: &Path,
        output_root: &Path,
        record: &FileRecord,
        recursive: bool,
    ) -> Option<SkipReason> {
        if record.path.starts_with(output_root) {
            return Some(SkipReason::InsideOutput);
        }
        let Ok(relative) = record.path.strip_prefix(source_root) else {
            return Some(SkipReason::OutsideScope);
        };
        if !recursive && relative.components().count() != 1 {
            return Some(SkipReason::OutsideScope);
        }
        if self.max_file_size.is_some_and(|max| record.size_bytes > max) {
            return Some(SkipReason::TooLarge);
        }
        if self.filters.is_some_and(|f| !f.should_include(relative)) {
            return Some(SkipReason::Excluded);
        }
        None
    }

    /// Classifies on a bounded pool; indexed collect keeps input order.
    fn classify_all(&self, records: &[&FileRecord]) -> Vec<ClassificationResult> {
        let classify = |record: &&FileRecord| {
            let result = self.classifier.classify(record);
            log::debug!(
                "{} -> {} ({}, {:.2})",
                record.name,
                result.category.name,
                result.method,
                result.confidence()
            );
            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
            result
        };

        if self.max_concurrency <= 1 || records.len() <= 1 {
            return records.iter().map(classify).collect();
        }

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_concurrency)
            .build()
        {
            Ok(pool) => pool.install(|| records.par_iter().map(classify).collect()),
            Err(e) => {
                log::warn!("Could not start classification pool ({}), running sequentially", e);
                records.iter().map(classify).collect()
            }
        }
    }
}

fn category_dir(output_root: &Path, category: &Category) -> PathBuf {
    category
        .path
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(output_root.to_path_buf(), |dir, part| dir.join(part))
}

/// Picks the first free `stem[_n]ext` name in `dir`.
fn unique_destination(dir: &Path, record: &FileRecord, allocated: &HashSet<PathBuf>) -> PathBuf {
    let is_free = |path: &Path| !allocated.contains(path) && !path.exists();

    let candidate = dir.join(&record.name);
    if is_free(&candidate) {
        return candidate;
    }

    let (stem, suffix) = split_name(&record.name, &record.extension);
    (1u64..)
        .map(|n| dir.join(format!("{}_{}{}", stem, n, suffix)))
        .find(|path| is_free(path))
        .unwrap_or(candidate)
}
