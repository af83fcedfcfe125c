//! Directory scanning and lightweight content extraction.
//!
//! The scanner turns a source directory into an ordered list of
//! [`FileRecord`]s. It never moves or filters by policy; size ceilings and
//! exclusion rules belong to the planner.

use crate::config::ScanSettings;
use crate::error::{OrganizeError, OrganizeResult};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Multi-part suffixes treated as a single extension.
const COMPOUND_EXTENSIONS: &[&str] = &[".tar.gz", ".tar.bz2", ".tar.xz"];

const PDF_EXTENSION: &str = ".pdf";

/// Bytes read from the head of a file for MIME sniffing.
const SNIFF_LEN: u64 = 8192;

/// One scanned file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// File name component.
    pub name: String,
    /// Lowercased extension with leading dot, empty if none.
    pub extension: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// MIME type sniffed from content, if recognized.
    pub mime_type: Option<String>,
    /// Leading text of the file, capped at the configured length.
    pub text_snippet: Option<String>,
    /// Text extraction was attempted and failed.
    pub text_extraction_failed: bool,
}

impl FileRecord {
    /// Builds a record from a path without touching the filesystem.
    pub fn from_path(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = extension_of(&name);
        Self {
            path,
            name,
            extension,
            size_bytes,
            mime_type: None,
            text_snippet: None,
            text_extraction_failed: false,
        }
    }

    /// Attaches a text snippet.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_snippet = Some(text.into());
        self
    }

    /// Returns the snippet if it holds any non-whitespace text.
    pub fn text(&self) -> Option<&str> {
        self.text_snippet
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// Returns the file name without its (possibly compound) extension.
    pub fn stem(&self) -> &str {
        split_name(&self.name, &self.extension).0
    }
}

/// Returns the lowercased extension of a file name, compound-aware.
///
/// Names with no dot, or whose only dot is leading (`.bashrc`), have no
/// extension.
pub fn extension_of(name: &str) -> String {
    let lower = name.to_lowercase();
    for compound in COMPOUND_EXTENSIONS {
        if lower.len() > compound.len() && lower.ends_with(compound) {
            return compound.to_string();
        }
    }
    match lower.rfind('.') {
        Some(i) if i > 0 => lower[i..].to_string(),
        _ => String::new(),
    }
}

/// Splits a file name into stem and suffix using a known extension.
pub fn split_name<'a>(name: &'a str, extension: &str) -> (&'a str, &'a str) {
    let cut = name.len().saturating_sub(extension.len());
    if !extension.is_empty()
        && cut > 0
        && name.is_char_boundary(cut)
        && name[cut..].eq_ignore_ascii_case(extension)
    {
        (&name[..cut], &name[cut..])
    } else {
        (name, "")
    }
}

/// Walks a source directory and produces file records.
pub struct Scanner {
    max_content_chars: usize,
    text_extensions: HashSet<String>,
    prune: Vec<PathBuf>,
}

impl Scanner {
    pub fn new(settings: &ScanSettings) -> Self {
        Self {
            max_content_chars: settings.max_content_chars,
            text_extensions: settings
                .text_extensions
                .iter()
                .map(|e| crate::file_category::normalize_extension(e))
                .collect(),
            prune: Vec::new(),
        }
    }

    /// Skips a directory subtree, typically the output root.
    pub fn prune(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prune.push(dir.into());
        self
    }

    /// Scans `root`, descending into subdirectories when `recursive`.
    ///
    /// Records come back sorted by path within each directory, so repeated
    /// scans of an unchanged tree yield the same order.
    ///
    /// # Errors
    ///
    /// Returns `SourceUnreadable` if `root` is missing, not a directory, or
    /// cannot be listed. Individual unreadable entries are skipped.
    pub fn scan(&self, root: &Path, recursive: bool) -> OrganizeResult<Vec<FileRecord>> {
        let metadata = fs::metadata(root).map_err(|e| OrganizeError::SourceUnreadable {
            path: root.to_path_buf(),
            source: e,
        })?;
        if !metadata.is_dir() {
            return Err(OrganizeError::SourceUnreadable {
                path: root.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            });
        }
        fs::read_dir(root).map_err(|e| OrganizeError::SourceUnreadable {
            path: root.to_path_buf(),
            source: e,
        })?;

        let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut records = Vec::new();
        let entries = walker
            .into_iter()
            .filter_entry(|entry| !self.prune.iter().any(|p| entry.path() == p.as_path()));
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            match self.read_record(entry.path()) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping {}: {}", entry.path().display(), e),
            }
        }

        log::debug!("Scanned {} files under {}", records.len(), root.display());
        Ok(records)
    }

    fn read_record(&self, path: &Path) -> std::io::Result<FileRecord> {
        let metadata = fs::metadata(path)?;
        let mut record = FileRecord::from_path(path, metadata.len());
        record.mime_type = sniff_mime(path);

        let text = if self.text_extensions.contains(&record.extension) {
            Some(self.read_text(path))
        } else if record.extension == PDF_EXTENSION {
            Some(self.read_pdf_text(path))
        } else {
            None
        };

        if let Some(text) = text {
            match text {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        record.text_snippet = Some(text.to_string());
                    }
                }
                Err(e) => {
                    log::debug!("Text extraction failed for {}: {}", path.display(), e);
                    record.text_extraction_failed = true;
                }
            }
        }

        Ok(record)
    }

    fn read_pdf_text(&self, path: &Path) -> std::io::Result<String> {
        // malformed documents can panic inside the parser
        let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text(path))
            .map_err(|_| std::io::Error::other("PDF parser panicked"))?
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        Ok(extracted.chars().take(self.max_content_chars).collect())
    }

    fn read_text(&self, path: &Path) -> std::io::Result<String> {
        // a char is at most 4 bytes in UTF-8
        let limit = (self.max_content_chars as u64).saturating_mul(4);
        let mut buf = Vec::new();
        File::open(path)?.take(limit).read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf)
            .chars()
            .take(self.max_content_chars)
            .collect())
    }
}

fn sniff_mime(path: &Path) -> Option<String> {
    let mut head = Vec::new();
    File::open(path)
        .and_then(|f| f.take(SNIFF_LEN).read_to_end(&mut head))
        .ok()?;
    infer::get(&head).map(|kind| kind.mime_type().to_string())
}
