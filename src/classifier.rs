//! Fallback-chain classification.
//!
//! Every file gets a category. The chain is tried in a fixed order and the
//! first tier that answers wins:
//!
//! 1. analyzer backend, when enabled and the file has text
//! 2. extension lookup
//! 3. keyword lookup on the file name, then on the text
//! 4. the fallback category
//!
//! Confidence is a constant of the tier, never a computed score.

use crate::analyzer::{AnalysisRequest, AnalyzerBackend, AnalyzerError};
use crate::file_category::{Category, CategoryRegistry};
use crate::scanner::FileRecord;
use std::fmt;

/// Which tier of the chain produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClassificationMethod {
    Ai,
    Extension,
    Keyword,
    Fallback,
}

impl ClassificationMethod {
    /// All methods, in chain order.
    pub const ALL: [ClassificationMethod; 4] = [
        ClassificationMethod::Ai,
        ClassificationMethod::Extension,
        ClassificationMethod::Keyword,
        ClassificationMethod::Fallback,
    ];

    /// Fixed confidence of this tier.
    pub fn confidence(self) -> f64 {
        match self {
            ClassificationMethod::Ai => 0.95,
            ClassificationMethod::Extension => 0.90,
            ClassificationMethod::Keyword => 0.70,
            ClassificationMethod::Fallback => 0.30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClassificationMethod::Ai => "ai",
            ClassificationMethod::Extension => "extension",
            ClassificationMethod::Keyword => "keyword",
            ClassificationMethod::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one file.
///
/// Confidence is derived from the method, so the two can never disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub category: Category,
    pub method: ClassificationMethod,
}

impl ClassificationResult {
    pub fn new(category: Category, method: ClassificationMethod) -> Self {
        Self { category, method }
    }

    pub fn confidence(&self) -> f64 {
        self.method.confidence()
    }
}

/// Applies the fallback chain against a registry.
pub struct Classifier<'a> {
    registry: &'a CategoryRegistry,
    backend: Option<&'a dyn AnalyzerBackend>,
    category_keys: Vec<&'a str>,
    category_descriptions: String,
}

impl<'a> Classifier<'a> {
    /// Creates a classifier. Passing no backend disables the AI tier.
    pub fn new(registry: &'a CategoryRegistry, backend: Option<&'a dyn AnalyzerBackend>) -> Self {
        Self {
            registry,
            backend,
            category_keys: registry.keys(),
            category_descriptions: registry.describe(),
        }
    }

    /// Classifies one file. Never fails.
    pub fn classify(&self, record: &FileRecord) -> ClassificationResult {
        if let (Some(backend), Some(text)) = (self.backend, record.text()) {
            match self.classify_with_backend(backend, record, text) {
                Ok(category) => {
                    return ClassificationResult::new(category.clone(), ClassificationMethod::Ai);
                }
                Err(e) => log::debug!("{}: {}, falling back to rules", record.name, e),
            }
        }

        if let Some(category) = self.registry.lookup_by_extension(&record.extension) {
            return ClassificationResult::new(category.clone(), ClassificationMethod::Extension);
        }

        let by_keyword = self
            .registry
            .lookup_by_keyword(&record.name)
            .or_else(|| record.text().and_then(|t| self.registry.lookup_by_keyword(t)));
        if let Some(category) = by_keyword {
            return ClassificationResult::new(category.clone(), ClassificationMethod::Keyword);
        }

        ClassificationResult::new(
            self.registry.fallback_category().clone(),
            ClassificationMethod::Fallback,
        )
    }

    fn classify_with_backend(
        &self,
        backend: &dyn AnalyzerBackend,
        record: &FileRecord,
        text: &str,
    ) -> Result<&'a Category, AnalyzerError> {
        let request = AnalysisRequest {
            text_snippet: text,
            known_categories: &self.category_keys,
            file_name: &record.name,
            extension: &record.extension,
            mime_type: record.mime_type.as_deref(),
            size_bytes: record.size_bytes,
            category_descriptions: &self.category_descriptions,
        };
        let label = backend.classify(&request)?;
        self.resolve_label(&label)
            .ok_or(AnalyzerError::UnknownLabel(label))
    }

    /// Maps a backend label onto a registry category.
    ///
    /// Exact key or name matches win. Otherwise the first category, in
    /// registry order, whose key contains or is contained in the label.
    fn resolve_label(&self, label: &str) -> Option<&'a Category> {
        if let Some(category) = self.registry.lookup_by_name(label) {
            return Some(category);
        }
        let label = label.trim().to_lowercase();
        if label.is_empty() {
            return None;
        }
        self.registry
            .all_categories()
            .iter()
            .find(|c| label.contains(c.key.as_str()) || c.key.contains(label.as_str()))
    }
}
