/// Category registry for classifying files.
///
/// This module holds the fixed table of categories a file can be organized
/// into. Each category carries a destination subpath, the extensions it
/// claims and the keywords it reacts to. Registry order is the tie-break
/// priority: the first matching category wins.
///
/// # Examples
///
/// ```
/// use organize::file_category::CategoryRegistry;
///
/// let registry = CategoryRegistry::default();
/// assert_eq!(registry.lookup_by_extension(".pdf").unwrap().name, "PDFs");
/// assert_eq!(registry.lookup_by_extension("PY").unwrap().path, "Code/Python");
/// assert_eq!(registry.fallback_category().key, "misc");
/// ```
use std::collections::BTreeSet;

/// Key of the sentinel category that always matches.
pub const FALLBACK_KEY: &str = "misc";

/// A named classification target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Short unique key, also the label the analyzer backend answers with.
    pub key: String,
    /// Human-readable name.
    pub name: String,
    /// Destination subpath relative to the output root, slash separated.
    pub path: String,
    /// One-line description used in listings and prompts.
    pub description: String,
    /// Lowercased extensions with a leading dot.
    pub extensions: BTreeSet<String>,
    /// Lowercased keywords matched against file names and text.
    pub keywords: BTreeSet<String>,
}

impl Category {
    /// Creates a category, normalizing extensions and keywords.
    pub fn new(
        key: &str,
        name: &str,
        path: &str,
        description: &str,
        extensions: &[&str],
        keywords: &[&str],
    ) -> Self {
        Self {
            key: key.to_lowercase(),
            name: name.to_string(),
            path: path.trim_matches('/').to_string(),
            description: description.to_string(),
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Returns true if this is the catch-all category.
    pub fn is_fallback(&self) -> bool {
        self.key == FALLBACK_KEY
    }

    fn fallback() -> Self {
        Self::new(
            FALLBACK_KEY,
            "Miscellaneous",
            "Misc",
            "Uncategorized files",
            &[],
            &[],
        )
    }
}

/// Lowercases an extension and ensures it has a leading dot.
pub fn normalize_extension(ext: &str) -> String {
    let lower = ext.trim().to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

/// Ordered, immutable table of categories.
///
/// The sentinel "Miscellaneous" category is always present and always last.
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    categories: Vec<Category>,
}

impl CategoryRegistry {
    /// Builds a registry from the given categories, in priority order.
    ///
    /// A fallback category is appended if none is supplied; a supplied one
    /// is moved to the end.
    pub fn new(categories: Vec<Category>) -> Self {
        let (mut categories, fallback): (Vec<_>, Vec<_>) =
            categories.into_iter().partition(|c| !c.is_fallback());
        categories.push(fallback.into_iter().next().unwrap_or_else(Category::fallback));
        Self { categories }
    }

    /// Builds the standard category table.
    pub fn builtin() -> Self {
        Self::new(vec![
            Category::new(
                "work",
                "Work Documents",
                "Documents/Work",
                "Work-related documents, reports, presentations",
                &[".doc", ".docx", ".ppt", ".pptx", ".xls", ".xlsx", ".odt", ".ods", ".odp"],
                &["report", "meeting", "project", "proposal", "invoice", "contract", "agenda", "memo"],
            ),
            Category::new(
                "personal",
                "Personal Documents",
                "Documents/Personal",
                "Personal documents, letters, notes",
                &[],
                &["personal", "diary", "journal", "letter", "note", "todo", "list"],
            ),
            Category::new(
                "financial",
                "Financial Documents",
                "Documents/Financial",
                "Financial records, receipts, tax documents",
                &[],
                &["tax", "receipt", "invoice", "bank", "statement", "budget", "expense", "payment", "salary"],
            ),
            Category::new(
                "legal",
                "Legal Documents",
                "Documents/Legal",
                "Legal documents, contracts, agreements",
                &[],
                &["legal", "contract", "agreement", "license", "terms", "policy", "nda", "court", "law"],
            ),
            Category::new(
                "ebooks",
                "eBooks",
                "Documents/eBooks",
                "Electronic books and publications",
                &[".epub", ".mobi", ".azw", ".azw3"],
                &["ebook", "book", "novel", "guide", "manual"],
            ),
            Category::new("pdf", "PDFs", "Documents/PDFs", "PDF documents", &[".pdf"], &[]),
            Category::new(
                "python",
                "Python Code",
                "Code/Python",
                "Python source files",
                &[".py", ".pyw", ".pyx", ".pxd", ".pyi"],
                &[],
            ),
            Category::new(
                "javascript",
                "JavaScript Code",
                "Code/JavaScript",
                "JavaScript and TypeScript files",
                &[".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs"],
                &[],
            ),
            Category::new(
                "web",
                "Web Files",
                "Code/Web",
                "HTML, CSS, and web assets",
                &[".html", ".htm", ".css", ".scss", ".sass", ".less", ".svg"],
                &[],
            ),
            Category::new(
                "code_other",
                "Other Code",
                "Code/Other",
                "Other programming languages",
                &[
                    ".java", ".c", ".cpp", ".h", ".hpp", ".cs", ".go", ".rs", ".rb", ".php",
                    ".swift", ".kt", ".scala", ".r", ".m", ".mm", ".sql", ".sh", ".bash", ".zsh",
                    ".ps1", ".bat", ".cmd",
                ],
                &[],
            ),
            Category::new(
                "config",
                "Config Files",
                "Code/Config",
                "Configuration and settings files",
                &[
                    ".json", ".yaml", ".yml", ".toml", ".ini", ".cfg", ".conf", ".env",
                    ".properties", ".xml",
                ],
                &["config", "settings", "preferences"],
            ),
            Category::new(
                "photos",
                "Photos",
                "Media/Photos",
                "Image files and photographs",
                &[
                    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".heic", ".heif", ".raw",
                    ".cr2", ".nef", ".arw",
                ],
                &["photo", "image", "picture", "screenshot", "img", "pic"],
            ),
            Category::new(
                "videos",
                "Videos",
                "Media/Videos",
                "Video files",
                &[
                    ".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", ".m4v", ".mpeg",
                    ".mpg", ".3gp",
                ],
                &["video", "movie", "clip", "recording"],
            ),
            Category::new(
                "music",
                "Music",
                "Media/Music",
                "Audio and music files",
                &[".mp3", ".wav", ".flac", ".aac", ".ogg", ".wma", ".m4a", ".aiff", ".alac"],
                &["music", "song", "audio", "track", "podcast"],
            ),
            Category::new(
                "graphics",
                "Graphics",
                "Media/Graphics",
                "Design and graphics files",
                &[
                    ".psd", ".ai", ".eps", ".indd", ".sketch", ".fig", ".xd", ".afdesign",
                    ".afphoto",
                ],
                &["design", "graphic", "logo", "icon", "banner"],
            ),
            Category::new(
                "archives",
                "Archives",
                "Archives",
                "Compressed files and archives",
                &[
                    ".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz", ".tgz", ".tbz2",
                    ".tar.gz", ".tar.bz2", ".tar.xz",
                ],
                &["backup", "archive"],
            ),
            Category::new(
                "data",
                "Data Files",
                "Data",
                "Data files, spreadsheets, databases",
                &[".csv", ".tsv", ".parquet", ".sqlite", ".db", ".mdb", ".accdb"],
                &["data", "dataset", "export", "import"],
            ),
            Category::new(
                "installers",
                "Installers",
                "Applications/Installers",
                "Application installers and packages",
                &[".dmg", ".pkg", ".msi", ".exe", ".deb", ".rpm", ".appimage", ".snap"],
                &["install", "setup", "installer"],
            ),
            Category::fallback(),
        ])
    }

    /// Returns every category in priority order, fallback last.
    pub fn all_categories(&self) -> &[Category] {
        &self.categories
    }

    /// Returns the category keys in priority order.
    pub fn keys(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.key.as_str()).collect()
    }

    /// Finds the first category claiming an extension.
    ///
    /// Case-insensitive, leading dot optional. A compound extension such as
    /// `.tar.gz` that no category claims falls back to its last component.
    pub fn lookup_by_extension(&self, ext: &str) -> Option<&Category> {
        if ext.trim().trim_start_matches('.').is_empty() {
            return None;
        }
        let ext = normalize_extension(ext);
        if let Some(category) = self.categories.iter().find(|c| c.extensions.contains(&ext)) {
            return Some(category);
        }

        let last = ext.rfind('.').filter(|&i| i > 0)?;
        self.lookup_by_extension(&ext[last..])
    }

    /// Finds the first category with a keyword occurring in `text`.
    ///
    /// Matching is a case-insensitive substring test. Categories are scanned
    /// in registry order and keywords within a category in sorted order.
    pub fn lookup_by_keyword(&self, text: &str) -> Option<&Category> {
        if text.is_empty() {
            return None;
        }
        let haystack = text.to_lowercase();
        self.categories
            .iter()
            .find(|c| c.keywords.iter().any(|k| haystack.contains(k.as_str())))
    }

    /// Finds a category by key or display name, case-insensitively.
    pub fn lookup_by_name(&self, name: &str) -> Option<&Category> {
        let name = name.trim();
        self.categories
            .iter()
            .find(|c| c.key.eq_ignore_ascii_case(name) || c.name.eq_ignore_ascii_case(name))
    }

    /// Returns the catch-all category.
    pub fn fallback_category(&self) -> &Category {
        // `new` guarantees the fallback is last
        &self.categories[self.categories.len() - 1]
    }

    /// Renders `- key: description (path: ...)` lines for prompting.
    pub fn describe(&self) -> String {
        self.categories
            .iter()
            .map(|c| format!("- {}: {} (path: {})", c.key, c.description, c.path))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_last_and_unique() {
        let registry = CategoryRegistry::default();
        let all = registry.all_categories();
        assert!(all.last().unwrap().is_fallback());
        assert_eq!(all.iter().filter(|c| c.is_fallback()).count(), 1);
        assert_eq!(registry.fallback_category().name, "Miscellaneous");
    }

    #[test]
    fn test_custom_registry_gets_fallback() {
        let registry = CategoryRegistry::new(vec![Category::new(
            "financial",
            "Financial",
            "Documents/Financial/",
            "Money",
            &[],
            &["Invoice"],
        )]);
        assert_eq!(registry.all_categories().len(), 2);
        assert_eq!(registry.fallback_category().key, FALLBACK_KEY);
        assert_eq!(registry.all_categories()[0].path, "Documents/Financial");
    }

    #[test]
    fn test_supplied_fallback_moved_to_end() {
        let registry = CategoryRegistry::new(vec![
            Category::new(FALLBACK_KEY, "Other", "Other", "Everything else", &[], &[]),
            Category::new("pdf", "PDFs", "Documents/PDFs", "PDF", &["pdf"], &[]),
        ]);
        assert_eq!(registry.keys(), vec!["pdf", FALLBACK_KEY]);
        assert_eq!(registry.fallback_category().path, "Other");
    }

    #[test]
    fn test_lookup_by_extension() {
        let registry = CategoryRegistry::default();
        assert_eq!(registry.lookup_by_extension(".pdf").unwrap().key, "pdf");
        assert_eq!(registry.lookup_by_extension("JPG").unwrap().key, "photos");
        assert_eq!(registry.lookup_by_extension(".rs").unwrap().key, "code_other");
        assert!(registry.lookup_by_extension(".unknownext").is_none());
        assert!(registry.lookup_by_extension("").is_none());
    }

    #[test]
    fn test_lookup_by_compound_extension() {
        let registry = CategoryRegistry::default();
        assert_eq!(registry.lookup_by_extension(".tar.gz").unwrap().key, "archives");

        let custom = CategoryRegistry::new(vec![Category::new(
            "gz",
            "Gzip",
            "Gzip",
            "Gzip streams",
            &[".gz"],
            &[],
        )]);
        assert_eq!(custom.lookup_by_extension(".tar.gz").unwrap().key, "gz");
    }

    #[test]
    fn test_lookup_by_keyword_registry_order() {
        let registry = CategoryRegistry::default();
        // "invoice" is claimed by both work and financial; work comes first
        assert_eq!(registry.lookup_by_keyword("Invoice_March").unwrap().key, "work");
        assert_eq!(registry.lookup_by_keyword("bank-2024").unwrap().key, "financial");
        assert_eq!(registry.lookup_by_keyword("Screenshot 1").unwrap().key, "photos");
        assert!(registry.lookup_by_keyword("qqq").is_none());
        assert!(registry.lookup_by_keyword("").is_none());
    }

    #[test]
    fn test_lookup_by_name() {
        let registry = CategoryRegistry::default();
        assert_eq!(registry.lookup_by_name("PDF").unwrap().key, "pdf");
        assert_eq!(registry.lookup_by_name("Music").unwrap().key, "music");
        assert_eq!(registry.lookup_by_name(" work documents ").unwrap().key, "work");
        assert!(registry.lookup_by_name("nonsense").is_none());
    }

    #[test]
    fn test_describe_lists_every_category() {
        let registry = CategoryRegistry::default();
        let text = registry.describe();
        assert_eq!(text.lines().count(), registry.all_categories().len());
        assert!(text.contains("- pdf: PDF documents (path: Documents/PDFs)"));
    }
}
