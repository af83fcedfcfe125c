/// Integration tests for organize
///
/// These tests drive the command-line entry point against real temporary
/// directory trees and check the resulting filesystem state and exit codes.
///
/// Test categories:
/// 1. Basic organization workflows
/// 2. Dry-run mode verification
/// 3. Undo round trips and partial undo
/// 4. Collisions and recursion
/// 5. Configuration and filtering
/// 6. Fatal errors and exit codes
use clap::Parser;
use organize::cli::{Cli, EXIT_FATAL, EXIT_PARTIAL_FAILURE, EXIT_SUCCESS, run_cli};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary workspace with a `src/` tree to organize and a private
/// configuration file, so no user configuration leaks into the tests.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("src")).expect("Failed to create source dir");
        fs::write(temp_dir.path().join("config.toml"), "").expect("Failed to write config");
        TestFixture { temp_dir }
    }

    fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    fn source(&self) -> PathBuf {
        self.root().join("src")
    }

    /// Default output root for the source.
    fn organized(&self) -> PathBuf {
        self.source().join("Organized")
    }

    fn write_config(&self, content: &str) {
        fs::write(self.root().join("config.toml"), content).expect("Failed to write config");
    }

    /// Create a file (and its parent directories) under `src/`.
    fn create_file(&self, rel_path: &str, content: &str) {
        let path = self.source().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write file content");
    }

    /// Run the CLI in fast mode against `src/` with extra arguments.
    fn run(&self, extra: &[&str]) -> i32 {
        let source = self.source();
        let config = self.root().join("config.toml");
        let mut args = vec![
            "organize".to_string(),
            source.display().to_string(),
            "--fast".to_string(),
            "--config".to_string(),
            config.display().to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        let cli = Cli::try_parse_from(args).expect("Failed to parse arguments");
        run_cli(&cli)
    }

    fn undo(&self) -> i32 {
        self.run(&["--undo"])
    }

    fn undo_logs(&self, output: &Path) -> Vec<PathBuf> {
        let dir = output.join(".organize_undo");
        if !dir.exists() {
            return Vec::new();
        }
        let mut logs: Vec<PathBuf> = fs::read_dir(dir)
            .expect("Failed to read undo directory")
            .flatten()
            .map(|e| e.path())
            .collect();
        logs.sort();
        logs
    }

    fn assert_file_exists(&self, path: &Path) {
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    fn assert_file_not_exists(&self, path: &Path) {
        assert!(!path.exists(), "File should not exist: {}", path.display());
    }
}

// ============================================================================
// 1. Basic organization workflows
// ============================================================================

#[test]
fn test_organize_by_extension() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "%PDF-1.4 fake");
    fixture.create_file("song.mp3", "ID3");
    fixture.create_file("photo.jpg", "jpeg bytes");
    fixture.create_file("bundle.tar.gz", "gz bytes");

    assert_eq!(fixture.run(&[]), EXIT_SUCCESS);

    let out = fixture.organized();
    fixture.assert_file_exists(&out.join("Documents/PDFs/report.pdf"));
    fixture.assert_file_exists(&out.join("Media/Music/song.mp3"));
    fixture.assert_file_exists(&out.join("Media/Photos/photo.jpg"));
    fixture.assert_file_exists(&out.join("Archives/bundle.tar.gz"));
    fixture.assert_file_not_exists(&fixture.source().join("report.pdf"));

    let logs = fixture.undo_logs(&out);
    assert_eq!(logs.len(), 1);
    let log = fs::read_to_string(&logs[0]).unwrap();
    assert_eq!(log.lines().count(), 4);
    assert!(log.ends_with('\n'));
}

#[test]
fn test_organize_by_keyword_and_fallback() {
    let fixture = TestFixture::new();
    fixture.create_file("bank_statement.txt", "nothing special");
    fixture.create_file("q3.txt", "quarterly tax figures");
    fixture.create_file("zzqx.qqq", "???");

    assert_eq!(fixture.run(&[]), EXIT_SUCCESS);

    let out = fixture.organized();
    fixture.assert_file_exists(&out.join("Documents/Financial/bank_statement.txt"));
    fixture.assert_file_exists(&out.join("Documents/Financial/q3.txt"));
    fixture.assert_file_exists(&out.join("Misc/zzqx.qqq"));
}

#[test]
fn test_custom_output_directory() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");
    let out = fixture.root().join("sorted");

    assert_eq!(
        fixture.run(&["--output", out.to_str().unwrap()]),
        EXIT_SUCCESS
    );
    fixture.assert_file_exists(&out.join("Documents/PDFs/report.pdf"));
    assert!(!fixture.organized().exists());
}

#[test]
fn test_empty_source_is_success() {
    let fixture = TestFixture::new();
    assert_eq!(fixture.run(&[]), EXIT_SUCCESS);
    assert!(!fixture.organized().exists());
}

// ============================================================================
// 2. Dry-run mode verification
// ============================================================================

#[test]
fn test_dry_run_changes_nothing() {
    let fixture = TestFixture::new();
    fixture.create_file("a.pdf", "a");
    fixture.create_file("b.zip", "b");
    fixture.create_file("c.qqq", "c");

    assert_eq!(fixture.run(&["--dry-run"]), EXIT_SUCCESS);

    for name in ["a.pdf", "b.zip", "c.qqq"] {
        fixture.assert_file_exists(&fixture.source().join(name));
    }
    assert!(!fixture.organized().exists());
}

// ============================================================================
// 3. Undo round trips and partial undo
// ============================================================================

#[test]
fn test_undo_restores_original_layout() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");
    fixture.create_file("docs/song.mp3", "mp3");
    fixture.create_file("docs/deep/zzqx.qqq", "misc");

    assert_eq!(fixture.run(&[]), EXIT_SUCCESS);
    fixture.assert_file_not_exists(&fixture.source().join("docs/deep/zzqx.qqq"));

    assert_eq!(fixture.undo(), EXIT_SUCCESS);

    assert_eq!(
        fs::read_to_string(fixture.source().join("report.pdf")).unwrap(),
        "pdf"
    );
    fixture.assert_file_exists(&fixture.source().join("docs/song.mp3"));
    fixture.assert_file_exists(&fixture.source().join("docs/deep/zzqx.qqq"));

    // log consumed, category folders cleaned up, output root kept
    let out = fixture.organized();
    assert!(fixture.undo_logs(&out).is_empty());
    assert!(out.exists());
    assert!(!out.join("Documents").exists());
    assert!(!out.join("Media").exists());
}

#[test]
fn test_partial_undo_keeps_log() {
    let fixture = TestFixture::new();
    fixture.create_file("a.pdf", "a");
    fixture.create_file("b.pdf", "b");

    assert_eq!(fixture.run(&[]), EXIT_SUCCESS);
    fixture.create_file("a.pdf", "someone else");

    assert_eq!(fixture.undo(), EXIT_PARTIAL_FAILURE);

    assert_eq!(
        fs::read_to_string(fixture.source().join("a.pdf")).unwrap(),
        "someone else"
    );
    assert_eq!(
        fs::read_to_string(fixture.source().join("b.pdf")).unwrap(),
        "b"
    );
    fixture.assert_file_exists(&fixture.organized().join("Documents/PDFs/a.pdf"));
    assert_eq!(fixture.undo_logs(&fixture.organized()).len(), 1);

    // a retry restores the unblocked entry; the already restored one is
    // no longer at its destination and is reported again
    fs::remove_file(fixture.source().join("a.pdf")).unwrap();
    assert_eq!(fixture.undo(), EXIT_PARTIAL_FAILURE);
    assert_eq!(fs::read_to_string(fixture.source().join("a.pdf")).unwrap(), "a");
    assert_eq!(fixture.undo_logs(&fixture.organized()).len(), 1);
}

#[test]
fn test_undo_without_history_is_fatal() {
    let fixture = TestFixture::new();
    assert_eq!(fixture.undo(), EXIT_FATAL);
}

#[test]
fn test_undo_corrupt_log_is_fatal() {
    let fixture = TestFixture::new();
    fixture.create_file("a.pdf", "a");
    assert_eq!(fixture.run(&[]), EXIT_SUCCESS);

    let log = fixture.undo_logs(&fixture.organized()).remove(0);
    fs::write(&log, "{ definitely not an entry }\n").unwrap();

    assert_eq!(fixture.undo(), EXIT_FATAL);
    fixture.assert_file_exists(&fixture.organized().join("Documents/PDFs/a.pdf"));
    assert!(log.exists());
}

#[test]
fn test_undo_only_reverts_latest_session() {
    let fixture = TestFixture::new();
    let out = fixture.root().join("out");
    let out_arg = out.to_str().unwrap().to_string();

    fixture.create_file("first.pdf", "1");
    assert_eq!(fixture.run(&["-o", &out_arg]), EXIT_SUCCESS);
    thread::sleep(Duration::from_millis(20));
    fixture.create_file("second.pdf", "2");
    assert_eq!(fixture.run(&["-o", &out_arg]), EXIT_SUCCESS);
    assert_eq!(fixture.undo_logs(&out).len(), 2);

    assert_eq!(fixture.run(&["--undo", "-o", &out_arg]), EXIT_SUCCESS);
    fixture.assert_file_exists(&fixture.source().join("second.pdf"));
    fixture.assert_file_not_exists(&fixture.source().join("first.pdf"));
    fixture.assert_file_exists(&out.join("Documents/PDFs/first.pdf"));
    assert_eq!(fixture.undo_logs(&out).len(), 1);
}

// ============================================================================
// 4. Collisions and recursion
// ============================================================================

#[test]
fn test_same_name_in_different_directories() {
    let fixture = TestFixture::new();
    fixture.create_file("a/report.pdf", "from a");
    fixture.create_file("b/report.pdf", "from b");

    assert_eq!(fixture.run(&[]), EXIT_SUCCESS);

    let pdfs = fixture.organized().join("Documents/PDFs");
    assert_eq!(
        fs::read_to_string(pdfs.join("report.pdf")).unwrap(),
        "from a"
    );
    assert_eq!(
        fs::read_to_string(pdfs.join("report_1.pdf")).unwrap(),
        "from b"
    );
}

#[test]
fn test_reorganize_into_existing_tree_never_overwrites() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "old");
    assert_eq!(fixture.run(&[]), EXIT_SUCCESS);

    fixture.create_file("report.pdf", "new");
    assert_eq!(fixture.run(&[]), EXIT_SUCCESS);

    let pdfs = fixture.organized().join("Documents/PDFs");
    assert_eq!(fs::read_to_string(pdfs.join("report.pdf")).unwrap(), "old");
    assert_eq!(fs::read_to_string(pdfs.join("report_1.pdf")).unwrap(), "new");
}

#[test]
fn test_no_recursive_leaves_subdirectories() {
    let fixture = TestFixture::new();
    fixture.create_file("top.pdf", "top");
    fixture.create_file("nested/deep.pdf", "deep");

    assert_eq!(fixture.run(&["--no-recursive"]), EXIT_SUCCESS);

    fixture.assert_file_exists(&fixture.organized().join("Documents/PDFs/top.pdf"));
    fixture.assert_file_exists(&fixture.source().join("nested/deep.pdf"));
}

#[test]
fn test_output_inside_source_is_not_rescanned() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");
    assert_eq!(fixture.run(&[]), EXIT_SUCCESS);

    // a second run finds nothing new to move
    assert_eq!(fixture.run(&[]), EXIT_SUCCESS);
    let pdfs = fixture.organized().join("Documents/PDFs");
    fixture.assert_file_exists(&pdfs.join("report.pdf"));
    fixture.assert_file_not_exists(&pdfs.join("report_1.pdf"));
    assert_eq!(fixture.undo_logs(&fixture.organized()).len(), 1);
}

// ============================================================================
// 5. Configuration and filtering
// ============================================================================

#[test]
fn test_hidden_and_excluded_files_stay() {
    let fixture = TestFixture::new();
    fixture.write_config(
        r#"
[filters.exclude]
patterns = ["keep/**"]
"#,
    );
    fixture.create_file(".secret.pdf", "hidden");
    fixture.create_file("keep/report.pdf", "excluded");
    fixture.create_file("debug.log", "default excluded extension");
    fixture.create_file("move.pdf", "moved");

    assert_eq!(fixture.run(&[]), EXIT_SUCCESS);

    fixture.assert_file_exists(&fixture.source().join(".secret.pdf"));
    fixture.assert_file_exists(&fixture.source().join("keep/report.pdf"));
    fixture.assert_file_exists(&fixture.source().join("debug.log"));
    fixture.assert_file_exists(&fixture.organized().join("Documents/PDFs/move.pdf"));
}

#[test]
fn test_size_ceiling_skips_large_files() {
    let fixture = TestFixture::new();
    fixture.write_config(
        r#"
[scan]
max_file_size_mb = 0
"#,
    );
    fixture.create_file("big.pdf", "more than zero bytes");

    assert_eq!(fixture.run(&[]), EXIT_SUCCESS);
    fixture.assert_file_exists(&fixture.source().join("big.pdf"));
}

#[test]
fn test_custom_output_dir_name() {
    let fixture = TestFixture::new();
    fixture.write_config(
        r#"
[output]
dir_name = "Sorted"
"#,
    );
    fixture.create_file("report.pdf", "pdf");

    assert_eq!(fixture.run(&[]), EXIT_SUCCESS);
    fixture.assert_file_exists(&fixture.source().join("Sorted/Documents/PDFs/report.pdf"));
}

// ============================================================================
// 6. Fatal errors and exit codes
// ============================================================================

#[test]
fn test_failed_move_exits_nonzero_and_logs_only_successes() {
    let fixture = TestFixture::new();
    fixture.create_file("a.pdf", "pdf");
    fixture.create_file("z.mp3", "ID3");
    // a plain file where the Documents category directory belongs
    fs::create_dir_all(fixture.organized()).unwrap();
    fs::write(fixture.organized().join("Documents"), "in the way").unwrap();

    assert_eq!(fixture.run(&[]), EXIT_PARTIAL_FAILURE);

    let out = fixture.organized();
    fixture.assert_file_exists(&fixture.source().join("a.pdf"));
    fixture.assert_file_exists(&out.join("Media/Music/z.mp3"));
    fixture.assert_file_not_exists(&fixture.source().join("z.mp3"));

    let logs = fixture.undo_logs(&out);
    assert_eq!(logs.len(), 1);
    let log = fs::read_to_string(&logs[0]).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains("z.mp3"));
    assert!(!log.contains("a.pdf"));
}

#[test]
fn test_missing_source_is_fatal() {
    let fixture = TestFixture::new();
    fs::remove_dir(fixture.source()).unwrap();
    assert_eq!(fixture.run(&[]), EXIT_FATAL);
}

#[test]
fn test_source_that_is_a_file_is_fatal() {
    let fixture = TestFixture::new();
    fs::remove_dir(fixture.source()).unwrap();
    fs::write(fixture.source(), "not a directory").unwrap();
    assert_eq!(fixture.run(&[]), EXIT_FATAL);
}

#[test]
fn test_invalid_config_is_fatal() {
    let fixture = TestFixture::new();
    fixture.write_config("[filters\nbroken");
    fixture.create_file("report.pdf", "pdf");

    assert_eq!(fixture.run(&[]), EXIT_FATAL);
    fixture.assert_file_exists(&fixture.source().join("report.pdf"));
}

#[test]
fn test_missing_config_file_is_fatal() {
    let fixture = TestFixture::new();
    fs::remove_file(fixture.root().join("config.toml")).unwrap();
    assert_eq!(fixture.run(&[]), EXIT_FATAL);
}

#[test]
fn test_no_source_is_invalid_argument() {
    let cli = Cli::try_parse_from(["organize", "--fast"]).unwrap();
    assert_eq!(run_cli(&cli), EXIT_FATAL);
}

#[test]
fn test_categories_listing() {
    let cli = Cli::try_parse_from(["organize", "--categories"]).unwrap();
    assert_eq!(run_cli(&cli), EXIT_SUCCESS);
}
