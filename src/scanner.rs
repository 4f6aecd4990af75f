use std::path::{Path, PathBuf};

use log::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::{ParserError, Result};

/// Which files under a source root are read.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory names skipped wherever they appear
    pub exclude_dirs: Vec<String>,
    pub include_test_files: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exclude_dirs: vec!["vendor".to_string(), "testdata".to_string()],
            include_test_files: true,
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map_or(false, |name| name.starts_with('.') || name.starts_with('_'))
}

/// Collects `.go` files under `root` in a stable, sorted order.
pub fn collect_go_files(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ParserError::IOError {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let excluded = |entry: &DirEntry| {
        entry.file_type().is_dir()
            && entry.depth() > 0
            && entry
                .file_name()
                .to_str()
                .map_or(false, |name| options.exclude_dirs.iter().any(|ex| ex == name))
    };

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e) && !excluded(e))
    {
        let entry = entry.map_err(|err| ParserError::IOError {
            path: err.path().unwrap_or(root).to_path_buf(),
            source: err
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk error")),
        })?;
        let path = entry.path();

        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "go") {
            continue;
        }
        if !options.include_test_files
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.ends_with("_test.go"))
        {
            debug!("Skipping test file: {:?}", path);
            continue;
        }

        debug!("Found Go file: {:?}", path);
        files.push(path.to_path_buf());
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "package x\n").unwrap();
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_collects_sorted_go_files_and_skips_excluded_dirs() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(root, "main.go");
        touch(root, "api/users.go");
        touch(root, "api/users_test.go");
        touch(root, "api/README.md");
        touch(root, "vendor/lib/lib.go");
        touch(root, ".git/hooks/x.go");
        touch(root, "internal/testdata/fixture.go");

        let files = collect_go_files(root, &ScanOptions::default()).unwrap();
        assert_eq!(
            relative(root, &files),
            vec!["api/users.go", "api/users_test.go", "main.go"]
        );
    }

    #[test]
    fn test_test_files_can_be_excluded() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.go");
        touch(dir.path(), "a_test.go");

        let options = ScanOptions {
            include_test_files: false,
            ..Default::default()
        };
        let files = collect_go_files(dir.path(), &options).unwrap();
        assert_eq!(relative(dir.path(), &files), vec!["a.go"]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let err = collect_go_files(&dir.path().join("nope"), &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, ParserError::IOError { .. }));
    }
}
