use crate::error::{Error, Result};
use log::{debug, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions of source files the scanner collects.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mts", "cts", "mjs", "cjs"];

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules", "dist", "build", "coverage"];

/// File scanner resolving command-line patterns to source files.
///
/// Each pattern is either a directory, walked recursively, a single file, or a glob
/// (`src/**/*.ts`). Dependency and build directories (`node_modules`, `dist`, ...), hidden
/// directories and declaration files (`.d.ts`) are skipped.
///
/// # Example
///
/// ```no_run
/// use hono_openapi_from_source::scanner::FileScanner;
///
/// let scanner = FileScanner::new(vec!["src/**/*.ts".to_string()]);
/// let result = scanner.scan().unwrap();
/// println!("Found {} source files", result.files.len());
/// ```
pub struct FileScanner {
    patterns: Vec<String>,
    absolute: bool,
}

/// Result of a scan.
///
/// Contains the discovered files and any warnings encountered during scanning.
pub struct ScanResult {
    /// Discovered source files, in pattern order, each listed once
    pub files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns,
            absolute: false,
        }
    }

    /// Report canonical absolute paths instead of paths as matched.
    pub fn with_absolute_paths(mut self, absolute: bool) -> Self {
        self.absolute = absolute;
        self
    }

    /// Resolves every pattern and collects the matching source files.
    ///
    /// Inaccessible entries are logged and added to the warnings, but scanning continues.
    ///
    /// # Errors
    ///
    /// Returns an error if a glob pattern is malformed or if nothing matched at all.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut files = Vec::new();
        let mut warnings = Vec::new();

        for pattern in &self.patterns {
            let path = Path::new(pattern);
            if path.is_dir() {
                debug!("Walking directory: {}", pattern);
                Self::walk_directory(path, &mut files, &mut warnings);
            } else if path.is_file() {
                if is_source_file(path) {
                    files.push(path.to_path_buf());
                }
            } else {
                debug!("Expanding glob: {}", pattern);
                let base = glob_base(pattern);
                for entry in glob::glob(pattern)? {
                    match entry {
                        Ok(path)
                            if path.is_file()
                                && is_source_file(&path)
                                && !is_skipped(&base, &path) =>
                        {
                            files.push(path)
                        }
                        Ok(_) => {}
                        Err(e) => {
                            let warning = format!("Failed to access path: {}", e);
                            warn!("{}", warning);
                            warnings.push(warning);
                        }
                    }
                }
            }
        }

        let files = self.finish(files, &mut warnings);
        if files.is_empty() {
            return Err(Error::NoFilesMatched(self.patterns.clone()));
        }
        Ok(ScanResult { files, warnings })
    }

    fn walk_directory(root: &Path, files: &mut Vec<PathBuf>, warnings: &mut Vec<String>) {
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                // Don't filter the root directory itself
                if e.depth() == 0 {
                    return true;
                }
                !(e.file_type().is_dir() && is_skipped_dir(&e.file_name().to_string_lossy()))
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_file() && is_source_file(path) {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }
    }

    /// Applies the absolute-path option and drops repeated files, keeping the first.
    fn finish(&self, files: Vec<PathBuf>, warnings: &mut Vec<String>) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for file in files {
            let file = if self.absolute {
                match file.canonicalize() {
                    Ok(absolute) => absolute,
                    Err(e) => {
                        let warning = format!("Failed to resolve {}: {}", file.display(), e);
                        warn!("{}", warning);
                        warnings.push(warning);
                        continue;
                    }
                }
            } else {
                file
            };
            if seen.insert(file.clone()) {
                result.push(file);
            }
        }
        result
    }
}

/// Whether `path` has a source extension and is not a declaration file.
pub fn is_source_file(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e))
}

fn is_skipped_dir(name: &str) -> bool {
    (name.starts_with('.') && name != "." && name != "..") || SKIPPED_DIRS.contains(&name)
}

/// Literal directory prefix of a glob pattern (`src/routes` for `src/routes/**/*.ts`).
fn glob_base(pattern: &str) -> PathBuf {
    Path::new(pattern)
        .components()
        .take_while(|c| {
            !c.as_os_str()
                .to_string_lossy()
                .contains(['*', '?', '[', '{'])
        })
        .collect()
}

/// Whether a globbed path runs through a skipped directory below the pattern's literal prefix.
fn is_skipped(base: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative.parent().is_some_and(|parent| {
        parent
            .components()
            .any(|c| is_skipped_dir(&c.as_os_str().to_string_lossy()))
    })
}
