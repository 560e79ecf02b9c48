//! Where documents come from. The agent only sees this trait; the vault on
//! disk is one implementation.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use docsync_core::content::normalize_path;
use docsync_core::errors::SourceError;

/// Current content of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Normalized, source-relative path.
    pub path: String,
    pub title: Option<String>,
    pub content: String,
    /// Modification time in epoch milliseconds.
    pub change_token: i64,
    pub modified_at: DateTime<Utc>,
}

/// A document found by enumeration, without its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: String,
    pub change_token: i64,
}

pub trait DocumentSource: Send + Sync {
    /// Read a document. `Ok(None)` means it no longer exists.
    fn read(&self, path: &str) -> Result<Option<SourceDocument>, SourceError>;

    /// Change token of a document without reading it. `Ok(None)` when gone.
    fn change_token(&self, path: &str) -> Result<Option<i64>, SourceError>;

    /// Enumerate every document. Scope filtering is the caller's job.
    fn list(&self) -> Result<Vec<ScannedFile>, SourceError>;
}

/// A vault: a directory tree of text files.
#[derive(Debug, Clone)]
pub struct VaultSource {
    root: PathBuf,
}

impl VaultSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(normalize_path(path))
    }
}

fn to_millis(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_millis()
}

pub(crate) fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

fn read_failed(path: &str, e: impl std::fmt::Display) -> SourceError {
    SourceError::ReadFailed {
        path: path.to_string(),
        reason: e.to_string(),
    }
}

impl DocumentSource for VaultSource {
    fn read(&self, path: &str) -> Result<Option<SourceDocument>, SourceError> {
        let full = self.resolve(path);
        let metadata = match std::fs::metadata(&full) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(read_failed(path, e)),
        };
        let content = match std::fs::read_to_string(&full) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(read_failed(path, e)),
        };
        let change_token = metadata.modified().map(to_millis).map_err(|e| read_failed(path, e))?;
        let title = full
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());

        Ok(Some(SourceDocument {
            path: normalize_path(path),
            title,
            content,
            change_token,
            modified_at: millis_to_datetime(change_token),
        }))
    }

    fn change_token(&self, path: &str) -> Result<Option<i64>, SourceError> {
        match std::fs::metadata(self.resolve(path)) {
            Ok(m) if m.is_file() => m
                .modified()
                .map(|t| Some(to_millis(t)))
                .map_err(|e| read_failed(path, e)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(read_failed(path, e)),
        }
    }

    fn list(&self) -> Result<Vec<ScannedFile>, SourceError> {
        let scan_failed = |reason: String| SourceError::ScanFailed {
            root: self.root.display().to_string(),
            reason,
        };
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| scan_failed(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| scan_failed(e.to_string()))?;
            let modified = entry
                .metadata()
                .map_err(|e| scan_failed(e.to_string()))?
                .modified()
                .map_err(|e| scan_failed(e.to_string()))?;
            files.push(ScannedFile {
                path: normalize_path(&relative.to_string_lossy()),
                change_token: to_millis(modified),
            });
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_nested_files_with_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("notes/daily")).unwrap();
        std::fs::write(dir.path().join("root.md"), "r").unwrap();
        std::fs::write(dir.path().join("notes/daily/today.md"), "t").unwrap();

        let source = VaultSource::new(dir.path());
        let paths: Vec<String> = source.list().unwrap().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec!["notes/daily/today.md", "root.md"]);
    }

    #[test]
    fn read_returns_title_and_token() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Plan.md"), "# Plan").unwrap();

        let source = VaultSource::new(dir.path());
        let doc = source.read("./Plan.md").unwrap().unwrap();
        assert_eq!(doc.path, "Plan.md");
        assert_eq!(doc.title.as_deref(), Some("Plan"));
        assert_eq!(doc.content, "# Plan");
        assert_eq!(Some(doc.change_token), source.change_token("Plan.md").unwrap());
        assert_eq!(doc.modified_at.timestamp_millis(), doc.change_token);
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let source = VaultSource::new(dir.path());
        assert!(source.read("gone.md").unwrap().is_none());
        assert!(source.change_token("gone.md").unwrap().is_none());
    }
}
