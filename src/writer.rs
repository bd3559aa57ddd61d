//! Output directory handling for records and probe artifacts.

use crate::error::{FresnelError, Result};
use std::path::{Path, PathBuf};

const FORBIDDEN: &[char] = &['/', '?', '<', '>', '\\', ':', '*', '|', '"'];

/// Reject names that are unusable as a single path segment.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().all(|c| c == '.') || name.contains(FORBIDDEN) {
        return Err(FresnelError::validation(
            "file name",
            format!("Invalid file name: \"{}\"", name),
        ));
    }
    Ok(())
}

/// A directory plus a prefix for files and subdirectories created in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Writer {
    dir: PathBuf,
    prefix: String,
}

impl Writer {
    /// Open a directory, creating it when missing. Its parent must exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_prefix(dir.into(), String::new())
    }

    fn with_prefix(dir: PathBuf, prefix: String) -> Result<Self> {
        if !dir.is_dir() {
            std::fs::create_dir(&dir).map_err(|e| FresnelError::io(&dir, e))?;
        }
        Ok(Self { dir, prefix })
    }

    #[allow(dead_code)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a file in this directory, with the prefix applied.
    pub fn get_path(&self, name: &str) -> Result<PathBuf> {
        let segment = format!("{}{}", self.prefix, name);
        validate_name(&segment)?;
        Ok(self.dir.join(segment))
    }

    /// Same directory, with `prefix` appended to the current prefix.
    pub fn prefix(&self, prefix: &str) -> Result<Self> {
        Self::with_prefix(self.dir.clone(), format!("{}{}", self.prefix, prefix))
    }

    /// Writer for a subdirectory (named with the current prefix).
    pub fn child(&self, name: &str) -> Result<Self> {
        Self::with_prefix(self.get_path(name)?, String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_path() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = Writer::new(tmp.path()).unwrap();

        assert_eq!(writer.get_path("a.json").unwrap(), tmp.path().join("a.json"));
        assert!(writer.get_path("").is_err());
        assert!(writer.get_path(".").is_err());
        assert!(writer.get_path("..").is_err());
        assert!(writer.get_path("a/b").is_err());
        assert!(writer.get_path("a\\b").is_err());
        assert!(writer.get_path("c:").is_err());
        assert!(writer.get_path(".hidden").is_ok());
    }

    #[test]
    fn test_prefix_accumulates() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = Writer::new(tmp.path()).unwrap().prefix("x--").unwrap();
        let nested = writer.prefix("y-").unwrap();

        assert_eq!(
            nested.get_path("image.png").unwrap(),
            tmp.path().join("x--y-image.png")
        );
        assert_eq!(nested.dir(), tmp.path());
    }

    #[test]
    fn test_child_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = Writer::new(tmp.path().join("out")).unwrap();
        let child = writer.child("default").unwrap();

        assert!(tmp.path().join("out").join("default").is_dir());
        assert_eq!(
            child.get_path("record.json").unwrap(),
            tmp.path().join("out").join("default").join("record.json")
        );

        // Existing directories are reused.
        assert!(writer.child("default").is_ok());
    }

    #[test]
    fn test_missing_parent_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Writer::new(tmp.path().join("a").join("b")).unwrap_err();
        assert!(matches!(err, FresnelError::Io { .. }));
    }
}
