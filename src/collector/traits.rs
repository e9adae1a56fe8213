//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait lets procfs collectors read the real `/proc` on
//! Linux and an in-memory `MockFs` in tests or on other platforms.

use std::io;
use std::path::Path;

/// Abstraction for the filesystem reads a collector performs.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    ///
    /// # Arguments
    /// * `path` - Path to the file to read
    ///
    /// # Returns
    /// The file contents as a string, or an I/O error if the file cannot be read.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_real_fs_read_to_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loadavg");
        fs::write(&path, "0.15 0.10 0.05 1/150 1234\n").unwrap();

        let rfs = RealFs::new();
        let content = rfs.read_to_string(&path).unwrap();
        assert!(content.starts_with("0.15"));
    }

    #[test]
    fn test_real_fs_exists() {
        let dir = tempfile::tempdir().unwrap();
        let rfs = RealFs::new();
        assert!(rfs.exists(dir.path()));
        assert!(!rfs.exists(&dir.path().join("missing")));
    }

    #[test]
    fn test_real_fs_missing_file() {
        let rfs = RealFs::new();
        let err = rfs
            .read_to_string(Path::new("/nonexistent/path/12345"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
