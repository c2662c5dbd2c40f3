use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Source of file content, keyed by project-relative path.
pub trait FileProvider: Send + Sync {
    fn read(&self, path: &str) -> io::Result<String>;

    fn exists(&self, path: &str) -> bool;

    /// Directory relative paths resolve against, for providers backed by disk.
    fn root(&self) -> Option<&Path> {
        None
    }
}

/// Reads from disk below a project root. Invalid UTF-8 is replaced, not rejected.
#[derive(Debug, Clone)]
pub struct FsProvider {
    root: PathBuf,
}

impl FsProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::fs::canonicalize(&root).unwrap_or(root);
        Self { root }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl FileProvider for FsProvider {
    fn read(&self, path: &str) -> io::Result<String> {
        let bytes = std::fs::read(self.resolve(path))?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

/// In-memory files, for hosts that keep unsaved buffers and for tests.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    files: RwLock<HashMap<String, String>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let provider = Self::new();
        for (path, content) in files {
            provider.insert(path, content);
        }
        provider
    }

    pub fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        self.files.write().insert(path.into(), content.into());
    }

    pub fn remove(&self, path: &str) -> Option<String> {
        self.files.write().remove(path)
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.read().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl FileProvider for MemoryProvider {
    fn read(&self, path: &str) -> io::Result<String> {
        self.files.read().get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{path} is not in memory"))
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }
}
