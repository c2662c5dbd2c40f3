//! Source discovery for bulk scans.
//!
//! Walks a checkout with the `ignore` crate so `.gitignore`/`.ignore` rules apply even
//! outside a git repository, and keeps only files the registry can parse.

use crate::indexer::registry::LanguageRegistry;
use crate::util;
use ignore::{DirEntry, WalkBuilder};
use std::path::{Path, PathBuf};

/// A parseable file found under the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub language: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Index files even when ignore files exclude them.
    pub include_ignored: bool,
    /// Directory names skipped on top of [`DEFAULT_SKIPPED_DIRS`].
    pub extra_skipped_dirs: Vec<String>,
}

/// Dependency caches, virtualenvs, build output and VCS metadata.
pub const DEFAULT_SKIPPED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    ".tox",
    "venv",
    ".venv",
    "env",
    "node_modules",
    "bower_components",
    "target",
    "vendor",
    "dist",
    "build",
    ".next",
    ".idea",
    ".vscode",
];

impl ScanOptions {
    fn skips(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_dir()) {
            return false;
        }
        let Some(name) = entry.file_name().to_str() else {
            return false;
        };
        DEFAULT_SKIPPED_DIRS.contains(&name) || self.extra_skipped_dirs.iter().any(|dir| dir == name)
    }
}

/// Parseable files under `root`, ordered by relative path.
pub fn discover_sources(root: &Path, registry: &LanguageRegistry, options: &ScanOptions) -> Vec<SourceFile> {
    let respect = !options.include_ignored;
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(respect)
        .git_ignore(respect)
        .git_exclude(respect)
        .git_global(respect)
        .parents(respect)
        .require_git(false)
        .filter_entry({
            let options = options.clone();
            move |entry| !options.skips(entry)
        })
        .build();

    let mut sources: Vec<SourceFile> = walker
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter_map(|entry| {
            let rel_path = util::normalize_rel_path(root, entry.path());
            let language = registry.detect(&rel_path)?;
            Some(SourceFile {
                rel_path,
                abs_path: entry.into_path(),
                language: language.to_string(),
            })
        })
        .collect();
    sources.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    tracing::debug!(root = %root.display(), sources = sources.len(), "discovered sources");
    sources
}
