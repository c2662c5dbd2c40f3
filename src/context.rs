//! Context manager
//!
//! Owns the symbol table, per-file usages and the dependency graph behind one
//! reader-writer lock. Extraction always runs outside the lock; a write guard is only
//! held while one file (or one scanned batch) is swapped in, so readers never see a
//! half-updated file.

use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostic, DiagnosticLog};
use crate::error::{EngineError, EngineResult, ParseError};
use crate::graph::DependencyGraph;
use crate::indexer::extract::ImportCandidate;
use crate::indexer::registry::LanguageRegistry;
use crate::indexer::scan::{self, ScanOptions};
use crate::indexer::test_detection;
use crate::indexer::{FileAnalysis, LanguageTools};
use crate::model::{Symbol, SymbolKind, Usage};
use crate::provider::{FileProvider, FsProvider};
use crate::symbol_table::SymbolTable;
use crate::util;
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

const SUMMARY_NAME_LIMIT: usize = 5;
const SUMMARY_FILE_LIMIT: usize = 3;

/// What the engine knows about a file apart from its symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFile {
    pub language: String,
    pub hash: String,
    pub is_test: bool,
    /// The last analysis failed. Such a file is re-parsed even when its content is
    /// unchanged: a timeout may not repeat.
    pub failed: bool,
}

impl IndexedFile {
    /// Whether content hashing to `hash` needs no new analysis.
    pub fn is_current(&self, hash: &str) -> bool {
        !self.failed && self.hash == hash
    }
}

/// Everything guarded by the manager's lock.
#[derive(Debug)]
pub struct State {
    table: SymbolTable,
    graph: DependencyGraph,
    usages: HashMap<String, Vec<Usage>>,
    files: BTreeMap<String, IndexedFile>,
    diagnostics: DiagnosticLog,
}

impl State {
    fn new(max_diagnostics: usize) -> Self {
        Self {
            table: SymbolTable::new(),
            graph: DependencyGraph::new(),
            usages: HashMap::new(),
            files: BTreeMap::new(),
            diagnostics: DiagnosticLog::new(max_diagnostics),
        }
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn usages(&self, file: &str) -> &[Usage] {
        self.usages.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn file(&self, path: &str) -> Option<&IndexedFile> {
        self.files.get(path)
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &IndexedFile)> {
        self.files.iter().map(|(path, file)| (path.as_str(), file))
    }

    pub fn is_indexed(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    /// Smallest function, class or method whose range covers `[line_start, line_end]`.
    /// Equal spans go to the later (inner) one.
    pub fn enclosing_scope(&self, file: &str, line_start: usize, line_end: usize) -> Option<&Symbol> {
        self.table
            .symbols_in_file(file)
            .iter()
            .filter(|symbol| symbol.kind.is_scope() && symbol.contains_range(line_start, line_end))
            .min_by(|a, b| {
                a.span_len()
                    .cmp(&b.span_len())
                    .then(b.line_start.cmp(&a.line_start))
            })
    }

    /// Same-file definition, then definitions in files `file` imports from, then the
    /// whole project with definitions ahead of import bindings.
    pub fn find_definition(&self, name: &str, file: &str) -> Option<&Symbol> {
        let local = self
            .table
            .symbols_in_file(file)
            .iter()
            .find(|symbol| symbol.name == name && symbol.kind != SymbolKind::Import);
        if local.is_some() {
            return local;
        }

        let imported = self.graph.import_targets(file, name);
        let direct = self.graph.dependencies(file);
        for dependency in imported.iter().chain(direct.iter()) {
            let found = self
                .table
                .symbols_in_file(dependency)
                .iter()
                .find(|symbol| symbol.name == name && symbol.kind != SymbolKind::Import);
            if found.is_some() {
                return found;
            }
        }

        self.table
            .definitions(name)
            .next()
            .or_else(|| self.table.lookup(name).first())
    }

    /// Usages of `name` in `file` and in every file that depends on it, one per line.
    pub fn find_references(&self, name: &str, file: &str) -> Vec<Symbol> {
        let definition = self.find_definition(name, file);
        let mut files = vec![file.to_string()];
        files.extend(self.graph.dependents(file).into_iter().map(str::to_string));

        let mut references = Vec::new();
        let mut seen = BTreeSet::new();
        for path in &files {
            for usage in self.usages(path).iter().filter(|usage| usage.name == name) {
                if !seen.insert((path.clone(), usage.line)) {
                    continue;
                }
                let kind = definition.map_or(SymbolKind::Variable, |def| def.kind);
                let scope = self
                    .enclosing_scope(path, usage.line, usage.line)
                    .map(|scope| scope.name.clone());
                references.push(
                    Symbol::new(name, kind, path.as_str(), usage.line, usage.line)
                        .with_signature(definition.and_then(|def| def.signature.clone()))
                        .with_parent(scope),
                );
            }
        }
        references.sort();
        references
    }

    /// Direct dependencies, direct dependents, then the transitive closure both ways,
    /// nearest first, without `file` itself.
    pub fn relevant_files(&self, file: &str, limit: usize) -> Vec<String> {
        let mut seen = BTreeSet::from([file.to_string()]);
        let mut relevant = Vec::new();
        let mut push = |path: &str, relevant: &mut Vec<String>| {
            if relevant.len() < limit && seen.insert(path.to_string()) {
                relevant.push(path.to_string());
            }
        };
        for path in self.graph.dependencies(file) {
            push(path, &mut relevant);
        }
        for path in self.graph.dependents(file) {
            push(path, &mut relevant);
        }
        if relevant.len() < limit {
            for path in self.graph.transitive_dependencies(file, usize::MAX) {
                push(&path, &mut relevant);
            }
            for path in self.graph.transitive_dependents(file, usize::MAX) {
                push(&path, &mut relevant);
            }
        }
        relevant
    }

    /// Files that a candidate denotes among the indexed files.
    fn resolve(files: &BTreeMap<String, IndexedFile>, candidate: &ImportCandidate) -> Vec<String> {
        match candidate {
            ImportCandidate::File(path) => {
                if files.contains_key(path) {
                    vec![path.clone()]
                } else {
                    Vec::new()
                }
            }
            ImportCandidate::Package { dir, language } => files
                .iter()
                .filter(|(path, file)| {
                    !file.is_test && file.language == *language && util::parent_dir(path) == dir
                })
                .map(|(path, _)| path.clone())
                .collect(),
        }
    }

    /// Stores the symbols and usages of one analysis. Imports are linked separately so a
    /// batch can register every file before any import is resolved.
    fn store(&mut self, analysis: &mut FileAnalysis) {
        let path = analysis.path.clone();
        match &analysis.error {
            Some(err) => {
                tracing::warn!(file = %path, error = %err, "extraction failed, storing empty result");
                let line = match err {
                    ParseError::Syntax { line } => Some(*line),
                    _ => None,
                };
                self.diagnostics
                    .record(Diagnostic::warning(path.as_str(), err.to_string()).at_line(line));
            }
            None => self.diagnostics.clear_file(&path),
        }
        self.table
            .replace_file(&path, std::mem::take(&mut analysis.symbols));
        let usages = std::mem::take(&mut analysis.usages);
        if usages.is_empty() {
            self.usages.remove(&path);
        } else {
            self.usages.insert(path.clone(), usages);
        }
        self.files.insert(
            path.clone(),
            IndexedFile {
                language: analysis.language.clone(),
                hash: analysis.hash.clone(),
                is_test: test_detection::is_test_file(&path),
                failed: analysis.error.is_some(),
            },
        );
    }

    fn link(&mut self, analysis: &mut FileAnalysis) {
        let Self { graph, files, .. } = self;
        graph.set_imports(&analysis.path, std::mem::take(&mut analysis.imports), |candidate| {
            Self::resolve(files, candidate)
        });
    }

    /// Re-resolves pending imports that may point at the newly known `paths`.
    fn announce(&mut self, paths: &[String]) {
        let keys: Vec<ImportCandidate> = paths
            .iter()
            .filter_map(|path| self.files.get(path).map(|file| (path, file)))
            .flat_map(|(path, file)| {
                let mut keys = vec![ImportCandidate::File(path.clone())];
                if !file.is_test {
                    keys.push(ImportCandidate::Package {
                        dir: util::parent_dir(path).to_string(),
                        language: file.language.clone(),
                    });
                }
                keys
            })
            .collect();
        if keys.is_empty() {
            return;
        }
        let Self { graph, files, .. } = self;
        let relinked = graph.touch(&keys, |candidate| Self::resolve(files, candidate));
        if relinked > 0 {
            tracing::debug!(files = paths.len(), relinked, "linked pending imports");
        }
    }

    fn forget(&mut self, path: &str) -> bool {
        if self.files.remove(path).is_none() {
            return false;
        }
        self.table.remove_file(path);
        self.usages.remove(path);
        self.diagnostics.clear_file(path);
        let Self { graph, files, .. } = self;
        graph.remove_file(path, |candidate| Self::resolve(files, candidate));
        true
    }
}

/// Snapshot of the region around an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditContext {
    pub file: String,
    pub line_start: usize,
    pub line_end: usize,
    pub current_scope: Option<Symbol>,
    pub used_symbols: Vec<Symbol>,
    pub imported_symbols: Vec<Symbol>,
    pub relevant_files: Vec<String>,
    pub summary: String,
}

impl EditContext {
    fn render_summary(&self) -> String {
        let mut lines = Vec::new();
        if let Some(scope) = &self.current_scope {
            lines.push(format!("Current scope: {} {}", scope.kind, scope.name));
            if let Some(signature) = &scope.signature {
                lines.push(format!("  Signature: {signature}"));
            }
        }
        push_names(&mut lines, "Used symbols", &self.used_symbols);
        push_names(&mut lines, "Imported symbols", &self.imported_symbols);
        if !self.relevant_files.is_empty() {
            lines.push(format!("Relevant files: {} files", self.relevant_files.len()));
            for path in self.relevant_files.iter().take(SUMMARY_FILE_LIMIT) {
                lines.push(format!("  - {path}"));
            }
            if self.relevant_files.len() > SUMMARY_FILE_LIMIT {
                lines.push(format!(
                    "  ... and {} more",
                    self.relevant_files.len() - SUMMARY_FILE_LIMIT
                ));
            }
        }
        if lines.is_empty() {
            "No context available".to_string()
        } else {
            lines.join("\n")
        }
    }
}

fn push_names(lines: &mut Vec<String>, label: &str, symbols: &[Symbol]) {
    if symbols.is_empty() {
        return;
    }
    let names: Vec<&str> = symbols
        .iter()
        .take(SUMMARY_NAME_LIMIT)
        .map(|symbol| symbol.name.as_str())
        .collect();
    lines.push(format!("{label}: {}", names.join(", ")));
    if symbols.len() > SUMMARY_NAME_LIMIT {
        lines.push(format!("  ... and {} more", symbols.len() - SUMMARY_NAME_LIMIT));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    Indexed,
    /// Content hash matched the stored one of a cleanly indexed file.
    Unchanged,
    /// No language claims the path.
    Skipped,
    /// Parsing failed; the file is indexed with no symbols.
    Failed,
    Removed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub indexed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub unreadable: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub files: usize,
    pub symbols: usize,
    pub edges: usize,
    pub pending_imports: usize,
    pub diagnostics: usize,
    pub languages: BTreeMap<String, usize>,
}

pub struct ContextManager {
    registry: LanguageRegistry,
    provider: Arc<dyn FileProvider>,
    config: EngineConfig,
    state: RwLock<State>,
}

impl ContextManager {
    pub fn new(registry: LanguageRegistry, provider: Arc<dyn FileProvider>) -> Self {
        Self::with_config(registry, provider, EngineConfig::get().clone())
    }

    pub fn with_config(
        registry: LanguageRegistry,
        provider: Arc<dyn FileProvider>,
        config: EngineConfig,
    ) -> Self {
        let state = State::new(config.max_diagnostics);
        Self {
            registry,
            provider,
            config,
            state: RwLock::new(state),
        }
    }

    /// Manager over a directory on disk with the shipped languages.
    pub fn for_directory(root: &Path) -> Self {
        Self::new(
            LanguageRegistry::with_defaults(),
            Arc::new(FsProvider::new(root)),
        )
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    pub fn provider(&self) -> &Arc<dyn FileProvider> {
        &self.provider
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs `f` under a read guard. Keep `f` short: writers wait for it.
    pub fn with_state<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        f(&self.state.read())
    }

    /// Re-indexes `path` from `content`, replacing its symbols, usages and edges in one
    /// step.
    pub fn update_context_for_file(&self, path: &str, content: &str) -> UpdateOutcome {
        let path = util::normalize_path(Path::new(path));
        let Some(language) = self.registry.detect(&path) else {
            tracing::debug!(file = %path, "no language for file, skipping");
            return UpdateOutcome::Skipped;
        };
        let hash = util::content_hash(content);
        if self
            .state
            .read()
            .file(&path)
            .is_some_and(|file| file.is_current(&hash))
        {
            return UpdateOutcome::Unchanged;
        }

        let mut tools = LanguageTools::new(&self.registry);
        let mut analysis = tools.analyze(&path, language, content);
        let outcome = if analysis.is_ok() {
            UpdateOutcome::Indexed
        } else {
            UpdateOutcome::Failed
        };

        let mut state = self.state.write();
        let is_new = !state.is_indexed(&path);
        state.store(&mut analysis);
        state.link(&mut analysis);
        if is_new {
            state.announce(std::slice::from_ref(&path));
        }
        outcome
    }

    /// Reads `path` through the provider and re-indexes it. A path that no longer exists
    /// is removed; a read failure keeps the previous entries.
    pub fn refresh_file(&self, path: &str) -> EngineResult<UpdateOutcome> {
        let path = util::normalize_path(Path::new(path));
        if !self.provider.exists(&path) {
            return Ok(if self.remove_file(&path) {
                UpdateOutcome::Removed
            } else {
                UpdateOutcome::Skipped
            });
        }
        match self.provider.read(&path) {
            Ok(content) => Ok(self.update_context_for_file(&path, &content)),
            Err(source) => {
                tracing::warn!(file = %path, error = %source, "read failed, keeping previous state");
                self.state
                    .write()
                    .diagnostics
                    .record(Diagnostic::error(path.as_str(), format!("read failed: {source}")));
                Err(EngineError::Io { path, source })
            }
        }
    }

    /// Drops everything known about `path`. Imports of other files that pointed at it
    /// become pending again.
    pub fn remove_file(&self, path: &str) -> bool {
        let path = util::normalize_path(Path::new(path));
        let removed = self.state.write().forget(&path);
        if removed {
            tracing::debug!(file = %path, "removed file from index");
        }
        removed
    }

    /// Indexes many files: read and extract in parallel, then apply in path order under
    /// one write guard, resolving imports once every file is registered.
    pub fn scan(&self, paths: &[String]) -> ScanReport {
        let provider = Arc::clone(&self.provider);
        let paths: Vec<String> = paths
            .iter()
            .map(|path| util::normalize_path(Path::new(path)))
            .collect();
        self.scan_with(paths, move |path| provider.read(path))
    }

    /// Walks `root` (honouring ignore files, skipping vendored and build directories) and
    /// indexes every file of a registered language, reading it through the provider.
    /// Paths are stored relative to the provider's root, or to `root` when the provider
    /// has none. Files outside the provider's root are skipped.
    pub fn scan_directory(&self, root: &Path) -> ScanReport {
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let files = scan::discover_sources(&root, &self.registry, &ScanOptions::default());
        let mut outside = 0;
        let paths: Vec<String> = files
            .into_iter()
            .filter_map(|file| {
                let Some(base) = self.provider.root() else {
                    return Some(file.rel_path);
                };
                match file.abs_path.strip_prefix(base) {
                    Ok(rel) => Some(util::normalize_path(rel)),
                    Err(_) => {
                        tracing::warn!(
                            file = %file.abs_path.display(),
                            provider_root = %base.display(),
                            "file outside the provider root, skipping"
                        );
                        outside += 1;
                        None
                    }
                }
            })
            .collect();
        let mut report = self.scan(&paths);
        report.skipped += outside;
        report
    }

    fn scan_with<R>(&self, mut paths: Vec<String>, read: R) -> ScanReport
    where
        R: Fn(&str) -> std::io::Result<String> + Sync,
    {
        let started = Instant::now();
        paths.sort();
        paths.dedup();
        let mut report = ScanReport::default();

        let known_hashes: HashMap<String, String> = {
            let state = self.state.read();
            paths
                .iter()
                .filter_map(|path| {
                    state
                        .file(path)
                        .filter(|file| !file.failed)
                        .map(|file| (path.clone(), file.hash.clone()))
                })
                .collect()
        };

        let jobs: Vec<(String, &str)> = paths
            .into_iter()
            .filter_map(|path| match self.registry.detect(&path) {
                Some(language) => Some((path, language)),
                None => {
                    report.skipped += 1;
                    None
                }
            })
            .collect();

        let work = || {
            jobs.par_iter()
                .map_init(
                    || LanguageTools::new(&self.registry),
                    |tools, (path, language)| match read(path) {
                        Ok(content) => {
                            if known_hashes.get(path) == Some(&util::content_hash(&content)) {
                                return ScanItem::Unchanged;
                            }
                            ScanItem::Analyzed(Box::new(tools.analyze(path, language, &content)))
                        }
                        Err(err) => ScanItem::Unreadable(path.clone(), err.to_string()),
                    },
                )
                .collect::<Vec<_>>()
        };
        let items = match self.scan_pool() {
            Some(pool) => pool.install(work),
            None => work(),
        };

        let mut state = self.state.write();
        let mut analyses = Vec::new();
        let mut new_files = Vec::new();
        for item in items {
            match item {
                ScanItem::Unchanged => report.unchanged += 1,
                ScanItem::Unreadable(path, message) => {
                    tracing::warn!(file = %path, error = %message, "read failed during scan");
                    state
                        .diagnostics
                        .record(Diagnostic::error(path.as_str(), format!("read failed: {message}")));
                    report.unreadable += 1;
                }
                ScanItem::Analyzed(mut analysis) => {
                    if analysis.is_ok() {
                        report.indexed += 1;
                    } else {
                        report.failed += 1;
                    }
                    if !state.is_indexed(&analysis.path) {
                        new_files.push(analysis.path.clone());
                    }
                    state.store(&mut analysis);
                    analyses.push(analysis);
                }
            }
        }
        for analysis in &mut analyses {
            state.link(analysis);
        }
        state.announce(&new_files);
        drop(state);

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            indexed = report.indexed,
            unchanged = report.unchanged,
            failed = report.failed,
            unreadable = report.unreadable,
            elapsed_ms = report.elapsed_ms,
            "scan finished"
        );
        report
    }

    fn scan_pool(&self) -> Option<rayon::ThreadPool> {
        if self.config.scan_threads == 0 {
            return None;
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.scan_threads)
            .build()
        {
            Ok(pool) => Some(pool),
            Err(err) => {
                tracing::warn!(error = %err, "could not build scan pool, using global pool");
                None
            }
        }
    }

    pub fn get_edit_context(&self, path: &str, line_start: usize, line_end: usize) -> EditContext {
        let path = util::normalize_path(Path::new(path));
        let line_end = line_end.max(line_start);
        let state = self.state.read();

        let current_scope = state.enclosing_scope(&path, line_start, line_end).cloned();

        let file_symbols = state.table.symbols_in_file(&path);
        let mut in_range: Vec<&Usage> = state
            .usages(&path)
            .iter()
            .filter(|usage| usage.line >= line_start && usage.line <= line_end)
            .collect();
        in_range.sort_by_key(|usage| (usage.line, usage.column));
        let mut seen = BTreeSet::new();
        let mut used_symbols = Vec::new();
        for usage in in_range {
            if !seen.insert(usage.name.as_str()) {
                continue;
            }
            let local = file_symbols
                .iter()
                .find(|symbol| symbol.name == usage.name && symbol.kind != SymbolKind::Import);
            if let Some(symbol) = local {
                used_symbols.push(symbol.clone());
                continue;
            }
            let import = file_symbols
                .iter()
                .find(|symbol| symbol.name == usage.name && symbol.kind == SymbolKind::Import);
            if let Some(import) = import {
                let resolved = state
                    .find_definition(&usage.name, &path)
                    .filter(|symbol| symbol.kind != SymbolKind::Import)
                    .unwrap_or(import);
                used_symbols.push(resolved.clone());
            }
        }

        let imported_symbols: Vec<Symbol> = file_symbols
            .iter()
            .filter(|symbol| symbol.kind == SymbolKind::Import)
            .cloned()
            .collect();
        let relevant_files = state.relevant_files(&path, self.config.max_relevant_files);
        drop(state);

        let mut context = EditContext {
            file: path,
            line_start,
            line_end,
            current_scope,
            used_symbols,
            imported_symbols,
            relevant_files,
            summary: String::new(),
        };
        context.summary = context.render_summary();
        context
    }

    pub fn find_definition(&self, name: &str, path: &str) -> Option<Symbol> {
        let path = util::normalize_path(Path::new(path));
        self.state.read().find_definition(name, &path).cloned()
    }

    pub fn find_references(&self, name: &str, path: &str) -> Vec<Symbol> {
        let path = util::normalize_path(Path::new(path));
        self.state.read().find_references(name, &path)
    }

    pub fn enclosing_scope(&self, path: &str, line: usize) -> Option<Symbol> {
        let path = util::normalize_path(Path::new(path));
        self.state.read().enclosing_scope(&path, line, line).cloned()
    }

    pub fn symbols_in_file(&self, path: &str) -> Vec<Symbol> {
        let path = util::normalize_path(Path::new(path));
        self.state.read().table.symbols_in_file(&path).to_vec()
    }

    pub fn dependencies(&self, path: &str) -> Vec<String> {
        let path = util::normalize_path(Path::new(path));
        let state = self.state.read();
        state.graph.dependencies(&path).into_iter().map(str::to_string).collect()
    }

    pub fn dependents(&self, path: &str) -> Vec<String> {
        let path = util::normalize_path(Path::new(path));
        let state = self.state.read();
        state.graph.dependents(&path).into_iter().map(str::to_string).collect()
    }

    pub fn files(&self) -> Vec<String> {
        self.state.read().files.keys().cloned().collect()
    }

    pub fn language_of(&self, path: &str) -> Option<String> {
        let path = util::normalize_path(Path::new(path));
        self.state.read().file(&path).map(|file| file.language.clone())
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.state.read().diagnostics.to_vec()
    }

    pub fn stats(&self) -> EngineStats {
        let state = self.state.read();
        let mut languages = BTreeMap::new();
        for file in state.files.values() {
            *languages.entry(file.language.clone()).or_insert(0) += 1;
        }
        EngineStats {
            files: state.files.len(),
            symbols: state.table.len(),
            edges: state.graph.edge_count(),
            pending_imports: state.graph.pending_count(),
            diagnostics: state.diagnostics.len(),
            languages,
        }
    }
}

enum ScanItem {
    Analyzed(Box<FileAnalysis>),
    Unchanged,
    Unreadable(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::extract::{
        DependencyAnalyzer, ExtractedSymbols, LanguageSupport, ParseLimits, SymbolExtractor,
    };
    use crate::provider::MemoryProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Times out on its first parse and succeeds afterwards.
    struct Flaky {
        attempts: Arc<AtomicUsize>,
    }

    impl SymbolExtractor for Flaky {
        fn extract(&mut self, file_path: &str, _content: &str) -> Result<ExtractedSymbols, ParseError> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ParseError::Timeout { timeout_ms: 1 });
            }
            Ok(ExtractedSymbols {
                symbols: vec![Symbol::new("late", SymbolKind::Function, file_path, 1, 1)],
                usages: Vec::new(),
            })
        }
    }

    impl LanguageSupport for Flaky {
        fn language_name(&self) -> &str {
            "flaky"
        }

        fn extensions(&self) -> &[&'static str] {
            &[".flaky"]
        }

        fn create_symbol_extractor(&self) -> Option<Box<dyn SymbolExtractor>> {
            Some(Box::new(Flaky {
                attempts: Arc::clone(&self.attempts),
            }))
        }

        fn create_dependency_analyzer(&self) -> Option<Box<dyn DependencyAnalyzer>> {
            None
        }
    }

    fn flaky_manager(provider: Arc<MemoryProvider>) -> ContextManager {
        let mut registry = LanguageRegistry::new();
        registry.register(Arc::new(Flaky {
            attempts: Arc::new(AtomicUsize::new(0)),
        }));
        ContextManager::with_config(registry, provider, EngineConfig::default())
    }

    fn manager() -> ContextManager {
        ContextManager::with_config(
            LanguageRegistry::with_limits(ParseLimits::default()),
            Arc::new(MemoryProvider::new()),
            EngineConfig::default(),
        )
    }

    fn sym(name: &str, kind: SymbolKind, start: usize, end: usize) -> Symbol {
        Symbol::new(name, kind, "a.py", start, end)
    }

    #[test]
    fn summary_caps_lists() {
        let used: Vec<Symbol> = (0..7)
            .map(|i| sym(&format!("s{i}"), SymbolKind::Variable, 1, 1))
            .collect();
        let context = EditContext {
            file: "a.py".to_string(),
            line_start: 1,
            line_end: 1,
            current_scope: Some(
                sym("run", SymbolKind::Function, 1, 4).with_signature(Some("(x)".to_string())),
            ),
            used_symbols: used,
            imported_symbols: Vec::new(),
            relevant_files: vec!["b.py", "c.py", "d.py", "e.py"]
                .into_iter()
                .map(String::from)
                .collect(),
            summary: String::new(),
        };
        let expected = "Current scope: function run\n  Signature: (x)\n\
                        Used symbols: s0, s1, s2, s3, s4\n  ... and 2 more\n\
                        Relevant files: 4 files\n  - b.py\n  - c.py\n  - d.py\n  ... and 1 more";
        assert_eq!(context.render_summary(), expected);
    }

    #[test]
    fn empty_summary() {
        let context = manager().get_edit_context("missing.py", 1, 1);
        assert_eq!(context.summary, "No context available");
        assert!(context.current_scope.is_none());
    }

    #[test]
    fn unchanged_content_short_circuits() {
        let manager = manager();
        let source = "def f():\n    pass\n";
        assert_eq!(manager.update_context_for_file("a.py", source), UpdateOutcome::Indexed);
        assert_eq!(manager.update_context_for_file("a.py", source), UpdateOutcome::Unchanged);
        assert_eq!(manager.update_context_for_file("README.md", "# x"), UpdateOutcome::Skipped);
    }

    #[test]
    fn failed_parse_is_retried_on_identical_content() {
        let manager = flaky_manager(Arc::new(MemoryProvider::new()));
        assert_eq!(manager.update_context_for_file("a.flaky", "x"), UpdateOutcome::Failed);
        assert_eq!(manager.diagnostics().len(), 1);

        assert_eq!(manager.update_context_for_file("a.flaky", "x"), UpdateOutcome::Indexed);
        assert_eq!(manager.symbols_in_file("a.flaky").len(), 1);
        assert!(manager.diagnostics().is_empty());
        assert_eq!(manager.update_context_for_file("a.flaky", "x"), UpdateOutcome::Unchanged);
    }

    #[test]
    fn rescans_retry_failed_files() {
        let provider = Arc::new(MemoryProvider::with_files([("a.flaky", "x")]));
        let manager = flaky_manager(provider);
        let paths = vec!["a.flaky".to_string()];

        assert_eq!(manager.scan(&paths).failed, 1);
        let retried = manager.scan(&paths);
        assert_eq!((retried.indexed, retried.unchanged), (1, 0));
        assert_eq!(manager.scan(&paths).unchanged, 1);
    }

    #[test]
    fn scope_prefers_innermost() {
        let manager = manager();
        manager.update_context_for_file(
            "a.py",
            "class A:\n    def m(self):\n        x = 1\n        return x\n",
        );
        let scope = manager.enclosing_scope("a.py", 3).unwrap();
        assert_eq!(scope.name, "m");
        assert_eq!(manager.enclosing_scope("a.py", 1).unwrap().name, "A");
    }
}
