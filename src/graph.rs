//! File dependency graph
//!
//! Edges point from an importing file to the files its imports resolve to. The reverse
//! map is updated in the same step as the forward map. Every import keeps its candidate
//! list, so an import whose target is not indexed yet stays pending and is linked as soon
//! as a matching file shows up.

use crate::indexer::ImportRecord;
use crate::indexer::extract::ImportCandidate;
use crate::model::Dependency;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

#[derive(Debug, Clone)]
struct TrackedImport {
    dependency: Dependency,
    candidates: Vec<ImportCandidate>,
    targets: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    nodes: BTreeSet<String>,
    forward: BTreeMap<String, BTreeSet<String>>,
    reverse: BTreeMap<String, BTreeSet<String>>,
    imports: BTreeMap<String, Vec<TrackedImport>>,
    /// Candidate -> sources with an import naming it.
    watchers: HashMap<ImportCandidate, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the imports of `source` and relinks its outgoing edges.
    ///
    /// `resolve` maps a candidate to the indexed files it denotes; an empty result means
    /// the candidate is unknown right now.
    pub fn set_imports<F>(&mut self, source: &str, records: Vec<ImportRecord>, resolve: F)
    where
        F: Fn(&ImportCandidate) -> Vec<String>,
    {
        self.unwatch(source);
        let tracked: Vec<TrackedImport> = records
            .into_iter()
            .map(|record| TrackedImport {
                dependency: record.dependency,
                candidates: record.candidates,
                targets: Vec::new(),
            })
            .collect();
        for import in &tracked {
            for candidate in &import.candidates {
                self.watchers
                    .entry(candidate.clone())
                    .or_default()
                    .insert(source.to_string());
            }
        }
        self.imports.insert(source.to_string(), tracked);
        self.nodes.insert(source.to_string());
        self.relink(source, &resolve);
    }

    /// Re-resolves every import that names one of `keys`. Called when a file becomes
    /// known so pending imports pointing at it get linked.
    pub fn touch<F>(&mut self, keys: &[ImportCandidate], resolve: F) -> usize
    where
        F: Fn(&ImportCandidate) -> Vec<String>,
    {
        let sources: BTreeSet<String> = keys
            .iter()
            .filter_map(|key| self.watchers.get(key))
            .flatten()
            .cloned()
            .collect();
        for source in &sources {
            self.relink(source, &resolve);
        }
        sources.len()
    }

    /// Drops `path` with its imports and outgoing edges. Files that depended on it are
    /// re-resolved, which leaves their imports pending unless another candidate exists.
    pub fn remove_file<F>(&mut self, path: &str, resolve: F)
    where
        F: Fn(&ImportCandidate) -> Vec<String>,
    {
        self.unwatch(path);
        self.imports.remove(path);
        self.set_edges(path, BTreeSet::new());
        let dependents: Vec<String> = self
            .reverse
            .get(path)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        for dependent in &dependents {
            self.relink(dependent, &resolve);
        }
        self.nodes.remove(path);
        // Anything still pointing here resolved through a stale view of the file set.
        if let Some(stale) = self.reverse.remove(path) {
            for source in stale {
                if let Some(targets) = self.forward.get_mut(&source) {
                    targets.remove(path);
                }
            }
        }
    }

    pub fn dependencies(&self, file: &str) -> Vec<&str> {
        self.forward
            .get(file)
            .map(|targets| targets.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn dependents(&self, file: &str) -> Vec<&str> {
        self.reverse
            .get(file)
            .map(|sources| sources.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Files that reach `file` through at most `max_depth` edges, nearest first.
    pub fn transitive_dependents(&self, file: &str, max_depth: usize) -> Vec<String> {
        breadth_first(file, max_depth, |node| self.dependents(node))
    }

    /// Files reachable from `file` through at most `max_depth` edges, nearest first.
    pub fn transitive_dependencies(&self, file: &str, max_depth: usize) -> Vec<String> {
        breadth_first(file, max_depth, |node| self.dependencies(node))
    }

    /// Imports of `source` that currently resolve to nothing.
    pub fn unresolved(&self, source: &str) -> Vec<&Dependency> {
        self.imports
            .get(source)
            .map(|imports| {
                imports
                    .iter()
                    .filter(|import| import.targets.is_empty())
                    .map(|import| &import.dependency)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of imports with candidates that have not been linked yet.
    pub fn pending_count(&self) -> usize {
        self.imports
            .values()
            .flatten()
            .filter(|import| import.targets.is_empty() && !import.candidates.is_empty())
            .count()
    }

    /// Resolved target files of the imports of `source` that bind `name`.
    pub fn import_targets(&self, source: &str, name: &str) -> Vec<&str> {
        self.imports
            .get(source)
            .map(|imports| {
                imports
                    .iter()
                    .filter(|import| {
                        import.dependency.imported_names.contains(name)
                            || import.dependency.imported_names.is_empty()
                    })
                    .flat_map(|import| import.targets.iter().map(String::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, file: &str) -> bool {
        self.nodes.contains(file)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn edge_count(&self) -> usize {
        self.forward.values().map(BTreeSet::len).sum()
    }

    /// True when the reverse map is exactly the transpose of the forward map and no
    /// self edges exist.
    pub fn is_consistent(&self) -> bool {
        let forward_ok = self.forward.iter().all(|(source, targets)| {
            targets.iter().all(|target| {
                target != source
                    && self
                        .reverse
                        .get(target)
                        .is_some_and(|sources| sources.contains(source))
            })
        });
        let reverse_ok = self.reverse.iter().all(|(target, sources)| {
            sources.iter().all(|source| {
                self.forward
                    .get(source)
                    .is_some_and(|targets| targets.contains(target))
            })
        });
        forward_ok && reverse_ok
    }

    fn relink<F>(&mut self, source: &str, resolve: &F)
    where
        F: Fn(&ImportCandidate) -> Vec<String>,
    {
        let Some(imports) = self.imports.get_mut(source) else {
            return;
        };
        let mut edges = BTreeSet::new();
        for import in imports.iter_mut() {
            import.targets = import
                .candidates
                .iter()
                .map(|candidate| {
                    resolve(candidate)
                        .into_iter()
                        .filter(|target| target != source)
                        .collect::<Vec<_>>()
                })
                .find(|targets| !targets.is_empty())
                .unwrap_or_default();
            edges.extend(import.targets.iter().cloned());
        }
        self.set_edges(source, edges);
    }

    fn set_edges(&mut self, source: &str, targets: BTreeSet<String>) {
        if let Some(old) = self.forward.remove(source) {
            for target in old {
                if let Some(sources) = self.reverse.get_mut(&target) {
                    sources.remove(source);
                    if sources.is_empty() {
                        self.reverse.remove(&target);
                    }
                }
            }
        }
        if targets.is_empty() {
            return;
        }
        for target in &targets {
            self.nodes.insert(target.clone());
            self.reverse
                .entry(target.clone())
                .or_default()
                .insert(source.to_string());
        }
        self.forward.insert(source.to_string(), targets);
    }

    fn unwatch(&mut self, source: &str) {
        let Some(imports) = self.imports.get(source) else {
            return;
        };
        for candidate in imports.iter().flat_map(|import| &import.candidates) {
            if let Some(sources) = self.watchers.get_mut(candidate) {
                sources.remove(source);
                if sources.is_empty() {
                    self.watchers.remove(candidate);
                }
            }
        }
    }
}

fn breadth_first<'g, N>(start: &str, max_depth: usize, neighbours: N) -> Vec<String>
where
    N: Fn(&str) -> Vec<&'g str>,
{
    let mut seen = BTreeSet::from([start.to_string()]);
    let mut order = Vec::new();
    let mut queue = VecDeque::from([(start.to_string(), 0usize)]);
    while let Some((node, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for next in neighbours(&node) {
            if seen.insert(next.to_string()) {
                order.push(next.to_string());
                queue.push_back((next.to_string(), depth + 1));
            }
        }
    }
    order
}
