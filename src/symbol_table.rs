use crate::model::{Symbol, SymbolKind};
use std::collections::{BTreeMap, HashMap};

/// Name index and file index over one set of symbols.
///
/// Every symbol stored under a name is also stored under its file and vice versa; a
/// file's entries are only ever swapped as a whole.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    by_name: HashMap<String, Vec<Symbol>>,
    by_file: BTreeMap<String, Vec<Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every symbol of `file` and stores `symbols` (source order) in its place.
    pub fn replace_file(&mut self, file: &str, mut symbols: Vec<Symbol>) {
        self.remove_file(file);
        symbols.retain(|symbol| symbol.file_path == file);
        if symbols.is_empty() {
            return;
        }
        for symbol in &symbols {
            let entries = self.by_name.entry(symbol.name.clone()).or_default();
            let at = entries.partition_point(|existing| existing <= symbol);
            entries.insert(at, symbol.clone());
        }
        self.by_file.insert(file.to_string(), symbols);
    }

    /// Returns the symbols that were stored for `file`.
    pub fn remove_file(&mut self, file: &str) -> Vec<Symbol> {
        let Some(removed) = self.by_file.remove(file) else {
            return Vec::new();
        };
        for symbol in &removed {
            if let Some(entries) = self.by_name.get_mut(&symbol.name) {
                entries.retain(|existing| existing.file_path != file);
                if entries.is_empty() {
                    self.by_name.remove(&symbol.name);
                }
            }
        }
        removed
    }

    /// All symbols called `name`, ordered by file then line.
    pub fn lookup(&self, name: &str) -> &[Symbol] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Definitions called `name`, skipping import bindings.
    pub fn definitions(&self, name: &str) -> impl Iterator<Item = &Symbol> {
        self.lookup(name)
            .iter()
            .filter(|symbol| symbol.kind != SymbolKind::Import)
    }

    pub fn symbols_in_file(&self, file: &str) -> &[Symbol] {
        self.by_file.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.by_file.keys().map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_file.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }

    /// True when both indexes hold exactly the same symbols.
    pub fn is_consistent(&self) -> bool {
        let name_count: usize = self.by_name.values().map(Vec::len).sum();
        if name_count != self.len() {
            return false;
        }
        self.by_file.iter().all(|(file, symbols)| {
            symbols.iter().all(|symbol| {
                symbol.file_path == *file
                    && self
                        .lookup(&symbol.name)
                        .iter()
                        .filter(|entry| *entry == symbol)
                        .count()
                        == symbols.iter().filter(|other| *other == symbol).count()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str, kind: SymbolKind, file: &str, line: usize) -> Symbol {
        Symbol::new(name, kind, file, line, line + 1)
    }

    #[test]
    fn replace_swaps_whole_file() {
        let mut table = SymbolTable::new();
        table.replace_file(
            "a.py",
            vec![
                sym("f", SymbolKind::Function, "a.py", 1),
                sym("C", SymbolKind::Class, "a.py", 4),
            ],
        );
        table.replace_file("b.py", vec![sym("f", SymbolKind::Function, "b.py", 2)]);
        assert_eq!(table.lookup("f").len(), 2);
        assert_eq!(table.lookup("f")[0].file_path, "a.py");

        table.replace_file("a.py", vec![sym("g", SymbolKind::Function, "a.py", 1)]);
        assert_eq!(table.lookup("f").len(), 1);
        assert!(table.lookup("C").is_empty());
        assert_eq!(table.symbols_in_file("a.py").len(), 1);
        assert_eq!(table.len(), 2);
        assert!(table.is_consistent());
    }

    #[test]
    fn remove_clears_both_indexes() {
        let mut table = SymbolTable::new();
        table.replace_file("a.rs", vec![sym("run", SymbolKind::Function, "a.rs", 3)]);
        let removed = table.remove_file("a.rs");
        assert_eq!(removed.len(), 1);
        assert!(table.lookup("run").is_empty());
        assert!(table.is_empty());
        assert_eq!(table.names().count(), 0);
        assert!(table.is_consistent());
    }

    #[test]
    fn definitions_skip_imports() {
        let mut table = SymbolTable::new();
        table.replace_file("b.py", vec![sym("process", SymbolKind::Import, "b.py", 1)]);
        table.replace_file("a.py", vec![sym("process", SymbolKind::Function, "a.py", 1)]);
        let defs: Vec<_> = table.definitions("process").collect();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].file_path, "a.py");
    }

    #[test]
    fn foreign_paths_are_not_stored() {
        let mut table = SymbolTable::new();
        table.replace_file("a.py", vec![sym("x", SymbolKind::Variable, "other.py", 1)]);
        assert!(table.is_empty());
        assert!(table.is_consistent());
    }
}
