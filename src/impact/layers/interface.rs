//! Interface layer
//!
//! Applies edits to the current content, re-extracts the file and compares the
//! definitions before and after: signatures, kinds, removals and additions.

use crate::error::{EngineError, EngineResult};
use crate::impact::signature::compare_signatures;
use crate::impact::types::{ChangeType, Edit, EditType, InterfaceChange};
use crate::indexer::registry::LanguageRegistry;
use crate::model::{Symbol, SymbolKind};
use std::collections::BTreeMap;

pub struct InterfaceLayer<'a> {
    registry: &'a LanguageRegistry,
}

impl<'a> InterfaceLayer<'a> {
    pub fn new(registry: &'a LanguageRegistry) -> Self {
        Self { registry }
    }

    /// Interface changes of `path` when `edits` are applied to `content`. `old` holds the
    /// indexed symbols of the file; `focus` the definitions the caller is editing.
    pub fn analyze(
        &self,
        path: &str,
        content: &str,
        edits: &[Edit],
        old: &[Symbol],
        focus: &[Symbol],
    ) -> EngineResult<Vec<InterfaceChange>> {
        let language = self
            .registry
            .detect(path)
            .ok_or_else(|| EngineError::UnsupportedLanguage {
                path: path.to_string(),
            })?;
        let mut extractor =
            self.registry
                .extractor_for(language)
                .ok_or_else(|| EngineError::UnsupportedLanguage {
                    path: path.to_string(),
                })?;
        let edited = apply_edits(content, edits);
        let new = extractor
            .extract_symbols(path, &edited)
            .map_err(|source| EngineError::Parse {
                path: path.to_string(),
                source,
            })?;
        Ok(diff_definitions(path, old, &new, focus))
    }
}

type DefinitionKey = (Option<String>, String);

fn key(symbol: &Symbol) -> DefinitionKey {
    (symbol.parent.clone(), symbol.name.clone())
}

fn definitions(symbols: &[Symbol]) -> BTreeMap<DefinitionKey, &Symbol> {
    let mut map = BTreeMap::new();
    for symbol in symbols.iter().filter(|s| s.kind.is_scope()) {
        map.entry(key(symbol)).or_insert(symbol);
    }
    map
}

/// Compares the focused symbols one by one, then reports every other definition that
/// disappeared or appeared.
pub fn diff_definitions(
    path: &str,
    old: &[Symbol],
    new: &[Symbol],
    focus: &[Symbol],
) -> Vec<InterfaceChange> {
    let old_defs = definitions(old);
    let new_defs = definitions(new);
    let new_any: BTreeMap<DefinitionKey, &Symbol> = new
        .iter()
        .filter(|s| s.kind != SymbolKind::Import)
        .map(|s| (key(s), s))
        .collect();
    let mut changes = Vec::new();
    let mut reported = Vec::new();

    for target in focus.iter().filter(|s| s.kind != SymbolKind::Import) {
        let target_key = key(target);
        if reported.contains(&target_key) {
            continue;
        }
        reported.push(target_key.clone());
        let Some(after) = new_defs.get(&target_key).or_else(|| new_any.get(&target_key)) else {
            changes.push(change(
                path,
                target,
                ChangeType::Removed,
                target.signature.clone(),
                None,
                format!("{} {} was removed", target.kind, target.name),
            ));
            continue;
        };
        if after.kind != target.kind {
            changes.push(change(
                path,
                after,
                ChangeType::Kind,
                Some(target.kind.to_string()),
                Some(after.kind.to_string()),
                format!("{} changed from {} to {}", target.name, target.kind, after.kind),
            ));
        }
        let delta = match (&target.signature, &after.signature) {
            (Some(before), Some(now)) => compare_signatures(before, now),
            (None, None) => None,
            _ => compare_signatures(
                target.signature.as_deref().unwrap_or(""),
                after.signature.as_deref().unwrap_or(""),
            ),
        };
        if let Some(delta) = delta {
            changes.push(change(
                path,
                after,
                delta.change,
                target.signature.clone(),
                after.signature.clone(),
                delta.description,
            ));
        }
    }

    for (def_key, before) in &old_defs {
        if reported.contains(def_key) || new_any.contains_key(def_key) {
            continue;
        }
        changes.push(change(
            path,
            before,
            ChangeType::Removed,
            before.signature.clone(),
            None,
            format!("{} {} was removed", before.kind, before.name),
        ));
    }
    for (def_key, after) in &new_defs {
        if old_defs.contains_key(def_key) || reported.contains(def_key) {
            continue;
        }
        changes.push(change(
            path,
            after,
            ChangeType::Added,
            None,
            after.signature.clone(),
            format!("{} {} was added", after.kind, after.name),
        ));
    }
    changes
}

fn change(
    path: &str,
    symbol: &Symbol,
    change: ChangeType,
    before: Option<String>,
    after: Option<String>,
    description: String,
) -> InterfaceChange {
    InterfaceChange {
        symbol_name: symbol.name.clone(),
        change,
        file_path: path.to_string(),
        line: symbol.line_start,
        before,
        after,
        description,
    }
}

/// Applies `edits` bottom-up so earlier line numbers stay valid.
pub fn apply_edits(content: &str, edits: &[Edit]) -> String {
    let mut ordered: Vec<&Edit> = edits.iter().collect();
    ordered.sort_by(|a, b| b.line_start.cmp(&a.line_start));
    ordered
        .into_iter()
        .fold(content.to_string(), |acc, edit| apply_edit(&acc, edit))
}

/// Replaces, inserts or deletes the edit's lines. When the lines at `line_start` read
/// as `after` rather than `before`, the content is taken to be edited already and is
/// returned as is.
pub fn apply_edit(content: &str, edit: &Edit) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let after: Vec<&str> = edit.after.lines().collect();
    let start = (edit.line_start.max(1) - 1).min(lines.len());
    let end = edit.line_end.max(edit.line_start).min(lines.len()).max(start);

    let before: Vec<&str> = edit.before.lines().collect();
    let before_present = !before.is_empty() && lines.get(start..start + before.len()) == Some(&before[..]);
    let already_applied = !before_present
        && !after.is_empty()
        && lines.get(start..start + after.len()) == Some(&after[..]);
    if already_applied {
        return content.to_string();
    }

    let mut edited: Vec<&str> = Vec::with_capacity(lines.len() + after.len());
    edited.extend_from_slice(&lines[..start]);
    match edit.edit_type {
        EditType::Add => {
            edited.extend(after);
            edited.extend_from_slice(&lines[start..]);
        }
        EditType::Delete => edited.extend_from_slice(&lines[end..]),
        EditType::Modify => {
            edited.extend(after);
            edited.extend_from_slice(&lines[end..]);
        }
    }
    let mut out = edited.join("\n");
    if content.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(name: &str, sig: &str, line: usize) -> Symbol {
        Symbol::new(name, SymbolKind::Function, "a.py", line, line + 1)
            .with_signature(Some(sig.to_string()))
    }

    #[test]
    fn apply_modify_add_delete() {
        let content = "a\nb\nc\n";
        let modify = Edit::modify("a.py", 2, 2, "b", "B\nB2");
        assert_eq!(apply_edit(content, &modify), "a\nB\nB2\nc\n");

        let add = Edit {
            edit_type: EditType::Add,
            ..Edit::modify("a.py", 1, 1, "", "z")
        };
        assert_eq!(apply_edit(content, &add), "z\na\nb\nc\n");

        let delete = Edit {
            edit_type: EditType::Delete,
            ..Edit::modify("a.py", 2, 3, "b\nc", "")
        };
        assert_eq!(apply_edit(content, &delete), "a\n");
    }

    #[test]
    fn already_applied_edit_is_left_alone() {
        let content = "def f(x, y):\n    pass\n";
        let edit = Edit::modify("a.py", 1, 1, "def f(x):", "def f(x, y):");
        assert_eq!(apply_edit(content, &edit), content);
    }

    #[test]
    fn edits_apply_bottom_up() {
        let content = "1\n2\n3\n4\n";
        let edits = vec![
            Edit::modify("a.py", 1, 1, "1", "one\nuno"),
            Edit::modify("a.py", 3, 3, "3", "three"),
        ];
        assert_eq!(apply_edits(content, &edits), "one\nuno\n2\nthree\n4\n");
    }

    #[test]
    fn diff_reports_focus_then_others() {
        let old = vec![func("f", "(x)", 1), func("gone", "()", 4)];
        let new = vec![func("f", "(x, y)", 1), func("fresh", "()", 4)];
        let changes = diff_definitions("a.py", &old, &new, &old[..1]);
        let kinds: Vec<_> = changes.iter().map(|c| (c.symbol_name.as_str(), c.change)).collect();
        assert_eq!(
            kinds,
            vec![
                ("f", ChangeType::ParameterCount),
                ("gone", ChangeType::Removed),
                ("fresh", ChangeType::Added),
            ]
        );
        assert_eq!(changes[0].before.as_deref(), Some("(x)"));
        assert_eq!(changes[0].after.as_deref(), Some("(x, y)"));
    }

    #[test]
    fn kind_change_and_removal_of_focus() {
        let old = vec![func("f", "(x)", 1)];
        let as_class = vec![
            Symbol::new("f", SymbolKind::Class, "a.py", 1, 3).with_signature(Some("(x)".into())),
        ];
        let changes = diff_definitions("a.py", &old, &as_class, &old);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change, ChangeType::Kind);

        let changes = diff_definitions("a.py", &old, &[], &old);
        assert_eq!(changes[0].change, ChangeType::Removed);
    }
}
