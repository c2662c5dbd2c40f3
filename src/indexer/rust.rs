use crate::error::ParseError;
use crate::indexer::extract::{
    self, DependencyAnalyzer, ExtractedSymbols, ImportCandidate, LanguageSupport, ParseLimits,
    SymbolExtractor, UsageRules, field_text, line_span, node_text,
};
use crate::model::{Dependency, Symbol, SymbolKind};
use crate::util;
use std::rc::Rc;
use tree_sitter::{Node, Parser};

const LANGUAGE: &str = "rust";

static USAGE_RULES: UsageRules = UsageRules {
    identifier_kinds: &["identifier", "type_identifier", "field_identifier"],
    definition_kinds: &[
        "function_item",
        "function_signature_item",
        "struct_item",
        "enum_item",
        "union_item",
        "trait_item",
        "type_item",
        "const_item",
        "static_item",
        "mod_item",
        "field_declaration",
        "enum_variant",
    ],
    declarator_kinds: &[],
    import_kinds: &["use_declaration", "extern_crate_declaration"],
};

pub struct RustLanguage {
    limits: ParseLimits,
}

impl RustLanguage {
    pub fn new(limits: ParseLimits) -> Self {
        Self { limits }
    }
}

impl LanguageSupport for RustLanguage {
    fn language_name(&self) -> &str {
        LANGUAGE
    }

    fn extensions(&self) -> &[&'static str] {
        &[".rs"]
    }

    fn create_symbol_extractor(&self) -> Option<Box<dyn SymbolExtractor>> {
        match RustExtractor::with_limits(self.limits) {
            Ok(extractor) => Some(Box::new(extractor)),
            Err(err) => {
                tracing::warn!(language = LANGUAGE, error = %err, "extractor unavailable");
                None
            }
        }
    }

    fn create_dependency_analyzer(&self) -> Option<Box<dyn DependencyAnalyzer>> {
        match RustExtractor::with_limits(self.limits) {
            Ok(extractor) => Some(Box::new(extractor)),
            Err(err) => {
                tracing::warn!(language = LANGUAGE, error = %err, "analyzer unavailable");
                None
            }
        }
    }
}

#[derive(Clone, Default)]
struct Context {
    /// Type name of the enclosing `impl` or `trait`.
    container: Option<String>,
    enclosing_fn: Option<String>,
    /// Inline `mod x { .. }` nesting inside the current file.
    inline_mods: Vec<String>,
}

pub struct RustExtractor {
    parser: Parser,
    limits: ParseLimits,
}

impl RustExtractor {
    pub fn new() -> Result<Self, ParseError> {
        Self::with_limits(ParseLimits::default())
    }

    pub fn with_limits(limits: ParseLimits) -> Result<Self, ParseError> {
        let parser = extract::new_parser(tree_sitter_rust::LANGUAGE.into(), LANGUAGE)?;
        Ok(Self { parser, limits })
    }
}

impl SymbolExtractor for RustExtractor {
    fn extract(&mut self, file_path: &str, content: &str) -> Result<ExtractedSymbols, ParseError> {
        let tree = extract::parse_source(&mut self.parser, content, &self.limits)?;
        let root = tree.root_node();
        let mut output = ExtractedSymbols::default();
        walk_items(root, file_path, content, &mut output.symbols);
        output.usages = extract::collect_usages(root, content, &USAGE_RULES);
        Ok(output)
    }
}

impl DependencyAnalyzer for RustExtractor {
    fn analyze_imports(
        &mut self,
        file_path: &str,
        content: &str,
    ) -> Result<Vec<Dependency>, ParseError> {
        let tree = extract::parse_source(&mut self.parser, content, &self.limits)?;
        let mut deps = Vec::new();
        collect_dependencies(tree.root_node(), file_path, content, &mut deps);
        Ok(deps)
    }

    fn candidates(&self, dependency: &Dependency) -> Vec<ImportCandidate> {
        path_candidates(&dependency.source_file, &dependency.target_reference)
            .into_iter()
            .map(ImportCandidate::File)
            .collect()
    }
}

fn walk_items(root: Node<'_>, path: &str, source: &str, out: &mut Vec<Symbol>) {
    let mut stack = Vec::new();
    extract::push_children(&mut stack, root, &Rc::new(Context::default()));
    while let Some((node, ctx)) = stack.pop() {
        match node.kind() {
            "mod_item" => {
                let (Some(name), Some(body)) = (
                    field_text(node, "name", source),
                    node.child_by_field_name("body"),
                ) else {
                    continue;
                };
                let mut next = (*ctx).clone();
                next.inline_mods.push(name);
                extract::push_children(&mut stack, body, &Rc::new(next));
            }
            "struct_item" | "enum_item" | "union_item" | "type_item" => {
                push_named(node, SymbolKind::Class, &ctx, path, source, out);
            }
            "const_item" | "static_item" => {
                if ctx.enclosing_fn.is_none() {
                    push_named(node, SymbolKind::Variable, &ctx, path, source, out);
                }
            }
            "trait_item" => {
                let Some(name) = push_named(node, SymbolKind::Class, &ctx, path, source, out)
                else {
                    continue;
                };
                let mut next = (*ctx).clone();
                next.container = Some(name);
                if let Some(body) = node.child_by_field_name("body") {
                    extract::push_children(&mut stack, body, &Rc::new(next));
                }
            }
            "impl_item" => {
                let Some(type_name) = impl_type_name(node, source) else {
                    continue;
                };
                let mut next = (*ctx).clone();
                next.container = Some(type_name);
                next.enclosing_fn = None;
                if let Some(body) = node.child_by_field_name("body") {
                    extract::push_children(&mut stack, body, &Rc::new(next));
                }
            }
            "function_item" | "function_signature_item" => {
                let Some(name) = field_text(node, "name", source) else {
                    continue;
                };
                let (start, end) = line_span(node);
                let kind = if ctx.container.is_some() && ctx.enclosing_fn.is_none() {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                let parent = ctx.enclosing_fn.clone().or_else(|| ctx.container.clone());
                out.push(
                    Symbol::new(name.clone(), kind, path, start, end)
                        .with_signature(extract_signature(node, source))
                        .with_doc(doc_comment(node, source))
                        .with_parent(parent),
                );
                if let Some(body) = node.child_by_field_name("body") {
                    let next = Context {
                        container: None,
                        enclosing_fn: Some(name),
                        inline_mods: ctx.inline_mods.clone(),
                    };
                    extract::push_children(&mut stack, body, &Rc::new(next));
                }
            }
            "use_declaration" => {
                let (start, end) = line_span(node);
                let statement = util::squash_whitespace(&node_text(node, source));
                for entry in parse_use_declaration(&statement) {
                    let Some(bound) = entry.bound else {
                        continue;
                    };
                    out.push(
                        Symbol::new(bound, SymbolKind::Import, path, start, end)
                            .with_signature(Some(statement.clone()))
                            .with_parent(ctx.enclosing_fn.clone()),
                    );
                }
            }
            "macro_invocation" | "macro_definition" => {}
            _ => extract::push_children(&mut stack, node, &ctx),
        }
    }
}

fn push_named(
    node: Node<'_>,
    kind: SymbolKind,
    ctx: &Context,
    path: &str,
    source: &str,
    out: &mut Vec<Symbol>,
) -> Option<String> {
    let name = field_text(node, "name", source)?;
    let (start, end) = line_span(node);
    let signature = match node.kind() {
        "type_item" | "const_item" | "static_item" => field_text(node, "type", source),
        _ => None,
    };
    let parent = ctx.enclosing_fn.clone().or_else(|| ctx.container.clone());
    out.push(
        Symbol::new(name.clone(), kind, path, start, end)
            .with_signature(signature)
            .with_doc(doc_comment(node, source))
            .with_parent(parent),
    );
    Some(name)
}

fn impl_type_name(node: Node<'_>, source: &str) -> Option<String> {
    let mut ty = node.child_by_field_name("type")?;
    // `impl<T> Foo<T>` and `impl a::Foo` name the type by its last plain identifier.
    loop {
        match ty.kind() {
            "generic_type" => ty = ty.child_by_field_name("type")?,
            "scoped_type_identifier" => ty = ty.child_by_field_name("name")?,
            "reference_type" => ty = ty.child_by_field_name("type")?,
            _ => break,
        }
    }
    let name = node_text(ty, source);
    if name.is_empty() { None } else { Some(name) }
}

fn extract_signature(node: Node<'_>, source: &str) -> Option<String> {
    extract::format_signature(
        field_text(node, "parameters", source),
        field_text(node, "return_type", source),
    )
}

/// `///` comments above an item, skipping interleaved attributes.
fn doc_comment(node: Node<'_>, source: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = node.prev_named_sibling();
    while let Some(prev) = current {
        match prev.kind() {
            "attribute_item" => {}
            "line_comment" => {
                let text = node_text(prev, source);
                let Some(doc) = text.strip_prefix("///") else {
                    break;
                };
                lines.push(doc.trim().to_string());
            }
            _ => break,
        }
        current = prev.prev_named_sibling();
    }
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}

fn collect_dependencies(root: Node<'_>, path: &str, source: &str, deps: &mut Vec<Dependency>) {
    let mut stack = Vec::new();
    extract::push_children(&mut stack, root, &Rc::new(Vec::<String>::new()));
    while let Some((node, inline_mods)) = stack.pop() {
        match node.kind() {
            "mod_item" => {
                let Some(name) = field_text(node, "name", source) else {
                    continue;
                };
                let mut nested = (*inline_mods).clone();
                nested.push(name);
                match node.child_by_field_name("body") {
                    Some(body) => extract::push_children(&mut stack, body, &Rc::new(nested)),
                    None => {
                        let line = node.start_position().row + 1;
                        let reference = format!("self::{}", nested.join("::"));
                        deps.push(Dependency::new(path, reference, line));
                    }
                }
            }
            "use_declaration" => {
                let line = node.start_position().row + 1;
                let statement = util::squash_whitespace(&node_text(node, source));
                for entry in parse_use_declaration(&statement) {
                    let Some(reference) = rebase_relative(&entry.path, &inline_mods) else {
                        continue;
                    };
                    let names = entry.path.rsplit("::").next().map(str::to_string);
                    let dep = Dependency::new(path, reference, line);
                    deps.push(if entry.glob { dep } else { dep.with_names(names) });
                }
            }
            "macro_invocation" | "macro_definition" => {}
            _ => extract::push_children(&mut stack, node, &inline_mods),
        }
    }
}

/// Rewrites `self::`/`super::` paths written inside inline modules so they are relative to
/// the file's own module.
fn rebase_relative(path: &str, inline_mods: &[String]) -> Option<String> {
    let segments: Vec<&str> = path.split("::").filter(|s| !s.is_empty()).collect();
    let first = *segments.first()?;
    if inline_mods.is_empty() || !matches!(first, "self" | "super") {
        return Some(path.to_string());
    }
    let supers = segments.iter().take_while(|s| **s == "super").count();
    let rest: Vec<&str> = if first == "self" {
        segments[1..].to_vec()
    } else {
        segments[supers..].to_vec()
    };
    let mut out: Vec<String> = Vec::new();
    if supers > inline_mods.len() {
        out.extend(std::iter::repeat_n("super".to_string(), supers - inline_mods.len()));
    } else {
        out.push("self".to_string());
        out.extend(inline_mods[..inline_mods.len() - supers].iter().cloned());
    }
    out.extend(rest.iter().map(|s| s.to_string()));
    Some(out.join("::"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseEntry {
    pub path: String,
    /// Name introduced into scope, `None` for globs.
    pub bound: Option<String>,
    pub glob: bool,
}

/// Deeper brace nesting in one `use` is not expanded.
const MAX_USE_NESTING: usize = 32;

pub fn parse_use_declaration(text: &str) -> Vec<UseEntry> {
    if brace_depth(text) > MAX_USE_NESTING {
        return Vec::new();
    }
    let cleaned = text.trim().trim_end_matches(';').trim();
    let rest = match cleaned.find("use ") {
        Some(idx) if cleaned[..idx].trim().is_empty() || cleaned[..idx].trim().starts_with("pub") => {
            cleaned[idx + 4..].trim()
        }
        _ => cleaned,
    };
    if rest.is_empty() {
        return Vec::new();
    }
    expand_use_tree(rest.trim_start_matches("::"))
}

fn expand_use_tree(input: &str) -> Vec<UseEntry> {
    let input = input.trim();
    if input.is_empty() {
        return Vec::new();
    }
    if let Some((before, inner)) = split_outer_braces(input) {
        let base = before.trim().trim_end_matches("::").trim().to_string();
        let mut results = Vec::new();
        for item in split_top_level(&inner, ',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let combined = if base.is_empty() {
                item.to_string()
            } else {
                format!("{base}::{item}")
            };
            results.extend(expand_use_tree(&combined));
        }
        return results;
    }

    let (main, alias) = match input.split_once(" as ") {
        Some((left, right)) => (left.trim(), Some(right.trim().to_string())),
        None => (input, None),
    };
    if let Some(base) = main.strip_suffix("*") {
        let base = base.trim_end_matches("::");
        if base.is_empty() {
            return Vec::new();
        }
        return vec![UseEntry {
            path: base.to_string(),
            bound: None,
            glob: true,
        }];
    }
    let main = main.strip_suffix("::self").unwrap_or(main);
    if main.is_empty() || main == "self" {
        return Vec::new();
    }
    let last = main.rsplit("::").next().unwrap_or(main).to_string();
    let bound = match alias {
        Some(alias) if alias == "_" => None,
        Some(alias) => Some(alias),
        None => Some(last),
    };
    vec![UseEntry {
        path: main.to_string(),
        bound,
        glob: false,
    }]
}

fn brace_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0;
    for ch in text.chars() {
        match ch {
            '{' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

fn split_outer_braces(input: &str) -> Option<(String, String)> {
    let mut depth = 0;
    let mut start = None;
    for (idx, ch) in input.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let start_idx = start?;
                    return Some((
                        input[..start_idx].to_string(),
                        input[start_idx + 1..idx].to_string(),
                    ));
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(input: &str, delimiter: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0;
    let mut start = 0;
    for (idx, ch) in input.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            _ if ch == delimiter && depth == 0 => {
                parts.push(input[start..idx].to_string());
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(input[start..].to_string());
    parts
}

/// Directory holding the child modules of the module defined by `rel_path`.
pub fn module_base_dir(rel_path: &str) -> String {
    let parent = util::parent_dir(rel_path);
    let stem = util::file_stem(rel_path);
    if matches!(stem, "lib" | "main" | "mod") || stem.is_empty() {
        parent.to_string()
    } else if parent.is_empty() {
        stem.to_string()
    } else {
        format!("{parent}/{stem}")
    }
}

fn crate_src_dir(rel_path: &str) -> Option<String> {
    let mut dir = util::parent_dir(rel_path);
    loop {
        if util::file_name(dir) == "src" {
            return Some(dir.to_string());
        }
        if dir.is_empty() {
            return None;
        }
        dir = util::parent_dir(dir);
    }
}

/// Candidate files for a `crate::`/`self::`/`super::` path, longest module prefix first.
pub fn path_candidates(source_file: &str, reference: &str) -> Vec<String> {
    let segments: Vec<&str> = reference.split("::").filter(|s| !s.is_empty()).collect();
    let Some(first) = segments.first() else {
        return Vec::new();
    };
    let (anchor, rest, root_files): (String, &[&str], Vec<String>) = match *first {
        "crate" => {
            let Some(src) = crate_src_dir(source_file) else {
                return Vec::new();
            };
            let roots = vec![join(&src, "lib.rs"), join(&src, "main.rs")];
            (src, &segments[1..], roots)
        }
        "self" => (module_base_dir(source_file), &segments[1..], Vec::new()),
        "super" => {
            let supers = segments.iter().take_while(|s| **s == "super").count();
            let mut dir = module_base_dir(source_file);
            for _ in 0..supers {
                if dir.is_empty() {
                    return Vec::new();
                }
                dir = util::parent_dir(&dir).to_string();
            }
            let roots = parent_module_files(&dir);
            (dir, &segments[supers..], roots)
        }
        _ => return Vec::new(),
    };
    let mut out = Vec::new();
    for len in (1..=rest.len()).rev() {
        let module = join(&anchor, &rest[..len].join("/"));
        out.push(format!("{module}.rs"));
        out.push(format!("{module}/mod.rs"));
    }
    out.extend(root_files);
    out.retain(|candidate| candidate != source_file);
    out.dedup();
    out
}

/// Files that can define the module whose children live in `dir`.
fn parent_module_files(dir: &str) -> Vec<String> {
    if dir.is_empty() {
        return Vec::new();
    }
    if util::file_name(dir) == "src" {
        return vec![join(dir, "lib.rs"), join(dir, "main.rs")];
    }
    vec![format!("{dir}.rs"), join(dir, "mod.rs")]
}

fn join(base: &str, rel: &str) -> String {
    if base.is_empty() {
        rel.to_string()
    } else {
        format!("{base}/{rel}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_tree_expansion_binds_names() {
        let entries = parse_use_declaration("pub use crate::a::{b::{C, D as E}, self, f::*};");
        let got: Vec<_> = entries
            .iter()
            .map(|e| (e.path.as_str(), e.bound.as_deref(), e.glob))
            .collect();
        assert_eq!(
            got,
            vec![
                ("crate::a::b::C", Some("C"), false),
                ("crate::a::b::D", Some("E"), false),
                ("crate::a", Some("a"), false),
                ("crate::a::f", None, true),
            ]
        );
    }

    #[test]
    fn deeply_nested_use_trees_are_not_expanded() {
        let deep = format!("use a::{}b{};", "{".repeat(5_000), "}".repeat(5_000));
        assert!(parse_use_declaration(&deep).is_empty());
        let shallow = format!("use a::{}b{};", "{".repeat(3), "}".repeat(3));
        assert_eq!(parse_use_declaration(&shallow).len(), 1);
    }

    #[test]
    fn module_dirs() {
        assert_eq!(module_base_dir("src/lib.rs"), "src");
        assert_eq!(module_base_dir("src/indexer/mod.rs"), "src/indexer");
        assert_eq!(module_base_dir("src/indexer/scan.rs"), "src/indexer/scan");
    }

    #[test]
    fn crate_paths_try_longest_prefix_first() {
        let got = path_candidates("src/context.rs", "crate::indexer::scan::scan_paths");
        assert_eq!(
            got,
            vec![
                "src/indexer/scan/scan_paths.rs",
                "src/indexer/scan/scan_paths/mod.rs",
                "src/indexer/scan.rs",
                "src/indexer/scan/mod.rs",
                "src/indexer.rs",
                "src/indexer/mod.rs",
                "src/lib.rs",
                "src/main.rs",
            ]
        );
    }

    #[test]
    fn relative_paths_and_externals() {
        assert_eq!(
            path_candidates("src/indexer/mod.rs", "self::python"),
            vec!["src/indexer/python.rs", "src/indexer/python/mod.rs"]
        );
        assert_eq!(
            path_candidates("src/indexer/python.rs", "super::extract::Symbol"),
            vec![
                "src/indexer/extract/Symbol.rs",
                "src/indexer/extract/Symbol/mod.rs",
                "src/indexer/extract.rs",
                "src/indexer/extract/mod.rs",
                "src/indexer.rs",
                "src/indexer/mod.rs",
            ]
        );
        assert!(path_candidates("src/lib.rs", "std::collections::HashMap").is_empty());
        assert!(path_candidates("tests/it.rs", "crate::x").is_empty());
    }

    #[test]
    fn inline_module_paths_are_rebased() {
        let inline = vec!["outer".to_string(), "inner".to_string()];
        assert_eq!(
            rebase_relative("super::x", &inline).as_deref(),
            Some("self::outer::x")
        );
        assert_eq!(
            rebase_relative("super::super::super::y", &inline).as_deref(),
            Some("super::y")
        );
        assert_eq!(rebase_relative("crate::z", &inline).as_deref(), Some("crate::z"));
    }
}
