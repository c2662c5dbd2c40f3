use crate::error::ParseError;
use crate::indexer::extract::{
    self, DependencyAnalyzer, ExtractedSymbols, ImportCandidate, LanguageSupport, ParseLimits,
    SymbolExtractor, UsageRules, field_text, line_span, node_text,
};
use crate::model::{Dependency, Symbol, SymbolKind};
use tree_sitter::{Node, Parser};

pub const LANGUAGE: &str = "go";

static USAGE_RULES: UsageRules = UsageRules {
    identifier_kinds: &[
        "identifier",
        "type_identifier",
        "field_identifier",
        "package_identifier",
    ],
    definition_kinds: &[
        "function_declaration",
        "method_declaration",
        "type_spec",
        "type_alias",
        "const_spec",
        "var_spec",
        "field_declaration",
        "method_elem",
        "method_spec",
    ],
    declarator_kinds: &[],
    import_kinds: &["import_declaration", "package_clause"],
};

pub struct GoLanguage {
    limits: ParseLimits,
}

impl GoLanguage {
    pub fn new(limits: ParseLimits) -> Self {
        Self { limits }
    }
}

impl LanguageSupport for GoLanguage {
    fn language_name(&self) -> &str {
        LANGUAGE
    }

    fn extensions(&self) -> &[&'static str] {
        &[".go"]
    }

    fn create_symbol_extractor(&self) -> Option<Box<dyn SymbolExtractor>> {
        match GoExtractor::with_limits(self.limits) {
            Ok(extractor) => Some(Box::new(extractor)),
            Err(err) => {
                tracing::warn!(language = LANGUAGE, error = %err, "extractor unavailable");
                None
            }
        }
    }

    fn create_dependency_analyzer(&self) -> Option<Box<dyn DependencyAnalyzer>> {
        match GoExtractor::with_limits(self.limits) {
            Ok(extractor) => Some(Box::new(extractor)),
            Err(err) => {
                tracing::warn!(language = LANGUAGE, error = %err, "analyzer unavailable");
                None
            }
        }
    }
}

pub struct GoExtractor {
    parser: Parser,
    limits: ParseLimits,
}

impl GoExtractor {
    pub fn new() -> Result<Self, ParseError> {
        Self::with_limits(ParseLimits::default())
    }

    pub fn with_limits(limits: ParseLimits) -> Result<Self, ParseError> {
        let parser = extract::new_parser(tree_sitter_go::LANGUAGE.into(), LANGUAGE)?;
        Ok(Self { parser, limits })
    }
}

impl SymbolExtractor for GoExtractor {
    fn extract(&mut self, file_path: &str, content: &str) -> Result<ExtractedSymbols, ParseError> {
        let tree = extract::parse_source(&mut self.parser, content, &self.limits)?;
        let root = tree.root_node();
        let mut output = ExtractedSymbols::default();
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            walk_top_level(node, file_path, content, &mut output.symbols);
        }
        output.usages = extract::collect_usages(root, content, &USAGE_RULES);
        Ok(output)
    }
}

impl DependencyAnalyzer for GoExtractor {
    fn analyze_imports(
        &mut self,
        file_path: &str,
        content: &str,
    ) -> Result<Vec<Dependency>, ParseError> {
        let tree = extract::parse_source(&mut self.parser, content, &self.limits)?;
        let root = tree.root_node();
        let mut specs = Vec::new();
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            if node.kind() == "import_declaration" {
                collect_import_specs(node, &mut specs);
            }
        }
        let deps = specs
            .into_iter()
            .filter_map(|spec| {
                let import_path = spec
                    .child_by_field_name("path")
                    .and_then(|path| unquote_go_string(&node_text(path, content)))?;
                let line = spec.start_position().row + 1;
                Some(Dependency::new(file_path, import_path, line))
            })
            .collect();
        Ok(deps)
    }

    fn candidates(&self, dependency: &Dependency) -> Vec<ImportCandidate> {
        package_dirs(&dependency.target_reference)
            .into_iter()
            .map(|dir| ImportCandidate::Package {
                dir,
                language: LANGUAGE.to_string(),
            })
            .collect()
    }
}

fn walk_top_level(node: Node<'_>, path: &str, source: &str, out: &mut Vec<Symbol>) {
    match node.kind() {
        "function_declaration" => {
            let Some(name) = field_text(node, "name", source) else {
                return;
            };
            let (start, end) = line_span(node);
            out.push(
                Symbol::new(name, SymbolKind::Function, path, start, end)
                    .with_signature(extract_signature(node, source))
                    .with_doc(extract::leading_comment_doc(node, source, &["//"])),
            );
        }
        "method_declaration" => {
            let Some(name) = field_text(node, "name", source) else {
                return;
            };
            let (start, end) = line_span(node);
            out.push(
                Symbol::new(name, SymbolKind::Method, path, start, end)
                    .with_signature(extract_signature(node, source))
                    .with_doc(extract::leading_comment_doc(node, source, &["//"]))
                    .with_parent(extract_receiver_type(node, source)),
            );
        }
        "type_declaration" => {
            let doc = extract::leading_comment_doc(node, source, &["//"]);
            let mut cursor = node.walk();
            for spec in node.named_children(&mut cursor) {
                if !matches!(spec.kind(), "type_spec" | "type_alias") {
                    continue;
                }
                let Some(name) = field_text(spec, "name", source) else {
                    continue;
                };
                let (start, end) = line_span(spec);
                out.push(
                    Symbol::new(name, SymbolKind::Class, path, start, end).with_doc(doc.clone()),
                );
            }
        }
        "const_declaration" | "var_declaration" => {
            let mut specs = Vec::new();
            collect_value_specs(node, &mut specs);
            for spec in specs {
                let (start, end) = line_span(spec);
                let ty = field_text(spec, "type", source);
                let mut cursor = spec.walk();
                for name_node in spec.children_by_field_name("name", &mut cursor) {
                    let name = node_text(name_node, source);
                    if name.is_empty() || name == "_" {
                        continue;
                    }
                    out.push(
                        Symbol::new(name, SymbolKind::Variable, path, start, end)
                            .with_signature(ty.clone()),
                    );
                }
            }
        }
        "import_declaration" => {
            let mut specs = Vec::new();
            collect_import_specs(node, &mut specs);
            for spec in specs {
                let Some(bound) = bound_import_name(spec, source) else {
                    continue;
                };
                let (start, end) = line_span(spec);
                let statement = node_text(spec, source);
                out.push(
                    Symbol::new(bound, SymbolKind::Import, path, start, end)
                        .with_signature(Some(statement)),
                );
            }
        }
        _ => {}
    }
}

fn collect_value_specs<'a>(node: Node<'a>, out: &mut Vec<Node<'a>>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "const_spec" | "var_spec" => out.push(child),
            "var_spec_list" => collect_value_specs(child, out),
            _ => {}
        }
    }
}

fn collect_import_specs<'a>(node: Node<'a>, out: &mut Vec<Node<'a>>) {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        if node.kind() == "import_spec" {
            out.push(node);
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'a>> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
}

fn bound_import_name(spec: Node<'_>, source: &str) -> Option<String> {
    if let Some(alias) = spec.child_by_field_name("name") {
        return match alias.kind() {
            "package_identifier" => Some(node_text(alias, source)),
            _ => None,
        };
    }
    let path = unquote_go_string(&node_text(spec.child_by_field_name("path")?, source))?;
    let last = path.rsplit('/').next()?;
    // `gopkg.in/yaml.v3` binds `yaml`; `.../v2` binds the segment before it.
    let last = if is_major_version(last) {
        path.rsplit('/').nth(1)?
    } else {
        last
    };
    let bound = last.split('.').next().unwrap_or(last).replace('-', "_");
    if bound.is_empty() { None } else { Some(bound) }
}

fn is_major_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_digit()))
}

fn extract_receiver_type(node: Node<'_>, source: &str) -> Option<String> {
    let receiver = node.child_by_field_name("receiver")?;
    let mut cursor = receiver.walk();
    for child in receiver.named_children(&mut cursor) {
        if child.kind() != "parameter_declaration" {
            continue;
        }
        let Some(type_node) = child.child_by_field_name("type") else {
            continue;
        };
        let type_text = node_text(type_node, source);
        let type_text = type_text.trim_start_matches('*').trim();
        let type_text = type_text.split('[').next().unwrap_or(type_text).trim();
        if !type_text.is_empty() {
            return Some(type_text.to_string());
        }
    }
    None
}

fn extract_signature(node: Node<'_>, source: &str) -> Option<String> {
    extract::format_signature(
        field_text(node, "parameters", source),
        field_text(node, "result", source),
    )
}

fn unquote_go_string(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('`').and_then(|s| s.strip_suffix('`')))?;
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

/// Directory suffixes an import path may map to inside the repository, longest first.
pub fn package_dirs(import_path: &str) -> Vec<String> {
    let segments: Vec<&str> = import_path.split('/').filter(|s| !s.is_empty()).collect();
    (0..segments.len())
        .map(|start| segments[start..].join("/"))
        .collect()
}
