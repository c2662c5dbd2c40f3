use crate::error::ParseError;
use crate::indexer::extract::{
    self, DependencyAnalyzer, ExtractedSymbols, ImportCandidate, LanguageSupport, ParseLimits,
    SymbolExtractor, UsageRules, field_text, line_span, node_text,
};
use crate::model::{Dependency, Symbol, SymbolKind};
use crate::util;
use std::rc::Rc;
use tree_sitter::{Node, Parser};

const LANGUAGE: &str = "python";

static USAGE_RULES: UsageRules = UsageRules {
    identifier_kinds: &["identifier"],
    definition_kinds: &["function_definition", "class_definition"],
    declarator_kinds: &[],
    import_kinds: &[
        "import_statement",
        "import_from_statement",
        "future_import_statement",
    ],
};

pub struct PythonLanguage {
    limits: ParseLimits,
}

impl PythonLanguage {
    pub fn new(limits: ParseLimits) -> Self {
        Self { limits }
    }
}

impl LanguageSupport for PythonLanguage {
    fn language_name(&self) -> &str {
        LANGUAGE
    }

    fn extensions(&self) -> &[&'static str] {
        &[".py", ".pyi", ".pyw"]
    }

    fn create_symbol_extractor(&self) -> Option<Box<dyn SymbolExtractor>> {
        match PythonExtractor::with_limits(self.limits) {
            Ok(extractor) => Some(Box::new(extractor)),
            Err(err) => {
                tracing::warn!(language = LANGUAGE, error = %err, "extractor unavailable");
                None
            }
        }
    }

    fn create_dependency_analyzer(&self) -> Option<Box<dyn DependencyAnalyzer>> {
        match PythonExtractor::with_limits(self.limits) {
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
    class_name: Option<String>,
    enclosing_fn: Option<String>,
}

impl Context {
    fn in_function(&self) -> bool {
        self.enclosing_fn.is_some()
    }
}

pub struct PythonExtractor {
    parser: Parser,
    limits: ParseLimits,
}

impl PythonExtractor {
    pub fn new() -> Result<Self, ParseError> {
        Self::with_limits(ParseLimits::default())
    }

    pub fn with_limits(limits: ParseLimits) -> Result<Self, ParseError> {
        let parser = extract::new_parser(tree_sitter_python::LANGUAGE.into(), LANGUAGE)?;
        Ok(Self { parser, limits })
    }
}

impl SymbolExtractor for PythonExtractor {
    fn extract(&mut self, file_path: &str, content: &str) -> Result<ExtractedSymbols, ParseError> {
        let tree = extract::parse_source(&mut self.parser, content, &self.limits)?;
        let root = tree.root_node();
        let mut output = ExtractedSymbols::default();
        walk_module(root, file_path, content, &mut output.symbols);
        output.usages = extract::collect_usages(root, content, &USAGE_RULES);
        Ok(output)
    }
}

impl DependencyAnalyzer for PythonExtractor {
    fn analyze_imports(
        &mut self,
        file_path: &str,
        content: &str,
    ) -> Result<Vec<Dependency>, ParseError> {
        let tree = extract::parse_source(&mut self.parser, content, &self.limits)?;
        let mut deps = Vec::new();
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "import_statement" | "import_from_statement" => {
                    deps.extend(import_dependencies(node, file_path, content));
                    continue;
                }
                "future_import_statement" => continue,
                _ => {}
            }
            let mut cursor = node.walk();
            let children: Vec<_> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        Ok(deps)
    }

    fn candidates(&self, dependency: &Dependency) -> Vec<ImportCandidate> {
        module_candidates(
            &dependency.source_file,
            &dependency.target_reference,
            &dependency.imported_names,
        )
        .into_iter()
        .map(ImportCandidate::File)
        .collect()
    }
}

fn walk_module(root: Node<'_>, path: &str, source: &str, out: &mut Vec<Symbol>) {
    let mut stack = Vec::new();
    extract::push_children(&mut stack, root, &Rc::new(Context::default()));
    while let Some((node, ctx)) = stack.pop() {
        match node.kind() {
            "decorated_definition" => {
                if let Some(definition) = node.child_by_field_name("definition") {
                    stack.push((definition, ctx));
                }
            }
            "class_definition" => {
                let Some(name) = field_text(node, "name", source) else {
                    continue;
                };
                let (start, end) = line_span(node);
                let doc = node
                    .child_by_field_name("body")
                    .and_then(|body| extract_docstring(body, source));
                let signature = field_text(node, "superclasses", source);
                out.push(
                    Symbol::new(name.clone(), SymbolKind::Class, path, start, end)
                        .with_signature(signature)
                        .with_doc(doc)
                        .with_parent(ctx.enclosing_fn.clone().or_else(|| ctx.class_name.clone())),
                );
                let next = Rc::new(Context {
                    class_name: Some(name),
                    enclosing_fn: None,
                });
                if let Some(body) = node.child_by_field_name("body") {
                    extract::push_children(&mut stack, body, &next);
                }
            }
            "function_definition" | "async_function_definition" => {
                let Some(name) = field_text(node, "name", source) else {
                    continue;
                };
                let (start, end) = line_span(node);
                let kind = if ctx.class_name.is_some() && !ctx.in_function() {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                let doc = node
                    .child_by_field_name("body")
                    .and_then(|body| extract_docstring(body, source));
                let parent = ctx.enclosing_fn.clone().or_else(|| ctx.class_name.clone());
                out.push(
                    Symbol::new(name.clone(), kind, path, start, end)
                        .with_signature(extract_signature(node, source))
                        .with_doc(doc)
                        .with_parent(parent),
                );
                let next = Rc::new(Context {
                    class_name: ctx.class_name.clone(),
                    enclosing_fn: Some(name),
                });
                if let Some(body) = node.child_by_field_name("body") {
                    extract::push_children(&mut stack, body, &next);
                }
            }
            "import_statement" | "import_from_statement" => {
                let (start, end) = line_span(node);
                let statement = util::squash_whitespace(&node_text(node, source));
                for bound in bound_import_names(node, source) {
                    out.push(
                        Symbol::new(bound, SymbolKind::Import, path, start, end)
                            .with_signature(Some(statement.clone()))
                            .with_parent(ctx.enclosing_fn.clone()),
                    );
                }
            }
            "expression_statement" => {
                if ctx.in_function() {
                    continue;
                }
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if child.kind() == "assignment" {
                        handle_assignment(child, &ctx, path, source, out);
                    }
                }
            }
            // Compound statements keep their bodies in nested blocks.
            "if_statement" | "try_statement" | "with_statement" | "for_statement"
            | "while_statement" | "else_clause" | "elif_clause" | "except_clause"
            | "finally_clause" | "block" => {
                extract::push_children(&mut stack, node, &ctx);
            }
            _ => {}
        }
    }
}

fn handle_assignment(node: Node<'_>, ctx: &Context, path: &str, source: &str, out: &mut Vec<Symbol>) {
    let Some(left) = node.child_by_field_name("left") else {
        return;
    };
    if left.kind() != "identifier" {
        return;
    }
    let name = node_text(left, source);
    if name.is_empty() {
        return;
    }
    let (start, end) = line_span(node);
    let signature = field_text(node, "type", source);
    out.push(
        Symbol::new(name, SymbolKind::Variable, path, start, end)
            .with_signature(signature)
            .with_parent(ctx.class_name.clone()),
    );
}

fn extract_signature(node: Node<'_>, source: &str) -> Option<String> {
    extract::format_signature(
        field_text(node, "parameters", source),
        field_text(node, "return_type", source),
    )
}

fn extract_docstring(body: Node<'_>, source: &str) -> Option<String> {
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string_node = first.named_child(0)?;
    if string_node.kind() != "string" {
        return None;
    }
    let raw = node_text(string_node, source);
    let doc = unquote_string_literal(&raw).unwrap_or(raw);
    let doc = doc.trim();
    if doc.is_empty() {
        None
    } else {
        Some(doc.to_string())
    }
}

fn unquote_string_literal(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let prefix = trimmed
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_alphabetic())
        .map(|(idx, _)| idx)
        .unwrap_or(trimmed.len());
    let rest = &trimmed[prefix..];
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if rest.len() >= quote.len() * 2 && rest.starts_with(quote) && rest.ends_with(quote) {
            return Some(rest[quote.len()..rest.len() - quote.len()].to_string());
        }
    }
    None
}

/// Names an import statement binds in the importing scope.
fn bound_import_names(node: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.children_by_field_name("name", &mut cursor) {
        match child.kind() {
            "aliased_import" => {
                if let Some(alias) = field_text(child, "alias", source) {
                    names.push(alias);
                }
            }
            "dotted_name" => {
                let text = node_text(child, source);
                let bound = if node.kind() == "import_statement" {
                    text.split('.').next().unwrap_or_default().to_string()
                } else {
                    text.rsplit('.').next().unwrap_or_default().to_string()
                };
                if !bound.is_empty() {
                    names.push(bound);
                }
            }
            _ => {}
        }
    }
    names
}

fn import_dependencies(node: Node<'_>, path: &str, source: &str) -> Vec<Dependency> {
    let line = node.start_position().row + 1;
    let mut deps = Vec::new();
    let mut cursor = node.walk();
    if node.kind() == "import_statement" {
        for child in node.children_by_field_name("name", &mut cursor) {
            let module = match child.kind() {
                "aliased_import" => field_text(child, "name", source),
                "dotted_name" => Some(node_text(child, source)),
                _ => None,
            };
            if let Some(module) = module.filter(|m| !m.is_empty()) {
                deps.push(Dependency::new(path, module, line));
            }
        }
        return deps;
    }
    let Some(module) = field_text(node, "module_name", source) else {
        return deps;
    };
    let mut names = Vec::new();
    for child in node.children_by_field_name("name", &mut cursor) {
        let name = match child.kind() {
            "aliased_import" => field_text(child, "name", source),
            "dotted_name" => Some(node_text(child, source)),
            _ => None,
        };
        names.extend(name);
    }
    let module = util::squash_whitespace(&module).replace(' ', "");
    deps.push(Dependency::new(path, module, line).with_names(names));
    deps
}

/// Candidate files for a module reference, nearest anchor first.
pub fn module_candidates<'a, I>(source_file: &str, reference: &str, names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let dots = reference.chars().take_while(|ch| *ch == '.').count();
    let parts: Vec<&str> = reference[dots..]
        .split('.')
        .filter(|part| !part.is_empty())
        .collect();
    let source_dir = util::parent_dir(source_file);
    let anchors = if dots > 0 {
        match climb(source_dir, dots - 1) {
            Some(anchor) => vec![anchor],
            None => return Vec::new(),
        }
    } else {
        ancestors(source_dir)
    };
    let names: Vec<&String> = names.into_iter().collect();
    let mut out = Vec::new();
    for anchor in anchors {
        let module = join_parts(&anchor, &parts);
        if !parts.is_empty() {
            push_unique(&mut out, format!("{module}.py"));
            push_unique(&mut out, format!("{module}/__init__.py"));
        }
        for name in &names {
            let sub = join_parts(&module, &[name.as_str()]);
            push_unique(&mut out, format!("{sub}.py"));
            push_unique(&mut out, format!("{sub}/__init__.py"));
        }
    }
    out
}

fn climb(dir: &str, levels: usize) -> Option<String> {
    let mut current = dir.to_string();
    for _ in 0..levels {
        if current.is_empty() {
            return None;
        }
        current = util::parent_dir(&current).to_string();
    }
    Some(current)
}

fn ancestors(dir: &str) -> Vec<String> {
    let mut out = vec![dir.to_string()];
    let mut current = dir;
    while !current.is_empty() {
        current = util::parent_dir(current);
        out.push(current.to_string());
    }
    out
}

fn join_parts(base: &str, parts: &[&str]) -> String {
    let mut segments: Vec<&str> = Vec::new();
    if !base.is_empty() {
        segments.push(base);
    }
    segments.extend(parts.iter().copied());
    segments.join("/")
}

fn push_unique(out: &mut Vec<String>, value: String) {
    if !value.starts_with('/') && !out.contains(&value) {
        out.push(value);
    }
}
