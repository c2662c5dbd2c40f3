use crate::error::ParseError;
use crate::indexer::extract::{
    self, DependencyAnalyzer, ExtractedSymbols, ImportCandidate, LanguageSupport, ParseLimits,
    SymbolExtractor, UsageRules, field_text, line_span, node_text,
};
use crate::model::{Dependency, Symbol, SymbolKind};
use crate::util;
use std::rc::Rc;
use tree_sitter::{Node, Parser};

/// Resolution order for extensionless relative specifiers.
const RESOLVE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "d.ts"];
const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"];

static USAGE_RULES: UsageRules = UsageRules {
    identifier_kinds: &[
        "identifier",
        "property_identifier",
        "type_identifier",
        "shorthand_property_identifier",
    ],
    definition_kinds: &[
        "function_declaration",
        "generator_function_declaration",
        "class_declaration",
        "abstract_class_declaration",
        "method_definition",
        "abstract_method_signature",
        "interface_declaration",
        "type_alias_declaration",
        "enum_declaration",
        "variable_declarator",
    ],
    declarator_kinds: &[],
    import_kinds: &["import_statement"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    JavaScript,
    TypeScript,
}

impl Dialect {
    fn name(self) -> &'static str {
        match self {
            Dialect::JavaScript => "javascript",
            Dialect::TypeScript => "typescript",
        }
    }
}

pub struct JavaScriptLanguage {
    limits: ParseLimits,
}

impl JavaScriptLanguage {
    pub fn new(limits: ParseLimits) -> Self {
        Self { limits }
    }
}

pub struct TypeScriptLanguage {
    limits: ParseLimits,
}

impl TypeScriptLanguage {
    pub fn new(limits: ParseLimits) -> Self {
        Self { limits }
    }
}

fn build(dialect: Dialect, limits: ParseLimits) -> Option<ScriptExtractor> {
    let built = match dialect {
        Dialect::JavaScript => ScriptExtractor::javascript(limits),
        Dialect::TypeScript => ScriptExtractor::typescript(limits),
    };
    match built {
        Ok(extractor) => Some(extractor),
        Err(err) => {
            tracing::warn!(language = dialect.name(), error = %err, "extractor unavailable");
            None
        }
    }
}

impl LanguageSupport for JavaScriptLanguage {
    fn language_name(&self) -> &str {
        Dialect::JavaScript.name()
    }

    fn extensions(&self) -> &[&'static str] {
        &[".js", ".jsx", ".mjs", ".cjs"]
    }

    fn create_symbol_extractor(&self) -> Option<Box<dyn SymbolExtractor>> {
        build(Dialect::JavaScript, self.limits).map(|e| Box::new(e) as Box<dyn SymbolExtractor>)
    }

    fn create_dependency_analyzer(&self) -> Option<Box<dyn DependencyAnalyzer>> {
        build(Dialect::JavaScript, self.limits).map(|e| Box::new(e) as Box<dyn DependencyAnalyzer>)
    }
}

impl LanguageSupport for TypeScriptLanguage {
    fn language_name(&self) -> &str {
        Dialect::TypeScript.name()
    }

    fn extensions(&self) -> &[&'static str] {
        &[".ts", ".tsx", ".mts", ".cts", ".d.ts"]
    }

    fn create_symbol_extractor(&self) -> Option<Box<dyn SymbolExtractor>> {
        build(Dialect::TypeScript, self.limits).map(|e| Box::new(e) as Box<dyn SymbolExtractor>)
    }

    fn create_dependency_analyzer(&self) -> Option<Box<dyn DependencyAnalyzer>> {
        build(Dialect::TypeScript, self.limits).map(|e| Box::new(e) as Box<dyn DependencyAnalyzer>)
    }
}

/// Extractor for JavaScript and TypeScript. TypeScript files ending in `.tsx` use the TSX
/// grammar.
pub struct ScriptExtractor {
    parser: Parser,
    tsx_parser: Option<Parser>,
    limits: ParseLimits,
}

impl ScriptExtractor {
    pub fn javascript(limits: ParseLimits) -> Result<Self, ParseError> {
        let parser = extract::new_parser(tree_sitter_javascript::LANGUAGE.into(), "javascript")?;
        Ok(Self {
            parser,
            tsx_parser: None,
            limits,
        })
    }

    pub fn typescript(limits: ParseLimits) -> Result<Self, ParseError> {
        let parser = extract::new_parser(
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            "typescript",
        )?;
        let tsx_parser = extract::new_parser(tree_sitter_typescript::LANGUAGE_TSX.into(), "tsx")?;
        Ok(Self {
            parser,
            tsx_parser: Some(tsx_parser),
            limits,
        })
    }

    fn parse(&mut self, file_path: &str, content: &str) -> Result<tree_sitter::Tree, ParseError> {
        let use_tsx = file_path.to_ascii_lowercase().ends_with(".tsx");
        let parser = match (&mut self.tsx_parser, use_tsx) {
            (Some(tsx), true) => tsx,
            _ => &mut self.parser,
        };
        extract::parse_source(parser, content, &self.limits)
    }
}

impl SymbolExtractor for ScriptExtractor {
    fn extract(&mut self, file_path: &str, content: &str) -> Result<ExtractedSymbols, ParseError> {
        let tree = self.parse(file_path, content)?;
        let root = tree.root_node();
        let mut output = ExtractedSymbols::default();
        walk_program(root, file_path, content, &mut output.symbols);
        output.usages = extract::collect_usages(root, content, &USAGE_RULES);
        Ok(output)
    }
}

impl DependencyAnalyzer for ScriptExtractor {
    fn analyze_imports(
        &mut self,
        file_path: &str,
        content: &str,
    ) -> Result<Vec<Dependency>, ParseError> {
        let tree = self.parse(file_path, content)?;
        let mut deps = Vec::new();
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "import_statement" | "export_statement" => {
                    if let Some(dep) = module_dependency(node, file_path, content) {
                        deps.push(dep);
                    }
                }
                "call_expression" => {
                    if let Some(dep) = call_dependency(node, file_path, content) {
                        deps.push(dep);
                    }
                }
                _ => {}
            }
            let mut cursor = node.walk();
            let children: Vec<_> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        Ok(deps)
    }

    fn candidates(&self, dependency: &Dependency) -> Vec<ImportCandidate> {
        specifier_candidates(&dependency.source_file, &dependency.target_reference)
            .into_iter()
            .map(ImportCandidate::File)
            .collect()
    }
}

#[derive(Clone, Default)]
struct Context {
    class_name: Option<String>,
    enclosing_fn: Option<String>,
}

type Frame<'t> = (Node<'t>, Rc<Context>);

fn walk_program(root: Node<'_>, path: &str, source: &str, out: &mut Vec<Symbol>) {
    let mut stack: Vec<Frame<'_>> = Vec::new();
    extract::push_children(&mut stack, root, &Rc::new(Context::default()));
    while let Some((node, ctx)) = stack.pop() {
        match node.kind() {
            "export_statement" => {
                if let Some(declaration) = node.child_by_field_name("declaration") {
                    stack.push((declaration, ctx));
                }
            }
            "function_declaration" | "generator_function_declaration" => {
                let Some(name) = field_text(node, "name", source) else {
                    continue;
                };
                let (start, end) = line_span(node);
                out.push(
                    Symbol::new(name.clone(), SymbolKind::Function, path, start, end)
                        .with_signature(extract_signature(node, source))
                        .with_doc(doc_for(node, source))
                        .with_parent(ctx.enclosing_fn.clone().or_else(|| ctx.class_name.clone())),
                );
                push_function_body(&mut stack, node, name, &ctx);
            }
            "class_declaration" | "abstract_class_declaration" => {
                let Some(name) = field_text(node, "name", source) else {
                    continue;
                };
                let (start, end) = line_span(node);
                out.push(
                    Symbol::new(name.clone(), SymbolKind::Class, path, start, end)
                        .with_doc(doc_for(node, source))
                        .with_parent(ctx.enclosing_fn.clone()),
                );
                if let Some(body) = node.child_by_field_name("body") {
                    let next = Rc::new(Context {
                        class_name: Some(name),
                        enclosing_fn: None,
                    });
                    extract::push_children(&mut stack, body, &next);
                }
            }
            "method_definition" | "abstract_method_signature" => {
                let Some(name) = field_text(node, "name", source) else {
                    continue;
                };
                let (start, end) = line_span(node);
                out.push(
                    Symbol::new(name.clone(), SymbolKind::Method, path, start, end)
                        .with_signature(extract_signature(node, source))
                        .with_doc(doc_for(node, source))
                        .with_parent(ctx.class_name.clone()),
                );
                push_function_body(&mut stack, node, name, &ctx);
            }
            "interface_declaration" | "type_alias_declaration" | "enum_declaration" => {
                let Some(name) = field_text(node, "name", source) else {
                    continue;
                };
                let (start, end) = line_span(node);
                out.push(
                    Symbol::new(name, SymbolKind::Class, path, start, end)
                        .with_doc(doc_for(node, source))
                        .with_parent(ctx.enclosing_fn.clone()),
                );
            }
            "lexical_declaration" | "variable_declaration" => {
                if ctx.enclosing_fn.is_some() || ctx.class_name.is_some() {
                    continue;
                }
                handle_variable_declaration(node, &ctx, path, source, out, &mut stack);
            }
            "import_statement" => {
                let (start, end) = line_span(node);
                let statement = util::squash_whitespace(&node_text(node, source));
                for bound in bound_import_names(node, source) {
                    out.push(
                        Symbol::new(bound, SymbolKind::Import, path, start, end)
                            .with_signature(Some(statement.clone())),
                    );
                }
            }
            "statement_block" | "if_statement" | "else_clause" | "try_statement"
            | "catch_clause" | "finally_clause" | "for_statement" | "for_in_statement"
            | "while_statement" | "do_statement" | "switch_statement" | "switch_body"
            | "switch_case" | "labeled_statement" | "ambient_declaration" | "module"
            | "internal_module" => {
                extract::push_children(&mut stack, node, &ctx);
            }
            _ => {}
        }
    }
}

fn push_function_body<'t>(stack: &mut Vec<Frame<'t>>, node: Node<'t>, name: String, ctx: &Context) {
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let next = Rc::new(Context {
        class_name: ctx.class_name.clone(),
        enclosing_fn: Some(name),
    });
    extract::push_children(stack, body, &next);
}

fn handle_variable_declaration<'t>(
    node: Node<'t>,
    ctx: &Context,
    path: &str,
    source: &str,
    out: &mut Vec<Symbol>,
    stack: &mut Vec<Frame<'t>>,
) {
    let mut cursor = node.walk();
    for declarator in node.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name_node) = declarator.child_by_field_name("name") else {
            continue;
        };
        if name_node.kind() != "identifier" {
            continue;
        }
        let name = node_text(name_node, source);
        let (start, end) = line_span(declarator);
        let value = declarator.child_by_field_name("value");
        let function_value = value.filter(|v| {
            matches!(
                v.kind(),
                "arrow_function" | "function_expression" | "function" | "generator_function"
            )
        });
        match function_value {
            Some(func) => {
                out.push(
                    Symbol::new(name.clone(), SymbolKind::Function, path, start, end)
                        .with_signature(extract_signature(func, source))
                        .with_doc(doc_for(node, source)),
                );
                push_function_body(stack, func, name, ctx);
            }
            None => {
                let ty = field_text(declarator, "type", source).map(|t| strip_annotation(&t));
                out.push(
                    Symbol::new(name, SymbolKind::Variable, path, start, end)
                        .with_signature(ty)
                        .with_doc(doc_for(node, source)),
                );
            }
        }
    }
}

fn extract_signature(node: Node<'_>, source: &str) -> Option<String> {
    let params = field_text(node, "parameters", source)
        .or_else(|| field_text(node, "parameter", source).map(|p| format!("({p})")));
    let return_type = field_text(node, "return_type", source).map(|r| strip_annotation(&r));
    extract::format_signature(params, return_type)
}

fn strip_annotation(raw: &str) -> String {
    raw.trim().trim_start_matches(':').trim().to_string()
}

/// Comment directly above a declaration, or above the `export` that wraps it.
fn doc_for(node: Node<'_>, source: &str) -> Option<String> {
    let anchor = match node.parent() {
        Some(parent) if parent.kind() == "export_statement" => parent,
        _ => node,
    };
    extract::leading_comment_doc(anchor, source, &["//"])
}

fn bound_import_names(node: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "import_clause" {
            continue;
        }
        let mut clause_cursor = child.walk();
        for part in child.named_children(&mut clause_cursor) {
            match part.kind() {
                "identifier" => names.push(node_text(part, source)),
                "namespace_import" => {
                    let mut ns_cursor = part.walk();
                    let alias = part
                        .named_children(&mut ns_cursor)
                        .find(|n| n.kind() == "identifier");
                    if let Some(alias) = alias {
                        names.push(node_text(alias, source));
                    }
                }
                "named_imports" => {
                    let mut spec_cursor = part.walk();
                    for spec in part.named_children(&mut spec_cursor) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let bound = field_text(spec, "alias", source)
                            .or_else(|| field_text(spec, "name", source));
                        names.extend(bound);
                    }
                }
                _ => {}
            }
        }
    }
    names.retain(|name| !name.is_empty());
    names
}

/// Names an import pulls from its module, `default` for a default import. A namespace
/// import leaves the set empty.
fn imported_names(node: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "import_clause" => {
                let mut clause_cursor = child.walk();
                for part in child.named_children(&mut clause_cursor) {
                    match part.kind() {
                        "identifier" => names.push("default".to_string()),
                        "named_imports" => {
                            let mut spec_cursor = part.walk();
                            for spec in part.named_children(&mut spec_cursor) {
                                names.extend(field_text(spec, "name", source));
                            }
                        }
                        _ => {}
                    }
                }
            }
            "export_clause" => {
                let mut spec_cursor = child.walk();
                for spec in child.named_children(&mut spec_cursor) {
                    names.extend(field_text(spec, "name", source));
                }
            }
            _ => {}
        }
    }
    names
}

fn module_dependency(node: Node<'_>, path: &str, source: &str) -> Option<Dependency> {
    let source_node = node.child_by_field_name("source")?;
    let specifier = unquote_string_literal(&node_text(source_node, source))?;
    let line = node.start_position().row + 1;
    Some(Dependency::new(path, specifier, line).with_names(imported_names(node, source)))
}

/// `require("x")` and `import("x")` with a literal argument.
fn call_dependency(node: Node<'_>, path: &str, source: &str) -> Option<Dependency> {
    let function = node.child_by_field_name("function")?;
    let is_loader = match function.kind() {
        "import" => true,
        "identifier" => node_text(function, source) == "require",
        _ => false,
    };
    if !is_loader {
        return None;
    }
    let arguments = node.child_by_field_name("arguments")?;
    let first = arguments.named_child(0)?;
    if first.kind() != "string" {
        return None;
    }
    let specifier = unquote_string_literal(&node_text(first, source))?;
    Some(Dependency::new(path, specifier, node.start_position().row + 1))
}

fn unquote_string_literal(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() < 2 {
        return None;
    }
    let first = trimmed.chars().next()?;
    if matches!(first, '"' | '\'' | '`') && trimmed.ends_with(first) {
        let inner = &trimmed[1..trimmed.len() - 1];
        if !inner.is_empty() {
            return Some(inner.to_string());
        }
    }
    None
}

/// Candidate files for a relative module specifier. Bare package specifiers have none.
pub fn specifier_candidates(source_file: &str, specifier: &str) -> Vec<String> {
    let target = specifier
        .split(|ch| ch == '?' || ch == '#')
        .next()
        .unwrap_or(specifier)
        .trim();
    if !(target.starts_with("./") || target.starts_with("../") || target == "." || target == "..")
    {
        return Vec::new();
    }
    let rel = util::join_rel(util::parent_dir(source_file), target);
    if rel.starts_with("..") {
        return Vec::new();
    }
    let mut out = Vec::new();
    if let Some(ext) = script_extension(&rel) {
        out.push(rel.clone());
        let stem = &rel[..rel.len() - ext.len() - 1];
        let mapped: &[&str] = match ext {
            "js" => &["ts", "tsx"],
            "jsx" => &["tsx"],
            "mjs" => &["mts"],
            "cjs" => &["cts"],
            _ => &[],
        };
        out.extend(mapped.iter().map(|m| format!("{stem}.{m}")));
        return out;
    }
    if rel != "." {
        out.extend(RESOLVE_EXTENSIONS.iter().map(|ext| format!("{rel}.{ext}")));
    }
    let index_base = if rel == "." {
        "index".to_string()
    } else {
        format!("{rel}/index")
    };
    out.extend(RESOLVE_EXTENSIONS.iter().map(|ext| format!("{index_base}.{ext}")));
    out
}

fn script_extension(rel: &str) -> Option<&'static str> {
    let name = util::file_name(rel);
    let (_, ext) = name.rsplit_once('.')?;
    SCRIPT_EXTENSIONS.iter().copied().find(|known| *known == ext)
}
