use crate::error::ParseError;
use crate::indexer::extract::{
    self, DependencyAnalyzer, ExtractedSymbols, ImportCandidate, LanguageSupport, ParseLimits,
    SymbolExtractor, UsageRules, field_text, line_span, node_text,
};
use crate::model::{Dependency, Symbol, SymbolKind};
use crate::util;
use std::rc::Rc;
use tree_sitter::{Node, Parser};

static USAGE_RULES: UsageRules = UsageRules {
    identifier_kinds: &[
        "identifier",
        "type_identifier",
        "field_identifier",
        "namespace_identifier",
    ],
    definition_kinds: &[
        "struct_specifier",
        "union_specifier",
        "enum_specifier",
        "class_specifier",
        "namespace_definition",
        "preproc_def",
        "preproc_function_def",
        "enumerator",
    ],
    declarator_kinds: &[
        "function_declarator",
        "init_declarator",
        "pointer_declarator",
        "array_declarator",
        "declaration",
        "field_declaration",
        "type_definition",
        "parameter_declaration",
    ],
    import_kinds: &["preproc_include"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    C,
    Cpp,
}

impl Dialect {
    fn name(self) -> &'static str {
        match self {
            Dialect::C => "c",
            Dialect::Cpp => "cpp",
        }
    }
}

pub struct CLanguage {
    limits: ParseLimits,
}

impl CLanguage {
    pub fn new(limits: ParseLimits) -> Self {
        Self { limits }
    }
}

pub struct CppLanguage {
    limits: ParseLimits,
}

impl CppLanguage {
    pub fn new(limits: ParseLimits) -> Self {
        Self { limits }
    }
}

fn build(dialect: Dialect, limits: ParseLimits) -> Option<CFamilyExtractor> {
    let built = match dialect {
        Dialect::C => CFamilyExtractor::c(limits),
        Dialect::Cpp => CFamilyExtractor::cpp(limits),
    };
    match built {
        Ok(extractor) => Some(extractor),
        Err(err) => {
            tracing::warn!(language = dialect.name(), error = %err, "extractor unavailable");
            None
        }
    }
}

impl LanguageSupport for CLanguage {
    fn language_name(&self) -> &str {
        Dialect::C.name()
    }

    fn extensions(&self) -> &[&'static str] {
        &[".c", ".h"]
    }

    fn create_symbol_extractor(&self) -> Option<Box<dyn SymbolExtractor>> {
        build(Dialect::C, self.limits).map(|e| Box::new(e) as Box<dyn SymbolExtractor>)
    }

    fn create_dependency_analyzer(&self) -> Option<Box<dyn DependencyAnalyzer>> {
        build(Dialect::C, self.limits).map(|e| Box::new(e) as Box<dyn DependencyAnalyzer>)
    }
}

impl LanguageSupport for CppLanguage {
    fn language_name(&self) -> &str {
        Dialect::Cpp.name()
    }

    fn extensions(&self) -> &[&'static str] {
        &[".cpp", ".cc", ".cxx", ".c++", ".hpp", ".hh", ".hxx", ".h++"]
    }

    fn create_symbol_extractor(&self) -> Option<Box<dyn SymbolExtractor>> {
        build(Dialect::Cpp, self.limits).map(|e| Box::new(e) as Box<dyn SymbolExtractor>)
    }

    fn create_dependency_analyzer(&self) -> Option<Box<dyn DependencyAnalyzer>> {
        build(Dialect::Cpp, self.limits).map(|e| Box::new(e) as Box<dyn DependencyAnalyzer>)
    }
}

/// Extractor for C and C++. Both grammars share node names for everything indexed here;
/// C++ adds classes, namespaces and qualified definitions.
pub struct CFamilyExtractor {
    parser: Parser,
    limits: ParseLimits,
}

impl CFamilyExtractor {
    pub fn c(limits: ParseLimits) -> Result<Self, ParseError> {
        let parser = extract::new_parser(tree_sitter_c::LANGUAGE.into(), Dialect::C.name())?;
        Ok(Self { parser, limits })
    }

    pub fn cpp(limits: ParseLimits) -> Result<Self, ParseError> {
        let parser = extract::new_parser(tree_sitter_cpp::LANGUAGE.into(), Dialect::Cpp.name())?;
        Ok(Self { parser, limits })
    }
}

impl SymbolExtractor for CFamilyExtractor {
    fn extract(&mut self, file_path: &str, content: &str) -> Result<ExtractedSymbols, ParseError> {
        let tree = extract::parse_source(&mut self.parser, content, &self.limits)?;
        let root = tree.root_node();
        let mut output = ExtractedSymbols::default();
        walk_translation_unit(root, file_path, content, &mut output.symbols);
        output.usages = extract::collect_usages(root, content, &USAGE_RULES);
        Ok(output)
    }
}

impl DependencyAnalyzer for CFamilyExtractor {
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
                "preproc_include" => {
                    if let Some(header) = include_path(node, content) {
                        deps.push(Dependency::new(file_path, header, node.start_position().row + 1));
                    }
                    continue;
                }
                "compound_statement" => continue,
                _ => {}
            }
            let mut cursor = node.walk();
            let children: Vec<_> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        Ok(deps)
    }

    fn candidates(&self, dependency: &Dependency) -> Vec<ImportCandidate> {
        include_candidates(&dependency.source_file, &dependency.target_reference)
            .into_iter()
            .map(ImportCandidate::File)
            .collect()
    }
}

#[derive(Clone, Default)]
struct Context {
    /// Enclosing class, struct or namespace.
    scope: Option<String>,
    /// Inside a class or struct body, where functions are members.
    in_record: bool,
}

fn walk_translation_unit(root: Node<'_>, path: &str, source: &str, out: &mut Vec<Symbol>) {
    let mut stack = Vec::new();
    extract::push_children(&mut stack, root, &Rc::new(Context::default()));
    while let Some((node, ctx)) = stack.pop() {
        match node.kind() {
            "function_definition" => {
                let Some(declarator) = node.child_by_field_name("declarator") else {
                    continue;
                };
                push_function(node, declarator, &ctx, path, source, out);
            }
            "declaration" | "field_declaration" => {
                let doc = doc_for(node, source);
                let ty = field_text(node, "type", source).map(|ty| util::squash_whitespace(&ty));
                let mut cursor = node.walk();
                for declarator in node.children_by_field_name("declarator", &mut cursor) {
                    let mut target = innermost_declarator(declarator);
                    if target.kind() == "function_declarator" {
                        if !is_function_pointer(target) {
                            push_function(node, declarator, &ctx, path, source, out);
                            continue;
                        }
                        let Some(inner) = target.child_by_field_name("declarator") else {
                            continue;
                        };
                        target = innermost_declarator(inner);
                    }
                    let Some((_, name)) = declared_name(target, source) else {
                        continue;
                    };
                    let (start, end) = line_span(node);
                    out.push(
                        Symbol::new(name, SymbolKind::Variable, path, start, end)
                            .with_signature(ty.clone())
                            .with_doc(doc.clone())
                            .with_parent(ctx.scope.clone()),
                    );
                }
                if let Some(ty) = node.child_by_field_name("type") {
                    stack.push((ty, ctx));
                }
            }
            "struct_specifier" | "union_specifier" | "class_specifier" | "enum_specifier" => {
                let (Some(name_node), Some(body)) =
                    (node.child_by_field_name("name"), node.child_by_field_name("body"))
                else {
                    continue;
                };
                let name = type_name(name_node, source);
                if name.is_empty() {
                    continue;
                }
                let (start, end) = line_span(node);
                out.push(
                    Symbol::new(name.clone(), SymbolKind::Class, path, start, end)
                        .with_doc(doc_for(declaration_anchor(node), source))
                        .with_parent(ctx.scope.clone()),
                );
                if node.kind() != "enum_specifier" {
                    let next = Rc::new(Context {
                        scope: Some(name),
                        in_record: true,
                    });
                    extract::push_children(&mut stack, body, &next);
                }
            }
            "type_definition" => {
                let ty = node.child_by_field_name("type");
                let mut aliases = Vec::new();
                let mut cursor = node.walk();
                for declarator in node.children_by_field_name("declarator", &mut cursor) {
                    if let Some((_, name)) = declared_name(innermost_declarator(declarator), source)
                    {
                        aliases.push(name);
                    }
                }
                let (start, end) = line_span(node);
                let signature = ty.map(|ty| util::squash_whitespace(&node_text(ty, source)));
                let signature = signature.filter(|sig| !sig.contains('{'));
                for alias in &aliases {
                    out.push(
                        Symbol::new(alias.clone(), SymbolKind::Class, path, start, end)
                            .with_signature(signature.clone())
                            .with_doc(doc_for(node, source))
                            .with_parent(ctx.scope.clone()),
                    );
                }
                let Some(ty) = ty else {
                    continue;
                };
                // `typedef struct { .. } Name;` members belong to the alias.
                match (ty.child_by_field_name("name"), ty.child_by_field_name("body")) {
                    (None, Some(body)) if ty.kind() != "enum_specifier" => {
                        let next = Rc::new(Context {
                            scope: aliases.first().cloned().or_else(|| ctx.scope.clone()),
                            in_record: true,
                        });
                        extract::push_children(&mut stack, body, &next);
                    }
                    _ => stack.push((ty, ctx)),
                }
            }
            "namespace_definition" => {
                let Some(body) = node.child_by_field_name("body") else {
                    continue;
                };
                let next = match field_text(node, "name", source) {
                    Some(name) => {
                        let (start, end) = line_span(node);
                        out.push(
                            Symbol::new(name.clone(), SymbolKind::Class, path, start, end)
                                .with_doc(doc_for(node, source))
                                .with_parent(ctx.scope.clone()),
                        );
                        Rc::new(Context {
                            scope: Some(name),
                            in_record: false,
                        })
                    }
                    None => ctx,
                };
                extract::push_children(&mut stack, body, &next);
            }
            "preproc_def" | "preproc_function_def" => {
                let Some(name) = field_text(node, "name", source) else {
                    continue;
                };
                let (start, end) = line_span(node);
                let (kind, signature) = match field_text(node, "parameters", source) {
                    Some(params) => (SymbolKind::Function, Some(util::squash_whitespace(&params))),
                    None => (SymbolKind::Variable, None),
                };
                out.push(
                    Symbol::new(name, kind, path, start, end)
                        .with_signature(signature)
                        .with_doc(doc_for(node, source)),
                );
            }
            "preproc_include" => {
                let Some(header) = include_path(node, source) else {
                    continue;
                };
                let (start, end) = line_span(node);
                out.push(
                    Symbol::new(header, SymbolKind::Import, path, start, end)
                        .with_signature(Some(util::squash_whitespace(&node_text(node, source)))),
                );
            }
            "template_declaration" | "linkage_specification" | "declaration_list"
            | "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif"
            | "preproc_elifdef" | "field_declaration_list" => {
                extract::push_children(&mut stack, node, &ctx);
            }
            _ => {}
        }
    }
}

fn push_function(
    node: Node<'_>,
    declarator: Node<'_>,
    ctx: &Context,
    path: &str,
    source: &str,
    out: &mut Vec<Symbol>,
) {
    let function = innermost_declarator(declarator);
    if function.kind() != "function_declarator" {
        return;
    }
    let Some(name_node) = function.child_by_field_name("declarator") else {
        return;
    };
    let Some((qualifier, name)) = declared_name(innermost_declarator(name_node), source) else {
        return;
    };
    let (start, end) = line_span(node);
    let member = ctx.in_record || qualifier.is_some();
    let kind = if member {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    };
    out.push(
        Symbol::new(name, kind, path, start, end)
            .with_signature(extract::format_signature(
                field_text(function, "parameters", source),
                field_text(node, "type", source),
            ))
            .with_doc(doc_for(declaration_anchor(node), source))
            .with_parent(qualifier.or_else(|| ctx.scope.clone())),
    );
}

/// Strips pointer, reference, array and initializer wrappers down to the declarator that
/// carries the name or the parameter list.
fn innermost_declarator(mut node: Node<'_>) -> Node<'_> {
    loop {
        match node.kind() {
            "pointer_declarator" | "reference_declarator" | "array_declarator"
            | "init_declarator" | "attributed_declarator" | "parenthesized_declarator" => {
                match node
                    .child_by_field_name("declarator")
                    .or_else(|| node.named_child(0))
                {
                    Some(inner) => node = inner,
                    None => return node,
                }
            }
            _ => return node,
        }
    }
}

/// `int (*handler)(int)` declares a variable, not a function.
fn is_function_pointer(function: Node<'_>) -> bool {
    function
        .child_by_field_name("declarator")
        .is_some_and(|inner| inner.kind() == "parenthesized_declarator")
}

/// Name of a declarator and, for `Outer::name`, the innermost qualifying type.
fn declared_name(node: Node<'_>, source: &str) -> Option<(Option<String>, String)> {
    let mut qualifier = None;
    let mut current = node;
    while current.kind() == "qualified_identifier" {
        if let Some(scope) = current.child_by_field_name("scope") {
            qualifier = Some(type_name(scope, source));
        }
        current = current.child_by_field_name("name")?;
    }
    let name = match current.kind() {
        "identifier" | "field_identifier" | "type_identifier" | "destructor_name"
        | "operator_name" => node_text(current, source),
        "template_function" => field_text(current, "name", source)?,
        _ => return None,
    };
    if name.is_empty() {
        return None;
    }
    Some((qualifier.filter(|q| !q.is_empty()), name))
}

/// `Foo<T>` names the type `Foo`.
fn type_name(node: Node<'_>, source: &str) -> String {
    let text = node_text(node, source);
    let base = text.split('<').next().unwrap_or(&text).trim();
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// Comments sit above a `template<..>` prefix when there is one.
fn declaration_anchor(node: Node<'_>) -> Node<'_> {
    match node.parent() {
        Some(parent) if parent.kind() == "template_declaration" => parent,
        _ => node,
    }
}

fn doc_for(node: Node<'_>, source: &str) -> Option<String> {
    extract::leading_comment_doc(node, source, &["///", "//"])
}

fn include_path(node: Node<'_>, source: &str) -> Option<String> {
    let raw = field_text(node, "path", source)?;
    let inner = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('<').and_then(|rest| rest.strip_suffix('>')))?
        .trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

/// Candidate files for an `#include`: next to the including file first, then under each
/// ancestor directory and its `include/` directory, nearest first.
pub fn include_candidates(source_file: &str, header: &str) -> Vec<String> {
    let header = header.trim_start_matches("./");
    if header.is_empty() || header.starts_with('/') {
        return Vec::new();
    }
    let dir = util::parent_dir(source_file);
    let mut out = Vec::new();
    push_candidate(&mut out, source_file, util::join_rel(dir, header));
    if header.starts_with("../") {
        return out;
    }
    let mut current = dir;
    loop {
        push_candidate(&mut out, source_file, util::join_rel(current, header));
        push_candidate(&mut out, source_file, util::join_rel(current, &format!("include/{header}")));
        if current.is_empty() {
            break;
        }
        current = util::parent_dir(current);
    }
    out
}

fn push_candidate(out: &mut Vec<String>, source_file: &str, candidate: String) {
    if !candidate.starts_with("..") && candidate != source_file && !out.contains(&candidate) {
        out.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_try_neighbours_then_ancestors() {
        assert_eq!(
            include_candidates("src/net/socket.c", "buffer.h"),
            vec![
                "src/net/buffer.h",
                "src/net/include/buffer.h",
                "src/buffer.h",
                "src/include/buffer.h",
                "buffer.h",
                "include/buffer.h",
            ]
        );
        assert_eq!(
            include_candidates("src/main.c", "../lib/util.h"),
            vec!["lib/util.h"]
        );
        assert!(include_candidates("main.c", "/usr/include/stdio.h").is_empty());
    }
}
