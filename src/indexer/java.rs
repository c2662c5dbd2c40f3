use crate::error::ParseError;
use crate::indexer::extract::{
    self, DependencyAnalyzer, ExtractedSymbols, ImportCandidate, LanguageSupport, ParseLimits,
    SymbolExtractor, UsageRules, field_text, line_span, node_text,
};
use crate::model::{Dependency, Symbol, SymbolKind};
use crate::util;
use std::rc::Rc;
use tree_sitter::{Node, Parser};

pub const LANGUAGE: &str = "java";

/// Conventional source roots tried after the importing file's own ancestors.
const SOURCE_ROOTS: &[&str] = &["src/main/java", "src/test/java", "src", "source", "java"];

/// Packages that never live in the repository.
const EXTERNAL_PREFIXES: &[&str] = &["java.", "javax."];

static USAGE_RULES: UsageRules = UsageRules {
    identifier_kinds: &["identifier", "type_identifier"],
    definition_kinds: &[
        "class_declaration",
        "interface_declaration",
        "enum_declaration",
        "record_declaration",
        "annotation_type_declaration",
        "method_declaration",
        "constructor_declaration",
        "variable_declarator",
        "enum_constant",
    ],
    declarator_kinds: &[],
    import_kinds: &["import_declaration", "package_declaration"],
};

pub struct JavaLanguage {
    limits: ParseLimits,
}

impl JavaLanguage {
    pub fn new(limits: ParseLimits) -> Self {
        Self { limits }
    }
}

impl LanguageSupport for JavaLanguage {
    fn language_name(&self) -> &str {
        LANGUAGE
    }

    fn extensions(&self) -> &[&'static str] {
        &[".java"]
    }

    fn create_symbol_extractor(&self) -> Option<Box<dyn SymbolExtractor>> {
        match JavaExtractor::with_limits(self.limits) {
            Ok(extractor) => Some(Box::new(extractor)),
            Err(err) => {
                tracing::warn!(language = LANGUAGE, error = %err, "extractor unavailable");
                None
            }
        }
    }

    fn create_dependency_analyzer(&self) -> Option<Box<dyn DependencyAnalyzer>> {
        match JavaExtractor::with_limits(self.limits) {
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
    /// Innermost enclosing type declaration.
    type_name: Option<String>,
}

pub struct JavaExtractor {
    parser: Parser,
    limits: ParseLimits,
}

impl JavaExtractor {
    pub fn new() -> Result<Self, ParseError> {
        Self::with_limits(ParseLimits::default())
    }

    pub fn with_limits(limits: ParseLimits) -> Result<Self, ParseError> {
        let parser = extract::new_parser(tree_sitter_java::LANGUAGE.into(), LANGUAGE)?;
        Ok(Self { parser, limits })
    }
}

impl SymbolExtractor for JavaExtractor {
    fn extract(&mut self, file_path: &str, content: &str) -> Result<ExtractedSymbols, ParseError> {
        let tree = extract::parse_source(&mut self.parser, content, &self.limits)?;
        let root = tree.root_node();
        let mut output = ExtractedSymbols::default();
        walk_declarations(root, file_path, content, &mut output.symbols);
        output.usages = extract::collect_usages(root, content, &USAGE_RULES);
        Ok(output)
    }
}

impl DependencyAnalyzer for JavaExtractor {
    fn analyze_imports(
        &mut self,
        file_path: &str,
        content: &str,
    ) -> Result<Vec<Dependency>, ParseError> {
        let tree = extract::parse_source(&mut self.parser, content, &self.limits)?;
        let root = tree.root_node();
        let mut deps = Vec::new();
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            if node.kind() != "import_declaration" {
                continue;
            }
            let Some(import) = ImportPath::parse(&node_text(node, content)) else {
                continue;
            };
            let line = node.start_position().row + 1;
            let dep = Dependency::new(file_path, import.reference(), line);
            deps.push(match import.bound() {
                Some(name) => dep.with_names([name]),
                None => dep,
            });
        }
        Ok(deps)
    }

    fn candidates(&self, dependency: &Dependency) -> Vec<ImportCandidate> {
        import_candidates(&dependency.source_file, &dependency.target_reference)
    }
}

fn walk_declarations(root: Node<'_>, path: &str, source: &str, out: &mut Vec<Symbol>) {
    let mut stack = Vec::new();
    extract::push_children(&mut stack, root, &Rc::new(Context::default()));
    while let Some((node, ctx)) = stack.pop() {
        match node.kind() {
            "class_declaration" | "interface_declaration" | "enum_declaration"
            | "record_declaration" | "annotation_type_declaration" => {
                let Some(name) = field_text(node, "name", source) else {
                    continue;
                };
                let (start, end) = line_span(node);
                let signature = match node.kind() {
                    "record_declaration" => field_text(node, "parameters", source)
                        .map(|params| util::squash_whitespace(&params)),
                    _ => None,
                };
                out.push(
                    Symbol::new(name.clone(), SymbolKind::Class, path, start, end)
                        .with_signature(signature)
                        .with_doc(doc_for(node, source))
                        .with_parent(ctx.type_name.clone()),
                );
                if let Some(body) = node.child_by_field_name("body") {
                    let next = Rc::new(Context {
                        type_name: Some(name),
                    });
                    extract::push_children(&mut stack, body, &next);
                }
            }
            "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
                let Some(name) = field_text(node, "name", source) else {
                    continue;
                };
                let (start, end) = line_span(node);
                let return_type = match node.kind() {
                    "method_declaration" => field_text(node, "type", source),
                    _ => None,
                };
                out.push(
                    Symbol::new(name, SymbolKind::Method, path, start, end)
                        .with_signature(extract::format_signature(
                            field_text(node, "parameters", source),
                            return_type,
                        ))
                        .with_doc(doc_for(node, source))
                        .with_parent(ctx.type_name.clone()),
                );
            }
            "field_declaration" | "constant_declaration" => {
                let ty = field_text(node, "type", source).map(|ty| util::squash_whitespace(&ty));
                let doc = doc_for(node, source);
                let mut cursor = node.walk();
                for declarator in node.children_by_field_name("declarator", &mut cursor) {
                    let Some(name) = field_text(declarator, "name", source) else {
                        continue;
                    };
                    let (start, end) = line_span(declarator);
                    out.push(
                        Symbol::new(name, SymbolKind::Variable, path, start, end)
                            .with_signature(ty.clone())
                            .with_doc(doc.clone())
                            .with_parent(ctx.type_name.clone()),
                    );
                }
            }
            "import_declaration" => {
                let statement = util::squash_whitespace(&node_text(node, source));
                let Some(bound) = ImportPath::parse(&statement).and_then(|import| import.bound())
                else {
                    continue;
                };
                let (start, end) = line_span(node);
                out.push(
                    Symbol::new(bound, SymbolKind::Import, path, start, end)
                        .with_signature(Some(statement)),
                );
            }
            // Enum constants with bodies and the declarations after them.
            "class_body" | "interface_body" | "enum_body" | "enum_body_declarations"
            | "annotation_type_body" => {
                extract::push_children(&mut stack, node, &ctx);
            }
            _ => {}
        }
    }
}

/// Javadoc or line comments directly above a declaration.
fn doc_for(node: Node<'_>, source: &str) -> Option<String> {
    extract::leading_comment_doc(node, source, &["//"])
}

/// One `import` statement with `static` and the trailing `;` removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPath {
    pub segments: Vec<String>,
    pub wildcard: bool,
    pub is_static: bool,
}

impl ImportPath {
    pub fn parse(statement: &str) -> Option<Self> {
        let body = statement.trim().strip_prefix("import")?.trim_start();
        let (is_static, body) = match body.strip_prefix("static ") {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        let body: String = body
            .trim()
            .trim_end_matches(';')
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect();
        let (body, wildcard) = match body.strip_suffix(".*") {
            Some(rest) => (rest.to_string(), true),
            None => (body, false),
        };
        let segments: Vec<String> = body
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        if segments.is_empty() {
            return None;
        }
        Some(Self {
            segments,
            wildcard,
            is_static,
        })
    }

    /// Dotted path as written, `.*` kept for wildcards.
    pub fn reference(&self) -> String {
        let joined = self.segments.join(".");
        if self.wildcard {
            format!("{joined}.*")
        } else {
            joined
        }
    }

    /// Simple name the import brings into scope. Wildcards bind nothing.
    pub fn bound(&self) -> Option<String> {
        if self.wildcard {
            return None;
        }
        self.segments.last().cloned()
    }
}

/// Candidate targets for a dotted import, nearest source root first.
///
/// The class file is the prefix up to the first capitalised segment, so nested types and
/// static members resolve to the file declaring the outer type. A wildcard over a package
/// maps to that package directory.
pub fn import_candidates(source_file: &str, reference: &str) -> Vec<ImportCandidate> {
    if EXTERNAL_PREFIXES
        .iter()
        .any(|prefix| reference.starts_with(prefix))
    {
        return Vec::new();
    }
    let (dotted, wildcard) = match reference.strip_suffix(".*") {
        Some(rest) => (rest, true),
        None => (reference, false),
    };
    let segments: Vec<&str> = dotted.split('.').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Vec::new();
    }
    let class_len = segments
        .iter()
        .position(|segment| segment.starts_with(|ch: char| ch.is_ascii_uppercase()))
        .map(|idx| idx + 1);

    let mut out = Vec::new();
    for root in source_roots(util::parent_dir(source_file)) {
        let candidate = match (class_len, wildcard) {
            (Some(len), _) => {
                ImportCandidate::File(format!("{}.java", join(&root, &segments[..len].join("/"))))
            }
            (None, true) => ImportCandidate::Package {
                dir: join(&root, &segments.join("/")),
                language: LANGUAGE.to_string(),
            },
            (None, false) => {
                ImportCandidate::File(format!("{}.java", join(&root, &segments.join("/"))))
            }
        };
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

fn source_roots(dir: &str) -> Vec<String> {
    let mut roots = vec![dir.to_string()];
    let mut current = dir;
    while !current.is_empty() {
        current = util::parent_dir(current);
        roots.push(current.to_string());
    }
    for root in SOURCE_ROOTS {
        if !roots.iter().any(|known| known == root) {
            roots.push(root.to_string());
        }
    }
    roots
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
    fn import_statements() {
        let plain = ImportPath::parse("import com.acme.model.User;").unwrap();
        assert_eq!(plain.reference(), "com.acme.model.User");
        assert_eq!(plain.bound().as_deref(), Some("User"));

        let wildcard = ImportPath::parse("import com.acme.model.*;").unwrap();
        assert!(wildcard.wildcard);
        assert_eq!(wildcard.reference(), "com.acme.model.*");
        assert_eq!(wildcard.bound(), None);

        let member = ImportPath::parse("import static com.acme.Util.max;").unwrap();
        assert!(member.is_static);
        assert_eq!(member.bound().as_deref(), Some("max"));

        assert_eq!(ImportPath::parse("import ;"), None);
    }

    #[test]
    fn roots_walk_up_then_conventional() {
        assert_eq!(
            source_roots("app/src"),
            vec!["app/src", "app", "", "src/main/java", "src/test/java", "src", "source", "java"]
        );
    }

    #[test]
    fn standard_library_is_external() {
        assert!(import_candidates("Main.java", "java.util.List").is_empty());
        assert!(import_candidates("Main.java", "javax.inject.*").is_empty());
    }
}
