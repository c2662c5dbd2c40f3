use crate::config::EngineConfig;
use crate::error::ParseError;
use crate::model::{Dependency, Symbol, Usage};
use crate::util;
use std::time::{Duration, Instant};
use tree_sitter::{Node, ParseOptions, ParseState, Parser, Point, Tree};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedSymbols {
    pub symbols: Vec<Symbol>,
    pub usages: Vec<Usage>,
}

/// A place an import may point at. Resolution is left to the caller, which knows
/// which files exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImportCandidate {
    File(String),
    /// Every non-test file of `language` directly inside `dir`.
    Package { dir: String, language: String },
}

pub trait SymbolExtractor: Send {
    fn extract(&mut self, file_path: &str, content: &str) -> Result<ExtractedSymbols, ParseError>;

    fn extract_symbols(&mut self, file_path: &str, content: &str) -> Result<Vec<Symbol>, ParseError> {
        Ok(self.extract(file_path, content)?.symbols)
    }
}

pub trait DependencyAnalyzer: Send {
    fn analyze_imports(&mut self, file_path: &str, content: &str)
    -> Result<Vec<Dependency>, ParseError>;

    /// Candidate targets for `dependency`, most specific first. Pure path arithmetic.
    fn candidates(&self, dependency: &Dependency) -> Vec<ImportCandidate>;
}

pub trait LanguageSupport: Send + Sync {
    fn language_name(&self) -> &str;

    fn extensions(&self) -> &[&'static str];

    fn create_symbol_extractor(&self) -> Option<Box<dyn SymbolExtractor>>;

    fn create_dependency_analyzer(&self) -> Option<Box<dyn DependencyAnalyzer>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    pub timeout: Option<Duration>,
    pub max_lines: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for ParseLimits {
    fn from(config: &EngineConfig) -> Self {
        Self {
            timeout: config.parse_timeout(),
            max_lines: config.max_file_lines,
        }
    }
}

pub fn new_parser(language: tree_sitter::Language, name: &str) -> Result<Parser, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|err| ParseError::Grammar {
            language: name.to_string(),
            message: err.to_string(),
        })?;
    Ok(parser)
}

/// Parses `source` under `limits`. A tree containing error or missing nodes is rejected
/// so that callers never index half-recovered structure.
pub fn parse_source(
    parser: &mut Parser,
    source: &str,
    limits: &ParseLimits,
) -> Result<Tree, ParseError> {
    let lines = util::line_count(source);
    if lines > limits.max_lines {
        return Err(ParseError::TooLarge {
            lines,
            limit: limits.max_lines,
        });
    }
    let bytes = source.as_bytes();
    let tree = match limits.timeout {
        Some(timeout) => {
            let start = Instant::now();
            let mut cancel = |_state: &ParseState| start.elapsed() >= timeout;
            let options = ParseOptions::new().progress_callback(&mut cancel);
            let tree = parser.parse_with_options(
                &mut |offset: usize, _point: Point| &bytes[offset.min(bytes.len())..],
                None,
                Some(options),
            );
            if tree.is_none() {
                parser.reset();
                return Err(ParseError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tree
        }
        None => parser.parse(source, None),
    };
    let tree = tree.ok_or(ParseError::Timeout { timeout_ms: 0 })?;
    let root = tree.root_node();
    if root.has_error() {
        let line = first_error_line(root).unwrap_or(1);
        return Err(ParseError::Syntax { line });
    }
    Ok(tree)
}

fn first_error_line(root: Node<'_>) -> Option<usize> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node.start_position().row + 1);
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

/// Pushes the named children of `node`, each paired with `ctx`, so that they pop in
/// source order. Extractors walk with an explicit stack: nesting depth in a source file is
/// unbounded and must not become call depth.
pub fn push_children<'t, C: Clone>(stack: &mut Vec<(Node<'t>, C)>, node: Node<'t>, ctx: &C) {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    stack.extend(children.into_iter().rev().map(|child| (child, ctx.clone())));
}

/// Node kinds that steer identifier collection for one grammar.
pub struct UsageRules {
    pub identifier_kinds: &'static [&'static str],
    /// Parents whose `name` field is a definition site rather than a use.
    pub definition_kinds: &'static [&'static str],
    /// Parents whose `declarator` field is a definition site (C-family declarators).
    pub declarator_kinds: &'static [&'static str],
    /// Subtrees skipped entirely.
    pub import_kinds: &'static [&'static str],
}

pub fn collect_usages(root: Node<'_>, source: &str, rules: &UsageRules) -> Vec<Usage> {
    let mut usages = Vec::new();
    let mut cursor = root.walk();
    // Kinds of the cursor's ancestors; `Node::parent` costs a walk from the root.
    let mut parents: Vec<&'static str> = Vec::new();
    'outer: loop {
        let node = cursor.node();
        let kind = node.kind();
        let mut descend = true;
        if rules.import_kinds.contains(&kind) {
            descend = false;
        } else if rules.identifier_kinds.contains(&kind) {
            descend = false;
            let defining_parents: &[&str] = match cursor.field_name() {
                Some("name") => rules.definition_kinds,
                Some("declarator") => rules.declarator_kinds,
                _ => &[],
            };
            let defines = parents
                .last()
                .is_some_and(|parent| defining_parents.contains(parent));
            if !defines {
                let name = node_text(node, source);
                if !name.is_empty() {
                    let pos = node.start_position();
                    usages.push(Usage {
                        name,
                        line: pos.row + 1,
                        column: pos.column + 1,
                    });
                }
            }
        }
        if descend && cursor.goto_first_child() {
            parents.push(kind);
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                continue 'outer;
            }
            if !cursor.goto_parent() {
                break 'outer;
            }
            parents.pop();
        }
    }
    usages
}

pub fn line_span(node: Node<'_>) -> (usize, usize) {
    let start = node.start_position().row + 1;
    let mut end = node.end_position().row + 1;
    // A node ending at column 0 stops at the previous line's newline.
    if node.end_position().column == 0 && end > start {
        end -= 1;
    }
    (start, end)
}

pub fn node_text(node: Node<'_>, source: &str) -> String {
    source
        .get(node.start_byte()..node.end_byte())
        .unwrap_or("")
        .trim()
        .to_string()
}

pub fn field_text(node: Node<'_>, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|child| node_text(child, source))
        .filter(|text| !text.is_empty())
}

/// `(params)` or `(params) -> ret`, whitespace collapsed.
pub fn format_signature(params: Option<String>, return_type: Option<String>) -> Option<String> {
    let params = params.map(|p| util::squash_whitespace(&p));
    let return_type = return_type.map(|r| util::squash_whitespace(&r));
    match (params, return_type) {
        (Some(p), Some(r)) => Some(format!("{p} -> {r}")),
        (Some(p), None) => Some(p),
        _ => None,
    }
}

/// Contiguous line comments (or one block comment) directly above `node`, with comment
/// markers stripped. `prefixes` lists accepted line-comment markers, longest first.
pub fn leading_comment_doc(node: Node<'_>, source: &str, prefixes: &[&str]) -> Option<String> {
    let mut lines = Vec::new();
    let mut expected_row = node.start_position().row;
    let mut current = node.prev_sibling();
    while let Some(prev) = current {
        if !prev.kind().contains("comment") {
            break;
        }
        if prev.end_position().row + 1 < expected_row {
            break;
        }
        let text = node_text(prev, source);
        if let Some(block) = text.strip_prefix("/*") {
            if !lines.is_empty() {
                break;
            }
            let body = block.trim_end_matches("*/");
            let cleaned: Vec<String> = body
                .lines()
                .map(|line| line.trim().trim_start_matches('*').trim().to_string())
                .filter(|line| !line.is_empty())
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            return Some(cleaned.join("\n"));
        }
        let Some(stripped) = prefixes.iter().find_map(|p| text.strip_prefix(p)) else {
            break;
        };
        lines.push(stripped.trim().to_string());
        expected_row = prev.start_position().row;
        current = prev.prev_sibling();
    }
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}
