//! Context recommendation
//!
//! Ranks files, symbols and tests worth reading before an edit. Understanding the
//! request, searching and scoring are delegated to collaborators so a host can plug in
//! a language model; the shipped ones work on identifiers and path tokens only.

use crate::context::ContextManager;
use crate::impact::TestImpactLayer;
use crate::model::{Symbol, SymbolKind};
use crate::util;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// What an editing request is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Intent {
    pub target_files: Vec<String>,
    pub target_symbols: Vec<String>,
    pub keywords: Vec<String>,
}

pub trait IntentExtractor: Send + Sync {
    fn extract_intent(&self, text: &str) -> Intent;
}

pub trait SemanticSearch: Send + Sync {
    fn search_symbols(&self, query: &str, limit: usize) -> Vec<Symbol>;

    fn search_files(&self, query: &str, limit: usize) -> Vec<String>;
}

#[derive(Debug, Clone, Copy)]
pub enum Candidate<'c> {
    File(&'c str),
    Symbol(&'c Symbol),
}

pub trait RelevanceScorer: Send + Sync {
    /// Relevance of `candidate` to `query` on a 0 to 10 scale.
    fn score(&self, query: &str, candidate: Candidate<'_>) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendConfig {
    pub max_files: usize,
    pub max_symbols: usize,
    pub max_tests: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_symbols: 10,
            max_tests: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommended<T> {
    pub item: T,
    pub score: f32,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextRecommendation {
    pub files: Vec<Recommended<String>>,
    pub symbols: Vec<Recommended<Symbol>>,
    pub tests: Vec<Recommended<String>>,
}

impl ContextRecommendation {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.symbols.is_empty() && self.tests.is_empty()
    }
}

/// Explicit targets supplied alongside the request text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecommendTargets {
    pub files: Vec<String>,
    pub symbols: Vec<String>,
}

/// Candidates in first-seen order, merging reasons of repeats.
struct Pool<T> {
    order: Vec<T>,
    reasons: HashMap<usize, Vec<String>>,
}

impl<T: PartialEq> Pool<T> {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            reasons: HashMap::new(),
        }
    }

    fn add(&mut self, item: T, reason: String) {
        let idx = match self.order.iter().position(|existing| *existing == item) {
            Some(idx) => idx,
            None => {
                self.order.push(item);
                self.order.len() - 1
            }
        };
        let reasons = self.reasons.entry(idx).or_default();
        if !reasons.contains(&reason) {
            reasons.push(reason);
        }
    }

    fn rank<F>(self, limit: usize, score: F) -> Vec<Recommended<T>>
    where
        F: Fn(&T) -> f32,
    {
        let mut reasons = self.reasons;
        let mut ranked: Vec<Recommended<T>> = self
            .order
            .into_iter()
            .enumerate()
            .map(|(idx, item)| Recommended {
                score: clamp_score(score(&item)),
                reasons: reasons.remove(&idx).unwrap_or_default(),
                item,
            })
            .collect();
        // Stable: equal scores keep seed order.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(limit);
        ranked
    }
}

fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 10.0)
    }
}

pub struct ContextRecommender<'a> {
    manager: &'a ContextManager,
    intent: Box<dyn IntentExtractor + 'a>,
    search: Box<dyn SemanticSearch + 'a>,
    scorer: Box<dyn RelevanceScorer + 'a>,
    config: RecommendConfig,
}

impl<'a> ContextRecommender<'a> {
    pub fn new(
        manager: &'a ContextManager,
        intent: Box<dyn IntentExtractor + 'a>,
        search: Box<dyn SemanticSearch + 'a>,
        scorer: Box<dyn RelevanceScorer + 'a>,
    ) -> Self {
        Self {
            manager,
            intent,
            search,
            scorer,
            config: RecommendConfig::default(),
        }
    }

    /// Recommender using the keyword extractor, the name index and token overlap.
    pub fn with_defaults(manager: &'a ContextManager) -> Self {
        Self::new(
            manager,
            Box::new(KeywordIntentExtractor),
            Box::new(NameIndexSearch::new(manager)),
            Box::new(TokenOverlapScorer),
        )
    }

    pub fn with_config(mut self, config: RecommendConfig) -> Self {
        self.config = config;
        self
    }

    pub fn recommend_context(&self, text: &str, targets: &RecommendTargets) -> ContextRecommendation {
        let mut intent = self.intent.extract_intent(text);
        for file in &targets.files {
            let file = util::normalize_path(std::path::Path::new(file));
            if !intent.target_files.contains(&file) {
                intent.target_files.push(file);
            }
        }
        for symbol in &targets.symbols {
            if !intent.target_symbols.contains(symbol) {
                intent.target_symbols.push(symbol.clone());
            }
        }

        let mut files: Pool<String> = Pool::new();
        let mut symbols: Pool<Symbol> = Pool::new();
        let mut tests: Pool<String> = Pool::new();

        let index_empty = self.manager.with_state(|state| state.table().is_empty());
        if index_empty {
            tracing::info!("symbol table is empty, recommending from search results only");
        } else {
            self.seed_from_files(&intent, &mut files, &mut tests);
            self.seed_from_symbols(&intent, &mut files, &mut symbols);
        }

        for keyword in &intent.keywords {
            for symbol in self.search.search_symbols(keyword, self.config.max_symbols) {
                files.add(symbol.file_path.clone(), format!("defines a symbol matching `{keyword}`"));
                symbols.add(symbol, format!("matches keyword `{keyword}`"));
            }
            for file in self.search.search_files(keyword, self.config.max_files) {
                files.add(file, format!("path matches `{keyword}`"));
            }
        }

        // Tests found as ordinary files belong in the test list.
        let test_paths: BTreeSet<String> = self.manager.with_state(|state| {
            state
                .files()
                .filter(|(_, file)| file.is_test)
                .map(|(path, _)| path.to_string())
                .collect()
        });
        let mut plain_files: Pool<String> = Pool::new();
        for (idx, file) in files.order.into_iter().enumerate() {
            let reasons = files.reasons.remove(&idx).unwrap_or_default();
            if intent.target_files.contains(&file) {
                continue;
            }
            let pool = if test_paths.contains(&file) {
                &mut tests
            } else {
                &mut plain_files
            };
            for reason in reasons {
                pool.add(file.clone(), reason);
            }
        }

        let scorer = &self.scorer;
        let recommendation = ContextRecommendation {
            files: plain_files.rank(self.config.max_files, |file| {
                scorer.score(text, Candidate::File(file))
            }),
            symbols: symbols.rank(self.config.max_symbols, |symbol| {
                scorer.score(text, Candidate::Symbol(symbol))
            }),
            tests: tests.rank(self.config.max_tests, |file| {
                scorer.score(text, Candidate::File(file))
            }),
        };
        tracing::debug!(
            files = recommendation.files.len(),
            symbols = recommendation.symbols.len(),
            tests = recommendation.tests.len(),
            "recommendation ready"
        );
        recommendation
    }

    fn seed_from_files(&self, intent: &Intent, files: &mut Pool<String>, tests: &mut Pool<String>) {
        self.manager.with_state(|state| {
            for target in &intent.target_files {
                for dependency in state.graph().dependencies(target) {
                    files.add(dependency.to_string(), format!("imported by {target}"));
                }
                for dependent in state.graph().dependents(target) {
                    files.add(dependent.to_string(), format!("imports {target}"));
                }
                for test in TestImpactLayer::new(state).analyze([target.as_str()]) {
                    if test != *target {
                        tests.add(test, format!("tests {target}"));
                    }
                }
            }
        });
    }

    fn seed_from_symbols(&self, intent: &Intent, files: &mut Pool<String>, symbols: &mut Pool<Symbol>) {
        self.manager.with_state(|state| {
            for name in &intent.target_symbols {
                let definitions: Vec<Symbol> = state.table().definitions(name).cloned().collect();
                for definition in definitions {
                    files.add(definition.file_path.clone(), format!("defines {name}"));
                    for reference in state.find_references(name, &definition.file_path) {
                        if reference.file_path == definition.file_path {
                            continue;
                        }
                        files.add(reference.file_path.clone(), format!("uses {name}"));
                        let user = state
                            .enclosing_scope(&reference.file_path, reference.line_start, reference.line_start)
                            .cloned()
                            .unwrap_or(reference);
                        symbols.add(user, format!("uses {name}"));
                    }
                    symbols.add(definition, format!("definition of {name}"));
                }
            }
        });
    }
}

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "when", "then", "than",
    "add", "fix", "make", "use", "should", "must", "can", "all", "any", "are", "was", "were",
    "has", "have", "not", "but", "its", "our", "new", "also", "function", "method", "class",
    "file", "code", "change", "update", "support",
];

/// Picks path-like tokens as files, code-shaped tokens (`snake_case`, `camelCase`,
/// `Name::path`, `call()`) as symbols and the remaining words as keywords.
pub struct KeywordIntentExtractor;

impl IntentExtractor for KeywordIntentExtractor {
    fn extract_intent(&self, text: &str) -> Intent {
        let mut intent = Intent::default();
        for raw in text.split_whitespace() {
            let token = raw.trim_matches(|ch: char| {
                matches!(ch, '`' | '"' | '\'' | ',' | ';' | ':' | '!' | '?' | '(' | ')' | '[' | ']')
            });
            let token = token.trim_end_matches('.');
            if token.is_empty() {
                continue;
            }
            if looks_like_path(token) {
                push_unique(&mut intent.target_files, token.trim_start_matches("./").to_string());
                continue;
            }
            let called = raw.contains("()") || raw.ends_with('(');
            for part in token.split("::").flat_map(|p| p.split('.')) {
                let part = part.trim_end_matches("()");
                if !is_identifier(part) {
                    continue;
                }
                if called || looks_like_code(part) {
                    push_unique(&mut intent.target_symbols, part.to_string());
                } else {
                    let word = part.to_lowercase();
                    if word.len() >= 3 && !STOPWORDS.contains(&word.as_str()) {
                        push_unique(&mut intent.keywords, word);
                    }
                }
            }
        }
        // Symbol names double as search terms.
        for symbol in &intent.target_symbols {
            push_unique(&mut intent.keywords, symbol.clone());
        }
        intent
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "pyi", "rs", "go", "js", "jsx", "mjs", "cjs", "ts", "tsx", "json", "toml", "yaml", "yml",
    "md",
];

fn looks_like_path(token: &str) -> bool {
    if token.contains("::") {
        return false;
    }
    match token.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            SOURCE_EXTENSIONS.contains(&ext) || (token.contains('/') && ext.chars().all(char::is_alphanumeric))
        }
        _ => false,
    }
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(ch) if ch.is_alphabetic() || ch == '_')
        && chars.all(|ch| ch.is_alphanumeric() || ch == '_')
}

fn looks_like_code(token: &str) -> bool {
    let inner_upper = token.chars().skip(1).any(|ch| ch.is_uppercase());
    let has_lower = token.chars().any(|ch| ch.is_lowercase());
    token.contains('_') && token.len() > 1 || (inner_upper && has_lower)
}

/// Case-insensitive exact name lookup over the symbol table, plus path substring search.
pub struct NameIndexSearch<'a> {
    manager: &'a ContextManager,
}

impl<'a> NameIndexSearch<'a> {
    pub fn new(manager: &'a ContextManager) -> Self {
        Self { manager }
    }
}

impl SemanticSearch for NameIndexSearch<'_> {
    fn search_symbols(&self, query: &str, limit: usize) -> Vec<Symbol> {
        let needle = query.to_lowercase();
        self.manager.with_state(|state| {
            let mut names: Vec<&str> = state
                .table()
                .names()
                .filter(|name| name.to_lowercase() == needle)
                .collect();
            names.sort_unstable();
            let mut seen = BTreeSet::new();
            names
                .into_iter()
                .flat_map(|name| state.table().lookup(name))
                .filter(|symbol| symbol.kind != SymbolKind::Import)
                .filter(|symbol| {
                    seen.insert((symbol.file_path.clone(), symbol.name.clone(), symbol.line_start))
                })
                .take(limit)
                .cloned()
                .collect()
        })
    }

    fn search_files(&self, query: &str, limit: usize) -> Vec<String> {
        let needle = query.to_lowercase();
        self.manager.with_state(|state| {
            state
                .files()
                .map(|(path, _)| path)
                .filter(|path| path.to_lowercase().contains(&needle))
                .take(limit)
                .map(str::to_string)
                .collect()
        })
    }
}

/// Share of query words found in the candidate's name, path, signature and doc,
/// scaled to 0 to 10.
pub struct TokenOverlapScorer;

impl RelevanceScorer for TokenOverlapScorer {
    fn score(&self, query: &str, candidate: Candidate<'_>) -> f32 {
        let query_tokens = word_tokens(query);
        if query_tokens.is_empty() {
            return 0.0;
        }
        let mut text = String::new();
        match candidate {
            Candidate::File(path) => text.push_str(path),
            Candidate::Symbol(symbol) => {
                text.push_str(&symbol.name);
                text.push(' ');
                text.push_str(&symbol.file_path);
                for extra in [&symbol.signature, &symbol.doc, &symbol.parent].into_iter().flatten() {
                    text.push(' ');
                    text.push_str(extra);
                }
            }
        }
        let candidate_tokens = word_tokens(&text);
        let hits = query_tokens
            .iter()
            .filter(|token| candidate_tokens.contains(*token))
            .count();
        10.0 * hits as f32 / query_tokens.len() as f32
    }
}

/// Lowercase words, splitting `snake_case`, `camelCase` and path separators.
fn word_tokens(text: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    let mut current = String::new();
    let mut prev_lower = false;
    let flush = |current: &mut String, tokens: &mut BTreeSet<String>| {
        if current.len() >= 2 && !STOPWORDS.contains(&current.as_str()) {
            tokens.insert(std::mem::take(current));
        } else {
            current.clear();
        }
    };
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() && prev_lower {
                flush(&mut current, &mut tokens);
            }
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
            current.extend(ch.to_lowercase());
        } else {
            flush(&mut current, &mut tokens);
            prev_lower = false;
        }
    }
    flush(&mut current, &mut tokens);
    tokens
}
