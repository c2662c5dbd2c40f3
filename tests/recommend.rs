use codectx::config::EngineConfig;
use codectx::indexer::registry::LanguageRegistry;
use codectx::provider::MemoryProvider;
use codectx::recommend::{
    Candidate, ContextRecommender, KeywordIntentExtractor, RecommendConfig, RecommendTargets,
    RelevanceScorer, SemanticSearch,
};
use codectx::{ContextManager, Symbol, SymbolKind};
use std::sync::Arc;

const FILES: &[(&str, &str)] = &[
    (
        "api/client.py",
        "from api.retry import with_retries\n\ndef fetch_user(user_id):\n    return with_retries(lambda: user_id)\n",
    ),
    ("api/retry.py", "def with_retries(call, attempts=3):\n    return call()\n"),
    (
        "tests/test_client.py",
        "from api.client import fetch_user\n\ndef test_fetch_user():\n    assert fetch_user(1) == 1\n",
    ),
    ("billing/invoice.py", "def total(items):\n    return sum(items)\n"),
];

fn indexed(files: &[(&str, &str)]) -> ContextManager {
    let provider = Arc::new(MemoryProvider::with_files(files.iter().copied()));
    let manager = ContextManager::with_config(
        LanguageRegistry::with_defaults(),
        provider.clone(),
        EngineConfig::default(),
    );
    manager.scan(&provider.paths());
    manager
}

#[test]
fn recommends_neighbours_tests_and_symbols() {
    let manager = indexed(FILES);
    let recommendation = ContextRecommender::with_defaults(&manager).recommend_context(
        "add retries to fetch_user in api/client.py",
        &RecommendTargets::default(),
    );

    let files: Vec<_> = recommendation.files.iter().map(|r| r.item.as_str()).collect();
    assert!(files.contains(&"api/retry.py"));
    assert!(!files.contains(&"api/client.py"));
    assert!(!files.contains(&"tests/test_client.py"));

    let tests: Vec<_> = recommendation.tests.iter().map(|r| r.item.as_str()).collect();
    assert_eq!(tests, vec!["tests/test_client.py"]);

    let top = &recommendation.symbols[0];
    assert_eq!(top.item.name, "fetch_user");
    assert!(top.reasons.contains(&"definition of fetch_user".to_string()));
    assert!(top.reasons.contains(&"matches keyword `fetch_user`".to_string()));
    assert!(
        recommendation
            .symbols
            .iter()
            .any(|r| r.item.name == "test_fetch_user")
    );

    for scored in recommendation.symbols.windows(2) {
        assert!(scored[0].score >= scored[1].score);
    }
    assert!(
        recommendation
            .files
            .iter()
            .all(|r| (0.0..=10.0).contains(&r.score))
    );
}

#[test]
fn explicit_symbol_targets_seed_definitions() {
    let manager = indexed(FILES);
    let targets = RecommendTargets {
        files: Vec::new(),
        symbols: vec!["total".to_string()],
    };
    let recommendation =
        ContextRecommender::with_defaults(&manager).recommend_context("", &targets);
    assert_eq!(recommendation.symbols[0].item.name, "total");
    assert_eq!(recommendation.files[0].item, "billing/invoice.py");
    assert!(recommendation.tests.is_empty());
}

#[test]
fn limits_truncate_each_list() {
    let manager = indexed(FILES);
    let recommendation = ContextRecommender::with_defaults(&manager)
        .with_config(RecommendConfig {
            max_files: 0,
            max_symbols: 1,
            max_tests: 0,
        })
        .recommend_context("fix fetch_user in api/client.py", &RecommendTargets::default());
    assert!(recommendation.files.is_empty());
    assert!(recommendation.tests.is_empty());
    assert_eq!(recommendation.symbols.len(), 1);
}

struct FixedSearch;

impl SemanticSearch for FixedSearch {
    fn search_symbols(&self, query: &str, _limit: usize) -> Vec<Symbol> {
        vec![Symbol::new(query, SymbolKind::Function, "remote/lib.py", 1, 3)]
    }

    fn search_files(&self, _query: &str, _limit: usize) -> Vec<String> {
        vec!["remote/README.py".to_string()]
    }
}

struct Overeager;

impl RelevanceScorer for Overeager {
    fn score(&self, _query: &str, candidate: Candidate<'_>) -> f32 {
        match candidate {
            Candidate::File(_) => 42.0,
            Candidate::Symbol(_) => -3.0,
        }
    }
}

#[test]
fn empty_index_uses_collaborators_only() {
    let manager = indexed(&[]);
    let recommender = ContextRecommender::new(
        &manager,
        Box::new(KeywordIntentExtractor),
        Box::new(FixedSearch),
        Box::new(Overeager),
    );
    let recommendation = recommender.recommend_context("tune the parser", &RecommendTargets::default());

    let names: Vec<_> = recommendation.symbols.iter().map(|r| r.item.name.as_str()).collect();
    assert_eq!(names, vec!["tune", "parser"]);
    assert!(recommendation.symbols.iter().all(|r| r.score == 0.0));

    assert_eq!(recommendation.files.len(), 2);
    assert!(recommendation.files.iter().all(|r| r.score == 10.0));
    let readme = recommendation
        .files
        .iter()
        .find(|r| r.item == "remote/README.py")
        .unwrap();
    assert_eq!(readme.reasons, vec!["path matches `tune`", "path matches `parser`"]);
}

#[test]
fn empty_index_with_default_collaborators_is_empty() {
    let manager = indexed(&[]);
    let recommendation = ContextRecommender::with_defaults(&manager)
        .recommend_context("anything at all", &RecommendTargets::default());
    assert!(recommendation.is_empty());
}
