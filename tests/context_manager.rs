use codectx::config::EngineConfig;
use codectx::indexer::registry::LanguageRegistry;
use codectx::provider::MemoryProvider;
use codectx::{ContextManager, SymbolKind, UpdateOutcome};
use std::sync::Arc;

struct Fixture {
    provider: Arc<MemoryProvider>,
    manager: ContextManager,
}

impl Fixture {
    fn new() -> Self {
        let provider = Arc::new(MemoryProvider::new());
        let manager = ContextManager::with_config(
            LanguageRegistry::with_defaults(),
            provider.clone(),
            EngineConfig::default(),
        );
        Self { provider, manager }
    }

    fn write(&self, path: &str, content: &str) -> UpdateOutcome {
        self.provider.insert(path, content);
        self.manager.update_context_for_file(path, content)
    }

    fn consistent(&self) -> bool {
        self.manager
            .with_state(|state| state.table().is_consistent() && state.graph().is_consistent())
    }
}

const A_PY: &str = "def process(x):\n    return x\n";
const B_PY: &str = "from a import process\n\ndef run():\n    return process(1)\n";

#[test]
fn references_cross_import_edges() {
    let fx = Fixture::new();
    fx.write("a.py", A_PY);
    fx.write("b.py", B_PY);

    assert_eq!(fx.manager.dependencies("b.py"), vec!["a.py"]);
    assert_eq!(fx.manager.dependents("a.py"), vec!["b.py"]);

    let refs = fx.manager.find_references("process", "a.py");
    let in_b: Vec<_> = refs.iter().filter(|r| r.file_path == "b.py").collect();
    assert_eq!(in_b.len(), 1);
    assert_eq!(in_b[0].line_start, 4);
    assert_eq!(in_b[0].kind, SymbolKind::Function);
    assert_eq!(in_b[0].parent.as_deref(), Some("run"));
    assert_eq!(in_b[0].signature.as_deref(), Some("(x)"));
}

#[test]
fn renamed_definition_replaces_old_one() {
    let fx = Fixture::new();
    fx.write("a.py", "def f(): pass\n");
    assert!(fx.manager.find_definition("f", "a.py").is_some());

    fx.write("a.py", "def g(): pass\n");
    assert!(fx.manager.find_definition("f", "a.py").is_none());
    let g = fx.manager.find_definition("g", "a.py").unwrap();
    assert_eq!(g.file_path, "a.py");
    assert_eq!(g.line_start, 1);
    assert!(fx.consistent());
}

#[test]
fn edit_context_scope_is_innermost_method() {
    let fx = Fixture::new();
    fx.write(
        "svc.py",
        "class Service:\n    def handle(self, req):\n        data = req.body\n        return data\n\n    def close(self):\n        pass\n",
    );
    let context = fx.manager.get_edit_context("svc.py", 3, 4);
    let scope = context.current_scope.unwrap();
    assert_eq!(scope.name, "handle");
    assert_eq!(scope.kind, SymbolKind::Method);
    assert!(context.summary.starts_with("Current scope: method handle"));
}

#[test]
fn edit_context_resolves_imported_names() {
    let fx = Fixture::new();
    fx.write("a.py", A_PY);
    fx.write("b.py", B_PY);

    let context = fx.manager.get_edit_context("b.py", 4, 4);
    assert_eq!(context.current_scope.as_ref().map(|s| s.name.as_str()), Some("run"));
    let process = context
        .used_symbols
        .iter()
        .find(|s| s.name == "process")
        .unwrap();
    assert_eq!(process.file_path, "a.py");
    assert_eq!(process.kind, SymbolKind::Function);
    assert_eq!(context.imported_symbols.len(), 1);
    assert_eq!(context.relevant_files, vec!["a.py"]);

    let definition = fx.manager.find_definition("process", "b.py").unwrap();
    assert_eq!(definition.file_path, "a.py");
}

#[test]
fn repeated_updates_are_idempotent() {
    let fx = Fixture::new();
    fx.write("a.py", A_PY);
    fx.write("b.py", B_PY);
    let symbols = fx.manager.symbols_in_file("b.py");
    let stats = fx.manager.stats();

    fx.write("b.py", "import os\n");
    assert!(fx.manager.dependencies("b.py").is_empty());
    fx.write("b.py", B_PY);

    assert_eq!(fx.manager.symbols_in_file("b.py"), symbols);
    assert_eq!(fx.manager.stats(), stats);
    assert_eq!(fx.manager.update_context_for_file("b.py", B_PY), UpdateOutcome::Unchanged);
    assert!(fx.consistent());
}

#[test]
fn graph_edges_are_mirrored() {
    let fx = Fixture::new();
    fx.write("pkg/__init__.py", "");
    fx.write("pkg/core.py", "def base():\n    return 1\n");
    fx.write("pkg/mid.py", "from .core import base\n\ndef mid():\n    return base()\n");
    fx.write("app.py", "from pkg.mid import mid\nfrom pkg import core\n\nmid()\n");

    for file in fx.manager.files() {
        for dep in fx.manager.dependencies(&file) {
            assert!(fx.manager.dependents(&dep).contains(&file), "{file} -> {dep}");
        }
        for user in fx.manager.dependents(&file) {
            assert!(fx.manager.dependencies(&user).contains(&file), "{user} -> {file}");
        }
    }
    assert!(fx.manager.dependencies("app.py").contains(&"pkg/mid.py".to_string()));
    assert!(fx.manager.dependencies("app.py").contains(&"pkg/__init__.py".to_string()));

    let chain = fx
        .manager
        .with_state(|state| state.graph().transitive_dependents("pkg/core.py", 8));
    assert!(chain.contains(&"pkg/mid.py".to_string()));
    assert!(chain.contains(&"app.py".to_string()));
    assert!(fx.consistent());
}

#[test]
fn garbage_input_is_contained() {
    let fx = Fixture::new();
    let outcome = fx.write("a.py", "def (((:\n\u{0}\u{1} class\n");
    assert_eq!(outcome, UpdateOutcome::Failed);
    assert!(fx.manager.symbols_in_file("a.py").is_empty());
    let diagnostics = fx.manager.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].file, "a.py");

    assert_eq!(fx.write("a.py", A_PY), UpdateOutcome::Indexed);
    assert!(fx.manager.diagnostics().is_empty());
    assert_eq!(fx.manager.symbols_in_file("a.py").len(), 1);

    for garbage in ["}}}}", "fn ( -> ;", "\u{feff}\u{0}"] {
        fx.manager.update_context_for_file("x.rs", garbage);
        fx.manager.update_context_for_file("x.go", garbage);
        fx.manager.update_context_for_file("x.ts", garbage);
    }
    assert!(fx.consistent());
}

#[test]
fn pending_imports_link_when_target_arrives() {
    let fx = Fixture::new();
    fx.write("b.py", B_PY);
    assert!(fx.manager.dependencies("b.py").is_empty());
    assert_eq!(fx.manager.stats().pending_imports, 1);

    fx.write("a.py", A_PY);
    assert_eq!(fx.manager.dependencies("b.py"), vec!["a.py"]);
    assert_eq!(fx.manager.stats().pending_imports, 0);

    assert!(fx.manager.remove_file("a.py"));
    assert!(fx.manager.dependencies("b.py").is_empty());
    assert!(fx.manager.dependents("a.py").is_empty());
    assert_eq!(fx.manager.stats().pending_imports, 1);
    assert!(
        fx.manager
            .find_definition("process", "a.py")
            .is_none_or(|symbol| symbol.kind == SymbolKind::Import)
    );
    assert!(fx.consistent());
}

#[test]
fn refresh_reads_through_provider() {
    let fx = Fixture::new();
    fx.provider.insert("a.py", A_PY);
    assert_eq!(fx.manager.refresh_file("a.py").unwrap(), UpdateOutcome::Indexed);
    assert_eq!(fx.manager.language_of("a.py").as_deref(), Some("python"));

    fx.provider.remove("a.py");
    assert_eq!(fx.manager.refresh_file("a.py").unwrap(), UpdateOutcome::Removed);
    assert!(fx.manager.files().is_empty());
    assert_eq!(fx.manager.refresh_file("a.py").unwrap(), UpdateOutcome::Skipped);
}

#[test]
fn bulk_scan_links_in_any_order() {
    let fx = Fixture::new();
    fx.provider.insert("b.py", B_PY);
    fx.provider.insert("a.py", A_PY);
    fx.provider.insert("notes.txt", "not code");
    let report = fx.manager.scan(&fx.provider.paths());
    assert_eq!(report.indexed, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(fx.manager.dependencies("b.py"), vec!["a.py"]);

    let again = fx.manager.scan(&fx.provider.paths());
    assert_eq!(again.unchanged, 2);
    assert_eq!(again.indexed, 0);
}

#[test]
fn go_packages_resolve_to_directories() {
    let fx = Fixture::new();
    fx.write("store/user.go", "package store\n\nfunc Load() int { return 1 }\n");
    fx.write("store/user_test.go", "package store\n\nfunc TestLoad() {}\n");
    fx.write(
        "main.go",
        "package main\n\nimport \"github.com/acme/app/store\"\n\nfunc main() { store.Load() }\n",
    );
    assert_eq!(fx.manager.dependencies("main.go"), vec!["store/user.go"]);
}
