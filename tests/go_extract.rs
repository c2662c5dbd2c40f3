use codectx::SymbolKind;
use codectx::indexer::extract::{DependencyAnalyzer, ImportCandidate, SymbolExtractor};
use codectx::indexer::go::{GoExtractor, package_dirs};

const SOURCE: &str = r#"package store

import (
	"fmt"
	yaml "gopkg.in/yaml.v3"
	"github.com/acme/app/models"
)

const Limit = 10

var (
	cache map[string]int
	hits, misses int
)

// User is a stored user.
type User struct {
	ID   int
	Name string
}

// Save persists the user.
func (u *User) Save(ctx context.Context, force bool) error {
	fmt.Println(u.Name)
	return nil
}

func Load(id int) (*User, error) {
	return &User{ID: id}, nil
}
"#;

#[test]
fn extracts_top_level_declarations() {
    let mut extractor = GoExtractor::new().unwrap();
    let symbols = extractor.extract_symbols("store/user.go", SOURCE).unwrap();
    let found: Vec<_> = symbols
        .iter()
        .map(|s| (s.kind, s.name.as_str(), s.parent.as_deref()))
        .collect();

    assert!(found.contains(&(SymbolKind::Import, "fmt", None)));
    assert!(found.contains(&(SymbolKind::Import, "yaml", None)));
    assert!(found.contains(&(SymbolKind::Import, "models", None)));
    assert!(found.contains(&(SymbolKind::Variable, "Limit", None)));
    assert!(found.contains(&(SymbolKind::Variable, "cache", None)));
    assert!(found.contains(&(SymbolKind::Variable, "hits", None)));
    assert!(found.contains(&(SymbolKind::Variable, "misses", None)));
    assert!(found.contains(&(SymbolKind::Class, "User", None)));
    assert!(found.contains(&(SymbolKind::Method, "Save", Some("User"))));
    assert!(found.contains(&(SymbolKind::Function, "Load", None)));
}

#[test]
fn signatures_docs_and_spans() {
    let mut extractor = GoExtractor::new().unwrap();
    let symbols = extractor.extract_symbols("store/user.go", SOURCE).unwrap();
    let get = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();

    let save = get("Save");
    assert_eq!(save.signature.as_deref(), Some("(ctx context.Context, force bool) -> error"));
    assert_eq!(save.doc.as_deref(), Some("Save persists the user."));
    assert_eq!((save.line_start, save.line_end), (23, 26));

    assert_eq!(get("Load").signature.as_deref(), Some("(id int) -> (*User, error)"));
    assert_eq!(get("User").doc.as_deref(), Some("User is a stored user."));
    assert_eq!(get("cache").signature.as_deref(), Some("map[string]int"));
}

#[test]
fn usages_cover_types_and_packages() {
    let mut extractor = GoExtractor::new().unwrap();
    let extracted = extractor.extract("store/user.go", SOURCE).unwrap();
    let user_lines: Vec<_> = extracted
        .usages
        .iter()
        .filter(|u| u.name == "User")
        .map(|u| u.line)
        .collect();
    assert!(!user_lines.contains(&17));
    assert!(user_lines.contains(&28));
    assert!(user_lines.contains(&29));
    assert!(extracted.usages.iter().any(|u| u.name == "fmt" && u.line == 24));
}

#[test]
fn imports_resolve_to_package_directories() {
    let mut extractor = GoExtractor::new().unwrap();
    let deps = extractor.analyze_imports("store/user.go", SOURCE).unwrap();
    let refs: Vec<_> = deps.iter().map(|d| d.target_reference.as_str()).collect();
    assert_eq!(refs, vec!["fmt", "gopkg.in/yaml.v3", "github.com/acme/app/models"]);
    assert_eq!(deps[2].line, 6);

    let candidates = extractor.candidates(&deps[2]);
    assert_eq!(
        candidates,
        vec![
            ImportCandidate::Package {
                dir: "github.com/acme/app/models".to_string(),
                language: "go".to_string(),
            },
            ImportCandidate::Package {
                dir: "acme/app/models".to_string(),
                language: "go".to_string(),
            },
            ImportCandidate::Package {
                dir: "app/models".to_string(),
                language: "go".to_string(),
            },
            ImportCandidate::Package {
                dir: "models".to_string(),
                language: "go".to_string(),
            },
        ]
    );
    assert_eq!(package_dirs("a/b"), vec!["a/b", "b"]);
}
