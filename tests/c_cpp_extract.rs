use codectx::SymbolKind;
use codectx::indexer::c_cpp::{CFamilyExtractor, include_candidates};
use codectx::indexer::extract::{DependencyAnalyzer, ImportCandidate, ParseLimits, SymbolExtractor};

const C_SOURCE: &str = r#"#include <stdio.h>
#include "list.h"

#define MAX_ITEMS 64
#define SQUARE(x) ((x) * (x))

typedef struct {
    int len;
    int cap;
} buffer_t;

struct node {
    int value;
    struct node *next;
};

static int counter = 0;
int (*on_push)(int value);

/* Pushes one value. */
int list_push(struct node *head, int value) {
    counter++;
    return SQUARE(value) + head->value;
}

char *list_name(void);
"#;

const CPP_SOURCE: &str = r#"#include "shape.hpp"

namespace geo {

/// A 2D point.
class Point {
public:
    Point(double x, double y);
    double norm() const;
    double dot(const Point &other) const { return x_ * other.x_; }

private:
    double x_;
};

template <typename T>
T clamp(T v, T lo, T hi) {
    return v;
}

}

double geo::Point::norm() const {
    return x_;
}
"#;

fn c() -> CFamilyExtractor {
    CFamilyExtractor::c(ParseLimits::default()).unwrap()
}

fn cpp() -> CFamilyExtractor {
    CFamilyExtractor::cpp(ParseLimits::default()).unwrap()
}

#[test]
fn c_functions_types_macros_and_globals() {
    let symbols = c().extract_symbols("src/list.c", C_SOURCE).unwrap();
    let found: Vec<_> = symbols
        .iter()
        .map(|s| (s.kind, s.name.as_str(), s.parent.as_deref()))
        .collect();

    assert!(found.contains(&(SymbolKind::Import, "stdio.h", None)));
    assert!(found.contains(&(SymbolKind::Import, "list.h", None)));
    assert!(found.contains(&(SymbolKind::Variable, "MAX_ITEMS", None)));
    assert!(found.contains(&(SymbolKind::Function, "SQUARE", None)));
    assert!(found.contains(&(SymbolKind::Class, "buffer_t", None)));
    assert!(found.contains(&(SymbolKind::Variable, "len", Some("buffer_t"))));
    assert!(found.contains(&(SymbolKind::Class, "node", None)));
    assert!(found.contains(&(SymbolKind::Variable, "next", Some("node"))));
    assert!(found.contains(&(SymbolKind::Variable, "counter", None)));
    assert!(found.contains(&(SymbolKind::Variable, "on_push", None)));
    assert!(found.contains(&(SymbolKind::Function, "list_push", None)));
    assert!(found.contains(&(SymbolKind::Function, "list_name", None)));

    let push = symbols.iter().find(|s| s.name == "list_push").unwrap();
    assert_eq!(push.signature.as_deref(), Some("(struct node *head, int value) -> int"));
    assert_eq!(push.doc.as_deref(), Some("Pushes one value."));
    assert_eq!((push.line_start, push.line_end), (21, 24));
    let square = symbols.iter().find(|s| s.name == "SQUARE").unwrap();
    assert_eq!(square.signature.as_deref(), Some("(x)"));
}

#[test]
fn c_usages_skip_declarators() {
    let extracted = c().extract("src/list.c", C_SOURCE).unwrap();
    let counter_lines: Vec<_> = extracted
        .usages
        .iter()
        .filter(|u| u.name == "counter")
        .map(|u| u.line)
        .collect();
    assert_eq!(counter_lines, vec![22]);
    assert!(!extracted.usages.iter().any(|u| u.name == "list_push"));
    assert!(extracted.usages.iter().any(|u| u.name == "SQUARE" && u.line == 23));
}

#[test]
fn cpp_classes_namespaces_and_out_of_line_methods() {
    let symbols = cpp().extract_symbols("src/point.cpp", CPP_SOURCE).unwrap();
    let found: Vec<_> = symbols
        .iter()
        .map(|s| (s.kind, s.name.as_str(), s.parent.as_deref()))
        .collect();

    assert!(found.contains(&(SymbolKind::Import, "shape.hpp", None)));
    assert!(found.contains(&(SymbolKind::Class, "geo", None)));
    assert!(found.contains(&(SymbolKind::Class, "Point", Some("geo"))));
    assert!(found.contains(&(SymbolKind::Method, "Point", Some("Point"))));
    assert!(found.contains(&(SymbolKind::Method, "dot", Some("Point"))));
    assert!(found.contains(&(SymbolKind::Variable, "x_", Some("Point"))));
    assert!(found.contains(&(SymbolKind::Function, "clamp", Some("geo"))));

    let norms: Vec<_> = symbols.iter().filter(|s| s.name == "norm").collect();
    assert_eq!(norms.len(), 2);
    assert!(norms.iter().all(|s| s.kind == SymbolKind::Method));
    assert!(norms.iter().all(|s| s.parent.as_deref() == Some("Point")));
    assert_eq!((norms[1].line_start, norms[1].line_end), (23, 25));

    let point = symbols
        .iter()
        .find(|s| s.name == "Point" && s.kind == SymbolKind::Class)
        .unwrap();
    assert_eq!(point.doc.as_deref(), Some("A 2D point."));
    let clamp = symbols.iter().find(|s| s.name == "clamp").unwrap();
    assert_eq!(clamp.signature.as_deref(), Some("(T v, T lo, T hi) -> T"));
}

#[test]
fn includes_resolve_next_to_the_file_first() {
    let deps = c().analyze_imports("src/list.c", C_SOURCE).unwrap();
    let refs: Vec<_> = deps.iter().map(|d| (d.target_reference.as_str(), d.line)).collect();
    assert_eq!(refs, vec![("stdio.h", 1), ("list.h", 2)]);

    let candidates = c().candidates(&deps[1]);
    assert_eq!(candidates[0], ImportCandidate::File("src/list.h".to_string()));
    assert!(candidates.contains(&ImportCandidate::File("include/list.h".to_string())));

    assert_eq!(
        include_candidates("lib/geo/point.cpp", "geo/shape.hpp")[..2],
        ["lib/geo/geo/shape.hpp".to_string(), "lib/geo/include/geo/shape.hpp".to_string()]
    );
}
