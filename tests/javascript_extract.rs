use codectx::SymbolKind;
use codectx::indexer::extract::{DependencyAnalyzer, ParseLimits, SymbolExtractor};
use codectx::indexer::javascript::{ScriptExtractor, specifier_candidates};

const JS_SOURCE: &str = r#"import React from "react";
import { foo, bar as baz } from "./lib/foo";
import * as utils from "../utils";
const fs = require("fs");

// Base class.
export class Base {}

class Foo extends Base {
  constructor() {}
  method(x) { return foo(x); }
}

export function util(a, b = 1) {
  return a + b;
}

const MAX = 10;
const handler = (req) => util(req, MAX);

util(1, 2);
"#;

const TS_SOURCE: &str = r#"import { Config } from "./config";

export interface Options {
  retries: number;
}

export type Id = string;

export enum Mode { Fast, Slow }

export class Client {
  constructor(private readonly opts: Options) {}
  async fetch(id: Id, force?: boolean): Promise<string> {
    return "";
  }
}

export const DEFAULT_TIMEOUT: number = 30;

export function create(opts: Options): Client {
  return new Client(opts);
}
"#;

fn javascript() -> ScriptExtractor {
    ScriptExtractor::javascript(ParseLimits::default()).unwrap()
}

fn typescript() -> ScriptExtractor {
    ScriptExtractor::typescript(ParseLimits::default()).unwrap()
}

#[test]
fn javascript_symbols() {
    let symbols = javascript().extract_symbols("src/app.js", JS_SOURCE).unwrap();
    let found: Vec<_> = symbols
        .iter()
        .map(|s| (s.kind, s.name.as_str(), s.parent.as_deref()))
        .collect();

    for import in ["React", "foo", "baz", "utils"] {
        assert!(found.contains(&(SymbolKind::Import, import, None)), "{import}");
    }
    assert!(found.contains(&(SymbolKind::Variable, "fs", None)));
    assert!(found.contains(&(SymbolKind::Class, "Base", None)));
    assert!(found.contains(&(SymbolKind::Class, "Foo", None)));
    assert!(found.contains(&(SymbolKind::Method, "constructor", Some("Foo"))));
    assert!(found.contains(&(SymbolKind::Method, "method", Some("Foo"))));
    assert!(found.contains(&(SymbolKind::Function, "util", None)));
    assert!(found.contains(&(SymbolKind::Variable, "MAX", None)));
    assert!(found.contains(&(SymbolKind::Function, "handler", None)));

    let get = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();
    assert_eq!(get("util").signature.as_deref(), Some("(a, b = 1)"));
    assert_eq!(get("handler").signature.as_deref(), Some("(req)"));
    assert_eq!(get("Base").doc.as_deref(), Some("Base class."));
    assert_eq!((get("util").line_start, get("util").line_end), (14, 16));
}

#[test]
fn javascript_usages_and_dependencies() {
    let mut extractor = javascript();
    let extracted = extractor.extract("src/app.js", JS_SOURCE).unwrap();
    let util_lines: Vec<_> = extracted
        .usages
        .iter()
        .filter(|u| u.name == "util")
        .map(|u| u.line)
        .collect();
    assert_eq!(util_lines, vec![19, 21]);

    let deps = extractor.analyze_imports("src/app.js", JS_SOURCE).unwrap();
    let refs: Vec<_> = deps.iter().map(|d| d.target_reference.as_str()).collect();
    assert_eq!(refs, vec!["react", "./lib/foo", "../utils", "fs"]);
    assert!(deps[0].imported_names.contains("default"));
    assert!(deps[1].imported_names.contains("bar"));
    assert!(deps[2].imported_names.is_empty());
}

#[test]
fn specifiers_map_to_candidate_files() {
    let got = specifier_candidates("src/app.js", "./lib/foo");
    assert_eq!(got[0], "src/lib/foo.ts");
    assert!(got.contains(&"src/lib/foo.js".to_string()));
    assert!(got.contains(&"src/lib/foo/index.js".to_string()));

    let explicit = specifier_candidates("src/app.ts", "./util.js");
    assert_eq!(explicit, vec!["src/util.js", "src/util.ts", "src/util.tsx"]);

    assert!(specifier_candidates("src/app.js", "react").is_empty());
}

#[test]
fn typescript_declarations() {
    let symbols = typescript().extract_symbols("src/api.ts", TS_SOURCE).unwrap();
    let found: Vec<_> = symbols
        .iter()
        .map(|s| (s.kind, s.name.as_str(), s.parent.as_deref()))
        .collect();

    assert!(found.contains(&(SymbolKind::Import, "Config", None)));
    assert!(found.contains(&(SymbolKind::Class, "Options", None)));
    assert!(found.contains(&(SymbolKind::Class, "Id", None)));
    assert!(found.contains(&(SymbolKind::Class, "Mode", None)));
    assert!(found.contains(&(SymbolKind::Class, "Client", None)));
    assert!(found.contains(&(SymbolKind::Method, "fetch", Some("Client"))));
    assert!(found.contains(&(SymbolKind::Variable, "DEFAULT_TIMEOUT", None)));
    assert!(found.contains(&(SymbolKind::Function, "create", None)));

    let get = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();
    assert_eq!(
        get("fetch").signature.as_deref(),
        Some("(id: Id, force?: boolean) -> Promise<string>")
    );
    assert_eq!(get("create").signature.as_deref(), Some("(opts: Options) -> Client"));
    assert_eq!(get("DEFAULT_TIMEOUT").signature.as_deref(), Some("number"));
}

#[test]
fn tsx_files_use_the_tsx_grammar() {
    let source = "export function View() {\n  return <div className=\"x\" />;\n}\n";
    let symbols = typescript().extract_symbols("src/view.tsx", source).unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].name, "View");
}
