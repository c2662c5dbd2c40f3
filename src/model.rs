use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Variable,
    Import,
    Method,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Variable => "variable",
            SymbolKind::Import => "import",
            SymbolKind::Method => "method",
        }
    }

    /// Kinds that open a lexical scope an edit can sit inside.
    pub fn is_scope(&self) -> bool {
        matches!(
            self,
            SymbolKind::Function | SymbolKind::Class | SymbolKind::Method
        )
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Method)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named definition extracted from one file. Lines are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub line_start: usize,
    pub line_end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl Symbol {
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        file_path: impl Into<String>,
        line_start: usize,
        line_end: usize,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            file_path: file_path.into(),
            line_start,
            line_end: line_end.max(line_start),
            signature: None,
            doc: None,
            parent: None,
        }
    }

    pub fn with_signature(mut self, signature: Option<String>) -> Self {
        self.signature = signature;
        self
    }

    pub fn with_doc(mut self, doc: Option<String>) -> Self {
        self.doc = doc;
        self
    }

    pub fn with_parent(mut self, parent: Option<String>) -> Self {
        self.parent = parent;
        self
    }

    pub fn contains_range(&self, line_start: usize, line_end: usize) -> bool {
        self.line_start <= line_start && line_end <= self.line_end
    }

    pub fn contains_line(&self, line: usize) -> bool {
        self.contains_range(line, line)
    }

    pub fn overlaps(&self, line_start: usize, line_end: usize) -> bool {
        self.line_start <= line_end && line_start <= self.line_end
    }

    pub fn span_len(&self) -> usize {
        self.line_end - self.line_start
    }

    fn sort_key(&self) -> (&str, usize, usize, &str, SymbolKind) {
        (
            self.file_path.as_str(),
            self.line_start,
            self.line_end,
            self.name.as_str(),
            self.kind,
        )
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.signature.cmp(&other.signature))
            .then_with(|| self.parent.cmp(&other.parent))
            .then_with(|| self.doc.cmp(&other.doc))
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An identifier occurrence that is neither a definition name nor part of an import.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Usage {
    pub name: String,
    pub line: usize,
    pub column: usize,
}

/// One import statement of `source_file`. An empty `imported_names` means the whole
/// module was imported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dependency {
    pub source_file: String,
    pub target_reference: String,
    pub imported_names: BTreeSet<String>,
    pub line: usize,
}

impl Dependency {
    pub fn new(source_file: impl Into<String>, target_reference: impl Into<String>, line: usize) -> Self {
        Self {
            source_file: source_file.into(),
            target_reference: target_reference.into(),
            imported_names: BTreeSet::new(),
            line,
        }
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imported_names.extend(names.into_iter().map(Into::into));
        self
    }
}
