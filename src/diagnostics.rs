use blake3::Hasher;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// A contained per-file failure: parse errors, unreadable files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: Option<usize>,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            ..Self::warning(file, message)
        }
    }

    pub fn at_line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }

    pub fn fingerprint(&self) -> String {
        let mut hasher = Hasher::new();
        push_str(&mut hasher, &self.file);
        match self.line {
            Some(line) => push_str(&mut hasher, &line.to_string()),
            None => push_str(&mut hasher, "-"),
        }
        push_str(&mut hasher, &self.severity.to_string());
        push_str(&mut hasher, &self.message);
        hasher.finalize().to_hex().to_string()
    }
}

/// Bounded, de-duplicated list of diagnostics, oldest first. Re-recording an identical
/// diagnostic moves it to the back instead of storing it twice.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    entries: VecDeque<(String, Diagnostic)>,
    capacity: usize,
}

impl DiagnosticLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        if self.capacity == 0 {
            return;
        }
        let fingerprint = diagnostic.fingerprint();
        self.entries.retain(|(existing, _)| *existing != fingerprint);
        self.entries.push_back((fingerprint, diagnostic));
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Forgets diagnostics of `file`, e.g. once it parses cleanly again.
    pub fn clear_file(&mut self, file: &str) {
        self.entries.retain(|(_, diagnostic)| diagnostic.file != file);
    }

    pub fn for_file<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.iter().filter(move |diagnostic| diagnostic.file == file)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(|(_, diagnostic)| diagnostic)
    }

    pub fn to_vec(&self) -> Vec<Diagnostic> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn push_str(hasher: &mut Hasher, value: &str) {
    hasher.update(value.as_bytes());
    hasher.update(b"\n");
}
