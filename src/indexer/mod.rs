use crate::error::ParseError;
use crate::indexer::extract::{DependencyAnalyzer, ImportCandidate, SymbolExtractor};
use crate::indexer::registry::LanguageRegistry;
use crate::model::{Dependency, Symbol, Usage};
use crate::util;
use std::collections::HashMap;
use std::time::Instant;

pub mod c_cpp;
pub mod extract;
pub mod go;
pub mod java;
pub mod javascript;
pub mod python;
pub mod registry;
pub mod rust;
pub mod scan;
pub mod test_detection;

/// One import of a file together with the places it may point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub dependency: Dependency,
    pub candidates: Vec<ImportCandidate>,
}

/// Everything a single file contributes to the index. Produced without touching shared
/// state so it can be computed on any thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAnalysis {
    pub path: String,
    pub language: String,
    pub hash: String,
    pub symbols: Vec<Symbol>,
    pub usages: Vec<Usage>,
    pub imports: Vec<ImportRecord>,
    pub error: Option<ParseError>,
}

impl FileAnalysis {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Extractors and analyzers created lazily per language and reused across files.
/// Parsers are not shareable, so each worker thread owns one of these.
pub struct LanguageTools<'r> {
    registry: &'r LanguageRegistry,
    extractors: HashMap<String, Option<Box<dyn SymbolExtractor>>>,
    analyzers: HashMap<String, Option<Box<dyn DependencyAnalyzer>>>,
}

impl<'r> LanguageTools<'r> {
    pub fn new(registry: &'r LanguageRegistry) -> Self {
        Self {
            registry,
            extractors: HashMap::new(),
            analyzers: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &'r LanguageRegistry {
        self.registry
    }

    pub fn extractor(&mut self, language: &str) -> Option<&mut Box<dyn SymbolExtractor>> {
        let registry = self.registry;
        self.extractors
            .entry(language.to_string())
            .or_insert_with(|| registry.extractor_for(language))
            .as_mut()
    }

    pub fn analyzer(&mut self, language: &str) -> Option<&mut Box<dyn DependencyAnalyzer>> {
        let registry = self.registry;
        self.analyzers
            .entry(language.to_string())
            .or_insert_with(|| registry.analyzer_for(language))
            .as_mut()
    }

    /// Extracts symbols, usages and imports of `path`. A parse failure leaves every list
    /// empty and is reported in `error`; it never aborts the caller.
    pub fn analyze(&mut self, path: &str, language: &str, content: &str) -> FileAnalysis {
        let started = Instant::now();
        let mut analysis = FileAnalysis {
            path: path.to_string(),
            language: language.to_string(),
            hash: util::content_hash(content),
            symbols: Vec::new(),
            usages: Vec::new(),
            imports: Vec::new(),
            error: None,
        };

        if let Some(extractor) = self.extractor(language) {
            match extractor.extract(path, content) {
                Ok(extracted) => {
                    analysis.symbols = extracted.symbols;
                    analysis.usages = extracted.usages;
                }
                Err(err) => analysis.error = Some(err),
            }
        }

        if analysis.error.is_none()
            && let Some(analyzer) = self.analyzer(language)
        {
            match analyzer.analyze_imports(path, content) {
                Ok(deps) => {
                    analysis.imports = deps
                        .into_iter()
                        .map(|dependency| ImportRecord {
                            candidates: analyzer.candidates(&dependency),
                            dependency,
                        })
                        .collect();
                }
                Err(err) => {
                    analysis.symbols.clear();
                    analysis.usages.clear();
                    analysis.error = Some(err);
                }
            }
        }

        tracing::debug!(
            file = %path,
            language,
            symbols = analysis.symbols.len(),
            imports = analysis.imports.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analyzed file"
        );
        analysis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::extract::ParseLimits;

    #[test]
    fn analysis_carries_symbols_and_candidates() {
        let registry = LanguageRegistry::with_limits(ParseLimits::default());
        let mut tools = LanguageTools::new(&registry);
        let analysis = tools.analyze(
            "pkg/b.py",
            "python",
            "from pkg.a import process\n\ndef run():\n    return process(1)\n",
        );
        assert!(analysis.is_ok());
        assert!(analysis.symbols.iter().any(|s| s.name == "run"));
        assert!(analysis.usages.iter().any(|u| u.name == "process"));
        assert_eq!(analysis.imports.len(), 1);
        assert!(
            analysis.imports[0]
                .candidates
                .contains(&ImportCandidate::File("pkg/a.py".to_string()))
        );
    }

    #[test]
    fn parse_failure_is_reported_not_raised() {
        let registry = LanguageRegistry::with_limits(ParseLimits::default());
        let mut tools = LanguageTools::new(&registry);
        let analysis = tools.analyze("bad.py", "python", "def broken(:\n  pass\n");
        assert!(matches!(analysis.error, Some(ParseError::Syntax { .. })));
        assert!(analysis.symbols.is_empty());
        assert!(analysis.imports.is_empty());
    }
}
