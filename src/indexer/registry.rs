use crate::indexer::extract::{DependencyAnalyzer, LanguageSupport, ParseLimits, SymbolExtractor};
use crate::indexer::{c_cpp, go, java, javascript, python, rust};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maps file extensions to the language that handles them. The first language to claim an
/// extension keeps it.
#[derive(Default)]
pub struct LanguageRegistry {
    languages: BTreeMap<String, Arc<dyn LanguageSupport>>,
    extensions: BTreeMap<String, String>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every shipped language, using the global parse limits.
    pub fn with_defaults() -> Self {
        Self::with_limits(ParseLimits::from(crate::config::EngineConfig::get()))
    }

    pub fn with_limits(limits: ParseLimits) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(python::PythonLanguage::new(limits)));
        registry.register(Arc::new(rust::RustLanguage::new(limits)));
        registry.register(Arc::new(go::GoLanguage::new(limits)));
        registry.register(Arc::new(javascript::JavaScriptLanguage::new(limits)));
        registry.register(Arc::new(javascript::TypeScriptLanguage::new(limits)));
        registry.register(Arc::new(java::JavaLanguage::new(limits)));
        registry.register(Arc::new(c_cpp::CLanguage::new(limits)));
        registry.register(Arc::new(c_cpp::CppLanguage::new(limits)));
        registry
    }

    /// Returns the number of extensions this registration claimed.
    pub fn register(&mut self, support: Arc<dyn LanguageSupport>) -> usize {
        let name = support.language_name().to_string();
        if self.languages.contains_key(&name) {
            tracing::warn!(language = %name, "language already registered, ignoring");
            return 0;
        }
        let mut claimed = 0;
        for ext in support.extensions() {
            let ext = normalize_extension(ext);
            if ext.len() <= 1 {
                continue;
            }
            match self.extensions.get(&ext) {
                Some(owner) => {
                    tracing::warn!(
                        extension = %ext,
                        owner = %owner,
                        language = %name,
                        "extension already claimed, keeping first registrant"
                    );
                }
                None => {
                    self.extensions.insert(ext, name.clone());
                    claimed += 1;
                }
            }
        }
        tracing::debug!(language = %name, claimed, "registered language");
        self.languages.insert(name, support);
        claimed
    }

    /// Language for `path` by its longest matching extension suffix.
    pub fn detect(&self, path: &str) -> Option<&str> {
        let file_name = crate::util::file_name(path).to_ascii_lowercase();
        let mut best: Option<(&str, &str)> = None;
        for (ext, language) in &self.extensions {
            if file_name.len() <= ext.len() || !file_name.ends_with(ext.as_str()) {
                continue;
            }
            if best.is_none_or(|(current, _)| ext.len() > current.len()) {
                best = Some((ext.as_str(), language.as_str()));
            }
        }
        best.map(|(_, language)| language)
    }

    pub fn support(&self, language: &str) -> Option<&Arc<dyn LanguageSupport>> {
        self.languages.get(language)
    }

    pub fn extractor_for(&self, language: &str) -> Option<Box<dyn SymbolExtractor>> {
        self.languages.get(language)?.create_symbol_extractor()
    }

    pub fn analyzer_for(&self, language: &str) -> Option<Box<dyn DependencyAnalyzer>> {
        self.languages.get(language)?.create_dependency_analyzer()
    }

    pub fn languages(&self) -> Vec<&str> {
        self.languages.keys().map(String::as_str).collect()
    }

    pub fn extensions(&self) -> Vec<(&str, &str)> {
        self.extensions
            .iter()
            .map(|(ext, language)| (ext.as_str(), language.as_str()))
            .collect()
    }
}

fn normalize_extension(ext: &str) -> String {
    let lower = ext.trim().to_ascii_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}
