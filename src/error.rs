use std::io;
use thiserror::Error;

/// Per-file extraction failure. Always recovered by the caller, which stores an empty
/// result for the file and records a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("syntax error near line {line}")]
    Syntax { line: usize },

    #[error("parse timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("file has {lines} lines, limit is {limit}")]
    TooLarge { lines: usize, limit: usize },

    #[error("grammar unavailable for {language}: {message}")]
    Grammar { language: String, message: String },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("no language registered for {path}")]
    UnsupportedLanguage { path: String },

    #[error("parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("symbol `{name}` not found in {path}")]
    UnknownSymbol { name: String, path: String },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = EngineError::Parse {
            path: "a.py".to_string(),
            source: ParseError::Syntax { line: 4 },
        };
        assert_eq!(err.to_string(), "parse a.py: syntax error near line 4");

        let err = ParseError::TooLarge {
            lines: 60_000,
            limit: 50_000,
        };
        assert!(err.to_string().contains("limit is 50000"));
    }
}
