// Engine configuration
// Reads from environment variables with sensible defaults

use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

/// Global configuration instance
static CONFIG: OnceLock<EngineConfig> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Cap on `relevant_files` in an edit context (CODECTX_MAX_RELEVANT_FILES)
    pub max_relevant_files: usize,

    /// Per-file parse budget in milliseconds, 0 disables it (CODECTX_PARSE_TIMEOUT_MS)
    pub parse_timeout_ms: u64,

    /// Files longer than this are not parsed (CODECTX_MAX_FILE_LINES)
    pub max_file_lines: usize,

    /// More affected files than this raises the risk to high (CODECTX_IMPACT_FILE_THRESHOLD)
    pub impact_file_threshold: usize,

    /// More references than this adds a review recommendation (CODECTX_REVIEW_REFERENCE_THRESHOLD)
    pub review_reference_threshold: usize,

    /// Depth bound for the dependent chain in impact reports (CODECTX_IMPACT_CHAIN_DEPTH)
    pub impact_chain_depth: usize,

    /// Diagnostics kept before the oldest are dropped (CODECTX_MAX_DIAGNOSTICS)
    pub max_diagnostics: usize,

    /// Worker threads for bulk scans, 0 uses the rayon default (CODECTX_SCAN_THREADS)
    pub scan_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_relevant_files: 10,
            parse_timeout_ms: 2_000,
            max_file_lines: 50_000,
            impact_file_threshold: 5,
            review_reference_threshold: 10,
            impact_chain_depth: 8,
            max_diagnostics: 200,
            scan_threads: 0,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = EngineConfig::default();
        read_var("CODECTX_MAX_RELEVANT_FILES", &mut config.max_relevant_files);
        read_var("CODECTX_PARSE_TIMEOUT_MS", &mut config.parse_timeout_ms);
        read_var("CODECTX_MAX_FILE_LINES", &mut config.max_file_lines);
        read_var(
            "CODECTX_IMPACT_FILE_THRESHOLD",
            &mut config.impact_file_threshold,
        );
        read_var(
            "CODECTX_REVIEW_REFERENCE_THRESHOLD",
            &mut config.review_reference_threshold,
        );
        read_var("CODECTX_IMPACT_CHAIN_DEPTH", &mut config.impact_chain_depth);
        read_var("CODECTX_MAX_DIAGNOSTICS", &mut config.max_diagnostics);
        read_var("CODECTX_SCAN_THREADS", &mut config.scan_threads);
        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static EngineConfig {
        CONFIG.get_or_init(EngineConfig::from_env)
    }

    pub fn parse_timeout(&self) -> Option<Duration> {
        if self.parse_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.parse_timeout_ms))
        }
    }
}

fn read_var<T>(key: &str, slot: &mut T)
where
    T: FromStr + std::fmt::Display,
{
    let Ok(val) = env::var(key) else {
        return;
    };
    match parse_value(&val) {
        Some(parsed) => *slot = parsed,
        None => tracing::warn!("Invalid {key} value: {val}, using default: {slot}"),
    }
}

fn parse_value<T: FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}
