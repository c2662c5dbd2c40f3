pub mod cli;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod impact;
pub mod indexer;
pub mod model;
pub mod provider;
pub mod recommend;
pub mod symbol_table;
pub mod util;

pub use context::{ContextManager, EditContext, EngineStats, ScanReport, UpdateOutcome};
pub use error::{EngineError, EngineResult, ParseError};
pub use impact::{Edit, ImpactAnalyzer, ImpactReport};
pub use model::{Dependency, Symbol, SymbolKind, Usage};
pub use recommend::{ContextRecommendation, ContextRecommender, RecommendTargets};
