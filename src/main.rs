use anyhow::{Context, Result};
use clap::Parser;
use codectx::cli::{self, Command, LogLevel};
use codectx::impact::{Edit, ImpactAnalyzer, parse_unified_diff};
use codectx::recommend::{ContextRecommender, RecommendConfig, RecommendTargets};
use codectx::{ContextManager, util};
use serde::Serialize;
use std::io;
use std::path::Path;

fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = cli::Args::parse();
    init_tracing(args.log_level);

    let repo = args
        .repo
        .canonicalize()
        .with_context(|| format!("repository {} not found", args.repo.display()))?;
    let manager = ContextManager::for_directory(&repo);
    let report = manager.scan_directory(&repo);
    tracing::info!(
        indexed = report.indexed,
        failed = report.failed,
        elapsed_ms = report.elapsed_ms,
        "repository indexed"
    );

    match args.command {
        Command::Index => print_json(&manager.stats()),
        Command::Symbols { file } => print_json(&manager.symbols_in_file(&file)),
        Command::Context { file, start, end } => {
            print_json(&manager.get_edit_context(&file, start, end))
        }
        Command::Definition { name, file } => print_json(&manager.find_definition(&name, &file)),
        Command::References { name, file } => print_json(&manager.find_references(&name, &file)),
        Command::Impact {
            file,
            name,
            after_file,
            diff_file,
            text,
        } => {
            let file = util::normalize_path(Path::new(&file));
            let edits = edits_for(&manager, &file, after_file.as_deref(), diff_file.as_deref())?;
            let report = ImpactAnalyzer::new(&manager)
                .impact_for_name(&file, &name, &edits)
                .with_context(|| format!("impact of {name} in {file}"))?;
            if text {
                println!("{report}");
                Ok(())
            } else {
                print_json(&report)
            }
        }
        Command::Recommend {
            intent,
            files,
            symbols,
            max_files,
            max_symbols,
            max_tests,
        } => {
            let config = RecommendConfig {
                max_files,
                max_symbols,
                max_tests,
            };
            let targets = RecommendTargets { files, symbols };
            let recommendation = ContextRecommender::with_defaults(&manager)
                .with_config(config)
                .recommend_context(&intent, &targets);
            print_json(&recommendation)
        }
    }
}

fn edits_for(
    manager: &ContextManager,
    file: &str,
    after_file: Option<&Path>,
    diff_file: Option<&Path>,
) -> Result<Vec<Edit>> {
    if let Some(path) = after_file {
        let after = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let before = manager
            .provider()
            .read(file)
            .with_context(|| format!("read {file}"))?;
        return Ok(vec![Edit::whole_file(file, &before, &after)]);
    }
    if let Some(path) = diff_file {
        let diff = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        return Ok(parse_unified_diff(file, &diff));
    }
    Ok(Vec::new())
}
