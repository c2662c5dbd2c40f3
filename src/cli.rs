use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "codectx",
    version,
    about = "Code context engine: symbols, edit context and edit impact",
    after_help = r#"Examples:
  codectx index --repo .
  codectx context --repo . --file src/app.py --start 10 --end 14
  codectx definition --repo . --name process --file src/app.py
  codectx impact --repo . --file src/app.py --name process --diff-file change.diff
  codectx recommend --repo . --intent "add retries to fetch_user in api/client.py"
"#
)]
pub struct Args {
    /// Project root to index.
    #[arg(long, global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Log level when RUST_LOG is unset.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Index the repository and print engine stats.
    Index,
    /// List the symbols of one file.
    Symbols {
        #[arg(long)]
        file: String,
    },
    /// Context of a line range: scope, used and imported symbols, related files.
    Context {
        #[arg(long)]
        file: String,
        #[arg(long)]
        start: usize,
        #[arg(long)]
        end: usize,
    },
    /// Resolve a name as seen from a file.
    Definition {
        #[arg(long)]
        name: String,
        #[arg(long)]
        file: String,
    },
    /// Usages of the symbol a name resolves to from a file.
    References {
        #[arg(long)]
        name: String,
        #[arg(long)]
        file: String,
    },
    /// Impact of editing a definition.
    Impact {
        #[arg(long)]
        file: String,
        #[arg(long)]
        name: String,
        /// New content of the whole file.
        #[arg(long, conflicts_with = "diff_file")]
        after_file: Option<PathBuf>,
        /// Unified diff holding the edit.
        #[arg(long)]
        diff_file: Option<PathBuf>,
        /// Print the plain-text report instead of JSON.
        #[arg(long)]
        text: bool,
    },
    /// Files, symbols and tests worth reading before an edit.
    Recommend {
        #[arg(long)]
        intent: String,
        #[arg(long = "file")]
        files: Vec<String>,
        #[arg(long = "symbol")]
        symbols: Vec<String>,
        #[arg(long, default_value_t = 10)]
        max_files: usize,
        #[arg(long, default_value_t = 10)]
        max_symbols: usize,
        #[arg(long, default_value_t = 5)]
        max_tests: usize,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_impact_with_diff() {
        let args = Args::try_parse_from([
            "codectx", "impact", "--repo", "/tmp/x", "--file", "a.py", "--name", "f", "--diff-file",
            "d.diff",
        ])
        .unwrap();
        match args.command {
            Command::Impact { file, diff_file, after_file, .. } => {
                assert_eq!(file, "a.py");
                assert_eq!(diff_file, Some(PathBuf::from("d.diff")));
                assert!(after_file.is_none());
            }
            _ => panic!("expected impact"),
        }
    }

    #[test]
    fn after_and_diff_conflict() {
        let parsed = Args::try_parse_from([
            "codectx", "impact", "--file", "a.py", "--name", "f", "--after-file", "a", "--diff-file",
            "b",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn recommend_collects_repeated_flags() {
        let args = Args::try_parse_from([
            "codectx", "recommend", "--intent", "x", "--file", "a.py", "--file", "b.py",
        ])
        .unwrap();
        let Command::Recommend { files, max_tests, .. } = args.command else {
            panic!("expected recommend");
        };
        assert_eq!(files, vec!["a.py", "b.py"]);
        assert_eq!(max_tests, 5);
    }
}
