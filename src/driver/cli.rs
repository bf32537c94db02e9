use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "webext-api-finder")]
#[command(about = "Filters a corpus of browser extensions down to those referencing chosen platform APIs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read extension roots from stdin, print the ones referencing any query.
    Filter(FilterArgs),
    /// Filter by requested manifest permissions. Not implemented.
    Permissions(StubArgs),
    /// Filter by manifest fields beyond permissions. Not implemented.
    Manifest(StubArgs),
    /// Filter by AMO user-count metadata. Not implemented.
    UserCount(StubArgs),
}

#[derive(Args)]
pub struct FilterArgs {
    /// File of one dotted API name per line (`#` comments and blank lines
    /// ignored). Defaults to a small built-in list.
    #[arg(long)]
    pub queries: Option<PathBuf>,

    /// Overrides WE_API_FINDER_NUM_THREADS for this run.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Use the async matcher / worker pool path instead of the synchronous
    /// per-extension path.
    #[arg(long)]
    pub r#async: bool,

    /// Base directory bare extension ids / relative paths on stdin resolve
    /// against.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Output format for matched extensions.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct StubArgs {
    #[arg(long)]
    pub queries: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One extension path per line.
    Text,
    /// One JSON object per line: `{"path": ..., "matched_queries": [...]}`.
    Json,
}
