use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Semaphore;

use crate::engine::Compiler;

use super::cli::{FilterArgs, OutputFormat};

#[derive(Serialize)]
struct MatchedExtension {
    path: String,
    matched_queries: Vec<String>,
}

const DEFAULT_QUERIES: &[&str] = &[
    "tabs.create",
    "storage.local.get",
    "storage.sync.onChanged.addListener",
];

const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "jsx", "ts"];
const MAX_CONCURRENT_READS: usize = 500;

/// Drives the `filter` subcommand end to end: load queries, read extension
/// roots from stdin, evaluate each concurrently under a bounded semaphore,
/// and print matches in input order.
pub async fn run_filter(args: FilterArgs) -> Result<()> {
    if let Some(threads) = args.threads {
        std::env::set_var("WE_API_FINDER_NUM_THREADS", threads.to_string());
    }
    warn_on_unused_metadata_env_vars();

    let queries = load_queries(args.queries.as_deref())?;
    let compiler = Arc::new(Compiler::new());
    for query in queries {
        compiler.add_query(query)?;
    }

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_READS));

    // Tasks are spawned as lines arrive so file reads overlap, but their
    // join handles are kept in input order: awaiting them in that order is
    // enough to re-serialize output without a separate reordering buffer.
    let mut handles = Vec::new();

    while let Some(raw_line) = lines.next_line().await.context("reading stdin")? {
        let line = raw_line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        let root = args.root.clone();
        let compiler = Arc::clone(&compiler);
        let semaphore = Arc::clone(&semaphore);
        let use_async = args.r#async;

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("semaphore is never closed");
            let outcome = process_extension(&line, &root, &compiler, use_async).await;
            (line, outcome)
        }));
    }

    for handle in handles {
        let (line, outcome) = handle.await.context("extension task panicked")?;
        match outcome {
            Ok(Some(matched)) => print_match(&matched, args.format),
            Ok(None) => {}
            Err(e) => log::warn!("skipping {line:?}: {e:#}"),
        }
    }

    compiler.shutdown();
    Ok(())
}

fn print_match(matched: &MatchedExtension, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", matched.path),
        OutputFormat::Json => match serde_json::to_string(matched) {
            Ok(line) => println!("{line}"),
            Err(e) => log::warn!("failed to serialize match for {}: {e}", matched.path),
        },
    }
}

async fn process_extension(
    input: &str,
    root: &Path,
    compiler: &Compiler,
    use_async: bool,
) -> Result<Option<MatchedExtension>> {
    let extension_root = resolve_extension_root(input, root)?;
    let sources = read_script_sources(&extension_root).await?;
    if sources.is_empty() {
        return Ok(None);
    }

    let matched_queries: Vec<String> = if use_async {
        let mut matcher = compiler.new_async_matcher();
        for source in sources {
            matcher.add_source(source);
        }
        matcher.find_matches().await?;
        matcher.matched_results()?.iter().cloned().collect()
    } else {
        let mut matcher = compiler.new_matcher();
        for source in sources {
            matcher.add_source(source);
        }
        matcher.find_matches();
        matcher.matched_results().iter().cloned().collect()
    };

    if matched_queries.is_empty() {
        return Ok(None);
    }

    Ok(Some(MatchedExtension {
        path: extension_root.display().to_string(),
        matched_queries,
    }))
}

fn resolve_extension_root(input: &str, root: &Path) -> Result<PathBuf> {
    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        anyhow::bail!(
            "AMO numeric ids are not resolved by this driver (would require the metadata loader)"
        );
    }

    let candidate = if input.starts_with('/') || input.starts_with("./") || input.starts_with("../") {
        PathBuf::from(input)
    } else {
        root.join(input)
    };

    if !candidate.is_dir() {
        anyhow::bail!("{} is not a directory", candidate.display());
    }

    Ok(candidate)
}

async fn read_script_sources(extension_root: &Path) -> Result<Vec<String>> {
    let root = extension_root.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut sources = Vec::new();
        for entry in ignore::WalkBuilder::new(&root).hidden(false).build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("walk error under {}: {e}", root.display());
                    continue;
                }
            };

            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            let is_script = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| SCRIPT_EXTENSIONS.contains(&ext))
                .unwrap_or(false);
            if !is_script {
                continue;
            }

            match std::fs::read_to_string(entry.path()) {
                Ok(contents) => sources.push(contents),
                Err(e) => log::warn!("failed to read {}: {e}", entry.path().display()),
            }
        }
        sources
    })
    .await
    .context("extension read task panicked")
}

/// `AMO_METADATA_JSON` and `IGNORE_MISSING_ADDON` only mean anything to the
/// user-count filter, which this driver doesn't implement end to end (see
/// `stub_filters::run_user_count`). The `filter` subcommand accepts them
/// without acting on them, but warns so a caller who set them expecting
/// user-count behavior isn't left guessing why nothing changed.
fn warn_on_unused_metadata_env_vars() {
    if std::env::var_os("AMO_METADATA_JSON").is_some() {
        log::warn!(
            "AMO_METADATA_JSON is set but has no effect on the `filter` subcommand; \
             it's only consulted by the user-count filter"
        );
    }
    if std::env::var_os("IGNORE_MISSING_ADDON").is_some() {
        log::warn!(
            "IGNORE_MISSING_ADDON is set but has no effect on the `filter` subcommand; \
             it's only consulted by the user-count filter"
        );
    }
}

fn load_queries(path: Option<&Path>) -> Result<Vec<String>> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading queries file {}", path.display()))?;
            Ok(contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string)
                .collect())
        }
        None => Ok(DEFAULT_QUERIES.iter().map(|s| s.to_string()).collect()),
    }
}
