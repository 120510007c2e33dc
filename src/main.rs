use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use strata_core::{App, Config, resolve_config_path};
use strata_index::{RebuildOutcome, SearchResponse, format_context};

const PREVIEW_CHARS: usize = 200;

#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(about = "Incremental knowledge store and semantic search", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `store.sqlite_path`
    #[arg(long, global = true)]
    db: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest JSON source files or directories of them
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Semantic search over ingested chunks
    Search {
        query: String,

        /// Maximum number of results (default from config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Minimum cosine similarity (default from config)
        #[arg(short, long)]
        min_score: Option<f32>,

        /// Print the full response as JSON
        #[arg(long, conflicts_with = "context")]
        json: bool,

        /// Print results as numbered context blocks
        #[arg(long)]
        context: bool,
    },

    /// Show store and index counts
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Rebuild the vector index from stored embeddings
    RebuildIndex,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let config_path = resolve_config_path(cli.config.as_deref());
    let mut config = Config::load(&config_path)?;
    if let Some(db) = cli.db {
        config.store.sqlite_path = db;
    }
    config.validate()?;
    tracing::debug!(path = %config_path.display(), "configuration loaded");

    let app = App::build(config).await?;

    match cli.command {
        Command::Ingest { paths } => ingest(&app, &paths).await,
        Command::Search {
            query,
            top_k,
            min_score,
            json,
            context,
        } => {
            let search = &app.config().search;
            let top_k = top_k.unwrap_or(search.top_k);
            let min_score = min_score.unwrap_or(search.min_score);
            let response = app
                .search_service()
                .search(&query, top_k, min_score)
                .await
                .context("search failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else if context {
                println!(
                    "{}",
                    format_context(&response.results, search.max_code_examples)
                );
            } else {
                print_results(&response);
            }
            Ok(())
        }
        Command::Status { json } => {
            app.load_cached_index().await;
            let stats = app.search_service().stats().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("chunks:          {}", stats.store.total_chunks);
                println!("embeddings:      {}", stats.store.total_embeddings);
                println!("processed files: {}", stats.store.processed_files);
                println!("index size:      {}", stats.index_size);
            }
            Ok(())
        }
        Command::RebuildIndex => {
            report_rebuild(&app.rebuild_index().await);
            Ok(())
        }
    }
}

async fn ingest(app: &App, paths: &[PathBuf]) -> anyhow::Result<()> {
    let (report, rebuild) = app.ingest(paths).await?;

    println!(
        "files: {} seen, {} processed, {} unchanged",
        report.files_seen, report.files_processed, report.files_skipped
    );
    println!(
        "chunks: {} added, {} duplicates skipped",
        report.chunks_added, report.duplicates
    );
    if report.input_errors + report.embedding_failures + report.storage_errors > 0 {
        println!(
            "errors: {} input, {} embedding, {} storage",
            report.input_errors, report.embedding_failures, report.storage_errors
        );
        for e in &report.errors {
            println!("  - {e}");
        }
    }
    println!("took {} ms", report.duration_ms);

    if let Some(outcome) = rebuild {
        report_rebuild(&outcome);
    }
    Ok(())
}

fn report_rebuild(outcome: &RebuildOutcome) {
    match outcome {
        RebuildOutcome::Built { vectors } => println!("index rebuilt: {vectors} vectors"),
        RebuildOutcome::Empty => println!("index empty: no content embeddings stored"),
        RebuildOutcome::Kept { reason } => {
            println!("index rebuild failed, previous index kept: {reason}");
        }
    }
}

fn print_results(response: &SearchResponse) {
    if response.results.is_empty() {
        println!("no results for {:?}", response.summary.query);
        return;
    }

    for (i, r) in response.results.iter().enumerate() {
        let chunk = &r.record.chunk;
        println!("{}. [{:.3}] {}", i + 1, r.score, chunk.title);
        if !chunk.source_url.is_empty() {
            println!("   {}", chunk.source_url);
        }
        let preview: String = chunk.content.chars().take(PREVIEW_CHARS).collect();
        let ellipsis = if chunk.content.chars().count() > PREVIEW_CHARS {
            "..."
        } else {
            ""
        };
        println!("   {preview}{ellipsis}");
    }

    let s = &response.summary;
    println!();
    println!(
        "{} results, avg score {:.3}, range {:.3}..{:.3}",
        s.count, s.avg_score, s.score_range.0, s.score_range.1
    );
    if !s.functions_found.is_empty() {
        println!("functions: {}", s.functions_found.join(", "));
    }
    if !s.concepts_found.is_empty() {
        println!("concepts: {}", s.concepts_found.join(", "));
    }
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_search_flags() {
        let cli = Cli::parse_from([
            "strata",
            "search",
            "how to set tempo",
            "--top-k",
            "3",
            "--min-score",
            "0.5",
            "--context",
        ]);
        let Command::Search {
            query,
            top_k,
            min_score,
            json,
            context,
        } = cli.command
        else {
            panic!("expected search");
        };
        assert_eq!(query, "how to set tempo");
        assert_eq!(top_k, Some(3));
        assert_eq!(min_score, Some(0.5));
        assert!(!json);
        assert!(context);
    }

    #[test]
    fn ingest_requires_paths() {
        assert!(Cli::try_parse_from(["strata", "ingest"]).is_err());
        let cli = Cli::try_parse_from(["strata", "--db", ":memory:", "ingest", "a.json", "docs"])
            .unwrap();
        assert_eq!(cli.db.as_deref(), Some(":memory:"));
        let Command::Ingest { paths } = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn json_and_context_conflict() {
        assert!(Cli::try_parse_from(["strata", "search", "q", "--json", "--context"]).is_err());
    }
}
