use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scholar_ai::embeddings::{Embedder, OllamaEmbedder};
use scholar_ai::ingest::IngestPipeline;
use scholar_ai::ollama::OllamaClient;
use scholar_ai::qdrant::{QdrantClient, VectorIndex};
use scholar_ai::retrieve::{ScholarSearch, SearchRequest};
use scholar_ai::tool;
use scholar_core::arxiv::ChunkRecordReader;
use scholar_core::config::AppConfig;
use scholar_core::error::AppError;

#[derive(Parser)]
#[command(
    name = "scholar",
    version,
    about = "Semantic arXiv paper search over Qdrant and Ollama"
)]
struct Cli {
    /// Log at debug level.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a chunked arXiv JSONL dump into the vector collection.
    Ingest {
        /// Path to the JSONL dataset.
        #[arg(long)]
        data: PathBuf,
        /// Ingest at most this many records; 0 means no cap.
        #[arg(long)]
        limit: Option<usize>,
        /// Records per embed+upsert batch.
        #[arg(long)]
        batch_size: Option<usize>,
        /// Drop and recreate the collection first.
        #[arg(long)]
        recreate: bool,
    },
    /// Search the collection and print ranked paper evidence.
    Search {
        query: String,
        /// Maximum number of papers to return.
        #[arg(long, default_value_t = 5)]
        top_k: usize,
        /// Restrict to an arXiv category, e.g. cs.CL.
        #[arg(long)]
        category: Option<String>,
        /// Only papers published in or after this year.
        #[arg(long)]
        year_from: Option<i32>,
        /// Minimum similarity score; 0 disables the threshold.
        #[arg(long)]
        score_threshold: Option<f32>,
        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Invoke the agent-facing tool with a JSON argument object.
    Tool {
        /// JSON argument object; read from stdin when omitted.
        #[arg(long)]
        args: Option<String>,
        /// Print the tool schema instead of invoking it.
        #[arg(long)]
        schema: bool,
    },
    /// Round-trip smoke test against the running services.
    Smoke,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = AppConfig::from_env()?;

    match cli.command {
        Command::Ingest {
            data,
            limit,
            batch_size,
            recreate,
        } => {
            if let Some(limit) = limit {
                config.limit = (limit > 0).then_some(limit);
            }
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size.max(1);
            }
            config.recreate = recreate;

            let embedder = OllamaEmbedder::from_config(&config)?;
            let index = QdrantClient::from_config(&config)?;
            let reader = ChunkRecordReader::open(&data, config.limit)?;
            let stats = IngestPipeline::new(&embedder, &index, &config).run(reader)?;

            println!(
                "Ingested {} points in {} batches into collection {} ({} records read, {} skipped)",
                stats.points_upserted,
                stats.batches_flushed,
                config.collection,
                stats.records_read,
                stats.skipped_missing_identity
            );
        }
        Command::Search {
            query,
            top_k,
            category,
            year_from,
            score_threshold,
            json,
        } => {
            let embedder = OllamaEmbedder::from_config(&config)?;
            let index = QdrantClient::from_config(&config)?;
            let search = ScholarSearch::new(&embedder, &index, &config);

            let request = SearchRequest {
                query,
                top_k,
                category,
                year_from,
                score_threshold,
            };
            let results = search.search(&request)?;

            if json {
                println!("{}", to_pretty_json(&results)?);
            } else if results.is_empty() {
                println!("No results.");
            } else {
                for (i, result) in results.iter().enumerate() {
                    println!(
                        "{}. score={:.4}  arxiv_id={}  title={}",
                        i + 1,
                        result.score,
                        result.arxiv_id,
                        result.title
                    );
                    if let Some(url) = result.url.as_deref() {
                        println!("   {url}");
                    }
                    if !result.snippet.is_empty() {
                        println!("   {}", result.snippet);
                    }
                }
            }
        }
        Command::Tool { args, schema } => {
            if schema {
                println!("{}", to_pretty_json(&tool::schema())?);
                return Ok(());
            }

            let raw = match args {
                Some(args) => args,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf).map_err(|e| {
                        AppError::new("TOOL_ARGS_INVALID", "Failed to read tool arguments from stdin")
                            .with_details(e.to_string())
                    })?;
                    buf
                }
            };
            let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
                AppError::new("TOOL_ARGS_INVALID", "Tool arguments are not valid JSON")
                    .with_details(e.to_string())
            })?;

            let embedder = OllamaEmbedder::from_config(&config)?;
            let index = QdrantClient::from_config(&config)?;
            let search = ScholarSearch::new(&embedder, &index, &config);
            let result = tool::invoke(&search, &value)?;
            println!("{}", to_pretty_json(&result)?);
        }
        Command::Smoke => {
            let client = OllamaClient::from_config(&config)?;
            client.health_check()?;
            tracing::info!(url = %config.ollama_url, "Ollama reachable");

            let embedder = OllamaEmbedder::new(client, config.embed_model.clone());
            let index = QdrantClient::from_config(&config)?;

            let vector = embedder.embed("KV cache quantization for LLM inference")?;
            let hits = index.search(&config.collection, &vector, 5, None, None)?;

            println!("Top hits:");
            for (i, hit) in hits.iter().enumerate() {
                let title = hit.payload.get("title").and_then(|v| v.as_str()).unwrap_or("");
                let arxiv_id = hit
                    .payload
                    .get("arxiv_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                println!(
                    "{}. score={:.4}  arxiv_id={arxiv_id}  title={title}",
                    i + 1,
                    hit.score
                );
            }
        }
    }

    Ok(())
}

fn to_pretty_json(value: &impl serde::Serialize) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| {
        AppError::new("OUTPUT_ENCODE_FAILED", "Failed to encode output as JSON")
            .with_details(e.to_string())
    })
}
