use chrono::Utc;
use clap::{Parser, Subcommand};
use cv_search_core::{
    ChromaStore, ChunkingConfig, CvExtractor, CvIndexer, Embedder, ExperienceTable,
    HashedNgramEmbedder, IndexIdentity, LocalePreference, MaintenanceOps, MetadataFilter,
    RerankerConfig, RerankerSlot, SearchConfig, SearchOptions, SearchPipeline,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "cv-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Chroma base URL
    #[arg(long, default_value = "http://localhost:8000", env = "CHROMA_URL")]
    chroma_url: String,

    /// Chroma collection name
    #[arg(long, default_value = "cvs")]
    collection: String,

    /// Reranker service base URL; reranking is skipped when unset
    #[arg(long, env = "RERANKER_URL")]
    reranker_url: Option<String>,

    /// Bearer token for the reranker service
    #[arg(long, env = "RERANKER_API_KEY")]
    reranker_api_key: Option<String>,

    /// Reranker model identifier
    #[arg(long, default_value = "BAAI/bge-reranker-base")]
    reranker_model: String,
}

#[derive(Subcommand)]
enum Command {
    /// Index a folder of CV files (.json, .md, .txt, .markdown) recursively.
    Index {
        /// Folder that contains CV files.
        #[arg(long)]
        folder: PathBuf,
        /// Semicolon-separated experience export used for enrichment.
        #[arg(long)]
        experience_csv: Option<PathBuf>,
        /// Chunk size in words.
        #[arg(long, default_value_t = 500)]
        chunk_size: usize,
        /// Overlap between consecutive chunks in words.
        #[arg(long, default_value_t = 100)]
        chunk_overlap: usize,
        /// Smallest chunk emitted, in words.
        #[arg(long, default_value_t = 50)]
        min_chunk_size: usize,
    },
    /// Search indexed CV chunks.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of results to return.
        #[arg(long, default_value_t = 12)]
        n_results: usize,
        /// Restrict results to one office or department.
        #[arg(long)]
        office: Option<String>,
        /// Skip cross-encoder reranking for this query.
        #[arg(long, default_value_t = false)]
        no_rerank: bool,
    },
    /// Show index statistics.
    Stats,
    /// List distinct indexed sources.
    Sources,
    /// Print the stored text of one source.
    Show {
        /// Source filename, e.g. "ola-nordmann.json".
        #[arg(long)]
        source: String,
    },
    /// Delete every chunk of one source.
    Delete {
        /// Source filename, e.g. "ola-nordmann.json".
        #[arg(long)]
        source: String,
    },
}

fn reranker_slot(cli: &Cli) -> RerankerSlot {
    match &cli.reranker_url {
        Some(endpoint) => RerankerSlot::from_config(RerankerConfig {
            endpoint: endpoint.clone(),
            api_key: cli.reranker_api_key.clone(),
            model: cli.reranker_model.clone(),
        }),
        None => RerankerSlot::unconfigured(),
    }
}

const MAX_EXCERPT_CHARS: usize = 400;

fn excerpt(document: &str) -> String {
    let trimmed = document.trim();
    if trimmed.chars().count() <= MAX_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(MAX_EXCERPT_CHARS).collect();
    format!("{cut}...")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let embedder = HashedNgramEmbedder::default();
    let identity = IndexIdentity {
        embedding_model: embedder.model_name().to_string(),
        reranking_enabled: cli.reranker_url.is_some(),
        reranker_model: cli
            .reranker_url
            .as_ref()
            .map(|_| cli.reranker_model.clone()),
    };
    let store = Arc::new(ChromaStore::new(&cli.chroma_url, &cli.collection, embedder));
    let reranker = reranker_slot(&cli);

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "cv-search boot"
    );

    match cli.command {
        Command::Index {
            folder,
            experience_csv,
            chunk_size,
            chunk_overlap,
            min_chunk_size,
        } => {
            let mut extractor = CvExtractor::new(LocalePreference::default());
            if let Some(csv_path) = experience_csv {
                extractor = extractor.with_experience(ExperienceTable::load(&csv_path));
            }

            let chunking = ChunkingConfig {
                chunk_size,
                chunk_overlap,
                min_chunk_size,
            };
            let indexer = CvIndexer::new(Arc::clone(&store), extractor, chunking)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            let report = indexer.index_dir(&folder).await;
            for failure in &report.failed {
                println!("failed: {} ({})", failure.path.display(), failure.reason);
            }
            println!(
                "{} files processed, {} chunks written, {} failed at {}",
                report.files_processed,
                report.chunks_written,
                report.failed.len(),
                report.finished_at.to_rfc3339()
            );
        }
        Command::Search {
            query,
            n_results,
            office,
            no_rerank,
        } => {
            let search_config = SearchConfig {
                enable_reranking: cli.reranker_url.is_some(),
                ..SearchConfig::default()
            };
            let pipeline = SearchPipeline::new(Arc::clone(&store), search_config, reranker);

            let options = SearchOptions {
                n_results: Some(n_results),
                filter: office.map(MetadataFilter::by_office),
                use_reranking: if no_rerank { Some(false) } else { None },
            };

            let hits = pipeline
                .search(&query, &options)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("query: {query}");
            println!("{} hits", hits.len());
            for position in 0..hits.len() {
                let metadata = &hits.metadatas[position];
                let similarity = 1.0 - hits.distances[position];
                let office_label = if metadata.record.office.is_empty() {
                    String::new()
                } else {
                    format!(" | {}", metadata.record.office)
                };

                println!(
                    "[{}] {}{} (relevans: {:.1}%)",
                    position + 1,
                    metadata.record.cv_name,
                    office_label,
                    similarity * 100.0
                );
                if let Some(scores) = &hits.rerank_scores {
                    println!("    rerank_score={:.4}", scores[position]);
                }
                println!(
                    "    kilde: {} | chunk {}/{}",
                    metadata.record.source, metadata.chunk_index, metadata.total_chunks
                );
                println!("{}", excerpt(&hits.documents[position]));
                println!();
            }
        }
        Command::Stats => {
            let ops = MaintenanceOps::new(Arc::clone(&store), identity);
            let stats = ops
                .stats()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("total chunks:    {}", stats.total_chunks);
            println!("unique sources:  {}", stats.unique_sources);
            println!("embedding model: {}", stats.embedding_model);
            match stats.reranker_model {
                Some(model) => println!("reranker:        {model}"),
                None => println!("reranker:        disabled"),
            }
        }
        Command::Sources => {
            let ops = MaintenanceOps::new(Arc::clone(&store), identity);
            let sources = ops
                .list_sources()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("{} sources", sources.len());
            for summary in sources {
                let office_label = if summary.office.is_empty() {
                    String::new()
                } else {
                    format!(" | {}", summary.office)
                };
                println!(
                    "{}{} ({}, {} chunks)",
                    summary.cv_name, office_label, summary.source, summary.chunk_count
                );
            }
        }
        Command::Show { source } => {
            let ops = MaintenanceOps::new(Arc::clone(&store), identity);
            let document = ops
                .fetch_source(&source)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            match document {
                Some(document) => {
                    println!("CV: {}", document.cv_name);
                    println!("source: {}", document.source);
                    println!();
                    println!("{}", document.text);
                }
                None => println!("no chunks found for {source}"),
            }
        }
        Command::Delete { source } => {
            let ops = MaintenanceOps::new(Arc::clone(&store), identity);
            let removed = ops
                .delete_by_source(&source)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("{removed} chunks deleted from {source}");
        }
    }

    Ok(())
}
