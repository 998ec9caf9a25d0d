//! `docrag` command-line tool: manage and query a persisted document index.
//!
//! Settings come from the environment (see [`IndexSettings::from_env`] and
//! [`RagConfig::from_env`]) and can be overridden per invocation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use docrag::local::FastEmbedProvider;
use docrag::{EmbeddingProvider, IndexSettings, RagConfig, Retriever, VectorIndex};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "docrag", version, about = "Chunk, embed, and search plain-text documents")]
struct Cli {
    /// Directory holding the index file (overrides VECTOR_STORE_PATH).
    #[arg(long, global = true)]
    store_path: Option<PathBuf>,

    /// Embedding model name (overrides EMBEDDING_MODEL).
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Index a UTF-8 text or markdown file.
    Ingest {
        file: PathBuf,
        /// Document id; a random UUID when omitted.
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Remove a document and all of its chunks.
    Remove { document_id: String },
    /// Retrieve the chunks most similar to a query.
    Query {
        text: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// List the chunks of one document.
    Chunks { document_id: String },
    /// Print index statistics as JSON.
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = IndexSettings::from_env()?;
    if let Some(path) = cli.store_path.clone() {
        settings.vector_store_path = path;
    }
    if let Some(model) = cli.model.clone() {
        settings.embedding_model = model;
    }
    let config = RagConfig::from_env()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(settings.worker_threads)
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(run(cli.command, settings, config))
}

async fn run(command: Command, settings: IndexSettings, config: RagConfig) -> anyhow::Result<()> {
    let model_name = settings.embedding_model.clone();
    let embedder = tokio::task::spawn_blocking(move || FastEmbedProvider::new(&model_name))
        .await
        .context("model loader panicked")??;
    if embedder.dimensions() != settings.embedding_dimension {
        bail!(
            "model {} produces {} dimensions but EMBEDDING_DIMENSION is {}",
            embedder.model_id(),
            embedder.dimensions(),
            settings.embedding_dimension
        );
    }

    let index_file = settings.index_file();
    let index = VectorIndex::open(&index_file, embedder.model_tag())
        .await
        .with_context(|| format!("cannot open index at {}", index_file.display()))?;
    let retriever = Retriever::builder()
        .config(config.clone())
        .embedding_provider(Arc::new(embedder))
        .vector_store(Arc::new(index))
        .build()?;

    match command {
        Command::Ingest { file, id, chunk_size, overlap } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("cannot read {} as UTF-8 text", file.display()))?;
            let document_id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let chunk_count = retriever
                .add_document(
                    &document_id,
                    &text,
                    chunk_size.unwrap_or(config.chunk_size),
                    overlap.unwrap_or(config.chunk_overlap),
                )
                .await?;
            info!(document.id = %document_id, source = %file.display(), chunk_count, "document indexed");
            println!("{document_id}\t{chunk_count}");
        }
        Command::Remove { document_id } => {
            let removed = retriever.remove_document(&document_id).await?;
            println!("{document_id}\t{removed}");
        }
        Command::Query { text, top_k, threshold } => {
            let results = retriever
                .query(
                    &text,
                    top_k.unwrap_or(config.top_k),
                    threshold.unwrap_or(config.similarity_threshold),
                )
                .await?;
            if results.is_empty() {
                println!("(no results)");
            }
            for (rank, hit) in results.iter().enumerate() {
                println!(
                    "{}. [{:.4}] {} #{}\n{}\n",
                    rank + 1,
                    hit.score,
                    hit.document_id,
                    hit.position,
                    hit.chunk_text
                );
            }
        }
        Command::Chunks { document_id } => {
            for chunk in retriever.document_chunks(&document_id).await? {
                println!("{}\t{}\t{}", chunk.id, chunk.position, chunk.text.chars().count());
            }
        }
        Command::Stats => {
            println!("{}", serde_json::to_string_pretty(&retriever.stats().await)?);
        }
    }
    Ok(())
}
