use anyhow::Result;
use clap::Parser;
use rag_chunks::{BackendKind, ChunkOrder, DocumentProcessor, RelevantChunkRetriever, RetrievalSettings};
use std::path::PathBuf;
use std::sync::Arc;

/// Print the parts of a document most relevant to a query.
#[derive(Parser, Debug)]
#[command(name = "relevant_chunks", version)]
struct Cli {
    /// Text or PDF file to search
    file: PathBuf,

    /// Query to rank chunks against
    #[arg(short, long)]
    query: String,

    /// Chunk size in tokens
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Tokens shared between consecutive chunks
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Token budget of the downstream model
    #[arg(long)]
    max_token_support: Option<usize>,

    /// Arrange output by relevance rank or by position in the document
    #[arg(long)]
    order: Option<ChunkOrder>,

    /// Embedding backend (tfidf or gemini)
    #[arg(long)]
    backend: Option<BackendKind>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let mut settings = RetrievalSettings::from_env()?;
    if let Some(chunk_size) = cli.chunk_size {
        settings.chunk_size = chunk_size;
    }
    if let Some(chunk_overlap) = cli.chunk_overlap {
        settings.chunk_overlap = chunk_overlap;
    }
    if let Some(max_token_support) = cli.max_token_support {
        settings.max_token_support = max_token_support;
    }
    if let Some(order) = cli.order {
        settings.order = order;
    }
    if let Some(backend) = cli.backend {
        settings.backend = backend;
    }

    let text = DocumentProcessor::new().load_text(&cli.file)?;
    let retriever = RelevantChunkRetriever::new(&settings, Arc::new(settings.embedding_service()?))?;

    let relevant = retriever.get_relevant_text(&text, &cli.query).await?;
    println!("{}", relevant);

    Ok(())
}
