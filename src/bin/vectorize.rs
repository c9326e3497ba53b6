//! Offline indexing: embeds the support tickets and upserts them into the
//! configured vector index in batches.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use support_rag::core::config::Settings;
use support_rag::core::logging;
use support_rag::llm::{LlmProvider, OpenAiProvider};
use support_rag::rag::{load_tickets, open_index, IndexMode, Ingestor};

#[derive(Debug, Parser)]
#[command(name = "vectorize", about = "Embed support tickets into the vector index")]
struct Args {
    /// Ticket file to index (overrides `ingest.tickets_path`)
    #[arg(long)]
    tickets: Option<PathBuf>,

    /// Records per embed/upsert call (overrides `ingest.batch_size`)
    #[arg(long)]
    batch_size: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut settings = Settings::load().context("Failed to load settings")?;
    if let Some(path) = args.tickets {
        settings.ingest.tickets_path = path;
    }
    if let Some(batch_size) = args.batch_size {
        anyhow::ensure!(batch_size > 0, "--batch-size must be at least 1");
        settings.ingest.batch_size = batch_size;
    }
    logging::init(&settings.logging.dir, "vectorize.log");

    let llm: Arc<dyn LlmProvider> = Arc::new(
        OpenAiProvider::new(
            settings.openai.base_url.clone(),
            settings.openai_api_key().to_string(),
            Duration::from_secs(settings.openai.timeout_secs),
        )
        .context("Failed to build embedding client")?,
    );

    let index = open_index(&settings, IndexMode::CreateIfMissing)
        .await
        .context("Failed to open vector index")?;
    tracing::info!("Vector index ready ({})", index.name());

    let tickets = load_tickets(&settings.ingest.tickets_path)?;
    tracing::info!(
        "Loaded {} tickets from {}",
        tickets.len(),
        settings.ingest.tickets_path.display()
    );

    let ingestor = Ingestor::new(
        llm,
        settings.openai.embedding_model.clone(),
        index.clone(),
        settings.ingest.batch_size,
        settings.ingest.store_text,
    );
    let report = ingestor.run(&tickets).await?;
    tracing::info!(
        "Upserted {} of {} tickets in {} batches ({} skipped)",
        report.upserted,
        report.loaded,
        report.batches,
        report.skipped
    );

    let stats = index.stats().await?;
    println!(
        "Index stats: dimension={} total_vector_count={}",
        stats
            .dimension
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        stats.total_vector_count
    );

    Ok(())
}
