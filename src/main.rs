use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use domain_index::{
    config, embedding, indexer, logging,
    metrics::IngestMetrics,
    pipeline::{self, PipelineContext, RunSummary},
    schema,
};

#[derive(Parser)]
#[command(
    name = "domain-index",
    version,
    about = "Chunk, embed, and upload domain knowledge into Azure AI Search"
)]
struct Cli {
    /// Root of the source data layout (overrides DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Documents per upload call (overrides UPLOAD_BATCH_SIZE and pipeline defaults).
    #[arg(long, global = true)]
    batch_size: Option<usize>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index domain summaries.
    Summaries,
    /// Index API docs and specs of every configured platform.
    ApiDocs,
    /// Index domain summaries, then API docs.
    Docs,
    /// Index event records.
    Events,
    /// Index line-of-business records.
    Lob {
        /// Target index (overrides LOB_INDEX_NAME).
        #[arg(long)]
        index: Option<String>,
        /// Folder under lob_samples/ (overrides LOB_INDEX_FOLDER_NAME).
        #[arg(long)]
        folder: Option<String>,
    },
    /// Print the schema an index would be created with.
    Schema {
        /// Index name, e.g. events-index or lob-healthcare.
        index_name: String,
    },
}

impl Command {
    /// Job name used for the run's log file.
    fn job_name(&self) -> &'static str {
        match self {
            Command::Summaries => "summaries",
            Command::ApiDocs => "api-docs",
            Command::Docs => "docs",
            Command::Events => "events",
            Command::Lob { .. } => "lob",
            Command::Schema { .. } => "schema",
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config().context("failed to load configuration")?;
    if let Some(path) = logging::init_tracing(cli.command.job_name()) {
        tracing::info!(path = %path.display(), "Writing debug log");
    }
    let config = config::get_config();
    config.log_summary();

    let command = match cli.command {
        Command::Schema { index_name } => {
            let schema = schema::build_index_schema(&index_name, config.embedding_dimension)?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
            return Ok(());
        }
        command => command,
    };

    let backend = indexer::create_backend(config).context("failed to configure search backend")?;
    let embedder: Arc<dyn embedding::EmbeddingClient> = Arc::from(
        embedding::get_embedding_client(config).context("failed to configure embedding client")?,
    );
    let metrics = Arc::new(IngestMetrics::new());

    let mut ctx = PipelineContext::from_config(config, backend, embedder, metrics.clone())?;
    if let Some(data_dir) = cli.data_dir {
        ctx.data_dir = data_dir;
    }
    if cli.batch_size.is_some() {
        ctx.batch_size = cli.batch_size;
    }

    let summaries: Vec<RunSummary> = match command {
        Command::Summaries => {
            vec![pipeline::summaries::run(&ctx, &config.domain_index_name).await?]
        }
        Command::ApiDocs => vec![
            pipeline::api_docs::run(&ctx, &config.api_docs_index_name, &config.api_docs_platforms)
                .await?,
        ],
        Command::Docs => {
            pipeline::run_docs(
                &ctx,
                &config.domain_index_name,
                &config.api_docs_index_name,
                &config.api_docs_platforms,
            )
            .await?
        }
        Command::Events => vec![pipeline::events::run(&ctx, &config.events_index_name).await?],
        Command::Lob { index, folder } => {
            let index = index.as_deref().unwrap_or(&config.lob_index_name);
            let folder = folder.as_deref().unwrap_or(&config.lob_folder_name);
            vec![pipeline::lob::run(&ctx, index, folder).await?]
        }
        Command::Schema { .. } => Vec::new(),
    };

    for summary in &summaries {
        println!("{}", serde_json::to_string(summary)?);
    }
    tracing::info!(metrics = ?metrics.snapshot(), "Ingestion finished");
    Ok(())
}
