//! CliniQ - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use cliniq::{
    bootstrap::{self, HealthStatus, EXIT_CODE_SETUP_NEEDED},
    cli::{display, parse_local_override, resolve_case, Args, Commands, Config, Verbosity, EXAMPLE_CASES},
    completion::OllamaChatClient,
    embedding::EmbeddingEngine,
    ingest::{self, IngestOptions},
    providers::{EmbeddingProvider, IndexSpec},
    telemetry,
    vector_db::QdrantVectorStore,
    ClinicalPipeline,
};

/// Load the embedding model once for the whole process
fn load_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let engine = EmbeddingEngine::new(&config.embedding.model_id)
        .context("Failed to load embedding model")?;

    if engine.dimension() != config.embedding.dimension {
        anyhow::bail!(
            "Embedding model {} produces {} dimensions, config expects {}",
            config.embedding.model_id,
            engine.dimension(),
            config.embedding.dimension
        );
    }
    Ok(Arc::new(engine))
}

async fn run_analyze(
    config: &Config,
    verbosity: Verbosity,
    case: Option<String>,
    example: Option<usize>,
    json: bool,
) -> Result<()> {
    let query = resolve_case(case.as_deref(), example).map_err(anyhow::Error::msg)?;

    let embedder = load_embedder(config)?;
    let store = Arc::new(QdrantVectorStore::connect(&config.vector_store.url)?);
    let completion = Arc::new(OllamaChatClient::with_config(&config.ollama.url, config.request_timeout())?);
    let pipeline = ClinicalPipeline::new(embedder, store, completion, config.pipeline_config());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let spinner = (verbosity.show_progress() && !json)
        .then(|| display::pipeline_spinner("Analyzing clinical case..."));

    let started = Instant::now();
    let outcome = pipeline.run_with_cancel(&query, &cancel).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let result = outcome.context("Analysis failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", display::render_result(&result, started.elapsed(), verbosity.show_details()));
    }
    Ok(())
}

async fn run_ingest(
    config: &Config,
    verbosity: Verbosity,
    max_records: Option<usize>,
    batch_size: Option<usize>,
    local: Vec<String>,
) -> Result<()> {
    let local_files = local
        .iter()
        .map(|raw| parse_local_override(raw))
        .collect::<std::result::Result<HashMap<_, _>, _>>()
        .map_err(anyhow::Error::msg)?;

    let options = IngestOptions {
        batch_size: batch_size.unwrap_or(config.ingest.batch_size),
        max_records: max_records.unwrap_or(config.ingest.max_records_per_dataset),
        local_files,
        show_progress: verbosity.show_progress(),
    };

    let embedder = load_embedder(config)?;
    let store = QdrantVectorStore::connect(&config.vector_store.url)?;
    let index_spec = IndexSpec::cosine(config.vector_store.index_name.clone(), config.embedding.dimension);

    let summary = ingest::run_ingestion(&store, embedder, &index_spec, &ingest::default_datasets(), &options)
        .await
        .context("Ingestion failed")?;

    for (label, count) in &summary.ingested {
        println!("{} {}: {} records", "✓".green(), label, count);
    }
    for label in &summary.skipped {
        println!("{} {}: skipped", "!".yellow(), label);
    }

    if summary.total == 0 {
        println!("{}", "No datasets were ingested. Please check dataset configurations.".red());
        std::process::exit(EXIT_CODE_SETUP_NEEDED);
    }
    println!("Ingestion complete! Total vectors ingested: {}", summary.total);
    Ok(())
}

async fn run_doctor(config: &Config) -> Result<()> {
    let store = QdrantVectorStore::connect(&config.vector_store.url)?;
    let checks = bootstrap::run_diagnostics(
        &config.ollama.url,
        &config.ollama.model,
        &store,
        &config.vector_store.index_name,
    )
    .await;

    let mut failed = false;
    for check in &checks {
        match &check.status {
            HealthStatus::Pass => println!("{} {}", "✓".green(), check.name),
            HealthStatus::Warn(msg) => println!("{} {}: {}", "!".yellow(), check.name, msg),
            HealthStatus::Fail(msg) => {
                failed = true;
                println!("{} {}: {}", "✗".red(), check.name, msg);
            }
        }
    }

    if failed {
        std::process::exit(EXIT_CODE_SETUP_NEEDED);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    telemetry::init_tracing(verbosity);

    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;

    match args.command {
        Commands::Analyze { case, example, json } => {
            run_analyze(&config, verbosity, case, example, json).await
        }
        Commands::Examples => {
            for (idx, case) in EXAMPLE_CASES.iter().enumerate() {
                println!("{}. {}", idx + 1, case);
            }
            Ok(())
        }
        Commands::Ingest { max_records, batch_size, local } => {
            run_ingest(&config, verbosity, max_records, batch_size, local).await
        }
        Commands::Doctor => run_doctor(&config).await,
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
