//! rustpapers - Research paper ingestion and serving
//!
//! Pulls the newest papers per topic from arXiv and Semantic Scholar, drops
//! papers already delivered in earlier runs, labels untagged ones, and serves
//! the stored batch per topic through an LRU cache.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! rustpapers ingest --topics AI,LG --sources arxiv,semanticscholar
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! rustpapers serve --port 3000
//! ```

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clap::{Args, Parser, Subcommand};
use rustpapers::{
    catalog::{Topic, TopicCatalog},
    classify::{Classifier, KeywordClassifier, LlmClassifier, LlmConfig},
    config::{
        PipelineConfig, ServeConfig, DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_PAPERS, DEFAULT_OVERFETCH,
        DEFAULT_TOPIC_LIMIT, DEFAULT_WORKERS,
    },
    export,
    model::{CanonicalPaper, SourceName},
    orchestrator::FetchOrchestrator,
    pipeline::IngestPipeline,
    registry::{default_state_path, RegistryFile},
    serving::TopicService,
    sources,
    store::{JsonFileStore, PaperStore},
};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Research paper feed - multi-source ingestion and cached topic serving
#[derive(Parser)]
#[command(name = "rustpapers")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the topic catalog
    Topics,

    /// Fetch, deduplicate, label and store one batch
    Ingest(IngestArgs),

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Paper store written by `ingest`
        #[arg(long, default_value = "papers.json")]
        store: PathBuf,

        /// Topics kept in the LRU cache
        #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
        cache_capacity: usize,

        /// Papers returned per topic
        #[arg(long, default_value_t = DEFAULT_TOPIC_LIMIT)]
        limit: usize,
    },
}

#[derive(Args)]
struct IngestArgs {
    /// Comma-separated topic codes (default: whole catalog)
    #[arg(long)]
    topics: Option<String>,

    /// Comma-separated sources: arxiv, semanticscholar
    #[arg(long, default_value = "arxiv,semanticscholar")]
    sources: String,

    /// Concurrent (topic, source) fetches
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Newest papers kept per (topic, source)
    #[arg(long, default_value_t = DEFAULT_MAX_PAPERS)]
    max_papers: usize,

    /// Extra Semantic Scholar candidates requested beyond --max-papers
    #[arg(long, default_value_t = DEFAULT_OVERFETCH)]
    overfetch: usize,

    /// Semantic Scholar year filter (e.g., "2024" or "2023-")
    #[arg(long)]
    year: Option<String>,

    /// Semantic Scholar API key
    #[arg(long, env = "S2_API_KEY")]
    s2_api_key: Option<String>,

    /// Paper store to replace
    #[arg(long, default_value = "papers.json")]
    store: PathBuf,

    /// Carry the dedup registry across runs in a snapshot file
    /// (bare flag: ~/.rustpapers/seen.json). Without it every run starts empty.
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    state: Option<Option<PathBuf>>,

    /// Also write the batch as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Labeler for papers without a recognized tag
    #[arg(long, default_value = "keyword", value_parser = ["keyword", "llm", "none"])]
    classifier: String,

    /// LLM API base URL (e.g., https://api.openai.com/v1)
    #[arg(long, env = "LLM_BASE_URL")]
    llm_base_url: Option<String>,

    /// LLM API key
    #[arg(long, env = "LLM_API_KEY")]
    llm_key: Option<String>,

    /// LLM model name
    #[arg(long, default_value = "gpt-4o-mini")]
    llm_model: String,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug, cli.json);

    match cli.command {
        Commands::Topics => {
            print_topics();
            Ok(())
        }
        Commands::Ingest(args) => run_ingest(args).await,
        Commands::Serve {
            port,
            host,
            store,
            cache_capacity,
            limit,
        } => {
            let config = ServeConfig {
                cache_capacity,
                topic_limit: limit,
            };
            run_server(host, port, store, config).await
        }
    }
}

fn init_logging(debug: bool, json: bool) {
    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if json {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    }
}

fn print_topics() {
    let catalog = TopicCatalog::standard();
    println!("{} topics:", catalog.len());
    for topic in catalog.iter() {
        println!("  {:<4} {}", topic.code, topic.name);
    }
}

// ============================================================================
// Ingest
// ============================================================================

async fn run_ingest(args: IngestArgs) -> Result<()> {
    let catalog = Arc::new(TopicCatalog::standard());

    let topics: Vec<Topic> = match &args.topics {
        Some(list) => catalog.subset(split_list(&list.to_uppercase()).as_slice()).context("Invalid --topics")?,
        None => catalog.iter().cloned().collect(),
    };
    let source_names = parse_sources(&args.sources)?;

    let config = PipelineConfig {
        workers: args.workers,
        max_papers: args.max_papers,
        overfetch: args.overfetch,
        year: args.year.clone(),
        s2_api_key: args.s2_api_key.clone(),
        ..Default::default()
    };
    config.validate()?;

    let state_file = match &args.state {
        Some(Some(path)) => Some(RegistryFile::with_path(path.clone())),
        Some(None) => Some(RegistryFile::with_path(default_state_path()?)),
        None => None,
    };
    let registry = Arc::new(state_file.as_ref().map(RegistryFile::load).unwrap_or_default());

    let client = sources::build_client(config.request_timeout)?;
    let adapters = sources::build_adapters(&source_names, &config, &client, &registry, &catalog);
    let orchestrator = FetchOrchestrator::new(adapters, config.workers);

    let store: Arc<dyn PaperStore> = Arc::new(JsonFileStore::new(args.store.clone()));
    let llm = build_llm_classifier(&args, &catalog)?;
    let classifier: Option<Arc<dyn Classifier>> = match args.classifier.as_str() {
        "keyword" => Some(Arc::new(KeywordClassifier::new(&catalog)) as Arc<dyn Classifier>),
        "llm" => llm.clone().map(|c| -> Arc<dyn Classifier> { c }),
        _ => None,
    };

    let mut pipeline = IngestPipeline::new(orchestrator, Arc::clone(&catalog), store);
    if let Some(classifier) = classifier {
        pipeline = pipeline.with_classifier(classifier);
    }

    println!(
        "Ingesting {} topics from {} sources ({} workers)...",
        topics.len(),
        source_names.len(),
        config.workers
    );

    let summary = pipeline.run(&topics).await;

    if let Some(state_file) = &state_file {
        if let Err(e) = state_file.save(&registry) {
            warn!(error = %e, "Failed to save registry snapshot");
        }
    }

    if let Some(csv_path) = &args.csv {
        export::save_csv(csv_path, &summary.papers)?;
        println!("Saved: {:?}", csv_path);
    }

    println!("\n=== Ingest Complete ===");
    println!("Fetched:      {}", summary.fetched);
    println!("Classified:   {}", summary.classified);
    if let Some(llm) = &llm {
        let usage = llm.usage();
        println!(
            "LLM tokens:   {} ({} prompt, {} completion)",
            usage.total(),
            usage.prompt_tokens,
            usage.completion_tokens
        );
    }
    println!("Failed pairs: {}", summary.failed_pairs.len());
    for key in &summary.failed_pairs {
        println!("  - {}", key);
    }

    if !summary.stored {
        anyhow::bail!("Failed to store batch in {:?}", args.store);
    }
    println!("Stored:       {:?}", args.store);
    Ok(())
}

/// The LLM classifier, when `--classifier llm` is selected
fn build_llm_classifier(args: &IngestArgs, catalog: &TopicCatalog) -> Result<Option<Arc<LlmClassifier>>> {
    if args.classifier != "llm" {
        return Ok(None);
    }

    let base_url = args
        .llm_base_url
        .clone()
        .context("--llm-base-url is required for the llm classifier")?;
    let api_key = args
        .llm_key
        .clone()
        .context("--llm-key is required for the llm classifier")?;
    let config = LlmConfig {
        base_url,
        api_key,
        model: args.llm_model.clone(),
    };
    info!(model = %config.model, "Using LLM classifier");
    Ok(Some(Arc::new(LlmClassifier::new(config, catalog)?)))
}

/// Split a comma-separated flag, dropping empty items
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_sources(raw: &str) -> Result<Vec<SourceName>> {
    let mut names = Vec::new();
    for item in split_list(raw) {
        let name: SourceName = item.parse().map_err(anyhow::Error::msg)?;
        if !names.contains(&name) {
            names.push(name);
        }
    }
    if names.is_empty() {
        anyhow::bail!("No sources selected");
    }
    Ok(names)
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(host: String, port: u16, store_path: PathBuf, config: ServeConfig) -> Result<()> {
    config.validate()?;
    info!(host = %host, port = port, store = ?store_path, "Starting HTTP server");
    println!("Starting server at http://{}:{}", host, port);

    let catalog = Arc::new(TopicCatalog::standard());
    let store: Arc<dyn PaperStore> = Arc::new(JsonFileStore::new(store_path));
    let app_state = Arc::new(AppState {
        service: TopicService::new(catalog, store, &config),
    });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/topics", get(topics_handler))
        .route("/api/topic/{id}", get(topic_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

struct AppState {
    service: TopicService,
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Catalog endpoint
async fn topics_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Topic>> {
    Json(state.service.catalog().iter().cloned().collect())
}

/// Topic lookup response
#[derive(Debug, Serialize)]
struct TopicResponse<'a> {
    topic: &'a str,
    count: usize,
    papers: &'a [CanonicalPaper],
}

/// Topic lookup endpoint handler
async fn topic_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    info!(topic = %id, "Topic request");

    match state.service.lookup_by_topic(&id).await {
        Ok(papers) => Json(TopicResponse {
            topic: &id,
            count: papers.len(),
            papers: &papers,
        })
        .into_response(),
        Err(e) if e.is_unknown_topic() => {
            (StatusCode::NOT_FOUND, Json(serde_json::json!({ "Invalid ID": id }))).into_response()
        }
        Err(e) => {
            error!(topic = %id, error = %e, "Topic lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
