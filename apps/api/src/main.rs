mod auth;
mod cache;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod ranking;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cache::{CacheStore, MemoryCacheStore, RedisCacheStore};
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::ranking::embedding::{EmbeddingProvider, HttpEmbeddingProvider, NullEmbedding};
use crate::ranking::fetch::{HttpJobDetailFetcher, JobDetailFetcher};
use crate::ranking::rerank::{LlmRerankJudge, NoopRerankJudge, RerankJudge};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobScout API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (resume document lookups)
    let db = create_pool(&config.database_url).await?;

    // Cache store: Redis when configured, bounded in-process LRU otherwise
    let cache: Arc<dyn CacheStore> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.clone())?;
            info!("Redis cache store initialized");
            Arc::new(RedisCacheStore::new(client))
        }
        None => {
            info!("REDIS_URL not set; using in-process cache");
            Arc::new(MemoryCacheStore::new())
        }
    };

    // Embedding provider: semantic similarity contributes 0 when absent
    let embedder: Arc<dyn EmbeddingProvider> = match &config.embedding_api_url {
        Some(url) => {
            info!("Embedding provider initialized (model: {})", config.embedding_model);
            Arc::new(HttpEmbeddingProvider::new(
                url.clone(),
                config.embedding_api_key.clone(),
                config.embedding_model.clone(),
            ))
        }
        None => {
            info!("EMBEDDING_API_URL not set; semantic similarity disabled");
            Arc::new(NullEmbedding)
        }
    };

    // Rerank judge: heuristic scores stand when no API key is configured
    let rerank_judge: Arc<dyn RerankJudge> = match &config.anthropic_api_key {
        Some(key) => {
            info!("LLM rerank judge initialized (model: {})", llm_client::MODEL);
            Arc::new(LlmRerankJudge::new(LlmClient::new(key.clone())))
        }
        None => {
            info!("ANTHROPIC_API_KEY not set; reranking disabled");
            Arc::new(NoopRerankJudge)
        }
    };

    let job_fetcher: Arc<dyn JobDetailFetcher> = Arc::new(HttpJobDetailFetcher::new());

    // Build app state
    let state = AppState {
        db,
        cache,
        embedder,
        job_fetcher,
        rerank_judge,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
