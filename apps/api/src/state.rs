use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::ranking::embedding::EmbeddingProvider;
use crate::ranking::fetch::JobDetailFetcher;
use crate::ranking::rerank::RerankJudge;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Every collaborator is held as an `Arc<dyn Trait>`: real implementations are
/// installed at startup when configured, null-object implementations otherwise.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Score and whole-response cache. Redis when REDIS_URL is set, bounded
    /// in-process LRU otherwise.
    pub cache: Arc<dyn CacheStore>,
    /// Semantic similarity provider. Contributes 0 to the blend when absent.
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Backfills title/company/description for jobs with thin descriptions.
    pub job_fetcher: Arc<dyn JobDetailFetcher>,
    /// Second-pass judge for the top slice of the heuristic ranking.
    pub rerank_judge: Arc<dyn RerankJudge>,
    /// Startup configuration, available to handlers.
    #[allow(dead_code)]
    pub config: Config,
}
