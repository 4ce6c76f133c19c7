//! Pipeline orchestration.
//!
//! Flow: validate → whole-response cache probe → parse structure → extract
//! keywords → score each job → rerank the top slice → stable sort → cache
//! the complete response.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cache::{content_key, CacheStore};
use crate::errors::AppError;
use crate::ranking::char_prefix;
use crate::ranking::embedding::EmbeddingProvider;
use crate::ranking::fetch::JobDetailFetcher;
use crate::ranking::keywords::extract_weighted_keywords;
use crate::ranking::rerank::{apply_rerank, RerankJudge};
use crate::ranking::resume_parser::parse_resume_structure;
use crate::ranking::scorer::{score_jobs, CandidateJob, ScoredJob};

/// Resumes shorter than this are rejected as unusable.
pub const MIN_RESUME_CHARS: usize = 50;
const RESPONSE_TTL: Duration = Duration::from_secs(600);
const RESPONSE_KEY_RESUME_CHARS: usize = 2000;
const RESPONSE_KEY_URL_CHARS: usize = 8000;

/// Collaborators the pipeline runs against. Real implementations or
/// null-objects, chosen once at startup.
pub struct PipelineDeps {
    pub cache: Arc<dyn CacheStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub fetcher: Arc<dyn JobDetailFetcher>,
    pub judge: Arc<dyn RerankJudge>,
}

/// Runs the full ranking pipeline and returns the sorted rankings.
///
/// Only input validation can fail; every collaborator failure downstream
/// degrades toward a best-effort complete ranking.
pub async fn rank_jobs(
    resume_text: &str,
    jobs: &[CandidateJob],
    deps: &PipelineDeps,
) -> Result<Vec<ScoredJob>, AppError> {
    if jobs.is_empty() {
        return Err(AppError::Validation("jobs array required".to_string()));
    }
    if resume_text.chars().count() < MIN_RESUME_CHARS {
        return Err(AppError::Validation(format!(
            "resume text must be at least {MIN_RESUME_CHARS} characters"
        )));
    }

    // URL is the job identity: drop duplicates, keep first occurrence.
    let mut seen = HashSet::new();
    let jobs: Vec<CandidateJob> = jobs
        .iter()
        .filter(|j| seen.insert(j.url.clone()))
        .cloned()
        .collect();

    let response_key = response_cache_key(resume_text, &jobs);
    if let Some(hit) = deps.cache.get(&response_key).await {
        if let Ok(rankings) = serde_json::from_str::<Vec<ScoredJob>>(&hit) {
            info!("serving ranking from whole-response cache");
            return Ok(rankings);
        }
    }

    let structure = parse_resume_structure(resume_text);
    let profile = extract_weighted_keywords(resume_text, &structure);
    info!(
        "resume parsed: {} roles, {:.1} years, primary industry {}",
        structure.roles.len(),
        structure.total_experience_years,
        structure.primary_industry
    );

    let mut rankings = score_jobs(
        resume_text,
        &profile.search_keywords,
        &jobs,
        deps.cache.as_ref(),
        deps.embedder.as_ref(),
        deps.fetcher.as_ref(),
    )
    .await;

    sort_by_score(&mut rankings);
    apply_rerank(
        resume_text,
        &mut rankings,
        deps.judge.as_ref(),
        deps.cache.as_ref(),
    )
    .await;
    sort_by_score(&mut rankings);

    if let Ok(json) = serde_json::to_string(&rankings) {
        deps.cache
            .set_with_ttl(&response_key, &json, RESPONSE_TTL)
            .await;
    }
    info!("ranked {} jobs", rankings.len());
    Ok(rankings)
}

/// Stable descending sort: equal scores keep their relative order.
fn sort_by_score(rankings: &mut [ScoredJob]) {
    rankings.sort_by(|a, b| b.score.cmp(&a.score));
}

/// Whole-response key: digest over the resume prefix and the sorted,
/// pipe-joined job URL set.
fn response_cache_key(resume_text: &str, jobs: &[CandidateJob]) -> String {
    let mut urls: Vec<&str> = jobs.iter().map(|j| j.url.as_str()).collect();
    urls.sort_unstable();
    let joined = urls.join("|");
    content_key(
        "rank:v1",
        &[
            char_prefix(resume_text, RESPONSE_KEY_RESUME_CHARS),
            char_prefix(&joined, RESPONSE_KEY_URL_CHARS),
        ],
    )
}
