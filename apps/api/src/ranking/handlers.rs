//! Axum route handlers for the Ranking API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::resume::fetch_resume_text;
use crate::ranking::keywords::{extract_weighted_keywords, KeywordProfile};
use crate::ranking::pipeline::{rank_jobs, PipelineDeps};
use crate::ranking::resume_parser::parse_resume_structure;
use crate::ranking::scorer::{CandidateJob, ScoredJob};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankJobsRequest {
    #[serde(default)]
    pub jobs: Vec<CandidateJob>,
    pub resume_id: Option<Uuid>,
    /// Direct resume text; when absent the stored document is used.
    pub resume_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RankJobsResponse {
    pub success: bool,
    pub rankings: Vec<ScoredJob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeKeywordsRequest {
    pub resume_id: Option<Uuid>,
    pub resume_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResumeKeywordsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub profile: KeywordProfile,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/rank
///
/// Ranks the submitted jobs against the caller's resume. Client errors pass
/// through; anything else surfaces as the single generic ranking failure.
pub async fn handle_rank_jobs(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<RankJobsRequest>,
) -> Result<Json<RankJobsResponse>, AppError> {
    match rank_for_user(&state, user, request).await {
        Ok(rankings) => Ok(Json(RankJobsResponse {
            success: true,
            rankings,
        })),
        Err(e @ (AppError::Validation(_) | AppError::Unauthorized | AppError::NotFound(_))) => {
            Err(e)
        }
        Err(e) => {
            tracing::error!("ranking pipeline failed: {e}");
            Err(AppError::RankingFailed)
        }
    }
}

async fn rank_for_user(
    state: &AppState,
    user: AuthUser,
    request: RankJobsRequest,
) -> Result<Vec<ScoredJob>, AppError> {
    if request.jobs.is_empty() {
        return Err(AppError::Validation("jobs array required".to_string()));
    }

    let resume_text =
        resolve_resume_text(state, user, request.resume_id, request.resume_text).await?;

    let deps = PipelineDeps {
        cache: state.cache.clone(),
        embedder: state.embedder.clone(),
        fetcher: state.job_fetcher.clone(),
        judge: state.rerank_judge.clone(),
    };
    rank_jobs(&resume_text, &request.jobs, &deps).await
}

/// POST /api/v1/resumes/keywords
///
/// Returns the weighted keyword profile for a resume, used by the product to
/// seed job-board searches. No ranking is run.
pub async fn handle_resume_keywords(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ResumeKeywordsRequest>,
) -> Result<Json<ResumeKeywordsResponse>, AppError> {
    let resume_text =
        resolve_resume_text(&state, user, request.resume_id, request.resume_text).await?;

    let structure = parse_resume_structure(&resume_text);
    let profile = extract_weighted_keywords(&resume_text, &structure);

    Ok(Json(ResumeKeywordsResponse {
        success: true,
        profile,
    }))
}

/// Resolves resume text: direct text wins, otherwise the stored document.
async fn resolve_resume_text(
    state: &AppState,
    AuthUser(user_id): AuthUser,
    resume_id: Option<Uuid>,
    resume_text: Option<String>,
) -> Result<String, AppError> {
    if let Some(text) = resume_text {
        if !text.trim().is_empty() {
            return Ok(text);
        }
    }

    let stored = fetch_resume_text(&state.db, user_id, resume_id)
        .await
        .map_err(AppError::Internal)?;
    stored.ok_or_else(|| AppError::Validation("resume text unavailable".to_string()))
}
