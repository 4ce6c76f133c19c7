//! Hybrid Job Scorer: keyword overlap blended with optional semantic
//! similarity, memoized per (resume, job text) content pair.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{content_key, CacheStore};
use crate::ranking::char_prefix;
use crate::ranking::embedding::{self, EmbeddingProvider};
use crate::ranking::fetch::JobDetailFetcher;
use crate::ranking::matching;

/// Jobs beyond this count are silently ignored.
pub const MAX_JOBS_PER_REQUEST: usize = 30;
/// Descriptions under this length trigger a detail-backfill attempt.
const MIN_DESCRIPTION_CHARS: usize = 40;
const KEYWORD_BLEND: f64 = 0.8;
const EMBEDDING_BLEND: f64 = 0.2;
const MEMO_TTL: Duration = Duration::from_secs(600);
const MEMO_PREFIX_CHARS: usize = 2000;
const REASON_KEYWORD_LIMIT: usize = 10;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// An input job posting. The URL is the stable identity used for caching
/// and dedup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateJob {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// One entry of the ranked output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredJob {
    pub url: String,
    pub title: String,
    pub company_name: String,
    pub score: u8,
    pub reasons: Vec<String>,
    /// Resolved job description, carried for the rerank preview only.
    #[serde(skip)]
    pub description: String,
}

/// Memoized portion of a score: content-derived fields only, so two postings
/// with identical text share the entry regardless of URL.
#[derive(Debug, Serialize, Deserialize)]
struct CachedScore {
    score: u8,
    reasons: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring
// ────────────────────────────────────────────────────────────────────────────

/// Scores up to `MAX_JOBS_PER_REQUEST` jobs against the resume, in input
/// order. Infallible: every collaborator failure degrades to a neutral
/// default.
pub async fn score_jobs(
    resume_text: &str,
    resume_keywords: &[String],
    jobs: &[CandidateJob],
    cache: &dyn CacheStore,
    embedder: &dyn EmbeddingProvider,
    fetcher: &dyn JobDetailFetcher,
) -> Vec<ScoredJob> {
    let jobs = &jobs[..jobs.len().min(MAX_JOBS_PER_REQUEST)];

    // One resume embedding per request; None disables the semantic term.
    let resume_embedding = embedder.embed(resume_text).await;
    let resume_prefix = char_prefix(resume_text, MEMO_PREFIX_CHARS);

    let mut rankings = Vec::with_capacity(jobs.len());
    for job in jobs {
        rankings.push(
            score_single(
                resume_text,
                resume_keywords,
                resume_embedding.as_deref(),
                resume_prefix,
                job,
                cache,
                embedder,
                fetcher,
            )
            .await,
        );
    }
    rankings
}

#[allow(clippy::too_many_arguments)]
async fn score_single(
    resume_text: &str,
    resume_keywords: &[String],
    resume_embedding: Option<&[f32]>,
    resume_prefix: &str,
    job: &CandidateJob,
    cache: &dyn CacheStore,
    embedder: &dyn EmbeddingProvider,
    fetcher: &dyn JobDetailFetcher,
) -> ScoredJob {
    let mut title = job.title.clone().unwrap_or_default();
    let mut company_name = job.company_name.clone().unwrap_or_default();
    let mut description = job.description.clone().unwrap_or_default();

    if description.chars().count() < MIN_DESCRIPTION_CHARS {
        match fetcher.fetch(&job.url).await {
            Some(detail) => {
                if title.is_empty() {
                    title = detail.title.unwrap_or_default();
                }
                if company_name.is_empty() {
                    company_name = detail.company_name.unwrap_or_default();
                }
                if let Some(fetched) = detail.description {
                    if fetched.chars().count() > description.chars().count() {
                        description = fetched;
                    }
                }
            }
            // Proceed with whatever text is available, possibly just the title.
            None => debug!("no detail available for {}", job.url),
        }
    }

    let job_text = format!("{title} {company_name} {description}")
        .trim()
        .to_string();
    let memo_key = content_key(
        "score:v1",
        &[resume_prefix, char_prefix(&job_text, MEMO_PREFIX_CHARS)],
    );

    if let Some(hit) = cache.get(&memo_key).await {
        if let Ok(cached) = serde_json::from_str::<CachedScore>(&hit) {
            return ScoredJob {
                url: job.url.clone(),
                title,
                company_name,
                score: cached.score,
                reasons: cached.reasons,
                description,
            };
        }
    }

    let (matched, missing) = matching::match_breakdown(resume_text, resume_keywords, &job_text);
    let keyword_score = matching::overlap_score(matched.len(), matched.len() + missing.len());

    let embedding_score: u8 = match resume_embedding {
        Some(resume_vec) => {
            let target = if description.is_empty() {
                job_text.as_str()
            } else {
                description.as_str()
            };
            match embedder.embed(target).await {
                Some(job_vec) => embedding::similarity_score(resume_vec, &job_vec),
                None => 0,
            }
        }
        None => 0,
    };

    let score = blend_scores(keyword_score, embedding_score);

    let mut reasons = Vec::new();
    if !matched.is_empty() {
        reasons.push(format!(
            "Matches: {}",
            join_keywords(&matched, REASON_KEYWORD_LIMIT)
        ));
    }
    if !missing.is_empty() {
        reasons.push(format!(
            "Consider adding: {}",
            join_keywords(&missing, REASON_KEYWORD_LIMIT)
        ));
    }

    let cached = CachedScore {
        score,
        reasons: reasons.clone(),
    };
    if let Ok(json) = serde_json::to_string(&cached) {
        cache.set_with_ttl(&memo_key, &json, MEMO_TTL).await;
    }

    ScoredJob {
        url: job.url.clone(),
        title,
        company_name,
        score,
        reasons,
        description,
    }
}

fn blend_scores(keyword: u8, embedding: u8) -> u8 {
    (f64::from(keyword) * KEYWORD_BLEND + f64::from(embedding) * EMBEDDING_BLEND)
        .round()
        .clamp(0.0, 100.0) as u8
}

fn join_keywords(keywords: &[String], limit: usize) -> String {
    keywords
        .iter()
        .take(limit)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::cache::MemoryCacheStore;
    use crate::ranking::embedding::NullEmbedding;
    use crate::ranking::fetch::{JobDetail, NoopJobDetailFetcher};

    const RESUME: &str = "Senior Software Engineer at Acme since Jan 2015. Deep experience \
        building Python services on AWS, leading a platform team and shipping reliability \
        improvements across the billing stack. Comfortable with Docker and Postgres.";

    struct StubFetcher {
        calls: AtomicUsize,
        detail: Option<JobDetail>,
    }

    impl StubFetcher {
        fn returning(detail: Option<JobDetail>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                detail,
            }
        }
    }

    #[async_trait]
    impl JobDetailFetcher for StubFetcher {
        async fn fetch(&self, _url: &str) -> Option<JobDetail> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.detail.clone()
        }
    }

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn embed(&self, _text: &str) -> Option<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(vec![1.0, 0.0])
        }
    }

    fn job(url: &str, description: &str) -> CandidateJob {
        CandidateJob {
            url: url.to_string(),
            title: Some("Backend Engineer".to_string()),
            company_name: Some("Example".to_string()),
            description: Some(description.to_string()),
        }
    }

    fn long_description() -> String {
        "Looking for Python and AWS experience to build billing services".to_string()
    }

    #[tokio::test]
    async fn test_39_char_description_triggers_backfill() {
        let cache = MemoryCacheStore::new();
        let fetcher = StubFetcher::returning(None);
        let jobs = vec![job("https://x/1", &"a".repeat(39))];
        score_jobs(RESUME, &[], &jobs, &cache, &NullEmbedding, &fetcher).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_40_char_description_skips_backfill() {
        let cache = MemoryCacheStore::new();
        let fetcher = StubFetcher::returning(None);
        let jobs = vec![job("https://x/1", &"a".repeat(40))];
        score_jobs(RESUME, &[], &jobs, &cache, &NullEmbedding, &fetcher).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backfill_fills_missing_fields() {
        let cache = MemoryCacheStore::new();
        let fetcher = StubFetcher::returning(Some(JobDetail {
            title: Some("Platform Engineer".to_string()),
            company_name: Some("Acme".to_string()),
            description: Some(long_description()),
        }));
        let jobs = vec![CandidateJob {
            url: "https://x/1".to_string(),
            title: None,
            company_name: None,
            description: None,
        }];
        let ranked = score_jobs(RESUME, &[], &jobs, &cache, &NullEmbedding, &fetcher).await;
        assert_eq!(ranked[0].title, "Platform Engineer");
        assert_eq!(ranked[0].company_name, "Acme");
        assert!(ranked[0].score > 0);
    }

    #[tokio::test]
    async fn test_no_embedder_blend_is_keyword_times_point_eight() {
        let cache = MemoryCacheStore::new();
        let description = long_description();
        let jobs = vec![job("https://x/1", &description)];
        let ranked = score_jobs(
            RESUME,
            &[],
            &jobs,
            &cache,
            &NullEmbedding,
            &NoopJobDetailFetcher,
        )
        .await;

        let job_text = format!("Backend Engineer Example {description}");
        let expected_keyword = matching::keyword_overlap_score(RESUME, &job_text);
        assert_eq!(
            ranked[0].score,
            (f64::from(expected_keyword) * 0.8).round() as u8
        );
    }

    #[tokio::test]
    async fn test_scenario_matched_reasons_include_python_and_aws() {
        let cache = MemoryCacheStore::new();
        let jobs = vec![job(
            "https://x/1",
            "We need Python and AWS skills for our backend billing platform team",
        )];
        let ranked = score_jobs(
            RESUME,
            &[],
            &jobs,
            &cache,
            &NullEmbedding,
            &NoopJobDetailFetcher,
        )
        .await;

        assert!(ranked[0].score > 0);
        let matches = ranked[0]
            .reasons
            .iter()
            .find(|r| r.starts_with("Matches: "))
            .expect("matched reason present");
        assert!(matches.contains("Python"));
        assert!(matches.contains("AWS"));
    }

    #[tokio::test]
    async fn test_scores_are_bounded() {
        let cache = MemoryCacheStore::new();
        let jobs = vec![
            job("https://x/1", &long_description()),
            job("https://x/2", "Totally unrelated underwater basket weaving role"),
        ];
        let ranked = score_jobs(
            RESUME,
            &[],
            &jobs,
            &cache,
            &NullEmbedding,
            &NoopJobDetailFetcher,
        )
        .await;
        assert!(ranked.iter().all(|r| r.score <= 100));
    }

    #[tokio::test]
    async fn test_excess_jobs_are_silently_ignored() {
        let cache = MemoryCacheStore::new();
        let jobs: Vec<CandidateJob> = (0..35)
            .map(|i| job(&format!("https://x/{i}"), &long_description()))
            .collect();
        let ranked = score_jobs(
            RESUME,
            &[],
            &jobs,
            &cache,
            &NullEmbedding,
            &NoopJobDetailFetcher,
        )
        .await;
        assert_eq!(ranked.len(), MAX_JOBS_PER_REQUEST);
    }

    #[tokio::test]
    async fn test_memo_skips_recomputation_for_identical_content() {
        let cache = MemoryCacheStore::new();
        let embedder = CountingEmbedder {
            calls: AtomicUsize::new(0),
        };
        let jobs = vec![job("https://x/1", &long_description())];

        score_jobs(RESUME, &[], &jobs, &cache, &embedder, &NoopJobDetailFetcher).await;
        // resume + job = 2 embed calls
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);

        score_jobs(RESUME, &[], &jobs, &cache, &embedder, &NoopJobDetailFetcher).await;
        // second run: resume embed only, the job score comes from the memo
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_identical_content_scores_identically_across_urls() {
        let cache = MemoryCacheStore::new();
        let jobs = vec![
            job("https://x/1", &long_description()),
            job("https://x/2", &long_description()),
        ];
        let ranked = score_jobs(
            RESUME,
            &[],
            &jobs,
            &cache,
            &NullEmbedding,
            &NoopJobDetailFetcher,
        )
        .await;
        assert_eq!(ranked[0].score, ranked[1].score);
        assert_eq!(ranked[0].reasons, ranked[1].reasons);
        assert_eq!(ranked[1].url, "https://x/2");
    }

    #[tokio::test]
    async fn test_keyword_context_counts_as_match() {
        let cache = MemoryCacheStore::new();
        let context = vec!["kubernetes".to_string()];
        let jobs = vec![job(
            "https://x/1",
            "Kubernetes orchestration work on our cloud platform services",
        )];
        let ranked = score_jobs(
            RESUME,
            &context,
            &jobs,
            &cache,
            &NullEmbedding,
            &NoopJobDetailFetcher,
        )
        .await;
        let matches = ranked[0]
            .reasons
            .iter()
            .find(|r| r.starts_with("Matches: "))
            .expect("matched reason present");
        assert!(matches.contains("Kubernetes"));
    }
}
