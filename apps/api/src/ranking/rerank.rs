//! LLM Reranking Stage: refines the top slice of the heuristic ranking
//! through an external judgment collaborator.
//!
//! Every failure in this stage is swallowed: the pipeline keeps the
//! pre-rerank heuristic scores for every job.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::cache::{content_key, CacheStore};
use crate::llm_client::LlmClient;
use crate::ranking::char_prefix;
use crate::ranking::prompts::{RERANK_PROMPT_TEMPLATE, RERANK_SYSTEM};
use crate::ranking::scorer::ScoredJob;

/// The rerank call covers at most this many of the top heuristic scores.
pub const RERANK_TOP_N: usize = 10;
const RESUME_PREVIEW_CHARS: usize = 2500;
const DESCRIPTION_PREVIEW_CHARS: usize = 1200;
const ORIGINAL_WEIGHT: f64 = 0.7;
const REFINE_WEIGHT: f64 = 0.3;
const REASON_LIMIT: usize = 3;
const RERANK_TTL: Duration = Duration::from_secs(600);
const RERANK_PREFIX_CHARS: usize = 2000;

// ────────────────────────────────────────────────────────────────────────────
// Judge collaborator
// ────────────────────────────────────────────────────────────────────────────

/// One job as presented to the judge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankCandidate {
    pub url: String,
    pub title: String,
    pub company_name: String,
    pub description: String,
}

/// Judge output for one job URL. `refine_score` is absent when the judge did
/// not return a usable number for that job.
#[derive(Debug, Clone)]
pub struct RerankVerdict {
    pub url: String,
    pub refine_score: Option<f64>,
    pub fit_reasons: Vec<String>,
    pub fix_suggestions: Vec<String>,
}

/// External judgment collaborator. One batched call covers the full top
/// slice; implementations bound the call with their own timeout.
#[async_trait]
pub trait RerankJudge: Send + Sync {
    async fn judge(
        &self,
        resume_preview: &str,
        candidates: &[RerankCandidate],
    ) -> Result<Vec<RerankVerdict>>;
}

/// Null-object judge: reranking disabled, heuristic scores stand.
pub struct NoopRerankJudge;

#[async_trait]
impl RerankJudge for NoopRerankJudge {
    async fn judge(
        &self,
        _resume_preview: &str,
        _candidates: &[RerankCandidate],
    ) -> Result<Vec<RerankVerdict>> {
        Ok(Vec::new())
    }
}

/// Judge backed by the Claude Messages API.
pub struct LlmRerankJudge {
    llm: LlmClient,
}

impl LlmRerankJudge {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl RerankJudge for LlmRerankJudge {
    async fn judge(
        &self,
        resume_preview: &str,
        candidates: &[RerankCandidate],
    ) -> Result<Vec<RerankVerdict>> {
        let jobs_json = serde_json::to_string_pretty(candidates)?;
        let prompt = RERANK_PROMPT_TEMPLATE
            .replace("{resume_preview}", resume_preview)
            .replace("{jobs_json}", &jobs_json);

        let value: Value = self
            .llm
            .call_json(&prompt, RERANK_SYSTEM)
            .await
            .map_err(|e| anyhow!("rerank judge call failed: {e}"))?;

        let entries = value
            .as_array()
            .ok_or_else(|| anyhow!("rerank judge returned non-array output"))?;

        // Tolerant extraction: entries without a URL are discarded, wrong-typed
        // fields fall back to absent rather than failing the whole batch.
        let mut verdicts = Vec::new();
        for entry in entries {
            let Some(url) = entry.get("url").and_then(Value::as_str) else {
                continue;
            };
            verdicts.push(RerankVerdict {
                url: url.to_string(),
                refine_score: entry.get("refineScore").and_then(Value::as_f64),
                fit_reasons: string_list(entry, "fitReasons"),
                fix_suggestions: string_list(entry, "fixSuggestions"),
            });
        }
        Ok(verdicts)
    }
}

fn string_list(entry: &Value, key: &str) -> Vec<String> {
    entry
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// ────────────────────────────────────────────────────────────────────────────
// Applying the rerank
// ────────────────────────────────────────────────────────────────────────────

fn rerank_key(url: &str, resume_prefix: &str) -> String {
    content_key("rerank:v1", &[url, resume_prefix])
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Blends judge scores into the top slice of `ranked`, in place.
///
/// Runs only when more than one job is present. Jobs whose blended result is
/// already cached for this resume skip the judge entirely; if everything is
/// cached no call is made.
pub async fn apply_rerank(
    resume_text: &str,
    ranked: &mut [ScoredJob],
    judge: &dyn RerankJudge,
    cache: &dyn CacheStore,
) {
    if ranked.len() <= 1 {
        return;
    }
    let top = ranked.len().min(RERANK_TOP_N);
    let resume_prefix = char_prefix(resume_text, RERANK_PREFIX_CHARS);

    let mut pending: Vec<usize> = Vec::new();
    for idx in 0..top {
        let key = rerank_key(&ranked[idx].url, resume_prefix);
        match cache.get(&key).await {
            Some(hit) => match serde_json::from_str::<ScoredJob>(&hit) {
                Ok(cached) => ranked[idx] = cached,
                Err(_) => pending.push(idx),
            },
            None => pending.push(idx),
        }
    }
    if pending.is_empty() {
        return;
    }

    let preview = collapse_whitespace(char_prefix(resume_text, RESUME_PREVIEW_CHARS));
    let candidates: Vec<RerankCandidate> = pending
        .iter()
        .map(|&idx| {
            let job = &ranked[idx];
            RerankCandidate {
                url: job.url.clone(),
                title: job.title.clone(),
                company_name: job.company_name.clone(),
                description: char_prefix(&job.description, DESCRIPTION_PREVIEW_CHARS).to_string(),
            }
        })
        .collect();

    let verdicts = match judge.judge(&preview, &candidates).await {
        Ok(v) => v,
        Err(e) => {
            warn!("rerank stage skipped: {e}");
            return;
        }
    };
    let by_url: HashMap<&str, &RerankVerdict> =
        verdicts.iter().map(|v| (v.url.as_str(), v)).collect();

    for &idx in &pending {
        let job = &mut ranked[idx];
        let Some(verdict) = by_url.get(job.url.as_str()) else {
            continue;
        };
        // An entry without a numeric refine score is ignored for that job.
        let Some(refine) = verdict.refine_score else {
            continue;
        };
        let refine = refine.clamp(0.0, 100.0);

        job.score = (f64::from(job.score) * ORIGINAL_WEIGHT + refine * REFINE_WEIGHT)
            .round()
            .clamp(0.0, 100.0) as u8;
        for reason in verdict.fit_reasons.iter().take(REASON_LIMIT) {
            job.reasons.push(format!("LLM: {reason}"));
        }
        for fix in verdict.fix_suggestions.iter().take(REASON_LIMIT) {
            job.reasons.push(format!("Fix: {fix}"));
        }

        let key = rerank_key(&job.url, resume_prefix);
        if let Ok(json) = serde_json::to_string(job) {
            cache.set_with_ttl(&key, &json, RERANK_TTL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::cache::MemoryCacheStore;

    const RESUME: &str = "A sufficiently long resume describing years of platform work, \
        service ownership, and incident response across several teams.";

    struct StubJudge {
        verdicts: Vec<RerankVerdict>,
        calls: AtomicUsize,
        last_candidate_count: AtomicUsize,
    }

    impl StubJudge {
        fn returning(verdicts: Vec<RerankVerdict>) -> Self {
            Self {
                verdicts,
                calls: AtomicUsize::new(0),
                last_candidate_count: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RerankJudge for StubJudge {
        async fn judge(
            &self,
            _resume_preview: &str,
            candidates: &[RerankCandidate],
        ) -> Result<Vec<RerankVerdict>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_candidate_count
                .store(candidates.len(), Ordering::SeqCst);
            Ok(self.verdicts.clone())
        }
    }

    struct FailingJudge;

    #[async_trait]
    impl RerankJudge for FailingJudge {
        async fn judge(
            &self,
            _resume_preview: &str,
            _candidates: &[RerankCandidate],
        ) -> Result<Vec<RerankVerdict>> {
            Err(anyhow!("judge produced malformed output"))
        }
    }

    fn scored(url: &str, score: u8) -> ScoredJob {
        ScoredJob {
            url: url.to_string(),
            title: "Engineer".to_string(),
            company_name: "Acme".to_string(),
            score,
            reasons: vec!["Matches: platform".to_string()],
            description: "A role description for rerank previews".to_string(),
        }
    }

    fn verdict(url: &str, refine: Option<f64>) -> RerankVerdict {
        RerankVerdict {
            url: url.to_string(),
            refine_score: refine,
            fit_reasons: vec![],
            fix_suggestions: vec![],
        }
    }

    #[tokio::test]
    async fn test_blend_is_seventy_thirty() {
        let cache = MemoryCacheStore::new();
        let judge = StubJudge::returning(vec![verdict("https://x/1", Some(100.0))]);
        let mut ranked = vec![scored("https://x/1", 80), scored("https://x/2", 40)];
        apply_rerank(RESUME, &mut ranked, &judge, &cache).await;
        assert_eq!(ranked[0].score, 86); // 80*0.7 + 100*0.3
        assert_eq!(ranked[1].score, 40);
    }

    #[tokio::test]
    async fn test_reasons_are_prefixed_and_capped() {
        let cache = MemoryCacheStore::new();
        let judge = StubJudge::returning(vec![RerankVerdict {
            url: "https://x/1".to_string(),
            refine_score: Some(50.0),
            fit_reasons: (0..5).map(|i| format!("fit {i}")).collect(),
            fix_suggestions: vec!["tighten summary".to_string()],
        }]);
        let mut ranked = vec![scored("https://x/1", 60), scored("https://x/2", 30)];
        apply_rerank(RESUME, &mut ranked, &judge, &cache).await;

        let llm_reasons = ranked[0]
            .reasons
            .iter()
            .filter(|r| r.starts_with("LLM: "))
            .count();
        assert_eq!(llm_reasons, 3);
        assert!(ranked[0]
            .reasons
            .iter()
            .any(|r| r == "Fix: tighten summary"));
        // Original heuristic reason is preserved in front.
        assert_eq!(ranked[0].reasons[0], "Matches: platform");
    }

    #[tokio::test]
    async fn test_failed_judge_leaves_scores_unchanged() {
        let cache = MemoryCacheStore::new();
        let mut ranked = vec![scored("https://x/1", 80), scored("https://x/2", 40)];
        let before: Vec<u8> = ranked.iter().map(|r| r.score).collect();
        apply_rerank(RESUME, &mut ranked, &FailingJudge, &cache).await;
        let after: Vec<u8> = ranked.iter().map(|r| r.score).collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_missing_refine_score_ignores_that_job_only() {
        let cache = MemoryCacheStore::new();
        let judge = StubJudge::returning(vec![
            verdict("https://x/1", None),
            verdict("https://x/2", Some(100.0)),
        ]);
        let mut ranked = vec![scored("https://x/1", 80), scored("https://x/2", 40)];
        apply_rerank(RESUME, &mut ranked, &judge, &cache).await;
        assert_eq!(ranked[0].score, 80);
        assert_eq!(ranked[1].score, 58); // 40*0.7 + 100*0.3
    }

    #[tokio::test]
    async fn test_single_job_skips_the_judge() {
        let cache = MemoryCacheStore::new();
        let judge = StubJudge::returning(vec![verdict("https://x/1", Some(100.0))]);
        let mut ranked = vec![scored("https://x/1", 80)];
        apply_rerank(RESUME, &mut ranked, &judge, &cache).await;
        assert_eq!(judge.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ranked[0].score, 80);
    }

    #[tokio::test]
    async fn test_only_top_ten_jobs_are_sent() {
        let cache = MemoryCacheStore::new();
        let judge = StubJudge::returning(vec![]);
        let mut ranked: Vec<ScoredJob> = (0..12)
            .map(|i| scored(&format!("https://x/{i}"), 90 - i as u8))
            .collect();
        apply_rerank(RESUME, &mut ranked, &judge, &cache).await;
        assert_eq!(judge.last_candidate_count.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_blended_result_is_cached_and_reused() {
        let cache = MemoryCacheStore::new();
        let judge = StubJudge::returning(vec![
            verdict("https://x/1", Some(100.0)),
            verdict("https://x/2", Some(100.0)),
        ]);
        let mut ranked = vec![scored("https://x/1", 80), scored("https://x/2", 40)];
        apply_rerank(RESUME, &mut ranked, &judge, &cache).await;
        assert_eq!(judge.calls.load(Ordering::SeqCst), 1);

        // Same resume, same jobs: both blends come from the cache, no call.
        let mut again = vec![scored("https://x/1", 80), scored("https://x/2", 40)];
        apply_rerank(RESUME, &mut again, &judge, &cache).await;
        assert_eq!(judge.calls.load(Ordering::SeqCst), 1);
        assert_eq!(again[0].score, 86);
    }

    #[tokio::test]
    async fn test_scores_stay_bounded_after_blend() {
        let cache = MemoryCacheStore::new();
        let judge = StubJudge::returning(vec![verdict("https://x/1", Some(1000.0))]);
        let mut ranked = vec![scored("https://x/1", 100), scored("https://x/2", 10)];
        apply_rerank(RESUME, &mut ranked, &judge, &cache).await;
        assert!(ranked[0].score <= 100);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a\n\n b\t c  "), "a b c");
    }
}
