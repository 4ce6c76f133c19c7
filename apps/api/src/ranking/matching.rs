#![allow(dead_code)]

//! General term matching: the keyword-overlap collaborator used by the
//! hybrid scorer. Deterministic, no I/O.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Keywords must be longer than this. Short acronyms like "AWS" and "SQL"
/// are meaningful in this domain, so the floor sits below the stricter
/// role-title filter in the extractor.
const MIN_KEYWORD_CHARS: usize = 2;

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "about", "able", "across", "after", "all", "also", "and", "another", "any", "are",
        "around", "been", "before", "being", "best", "between", "both", "but", "can",
        "company", "could", "during", "each", "etc", "every", "experience", "for", "from",
        "had", "has", "have", "her", "here", "highly", "his", "how", "include", "includes",
        "including", "into", "its", "job", "jobs", "join", "knowledge", "like", "looking",
        "may", "more", "most", "must", "new", "not", "offer", "one", "only", "other", "our",
        "out", "over", "own", "per", "plus", "preferred", "required", "requirements",
        "responsibilities", "role", "should", "skills", "some", "strong", "such", "team",
        "than", "that", "the", "their", "them", "then", "there", "these", "they", "this",
        "those", "through", "under", "upon", "using", "very", "via", "was", "well", "were",
        "what", "when", "where", "which", "while", "who", "why", "will", "with", "within",
        "without", "work", "working", "would", "years", "you", "your",
    ]
    .into_iter()
    .collect()
});

/// Splits text into candidate tokens, keeping `+` and `#` so terms like
/// "c++" and "c#" survive.
pub(crate) fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|t| !t.is_empty())
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token.to_lowercase().as_str())
}

/// Extracts significant keywords from free text: non-stopword tokens above
/// the length floor, deduplicated by lowercase while keeping the casing of
/// the first occurrence and the discovery order.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    for token in tokenize(text) {
        if token.chars().count() <= MIN_KEYWORD_CHARS {
            continue;
        }
        let lower = token.to_lowercase();
        if STOPWORDS.contains(lower.as_str()) {
            continue;
        }
        if seen.insert(lower) {
            keywords.push(token.to_string());
        }
    }
    keywords
}

/// Splits the job's keywords into (matched, missing) against the resume.
/// A keyword matches when it appears in the resume text itself or in the
/// caller-supplied keyword context derived from the resume structure.
pub fn match_breakdown(
    resume_text: &str,
    resume_keywords: &[String],
    job_text: &str,
) -> (Vec<String>, Vec<String>) {
    let resume_lower = resume_text.to_lowercase();
    let context: HashSet<String> = resume_keywords.iter().map(|k| k.to_lowercase()).collect();

    let mut matched = Vec::new();
    let mut missing = Vec::new();
    for keyword in extract_keywords(job_text) {
        let lower = keyword.to_lowercase();
        if resume_lower.contains(&lower) || context.contains(&lower) {
            matched.push(keyword);
        } else {
            missing.push(keyword);
        }
    }
    (matched, missing)
}

/// Overlap ratio mapped onto 0..=100. Zero when the job yields no keywords.
pub fn overlap_score(matched: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((matched as f64 / total as f64) * 100.0).round() as u8
}

/// Keyword-overlap score between resume and job text, 0..=100.
pub fn keyword_overlap_score(resume_text: &str, job_text: &str) -> u8 {
    let (matched, missing) = match_breakdown(resume_text, &[], job_text);
    overlap_score(matched.len(), matched.len() + missing.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_keywords_drops_short_tokens_and_stopwords() {
        let keywords = extract_keywords("We are looking for a strong Python engineer");
        assert_eq!(keywords, vec!["Python", "engineer"]);
    }

    #[test]
    fn test_extract_keywords_keeps_short_acronyms() {
        let keywords = extract_keywords("Python and AWS with SQL");
        assert_eq!(keywords, vec!["Python", "AWS", "SQL"]);
    }

    #[test]
    fn test_extract_keywords_dedupes_case_insensitively() {
        let keywords = extract_keywords("Python python PYTHON");
        assert_eq!(keywords, vec!["Python"]);
    }

    #[test]
    fn test_extract_keywords_preserves_discovery_order() {
        let keywords = extract_keywords("Kubernetes Docker Terraform");
        assert_eq!(keywords, vec!["Kubernetes", "Docker", "Terraform"]);
    }

    #[test]
    fn test_match_breakdown_splits_matched_and_missing() {
        let (matched, missing) = match_breakdown(
            "Seasoned Python developer with AWS background",
            &[],
            "Looking for Python and Kafka expertise",
        );
        assert_eq!(matched, vec!["Python"]);
        assert!(missing.contains(&"Kafka".to_string()));
    }

    #[test]
    fn test_match_breakdown_honors_keyword_context() {
        let (matched, _) = match_breakdown(
            "short resume",
            &["kubernetes".to_string()],
            "Kubernetes production experience",
        );
        assert_eq!(matched, vec!["Kubernetes"]);
    }

    #[test]
    fn test_overlap_score_bounds() {
        assert_eq!(overlap_score(0, 0), 0);
        assert_eq!(overlap_score(0, 5), 0);
        assert_eq!(overlap_score(5, 5), 100);
        assert_eq!(overlap_score(1, 3), 33);
    }

    #[test]
    fn test_keyword_overlap_score_empty_job_text_is_zero() {
        assert_eq!(keyword_overlap_score("plenty of resume text here", ""), 0);
    }
}
