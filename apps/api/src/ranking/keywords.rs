//! Weighted Keyword Extractor: consumes the parsed resume structure and
//! produces a ranked, weighted keyword set plus derived views.
//!
//! Weight = 1.0 × recency × tenure × industry × seniority. Ranking relies on
//! sort stability: equal-weight keywords keep their discovery order.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;

use crate::ranking::matching;
use crate::ranking::resume_parser::{Industry, ResumeRole, ResumeStructure};

/// Number of top keywords exposed as job-board search terms.
const SEARCH_KEYWORD_LIMIT: usize = 18;
/// Number of top keywords reported as dominant skills.
const DOMINANT_SKILL_LIMIT: usize = 5;
/// Role-title tokens must be longer than this to become candidates.
const MIN_TITLE_TOKEN_CHARS: usize = 3;

/// Curated vocabulary scanned case-insensitively across the whole resume.
const CURATED_VOCABULARY: &[&str] = &[
    "python", "java", "javascript", "typescript", "rust", "golang", "c++", "c#", "sql",
    "postgresql", "mysql", "mongodb", "redis", "aws", "azure", "gcp", "docker", "kubernetes",
    "terraform", "linux", "react", "angular", "node.js", "django", "spring", "microservices",
    "graphql", "rest api", "ci/cd", "devops", "machine learning", "data analysis",
    "data engineering", "etl", "agile", "scrum", "project management", "product management",
    "stakeholder management", "underwriting", "loan origination", "credit analysis",
    "risk management", "compliance", "portfolio management", "financial modeling",
    "accounting", "salesforce", "crm", "business development", "account management",
    "lead generation", "negotiation", "forecasting", "customer success", "marketing",
    "operations", "supply chain", "logistics", "recruiting", "training", "leadership",
    "mentoring", "budgeting", "excel", "tableau", "power bi",
];

/// Supplements injected when the primary industry matches a known category.
const FINANCE_SUPPLEMENTS: &[&str] = &[
    "lending", "loan processing", "loan servicing", "credit risk", "regulatory compliance",
    "kyc", "aml",
];
const TECH_SUPPLEMENTS: &[&str] = &[
    "software development", "distributed systems", "cloud computing", "system design",
    "unit testing", "code review", "git",
];

const SENIOR_MARKERS: &[&str] = &[
    "senior", "lead", "manager", "director", "vp", "ceo", "cto", "head", "principal", "chief",
];
const JUNIOR_MARKERS: &[&str] = &["junior", "entry", "associate", "intern", "assistant"];

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// A scored skill or term with the multiplier snapshot that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedKeyword {
    pub keyword: String,
    pub weight: f64,
    /// Companies of the roles this keyword was found in.
    pub sources: Vec<String>,
    pub recency: f64,
    pub tenure_years: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordSummary {
    pub total_candidates: usize,
    pub primary_industry: Industry,
    pub total_experience_years: f64,
    pub dominant_skills: Vec<String>,
    pub roles_analyzed: usize,
}

/// Ranked keyword output plus derived views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordProfile {
    /// Top keywords suitable for seeding job-board searches.
    pub search_keywords: Vec<String>,
    pub keywords: Vec<WeightedKeyword>,
    pub summary: KeywordSummary,
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction
// ────────────────────────────────────────────────────────────────────────────

/// Extracts and ranks weighted keywords for a resume.
pub fn extract_weighted_keywords(resume_text: &str, structure: &ResumeStructure) -> KeywordProfile {
    let candidates = collect_candidates(resume_text, structure);

    let mut keywords: Vec<WeightedKeyword> = candidates
        .iter()
        .map(|candidate| weigh_candidate(candidate, structure))
        .collect();

    // Stable sort: equal weights keep discovery order, no secondary key.
    keywords.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    let search_keywords = keywords
        .iter()
        .take(SEARCH_KEYWORD_LIMIT)
        .map(|k| k.keyword.clone())
        .collect();
    let dominant_skills = keywords
        .iter()
        .take(DOMINANT_SKILL_LIMIT)
        .map(|k| k.keyword.clone())
        .collect();

    let summary = KeywordSummary {
        total_candidates: candidates.len(),
        primary_industry: structure.primary_industry,
        total_experience_years: structure.total_experience_years,
        dominant_skills,
        roles_analyzed: structure.roles.len(),
    };

    KeywordProfile {
        search_keywords,
        keywords,
        summary,
    }
}

/// Candidate generation: curated vocabulary hits, significant role-title
/// tokens, and industry supplements, deduplicated in discovery order.
fn collect_candidates(resume_text: &str, structure: &ResumeStructure) -> Vec<String> {
    fn push(candidate: &str, seen: &mut HashSet<String>, out: &mut Vec<String>) {
        if seen.insert(candidate.to_string()) {
            out.push(candidate.to_string());
        }
    }

    let text_lower = resume_text.to_lowercase();
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates: Vec<String> = Vec::new();

    for term in CURATED_VOCABULARY {
        if text_lower.contains(term) {
            push(term, &mut seen, &mut candidates);
        }
    }

    for role in &structure.roles {
        for token in matching::tokenize(&role.title) {
            if token.chars().count() <= MIN_TITLE_TOKEN_CHARS || matching::is_stopword(token) {
                continue;
            }
            push(&token.to_lowercase(), &mut seen, &mut candidates);
        }
    }

    let supplements: &[&str] = match structure.primary_industry {
        Industry::Finance => FINANCE_SUPPLEMENTS,
        Industry::Technology => TECH_SUPPLEMENTS,
        _ => &[],
    };
    for term in supplements {
        push(term, &mut seen, &mut candidates);
    }

    candidates
}

fn weigh_candidate(candidate: &str, structure: &ResumeStructure) -> WeightedKeyword {
    let matching_roles: Vec<&ResumeRole> = structure
        .roles
        .iter()
        .filter(|role| {
            role.title.to_lowercase().contains(candidate)
                || role.description.to_lowercase().contains(candidate)
        })
        .collect();

    let recency = recency_multiplier(&matching_roles);
    let tenure_years: f64 = matching_roles.iter().map(|r| r.duration_years).sum();
    let tenure = tenure_multiplier(tenure_years);
    let industry = if matching_roles
        .iter()
        .any(|r| r.industry == structure.primary_industry)
    {
        1.25
    } else {
        1.0
    };
    let seniority = seniority_multiplier(&matching_roles);

    let mut sources: Vec<String> = Vec::new();
    for role in &matching_roles {
        if !role.company.is_empty() && !sources.contains(&role.company) {
            sources.push(role.company.clone());
        }
    }

    WeightedKeyword {
        keyword: candidate.to_string(),
        weight: 1.0 * recency * tenure * industry * seniority,
        sources,
        recency,
        tenure_years,
    }
}

/// Recency from the most recent matching role's start date. A current role
/// counts as fresh regardless of when it began. No matching role is neutral.
fn recency_multiplier(matching_roles: &[&ResumeRole]) -> f64 {
    let Some(most_recent) = matching_roles.iter().max_by_key(|r| r.start_date) else {
        return 1.0;
    };
    if most_recent.is_current {
        return 2.0;
    }
    let years_since_start =
        (Utc::now().date_naive() - most_recent.start_date).num_days().max(0) as f64 / 365.25;
    if years_since_start < 1.0 {
        2.0
    } else if years_since_start < 3.0 {
        1.5
    } else if years_since_start < 5.0 {
        1.0
    } else if years_since_start < 10.0 {
        0.7
    } else {
        0.5
    }
}

fn tenure_multiplier(tenure_years: f64) -> f64 {
    if tenure_years >= 5.0 {
        1.5
    } else if tenure_years >= 3.0 {
        1.3
    } else if tenure_years >= 1.0 {
        1.0
    } else {
        0.8
    }
}

/// Senior markers take precedence over junior markers even when they appear
/// in different matching roles.
fn seniority_multiplier(matching_roles: &[&ResumeRole]) -> f64 {
    let title_has = |markers: &[&str]| {
        matching_roles.iter().any(|r| {
            let title = r.title.to_lowercase();
            markers.iter().any(|m| title.contains(m))
        })
    };
    if title_has(SENIOR_MARKERS) {
        1.2
    } else if title_has(JUNIOR_MARKERS) {
        0.9
    } else {
        1.0
    }
}
