//! Resume Structure Parser: turns raw resume text into discrete work-history
//! roles with tenure and inferred industry.
//!
//! Parsing never fails: a resume with no discoverable roles yields an empty
//! structure with zero experience and the General industry.

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Industry category inferred per role from a keyword lexicon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Industry {
    Finance,
    Technology,
    Sales,
    Automotive,
    Construction,
    Nonprofit,
    #[default]
    General,
}

impl std::fmt::Display for Industry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Industry::Finance => "Finance",
            Industry::Technology => "Technology",
            Industry::Sales => "Sales",
            Industry::Automotive => "Automotive",
            Industry::Construction => "Construction",
            Industry::Nonprofit => "Nonprofit",
            Industry::General => "General",
        };
        f.write_str(name)
    }
}

/// One employment stint parsed from free text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeRole {
    pub title: String,
    pub company: String,
    pub start_date: NaiveDate,
    /// None means the role is current.
    pub end_date: Option<NaiveDate>,
    pub duration_years: f64,
    pub description: String,
    pub industry: Industry,
    pub is_current: bool,
}

/// Parsed resume: ordered roles plus derived totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeStructure {
    pub roles: Vec<ResumeRole>,
    /// Unmerged sum of role durations; overlapping stints count twice.
    pub total_experience_years: f64,
    pub primary_industry: Industry,
}

// ────────────────────────────────────────────────────────────────────────────
// Section and date-range detection
// ────────────────────────────────────────────────────────────────────────────

/// Heading synonyms that open the work-history section. The earliest
/// occurrence wins; no occurrence means the whole text is scanned.
const SECTION_HEADINGS: &[&str] = &[
    "experience",
    "work history",
    "employment history",
    "work experience",
    "professional experience",
    "career history",
];

const DATE_SEPARATOR: &str = r"\s*(?:-|–|—|to)\s*";

static MONTH_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<sm>jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(?P<sy>\d{{4}}){sep}(?:(?P<em>jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(?P<ey>\d{{4}})|(?P<open>present|current))",
        sep = DATE_SEPARATOR
    ))
    .expect("month range pattern compiles")
});

static NUMERIC_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<sm>\d{{1,2}})/(?P<sy>\d{{4}}){sep}(?:(?P<em>\d{{1,2}})/(?P<ey>\d{{4}})|(?P<open>present|current))",
        sep = DATE_SEPARATOR
    ))
    .expect("numeric range pattern compiles")
});

static YEAR_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<sy>\d{{4}}){sep}(?:(?P<ey>\d{{4}})|(?P<open>present|current))\b",
        sep = DATE_SEPARATOR
    ))
    .expect("year range pattern compiles")
});

fn month_number(token: &str) -> Option<u32> {
    let month = match token.to_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

struct DateRangeMatch {
    start: NaiveDate,
    end: Option<NaiveDate>,
    span: (usize, usize),
}

/// Finds a date range in a line. Ranges whose components do not form valid
/// dates (month 13, year 0) are treated as no match at all, so a malformed
/// range never opens a role.
fn parse_date_range(line: &str) -> Option<DateRangeMatch> {
    for (regex, monthly) in [
        (&*MONTH_RANGE, true),
        (&*NUMERIC_RANGE, true),
        (&*YEAR_RANGE, false),
    ] {
        let Some(caps) = regex.captures(line) else {
            continue;
        };

        let start_year: i32 = caps.name("sy")?.as_str().parse().ok()?;
        let start_month = if monthly {
            let raw = caps.name("sm")?.as_str();
            match raw.parse::<u32>() {
                Ok(n) => n,
                Err(_) => month_number(raw)?,
            }
        } else {
            1
        };
        let start = NaiveDate::from_ymd_opt(start_year, start_month, 1)?;

        let end = if caps.name("open").is_some() {
            None
        } else {
            let end_year: i32 = caps.name("ey")?.as_str().parse().ok()?;
            let end_month = if monthly {
                let raw = caps.name("em")?.as_str();
                match raw.parse::<u32>() {
                    Ok(n) => n,
                    Err(_) => month_number(raw)?,
                }
            } else {
                1
            };
            Some(NaiveDate::from_ymd_opt(end_year, end_month, 1)?)
        };

        let whole = caps.get(0)?;
        return Some(DateRangeMatch {
            start,
            end,
            span: (whole.start(), whole.end()),
        });
    }
    None
}

// ────────────────────────────────────────────────────────────────────────────
// Industry inference
// ────────────────────────────────────────────────────────────────────────────

const INDUSTRY_LEXICON: &[(Industry, &[&str])] = &[
    (
        Industry::Finance,
        &[
            "lending", "loan", "mortgage", "underwriting", "finance", "financial", "banking",
            "credit", "fintech", "investment",
        ],
    ),
    (
        Industry::Technology,
        &[
            "software", "engineer", "developer", "technology", "saas", "cloud", "platform",
            "startup", "programming", "python", "java", "javascript", "aws", "devops", "data",
        ],
    ),
    (
        Industry::Sales,
        &[
            "sales", "business development", "account management", "account executive",
            "revenue", "quota", "partnerships",
        ],
    ),
    (
        Industry::Automotive,
        &["automotive", "dealership", "vehicle", "motors"],
    ),
    (
        Industry::Construction,
        &["construction", "contractor", "roofing", "hvac", "carpentry"],
    ),
    (
        Industry::Nonprofit,
        &["nonprofit", "non-profit", "charity", "foundation", "volunteer"],
    ),
];

/// Infers the industry of a role from its company name and description.
fn infer_industry(company: &str, description: &str) -> Industry {
    let haystack = format!("{} {}", company, description).to_lowercase();
    for (industry, terms) in INDUSTRY_LEXICON {
        if terms.iter().any(|t| haystack.contains(t)) {
            return *industry;
        }
    }
    Industry::General
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing
// ────────────────────────────────────────────────────────────────────────────

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn duration_years(start: NaiveDate, end: Option<NaiveDate>) -> f64 {
    let end = end.unwrap_or_else(|| Utc::now().date_naive());
    let days = (end - start).num_days().max(0);
    round1(days as f64 / 365.25)
}

/// Splits the remainder of a date line into (title, company).
/// "Senior Software Engineer, Acme" → ("Senior Software Engineer", "Acme").
fn split_title_company(remainder: &str) -> (String, String) {
    let cleaned = remainder.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, ',' | '|' | ';' | '•' | '-' | '–' | '—' | '(' | ')')
    });

    let mut parts = cleaned
        .split(|c: char| matches!(c, ',' | '|' | ';' | '•'))
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let first = parts.next().unwrap_or("").to_string();
    let second = parts.next().unwrap_or("").to_string();

    // "Title at Company" is common when no delimiter is present.
    if second.is_empty() {
        if let Some((title, company)) = first.split_once(" at ") {
            return (title.trim().to_string(), company.trim().to_string());
        }
    }
    (first, second)
}

/// Locates the work-history section: the earliest heading synonym wins, and
/// text before it is ignored. Falls back to the entire text.
fn work_history_section(text: &str) -> &str {
    let lower = text.to_ascii_lowercase();
    let start = SECTION_HEADINGS
        .iter()
        .filter_map(|h| lower.find(*h))
        .min();
    match start {
        Some(idx) => &text[idx..],
        None => text,
    }
}

/// Parses raw resume text into a `ResumeStructure`. Infallible by design:
/// unparseable input degrades to an empty structure.
pub fn parse_resume_structure(text: &str) -> ResumeStructure {
    let section = work_history_section(text);

    struct Draft {
        title: String,
        company: String,
        start: NaiveDate,
        end: Option<NaiveDate>,
        description_lines: Vec<String>,
    }

    let mut drafts: Vec<Draft> = Vec::new();
    for line in section.lines() {
        if let Some(range) = parse_date_range(line) {
            let remainder = format!("{} {}", &line[..range.span.0], &line[range.span.1..]);
            let (title, company) = split_title_company(&remainder);
            drafts.push(Draft {
                title,
                company,
                start: range.start,
                end: range.end,
                description_lines: Vec::new(),
            });
        } else if let Some(current) = drafts.last_mut() {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                current.description_lines.push(trimmed.to_string());
            }
        }
    }

    let roles: Vec<ResumeRole> = drafts
        .into_iter()
        .map(|d| {
            let description = d.description_lines.join("\n");
            let industry = infer_industry(&d.company, &description);
            ResumeRole {
                duration_years: duration_years(d.start, d.end),
                is_current: d.end.is_none(),
                title: d.title,
                company: d.company,
                start_date: d.start,
                end_date: d.end,
                description,
                industry,
            }
        })
        .collect();

    let total_experience_years = round1(roles.iter().map(|r| r.duration_years).sum());
    let primary_industry = primary_industry(&roles);

    ResumeStructure {
        roles,
        total_experience_years,
        primary_industry,
    }
}

/// The industry with the greatest cumulative duration across roles.
/// Ties keep the earliest-seen industry; no roles means General.
fn primary_industry(roles: &[ResumeRole]) -> Industry {
    let mut totals: Vec<(Industry, f64)> = Vec::new();
    for role in roles {
        match totals.iter_mut().find(|(i, _)| *i == role.industry) {
            Some((_, total)) => *total += role.duration_years,
            None => totals.push((role.industry, role.duration_years)),
        }
    }

    let mut best = Industry::General;
    let mut best_total = f64::NEG_INFINITY;
    for (industry, total) in totals {
        if total > best_total {
            best = industry;
            best_total = total;
        }
    }
    if best_total.is_finite() {
        best
    } else {
        Industry::General
    }
}
