// LLM prompt constants for the reranking stage.

/// System prompt for job reranking. Enforces JSON-only output.
pub const RERANK_SYSTEM: &str =
    "You are an expert recruiter judging how well a candidate's resume fits a set of job postings. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Rerank prompt template. Replace `{resume_preview}` and `{jobs_json}`
/// before sending.
pub const RERANK_PROMPT_TEMPLATE: &str = r#"Judge how well this candidate fits each job below.

CANDIDATE RESUME (preview):
{resume_preview}

JOBS (url, title, companyName, description):
{jobs_json}

For EVERY job, return one entry in a JSON ARRAY with this EXACT schema:
[
  {
    "url": "the-exact-job-url-from-input",
    "refineScore": 85,
    "fitReasons": ["up to 3 short reasons the candidate fits"],
    "fixSuggestions": ["up to 3 short resume improvements for this job"]
  }
]

Rules:
1. `url` must echo the input URL exactly; entries with other URLs are discarded
2. `refineScore` is an integer 0-100 judging overall fit
3. At most 3 fitReasons and 3 fixSuggestions per job, each under 120 characters
4. Base your judgment only on the resume preview and job text provided"#;
