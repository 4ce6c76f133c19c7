#![allow(dead_code)]

//! Job-detail backfill: an injected capability keyed by posting URL.
//!
//! Jobs arriving with a missing or thin description get one fetch attempt;
//! failures are swallowed and the job proceeds with whatever text it has.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::warn;

use crate::ranking::char_prefix;

const REQUEST_TIMEOUT_SECS: u64 = 10;
/// Upper bound on backfilled description length.
const MAX_DESCRIPTION_CHARS: usize = 20_000;

/// Detail payload for a job posting.
#[derive(Debug, Clone, Default)]
pub struct JobDetail {
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub description: Option<String>,
}

/// Fetches posting details for a job URL. None on any failure.
#[async_trait]
pub trait JobDetailFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<JobDetail>;
}

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern compiles"));
static TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title pattern compiles")
});

/// Reduces an HTML page to whitespace-normalized text.
fn strip_html(html: &str) -> String {
    let text = TAG.replace_all(html, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn page_title(html: &str) -> Option<String> {
    TITLE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| strip_html(m.as_str()))
        .filter(|t| !t.is_empty())
}

/// Default fetcher: one GET against the posting URL itself.
pub struct HttpJobDetailFetcher {
    client: Client,
}

impl HttpJobDetailFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

impl Default for HttpJobDetailFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobDetailFetcher for HttpJobDetailFetcher {
    async fn fetch(&self, url: &str) -> Option<JobDetail> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("job detail fetch failed for {url}: {e}");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!("job detail fetch returned {} for {url}", response.status());
            return None;
        }
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!("job detail body read failed for {url}: {e}");
                return None;
            }
        };

        let title = page_title(&body);
        let description = {
            let text = strip_html(&body);
            let text = char_prefix(&text, MAX_DESCRIPTION_CHARS).to_string();
            (!text.is_empty()).then_some(text)
        };

        Some(JobDetail {
            title,
            company_name: None,
            description,
        })
    }
}

/// Null-object fetcher: no backfill capability.
pub struct NoopJobDetailFetcher;

#[async_trait]
impl JobDetailFetcher for NoopJobDetailFetcher {
    async fn fetch(&self, _url: &str) -> Option<JobDetail> {
        None
    }
}
