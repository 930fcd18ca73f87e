// src/ingest/providers/newsapi.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::ingest::types::{HeadlineRecord, HeadlineSource};

/// Provider-imposed maximum page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// Fixed query: part of the pipeline contract, not configurable per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlineQuery {
    pub country: &'static str,
    pub category: &'static str,
    pub page_size: usize,
}

pub const TOP_BUSINESS_US: HeadlineQuery = HeadlineQuery {
    country: "us",
    category: "business",
    page_size: MAX_PAGE_SIZE,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopHeadlinesResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    #[serde(default)]
    source: Option<ArticleSource>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// NewsAPI `top-headlines` client. One GET per invocation, never retried here.
pub struct NewsApiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    query: HeadlineQuery,
}

impl NewsApiProvider {
    /// `client` should already carry the invocation timeout.
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            query: TOP_BUSINESS_US,
        }
    }

    pub fn query(&self) -> HeadlineQuery {
        self.query
    }

    fn endpoint(&self) -> String {
        format!("{}/top-headlines", self.base_url)
    }
}

fn unavailable(e: reqwest::Error) -> PipelineError {
    let kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else {
        "request"
    };
    PipelineError::SourceUnavailable(format!("{kind}: {e}"))
}

#[async_trait]
impl HeadlineSource for NewsApiProvider {
    async fn fetch_latest(&self) -> Result<Vec<HeadlineRecord>> {
        let t0 = std::time::Instant::now();
        let page_size = self.query.page_size.min(MAX_PAGE_SIZE);

        let rsp = self
            .client
            .get(self.endpoint())
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("country", self.query.country.to_string()),
                ("category", self.query.category.to_string()),
                ("pageSize", page_size.to_string()),
            ])
            .send()
            .await
            .map_err(unavailable)?;

        let status = rsp.status();
        let body = rsp.text().await.map_err(unavailable)?;
        histogram!("pipeline_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        if !status.is_success() {
            let parsed: Option<ErrorBody> = serde_json::from_str(&body).ok();
            let (code, message) = match parsed {
                Some(b) => (b.code, b.message.unwrap_or_else(|| snippet(&body))),
                None => (None, snippet(&body)),
            };
            return Err(PipelineError::SourceRejected {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let parsed: TopHeadlinesResponse =
            serde_json::from_str(&body).map_err(|e| PipelineError::SourceRejected {
                status: status.as_u16(),
                code: None,
                message: format!("undecodable response body: {e}"),
            })?;

        if parsed.status != "ok" {
            return Err(PipelineError::SourceRejected {
                status: status.as_u16(),
                code: parsed.code,
                message: parsed
                    .message
                    .unwrap_or_else(|| format!("provider status {:?}", parsed.status)),
            });
        }

        let out: Vec<HeadlineRecord> = parsed
            .articles
            .into_iter()
            .take(page_size)
            .map(|a| HeadlineRecord {
                title: a.title,
                source: a.source.and_then(|s| s.name),
                url: a.url,
                published_at: a.published_at,
            })
            .collect();

        counter!("pipeline_headlines_fetched_total").increment(out.len() as u64);
        tracing::debug!(target: "pipeline", provider = self.name(), count = out.len(), "headlines fetched");

        Ok(out)
    }

    fn name(&self) -> &'static str {
        "NewsAPI"
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(200).collect()
}
