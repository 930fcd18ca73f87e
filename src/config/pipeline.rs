// src/config/pipeline.rs
use std::fmt;
use std::time::Duration;

use crate::error::{PipelineError, Result};

// --- env names & defaults ---
pub const ENV_NEWS_API_KEY: &str = "NEWS_API_KEY";
pub const ENV_WAREHOUSE_TABLE: &str = "WAREHOUSE_TABLE";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "PIPELINE_HTTP_TIMEOUT_SECS";
pub const ENV_NEWS_API_BASE_URL: &str = "NEWS_API_BASE_URL";
pub const ENV_WAREHOUSE_API_BASE_URL: &str = "WAREHOUSE_API_BASE_URL";
pub const ENV_WAREHOUSE_ACCESS_TOKEN: &str = "WAREHOUSE_ACCESS_TOKEN";
pub const ENV_METADATA_HOST: &str = "GCE_METADATA_HOST";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_NEWS_API_BASE_URL: &str = "https://newsapi.org/v2";
pub const DEFAULT_WAREHOUSE_API_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

/// Fully-qualified warehouse table: `project.dataset.table`
/// (legacy `project:dataset.table` is accepted too). Domain-scoped projects
/// such as `example.com:proj` work in either form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn parse(raw: &str) -> Result<Self> {
        let s = raw.trim();
        // dataset and table never contain separators, so peel them off the right
        let (rest, table) = s.rsplit_once('.').ok_or_else(|| bad_table(raw))?;
        let cut = rest.rfind(|c| c == '.' || c == ':').ok_or_else(|| bad_table(raw))?;
        let (project, dataset) = (&rest[..cut], &rest[cut + 1..]);

        if !is_plain_id(dataset) || !is_plain_id(table) || !is_project_id(project) {
            return Err(bad_table(raw));
        }

        Ok(Self {
            project: project.to_string(),
            dataset: dataset.to_string(),
            table: table.to_string(),
        })
    }
}

fn is_plain_id(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

// `proj` or `domain.tld:proj`
fn is_project_id(s: &str) -> bool {
    match s.rsplit_once(':') {
        None => is_plain_id(s),
        Some((domain, name)) => {
            is_plain_id(name) && domain.split('.').all(is_plain_id)
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

fn bad_table(raw: &str) -> PipelineError {
    PipelineError::ConfigurationInvalid(format!(
        "{ENV_WAREHOUSE_TABLE} must be `project.dataset.table` or `project:dataset.table` \
         (project may be domain-scoped, e.g. `example.com:proj`), got {raw:?}"
    ))
}

/// Everything one invocation needs, validated once at entry.
#[derive(Clone)]
pub struct PipelineConfig {
    pub news_api_key: String,
    pub table: TableRef,
    pub http_timeout: Duration,
    pub news_api_base_url: String,
    pub warehouse_api_base_url: String,
    pub warehouse_access_token: Option<String>,
    pub metadata_host: String,
}

// Never print secrets.
impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("news_api_key", &"<redacted>")
            .field("table", &self.table.to_string())
            .field("http_timeout", &self.http_timeout)
            .field("news_api_base_url", &self.news_api_base_url)
            .field("warehouse_api_base_url", &self.warehouse_api_base_url)
            .field(
                "warehouse_access_token",
                &self.warehouse_access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("metadata_host", &self.metadata_host)
            .finish()
    }
}

impl PipelineConfig {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| {
            lookup(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |k: &str| {
            get(k).ok_or_else(|| {
                PipelineError::ConfigurationInvalid(format!("{k} is missing or empty"))
            })
        };

        let news_api_key = required(ENV_NEWS_API_KEY)?;
        let table = TableRef::parse(&required(ENV_WAREHOUSE_TABLE)?)?;

        let http_timeout = match get(ENV_HTTP_TIMEOUT_SECS) {
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(PipelineError::ConfigurationInvalid(format!(
                        "{ENV_HTTP_TIMEOUT_SECS} must be a positive integer, got {raw:?}"
                    )))
                }
            },
        };

        let base = |k: &str, default: &str| {
            get(k)
                .unwrap_or_else(|| default.to_string())
                .trim_end_matches('/')
                .to_string()
        };

        Ok(Self {
            news_api_key,
            table,
            http_timeout,
            news_api_base_url: base(ENV_NEWS_API_BASE_URL, DEFAULT_NEWS_API_BASE_URL),
            warehouse_api_base_url: base(
                ENV_WAREHOUSE_API_BASE_URL,
                DEFAULT_WAREHOUSE_API_BASE_URL,
            ),
            warehouse_access_token: get(ENV_WAREHOUSE_ACCESS_TOKEN),
            metadata_host: get(ENV_METADATA_HOST)
                .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = PipelineConfig::from_lookup(lookup(&[
            (ENV_NEWS_API_KEY, "k"),
            (ENV_WAREHOUSE_TABLE, "proj.news.headlines"),
        ]))
        .unwrap();
        assert_eq!(cfg.news_api_key, "k");
        assert_eq!(cfg.table.to_string(), "proj.news.headlines");
        assert_eq!(cfg.http_timeout, Duration::from_secs(30));
        assert_eq!(cfg.news_api_base_url, DEFAULT_NEWS_API_BASE_URL);
        assert_eq!(cfg.metadata_host, DEFAULT_METADATA_HOST);
        assert!(cfg.warehouse_access_token.is_none());
    }

    #[test]
    fn blank_api_key_is_invalid() {
        let err = PipelineConfig::from_lookup(lookup(&[
            (ENV_NEWS_API_KEY, "   "),
            (ENV_WAREHOUSE_TABLE, "proj.news.headlines"),
        ]))
        .unwrap_err();
        assert_eq!(err.cause(), "ConfigurationInvalid");
        assert!(err.to_string().contains(ENV_NEWS_API_KEY));
    }

    #[test]
    fn missing_table_is_invalid() {
        let err = PipelineConfig::from_lookup(lookup(&[(ENV_NEWS_API_KEY, "k")])).unwrap_err();
        assert!(err.to_string().contains(ENV_WAREHOUSE_TABLE));
    }

    #[test]
    fn table_ref_accepts_legacy_and_rejects_partial_names() {
        let t = TableRef::parse("my-proj:news.headlines").unwrap();
        assert_eq!(t.project, "my-proj");
        assert_eq!(t.dataset, "news");
        assert_eq!(t.table, "headlines");

        assert!(TableRef::parse("news.headlines").is_err());
        assert!(TableRef::parse("headlines").is_err());
        assert!(TableRef::parse(":news.headlines").is_err());
        assert!(TableRef::parse("proj..headlines").is_err());
        assert!(TableRef::parse("proj.news.head lines").is_err());
        assert!(TableRef::parse("proj.news.a.b").is_err());
    }

    #[test]
    fn table_ref_accepts_domain_scoped_projects() {
        for raw in [
            "example.com:proj:news.headlines",
            "example.com:proj.news.headlines",
        ] {
            let t = TableRef::parse(raw).unwrap();
            assert_eq!(t.project, "example.com:proj", "{raw}");
            assert_eq!(t.dataset, "news");
            assert_eq!(t.table, "headlines");
        }
        // dots only belong to the domain part of a project
        assert!(TableRef::parse("example.com.news.headlines").is_err());
        assert!(TableRef::parse("example..com:proj:news.headlines").is_err());
        assert!(TableRef::parse("example.com:pr.oj:news.headlines").is_err());
    }

    #[test]
    fn timeout_must_be_positive() {
        for raw in ["0", "-3", "soon"] {
            let res = PipelineConfig::from_lookup(lookup(&[
                (ENV_NEWS_API_KEY, "k"),
                (ENV_WAREHOUSE_TABLE, "p.d.t"),
                (ENV_HTTP_TIMEOUT_SECS, raw),
            ]));
            assert!(res.is_err(), "timeout {raw:?} should be rejected");
        }
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let cfg = PipelineConfig::from_lookup(lookup(&[
            (ENV_NEWS_API_KEY, "super-secret-key"),
            (ENV_WAREHOUSE_TABLE, "p.d.t"),
            (ENV_WAREHOUSE_ACCESS_TOKEN, "ya29.token"),
            (ENV_NEWS_API_BASE_URL, "http://127.0.0.1:9/v2/"),
        ]))
        .unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("super-secret-key"));
        assert!(!dbg.contains("ya29.token"));
        assert_eq!(cfg.news_api_base_url, "http://127.0.0.1:9/v2");
    }
}
