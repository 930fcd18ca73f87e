// tests/common/mod.rs
//
// Local stand-ins for the news provider, the warehouse API and the metadata
// server, served by one Axum app on an ephemeral port.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

pub const TABLE: &str = "proj.news.headlines";
pub const INSERT_PATH: &str = "/bq/projects/proj/datasets/news/tables/headlines/insertAll";

#[derive(Clone)]
pub struct Behavior {
    pub news_status: u16,
    pub news_body: Value,
    pub news_delay: Option<Duration>,
    pub insert_status: u16,
    pub insert_body: Value,
    pub insert_delay: Option<Duration>,
    pub metadata_delay: Option<Duration>,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            news_status: 200,
            news_body: json!({ "status": "ok", "totalResults": 0, "articles": [] }),
            news_delay: None,
            insert_status: 200,
            insert_body: json!({ "kind": "bigquery#tableDataInsertAllResponse" }),
            insert_delay: None,
            metadata_delay: None,
        }
    }
}

impl Behavior {
    pub fn with_articles(articles: Value) -> Self {
        let n = articles.as_array().map(|a| a.len()).unwrap_or_default();
        Self {
            news_body: json!({ "status": "ok", "totalResults": n, "articles": articles }),
            ..Self::default()
        }
    }
}

#[derive(Default)]
pub struct Seen {
    pub news_hits: AtomicUsize,
    pub insert_hits: AtomicUsize,
    pub metadata_hits: AtomicUsize,
    pub api_keys: Mutex<Vec<String>>,
    pub news_queries: Mutex<Vec<HashMap<String, String>>>,
    pub insert_auth: Mutex<Vec<String>>,
    pub insert_bodies: Mutex<Vec<Value>>,
}

impl Seen {
    pub fn news(&self) -> usize {
        self.news_hits.load(Ordering::SeqCst)
    }
    pub fn inserts(&self) -> usize {
        self.insert_hits.load(Ordering::SeqCst)
    }
    pub fn metadata(&self) -> usize {
        self.metadata_hits.load(Ordering::SeqCst)
    }
    pub fn inserted_rows(&self) -> Vec<Value> {
        self.insert_bodies
            .lock()
            .unwrap()
            .iter()
            .flat_map(|b| b["rows"].as_array().cloned().unwrap_or_default())
            .map(|r| r["json"].clone())
            .collect()
    }
}

#[derive(Clone)]
struct Ctx {
    behavior: Behavior,
    seen: Arc<Seen>,
}

pub struct Upstream {
    pub base: String,
    pub seen: Arc<Seen>,
}

impl Upstream {
    /// Environment pointing the pipeline at this upstream.
    pub fn env(&self) -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("NEWS_API_KEY".into(), "test-key".into());
        m.insert("WAREHOUSE_TABLE".into(), TABLE.into());
        m.insert("NEWS_API_BASE_URL".into(), format!("{}/v2", self.base));
        m.insert("WAREHOUSE_API_BASE_URL".into(), format!("{}/bq", self.base));
        m.insert("WAREHOUSE_ACCESS_TOKEN".into(), "static-token".into());
        m.insert("PIPELINE_HTTP_TIMEOUT_SECS".into(), "5".into());
        m
    }

    pub fn lookup(
        env: HashMap<String, String>,
    ) -> impl Fn(&str) -> Option<String> + Send + Sync + 'static {
        move |k| env.get(k).cloned()
    }
}

async fn top_headlines(
    State(ctx): State<Ctx>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    ctx.seen.news_hits.fetch_add(1, Ordering::SeqCst);
    if let Some(k) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        ctx.seen.api_keys.lock().unwrap().push(k.to_string());
    }
    ctx.seen.news_queries.lock().unwrap().push(q);
    if let Some(d) = ctx.behavior.news_delay {
        tokio::time::sleep(d).await;
    }
    (
        StatusCode::from_u16(ctx.behavior.news_status).unwrap(),
        Json(ctx.behavior.news_body.clone()),
    )
}

async fn insert_all(
    State(ctx): State<Ctx>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    ctx.seen.insert_hits.fetch_add(1, Ordering::SeqCst);
    if let Some(a) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        ctx.seen.insert_auth.lock().unwrap().push(a.to_string());
    }
    ctx.seen.insert_bodies.lock().unwrap().push(body);
    if let Some(d) = ctx.behavior.insert_delay {
        tokio::time::sleep(d).await;
    }
    (
        StatusCode::from_u16(ctx.behavior.insert_status).unwrap(),
        Json(ctx.behavior.insert_body.clone()),
    )
}

async fn metadata_token(State(ctx): State<Ctx>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    ctx.seen.metadata_hits.fetch_add(1, Ordering::SeqCst);
    let flavored = headers
        .get("metadata-flavor")
        .and_then(|v| v.to_str().ok())
        == Some("Google");
    if !flavored {
        return (StatusCode::FORBIDDEN, Json(json!({})));
    }
    if let Some(d) = ctx.behavior.metadata_delay {
        tokio::time::sleep(d).await;
    }
    (
        StatusCode::OK,
        Json(json!({ "access_token": "meta-token", "expires_in": 3599, "token_type": "Bearer" })),
    )
}

pub async fn spawn_upstream(behavior: Behavior) -> Upstream {
    let seen = Arc::new(Seen::default());
    let ctx = Ctx {
        behavior,
        seen: seen.clone(),
    };
    let app = Router::new()
        .route("/v2/top-headlines", get(top_headlines))
        .route(INSERT_PATH, post(insert_all))
        .route(
            "/computeMetadata/v1/instance/service-accounts/default/token",
            get(metadata_token),
        )
        .with_state(ctx);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock upstream");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock upstream");
    });

    Upstream {
        base: format!("http://{addr}"),
        seen,
    }
}

/// A base URL nothing listens on.
pub async fn dead_base() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}
