//! One-shot invocation for cron-style triggers: runs the pipeline from the
//! environment, prints the JSON response, exits non-zero on failure.

use chrono::Utc;
use headline_sentiment_pipeline::{invoke, InvocationResponse};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    headline_sentiment_pipeline::init_tracing();

    let started_at = Utc::now();
    let outcome = invoke(|k| std::env::var(k).ok(), started_at).await;

    let payload = serde_json::to_string_pretty(&InvocationResponse::from(&outcome))?;
    println!("{payload}");

    if let Err(f) = outcome {
        // 2 = fix the deployment, 1 = let the next tick retry
        let code = if f.error.is_transient() { 1 } else { 2 };
        std::process::exit(code);
    }
    Ok(())
}
