// src/warehouse/auth.rs
//! Bearer token for the warehouse API: either configured up front or fetched
//! from the GCE metadata server of the runtime the pipeline is deployed on.

use reqwest::Client;
use serde::Deserialize;

use crate::error::{PipelineError, Result};

#[derive(Clone)]
pub enum TokenSource {
    Static(String),
    Metadata { client: Client, host: String },
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

impl TokenSource {
    pub fn from_config(client: Client, token: Option<String>, metadata_host: &str) -> Self {
        match token {
            Some(t) => TokenSource::Static(t),
            None => TokenSource::Metadata {
                client,
                host: metadata_host.to_string(),
            },
        }
    }

    pub async fn token(&self) -> Result<String> {
        match self {
            TokenSource::Static(t) => Ok(t.clone()),
            TokenSource::Metadata { client, host } => {
                let url = format!(
                    "{}/computeMetadata/v1/instance/service-accounts/default/token",
                    metadata_base(host)
                );
                let rsp = client
                    .get(&url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .map_err(|e| {
                        PipelineError::WriteFailed(format!("metadata token request failed: {e}"))
                    })?;
                if let Err(e) = rsp.error_for_status_ref() {
                    return Err(PipelineError::WriteFailed(format!(
                        "metadata token HTTP error: {e}"
                    )));
                }
                let tok: MetadataToken = rsp.json().await.map_err(|e| {
                    PipelineError::WriteFailed(format!("metadata token undecodable: {e}"))
                })?;
                Ok(tok.access_token)
            }
        }
    }
}

fn metadata_base(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
