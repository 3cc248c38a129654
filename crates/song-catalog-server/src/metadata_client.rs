//! Client for the external song metadata provider.
//!
//! Enrichment is a single `GET {base}/info?group=..&song=..` lookup; no
//! retries and no caching.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use song_catalog_types::SongDetail;

const ERROR_SNIPPET_CHARS: usize = 300;

/// Source of enrichment data for newly created songs.
#[async_trait]
pub trait SongDetailsProvider: Send + Sync {
    async fn fetch_details(&self, group: &str, song: &str) -> Result<SongDetail>;
}

pub struct MetadataClient {
    base_url: String,
    http: reqwest::Client,
}

impl MetadataClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("song-catalog-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build metadata http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn info_url(&self, group: &str, song: &str) -> String {
        format!(
            "{}/info?group={}&song={}",
            self.base_url,
            urlencoding::encode(group),
            urlencoding::encode(song)
        )
    }
}

#[async_trait]
impl SongDetailsProvider for MetadataClient {
    async fn fetch_details(&self, group: &str, song: &str) -> Result<SongDetail> {
        let url = self.info_url(group, song);
        let resp = match self.http.get(&url).send().await {
            Ok(resp) => resp,
            Err(err) if err.is_timeout() => {
                bail!("metadata request timed out url={url}");
            }
            Err(err) => {
                bail!("metadata request failed (transport) url={url}: {err}");
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let trimmed = body.trim();
            if trimmed.is_empty() {
                bail!("metadata request failed (status {status}) url={url}");
            }
            let snippet: String = trimmed.chars().take(ERROR_SNIPPET_CHARS).collect();
            let suffix = if trimmed.chars().count() > ERROR_SNIPPET_CHARS {
                "..."
            } else {
                ""
            };
            bail!("metadata request failed (status {status}) url={url}: {snippet}{suffix}");
        }

        resp.json::<SongDetail>()
            .await
            .with_context(|| format!("metadata response parse failed url={url}"))
    }
}
