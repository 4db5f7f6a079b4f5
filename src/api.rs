// ABOUTME: Async HTTP client for the Notion API
// ABOUTME: Handles auth headers, pagination, rate-limit retries, and block tree fetch

use crate::model::{Block, Database, Page, RawBlock};
use crate::{Error, Result};
use log::{debug, warn};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.len() <= max_chars {
        return s.to_string();
    }

    // Find a valid UTF-8 boundary at or before max_chars
    let mut boundary = max_chars;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }

    if boundary == 0 {
        return String::new();
    }

    format!("{}...", &s[..boundary])
}

/// Paginated list envelope shared by query, search, and block children.
#[derive(Debug, serde::Deserialize)]
struct ListResponse {
    #[serde(default)]
    results: Vec<serde_json::Value>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    max_retries: u32,
    initial_backoff: Duration,
}

impl ApiClient {
    pub fn new(token: String, base_url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(ApiClient {
            client,
            base_url: base_url.unwrap_or_else(|| "https://api.notion.com/v1".into()),
            token,
            max_retries: MAX_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Override the rate-limit retry budget and backoff base (tests use
    /// millisecond backoffs).
    pub fn with_retry_policy(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff = initial_backoff;
        self
    }

    /// Retry rate-limited calls with exponential backoff (1s, 2s, 4s by
    /// default); budget exhausted → `Error::RateLimited`. Any other API
    /// error fails immediately; unclassified errors propagate unchanged.
    async fn with_retry<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_rate_limit() => {
                    if attempt >= self.max_retries {
                        return Err(Error::RateLimited);
                    }
                    let backoff = self.initial_backoff * 2u32.pow(attempt);
                    warn!(
                        "Rate limited. Retrying in {}ms... ({}/{})",
                        backoff.as_millis(),
                        attempt + 1,
                        self.max_retries
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await?;
        self.parse_response(endpoint, response).await
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", NOTION_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;
        self.parse_response(endpoint, response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: truncate_str(&message, 200),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            debug!(
                "Failed to parse response from {}: {} (body: {})",
                endpoint,
                e,
                truncate_str(&body, 500)
            );
            Error::Parse(e)
        })
    }

    /// Query a database, fully paginated, optionally filtered server-side
    /// to pages edited after the given timestamp.
    pub async fn query_database(
        &self,
        database_id: &str,
        edited_after: Option<&str>,
    ) -> Result<Vec<Page>> {
        let endpoint = format!("/databases/{}/query", database_id);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "page_size": PAGE_SIZE });
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }
            if let Some(after) = edited_after {
                body["filter"] = json!({
                    "timestamp": "last_edited_time",
                    "last_edited_time": { "after": after }
                });
            }

            let response: ListResponse =
                self.with_retry(|| self.post(&endpoint, body.clone())).await?;

            for result in response.results {
                let is_page =
                    result.get("object").and_then(|v| v.as_str()) == Some("page");
                if is_page {
                    pages.push(serde_json::from_value::<Page>(result)?);
                }
            }

            if !response.has_more {
                break;
            }
            match response.next_cursor {
                Some(next) => {
                    debug!("Fetched {} pages so far...", pages.len());
                    cursor = Some(next);
                }
                None => break,
            }
        }

        Ok(pages)
    }

    pub async fn get_page(&self, page_id: &str) -> Result<Page> {
        let endpoint = format!("/pages/{}", page_id);
        self.with_retry(|| self.get(&endpoint)).await
    }

    /// Global search, filtered to databases the integration can see.
    pub async fn list_databases(&self) -> Result<Vec<Database>> {
        let mut databases = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({
                "filter": { "property": "object", "value": "database" },
                "page_size": PAGE_SIZE
            });
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }

            let response: ListResponse =
                self.with_retry(|| self.post("/search", body.clone())).await?;

            for result in response.results {
                let is_database =
                    result.get("object").and_then(|v| v.as_str()) == Some("database");
                if is_database {
                    databases.push(serde_json::from_value::<Database>(result)?);
                }
            }

            if !response.has_more {
                break;
            }
            match response.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(databases)
    }

    /// Fetch a block's children, fully paginated and fully recursive. The
    /// tree is built bottom-up: a node's children are fetched before the
    /// node itself is constructed, so every returned `Block` is complete.
    pub fn fetch_block_tree<'a>(
        &'a self,
        block_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Block>>> + 'a>> {
        Box::pin(async move {
            let mut blocks = Vec::new();
            let mut cursor: Option<String> = None;

            loop {
                let endpoint = match &cursor {
                    Some(c) => format!(
                        "/blocks/{}/children?page_size={}&start_cursor={}",
                        block_id, PAGE_SIZE, c
                    ),
                    None => format!("/blocks/{}/children?page_size={}", block_id, PAGE_SIZE),
                };

                let response: ListResponse =
                    self.with_retry(|| self.get(&endpoint)).await?;

                for result in response.results {
                    let raw: RawBlock = match serde_json::from_value(result) {
                        Ok(raw) => raw,
                        Err(e) => {
                            debug!("Skipping unparseable block under {}: {}", block_id, e);
                            continue;
                        }
                    };

                    let children = if raw.has_children {
                        self.fetch_block_tree(&raw.id).await?
                    } else {
                        Vec::new()
                    };

                    blocks.push(Block {
                        id: raw.id,
                        kind: raw.kind,
                        children,
                    });
                }

                if !response.has_more {
                    break;
                }
                match response.next_cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }

            Ok(blocks)
        })
    }
}
