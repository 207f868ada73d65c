use super::queries::{self, BulkResponse, SearchResponse};
use super::DocumentStore;
use crate::config::StoreConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Elasticsearch REST 客户端 (API Key 认证)
pub struct ElasticClient {
    http: Client,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl ElasticClient {
    pub fn new(config: &StoreConfig) -> AppResult<Self> {
        let mut auth = HeaderValue::from_str(&format!("ApiKey {}", config.api_key))
            .map_err(|_| AppError::invalid_config("ELASTIC_API_KEY contains characters not allowed in a header"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url()?,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// 发送请求, 按指数退避重试。
    ///
    /// 幂等请求在连接失败 / 超时 / 429 / 5xx 时重试; 非幂等请求 (`_bulk`)
    /// 只在服务端确定未处理时重试 (连接失败 / 429), 超时和 5xx 可能已部分写入。
    async fn send<F>(&self, op: &str, idempotent: bool, build: F) -> AppResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            let result = build().send().await;
            let retryable = match &result {
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => true,
                Ok(resp) => idempotent && resp.status().is_server_error(),
                Err(e) => e.is_connect() || (idempotent && e.is_timeout()),
            };

            if !retryable || attempt >= self.max_retries {
                return result.map_err(AppError::from);
            }

            attempt += 1;
            let delay = self.retry_backoff.saturating_mul(1 << (attempt - 1).min(16));
            match &result {
                Ok(resp) => tracing::warn!(
                    "{} returned {}, retry {}/{} in {:?}",
                    op, resp.status(), attempt, self.max_retries, delay
                ),
                Err(e) => tracing::warn!(
                    "{} failed: {}, retry {}/{} in {:?}",
                    op, e, attempt, self.max_retries, delay
                ),
            }
            tokio::time::sleep(delay).await;
        }
    }
}

/// 非 2xx 转为 Store 错误
async fn check(resp: Response) -> AppResult<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    Err(store_error(resp).await)
}

async fn store_error(resp: Response) -> AppError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    AppError::Store { status, body }
}

#[async_trait]
impl DocumentStore for ElasticClient {
    async fn ensure_index(&self, index: &str, mapping: &Value) -> AppResult<bool> {
        let resp = self.send("index exists", true, || self.http.head(self.url(index))).await?;
        match resp.status() {
            s if s.is_success() => {
                tracing::info!("Index '{}' already exists", index);
                return Ok(false);
            }
            StatusCode::NOT_FOUND => {}
            _ => return Err(store_error(resp).await),
        }

        let resp = self
            .send("create index", true, || self.http.put(self.url(index)).json(mapping))
            .await?;
        if resp.status().is_success() {
            tracing::info!("Created index '{}'", index);
            return Ok(true);
        }

        // 并发创建时另一方已建好, 视为成功
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        let already_exists = serde_json::from_str::<Value>(&body)
            .ok()
            .map(|v| queries::error_type(&v) == Some("resource_already_exists_exception"))
            .unwrap_or(false);
        if already_exists {
            tracing::info!("Index '{}' was created concurrently", index);
            return Ok(false);
        }
        Err(AppError::Store { status, body })
    }

    async fn bulk_index(&self, index: &str, docs: &[Value]) -> AppResult<usize> {
        if docs.is_empty() {
            return Ok(0);
        }

        let body = queries::bulk_body(index, docs)?;
        tracing::debug!("Bulk request: {} docs, {} bytes", docs.len(), body.len());
        let start = std::time::Instant::now();

        let resp = self
            .send("bulk", false, || {
                self.http
                    .post(self.url("_bulk"))
                    .header(CONTENT_TYPE, "application/x-ndjson")
                    .body(body.clone())
            })
            .await?;
        let parsed: BulkResponse = check(resp).await?.json().await?;
        let written = parsed.into_written(docs.len())?;

        tracing::debug!("Bulk wrote {} docs in {:?}", written, start.elapsed());
        Ok(written)
    }

    async fn search_all(&self, index: &str, size: usize, fields: &[&str]) -> AppResult<Vec<Value>> {
        let body = queries::search_body(size, fields);
        let path = format!("{}/_search", index);

        let resp = self
            .send("search", true, || self.http.post(self.url(&path)).json(&body))
            .await?;
        let parsed: SearchResponse = check(resp).await?.json().await?;
        let sources = parsed.into_sources();

        tracing::debug!("Search on '{}' returned {} hits", index, sources.len());
        Ok(sources)
    }
}
