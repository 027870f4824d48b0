//! HTTP client wrapper for Azure AI Search.

use crate::config::{Config, require};
use crate::document::Document;
use crate::indexer::SearchBackend;
use crate::indexer::types::{DocumentFailure, IndexerError, IndexingResponse};
use crate::schema::IndexSchema;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use std::time::Duration;

/// Lightweight REST client for Azure AI Search index management and document upload.
pub struct AzureSearchBackend {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) api_version: String,
}

impl AzureSearchBackend {
    /// Construct a client for the given service endpoint; every request fails after `timeout`.
    pub fn new(
        endpoint: &str,
        api_key: &str,
        api_version: &str,
        timeout: Duration,
    ) -> Result<Self, IndexerError> {
        let client = Client::builder()
            .user_agent("domain-index/0.1")
            .timeout(timeout)
            .build()?;
        let base_url = normalize_base_url(endpoint).map_err(IndexerError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            api_version,
            timeout_secs = timeout.as_secs_f64(),
            has_api_key = !api_key.is_empty(),
            "Initialized Azure Search HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            api_version: api_version.to_string(),
        })
    }

    /// Construct a client from `AZURE_SEARCH_*` settings.
    pub fn from_config(config: &Config) -> Result<Self, IndexerError> {
        let endpoint = require(&config.search_endpoint, "AZURE_SEARCH_ENDPOINT")?;
        let api_key = require(&config.search_key, "AZURE_SEARCH_KEY")?;
        Self::new(
            endpoint,
            api_key,
            &config.search_api_version,
            config.request_timeout,
        )
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        self.client
            .request(method, url)
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), IndexerError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = IndexerError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Azure Search request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl SearchBackend for AzureSearchBackend {
    async fn index_exists(&self, index_name: &str) -> Result<bool, IndexerError> {
        let response = self
            .request(Method::GET, &format!("indexes/{index_name}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = IndexerError::UnexpectedStatus { status, body };
                tracing::error!(index = index_name, error = %error, "Index existence check failed");
                Err(error)
            }
        }
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<(), IndexerError> {
        let response = self
            .request(Method::POST, "indexes")
            .json(schema)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(index = %schema.name, "Index created");
        })
        .await
    }

    async fn upload_documents(
        &self,
        index_name: &str,
        documents: &[Document],
    ) -> Result<(), IndexerError> {
        let actions: Vec<UploadAction<'_>> = documents
            .iter()
            .map(|document| UploadAction {
                action: "upload",
                document,
            })
            .collect();

        let response = self
            .request(Method::POST, &format!("indexes/{index_name}/docs/index"))
            .json(&UploadBody { value: actions })
            .send()
            .await?;

        if response.status() == StatusCode::MULTI_STATUS {
            let payload: IndexingResponse = response.json().await?;
            let failures: Vec<DocumentFailure> = payload
                .value
                .into_iter()
                .filter(|result| !result.status)
                .map(|result| DocumentFailure {
                    key: result.key,
                    error_message: result.error_message,
                })
                .collect();
            if !failures.is_empty() {
                let error = IndexerError::Rejected { failures };
                tracing::error!(index = index_name, error = %error, "Documents rejected");
                return Err(error);
            }
            return Ok(());
        }

        self.ensure_success(response, || {
            tracing::debug!(
                index = index_name,
                documents = documents.len(),
                "Documents uploaded"
            );
        })
        .await
    }
}

#[derive(Serialize)]
struct UploadBody<'a> {
    value: Vec<UploadAction<'a>>,
}

#[derive(Serialize)]
struct UploadAction<'a> {
    #[serde(rename = "@search.action")]
    action: &'static str,
    #[serde(flatten)]
    document: &'a Document,
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
