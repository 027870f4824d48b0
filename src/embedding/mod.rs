use crate::config::{Config, ConfigError, require};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

pub mod retry;

pub use retry::RetryPolicy;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider settings were incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with a non-success status code.
    #[error("Unexpected embedding response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider answered successfully but without an embedding.
    #[error("Embedding response contained no vectors")]
    EmptyResponse,
    /// Every attempt failed.
    #[error("Embedding failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Error returned by the final attempt.
        #[source]
        source: Box<EmbeddingClientError>,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce the embedding vector for one chunk of text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError>;
}

/// Connection settings for an Azure OpenAI embedding deployment.
#[derive(Debug, Clone)]
pub struct AzureOpenAiSettings {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    /// API key sent in the `api-key` header.
    pub api_key: String,
    /// Value of the `api-version` query parameter.
    pub api_version: String,
    /// Deployment name of the embedding model.
    pub deployment: String,
    /// Limit on one request, after which the attempt fails and is retried.
    pub timeout: Duration,
}

impl AzureOpenAiSettings {
    /// Extract embedding settings, failing on the first missing value.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: require(&config.embedding_key, "AZURE_OPENAI_EMBEDDING_KEY")?.to_string(),
            endpoint: require(&config.embedding_endpoint, "AZURE_OPENAI_EMBEDDING_ENDPOINT")?
                .to_string(),
            api_version: require(&config.embedding_api_version, "AZURE_OPENAI_API_VERSION")?
                .to_string(),
            deployment: require(
                &config.embedding_deployment,
                "AZURE_OPENAI_EMBEDDING_DEPLOYMENT",
            )?
            .to_string(),
            timeout: config.request_timeout,
        })
    }
}

/// Embedding client for Azure OpenAI deployments, one request per chunk.
pub struct AzureOpenAiClient {
    client: Client,
    settings: AzureOpenAiSettings,
    retry: RetryPolicy,
}

impl AzureOpenAiClient {
    /// Build a client with the default retry policy.
    pub fn new(settings: AzureOpenAiSettings) -> Result<Self, EmbeddingClientError> {
        let client = Client::builder()
            .user_agent("domain-index/0.1")
            .timeout(settings.timeout)
            .build()?;
        tracing::debug!(
            endpoint = %settings.endpoint,
            deployment = %settings.deployment,
            api_version = %settings.api_version,
            timeout_secs = settings.timeout.as_secs_f64(),
            "Initialized Azure OpenAI embedding client"
        );
        Ok(Self {
            client,
            settings,
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn embeddings_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/embeddings",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.deployment
        )
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let response = self
            .client
            .post(self.embeddings_url())
            .query(&[("api-version", self.settings.api_version.as_str())])
            .header("api-key", &self.settings.api_key)
            .json(&json!({ "input": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::UnexpectedStatus { status, body });
        }

        let payload: EmbeddingResponse = response.json().await?;
        payload
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or(EmbeddingClientError::EmptyResponse)
    }
}

#[async_trait]
impl EmbeddingClient for AzureOpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let vector = retry::with_retry(&self.retry, |attempt| {
            tracing::trace!(attempt, chars = text.len(), "Requesting embedding");
            self.request_embedding(text)
        })
        .await
        .map_err(|failure| {
            tracing::error!(
                attempts = failure.attempts,
                error = %failure.last_error,
                "Embedding request failed"
            );
            EmbeddingClientError::RetriesExhausted {
                attempts: failure.attempts,
                source: Box::new(failure.last_error),
            }
        })?;

        tracing::debug!(dimension = vector.len(), "Generated embedding");
        Ok(vector)
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

/// Build the embedding client described by the configuration.
///
/// Fails before any network traffic when a required setting is missing.
pub fn get_embedding_client(
    config: &Config,
) -> Result<Box<dyn EmbeddingClient>, EmbeddingClientError> {
    let settings = AzureOpenAiSettings::from_config(config)?;
    Ok(Box::new(AzureOpenAiClient::new(settings)?))
}
