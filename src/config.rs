use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::chunking::{ChunkUnit, ChunkingOptions};

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// `VECTOR_BACKEND` named a backend this build does not implement.
    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),
}

/// Runtime configuration for the ingestion pipelines.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Search backend that receives the indexed documents.
    pub vector_backend: VectorBackend,
    /// Base URL of the Azure AI Search service.
    pub search_endpoint: Option<String>,
    /// Admin key for the Azure AI Search service.
    pub search_key: Option<String>,
    /// REST API version used for Azure AI Search calls.
    pub search_api_version: String,
    /// Azure OpenAI key used for embedding requests.
    pub embedding_key: Option<String>,
    /// Azure OpenAI resource endpoint used for embedding requests.
    pub embedding_endpoint: Option<String>,
    /// Azure OpenAI API version used for embedding requests.
    pub embedding_api_version: Option<String>,
    /// Azure OpenAI deployment name of the embedding model.
    pub embedding_deployment: Option<String>,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Maximum number of embedding requests in flight at once.
    pub embedding_concurrency: usize,
    /// Index receiving domain summaries.
    pub domain_index_name: String,
    /// Index receiving API documentation chunks.
    pub api_docs_index_name: String,
    /// Index receiving event records.
    pub events_index_name: String,
    /// Index receiving line-of-business records.
    pub lob_index_name: String,
    /// Folder under `lob_samples/` holding line-of-business records.
    pub lob_folder_name: String,
    /// Platform folders scanned for API docs and specs.
    pub api_docs_platforms: Vec<String>,
    /// Root directory of the source data layout.
    pub data_dir: PathBuf,
    /// Maximum chunk length.
    pub text_splitter_chunk_size: usize,
    /// Overlap carried between consecutive chunks.
    pub text_splitter_chunk_overlap: usize,
    /// Unit used to measure chunk length.
    pub text_splitter_unit: ChunkUnit,
    /// Optional override for every pipeline's upload batch size.
    pub upload_batch_size: Option<usize>,
    /// Per-request timeout applied to the search and embedding clients.
    pub request_timeout: Duration,
}

/// Supported search backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Azure AI Search (formerly Cognitive Search).
    Azure,
}

const DEFAULT_SEARCH_API_VERSION: &str = "2024-07-01";
const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_REQUEST_TIMEOUT_SECS: usize = 60;
const DEFAULT_PLATFORMS: [&str; 4] = ["catalyst_center", "cisco_spaces", "meraki", "webex"];

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as absent so that an empty line in `.env` falls back to the
    /// default instead of failing to parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let vector_backend = get_or("VECTOR_BACKEND", "azure").parse()?;

        let api_docs_platforms = get("API_DOCS_PLATFORMS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|platform| !platform.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| DEFAULT_PLATFORMS.iter().map(|p| p.to_string()).collect());

        let text_splitter_unit = match get("TEXT_SPLITTER_UNIT") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("TEXT_SPLITTER_UNIT".into()))?,
            None => ChunkUnit::Characters,
        };

        let embedding_concurrency =
            parse_or(get("EMBEDDING_CONCURRENCY"), "EMBEDDING_CONCURRENCY", 1)?;
        if embedding_concurrency == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_CONCURRENCY".into()));
        }

        let embedding_dimension = parse_or(
            get("EMBEDDING_DIMENSION"),
            "EMBEDDING_DIMENSION",
            DEFAULT_EMBEDDING_DIMENSION,
        )?;
        if embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }

        let timeout_secs = parse_or(
            get("REQUEST_TIMEOUT_SECS"),
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("REQUEST_TIMEOUT_SECS".into()));
        }

        Ok(Self {
            vector_backend,
            search_endpoint: get("AZURE_SEARCH_ENDPOINT"),
            search_key: get("AZURE_SEARCH_KEY"),
            search_api_version: get_or("AZURE_SEARCH_API_VERSION", DEFAULT_SEARCH_API_VERSION),
            embedding_key: get("AZURE_OPENAI_EMBEDDING_KEY"),
            embedding_endpoint: get("AZURE_OPENAI_EMBEDDING_ENDPOINT"),
            embedding_api_version: get("AZURE_OPENAI_API_VERSION"),
            embedding_deployment: get("AZURE_OPENAI_EMBEDDING_DEPLOYMENT"),
            embedding_dimension,
            embedding_concurrency,
            domain_index_name: get_or("AZURE_SEARCH_DOMAIN_INDEX", "domain-summaries-index"),
            api_docs_index_name: get_or("API_DOCS_INDEX_NAME", "api-docs-index"),
            events_index_name: get_or("AZURE_SEARCH_EVENTS_INDEX", "events-index"),
            lob_index_name: get_or("LOB_INDEX_NAME", "lob-healthcare"),
            lob_folder_name: get_or("LOB_INDEX_FOLDER_NAME", "healthcare"),
            api_docs_platforms,
            data_dir: PathBuf::from(get_or("DATA_DIR", ".")),
            text_splitter_chunk_size: parse_or(
                get("TEXT_SPLITTER_CHUNK_SIZE"),
                "TEXT_SPLITTER_CHUNK_SIZE",
                DEFAULT_CHUNK_SIZE,
            )?,
            text_splitter_chunk_overlap: parse_or(
                get("TEXT_SPLITTER_CHUNK_OVERLAP"),
                "TEXT_SPLITTER_CHUNK_OVERLAP",
                DEFAULT_CHUNK_OVERLAP,
            )?,
            text_splitter_unit,
            upload_batch_size: get("UPLOAD_BATCH_SIZE")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("UPLOAD_BATCH_SIZE".into()))
                })
                .transpose()?,
            request_timeout: Duration::from_secs(timeout_secs as u64),
        })
    }

    /// Emit the loaded settings at debug level. Secrets are reported only as present or absent.
    pub fn log_summary(&self) {
        tracing::debug!(
            backend = ?self.vector_backend,
            search_endpoint = ?self.search_endpoint,
            has_search_key = self.search_key.is_some(),
            embedding_deployment = ?self.embedding_deployment,
            has_embedding_key = self.embedding_key.is_some(),
            dimension = self.embedding_dimension,
            concurrency = self.embedding_concurrency,
            timeout_secs = self.request_timeout.as_secs(),
            data_dir = %self.data_dir.display(),
            "Loaded configuration"
        );
    }

    /// Chunking options derived from the `TEXT_SPLITTER_*` settings.
    pub fn chunking_options(&self) -> ChunkingOptions {
        ChunkingOptions {
            chunk_size: self.text_splitter_chunk_size,
            chunk_overlap: self.text_splitter_chunk_overlap,
            unit: self.text_splitter_unit,
        }
    }
}

/// Return the value of a required setting or a [`ConfigError::MissingVariable`] naming it.
pub(crate) fn require<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn parse_or(value: Option<String>, key: &str, default: usize) -> Result<usize, ConfigError> {
    value
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|parsed| parsed.unwrap_or(default))
}

impl std::str::FromStr for VectorBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            other => Err(ConfigError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment (and `.env`) and install it in the global cache.
///
/// Runs before tracing is installed, so nothing is logged here; call [`Config::log_summary`]
/// once the subscriber is up.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    Ok(CONFIG.get_or_init(|| config))
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_layout() {
        let config = Config::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.vector_backend, VectorBackend::Azure);
        assert_eq!(config.search_api_version, "2024-07-01");
        assert_eq!(config.embedding_dimension, 1536);
        assert_eq!(config.domain_index_name, "domain-summaries-index");
        assert_eq!(config.api_docs_index_name, "api-docs-index");
        assert_eq!(config.events_index_name, "events-index");
        assert_eq!(config.lob_index_name, "lob-healthcare");
        assert_eq!(config.lob_folder_name, "healthcare");
        assert_eq!(config.api_docs_platforms.len(), 4);
        assert_eq!(config.text_splitter_chunk_size, 1000);
        assert_eq!(config.text_splitter_chunk_overlap, 200);
        assert_eq!(config.text_splitter_unit, ChunkUnit::Characters);
        assert_eq!(config.embedding_concurrency, 1);
        assert!(config.upload_batch_size.is_none());
        assert!(config.search_key.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn rejects_unknown_backend() {
        let error = Config::from_lookup(lookup(&[("VECTOR_BACKEND", "chroma")])).unwrap_err();
        assert!(matches!(error, ConfigError::UnsupportedBackend(name) if name == "chroma"));
    }

    #[test]
    fn rejects_unparsable_numbers() {
        let error =
            Config::from_lookup(lookup(&[("TEXT_SPLITTER_CHUNK_SIZE", "lots")])).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "TEXT_SPLITTER_CHUNK_SIZE"));

        let error = Config::from_lookup(lookup(&[("EMBEDDING_CONCURRENCY", "0")])).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn rejects_zero_dimension_and_timeout() {
        let error = Config::from_lookup(lookup(&[("EMBEDDING_DIMENSION", "0")])).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "EMBEDDING_DIMENSION"));

        let error = Config::from_lookup(lookup(&[("REQUEST_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "REQUEST_TIMEOUT_SECS"));

        let config =
            Config::from_lookup(lookup(&[("REQUEST_TIMEOUT_SECS", "5")])).expect("config");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn summary_is_logged_without_secrets() {
        use std::io::Write;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl Write for Captured {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let config = Config::from_lookup(lookup(&[
            ("AZURE_SEARCH_KEY", "super-secret"),
            ("EMBEDDING_DIMENSION", "8"),
        ]))
        .expect("config");

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || config.log_summary());

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).expect("utf8");
        assert!(output.contains("Loaded configuration"));
        assert!(output.contains("dimension=8"));
        assert!(output.contains("has_search_key=true"));
        assert!(!output.contains("super-secret"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("LOB_INDEX_NAME", "   "),
            ("API_DOCS_PLATFORMS", "meraki, webex ,"),
            ("TEXT_SPLITTER_UNIT", "tokens"),
            ("UPLOAD_BATCH_SIZE", "50"),
        ]))
        .expect("config");
        assert_eq!(config.lob_index_name, "lob-healthcare");
        assert_eq!(config.api_docs_platforms, vec!["meraki", "webex"]);
        assert_eq!(config.text_splitter_unit, ChunkUnit::Tokens);
        assert_eq!(config.upload_batch_size, Some(50));
    }

    #[test]
    fn require_names_the_missing_key() {
        let error = require(&None, "AZURE_SEARCH_KEY").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Missing environment variable: AZURE_SEARCH_KEY"
        );
    }
}
