//! Dataset retrieval.
//!
//! This module fetches the agricultural dataset from an HTTP(S) URL or a
//! local file and decodes it into raw records.

use crate::models::RawRecord;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::StatusCode;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Longest slice of an error response body kept in [`RetrievalError::Status`].
const MAX_ERROR_BODY: usize = 200;

/// Failure to obtain or decode the dataset.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} timed out after {timeout_seconds}s")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("Cannot connect to {url}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin} is not a JSON array of records: {source}")]
    Decode {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RetrievalError {
    /// Whether another attempt could succeed.
    ///
    /// Transport failures and 5xx/429 responses are retryable; client errors,
    /// file errors and malformed documents are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            RetrievalError::Timeout { .. }
            | RetrievalError::Connect { .. }
            | RetrievalError::Http { .. } => true,
            RetrievalError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            RetrievalError::Client(_)
            | RetrievalError::Io { .. }
            | RetrievalError::Decode { .. } => false,
        }
    }
}

/// Where the dataset lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    /// An `http://` or `https://` URL.
    Url(String),
    /// A path on the local filesystem.
    File(PathBuf),
}

impl RecordSource {
    /// Interpret a location string: http(s) URLs are fetched, anything else
    /// is read as a file path.
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            RecordSource::Url(location.to_string())
        } else {
            RecordSource::File(PathBuf::from(location))
        }
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordSource::Url(url) => write!(f, "{}", url),
            RecordSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Options for loading the dataset.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// HTTP request timeout.
    pub timeout_seconds: u64,
    /// Extra attempts after a retryable URL failure.
    pub retries: u32,
    /// Pause between attempts.
    pub retry_delay_ms: u64,
    /// Whether to honour proxy settings from the environment.
    pub use_proxy: bool,
    /// Whether to show a spinner while downloading.
    pub show_progress: bool,
}

impl From<&crate::config::SourceConfig> for LoadOptions {
    fn from(config: &crate::config::SourceConfig) -> Self {
        Self {
            timeout_seconds: config.timeout_seconds,
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
            use_proxy: config.use_proxy,
            show_progress: true,
        }
    }
}

/// Loads raw records from a [`RecordSource`].
pub struct RecordLoader {
    options: LoadOptions,
    http_client: reqwest::Client,
}

impl RecordLoader {
    /// Create a loader with its own HTTP client.
    pub fn new(options: LoadOptions) -> Result<Self, RetrievalError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .user_agent(concat!("cropstats/", env!("CARGO_PKG_VERSION")));
        if !options.use_proxy {
            builder = builder.no_proxy();
        }
        let http_client = builder.build().map_err(RetrievalError::Client)?;

        Ok(Self {
            options,
            http_client,
        })
    }

    /// Load every record from the source.
    pub async fn load(&self, source: &RecordSource) -> Result<Vec<RawRecord>, RetrievalError> {
        info!("Loading records from {}", source);

        let records = match source {
            RecordSource::Url(url) => self.fetch_with_retries(url).await?,
            RecordSource::File(path) => read_file(path).await?,
        };

        info!("Loaded {} records", records.len());
        Ok(records)
    }

    async fn fetch_with_retries(&self, url: &str) -> Result<Vec<RawRecord>, RetrievalError> {
        let mut attempt = 0;

        loop {
            match self.fetch(url).await {
                Ok(records) => return Ok(records),
                Err(e) if e.is_retryable() && attempt < self.options.retries => {
                    attempt += 1;
                    warn!(
                        "Attempt {}/{} failed: {}. Retrying in {}ms",
                        attempt,
                        self.options.retries + 1,
                        e,
                        self.options.retry_delay_ms
                    );
                    tokio::time::sleep(Duration::from_millis(self.options.retry_delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<RawRecord>, RetrievalError> {
        let spinner = self.spinner(url);

        let result = self.fetch_body(url).await;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let body = result?;
        debug!("Downloaded {} bytes from {}", body.len(), url);
        decode(&body, url)
    }

    async fn fetch_body(&self, url: &str) -> Result<String, RetrievalError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let mut body = response.text().await.unwrap_or_default();
            truncate_at_char_boundary(&mut body, MAX_ERROR_BODY);
            return Err(RetrievalError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        response
            .text()
            .await
            .map_err(|e| self.transport_error(url, e))
    }

    fn transport_error(&self, url: &str, source: reqwest::Error) -> RetrievalError {
        let url = url.to_string();
        if source.is_timeout() {
            RetrievalError::Timeout {
                url,
                timeout_seconds: self.options.timeout_seconds,
            }
        } else if source.is_connect() {
            RetrievalError::Connect { url, source }
        } else {
            RetrievalError::Http { url, source }
        }
    }

    fn spinner(&self, url: &str) -> Option<ProgressBar> {
        if !self.options.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(format!("Downloading {}", url));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

async fn read_file(path: &Path) -> Result<Vec<RawRecord>, RetrievalError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| RetrievalError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    debug!("Read {} bytes from {}", content.len(), path.display());
    decode(&content, &path.display().to_string())
}

/// Decode a JSON document into raw records.
pub fn decode(document: &str, origin: &str) -> Result<Vec<RawRecord>, RetrievalError> {
    serde_json::from_str(document).map_err(|source| RetrievalError::Decode {
        origin: origin.to_string(),
        source,
    })
}

fn truncate_at_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}
