// Shared remote document access over HTTP

use crate::config::RemoteConfig;
use async_trait::async_trait;
use eyre::{Context, Result, eyre};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// The whole multi-collection document: collection key -> array of records
pub type Document = Map<String, Value>;

/// Header carrying the access credential
pub const MASTER_KEY_HEADER: &str = "x-master-key";

/// Reads and replaces the shared remote document as a whole
#[async_trait]
pub trait DocumentTransport: Send + Sync {
    /// Fetch the current full document
    async fn fetch(&self) -> Result<Document>;

    /// Replace the full document
    async fn store(&self, document: &Document) -> Result<()>;
}

/// Envelope returned by the read endpoint
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    record: Value,
}

/// Transport headers for the given credentials; no I/O
pub fn get_headers(config: &RemoteConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let key = HeaderValue::from_str(&config.api_key).context("API key is not a valid header value")?;
    headers.insert(HeaderName::from_static(MASTER_KEY_HEADER), key);

    Ok(headers)
}

pub struct HttpTransport {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl HttpTransport {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl DocumentTransport for HttpTransport {
    async fn fetch(&self) -> Result<Document> {
        let url = self.config.read_url();
        debug!(%url, "Fetching remote document");

        let response = self
            .client
            .get(&url)
            .headers(get_headers(&self.config)?)
            .send()
            .await
            .context("Failed to fetch remote document")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!("Document read returned status {}: {}", status, body));
        }

        let envelope: Envelope = response
            .json()
            .await
            .context("Failed to parse remote document envelope")?;

        match envelope.record {
            Value::Object(document) => Ok(document),
            Value::Null => Ok(Document::new()),
            other => Err(eyre!("Remote document is not an object: {}", other)),
        }
    }

    async fn store(&self, document: &Document) -> Result<()> {
        let url = self.config.write_url();
        debug!(%url, keys = document.len(), "Storing remote document");

        let response = self
            .client
            .put(&url)
            .headers(get_headers(&self.config)?)
            .json(document)
            .send()
            .await
            .context("Failed to store remote document")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!("Document write returned status {}: {}", status, body));
        }

        Ok(())
    }
}
