use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("URL parsing failed: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("no history stored under {0}")]
    NoHistory(String),
    #[error("document store error: {0}")]
    Provider(String),
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// Remote document store speaking the Firebase Realtime Database REST
/// API: every node is addressable as `<base>/<path>.json`.
#[derive(Clone)]
pub struct FirebaseDbClient {
    http_client: HttpClient,
    base_url: String,
}

impl FirebaseDbClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn node_url(&self, path: &str) -> Result<Url, StoreError> {
        Ok(Url::parse(&format!("{}/{}.json", self.base_url, path))?)
    }

    /// Reads a node; an absent node comes back as JSON `null` and is
    /// returned as `None`.
    pub async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let response = self.http_client.get(self.node_url(path)?).send().await?;
        if !response.status().is_success() {
            return Err(StoreError::Provider(format!(
                "GET {path} returned {}",
                response.status()
            )));
        }
        let value: Value = serde_json::from_str(&response.text().await?)?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    pub async fn set(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        let response = self
            .http_client
            .put(self.node_url(path)?)
            .json(value)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StoreError::Provider(format!(
                "PUT {path} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Appends a child under `path` with a store-generated key and
    /// returns that key.
    pub async fn push(&self, path: &str, value: &Value) -> Result<String, StoreError> {
        let response = self
            .http_client
            .post(self.node_url(path)?)
            .json(value)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StoreError::Provider(format!(
                "POST {path} returned {}",
                response.status()
            )));
        }
        let pushed: PushResponse = serde_json::from_str(&response.text().await?)?;
        Ok(pushed.name)
    }
}
