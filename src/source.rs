use crate::model::ShiftPayload;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Champ enveloppant les lignes dans la réponse de l'API.
pub const DEFAULT_PAYLOAD_FIELD: &str = "turnos";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid endpoint {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Fournisseur du lot courant de turnos.
#[async_trait]
pub trait ShiftSource: Send + Sync {
    async fn fetch(&self) -> Result<ShiftPayload, FetchError>;
}

/// GET JSON sans cache sur l'endpoint des turnos.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: String,
    field: String,
}

impl HttpSource {
    pub fn new<U: Into<String>>(url: U) -> Result<Self, FetchError> {
        Self::with_options(url, DEFAULT_PAYLOAD_FIELD, None)
    }

    pub fn with_options<U: Into<String>, F: Into<String>>(
        url: U,
        field: F,
        timeout: Option<Duration>,
    ) -> Result<Self, FetchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            url: url.into(),
            field: field.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ShiftSource for HttpSource {
    async fn fetch(&self) -> Result<ShiftPayload, FetchError> {
        let res = self
            .client
            .get(&self.url)
            .query(&[("t", Utc::now().timestamp_millis())])
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body: Value = res.json().await?;
        Ok(ShiftPayload::resolve(body, &self.field))
    }
}

/// Relit un fichier JSON à chaque appel (usage hors ligne).
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    field: String,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_field(path, DEFAULT_PAYLOAD_FIELD)
    }

    pub fn with_field<P: AsRef<Path>, F: Into<String>>(path: P, field: F) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            field: field.into(),
        }
    }
}

#[async_trait]
impl ShiftSource for FileSource {
    async fn fetch(&self) -> Result<ShiftPayload, FetchError> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|source| FetchError::Io {
                path: self.path.clone(),
                source,
            })?;
        let body: Value = serde_json::from_slice(&data)?;
        Ok(ShiftPayload::resolve(body, &self.field))
    }
}
