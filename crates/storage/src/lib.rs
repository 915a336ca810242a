//! Bucket client for the TST issue tracker
//!
//! Puts screenshots into one Supabase Storage bucket and hands back the
//! public URL the dashboard links to. Objects are never overwritten.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Cache lifetime sent with every object, in seconds
pub const DEFAULT_CACHE_SECONDS: u32 = 3600;

#[derive(Error, Debug)]
pub enum StorageError {
    /// The bucket answered with a non-success status
    #[error("bucket rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid object: {0}")]
    InvalidObject(String),
}

impl StorageError {
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// One object to put into the bucket
#[derive(Debug, Clone)]
pub struct ObjectUpload {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
    pub cache_seconds: u32,
}

impl ObjectUpload {
    pub fn new(name: &str, content_type: &str, data: Bytes) -> Self {
        Self {
            name: name.to_string(),
            content_type: content_type.to_string(),
            data,
            cache_seconds: DEFAULT_CACHE_SECONDS,
        }
    }

    fn check(&self) -> Result<()> {
        if self.data.is_empty() {
            return Err(StorageError::InvalidObject(format!("{} is empty", self.name)));
        }
        let bad_name = self.name.is_empty()
            || self.name.starts_with('/')
            || self.name.split('/').any(|segment| segment == "..");
        if bad_name {
            return Err(StorageError::InvalidObject(format!(
                "bad object name: {:?}",
                self.name
            )));
        }
        Ok(())
    }
}

/// Where the bucket stored an object
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StoredObject {
    #[serde(rename = "Key")]
    pub key: String,
}

#[derive(Deserialize)]
struct RejectionBody {
    message: Option<String>,
    error: Option<String>,
}

/// A client bound to one bucket
#[derive(Debug, Clone)]
pub struct BucketClient {
    base_url: Url,
    api_key: String,
    bucket: String,
    http: Client,
}

impl BucketClient {
    pub fn new(base_url: &str, api_key: &str, bucket: &str, http: Client) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            api_key: api_key.to_string(),
            bucket: bucket.to_string(),
            http,
        })
    }

    fn object_url(&self, prefix: &str, name: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidObject("base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(["storage", "v1", "object"])
            .extend(prefix.split('/').filter(|s| !s.is_empty()))
            .push(&self.bucket)
            .extend(name.split('/'));
        Ok(url)
    }

    /// Store a new object. An existing object with the same name is an error.
    pub async fn put(&self, object: &ObjectUpload) -> Result<StoredObject> {
        object.check()?;
        let url = self.object_url("", &object.name)?;

        let file_name = object.name.rsplit('/').next().unwrap_or(&object.name).to_string();
        let part = Part::bytes(object.data.to_vec())
            .file_name(file_name)
            .mime_str(&object.content_type)?;

        log::debug!(
            "PUT {} bytes as {}/{}",
            object.data.len(),
            self.bucket,
            object.name
        );
        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("cache-control", format!("max-age={}", object.cache_seconds))
            .header("x-upsert", "false")
            .multipart(Form::new().part("file", part))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection(status, response.text().await?));
        }
        Ok(response.json::<StoredObject>().await?)
    }

    /// URL an object is served from when the bucket is public
    pub fn public_url(&self, name: &str) -> Result<String> {
        Ok(self.object_url("public", name)?.to_string())
    }
}

fn rejection(status: StatusCode, body: String) -> StorageError {
    let message = serde_json::from_str::<RejectionBody>(&body)
        .ok()
        .and_then(|parsed| parsed.message.or(parsed.error))
        .unwrap_or(body);
    StorageError::Rejected {
        status: status.as_u16(),
        message,
    }
}
