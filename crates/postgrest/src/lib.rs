//! PostgREST table client for the TST issue tracker
//!
//! Rows go in and out of Supabase tables through `{base}/rest/v1/{table}`.
//! A [`TableQuery`] collects exact-match filters and an optional ascending sort,
//! then runs exactly one verb. Writes that would touch every row are refused
//! before any request is made.

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use url::Url;

// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

const RETURN_ROWS: &str = "return=representation";

#[derive(Error, Debug)]
pub enum PostgrestError {
    /// The server answered with a non-success status
    #[error("{table}: {message} (status {status})")]
    Api {
        table: String,
        status: StatusCode,
        code: Option<String>,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Could not encode row: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Unexpected rows from {table}: {reason}")]
    Decode { table: String, reason: String },

    #[error("{verb} on {table} needs at least one filter")]
    Unfiltered { verb: &'static str, table: String },

    #[error("API key is not a valid header value")]
    InvalidKey,
}

impl PostgrestError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PostgrestError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when a write collided with an existing primary or unique key
    pub fn is_conflict(&self) -> bool {
        match self {
            PostgrestError::Api { status, code, .. } => {
                *status == StatusCode::CONFLICT || code.as_deref() == Some(UNIQUE_VIOLATION)
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PostgrestError>;

#[derive(Deserialize, Default)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl ApiErrorBody {
    fn summary(self, raw: String) -> (Option<String>, String) {
        let text = [self.message, self.details, self.hint]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("; ");
        let text = if text.is_empty() { raw } else { text };
        (self.code, text)
    }
}

#[derive(Debug, Clone)]
pub struct PostgrestClient {
    base_url: String,
    key: HeaderValue,
    bearer: HeaderValue,
    http: Client,
}

impl PostgrestClient {
    pub fn new(base_url: &str, api_key: &str, http: Client) -> Result<Self> {
        let key = HeaderValue::from_str(api_key).map_err(|_| PostgrestError::InvalidKey)?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| PostgrestError::InvalidKey)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            key,
            bearer,
            http,
        })
    }

    /// Start a query against `table`
    pub fn from(&self, table: &str) -> Result<TableQuery<'_>> {
        let endpoint = Url::parse(&format!("{}/rest/v1/{}", self.base_url, table))?;
        Ok(TableQuery {
            client: self,
            table: table.to_string(),
            endpoint,
            filters: Vec::new(),
            order: None,
        })
    }
}

/// Filters and ordering for one table; consumed by a single verb
#[derive(Debug, Clone)]
pub struct TableQuery<'a> {
    client: &'a PostgrestClient,
    table: String,
    endpoint: Url,
    filters: Vec<(String, String)>,
    order: Option<String>,
}

impl fmt::Display for TableQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table)?;
        for (column, filter) in &self.filters {
            write!(f, " {}={}", column, filter)?;
        }
        Ok(())
    }
}

impl TableQuery<'_> {
    pub fn eq(mut self, column: &str, value: impl fmt::Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{}", value)));
        self
    }

    /// Sort the selected rows by `column`, ascending
    pub fn order_by(mut self, column: &str) -> Self {
        self.order = Some(format!("{}.asc", column));
        self
    }

    pub async fn select<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let mut url = self.url();
        url.query_pairs_mut().append_pair("select", "*");
        if let Some(order) = &self.order {
            url.query_pairs_mut().append_pair("order", order);
        }
        log::debug!("select {}", self);
        let body = self.execute(self.request(Method::GET, url)).await?;
        self.rows(&body)
    }

    /// First matching row, if any
    pub async fn select_one<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let mut url = self.url();
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("limit", "1");
        log::debug!("select one {}", self);
        let body = self.execute(self.request(Method::GET, url)).await?;
        Ok(self.rows::<T>(&body)?.into_iter().next())
    }

    /// Insert one row; returns what the server stored, or `Null` on 204
    pub async fn insert<T: Serialize>(&self, row: &T) -> Result<Value> {
        let payload = serde_json::to_vec(row)?;
        log::debug!("insert into {}", self.table);
        self.write(Method::POST, Some(payload)).await
    }

    pub async fn update<T: Serialize>(&self, patch: &T) -> Result<Value> {
        self.filtered("update")?;
        let payload = serde_json::to_vec(patch)?;
        log::debug!("update {}", self);
        self.write(Method::PATCH, Some(payload)).await
    }

    pub async fn delete(&self) -> Result<Value> {
        self.filtered("delete")?;
        log::debug!("delete {}", self);
        self.write(Method::DELETE, None).await
    }

    fn filtered(&self, verb: &'static str) -> Result<()> {
        if self.filters.is_empty() {
            return Err(PostgrestError::Unfiltered {
                verb,
                table: self.table.clone(),
            });
        }
        Ok(())
    }

    fn url(&self) -> Url {
        let mut url = self.endpoint.clone();
        if !self.filters.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.filters);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .http
            .request(method, url)
            .header("apikey", self.client.key.clone())
            .header(AUTHORIZATION, self.client.bearer.clone())
    }

    async fn write(&self, method: Method, payload: Option<Vec<u8>>) -> Result<Value> {
        let mut request = self
            .request(method, self.url())
            .header("prefer", RETURN_ROWS);
        if let Some(payload) = payload {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(payload);
        }
        let body = self.execute(request).await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| self.decode_error(e))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            return Ok(body);
        }

        let parsed = serde_json::from_str::<ApiErrorBody>(&body).unwrap_or_default();
        let (code, message) = parsed.summary(body);
        log::debug!("{} failed with {}: {}", self, status, message);
        Err(PostgrestError::Api {
            table: self.table.clone(),
            status,
            code,
            message,
        })
    }

    fn rows<T: DeserializeOwned>(&self, body: &str) -> Result<Vec<T>> {
        serde_json::from_str(body).map_err(|e| self.decode_error(e))
    }

    fn decode_error(&self, err: serde_json::Error) -> PostgrestError {
        PostgrestError::Decode {
            table: self.table.clone(),
            reason: err.to_string(),
        }
    }
}
