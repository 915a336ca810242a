//! Configuration for the tracker

use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default bucket for evidence screenshots
pub const DEFAULT_EVIDENCE_BUCKET: &str = "evidence";

/// Western Indonesia Time
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

/// Tracker configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// The base URL of the Supabase project
    pub supabase_url: String,

    /// API key sent with every table and bucket request
    pub supabase_key: String,

    /// Secret used to sign session markers
    pub session_secret: String,

    /// How long a session marker stays valid
    pub session_ttl: Duration,

    /// Bucket receiving evidence uploads
    pub evidence_bucket: String,

    /// Offset applied to every displayed timestamp
    pub utc_offset_hours: i32,

    /// Address the dashboard listens on
    pub bind_addr: String,

    /// The request timeout for backend calls
    pub request_timeout: Option<Duration>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_key: String::new(),
            session_secret: String::new(),
            session_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            evidence_bucket: DEFAULT_EVIDENCE_BUCKET.to_string(),
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            bind_addr: "127.0.0.1:8501".to_string(),
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl TrackerConfig {
    /// Read the configuration from the process environment.
    ///
    /// Unset optional variables keep their defaults; the backend variables are
    /// checked separately by [`TrackerConfig::validate`] so the in-memory mode
    /// can run without them.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = env::var("SUPABASE_URL") {
            config.supabase_url = url;
        }
        if let Ok(key) = env::var("SUPABASE_KEY") {
            config.supabase_key = key;
        }
        if let Ok(secret) = env::var("TST_SESSION_SECRET") {
            config.session_secret = secret;
        }
        if let Ok(hours) = env::var("TST_SESSION_TTL_HOURS") {
            let hours: u64 = hours
                .parse()
                .map_err(|_| Error::config(format!("TST_SESSION_TTL_HOURS is not a number: {}", hours)))?;
            config.session_ttl = Duration::from_secs(hours * 60 * 60);
        }
        if let Ok(bucket) = env::var("TST_EVIDENCE_BUCKET") {
            config.evidence_bucket = bucket;
        }
        if let Ok(offset) = env::var("TST_UTC_OFFSET_HOURS") {
            config.utc_offset_hours = offset
                .parse()
                .map_err(|_| Error::config(format!("TST_UTC_OFFSET_HOURS is not a number: {}", offset)))?;
        }
        if let Ok(bind) = env::var("TST_BIND") {
            config.bind_addr = bind;
        }

        Ok(config)
    }

    /// Check everything needed to talk to the hosted backend
    pub fn validate(&self) -> Result<()> {
        if self.supabase_url.is_empty() {
            return Err(Error::config("SUPABASE_URL is not set"));
        }
        url::Url::parse(&self.supabase_url)
            .map_err(|e| Error::config(format!("SUPABASE_URL is invalid: {}", e)))?;
        if self.supabase_key.is_empty() {
            return Err(Error::config("SUPABASE_KEY is not set"));
        }
        if self.session_secret.len() < 16 {
            return Err(Error::config(
                "TST_SESSION_SECRET must be at least 16 characters",
            ));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(Error::config(format!(
                "UTC offset out of range: {}",
                self.utc_offset_hours
            )));
        }
        Ok(())
    }

    pub fn with_supabase(mut self, url: &str, key: &str) -> Self {
        self.supabase_url = url.to_string();
        self.supabase_key = key.to_string();
        self
    }

    pub fn with_session_secret(mut self, value: &str) -> Self {
        self.session_secret = value.to_string();
        self
    }

    pub fn with_session_ttl(mut self, value: Duration) -> Self {
        self.session_ttl = value;
        self
    }

    pub fn with_evidence_bucket(mut self, value: &str) -> Self {
        self.evidence_bucket = value.to_string();
        self
    }

    pub fn with_utc_offset_hours(mut self, value: i32) -> Self {
        self.utc_offset_hours = value;
        self
    }

    pub fn with_bind_addr(mut self, value: &str) -> Self {
        self.bind_addr = value.to_string();
        self
    }

    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }
}
