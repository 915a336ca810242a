//! TST issue tracker
//!
//! A single-tenant dashboard for testing issues: projects, issues with
//! inline editing, threaded comments, screenshot evidence and spreadsheet
//! export. Rows live in Supabase tables and screenshots in a Supabase
//! storage bucket.

pub mod auth;
pub mod clock;
pub mod comments;
pub mod config;
pub mod error;
pub mod evidence;
pub mod export;
pub mod fetch;
pub mod issues;
pub mod metrics;
pub mod models;
pub mod notify;
pub mod projects;
pub mod session;
pub mod store;
pub mod web;

use std::sync::Arc;

use crate::auth::AuthGate;
use crate::clock::Clock;
use crate::comments::DetailPanel;
use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::evidence::EvidenceUploader;
use crate::fetch::Snapshot;
use crate::issues::IssueEditor;
use crate::projects::ProjectAdmin;
use crate::session::SessionKeys;
use crate::store::{EvidenceStore, IssueStore, MemoryStore, SupabaseStore};

/// The main entry point of the tracker
#[derive(Clone)]
pub struct Tracker {
    store: Arc<dyn IssueStore>,
    evidence: Arc<dyn EvidenceStore>,
    keys: SessionKeys,
    clock: Clock,
}

impl Tracker {
    /// Build a tracker over explicit backends
    pub fn new(
        store: Arc<dyn IssueStore>,
        evidence: Arc<dyn EvidenceStore>,
        config: &TrackerConfig,
    ) -> Result<Self> {
        let ttl = chrono::Duration::from_std(config.session_ttl)
            .map_err(|e| Error::config(format!("invalid session TTL: {}", e)))?;
        Ok(Self {
            store,
            evidence,
            keys: SessionKeys::new(&config.session_secret, ttl),
            clock: Clock::new(config.utc_offset_hours)?,
        })
    }

    /// Connect to Supabase, failing when the tables cannot be reached
    pub async fn connect(config: &TrackerConfig) -> Result<Self> {
        config.validate()?;
        let backend = Arc::new(SupabaseStore::new(config)?);
        backend.ping().await?;
        Self::new(backend.clone(), backend, config)
    }

    /// A tracker over an in-process store
    pub fn in_memory(store: MemoryStore, config: &TrackerConfig) -> Result<Self> {
        let store = Arc::new(store);
        Self::new(store.clone(), store, config)
    }

    /// Replace the clock, mostly for tests
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn auth(&self) -> AuthGate<'_> {
        AuthGate::new(self.store.as_ref(), &self.keys)
    }

    pub fn projects(&self) -> ProjectAdmin<'_> {
        ProjectAdmin::new(self.store.as_ref())
    }

    pub fn issues(&self) -> IssueEditor<'_> {
        IssueEditor::new(self.store.as_ref(), &self.clock)
    }

    pub fn detail(&self) -> DetailPanel<'_> {
        DetailPanel::new(self.store.as_ref(), &self.clock)
    }

    pub fn evidence(&self) -> EvidenceUploader<'_> {
        EvidenceUploader::new(self.store.as_ref(), self.evidence.as_ref())
    }

    /// Fetch every project and issue
    pub async fn snapshot(&self) -> Result<Snapshot> {
        Snapshot::load(self.store.as_ref()).await
    }
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::auth::{Session, SignedIn};
    pub use crate::config::TrackerConfig;
    pub use crate::error::{Error, Result};
    pub use crate::fetch::Snapshot;
    pub use crate::issues::GridRow;
    pub use crate::metrics::{Metrics, Selection};
    pub use crate::models::{Category, Comment, Issue, NewIssue, Project, Severity, User};
    pub use crate::store::MemoryStore;
    pub use crate::Tracker;
}
