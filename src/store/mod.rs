//! Backends the tracker reads from and writes to
//!
//! The hosted table service and bucket are reached through [`IssueStore`]
//! and [`EvidenceStore`]. [`SupabaseStore`] talks to Supabase; [`MemoryStore`]
//! keeps everything in process for tests and local trials.

mod memory;
mod supabase;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::models::{Issue, IssuePatch, Project, User};

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

pub const USERS_TABLE: &str = "users";
pub const PROJECTS_TABLE: &str = "projects";
pub const ISSUES_TABLE: &str = "issues";

/// Row CRUD over the `users`, `projects` and `issues` tables
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// The user whose username and password both match exactly
    async fn find_user(&self, username: &str, password: &str) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn insert_project(&self, project: &Project) -> Result<()>;

    async fn delete_project(&self, name: &str) -> Result<()>;

    async fn list_issues(&self) -> Result<Vec<Issue>>;

    async fn get_issue(&self, id: &str) -> Result<Option<Issue>>;

    /// Insert a whole row. Fails with [`crate::Error::Conflict`] when the id is taken.
    async fn insert_issue(&self, issue: &Issue) -> Result<()>;

    async fn update_issue(&self, id: &str, patch: &IssuePatch) -> Result<()>;

    async fn delete_issue(&self, id: &str) -> Result<()>;

    async fn delete_issues_in_project(&self, project: &str) -> Result<()>;
}

/// Blob upload returning a public URL
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    async fn upload(&self, object_name: &str, data: Bytes, content_type: &str) -> Result<String>;
}
