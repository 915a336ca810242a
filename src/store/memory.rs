use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{EvidenceStore, IssueStore};
use crate::error::{Error, Result};
use crate::models::{Issue, IssuePatch, Project, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    projects: Vec<Project>,
    issues: Vec<Issue>,
    objects: HashMap<String, (Bytes, String)>,
}

/// In-process store with the same semantics as the hosted tables
#[derive(Default)]
pub struct MemoryStore {
    bucket: String,
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Seed a user row
    pub fn with_user(mut self, username: &str, password: &str, full_name: Option<&str>) -> Self {
        self.tables.get_mut().users.push(User {
            username: username.to_string(),
            password: password.to_string(),
            full_name: full_name.map(str::to_string),
        });
        self
    }

    /// Number of uploaded objects
    pub async fn object_count(&self) -> usize {
        self.tables.read().await.objects.len()
    }

    /// Content type and bytes of an uploaded object
    pub async fn object(&self, name: &str) -> Option<(Bytes, String)> {
        self.tables.read().await.objects.get(name).cloned()
    }
}

#[async_trait]
impl IssueStore for MemoryStore {
    async fn find_user(&self, username: &str, password: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.username == username && user.password == password)
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.tables.read().await.projects.clone())
    }

    async fn insert_project(&self, project: &Project) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.projects.iter().any(|p| p.name == project.name) {
            return Err(Error::conflict(format!("project {} exists", project.name)));
        }
        tables.projects.push(project.clone());
        Ok(())
    }

    async fn delete_project(&self, name: &str) -> Result<()> {
        self.tables
            .write()
            .await
            .projects
            .retain(|project| project.name != name);
        Ok(())
    }

    async fn list_issues(&self) -> Result<Vec<Issue>> {
        Ok(self.tables.read().await.issues.clone())
    }

    async fn get_issue(&self, id: &str) -> Result<Option<Issue>> {
        let tables = self.tables.read().await;
        Ok(tables.issues.iter().find(|issue| issue.id == id).cloned())
    }

    async fn insert_issue(&self, issue: &Issue) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.issues.iter().any(|existing| existing.id == issue.id) {
            return Err(Error::conflict(format!("issue {} exists", issue.id)));
        }
        tables.issues.push(issue.clone());
        Ok(())
    }

    async fn update_issue(&self, id: &str, patch: &IssuePatch) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(issue) = tables.issues.iter_mut().find(|issue| issue.id == id) {
            patch.apply_to(issue);
        }
        Ok(())
    }

    async fn delete_issue(&self, id: &str) -> Result<()> {
        self.tables
            .write()
            .await
            .issues
            .retain(|issue| issue.id != id);
        Ok(())
    }

    async fn delete_issues_in_project(&self, project: &str) -> Result<()> {
        self.tables
            .write()
            .await
            .issues
            .retain(|issue| issue.project != project);
        Ok(())
    }
}

#[async_trait]
impl EvidenceStore for MemoryStore {
    async fn upload(&self, object_name: &str, data: Bytes, content_type: &str) -> Result<String> {
        let mut tables = self.tables.write().await;
        if tables.objects.contains_key(object_name) {
            return Err(Error::conflict(format!("object {} exists", object_name)));
        }
        tables
            .objects
            .insert(object_name.to_string(), (data, content_type.to_string()));
        Ok(format!("memory://{}/{}", self.bucket, object_name))
    }
}
