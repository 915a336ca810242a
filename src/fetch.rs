//! Per-render fetch of the `projects` and `issues` tables

use crate::error::Result;
use crate::metrics::{Metrics, Selection};
use crate::models::{Issue, Project};
use crate::store::IssueStore;

/// Everything a dashboard render needs, fetched in full on every request
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub projects: Vec<Project>,
    pub issues: Vec<Issue>,
}

impl Snapshot {
    pub async fn load(store: &dyn IssueStore) -> Result<Self> {
        let projects = store.list_projects().await?;
        let issues = store.list_issues().await?;
        Ok(Self { projects, issues })
    }

    pub fn project_names(&self) -> Vec<&str> {
        self.projects.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn has_project(&self, name: &str) -> bool {
        self.projects.iter().any(|p| p.name == name)
    }

    pub fn issues_for(&self, selection: &Selection) -> Vec<&Issue> {
        selection.filter(&self.issues)
    }

    pub fn metrics(&self, selection: &Selection) -> Metrics {
        Metrics::compute(self.issues_for(selection))
    }
}
