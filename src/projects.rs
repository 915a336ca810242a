//! Project creation and cascading delete

use tracing::info;

use crate::error::{Error, Result};
use crate::metrics::ALL_PROJECTS;
use crate::models::Project;
use crate::store::IssueStore;

pub struct ProjectAdmin<'a> {
    store: &'a dyn IssueStore,
}

impl<'a> ProjectAdmin<'a> {
    pub(crate) fn new(store: &'a dyn IssueStore) -> Self {
        Self { store }
    }

    /// Create a project named `name` after trimming.
    ///
    /// Blank names, duplicates and the aggregate label are rejected.
    pub async fn create(&self, name: &str) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("Project name is required"));
        }
        if name == ALL_PROJECTS {
            return Err(Error::validation(format!("{} is reserved", ALL_PROJECTS)));
        }

        let existing = self.store.list_projects().await?;
        if existing.iter().any(|p| p.name == name) {
            return Err(Error::conflict(format!("Project {} already exists", name)));
        }

        let project = Project {
            name: name.to_string(),
        };
        self.store.insert_project(&project).await?;
        info!(project = name, "project created");
        Ok(project)
    }

    /// Delete the project row, then every issue filed under it.
    ///
    /// The two writes are not atomic. If the second fails the issues stay
    /// behind without a project.
    pub async fn delete(&self, name: &str) -> Result<()> {
        self.store.delete_project(name).await?;
        self.store.delete_issues_in_project(name).await?;
        info!(project = name, "project deleted");
        Ok(())
    }
}
