//! Issue creation and the bulk edit grid
//!
//! The grid is reconciled by diffing each submitted row against the row
//! fetched for the same render. The whole change set is computed first and
//! then applied, so a delete in one row never drops edits made to another.
//! Writes are last-write-wins; nothing guards against a concurrent editor.

use tracing::info;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::fetch::Snapshot;
use crate::models::{
    format_issue_id, Category, Issue, IssuePatch, NewIssue, Severity, User, UNRESOLVED,
};
use crate::store::IssueStore;

/// Attempts made when the backend reports the chosen id as taken
const MAX_ID_ATTEMPTS: u32 = 3;

/// One row of the edit grid as submitted by the browser
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub id: String,
    pub delete: bool,
    pub status: bool,
    pub description: String,
    pub remarks: String,
    pub severity: Severity,
    pub category: Category,
}

impl GridRow {
    /// The row as the grid first displays it
    pub fn from_issue(issue: &Issue) -> Self {
        Self {
            id: issue.id.clone(),
            delete: false,
            status: issue.status,
            description: issue.description.clone(),
            remarks: issue.remarks.clone(),
            severity: issue.severity,
            category: issue.category,
        }
    }
}

/// A mutation inferred from the grid
#[derive(Debug, Clone, PartialEq)]
pub enum RowChange {
    Delete { id: String },
    Update { id: String, patch: IssuePatch },
}

impl RowChange {
    pub fn id(&self) -> &str {
        match self {
            RowChange::Delete { id } | RowChange::Update { id, .. } => id,
        }
    }
}

/// Counts of what a grid submission changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridOutcome {
    pub deleted: usize,
    pub updated: usize,
}

impl GridOutcome {
    pub fn is_empty(&self) -> bool {
        self.deleted == 0 && self.updated == 0
    }
}

/// Resolution fields written alongside a status change
pub fn resolution_patch(status: bool, actor: &User, clock: &Clock) -> IssuePatch {
    if status {
        IssuePatch {
            status: Some(true),
            time_resolved: Some(clock.stamp()),
            resolved_by: Some(Some(actor.username.clone())),
            ..Default::default()
        }
    } else {
        IssuePatch {
            status: Some(false),
            time_resolved: Some(UNRESOLVED.to_string()),
            resolved_by: Some(None),
            ..Default::default()
        }
    }
}

/// Next display id: one past the highest numeric suffix in use
pub fn next_issue_id(issues: &[Issue]) -> Result<String> {
    let highest = issues.iter().filter_map(Issue::number).max().unwrap_or(0);
    following_id(highest)
}

fn following_id(number: u32) -> Result<String> {
    number
        .checked_add(1)
        .map(format_issue_id)
        .ok_or_else(|| Error::conflict("Issue ids are exhausted"))
}

/// Diff submitted rows against the snapshot.
///
/// Rows whose id is no longer in the snapshot are skipped. A checked delete
/// flag wins over every other edit in that row. Only a status flip touches
/// `time_resolved` and `resolved_by`.
pub fn reconcile(snapshot: &[Issue], rows: &[GridRow], actor: &User, clock: &Clock) -> Vec<RowChange> {
    let mut changes = Vec::new();

    for row in rows {
        let Some(original) = snapshot.iter().find(|issue| issue.id == row.id) else {
            continue;
        };

        if row.delete {
            changes.push(RowChange::Delete { id: row.id.clone() });
            continue;
        }

        let mut patch = if row.status != original.status {
            resolution_patch(row.status, actor, clock)
        } else {
            IssuePatch::default()
        };
        if row.description != original.description {
            patch.description = Some(row.description.clone());
        }
        if row.remarks != original.remarks {
            patch.remarks = Some(row.remarks.clone());
        }
        if row.severity != original.severity {
            patch.severity = Some(row.severity);
        }
        if row.category != original.category {
            patch.category = Some(row.category);
        }

        if !patch.is_empty() {
            changes.push(RowChange::Update {
                id: row.id.clone(),
                patch,
            });
        }
    }

    changes
}

/// Creation form and edit grid
pub struct IssueEditor<'a> {
    store: &'a dyn IssueStore,
    clock: &'a Clock,
}

impl<'a> IssueEditor<'a> {
    pub(crate) fn new(store: &'a dyn IssueStore, clock: &'a Clock) -> Self {
        Self { store, clock }
    }

    /// Create an issue in `project`, returning the stored row.
    ///
    /// Nothing is written when the description is blank or the project is
    /// unknown.
    pub async fn create(
        &self,
        actor: &User,
        project: &str,
        draft: NewIssue,
        evidence: Option<String>,
        snapshot: &Snapshot,
    ) -> Result<Issue> {
        if draft.description.trim().is_empty() {
            return Err(Error::validation("Description is required"));
        }
        if !snapshot.has_project(project) {
            return Err(Error::not_found(format!("Project {} not found", project)));
        }

        let mut issue = Issue {
            id: next_issue_id(&snapshot.issues)?,
            project: project.to_string(),
            description: draft.description.trim().to_string(),
            remarks: draft.remarks.trim().to_string(),
            severity: draft.severity,
            category: draft.category,
            status: false,
            time_found: self.clock.stamp(),
            time_resolved: UNRESOLVED.to_string(),
            resolved_by: None,
            reporter: actor.username.clone(),
            comments: Vec::new(),
            evidence,
        };

        let mut attempt = 1;
        loop {
            match self.store.insert_issue(&issue).await {
                Ok(()) => break,
                Err(Error::Conflict(_)) if attempt < MAX_ID_ATTEMPTS => {
                    issue.id = following_id(issue.number().unwrap_or(0))?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(id = %issue.id, project, reporter = %issue.reporter, "issue created");
        Ok(issue)
    }

    /// Flip the status of one issue, writing the resolution fields
    pub async fn set_status(&self, actor: &User, id: &str, status: bool) -> Result<()> {
        let issue = self
            .store
            .get_issue(id)
            .await?
            .ok_or_else(|| Error::not_found("Issue not found."))?;
        if issue.status == status {
            return Ok(());
        }
        self.store
            .update_issue(id, &resolution_patch(status, actor, self.clock))
            .await?;
        info!(id, status, actor = %actor.username, "status changed");
        Ok(())
    }

    /// Reconcile a grid submission against `snapshot` and apply every change
    pub async fn apply_grid(
        &self,
        actor: &User,
        snapshot: &[Issue],
        rows: &[GridRow],
    ) -> Result<GridOutcome> {
        let changes = reconcile(snapshot, rows, actor, self.clock);
        let mut outcome = GridOutcome::default();

        for change in &changes {
            match change {
                RowChange::Delete { id } => {
                    self.store.delete_issue(id).await?;
                    outcome.deleted += 1;
                }
                RowChange::Update { id, patch } => {
                    self.store.update_issue(id, patch).await?;
                    outcome.updated += 1;
                }
            }
        }

        if !outcome.is_empty() {
            info!(
                deleted = outcome.deleted,
                updated = outcome.updated,
                actor = %actor.username,
                "grid applied"
            );
        }
        Ok(outcome)
    }
}
