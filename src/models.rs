//! Rows of the `users`, `projects` and `issues` tables

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Value of `time_resolved` while an issue is open
pub const UNRESOLVED: &str = "-";

/// Prefix of every display id, as in `#T-007`
pub const ISSUE_ID_PREFIX: &str = "#T-";

/// A row of the `users` table. Seeded outside the tracker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub username: String,
    pub password: String,
    #[serde(default, alias = "fullname")]
    pub full_name: Option<String>,
}

impl User {
    /// Name shown in the sidebar, falling back to the username
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    /// High and Critical count towards the "High Sev" tile
    pub fn is_high(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|severity| severity.as_str() == s)
            .ok_or_else(|| Error::validation(format!("Unknown severity: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Category {
    #[default]
    #[serde(rename = "Frontend (UI/UX)")]
    Frontend,
    #[serde(rename = "Backend (API/Logic)")]
    Backend,
    #[serde(rename = "Database")]
    Database,
    #[serde(rename = "Performance")]
    Performance,
    #[serde(rename = "Security")]
    Security,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Frontend,
        Category::Backend,
        Category::Database,
        Category::Performance,
        Category::Security,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Frontend => "Frontend (UI/UX)",
            Category::Backend => "Backend (API/Logic)",
            Category::Database => "Database",
            Category::Performance => "Performance",
            Category::Security => "Security",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| Error::validation(format!("Unknown category: {}", s)))
    }
}

/// One entry of an issue's discussion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub user: String,
    pub msg: String,
    pub time: String,
}

/// A row of the `issues` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub id: String,
    pub project: String,
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub remarks: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub severity: Severity,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: Category,
    #[serde(default)]
    pub status: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_found: String,
    #[serde(default = "unresolved", deserialize_with = "null_as_unresolved")]
    pub time_resolved: String,
    #[serde(default)]
    pub resolved_by: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reporter: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub evidence: Option<String>,
}

impl Issue {
    pub fn is_open(&self) -> bool {
        !self.status
    }

    /// Numeric part of the display id, `7` for `#T-007`
    pub fn number(&self) -> Option<u32> {
        parse_issue_number(&self.id)
    }
}

/// Fields accepted by the creation form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewIssue {
    pub description: String,
    pub remarks: String,
    pub severity: Severity,
    pub category: Category,
}

/// Partial update of an issue. Only `Some` fields are sent.
///
/// `resolved_by` is doubly optional: `Some(None)` writes a null.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct IssuePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_resolved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl IssuePatch {
    pub fn is_empty(&self) -> bool {
        *self == IssuePatch::default()
    }

    /// Apply the patch to an in-memory row
    pub fn apply_to(&self, issue: &mut Issue) {
        if let Some(description) = &self.description {
            issue.description = description.clone();
        }
        if let Some(remarks) = &self.remarks {
            issue.remarks = remarks.clone();
        }
        if let Some(severity) = self.severity {
            issue.severity = severity;
        }
        if let Some(category) = self.category {
            issue.category = category;
        }
        if let Some(status) = self.status {
            issue.status = status;
        }
        if let Some(time_resolved) = &self.time_resolved {
            issue.time_resolved = time_resolved.clone();
        }
        if let Some(resolved_by) = &self.resolved_by {
            issue.resolved_by = resolved_by.clone();
        }
        if let Some(comments) = &self.comments {
            issue.comments = comments.clone();
        }
        if let Some(evidence) = &self.evidence {
            issue.evidence = Some(evidence.clone());
        }
    }
}

pub fn format_issue_id(number: u32) -> String {
    format!("{}{:03}", ISSUE_ID_PREFIX, number)
}

pub fn parse_issue_number(id: &str) -> Option<u32> {
    id.strip_prefix(ISSUE_ID_PREFIX)?.parse().ok()
}

fn unresolved() -> String {
    UNRESOLVED.to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_unresolved<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unresolved))
}
