//! Project navigation and the four dashboard tiles

use serde::Serialize;

use crate::models::Issue;

/// Label of the aggregate entry in the project selector
pub const ALL_PROJECTS: &str = "All Projects (Dashboard)";

/// What the navigator currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Project(String),
}

impl Selection {
    /// Parse a selector value; empty or the aggregate label select everything
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Selection::All,
            Some(ALL_PROJECTS) => Selection::All,
            Some(name) => Selection::Project(name.to_string()),
        }
    }

    pub fn project(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Project(name) => Some(name),
        }
    }

    /// Issues visible under this selection
    pub fn filter<'a>(&self, issues: &'a [Issue]) -> Vec<&'a Issue> {
        match self {
            Selection::All => issues.iter().collect(),
            Selection::Project(name) => issues.iter().filter(|i| &i.project == name).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub total: usize,
    pub pending: usize,
    pub resolved: usize,
    pub high_severity_open: usize,
}

impl Metrics {
    pub fn compute<'a, I>(issues: I) -> Self
    where
        I: IntoIterator<Item = &'a Issue>,
    {
        issues.into_iter().fold(Metrics::default(), |mut m, issue| {
            m.total += 1;
            if issue.is_open() {
                m.pending += 1;
                if issue.severity.is_high() {
                    m.high_severity_open += 1;
                }
            } else {
                m.resolved += 1;
            }
            m
        })
    }
}
