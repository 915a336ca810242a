//! Request bodies posted by the dashboard

use axum::extract::Multipart;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::evidence::Upload;
use crate::issues::GridRow;
use crate::models::NewIssue;

/// Query string carried by every page and form action
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub session: Option<String>,
    pub project: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectForm {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub resolved: bool,
}

/// Rebuild grid rows from `field.index` pairs.
///
/// Checkboxes are only posted when ticked, so a missing `delete.N` or
/// `status.N` reads as false.
pub fn parse_grid(pairs: &[(String, String)]) -> Result<Vec<GridRow>> {
    let mut rows: BTreeMap<usize, HashMap<&str, &str>> = BTreeMap::new();
    for (key, value) in pairs {
        let Some((name, index)) = key.rsplit_once('.') else {
            continue;
        };
        let Ok(index) = index.parse::<usize>() else {
            continue;
        };
        rows.entry(index).or_default().insert(name, value.as_str());
    }

    rows.into_values()
        .map(|row| {
            Ok(GridRow {
                id: field(&row, "id")?.to_string(),
                delete: flag(&row, "delete"),
                status: flag(&row, "status"),
                description: field(&row, "description")?.to_string(),
                remarks: field(&row, "remarks")?.to_string(),
                severity: field(&row, "severity")?.parse()?,
                category: field(&row, "category")?.parse()?,
            })
        })
        .collect()
}

fn field<'a>(row: &HashMap<&str, &'a str>, name: &str) -> Result<&'a str> {
    row.get(name)
        .copied()
        .ok_or_else(|| Error::validation(format!("Grid row is missing {}", name)))
}

fn flag(row: &HashMap<&str, &str>, name: &str) -> bool {
    matches!(row.get(name), Some(value) if !matches!(*value, "" | "false" | "off"))
}

fn malformed(err: axum::extract::multipart::MultipartError) -> Error {
    Error::validation(format!("Malformed upload: {}", err))
}

/// The optional file part named `evidence`
pub async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() != Some("evidence") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(malformed)?;
        if !file_name.is_empty() {
            upload = Some(Upload { file_name, data });
        }
    }
    Ok(upload)
}

/// The creation form: text fields plus an optional screenshot
pub async fn read_issue_form(mut multipart: Multipart) -> Result<(NewIssue, Option<Upload>)> {
    let mut draft = NewIssue::default();
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "evidence" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(malformed)?;
            if !file_name.is_empty() {
                upload = Some(Upload { file_name, data });
            }
            continue;
        }

        let value = field.text().await.map_err(malformed)?;
        match name.as_str() {
            "description" => draft.description = value,
            "remarks" => draft.remarks = value,
            "severity" => draft.severity = value.parse()?,
            "category" => draft.category = value.parse()?,
            _ => {}
        }
    }

    Ok((draft, upload))
}
