//! Screenshot uploads attached to issues

use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::IssuePatch;
use crate::store::{EvidenceStore, IssueStore};

/// Image formats accepted as evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Classify an uploaded file by its extension, ignoring case
    pub fn from_file_name(file_name: &str) -> Option<(Self, String)> {
        let (_, ext) = file_name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        let kind = match ext.as_str() {
            "png" => ImageKind::Png,
            "jpg" | "jpeg" => ImageKind::Jpeg,
            _ => return None,
        };
        Some((kind, ext))
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }
}

/// An uploaded file as received from the browser
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub data: Bytes,
}

pub struct EvidenceUploader<'a> {
    issues: &'a dyn IssueStore,
    blobs: &'a dyn EvidenceStore,
}

impl<'a> EvidenceUploader<'a> {
    pub(crate) fn new(issues: &'a dyn IssueStore, blobs: &'a dyn EvidenceStore) -> Self {
        Self { issues, blobs }
    }

    /// Upload the bytes under a random object name and return the public URL
    pub async fn upload(&self, upload: &Upload) -> Result<String> {
        let (kind, ext) = ImageKind::from_file_name(&upload.file_name).ok_or_else(|| {
            Error::validation(format!(
                "Unsupported file type: {} (png, jpg or jpeg only)",
                upload.file_name
            ))
        })?;
        if upload.data.is_empty() {
            return Err(Error::validation("Uploaded file is empty"));
        }

        let object_name = format!("{}.{}", Uuid::new_v4(), ext);
        let url = self
            .blobs
            .upload(&object_name, upload.data.clone(), kind.content_type())
            .await
            .map_err(|e| {
                warn!(error = %e, file = %upload.file_name, "evidence upload failed");
                e
            })?;

        info!(object = %object_name, bytes = upload.data.len(), "evidence uploaded");
        Ok(url)
    }

    /// Upload and point the issue's `evidence` at the new URL.
    ///
    /// On failure the issue is left untouched.
    pub async fn attach(&self, issue_id: &str, upload: &Upload) -> Result<String> {
        if self.issues.get_issue(issue_id).await?.is_none() {
            return Err(Error::not_found("Issue not found."));
        }
        let url = self.upload(upload).await?;
        let patch = IssuePatch {
            evidence: Some(url.clone()),
            ..Default::default()
        };
        self.issues.update_issue(issue_id, &patch).await?;
        Ok(url)
    }
}
