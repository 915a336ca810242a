use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tst_postgrest::{PostgrestClient, PostgrestError};
use tst_storage::{BucketClient, ObjectUpload};

use super::{EvidenceStore, IssueStore, ISSUES_TABLE, PROJECTS_TABLE, USERS_TABLE};
use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::models::{Issue, IssuePatch, Project, User};

/// Store backed by a Supabase project: PostgREST tables plus one bucket
pub struct SupabaseStore {
    rest: PostgrestClient,
    bucket: BucketClient,
}

impl SupabaseStore {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Self::with_client(config, http_client)
    }

    pub fn with_client(config: &TrackerConfig, http_client: Client) -> Result<Self> {
        Ok(Self {
            rest: PostgrestClient::new(
                &config.supabase_url,
                &config.supabase_key,
                http_client.clone(),
            )?,
            bucket: BucketClient::new(
                &config.supabase_url,
                &config.supabase_key,
                &config.evidence_bucket,
                http_client,
            )?,
        })
    }

    /// Fail fast when the backend is unreachable or the key is rejected
    pub async fn ping(&self) -> Result<()> {
        self.rest
            .from(PROJECTS_TABLE)?
            .select::<Project>()
            .await?;
        Ok(())
    }
}

fn conflict_or_database(err: PostgrestError, what: &str) -> Error {
    if err.is_conflict() {
        Error::conflict(what)
    } else {
        Error::Database(err)
    }
}

#[async_trait]
impl IssueStore for SupabaseStore {
    async fn find_user(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = self
            .rest
            .from(USERS_TABLE)?
            .eq("username", username)
            .eq("password", password)
            .select_one::<User>()
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .rest
            .from(USERS_TABLE)?
            .eq("username", username)
            .select_one::<User>()
            .await?;
        Ok(user)
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let projects = self
            .rest
            .from(PROJECTS_TABLE)?
            .order_by("name")
            .select::<Project>()
            .await?;
        Ok(projects)
    }

    async fn insert_project(&self, project: &Project) -> Result<()> {
        self.rest
            .from(PROJECTS_TABLE)?
            .insert(project)
            .await
            .map_err(|e| conflict_or_database(e, &format!("project {} exists", project.name)))?;
        Ok(())
    }

    async fn delete_project(&self, name: &str) -> Result<()> {
        self.rest
            .from(PROJECTS_TABLE)?
            .eq("name", name)
            .delete()
            .await?;
        Ok(())
    }

    async fn list_issues(&self) -> Result<Vec<Issue>> {
        let issues = self
            .rest
            .from(ISSUES_TABLE)?
            .order_by("id")
            .select::<Issue>()
            .await?;
        Ok(issues)
    }

    async fn get_issue(&self, id: &str) -> Result<Option<Issue>> {
        let issue = self
            .rest
            .from(ISSUES_TABLE)?
            .eq("id", id)
            .select_one::<Issue>()
            .await?;
        Ok(issue)
    }

    async fn insert_issue(&self, issue: &Issue) -> Result<()> {
        self.rest
            .from(ISSUES_TABLE)?
            .insert(issue)
            .await
            .map_err(|e| conflict_or_database(e, &format!("issue {} exists", issue.id)))?;
        Ok(())
    }

    async fn update_issue(&self, id: &str, patch: &IssuePatch) -> Result<()> {
        self.rest
            .from(ISSUES_TABLE)?
            .eq("id", id)
            .update(patch)
            .await?;
        Ok(())
    }

    async fn delete_issue(&self, id: &str) -> Result<()> {
        self.rest
            .from(ISSUES_TABLE)?
            .eq("id", id)
            .delete()
            .await?;
        Ok(())
    }

    async fn delete_issues_in_project(&self, project: &str) -> Result<()> {
        self.rest
            .from(ISSUES_TABLE)?
            .eq("project", project)
            .delete()
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EvidenceStore for SupabaseStore {
    async fn upload(&self, object_name: &str, data: Bytes, content_type: &str) -> Result<String> {
        self.bucket
            .put(&ObjectUpload::new(object_name, content_type, data))
            .await?;
        Ok(self.bucket.public_url(object_name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> SupabaseStore {
        let config = TrackerConfig::default().with_supabase(&server.uri(), "anon-key");
        SupabaseStore::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_find_user_matches_both_fields() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("username", "eq.qa"))
            .and(query_param("password", "eq.secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "username": "qa", "password": "secret", "full_name": "Quinn Avery" }
            ])))
            .mount(&mock_server)
            .await;

        let user = store(&mock_server)
            .find_user("qa", "secret")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.display_name(), "Quinn Avery");
    }

    #[tokio::test]
    async fn test_insert_issue_conflict_maps_to_conflict() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/issues"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint",
                "details": null,
                "hint": null
            })))
            .mount(&mock_server)
            .await;

        let issue: Issue = serde_json::from_value(json!({
            "id": "#T-001", "project": "Alpha", "description": "d"
        }))
        .unwrap();
        let err = store(&mock_server).insert_issue(&issue).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_issue_sends_patch() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/issues"))
            .and(query_param("id", "eq.#T-003"))
            .and(body_json(json!({ "remarks": "retest on staging" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let patch = IssuePatch {
            remarks: Some("retest on staging".to_string()),
            ..Default::default()
        };
        store(&mock_server)
            .update_issue("#T-003", &patch)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/evidence/shot.png"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "Key": "evidence/shot.png" })),
            )
            .mount(&mock_server)
            .await;

        let url = store(&mock_server)
            .upload("shot.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        assert_eq!(
            url,
            format!("{}/storage/v1/object/public/evidence/shot.png", mock_server.uri())
        );
    }

    #[tokio::test]
    async fn test_ping_surfaces_rejected_key() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/projects"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid API key" })),
            )
            .mount(&mock_server)
            .await;

        let err = store(&mock_server).ping().await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }
}
