//! REST-backed implementation of the [`ProjectStore`] contract.
//!
//! The application backend owns the project records; this client only reads
//! the current file snapshot and writes deployment result fields back. It
//! also carries the two auxiliary endpoints the same backend exposes: the
//! bounded log read used by the domain fallback and the fire-and-forget
//! deploy trigger.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::contract::{DeployOutcome, ProjectKey, ProjectStore, StoredPage};
use crate::error::{DeployError, DeployResult};

const BACKEND: &str = "store";

pub struct RestProjectStore {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestProjectStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        builder: reqwest::RequestBuilder,
        resource: &str,
    ) -> DeployResult<T> {
        let response = builder.send().await.map_err(|source| DeployError::Network {
            backend: BACKEND,
            source,
        })?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DeployError::NotFound {
                resource: resource.to_string(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DeployError::Backend {
                backend: BACKEND,
                status: status.as_u16(),
                message,
            });
        }
        let body = response.text().await.map_err(|source| DeployError::Network {
            backend: BACKEND,
            source,
        })?;
        serde_json::from_str(&body).map_err(|source| DeployError::Decode {
            backend: BACKEND,
            source,
        })
    }
}

#[derive(Deserialize)]
struct PagesResponse {
    #[serde(default)]
    pages: Vec<StoredPage>,
}

#[derive(Deserialize)]
struct ProjectResponse {
    #[serde(default)]
    html_content: Option<String>,
}

#[derive(Deserialize)]
struct LogsResponse {
    success: bool,
    #[serde(default)]
    logs: Vec<String>,
}

#[derive(Deserialize)]
struct Acknowledged {
    #[allow(dead_code)]
    success: bool,
}

#[async_trait]
impl ProjectStore for RestProjectStore {
    async fn list_pages(&self, project: &ProjectKey) -> DeployResult<Vec<StoredPage>> {
        let path = format!("/api/projects/{project}/pages");
        let response: PagesResponse = self
            .send_json(self.request(Method::GET, &path), "project pages")
            .await?;
        Ok(response.pages)
    }

    async fn legacy_document(&self, project: &ProjectKey) -> DeployResult<Option<String>> {
        let path = format!("/api/projects/{project}");
        let response: ProjectResponse = self
            .send_json(self.request(Method::GET, &path), "project record")
            .await?;
        Ok(response.html_content)
    }

    async fn persist_outcome(
        &self,
        project: &ProjectKey,
        outcome: &DeployOutcome,
    ) -> DeployResult<()> {
        let path = format!("/api/projects/{project}");
        let _: Acknowledged = self
            .send_json(
                self.request(Method::PATCH, &path).json(outcome),
                "deployment result",
            )
            .await?;
        Ok(())
    }

    async fn save_domain(&self, project: &ProjectKey, domain: &str) -> DeployResult<()> {
        let path = format!("/api/projects/{project}");
        // The identifier is serialized in the shape the key carries, so the
        // caller can attempt numeric and string records separately.
        let body = match project {
            ProjectKey::Numeric(n) => json!({ "project_id": n, "deployed_url": domain }),
            ProjectKey::Text(s) => json!({ "project_id": s, "deployed_url": domain }),
        };
        let _: Acknowledged = self
            .send_json(self.request(Method::PATCH, &path).json(&body), "domain record")
            .await?;
        Ok(())
    }

    async fn recent_logs(&self, project: &ProjectKey, limit: usize) -> DeployResult<Vec<String>> {
        let path = format!("/api/logs?project_id={project}&limit={limit}");
        let response: LogsResponse = self
            .send_json(self.request(Method::GET, &path), "project logs")
            .await?;
        if !response.success {
            return Ok(Vec::new());
        }
        Ok(response.logs)
    }

    async fn trigger_deploy(&self, repo_id: &str) -> DeployResult<()> {
        let body = json!({ "repo_id": repo_id });
        let _: Acknowledged = self
            .send_json(
                self.request(Method::POST, "/api/deploy").json(&body),
                "deploy trigger",
            )
            .await?;
        Ok(())
    }
}
