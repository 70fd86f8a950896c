//! Edge publishing: content-addressed deployments to the edge network.
//!
//! [`EdgePublisher`] drives any [`EdgeHost`]; the concrete
//! [`CloudflareClient`] talks to the Cloudflare Pages REST API. One multipart
//! request carries the whole deployment: the path→digest manifest as JSON,
//! one binary part per unique digest (field name = digest, not path), and a
//! `_routes.json` part that marks every path as a servable static asset so
//! the backend does not misclassify the upload as executable logic.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use crate::contract::{DeployableFile, Deployment, DeploymentPayload, EdgeHost, EdgeProject};
use crate::error::{DeployError, DeployResult};
use crate::hasher;

const BACKEND: &str = "cloudflare";
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Assemble the deployment payload for a file set: manifest, deduplicated
/// blobs and routing config.
///
/// Files with identical digests are carried once regardless of how many
/// paths reference them.
pub fn build_payload(files: &[DeployableFile]) -> DeployResult<DeploymentPayload> {
    let manifest = hasher::build_manifest(files)?;

    let mut blobs: Vec<(String, Vec<u8>)> = Vec::new();
    for file in files {
        let digest = hasher::hash_bytes(&file.content);
        if !blobs.iter().any(|(d, _)| *d == digest) {
            blobs.push((digest, file.content.clone()));
        }
    }

    let routes = json!({ "version": 1, "include": ["/*"], "exclude": [] }).to_string();

    debug!(
        paths = manifest.len(),
        unique_blobs = blobs.len(),
        "[EDGE] Deployment payload assembled"
    );
    Ok(DeploymentPayload {
        manifest,
        blobs,
        routes,
    })
}

/// High-level edge publisher over any [`EdgeHost`].
pub struct EdgePublisher<H> {
    host: H,
}

impl<H: EdgeHost> EdgePublisher<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Get the edge project, creating it on not-found.
    pub async fn ensure_project(&self, name: &str, branch: &str) -> DeployResult<EdgeProject> {
        match self.host.get_project(name).await {
            Ok(project) => {
                debug!(project = name, "[EDGE] Project exists");
                Ok(project)
            }
            Err(e) if e.is_not_found() => {
                info!(project = name, "[EDGE] Project missing; creating");
                self.host.create_project(name, branch).await
            }
            Err(e) => {
                error!(project = name, error = %e, "[EDGE] Project existence check failed");
                Err(e)
            }
        }
    }

    /// Publish the file set as one atomic deployment. Any error aborts; no
    /// partial deployment identifier is ever returned.
    pub async fn publish(
        &self,
        project: &EdgeProject,
        branch: &str,
        files: &[DeployableFile],
    ) -> DeployResult<Deployment> {
        let payload = build_payload(files)?;
        let deployment = self.host.create_deployment(project, branch, &payload).await?;
        info!(
            project = %project.name,
            deployment = %deployment.id,
            url = %deployment.url,
            "[EDGE] Deployment created"
        );
        Ok(deployment)
    }
}

/// Cloudflare Pages REST client implementing [`EdgeHost`].
pub struct CloudflareClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    account_id: String,
}

impl CloudflareClient {
    pub fn new(account_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_base_url(CLOUDFLARE_API_BASE, account_id, token)
    }

    /// Custom API base, for tests against a local server.
    pub fn with_base_url(
        base_url: impl Into<String>,
        account_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            account_id: account_id.into(),
        }
    }

    fn projects_path(&self) -> String {
        format!("/accounts/{}/pages/projects", self.account_id)
    }

    async fn send_enveloped<T: for<'de> Deserialize<'de>>(
        &self,
        builder: reqwest::RequestBuilder,
        resource: &str,
    ) -> DeployResult<T> {
        let response = builder
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| DeployError::Network {
                backend: BACKEND,
                source,
            })?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DeployError::NotFound {
                resource: resource.to_string(),
            });
        }
        let body = response.text().await.map_err(|source| DeployError::Network {
            backend: BACKEND,
            source,
        })?;
        if !status.is_success() {
            return Err(DeployError::Backend {
                backend: BACKEND,
                status: status.as_u16(),
                message: body,
            });
        }
        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|source| DeployError::Decode {
                backend: BACKEND,
                source,
            })?;
        if !envelope.success {
            let message = envelope
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(DeployError::Backend {
                backend: BACKEND,
                status: status.as_u16(),
                message,
            });
        }
        envelope.result.ok_or_else(|| DeployError::Backend {
            backend: BACKEND,
            status: status.as_u16(),
            message: format!("missing result for {resource}"),
        })
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Deserialize)]
struct ProjectResponse {
    name: String,
    subdomain: Option<String>,
}

#[derive(Deserialize)]
struct DeploymentResponse {
    id: String,
    url: String,
    created_on: Option<String>,
}

#[async_trait]
impl EdgeHost for CloudflareClient {
    async fn get_project(&self, name: &str) -> DeployResult<EdgeProject> {
        let url = format!("{}{}/{}", self.base_url, self.projects_path(), name);
        let resource = format!("pages project {name}");
        let project: ProjectResponse = self
            .send_enveloped(self.http.request(Method::GET, url), &resource)
            .await?;
        Ok(EdgeProject {
            name: project.name,
            account_id: self.account_id.clone(),
            subdomain: project.subdomain,
        })
    }

    async fn create_project(&self, name: &str, branch: &str) -> DeployResult<EdgeProject> {
        let url = format!("{}{}", self.base_url, self.projects_path());
        let body = json!({ "name": name, "production_branch": branch });
        let project: ProjectResponse = self
            .send_enveloped(
                self.http.request(Method::POST, url).json(&body),
                "pages project creation",
            )
            .await?;
        Ok(EdgeProject {
            name: project.name,
            account_id: self.account_id.clone(),
            subdomain: project.subdomain,
        })
    }

    async fn create_deployment(
        &self,
        project: &EdgeProject,
        branch: &str,
        payload: &DeploymentPayload,
    ) -> DeployResult<Deployment> {
        let manifest_json =
            serde_json::to_string(&payload.manifest).map_err(|source| DeployError::Decode {
                backend: BACKEND,
                source,
            })?;

        let mut form = Form::new().text("manifest", manifest_json);
        for (digest, bytes) in &payload.blobs {
            let part = Part::bytes(bytes.clone()).file_name(digest.clone());
            form = form.part(digest.clone(), part);
        }
        let routes_part = Part::text(payload.routes.clone())
            .file_name("_routes.json")
            .mime_str("application/json")
            .map_err(|source| DeployError::Network {
                backend: BACKEND,
                source,
            })?;
        form = form.part("_routes.json", routes_part);

        let url = format!(
            "{}{}/{}/deployments?branch={}&stage=production",
            self.base_url,
            self.projects_path(),
            project.name,
            branch
        );
        let deployment: DeploymentResponse = self
            .send_enveloped(
                self.http.request(Method::POST, url).multipart(form),
                "pages deployment",
            )
            .await?;
        Ok(Deployment {
            id: deployment.id,
            url: deployment.url,
            created_at: deployment.created_on,
        })
    }

    async fn deployment_domain(
        &self,
        project: &EdgeProject,
        _deployment_id: &str,
    ) -> DeployResult<Option<String>> {
        // The project record is the authority for the live domain.
        let refreshed = self.get_project(&project.name).await?;
        Ok(refreshed
            .subdomain
            .map(|subdomain| format!("https://{subdomain}")))
    }
}
