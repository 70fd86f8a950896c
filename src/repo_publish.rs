//! Repository publishing: full-replacement commits against the git host.
//!
//! [`RepositoryPublisher`] drives any [`RepoHost`] implementation; the
//! concrete [`GithubClient`] talks to the GitHub REST API with bearer-token
//! auth. The publish strategy is deliberate replace-all: the tree is built
//! without a base tree, so files omitted from the current snapshot are
//! implicitly deleted, while the commit still parents on the previous head so
//! version history survives.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::contract::{RepoHost, RepositoryRef, TreeEntry};
use crate::error::{DeployError, DeployResult};

const BACKEND: &str = "github";
const GITHUB_API_BASE: &str = "https://api.github.com";
const BLOB_CONCURRENCY: usize = 8;

/// Bounded exponential backoff for the repository-initialization wait.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub multiplier: u32,
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            multiplier: 2,
            max_attempts: 5,
        }
    }
}

/// High-level repository publisher over any [`RepoHost`].
pub struct RepositoryPublisher<H> {
    host: H,
    backoff: BackoffPolicy,
}

impl<H: RepoHost> RepositoryPublisher<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_backoff(host: H, backoff: BackoffPolicy) -> Self {
        Self { host, backoff }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Get the repository, creating it with an initializing commit when the
    /// existence check answers not-found.
    ///
    /// The post-create initialization wait is best-effort: when every poll
    /// attempt is exhausted the method still returns normally (with
    /// `head_commit_sha: None`), since the subsequent publish can succeed
    /// against a lagging backend.
    pub async fn ensure_repository(
        &self,
        name: &str,
        description: &str,
    ) -> DeployResult<RepositoryRef> {
        match self.host.get_repo(name).await {
            Ok(repo) => {
                debug!(repo = name, "[REPO] Repository exists");
                Ok(repo)
            }
            Err(e) if e.is_not_found() => {
                info!(repo = name, "[REPO] Repository missing; creating with auto-init");
                let mut repo = self.host.create_repo(name, description).await?;
                repo.head_commit_sha = self.wait_for_initialization(&repo).await;
                Ok(repo)
            }
            Err(e) => {
                error!(repo = name, error = %e, "[REPO] Repository existence check failed");
                Err(e)
            }
        }
    }

    /// Poll for the branch ref of a freshly created repository with bounded
    /// exponential backoff. Returns the head sha once visible, or `None`
    /// after exhausting all attempts — deliberately non-fatal.
    async fn wait_for_initialization(&self, repo: &RepositoryRef) -> Option<String> {
        let mut delay = self.backoff.base_delay;
        for attempt in 1..=self.backoff.max_attempts {
            match self.host.get_branch_ref(repo).await {
                Ok(sha) => {
                    info!(repo = %repo.name, attempt, "[REPO] Repository initialized");
                    return Some(sha);
                }
                Err(e) => {
                    debug!(
                        repo = %repo.name,
                        attempt,
                        error = %e,
                        "[REPO] Initialization not visible yet"
                    );
                }
            }
            if attempt < self.backoff.max_attempts {
                tokio::time::sleep(delay).await;
                delay *= self.backoff.multiplier;
            }
        }
        warn!(
            repo = %repo.name,
            attempts = self.backoff.max_attempts,
            "[REPO] Initialization wait exhausted; proceeding anyway"
        );
        None
    }

    /// Publish the complete file snapshot as one commit and force-update the
    /// branch ref to it. Returns the new commit sha.
    pub async fn publish(
        &self,
        repo: &RepositoryRef,
        files: &[crate::contract::DeployableFile],
        message: &str,
    ) -> DeployResult<String> {
        if files.is_empty() {
            return Err(DeployError::NothingToDeploy);
        }

        // Absence of the ref is tolerated: fresh repo whose init commit has
        // not materialised.
        let parent = match self.host.get_branch_ref(repo).await {
            Ok(sha) => Some(sha),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        // One blob per file. Each call is independent and content-addressed,
        // so this fans out with bounded concurrency for throughput only.
        let entries: Vec<TreeEntry> = stream::iter(files.iter().map(|file| async move {
            let content = String::from_utf8_lossy(&file.content);
            let sha = self.host.create_blob(repo, &content).await?;
            debug!(path = %file.path, sha = %sha, "[REPO] Blob created");
            Ok::<TreeEntry, DeployError>(TreeEntry {
                path: file.path.trim_start_matches('/').to_string(),
                mode: "100644".to_string(),
                kind: "blob".to_string(),
                sha,
            })
        }))
        .buffered(BLOB_CONCURRENCY)
        .try_collect()
        .await?;

        // No base tree: the snapshot replaces the previous state entirely.
        let tree_sha = self.host.create_tree(repo, &entries).await?;
        let commit_sha = self
            .host
            .create_commit(repo, message, &tree_sha, parent)
            .await?;
        self.host.force_update_ref(repo, &commit_sha).await?;

        info!(
            repo = %repo.name,
            files = files.len(),
            commit = %commit_sha,
            "[REPO] Published snapshot"
        );
        Ok(commit_sha)
    }
}

/// GitHub REST client implementing [`RepoHost`].
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    owner: String,
}

impl GithubClient {
    pub fn new(owner: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_base_url(GITHUB_API_BASE, owner, token)
    }

    /// Custom API base, for tests against a local server.
    pub fn with_base_url(
        base_url: impl Into<String>,
        owner: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            owner: owner.into(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "site-ship")
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
struct RepoResponse {
    name: String,
    default_branch: Option<String>,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct ShaResponse {
    sha: String,
}

#[async_trait]
impl RepoHost for GithubClient {
    async fn get_repo(&self, name: &str) -> DeployResult<RepositoryRef> {
        let path = format!("/repos/{}/{}", self.owner, name);
        let resource = format!("repository {}/{}", self.owner, name);
        let repo: RepoResponse = self
            .send_json(self.request(Method::GET, &path), &resource)
            .await?;
        Ok(RepositoryRef {
            owner: self.owner.clone(),
            name: repo.name,
            default_branch: repo.default_branch.unwrap_or_else(|| "main".to_string()),
            head_commit_sha: None,
        })
    }

    async fn create_repo(&self, name: &str, description: &str) -> DeployResult<RepositoryRef> {
        let body = json!({
            "name": name,
            "description": description,
            "private": false,
            "auto_init": true,
        });
        let repo: RepoResponse = self
            .send_json(
                self.request(Method::POST, "/user/repos").json(&body),
                "repository creation",
            )
            .await?;
        Ok(RepositoryRef {
            owner: self.owner.clone(),
            name: repo.name,
            default_branch: repo.default_branch.unwrap_or_else(|| "main".to_string()),
            head_commit_sha: None,
        })
    }

    async fn get_branch_ref(&self, repo: &RepositoryRef) -> DeployResult<String> {
        let path = format!(
            "/repos/{}/{}/git/ref/heads/{}",
            repo.owner, repo.name, repo.default_branch
        );
        let resource = format!("ref heads/{}", repo.default_branch);
        let reference: RefResponse = self
            .send_json(self.request(Method::GET, &path), &resource)
            .await?;
        Ok(reference.object.sha)
    }

    async fn create_blob(&self, repo: &RepositoryRef, content: &str) -> DeployResult<String> {
        let path = format!("/repos/{}/{}/git/blobs", repo.owner, repo.name);
        let body = json!({ "content": content, "encoding": "utf-8" });
        let blob: ShaResponse = self
            .send_json(self.request(Method::POST, &path).json(&body), "blob")
            .await?;
        Ok(blob.sha)
    }

    async fn create_tree(
        &self,
        repo: &RepositoryRef,
        entries: &[TreeEntry],
    ) -> DeployResult<String> {
        let path = format!("/repos/{}/{}/git/trees", repo.owner, repo.name);
        let tree: Vec<_> = entries
            .iter()
            .map(|entry| {
                json!({
                    "path": entry.path,
                    "mode": entry.mode,
                    "type": entry.kind,
                    "sha": entry.sha,
                })
            })
            .collect();
        // Deliberately no `base_tree`: omitted files are implicitly deleted.
        let body = json!({ "tree": tree });
        let created: ShaResponse = self
            .send_json(self.request(Method::POST, &path).json(&body), "tree")
            .await?;
        Ok(created.sha)
    }

    async fn create_commit(
        &self,
        repo: &RepositoryRef,
        message: &str,
        tree_sha: &str,
        parent: Option<String>,
    ) -> DeployResult<String> {
        let path = format!("/repos/{}/{}/git/commits", repo.owner, repo.name);
        let parents: Vec<String> = parent.into_iter().collect();
        let body = json!({ "message": message, "tree": tree_sha, "parents": parents });
        let commit: ShaResponse = self
            .send_json(self.request(Method::POST, &path).json(&body), "commit")
            .await?;
        Ok(commit.sha)
    }

    async fn force_update_ref(&self, repo: &RepositoryRef, sha: &str) -> DeployResult<()> {
        let path = format!(
            "/repos/{}/{}/git/refs/heads/{}",
            repo.owner, repo.name, repo.default_branch
        );
        let body = json!({ "sha": sha, "force": true });
        let _: RefResponse = self
            .send_json(
                self.request(Method::PATCH, &path).json(&body),
                "ref update",
            )
            .await?;
        Ok(())
    }
}
