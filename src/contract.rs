//! # contract: interfaces to the three external collaborators
//!
//! This module defines the traits the pipeline talks through and the plain
//! data types that cross those boundaries:
//! - [`ProjectStore`]: the application backend that owns project records —
//!   lists a project's generated files, persists deployment results, serves
//!   recent log lines and the fire-and-forget deploy trigger.
//! - [`RepoHost`]: the source-control REST API (blobs, trees, commits, refs).
//! - [`EdgeHost`]: the edge-hosting REST API (projects, content-addressed
//!   deployments, domain lookup).
//!
//! ## Interface & Extensibility
//! - All methods are async and return concrete [`DeployError`] values so
//!   callers can match on severity (404 vs. backend failure vs. network).
//! - The traits are annotated for `mockall` so tests can generate
//!   deterministic mocks; real clients live in `repo_publish`, `edge_publish`
//!   and `store`.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::DeployError;

/// One file of the site snapshot, path normalized, content opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployableFile {
    /// Public path with a single leading slash, e.g. `/blog/index.html`.
    pub path: String,
    /// Raw bytes; decoded to text only where a backend API requires it.
    pub content: Vec<u8>,
}

/// A generated page row as the project store returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredPage {
    pub path: String,
    pub content: String,
}

/// Mapping from public path to content digest.
///
/// Keys are unique; two paths carrying byte-identical content map to the
/// same digest value.
pub type ContentManifest = BTreeMap<String, String>;

/// The store's historical project records are inconsistent about the shape
/// of the project identifier, so writes may have to be attempted under both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectKey {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectKey::Numeric(n) => write!(f, "{n}"),
            ProjectKey::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Long-lived pointer to a source-control repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    /// Absent for a freshly created repository whose first commit has not
    /// materialised yet.
    pub head_commit_sha: Option<String>,
}

/// One entry of a complete tree snapshot. A snapshot has no relationship to
/// any prior snapshot: omission of a path means the path no longer exists
/// after publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    pub kind: String,
    pub sha: String,
}

/// Long-lived edge-hosting project, created once per logical site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeProject {
    pub name: String,
    pub account_id: String,
    /// The `<name>.pages.dev`-style subdomain, when the backend reports one.
    pub subdomain: Option<String>,
}

/// Durable result of one edge-publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub id: String,
    pub url: String,
    pub created_at: Option<String>,
}

/// Everything one edge deployment request carries: the path→digest manifest,
/// the deduplicated blobs (one per unique digest) and the routing config that
/// marks all paths as servable static assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPayload {
    pub manifest: ContentManifest,
    /// `(digest, bytes)` pairs, exactly one per unique digest.
    pub blobs: Vec<(String, Vec<u8>)>,
    /// Serialized `_routes.json` body.
    pub routes: String,
}

/// Consolidated caller-facing result of one deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutcome {
    pub success: bool,
    /// The primary public URL: the resolved edge domain when available,
    /// otherwise the repository URL.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloudflare_url: Option<String>,
    pub files_count: usize,
    pub message: String,
}

/// The application backend that owns project records.
///
/// Consumed through exactly two contracts — "list the current files of a
/// project" and "persist deployment result fields back onto the project
/// record" — plus the auxiliary log-read and deploy-trigger endpoints the
/// same backend exposes.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Current generated pages of the project.
    async fn list_pages(&self, project: &ProjectKey) -> Result<Vec<StoredPage>, DeployError>;

    /// Legacy single-document fallback for projects predating per-page rows.
    async fn legacy_document(&self, project: &ProjectKey)
        -> Result<Option<String>, DeployError>;

    /// Write the consolidated deploy result back onto the project record.
    async fn persist_outcome(
        &self,
        project: &ProjectKey,
        outcome: &DeployOutcome,
    ) -> Result<(), DeployError>;

    /// Associate a resolved public domain with the project record.
    async fn save_domain(&self, project: &ProjectKey, domain: &str) -> Result<(), DeployError>;

    /// Bounded window of recent log lines for the project, newest last.
    async fn recent_logs(
        &self,
        project: &ProjectKey,
        limit: usize,
    ) -> Result<Vec<String>, DeployError>;

    /// Fire-and-forget notification to the deploy microservice.
    async fn trigger_deploy(&self, repo_id: &str) -> Result<(), DeployError>;
}

/// Source-control REST API surface used by the repository publisher.
///
/// Existence checks answer `DeployError::NotFound` on 404; every other error
/// status surfaces as `DeployError::Backend` with the backend's status code
/// and message.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepoHost: Send + Sync {
    async fn get_repo(&self, name: &str) -> Result<RepositoryRef, DeployError>;

    /// Create the repository with an initializing commit (`auto_init`).
    async fn create_repo(
        &self,
        name: &str,
        description: &str,
    ) -> Result<RepositoryRef, DeployError>;

    /// Head commit sha of the default branch.
    async fn get_branch_ref(&self, repo: &RepositoryRef) -> Result<String, DeployError>;

    /// Upload one content blob; returns the backend's sha for it. The
    /// backend's addressing scheme is independent of the manifest digests.
    async fn create_blob(&self, repo: &RepositoryRef, content: &str)
        -> Result<String, DeployError>;

    /// Create a complete tree snapshot. Implementations must not reference
    /// any prior tree as a base: omitted paths are implicitly deleted.
    async fn create_tree(
        &self,
        repo: &RepositoryRef,
        entries: &[TreeEntry],
    ) -> Result<String, DeployError>;

    async fn create_commit(
        &self,
        repo: &RepositoryRef,
        message: &str,
        tree_sha: &str,
        parent: Option<String>,
    ) -> Result<String, DeployError>;

    /// Force-update the branch ref to the given commit. Non-fast-forward
    /// updates must be allowed, since content is intentionally rewritten.
    async fn force_update_ref(&self, repo: &RepositoryRef, sha: &str)
        -> Result<(), DeployError>;
}

/// Edge-hosting REST API surface used by the edge publisher.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait EdgeHost: Send + Sync {
    async fn get_project(&self, name: &str) -> Result<EdgeProject, DeployError>;

    async fn create_project(&self, name: &str, branch: &str) -> Result<EdgeProject, DeployError>;

    /// One call that atomically creates a new deployment from the payload.
    /// The backend keeps the previous deployment live until the new one is
    /// ready, so callers never observe a half-published state.
    async fn create_deployment(
        &self,
        project: &EdgeProject,
        branch: &str,
        payload: &DeploymentPayload,
    ) -> Result<Deployment, DeployError>;

    /// Direct domain lookup for a deployment, when the backend knows it.
    async fn deployment_domain(
        &self,
        project: &EdgeProject,
        deployment_id: &str,
    ) -> Result<Option<String>, DeployError>;
}
