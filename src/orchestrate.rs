//! High-level pipeline: collect → publish → resolve → persist for one deploy.
//!
//! This module provides the top-level orchestration for deploying a project's
//! generated site. It implements a coordinated pipeline that:
//!   - Checks credentials up front (fatal, no network calls made)
//!   - Collects and normalizes the project's deployable files
//!   - Publishes the snapshot to the source-control host (primary; fatal)
//!   - Publishes the same snapshot to the edge network (secondary; downgraded)
//!   - Resolves the public domain best-effort
//!   - Persists the consolidated outcome back onto the project record
//!
//! # Failure-downgrade policy
//! Primary publish failures abort the whole operation. Secondary publish and
//! domain resolution failures are downgraded: the operation still reports
//! `success = true` with the primary backend's URL and a message naming the
//! step that did not complete. The fire-and-forget deploy trigger is logged
//! only, never surfaced.
//!
//! # Callable From
//! - Used by the CLI crate and integration tests
//! - Expects concrete (async) [`RepoHost`], [`EdgeHost`] and [`ProjectStore`]
//!   implementations, or their mocks

use tracing::{error, info, warn};

use crate::collect;
use crate::config::{Credentials, SiteConfig};
use crate::contract::{DeployOutcome, EdgeHost, ProjectKey, ProjectStore, RepoHost};
use crate::domain;
use crate::edge_publish::EdgePublisher;
use crate::error::{DeployError, DeployResult};
use crate::repo_publish::RepositoryPublisher;

/// Run the full deploy pipeline for one project.
pub async fn deploy<R, E, S>(
    repo_publisher: &RepositoryPublisher<R>,
    edge_publisher: &EdgePublisher<E>,
    store: &S,
    credentials: &Credentials,
    config: &SiteConfig,
) -> DeployResult<DeployOutcome>
where
    R: RepoHost,
    E: EdgeHost,
    S: ProjectStore,
{
    info!(project = %config.project_id, site = %config.site_name, "[DEPLOY] Starting deploy pipeline");

    // --- ResolveCredentials: fatal, before any network call ---
    credentials.ensure_present()?;

    let project_key = project_key(&config.project_id);

    // --- CollectFiles: empty set is fatal ---
    let files = collect::collect(store, &project_key).await?;
    if files.is_empty() {
        return Err(DeployError::NothingToDeploy);
    }

    // --- EnsureBackends (primary) + PublishPrimary: fatal on failure ---
    let description = format!("Generated site for project {}", config.project_id);
    let repo = repo_publisher
        .ensure_repository(&config.site_name, &description)
        .await?;
    let message = config
        .commit_message
        .clone()
        .unwrap_or_else(|| format!("Deploy {} files", files.len()));
    let commit_sha = repo_publisher.publish(&repo, &files, &message).await?;
    let github_url = format!("https://github.com/{}/{}", repo.owner, repo.name);
    info!(commit = %commit_sha, url = %github_url, "[DEPLOY] Primary publish succeeded");

    // Fire-and-forget trigger to the deploy microservice. Logged only.
    if let Err(e) = store.trigger_deploy(&repo.name).await {
        warn!(repo = %repo.name, error = %e, "[DEPLOY] Deploy trigger failed (ignored)");
    }

    // --- PublishSecondary: failures downgraded to a warning ---
    let mut message_parts = vec![format!("Deployed {} files to {}", files.len(), github_url)];
    let mut cloudflare_url = None;
    let mut resolved_domain = None;

    if config.skip_edge {
        info!("[DEPLOY] Edge publish skipped by config");
        message_parts.push("edge publish skipped".to_string());
    } else {
        match publish_secondary(edge_publisher, store, config, &files).await {
            Ok((url, domain)) => {
                message_parts.push(format!("edge deployment live at {url}"));
                cloudflare_url = Some(url);
                resolved_domain = domain;
            }
            Err(e) => {
                error!(error = %e, "[DEPLOY] Edge publish failed; downgrading to warning");
                message_parts.push(format!("edge publish did not complete: {e}"));
            }
        }
    }

    let url = resolved_domain
        .clone()
        .or_else(|| cloudflare_url.clone())
        .unwrap_or_else(|| github_url.clone());

    let outcome = DeployOutcome {
        success: true,
        url,
        github_url: Some(github_url),
        cloudflare_url,
        files_count: files.len(),
        message: message_parts.join("; "),
    };

    // --- PersistResult: the deploy itself succeeded, so downgraded too ---
    if let Err(e) = store.persist_outcome(&project_key, &outcome).await {
        warn!(project = %project_key, error = %e, "[DEPLOY] Outcome persistence failed (ignored)");
    }

    info!(
        files = outcome.files_count,
        url = %outcome.url,
        "[DEPLOY] Pipeline finished"
    );
    Ok(outcome)
}

/// Edge publish plus best-effort domain resolution. Returns the deployment
/// URL and the resolved domain (when found).
async fn publish_secondary<E, S>(
    edge_publisher: &EdgePublisher<E>,
    store: &S,
    config: &SiteConfig,
    files: &[crate::contract::DeployableFile],
) -> DeployResult<(String, Option<String>)>
where
    E: EdgeHost,
    S: ProjectStore,
{
    let project = edge_publisher
        .ensure_project(&config.site_name, &config.branch)
        .await?;
    let deployment = edge_publisher
        .publish(&project, &config.branch, files)
        .await?;

    // --- ResolveDomain: best-effort, never aborts the publish ---
    let domain = domain::resolve(
        edge_publisher.host(),
        store,
        &config.project_id,
        &project,
        &deployment,
    )
    .await;

    Ok((deployment.url, domain))
}

/// The store's records are inconsistent about the identifier shape; prefer
/// numeric when the id parses as one.
fn project_key(project_id: &str) -> ProjectKey {
    match project_id.parse::<i64>() {
        Ok(n) => ProjectKey::Numeric(n),
        Err(_) => ProjectKey::Text(project_id.to_string()),
    }
}
