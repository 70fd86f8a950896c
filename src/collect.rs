//! File collection: turn a project's stored pages into a deployable file set.
//!
//! Pure transform over the store's current snapshot — no side effects. The
//! collector normalizes paths, falls back to the legacy single-document field
//! for projects predating per-page rows, and synthesizes a minimal build
//! manifest when the generation pass left none, so the publish targets are
//! self-contained.
//!
//! Note that the downstream commit strategy is full-replacement: anything the
//! collector fails to include here is deleted on the backend as if it were an
//! intentional removal.

use tracing::{debug, info, warn};

use crate::contract::{DeployableFile, ProjectKey, ProjectStore};
use crate::error::{DeployError, DeployResult};
use crate::hasher::leading_slash;

const BUILD_MANIFEST_PATH: &str = "/wrangler.toml";

/// Collect the deployable files of a project from the external store.
///
/// Empty result is fatal upstream: [`DeployError::NothingToDeploy`].
pub async fn collect<S>(store: &S, project: &ProjectKey) -> DeployResult<Vec<DeployableFile>>
where
    S: ProjectStore + ?Sized,
{
    let pages = store.list_pages(project).await?;

    let mut files: Vec<DeployableFile> = Vec::with_capacity(pages.len());
    if pages.is_empty() {
        // Legacy projects store one full HTML document instead of pages.
        match store.legacy_document(project).await? {
            Some(document) => {
                warn!(project = %project, "[COLLECT] No pages; using legacy document fallback");
                files.push(DeployableFile {
                    path: "/index.html".to_string(),
                    content: document.into_bytes(),
                });
            }
            None => {
                warn!(project = %project, "[COLLECT] Project has no pages and no legacy document");
                return Err(DeployError::NothingToDeploy);
            }
        }
    } else {
        for page in pages {
            files.push(DeployableFile {
                path: normalize_page_path(&page.path),
                content: page.content.into_bytes(),
            });
        }
    }

    if !files.iter().any(|f| f.path == BUILD_MANIFEST_PATH) {
        debug!(path = BUILD_MANIFEST_PATH, "[COLLECT] Injecting default build manifest");
        files.push(DeployableFile {
            path: BUILD_MANIFEST_PATH.to_string(),
            content: default_build_manifest(project).into_bytes(),
        });
    }

    info!(project = %project, files = files.len(), "[COLLECT] Collected deployable files");
    Ok(files)
}

/// Normalize a stored page path: exactly one leading slash, and `.html`
/// forced onto extensionless page paths so the edge host serves them as
/// documents.
pub fn normalize_page_path(path: &str) -> String {
    let path = leading_slash(path.trim());
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    if last_segment.is_empty() {
        return format!("{path}index.html");
    }
    if last_segment.contains('.') {
        path
    } else {
        format!("{path}.html")
    }
}

fn default_build_manifest(project: &ProjectKey) -> String {
    format!(
        "name = \"site-{project}\"\npages_build_output_dir = \".\"\n"
    )
}
