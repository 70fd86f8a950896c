//! Best-effort resolution of the public domain for a deployment.
//!
//! Primary path is the backend's direct domain lookup; when that is absent
//! or answers the known placeholder sentinel, a bounded window of recent log
//! lines is pattern-matched for a deployment URL. A found domain is persisted
//! to the project store under both identifier shapes the store's historical
//! records use, numeric first. Nothing here ever fails an otherwise
//! successful publish.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::contract::{Deployment, EdgeHost, EdgeProject, ProjectKey, ProjectStore};

/// Subdomain the backend reports before a real one is assigned.
const PLACEHOLDER_DOMAIN: &str = "example.pages.dev";
/// How many recent log lines the fallback scans.
const LOG_WINDOW: usize = 50;
/// One fixed delay before the single follow-up log read; no poll loop.
const FOLLOW_UP_DELAY: Duration = Duration::from_secs(2);

fn domain_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https://[^\s]+\.pages\.dev[^\s]*").expect("valid regex"))
}

/// Resolve the public URL for a deployment, best-effort.
///
/// Returns `None` when neither the direct lookup nor the log fallback finds
/// a usable domain; errors along the way are logged and collapsed to `None`.
pub async fn resolve<E, S>(
    edge: &E,
    store: &S,
    project_id: &str,
    project: &EdgeProject,
    deployment: &Deployment,
) -> Option<String>
where
    E: EdgeHost + ?Sized,
    S: ProjectStore + ?Sized,
{
    let direct = match edge.deployment_domain(project, &deployment.id).await {
        Ok(domain) => domain,
        Err(e) => {
            warn!(project = %project.name, error = %e, "[DOMAIN] Direct domain lookup failed");
            None
        }
    };

    let domain = match direct {
        Some(d) if !d.contains(PLACEHOLDER_DOMAIN) => Some(d),
        other => {
            if other.is_some() {
                debug!(project = %project.name, "[DOMAIN] Direct lookup answered the placeholder");
            }
            tokio::time::sleep(FOLLOW_UP_DELAY).await;
            scrape_logs(store, project_id).await
        }
    };

    if let Some(url) = &domain {
        info!(project = project_id, url = %url, "[DOMAIN] Resolved public domain");
        persist_domain(store, project_id, url).await;
    } else {
        debug!(project = project_id, "[DOMAIN] No domain resolved; caller may retry later");
    }
    domain
}

/// Read a bounded window of recent log lines and extract a deployment URL.
async fn scrape_logs<S>(store: &S, project_id: &str) -> Option<String>
where
    S: ProjectStore + ?Sized,
{
    let key = ProjectKey::Text(project_id.to_string());
    let logs = match store.recent_logs(&key, LOG_WINDOW).await {
        Ok(lines) => lines,
        Err(e) => {
            warn!(project = project_id, error = %e, "[DOMAIN] Log read failed");
            return None;
        }
    };
    extract_domain_from_logs(&logs)
}

/// Pattern-match a deployment URL out of log lines, newest line winning.
/// Trailing sentence punctuation is trimmed from the capture.
pub fn extract_domain_from_logs(lines: &[String]) -> Option<String> {
    lines.iter().rev().find_map(|line| {
        domain_pattern().find(line).map(|m| {
            m.as_str()
                .trim_end_matches(['.', ',', '!', ';', ':', ')'])
                .to_string()
        })
    })
}

/// Persist the resolved domain under both identifier shapes the store's
/// records use: numeric first, then string. Both attempts are best-effort.
async fn persist_domain<S>(store: &S, project_id: &str, url: &str)
where
    S: ProjectStore + ?Sized,
{
    let mut keys = Vec::new();
    if let Ok(numeric) = project_id.parse::<i64>() {
        keys.push(ProjectKey::Numeric(numeric));
    }
    keys.push(ProjectKey::Text(project_id.to_string()));

    for key in keys {
        match store.save_domain(&key, url).await {
            Ok(()) => {
                debug!(project = %key, url, "[DOMAIN] Domain persisted");
                return;
            }
            Err(e) => {
                warn!(project = %key, error = %e, "[DOMAIN] Domain persistence attempt failed");
            }
        }
    }
}
