//! Deploy configuration: static YAML file plus env-var secrets.
//!
//! The YAML file carries everything safe to commit (site name, branch,
//! flags); credentials come exclusively from the environment (optionally via
//! `.env`). `Credentials::from_env` fails with an auth-class error before any
//! network call is attempted.

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{DeployError, DeployResult};

/// Static, committable deploy settings for one site.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Identifier of the project record in the external store.
    pub project_id: String,
    /// Name used for both the repository and the edge project.
    pub site_name: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub commit_message: Option<String>,
    /// Skip the edge publish entirely (repository-only deploy).
    #[serde(default)]
    pub skip_edge: bool,
}

fn default_branch() -> String {
    "main".to_string()
}

impl SiteConfig {
    pub fn trace_loaded(&self) {
        info!(
            project_id = %self.project_id,
            site_name = %self.site_name,
            branch = %self.branch,
            skip_edge = self.skip_edge,
            "Loaded SiteConfig"
        );
    }
}

/// Secrets and account coordinates, sourced from the environment.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub github_owner: String,
    pub github_token: String,
    pub cloudflare_account_id: String,
    pub cloudflare_token: String,
    /// Base URL of the application backend (project store).
    pub store_base_url: String,
    pub store_token: String,
}

impl Credentials {
    /// Load all credentials from the environment, `.env` honoured.
    pub fn from_env() -> DeployResult<Self> {
        dotenvy::dotenv().ok();
        Ok(Self {
            github_owner: require("GITHUB_OWNER")?,
            github_token: require("GITHUB_TOKEN")?,
            cloudflare_account_id: require("CLOUDFLARE_ACCOUNT_ID")?,
            cloudflare_token: require("CLOUDFLARE_API_TOKEN")?,
            store_base_url: require("STORE_BASE_URL")?,
            store_token: require("STORE_API_TOKEN")?,
        })
    }

    /// Cheap presence check; no network calls.
    pub fn ensure_present(&self) -> DeployResult<()> {
        for (name, value) in [
            ("GITHUB_OWNER", &self.github_owner),
            ("GITHUB_TOKEN", &self.github_token),
            ("CLOUDFLARE_ACCOUNT_ID", &self.cloudflare_account_id),
            ("CLOUDFLARE_API_TOKEN", &self.cloudflare_token),
            ("STORE_BASE_URL", &self.store_base_url),
            ("STORE_API_TOKEN", &self.store_token),
        ] {
            if value.trim().is_empty() {
                return Err(DeployError::Auth(format!("{name} is empty")));
            }
        }
        Ok(())
    }
}

fn require(name: &str) -> DeployResult<String> {
    std::env::var(name).map_err(|_| {
        error!(var = name, "Required environment variable not set");
        DeployError::Auth(format!("{name} environment variable not set"))
    })
}

/// Load the static YAML site config from disk.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SiteConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: SiteConfig = match serde_yaml_ng::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    config.trace_loaded();
    Ok(config)
}
