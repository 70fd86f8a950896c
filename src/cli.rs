use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::{load_config, Credentials};
use crate::edge_publish::{CloudflareClient, EdgePublisher};
use crate::orchestrate;
use crate::repo_publish::{GithubClient, RepositoryPublisher};
use crate::store::RestProjectStore;

/// CLI for site-ship: publish generated site snapshots to both backends.
#[derive(Parser)]
#[clap(
    name = "site-ship",
    version,
    about = "Publish a generated website snapshot to a git host and an edge network"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy the site described by the given config file
    Deploy {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Deploy { config } => {
            let site = load_config(config)?;
            let credentials = Credentials::from_env()?;

            let repo_publisher = RepositoryPublisher::new(GithubClient::new(
                credentials.github_owner.clone(),
                credentials.github_token.clone(),
            ));
            let edge_publisher = EdgePublisher::new(CloudflareClient::new(
                credentials.cloudflare_account_id.clone(),
                credentials.cloudflare_token.clone(),
            ));
            let store = RestProjectStore::new(
                credentials.store_base_url.clone(),
                credentials.store_token.clone(),
            );

            println!("Deploy starting...");
            match orchestrate::deploy(&repo_publisher, &edge_publisher, &store, &credentials, &site)
                .await
            {
                Ok(outcome) => {
                    println!("Deploy complete.");
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("[ERROR] Deploy failed: {e}");
                    Err(e.into())
                }
            }
        }
    }
}
