//! site-ship: publishing pipeline for generated website snapshots.
//!
//! Takes an in-memory set of generated files and gets them live on two
//! backends: a source-control host (atomic replace-all commits) and a
//! static-hosting edge network (content-addressed multipart uploads). The
//! two backends are published to independently with different failure
//! severities; see [`orchestrate::deploy`] for the downgrade policy.

pub mod cli;
pub mod collect;
pub mod config;
pub mod contract;
pub mod domain;
pub mod edge_publish;
pub mod error;
pub mod hasher;
pub mod orchestrate;
pub mod repo_publish;
pub mod store;

pub use contract::{DeployOutcome, DeployableFile};
pub use error::{DeployError, DeployResult};
