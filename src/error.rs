//! Error taxonomy for the deploy pipeline.
//!
//! Every failure a publish step can hit is classified here so the
//! orchestrator can decide between aborting and downgrading:
//! - [`DeployError::Auth`] and [`DeployError::Validation`]/[`DeployError::NothingToDeploy`]
//!   are fatal and raised before any network call.
//! - [`DeployError::NotFound`] is the expected outcome of an existence check
//!   and drives create-on-demand logic; it never aborts on its own.
//! - [`DeployError::Backend`]/[`DeployError::Network`] abort whichever publish
//!   step produced them; the orchestrator then decides severity by step.

use thiserror::Error;

/// All errors produced by the publish pipeline.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Missing or invalid credential. Raised before any network call.
    #[error("missing or invalid credential: {0}")]
    Auth(String),

    /// A resource-existence check came back 404. Recoverable by creation.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The backend answered with a non-404 error status.
    #[error("{backend} returned {status}: {message}")]
    Backend {
        backend: &'static str,
        status: u16,
        message: String,
    },

    /// The request never produced a response (DNS, TLS, connect, timeout).
    #[error("network error talking to {backend}: {source}")]
    Network {
        backend: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Malformed input, checked before any network call.
    #[error("invalid deploy input: {0}")]
    Validation(String),

    /// The collector produced an empty file set.
    #[error("project has no deployable files")]
    NothingToDeploy,

    /// Two different byte payloads hashed to the same digest. Integrity
    /// check, not an expected runtime path.
    #[error("digest collision between {existing} and {incoming} ({digest})")]
    HashCollision {
        existing: String,
        incoming: String,
        digest: String,
    },

    /// A backend response could not be decoded.
    #[error("could not decode {backend} response: {source}")]
    Decode {
        backend: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl DeployError {
    /// True when this error is the recoverable not-found class.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DeployError::NotFound { .. })
    }
}

pub type DeployResult<T> = Result<T, DeployError>;
