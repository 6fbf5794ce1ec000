//! Typed client for the Clockify REST API.
//!
//! Every read goes through an injected [`ApiCache`] so repeated menu
//! refreshes hit the network only when an entry is stale or a caller
//! forces a bypass. Mutators re-read the active entry from the remote
//! before returning, so callers always observe post-write truth.

mod client;
pub mod models;

pub use client::{
    ActiveEntryPatch, ApiCache, ClockifyClient, CATALOG_TTL, DEFAULT_BASE_URL, LIVE_TTL,
};
pub use models::{Project, TimeEntry, TimeInterval, User, Workspace};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("api returned {status}: {detail}")]
    Api { status: u16, detail: String },
    #[error("no active time entry")]
    NoActiveEntry,
    #[error("api key is not a valid header value")]
    InvalidApiKey,
}

impl ClientError {
    /// Response-body detail suitable for an error dialog, when the remote
    /// sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Api { detail, .. } if !detail.is_empty() => Some(detail),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
