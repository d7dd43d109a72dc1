#![forbid(unsafe_code)]

use gtd_core::{DecodeError, EntityKind};
use gtd_storage::StoreError;

/// Failure talking to the chat platform. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{msg}")]
    Api { msg: String },
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum GtdError {
    /// No cascade strategy matched.
    #[error("Unable to find {kind}: {attributes}")]
    UnableToFind {
        kind: EntityKind,
        attributes: String,
    },
    /// The topic has no first message to anchor an id on.
    #[error("Unable to find the first message of topic '{topic}' in channel {channel_id}")]
    MissingAnchor { channel_id: u64, topic: String },
    #[error("#**{channel}** is neither a project list nor a context")]
    Unmanaged { channel: String },
    /// A command precondition the user has to fix.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl GtdError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Errors a batch sweep records per topic instead of aborting.
    pub fn is_per_topic(&self) -> bool {
        matches!(self, Self::UnableToFind { .. } | Self::MissingAnchor { .. })
    }
}
