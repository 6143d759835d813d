//! Caller-facing error taxonomy.
//!
//! Fetch-layer failures (network, timeout, malformed XML/JSON) never show up
//! here; they degrade to empty results at the adapter boundary. Only bad
//! request parameters and persistence failures propagate.

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Bad query parameters; maps to a client error at the transport layer.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The durable store could not be read; there is no safe local fallback
    /// for listening history or preferences.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}
