//! Error types for the node normalizer client.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON decoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("node normalizer returned status {status}: {body}")]
    Service { status: u16, body: String },

    #[error("batch {first}..{last} failed: {source}")]
    Batch {
        first: String,
        last: String,
        #[source]
        source: Box<Error>,
    },

    #[error("no identifiers to normalize")]
    EmptyBatch,
}

pub type Result<T> = std::result::Result<T, Error>;
