//! Client for the Translator Node Normalizer API.
//!
//! Given one or more CURIEs (compact URIs such as `MESH:D014867`), this
//! crate queries a Node Normalizer deployment and returns canonical
//! identifiers, preferred labels, semantic types, and optional equivalence
//! clusters. Arbitrarily long identifier lists are split into bounded
//! batches, issued over GET or POST, and merged into one map that covers
//! every input identifier.
//!
//! # Example
//!
//! ```ignore
//! use nodenorm::{NodeNormClient, NormalizeOptions, RequestMode};
//!
//! let client = NodeNormClient::new();
//! let node = client
//!     .normalize_one("MESH:D014867", RequestMode::Get, &NormalizeOptions::default())
//!     .await?;
//! // node.unwrap().label == Some("Water")
//!
//! let resolved = client
//!     .resolve_preferred_names(&curies, &NormalizeOptions::default())
//!     .await?;
//! ```

pub mod client;
pub mod error;
pub mod types;

pub use client::{
    NodeNormClient, NodeNormClientBuilder, NormalizeOptions, RequestMode, DEFAULT_BATCH_LIMIT,
    POST_BATCH_LIMIT,
};
pub use error::{Error, Result};
pub use types::{NormalizedNode, NormalizedNodes, PreferredNames, RawIdentifier, RawNode};
