//! Node Normalizer REST API client.
//!
//! API docs: https://nodenorm.transltr.io/docs

use std::collections::BTreeMap;

use futures::future::try_join_all;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{NormalizedNode, NormalizedNodes, PreferredNames, RawNode};

/// Base URL for the public Node Normalizer deployment.
const NODENORM_BASE_URL: &str = "https://nodenorm.transltr.io";

/// Default batch size for read-style (GET) queries, where identifiers
/// travel in the URL.
pub const DEFAULT_BATCH_LIMIT: usize = 500;

/// Default batch size for write-style (POST) resolution; larger because the
/// identifier list travels in the request body.
pub const POST_BATCH_LIMIT: usize = 900;

/// Transport mode for a normalization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Repeated `curie` query parameters. Human-debuggable URLs, but
    /// subject to URL-length limits; suited to small batches.
    Get,
    /// JSON body with a `curies` array; suited to large batches.
    Post,
}

/// Per-request options.
///
/// Unset flags are omitted from the request so the service's own defaults
/// apply. Parameters this client does not know about can be forwarded via
/// `extra`.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Populate `synonym_labels`/`synonym_identifiers` from the service's
    /// equivalence cluster for each matched identifier.
    pub return_equivalent_identifiers: bool,
    /// Merge genes with their protein products (wire name `conflate`).
    pub gene_protein_conflation: Option<bool>,
    /// Merge drugs with their chemical forms (wire name
    /// `drug_chemical_conflate`).
    pub drug_chemical_conflation: Option<bool>,
    /// Ask the service for entity descriptions (wire name `description`).
    pub include_descriptions: Option<bool>,
    /// Additional parameters passed through to the service unmodified.
    pub extra: BTreeMap<String, Value>,
}

impl NormalizeOptions {
    fn named_flags(&self) -> impl Iterator<Item = (&'static str, bool)> {
        [
            ("conflate", self.gene_protein_conflation),
            ("drug_chemical_conflate", self.drug_chemical_conflation),
            ("description", self.include_descriptions),
        ]
        .into_iter()
        .filter_map(|(name, flag)| flag.map(|value| (name, value)))
    }
}

/// Node Normalizer API client.
///
/// All configuration is construction-time state, so clients pointed at
/// different deployments (e.g. CI vs. production) can coexist.
#[derive(Debug, Clone)]
pub struct NodeNormClient {
    http: reqwest::Client,
    base_url: String,
    batch_limit: usize,
}

impl Default for NodeNormClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeNormClient {
    /// Create a client for the public Node Normalizer deployment.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::builder().base_url(base_url).build()
    }

    /// Create a builder for custom configuration.
    pub fn builder() -> NodeNormClientBuilder {
        NodeNormClientBuilder::new()
    }

    /// Fetch the service's health document, passed through unmodified.
    pub async fn status(&self) -> Result<Value> {
        let url = format!("{}/status", self.base_url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Service {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Normalize a single CURIE.
    ///
    /// Returns `None` when the service does not know the identifier.
    pub async fn normalize_one(
        &self,
        curie: &str,
        mode: RequestMode,
        options: &NormalizeOptions,
    ) -> Result<Option<NormalizedNode>> {
        let query = [curie.to_string()];
        let mut normalized = self.normalize_batch(&query, mode, options).await?;
        Ok(normalized.remove(curie).flatten())
    }

    /// Normalize one bounded batch of CURIEs in a single request.
    ///
    /// The returned map contains every queried identifier exactly once;
    /// identifiers the service does not recognize map to `None`. The batch
    /// must be non-empty, and callers are responsible for keeping it within
    /// whatever size the service accepts (see [`NodeNormClient::normalize_all`]).
    pub async fn normalize_batch(
        &self,
        identifiers: &[String],
        mode: RequestMode,
        options: &NormalizeOptions,
    ) -> Result<NormalizedNodes> {
        if identifiers.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let url = format!("{}/get_normalized_nodes", self.base_url);
        let request = match mode {
            RequestMode::Get => self
                .http
                .get(&url)
                .query(&build_get_params(identifiers, options)),
            RequestMode::Post => self
                .http
                .post(&url)
                .json(&build_post_body(identifiers, options)),
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Service {
                status: status.as_u16(),
                body,
            });
        }

        decode_batch(identifiers, &body, options.return_equivalent_identifiers)
    }

    /// Normalize an arbitrarily long identifier list, split into contiguous
    /// order-preserving chunks of at most `batch_limit`.
    ///
    /// Chunks carry disjoint key sets and are issued concurrently; the
    /// merge is a plain key union. The first chunk failure aborts the whole
    /// call with that chunk's identifier range attached, and no partial map
    /// is returned. An empty input yields an empty map.
    pub async fn normalize_all(
        &self,
        identifiers: &[String],
        batch_limit: usize,
        mode: RequestMode,
        options: &NormalizeOptions,
    ) -> Result<NormalizedNodes> {
        // chunks() panics on zero.
        let limit = batch_limit.max(1);

        let batches = identifiers.chunks(limit).map(|chunk| async move {
            self.normalize_batch(chunk, mode, options)
                .await
                .map_err(|source| Error::Batch {
                    first: chunk[0].clone(),
                    last: chunk[chunk.len() - 1].clone(),
                    source: Box::new(source),
                })
        });

        let mut merged = NormalizedNodes::with_capacity(identifiers.len());
        for batch in try_join_all(batches).await? {
            merged.extend(batch);
        }
        Ok(merged)
    }

    /// Resolve every identifier to a display name.
    ///
    /// Uses POST batching with the client's configured batch limit, since
    /// identifier lists here are typically large. Identifiers the service
    /// does not recognize, or recognizes without a preferred label, fall
    /// back to the identifier itself and are reported in the unresolved
    /// list. Only transport and service failures are errors.
    pub async fn resolve_preferred_names(
        &self,
        identifiers: &[String],
        options: &NormalizeOptions,
    ) -> Result<PreferredNames> {
        let normalized = self
            .normalize_all(identifiers, self.batch_limit, RequestMode::Post, options)
            .await?;

        let resolved = fold_preferred_names(identifiers, &normalized);
        if !resolved.unresolved.is_empty() {
            warn!(
                "node normalizer does not know about these identifiers: {}",
                resolved.unresolved.join(",")
            );
        }
        Ok(resolved)
    }
}

/// Builder for [`NodeNormClient`].
pub struct NodeNormClientBuilder {
    base_url: String,
    batch_limit: usize,
    http: Option<reqwest::Client>,
}

impl NodeNormClientBuilder {
    fn new() -> Self {
        Self {
            base_url: NODENORM_BASE_URL.to_string(),
            batch_limit: POST_BATCH_LIMIT,
            http: None,
        }
    }

    /// Point the client at a different deployment (e.g. nodenorm.ci.transltr.io).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Batch size used by preferred-name resolution.
    pub fn batch_limit(mut self, batch_limit: usize) -> Self {
        self.batch_limit = batch_limit;
        self
    }

    /// Use a pre-configured HTTP client (request timeouts, proxies,
    /// connection pooling).
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the client.
    pub fn build(self) -> NodeNormClient {
        NodeNormClient {
            http: self.http.unwrap_or_else(reqwest::Client::new),
            base_url: self.base_url.trim_end_matches('/').to_string(),
            batch_limit: self.batch_limit,
        }
    }
}

/// Encode a GET request: one `curie` parameter per identifier, then the
/// option flags, then any passthrough parameters.
fn build_get_params(identifiers: &[String], options: &NormalizeOptions) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = identifiers
        .iter()
        .map(|curie| ("curie".to_string(), curie.clone()))
        .collect();
    for (name, value) in options.named_flags() {
        params.push((name.to_string(), value.to_string()));
    }
    for (name, value) in &options.extra {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        params.push((name.clone(), value));
    }
    params
}

/// Encode a POST body: `{"curies": [...]}` plus option flags and
/// passthrough parameters.
fn build_post_body(identifiers: &[String], options: &NormalizeOptions) -> Value {
    let mut body = serde_json::Map::new();
    body.insert("curies".to_string(), json!(identifiers));
    for (name, value) in options.named_flags() {
        body.insert(name.to_string(), Value::Bool(value));
    }
    for (name, value) in &options.extra {
        body.insert(name.clone(), value.clone());
    }
    Value::Object(body)
}

/// Decode a response body into a result map that is total over
/// `identifiers`: unknown identifiers map to `None`, and identifiers the
/// service left out of the response entirely still get an explicit
/// no-match entry.
fn decode_batch(identifiers: &[String], body: &str, with_synonyms: bool) -> Result<NormalizedNodes> {
    let raw: std::collections::HashMap<String, Option<RawNode>> = serde_json::from_str(body)?;

    let mut normalized = NormalizedNodes::with_capacity(identifiers.len());
    for curie in identifiers {
        let node = raw
            .get(curie)
            .cloned()
            .flatten()
            .map(|raw| NormalizedNode::from_raw(raw, with_synonyms));
        normalized.insert(curie.clone(), node);
    }
    Ok(normalized)
}

/// Fold a normalization result map into a total identifier-to-name map.
/// Misses fall back to the identifier itself and are collected in query
/// order.
fn fold_preferred_names(identifiers: &[String], normalized: &NormalizedNodes) -> PreferredNames {
    let mut resolved = PreferredNames::default();
    for curie in identifiers {
        let label = normalized
            .get(curie)
            .and_then(|node| node.as_ref())
            .and_then(|node| node.label.clone());
        match label {
            Some(label) => {
                resolved.names.insert(curie.clone(), label);
            }
            None => {
                debug!("{}: no preferred name", curie);
                resolved.names.insert(curie.clone(), curie.clone());
                resolved.unresolved.push(curie.clone());
            }
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(curies: &[&str]) -> Vec<String> {
        curies.iter().map(|c| c.to_string()).collect()
    }

    const WATER_RESPONSE: &str = r#"{
        "MESH:D014867": {
            "id": {"identifier": "CHEBI:15377", "label": "Water"},
            "type": ["SmallMolecule", "biolink:ChemicalEntity"],
            "equivalent_identifiers": [
                {"identifier": "CHEBI:15377", "label": "water"},
                {"identifier": "MESH:D014867"}
            ]
        },
        "FAKE:0000": null
    }"#;

    #[test]
    fn test_client_creation() {
        let client = NodeNormClient::new();
        assert_eq!(client.base_url, NODENORM_BASE_URL);
        assert_eq!(client.batch_limit, POST_BATCH_LIMIT);
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let client = NodeNormClient::builder()
            .base_url("https://nodenorm.ci.transltr.io/")
            .batch_limit(100)
            .build();
        assert_eq!(client.base_url, "https://nodenorm.ci.transltr.io");
        assert_eq!(client.batch_limit, 100);
    }

    #[test]
    fn test_get_params_repeat_curie_and_encode_flags() {
        let options = NormalizeOptions {
            gene_protein_conflation: Some(true),
            drug_chemical_conflation: Some(false),
            ..Default::default()
        };
        let params = build_get_params(&ids(&["MESH:D014867", "CHEBI:15377"]), &options);
        assert_eq!(
            params,
            vec![
                ("curie".to_string(), "MESH:D014867".to_string()),
                ("curie".to_string(), "CHEBI:15377".to_string()),
                ("conflate".to_string(), "true".to_string()),
                ("drug_chemical_conflate".to_string(), "false".to_string()),
            ]
        );
    }

    #[test]
    fn test_post_body_carries_curies_and_flags() {
        let options = NormalizeOptions {
            gene_protein_conflation: Some(true),
            include_descriptions: Some(false),
            ..Default::default()
        };
        let body = build_post_body(&ids(&["NCBIGene:1234"]), &options);
        assert_eq!(body["curies"], json!(["NCBIGene:1234"]));
        assert_eq!(body["conflate"], json!(true));
        assert_eq!(body["description"], json!(false));
        assert!(body.get("drug_chemical_conflate").is_none());
    }

    #[test]
    fn test_unset_flags_are_omitted() {
        let options = NormalizeOptions::default();
        let params = build_get_params(&ids(&["MESH:D014867"]), &options);
        assert_eq!(
            params,
            vec![("curie".to_string(), "MESH:D014867".to_string())]
        );
        let body = build_post_body(&ids(&["MESH:D014867"]), &options);
        assert_eq!(body.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_unrecognized_options_pass_through() {
        let mut options = NormalizeOptions::default();
        options
            .extra
            .insert("individual_types".to_string(), json!(true));
        let params = build_get_params(&ids(&["MESH:D014867"]), &options);
        assert!(params.contains(&("individual_types".to_string(), "true".to_string())));
        let body = build_post_body(&ids(&["MESH:D014867"]), &options);
        assert_eq!(body["individual_types"], json!(true));
    }

    #[test]
    fn test_decode_is_total_over_the_batch() {
        // One match, one explicit null, one identifier missing from the
        // response entirely.
        let batch = ids(&["MESH:D014867", "FAKE:0000", "FAKE:0001"]);
        let normalized = decode_batch(&batch, WATER_RESPONSE, false).unwrap();
        assert_eq!(normalized.len(), 3);
        assert!(normalized["MESH:D014867"].is_some());
        assert!(normalized["FAKE:0000"].is_none());
        assert!(normalized["FAKE:0001"].is_none());
    }

    #[test]
    fn test_decode_builds_normalized_nodes() {
        let batch = ids(&["MESH:D014867"]);
        let normalized = decode_batch(&batch, WATER_RESPONSE, true).unwrap();
        let node = normalized["MESH:D014867"].as_ref().unwrap();
        assert_eq!(node.identifier, "CHEBI:15377");
        assert_eq!(node.label.as_deref(), Some("Water"));
        assert_eq!(
            node.types,
            Some(vec![
                "biolink:SmallMolecule".to_string(),
                "biolink:ChemicalEntity".to_string()
            ])
        );
        assert_eq!(
            node.synonym_identifiers,
            Some(vec!["CHEBI:15377".to_string(), "MESH:D014867".to_string()])
        );
    }

    #[test]
    fn test_decode_drops_unqueried_keys() {
        let batch = ids(&["FAKE:0000"]);
        let normalized = decode_batch(&batch, WATER_RESPONSE, false).unwrap();
        assert_eq!(normalized.len(), 1);
        assert!(!normalized.contains_key("MESH:D014867"));
    }

    #[test]
    fn test_decode_rejects_malformed_bodies() {
        let batch = ids(&["MESH:D014867"]);
        let result = decode_batch(&batch, r#"{"MESH:D014867": {"label": "no id"}}"#, false);
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_merge_is_invariant_under_batch_size() {
        // Simulate the aggregator's chunk-and-merge over an in-memory
        // response: any batch limit must produce the same map.
        let batch = ids(&["MESH:D014867", "FAKE:0000", "FAKE:0001", "CHEBI:15377"]);
        let full_response: serde_json::Map<String, Value> = serde_json::from_str(
            r#"{
                "MESH:D014867": {"id": {"identifier": "CHEBI:15377", "label": "Water"}},
                "FAKE:0000": null,
                "FAKE:0001": null,
                "CHEBI:15377": {"id": {"identifier": "CHEBI:15377", "label": "Water"}}
            }"#,
        )
        .unwrap();

        let whole = decode_batch(
            &batch,
            &Value::Object(full_response.clone()).to_string(),
            false,
        )
        .unwrap();

        for limit in [1, 3, batch.len()] {
            let mut merged = NormalizedNodes::new();
            for chunk in batch.chunks(limit) {
                // Each chunk sees only its own slice of the service response.
                let chunk_response: serde_json::Map<String, Value> = full_response
                    .iter()
                    .filter(|(key, _)| chunk.contains(*key))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                let decoded = decode_batch(
                    chunk,
                    &Value::Object(chunk_response).to_string(),
                    false,
                )
                .unwrap();
                merged.extend(decoded);
            }
            assert_eq!(merged, whole, "batch limit {}", limit);
        }
    }

    #[test]
    fn test_fold_preferred_names_totality_and_fallbacks() {
        let batch = ids(&["MESH:D014867", "FAKE:0000", "UNLABELED:1"]);
        let normalized = decode_batch(
            &batch,
            r#"{
                "MESH:D014867": {"id": {"identifier": "CHEBI:15377", "label": "Water"}},
                "FAKE:0000": null,
                "UNLABELED:1": {"id": {"identifier": "UNLABELED:1"}}
            }"#,
            false,
        )
        .unwrap();

        let resolved = fold_preferred_names(&batch, &normalized);
        assert_eq!(resolved.names.len(), 3);
        assert_eq!(resolved.names["MESH:D014867"], "Water");
        assert_eq!(resolved.names["FAKE:0000"], "FAKE:0000");
        assert_eq!(resolved.names["UNLABELED:1"], "UNLABELED:1");
        // Unresolved keeps query order and covers both miss kinds.
        assert_eq!(resolved.unresolved, ids(&["FAKE:0000", "UNLABELED:1"]));
    }

    #[test]
    fn test_batch_error_carries_identifier_range() {
        let error = Error::Batch {
            first: "MESH:D014867".to_string(),
            last: "CHEBI:15377".to_string(),
            source: Box::new(Error::Service {
                status: 502,
                body: "bad gateway".to_string(),
            }),
        };
        let message = error.to_string();
        assert!(message.contains("MESH:D014867"));
        assert!(message.contains("CHEBI:15377"));
    }
}
