//! Node normalizer data types.

use std::collections::HashMap;

use serde::Deserialize;

/// Default namespace for semantic-type strings the service returns bare.
pub const TYPE_NAMESPACE: &str = "biolink";

/// One identifier in a service response: either the canonical id of a match
/// or a member of its equivalence cluster.
#[derive(Debug, Clone, Deserialize)]
pub struct RawIdentifier {
    pub identifier: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// One matched entity as returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    pub id: RawIdentifier,
    #[serde(rename = "type", default)]
    pub types: Option<Vec<String>>,
    #[serde(default)]
    pub equivalent_identifiers: Option<Vec<RawIdentifier>>,
}

/// A normalized entity: canonical identifier, preferred label, semantic
/// types, and (when requested) the equivalence cluster as paired synonym
/// lists.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedNode {
    /// Canonical CURIE for the entity.
    pub identifier: String,
    /// Human-readable preferred name, when the service knows one.
    pub label: Option<String>,
    /// Semantic types, each carrying a namespace prefix.
    pub types: Option<Vec<String>>,
    /// Labels of equivalent identifiers, parallel to `synonym_identifiers`.
    /// `None` entries are cluster members without a label.
    pub synonym_labels: Option<Vec<Option<String>>>,
    /// CURIEs the service considers equivalent to `identifier`.
    pub synonym_identifiers: Option<Vec<String>>,
}

impl NormalizedNode {
    /// Build a node from a raw service entry.
    ///
    /// Type strings without a namespace prefix get [`TYPE_NAMESPACE`]
    /// injected. Synonym lists are only populated when `with_synonyms` is
    /// set; the two lists stay equal length, with unlabeled cluster members
    /// kept as explicit `None` slots.
    pub fn from_raw(raw: RawNode, with_synonyms: bool) -> Self {
        let types = raw
            .types
            .map(|types| types.into_iter().map(ensure_type_namespace).collect());

        let (synonym_labels, synonym_identifiers) =
            match (with_synonyms, raw.equivalent_identifiers) {
                (true, Some(cluster)) => {
                    let mut labels = Vec::with_capacity(cluster.len());
                    let mut identifiers = Vec::with_capacity(cluster.len());
                    for eq in cluster {
                        labels.push(eq.label);
                        identifiers.push(eq.identifier);
                    }
                    (Some(labels), Some(identifiers))
                }
                _ => (None, None),
            };

        Self {
            identifier: raw.id.identifier,
            label: raw.id.label,
            types,
            synonym_labels,
            synonym_identifiers,
        }
    }
}

/// Result map for one normalization call: every queried identifier maps to
/// its normalized node, or to `None` when the service does not know it.
pub type NormalizedNodes = HashMap<String, Option<NormalizedNode>>;

/// Result of preferred-name resolution: a total identifier-to-name map plus
/// the identifiers that fell back to themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferredNames {
    /// Every queried identifier mapped to a display string.
    pub names: HashMap<String, String>,
    /// Identifiers with no match or no label, in query order.
    pub unresolved: Vec<String>,
}

fn ensure_type_namespace(ty: String) -> String {
    if ty.contains(':') {
        ty
    } else {
        format!("{}:{}", TYPE_NAMESPACE, ty)
    }
}
