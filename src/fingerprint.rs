//! Canonical serialization and snapshot fingerprints.
//!
//! A fingerprint is a deterministic hash of a snapshot's flattened
//! population, giving consumers a cheap "did anything change since the last
//! save" check without holding the older snapshot.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: struct fields serialize in declaration order
//! - Stable population order: entities hash in id order
//! - No HashMap allowed: tags and populations use BTreeMap

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

use crate::graph::Graph;
use crate::types::{Entity, EntityId};
use crate::SCHEMA_VERSION;

/// Serialize a value to canonical JSON bytes for hashing.
///
/// Produces identical output for identical input, suitable for hash
/// computation and change detection.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Compute the canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute the canonical hash and return it as a hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

/// A deterministic fingerprint of a snapshot's flattened population.
///
/// Two snapshots with field-identical populations fingerprint identically
/// even when their entity objects differ by reference, so this complements
/// (rather than replaces) [`Graph::difference`]'s reference-identity scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphFingerprint {
    /// Unique identifier for this population state (xxh64 of all components).
    pub fingerprint: String,
    /// Number of present entities.
    pub entity_count: u64,
    /// Schema version used for entity types.
    pub schema_version: String,
    /// Hash of the sorted id list.
    pub id_hash: String,
    /// Hash of the full population (ids, kinds, tags, updated markers).
    pub body_hash: String,
}

impl GraphFingerprint {
    /// Compute the fingerprint of `graph`'s flattened population.
    pub fn compute(graph: &Graph) -> Self {
        let entities = graph.entities();

        let ids: Vec<&EntityId> = entities.keys().collect();
        let id_hash = canonical_hash_hex(&ids);

        let records: Vec<&Entity> = entities.values().map(|entity| entity.as_ref()).collect();
        let body_hash = canonical_hash_hex(&records);

        let input = FingerprintInput {
            entity_count: entities.len() as u64,
            schema_version: SCHEMA_VERSION.to_string(),
            id_hash: id_hash.clone(),
            body_hash: body_hash.clone(),
        };
        let fingerprint = canonical_hash_hex(&input);

        Self {
            fingerprint,
            entity_count: entities.len() as u64,
            schema_version: SCHEMA_VERSION.to_string(),
            id_hash,
            body_hash,
        }
    }

    /// Whether this fingerprint matches `graph`'s current population.
    pub fn verify(&self, graph: &Graph) -> bool {
        self.fingerprint == Self::compute(graph).fingerprint
    }
}

/// Internal struct for computing the fingerprint hash.
#[derive(Serialize)]
struct FingerprintInput {
    entity_count: u64,
    schema_version: String,
    id_hash: String,
    body_hash: String,
}
