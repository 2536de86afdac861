//! # edit-graph-kernel
//!
//! Persistent, versioned entity graph for interactive map editing.
//!
//! The graph kernel answers one question:
//!
//! > Given many small, localized edits, what does the map look like **now**,
//! > and what changed since any earlier snapshot?
//!
//! ## Core Contract
//!
//! 1. Every mutation yields a new snapshot in O(changed-entities) via
//!    structural sharing; previous snapshots stay valid and unaffected
//! 2. Diff and classification queries scan only the layers of change,
//!    never the full entity population
//! 3. Entities are immutable value objects; "changed" means "a different
//!    object now resolves for this id", never deep field equality
//!
//! ## Architecture
//!
//! ```text
//! Entity (Point | Path | Grouping)
//!        ↓ replace / remove / update
//! Graph snapshot = overlay ──→ base ──→ base ──→ …
//!        ↓                 (shared, immutable)
//! difference / modified / created / deleted
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Parent lookups and enumerations iterate in stable id order (BTreeMap)
//! - `difference` orders ids entering, then changed, then leaving
//! - Fingerprints hash the sorted flattened population

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fingerprint;
pub mod graph;
pub mod types;

// Re-exports
pub use fingerprint::{canonical_hash, canonical_hash_hex, to_canonical_bytes, GraphFingerprint};
pub use graph::{Draft, Graph};
pub use types::{
    Entity, EntityId, EntityKind, EntityPatch, EntityType, IdRuleError, LocalIdRule, Member, Tags,
    DEFAULT_LOCAL_ID_PATTERN,
};

/// Schema version for all graph kernel types.
/// Increment on breaking changes to any schema type.
pub const SCHEMA_VERSION: &str = "1.0.0";
