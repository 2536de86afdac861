//! Core types for the edit graph.

pub mod entity;
pub mod id;

pub use entity::{Entity, EntityKind, EntityPatch, EntityType, Member, Tags};
pub use id::{EntityId, IdRuleError, LocalIdRule, DEFAULT_LOCAL_ID_PATTERN};
