//! Immutable entity value objects: points, paths, and groupings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::id::EntityId;

/// Tag mapping attached to an entity. Opaque to the graph core.
///
/// `BTreeMap` keeps serialization and iteration deterministic.
pub type Tags = BTreeMap<String, String>;

/// Payload-free entity variant discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// A single location.
    Point,
    /// An ordered sequence of points.
    Path,
    /// An ordered list of role-tagged references to other entities.
    Grouping,
}

impl EntityType {
    /// Parse an entity type from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "point" => Some(Self::Point),
            "path" => Some(Self::Path),
            "grouping" => Some(Self::Grouping),
            _ => None,
        }
    }

    /// Prefix used when minting locally-created ids of this type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Point => "pt",
            Self::Path => "pa",
            Self::Grouping => "gr",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => write!(f, "point"),
            Self::Path => write!(f, "path"),
            Self::Grouping => write!(f, "grouping"),
        }
    }
}

/// A role-tagged reference from a grouping to any entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    /// Referenced entity id (may be any variant, including another grouping).
    pub id: EntityId,
    /// Role of the member within the grouping. Opaque to the graph core.
    pub role: String,
}

impl Member {
    /// Create a new member reference.
    pub fn new(id: impl Into<EntityId>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
        }
    }
}

/// Variant payload of an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntityKind {
    /// A location; no sub-structure relevant to the graph.
    Point,
    /// An ordered sequence of point ids. Duplicates allowed; a path is closed
    /// when the first id is repeated as the last.
    Path {
        /// Point ids in path order.
        points: Vec<EntityId>,
    },
    /// An ordered list of role-tagged member references.
    Grouping {
        /// Member references in grouping order.
        members: Vec<Member>,
    },
}

impl EntityKind {
    /// The payload-free discriminant of this kind.
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Point => EntityType::Point,
            Self::Path { .. } => EntityType::Path,
            Self::Grouping { .. } => EntityType::Grouping,
        }
    }
}

/// Field changes applied by [`Entity::with`].
///
/// `None` fields are left unchanged; `Some` fields replace the previous value
/// wholesale. Point lists only apply to paths and member lists only to
/// groupings; a mismatched field is ignored.
#[derive(Debug, Clone, Default)]
pub struct EntityPatch {
    /// Replacement tag mapping.
    pub tags: Option<Tags>,
    /// Replacement point list (paths only).
    pub points: Option<Vec<EntityId>>,
    /// Replacement member list (groupings only).
    pub members: Option<Vec<Member>>,
}

/// Immutable map-feature value object.
///
/// Entities are only ever handed around as `Arc<Entity>` and are never
/// mutated after construction; producing a new version goes through
/// [`Entity::with`], which keeps the id and sets the `updated` marker. The
/// graph compares entity values by reference identity (`Arc::ptr_eq`), never
/// by field equality, so `Entity` deliberately does not implement
/// `PartialEq`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    tags: Tags,
    updated: bool,
}

impl Entity {
    /// Create an entity. Mints a fresh locally-created id when `id` is
    /// `None`.
    pub fn new(kind: EntityKind, id: Option<EntityId>, tags: Tags) -> Arc<Self> {
        let id = id.unwrap_or_else(|| EntityId::local(kind.entity_type()));
        Arc::new(Self {
            id,
            kind,
            tags,
            updated: false,
        })
    }

    /// Create a point with a fresh locally-created id.
    pub fn point() -> Arc<Self> {
        Self::new(EntityKind::Point, None, Tags::new())
    }

    /// Create a point with an explicit id.
    pub fn point_with_id(id: impl Into<EntityId>) -> Arc<Self> {
        Self::new(EntityKind::Point, Some(id.into()), Tags::new())
    }

    /// Create a path with a fresh locally-created id.
    pub fn path(points: Vec<EntityId>) -> Arc<Self> {
        Self::new(EntityKind::Path { points }, None, Tags::new())
    }

    /// Create a path with an explicit id.
    pub fn path_with_id(id: impl Into<EntityId>, points: Vec<EntityId>) -> Arc<Self> {
        Self::new(EntityKind::Path { points }, Some(id.into()), Tags::new())
    }

    /// Create a grouping with a fresh locally-created id.
    pub fn grouping(members: Vec<Member>) -> Arc<Self> {
        Self::new(EntityKind::Grouping { members }, None, Tags::new())
    }

    /// Create a grouping with an explicit id.
    pub fn grouping_with_id(id: impl Into<EntityId>, members: Vec<Member>) -> Arc<Self> {
        Self::new(EntityKind::Grouping { members }, Some(id.into()), Tags::new())
    }

    /// Produce a new version of this entity with `patch` applied.
    ///
    /// The id carries over unchanged and the `updated` marker is set, even
    /// for an empty patch: the result supersedes a prior version of the same
    /// id by definition.
    pub fn with(&self, patch: EntityPatch) -> Arc<Self> {
        let tags = patch.tags.unwrap_or_else(|| self.tags.clone());
        let kind = match &self.kind {
            EntityKind::Point => EntityKind::Point,
            EntityKind::Path { points } => EntityKind::Path {
                points: patch.points.unwrap_or_else(|| points.clone()),
            },
            EntityKind::Grouping { members } => EntityKind::Grouping {
                members: patch.members.unwrap_or_else(|| members.clone()),
            },
        };
        Arc::new(Self {
            id: self.id.clone(),
            kind,
            tags,
            updated: true,
        })
    }

    /// New version with replaced tags.
    pub fn with_tags(&self, tags: Tags) -> Arc<Self> {
        self.with(EntityPatch {
            tags: Some(tags),
            ..Default::default()
        })
    }

    /// New version with a replaced point list (paths only).
    pub fn with_points(&self, points: Vec<EntityId>) -> Arc<Self> {
        self.with(EntityPatch {
            points: Some(points),
            ..Default::default()
        })
    }

    /// New version with a replaced member list (groupings only).
    pub fn with_members(&self, members: Vec<Member>) -> Arc<Self> {
        self.with(EntityPatch {
            members: Some(members),
            ..Default::default()
        })
    }

    /// The entity id. Never changes across versions.
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// The variant payload.
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// The payload-free variant discriminant.
    pub fn entity_type(&self) -> EntityType {
        self.kind.entity_type()
    }

    /// The tag mapping.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Whether this value supersedes a prior version of the same id.
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    /// Whether the id has the locally-created lexical form.
    pub fn is_local(&self) -> bool {
        self.id.is_local()
    }

    /// Whether this entity is a point.
    pub fn is_point(&self) -> bool {
        matches!(self.kind, EntityKind::Point)
    }

    /// Whether this entity is a path.
    pub fn is_path(&self) -> bool {
        matches!(self.kind, EntityKind::Path { .. })
    }

    /// Whether this entity is a grouping.
    pub fn is_grouping(&self) -> bool {
        matches!(self.kind, EntityKind::Grouping { .. })
    }

    /// Point ids in path order, or `None` for non-paths.
    pub fn points(&self) -> Option<&[EntityId]> {
        match &self.kind {
            EntityKind::Path { points } => Some(points),
            _ => None,
        }
    }

    /// Member references in grouping order, or `None` for non-groupings.
    pub fn members(&self) -> Option<&[Member]> {
        match &self.kind {
            EntityKind::Grouping { members } => Some(members),
            _ => None,
        }
    }

    /// Whether this is a closed path (first point id repeated as last).
    pub fn is_closed(&self) -> bool {
        match self.points() {
            Some(points) => points.len() >= 2 && points.first() == points.last(),
            None => false,
        }
    }

    /// Whether this path contains the given point id.
    pub fn contains_point(&self, id: &EntityId) -> bool {
        self.points().is_some_and(|points| points.contains(id))
    }
}
