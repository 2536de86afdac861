//! Persistent versioned graph: frozen snapshots and scoped drafts.

mod difference;
mod layer;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::{Entity, EntityId, LocalIdRule};

use layer::Layer;

/// A frozen snapshot of the entity population at a point in history.
///
/// Snapshots are immutable: every mutating operation layers the change in a
/// fresh overlay on top of the receiver and returns a new `Graph`, leaving
/// the receiver untouched. Cloning a snapshot is O(1) (shared layer), and a
/// snapshot is safe to share by reference among any number of readers.
///
/// Batched edits go through [`Graph::update`], which exposes an exclusively
/// owned [`Draft`] whose mutations are applied in place and frozen once at
/// the end, so a bulk edit materializes one snapshot instead of one per
/// step.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    layer: Arc<Layer>,
}

impl Graph {
    /// Build a snapshot from an initial id -> entity population.
    ///
    /// Indices are built incrementally while inserting; this is the one
    /// full-population pass in a graph's lifecycle.
    pub fn new<I: IntoIterator<Item = Arc<Entity>>>(entities: I) -> Self {
        let mut layer = Layer::new(None);
        let mut count = 0usize;
        for entity in entities {
            layer.replace(entity);
            count += 1;
        }
        tracing::debug!(entities = count, "loaded graph population");
        Self::from_layer(layer)
    }

    /// An empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_layer(layer: Layer) -> Self {
        Self {
            layer: Arc::new(layer),
        }
    }

    pub(crate) fn layer(&self) -> &Layer {
        &self.layer
    }

    pub(crate) fn layer_ptr(&self) -> *const Layer {
        Arc::as_ptr(&self.layer)
    }

    /// Whether two handles refer to the same snapshot instance. Distinct
    /// instances may still resolve identical populations.
    pub fn ptr_eq(&self, other: &Graph) -> bool {
        Arc::ptr_eq(&self.layer, &other.layer)
    }

    /// The entity for `id`, or `None` if absent at every layer. Absence is a
    /// normal result, never an error.
    pub fn entity(&self, id: &EntityId) -> Option<Arc<Entity>> {
        self.layer.entity(id)
    }

    /// Whether `id` resolves to an entity in this snapshot.
    pub fn has(&self, id: &EntityId) -> bool {
        self.entity(id).is_some()
    }

    /// A new snapshot in which `entity.id()` resolves to `entity`.
    pub fn replace(&self, entity: Arc<Entity>) -> Self {
        let mut layer = Layer::new(Some(self.clone()));
        layer.replace(entity);
        Self::from_layer(layer)
    }

    /// A new snapshot in which `entity.id()` resolves to absent. Removing a
    /// never-added id is a well-defined no-op deletion.
    pub fn remove(&self, entity: &Entity) -> Self {
        let mut layer = Layer::new(Some(self.clone()));
        layer.remove(entity.id());
        Self::from_layer(layer)
    }

    /// Apply `edits` in order against a draft layered on this snapshot, then
    /// freeze and return the result.
    ///
    /// Each edit sees the cumulative effect of the edits before it. An empty
    /// edit list still returns a distinct snapshot. Heterogeneous closures
    /// can be batched as `Box<dyn FnOnce(&mut Draft)>`.
    pub fn update<I, F>(&self, edits: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: FnOnce(&mut Draft),
    {
        let mut draft = Draft {
            layer: Layer::new(Some(self.clone())),
        };
        for edit in edits {
            edit(&mut draft);
        }
        draft.freeze()
    }

    /// Paths containing `entity.id()`, resolved through [`Graph::entity`] in
    /// deterministic id order.
    pub fn parent_paths(&self, entity: &Entity) -> Vec<Arc<Entity>> {
        self.layer.parent_paths_of(entity)
    }

    /// Groupings referencing `entity.id()` as a member.
    pub fn parent_groupings(&self, entity: &Entity) -> Vec<Arc<Entity>> {
        self.layer.parent_groupings_of(entity)
    }

    /// The point entities of `path` in path order, resolved against this
    /// snapshot.
    pub fn child_points(&self, path: &Entity) -> Vec<Arc<Entity>> {
        self.layer.child_points_of(path)
    }

    /// Ordered ids whose resolution differs by reference between `self` and
    /// `other`: entering, then changed, then leaving. Works for any two
    /// graphs; the order is meaningful along a derivation chain. Only the
    /// overlay layers above the lowest shared ancestor are scanned.
    pub fn difference(&self, other: &Graph) -> Vec<EntityId> {
        difference::difference(self, other)
    }

    /// Ids of present entities whose `updated` marker is set and whose id is
    /// not of locally-created form, per the default [`LocalIdRule`].
    pub fn modified(&self) -> Vec<EntityId> {
        self.modified_with(LocalIdRule::default_rule())
    }

    /// [`Graph::modified`] with an explicit local-id rule.
    pub fn modified_with(&self, rule: &LocalIdRule) -> Vec<EntityId> {
        let mut ids = Vec::new();
        self.layer.each_resolved(|id, slot| {
            if let Some(entity) = slot {
                if entity.is_updated() && !rule.is_local(id) {
                    ids.push(id.clone());
                }
            }
        });
        ids
    }

    /// Ids of present entities whose id is of locally-created form.
    pub fn created(&self) -> Vec<EntityId> {
        self.created_with(LocalIdRule::default_rule())
    }

    /// [`Graph::created`] with an explicit local-id rule.
    pub fn created_with(&self, rule: &LocalIdRule) -> Vec<EntityId> {
        let mut ids = Vec::new();
        self.layer.each_resolved(|id, slot| {
            if slot.is_some() && rule.is_local(id) {
                ids.push(id.clone());
            }
        });
        ids
    }

    /// Ids resolving to an explicit deletion tombstone whose id is not of
    /// locally-created form. A locally-created entity removed before ever
    /// escaping draft scope never appears here: from any external consumer's
    /// point of view it never existed.
    pub fn deleted(&self) -> Vec<EntityId> {
        self.deleted_with(LocalIdRule::default_rule())
    }

    /// [`Graph::deleted`] with an explicit local-id rule.
    pub fn deleted_with(&self, rule: &LocalIdRule) -> Vec<EntityId> {
        let mut ids = Vec::new();
        self.layer.each_resolved(|id, slot| {
            if slot.is_none() && !rule.is_local(id) {
                ids.push(id.clone());
            }
        });
        ids
    }

    /// The full flattened population, in id order. This is the periodic
    /// "flatten" escape hatch consumers use to cap chain depth, and the
    /// input to fingerprinting; it costs O(population).
    pub fn entities(&self) -> BTreeMap<EntityId, Arc<Entity>> {
        let mut map = BTreeMap::new();
        self.layer.each_resolved(|id, slot| {
            if let Some(entity) = slot {
                map.insert(id.clone(), Arc::clone(entity));
            }
        });
        map
    }

    /// Number of present entities. Costs O(population).
    pub fn len(&self) -> usize {
        let mut count = 0;
        self.layer.each_resolved(|_, slot| {
            if slot.is_some() {
                count += 1;
            }
        });
        count
    }

    /// Whether no entity is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An unfrozen graph under construction inside [`Graph::update`].
///
/// A draft owns its overlay exclusively: mutations apply in place and the
/// receiver's identity never changes. Drafts cannot escape the `update`
/// scope, so frozen snapshots are structurally incapable of in-place
/// mutation; the shared base chain is only ever read.
#[derive(Debug)]
pub struct Draft {
    layer: Layer,
}

impl Draft {
    /// The entity for `id` as currently visible in the draft.
    pub fn entity(&self, id: &EntityId) -> Option<Arc<Entity>> {
        self.layer.entity(id)
    }

    /// Whether `id` resolves to an entity in the draft.
    pub fn has(&self, id: &EntityId) -> bool {
        self.entity(id).is_some()
    }

    /// Write `entity` into the draft's overlay in place.
    pub fn replace(&mut self, entity: Arc<Entity>) -> &mut Self {
        self.layer.replace(entity);
        self
    }

    /// Write a deletion tombstone for `entity.id()` in place.
    pub fn remove(&mut self, entity: &Entity) -> &mut Self {
        self.layer.remove(entity.id());
        self
    }

    /// Apply `edits` in order against this draft. The receiver is returned
    /// unchanged in identity.
    pub fn update<I, F>(&mut self, edits: I) -> &mut Self
    where
        I: IntoIterator<Item = F>,
        F: FnOnce(&mut Draft),
    {
        for edit in edits {
            edit(&mut *self);
        }
        self
    }

    /// Paths containing `entity.id()` as visible in the draft.
    pub fn parent_paths(&self, entity: &Entity) -> Vec<Arc<Entity>> {
        self.layer.parent_paths_of(entity)
    }

    /// Groupings referencing `entity.id()` as visible in the draft.
    pub fn parent_groupings(&self, entity: &Entity) -> Vec<Arc<Entity>> {
        self.layer.parent_groupings_of(entity)
    }

    /// The point entities of `path` as visible in the draft.
    pub fn child_points(&self, path: &Entity) -> Vec<Arc<Entity>> {
        self.layer.child_points_of(path)
    }

    fn freeze(self) -> Graph {
        tracing::trace!(touched = self.layer.touched.len(), "froze draft graph");
        Graph::from_layer(self.layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_is_shallow() {
        let graph = Graph::new([Entity::point_with_id("pt1")]);
        let clone = graph.clone();
        assert_eq!(graph.layer_ptr(), clone.layer_ptr());
    }

    #[test]
    fn test_replace_layers_a_new_snapshot() {
        let point = Entity::point_with_id("pt1");
        let graph = Graph::empty();
        let next = graph.replace(Arc::clone(&point));

        assert_ne!(graph.layer_ptr(), next.layer_ptr());
        assert!(graph.entity(point.id()).is_none());
        assert!(next.entity(point.id()).is_some());
    }

    #[test]
    fn test_update_batches_into_one_snapshot() {
        let a = Entity::point_with_id("pt1");
        let b = Entity::point_with_id("pt2");
        let graph = Graph::new([Arc::clone(&a)]);

        let a2 = Arc::clone(&a);
        let b2 = Arc::clone(&b);
        let next = graph.update([Box::new(move |draft: &mut Draft| {
            draft.remove(&a2);
            draft.replace(b2);
        }) as Box<dyn FnOnce(&mut Draft)>]);

        assert!(next.entity(a.id()).is_none());
        assert!(next.entity(b.id()).is_some());
        // The batch layered exactly one overlay on the receiver.
        assert_eq!(next.layer().base.as_ref().unwrap().layer_ptr(), graph.layer_ptr());
    }

    #[test]
    fn test_len_counts_resolved_entities() {
        let a = Entity::point_with_id("pt1");
        let graph = Graph::new([Arc::clone(&a), Entity::point_with_id("pt2")]);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.remove(&a).len(), 1);
        assert!(Graph::empty().is_empty());
    }
}
