//! Overlay layer: one snapshot's own changes in front of a shared base.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::types::{Entity, EntityId};

use super::Graph;

/// Which derived index an operation targets.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Index {
    /// Point id -> ids of paths containing it.
    ParentPaths,
    /// Any entity id -> ids of groupings referencing it as a member.
    ParentGroupings,
}

/// One snapshot's own changes, layered in front of an immutable shared base.
///
/// Lookup checks this layer first: a `Some(entity)` slot resolves to the
/// entity, a `None` slot is an explicit deletion tombstone (absent regardless
/// of the base), and a missing key falls through the base chain. The base is
/// shared by reference and never mutated through a derived layer.
///
/// The derived indices are copy-on-write per key: the first mutation of a
/// key's set in this layer clones the effective set out of the base chain,
/// then applies only the delta. `BTreeMap`/`BTreeSet` keep iteration
/// deterministic.
#[derive(Debug, Default)]
pub(crate) struct Layer {
    pub(crate) base: Option<Graph>,
    pub(crate) entities: BTreeMap<EntityId, Option<Arc<Entity>>>,
    /// First-touch order of ids within this layer; drives difference ordering.
    pub(crate) touched: Vec<EntityId>,
    parent_paths: BTreeMap<EntityId, BTreeSet<EntityId>>,
    parent_groupings: BTreeMap<EntityId, BTreeSet<EntityId>>,
}

impl Layer {
    /// Empty overlay layered on `base` (or a root layer when `None`).
    pub(crate) fn new(base: Option<Graph>) -> Self {
        Self {
            base,
            ..Default::default()
        }
    }

    /// Resolve `id` through this layer and the base chain.
    pub(crate) fn entity(&self, id: &EntityId) -> Option<Arc<Entity>> {
        let mut layer = self;
        loop {
            if let Some(slot) = layer.entities.get(id) {
                return slot.clone();
            }
            match &layer.base {
                Some(graph) => layer = graph.layer(),
                None => return None,
            }
        }
    }

    fn index(&self, which: Index) -> &BTreeMap<EntityId, BTreeSet<EntityId>> {
        match which {
            Index::ParentPaths => &self.parent_paths,
            Index::ParentGroupings => &self.parent_groupings,
        }
    }

    fn index_mut(&mut self, which: Index) -> &mut BTreeMap<EntityId, BTreeSet<EntityId>> {
        match which {
            Index::ParentPaths => &mut self.parent_paths,
            Index::ParentGroupings => &mut self.parent_groupings,
        }
    }

    /// Effective parent set for `id`: the first layer in the chain holding the
    /// key owns the whole set (copy-on-write invariant).
    pub(crate) fn parent_set(&self, which: Index, id: &EntityId) -> Option<&BTreeSet<EntityId>> {
        let mut layer = self;
        loop {
            if let Some(set) = layer.index(which).get(id) {
                return Some(set);
            }
            match &layer.base {
                Some(graph) => layer = graph.layer(),
                None => return None,
            }
        }
    }

    /// Write `entity` into the overlay and apply the incremental index delta
    /// against the previously resolved version of the same id.
    pub(crate) fn replace(&mut self, entity: Arc<Entity>) {
        let id = entity.id().clone();
        let prev = self.entity(&id);
        self.touch(&id);
        self.entities.insert(id.clone(), Some(Arc::clone(&entity)));
        self.reindex(&id, prev.as_deref(), Some(&entity));
    }

    /// Write a deletion tombstone for `id` and unindex the previous version's
    /// containment edges. Removing a never-added id leaves a no-op tombstone.
    pub(crate) fn remove(&mut self, id: &EntityId) {
        let prev = self.entity(id);
        self.touch(id);
        self.entities.insert(id.clone(), None);
        self.reindex(id, prev.as_deref(), None);
    }

    fn touch(&mut self, id: &EntityId) {
        if !self.entities.contains_key(id) {
            self.touched.push(id.clone());
        }
    }

    /// Diff the member-id lists of the previous and next versions of `id` and
    /// apply only the add/remove delta to the indices. Never rebuilds an
    /// index from scratch.
    fn reindex(&mut self, id: &EntityId, prev: Option<&Entity>, next: Option<&Entity>) {
        let prev_points = point_ids(prev);
        let next_points = point_ids(next);
        self.apply_delta(Index::ParentPaths, id, &prev_points, &next_points);

        let prev_members = member_ids(prev);
        let next_members = member_ids(next);
        self.apply_delta(Index::ParentGroupings, id, &prev_members, &next_members);
    }

    fn apply_delta(
        &mut self,
        which: Index,
        parent: &EntityId,
        prev: &BTreeSet<EntityId>,
        next: &BTreeSet<EntityId>,
    ) {
        for added in next.difference(prev) {
            self.owned_set(which, added).insert(parent.clone());
        }
        for removed in prev.difference(next) {
            self.owned_set(which, removed).remove(parent);
        }
    }

    /// Copy-on-write access to a key's set in this layer, seeded from the
    /// base chain on first touch.
    fn owned_set(&mut self, which: Index, key: &EntityId) -> &mut BTreeSet<EntityId> {
        if !self.index(which).contains_key(key) {
            let inherited = self
                .base
                .as_ref()
                .and_then(|graph| graph.layer().parent_set(which, key))
                .cloned()
                .unwrap_or_default();
            self.index_mut(which).insert(key.clone(), inherited);
        }
        self.index_mut(which)
            .get_mut(key)
            .expect("index entry seeded above")
    }

    /// Paths whose parent-path index lists `entity.id()`, resolved through
    /// `entity()` in deterministic id order.
    pub(crate) fn parent_paths_of(&self, entity: &Entity) -> Vec<Arc<Entity>> {
        self.resolve_parents(Index::ParentPaths, entity.id())
    }

    /// Groupings whose parent-grouping index lists `entity.id()`.
    pub(crate) fn parent_groupings_of(&self, entity: &Entity) -> Vec<Arc<Entity>> {
        self.resolve_parents(Index::ParentGroupings, entity.id())
    }

    fn resolve_parents(&self, which: Index, id: &EntityId) -> Vec<Arc<Entity>> {
        match self.parent_set(which, id) {
            Some(set) => set.iter().filter_map(|pid| self.entity(pid)).collect(),
            None => Vec::new(),
        }
    }

    /// Point entities of `path` in path order. Unresolvable ids are skipped.
    pub(crate) fn child_points_of(&self, path: &Entity) -> Vec<Arc<Entity>> {
        match path.points() {
            Some(points) => points.iter().filter_map(|pid| self.entity(pid)).collect(),
            None => Vec::new(),
        }
    }

    /// Visit every id's first resolution across the layer chain, newest layer
    /// first, first-touch order within a layer. A `None` resolution is an
    /// explicit tombstone, never a "never set" id.
    pub(crate) fn each_resolved(&self, mut f: impl FnMut(&EntityId, Option<&Arc<Entity>>)) {
        let mut seen: BTreeSet<&EntityId> = BTreeSet::new();
        let mut layer = self;
        loop {
            for id in &layer.touched {
                if seen.insert(id) {
                    let slot = layer.entities.get(id).and_then(|slot| slot.as_ref());
                    f(id, slot);
                }
            }
            match &layer.base {
                Some(graph) => layer = graph.layer(),
                None => return,
            }
        }
    }
}

fn point_ids(entity: Option<&Entity>) -> BTreeSet<EntityId> {
    entity
        .and_then(Entity::points)
        .map(|points| points.iter().cloned().collect())
        .unwrap_or_default()
}

fn member_ids(entity: Option<&Entity>) -> BTreeSet<EntityId> {
    entity
        .and_then(Entity::members)
        .map(|members| members.iter().map(|m| m.id.clone()).collect())
        .unwrap_or_default()
}
