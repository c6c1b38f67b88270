//! In-memory hierarchy store: the single owner of the browse tree.
//!
//! The store maps parent ids to ordered children lists and tracks the
//! current root id. It is the one choke point for structural mutation and
//! lookup; the WebSocket bridge writes into it and the browse service reads
//! from it.
//!
//! # Concurrency design
//!
//! All state lives behind one `parking_lot::RwLock`. Writers take the lock
//! for the whole mutation, compute which parents changed, release the lock
//! and only then emit events, so observers never re-enter the store while it
//! is locked.
//!
//! Parent-key insertion order is tracked explicitly in a `Vec` because
//! `HashMap` iteration order is unspecified: the "first entry" root default
//! and the "first match" id scan must both be deterministic.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::events::EventEmitter;
use crate::model::{MediaItem, MediaItemPatch, ValidatedNode, ValidatedTree, ValidationError};

/// Structural change notification emitted by the store.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HierarchyEvent {
    /// The whole hierarchy was replaced.
    Replaced {
        /// The root id in effect after the replace (explicit or defaulted).
        #[serde(rename = "rootId")]
        root_id: Option<String>,
    },
    /// The children list of one parent changed.
    ChildrenChanged {
        #[serde(rename = "parentId")]
        parent_id: String,
    },
}

/// Serializable snapshot of the whole hierarchy, in parent insertion order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchySnapshot {
    pub root_id: Option<String>,
    pub parents: Vec<ParentEntry>,
}

/// One parent and its current children, for snapshots.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentEntry {
    pub parent_id: String,
    pub children: Vec<MediaItem>,
}

#[derive(Default)]
struct HierarchyInner {
    parents: HashMap<String, Vec<MediaItem>>,
    /// Parent keys in first-insertion order; always matches `parents.keys()`.
    order: Vec<String>,
    root_id: Option<String>,
}

impl HierarchyInner {
    fn children_mut(&mut self, parent_id: &str) -> &mut Vec<MediaItem> {
        if !self.parents.contains_key(parent_id) {
            self.order.push(parent_id.to_string());
        }
        self.parents.entry(parent_id.to_string()).or_default()
    }

    /// Merges `items` into the children of `parent_id` (`replace=false`
    /// semantics): matches by id are replaced in place, the rest appended.
    /// Returns whether anything changed.
    fn merge_children(&mut self, parent_id: &str, items: Vec<MediaItem>) -> bool {
        if items.is_empty() {
            return false;
        }
        let children = self.children_mut(parent_id);
        for item in items {
            match children.iter_mut().find(|c| c.id == item.id) {
                Some(existing) => *existing = item,
                None => children.push(item),
            }
        }
        true
    }
}

/// The hierarchy store.
///
/// Explicitly constructed and shared as `Arc<HierarchyStore>`; there is no
/// global accessor. Every mutation that changes state emits a
/// [`HierarchyEvent`] through the injected emitter.
pub struct HierarchyStore {
    inner: RwLock<HierarchyInner>,
    emitter: Arc<dyn EventEmitter>,
}

impl HierarchyStore {
    /// Creates an empty store that notifies the given emitter.
    pub fn new(emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            inner: RwLock::new(HierarchyInner::default()),
            emitter,
        }
    }

    /// Atomically replaces the entire mapping and root id.
    ///
    /// When `root_id` is `None` and the mapping is non-empty, the root
    /// defaults to the first entry's key. This default is deliberate and
    /// documented; callers that care should always pass an explicit root.
    pub fn set_hierarchy(
        &self,
        entries: Vec<(String, Vec<MediaItem>)>,
        root_id: Option<String>,
    ) {
        let effective_root;
        {
            let mut inner = self.inner.write();
            let mut parents = HashMap::with_capacity(entries.len());
            let mut order = Vec::with_capacity(entries.len());
            for (parent_id, children) in entries {
                if !parents.contains_key(&parent_id) {
                    order.push(parent_id.clone());
                }
                parents.insert(parent_id, children);
            }
            effective_root = root_id.or_else(|| order.first().cloned());
            *inner = HierarchyInner {
                parents,
                order,
                root_id: effective_root.clone(),
            };
        }
        log::info!(
            "[Store] Hierarchy replaced, root={:?}",
            effective_root.as_deref()
        );
        self.emitter.emit_hierarchy(HierarchyEvent::Replaced {
            root_id: effective_root,
        });
    }

    /// Replaces the hierarchy from a validated whole-tree payload.
    pub fn set_tree(&self, tree: &ValidatedTree) {
        let root_id = tree.root_id.clone();
        self.set_hierarchy(tree.flatten(), Some(root_id));
    }

    /// Returns the current root id, if set.
    pub fn root_id(&self) -> Option<String> {
        self.inner.read().root_id.clone()
    }

    /// Returns the children of a parent, empty if the parent is unknown.
    pub fn children(&self, parent_id: &str) -> Vec<MediaItem> {
        self.inner
            .read()
            .parents
            .get(parent_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Looks an item up by id: linear scan over parents in insertion order,
    /// first match wins. `None` when the id does not exist anywhere.
    pub fn get(&self, item_id: &str) -> Option<MediaItem> {
        let inner = self.inner.read();
        for parent_id in &inner.order {
            if let Some(item) = inner.parents[parent_id].iter().find(|i| i.id == item_id) {
                return Some(item.clone());
            }
        }
        None
    }

    /// Appends an item to the children of `parent_id`.
    ///
    /// A missing parent gets a fresh children list created rather than the
    /// item being silently dropped.
    pub fn insert(&self, parent_id: &str, item: MediaItem) {
        {
            let mut inner = self.inner.write();
            inner.children_mut(parent_id).push(item);
        }
        self.emitter.emit_hierarchy(HierarchyEvent::ChildrenChanged {
            parent_id: parent_id.to_string(),
        });
    }

    /// Removes the first item whose id matches, scanning parents in
    /// insertion order and stopping at the first removal. Silent no-op when
    /// the id is unknown.
    pub fn delete(&self, item_id: &str) {
        let changed_parent = {
            let mut inner = self.inner.write();
            let mut found = None;
            for parent_id in &inner.order {
                let children = &inner.parents[parent_id];
                if let Some(pos) = children.iter().position(|i| i.id == item_id) {
                    found = Some((parent_id.clone(), pos));
                    break;
                }
            }
            if let Some((parent_id, pos)) = found {
                if let Some(children) = inner.parents.get_mut(&parent_id) {
                    children.remove(pos);
                }
                Some(parent_id)
            } else {
                None
            }
        };
        match changed_parent {
            Some(parent_id) => {
                self.emitter
                    .emit_hierarchy(HierarchyEvent::ChildrenChanged { parent_id });
            }
            None => log::debug!("[Store] delete: id {item_id:?} not found, ignoring"),
        }
    }

    /// Replaces the item with the same id wholesale, preserving its position
    /// in its parent's children list. Silent no-op when the id is unknown.
    pub fn update(&self, item: MediaItem) {
        let changed_parent = {
            let mut inner = self.inner.write();
            Self::replace_in_place(&mut inner, item)
        };
        match changed_parent {
            Some(parent_id) => {
                self.emitter
                    .emit_hierarchy(HierarchyEvent::ChildrenChanged { parent_id });
            }
            None => log::debug!("[Store] update: id not found, ignoring"),
        }
    }

    /// Applies a partial update: the existing item is looked up, the patch
    /// merged onto it (unspecified fields retain their prior values) and the
    /// result swapped in place. Silent no-op when the id is unknown.
    ///
    /// The lookup-merge-replace happens under one write lock so concurrent
    /// bridge calls cannot interleave between read and write.
    pub fn apply_patch(&self, patch: &MediaItemPatch) -> Result<(), ValidationError> {
        let changed_parent = {
            let mut inner = self.inner.write();
            let existing = inner
                .order
                .iter()
                .find_map(|p| inner.parents[p].iter().find(|i| i.id == patch.id))
                .cloned();
            match existing {
                Some(existing) => {
                    let merged = patch.apply(&existing)?;
                    Self::replace_in_place(&mut inner, merged)
                }
                None => None,
            }
        };
        match changed_parent {
            Some(parent_id) => {
                self.emitter
                    .emit_hierarchy(HierarchyEvent::ChildrenChanged { parent_id });
            }
            None => log::debug!("[Store] patch: id {:?} not found, ignoring", patch.id),
        }
        Ok(())
    }

    /// Batch update of a parent's children.
    ///
    /// With `replace` the children list of `parent_id` becomes exactly the
    /// given items, in order. Without it, items are merged by id: matches
    /// are replaced in place, the rest appended in input order. Children
    /// nested inside the incoming nodes apply the same logic to their own
    /// parent ids first. One event fires per parent that actually changed.
    pub fn batch_update(&self, parent_id: &str, nodes: Vec<ValidatedNode>, replace: bool) {
        let changed = {
            let mut inner = self.inner.write();
            let mut changed: Vec<String> = Vec::new();
            Self::apply_nested(&mut inner, &nodes, replace, &mut changed);

            let items: Vec<MediaItem> = nodes.into_iter().map(|n| n.item).collect();
            let top_changed = if replace {
                *inner.children_mut(parent_id) = items;
                true
            } else {
                inner.merge_children(parent_id, items)
            };
            if top_changed {
                changed.push(parent_id.to_string());
            }
            changed
        };
        for parent_id in dedup_preserving_order(changed) {
            self.emitter
                .emit_hierarchy(HierarchyEvent::ChildrenChanged { parent_id });
        }
    }

    /// Returns a full snapshot for initial-state payloads.
    pub fn snapshot(&self) -> HierarchySnapshot {
        let inner = self.inner.read();
        HierarchySnapshot {
            root_id: inner.root_id.clone(),
            parents: inner
                .order
                .iter()
                .map(|parent_id| ParentEntry {
                    parent_id: parent_id.clone(),
                    children: inner.parents[parent_id].clone(),
                })
                .collect(),
        }
    }

    /// Number of parent entries currently in the mapping.
    pub fn parent_count(&self) -> usize {
        self.inner.read().parents.len()
    }

    /// Recursively applies nested children merges, children-first relative
    /// to the caller's own merge.
    fn apply_nested(
        inner: &mut HierarchyInner,
        nodes: &[ValidatedNode],
        replace: bool,
        changed: &mut Vec<String>,
    ) {
        for node in nodes {
            if node.children.is_empty() {
                continue;
            }
            Self::apply_nested(inner, &node.children, replace, changed);
            let items: Vec<MediaItem> = node.children.iter().map(|n| n.item.clone()).collect();
            let did_change = if replace {
                *inner.children_mut(&node.item.id) = items;
                true
            } else {
                inner.merge_children(&node.item.id, items)
            };
            if did_change {
                changed.push(node.item.id.clone());
            }
        }
    }

    fn replace_in_place(inner: &mut HierarchyInner, item: MediaItem) -> Option<String> {
        for parent_id in &inner.order {
            if let Some(pos) = inner.parents[parent_id]
                .iter()
                .position(|i| i.id == item.id)
            {
                let parent_id = parent_id.clone();
                inner.parents.get_mut(&parent_id)?[pos] = item;
                return Some(parent_id);
            }
        }
        None
    }
}

fn dedup_preserving_order(parents: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    parents
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
