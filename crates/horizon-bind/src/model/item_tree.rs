//! In-memory data tree.
//!
//! `ItemTree` is a small data store that implements every data-side
//! collaborator trait of the selection engine: [`DataTree`], [`NodeResolver`]
//! and [`ActionExecutor`]. Embedders without their own document model can use
//! it directly; the test suites use it throughout.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_bind::model::{DataTree, ItemTree};
//!
//! let tree = Arc::new(ItemTree::new());
//! let root = tree.create_root("root", "Inbox");
//! let first = tree.add_child(root, "m1", "Hello").unwrap();
//! let second = tree.add_child(root, "m2", "Re: Hello").unwrap();
//!
//! assert_eq!(tree.traversable(), vec![first, second]);
//! tree.remove(first);
//! assert!(!tree.is_reachable(&first));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use horizon_bind_core::logging::targets;
use parking_lot::RwLock;
use slotmap::{SlotMap, new_key_type};

use super::traits::{ActionExecutor, DataAction, DataTree, ItemRef, NodeResolver, VisualId};

new_key_type! {
    /// Identifier of a node in an [`ItemTree`].
    pub struct NodeId;
}

impl From<NodeId> for ItemRef<NodeId> {
    fn from(node: NodeId) -> Self {
        ItemRef::Item(node)
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    id: String,
    caption: String,
    value: Option<String>,
    selectable: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    visual: VisualId,
}

#[derive(Debug, Default)]
struct TreeStorage {
    nodes: SlotMap<NodeId, NodeData>,
    root: Option<NodeId>,
    by_id: HashMap<String, NodeId>,
    visuals: HashMap<VisualId, NodeId>,
    next_visual: u64,
}

impl TreeStorage {
    fn create(&mut self, id: &str, caption: &str) -> NodeId {
        self.next_visual += 1;
        let visual = VisualId(self.next_visual);
        let node = self.nodes.insert(NodeData {
            id: id.to_string(),
            caption: caption.to_string(),
            value: None,
            selectable: true,
            parent: None,
            children: Vec::new(),
            visual,
        });
        if !id.is_empty() {
            self.by_id.insert(id.to_string(), node);
        }
        self.visuals.insert(visual, node);
        node
    }

    fn is_reachable(&self, node: NodeId) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        let mut current = Some(node);
        while let Some(id) = current {
            if id == root {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    fn unlink(&mut self, node: NodeId) {
        let parent = self.nodes.get(node).and_then(|n| n.parent);
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.retain(|&c| c != node);
            }
        }
        if let Some(n) = self.nodes.get_mut(node) {
            n.parent = None;
        }
        if self.root == Some(node) {
            self.root = None;
        }
    }

    fn collect_preorder(&self, node: NodeId, out: &mut Vec<NodeId>) {
        if let Some(data) = self.nodes.get(node) {
            for &child in &data.children {
                out.push(child);
                self.collect_preorder(child, out);
            }
        }
    }

    fn copy_subtree(&mut self, node: NodeId) -> Option<NodeId> {
        let source = self.nodes.get(node)?.clone();
        let copy = self.create("", &source.caption);
        if let Some(data) = self.nodes.get_mut(copy) {
            data.value = source.value.clone();
            data.selectable = source.selectable;
        }
        for child in source.children {
            if let Some(child_copy) = self.copy_subtree(child) {
                if let Some(c) = self.nodes.get_mut(child_copy) {
                    c.parent = Some(copy);
                }
                if let Some(data) = self.nodes.get_mut(copy) {
                    data.children.push(child_copy);
                }
            }
        }
        Some(copy)
    }
}

/// An in-memory tree of captioned nodes.
///
/// Nodes are never freed: removing a node only unlinks it, so stale handles
/// held by a selection stay valid but become unreachable, which is exactly
/// what selection reconciliation has to deal with.
#[derive(Debug)]
pub struct ItemTree {
    storage: RwLock<TreeStorage>,
    value_rule: AtomicBool,
    read_only: AtomicBool,
}

impl Default for ItemTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemTree {
    /// Creates an empty tree with no data root.
    pub fn new() -> Self {
        Self {
            storage: RwLock::new(TreeStorage::default()),
            value_rule: AtomicBool::new(true),
            read_only: AtomicBool::new(false),
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Creates a detached node. A non-empty `id` makes it resolvable by id.
    pub fn create_node(&self, id: &str, caption: &str) -> NodeId {
        self.storage.write().create(id, caption)
    }

    /// Creates a node and attaches it as the data root.
    pub fn create_root(&self, id: &str, caption: &str) -> NodeId {
        let mut storage = self.storage.write();
        let node = storage.create(id, caption);
        storage.root = Some(node);
        node
    }

    /// Attaches an existing parentless node as the data root.
    pub fn set_root(&self, node: NodeId) -> bool {
        let mut storage = self.storage.write();
        match storage.nodes.get(node) {
            Some(data) if data.parent.is_none() => {
                storage.root = Some(node);
                true
            }
            _ => false,
        }
    }

    /// Detaches the data root, returning it.
    pub fn clear_root(&self) -> Option<NodeId> {
        self.storage.write().root.take()
    }

    /// Creates a node and appends it to `parent`.
    ///
    /// Returns `None` if the parent doesn't exist.
    pub fn add_child(&self, parent: NodeId, id: &str, caption: &str) -> Option<NodeId> {
        let mut storage = self.storage.write();
        if !storage.nodes.contains_key(parent) {
            return None;
        }
        let node = storage.create(id, caption);
        storage.nodes[node].parent = Some(parent);
        storage.nodes[parent].children.push(node);
        Some(node)
    }

    /// Moves `node` under `parent`, before `before` if it is a child of
    /// `parent`, otherwise at the end.
    ///
    /// Fails when either node is missing or the move would create a cycle.
    pub fn append_child(&self, parent: NodeId, node: NodeId, before: Option<NodeId>) -> bool {
        let mut storage = self.storage.write();
        if !storage.nodes.contains_key(parent)
            || !storage.nodes.contains_key(node)
            || storage.is_ancestor_or_self(node, parent)
        {
            return false;
        }

        storage.unlink(node);
        storage.nodes[node].parent = Some(parent);
        let children = &mut storage.nodes[parent].children;
        match before.and_then(|b| children.iter().position(|&c| c == b)) {
            Some(pos) => children.insert(pos, node),
            None => children.push(node),
        }
        true
    }

    /// Unlinks `node` (and so its subtree) from the tree.
    pub fn remove(&self, node: NodeId) -> bool {
        let mut storage = self.storage.write();
        if !storage.nodes.contains_key(node) {
            return false;
        }
        storage.unlink(node);
        true
    }

    /// Checks whether the node exists, attached or not.
    pub fn contains(&self, node: NodeId) -> bool {
        self.storage.read().nodes.contains_key(node)
    }

    /// Returns the children of a node.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.storage
            .read()
            .nodes
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Returns the parent of a node.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.storage.read().nodes.get(node).and_then(|n| n.parent)
    }

    // =========================================================================
    // Node data
    // =========================================================================

    /// Returns the caption of a node.
    pub fn caption(&self, node: NodeId) -> Option<String> {
        self.storage.read().nodes.get(node).map(|n| n.caption.clone())
    }

    /// Sets the caption of a node.
    pub fn set_caption(&self, node: NodeId, caption: &str) {
        if let Some(n) = self.storage.write().nodes.get_mut(node) {
            n.caption = caption.to_string();
        }
    }

    /// Sets the bound value of a node. Without a value the caption is used.
    pub fn set_value(&self, node: NodeId, value: Option<&str>) {
        if let Some(n) = self.storage.write().nodes.get_mut(node) {
            n.value = value.map(str::to_string);
        }
    }

    /// Sets the per-node select rule.
    pub fn set_selectable(&self, node: NodeId, selectable: bool) {
        if let Some(n) = self.storage.write().nodes.get_mut(node) {
            n.selectable = selectable;
        }
    }

    /// Declares whether a value bind rule exists.
    pub fn set_value_rule(&self, present: bool) {
        self.value_rule.store(present, Ordering::SeqCst);
    }

    /// Makes the store refuse every data action.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }
}

impl DataTree<NodeId> for ItemTree {
    fn root(&self) -> Option<NodeId> {
        self.storage.read().root
    }

    fn is_reachable(&self, item: &NodeId) -> bool {
        self.storage.read().is_reachable(*item)
    }

    fn traversable(&self) -> Vec<NodeId> {
        let storage = self.storage.read();
        let mut out = Vec::new();
        if let Some(root) = storage.root {
            storage.collect_preorder(root, &mut out);
        }
        out
    }

    fn traverse_parent(&self, item: &NodeId) -> Option<NodeId> {
        let storage = self.storage.read();
        let parent = storage.nodes.get(*item)?.parent?;
        (Some(parent) != storage.root).then_some(parent)
    }

    fn detach(&self, item: &NodeId) -> NodeId {
        self.storage.write().copy_subtree(*item).unwrap_or(*item)
    }
}

impl NodeResolver<NodeId> for ItemTree {
    fn resolve_id(&self, id: &str) -> Option<NodeId> {
        self.storage.read().by_id.get(id).copied()
    }

    fn visual_for(&self, item: &NodeId) -> Option<VisualId> {
        let storage = self.storage.read();
        if !storage.is_reachable(*item) {
            return None;
        }
        storage.nodes.get(*item).map(|n| n.visual)
    }

    fn id_for_visual(&self, visual: VisualId) -> Option<String> {
        let storage = self.storage.read();
        let node = storage.visuals.get(&visual)?;
        storage
            .nodes
            .get(*node)
            .map(|n| n.id.clone())
            .filter(|id| !id.is_empty())
    }

    fn display_value(&self, item: &NodeId) -> Option<String> {
        self.storage
            .read()
            .nodes
            .get(*item)
            .map(|n| n.value.clone().unwrap_or_else(|| n.caption.clone()))
    }

    fn has_value_rule(&self) -> bool {
        self.value_rule.load(Ordering::SeqCst)
    }

    fn is_selectable(&self, item: &NodeId) -> bool {
        self.storage
            .read()
            .nodes
            .get(*item)
            .is_some_and(|n| n.selectable)
    }
}

impl ActionExecutor<NodeId> for ItemTree {
    fn execute(&self, action: DataAction<NodeId>, rule: &str, _context: &NodeId) -> bool {
        if self.read_only.load(Ordering::SeqCst) {
            tracing::debug!(target: targets::ACTIONS, rule, "store is read-only");
            return false;
        }
        match action {
            DataAction::RemoveNode(node) => self.remove(node),
            DataAction::RemoveNodeList(nodes) => {
                nodes.into_iter().fold(true, |ok, node| self.remove(node) && ok)
            }
            DataAction::AppendChild {
                parent,
                node,
                before,
            } => self.append_child(parent, node, before),
        }
    }
}

static_assertions::assert_impl_all!(ItemTree: Send, Sync);
