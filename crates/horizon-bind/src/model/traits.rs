//! Collaborator traits for the selection engine.
//!
//! The selection controller never touches a document, a renderer or a data
//! store directly. Everything it needs from the outside world is expressed by
//! the traits in this module:
//!
//! - [`NodeResolver`] maps between items, string ids, visuals and bound values
//! - [`DataTree`] answers structural questions about the backing data
//! - [`SelectionView`] receives visual selection/indicator updates
//! - [`ActionExecutor`] performs data mutations (add/remove)
//! - [`DataFetcher`] loads nodes for asynchronous add actions

use std::fmt;

use super::actions::AddRequestId;

/// Bound for semantic item handles.
///
/// Items are compared by identity through `PartialEq`; the engine clones the
/// handle, never the node it refers to.
pub trait Item: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T> Item for T where T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

/// Handle to the visual representation of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualId(pub u64);

/// The ways a caller can designate an item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemRef<I> {
    /// A semantic item handle.
    Item(I),
    /// A raw identifier, resolved by id and then by bound display value.
    Id(String),
    /// A visual, resolved through its id.
    Visual(VisualId),
}

impl<I> From<&str> for ItemRef<I> {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl<I> From<String> for ItemRef<I> {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl<I> From<VisualId> for ItemRef<I> {
    fn from(visual: VisualId) -> Self {
        Self::Visual(visual)
    }
}

/// Traversal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Towards later items in traversal order.
    #[default]
    Forward,
    /// Towards earlier items in traversal order.
    Backward,
}

/// Maps items to ids, visuals and bound values.
pub trait NodeResolver<I: Item>: Send + Sync {
    /// Look up an item by its string id.
    fn resolve_id(&self, id: &str) -> Option<I>;

    /// Get the visual currently representing `item`, if it is rendered.
    fn visual_for(&self, item: &I) -> Option<VisualId>;

    /// Get the id of the item a visual represents.
    fn id_for_visual(&self, visual: VisualId) -> Option<String>;

    /// Get the bound display value of an item (its value rule, else caption).
    fn display_value(&self, item: &I) -> Option<String>;

    /// Whether a value (or caption) bind rule exists.
    fn has_value_rule(&self) -> bool {
        true
    }

    /// Per-item select rule. Returning `false` vetoes a selection.
    fn is_selectable(&self, _item: &I) -> bool {
        true
    }
}

/// Structural view of the backing data tree.
pub trait DataTree<I: Item>: Send + Sync {
    /// The attached data root, if any.
    fn root(&self) -> Option<I>;

    /// Whether a data root is attached.
    fn has_root(&self) -> bool {
        self.root().is_some()
    }

    /// Whether `item` is still reachable from the data root.
    fn is_reachable(&self, item: &I) -> bool;

    /// All traversable items in traversal order.
    fn traversable(&self) -> Vec<I>;

    /// The first traversable item.
    fn first_traversable(&self) -> Option<I> {
        self.traversable().into_iter().next()
    }

    /// The traversable neighbour of `item` in the given direction.
    fn next_traversable(&self, item: &I, direction: Direction) -> Option<I> {
        let nodes = self.traversable();
        let pos = nodes.iter().position(|n| n == item)?;
        match direction {
            Direction::Forward => nodes.get(pos + 1).cloned(),
            Direction::Backward => pos.checked_sub(1).and_then(|p| nodes.get(p).cloned()),
        }
    }

    /// The traversable parent of `item` (tree architectures).
    fn traverse_parent(&self, item: &I) -> Option<I>;

    /// Deep-copy `item` into a node that has no connection to the live tree.
    fn detach(&self, item: &I) -> I;
}

/// Receives visual selection updates.
///
/// All methods default to doing nothing, so headless embedders can pass
/// [`NullView`].
pub trait SelectionView: Send + Sync {
    /// Mark a visual as selected.
    fn select(&self, _visual: VisualId) {}
    /// Remove the selected mark from a visual.
    fn deselect(&self, _visual: VisualId) {}
    /// Mark a visual as the indicator (cursor).
    fn indicate(&self, _visual: VisualId) {}
    /// Remove the indicator mark from a visual.
    fn deindicate(&self, _visual: VisualId) {}
}

/// A view that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullView;

impl SelectionView for NullView {}

/// A data mutation requested by a component.
#[derive(Debug, Clone, PartialEq)]
pub enum DataAction<I> {
    /// Remove a single node.
    RemoveNode(I),
    /// Remove several nodes as one undoable action.
    RemoveNodeList(Vec<I>),
    /// Insert `node` under `parent`, before `before` or at the end.
    AppendChild {
        /// The new parent.
        parent: I,
        /// The node to insert.
        node: I,
        /// Sibling to insert before.
        before: Option<I>,
    },
}

/// Executes data actions against the backing store.
pub trait ActionExecutor<I: Item>: Send + Sync {
    /// Execute `action` under the named action rule.
    ///
    /// Returns `false` when the store refused the action.
    fn execute(&self, action: DataAction<I>, rule: &str, context: &I) -> bool;
}

/// Result of an asynchronous fetch for an add action.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<I> {
    /// The node to add.
    Success(I),
    /// The fetch failed with a message.
    Failure(String),
    /// The fetch timed out.
    Timeout,
}

/// Loads data for add actions whose rule names a location.
///
/// The fetcher must eventually hand the result back through
/// [`SelectionController::complete_add`](super::SelectionController::complete_add).
pub trait DataFetcher: Send + Sync {
    /// Start loading `location` for `request`.
    fn fetch(&self, request: AddRequestId, location: &str);
}
