//! Remove and add actions on the selection.
//!
//! Components that declare action rules can remove the selected items and
//! add new nodes. Removal goes through the attached [`ActionExecutor`]; an
//! add either appends a given node, detaches a template, or asks the
//! [`DataFetcher`](super::DataFetcher) to load one and finishes in
//! [`SelectionController::complete_add`].

use horizon_bind_core::logging::targets;
use slotmap::new_key_type;

use super::selection::{SelectFlags, SelectionController};
use super::traits::{DataAction, FetchOutcome, Item, ItemRef};
use crate::error::{BindError, Result};

new_key_type! {
    /// Identifier of an add request waiting for fetched data.
    pub struct AddRequestId;
}

/// Action rules declared by a component.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRules<I> {
    /// A `remove` rule exists.
    pub remove: bool,
    /// A `removegroup` rule exists.
    pub remove_group: bool,
    /// The `add` rule, if any.
    pub add: Option<AddRule<I>>,
}

impl<I> Default for ActionRules<I> {
    fn default() -> Self {
        Self {
            remove: false,
            remove_group: false,
            add: None,
        }
    }
}

impl<I> ActionRules<I> {
    /// Rules with a `remove` rule only.
    pub fn with_remove(mut self) -> Self {
        self.remove = true;
        self
    }

    /// Adds a `removegroup` rule.
    pub fn with_remove_group(mut self) -> Self {
        self.remove_group = true;
        self
    }

    /// Sets the `add` rule.
    pub fn with_add(mut self, rule: AddRule<I>) -> Self {
        self.add = Some(rule);
        self
    }
}

/// How an add action finds the node to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct AddRule<I> {
    /// Location to fetch the new node from.
    pub get: Option<String>,
    /// Node that is deep-copied for each add.
    pub template: Option<I>,
    /// Parent for new nodes. Defaults to the data root.
    pub parent: Option<I>,
    /// How often a timed out fetch is retried.
    pub retries: u32,
}

impl<I> Default for AddRule<I> {
    fn default() -> Self {
        Self {
            get: None,
            template: None,
            parent: None,
            retries: 0,
        }
    }
}

impl<I> AddRule<I> {
    /// A rule that copies `template`.
    pub fn template(template: I) -> Self {
        Self {
            template: Some(template),
            ..Self::default()
        }
    }

    /// A rule that fetches from `location`.
    pub fn fetch(location: impl Into<String>) -> Self {
        Self {
            get: Some(location.into()),
            ..Self::default()
        }
    }

    /// Sets the parent for new nodes.
    pub fn with_parent(mut self, parent: I) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the number of retries for timed out fetches.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// What an add action did.
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome<I> {
    /// The node was inserted.
    Added(I),
    /// The node is being fetched.
    Pending(AddRequestId),
    /// The executor refused the insert.
    Rejected,
}

/// An add waiting on its fetch.
#[derive(Debug, Clone)]
pub(crate) struct PendingAdd<I> {
    pub(crate) location: String,
    pub(crate) before: Option<I>,
    pub(crate) parent: Option<I>,
    pub(crate) retries_left: u32,
}

const REMOVE_RULE: &str = "remove";
const REMOVE_GROUP_RULE: &str = "removegroup";
const ADD_RULE: &str = "add";

impl<I: Item> SelectionController<I> {
    /// Removes `items`, or the current selection when `None`.
    ///
    /// Several items are removed as one group action under the
    /// `removegroup` rule when it exists, when no action rules are declared,
    /// or when there is no `remove` rule. Otherwise each item is removed on
    /// its own and the result of the last removal is returned.
    ///
    /// Removing the data root is an error.
    pub fn remove(&mut self, items: Option<Vec<I>>) -> Result<bool> {
        let items = items.unwrap_or_else(|| self.set.items().to_vec());
        if items.is_empty() {
            return Ok(false);
        }
        let root = self.tree.root();
        if items.iter().any(|item| Some(item) == root.as_ref()) {
            return Err(BindError::RemoveRoot);
        }
        let executor = self
            .executor
            .clone()
            .ok_or(BindError::MissingActionExecutor)?;
        let context = items[0].clone();

        let group = items.len() > 1
            && self
                .action_rules
                .as_ref()
                .is_none_or(|rules| rules.remove_group || !rules.remove);
        if group {
            tracing::debug!(target: targets::ACTIONS, count = items.len(), "removing node list");
            return Ok(executor.execute(
                DataAction::RemoveNodeList(items),
                REMOVE_GROUP_RULE,
                &context,
            ));
        }

        let mut removed = false;
        for item in items {
            tracing::debug!(target: targets::ACTIONS, ?item, "removing node");
            removed = executor.execute(DataAction::RemoveNode(item.clone()), REMOVE_RULE, &item);
        }
        Ok(removed)
    }

    /// Adds a node.
    ///
    /// With `node` given it is appended directly. Otherwise the `add` rule
    /// decides: a `get` location starts a fetch (finished by
    /// [`complete_add`](Self::complete_add)), a template is deep-copied.
    pub fn add(
        &mut self,
        node: Option<I>,
        before: Option<I>,
        parent: Option<I>,
    ) -> Result<AddOutcome<I>> {
        if let Some(node) = node {
            return self.append_node(node, before, parent);
        }

        let rule = self
            .action_rules
            .as_ref()
            .and_then(|rules| rules.add.clone())
            .ok_or(BindError::MissingAddRule)?;

        if let Some(location) = rule.get {
            let fetcher = self.fetcher.clone().ok_or_else(|| {
                BindError::data_load(location.clone(), "no data fetcher attached")
            })?;
            let id = self.pending_adds.insert(PendingAdd {
                location: location.clone(),
                before,
                parent,
                retries_left: rule.retries,
            });
            tracing::debug!(target: targets::ACTIONS, %location, "fetching node to add");
            fetcher.fetch(id, &location);
            return Ok(AddOutcome::Pending(id));
        }

        match rule.template {
            Some(template) => {
                let node = self.tree.detach(&template);
                self.append_node(node, before, parent)
            }
            None => Err(BindError::MissingAddRule),
        }
    }

    /// Finishes an add started by a fetch.
    ///
    /// A timed out fetch is retried while retries remain.
    pub fn complete_add(
        &mut self,
        id: AddRequestId,
        outcome: FetchOutcome<I>,
    ) -> Result<AddOutcome<I>> {
        let mut pending = self
            .pending_adds
            .remove(id)
            .ok_or(BindError::UnknownAddRequest)?;

        match outcome {
            FetchOutcome::Success(node) => self.append_node(node, pending.before, pending.parent),
            FetchOutcome::Timeout if pending.retries_left > 0 => {
                pending.retries_left -= 1;
                let fetcher = self.fetcher.clone().ok_or_else(|| {
                    BindError::data_load(pending.location.clone(), "no data fetcher attached")
                })?;
                let location = pending.location.clone();
                tracing::debug!(
                    target: targets::ACTIONS,
                    %location,
                    retries_left = pending.retries_left,
                    "fetch timed out, retrying"
                );
                let id = self.pending_adds.insert(pending);
                fetcher.fetch(id, &location);
                Ok(AddOutcome::Pending(id))
            }
            FetchOutcome::Timeout => {
                tracing::error!(
                    target: targets::ACTIONS,
                    location = %pending.location,
                    "fetch timed out"
                );
                Err(BindError::data_load(pending.location, "request timed out"))
            }
            FetchOutcome::Failure(message) => {
                tracing::error!(
                    target: targets::ACTIONS,
                    location = %pending.location,
                    %message,
                    "fetch failed"
                );
                Err(BindError::data_load(pending.location, message))
            }
        }
    }

    /// Number of adds waiting for fetched data.
    pub fn pending_add_count(&self) -> usize {
        self.pending_adds.len()
    }

    fn append_node(
        &mut self,
        node: I,
        before: Option<I>,
        parent: Option<I>,
    ) -> Result<AddOutcome<I>> {
        let parent = parent
            .or_else(|| {
                self.action_rules
                    .as_ref()
                    .and_then(|rules| rules.add.as_ref())
                    .and_then(|rule| rule.parent.clone())
            })
            .or_else(|| self.tree.root())
            .ok_or(BindError::NoDataRoot)?;
        let executor = self
            .executor
            .clone()
            .ok_or(BindError::MissingActionExecutor)?;

        let action = DataAction::AppendChild {
            parent: parent.clone(),
            node: node.clone(),
            before,
        };
        if !executor.execute(action, ADD_RULE, &parent) {
            tracing::debug!(target: targets::ACTIONS, ?node, "add refused by executor");
            return Ok(AddOutcome::Rejected);
        }

        if self.options.autoselect.is_enabled() {
            self.select(ItemRef::Item(node.clone()), SelectFlags::NONE);
        }
        Ok(AddOutcome::Added(node))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::model::item_tree::{ItemTree, NodeId};
    use crate::model::traits::{DataFetcher, DataTree};
    use crate::options::{AutoSelect, SelectionOptions};

    #[derive(Default)]
    struct RecordingFetcher {
        requests: Mutex<Vec<(AddRequestId, String)>>,
    }

    impl DataFetcher for RecordingFetcher {
        fn fetch(&self, request: AddRequestId, location: &str) {
            self.requests.lock().push((request, location.to_string()));
        }
    }

    type Setup = (
        Arc<ItemTree>,
        NodeId,
        Vec<NodeId>,
        SelectionController<NodeId>,
    );

    fn setup(rules: Option<ActionRules<NodeId>>) -> Setup {
        let tree = Arc::new(ItemTree::new());
        let root = tree.create_root("root", "Root");
        let nodes: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|id| tree.add_child(root, id, id).unwrap())
            .collect();
        let options = SelectionOptions::default().with_delayed_select(false);
        let controller = SelectionController::new(options, tree.clone(), tree.clone())
            .with_actions(tree.clone(), rules);
        (tree, root, nodes, controller)
    }

    #[test]
    fn test_remove_selection_single() {
        let (tree, _, nodes, mut c) = setup(Some(ActionRules::default().with_remove()));
        c.select(nodes[1], SelectFlags::NONE);
        assert!(c.remove(None).unwrap());
        assert!(!tree.is_reachable(&nodes[1]));
    }

    #[test]
    fn test_remove_empty_is_noop() {
        let (_, _, _, mut c) = setup(None);
        assert!(!c.remove(None).unwrap());
        assert!(!c.remove(Some(Vec::new())).unwrap());
    }

    #[test]
    fn test_remove_root_is_error() {
        let (_, root, _, mut c) = setup(None);
        assert!(matches!(c.remove(Some(vec![root])), Err(BindError::RemoveRoot)));
    }

    #[test]
    fn test_remove_group_without_rules() {
        let (tree, _, nodes, mut c) = setup(None);
        assert!(c.remove(Some(vec![nodes[0], nodes[2]])).unwrap());
        assert_eq!(tree.traversable(), vec![nodes[1]]);
    }

    #[test]
    fn test_remove_without_executor() {
        let tree = Arc::new(ItemTree::new());
        let root = tree.create_root("root", "Root");
        let a = tree.add_child(root, "a", "A").unwrap();
        let mut c =
            SelectionController::new(SelectionOptions::default(), tree.clone(), tree.clone());
        assert!(matches!(
            c.remove(Some(vec![a])),
            Err(BindError::MissingActionExecutor)
        ));
    }

    #[test]
    fn test_add_template_selects_copy() {
        let (tree, root, _, mut c) = setup(None);
        let template = tree.create_node("", "New item");
        c.action_rules = Some(ActionRules::default().with_add(AddRule::template(template)));

        let AddOutcome::Added(node) = c.add(None, None, None).unwrap() else {
            panic!("expected node to be added");
        };
        assert_ne!(node, template);
        assert_eq!(tree.parent(node), Some(root));
        assert_eq!(tree.caption(node).as_deref(), Some("New item"));
        assert_eq!(c.primary(), Some(&node));
    }

    #[test]
    fn test_add_without_rule() {
        let (_, _, _, mut c) = setup(Some(ActionRules::default().with_remove()));
        assert!(matches!(c.add(None, None, None), Err(BindError::MissingAddRule)));
    }

    #[test]
    fn test_add_rejected_by_store() {
        let (tree, _, _, mut c) = setup(None);
        let node = tree.create_node("n", "N");
        tree.set_read_only(true);
        assert_eq!(c.add(Some(node), None, None).unwrap(), AddOutcome::Rejected);
        assert!(c.selected_items().is_empty());
    }

    #[test]
    fn test_add_before_sibling_without_autoselect() {
        let (tree, root, nodes, mut c) = setup(None);
        c.apply_option(crate::options::SelectionOption::AutoSelect(AutoSelect::Off));
        let node = tree.create_node("n", "N");
        c.add(Some(node), Some(nodes[1]), None).unwrap();
        assert_eq!(tree.children(root), vec![nodes[0], node, nodes[1], nodes[2]]);
        assert!(c.selected_items().is_empty());
    }

    #[test]
    fn test_fetched_add_with_retry() {
        let (tree, _, _, c) = setup(None);
        let fetcher = Arc::new(RecordingFetcher::default());
        let mut c = c.with_fetcher(fetcher.clone());
        c.action_rules = Some(
            ActionRules::default().with_add(AddRule::fetch("data/new.xml").with_retries(1)),
        );

        let AddOutcome::Pending(first) = c.add(None, None, None).unwrap() else {
            panic!("expected pending add");
        };
        assert_eq!(c.pending_add_count(), 1);

        let AddOutcome::Pending(second) = c.complete_add(first, FetchOutcome::Timeout).unwrap()
        else {
            panic!("expected retry");
        };
        assert_eq!(fetcher.requests.lock().len(), 2);

        let node = tree.create_node("fetched", "Fetched");
        let outcome = c.complete_add(second, FetchOutcome::Success(node)).unwrap();
        assert_eq!(outcome, AddOutcome::Added(node));
        assert_eq!(c.pending_add_count(), 0);
        assert!(matches!(
            c.complete_add(second, FetchOutcome::Timeout),
            Err(BindError::UnknownAddRequest)
        ));
    }

    #[test]
    fn test_fetched_add_failure() {
        let (_, _, _, c) = setup(None);
        let mut c = c.with_fetcher(Arc::new(RecordingFetcher::default()));
        c.action_rules = Some(ActionRules::default().with_add(AddRule::fetch("x")));

        let AddOutcome::Pending(id) = c.add(None, None, None).unwrap() else {
            panic!("expected pending add");
        };
        let err = c.complete_add(id, FetchOutcome::Timeout).unwrap_err();
        assert!(matches!(err, BindError::DataLoad { .. }));
    }
}
