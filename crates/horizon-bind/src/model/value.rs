//! Value binding of the selection.
//!
//! A component's value is the bound display value of its primary item.
//! Setting the value selects the traversable item with that display value.

use std::fmt;
use std::sync::Arc;

use horizon_bind_core::logging::targets;

use super::selection::{SelectFlags, SelectOutcome, SelectionController};
use super::traits::{Item, ItemRef};
use crate::error::{BindError, Result};

/// Override for reading the value.
pub type ValueGetter<I> = Arc<dyn Fn(&SelectionController<I>) -> Option<String> + Send + Sync>;

/// Override for writing the value. Receives the value and the silent flag.
pub type ValueSetter<I> = Arc<
    dyn Fn(&mut SelectionController<I>, Option<&str>, bool) -> Result<SelectOutcome> + Send + Sync,
>;

/// Custom value accessors installed by a component.
///
/// When a hook is present it replaces the default behaviour entirely.
pub struct ValueHooks<I: Item> {
    /// Replaces [`SelectionController::value`].
    pub get: Option<ValueGetter<I>>,
    /// Replaces [`SelectionController::set_value`].
    pub set: Option<ValueSetter<I>>,
}

impl<I: Item> Default for ValueHooks<I> {
    fn default() -> Self {
        Self {
            get: None,
            set: None,
        }
    }
}

impl<I: Item> Clone for ValueHooks<I> {
    fn clone(&self) -> Self {
        Self {
            get: self.get.clone(),
            set: self.set.clone(),
        }
    }
}

impl<I: Item> fmt::Debug for ValueHooks<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueHooks")
            .field("get", &self.get.is_some())
            .field("set", &self.set.is_some())
            .finish()
    }
}

impl<I: Item> ValueHooks<I> {
    /// Sets the getter override.
    pub fn with_get<F>(mut self, get: F) -> Self
    where
        F: Fn(&SelectionController<I>) -> Option<String> + Send + Sync + 'static,
    {
        self.get = Some(Arc::new(get));
        self
    }

    /// Sets the setter override.
    pub fn with_set<F>(mut self, set: F) -> Self
    where
        F: Fn(&mut SelectionController<I>, Option<&str>, bool) -> Result<SelectOutcome>
            + Send
            + Sync
            + 'static,
    {
        self.set = Some(Arc::new(set));
        self
    }
}

impl<I: Item> SelectionController<I> {
    /// The value of the component.
    ///
    /// Without a value bind rule this is [`BindError::MissingValueRule`].
    pub fn value(&self) -> Result<Option<String>> {
        if let Some(get) = &self.value_hooks.get {
            return Ok(get(self));
        }
        if !self.resolver.has_value_rule() {
            return Err(BindError::MissingValueRule);
        }
        Ok(self
            .set
            .primary()
            .and_then(|primary| self.resolver.display_value(primary)))
    }

    /// Selects the item whose bound display value is `value`.
    ///
    /// An empty or missing value, or a value no item carries, clears the
    /// selection.
    pub fn set_value(&mut self, value: Option<&str>, silent: bool) -> Result<SelectOutcome> {
        if let Some(set) = self.value_hooks.set.clone() {
            return set(self, value, silent);
        }
        if !self.is_active() {
            return Ok(SelectOutcome::Inactive);
        }
        if !self.resolver.has_value_rule() {
            return Err(BindError::MissingValueRule);
        }
        if !self.tree.has_root() {
            return Ok(SelectOutcome::Unchanged);
        }

        let target = value
            .filter(|v| !v.is_empty())
            .and_then(|v| self.find_by_value(v));
        match target {
            Some(item) => {
                let flags = if silent {
                    SelectFlags::SILENT
                } else {
                    SelectFlags::NONE
                };
                Ok(self.select(ItemRef::Item(item), flags))
            }
            None => {
                tracing::debug!(
                    target: targets::SELECTION,
                    ?value,
                    "no item carries value, clearing"
                );
                Ok(if self.clear_selection(false, silent) {
                    SelectOutcome::Cleared
                } else {
                    SelectOutcome::Cancelled
                })
            }
        }
    }

    /// Recomputes the cached value from the primary item and announces a
    /// change through `value_changed`.
    pub(crate) fn refresh_value(&mut self) {
        let value = self
            .set
            .primary()
            .and_then(|primary| self.resolver.display_value(primary));
        if value != self.value {
            self.value = value.clone();
            self.value_changed.emit(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::model::item_tree::{ItemTree, NodeId};
    use crate::options::SelectionOptions;

    fn setup() -> (Arc<ItemTree>, Vec<NodeId>, SelectionController<NodeId>) {
        let tree = Arc::new(ItemTree::new());
        let root = tree.create_root("root", "Root");
        let nodes: Vec<_> = [("nl", "Netherlands"), ("be", "Belgium")]
            .iter()
            .map(|(id, caption)| tree.add_child(root, id, caption).unwrap())
            .collect();
        tree.set_value(nodes[0], Some("NL"));
        tree.set_value(nodes[1], Some("BE"));
        let options = SelectionOptions::default().with_delayed_select(false);
        let controller = SelectionController::new(options, tree.clone(), tree.clone());
        (tree, nodes, controller)
    }

    #[test]
    fn test_value_of_primary() {
        let (_, nodes, mut c) = setup();
        assert_eq!(c.value().unwrap(), None);
        c.select(nodes[1], SelectFlags::NONE);
        assert_eq!(c.value().unwrap().as_deref(), Some("BE"));
    }

    #[test]
    fn test_set_value_selects_and_clears() {
        let (_, nodes, mut c) = setup();
        assert_eq!(c.set_value(Some("NL"), false).unwrap(), SelectOutcome::Selected);
        assert_eq!(c.primary(), Some(&nodes[0]));

        assert_eq!(c.set_value(Some("XX"), false).unwrap(), SelectOutcome::Cleared);
        assert!(c.selected_items().is_empty());

        c.set_value(Some("BE"), true).unwrap();
        assert_eq!(c.set_value(Some(""), false).unwrap(), SelectOutcome::Cleared);
        assert_eq!(c.primary(), None);
    }

    #[test]
    fn test_missing_value_rule() {
        let (tree, _, mut c) = setup();
        tree.set_value_rule(false);
        assert!(matches!(c.value(), Err(BindError::MissingValueRule)));
        assert!(matches!(
            c.set_value(Some("NL"), false),
            Err(BindError::MissingValueRule)
        ));
    }

    #[test]
    fn test_value_changed_fires_on_change_only() {
        let (_, nodes, mut c) = setup();
        let values = Arc::new(Mutex::new(Vec::new()));
        let values_clone = values.clone();
        c.value_changed
            .connect(move |value| values_clone.lock().push(value.clone()));

        c.select(nodes[0], SelectFlags::NONE);
        c.reselect();
        c.select(nodes[1], SelectFlags::NONE);
        assert_eq!(
            *values.lock(),
            vec![Some("NL".to_string()), Some("BE".to_string())]
        );
    }

    #[test]
    fn test_value_hooks_override() {
        let (_, nodes, c) = setup();
        let sets = Arc::new(AtomicUsize::new(0));
        let sets_clone = sets.clone();
        let hooks = ValueHooks::default()
            .with_get(|c: &SelectionController<NodeId>| {
                Some(format!("{} selected", c.selected_count()))
            })
            .with_set(move |_, _, _| {
                sets_clone.fetch_add(1, Ordering::SeqCst);
                Ok(SelectOutcome::Unchanged)
            });
        let mut c = c.with_value_hooks(hooks);

        c.select(nodes[0], SelectFlags::NONE);
        assert_eq!(c.value().unwrap().as_deref(), Some("1 selected"));
        assert_eq!(c.set_value(Some("BE"), false).unwrap(), SelectOutcome::Unchanged);
        assert_eq!(sets.load(Ordering::SeqCst), 1);
        assert_eq!(c.primary(), Some(&nodes[0]));
    }
}
