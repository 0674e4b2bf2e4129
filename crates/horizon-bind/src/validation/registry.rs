//! Validation group registry.

use std::collections::HashMap;

use horizon_bind_core::logging::targets;

use super::element::{Element, ElementId, ElementTree};
use super::error_box::{ErrorBoxFactory, default_error_box_factory};
use super::group::{GroupOptions, ValidationGroup};
use crate::error::{BindError, Result};

/// Owns the validation groups of a form.
///
/// Elements join the group named by [`Element::group`] when they are
/// attached. A group that does not exist yet is created on first use with
/// default options.
pub struct GroupRegistry {
    groups: HashMap<String, ValidationGroup>,
    counter: usize,
    factory: ErrorBoxFactory,
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupRegistry {
    /// Creates an empty registry with headless error boxes.
    pub fn new() -> Self {
        Self::with_error_box_factory(default_error_box_factory())
    }

    /// Creates an empty registry whose groups take their error displays
    /// from `factory`.
    pub fn with_error_box_factory(factory: ErrorBoxFactory) -> Self {
        Self {
            groups: HashMap::new(),
            counter: 0,
            factory,
        }
    }

    /// Creates a group, or updates the options of an existing one.
    ///
    /// An unnamed group gets a generated name (`validgroup1`, ...). Returns
    /// the group name.
    pub fn create(&mut self, name: Option<&str>, options: GroupOptions) -> String {
        let name = match name {
            Some(name) => name.to_string(),
            None => loop {
                self.counter += 1;
                let candidate = format!("validgroup{}", self.counter);
                if !self.groups.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        match self.groups.get_mut(&name) {
            Some(group) => group.set_options(options),
            None => {
                tracing::debug!(target: targets::VALIDATION, group = %name, "group created");
                let group =
                    ValidationGroup::with_error_box_factory(&name, options, self.factory.clone());
                self.groups.insert(name.clone(), group);
            }
        }
        name
    }

    /// Returns a group.
    pub fn get(&self, name: &str) -> Option<&ValidationGroup> {
        self.groups.get(name)
    }

    /// Returns a group mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ValidationGroup> {
        self.groups.get_mut(name)
    }

    /// Group names in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no group exists.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Inserts an element into the tree and attaches it to its group.
    pub fn insert(
        &mut self,
        tree: &mut ElementTree,
        parent: Option<ElementId>,
        element: Element,
    ) -> Result<ElementId> {
        let id = tree.insert(parent, element)?;
        self.attach(tree, id)?;
        Ok(id)
    }

    /// Adds an element to the group it names, creating the group if needed.
    ///
    /// Returns the group name, or `None` for an element without a group.
    pub fn attach(&mut self, tree: &ElementTree, id: ElementId) -> Result<Option<String>> {
        let Some(name) = tree.element(id)?.group().map(str::to_string) else {
            return Ok(None);
        };
        if !self.groups.contains_key(&name) {
            self.create(Some(&name), GroupOptions::default());
        }
        if let Some(group) = self.groups.get_mut(&name) {
            group.add(id);
        }
        Ok(Some(name))
    }

    /// Moves an element to another group, or out of every group.
    pub fn set_group(
        &mut self,
        tree: &mut ElementTree,
        id: ElementId,
        group: Option<&str>,
    ) -> Result<()> {
        self.detach(tree, id)?;
        tree.get_mut(id)
            .ok_or(BindError::UnknownElement)?
            .set_group(group.map(str::to_string));
        self.attach(tree, id)?;
        Ok(())
    }

    /// Removes an element and its descendants from the tree and from their
    /// groups.
    pub fn remove_element(&mut self, tree: &mut ElementTree, id: ElementId) -> Result<Element> {
        tree.element(id)?;
        let mut ids = vec![id];
        ids.extend(tree.descendants(id));
        for member in ids {
            self.detach(tree, member)?;
        }
        tree.remove(id)
    }

    fn detach(&mut self, tree: &mut ElementTree, id: ElementId) -> Result<()> {
        let Some(name) = tree.element(id)?.group().map(str::to_string) else {
            return Ok(());
        };
        if let Some(group) = self.groups.get_mut(&name) {
            if group.contains(id) {
                group.clear_error(tree, id);
                group.remove(id);
            }
        }
        Ok(())
    }

    /// Validates one element through its group.
    ///
    /// Returns whether the element is in error, or `None` when it has no
    /// group.
    pub fn validate(
        &mut self,
        tree: &mut ElementTree,
        id: ElementId,
        force: bool,
    ) -> Result<Option<bool>> {
        let Some(name) = tree.element(id)?.group().map(str::to_string) else {
            return Ok(None);
        };
        match self.groups.get_mut(&name) {
            Some(group) => group.validate_element(tree, id, force).map(Some),
            None => Ok(None),
        }
    }

    /// Validates a group. See [`ValidationGroup::is_valid`].
    pub fn is_valid(
        &mut self,
        name: &str,
        tree: &mut ElementTree,
        ignore_required: bool,
        suppress_errors: bool,
        scope: Option<ElementId>,
    ) -> Result<bool> {
        let group = self.groups.get_mut(name).ok_or_else(|| {
            tracing::error!(target: targets::VALIDATION, group = name, "unknown validation group");
            BindError::missing_reference(format!("validation group '{name}'"))
        })?;
        group.is_valid(tree, ignore_required, suppress_errors, scope)
    }
}

impl std::fmt::Debug for GroupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupRegistry")
            .field("groups", &self.groups)
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}
