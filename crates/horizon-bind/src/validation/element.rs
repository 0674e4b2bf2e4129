//! Element tree of validatable components.
//!
//! [`ElementTree`] is an arena of [`Element`]s standing in for the component
//! tree of a form. Each element carries a value, optional rules and its
//! validity state; [`ElementTree::is_valid`] evaluates them.

use std::fmt;
use std::sync::Arc;

use horizon_bind_core::Signal;
use horizon_bind_core::logging::targets;
use slotmap::{SlotMap, new_key_type};

use super::rule::{RuleKind, RuleSet, ValidationRule, ValidityState};
use crate::error::{BindError, Result};

new_key_type! {
    /// Identifier of an element in an [`ElementTree`].
    pub struct ElementId;
}

/// Computes an element's value on demand, replacing its stored value.
pub type ValueSource = Arc<dyn Fn() -> String + Send + Sync>;

/// Custom validation of a scope element (a page, a panel).
///
/// Returns `Ok(false)` when the scope is invalid. `Err` means the predicate
/// itself could not be evaluated.
pub type ScopePredicate =
    Arc<dyn Fn(&ElementTree, ElementId) -> std::result::Result<bool, String> + Send + Sync>;

/// A validatable component.
#[derive(Clone)]
pub struct Element {
    name: String,
    value: String,
    value_source: Option<ValueSource>,
    required: bool,
    disabled: bool,
    visible: bool,
    rules: Option<RuleSet>,
    validity: ValidityState,
    invalid_message: Option<String>,
    custom_message: Option<String>,
    scope_validation: Option<ScopePredicate>,
    group: Option<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    in_error: bool,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.name)
            .field("value", &self.value())
            .field("required", &self.required)
            .field("disabled", &self.disabled)
            .field("visible", &self.visible)
            .field("rules", &self.rules)
            .field("validity", &self.validity)
            .field("group", &self.group)
            .field("children", &self.children)
            .field("in_error", &self.in_error)
            .finish_non_exhaustive()
    }
}

impl Element {
    /// Creates a visible, enabled element with an empty value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            value_source: None,
            required: false,
            disabled: false,
            visible: true,
            rules: None,
            validity: ValidityState::default(),
            invalid_message: None,
            custom_message: None,
            scope_validation: None,
            group: None,
            parent: None,
            children: Vec::new(),
            in_error: false,
        }
    }

    /// Sets the stored value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Reads the value from `source` instead of the stored value.
    pub fn with_value_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.value_source = Some(Arc::new(source));
        self
    }

    /// Marks the element as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the element as disabled.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Marks the element as hidden.
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Adds a rule.
    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rules
            .get_or_insert_with(RuleSet::new)
            .set_rule(rule.kind(), Some(rule));
        self
    }

    /// Sets the message shown when the element is in error.
    pub fn with_invalid_message(mut self, message: impl Into<String>) -> Self {
        self.invalid_message = Some(message.into());
        self
    }

    /// Puts the element in a validation group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets the custom validation run when this element is a validation
    /// scope.
    pub fn with_scope_validation<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ElementTree, ElementId) -> std::result::Result<bool, String>
            + Send
            + Sync
            + 'static,
    {
        self.scope_validation = Some(Arc::new(predicate));
        self
    }

    /// The element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current value.
    pub fn value(&self) -> String {
        match &self.value_source {
            Some(source) => source(),
            None => self.value.clone(),
        }
    }

    /// Whether a value is required.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Changes the required flag.
    pub fn set_required(&mut self, required: bool) {
        self.required = required;
    }

    /// Whether the element is disabled.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Enables or disables the element.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Whether the element is visible.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows or hides the element.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// The rule set, if the element has rules.
    pub fn rules(&self) -> Option<&RuleSet> {
        self.rules.as_ref()
    }

    /// Sets or unsets the rule of a kind.
    pub fn set_rule(&mut self, kind: RuleKind, rule: Option<ValidationRule>) {
        match (&mut self.rules, rule) {
            (Some(rules), rule) => rules.set_rule(kind, rule),
            (None, Some(rule)) => {
                let mut rules = RuleSet::new();
                rules.set_rule(kind, Some(rule));
                self.rules = Some(rules);
            }
            (None, None) => {}
        }
    }

    /// The validity state of the last check.
    pub fn validity(&self) -> ValidityState {
        self.validity
    }

    /// The message shown when the element is in error.
    pub fn invalid_message(&self) -> Option<&str> {
        self.invalid_message.as_deref()
    }

    /// Changes the invalid message.
    pub fn set_invalid_message(&mut self, message: Option<String>) {
        self.invalid_message = message;
    }

    /// The custom validity message, if one is set.
    pub fn custom_validity(&self) -> Option<&str> {
        self.custom_message.as_deref()
    }

    /// The message for the error display: the custom validity message, else
    /// the invalid message.
    pub fn error_message(&self) -> String {
        self.custom_message
            .clone()
            .or_else(|| self.invalid_message.clone())
            .unwrap_or_default()
    }

    /// The validation group name.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Changes the validation group name. Use [`GroupRegistry::set_group`]
    /// to also move the element between groups.
    ///
    /// [`GroupRegistry::set_group`]: super::GroupRegistry::set_group
    pub fn set_group(&mut self, group: Option<String>) {
        self.group = group;
    }

    /// The parent element.
    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// The child elements in order.
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// Whether the element is showing an error.
    pub fn is_in_error(&self) -> bool {
        self.in_error
    }

    pub(crate) fn scope_validation(&self) -> Option<ScopePredicate> {
        self.scope_validation.clone()
    }
}

/// Arena of elements.
///
/// # Signals
///
/// - `invalid`: an element failed a check, with its validity state
/// - `reveal_requested`: an ancestor of an element entering the error state
///   should make itself visible (switch to its page, expand, ...)
pub struct ElementTree {
    elements: SlotMap<ElementId, Element>,
    roots: Vec<ElementId>,
    /// Emitted when an element fails validation.
    pub invalid: Signal<(ElementId, ValidityState)>,
    /// Emitted for each ancestor of an element entering the error state.
    pub reveal_requested: Signal<ElementId>,
}

impl Default for ElementTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            elements: SlotMap::with_key(),
            roots: Vec::new(),
            invalid: Signal::new(),
            reveal_requested: Signal::new(),
        }
    }

    /// Inserts an element under `parent`, or as a root.
    ///
    /// An element without a group inherits the group of its nearest ancestor
    /// that has one.
    pub fn insert(&mut self, parent: Option<ElementId>, mut element: Element) -> Result<ElementId> {
        if let Some(parent) = parent {
            if !self.elements.contains_key(parent) {
                return Err(BindError::UnknownElement);
            }
            if element.group.is_none() {
                element.group = self
                    .ancestors(parent)
                    .find_map(|id| self.elements[id].group.clone());
            }
        }
        element.parent = parent;
        element.children.clear();

        let id = self.elements.insert(element);
        match parent {
            Some(parent) => self.elements[parent].children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Removes an element and its descendants, returning the element.
    pub fn remove(&mut self, id: ElementId) -> Result<Element> {
        let parent = self.element(id)?.parent;
        match parent {
            Some(parent) => {
                if let Some(p) = self.elements.get_mut(parent) {
                    p.children.retain(|&c| c != id);
                }
            }
            None => self.roots.retain(|&r| r != id),
        }
        for descendant in self.descendants(id) {
            self.elements.remove(descendant);
        }
        self.elements.remove(id).ok_or(BindError::UnknownElement)
    }

    /// Returns an element.
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Returns an element mutably.
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    /// Returns an element, or [`BindError::UnknownElement`].
    pub fn element(&self, id: ElementId) -> Result<&Element> {
        self.elements.get(id).ok_or(BindError::UnknownElement)
    }

    /// Checks whether the element exists.
    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// The root elements.
    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    /// The children of an element.
    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.elements
            .get(id)
            .map(|e| e.children.clone())
            .unwrap_or_default()
    }

    /// Iterates from `id` up to its root, starting with `id` itself.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(Some(id), |&current| {
            self.elements.get(current).and_then(|e| e.parent)
        })
        .filter(|id| self.elements.contains_key(*id))
    }

    /// All descendants of `id` in depth-first order.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self.children(id).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        out
    }

    /// The current value of an element.
    pub fn value(&self, id: ElementId) -> Result<String> {
        Ok(self.element(id)?.value())
    }

    /// Sets the stored value of an element.
    pub fn set_value(&mut self, id: ElementId, value: impl Into<String>) -> Result<()> {
        self.elements
            .get_mut(id)
            .ok_or(BindError::UnknownElement)?
            .value = value.into();
        Ok(())
    }

    /// Sets or clears a custom validity message.
    ///
    /// While a message is set the element fails with `custom_error`.
    pub fn set_custom_validity(&mut self, id: ElementId, message: Option<String>) -> Result<()> {
        let element = self.elements.get_mut(id).ok_or(BindError::UnknownElement)?;
        element.validity.custom_error = message.is_some();
        element.custom_message = message;
        Ok(())
    }

    /// Checks whether an element's value is valid.
    ///
    /// With `check_required`, an empty value of a required element fails with
    /// `value_missing` alone. Otherwise every rule is evaluated and every
    /// failing kind is flagged. Rules other than `NotNull` accept an empty
    /// value. `invalid` is emitted on failure.
    pub fn is_valid(&mut self, id: ElementId, check_required: bool) -> Result<bool> {
        self.evaluate(id, check_required, true)
    }

    fn evaluate(&mut self, id: ElementId, check_required: bool, check_peers: bool) -> Result<bool> {
        let element = self.element(id)?;
        let value = element.value();

        if check_required && element.required && value.is_empty() {
            let validity = &mut self.elements[id].validity;
            validity.reset();
            validity.value_missing = true;
            let state = *validity;
            tracing::debug!(target: targets::VALIDATION, ?id, "required value missing");
            self.invalid.emit((id, state));
            return Ok(false);
        }

        let rules: Vec<(RuleKind, ValidationRule)> = element
            .rules
            .iter()
            .flat_map(RuleSet::iter)
            .map(|(kind, rule)| (kind, rule.clone()))
            .collect();
        let custom_error = element.custom_message.is_some();

        let mut failed = Vec::new();
        for (kind, rule) in rules {
            if value.is_empty() && kind != RuleKind::NotNull {
                continue;
            }
            let passed = match &rule {
                ValidationRule::CheckEqual(peer) if check_peers => {
                    !self.evaluate(*peer, false, false)? || self.value(*peer)? == value
                }
                rule => rule.check(&value),
            };
            if !passed {
                failed.push(kind);
            }
        }

        let validity = &mut self.elements[id].validity;
        validity.reset();
        for kind in &failed {
            validity.set(*kind);
        }
        validity.custom_error = custom_error;

        if validity.has_failure() {
            let state = *validity;
            tracing::debug!(target: targets::VALIDATION, ?id, ?failed, "element invalid");
            self.invalid.emit((id, state));
            Ok(false)
        } else {
            validity.valid = true;
            Ok(true)
        }
    }

    pub(crate) fn set_in_error(&mut self, id: ElementId, in_error: bool) {
        if let Some(element) = self.elements.get_mut(id) {
            element.in_error = in_error;
        }
    }

    /// Asks every ancestor of `id` to make itself visible.
    pub(crate) fn reveal(&self, id: ElementId) {
        for ancestor in self.ancestors(id).skip(1) {
            self.reveal_requested.emit(ancestor);
        }
    }
}
