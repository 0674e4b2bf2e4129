//! Validation groups.
//!
//! A [`ValidationGroup`] validates a set of elements (and their descendants)
//! together and owns the error displays they share. By default only one
//! error is shown at a time: the first invalid element in depth-first order.

use std::collections::{HashMap, HashSet};

use horizon_bind_core::logging::{span_names, targets};
use horizon_bind_core::{CancelableSignal, PerfSpan, Signal};
use serde::{Deserialize, Serialize};

use super::element::{ElementId, ElementTree};
use super::error_box::{ErrorBoxFactory, ErrorDisplay, default_error_box_factory};
use crate::error::{BindError, Result};

/// Options of a validation group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupOptions {
    /// Hidden elements are skipped.
    pub validate_visible_only: bool,
    /// Every invalid element shows its own error instead of only the first.
    pub allow_multiple_errors: bool,
}

impl GroupOptions {
    /// Parses options from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Sets `allow_multiple_errors`.
    pub fn with_multiple_errors(mut self, allow: bool) -> Self {
        self.allow_multiple_errors = allow;
        self
    }

    /// Sets `validate_visible_only`.
    pub fn with_visible_only(mut self, visible_only: bool) -> Self {
        self.validate_visible_only = visible_only;
        self
    }
}

/// A named set of elements validated together.
///
/// # Signals
///
/// - `validation`: cancelable, emitted with the group name after a pass in
///   which every element was valid. Any slot may veto the result.
/// - `scope_invalid`: a scope's custom validation failed, with the scope's
///   invalid message.
pub struct ValidationGroup {
    name: String,
    members: Vec<ElementId>,
    options: GroupOptions,
    factory: ErrorBoxFactory,
    shared_box: Option<Box<dyn ErrorDisplay>>,
    host_boxes: HashMap<ElementId, Box<dyn ErrorDisplay>>,

    /// Global rules over a passing group. Cancel to fail the pass.
    pub validation: CancelableSignal<String>,
    /// Emitted when a scope's custom validation fails.
    pub scope_invalid: Signal<(ElementId, String)>,
}

impl ValidationGroup {
    /// Creates an empty group with headless error boxes.
    pub fn new(name: impl Into<String>, options: GroupOptions) -> Self {
        Self::with_error_box_factory(name, options, default_error_box_factory())
    }

    /// Creates an empty group whose error displays come from `factory`.
    pub fn with_error_box_factory(
        name: impl Into<String>,
        options: GroupOptions,
        factory: ErrorBoxFactory,
    ) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            options,
            factory,
            shared_box: None,
            host_boxes: HashMap::new(),
            validation: CancelableSignal::new(),
            scope_invalid: Signal::new(),
        }
    }

    /// The group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The group options.
    pub fn options(&self) -> GroupOptions {
        self.options
    }

    /// Replaces the group options.
    pub fn set_options(&mut self, options: GroupOptions) {
        self.options = options;
    }

    /// The members in the order they were added.
    pub fn members(&self) -> &[ElementId] {
        &self.members
    }

    /// Checks membership.
    pub fn contains(&self, id: ElementId) -> bool {
        self.members.contains(&id)
    }

    /// Adds a member. Returns `false` if it was already a member.
    pub fn add(&mut self, id: ElementId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.members.push(id);
        true
    }

    /// Removes a member and drops its error display.
    pub fn remove(&mut self, id: ElementId) -> bool {
        let Some(pos) = self.members.iter().position(|&m| m == id) else {
            return false;
        };
        self.members.remove(pos);
        self.host_boxes.remove(&id);
        if let Some(shared) = &mut self.shared_box {
            if shared.host() == Some(id) {
                shared.hide();
                shared.set_host(None);
            }
        }
        true
    }

    // =========================================================================
    // Error displays
    // =========================================================================

    /// The error display used for `host`.
    ///
    /// With `allow_multiple_errors` every host has its own display; otherwise
    /// all hosts share one. With `create` a missing display is created.
    pub fn error_box_for(
        &mut self,
        host: ElementId,
        create: bool,
    ) -> Option<&mut Box<dyn ErrorDisplay>> {
        if self.options.allow_multiple_errors {
            if create {
                let factory = &self.factory;
                Some(self.host_boxes.entry(host).or_insert_with(|| factory()))
            } else {
                self.host_boxes.get_mut(&host)
            }
        } else {
            if create && self.shared_box.is_none() {
                self.shared_box = Some((self.factory)());
            }
            self.shared_box.as_mut()
        }
    }

    /// Hides every error display of the group.
    pub fn hide_all_errors(&mut self) {
        if let Some(shared) = &mut self.shared_box {
            shared.hide();
        }
        for display in self.host_boxes.values_mut() {
            display.hide();
        }
    }

    /// Puts an element in the error state and shows its message.
    ///
    /// Without `allow_multiple_errors` any other visible error is hidden
    /// first. The element's ancestors are asked to reveal themselves.
    pub fn show_error(&mut self, tree: &mut ElementTree, id: ElementId) -> Result<()> {
        let message = tree.element(id)?.error_message();
        if !self.options.allow_multiple_errors {
            self.hide_all_errors();
        }
        if let Some(display) = self.error_box_for(id, true) {
            display.set_message(&message);
            display.set_host(Some(id));
            display.show();
        }
        tree.set_in_error(id, true);
        tree.reveal(id);
        tracing::debug!(target: targets::VALIDATION, group = %self.name, ?id, "showing error");
        Ok(())
    }

    /// Leaves the error state. The display is hidden only if it belongs to
    /// this element.
    pub fn clear_error(&mut self, tree: &mut ElementTree, id: ElementId) {
        tree.set_in_error(id, false);
        if let Some(display) = self.error_box_for(id, false) {
            if display.host() == Some(id) {
                display.hide();
            }
        }
    }

    /// Validates one element and updates its error state.
    ///
    /// Returns whether the element is now in error: always with `force`,
    /// otherwise when its value is invalid.
    pub fn validate_element(
        &mut self,
        tree: &mut ElementTree,
        id: ElementId,
        force: bool,
    ) -> Result<bool> {
        if force || !tree.is_valid(id, false)? {
            self.show_error(tree, id)?;
            Ok(true)
        } else {
            self.clear_error(tree, id);
            Ok(false)
        }
    }

    // =========================================================================
    // Group validation
    // =========================================================================

    /// Checks whether the group, or the part below `scope`, is valid.
    ///
    /// Walks the members (or the children of `scope`) depth first. Disabled
    /// elements are skipped, and hidden ones too with `validate_visible_only`.
    /// An element fails when its value is invalid or, unless
    /// `ignore_required`, when it is required and empty. The first failure
    /// shows its error (unless `suppress_errors`) and ends the walk, except
    /// with `allow_multiple_errors` where every failure shows an error and
    /// elements that recovered lose theirs.
    ///
    /// If nothing failed, the scope's custom validation runs, then the
    /// `validation` signal. A scope validation that cannot be evaluated is a
    /// [`BindError::CustomValidation`].
    pub fn is_valid(
        &mut self,
        tree: &mut ElementTree,
        ignore_required: bool,
        suppress_errors: bool,
        scope: Option<ElementId>,
    ) -> Result<bool> {
        let _span = PerfSpan::new(span_names::VALIDATE);
        let start = match scope {
            Some(scope) => {
                tree.element(scope)?;
                tree.children(scope)
            }
            None => self.members.clone(),
        };

        let mut visited = HashSet::new();
        let mut found = self.check_children(
            tree,
            &start,
            ignore_required,
            suppress_errors,
            &mut visited,
        )?;

        if !found {
            if let Some(scope) = scope {
                found = !self.check_scope(tree, scope)?;
            }
        }
        if !found && !self.validation.emit(self.name.clone()) {
            tracing::debug!(target: targets::VALIDATION, group = %self.name, "validation vetoed");
            found = true;
        }

        tracing::debug!(
            target: targets::VALIDATION,
            group = %self.name,
            valid = !found,
            "group validated"
        );
        Ok(!found)
    }

    fn check_children(
        &mut self,
        tree: &mut ElementTree,
        ids: &[ElementId],
        ignore_required: bool,
        suppress_errors: bool,
        visited: &mut HashSet<ElementId>,
    ) -> Result<bool> {
        let allow_multiple = self.options.allow_multiple_errors;
        let mut found = false;

        for &id in ids {
            if !visited.insert(id) {
                continue;
            }
            let Some(element) = tree.get(id) else {
                continue;
            };
            let eligible = !element.is_disabled()
                && (element.is_visible() || !self.options.validate_visible_only);
            let missing = !ignore_required && element.is_required() && element.value().is_empty();
            let was_in_error = element.is_in_error();
            let children = element.children().to_vec();

            if eligible {
                let failing = !tree.is_valid(id, false)? || missing;
                if failing {
                    if !suppress_errors && (!found || allow_multiple) {
                        self.validate_element(tree, id, true)?;
                    }
                    found = true;
                    if !allow_multiple {
                        return Ok(true);
                    }
                } else if was_in_error && !suppress_errors {
                    self.clear_error(tree, id);
                }
            }

            if !children.is_empty()
                && self.check_children(tree, &children, ignore_required, suppress_errors, visited)?
            {
                found = true;
                if !allow_multiple {
                    return Ok(true);
                }
            }
        }
        Ok(found)
    }

    /// Runs the custom validation of a scope. Returns whether it passed.
    fn check_scope(&mut self, tree: &ElementTree, scope: ElementId) -> Result<bool> {
        let element = tree.element(scope)?;
        let Some(predicate) = element.scope_validation() else {
            return Ok(true);
        };
        match predicate(tree, scope) {
            Ok(true) => Ok(true),
            Ok(false) => {
                let message = element.invalid_message().unwrap_or_default().to_string();
                tracing::debug!(
                    target: targets::VALIDATION,
                    scope = element.name(),
                    "scope invalid"
                );
                self.scope_invalid.emit((scope, message));
                Ok(false)
            }
            Err(message) => {
                tracing::error!(
                    target: targets::VALIDATION,
                    scope = element.name(),
                    %message,
                    "scope validation could not be evaluated"
                );
                Err(BindError::custom_validation(element.name(), message))
            }
        }
    }
}

impl std::fmt::Debug for ValidationGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationGroup")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(ValidationGroup: Send, Sync);
