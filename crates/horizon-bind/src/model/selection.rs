//! Selection controller for data-bound components.
//!
//! [`SelectionController`] keeps a component's visual selection in step with
//! its semantic (data) selection. It supports single selection, Ctrl-toggle,
//! Shift-range, selection requests buffered until data arrives, debounced
//! temporary selection, and repair after the data tree changes (see
//! [`SelectionController::check_selection`]).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_bind::model::{ItemTree, SelectFlags, SelectOutcome, SelectionController};
//! use horizon_bind::options::SelectionOptions;
//!
//! let tree = Arc::new(ItemTree::new());
//! let root = tree.create_root("root", "Root");
//! let a = tree.add_child(root, "a", "Alpha").unwrap();
//! let b = tree.add_child(root, "b", "Beta").unwrap();
//!
//! let options = SelectionOptions::default().with_delayed_select(false);
//! let mut selection = SelectionController::new(options, tree.clone(), tree.clone());
//!
//! selection.after_select.connect(|event| {
//!     println!("selected {:?}", event.list);
//! });
//!
//! assert_eq!(selection.select(a, SelectFlags::NONE), SelectOutcome::Selected);
//! assert_eq!(selection.select(b, SelectFlags::CTRL), SelectOutcome::Selected);
//! assert_eq!(selection.selected_items(), &[a, b]);
//! ```
//!
//! # Event ordering
//!
//! Signals fire synchronously, in the order operations are invoked, with one
//! exception: with `delayed_select` on, `after_select` is queued on a short
//! timer and only fires from [`SelectionController::process_timers`]. Code
//! must not assume it has run when `select` returns.

use std::sync::Arc;
use std::time::{Duration, Instant};

use horizon_bind_core::logging::{span_names, targets};
use horizon_bind_core::{CancelableSignal, PerfSpan, Signal, TimerId, TimerQueue};
use slotmap::SlotMap;

use super::actions::{ActionRules, AddRequestId, PendingAdd};
use super::selection_set::SelectionSet;
use super::traits::{
    ActionExecutor, DataFetcher, DataTree, Direction, Item, ItemRef, NodeResolver, NullView,
    SelectionView, VisualId,
};
use super::value::ValueHooks;
use crate::error::{BindError, Result};
use crate::options::{AutoSelect, SelectionOption, SelectionOptions};

/// Modifiers and switches for a select call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectFlags {
    /// Ctrl was held: toggle membership.
    pub ctrl: bool,
    /// Shift was held: select a range.
    pub shift: bool,
    /// Only change the visuals, not the selected items.
    pub visual_only: bool,
    /// Select even if nothing would change.
    pub force: bool,
    /// Do not emit events.
    pub silent: bool,
}

impl SelectFlags {
    /// Plain selection.
    pub const NONE: Self = Self::empty();

    /// Ctrl held.
    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::empty()
    };

    /// Shift held.
    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::empty()
    };

    /// Forced selection.
    pub const FORCE: Self = Self {
        force: true,
        ..Self::empty()
    };

    /// Selection without events.
    pub const SILENT: Self = Self {
        silent: true,
        ..Self::empty()
    };

    const fn empty() -> Self {
        Self {
            ctrl: false,
            shift: false,
            visual_only: false,
            force: false,
            silent: false,
        }
    }

    /// Creates flags with ctrl set.
    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// Creates flags with shift set.
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Creates flags with visual_only set.
    pub fn with_visual_only(mut self) -> Self {
        self.visual_only = true;
        self
    }

    /// Creates flags with force set.
    pub fn with_force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Creates flags with silent set.
    pub fn with_silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// What a selection request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The selection was made.
    Selected,
    /// Nothing changed (already selected, or nothing to select).
    Unchanged,
    /// No data root yet; the request was buffered.
    Buffered,
    /// A `before_*` slot or the select rule vetoed the request.
    Cancelled,
    /// The target could not be resolved; the selection was cleared.
    Unresolved,
    /// The component is not selectable or is disabled.
    Inactive,
    /// The selection was cleared instead of made.
    Cleared,
}

impl SelectOutcome {
    /// Whether a selection was actually made.
    pub fn succeeded(self) -> bool {
        matches!(self, Self::Selected)
    }
}

/// Payload of `before_select` and `after_select`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectEvent<I> {
    /// The selection list. Before: the current list. After: the new list.
    pub list: Vec<I>,
    /// The item the operation targets.
    pub item: Option<I>,
}

/// A select call captured while no data root was attached.
#[derive(Debug, Clone)]
pub(crate) struct PendingSelection<I> {
    pub(crate) target: ItemRef<I>,
    pub(crate) flags: SelectFlags,
    pub(crate) prior_autoselect: AutoSelect,
}

/// An item shown as selected while its debounce timer runs.
#[derive(Debug, Clone)]
pub(crate) struct TempSelection<I> {
    pub(crate) item: I,
    pub(crate) visual: Option<VisualId>,
}

/// Work queued on the controller's timers.
#[derive(Debug, Clone)]
pub(crate) enum Deferred<I> {
    AfterSelect(SelectEvent<I>),
    CommitTemp,
}

/// Selection state machine of a data-bound component.
///
/// # Signals
///
/// - `before_select`: cancelable, before a selection is made
/// - `after_select`: after a selection is made (maybe deferred)
/// - `before_deselect`: cancelable, before the selection is cleared
/// - `after_deselect`: after the selection is cleared
/// - `indicate`: after the indicator moved through `set_indicator`
/// - `before_choose` / `after_choose`: around `choose`
/// - `value_changed`: the bound value of the selection changed
pub struct SelectionController<I: Item> {
    pub(crate) options: SelectionOptions,
    pub(crate) disabled: bool,
    pub(crate) set: SelectionSet<I>,

    pub(crate) tree: Arc<dyn DataTree<I>>,
    pub(crate) resolver: Arc<dyn NodeResolver<I>>,
    pub(crate) view: Arc<dyn SelectionView>,

    /// Visual currently marked selected.
    pub(crate) visual_selected: Option<VisualId>,
    /// Visual currently marked as indicator.
    pub(crate) visual_indicator: Option<VisualId>,

    pub(crate) pending: Option<PendingSelection<I>>,
    pub(crate) temp: Option<TempSelection<I>>,
    pub(crate) temp_timer: Option<TimerId>,
    pub(crate) timers: TimerQueue<Deferred<I>>,

    /// Last value announced through `value_changed`.
    pub(crate) value: Option<String>,
    pub(crate) value_hooks: ValueHooks<I>,

    pub(crate) executor: Option<Arc<dyn ActionExecutor<I>>>,
    pub(crate) fetcher: Option<Arc<dyn DataFetcher>>,
    pub(crate) action_rules: Option<ActionRules<I>>,
    pub(crate) pending_adds: SlotMap<AddRequestId, PendingAdd<I>>,

    /// Emitted before a selection is made. Any slot may cancel it.
    pub before_select: CancelableSignal<SelectEvent<I>>,
    /// Emitted after a selection is made.
    pub after_select: Signal<SelectEvent<I>>,
    /// Emitted before the selection is cleared, with the items to clear.
    pub before_deselect: CancelableSignal<Vec<I>>,
    /// Emitted after the selection is cleared, with the cleared items.
    pub after_deselect: Signal<Vec<I>>,
    /// Emitted when the indicator is moved explicitly.
    pub indicate: Signal<Option<I>>,
    /// Emitted before an item is chosen. Any slot may cancel it.
    pub before_choose: CancelableSignal<Option<I>>,
    /// Emitted after an item is chosen, with the primary item.
    pub after_choose: Signal<Option<I>>,
    /// Emitted when the bound value of the selection changes.
    pub value_changed: Signal<Option<String>>,
}

impl<I: Item> SelectionController<I> {
    /// Creates a controller over a data tree and a resolver.
    pub fn new(
        options: SelectionOptions,
        tree: Arc<dyn DataTree<I>>,
        resolver: Arc<dyn NodeResolver<I>>,
    ) -> Self {
        Self {
            set: SelectionSet::new(options.multiselect),
            options,
            disabled: false,
            tree,
            resolver,
            view: Arc::new(NullView),
            visual_selected: None,
            visual_indicator: None,
            pending: None,
            temp: None,
            temp_timer: None,
            timers: TimerQueue::new(),
            value: None,
            value_hooks: ValueHooks::default(),
            executor: None,
            fetcher: None,
            action_rules: None,
            pending_adds: SlotMap::with_key(),
            before_select: CancelableSignal::new(),
            after_select: Signal::new(),
            before_deselect: CancelableSignal::new(),
            after_deselect: Signal::new(),
            indicate: Signal::new(),
            before_choose: CancelableSignal::new(),
            after_choose: Signal::new(),
            value_changed: Signal::new(),
        }
    }

    /// Attaches the view that renders selection marks.
    pub fn with_view(mut self, view: Arc<dyn SelectionView>) -> Self {
        self.view = view;
        self
    }

    /// Installs value get/set overrides.
    pub fn with_value_hooks(mut self, hooks: ValueHooks<I>) -> Self {
        self.value_hooks = hooks;
        self
    }

    /// Attaches the data action executor and its action rules.
    ///
    /// `None` rules means the component declares no action rules at all.
    pub fn with_actions(
        mut self,
        executor: Arc<dyn ActionExecutor<I>>,
        rules: Option<ActionRules<I>>,
    ) -> Self {
        self.executor = Some(executor);
        self.action_rules = rules;
        self
    }

    /// Attaches the fetcher used by add rules that name a location.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn DataFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    // =========================================================================
    // State
    // =========================================================================

    /// The current options.
    pub fn options(&self) -> &SelectionOptions {
        &self.options
    }

    /// Whether the component is disabled.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Enables or disables the component.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Whether selection operations are currently allowed.
    pub fn is_active(&self) -> bool {
        self.options.selectable && !self.disabled
    }

    /// The selected items, in selection order.
    pub fn selected_items(&self) -> &[I] {
        self.set.items()
    }

    /// Deep copies of the selected items, detached from the live tree.
    pub fn detached_selection(&self) -> Vec<I> {
        self.set
            .items()
            .iter()
            .map(|item| self.tree.detach(item))
            .collect()
    }

    /// The primary selected item.
    pub fn primary(&self) -> Option<&I> {
        self.set.primary()
    }

    /// The indicator item.
    pub fn indicator(&self) -> Option<&I> {
        self.set.indicator()
    }

    /// Checks whether an item is selected.
    pub fn is_selected(&self, item: &I) -> bool {
        self.set.contains(item)
    }

    /// Number of selected items.
    pub fn selected_count(&self) -> usize {
        self.set.len()
    }

    /// Whether a select call is buffered waiting for data.
    pub fn has_pending_selection(&self) -> bool {
        self.pending.is_some()
    }

    /// The item shown as temporarily selected, if any.
    pub fn temp_selected(&self) -> Option<&I> {
        self.temp.as_ref().map(|t| &t.item)
    }

    /// The visual currently marked selected.
    pub fn selected_visual(&self) -> Option<VisualId> {
        self.visual_selected
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Selects an item.
    ///
    /// `target` may be an item, a string id (resolved by id, then by bound
    /// display value) or a visual. If it cannot be resolved the selection is
    /// cleared and [`SelectOutcome::Unresolved`] is returned.
    ///
    /// Without a data root the call is buffered and replayed by the next
    /// `select` once a root exists; that next call is then ignored.
    #[tracing::instrument(skip(self, target), target = "horizon_bind::selection", level = "debug")]
    pub fn select(&mut self, target: impl Into<ItemRef<I>>, flags: SelectFlags) -> SelectOutcome {
        if !self.is_active() {
            return SelectOutcome::Inactive;
        }
        let _span = PerfSpan::new(span_names::SELECT);
        let target = target.into();

        let mut flags = flags;
        if self.options.ctrl_select && !flags.shift {
            flags.ctrl = true;
        }

        if !self.tree.has_root() {
            let prior_autoselect = self
                .pending
                .take()
                .map_or(self.options.autoselect, |p| p.prior_autoselect);
            tracing::debug!(
                target: targets::SELECTION,
                reference = ?target,
                "no data root, buffering select"
            );
            self.pending = Some(PendingSelection {
                target,
                flags,
                prior_autoselect,
            });
            if !self.options.autoselect.is_enabled() {
                self.options.autoselect = AutoSelect::On;
            }
            return SelectOutcome::Buffered;
        }

        if let Some(pending) = self.pending.take() {
            if self.options.autoselect.is_enabled() {
                self.options.autoselect = pending.prior_autoselect;
            }
            tracing::debug!(
                target: targets::SELECTION,
                replayed = ?pending.target,
                ignored = ?target,
                "replaying buffered select"
            );
            return self.select(pending.target, pending.flags);
        }

        let Some((item, visual)) = self.resolve(&target) else {
            tracing::debug!(
                target: targets::SELECTION,
                reference = ?target,
                "select target not found"
            );
            self.clear_selection(false, flags.silent);
            return SelectOutcome::Unresolved;
        };

        if !flags.silent {
            let event = SelectEvent {
                list: self.set.items().to_vec(),
                item: Some(item.clone()),
            };
            if !self.before_select.emit(event) || !self.resolver.is_selectable(&item) {
                tracing::debug!(target: targets::SELECTION, ?item, "select vetoed");
                return SelectOutcome::Cancelled;
            }
        }

        let last_indicator = self.set.indicator().cloned();
        self.set.set_indicator(item.clone());
        let multiselect = self.options.multiselect;

        if flags.shift && multiselect {
            let anchor = self.set.items().first().cloned().or(last_indicator);
            let range = self.range_between(anchor.as_ref(), &item);
            self.move_visual_indicator(visual);
            self.replace_selection(range, None);
            self.visual_selected = visual;
        } else if flags.ctrl && multiselect {
            if self.set.contains(&item) {
                let was_primary = self.set.primary() == Some(&item);
                if !flags.visual_only {
                    self.set.remove(&item);
                } else if was_primary {
                    self.set.clear_primary();
                }
                if let Some(v) = visual {
                    self.view.deselect(v);
                }
            } else {
                if let Some(v) = visual {
                    self.view.select(v);
                }
                if !flags.visual_only {
                    self.set.add(item.clone());
                    self.set.set_primary(item.clone());
                }
            }
            self.move_visual_indicator(visual);
            self.visual_selected = visual;
        } else if flags.visual_only && visual.is_some() && self.set.contains(&item) {
            return SelectOutcome::Unchanged;
        } else {
            if !flags.force
                && !self.options.reselectable
                && self.set.len() == 1
                && self.set.primary() == Some(&item)
            {
                if visual.is_some() {
                    if self.visual_indicator != visual {
                        self.move_visual_indicator(visual);
                    }
                    self.visual_selected = visual;
                }
                return SelectOutcome::Unchanged;
            }

            self.unmark_selection();
            self.set.clear();
            self.set.add(item.clone());
            self.set.set_primary(item.clone());
            self.move_visual_indicator(visual);
            if let Some(v) = visual {
                self.view.select(v);
            }
            self.visual_selected = visual;
        }

        if !flags.silent {
            self.dispatch_after_select(SelectEvent {
                list: self.set.items().to_vec(),
                item: Some(item),
            });
        }
        SelectOutcome::Selected
    }

    /// Replaces the whole selection with `items` in one change.
    ///
    /// Entries that cannot be resolved are skipped. The primary becomes
    /// `preferred` if it was resolved, otherwise the first resolved item.
    pub fn select_list(
        &mut self,
        items: Vec<ItemRef<I>>,
        silent: bool,
        preferred: Option<I>,
    ) -> bool {
        if !self.is_active() {
            return false;
        }
        if !silent {
            let event = SelectEvent {
                list: self.set.items().to_vec(),
                item: preferred.clone(),
            };
            if !self.before_select.emit(event) {
                return false;
            }
        }

        self.clear_selection(false, true);

        let mut resolved = Vec::with_capacity(items.len());
        for target in items {
            match self.resolve(&target) {
                Some((item, _)) => resolved.push(item),
                None => {
                    tracing::warn!(
                        target: targets::SELECTION,
                        reference = ?target,
                        "item could not be found while selecting a list, ignoring"
                    );
                }
            }
        }
        self.replace_selection(resolved, preferred.as_ref());

        if !silent {
            self.emit_after_select(SelectEvent {
                list: self.set.items().to_vec(),
                item: preferred,
            });
        }
        true
    }

    /// Clears the selection.
    ///
    /// With `only_primary` only the primary is unset and membership is kept.
    /// The indicator stays where it is and is marked again afterwards.
    pub fn clear_selection(&mut self, only_primary: bool, silent: bool) -> bool {
        if !self.is_active() {
            return false;
        }

        let cleared: Vec<I> = if only_primary {
            self.set.primary().cloned().into_iter().collect()
        } else {
            self.set.items().to_vec()
        };
        if !silent && !self.before_deselect.emit(cleared.clone()) {
            return false;
        }

        if let Some(v) = self.set.primary().and_then(|p| self.resolver.visual_for(p)) {
            self.view.deselect(v);
        }
        self.visual_selected = None;
        self.set.clear_primary();

        if !only_primary {
            for item in self.set.items().iter().rev() {
                if let Some(v) = self.resolver.visual_for(item) {
                    self.view.deselect(v);
                }
            }
            self.set.clear();
        }

        if let Some(indicator) = self.set.indicator() {
            let visual = self.resolver.visual_for(indicator);
            if let Some(v) = visual {
                self.view.indicate(v);
            }
            self.visual_indicator = visual;
            self.visual_selected = visual;
        }

        if !silent {
            self.after_deselect.emit(cleared);
        }
        true
    }

    /// Moves the indicator without changing the selected items.
    ///
    /// Unlike `select` there is no fallback: an unresolvable target is a
    /// [`BindError::MissingReference`].
    pub fn set_indicator(&mut self, target: impl Into<ItemRef<I>>) -> Result<()> {
        let target = target.into();
        let Some((item, visual)) = self.resolve(&target) else {
            tracing::error!(
                target: targets::SELECTION,
                reference = ?target,
                "indicator target not found"
            );
            return Err(BindError::missing_reference(format!("{target:?}")));
        };
        self.move_visual_indicator(visual);
        self.set.set_indicator(item.clone());
        self.indicate.emit(Some(item));
        Ok(())
    }

    /// Selects every traversable item.
    ///
    /// Requires multiselect, an active component and a current visual
    /// selection.
    pub fn select_all(&mut self) -> bool {
        if !self.options.multiselect || !self.is_active() || self.visual_selected.is_none() {
            return false;
        }
        let nodes = self.tree.traversable();
        self.select_list(nodes.into_iter().map(ItemRef::Item).collect(), false, None)
    }

    /// Selects the primary again, forcing the events.
    pub fn reselect(&mut self) -> SelectOutcome {
        match self.set.primary().cloned() {
            Some(primary) => self.select(ItemRef::Item(primary), SelectFlags::FORCE),
            None => SelectOutcome::Unchanged,
        }
    }

    /// Chooses an item (Enter or double click): selects it and emits
    /// `after_choose` with the primary.
    pub fn choose(&mut self, target: Option<ItemRef<I>>) -> bool {
        if !self.is_active() {
            return false;
        }
        let item = target.and_then(|t| self.resolve(&t)).map(|(item, _)| item);
        if !self.before_choose.emit(item.clone()) {
            return false;
        }
        if let Some(item) = item {
            self.select(ItemRef::Item(item), SelectFlags::NONE);
        }
        self.after_choose.emit(self.set.primary().cloned());
        true
    }

    /// Selects the traversable item after the indicator (or primary).
    pub fn select_next(&mut self) -> SelectOutcome {
        self.select_neighbour(Direction::Forward)
    }

    /// Selects the traversable item before the indicator (or primary).
    pub fn select_previous(&mut self) -> SelectOutcome {
        self.select_neighbour(Direction::Backward)
    }

    fn select_neighbour(&mut self, direction: Direction) -> SelectOutcome {
        let from = self
            .set
            .indicator()
            .or(self.set.primary())
            .filter(|i| self.tree.is_reachable(i))
            .cloned();
        let next = match from {
            Some(from) => self.tree.next_traversable(&from, direction),
            None => self.tree.first_traversable(),
        };
        match next {
            Some(next) => self.select(ItemRef::Item(next), SelectFlags::NONE),
            None => SelectOutcome::Unchanged,
        }
    }

    /// The item to select once `item` is gone: the nearest unselected
    /// traversable neighbour, else (in a tree) the traversal parent.
    pub fn default_next(&self, item: &I, is_tree: bool) -> Option<I> {
        match self.next_unselected(item) {
            Some(next) if next != *item => Some(next),
            _ if is_tree => self.tree.traverse_parent(item),
            _ => None,
        }
    }

    /// Selects the item that should follow `item`.
    ///
    /// Falls back to the traversal parent outside tree mode; in tree mode
    /// with no neighbour the selection is cleared silently.
    pub fn default_select_next(&mut self, item: &I, is_tree: bool) -> SelectOutcome {
        let next = self.next_unselected(item);
        if next.is_some() || !is_tree {
            if let Some(target) = next.or_else(|| self.tree.traverse_parent(item)) {
                return self.select(ItemRef::Item(target), SelectFlags::NONE);
            }
        }
        self.clear_selection(false, true);
        SelectOutcome::Cleared
    }

    fn next_unselected(&self, item: &I) -> Option<I> {
        for direction in [Direction::Forward, Direction::Backward] {
            let mut current = self.tree.next_traversable(item, direction);
            while let Some(candidate) = current {
                if !self.set.contains(&candidate) {
                    return Some(candidate);
                }
                current = self.tree.next_traversable(&candidate, direction);
            }
        }
        None
    }

    // =========================================================================
    // Temporary selection
    // =========================================================================

    /// Marks an item as selected without committing, for double-click
    /// disambiguation.
    ///
    /// Ctrl commits any temporary selection and only moves the indicator.
    /// Shift drops the temporary selection and selects a range. Without
    /// `buffer_select` the item is selected immediately. Otherwise the item is
    /// shown as selected and committed when the debounce timer fires or
    /// [`select_temp`](Self::select_temp) is called.
    pub fn set_temp_selected(
        &mut self,
        target: impl Into<ItemRef<I>>,
        ctrl: bool,
        shift: bool,
    ) -> Result<()> {
        let target = target.into();
        self.cancel_temp_timer();

        if ctrl || self.options.ctrl_select {
            if let Some(temp) = self.temp.take() {
                self.select(ItemRef::Item(temp.item), SelectFlags::NONE);
            }
            return self.set_indicator(target);
        }

        if shift {
            if let Some(v) = self.temp.take().and_then(|t| t.visual) {
                self.view.deselect(v);
            }
            self.select(target, SelectFlags::SHIFT);
            return Ok(());
        }

        if !self.options.buffer_select {
            self.select(target, SelectFlags::NONE);
            return Ok(());
        }

        let Some((item, visual)) = self.resolve(&target) else {
            return Err(BindError::missing_reference(format!("{target:?}")));
        };
        let previous = self.temp.as_ref().and_then(|t| t.visual);
        if let Some(v) = previous.or(self.visual_selected) {
            self.view.deselect(v);
        }
        if let Some(v) = previous.or(self.visual_indicator) {
            self.view.deindicate(v);
        }
        if let Some(v) = visual {
            self.view.indicate(v);
            self.view.select(v);
        }
        self.temp = Some(TempSelection { item, visual });
        self.temp_timer = Some(
            self.timers
                .start_one_shot(self.options.temp_select_delay(), Deferred::CommitTemp),
        );
        Ok(())
    }

    /// Commits the temporary selection, if any.
    pub fn select_temp(&mut self) -> SelectOutcome {
        self.cancel_temp_timer();
        match self.temp.take() {
            Some(temp) => self.select(ItemRef::Item(temp.item), SelectFlags::NONE),
            None => SelectOutcome::Unchanged,
        }
    }

    fn cancel_temp_timer(&mut self) {
        if let Some(id) = self.temp_timer.take() {
            let _ = self.timers.stop(id);
        }
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Runs the timers due at `now`: deferred `after_select` dispatch and
    /// temporary selection commits.
    ///
    /// Returns the number of timers that fired.
    pub fn process_timers(&mut self, now: Instant) -> usize {
        let _span = PerfSpan::new(span_names::TIMER);
        let fired = self.timers.process_expired(now);
        let count = fired.len();
        for (id, deferred) in fired {
            match deferred {
                Deferred::AfterSelect(event) => self.emit_after_select(event),
                Deferred::CommitTemp => {
                    if self.temp_timer == Some(id) {
                        self.temp_timer = None;
                    }
                    self.select_temp();
                }
            }
        }
        count
    }

    /// Time until the next timer is due.
    pub fn time_until_next_timer(&mut self) -> Option<Duration> {
        self.timers.time_until_next(Instant::now())
    }

    // =========================================================================
    // Options
    // =========================================================================

    /// Changes one option and runs its handler.
    pub fn apply_option(&mut self, option: SelectionOption) {
        tracing::debug!(target: targets::SELECTION, ?option, "applying option");
        match option {
            SelectionOption::Selectable(value) => self.options.selectable = value,
            SelectionOption::Multiselect(value) => {
                self.options.multiselect = value;
                if !value && self.set.len() > 1 {
                    if let Some(primary) = self.set.primary().cloned() {
                        self.select(ItemRef::Item(primary), SelectFlags::FORCE);
                    }
                }
                self.set.set_multiselect(value);
            }
            SelectionOption::AutoSelect(value) => self.options.autoselect = value,
            SelectionOption::CtrlSelect(value) => self.options.ctrl_select = value,
            SelectionOption::DelayedSelect(value) => self.options.delayed_select = value,
            SelectionOption::AllowDeselect(value) => self.options.allow_deselect = value,
            SelectionOption::Reselectable(value) => self.options.reselectable = value,
            SelectionOption::BufferSelect(value) => self.options.buffer_select = value,
        }
    }

    /// Notifies the controller that data was loaded.
    ///
    /// Repairs the selection (which autoselects the first item when
    /// autoselect is on) and, with `autoselect = All`, selects everything.
    pub fn data_loaded(&mut self) {
        self.check_selection(None);
        if self.options.autoselect == AutoSelect::All && self.options.multiselect {
            self.select_all();
        }
    }

    /// Handles a press on the component background.
    ///
    /// Clears the selection when `allow_deselect` is on and no modifier is
    /// held.
    pub fn background_pressed(&mut self, ctrl: bool, shift: bool) -> bool {
        if ctrl || shift || !self.options.allow_deselect {
            return false;
        }
        self.clear_selection(false, false)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Resolves a target to an item and its visual.
    pub(crate) fn resolve(&self, target: &ItemRef<I>) -> Option<(I, Option<VisualId>)> {
        let item = match target {
            ItemRef::Item(item) => item.clone(),
            ItemRef::Id(id) => self
                .resolver
                .resolve_id(id)
                .or_else(|| self.find_by_value(id))?,
            ItemRef::Visual(visual) => {
                let id = self.resolver.id_for_visual(*visual)?;
                let item = self.resolver.resolve_id(&id)?;
                return Some((item, Some(*visual)));
            }
        };
        let visual = self.resolver.visual_for(&item);
        Some((item, visual))
    }

    /// Finds the traversable item whose bound display value equals `value`.
    pub(crate) fn find_by_value(&self, value: &str) -> Option<I> {
        self.tree
            .traversable()
            .into_iter()
            .find(|node| self.resolver.display_value(node).as_deref() == Some(value))
    }

    /// The traversal range from `anchor` to `target`, in that order.
    fn range_between(&self, anchor: Option<&I>, target: &I) -> Vec<I> {
        let nodes = self.tree.traversable();
        let end = nodes.iter().position(|n| n == target);
        let start = anchor.and_then(|a| nodes.iter().position(|n| n == a));
        match (start, end) {
            (Some(start), Some(end)) if start <= end => nodes[start..=end].to_vec(),
            (Some(start), Some(end)) => nodes[end..=start].iter().rev().cloned().collect(),
            _ => vec![target.clone()],
        }
    }

    /// Replaces the selected items without events and re-marks the visuals.
    fn replace_selection(&mut self, items: Vec<I>, preferred: Option<&I>) {
        self.unmark_selection();
        self.set.replace_all(items);
        let primary = preferred
            .filter(|p| self.set.contains(p))
            .or(self.set.items().first())
            .cloned();
        if let Some(primary) = primary {
            self.set.set_primary(primary);
        }
        for item in self.set.items() {
            if let Some(v) = self.resolver.visual_for(item) {
                self.view.select(v);
            }
        }
        self.visual_selected = self.set.primary().and_then(|p| self.resolver.visual_for(p));
    }

    /// Removes the selected marks of every selected visual.
    fn unmark_selection(&mut self) {
        if let Some(v) = self.visual_selected.take() {
            self.view.deselect(v);
        }
        for item in self.set.items() {
            if let Some(v) = self.resolver.visual_for(item) {
                self.view.deselect(v);
            }
        }
    }

    pub(crate) fn move_visual_indicator(&mut self, visual: Option<VisualId>) {
        if let Some(old) = self.visual_indicator.take() {
            if Some(old) != visual {
                self.view.deindicate(old);
            }
        }
        if let Some(v) = visual {
            self.view.indicate(v);
        }
        self.visual_indicator = visual;
    }

    fn dispatch_after_select(&mut self, event: SelectEvent<I>) {
        if self.options.delayed_select {
            self.timers
                .start_one_shot(self.options.select_delay(), Deferred::AfterSelect(event));
        } else {
            self.emit_after_select(event);
        }
    }

    fn emit_after_select(&mut self, event: SelectEvent<I>) {
        self.after_select.emit(event);
        self.refresh_value();
    }
}

static_assertions::assert_impl_all!(SelectionController<String>: Send, Sync);
