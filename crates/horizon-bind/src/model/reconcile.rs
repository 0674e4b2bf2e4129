//! Selection repair after structural data changes.

use horizon_bind_core::PerfSpan;
use horizon_bind_core::logging::{span_names, targets};

use super::selection::{SelectFlags, SelectionController};
use super::traits::{Item, ItemRef};

impl<I: Item> SelectionController<I> {
    /// Repairs the selection after the data tree changed.
    ///
    /// Call this whenever nodes were added, moved or removed. `hint` is the
    /// item that should be selected if the current selection is gone.
    ///
    /// - With several selected items, the unreachable ones are dropped. If at
    ///   least two survive they become the selection (the old primary stays
    ///   primary when it survived) and an unreachable indicator is moved to
    ///   `hint` or the new primary. A single survivor becomes the hint.
    /// - Without a hint: a dead primary makes the first traversable item the
    ///   hint; a live primary with a dead indicator only moves the indicator;
    ///   an empty selection makes the first traversable item the hint.
    /// - A hint is selected when autoselect is on. Otherwise the selection is
    ///   cleared and only the indicator moves to the hint.
    /// - With no hint at all, the selection is cleared.
    pub fn check_selection(&mut self, hint: Option<I>) {
        let _span = PerfSpan::new(span_names::RECONCILE);
        let mut hint = hint;

        if self.set.len() > 1 {
            let survivors: Vec<I> = self
                .set
                .items()
                .iter()
                .filter(|item| self.tree.is_reachable(item))
                .cloned()
                .collect();
            tracing::debug!(
                target: targets::SELECTION,
                before = self.set.len(),
                after = survivors.len(),
                "filtered selection"
            );

            if survivors.len() >= 2 {
                let preferred = self
                    .set
                    .primary()
                    .filter(|p| survivors.contains(p))
                    .cloned();
                self.select_list(
                    survivors.into_iter().map(ItemRef::Item).collect(),
                    false,
                    preferred,
                );
                if !self.indicator_reachable() {
                    if let Some(target) = hint.or_else(|| self.set.primary().cloned()) {
                        self.point_indicator(target);
                    }
                }
                return;
            }
            if let Some(survivor) = survivors.into_iter().next() {
                hint = Some(survivor);
            }
        }

        if hint.is_none() {
            match self.set.primary().cloned() {
                Some(primary) if !self.tree.is_reachable(&primary) => {
                    hint = self.tree.first_traversable();
                }
                Some(primary) if !self.indicator_reachable() => {
                    self.point_indicator(primary);
                    return;
                }
                None if self.set.is_empty() => {
                    if self.tree.has_root() {
                        hint = self.tree.first_traversable();
                    }
                }
                _ => return,
            }
        }

        match hint {
            Some(hint) if self.options.autoselect.is_enabled() => {
                self.select(ItemRef::Item(hint), SelectFlags::NONE);
            }
            Some(hint) => {
                self.clear_selection(false, false);
                self.point_indicator(hint);
            }
            None => {
                self.clear_selection(false, false);
            }
        }
    }

    fn indicator_reachable(&self) -> bool {
        self.set
            .indicator()
            .is_none_or(|indicator| self.tree.is_reachable(indicator))
    }

    fn point_indicator(&mut self, item: I) {
        let visual = self.resolver.visual_for(&item);
        self.move_visual_indicator(visual);
        self.set.set_indicator(item);
    }
}
