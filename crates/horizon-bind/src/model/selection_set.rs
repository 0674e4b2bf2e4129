//! Ordered selection storage.

/// The selected items of a component, its primary item and its indicator.
///
/// `SelectionSet` is pure data. Visual updates and events are the job of
/// [`SelectionController`](super::SelectionController).
///
/// # Invariants
///
/// - `items` never contains duplicates and is kept in selection order
/// - `primary` is a member of `items`, or `None`
/// - without multiselect, `items` holds at most one item
/// - the indicator may point anywhere, selected or not
#[derive(Debug, Clone)]
pub struct SelectionSet<I> {
    items: Vec<I>,
    primary: Option<I>,
    indicator: Option<I>,
    multiselect: bool,
}

impl<I: Clone + PartialEq> SelectionSet<I> {
    /// Creates an empty set.
    pub fn new(multiselect: bool) -> Self {
        Self {
            items: Vec::new(),
            primary: None,
            indicator: None,
            multiselect,
        }
    }

    /// Adds an item. Without multiselect the current member is replaced.
    ///
    /// Returns `false` if the item was already selected.
    pub fn add(&mut self, item: I) -> bool {
        if self.contains(&item) {
            return false;
        }
        if !self.multiselect {
            self.items.clear();
            self.primary = None;
        }
        self.items.push(item);
        true
    }

    /// Removes an item. If it was the primary, the primary moves to the first
    /// remaining item.
    pub fn remove(&mut self, item: &I) -> bool {
        let Some(pos) = self.items.iter().position(|i| i == item) else {
            return false;
        };
        self.items.remove(pos);
        if self.primary.as_ref() == Some(item) {
            self.primary = self.items.first().cloned();
        }
        true
    }

    /// Checks membership.
    pub fn contains(&self, item: &I) -> bool {
        self.items.iter().any(|i| i == item)
    }

    /// Removes every item and the primary. The indicator is kept.
    pub fn clear(&mut self) {
        self.items.clear();
        self.primary = None;
    }

    /// Replaces the selection with `items`, dropping duplicates.
    ///
    /// The primary survives if it is still a member, otherwise it becomes the
    /// first item.
    pub fn replace_all(&mut self, items: impl IntoIterator<Item = I>) {
        self.items.clear();
        for item in items {
            if !self.contains(&item) {
                self.items.push(item);
            }
        }
        if !self.multiselect {
            self.items.truncate(1);
        }
        if !self.primary.as_ref().is_some_and(|p| self.contains(p)) {
            self.primary = self.items.first().cloned();
        }
    }

    /// The selected items in selection order.
    pub fn items(&self) -> &[I] {
        &self.items
    }

    /// The primary (most recently selected) item.
    pub fn primary(&self) -> Option<&I> {
        self.primary.as_ref()
    }

    /// Makes a member the primary. Non-members are rejected.
    pub fn set_primary(&mut self, item: I) -> bool {
        if !self.contains(&item) {
            return false;
        }
        self.primary = Some(item);
        true
    }

    /// Unsets the primary without touching membership.
    pub fn clear_primary(&mut self) {
        self.primary = None;
    }

    /// The indicator (cursor) item.
    pub fn indicator(&self) -> Option<&I> {
        self.indicator.as_ref()
    }

    /// Moves the indicator.
    pub fn set_indicator(&mut self, item: I) {
        self.indicator = Some(item);
    }

    /// Removes the indicator.
    pub fn clear_indicator(&mut self) {
        self.indicator = None;
    }

    /// Number of selected items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether several items may be selected.
    pub fn is_multiselect(&self) -> bool {
        self.multiselect
    }

    /// Switches multiselect. Turning it off keeps only the primary (or the
    /// first item when there is no primary).
    pub fn set_multiselect(&mut self, multiselect: bool) {
        self.multiselect = multiselect;
        if !multiselect && self.items.len() > 1 {
            let keep = self
                .primary
                .clone()
                .or_else(|| self.items.first().cloned());
            self.items.retain(|i| Some(i) == keep.as_ref());
            self.primary = keep;
        }
    }
}

impl<I: Clone + PartialEq> Default for SelectionSet<I> {
    fn default() -> Self {
        Self::new(true)
    }
}
