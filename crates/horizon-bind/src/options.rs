//! Selection options.
//!
//! Options are plain data that can be built in code or loaded from TOML:
//!
//! ```
//! use horizon_bind::options::{AutoSelect, SelectionOptions};
//!
//! let options = SelectionOptions::from_toml_str(r#"
//!     multiselect = false
//!     autoselect = "off"
//!     select_delay_ms = 25
//! "#).unwrap();
//!
//! assert!(!options.multiselect);
//! assert_eq!(options.autoselect, AutoSelect::Off);
//! assert!(options.delayed_select);
//! ```
//!
//! Changing an option on a live controller goes through
//! [`SelectionOption`] so each change runs its handler.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What happens when data is loaded or the selection needs repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoSelect {
    /// Never select automatically.
    Off,
    /// Select a single item automatically.
    #[default]
    On,
    /// Select every traversable item after data is loaded.
    All,
}

impl AutoSelect {
    /// Whether any automatic selection happens.
    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// Configuration of a [`SelectionController`](crate::model::SelectionController).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionOptions {
    /// The component can receive a selection.
    pub selectable: bool,
    /// Several items may be selected.
    pub multiselect: bool,
    /// Automatic selection policy.
    pub autoselect: AutoSelect,
    /// Every selection behaves as if Ctrl were held.
    pub ctrl_select: bool,
    /// `after_select` is dispatched from a short timer.
    pub delayed_select: bool,
    /// Pressing the background clears the selection.
    pub allow_deselect: bool,
    /// Selecting the current item again fires the select events.
    pub reselectable: bool,
    /// Plain selections made through `set_temp_selected` are debounced.
    pub buffer_select: bool,
    /// Delay of a deferred `after_select`, in milliseconds.
    pub select_delay_ms: u64,
    /// Debounce delay of a temporary selection, in milliseconds.
    pub temp_select_delay_ms: u64,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            selectable: true,
            multiselect: true,
            autoselect: AutoSelect::On,
            ctrl_select: false,
            delayed_select: true,
            allow_deselect: true,
            reselectable: false,
            buffer_select: false,
            select_delay_ms: 10,
            temp_select_delay_ms: 200,
        }
    }
}

impl SelectionOptions {
    /// Parses options from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Options for a component that allows one selected item.
    pub fn single() -> Self {
        Self {
            multiselect: false,
            ..Default::default()
        }
    }

    /// Sets `delayed_select`.
    pub fn with_delayed_select(mut self, delayed: bool) -> Self {
        self.delayed_select = delayed;
        self
    }

    /// Sets `multiselect`.
    pub fn with_multiselect(mut self, multiselect: bool) -> Self {
        self.multiselect = multiselect;
        self
    }

    /// Sets `autoselect`.
    pub fn with_autoselect(mut self, autoselect: AutoSelect) -> Self {
        self.autoselect = autoselect;
        self
    }

    /// Sets `buffer_select`.
    pub fn with_buffer_select(mut self, buffer: bool) -> Self {
        self.buffer_select = buffer;
        self
    }

    /// Delay of a deferred `after_select`.
    pub fn select_delay(&self) -> Duration {
        Duration::from_millis(self.select_delay_ms)
    }

    /// Debounce delay of a temporary selection.
    pub fn temp_select_delay(&self) -> Duration {
        Duration::from_millis(self.temp_select_delay_ms)
    }
}

/// A runtime change to one selection option.
///
/// Applied with
/// [`SelectionController::apply_option`](crate::model::SelectionController::apply_option).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOption {
    /// Change `selectable`.
    Selectable(bool),
    /// Change `multiselect`. Turning it off collapses the selection to the
    /// primary item.
    Multiselect(bool),
    /// Change `autoselect`.
    AutoSelect(AutoSelect),
    /// Change `ctrl_select`.
    CtrlSelect(bool),
    /// Change `delayed_select`.
    DelayedSelect(bool),
    /// Change `allow_deselect`.
    AllowDeselect(bool),
    /// Change `reselectable`.
    Reselectable(bool),
    /// Change `buffer_select`.
    BufferSelect(bool),
}
