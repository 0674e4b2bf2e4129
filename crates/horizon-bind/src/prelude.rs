//! Prelude module for Horizon Bind.
//!
//! ```
//! use horizon_bind::prelude::*;
//! ```

// ============================================================================
// Signals
// ============================================================================

pub use horizon_bind_core::{CancelableSignal, ConnectionId, Propagation, Signal};

// ============================================================================
// Selection
// ============================================================================

pub use crate::model::{
    DataTree, Item, ItemTree, NodeId, NodeResolver, SelectEvent, SelectFlags, SelectOutcome,
    SelectionController, SelectionView,
};
pub use crate::options::{AutoSelect, SelectionOptions};

// ============================================================================
// Validation
// ============================================================================

pub use crate::validation::{
    Element, ElementId, ElementTree, GroupOptions, GroupRegistry, ValidationGroup,
    ValidationRule, ValidityState,
};

// ============================================================================
// Errors
// ============================================================================

pub use crate::error::{BindError, Result};
