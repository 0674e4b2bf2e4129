//! Selection model for data-bound components.
//!
//! This module provides the selection engine of Horizon Bind:
//!
//! - [`SelectionSet`]: ordered selected items, primary and indicator
//! - [`SelectionController`]: the selection state machine and its signals
//! - Selection repair after data changes ([`SelectionController::check_selection`])
//! - Value binding ([`SelectionController::value`], [`ValueHooks`])
//! - Remove/add data actions ([`ActionRules`], [`AddRule`])
//! - [`ItemTree`]: an in-memory data tree implementing the collaborator traits
//!
//! The controller talks to the outside world only through the traits in
//! [`traits`]: [`DataTree`], [`NodeResolver`], [`SelectionView`],
//! [`ActionExecutor`] and [`DataFetcher`].

mod actions;
mod item_tree;
mod reconcile;
mod selection;
mod selection_set;
pub mod traits;
mod value;

pub use actions::{ActionRules, AddOutcome, AddRequestId, AddRule};
pub use item_tree::{ItemTree, NodeId};
pub use selection::{SelectEvent, SelectFlags, SelectOutcome, SelectionController};
pub use selection_set::SelectionSet;
pub use traits::{
    ActionExecutor, DataAction, DataFetcher, DataTree, Direction, FetchOutcome, Item, ItemRef,
    NodeResolver, NullView, SelectionView, VisualId,
};
pub use value::{ValueGetter, ValueHooks, ValueSetter};
