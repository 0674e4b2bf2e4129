//! Horizon Bind - selection and validation for data-bound component trees.
//!
//! The crate has two engines that share the signal and timer runtime of
//! `horizon-bind-core`:
//!
//! - [`model`]: a selection state machine over a tree of data items, with
//!   single and multi selection, keyboard navigation, delayed dispatch,
//!   selection repair after data changes, value binding and remove/add
//!   data actions
//! - [`validation`]: per-element rules, validity states and validation
//!   groups that show one error (or all of them) at a time
//!
//! Neither engine draws anything. Presentation goes through small traits
//! ([`model::SelectionView`], [`validation::ErrorDisplay`]) the host
//! implements.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_bind::prelude::*;
//!
//! let tree = Arc::new(ItemTree::new());
//! let root = tree.create_root("root", "Inbox");
//! let a = tree.add_child(root, "a", "First").unwrap();
//! let b = tree.add_child(root, "b", "Second").unwrap();
//!
//! let options = SelectionOptions::default().with_delayed_select(false);
//! let mut controller = SelectionController::new(options, tree.clone(), tree.clone());
//! controller.select(a, SelectFlags::NONE);
//! controller.select(b, SelectFlags::CTRL);
//!
//! assert_eq!(controller.selected_items(), &[a, b]);
//! assert_eq!(controller.primary(), Some(&b));
//! ```

pub mod error;
pub mod model;
pub mod options;
pub mod prelude;
pub mod validation;

pub use error::{BindError, Result};
pub use horizon_bind_core::{CancelableSignal, ConnectionId, Propagation, Signal};
