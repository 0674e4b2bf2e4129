//! Client-side validation of component trees.
//!
//! - [`ValidationRule`] and [`RuleSet`]: per-element checks, reported as a
//!   [`ValidityState`]
//! - [`ElementTree`]: the validatable components and their values
//! - [`ValidationGroup`]: validates a set of elements together and shows
//!   their errors
//! - [`GroupRegistry`]: named groups, created on first use
//!
//! ```
//! use horizon_bind::validation::{Element, ElementTree, GroupRegistry};
//!
//! let mut registry = GroupRegistry::new();
//! let mut tree = ElementTree::new();
//! let email = registry
//!     .insert(&mut tree, None, Element::new("email").required().with_group("signup"))
//!     .unwrap();
//!
//! assert!(!registry.is_valid("signup", &mut tree, false, false, None).unwrap());
//! assert!(tree.get(email).unwrap().is_in_error());
//!
//! tree.set_value(email, "ada@example.com").unwrap();
//! assert!(registry.is_valid("signup", &mut tree, false, false, None).unwrap());
//! ```

mod element;
mod error_box;
mod group;
mod registry;
mod rule;

pub use element::{Element, ElementId, ElementTree, ScopePredicate, ValueSource};
pub use error_box::{ErrorBox, ErrorBoxFactory, ErrorDisplay, default_error_box_factory};
pub use group::{GroupOptions, ValidationGroup};
pub use registry::GroupRegistry;
pub use rule::{CustomPredicate, DataType, RuleKind, RuleSet, ValidationRule, ValidityState};
