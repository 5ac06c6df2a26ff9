//! Accessibility output for the navigation runtime.
//!
//! - [`project_tree`] and [`project_table`] give a render-free ARIA
//!   projection (roles, levels, positions, expansion, roving tabindex)
//! - with the `accessibility` feature, [`build_tree_update`] turns the same
//!   state into an [AccessKit](https://accesskit.dev/) `TreeUpdate` for
//!   platform screen readers

#[cfg(feature = "accessibility")]
mod tree_update;
mod aria;
mod role;

#[cfg(feature = "accessibility")]
pub use tree_update::{CONTAINER_ID, build_focus_update, build_tree_update, node_id};
pub use aria::{AriaElement, project_table, project_tree};
pub use role::AccessibleRole;
