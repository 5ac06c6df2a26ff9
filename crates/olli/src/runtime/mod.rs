//! Navigation runtime: focus state, dialogs and the page-wide coordinator.

mod coordinator;
mod dialog;
mod item;
mod navigator;

pub use coordinator::{InstanceId, NavigationCoordinator};
pub use dialog::{DataTable, Dialog, DialogResult, FilterDialog, FilterOption};
pub use item::RuntimeTreeItem;
pub use navigator::{FocusChange, LateralDirection, Navigator};
