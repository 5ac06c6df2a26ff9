//! Commonly used types.
//!
//! ```
//! use olli::prelude::*;
//! ```

// ============================================================================
// Instance
// ============================================================================

pub use crate::{Error, Olli, OlliConfig, RenderMode, Result};

// ============================================================================
// Spec and Tree Model
// ============================================================================

pub use olli_core::{
    Axis, AxisType, ElaboratedTree, FieldDef, FieldPredicate, Legend, LegendChannel, Mark,
    MeasureType, NodeIndex, NodeType, OlliNode, OlliSpec, Predicate, Token, UnitSpec, Value,
    Verbosity,
};

// ============================================================================
// Keyboard
// ============================================================================

pub use crate::keyboard::{Action, Key, KeyBindings, KeyCombination, KeyboardModifiers};

// ============================================================================
// Runtime
// ============================================================================

pub use crate::runtime::{
    Dialog, DialogResult, FocusChange, LateralDirection, NavigationCoordinator, Navigator,
};

// ============================================================================
// Accessibility
// ============================================================================

pub use crate::accessibility::{AccessibleRole, AriaElement};
