//! Olli: keyboard-navigable, screen-reader friendly views of charts.
//!
//! This crate is the interaction layer over [`olli_core`]. An [`Olli`]
//! instance elaborates a chart spec into a tree, keeps one item focused and
//! maps key presses to navigation:
//!
//! | Keys | Action |
//! |------|--------|
//! | Up / Down | parent / children |
//! | Left / Right | previous / next sibling |
//! | Shift+Left / Shift+Right | same position in the previous / next view |
//! | Home / End | first / last in level |
//! | Enter, Space | expand or collapse |
//! | Escape | close a dialog, or collapse |
//! | x, y, l | jump to the x axis, y axis or legend |
//! | t, f, h | data table, filter, help |
//! | o | next Olli instance on the page |
//!
//! Output is an ARIA projection ([`accessibility::project_tree`]) and, with
//! the default `accessibility` feature, AccessKit tree updates.
//!
//! # Example
//!
//! ```
//! use olli::prelude::*;
//!
//! let spec = OlliSpec::from_json(r#"{
//!     "data": [{"x": "a", "y": 1}, {"x": "b", "y": 2}],
//!     "axes": [{"field": "x", "axisType": "x"}, {"field": "y", "axisType": "y"}]
//! }"#).unwrap();
//! let mut olli = Olli::new(spec, OlliConfig::default(), None).unwrap();
//!
//! olli.handle_key(Key::ArrowDown, KeyboardModifiers::NONE).unwrap();
//! olli.handle_key(Key::Y, KeyboardModifiers::NONE).unwrap();
//! assert_eq!(olli.navigator().focused_id(), "olli-1");
//! ```

pub mod accessibility;
pub mod config;
mod error;
mod instance;
pub mod keyboard;
pub mod prelude;
pub mod runtime;

pub use olli_core;

pub use config::{OlliConfig, RenderMode};
pub use error::{Error, Result};
pub use instance::Olli;
