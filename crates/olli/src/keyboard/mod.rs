//! Keyboard input: key codes, combinations and bindings to actions.
//!
//! - [`Key`] and [`KeyboardModifiers`]: a key press as delivered by the embedder
//! - [`KeyCombination`]: one key with modifiers, parsed from strings like `"Shift+Left"`
//! - [`KeyBindings`]: which [`Action`] each combination triggers, plus help text

mod events;
mod manager;
mod shortcut;

pub use events::{Key, KeyboardModifiers};
pub use manager::{Action, HelpEntry, KeyBindings};
pub use shortcut::{KeyCombination, KeyParseError};
