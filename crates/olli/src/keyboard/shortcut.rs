//! Key combinations and their human-readable form.
//!
//! A [`KeyCombination`] is one key with modifiers. It parses from and prints
//! as strings like `"Shift+Left"`, `"Ctrl+H"` or `"x"`:
//!
//! ```
//! use olli::keyboard::{Key, KeyCombination, KeyboardModifiers};
//!
//! let combo: KeyCombination = "Shift+Left".parse().unwrap();
//! assert_eq!(combo, KeyCombination::new(Key::ArrowLeft, KeyboardModifiers::SHIFT));
//! assert_eq!(combo.to_string(), "Shift+Left");
//! ```

use std::fmt;
use std::str::FromStr;

use super::events::{Key, KeyboardModifiers};

/// A single key combination (one key with modifiers).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyCombination {
    /// The primary key.
    pub key: Key,
    /// The modifier keys that must be held.
    pub modifiers: KeyboardModifiers,
}

impl KeyCombination {
    pub fn new(key: Key, modifiers: KeyboardModifiers) -> Self {
        Self { key, modifiers }
    }

    /// Create a key combination with no modifiers.
    pub fn key_only(key: Key) -> Self {
        Self::new(key, KeyboardModifiers::NONE)
    }

    /// Create a Shift+key combination.
    pub fn shift(key: Key) -> Self {
        Self::new(key, KeyboardModifiers::SHIFT)
    }

    /// Check if this combination matches a key press exactly.
    pub fn matches(&self, key: Key, modifiers: KeyboardModifiers) -> bool {
        self.key == key && self.modifiers == modifiers
    }
}

impl fmt::Display for KeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if self.modifiers.control {
            parts.push("Ctrl");
        }
        if self.modifiers.alt {
            parts.push("Alt");
        }
        if self.modifiers.shift {
            parts.push("Shift");
        }
        if self.modifiers.meta {
            parts.push("Meta");
        }

        parts.push(key_to_string(self.key));

        write!(f, "{}", parts.join("+"))
    }
}

/// Error parsing a key combination.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    #[error("empty key combination")]
    Empty,

    /// Only modifiers were given.
    #[error("no key specified (only modifiers)")]
    NoKey,

    /// More than one non-modifier key was given.
    #[error("more than one key in '{0}'")]
    MultipleKeys(String),

    #[error("unknown key: {0}")]
    UnknownKey(String),
}

impl FromStr for KeyCombination {
    type Err = KeyParseError;

    /// Parse a combination such as `"Ctrl+Shift+H"`.
    ///
    /// Modifier names are `Ctrl`, `Alt`, `Shift` and `Meta` (or `Cmd`), in
    /// any order and case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(KeyParseError::Empty);
        }

        let mut modifiers = KeyboardModifiers::NONE;
        let mut key: Option<Key> = None;

        for part in s.split('+') {
            let part = part.trim();
            match part.to_lowercase().as_str() {
                "ctrl" | "control" => modifiers.control = true,
                "alt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "meta" | "cmd" | "command" | "super" => modifiers.meta = true,
                _ => {
                    if key.is_some() {
                        return Err(KeyParseError::MultipleKeys(s.to_string()));
                    }
                    key = Some(parse_key(part)?);
                }
            }
        }

        match key {
            Some(k) => Ok(KeyCombination::new(k, modifiers)),
            None => Err(KeyParseError::NoKey),
        }
    }
}

/// Parse a key name.
fn parse_key(s: &str) -> Result<Key, KeyParseError> {
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Key::from_char(c).ok_or_else(|| KeyParseError::UnknownKey(s.to_string()));
    }

    match s.to_lowercase().as_str() {
        "up" | "arrowup" => Ok(Key::ArrowUp),
        "down" | "arrowdown" => Ok(Key::ArrowDown),
        "left" | "arrowleft" => Ok(Key::ArrowLeft),
        "right" | "arrowright" => Ok(Key::ArrowRight),
        "home" => Ok(Key::Home),
        "end" => Ok(Key::End),
        "pageup" | "pgup" => Ok(Key::PageUp),
        "pagedown" | "pgdn" => Ok(Key::PageDown),

        "backspace" | "back" => Ok(Key::Backspace),
        "delete" | "del" => Ok(Key::Delete),
        "enter" | "return" => Ok(Key::Enter),
        "tab" => Ok(Key::Tab),
        "space" | "spacebar" => Ok(Key::Space),
        "escape" | "esc" => Ok(Key::Escape),

        "slash" => Ok(Key::Slash),
        "period" => Ok(Key::Period),
        "comma" => Ok(Key::Comma),
        "minus" => Ok(Key::Minus),

        _ => Err(KeyParseError::UnknownKey(s.to_string())),
    }
}

/// Display name of a key.
fn key_to_string(key: Key) -> &'static str {
    match key {
        Key::A => "A",
        Key::B => "B",
        Key::C => "C",
        Key::D => "D",
        Key::E => "E",
        Key::F => "F",
        Key::G => "G",
        Key::H => "H",
        Key::I => "I",
        Key::J => "J",
        Key::K => "K",
        Key::L => "L",
        Key::M => "M",
        Key::N => "N",
        Key::O => "O",
        Key::P => "P",
        Key::Q => "Q",
        Key::R => "R",
        Key::S => "S",
        Key::T => "T",
        Key::U => "U",
        Key::V => "V",
        Key::W => "W",
        Key::X => "X",
        Key::Y => "Y",
        Key::Z => "Z",
        Key::Digit0 => "0",
        Key::Digit1 => "1",
        Key::Digit2 => "2",
        Key::Digit3 => "3",
        Key::Digit4 => "4",
        Key::Digit5 => "5",
        Key::Digit6 => "6",
        Key::Digit7 => "7",
        Key::Digit8 => "8",
        Key::Digit9 => "9",
        Key::ArrowUp => "Up",
        Key::ArrowDown => "Down",
        Key::ArrowLeft => "Left",
        Key::ArrowRight => "Right",
        Key::Home => "Home",
        Key::End => "End",
        Key::PageUp => "PageUp",
        Key::PageDown => "PageDown",
        Key::Backspace => "Backspace",
        Key::Delete => "Delete",
        Key::Enter => "Enter",
        Key::Tab => "Tab",
        Key::Space => "Space",
        Key::Slash => "/",
        Key::Period => ".",
        Key::Comma => ",",
        Key::Minus => "-",
        Key::Escape => "Escape",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let combo: KeyCombination = "x".parse().unwrap();
        assert_eq!(combo, KeyCombination::key_only(Key::X));

        let combo: KeyCombination = "Enter".parse().unwrap();
        assert_eq!(combo, KeyCombination::key_only(Key::Enter));
    }

    #[test]
    fn test_parse_with_modifiers() {
        let combo: KeyCombination = "shift+left".parse().unwrap();
        assert_eq!(combo, KeyCombination::shift(Key::ArrowLeft));

        let combo: KeyCombination = "Ctrl + Alt + H".parse().unwrap();
        assert!(combo.modifiers.control);
        assert!(combo.modifiers.alt);
        assert!(!combo.modifiers.shift);
        assert_eq!(combo.key, Key::H);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<KeyCombination>(), Err(KeyParseError::Empty));
        assert_eq!("Shift".parse::<KeyCombination>(), Err(KeyParseError::NoKey));
        assert!(matches!(
            "Ctrl+Banana".parse::<KeyCombination>(),
            Err(KeyParseError::UnknownKey(k)) if k == "Banana"
        ));
        assert!(matches!(
            "A+B".parse::<KeyCombination>(),
            Err(KeyParseError::MultipleKeys(_))
        ));
    }

    #[test]
    fn test_display_round_trips() {
        for text in ["Shift+Left", "Ctrl+Alt+H", "Home", "X", "Space"] {
            let combo: KeyCombination = text.parse().unwrap();
            assert_eq!(combo.to_string(), text);
        }
    }

    #[test]
    fn test_matches_requires_exact_modifiers() {
        let combo = KeyCombination::key_only(Key::ArrowLeft);
        assert!(combo.matches(Key::ArrowLeft, KeyboardModifiers::NONE));
        assert!(!combo.matches(Key::ArrowLeft, KeyboardModifiers::SHIFT));
    }
}
