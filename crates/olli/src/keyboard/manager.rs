//! Key bindings from key combinations to navigation actions.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use olli_core::logging::targets;
use serde::{Deserialize, Serialize};

use super::events::{Key, KeyboardModifiers};
use super::shortcut::KeyCombination;
use crate::error::{Error, Result};

/// Something a key can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Move focus to the parent item.
    FocusParent,
    /// Move focus into the children of the focused item.
    FocusChild,
    PreviousSibling,
    NextSibling,
    /// Same position in the previous view.
    LateralPrevious,
    /// Same position in the next view.
    LateralNext,
    FirstInLevel,
    LastInLevel,
    /// Toggle expansion of the focused item.
    Activate,
    /// Close the open dialog, or collapse the focused item.
    Dismiss,
    FocusXAxis,
    FocusYAxis,
    FocusLegend,
    OpenTable,
    OpenFilter,
    OpenHelp,
    /// Move to the next chart on the page.
    CycleInstance,
}

impl Action {
    pub const ALL: [Action; 17] = [
        Action::FocusParent,
        Action::FocusChild,
        Action::PreviousSibling,
        Action::NextSibling,
        Action::LateralPrevious,
        Action::LateralNext,
        Action::FirstInLevel,
        Action::LastInLevel,
        Action::Activate,
        Action::Dismiss,
        Action::FocusXAxis,
        Action::FocusYAxis,
        Action::FocusLegend,
        Action::OpenTable,
        Action::OpenFilter,
        Action::OpenHelp,
        Action::CycleInstance,
    ];

    /// Name used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::FocusParent => "focus_parent",
            Action::FocusChild => "focus_child",
            Action::PreviousSibling => "previous_sibling",
            Action::NextSibling => "next_sibling",
            Action::LateralPrevious => "lateral_previous",
            Action::LateralNext => "lateral_next",
            Action::FirstInLevel => "first_in_level",
            Action::LastInLevel => "last_in_level",
            Action::Activate => "activate",
            Action::Dismiss => "dismiss",
            Action::FocusXAxis => "focus_x_axis",
            Action::FocusYAxis => "focus_y_axis",
            Action::FocusLegend => "focus_legend",
            Action::OpenTable => "open_table",
            Action::OpenFilter => "open_filter",
            Action::OpenHelp => "open_help",
            Action::CycleInstance => "cycle_instance",
        }
    }

    /// One-line explanation for the help dialog.
    pub fn help(self) -> &'static str {
        match self {
            Action::FocusParent => "Go up a level",
            Action::FocusChild => "Go down a level",
            Action::PreviousSibling => "Previous item in this level",
            Action::NextSibling => "Next item in this level",
            Action::LateralPrevious => "Same item in the previous view",
            Action::LateralNext => "Same item in the next view",
            Action::FirstInLevel => "First item in this level",
            Action::LastInLevel => "Last item in this level",
            Action::Activate => "Expand or collapse",
            Action::Dismiss => "Close dialog or collapse",
            Action::FocusXAxis => "Go to the x-axis",
            Action::FocusYAxis => "Go to the y-axis",
            Action::FocusLegend => "Go to the legend",
            Action::OpenTable => "Show data table",
            Action::OpenFilter => "Filter the chart",
            Action::OpenHelp => "Show keyboard help",
            Action::CycleInstance => "Go to the next chart on the page",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownAction(s.to_string()))
    }
}

/// One line of the help dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpEntry {
    /// Every combination bound to the action, comma separated.
    pub keys: String,
    pub action: Action,
    pub description: &'static str,
}

/// Ordered key bindings.
///
/// A combination is bound to at most one action; an action may have several
/// combinations.
#[derive(Debug, Clone, Default)]
pub struct KeyBindings {
    bindings: Vec<(KeyCombination, Action)>,
}

impl KeyBindings {
    /// Bindings with nothing bound.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard tree navigation keys.
    pub fn defaults() -> Self {
        use Action::*;
        let key = KeyCombination::key_only;
        Self {
            bindings: vec![
                (key(Key::ArrowUp), FocusParent),
                (key(Key::ArrowDown), FocusChild),
                (key(Key::ArrowLeft), PreviousSibling),
                (key(Key::ArrowRight), NextSibling),
                (KeyCombination::shift(Key::ArrowLeft), LateralPrevious),
                (KeyCombination::shift(Key::ArrowRight), LateralNext),
                (key(Key::Home), FirstInLevel),
                (key(Key::End), LastInLevel),
                (key(Key::Enter), Activate),
                (key(Key::Space), Activate),
                (key(Key::Escape), Dismiss),
                (key(Key::X), FocusXAxis),
                (key(Key::Y), FocusYAxis),
                (key(Key::L), FocusLegend),
                (key(Key::T), OpenTable),
                (key(Key::F), OpenFilter),
                (key(Key::H), OpenHelp),
                (key(Key::O), CycleInstance),
            ],
        }
    }

    /// Bind `combo` to `action`.
    ///
    /// Fails if the combination is already bound to a different action.
    pub fn bind(&mut self, combo: KeyCombination, action: Action) -> Result<()> {
        match self.lookup(combo) {
            Some(existing) if existing == action => Ok(()),
            Some(existing) => Err(Error::BindingConflict {
                keys: combo.to_string(),
                existing,
                requested: action,
            }),
            None => {
                self.bindings.push((combo, action));
                Ok(())
            }
        }
    }

    /// Replace every combination of `action` with `combo`.
    pub fn rebind(&mut self, action: Action, combo: KeyCombination) -> Result<()> {
        if let Some(existing) = self.lookup(combo).filter(|&a| a != action) {
            return Err(Error::BindingConflict {
                keys: combo.to_string(),
                existing,
                requested: action,
            });
        }
        self.bindings.retain(|&(_, a)| a != action);
        self.bindings.push((combo, action));
        tracing::debug!(target: targets::KEYBOARD, %action, keys = %combo, "rebound action");
        Ok(())
    }

    /// Remove a combination. Returns the action it was bound to.
    pub fn unbind(&mut self, combo: KeyCombination) -> Option<Action> {
        let position = self.bindings.iter().position(|&(c, _)| c == combo)?;
        Some(self.bindings.remove(position).1)
    }

    /// Apply `action name = "Key+Combo"` overrides, as read from configuration.
    ///
    /// Each override replaces all of the action's default combinations.
    /// Conflicts are checked against the final table, so two actions can
    /// swap keys. On error the bindings are left unchanged.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, String>) -> Result<()> {
        let mut parsed = Vec::with_capacity(overrides.len());
        for (name, keys) in overrides {
            let action: Action = name.parse()?;
            let combo: KeyCombination = keys.parse()?;
            parsed.push((combo, action));
        }

        let mut next = self.clone();
        next.bindings
            .retain(|&(_, a)| !parsed.iter().any(|&(_, overridden)| overridden == a));
        for (combo, action) in parsed {
            next.bind(combo, action)?;
            tracing::debug!(target: targets::KEYBOARD, %action, keys = %combo, "rebound action");
        }
        *self = next;
        Ok(())
    }

    fn lookup(&self, combo: KeyCombination) -> Option<Action> {
        self.bindings
            .iter()
            .find(|&&(c, _)| c == combo)
            .map(|&(_, a)| a)
    }

    /// The action for a key press.
    ///
    /// Letter keys pressed with Shift alone also match their unshifted
    /// binding, so type-ahead works with caps.
    pub fn action_for(&self, key: Key, modifiers: KeyboardModifiers) -> Option<Action> {
        let action = self
            .bindings
            .iter()
            .find(|(c, _)| c.matches(key, modifiers))
            .map(|&(_, a)| a);
        match action {
            Some(a) => Some(a),
            None if key.is_letter() && modifiers == KeyboardModifiers::SHIFT => {
                self.action_for(key, KeyboardModifiers::NONE)
            }
            None => None,
        }
    }

    /// Combinations bound to `action`, in binding order.
    pub fn combos_for(&self, action: Action) -> Vec<KeyCombination> {
        self.bindings
            .iter()
            .filter(|&&(_, a)| a == action)
            .map(|&(c, _)| c)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Help entries for every bound action, in action order.
    pub fn help_entries(&self) -> Vec<HelpEntry> {
        Action::ALL
            .into_iter()
            .filter_map(|action| {
                let combos = self.combos_for(action);
                if combos.is_empty() {
                    return None;
                }
                let keys: Vec<String> = combos.iter().map(ToString::to_string).collect();
                Some(HelpEntry {
                    keys: keys.join(", "),
                    action,
                    description: action.help(),
                })
            })
            .collect()
    }

    /// Help entries as aligned plain text, one per line.
    pub fn help_text(&self) -> String {
        let entries = self.help_entries();
        let width = entries.iter().map(|e| e.keys.len()).max().unwrap_or(0);
        let mut text = String::new();
        for entry in entries {
            writeln!(text, "{:width$}  {}", entry.keys, entry.description).expect("write to String");
        }
        text
    }
}
