//! The [`Olli`] instance: one chart, its tree and its keyboard handling.

use olli_core::logging::{PerfSpan, TreeDebug, span_names, targets};
use olli_core::{
    CancellationToken, ElaboratedTree, EnrichmentCache, EnrichmentPatch, Enricher, NodeType,
    OlliSpec, Predicate, Signal, apply_patches, elaborate_tree, enrich_tree,
};

use crate::accessibility::{AriaElement, project_table, project_tree};
use crate::config::{OlliConfig, RenderMode};
use crate::error::Result;
use crate::keyboard::{Action, HelpEntry, Key, KeyBindings, KeyboardModifiers};
use crate::runtime::{
    DataTable, Dialog, DialogResult, FilterDialog, FocusChange, InstanceId, LateralDirection,
    NavigationCoordinator, Navigator,
};

/// An accessible, keyboard-navigable view of one chart.
///
/// # Example
///
/// ```
/// use olli::prelude::*;
///
/// let spec = OlliSpec::from_json(r#"{
///     "data": [{"x": "a", "y": 1}, {"x": "b", "y": 2}, {"x": "a", "y": 3}],
///     "structure": {"groupby": "x"}
/// }"#).unwrap();
/// let mut olli = Olli::new(spec, OlliConfig::default(), None).unwrap();
///
/// olli.handle_key(Key::ArrowDown, KeyboardModifiers::NONE).unwrap();
/// assert_eq!(olli.navigator().focused_id(), "olli-0");
/// ```
pub struct Olli {
    /// The spec as given, before elaboration.
    spec: OlliSpec,
    config: OlliConfig,
    bindings: KeyBindings,
    navigator: Navigator,
    dialog: Option<Dialog>,
    coordinator: Option<(NavigationCoordinator, InstanceId)>,
    cache: EnrichmentCache,
}

impl std::fmt::Debug for Olli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Olli")
            .field("namespace", &self.config.namespace)
            .field("navigator", &self.navigator)
            .field("dialog", &self.dialog.as_ref().map(Dialog::title))
            .finish()
    }
}

impl Olli {
    /// Elaborate `spec` and start with the root focused.
    ///
    /// With a coordinator the instance registers under its namespace and
    /// takes part in cycling with `o`.
    pub fn new(
        spec: OlliSpec,
        config: OlliConfig,
        coordinator: Option<NavigationCoordinator>,
    ) -> Result<Self> {
        config.validate()?;
        let bindings = config.key_bindings()?;
        let tree = elaborate_tree(&spec, &config.elaborate_options())?;
        let mut navigator = Navigator::new(tree);

        let coordinator = coordinator.map(|coordinator| {
            let id = coordinator.register(config.namespace.clone());
            navigator.attach_coordinator(coordinator.clone(), id);
            (coordinator, id)
        });

        tracing::info!(
            target: targets::INSTANCE,
            namespace = %config.namespace,
            nodes = navigator.tree().len(),
            "created instance"
        );
        Ok(Self {
            spec,
            config,
            bindings,
            navigator,
            dialog: None,
            coordinator,
            cache: EnrichmentCache::new(),
        })
    }

    pub fn config(&self) -> &OlliConfig {
        &self.config
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut Navigator {
        &mut self.navigator
    }

    pub fn tree(&self) -> &ElaboratedTree {
        self.navigator.tree()
    }

    /// This instance's id with its coordinator, if it has one.
    pub fn instance_id(&self) -> Option<InstanceId> {
        self.coordinator.as_ref().map(|&(_, id)| id)
    }

    /// Emitted after every focus move.
    pub fn focus_changed(&self) -> &Signal<FocusChange> {
        self.navigator.focus_changed()
    }

    /// Description of the focused node.
    pub fn focused_description(&self) -> String {
        self.navigator.focused_description()
    }

    /// The open dialog, if any.
    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    /// The open filter dialog, for editing its draft.
    pub fn filter_dialog_mut(&mut self) -> Option<&mut FilterDialog> {
        match &mut self.dialog {
            Some(Dialog::Filter(filter)) => Some(filter),
            _ => None,
        }
    }

    /// Take focus after the coordinator picked this instance.
    ///
    /// Re-announces the focused item.
    pub fn receive_focus(&mut self) -> bool {
        let focused = self.navigator.focused();
        self.navigator.set_focus_to_item(focused)
    }

    /// Handle one key press. Returns whether it did anything.
    ///
    /// While a dialog is open only Enter (accept) and Escape (reject) are
    /// handled.
    pub fn handle_key(&mut self, key: Key, modifiers: KeyboardModifiers) -> Result<bool> {
        if self.dialog.is_some() {
            return match key {
                Key::Enter if modifiers.none() => self.close_dialog(DialogResult::Accepted),
                Key::Escape if modifiers.none() => self.close_dialog(DialogResult::Rejected),
                _ => Ok(false),
            };
        }

        match self.bindings.action_for(key, modifiers) {
            Some(action) => {
                tracing::trace!(target: targets::KEYBOARD, ?key, %action, "dispatching");
                self.perform(action)
            }
            None => Ok(false),
        }
    }

    /// Perform `action` as if its key had been pressed.
    pub fn perform(&mut self, action: Action) -> Result<bool> {
        let nav = &mut self.navigator;
        let handled = match action {
            Action::FocusParent => nav.set_focus_to_parent_item(),
            Action::FocusChild => nav.set_focus_to_next_layer(),
            Action::PreviousSibling => nav.set_focus_to_previous_item(),
            Action::NextSibling => nav.set_focus_to_next_item(),
            Action::LateralPrevious => nav.set_focus_to_lateral_item(LateralDirection::Previous),
            Action::LateralNext => nav.set_focus_to_lateral_item(LateralDirection::Next),
            Action::FirstInLevel => nav.set_focus_to_first_in_level(),
            Action::LastInLevel => nav.set_focus_to_last_in_level(),
            Action::Activate => nav.activate(),
            Action::Dismiss => match self.dialog {
                Some(_) => return self.close_dialog(DialogResult::Rejected),
                None => {
                    let focused = nav.focused();
                    nav.collapse_tree_item(focused)
                }
            },
            Action::FocusXAxis => nav.focus_on_node_type(NodeType::XAxis),
            Action::FocusYAxis => nav.focus_on_node_type(NodeType::YAxis),
            Action::FocusLegend => nav.focus_on_node_type(NodeType::Legend),
            Action::OpenTable => {
                let table = DataTable::for_node(nav.tree(), nav.focused());
                self.open_dialog(Dialog::Table(table))
            }
            Action::OpenFilter => {
                let filter = FilterDialog::for_node(nav.tree(), nav.focused());
                self.open_dialog(Dialog::Filter(filter))
            }
            Action::OpenHelp => {
                let entries = self.bindings.help_entries();
                self.open_dialog(Dialog::Help(entries))
            }
            Action::CycleInstance => match &self.coordinator {
                Some((coordinator, _)) => coordinator.cycle().is_some(),
                None => false,
            },
        };
        Ok(handled)
    }

    fn open_dialog(&mut self, dialog: Dialog) -> bool {
        tracing::debug!(target: targets::INSTANCE, title = dialog.title(), "opened dialog");
        self.dialog = Some(dialog);
        true
    }

    /// Close the open dialog. Accepting the filter dialog rebuilds the tree
    /// with its predicate. Returns `false` if no dialog was open.
    pub fn close_dialog(&mut self, result: DialogResult) -> Result<bool> {
        let Some(dialog) = self.dialog.take() else {
            return Ok(false);
        };
        tracing::debug!(target: targets::INSTANCE, title = dialog.title(), ?result, "closed dialog");
        if let (Dialog::Filter(filter), DialogResult::Accepted) = (dialog, result) {
            self.set_selection(filter.take())?;
        }
        Ok(true)
    }

    /// Key bindings for the help overlay.
    pub fn help(&self) -> Vec<HelpEntry> {
        self.bindings.help_entries()
    }

    /// Replace the selection and rebuild the tree.
    ///
    /// Runtime state is discarded. Focus returns to the same id, or its
    /// nearest surviving ancestor. An enrichment pass started before the
    /// rebuild keeps running; its patches are rejected as stale when applied.
    pub fn set_selection(&mut self, selection: Option<Predicate>) -> Result<()> {
        let _perf = PerfSpan::new(span_names::REBUILD);
        let mut spec = self.spec.clone();
        spec.set_selection(selection);
        let tree = elaborate_tree(&spec, &self.config.elaborate_options())?;

        self.spec = spec;
        self.navigator.replace_tree(tree);
        tracing::info!(
            target: targets::INSTANCE,
            nodes = self.navigator.tree().len(),
            generation = self.navigator.tree().generation(),
            focused = %self.navigator.focused_id(),
            "rebuilt tree"
        );
        Ok(())
    }

    /// Run an enrichment pass over the current tree and apply its patches.
    /// Returns the number of descriptions changed.
    pub async fn enrich<E: Enricher>(&mut self, enricher: &E) -> usize {
        self.enrich_with_token(enricher, &CancellationToken::new()).await
    }

    /// Like [`enrich`](Self::enrich), but stops between nodes once `token`
    /// is cancelled by the caller.
    pub async fn enrich_with_token<E: Enricher>(
        &mut self,
        enricher: &E,
        token: &CancellationToken,
    ) -> usize {
        let patches = enrich_tree(self.navigator.tree(), enricher, &self.cache, token).await;
        self.apply_enrichment(patches)
    }

    /// Cache shared by this instance's enrichment passes. A pass run outside
    /// the instance with [`enrich_tree`] can reuse it and hand its patches to
    /// [`apply_enrichment`](Self::apply_enrichment) when it finishes.
    pub fn enrichment_cache(&self) -> &EnrichmentCache {
        &self.cache
    }

    /// Apply patches computed elsewhere. Stale patches are dropped.
    pub fn apply_enrichment(&mut self, patches: Vec<EnrichmentPatch>) -> usize {
        apply_patches(self.navigator.tree_mut(), patches)
    }

    pub fn render_mode(&self) -> RenderMode {
        self.config.render
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.config.render = mode;
    }

    /// Project the instance in its render mode: the visible tree, or a
    /// table of every selected record.
    pub fn render(&self) -> AriaElement {
        let tree = self.navigator.tree();
        match self.config.render {
            RenderMode::Tree => project_tree(&self.navigator),
            RenderMode::Table => project_table(&DataTable::for_node(tree, tree.root())),
        }
    }

    /// Indented dump of the tree, for logs.
    pub fn debug_tree(&self) -> String {
        TreeDebug::new(self.navigator.tree()).format_tree()
    }
}

impl Drop for Olli {
    fn drop(&mut self) {
        if let Some((coordinator, id)) = &self.coordinator {
            coordinator.unregister(*id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> OlliSpec {
        OlliSpec::from_json(
            r#"{
                "data": [{"x": "a", "y": 1}, {"x": "b", "y": 2}, {"x": "a", "y": 3}],
                "axes": [{"field": "x", "axisType": "x"}, {"field": "y", "axisType": "y"}]
            }"#,
        )
        .unwrap()
    }

    fn olli() -> Olli {
        Olli::new(spec(), OlliConfig::default(), None).unwrap()
    }

    fn press(olli: &mut Olli, key: Key) -> bool {
        olli.handle_key(key, KeyboardModifiers::NONE).unwrap()
    }

    #[test]
    fn test_arrow_keys() {
        let mut olli = olli();
        assert!(press(&mut olli, Key::ArrowDown));
        assert!(press(&mut olli, Key::ArrowRight));
        assert_eq!(olli.navigator().focused_id(), "olli-1");
        assert!(!press(&mut olli, Key::ArrowRight));
        assert!(press(&mut olli, Key::ArrowUp));
        assert_eq!(olli.navigator().focused_id(), "olli");
    }

    #[test]
    fn test_unbound_key_is_ignored() {
        let mut olli = olli();
        assert!(!press(&mut olli, Key::Q));
        assert_eq!(olli.navigator().focused_id(), "olli");
    }

    #[test]
    fn test_enter_toggles_expansion() {
        let mut olli = olli();
        let root = olli.tree().root();
        assert!(press(&mut olli, Key::Enter));
        assert!(olli.navigator().is_expanded(root));
        assert!(press(&mut olli, Key::Space));
        assert!(!olli.navigator().is_expanded(root));
    }

    #[test]
    fn test_help_dialog_closes_with_escape() {
        let mut olli = olli();
        assert!(press(&mut olli, Key::H));
        assert!(matches!(olli.dialog(), Some(Dialog::Help(entries)) if !entries.is_empty()));
        // Navigation keys are swallowed while the dialog is open.
        assert!(!press(&mut olli, Key::ArrowDown));
        assert!(press(&mut olli, Key::Escape));
        assert!(olli.dialog().is_none());
        assert_eq!(olli.navigator().focused_id(), "olli");
    }

    #[test]
    fn test_table_dialog_for_focused_node() {
        let mut olli = olli();
        let a = olli.tree().find_by_id("olli-0-0").unwrap();
        olli.navigator_mut().set_focus_to_item(a);
        assert!(press(&mut olli, Key::T));
        let Some(Dialog::Table(table)) = olli.dialog() else {
            panic!("expected a table dialog");
        };
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_cycle_without_coordinator_is_noop() {
        let mut olli = olli();
        assert!(!press(&mut olli, Key::O));
    }

    #[test]
    fn test_render_modes() {
        let mut olli = olli();
        assert_eq!(olli.render().role, crate::accessibility::AccessibleRole::Tree);
        olli.set_render_mode(RenderMode::Table);
        let table = olli.render();
        assert_eq!(table.role, crate::accessibility::AccessibleRole::Table);
        // Header row plus three records.
        assert_eq!(table.children.len(), 4);
    }

    #[test]
    fn test_debug_tree_lists_ids() {
        let olli = olli();
        let dump = olli.debug_tree();
        assert!(dump.contains("[olli-0]"));
        assert!(dump.contains("[olli-1-0]"));
    }
}
