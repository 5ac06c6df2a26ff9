//! Shared registry of Olli instances on one page.

use std::sync::Arc;

use olli_core::Signal;
use olli_core::logging::targets;
use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Identifies one registered instance.
    pub struct InstanceId;
}

#[derive(Debug, Default)]
struct CoordinatorState {
    instances: SlotMap<InstanceId, String>,
    /// Registration order.
    order: Vec<InstanceId>,
    last_focused: Option<InstanceId>,
}

struct CoordinatorInner {
    state: Mutex<CoordinatorState>,
    focus_requested: Signal<InstanceId>,
}

/// Tracks the instances on a page and which one was focused last.
///
/// Cloning gives another handle to the same registry. Pass one handle to
/// every instance that should take part in cycling with `o`.
#[derive(Clone)]
pub struct NavigationCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl Default for NavigationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NavigationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("NavigationCoordinator")
            .field("instances", &state.order.len())
            .field("last_focused", &state.last_focused)
            .finish()
    }
}

impl NavigationCoordinator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                state: Mutex::new(CoordinatorState::default()),
                focus_requested: Signal::new(),
            }),
        }
    }

    /// Register an instance under its namespace.
    pub fn register(&self, namespace: impl Into<String>) -> InstanceId {
        let mut state = self.inner.state.lock();
        let id = state.instances.insert(namespace.into());
        state.order.push(id);
        id
    }

    /// Remove an instance. Returns `false` if it was not registered.
    pub fn unregister(&self, id: InstanceId) -> bool {
        let mut state = self.inner.state.lock();
        if state.instances.remove(id).is_none() {
            return false;
        }
        state.order.retain(|&i| i != id);
        if state.last_focused == Some(id) {
            state.last_focused = None;
        }
        true
    }

    /// Registered instances, in registration order.
    pub fn instances(&self) -> Vec<InstanceId> {
        self.inner.state.lock().order.clone()
    }

    pub fn namespace(&self, id: InstanceId) -> Option<String> {
        self.inner.state.lock().instances.get(id).cloned()
    }

    /// Record `id` as the last focused instance.
    pub fn set_last_focused(&self, id: InstanceId) {
        let mut state = self.inner.state.lock();
        if state.instances.contains_key(id) {
            state.last_focused = Some(id);
        }
    }

    pub fn last_focused(&self) -> Option<InstanceId> {
        self.inner.state.lock().last_focused
    }

    /// Request focus for the instance registered after the last focused one,
    /// wrapping around. With no instance focused yet, the first is chosen.
    ///
    /// Emits [`focus_requested`](Self::focus_requested) with the chosen id.
    pub fn cycle(&self) -> Option<InstanceId> {
        let next = {
            let mut state = self.inner.state.lock();
            let position = state
                .last_focused
                .and_then(|last| state.order.iter().position(|&i| i == last));
            let next = match position {
                Some(p) => state.order.get((p + 1) % state.order.len()).copied(),
                None => state.order.first().copied(),
            }?;
            state.last_focused = Some(next);
            next
        };
        tracing::debug!(target: targets::NAVIGATE, instance = ?next, "cycling to next instance");
        self.inner.focus_requested.emit(next);
        Some(next)
    }

    /// Emitted when an instance should take keyboard focus.
    pub fn focus_requested(&self) -> &Signal<InstanceId> {
        &self.inner.focus_requested
    }
}
