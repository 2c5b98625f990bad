//! Observer interface for UI adapters — the engine's only outbound surface.
//!
//! Single subscriber, fire-and-forget: both methods are called synchronously
//! at the point of mutation and must not block. The engine holds no lock
//! while notifying, so an observer may call back into the engine (e.g. a
//! callback that synchronously triggers another input event).

use crate::state::SessionState;
use crate::types::Selection;

pub trait InferObserver: Send + Sync {
    /// Invoked after every state transition with the new snapshot.
    fn on_state_change(&self, _state: &SessionState) {}

    /// Invoked with `Some` on terminal selection, or `None` when a
    /// previously resolved address is invalidated by further editing.
    fn on_select(&self, _selection: Option<&Selection>) {}
}

/// Default observer that ignores everything.
pub(crate) struct NullObserver;

impl InferObserver for NullObserver {}
