use tokio::sync::watch;
use tracing::debug;

use super::reducer::{reduce, AppEvent, AppState};

/// Owner of the single mutable [`AppState`].
///
/// All mutation goes through [`StateStore::dispatch`], which applies the pure
/// reducer and publishes the new snapshot to every subscriber. Consumers hold
/// either one-shot snapshots or a `watch::Receiver` for change notification.
pub struct StateStore {
    tx: watch::Sender<AppState>,
}

impl StateStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AppState::new());
        Self { tx }
    }

    /// Apply an event through the reducer and publish the resulting state.
    pub fn dispatch(&self, event: AppEvent) {
        debug!(?event, "dispatching state event");
        self.tx.send_modify(|state| *state = reduce(state, event));
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    /// Whether microphone forwarding is currently enabled.
    pub fn mic_enabled(&self) -> bool {
        self.tx.borrow().mic_enabled
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
