//! # Session Store
//!
//! Shared session state: the current operation, the current error, the
//! status line, and the last published snapshots.
//!
//! The core only talks to the [`SessionStore`] trait. [`InMemoryStore`] is the
//! stock implementation; it fans change notifications out over bounded
//! channels so a UI thread can poll them without holding any lock.
//!
//! ```text
//! ┌──────────────┐  update_*   ┌──────────────┐  StoreEvent  ┌──────────┐
//! │  Controller  │ ──────────▶ │  Store       │ ───────────▶ │  UI      │
//! │  + engines   │             │  (RwLock)    │  (bounded)   │  poller  │
//! └──────────────┘             └──────────────┘              └──────────┘
//! ```

use std::sync::Arc;

use chainbrawler_shared::{
    ClaimsSnapshot, LeaderboardSnapshot, Operation, OperationStatus, PoolsSnapshot,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};

/// Contract for the session state the core reads and writes.
///
/// Only the currently active operation is expected to write.
pub trait SessionStore: Send + Sync {
    /// Replaces the operation slot (`None` empties it).
    fn update_operation(&self, operation: Option<Operation>);
    /// Current operation, if any.
    fn operation(&self) -> Option<Operation>;
    /// Global loading flag.
    fn is_loading(&self) -> bool;
    /// Current error message.
    fn error(&self) -> Option<String>;
    /// Sets or clears the current error message.
    fn set_error(&self, error: Option<String>);
    /// Replaces the status line.
    fn set_status_message(&self, message: String);
    /// Publishes a leaderboard snapshot.
    fn update_leaderboard(&self, snapshot: LeaderboardSnapshot);
    /// Last published leaderboard snapshot.
    fn leaderboard(&self) -> Option<Arc<LeaderboardSnapshot>>;
    /// Publishes a claims snapshot.
    fn update_claims(&self, snapshot: ClaimsSnapshot);
    /// Last published claims snapshot.
    fn claims(&self) -> Option<Arc<ClaimsSnapshot>>;
    /// Publishes a pools snapshot.
    fn update_pools(&self, snapshot: PoolsSnapshot);
    /// Last published pools snapshot.
    fn pools(&self) -> Option<Arc<PoolsSnapshot>>;
}

/// Change notification emitted by [`InMemoryStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    /// Operation slot changed; carries the new status (`None` = emptied).
    OperationChanged(Option<OperationStatus>),
    /// Error set or cleared.
    ErrorChanged(Option<String>),
    /// Status line replaced.
    StatusMessage(String),
    /// Loading flag flipped.
    LoadingChanged(bool),
    /// New leaderboard snapshot.
    LeaderboardPublished,
    /// New claims snapshot.
    ClaimsPublished,
    /// New pools snapshot.
    PoolsPublished,
    /// Everything was reset.
    Reset,
}

#[derive(Debug)]
struct SessionState {
    operation: Option<Operation>,
    loading: bool,
    error: Option<String>,
    status_message: String,
    leaderboard: Option<Arc<LeaderboardSnapshot>>,
    claims: Option<Arc<ClaimsSnapshot>>,
    pools: Option<Arc<PoolsSnapshot>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            operation: None,
            loading: false,
            error: None,
            status_message: InMemoryStore::INITIAL_STATUS.to_string(),
            leaderboard: None,
            claims: None,
            pools: None,
        }
    }
}

/// Lock-protected session state with channel notifications.
pub struct InMemoryStore {
    state: RwLock<SessionState>,
    subscribers: Mutex<Vec<Sender<StoreEvent>>>,
    event_buffer: usize,
}

impl InMemoryStore {
    /// Status line of a fresh store.
    pub const INITIAL_STATUS: &'static str = "Initializing...";

    /// Creates an empty store whose subscriber channels hold `event_buffer`
    /// notifications each.
    #[must_use]
    pub fn new(event_buffer: usize) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            subscribers: Mutex::new(Vec::new()),
            event_buffer: event_buffer.max(1),
        }
    }

    /// Registers a subscriber.
    ///
    /// Notifications are dropped for a subscriber whose channel is full, and
    /// the subscriber is forgotten once its receiver is dropped.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        let (sender, receiver) = bounded(self.event_buffer);
        self.subscribers.lock().push(sender);
        receiver
    }

    /// Sets the global loading flag.
    pub fn set_loading(&self, loading: bool) {
        self.state.write().loading = loading;
        self.notify(StoreEvent::LoadingChanged(loading));
    }

    /// Current status line.
    #[must_use]
    pub fn status_message(&self) -> String {
        self.state.read().status_message.clone()
    }

    /// Drops every published value and returns to the initial state.
    pub fn reset(&self) {
        *self.state.write() = SessionState::default();
        self.notify(StoreEvent::Reset);
    }

    fn notify(&self, event: StoreEvent) {
        self.subscribers
            .lock()
            .retain(|sender| match sender.try_send(event.clone()) {
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(256)
    }
}

impl SessionStore for InMemoryStore {
    fn update_operation(&self, operation: Option<Operation>) {
        let status = operation.as_ref().map(|op| op.status);
        self.state.write().operation = operation;
        self.notify(StoreEvent::OperationChanged(status));
    }

    fn operation(&self) -> Option<Operation> {
        self.state.read().operation.clone()
    }

    fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    fn set_error(&self, error: Option<String>) {
        self.state.write().error.clone_from(&error);
        self.notify(StoreEvent::ErrorChanged(error));
    }

    fn set_status_message(&self, message: String) {
        self.state.write().status_message.clone_from(&message);
        self.notify(StoreEvent::StatusMessage(message));
    }

    fn update_leaderboard(&self, snapshot: LeaderboardSnapshot) {
        self.state.write().leaderboard = Some(Arc::new(snapshot));
        self.notify(StoreEvent::LeaderboardPublished);
    }

    fn leaderboard(&self) -> Option<Arc<LeaderboardSnapshot>> {
        self.state.read().leaderboard.clone()
    }

    fn update_claims(&self, snapshot: ClaimsSnapshot) {
        self.state.write().claims = Some(Arc::new(snapshot));
        self.notify(StoreEvent::ClaimsPublished);
    }

    fn claims(&self) -> Option<Arc<ClaimsSnapshot>> {
        self.state.read().claims.clone()
    }

    fn update_pools(&self, snapshot: PoolsSnapshot) {
        self.state.write().pools = Some(Arc::new(snapshot));
        self.notify(StoreEvent::PoolsPublished);
    }

    fn pools(&self) -> Option<Arc<PoolsSnapshot>> {
        self.state.read().pools.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainbrawler_shared::OperationType;
    use std::time::SystemTime;

    #[test]
    fn test_store_creation() {
        let store = InMemoryStore::default();
        assert!(store.operation().is_none());
        assert!(store.error().is_none());
        assert!(!store.is_loading());
        assert_eq!(store.status_message(), "Initializing...");
    }

    #[test]
    fn test_subscriber_sees_changes_in_order() {
        let store = InMemoryStore::new(8);
        let events = store.subscribe();

        store.update_operation(Some(Operation::started(
            OperationType::LoadPools,
            SystemTime::UNIX_EPOCH,
        )));
        store.set_error(Some("boom".to_string()));
        store.update_operation(None);

        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::OperationChanged(Some(OperationStatus::Pending))
        );
        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::ErrorChanged(Some("boom".to_string()))
        );
        assert_eq!(events.try_recv().unwrap(), StoreEvent::OperationChanged(None));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_full_subscriber_does_not_block() {
        let store = InMemoryStore::new(1);
        let events = store.subscribe();

        store.set_status_message("one".to_string());
        store.set_status_message("two".to_string());

        assert_eq!(store.status_message(), "two");
        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::StatusMessage("one".to_string())
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscriber_is_forgotten() {
        let store = InMemoryStore::new(4);
        drop(store.subscribe());
        store.set_loading(true);
        assert!(store.subscribers.lock().is_empty());
        assert!(store.is_loading());
    }

    #[test]
    fn test_reset() {
        let store = InMemoryStore::default();
        store.set_error(Some("x".to_string()));
        store.set_loading(true);
        store.reset();
        assert!(store.error().is_none());
        assert!(!store.is_loading());
    }
}
