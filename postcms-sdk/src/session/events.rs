//! Typed listener registry for client events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::Session;

/// Kinds of events a [`crate::PostCms`] client emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The session changed: login, logout, account creation, or verification.
    SessionUpdate,
}

/// An emitted event.
#[derive(Debug, Clone, PartialEq)]
pub enum CmsEvent {
    /// The session after the change; `None` when signed out.
    SessionUpdate(Option<Session>),
}

impl CmsEvent {
    /// The kind listeners subscribe to.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::SessionUpdate(_) => EventKind::SessionUpdate,
        }
    }
}

/// Handle returned by [`crate::PostCms::on`], used to remove one listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&CmsEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct EventEmitter {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<EventKind, Vec<(ListenerId, Listener)>>>,
}

impl EventEmitter {
    pub(crate) fn on(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove one listener, or all listeners of `kind` when `id` is `None`.
    ///
    /// Returns true if anything was removed. An emptied kind is dropped entirely.
    pub(crate) fn off(&self, kind: EventKind, id: Option<ListenerId>) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(id) = id else {
            return listeners.remove(&kind).is_some();
        };
        let Some(entries) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            listeners.remove(&kind);
        }
        removed
    }

    pub(crate) fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Invoke every listener of the event's kind, in registration order.
    ///
    /// Listeners run outside the registry lock, so they may call `on`/`off`.
    pub(crate) fn emit(&self, event: &CmsEvent) {
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.kind())
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();
        for listener in snapshot {
            listener(event);
        }
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field(
                "session_update_listeners",
                &self.listener_count(EventKind::SessionUpdate),
            )
            .finish_non_exhaustive()
    }
}
