//! Status change broadcast
//!
//! Multicast, replay-nothing delivery of [`StatusChange`] events. A single
//! `publish` feeds two paths:
//!
//! - synchronous listeners, run before `publish` returns, so caches driven by
//!   them are never older than the result just handed to a caller;
//! - async receivers backed by `tokio::sync::broadcast`.

use consent_api::StatusChange;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tokio::sync::broadcast;

/// Default capacity of the async receiver queue
pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

type Listener = Arc<dyn Fn(&StatusChange) + Send + Sync>;

struct Shared {
    listeners: RwLock<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<StatusChange>,
}

impl Shared {
    fn remove(&self, id: u64) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }
}

/// Event stream owned by a manager
///
/// Cloning yields another handle to the same stream.
#[derive(Clone)]
pub struct ChangeBroadcaster {
    shared: Arc<Shared>,
}

impl ChangeBroadcaster {
    /// Create a broadcaster whose async receivers buffer up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                sender,
            }),
        }
    }

    /// Deliver `change` to every current listener and receiver
    ///
    /// Returns the number of deliveries. Listeners registered or removed
    /// while this runs do not affect the current delivery.
    pub fn publish(&self, change: StatusChange) -> usize {
        let listeners: Vec<Listener> = self
            .shared
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &listeners {
            listener(&change);
        }

        let received = self.shared.sender.send(change).unwrap_or(0);

        tracing::debug!(
            kind = %change.kind,
            status = %change.status,
            origin = ?change.origin,
            listeners = listeners.len(),
            receivers = received,
            "Status change published"
        );
        listeners.len() + received
    }

    /// Register a synchronous listener
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped or cancelled. It must not block.
    pub fn listen<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&StatusChange) + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Create an async receiver for events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.shared.sender.subscribe()
    }

    /// Number of registered synchronous listeners
    pub fn listener_count(&self) -> usize {
        self.shared
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of live async receivers
    pub fn receiver_count(&self) -> usize {
        self.shared.sender.receiver_count()
    }
}

impl Default for ChangeBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}

impl fmt::Debug for ChangeBroadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBroadcaster")
            .field("listeners", &self.listener_count())
            .field("receivers", &self.receiver_count())
            .finish()
    }
}

/// Registration handle for a synchronous listener
///
/// Holds only a weak reference: it never keeps the broadcaster alive.
#[must_use = "dropping a Subscription unregisters the listener"]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Unregister the listener now
    pub fn cancel(self) {
        drop(self);
    }

    /// Whether the listener is still registered
    pub fn is_active(&self) -> bool {
        self.shared
            .upgrade()
            .map(|shared| {
                shared
                    .listeners
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .any(|(id, _)| *id == self.id)
            })
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.remove(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
