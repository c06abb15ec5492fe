//! Cached, push-based status view for UI binding
//!
//! [`ObservablePermissions`] keeps a status map fed by three sources:
//! explicit refreshes, request results and the service's change broadcast.
//! It performs no permission logic of its own.

use consent_api::{PermissionKind, PermissionRequestConfig, PermissionResult, PermissionStatus};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::broadcast::Subscription;
use crate::manager::PermissionService;

/// Snapshot of cached statuses
pub type StatusMap = HashMap<PermissionKind, PermissionStatus>;

struct CacheState {
    statuses: watch::Sender<StatusMap>,
    in_flight: AtomicUsize,
}

impl CacheState {
    fn apply(&self, kind: PermissionKind, status: PermissionStatus) {
        self.statuses
            .send_if_modified(|map| map.insert(kind, status) != Some(status));
    }

    fn apply_all(&self, results: &[PermissionResult]) {
        self.statuses.send_if_modified(|map| {
            let mut modified = false;
            for result in results {
                modified |= map.insert(result.kind, result.status) != Some(result.status);
            }
            modified
        });
    }
}

/// Marks a request in flight; cleared on drop, including cancellation
struct BusyGuard<'a>(&'a AtomicUsize);

impl<'a> BusyGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Observable facade over a [`PermissionService`]
///
/// Subscribes to the service's changes once, at construction. Events are
/// applied synchronously, so the cache already reflects a request's outcome
/// when that request returns. Dropping the facade unsubscribes.
pub struct ObservablePermissions {
    service: Arc<dyn PermissionService>,
    state: Arc<CacheState>,
    _subscription: Subscription,
}

impl ObservablePermissions {
    pub fn new(service: Arc<dyn PermissionService>) -> Self {
        let (statuses, _) = watch::channel(StatusMap::new());
        let state = Arc::new(CacheState {
            statuses,
            in_flight: AtomicUsize::new(0),
        });

        let weak = Arc::downgrade(&state);
        let subscription = service.changes().listen(move |change| {
            if let Some(state) = weak.upgrade() {
                state.apply(change.kind, change.status);
            }
        });

        Self {
            service,
            state,
            _subscription: subscription,
        }
    }

    /// Cached status; `not_determined` when never observed
    pub fn status(&self, kind: PermissionKind) -> PermissionStatus {
        self.state
            .statuses
            .borrow()
            .get(&kind)
            .copied()
            .unwrap_or_default()
    }

    /// Copy of every cached entry
    pub fn snapshot(&self) -> StatusMap {
        self.state.statuses.borrow().clone()
    }

    /// Receiver notified whenever a cached status changes
    pub fn watch(&self) -> watch::Receiver<StatusMap> {
        self.state.statuses.subscribe()
    }

    /// Whether any request is in flight
    pub fn is_busy(&self) -> bool {
        self.state.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Re-read one status from the service
    pub async fn refresh(&self, kind: PermissionKind) {
        let status = self.service.status_for(kind).await;
        tracing::trace!(kind = %kind, status = %status, "Status refreshed");
        self.state.apply(kind, status);
    }

    /// Re-read several statuses from the service
    pub async fn refresh_many(&self, kinds: &[PermissionKind]) {
        for &kind in kinds {
            self.refresh(kind).await;
        }
    }

    /// Request through the service and cache the outcome
    ///
    /// The result, including any error, is returned untouched.
    pub async fn request(
        &self,
        kind: PermissionKind,
        config: Option<&PermissionRequestConfig>,
    ) -> PermissionResult {
        let _busy = BusyGuard::enter(&self.state.in_flight);
        let result = self.service.request(kind, config).await;
        self.state.apply(result.kind, result.status);
        result
    }

    /// Request several kinds in order; the cache is updated once all are known
    pub async fn request_multiple(&self, kinds: &[PermissionKind]) -> Vec<PermissionResult> {
        let _busy = BusyGuard::enter(&self.state.in_flight);
        let results = self.service.request_multiple(kinds).await;
        self.state.apply_all(&results);
        results
    }

    /// The wrapped service
    pub fn service(&self) -> &Arc<dyn PermissionService> {
        &self.service
    }
}

impl fmt::Debug for ObservablePermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservablePermissions")
            .field("cached", &self.state.statuses.borrow().len())
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}
