//! Out-of-band status feeds
//!
//! Some platforms report authorization changes outside a request (the user
//! edits location access in system settings while the app runs). A
//! [`ChangeFeed`] turns such notifications into the same change events a
//! request produces.

use consent_api::{ChangeOrigin, NativeAuthorization, PermissionKind, PermissionStatus, StatusChange};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::broadcast::Subscription;
use crate::manager::PermissionService;

/// Background task forwarding platform notifications for one kind
pub struct ChangeFeed {
    kind: PermissionKind,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl ChangeFeed {
    /// Start forwarding `updates` for `kind` onto the service's change stream
    ///
    /// A notification is published only when it differs from the last status
    /// the feed knows of, which includes changes made by requests. The feed
    /// ends when the sender side is dropped or on [`shutdown`](Self::shutdown).
    pub async fn attach(
        service: &dyn PermissionService,
        kind: PermissionKind,
        mut updates: mpsc::Receiver<NativeAuthorization>,
    ) -> Self {
        let changes = service.changes().clone();

        // Listen before reading the status so no change can slip between the two.
        let last = Arc::new(Mutex::new(None));
        let tracked = Arc::clone(&last);
        let subscription: Subscription = changes.listen(move |change| {
            if change.kind == kind {
                *tracked.lock().unwrap_or_else(PoisonError::into_inner) = Some(change.status);
            }
        });

        let current = service.status_for(kind).await;
        last.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(current);

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let _subscription = subscription;
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::debug!(kind = %kind, "Change feed shutting down");
                        break;
                    }

                    update = updates.recv() => {
                        let Some(native) = update else {
                            tracing::debug!(kind = %kind, "Change feed closed by platform");
                            break;
                        };

                        let status = PermissionStatus::normalize(kind, native);
                        if Self::advance(&last, status) {
                            tracing::info!(kind = %kind, status = %status, "Permission changed outside a request");
                            changes.publish(StatusChange::new(kind, status, ChangeOrigin::External));
                        } else {
                            tracing::trace!(kind = %kind, status = %status, "Duplicate platform notification ignored");
                        }
                    }
                }
            }
        });

        tracing::debug!(kind = %kind, "Change feed attached");
        Self {
            kind,
            shutdown_tx,
            task,
        }
    }

    /// Record `status` as current; false if it was already current
    fn advance(last: &Mutex<Option<PermissionStatus>>, status: PermissionStatus) -> bool {
        let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
        if *last == Some(status) {
            return false;
        }
        *last = Some(status);
        true
    }

    /// The kind this feed reports on
    pub fn kind(&self) -> PermissionKind {
        self.kind
    }

    /// Whether the forwarding task has stopped
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop forwarding and wait for the task to end
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::warn!(kind = %self.kind, error = %e, "Change feed task failed");
        }
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("kind", &self.kind)
            .field("finished", &self.is_finished())
            .finish()
    }
}
