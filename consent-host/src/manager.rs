//! Permission manager
//!
//! [`PermissionService`] is the uniform call surface; [`PermissionManager`]
//! implements it over an [`AdapterRegistry`]. The central rule: a request
//! reaches an adapter only when the current status is `not_determined`.
//! Everything else returns the current status unchanged.

use async_trait::async_trait;
use consent_api::{
    ChangeOrigin, PermissionError, PermissionGroup, PermissionKind, PermissionRequestConfig,
    PermissionResult, PermissionStatus, StatusChange,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use crate::adapter::PermissionAdapter;
use crate::audit::{AuditEvent, AuditEventType, AuditSink};
use crate::broadcast::ChangeBroadcaster;
use crate::presets::{ManagerConfig, PermissionManagerBuilder};
use crate::registry::AdapterRegistry;

/// Uniform permission interface shared by the real and mock managers
///
/// Only `status_for`, `request` and `changes` are required; the batch
/// operations are defined in terms of them.
#[async_trait]
pub trait PermissionService: Send + Sync {
    /// Current canonical status; no side effects
    async fn status_for(&self, kind: PermissionKind) -> PermissionStatus;

    /// Request a permission, forwarding to the platform only when undecided
    ///
    /// Always completes with a result; failures are attached to it.
    async fn request(
        &self,
        kind: PermissionKind,
        config: Option<&PermissionRequestConfig>,
    ) -> PermissionResult;

    /// The change stream owned by this service
    fn changes(&self) -> &ChangeBroadcaster;

    /// Request each kind in order, one at a time
    ///
    /// A failure for one kind does not stop the rest. Duplicates are not
    /// removed; a repeated kind short-circuits once decided.
    async fn request_multiple(&self, kinds: &[PermissionKind]) -> Vec<PermissionResult> {
        let mut results = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            results.push(self.request(kind, None).await);
        }
        results
    }

    /// Request every member of a group, in group order
    async fn request_group(&self, group: PermissionGroup) -> Vec<PermissionResult> {
        self.request_multiple(group.kinds()).await
    }

    async fn can_request(&self, kind: PermissionKind) -> bool {
        self.status_for(kind).await.can_be_requested()
    }

    /// True when every kind is authorized; vacuously true for an empty slice
    async fn are_all_authorized(&self, kinds: &[PermissionKind]) -> bool {
        for &kind in kinds {
            if !self.status_for(kind).await.is_authorized() {
                return false;
            }
        }
        true
    }

    async fn status_for_many(
        &self,
        kinds: &[PermissionKind],
    ) -> HashMap<PermissionKind, PermissionStatus> {
        let mut statuses = HashMap::with_capacity(kinds.len());
        for &kind in kinds {
            statuses.insert(kind, self.status_for(kind).await);
        }
        statuses
    }

    /// Async receiver for changes published from now on
    fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.changes().subscribe()
    }
}

/// Permission manager backed by platform adapters
///
/// Construct one per logical scope; instances share nothing. Requests for
/// the same kind run one at a time, so concurrent callers see a single
/// platform prompt and a single change event.
pub struct PermissionManager {
    adapters: AdapterRegistry,
    in_flight: HashMap<PermissionKind, Mutex<()>>,
    changes: ChangeBroadcaster,
    audit: Arc<dyn AuditSink>,
}

impl PermissionManager {
    /// Start building a manager
    pub fn builder() -> PermissionManagerBuilder {
        PermissionManagerBuilder::new()
    }

    pub(crate) fn from_parts(adapters: AdapterRegistry, config: ManagerConfig) -> Self {
        tracing::debug!(
            kinds = ?adapters.kinds(),
            capacity = config.broadcast_capacity,
            "Permission manager created"
        );
        let in_flight = adapters
            .kinds()
            .into_iter()
            .map(|kind| (kind, Mutex::new(())))
            .collect();
        Self {
            adapters,
            in_flight,
            changes: ChangeBroadcaster::new(config.broadcast_capacity),
            audit: config.audit,
        }
    }

    /// Whether an adapter is registered for `kind`
    pub fn supports(&self, kind: PermissionKind) -> bool {
        self.adapters.contains(kind)
    }

    /// Kinds with a registered adapter, in enumeration order
    pub fn supported_kinds(&self) -> Vec<PermissionKind> {
        self.adapters.kinds()
    }

    pub(crate) fn record(&self, event: AuditEvent) {
        if let Err(e) = self.audit.record(event) {
            tracing::warn!(error = %e, "Failed to record audit event");
        }
    }

    async fn observe(&self, kind: PermissionKind, adapter: &dyn PermissionAdapter) -> PermissionStatus {
        PermissionStatus::normalize(kind, adapter.current_status().await)
    }
}

#[async_trait]
impl PermissionService for PermissionManager {
    async fn status_for(&self, kind: PermissionKind) -> PermissionStatus {
        match self.adapters.get(kind) {
            Some(adapter) => self.observe(kind, adapter).await,
            // Absent capability: never requestable here.
            None => PermissionStatus::Restricted,
        }
    }

    async fn request(
        &self,
        kind: PermissionKind,
        config: Option<&PermissionRequestConfig>,
    ) -> PermissionResult {
        let Some(adapter) = self.adapters.get(kind) else {
            tracing::warn!(kind = %kind, "No adapter registered for permission");
            self.record(AuditEvent::new(
                AuditEventType::NotSupported,
                kind,
                PermissionStatus::Restricted,
            ));
            return PermissionResult::failed(
                kind,
                PermissionStatus::Restricted,
                PermissionError::NotSupported { kind },
            );
        };

        // Held until the outcome is published; a waiting caller then
        // observes the decided status and short-circuits.
        let _turn = match self.in_flight.get(&kind) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let before = self.observe(kind, adapter).await;

        // Authorized, provisional, denied and restricted are all final here.
        if !before.can_be_requested() {
            tracing::debug!(kind = %kind, status = %before, "Permission already decided");
            self.record(AuditEvent::new(AuditEventType::RequestSkipped, kind, before));
            return PermissionResult::new(kind, before);
        }

        tracing::info!(kind = %kind, "Requesting permission");
        self.record(AuditEvent::new(
            AuditEventType::PermissionRequested,
            kind,
            before,
        ));

        let result = match adapter.request_access(config).await {
            Ok(native) => {
                let after = PermissionStatus::normalize(kind, native);
                let event_type = if after.is_authorized() {
                    AuditEventType::PermissionGranted
                } else {
                    AuditEventType::PermissionDenied
                };
                tracing::info!(kind = %kind, status = %after, "Permission request resolved");
                self.record(AuditEvent::new(event_type, kind, after).with_previous(before));
                PermissionResult::new(kind, after)
            }
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Permission request failed");
                self.record(
                    AuditEvent::new(AuditEventType::RequestFailed, kind, before)
                        .with_reason(e.to_string()),
                );
                PermissionResult::failed(
                    kind,
                    before,
                    PermissionError::AdapterFailure {
                        kind,
                        message: e.to_string(),
                    },
                )
            }
        };

        if result.status != before {
            self.changes
                .publish(StatusChange::new(kind, result.status, ChangeOrigin::Request));
        }

        result
    }

    fn changes(&self) -> &ChangeBroadcaster {
        &self.changes
    }
}

impl fmt::Debug for PermissionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionManager")
            .field("adapters", &self.adapters)
            .field("changes", &self.changes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterError, AutoAdapter, RecordingAdapter};
    use crate::audit::MemoryAuditSink;
    use consent_api::NativeAuthorization;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{PoisonError, RwLock};
    use tokio::sync::Notify;

    /// Adapter whose consent flow waits until released, then grants
    #[derive(Default)]
    struct GatedAdapter {
        gate: Notify,
        calls: AtomicUsize,
        current: RwLock<Option<NativeAuthorization>>,
    }

    #[async_trait]
    impl PermissionAdapter for GatedAdapter {
        async fn current_status(&self) -> NativeAuthorization {
            self.current
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .unwrap_or(NativeAuthorization::NotDetermined)
        }

        async fn request_access(
            &self,
            _config: Option<&PermissionRequestConfig>,
        ) -> Result<NativeAuthorization, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            *self.current.write().unwrap_or_else(PoisonError::into_inner) =
                Some(NativeAuthorization::Authorized);
            Ok(NativeAuthorization::Authorized)
        }
    }

    fn manager_with(kind: PermissionKind, adapter: impl PermissionAdapter + 'static) -> PermissionManager {
        PermissionManager::builder()
            .adapter(kind, adapter)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_request_grants_and_publishes_once() {
        let manager = manager_with(PermissionKind::Camera, AutoAdapter::granting());
        let mut rx = manager.subscribe();

        let result = manager.request(PermissionKind::Camera, None).await;
        assert!(result.is_success());
        assert_eq!(result.status, PermissionStatus::Authorized);

        let change = rx.recv().await.unwrap();
        assert_eq!(change.kind, PermissionKind::Camera);
        assert_eq!(change.status, PermissionStatus::Authorized);
        assert_eq!(change.origin, ChangeOrigin::Request);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_decided_status_short_circuits() {
        for status in [
            PermissionStatus::Authorized,
            PermissionStatus::Provisional,
            PermissionStatus::Denied,
            PermissionStatus::Restricted,
        ] {
            let adapter = Arc::new(RecordingAdapter::new(status));
            let manager = manager_with(PermissionKind::Contacts, adapter.clone());
            let mut rx = manager.subscribe();

            let result = manager.request(PermissionKind::Contacts, None).await;
            assert_eq!(result.status, status);
            assert!(result.error.is_none());
            assert_eq!(adapter.request_count(), 0, "{status}");
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_adapter_failure_keeps_previous_status() {
        let adapter = RecordingAdapter::new(PermissionStatus::NotDetermined)
            .then_fail(AdapterError::Unavailable("no camera".into()));
        let manager = manager_with(PermissionKind::Camera, adapter);
        let mut rx = manager.subscribe();

        let result = manager.request(PermissionKind::Camera, None).await;
        assert_eq!(result.status, PermissionStatus::NotDetermined);
        assert!(matches!(
            result.error,
            Some(PermissionError::AdapterFailure { kind: PermissionKind::Camera, .. })
        ));
        assert!(!result.is_success());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsupported_kind() {
        let manager = PermissionManager::builder().build().unwrap();

        assert_eq!(
            manager.status_for(PermissionKind::Health).await,
            PermissionStatus::Restricted
        );
        let result = manager.request(PermissionKind::Health, None).await;
        assert_eq!(
            result.error,
            Some(PermissionError::NotSupported {
                kind: PermissionKind::Health
            })
        );
        assert!(!manager.supports(PermissionKind::Health));
    }

    #[tokio::test]
    async fn test_native_status_is_normalized() {
        let manager = manager_with(
            PermissionKind::PhotoLibrary,
            AutoAdapter::with_outcome(NativeAuthorization::Limited),
        );

        let result = manager.request(PermissionKind::PhotoLibrary, None).await;
        assert_eq!(result.status, PermissionStatus::Authorized);
        assert_eq!(
            manager.status_for(PermissionKind::PhotoLibrary).await,
            PermissionStatus::Authorized
        );
    }

    #[tokio::test]
    async fn test_unchanged_outcome_publishes_nothing() {
        let manager = manager_with(
            PermissionKind::Tracking,
            RecordingAdapter::new(PermissionStatus::NotDetermined),
        );
        let mut rx = manager.subscribe();

        let result = manager.request(PermissionKind::Tracking, None).await;
        assert_eq!(result.status, PermissionStatus::NotDetermined);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_batch_helpers() {
        let manager = PermissionManager::builder()
            .adapter(PermissionKind::Camera, AutoAdapter::granting())
            .adapter(PermissionKind::Microphone, AutoAdapter::denying())
            .build()
            .unwrap();

        assert!(manager.are_all_authorized(&[]).await);
        assert!(manager.can_request(PermissionKind::Camera).await);

        let results = manager
            .request_multiple(&[PermissionKind::Microphone, PermissionKind::Camera])
            .await;
        assert_eq!(results[0].kind, PermissionKind::Microphone);
        assert_eq!(results[0].status, PermissionStatus::Denied);
        assert_eq!(results[1].status, PermissionStatus::Authorized);

        assert!(manager.are_all_authorized(&[PermissionKind::Camera]).await);
        assert!(
            !manager
                .are_all_authorized(&[PermissionKind::Camera, PermissionKind::Microphone])
                .await
        );

        let statuses = manager
            .status_for_many(&[PermissionKind::Camera, PermissionKind::Microphone])
            .await;
        assert_eq!(statuses[&PermissionKind::Camera], PermissionStatus::Authorized);
        assert_eq!(statuses[&PermissionKind::Microphone], PermissionStatus::Denied);
    }

    #[tokio::test]
    async fn test_audit_trail() {
        let audit = Arc::new(MemoryAuditSink::new());
        let manager = PermissionManager::builder()
            .adapter(PermissionKind::Camera, AutoAdapter::granting())
            .shared_audit(audit.clone())
            .build()
            .unwrap();

        manager.request(PermissionKind::Camera, None).await;
        manager.request(PermissionKind::Camera, None).await;

        let types: Vec<_> = audit.events().iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                AuditEventType::PermissionRequested,
                AuditEventType::PermissionGranted,
                AuditEventType::RequestSkipped,
            ]
        );
    }

    #[tokio::test]
    async fn test_managers_are_independent() {
        let first = manager_with(PermissionKind::Camera, AutoAdapter::granting());
        let second = manager_with(PermissionKind::Camera, AutoAdapter::denying());
        let mut second_rx = second.subscribe();

        first.request(PermissionKind::Camera, None).await;
        assert!(second_rx.try_recv().is_err());
        assert_eq!(
            second.status_for(PermissionKind::Camera).await,
            PermissionStatus::NotDetermined
        );
    }

    #[tokio::test]
    async fn test_concurrent_requests_prompt_and_publish_once() {
        let adapter = Arc::new(GatedAdapter::default());
        let manager = manager_with(PermissionKind::Camera, adapter.clone());
        let mut rx = manager.subscribe();

        let release = async {
            while adapter.calls.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
            // Let the second caller reach the per-kind lock.
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }
            adapter.gate.notify_one();
        };

        let (first, second, ()) = tokio::join!(
            manager.request(PermissionKind::Camera, None),
            manager.request(PermissionKind::Camera, None),
            release,
        );

        assert_eq!(first.status, PermissionStatus::Authorized);
        assert_eq!(second.status, PermissionStatus::Authorized);
        assert!(second.error.is_none());
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);

        let change = rx.recv().await.unwrap();
        assert_eq!(change.status, PermissionStatus::Authorized);
        assert!(rx.try_recv().is_err());
    }
}
