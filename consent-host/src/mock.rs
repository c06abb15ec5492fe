//! Deterministic in-memory permission manager for tests
//!
//! [`MockPermissionManager`] runs the real [`PermissionManager`] over
//! in-memory adapters that share one configurable state, so the
//! short-circuit rule, the change broadcast and the audit trail behave
//! exactly as in production.

use async_trait::async_trait;
use consent_api::{
    ChangeOrigin, NativeAuthorization, PermissionKind, PermissionRequestConfig, PermissionResult,
    PermissionStatus, StatusChange,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::adapter::{AdapterError, PermissionAdapter};
use crate::audit::{AuditEvent, AuditEventType};
use crate::broadcast::ChangeBroadcaster;
use crate::manager::{PermissionManager, PermissionService};
use crate::presets::{ConfigError, ManagerConfig};
use crate::registry::AdapterRegistry;

#[derive(Debug)]
struct MockState {
    grant_mode: AtomicBool,
    statuses: RwLock<HashMap<PermissionKind, PermissionStatus>>,
    failures: RwLock<HashMap<PermissionKind, String>>,
    requests: RwLock<HashMap<PermissionKind, usize>>,
}

impl MockState {
    fn new(grant_mode: bool) -> Self {
        Self {
            grant_mode: AtomicBool::new(grant_mode),
            statuses: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            requests: RwLock::new(HashMap::new()),
        }
    }

    fn status(&self, kind: PermissionKind) -> PermissionStatus {
        self.statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .copied()
            .unwrap_or_default()
    }

    fn set_status(&self, kind: PermissionKind, status: PermissionStatus) {
        self.statuses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, status);
    }
}

struct MockAdapter {
    kind: PermissionKind,
    state: Arc<MockState>,
}

#[async_trait]
impl PermissionAdapter for MockAdapter {
    async fn current_status(&self) -> NativeAuthorization {
        self.state.status(self.kind).into()
    }

    async fn request_access(
        &self,
        _config: Option<&PermissionRequestConfig>,
    ) -> Result<NativeAuthorization, AdapterError> {
        *self
            .state
            .requests
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(self.kind)
            .or_insert(0) += 1;

        let failure = self
            .state
            .failures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.kind)
            .cloned();
        if let Some(message) = failure {
            return Err(AdapterError::Platform(message));
        }

        let status = if self.state.grant_mode.load(Ordering::SeqCst) {
            PermissionStatus::Authorized
        } else {
            PermissionStatus::Denied
        };
        self.state.set_status(self.kind, status);
        Ok(status.into())
    }
}

/// Test double implementing [`PermissionService`] for every kind
///
/// - grant mode decides how undecided requests resolve (default: grant)
/// - explicit status overrides win over grant mode
/// - completed requests persist their outcome
pub struct MockPermissionManager {
    manager: PermissionManager,
    state: Arc<MockState>,
}

impl MockPermissionManager {
    /// Create a mock in grant mode
    pub fn new() -> Self {
        Self::with_grant_mode(true)
    }

    /// Create a mock with the given grant mode
    pub fn with_grant_mode(grant: bool) -> Self {
        Self::assemble(grant, ManagerConfig::default())
    }

    /// Create a mock with custom manager settings
    pub fn with_config(grant: bool, config: ManagerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(grant, config))
    }

    fn assemble(grant: bool, config: ManagerConfig) -> Self {
        let state = Arc::new(MockState::new(grant));
        let mut adapters = AdapterRegistry::new();
        for &kind in PermissionKind::ALL {
            adapters.register(
                kind,
                Box::new(MockAdapter {
                    kind,
                    state: Arc::clone(&state),
                }),
            );
        }

        Self {
            manager: PermissionManager::from_parts(adapters, config),
            state,
        }
    }

    /// Whether undecided requests resolve to `authorized`
    pub fn grant_mode(&self) -> bool {
        self.state.grant_mode.load(Ordering::SeqCst)
    }

    pub fn set_grant_mode(&self, grant: bool) {
        self.state.grant_mode.store(grant, Ordering::SeqCst);
    }

    /// Override the status of `kind`
    ///
    /// Always publishes one change event, even if the status is unchanged.
    pub fn set_mock_status(&self, status: PermissionStatus, kind: PermissionKind) {
        let previous = self.state.status(kind);
        self.state.set_status(kind, status);

        tracing::debug!(kind = %kind, status = %status, "Mock status overridden");
        self.manager.record(
            AuditEvent::new(AuditEventType::StatusOverridden, kind, status).with_previous(previous),
        );
        self.manager
            .changes()
            .publish(StatusChange::new(kind, status, ChangeOrigin::Override));
    }

    /// Clear every override, returning all kinds to `not_determined`
    ///
    /// Publishes a change for each cleared kind that was not already
    /// undetermined.
    pub fn reset_mock_statuses(&self) {
        let cleared: Vec<(PermissionKind, PermissionStatus)> = self
            .state
            .statuses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        let mut kinds: Vec<_> = cleared
            .into_iter()
            .filter(|(_, status)| *status != PermissionStatus::NotDetermined)
            .map(|(kind, _)| kind)
            .collect();
        kinds.sort();

        for kind in kinds {
            self.manager.changes().publish(StatusChange::new(
                kind,
                PermissionStatus::NotDetermined,
                ChangeOrigin::Override,
            ));
        }
    }

    /// Make requests for `kind` fail with a platform error
    pub fn set_failure(&self, kind: PermissionKind, message: impl Into<String>) {
        self.state
            .failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, message.into());
    }

    pub fn clear_failure(&self, kind: PermissionKind) {
        self.state
            .failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind);
    }

    /// Requests for `kind` that reached the simulated platform
    pub fn request_count(&self, kind: PermissionKind) -> usize {
        self.state
            .requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    /// Requests for all kinds that reached the simulated platform
    pub fn total_requests(&self) -> usize {
        self.state
            .requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    /// The manager driving this mock
    pub fn manager(&self) -> &PermissionManager {
        &self.manager
    }
}

impl Default for MockPermissionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionService for MockPermissionManager {
    async fn status_for(&self, kind: PermissionKind) -> PermissionStatus {
        self.manager.status_for(kind).await
    }

    async fn request(
        &self,
        kind: PermissionKind,
        config: Option<&PermissionRequestConfig>,
    ) -> PermissionResult {
        self.manager.request(kind, config).await
    }

    fn changes(&self) -> &ChangeBroadcaster {
        self.manager.changes()
    }
}

impl fmt::Debug for MockPermissionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockPermissionManager")
            .field("grant_mode", &self.grant_mode())
            .field("total_requests", &self.total_requests())
            .finish_non_exhaustive()
    }
}
