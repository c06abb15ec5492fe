//! Manager factory
//!
//! Callers that need to configure a mock get it from the
//! [`ManagerHandle::Mock`] variant instead of probing a trait object for
//! its concrete type.

use async_trait::async_trait;
use consent_api::{PermissionKind, PermissionRequestConfig, PermissionResult, PermissionStatus};
use std::sync::Arc;

use crate::broadcast::ChangeBroadcaster;
use crate::manager::{PermissionManager, PermissionService};
use crate::mock::MockPermissionManager;
use crate::presets::{ConfigError, ManagerConfig, PermissionManagerBuilder};

/// Which kind of manager to create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerMode {
    /// Adapter-backed manager
    Production,
    /// In-memory mock with the given grant mode
    Mock { grant: bool },
}

/// A manager together with the capabilities of its concrete variant
#[derive(Debug, Clone)]
pub enum ManagerHandle {
    Production(Arc<PermissionManager>),
    Mock(Arc<MockPermissionManager>),
}

impl ManagerHandle {
    /// The uniform interface, for code that does not care which variant it has
    pub fn as_service(&self) -> Arc<dyn PermissionService> {
        match self {
            Self::Production(manager) => manager.clone(),
            Self::Mock(mock) => mock.clone(),
        }
    }

    /// Configuration methods, present only for the mock variant
    pub fn as_mock(&self) -> Option<&MockPermissionManager> {
        match self {
            Self::Mock(mock) => Some(mock),
            Self::Production(_) => None,
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, Self::Mock(_))
    }

    fn service(&self) -> &dyn PermissionService {
        match self {
            Self::Production(manager) => manager.as_ref(),
            Self::Mock(mock) => mock.as_ref(),
        }
    }
}

#[async_trait]
impl PermissionService for ManagerHandle {
    async fn status_for(&self, kind: PermissionKind) -> PermissionStatus {
        self.service().status_for(kind).await
    }

    async fn request(
        &self,
        kind: PermissionKind,
        config: Option<&PermissionRequestConfig>,
    ) -> PermissionResult {
        self.service().request(kind, config).await
    }

    fn changes(&self) -> &ChangeBroadcaster {
        self.service().changes()
    }
}

/// Creates managers by mode
pub struct ManagerFactory;

impl ManagerFactory {
    /// Create a manager for `mode`
    ///
    /// `builder` supplies the adapters for production; a mock ignores its
    /// adapters but keeps its settings.
    pub fn create(
        mode: ManagerMode,
        builder: PermissionManagerBuilder,
    ) -> Result<ManagerHandle, ConfigError> {
        match mode {
            ManagerMode::Production => Self::production(builder),
            ManagerMode::Mock { grant } => {
                let mock = MockPermissionManager::with_config(grant, builder.settings())?;
                tracing::debug!(grant, "Mock permission manager created");
                Ok(ManagerHandle::Mock(Arc::new(mock)))
            }
        }
    }

    /// Create an adapter-backed manager
    pub fn production(builder: PermissionManagerBuilder) -> Result<ManagerHandle, ConfigError> {
        Ok(ManagerHandle::Production(Arc::new(builder.build()?)))
    }

    /// Create a mock in grant mode with default settings
    pub fn mock() -> ManagerHandle {
        ManagerHandle::Mock(Arc::new(MockPermissionManager::new()))
    }

    /// Create a mock with custom settings
    pub fn mock_with(grant: bool, config: ManagerConfig) -> Result<ManagerHandle, ConfigError> {
        Ok(ManagerHandle::Mock(Arc::new(
            MockPermissionManager::with_config(grant, config)?,
        )))
    }
}
