//! Manager configuration and ready-made setups
//!
//! [`PermissionManagerBuilder`] assembles adapters and a [`ManagerConfig`];
//! [`ConsentPresets`] provides configurations for common environments.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use consent_api::PermissionKind;

use crate::adapter::PermissionAdapter;
use crate::audit::{AuditSink, CompositeAuditSink, FileAuditSink, MemoryAuditSink, NullAuditSink};
use crate::broadcast::DEFAULT_BROADCAST_CAPACITY;
use crate::manager::PermissionManager;
use crate::registry::AdapterRegistry;

/// Runtime settings for a manager
#[derive(Clone)]
pub struct ManagerConfig {
    /// Queue length for async change receivers
    pub broadcast_capacity: usize,
    /// Destination for audit events
    pub audit: Arc<dyn AuditSink>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            audit: Arc::new(NullAuditSink),
        }
    }
}

impl ManagerConfig {
    /// Check the settings before a manager is built
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "broadcast capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("broadcast_capacity", &self.broadcast_capacity)
            .finish_non_exhaustive()
    }
}

/// Error type for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to initialize audit: {0}")]
    AuditInit(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Builder for [`PermissionManager`]
pub struct PermissionManagerBuilder {
    adapters: AdapterRegistry,
    config: ManagerConfig,
}

impl PermissionManagerBuilder {
    /// Create a builder with no adapters and default settings
    pub fn new() -> Self {
        Self {
            adapters: AdapterRegistry::new(),
            config: ManagerConfig::default(),
        }
    }

    /// Register the adapter for `kind`, replacing any earlier one
    pub fn adapter(mut self, kind: PermissionKind, adapter: impl PermissionAdapter + 'static) -> Self {
        self.adapters.register(kind, Box::new(adapter));
        self
    }

    /// Register an already boxed adapter
    pub fn boxed_adapter(mut self, kind: PermissionKind, adapter: Box<dyn PermissionAdapter>) -> Self {
        self.adapters.register(kind, adapter);
        self
    }

    /// Replace all settings
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the async receiver queue length
    pub fn broadcast_capacity(mut self, capacity: usize) -> Self {
        self.config.broadcast_capacity = capacity;
        self
    }

    /// Set the audit sink
    pub fn audit(mut self, audit: impl AuditSink + 'static) -> Self {
        self.config.audit = Arc::new(audit);
        self
    }

    /// Set an audit sink the caller keeps a handle to
    pub fn shared_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.config.audit = audit;
        self
    }

    /// Discard the adapters, keeping only the settings
    pub(crate) fn settings(self) -> ManagerConfig {
        self.config
    }

    /// Build the manager
    pub fn build(self) -> Result<PermissionManager, ConfigError> {
        self.config.validate()?;
        Ok(PermissionManager::from_parts(self.adapters, self.config))
    }
}

impl Default for PermissionManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PermissionManagerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionManagerBuilder")
            .field("adapters", &self.adapters)
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================================
// Preset Configurations
// ============================================================================

/// Preset configurations for common use cases
pub struct ConsentPresets;

impl ConsentPresets {
    /// Production mode with a persistent audit log
    ///
    /// Audit events go to `<config dir>/<app>/permission-audit.jsonl`.
    pub fn audited(app_name: &str) -> Result<ManagerConfig, ConfigError> {
        let audit =
            FileAuditSink::for_app(app_name).map_err(|e| ConfigError::AuditInit(e.to_string()))?;

        Ok(ManagerConfig {
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            audit: Arc::new(audit),
        })
    }

    /// Persistent audit log at `log_path`, mirrored in memory
    ///
    /// The returned sink holds the most recent events, for an in-app
    /// diagnostics screen.
    pub fn diagnostic(
        log_path: impl Into<PathBuf>,
    ) -> Result<(ManagerConfig, Arc<MemoryAuditSink>), ConfigError> {
        let file =
            FileAuditSink::open(log_path).map_err(|e| ConfigError::AuditInit(e.to_string()))?;
        let recent = Arc::new(MemoryAuditSink::new());
        let audit = CompositeAuditSink::new()
            .with(Arc::new(file))
            .with(recent.clone());

        let config = ManagerConfig {
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            audit: Arc::new(audit),
        };
        Ok((config, recent))
    }

    /// Production mode without an audit log
    pub fn quiet() -> ManagerConfig {
        ManagerConfig::default()
    }

    /// Testing mode: audit events kept in memory
    ///
    /// Returns the sink alongside the config so tests can inspect it.
    pub fn testing() -> (ManagerConfig, Arc<MemoryAuditSink>) {
        let audit = Arc::new(MemoryAuditSink::new());
        let config = ManagerConfig {
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            audit: audit.clone(),
        };
        (config, audit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AutoAdapter;

    #[test]
    fn test_builder() {
        let manager = PermissionManagerBuilder::new()
            .adapter(PermissionKind::Camera, AutoAdapter::granting())
            .adapter(PermissionKind::Microphone, AutoAdapter::denying())
            .broadcast_capacity(4)
            .audit(NullAuditSink)
            .build()
            .unwrap();

        assert_eq!(
            manager.supported_kinds(),
            vec![PermissionKind::Camera, PermissionKind::Microphone]
        );
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = PermissionManagerBuilder::new()
            .broadcast_capacity(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig(_)));
    }

    #[test]
    fn test_testing_preset_shares_sink() {
        let (config, audit) = ConsentPresets::testing();
        assert_eq!(config.broadcast_capacity, DEFAULT_BROADCAST_CAPACITY);
        assert!(audit.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_quiet_preset() {
        let config = ConsentPresets::quiet();
        assert_eq!(config.broadcast_capacity, DEFAULT_BROADCAST_CAPACITY);
        assert!(config.audit.flush().is_ok());
    }

    #[tokio::test]
    async fn test_diagnostic_preset_writes_both_sinks() {
        use crate::manager::PermissionService;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("audit.jsonl");
        let (config, recent) = ConsentPresets::diagnostic(&path).unwrap();

        let manager = PermissionManagerBuilder::new()
            .adapter(PermissionKind::Camera, AutoAdapter::granting())
            .config(config)
            .build()
            .unwrap();
        manager.request(PermissionKind::Camera, None).await;

        assert_eq!(recent.len(), 2);
        let logged = std::fs::read_to_string(&path).unwrap();
        assert_eq!(logged.lines().count(), 2);
    }
}
