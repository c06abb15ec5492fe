//! # consent: unified permission requests
//!
//! One interface for checking and requesting runtime permissions (camera,
//! location, contacts and more) across platform adapters.
//!
//! ## Core Principles
//!
//! - **Ask once**: a request reaches the platform only while the status is
//!   `not_determined`; decided permissions return their status unchanged
//! - **Errors are data**: every request completes with a [`PermissionResult`]
//! - **Push, not poll**: status changes are broadcast to listeners and
//!   async receivers
//! - **Same interface for tests**: [`MockPermissionManager`] runs the real
//!   manager over in-memory adapters
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use consent::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ConfigError> {
//!     consent::init_subscriber().ok();
//!
//!     let manager = PermissionManager::builder()
//!         .adapter(PermissionKind::Camera, platform::CameraAdapter::new())
//!         .adapter(PermissionKind::Microphone, platform::MicrophoneAdapter::new())
//!         .config(ConsentPresets::audited("my-app")?)
//!         .build()?;
//!
//!     let permissions = ObservablePermissions::new(Arc::new(manager));
//!     for result in permissions.request_multiple(PermissionGroup::Media.kinds()).await {
//!         if let Some(error) = &result.error {
//!             eprintln!("{}: {error}", result.kind.display_name());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Optional modules
pub mod tracing_support;

// Re-export tracing itself (required for #[instrument] macro)
#[cfg(feature = "tracing")]
pub use tracing_support::tracing;

#[cfg(feature = "tracing")]
pub use tracing_support::{
    debug, error, info, init_subscriber, init_subscriber_with_config, instrument, trace, warn,
    TracingConfig, TracingFormat,
};

pub use consent_api::{
    ChangeOrigin, NativeAuthorization, PermissionError, PermissionGroup, PermissionKind,
    PermissionRequestConfig, PermissionResult, PermissionStatus, StatusChange,
    UnknownPermissionGroup, UnknownPermissionKind,
};
pub use consent_host::{
    adapter, audit, AdapterError, AdapterRegistry, AuditEvent, AuditEventType, AuditSink,
    AutoAdapter, ChangeBroadcaster, ChangeFeed, ConfigError, ConsentPresets, FileAuditSink,
    ManagerConfig, ManagerFactory, ManagerHandle, ManagerMode, MemoryAuditSink,
    MockPermissionManager, ObservablePermissions, PermissionAdapter, PermissionManager,
    PermissionManagerBuilder, PermissionService, RecordingAdapter, StatusMap, Subscription,
};

/// Everything needed to set up and use a permission manager
pub mod prelude {
    pub use crate::{
        ChangeOrigin, ConfigError, ConsentPresets, ManagerFactory, ManagerHandle, ManagerMode,
        MockPermissionManager, ObservablePermissions, PermissionAdapter, PermissionError,
        PermissionGroup, PermissionKind, PermissionManager, PermissionRequestConfig,
        PermissionResult, PermissionService, PermissionStatus, StatusChange,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_prelude_covers_common_flow() {
        let handle =
            ManagerFactory::create(ManagerMode::Mock { grant: true }, PermissionManager::builder())
                .unwrap();
        let permissions = ObservablePermissions::new(handle.as_service());

        let results = permissions
            .request_multiple(PermissionGroup::Media.kinds())
            .await;
        assert!(results.iter().all(PermissionResult::is_success));
        assert!(handle.are_all_authorized(PermissionGroup::Media.kinds()).await);
    }

    #[tokio::test]
    async fn test_group_parsed_from_name() {
        let group: PermissionGroup = "social".parse().unwrap();
        let mock = Arc::new(MockPermissionManager::with_grant_mode(false));

        let results = mock.request_group(group).await;
        assert_eq!(results.len(), group.kinds().len());
        assert!(results
            .iter()
            .all(|result| result.status == PermissionStatus::Denied));
    }
}
