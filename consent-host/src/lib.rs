//! consent-host: permission manager runtime for consent
//!
//! This crate provides the manager that routes status reads and requests to
//! platform adapters, broadcasts status changes, and offers a mock and an
//! observable cache on top of the same interface.

pub mod adapter;
pub mod audit;
pub mod broadcast;
pub mod factory;
pub mod feed;
pub mod manager;
pub mod mock;
pub mod observable;
pub mod presets;
pub mod registry;

pub use adapter::{AdapterError, AutoAdapter, PermissionAdapter, RecordedRequest, RecordingAdapter};
pub use audit::{
    AuditError, AuditEvent, AuditEventType, AuditSink, CompositeAuditSink, FileAuditSink,
    MemoryAuditSink, NullAuditSink,
};
pub use broadcast::{ChangeBroadcaster, Subscription, DEFAULT_BROADCAST_CAPACITY};
pub use factory::{ManagerFactory, ManagerHandle, ManagerMode};
pub use feed::ChangeFeed;
pub use manager::{PermissionManager, PermissionService};
pub use mock::MockPermissionManager;
pub use observable::{ObservablePermissions, StatusMap};
pub use presets::{ConfigError, ConsentPresets, ManagerConfig, PermissionManagerBuilder};
pub use registry::AdapterRegistry;
pub use consent_api::{
    ChangeOrigin, NativeAuthorization, PermissionError, PermissionGroup, PermissionKind,
    PermissionRequestConfig, PermissionResult, PermissionStatus, StatusChange,
};
