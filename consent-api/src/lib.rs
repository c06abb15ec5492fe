//! consent-api: Shared types for the consent permission core
//!
//! This crate defines the value types exchanged between platform adapters,
//! the permission manager and application code. It has no runtime
//! dependencies beyond serde.

pub mod error;
pub mod groups;
pub mod kind;
pub mod result;
pub mod status;

pub use error::{PermissionError, UnknownPermissionGroup, UnknownPermissionKind};
pub use groups::PermissionGroup;
pub use kind::PermissionKind;
pub use result::{ChangeOrigin, PermissionRequestConfig, PermissionResult, StatusChange};
pub use status::{NativeAuthorization, PermissionStatus};
