//! Request configuration, request outcomes and change events

use serde::{Deserialize, Serialize};

use crate::error::PermissionError;
use crate::kind::PermissionKind;
use crate::status::PermissionStatus;

/// Outcome of a permission request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionResult {
    pub kind: PermissionKind,
    pub status: PermissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PermissionError>,
}

impl PermissionResult {
    /// Create a result without an error
    pub fn new(kind: PermissionKind, status: PermissionStatus) -> Self {
        Self {
            kind,
            status,
            error: None,
        }
    }

    /// Create a result carrying a failure
    pub fn failed(kind: PermissionKind, status: PermissionStatus, error: PermissionError) -> Self {
        Self {
            kind,
            status,
            error: Some(error),
        }
    }

    /// Authorized and no error attached
    pub fn is_success(&self) -> bool {
        self.status.is_authorized() && self.error.is_none()
    }
}

/// Human-facing rationale shown around a request
///
/// Purely advisory: nothing in the request path branches on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequestConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Title for the "open settings" redirect after a denial
    #[serde(default)]
    pub settings_title: Option<String>,
    #[serde(default)]
    pub settings_message: Option<String>,
}

impl PermissionRequestConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the rationale message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the settings redirect title
    pub fn settings_title(mut self, title: impl Into<String>) -> Self {
        self.settings_title = Some(title.into());
        self
    }

    /// Set the settings redirect message
    pub fn settings_message(mut self, message: impl Into<String>) -> Self {
        self.settings_message = Some(message.into());
        self
    }
}

/// Where a status change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    /// A request issued through a manager
    Request,
    /// An out-of-band platform notification (e.g. system settings edited)
    External,
    /// A test double was reconfigured
    Override,
}

/// A status transition announced on the change broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub kind: PermissionKind,
    pub status: PermissionStatus,
    pub origin: ChangeOrigin,
}

impl StatusChange {
    pub fn new(kind: PermissionKind, status: PermissionStatus, origin: ChangeOrigin) -> Self {
        Self {
            kind,
            status,
            origin,
        }
    }
}
