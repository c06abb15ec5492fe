//! Error types shared between the host and application code

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kind::PermissionKind;

/// Failure attached to a [`PermissionResult`](crate::PermissionResult)
///
/// A `restricted` outcome is a status, not an error; callers branch on the
/// status for that.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum PermissionError {
    /// No adapter is registered for the kind in this manager
    #[error("permission {kind} is not supported in this configuration")]
    NotSupported { kind: PermissionKind },

    /// The platform call failed for a reason other than user denial
    #[error("permission {kind} request failed: {message}")]
    AdapterFailure {
        kind: PermissionKind,
        message: String,
    },
}

impl PermissionError {
    /// The kind the failure relates to
    pub fn kind(&self) -> PermissionKind {
        match self {
            Self::NotSupported { kind } | Self::AdapterFailure { kind, .. } => *kind,
        }
    }
}

/// Returned when parsing an unknown permission identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown permission kind: {0}")]
pub struct UnknownPermissionKind(pub String);

/// Returned when parsing an unknown group name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown permission group: {0}")]
pub struct UnknownPermissionGroup(pub String);
