//! Canonical permission status and native status normalization

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::kind::PermissionKind;

/// Normalized consent state for a permission kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// The user has not been asked yet
    #[default]
    NotDetermined,
    /// The user refused
    Denied,
    /// Full access granted
    Authorized,
    /// Access is blocked by policy (parental controls, MDM); the user cannot change it
    Restricted,
    /// Trial access granted without an explicit prompt
    Provisional,
}

impl PermissionStatus {
    /// Whether the capability may be used
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized | Self::Provisional)
    }

    /// Whether a request would reach the user
    pub fn can_be_requested(&self) -> bool {
        matches!(self, Self::NotDetermined)
    }

    /// Stable snake_case identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotDetermined => "not_determined",
            Self::Denied => "denied",
            Self::Authorized => "authorized",
            Self::Restricted => "restricted",
            Self::Provisional => "provisional",
        }
    }

    /// Map a native status onto the canonical set for `kind`
    pub fn normalize(kind: PermissionKind, native: NativeAuthorization) -> Self {
        match native {
            NativeAuthorization::NotDetermined => Self::NotDetermined,
            NativeAuthorization::Denied => Self::Denied,
            NativeAuthorization::Restricted => Self::Restricted,
            NativeAuthorization::Provisional => Self::Provisional,
            NativeAuthorization::Authorized
            | NativeAuthorization::Limited
            | NativeAuthorization::Ephemeral
            | NativeAuthorization::AuthorizedAlways => Self::Authorized,
            // A when-in-use grant still leaves the always level open to a request.
            NativeAuthorization::AuthorizedWhenInUse if kind == PermissionKind::LocationAlways => {
                Self::NotDetermined
            }
            NativeAuthorization::AuthorizedWhenInUse => Self::Authorized,
        }
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status values as reported by platform frameworks
///
/// Platforms expose finer or differently shaped states than
/// [`PermissionStatus`]; adapters report whatever they observe and the
/// core normalizes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeAuthorization {
    NotDetermined,
    Denied,
    Restricted,
    Authorized,
    Provisional,
    /// Access to a user-selected subset (e.g. some photos)
    Limited,
    /// Temporary grant scoped to the current session
    Ephemeral,
    AuthorizedAlways,
    AuthorizedWhenInUse,
}

impl From<PermissionStatus> for NativeAuthorization {
    fn from(status: PermissionStatus) -> Self {
        match status {
            PermissionStatus::NotDetermined => Self::NotDetermined,
            PermissionStatus::Denied => Self::Denied,
            PermissionStatus::Authorized => Self::Authorized,
            PermissionStatus::Restricted => Self::Restricted,
            PermissionStatus::Provisional => Self::Provisional,
        }
    }
}
