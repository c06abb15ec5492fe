//! Permission kinds
//!
//! The kind list is declared exactly once; the enum, its identifiers and
//! `PermissionKind::ALL` are all generated from that declaration so they
//! cannot drift apart.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownPermissionKind;

macro_rules! permission_kinds {
    ($( $(#[$meta:meta])* $variant:ident => $id:literal, $name:literal; )+) => {
        /// One discrete category of sensitive-capability consent
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum PermissionKind {
            $(
                $(#[$meta])*
                #[serde(rename = $id)]
                $variant,
            )+
        }

        impl PermissionKind {
            /// Every supported kind, in declaration order
            pub const ALL: &'static [PermissionKind] = &[$(PermissionKind::$variant,)+];

            /// Stable snake_case identifier
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $id,)+
                }
            }

            /// Human-readable name for prompts and settings screens
            pub fn display_name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

permission_kinds! {
    /// Location access without a specific level
    Location => "location", "Location";
    /// Location access while the app is in use
    LocationWhenInUse => "location_when_in_use", "Location (When In Use)";
    /// Location access at all times, including background
    LocationAlways => "location_always", "Location (Always)";
    Notifications => "notifications", "Notifications";
    Camera => "camera", "Camera";
    Microphone => "microphone", "Microphone";
    PhotoLibrary => "photo_library", "Photo Library";
    Contacts => "contacts", "Contacts";
    Calendar => "calendar", "Calendar";
    Reminders => "reminders", "Reminders";
    Health => "health", "Health";
    Motion => "motion", "Motion & Fitness";
    FaceId => "face_id", "Face ID";
    TouchId => "touch_id", "Touch ID";
    /// Cross-app tracking consent
    Tracking => "tracking", "App Tracking";
}

impl PermissionKind {
    /// Whether this kind is one of the location levels
    ///
    /// Location kinds can change out-of-band (the user edits system settings
    /// while the app runs), so they usually come with a change feed.
    pub fn is_location(&self) -> bool {
        matches!(
            self,
            Self::Location | Self::LocationWhenInUse | Self::LocationAlways
        )
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionKind {
    type Err = UnknownPermissionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownPermissionKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_has_no_duplicates() {
        let unique: HashSet<_> = PermissionKind::ALL.iter().collect();
        assert_eq!(unique.len(), PermissionKind::ALL.len());
        assert_eq!(PermissionKind::ALL.len(), 15);
    }

    #[test]
    fn test_identifier_parses_back() {
        for kind in PermissionKind::ALL {
            assert_eq!(kind.as_str().parse::<PermissionKind>().unwrap(), *kind);
        }
        assert!("bluetooth".parse::<PermissionKind>().is_err());
    }

    #[test]
    fn test_serde_uses_identifier() {
        let json = serde_json::to_string(&PermissionKind::PhotoLibrary).unwrap();
        assert_eq!(json, "\"photo_library\"");

        let kind: PermissionKind = serde_json::from_str("\"location_when_in_use\"").unwrap();
        assert_eq!(kind, PermissionKind::LocationWhenInUse);
    }

    #[test]
    fn test_location_kinds() {
        let location: Vec<_> = PermissionKind::ALL
            .iter()
            .filter(|k| k.is_location())
            .collect();
        assert_eq!(location.len(), 3);
        assert!(!PermissionKind::Camera.is_location());
    }
}
