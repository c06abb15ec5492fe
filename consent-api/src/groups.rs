//! Named permission groups for common application scenarios
//!
//! Groups are fixed ordered lists and may overlap. Members are not
//! deduplicated across or within groups.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownPermissionGroup;
use crate::kind::PermissionKind;

use PermissionKind::*;

const MEDIA: &[PermissionKind] = &[Camera, Microphone, PhotoLibrary];
const LOCATION: &[PermissionKind] = &[LocationWhenInUse, LocationAlways];
const SOCIAL: &[PermissionKind] = &[Contacts, PhotoLibrary, Camera];
const FITNESS: &[PermissionKind] = &[Health, Motion];
const PRODUCTIVITY: &[PermissionKind] = &[Calendar, Reminders, Contacts];
const HEALTH_AND_FITNESS: &[PermissionKind] = &[Health, Motion, LocationWhenInUse];
const BIOMETRIC: &[PermissionKind] = &[FaceId, TouchId];
const ESSENTIAL: &[PermissionKind] = &[Notifications, Camera, PhotoLibrary];

/// A named, ordered set of permission kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionGroup {
    Media,
    Location,
    Social,
    Fitness,
    Productivity,
    HealthAndFitness,
    Biometric,
    Essential,
    /// Every supported kind
    All,
}

impl PermissionGroup {
    pub const ALL: &'static [PermissionGroup] = &[
        Self::Media,
        Self::Location,
        Self::Social,
        Self::Fitness,
        Self::Productivity,
        Self::HealthAndFitness,
        Self::Biometric,
        Self::Essential,
        Self::All,
    ];

    /// Members of the group, in request order
    pub fn kinds(&self) -> &'static [PermissionKind] {
        match self {
            Self::Media => MEDIA,
            Self::Location => LOCATION,
            Self::Social => SOCIAL,
            Self::Fitness => FITNESS,
            Self::Productivity => PRODUCTIVITY,
            Self::HealthAndFitness => HEALTH_AND_FITNESS,
            Self::Biometric => BIOMETRIC,
            Self::Essential => ESSENTIAL,
            Self::All => PermissionKind::ALL,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Media => "media",
            Self::Location => "location",
            Self::Social => "social",
            Self::Fitness => "fitness",
            Self::Productivity => "productivity",
            Self::HealthAndFitness => "health_and_fitness",
            Self::Biometric => "biometric",
            Self::Essential => "essential",
            Self::All => "all",
        }
    }

    pub fn contains(&self, kind: PermissionKind) -> bool {
        self.kinds().contains(&kind)
    }
}

impl fmt::Display for PermissionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PermissionGroup {
    type Err = UnknownPermissionGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|group| group.name() == s)
            .ok_or_else(|| UnknownPermissionGroup(s.to_string()))
    }
}
