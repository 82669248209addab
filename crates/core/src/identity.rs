//! Identity of the signed-in user as held by the session layer.
//!
//! Two shapes live here:
//!
//! - [`IdentityPayload`]: the loosely-typed body returned by the backend's
//!   "who am I" endpoint. Every field is optional and some have aliases.
//! - [`Identity`]: the normalized record the rest of the system works with.
//!
//! [`Identity::from_payload`] is the only place payload aliasing is resolved.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{Role, RoleTag, UserId};

/// Slot duration (minutes) used when neither the payload nor the previous
/// identity carries one.
pub const DEFAULT_SLOT_MINUTES: u32 = 20;

/// Cache-busting stamp appended to photo URLs.
///
/// Stamps are epoch milliseconds, bumped past the previous value when the
/// clock has not advanced so that successive stamps are strictly increasing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoVersion(i64);

impl PhotoVersion {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// A stamp strictly greater than `self`.
    pub fn next(&self) -> Self {
        let now = Utc::now().timestamp_millis();
        Self(now.max(self.0.saturating_add(1)))
    }
}

impl Default for PhotoVersion {
    fn default() -> Self {
        Self::now()
    }
}

impl core::fmt::Display for PhotoVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Raw "who am I" body as the backend sends it.
///
/// All fields are optional; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPayload {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub rol: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub duracion_turno: Option<u32>,
    #[serde(default)]
    pub foto: Option<String>,
}

/// The normalized identity record.
///
/// Serialized with the backend's field names so persisted snapshots and event
/// payloads read the same as the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Option<UserId>,
    #[serde(rename = "nombre", default)]
    pub display_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "rol", default)]
    pub role: Role,
    #[serde(rename = "duracion_turno", default = "default_slot_minutes")]
    pub slot_minutes: u32,
    #[serde(rename = "foto", default)]
    pub photo: Option<String>,
    #[serde(rename = "foto_version", default)]
    pub photo_version: PhotoVersion,
}

fn default_slot_minutes() -> u32 {
    DEFAULT_SLOT_MINUTES
}

/// First non-blank candidate, trimmed.
fn first_present<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
}

impl Identity {
    /// The unauthenticated identity a session starts with.
    pub fn empty() -> Self {
        Self {
            id: None,
            display_name: String::new(),
            username: String::new(),
            email: String::new(),
            role: Role::NONE,
            slot_minutes: DEFAULT_SLOT_MINUTES,
            photo: None,
            photo_version: PhotoVersion::now(),
        }
    }

    /// Map a backend payload onto a fresh identity.
    ///
    /// Fallback chains (first non-blank wins):
    ///
    /// | field          | sources                         | default                 |
    /// |----------------|---------------------------------|-------------------------|
    /// | `display_name` | `nombre`, `name`, `username`    | `""`                    |
    /// | `username`     | `username`                      | `""`                    |
    /// | `email`        | `email`                         | `""`                    |
    /// | `role`         | `rol`, `role` (normalized)      | `""`                    |
    /// | `slot_minutes` | `duracion_turno`                | `previous.slot_minutes` |
    /// | `photo`        | `foto`                          | `None`                  |
    ///
    /// The photo version is carried over from `previous`.
    pub fn from_payload(payload: &IdentityPayload, previous: &Identity) -> Self {
        let display_name = first_present([
            payload.nombre.as_deref(),
            payload.name.as_deref(),
            payload.username.as_deref(),
        ]);
        let role = first_present([payload.rol.as_deref(), payload.role.as_deref()])
            .map(Role::normalize)
            .unwrap_or_default();

        Self {
            id: payload.id,
            display_name: display_name.unwrap_or_default().to_string(),
            username: first_present([payload.username.as_deref()])
                .unwrap_or_default()
                .to_string(),
            email: first_present([payload.email.as_deref()])
                .unwrap_or_default()
                .to_string(),
            role,
            slot_minutes: payload.duracion_turno.unwrap_or(previous.slot_minutes),
            photo: first_present([payload.foto.as_deref()]).map(str::to_string),
            photo_version: previous.photo_version,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.id.is_some()
    }

    pub fn is_director(&self) -> bool {
        self.role.is(RoleTag::Director)
    }

    pub fn is_professional(&self) -> bool {
        self.role.is(RoleTag::Profesional)
    }

    pub fn is_administrative(&self) -> bool {
        self.role.is(RoleTag::Administrativo)
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::empty()
    }
}
