//! `clinica-core` — session domain primitives (no IO, no async).
//!
//! This crate holds the normalized identity model shared by the event channel,
//! the navigation guard and the session store.

pub mod error;
pub mod id;
pub mod identity;
pub mod role;
pub mod snapshot;

pub use error::{DomainError, DomainResult};
pub use identity::{DEFAULT_SLOT_MINUTES, Identity, IdentityPayload, PhotoVersion};
pub use id::UserId;
pub use role::{Role, RoleTag};
pub use snapshot::IdentitySnapshot;
