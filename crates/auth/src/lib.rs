//! `clinica-auth` — route metadata and the client-side navigation guard.
//!
//! This crate is intentionally decoupled from HTTP and storage: the guard reads
//! identity through the [`SnapshotSource`] seam.

pub mod guard;
pub mod route;
pub mod routes;

pub use guard::{DenialReason, GuardConfig, GuardDecision, NavigationGuard, SnapshotSource};
pub use route::{RouteDescriptor, RoutePattern, RouteTable};
pub use routes::clinic_routes;
