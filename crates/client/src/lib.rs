//! `clinica-client`
//!
//! **Responsibility:** client-side session and role-based authorization.
//!
//! This crate provides:
//! - The session store (authoritative in-memory identity)
//! - The persisted identity mirror read synchronously by the navigation guard
//! - The identity endpoints (HTTP, cookie session)
//! - Environment configuration and the application-root wiring
//!
//! The backend remains the authority: everything here is a cache or a UX gate.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod session;
pub mod storage;
pub mod view;

pub use api::{ApiError, IdentityApi};
#[cfg(feature = "http")]
pub use api::HttpIdentityApi;
pub use cache::{CacheWriteError, IdentityCache};
pub use config::{ClientConfig, ConfigError};
pub use context::SessionContext;
pub use session::{AuthFetchError, AuthUpdateError, IdentityOrigin, SessionBus, SessionStore};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use view::{SessionView, photo_url};
