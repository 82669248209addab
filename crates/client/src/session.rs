//! Session store: the authoritative in-memory identity.
//!
//! Every state change follows the same three-step sequence, performed inside
//! one commit section:
//!
//! 1. mutate the in-memory identity
//! 2. write the identity cache
//! 3. publish the matching [`SessionEvent`]
//!
//! The commit lock is re-entrant so that an event handler running on the
//! committing thread may itself call store actions (for example log out on an
//! update it does not like). Locks are never held across an `.await`.
//!
//! Fetches are single-flight: a caller that waited behind an in-flight fetch
//! which committed successfully returns that result instead of issuing its
//! own request. A fetch whose response arrives after [`SessionStore::logout`]
//! is discarded so a late response cannot resurrect a closed session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{ReentrantMutex, RwLock};
use thiserror::Error;

use clinica_core::{Identity, IdentityPayload, IdentitySnapshot, PhotoVersion, Role};
use clinica_events::{BusError, EventBus, SessionEvent};

use crate::api::{ApiError, IdentityApi};
use crate::cache::IdentityCache;
use crate::view::SessionView;

/// Event channel the store publishes on.
pub type SessionBus = dyn EventBus<SessionEvent, Error = BusError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthFetchError {
    #[error("identity request failed: {0}")]
    Request(#[source] ApiError),

    #[error("session ended while the identity request was in flight")]
    SessionEnded,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthUpdateError {
    #[error("no authenticated identity to update")]
    NotAuthenticated,

    #[error("slot duration must be at least one minute, got {0}")]
    InvalidDuration(u32),

    #[error("slot duration update failed: {0}")]
    Request(#[source] ApiError),

    #[error("session ended while the update was in flight")]
    SessionEnded,
}

/// Where the in-memory identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityOrigin {
    Empty,
    /// Seeded from the persisted snapshot at boot; not yet confirmed by the backend.
    Snapshot,
    Backend,
}

#[derive(Debug)]
struct SessionState {
    identity: Identity,
    origin: IdentityOrigin,
}

impl SessionState {
    fn empty() -> Self {
        Self {
            identity: Identity::empty(),
            origin: IdentityOrigin::Empty,
        }
    }
}

pub struct SessionStore {
    api: Arc<dyn IdentityApi>,
    cache: IdentityCache,
    bus: Arc<SessionBus>,
    state: RwLock<SessionState>,
    commit: ReentrantMutex<()>,
    fetch_gate: tokio::sync::Mutex<()>,
    /// Bumped by every logout; stale in-flight responses compare against it.
    epoch: AtomicU64,
    /// Bumped by every committed fetch.
    fetches: AtomicU64,
}

impl SessionStore {
    pub fn new(api: Arc<dyn IdentityApi>, cache: IdentityCache, bus: Arc<SessionBus>) -> Self {
        Self {
            api,
            cache,
            bus,
            state: RwLock::new(SessionState::empty()),
            commit: ReentrantMutex::new(()),
            fetch_gate: tokio::sync::Mutex::new(()),
            epoch: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn shared(api: Arc<dyn IdentityApi>, cache: IdentityCache, bus: Arc<SessionBus>) -> Arc<Self> {
        Arc::new(Self::new(api, cache, bus))
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    pub fn bus(&self) -> &Arc<SessionBus> {
        &self.bus
    }

    // ── reads ────────────────────────────────────────────────────────────

    /// Owned copy of the current identity.
    pub fn identity(&self) -> Identity {
        self.state.read().identity.clone()
    }

    pub fn origin(&self) -> IdentityOrigin {
        self.state.read().origin
    }

    pub fn role(&self) -> Role {
        self.state.read().identity.role.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.read().identity.is_logged_in()
    }

    pub fn is_director(&self) -> bool {
        self.state.read().identity.is_director()
    }

    pub fn is_professional(&self) -> bool {
        self.state.read().identity.is_professional()
    }

    pub fn is_administrative(&self) -> bool {
        self.state.read().identity.is_administrative()
    }

    /// Display projection of the identity, `None` when logged out.
    pub fn view(&self, photo_base: &str) -> Option<SessionView> {
        SessionView::from_identity(&self.state.read().identity, photo_base)
    }

    fn confirmed_identity(&self) -> Option<Identity> {
        let state = self.state.read();
        (state.origin == IdentityOrigin::Backend && state.identity.is_logged_in())
            .then(|| state.identity.clone())
    }

    // ── actions ──────────────────────────────────────────────────────────

    /// Seed the in-memory identity from the persisted snapshot.
    ///
    /// Lets predicates answer before the first fetch completes. Does nothing
    /// if an identity is already held. No event is published; the next fetch
    /// replaces the seeded identity wholesale.
    pub fn restore_from_cache(&self) -> bool {
        let _commit = self.commit.lock();
        let Some(IdentitySnapshot {
            identity,
            logged_in: true,
            ..
        }) = self.cache.read()
        else {
            return false;
        };

        let mut state = self.state.write();
        if state.origin != IdentityOrigin::Empty {
            return false;
        }
        tracing::debug!(user = ?identity.id, role = %identity.role, "identity restored from snapshot");
        state.identity = identity;
        state.origin = IdentityOrigin::Snapshot;
        true
    }

    /// Load the identity from the backend.
    ///
    /// With `force == false` and an identity already confirmed by the backend,
    /// returns it without any I/O. On failure the previous state is kept and
    /// the error is returned; the caller decides whether to log out.
    pub async fn fetch_identity(&self, force: bool) -> Result<Identity, AuthFetchError> {
        if !force {
            if let Some(identity) = self.confirmed_identity() {
                tracing::debug!(user = ?identity.id, "identity already loaded");
                return Ok(identity);
            }
        }

        let seen = self.fetches.load(Ordering::SeqCst);
        let _flight = self.fetch_gate.lock().await;
        if self.fetches.load(Ordering::SeqCst) != seen {
            if let Some(identity) = self.confirmed_identity() {
                tracing::debug!(user = ?identity.id, "joined concurrent identity fetch");
                return Ok(identity);
            }
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let payload = self.api.current_user().await.map_err(|err| {
            tracing::warn!(error = %err, "failed to fetch current identity");
            AuthFetchError::Request(err)
        })?;

        self.commit_payload(&payload, epoch)
    }

    fn commit_payload(&self, payload: &IdentityPayload, epoch: u64) -> Result<Identity, AuthFetchError> {
        let _commit = self.commit.lock();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::info!("discarding identity response that arrived after logout");
            return Err(AuthFetchError::SessionEnded);
        }

        let identity = {
            let mut state = self.state.write();
            let next = Identity::from_payload(payload, &state.identity);
            state.identity = next;
            state.origin = IdentityOrigin::Backend;
            state.identity.clone()
        };
        self.fetches.fetch_add(1, Ordering::SeqCst);

        self.persist(&identity);
        self.publish(SessionEvent::UserUpdated {
            identity: identity.clone(),
        });

        tracing::info!(user = ?identity.id, role = %identity.role, "identity loaded");
        Ok(identity)
    }

    /// Change the signed-in user's appointment slot duration.
    ///
    /// Only `slot_minutes` changes locally, and only after the backend accepted it.
    pub async fn update_slot_duration(&self, minutes: u32) -> Result<(), AuthUpdateError> {
        if minutes == 0 {
            return Err(AuthUpdateError::InvalidDuration(minutes));
        }
        let Some(user) = self.state.read().identity.id else {
            return Err(AuthUpdateError::NotAuthenticated);
        };
        let epoch = self.epoch.load(Ordering::SeqCst);

        self.api
            .update_slot_duration(user, minutes)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, user = %user, minutes, "failed to update slot duration");
                AuthUpdateError::Request(err)
            })?;

        let _commit = self.commit.lock();
        let identity = {
            let mut state = self.state.write();
            if self.epoch.load(Ordering::SeqCst) != epoch || state.identity.id != Some(user) {
                return Err(AuthUpdateError::SessionEnded);
            }
            state.identity.slot_minutes = minutes;
            state.identity.clone()
        };

        self.persist(&identity);
        self.publish(SessionEvent::UserUpdated {
            identity: identity.clone(),
        });

        tracing::info!(user = %user, minutes, "slot duration updated");
        Ok(())
    }

    /// Regenerate the photo version stamp (no network call).
    pub fn refresh_photo_version(&self) -> PhotoVersion {
        let _commit = self.commit.lock();
        let identity = {
            let mut state = self.state.write();
            state.identity.photo_version = state.identity.photo_version.next();
            state.identity.clone()
        };

        if identity.is_logged_in() {
            self.persist(&identity);
            self.publish(SessionEvent::UserUpdated {
                identity: identity.clone(),
            });
        }
        identity.photo_version
    }

    /// Reset to the unauthenticated state, clear the cache and announce it.
    ///
    /// Safe to call at any time, any number of times.
    pub fn logout(&self) {
        let _commit = self.commit.lock();
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let previous = {
            let mut state = self.state.write();
            let mut cleared = SessionState::empty();
            // Keep stamps monotonic and repeated logouts identical.
            cleared.identity.photo_version = state.identity.photo_version;
            std::mem::replace(&mut *state, cleared)
        };

        if let Err(err) = self.cache.clear() {
            tracing::warn!(error = %err, "failed to clear identity cache on logout");
        }
        self.publish(SessionEvent::UserLoggedOut);

        if previous.identity.is_logged_in() {
            tracing::info!(user = ?previous.identity.id, "logged out");
        }
    }

    /// Best-effort backend logout followed by the local [`logout`](Self::logout).
    pub async fn sign_out(&self) {
        if let Err(err) = self.api.logout().await {
            tracing::warn!(error = %err, "backend logout failed; clearing local session anyway");
        }
        self.logout();
    }

    // ── effects ──────────────────────────────────────────────────────────

    fn persist(&self, identity: &Identity) {
        if let Err(err) = self.cache.write(identity) {
            tracing::warn!(
                error = %err,
                "identity cache write failed; in-memory identity remains authoritative"
            );
        }
    }

    fn publish(&self, event: SessionEvent) {
        let event_type = clinica_events::Event::event_type(&event);
        match self.bus.publish(event) {
            Ok(report) if report.failed > 0 => {
                tracing::debug!(event = event_type, failed = report.failed, "some session handlers failed");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(event = event_type, error = %err, "failed to publish session event"),
        }
    }
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.read();
        f.debug_struct("SessionStore")
            .field("user", &state.identity.id)
            .field("role", &state.identity.role)
            .field("origin", &state.origin)
            .finish_non_exhaustive()
    }
}
