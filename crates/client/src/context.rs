//! Application-root wiring of the session layer.
//!
//! The context owns one store, one cache, one channel and one guard. Views get
//! them from here (or from a clone of the `Arc`s), never from globals, so tests
//! can run independent sessions side by side.

use std::sync::Arc;

use clinica_auth::{NavigationGuard, RouteTable};
use clinica_core::Identity;
use clinica_events::{InMemoryEventBus, SessionEvent};

use crate::api::IdentityApi;
use crate::cache::IdentityCache;
use crate::config::ClientConfig;
use crate::session::{AuthFetchError, SessionBus, SessionStore};
use crate::storage::KeyValueStorage;
use crate::view::SessionView;

pub struct SessionContext {
    pub config: ClientConfig,
    pub store: Arc<SessionStore>,
    pub guard: NavigationGuard<IdentityCache>,
}

impl SessionContext {
    pub fn new(
        config: ClientConfig,
        api: Arc<dyn IdentityApi>,
        storage: Arc<dyn KeyValueStorage>,
        routes: RouteTable,
    ) -> Self {
        let cache = IdentityCache::new(storage);
        let bus: Arc<SessionBus> = Arc::new(InMemoryEventBus::<SessionEvent>::new());
        let store = SessionStore::shared(api, cache.clone(), bus);
        let guard = NavigationGuard::with_config(cache, routes, config.guard_config());

        Self {
            config,
            store,
            guard,
        }
    }

    /// Production wiring: HTTP identity API, file-backed mirror, clinic routes.
    #[cfg(feature = "http")]
    pub fn from_config(config: ClientConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let api = crate::api::HttpIdentityApi::new(config.api_url.clone(), config.http_timeout)
            .context("failed to build identity HTTP client")?;
        let storage = crate::storage::FileStorage::open(config.state_dir.clone())?;
        let routes = clinica_auth::clinic_routes().context("invalid route table")?;

        Ok(Self::new(config, Arc::new(api), Arc::new(storage), routes))
    }

    pub fn bus(&self) -> &Arc<SessionBus> {
        self.store.bus()
    }

    /// Header/menu projection, with photo links under the configured API.
    pub fn view(&self) -> Option<SessionView> {
        self.store.view(self.config.photo_base())
    }

    /// Boot sequence: seed predicates from the snapshot, then load the
    /// identity from the backend.
    ///
    /// A fetch failure is returned as-is; the seeded identity (if any) stays
    /// in place and the caller decides whether to log out.
    pub async fn boot(&self) -> Result<Identity, AuthFetchError> {
        if self.store.restore_from_cache() {
            tracing::debug!("session seeded from persisted snapshot");
        }
        self.store.fetch_identity(false).await
    }
}

impl core::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionContext")
            .field("api_url", &self.config.api_url)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
