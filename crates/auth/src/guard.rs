//! Synchronous pre-navigation guard.
//!
//! The guard decides every route transition from the persisted identity
//! snapshot alone. It never awaits the network, so a role changed server-side
//! a moment ago may not be reflected yet. It is a UX convenience: the backend
//! re-validates authorization on every request.
//!
//! Decision table (first match wins):
//!
//! 1. path is on the public allow-list → admit
//! 2. route requires auth and the snapshot says "not logged in" → redirect to login
//! 3. route declares allowed roles and the cached role is not one of them → redirect home
//! 4. otherwise → admit

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use clinica_core::{IdentitySnapshot, Role};

use crate::route::{RoutePattern, RouteTable};

/// Synchronous read access to the persisted identity mirror.
pub trait SnapshotSource: Send + Sync {
    /// Last written snapshot, if any.
    fn read_snapshot(&self) -> Option<IdentitySnapshot>;

    /// The persisted "is logged in" flag.
    fn is_logged_in(&self) -> bool {
        self.read_snapshot().is_some_and(|s| s.logged_in)
    }
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for Arc<S> {
    fn read_snapshot(&self) -> Option<IdentitySnapshot> {
        (**self).read_snapshot()
    }

    fn is_logged_in(&self) -> bool {
        (**self).is_logged_in()
    }
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for &S {
    fn read_snapshot(&self) -> Option<IdentitySnapshot> {
        (**self).read_snapshot()
    }

    fn is_logged_in(&self) -> bool {
        (**self).is_logged_in()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    NotAuthenticated,
    RoleNotPermitted { role: String },
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    Admit,
    /// Abort the transition and navigate to `to` instead.
    Redirect { to: String, reason: DenialReason },
}

impl GuardDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, GuardDecision::Admit)
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            GuardDecision::Redirect { to, .. } => Some(to),
            GuardDecision::Admit => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Paths admitted unconditionally.
    pub public_paths: Vec<RoutePattern>,
    pub login_path: String,
    pub home_path: String,
    /// How old a snapshot may get before the guard flags it for refresh.
    pub max_snapshot_age: Duration,
}

impl GuardConfig {
    pub const LOGIN_PATH: &'static str = "/auth/login";
    pub const HOME_PATH: &'static str = "/";
    pub const PUBLIC_PATHS: [&'static str; 4] = ["/auth/login", "/recuperar", "/reset/:token", "/logout"];

    pub fn with_max_snapshot_age(mut self, max_age: Duration) -> Self {
        self.max_snapshot_age = max_age;
        self
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        let public_paths = Self::PUBLIC_PATHS
            .iter()
            .filter_map(|raw| RoutePattern::parse(raw).ok())
            .collect();
        Self {
            public_paths,
            login_path: Self::LOGIN_PATH.to_string(),
            home_path: Self::HOME_PATH.to_string(),
            max_snapshot_age: Duration::minutes(15),
        }
    }
}

/// Route guard over a [`SnapshotSource`].
#[derive(Debug, Clone)]
pub struct NavigationGuard<S> {
    source: S,
    routes: RouteTable,
    config: GuardConfig,
}

impl<S: SnapshotSource> NavigationGuard<S> {
    pub fn new(source: S, routes: RouteTable) -> Self {
        Self::with_config(source, routes, GuardConfig::default())
    }

    pub fn with_config(source: S, routes: RouteTable, config: GuardConfig) -> Self {
        Self {
            source,
            routes,
            config,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.config.public_paths.iter().any(|p| p.matches(path))
    }

    /// Decide whether navigation to `path` may commit.
    pub fn check(&self, path: &str) -> GuardDecision {
        self.check_at(path, Utc::now())
    }

    pub fn check_at(&self, path: &str, now: DateTime<Utc>) -> GuardDecision {
        if self.is_public(path) {
            return GuardDecision::Admit;
        }

        let route = self.routes.resolve(path);
        let requires_auth = route.is_none_or(|r| r.requires_auth);

        if requires_auth && !self.source.is_logged_in() {
            tracing::debug!(path, "navigation requires login");
            return GuardDecision::Redirect {
                to: self.config.login_path.clone(),
                reason: DenialReason::NotAuthenticated,
            };
        }

        let Some(route) = route else {
            return GuardDecision::Admit;
        };
        if route.allowed_roles.is_none() {
            return GuardDecision::Admit;
        }

        let snapshot = self.source.read_snapshot();
        if let Some(snapshot) = &snapshot {
            if snapshot.is_stale(now, self.config.max_snapshot_age) {
                tracing::warn!(
                    path,
                    age_secs = snapshot.age(now).num_seconds(),
                    "deciding on a stale identity snapshot"
                );
            }
        }
        let role = snapshot.map(|s| s.identity.role).unwrap_or(Role::NONE);

        if route.permits(&role) {
            GuardDecision::Admit
        } else {
            tracing::warn!(path, role = %role, route = %route.name, "navigation denied for role");
            GuardDecision::Redirect {
                to: self.config.home_path.clone(),
                reason: DenialReason::RoleNotPermitted {
                    role: role.to_string(),
                },
            }
        }
    }

    /// Whether the snapshot is missing or older than the configured maximum,
    /// i.e. the caller should schedule an identity refresh.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.source.read_snapshot() {
            Some(snapshot) => snapshot.is_stale(now, self.config.max_snapshot_age),
            None => self.source.is_logged_in(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteDescriptor;
    use clinica_core::{Identity, RoleTag, UserId};

    struct Fixed {
        snapshot: Option<IdentitySnapshot>,
        logged_in: bool,
    }

    impl SnapshotSource for Fixed {
        fn read_snapshot(&self) -> Option<IdentitySnapshot> {
            self.snapshot.clone()
        }

        fn is_logged_in(&self) -> bool {
            self.logged_in
        }
    }

    fn signed_in(role: &str, written_at: DateTime<Utc>) -> Fixed {
        let mut identity = Identity::empty();
        identity.id = Some(UserId::new(1));
        identity.role = Role::normalize(role);
        Fixed {
            snapshot: Some(IdentitySnapshot::capture(&identity, written_at)),
            logged_in: true,
        }
    }

    fn signed_out() -> Fixed {
        Fixed {
            snapshot: None,
            logged_in: false,
        }
    }

    fn table() -> RouteTable {
        RouteTable::new(vec![
            RouteDescriptor::new("dashboard", "/").unwrap(),
            RouteDescriptor::new("usuarios", "/usuarios")
                .unwrap()
                .allow_roles([RoleTag::Director]),
            RouteDescriptor::new("turnos", "/turnos").unwrap(),
            RouteDescriptor::new("ayuda", "/ayuda").unwrap().public(),
        ])
    }

    #[test]
    fn public_login_is_admitted_while_logged_out() {
        let guard = NavigationGuard::new(signed_out(), table());
        assert_eq!(guard.check("/auth/login"), GuardDecision::Admit);
        assert!(guard.check("/reset/abc123").is_admitted());
        assert!(guard.check("/recuperar").is_admitted());
        assert!(guard.check("/logout").is_admitted());
    }

    #[test]
    fn protected_route_redirects_to_login_when_logged_out() {
        let guard = NavigationGuard::new(signed_out(), table());
        let decision = guard.check("/turnos");
        assert_eq!(
            decision,
            GuardDecision::Redirect {
                to: "/auth/login".to_string(),
                reason: DenialReason::NotAuthenticated,
            }
        );
    }

    #[test]
    fn unknown_routes_require_auth() {
        let guard = NavigationGuard::new(signed_out(), table());
        assert_eq!(guard.check("/no/such/page").redirect_target(), Some("/auth/login"));
    }

    #[test]
    fn route_declared_public_skips_login() {
        let guard = NavigationGuard::new(signed_out(), table());
        assert!(guard.check("/ayuda").is_admitted());
    }

    #[test]
    fn professional_is_sent_home_from_director_route() {
        let guard = NavigationGuard::new(signed_in("profesional", Utc::now()), table());
        let decision = guard.check("/usuarios");
        assert_eq!(decision.redirect_target(), Some("/"));
        assert!(matches!(
            decision,
            GuardDecision::Redirect {
                reason: DenialReason::RoleNotPermitted { ref role },
                ..
            } if role == "profesional"
        ));
    }

    #[test]
    fn director_is_admitted_to_director_route() {
        let guard = NavigationGuard::new(signed_in(" Director", Utc::now()), table());
        assert!(guard.check("/usuarios").is_admitted());
        assert!(guard.check("/turnos").is_admitted());
    }

    #[test]
    fn logged_in_flag_without_snapshot_has_no_role() {
        let source = Fixed {
            snapshot: None,
            logged_in: true,
        };
        let guard = NavigationGuard::new(source, table());
        assert!(guard.check("/turnos").is_admitted());
        assert_eq!(guard.check("/usuarios").redirect_target(), Some("/"));
        assert!(guard.needs_refresh(Utc::now()));
    }

    #[test]
    fn stale_snapshot_still_decides_but_requests_refresh() {
        let written_at = Utc::now() - Duration::hours(2);
        let guard = NavigationGuard::new(signed_in("director", written_at), table());

        assert!(guard.check("/usuarios").is_admitted());
        assert!(guard.needs_refresh(Utc::now()));

        let fresh = NavigationGuard::new(signed_in("director", Utc::now()), table());
        assert!(!fresh.needs_refresh(Utc::now()));
    }

    #[test]
    fn logged_out_without_snapshot_needs_no_refresh() {
        let guard = NavigationGuard::new(signed_out(), table());
        assert!(!guard.needs_refresh(Utc::now()));
    }

    #[test]
    fn decisions_serialize_for_the_view_layer() {
        let denied = GuardDecision::Redirect {
            to: "/".to_string(),
            reason: DenialReason::RoleNotPermitted {
                role: "profesional".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(&denied).unwrap(),
            serde_json::json!({
                "decision": "redirect",
                "to": "/",
                "reason": { "kind": "role_not_permitted", "role": "profesional" }
            })
        );
        assert_eq!(
            serde_json::to_value(GuardDecision::Admit).unwrap(),
            serde_json::json!({ "decision": "admit" })
        );
    }

    #[test]
    fn path_case_does_not_bypass_role_rules() {
        let guard = NavigationGuard::new(
            signed_in("profesional", Utc::now()),
            crate::routes::clinic_routes().unwrap(),
        );
        for path in ["/usuarios", "/USUARIOS", "/Usuarios/crear", "/usuarios/7/EDITAR"] {
            assert_eq!(
                guard.check(path),
                GuardDecision::Redirect {
                    to: "/".to_string(),
                    reason: DenialReason::RoleNotPermitted {
                        role: "profesional".to_string(),
                    },
                },
                "{path}"
            );
        }
        assert!(guard.check("/Auth/Login").is_admitted());
    }
}
