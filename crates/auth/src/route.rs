//! Route descriptors: static per-route metadata consulted by the guard.

use clinica_core::{DomainError, DomainResult, Role, RoleTag};

/// One segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    /// Matches the remainder of the path, including nothing.
    CatchAll,
}

/// A path pattern such as `/pacientes/:id/editar` or `/:pathMatch(.*)*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|s| !s.is_empty())
}

impl RoutePattern {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        if !raw.starts_with('/') {
            return Err(DomainError::validation(format!(
                "route pattern must start with '/': {raw}"
            )));
        }

        let mut segments = Vec::new();
        let mut parts = split_path(raw).peekable();
        while let Some(part) = parts.next() {
            if part.ends_with('*') || part == "*" {
                if parts.peek().is_some() {
                    return Err(DomainError::validation(format!(
                        "catch-all must be the last segment: {raw}"
                    )));
                }
                segments.push(Segment::CatchAll);
            } else if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(DomainError::validation(format!("unnamed parameter in {raw}")));
                }
                segments.push(Segment::Param(name.to_string()));
            } else {
                segments.push(Segment::Static(part.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `path` (query string and fragment ignored) matches this pattern.
    ///
    /// Static segments compare ASCII case-insensitively.
    pub fn matches(&self, path: &str) -> bool {
        let mut parts = split_path(path);
        for segment in &self.segments {
            match segment {
                Segment::CatchAll => return true,
                Segment::Static(expected) => match parts.next() {
                    Some(part) if part.eq_ignore_ascii_case(expected) => {}
                    _ => return false,
                },
                Segment::Param(_) => {
                    if parts.next().is_none() {
                        return false;
                    }
                }
            }
        }
        parts.next().is_none()
    }
}

impl core::fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Static per-route metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub name: String,
    pub pattern: RoutePattern,
    /// Routes require authentication unless declared otherwise.
    pub requires_auth: bool,
    /// When set, only these (normalized) roles are admitted.
    pub allowed_roles: Option<Vec<Role>>,
}

impl RouteDescriptor {
    pub fn new(name: impl Into<String>, pattern: &str) -> DomainResult<Self> {
        Ok(Self {
            name: name.into(),
            pattern: RoutePattern::parse(pattern)?,
            requires_auth: true,
            allowed_roles: None,
        })
    }

    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    pub fn allow_roles(mut self, roles: impl IntoIterator<Item = RoleTag>) -> Self {
        self.allowed_roles = Some(roles.into_iter().map(Role::from).collect());
        self
    }

    pub fn permits(&self, role: &Role) -> bool {
        match &self.allowed_roles {
            Some(allowed) => allowed.contains(role),
            None => true,
        }
    }
}

/// Ordered route table; the first matching descriptor wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteDescriptor>) -> Self {
        Self { routes }
    }

    pub fn push(&mut self, route: RouteDescriptor) {
        self.routes.push(route);
    }

    pub fn resolve(&self, path: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| r.pattern.matches(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(raw: &str) -> RoutePattern {
        RoutePattern::parse(raw).unwrap()
    }

    #[test]
    fn static_and_param_segments() {
        let p = pattern("/pacientes/:id/editar");
        assert!(p.matches("/pacientes/12/editar"));
        assert!(p.matches("/pacientes/12/editar/"));
        assert!(p.matches("/pacientes/12/editar?tab=datos"));
        assert!(!p.matches("/pacientes/12"));
        assert!(!p.matches("/pacientes/12/editar/extra"));
        assert!(p.matches("/Pacientes/12/EDITAR"));
    }

    #[test]
    fn root_only_matches_root() {
        let p = pattern("/");
        assert!(p.matches("/"));
        assert!(p.matches(""));
        assert!(!p.matches("/turnos"));
    }

    #[test]
    fn catch_all_matches_everything() {
        let p = pattern("/:pathMatch(.*)*");
        assert!(p.matches("/"));
        assert!(p.matches("/no/such/page"));
    }

    #[test]
    fn rejects_malformed_patterns() {
        assert!(RoutePattern::parse("turnos").is_err());
        assert!(RoutePattern::parse("/a/*/b").is_err());
        assert!(RoutePattern::parse("/a/:").is_err());
    }

    #[test]
    fn first_match_wins() {
        let table = RouteTable::new(vec![
            RouteDescriptor::new("crearUsuario", "/usuarios/crear").unwrap(),
            RouteDescriptor::new("editarUsuario", "/usuarios/:id").unwrap(),
        ]);
        assert_eq!(table.resolve("/usuarios/crear").unwrap().name, "crearUsuario");
        assert_eq!(table.resolve("/usuarios/4").unwrap().name, "editarUsuario");
        assert!(table.resolve("/turnos").is_none());
    }

    #[test]
    fn role_membership_uses_normalized_roles() {
        let route = RouteDescriptor::new("usuarios", "/usuarios")
            .unwrap()
            .allow_roles([RoleTag::Director]);
        assert!(route.permits(&Role::normalize(" DIRECTOR ")));
        assert!(!route.permits(&Role::PROFESIONAL));
        assert!(!route.permits(&Role::NONE));
    }
}
