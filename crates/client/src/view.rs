//! Display projection of the session identity.

use serde::Serialize;

use clinica_core::{Identity, PhotoVersion, Role, UserId};

/// Shown when the backend sent neither a display name nor a login name.
pub const FALLBACK_DISPLAY_NAME: &str = "Usuario";

const PHOTO_PATH: &str = "/static/fotos_usuarios";

/// What header/menu fragments render for the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub id: UserId,
    pub nombre: String,
    pub username: String,
    pub email: String,
    pub rol: Role,
    pub foto: Option<String>,
    pub foto_url: Option<String>,
}

impl SessionView {
    /// `None` when `identity` is not logged in.
    pub fn from_identity(identity: &Identity, photo_base: &str) -> Option<Self> {
        let id = identity.id?;
        let nombre = [identity.display_name.as_str(), identity.username.as_str()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or(FALLBACK_DISPLAY_NAME)
            .to_string();

        Some(Self {
            id,
            nombre,
            username: identity.username.clone(),
            email: identity.email.clone(),
            rol: identity.role.clone(),
            foto: identity.photo.clone(),
            foto_url: photo_url(photo_base, identity.photo.as_deref(), Some(identity.photo_version)),
        })
    }
}

/// URL of a user photo, with the version stamp appended to defeat caching.
///
/// Absolute `http(s)` references are returned unchanged.
pub fn photo_url(base: &str, filename: Option<&str>, version: Option<PhotoVersion>) -> Option<String> {
    let filename = filename.map(str::trim).filter(|f| !f.is_empty())?;
    if filename.starts_with("http://") || filename.starts_with("https://") {
        return Some(filename.to_string());
    }

    let mut url = format!("{}{}/{}", base.trim_end_matches('/'), PHOTO_PATH, filename);
    if let Some(version) = version {
        url.push_str(&format!("?t={version}"));
    }
    Some(url)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn photo_urls() {
        let v = PhotoVersion::from_millis(1234);
        assert_eq!(
            photo_url("http://localhost:5000/api/", Some("ana.png"), Some(v)).as_deref(),
            Some("http://localhost:5000/api/static/fotos_usuarios/ana.png?t=1234")
        );
        assert_eq!(
            photo_url("/api", Some("ana.png"), None).as_deref(),
            Some("/api/static/fotos_usuarios/ana.png")
        );
        assert_eq!(
            photo_url("/api", Some("https://cdn.example/ana.png"), Some(v)).as_deref(),
            Some("https://cdn.example/ana.png")
        );
        assert_eq!(photo_url("/api", None, Some(v)), None);
        assert_eq!(photo_url("/api", Some("  "), Some(v)), None);
    }

    #[test]
    fn logged_out_identity_has_no_view() {
        assert!(SessionView::from_identity(&Identity::empty(), "/api").is_none());
    }

    #[test]
    fn display_name_falls_back() {
        let mut identity = Identity::empty();
        identity.id = Some(UserId::new(4));
        assert_eq!(
            SessionView::from_identity(&identity, "/api").unwrap().nombre,
            FALLBACK_DISPLAY_NAME
        );

        identity.username = "jgomez".to_string();
        let view = SessionView::from_identity(&identity, "/api").unwrap();
        assert_eq!(view.nombre, "jgomez");
        assert_eq!(view.foto_url, None);
    }

    proptest! {
        #[test]
        fn relative_photos_get_base_and_stamp(name in "[a-z0-9_]{1,16}\\.(png|jpg)", millis in 0i64..i64::MAX / 2) {
            let url = photo_url("/api/", Some(&name), Some(PhotoVersion::from_millis(millis))).unwrap();
            prop_assert_eq!(url, format!("/api/static/fotos_usuarios/{name}?t={millis}"));
        }
    }
}
