use std::borrow::Cow;

use serde::{Deserialize, Deserializer, Serialize};

/// Normalized role tag of the current identity.
///
/// A `Role` is always lower-case with no surrounding whitespace, or empty when
/// the backend sent none. Every constructor (including deserialization) goes
/// through [`Role::normalize`], so comparisons elsewhere never case-fold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

/// The closed set of role tags the clinic recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleTag {
    Director,
    Profesional,
    Administrativo,
}

impl RoleTag {
    pub const ALL: [RoleTag; 3] = [RoleTag::Director, RoleTag::Profesional, RoleTag::Administrativo];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleTag::Director => "director",
            RoleTag::Profesional => "profesional",
            RoleTag::Administrativo => "administrativo",
        }
    }
}

impl core::fmt::Display for RoleTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    pub const NONE: Role = Role(Cow::Borrowed(""));
    pub const DIRECTOR: Role = Role(Cow::Borrowed("director"));
    pub const PROFESIONAL: Role = Role(Cow::Borrowed("profesional"));
    pub const ADMINISTRATIVO: Role = Role(Cow::Borrowed("administrativo"));

    /// Lower-case and trim a raw role string from the backend.
    pub fn normalize(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Self::NONE;
        }
        match RoleTag::ALL
            .iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(trimmed))
        {
            Some(tag) => Self::from(*tag),
            None => Self(Cow::Owned(trimmed.to_lowercase())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The recognized tag, if this role is one of the closed set.
    pub fn tag(&self) -> Option<RoleTag> {
        RoleTag::ALL.into_iter().find(|tag| tag.as_str() == self.as_str())
    }

    pub fn is(&self, tag: RoleTag) -> bool {
        self.as_str() == tag.as_str()
    }
}

impl From<RoleTag> for Role {
    fn from(tag: RoleTag) -> Self {
        Self(Cow::Borrowed(tag.as_str()))
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(Role::normalize).unwrap_or_default())
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(Role::normalize("  Director "), Role::DIRECTOR);
        assert_eq!(Role::normalize("PROFESIONAL"), Role::PROFESIONAL);
        assert_eq!(Role::normalize("\tadministrativo\n").tag(), Some(RoleTag::Administrativo));
    }

    #[test]
    fn blank_role_is_empty() {
        assert!(Role::normalize("   ").is_empty());
        assert_eq!(Role::normalize(""), Role::NONE);
        assert_eq!(Role::default(), Role::NONE);
    }

    #[test]
    fn unknown_roles_are_kept_normalized_without_a_tag() {
        let role = Role::normalize(" Auditor ");
        assert_eq!(role.as_str(), "auditor");
        assert_eq!(role.tag(), None);
    }

    #[test]
    fn deserialization_normalizes() {
        let role: Role = serde_json::from_str("\" Director\"").unwrap();
        assert!(role.is(RoleTag::Director));

        let role: Role = serde_json::from_str("null").unwrap();
        assert!(role.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            .. ProptestConfig::default()
        })]

        #[test]
        fn normalized_roles_are_fixed_points(raw in "[ \\tA-Za-z]{0,16}") {
            let once = Role::normalize(&raw);
            let twice = Role::normalize(once.as_str());
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once.as_str(), once.as_str().trim());
            prop_assert_eq!(once.as_str().to_lowercase(), once.as_str());
        }
    }
}
