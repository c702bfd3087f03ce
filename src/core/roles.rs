//! Authorization roles and role sets.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use identity_backend::RoleRow;

/// Authorization role.
///
/// The set is open: names outside the built-in three are kept as `Other`.
/// Names are trimmed and lower-cased, so `" Admin "` parses as `Admin`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Role {
    Admin,
    Moderator,
    User,
    Other(String),
}

impl Role {
    pub fn parse(name: &str) -> Self {
        let normalized = name.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "admin" => Self::Admin,
            "moderator" => Self::Moderator,
            "user" => Self::User,
            _ => Self::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Moderator => "moderator",
            Self::User => "user",
            Self::Other(name) => name,
        }
    }
}

impl FromStr for Role {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles bound to the current session plus the in-flight indicator.
///
/// `is_admin` and `is_moderator` are projections of `roles`; there is no
/// separately stored flag that could drift.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RoleSet {
    pub roles: BTreeSet<Role>,
    pub loading: bool,
}

impl RoleSet {
    /// No roles, nothing in flight.
    pub fn empty() -> Self {
        Self::default()
    }

    /// No roles yet, a lookup is outstanding.
    pub fn pending() -> Self {
        Self {
            roles: BTreeSet::new(),
            loading: true,
        }
    }

    /// Settled role set built from role-table rows. Blank names are skipped and
    /// duplicates collapse.
    pub fn from_rows(rows: &[RoleRow]) -> Self {
        Self::from_names(rows.iter().map(|row| row.role.as_str()))
    }

    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let roles = names
            .into_iter()
            .filter(|name| !name.trim().is_empty())
            .map(Role::parse)
            .collect();
        Self {
            roles,
            loading: false,
        }
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(&Role::Admin)
    }

    pub fn is_moderator(&self) -> bool {
        self.has_role(&Role::Moderator)
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
