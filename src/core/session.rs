//! Session snapshot types.

use std::fmt;

pub use identity_backend::UserId;

/// Authentication status of a [`Session`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SessionStatus {
    Unauthenticated,
    Resolving,
    Authenticated,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Resolving => "resolving",
            Self::Authenticated => "authenticated",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable authentication snapshot.
///
/// A user id is present exactly when the status is `Authenticated`; the enum
/// shape makes any other combination unrepresentable.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Session {
    Resolving,
    Unauthenticated,
    Authenticated { user_id: UserId },
}

impl Session {
    pub fn resolving() -> Self {
        Self::Resolving
    }

    pub fn unauthenticated() -> Self {
        Self::Unauthenticated
    }

    pub fn authenticated(user_id: impl Into<UserId>) -> Self {
        Self::Authenticated {
            user_id: user_id.into(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Resolving => SessionStatus::Resolving,
            Self::Unauthenticated => SessionStatus::Unauthenticated,
            Self::Authenticated { .. } => SessionStatus::Authenticated,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Authenticated { user_id } => Some(user_id),
            Self::Resolving | Self::Unauthenticated => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// A published session snapshot tagged with the store's sequence number.
///
/// Sequence numbers strictly increase across the transitions of one store; the
/// initial `Resolving` snapshot carries `0`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionTransition {
    pub seq: u64,
    pub session: Session,
}

impl SessionTransition {
    pub fn initial() -> Self {
        Self {
            seq: 0,
            session: Session::Resolving,
        }
    }
}
