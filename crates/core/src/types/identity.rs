//! Identity-provider output.
//!
//! The identity provider is external; these types are the snapshot the
//! cart engine derives its mode from.

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use super::cart::CartMode;
use super::id::UserId;
use super::status::Role;

/// An authenticated session.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct Session {
    /// Account ID.
    pub user_id: UserId,
    /// Bearer token for backend calls.
    pub access_token: SecretString,
    /// Expiry; `None` means the provider does not report one.
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Session {
    /// Whether the session is still valid at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|exp| exp > now)
    }
}

/// Current identity: an optional session plus its role.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    /// Session, if signed in.
    pub session: Option<Session>,
    /// Role of the signed-in account; `Guest` when signed out.
    pub role: Role,
}

impl Identity {
    /// A signed-out identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A signed-in identity.
    #[must_use]
    pub const fn signed_in(session: Session, role: Role) -> Self {
        Self {
            session: Some(session),
            role,
        }
    }

    /// The session if it is valid at `now`.
    #[must_use]
    pub fn valid_session(&self, now: DateTime<Utc>) -> Option<&Session> {
        self.session.as_ref().filter(|s| s.is_valid_at(now))
    }

    /// Valid session whose role is `role`.
    #[must_use]
    pub fn session_with_role(&self, role: Role, now: DateTime<Utc>) -> Option<&Session> {
        if self.role == role {
            self.valid_session(now)
        } else {
            None
        }
    }

    /// Cart mode for this identity: authenticated only for a valid client
    /// session.
    #[must_use]
    pub fn cart_mode(&self, now: DateTime<Utc>) -> CartMode {
        if self.session_with_role(Role::Client, now).is_some() {
            CartMode::Authenticated
        } else {
            CartMode::Guest
        }
    }
}
