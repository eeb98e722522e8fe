//! Persisted session: the bearer token plus the user record it belongs to.
//!
//! DESIGN
//! ======
//! Two keys, `auth_token` and `auth_user`, must either both be present and
//! valid or both be absent. `load` enforces that on read by clearing any
//! partial or corrupt pair; `save` enforces it on write by restoring the prior
//! pair when the second write fails.
//!
//! ERROR HANDLING
//! ==============
//! Failures are logged here and still returned so callers can surface
//! degraded persistence. Reads never fail outward: a broken store reads as
//! "no session".

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::fmt;
use std::sync::Arc;

use super::{Storage, StorageError};
use crate::net::types::User;

pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const AUTH_USER_KEY: &str = "auth_user";

/// A token and the user it authenticates.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    backend: Option<Arc<dyn Storage>>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("available", &self.is_available())
            .finish()
    }
}

impl SessionStore {
    pub fn new(backend: impl Storage + 'static) -> Self {
        Self { backend: Some(Arc::new(backend)) }
    }

    #[must_use]
    pub fn from_arc(backend: Arc<dyn Storage>) -> Self {
        Self { backend: Some(backend) }
    }

    /// A store with no backend: writes are no-ops, reads find nothing.
    #[must_use]
    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    /// `localStorage` when reachable, otherwise [`SessionStore::unavailable`].
    #[cfg(feature = "hydrate")]
    #[must_use]
    pub fn browser() -> Self {
        if super::browser::BrowserStorage::is_available() {
            Self::new(super::browser::BrowserStorage)
        } else {
            tracing::warn!("localStorage unavailable; session will not persist");
            Self::unavailable()
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Persist `user` and `token` together.
    ///
    /// # Errors
    ///
    /// Returns the first [`StorageError`] hit. The previously stored pair is
    /// restored on a best-effort basis before returning.
    pub fn save(&self, user: &User, token: &str) -> Result<(), StorageError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };

        let result = serde_json::to_string(user).map_err(StorageError::from).and_then(|user_json| {
            let previous = (
                backend.get(AUTH_TOKEN_KEY).ok().flatten(),
                backend.get(AUTH_USER_KEY).ok().flatten(),
            );
            backend.set(AUTH_TOKEN_KEY, token)?;
            backend.set(AUTH_USER_KEY, &user_json).inspect_err(|_| {
                restore(backend.as_ref(), AUTH_TOKEN_KEY, previous.0.as_deref());
                restore(backend.as_ref(), AUTH_USER_KEY, previous.1.as_deref());
            })
        });

        if let Err(e) = &result {
            tracing::error!(error = %e, "failed to save auth session to storage");
        }
        result
    }

    /// Remove both session keys.
    ///
    /// # Errors
    ///
    /// Returns the first [`StorageError`] hit; the second key is still
    /// attempted.
    pub fn clear(&self) -> Result<(), StorageError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };

        let token = backend.remove(AUTH_TOKEN_KEY);
        let user = backend.remove(AUTH_USER_KEY);
        let result = token.and(user);
        if let Err(e) = &result {
            tracing::error!(error = %e, "failed to clear auth session storage");
        }
        result
    }

    /// Read the stored session, clearing storage if only part of it is there
    /// or the user record does not parse.
    #[must_use]
    pub fn load(&self) -> Option<Session> {
        let backend = self.backend.as_ref()?;

        let token = backend.get(AUTH_TOKEN_KEY);
        let user = backend.get(AUTH_USER_KEY);
        let (token, user_json) = match (token, user) {
            (Ok(Some(token)), Ok(Some(user))) => (token, user),
            (Ok(None), Ok(None)) => return None,
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "failed to read auth session from storage");
                let _ = self.clear();
                return None;
            }
            _ => {
                tracing::warn!("partial auth session in storage; clearing");
                let _ = self.clear();
                return None;
            }
        };

        match serde_json::from_str::<User>(&user_json) {
            Ok(user) => Some(Session { token, user }),
            Err(e) => {
                tracing::error!(error = %e, "stored auth user is corrupt; clearing");
                let _ = self.clear();
                None
            }
        }
    }

    /// The stored token, if any. Read failures are logged and read as `None`.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match backend.get(AUTH_TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read auth token from storage");
                None
            }
        }
    }
}

fn restore(backend: &dyn Storage, key: &str, previous: Option<&str>) {
    let result = match previous {
        Some(value) => backend.set(key, value),
        None => backend.remove(key),
    };
    if let Err(e) = result {
        tracing::error!(error = %e, key, "failed to restore previous auth session value");
    }
}
