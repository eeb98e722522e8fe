//! Auth-session authority for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! One `AuthService` per composition root, shared as `Arc<AuthService>`. It is
//! the only writer of the current user and of the persisted session; UI code
//! reads through the query methods or a [`Subscription`].
//!
//! DESIGN
//! ======
//! Two states: Anonymous (`user == None`) and Authenticated. Every transition
//! updates memory and storage under one lock, then notifies listeners with the
//! lock released. Mutating calls are tagged by a [`RequestSequencer`]; a
//! response whose tag is older than the last committed one is dropped, so the
//! most recently issued call decides the final state.
//!
//! ERROR HANDLING
//! ==============
//! Network, parse, and storage failures never escape as `Err`: login/register
//! return an [`AuthOutcome`], refresh/check-auth demote to Anonymous. Only
//! [`AuthService::require_auth`] returns an error, for guards to propagate.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::listeners::{Listeners, Subscription};
use super::sequence::{CommitGate, RequestSequencer};
use crate::config::{ClientConfig, ConfigError};
use crate::net::api::ApiClient;
use crate::net::types::{
    AuthResponse, AuthUser, LoginCredentials, MeResponse, RegisterCredentials, User,
};
use crate::storage::session::SessionStore;
use crate::util::auth::{AuthRequired, token_expiry};

pub const SUPERSEDED_MESSAGE: &str = "Superseded by a newer authentication request";

// =============================================================================
// OUTCOMES
// =============================================================================

/// Result of `login`/`register`, shaped for direct display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthOutcome {
    pub success: bool,
    /// User-facing error message when `success` is false.
    pub error: Option<String>,
    /// The session is active in memory but could not be written to storage.
    pub persistence_degraded: bool,
}

impl AuthOutcome {
    fn succeeded(persistence_degraded: bool) -> Self {
        Self { success: true, error: None, persistence_degraded }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self { success: false, error: Some(message.into()), persistence_degraded: false }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogoutOutcome {
    /// The server accepted the invalidation call.
    pub server_acknowledged: bool,
    /// Local state was cleared. False only when a newer call already committed.
    pub cleared: bool,
    /// Stored session keys could not be removed.
    pub persistence_degraded: bool,
}

/// Plain snapshot a UI layer keeps and re-renders from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    /// True until the first `check_auth` settles.
    pub loading: bool,
}

impl AuthState {
    #[must_use]
    pub fn loading() -> Self {
        Self { user: None, loading: true }
    }

    #[must_use]
    pub fn settled(user: Option<AuthUser>) -> Self {
        Self { user, loading: false }
    }
}

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Default)]
struct Inner {
    user: Option<AuthUser>,
    gate: CommitGate,
}

pub struct AuthService {
    api: ApiClient,
    store: SessionStore,
    inner: Mutex<Inner>,
    listeners: Listeners<AuthUser>,
    sequencer: RequestSequencer,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("api", &self.api)
            .field("authenticated", &self.is_authenticated())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl AuthService {
    /// Build the service around `api`, restoring any session found in the
    /// client's store. No network call is made and token freshness is not
    /// checked; see [`AuthService::stored_token_expired`].
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let store = api.store().clone();
        let user = store.load().map(|session| {
            if is_expired_jwt(&session.token) {
                tracing::warn!(
                    user_id = %session.user.id,
                    "restored session token has expired; keeping it until the server rejects it"
                );
            }
            AuthUser::authenticated(session.user)
        });
        if let Some(user) = &user {
            tracing::debug!(user_id = %user.id, "restored auth session from storage");
        }

        Self {
            api,
            store,
            inner: Mutex::new(Inner { user, gate: CommitGate::default() }),
            listeners: Listeners::new(),
            sequencer: RequestSequencer::new(),
        }
    }

    /// Convenience constructor for composition roots.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig, store: SessionStore) -> Result<Self, ConfigError> {
        Ok(Self::new(ApiClient::new(config, store)?))
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // -------------------------------------------------------------------------
    // mutating operations
    // -------------------------------------------------------------------------

    pub async fn login(&self, credentials: &LoginCredentials) -> AuthOutcome {
        let tag = self.sequencer.issue();
        match self.api.post::<AuthResponse, _>("/auth/login", credentials).await {
            Ok(response) => self.establish(tag, response, "login"),
            Err(e) => {
                tracing::warn!(status = e.status, error = %e, "login failed");
                self.complete(tag);
                AuthOutcome::failed(e.message)
            }
        }
    }

    pub async fn register(&self, credentials: &RegisterCredentials) -> AuthOutcome {
        let tag = self.sequencer.issue();
        match self.api.post::<AuthResponse, _>("/auth/register", credentials).await {
            Ok(response) => self.establish(tag, response, "register"),
            Err(e) => {
                tracing::warn!(status = e.status, error = %e, "registration failed");
                self.complete(tag);
                AuthOutcome::failed(e.message)
            }
        }
    }

    /// Invalidate the session server-side (best effort) and always clear it
    /// locally, unless a newer call has already committed.
    pub async fn logout(&self) -> LogoutOutcome {
        let tag = self.sequencer.issue();
        self.logout_tagged(tag).await
    }

    /// Exchange the current session for a fresh one. Failure logs out.
    pub async fn refresh_token(&self) -> bool {
        let tag = self.sequencer.issue();
        match self.api.post_empty::<AuthResponse>("/auth/refresh").await {
            Ok(response) => self.establish(tag, response, "refresh").success,
            Err(e) => {
                if self.is_stale(tag) {
                    tracing::debug!(tag, "refresh failure ignored; superseded");
                    return false;
                }
                tracing::warn!(status = e.status, error = %e, "token refresh failed; logging out");
                self.logout_tagged(tag).await;
                false
            }
        }
    }

    /// Revalidate the stored token against `/auth/me`.
    ///
    /// Returns `None` without a request when no token is stored. A rejected or
    /// failed check logs out.
    pub async fn check_auth(&self) -> Option<AuthUser> {
        self.store.token()?;
        let tag = self.sequencer.issue();

        match self.api.get::<MeResponse>("/auth/me", &[]).await {
            Ok(MeResponse { user }) => {
                let auth_user = AuthUser::authenticated(user);
                if self.commit_user(tag, &auth_user).is_none() {
                    tracing::debug!(tag, "auth check result dropped; superseded");
                    return self.current_user();
                }
                self.notify();
                Some(auth_user)
            }
            Err(e) => {
                if self.is_stale(tag) {
                    tracing::debug!(tag, "auth check failure ignored; superseded");
                    return self.current_user();
                }
                tracing::warn!(status = e.status, error = %e, "auth check failed; logging out");
                self.logout_tagged(tag).await;
                None
            }
        }
    }

    // -------------------------------------------------------------------------
    // queries
    // -------------------------------------------------------------------------

    /// Register `listener` for every state transition.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&AuthUser>) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    #[must_use]
    pub fn current_user(&self) -> Option<AuthUser> {
        self.lock().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().user.as_ref().is_some_and(|u| u.is_authenticated)
    }

    /// The stored bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.store.token()
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        AuthState::settled(self.current_user())
    }

    /// Whether the stored token is a JWT whose `exp` has passed. Opaque tokens
    /// report `false`.
    #[must_use]
    pub fn stored_token_expired(&self) -> bool {
        self.store.token().is_some_and(|token| is_expired_jwt(&token))
    }

    /// Role check hook. Currently any authenticated user passes.
    #[must_use]
    pub fn has_role(&self, _role: &str) -> bool {
        self.is_authenticated()
    }

    /// Resource check hook. Currently any authenticated user passes.
    #[must_use]
    pub fn can_access_resource(&self, _resource_id: &str) -> bool {
        self.is_authenticated()
    }

    /// # Errors
    ///
    /// Returns [`AuthRequired`] while anonymous.
    pub fn require_auth(&self) -> Result<AuthUser, AuthRequired> {
        self.current_user()
            .filter(|u| u.is_authenticated)
            .ok_or(AuthRequired)
    }

    // -------------------------------------------------------------------------
    // transitions
    // -------------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_stale(&self, tag: u64) -> bool {
        self.lock().gate.is_stale(tag)
    }

    /// A call ended without a transition; older calls may no longer commit.
    fn complete(&self, tag: u64) {
        self.lock().gate.complete(tag);
    }

    fn establish(&self, tag: u64, response: AuthResponse, op: &'static str) -> AuthOutcome {
        let AuthResponse { user, token } = response;
        let user_id = user.id.clone();
        let Some(degraded) = self.commit_session(tag, user, &token) else {
            tracing::debug!(tag, op, "auth response dropped; superseded");
            return AuthOutcome::failed(SUPERSEDED_MESSAGE);
        };
        tracing::info!(%user_id, op, "authenticated");
        self.notify();
        AuthOutcome::succeeded(degraded)
    }

    async fn logout_tagged(&self, tag: u64) -> LogoutOutcome {
        let response = self.api.post_empty::<serde_json::Value>("/auth/logout").await;
        let server_acknowledged = match response {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    status = e.status,
                    error = %e,
                    "logout call failed; clearing local session anyway"
                );
                false
            }
        };

        match self.commit_anonymous(tag) {
            Some(persistence_degraded) => {
                self.notify();
                LogoutOutcome { server_acknowledged, cleared: true, persistence_degraded }
            }
            None => {
                tracing::debug!(tag, "logout dropped; superseded");
                LogoutOutcome { server_acknowledged, cleared: false, persistence_degraded: false }
            }
        }
    }

    /// Returns `Some(persistence_degraded)` when committed.
    fn commit_session(&self, tag: u64, user: User, token: &str) -> Option<bool> {
        let mut inner = self.lock();
        if !inner.gate.admit(tag) {
            return None;
        }
        let degraded = self.store.save(&user, token).is_err();
        inner.user = Some(AuthUser::authenticated(user));
        Some(degraded)
    }

    fn commit_user(&self, tag: u64, user: &AuthUser) -> Option<bool> {
        let mut inner = self.lock();
        if !inner.gate.admit(tag) {
            return None;
        }
        let degraded = match self.store.token() {
            Some(token) => self.store.save(&user.user, &token).is_err(),
            None => false,
        };
        inner.user = Some(user.clone());
        Some(degraded)
    }

    fn commit_anonymous(&self, tag: u64) -> Option<bool> {
        let mut inner = self.lock();
        if !inner.gate.admit(tag) {
            return None;
        }
        let degraded = self.store.clear().is_err();
        inner.user = None;
        Some(degraded)
    }

    /// Deliver the state as of now, not as of the commit, so the last
    /// notification any listener sees always matches `current_user()`.
    fn notify(&self) {
        let user = self.current_user();
        self.listeners.notify(user.as_ref());
    }
}

fn is_expired_jwt(token: &str) -> bool {
    token_expiry(token).is_some_and(|exp| exp < chrono::Utc::now().timestamp())
}
