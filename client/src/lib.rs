//! Polly client library: HTTP API access, durable sessions, and auth state.
//!
//! ARCHITECTURE
//! ============
//! `net` talks to the REST backend, `storage` persists the session token and
//! user record, `state` owns the current-user authority that UI layers
//! subscribe to, and `util` holds route-guard helpers built on top of it.
//!
//! Nothing here is a global. A composition root builds one
//! [`state::auth::AuthService`] and hands an `Arc` of it to whoever needs it.

pub mod config;
pub mod net;
pub mod state;
pub mod storage;
pub mod util;

pub use config::ClientConfig;
pub use net::api::{ApiClient, RequestConfig};
pub use net::error::ApiError;
pub use net::polls::PollsApi;
pub use state::auth::{AuthOutcome, AuthService, LogoutOutcome};
pub use state::listeners::Subscription;
pub use storage::session::SessionStore;
pub use util::auth::AuthRequired;
