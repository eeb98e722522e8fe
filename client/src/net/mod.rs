//! Networking modules for the REST backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` is the transport every call goes through, `error` the single error
//! shape it produces, `polls` the typed poll/vote endpoints, and `types` the
//! shared wire schema.

pub mod api;
pub mod error;
pub mod polls;
pub mod types;
