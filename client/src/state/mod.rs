//! Client-side state authorities.
//!
//! SYSTEM CONTEXT
//! ==============
//! `auth` owns the current user and session. `listeners` and `sequence` are
//! the notification and response-ordering building blocks it is made of.

pub mod auth;
pub mod listeners;
pub mod sequence;
