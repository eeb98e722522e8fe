//! Helpers shared by route components and privileged call sites.

pub mod auth;
