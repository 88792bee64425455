//! User-account management service: registration, lookup, replace and
//! delete of user records behind role-based access control.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod users;
