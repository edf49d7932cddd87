//! Handlers behind the HTTP routes.

pub mod tracking;
