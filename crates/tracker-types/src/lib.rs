//! Common types module for the order tracking system.
//!
//! This module defines the data types shared by every tracking component:
//! the production stage table, the stage sequence state machine, the wire
//! record exchanged with the tracking service, events, and the
//! configuration validation framework.

/// API types for HTTP endpoints and error responses.
pub mod api;
/// Event types published by the tracker.
pub mod events;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Production stage keys and stage layouts.
pub mod stage;
/// Storage namespaces used by the tracking service.
pub mod storage;
/// Stage sequence state machine and the remote tracking record.
pub mod tracking;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use events::*;
pub use registry::ImplementationRegistry;
pub use stage::*;
pub use storage::*;
pub use tracking::*;
pub use validation::*;
