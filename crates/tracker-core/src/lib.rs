//! Core tracking engine for the order production tracker.
//!
//! Ties the stage sequence state machine to the configured tracking service.
//! [`TrackerBuilder`] assembles a [`TrackerEngine`] from configuration and
//! factory functions; the engine hands out one [`OrderProgressTracker`] per
//! order being viewed.

pub mod builder;
pub mod engine;
pub mod state;

pub use builder::{BuilderError, TrackerBuilder, TrackerFactories};
pub use engine::{event_bus::EventBus, TrackerEngine};
pub use state::{OrderProgressTracker, TrackerError};
