//! State management for order production tracking.
//!
//! Exposes the per-order tracker that keeps the local stage flags and the
//! tracking service in step.

pub mod progress;

pub use progress::{OrderProgressTracker, TrackerError};
