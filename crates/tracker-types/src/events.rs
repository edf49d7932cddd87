//! Event types published by the order tracker.
//!
//! Each tracker operation reports what happened through these events so that
//! front ends can show notifications without inspecting tracker internals.

use crate::{TrackingRecord, Transition};
use serde::{Deserialize, Serialize};

/// Events emitted while tracking an order's production progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackerEvent {
	/// Tracking state was fetched and applied.
	Loaded {
		order_id: String,
		record: TrackingRecord,
	},
	/// Fetching tracking state failed; local state was kept.
	LoadFailed { order_id: String, error: String },
	/// The stage frontier moved locally.
	Transitioned {
		order_id: String,
		transition: Transition,
	},
	/// The full flag set was accepted by the tracking service.
	Saved {
		order_id: String,
		record: TrackingRecord,
	},
	/// Uploading the flag set failed; local flags were not rolled back.
	SaveFailed { order_id: String, error: String },
}

impl TrackerEvent {
	/// The order the event refers to.
	pub fn order_id(&self) -> &str {
		match self {
			TrackerEvent::Loaded { order_id, .. }
			| TrackerEvent::LoadFailed { order_id, .. }
			| TrackerEvent::Transitioned { order_id, .. }
			| TrackerEvent::Saved { order_id, .. }
			| TrackerEvent::SaveFailed { order_id, .. } => order_id,
		}
	}
}
