//! Production progress tracker for a single order.
//!
//! Wraps a [`StageSequence`] with the remote tracking service: `load` pulls
//! the stored record, `next`/`back` move the frontier by one stage and upload
//! the result. Uploads are optimistic; a failed upload leaves the local flags
//! advanced until the next successful load or save.

use crate::engine::event_bus::EventBus;
use std::sync::Arc;
use thiserror::Error;
use tracker_remote::{RemoteError, RemoteService};
use tracker_types::{Stage, StageLayout, StageSequence, TrackerEvent, Transition};

/// Errors reported by tracker operations.
///
/// Both are recoverable: the tracker stays usable and a later `load` brings
/// it back in sync with the service.
#[derive(Debug, Error)]
pub enum TrackerError {
	#[error("Failed to load tracking for order {order_id}: {source}")]
	Fetch {
		order_id: String,
		#[source]
		source: RemoteError,
	},
	#[error("Failed to save tracking for order {order_id}: {source}")]
	Persist {
		order_id: String,
		#[source]
		source: RemoteError,
	},
}

/// Tracks one order's position in the production stage sequence.
pub struct OrderProgressTracker {
	stages: StageSequence,
	current_order_id: Option<String>,
	remote: Arc<RemoteService>,
	event_bus: EventBus,
}

impl OrderProgressTracker {
	/// Creates a tracker with every stage inactive and no order selected.
	pub fn new(remote: Arc<RemoteService>, layout: StageLayout, event_bus: EventBus) -> Self {
		Self {
			stages: StageSequence::new(layout),
			current_order_id: None,
			remote,
			event_bus,
		}
	}

	pub fn order_id(&self) -> Option<&str> {
		self.current_order_id.as_deref()
	}

	pub fn sequence(&self) -> &StageSequence {
		&self.stages
	}

	pub fn stages(&self) -> &[Stage] {
		self.stages.stages()
	}

	pub fn progress_percent(&self) -> f64 {
		self.stages.progress_percent()
	}

	pub fn current_stage(&self) -> Option<&Stage> {
		self.stages.current_stage()
	}

	pub fn is_current(&self, index: usize) -> bool {
		self.stages.is_current(index)
	}

	/// Replaces the local flags with the service's record for `order_id`.
	///
	/// An empty id is ignored. On failure neither the flags nor the selected
	/// order change, so a following `next` cannot write one order's progress
	/// under another order's id.
	pub async fn load(&mut self, order_id: &str) -> Result<(), TrackerError> {
		if order_id.trim().is_empty() {
			tracing::warn!("Ignoring tracking load without an order id");
			return Ok(());
		}

		match self.remote.fetch(order_id).await {
			Ok(record) => {
				self.stages.apply_record(&record);
				self.current_order_id = Some(order_id.to_string());
				if !self.stages.is_prefix_closed() {
					tracing::warn!(
						order_id = %order_id,
						"Tracking record has gaps; the next transition will close them"
					);
				}
				tracing::info!(
					order_id = %order_id,
					"Loaded tracking at {:.1}%",
					self.stages.progress_percent()
				);
				self.event_bus.publish(TrackerEvent::Loaded {
					order_id: order_id.to_string(),
					record,
				});
				Ok(())
			},
			Err(source) => {
				tracing::warn!(order_id = %order_id, "Error fetching tracking data: {}", source);
				self.event_bus.publish(TrackerEvent::LoadFailed {
					order_id: order_id.to_string(),
					error: source.to_string(),
				});
				Err(TrackerError::Fetch {
					order_id: order_id.to_string(),
					source,
				})
			},
		}
	}

	/// Marks the next stage as reached and uploads the result.
	pub async fn next(&mut self) -> Result<Transition, TrackerError> {
		self.step(StageSequence::advance).await
	}

	/// Steps back one stage and uploads the result.
	pub async fn back(&mut self) -> Result<Transition, TrackerError> {
		self.step(StageSequence::retreat).await
	}

	async fn step(
		&mut self,
		transition: fn(&mut StageSequence) -> Transition,
	) -> Result<Transition, TrackerError> {
		let Some(order_id) = self.current_order_id.clone() else {
			tracing::debug!("No order selected; transition ignored");
			return Ok(Transition::Unchanged);
		};

		let outcome = transition(&mut self.stages);
		if !outcome.is_changed() {
			return Ok(outcome);
		}

		tracing::debug!(order_id = %order_id, "{:?}", outcome);
		self.event_bus.publish(TrackerEvent::Transitioned {
			order_id,
			transition: outcome,
		});

		self.save().await?;
		Ok(outcome)
	}

	/// Uploads the full flag set for the selected order.
	///
	/// Local flags are kept as they are when the upload fails.
	pub async fn save(&self) -> Result<(), TrackerError> {
		let Some(order_id) = self.current_order_id.as_deref() else {
			return Ok(());
		};

		let record = self.stages.to_record();
		match self.remote.push(order_id, &record).await {
			Ok(()) => {
				tracing::info!(order_id = %order_id, "Tracking updated successfully");
				self.event_bus.publish(TrackerEvent::Saved {
					order_id: order_id.to_string(),
					record,
				});
				Ok(())
			},
			Err(source) => {
				tracing::warn!(order_id = %order_id, "Failed to update tracking: {}", source);
				self.event_bus.publish(TrackerEvent::SaveFailed {
					order_id: order_id.to_string(),
					error: source.to_string(),
				});
				Err(TrackerError::Persist {
					order_id: order_id.to_string(),
					source,
				})
			},
		}
	}
}
