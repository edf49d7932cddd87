//! Tracker engine that owns the configured services.
//!
//! The engine is built once per process and hands out trackers. Trackers
//! share the engine's remote service and event bus, so a single subscriber
//! sees the events of every order opened through the same engine.

pub mod event_bus;

use crate::state::{OrderProgressTracker, TrackerError};
use event_bus::EventBus;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracker_config::Config;
use tracker_remote::RemoteService;
use tracker_types::TrackerEvent;

/// Shared services behind every [`OrderProgressTracker`].
#[derive(Clone)]
pub struct TrackerEngine {
	/// Tracker configuration.
	config: Config,
	/// Tracking service front.
	remote: Arc<RemoteService>,
	/// Event bus shared with every tracker.
	event_bus: EventBus,
}

impl TrackerEngine {
	pub fn new(config: Config, remote: Arc<RemoteService>, event_bus: EventBus) -> Self {
		Self {
			config,
			remote,
			event_bus,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
		self.event_bus.subscribe()
	}

	/// Creates a tracker with no order selected.
	pub fn new_tracker(&self) -> OrderProgressTracker {
		OrderProgressTracker::new(
			self.remote.clone(),
			self.config.tracker.layout,
			self.event_bus.clone(),
		)
	}

	/// Creates a tracker and loads the tracking state of `order_id`.
	pub async fn open(&self, order_id: &str) -> Result<OrderProgressTracker, TrackerError> {
		tracing::debug!(tracker = %self.config.tracker.id, order_id = %order_id, "Opening order");
		let mut tracker = self.new_tracker();
		tracker.load(order_id).await?;
		Ok(tracker)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tracker_config::RetryConfig;
	use tracker_remote::implementations::memory::MemoryRemote;
	use tracker_types::{StageKey, StageLayout};

	const CONFIG: &str = r#"
[tracker]
id = "press-floor"
layout = "without_invoice"

[remote]
primary = "memory"

[remote.implementations.memory]
"#;

	#[tokio::test]
	async fn test_open_uses_configured_layout() {
		let config: Config = CONFIG.parse().unwrap();
		let remote = MemoryRemote::new();
		remote
			.seed("42", [("orderSlip", true), ("invoice", true)].into_iter().collect())
			.await;
		let engine = TrackerEngine::new(
			config,
			Arc::new(RemoteService::new(Arc::new(remote), RetryConfig::default())),
			EventBus::default(),
		);

		let tracker = engine.open("42").await.unwrap();

		assert_eq!(tracker.sequence().layout(), StageLayout::WithoutInvoice);
		assert_eq!(tracker.stages().len(), 8);
		// The invoice flag has no stage in this layout.
		assert_eq!(tracker.current_stage().map(|s| s.key), Some(StageKey::OrderSlip));
	}

	#[tokio::test]
	async fn test_trackers_share_event_bus() {
		let config: Config = CONFIG.parse().unwrap();
		let engine = TrackerEngine::new(
			config,
			Arc::new(RemoteService::new(
				Arc::new(MemoryRemote::new()),
				RetryConfig::default(),
			)),
			EventBus::default(),
		);
		let mut events = engine.subscribe();

		let mut first = engine.open("1").await.unwrap();
		engine.open("2").await.unwrap();
		first.next().await.unwrap();

		let order_ids: Vec<String> = std::iter::from_fn(|| events.try_recv().ok())
			.map(|event| event.order_id().to_string())
			.collect();
		assert_eq!(order_ids, vec!["1", "2", "1", "1"]);
	}
}
