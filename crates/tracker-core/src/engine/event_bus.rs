//! Broadcast channel for tracker events.

use tokio::sync::broadcast;
use tracker_types::TrackerEvent;

/// Fan-out of [`TrackerEvent`]s to any number of subscribers.
///
/// Publishing never blocks; subscribers that fall behind by more than the
/// channel capacity miss the oldest events.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<TrackerEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event. Having no subscribers is not an error.
	pub fn publish(&self, event: TrackerEvent) {
		if self.sender.send(event).is_err() {
			tracing::trace!("Tracker event dropped: no subscribers");
		}
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(64)
	}
}
