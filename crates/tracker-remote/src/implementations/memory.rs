//! In-process tracking service.
//!
//! Keeps records in a map; used in tests and when the CLI runs without a
//! tracking backend. Clones share the same map.

use crate::{RemoteError, RemoteFactory, RemoteInterface, RemoteRegistry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracker_types::{ConfigSchema, ImplementationRegistry, Schema, TrackingRecord, ValidationError};

/// Tracking service backed by a shared in-memory map.
#[derive(Clone, Default)]
pub struct MemoryRemote {
	records: Arc<RwLock<HashMap<String, TrackingRecord>>>,
}

impl MemoryRemote {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores a record directly, bypassing the tracker.
	pub async fn seed(&self, order_id: &str, record: TrackingRecord) {
		self.records
			.write()
			.await
			.insert(order_id.to_string(), record);
	}

	/// Returns the stored record, `None` when nothing was ever pushed.
	pub async fn record(&self, order_id: &str) -> Option<TrackingRecord> {
		self.records.read().await.get(order_id).cloned()
	}
}

#[async_trait]
impl RemoteInterface for MemoryRemote {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryRemoteSchema)
	}

	async fn fetch(&self, order_id: &str) -> Result<TrackingRecord, RemoteError> {
		Ok(self.record(order_id).await.unwrap_or_default())
	}

	async fn push(&self, order_id: &str, record: &TrackingRecord) -> Result<(), RemoteError> {
		self.seed(order_id, record.clone()).await;
		Ok(())
	}
}

/// Configuration schema for MemoryRemote. No fields.
pub struct MemoryRemoteSchema;

impl ConfigSchema for MemoryRemoteSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create an in-memory remote.
pub fn create_remote(config: &toml::Value) -> Result<Box<dyn RemoteInterface>, RemoteError> {
	MemoryRemoteSchema
		.validate(config)
		.map_err(|e| RemoteError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryRemote::new()))
}

/// Registry for the memory remote implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = RemoteFactory;

	fn factory() -> Self::Factory {
		create_remote
	}
}

impl RemoteRegistry for Registry {}
