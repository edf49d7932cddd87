//! Builder pattern for constructing tracker engines.
//!
//! Composes a TrackerEngine from the configured remote implementation using
//! factory functions, so binaries decide which implementations are linked in.

use crate::engine::{event_bus::EventBus, TrackerEngine};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracker_config::Config;
use tracker_remote::{RemoteError, RemoteInterface, RemoteService};
use tracker_types::ConfigSchema;

/// Errors that can occur during tracker engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions available to the builder, keyed by implementation name.
pub struct TrackerFactories<RF> {
	pub remote_factories: HashMap<String, RF>,
}

/// Builder for constructing a TrackerEngine with pluggable implementations.
pub struct TrackerBuilder {
	config: Config,
	event_capacity: usize,
}

impl TrackerBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			event_capacity: 64,
		}
	}

	/// Overrides the event bus capacity. Must be at least 1.
	pub fn with_event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;
		self
	}

	/// Builds the engine, instantiating only the primary remote.
	pub fn build<RF>(self, factories: TrackerFactories<RF>) -> Result<TrackerEngine, BuilderError>
	where
		RF: Fn(&toml::Value) -> Result<Box<dyn RemoteInterface>, RemoteError>,
	{
		if self.event_capacity == 0 {
			return Err(BuilderError::Config(
				"Event bus capacity must be greater than 0".into(),
			));
		}

		let primary = self.config.remote.primary.as_str();
		let remote_config = self.config.remote.implementations.get(primary).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary remote '{}' has no configuration",
				primary
			))
		})?;
		let factory = factories
			.remote_factories
			.get(primary)
			.ok_or_else(|| BuilderError::MissingComponent(format!("remote '{}'", primary)))?;

		let implementation = match factory(remote_config) {
			Ok(implementation) => {
				implementation
					.config_schema()
					.validate(remote_config)
					.map_err(|e| {
						BuilderError::Config(format!(
							"Invalid configuration for remote '{}': {}",
							primary, e
						))
					})?;
				tracing::info!(component = "remote", implementation = %primary, "Loaded");
				implementation
			},
			Err(e) => {
				tracing::error!(
					component = "remote",
					implementation = %primary,
					error = %e,
					"Failed to create remote implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create remote implementation '{}': {}",
					primary, e
				)));
			},
		};

		let remote = Arc::new(RemoteService::new(
			Arc::from(implementation),
			self.config.remote.retry.clone(),
		));

		Ok(TrackerEngine::new(
			self.config,
			remote,
			EventBus::new(self.event_capacity),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tracker_remote::implementations::http::{HttpRemote, HttpRemoteConfig};
	use tracker_remote::RemoteFactory;

	const MEMORY_CONFIG: &str = r#"
[tracker]
id = "press-floor"

[remote]
primary = "memory"

[remote.implementations.memory]
"#;

	fn factories() -> TrackerFactories<RemoteFactory> {
		TrackerFactories {
			remote_factories: tracker_remote::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	#[tokio::test]
	async fn test_build_with_memory_remote() {
		let config: Config = r#"
[tracker]
id = "press-floor"

[remote]
primary = "memory"

[remote.implementations.memory]
"#
		.parse()
		.unwrap();

		let engine = TrackerBuilder::new(config).build(factories()).unwrap();
		let mut tracker = engine.open("1").await.unwrap();
		tracker.next().await.unwrap();

		assert!((tracker.progress_percent() - 100.0 / 9.0).abs() < 1e-9);
	}

	#[test]
	fn test_missing_factory() {
		let config: Config = r#"
[tracker]
id = "press-floor"

[remote]
primary = "memory"

[remote.implementations.memory]
"#
		.parse()
		.unwrap();

		let empty = TrackerFactories::<RemoteFactory> {
			remote_factories: HashMap::new(),
		};
		assert!(matches!(
			TrackerBuilder::new(config).build(empty),
			Err(BuilderError::MissingComponent(_))
		));
	}

	#[test]
	fn test_invalid_remote_config() {
		let config: Config = r#"
[tracker]
id = "press-floor"

[remote]
primary = "http"

[remote.implementations.http]
base_url = "not-a-url"
"#
		.parse()
		.unwrap();

		assert!(matches!(
			TrackerBuilder::new(config).build(factories()),
			Err(BuilderError::Config(_))
		));
	}

	#[test]
	fn test_zero_event_capacity_rejected() {
		let config: Config = MEMORY_CONFIG.parse().unwrap();

		let result = TrackerBuilder::new(config)
			.with_event_capacity(0)
			.build(factories());

		assert!(matches!(result, Err(BuilderError::Config(ref msg)) if msg.contains("capacity")));
	}

	/// Builds an HTTP remote without looking at its configuration table.
	fn unchecked_http_remote(_config: &toml::Value) -> Result<Box<dyn RemoteInterface>, RemoteError> {
		Ok(Box::new(HttpRemote::new(HttpRemoteConfig {
			base_url: "http://127.0.0.1:1".into(),
			timeout_seconds: 5,
			update_method: Default::default(),
			access_token: None,
		})?))
	}

	#[test]
	fn test_implementation_schema_is_checked() {
		let config: Config = r#"
[tracker]
id = "press-floor"

[remote]
primary = "unchecked"

[remote.implementations.unchecked]
timeout_seconds = 5
"#
		.parse()
		.unwrap();

		let mut remote_factories: HashMap<String, RemoteFactory> = HashMap::new();
		remote_factories.insert("unchecked".into(), unchecked_http_remote);

		let result = TrackerBuilder::new(config).build(TrackerFactories { remote_factories });

		assert!(
			matches!(result, Err(BuilderError::Config(ref msg)) if msg.contains("base_url")),
			"schema of the created remote must reject a table without base_url"
		);
	}
}
