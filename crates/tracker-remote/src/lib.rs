//! Remote tracking service client.
//!
//! The tracking service is an opaque collaborator that stores one tracking
//! record per order and exposes it through two operations: fetch the record
//! and replace it. This crate abstracts those operations behind
//! [`RemoteInterface`] and wraps the configured implementation in a
//! [`RemoteService`] that can retry uploads.

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracker_config::RetryConfig;
use tracker_types::{ConfigSchema, ImplementationRegistry, TrackingRecord};

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod memory;
}

/// Errors that can occur while talking to the tracking service.
#[derive(Debug, Error)]
pub enum RemoteError {
	/// The request never produced a response (connection, timeout, DNS).
	#[error("Network error: {0}")]
	Network(String),
	/// The service answered with a non-success status.
	#[error("Tracking service returned {status}: {message}")]
	Status { status: u16, message: String },
	/// The response body was not a tracking record.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The implementation was configured incorrectly.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl RemoteError {
	/// Whether repeating the same request may succeed.
	pub fn is_transient(&self) -> bool {
		match self {
			RemoteError::Network(_) => true,
			RemoteError::Status { status, .. } => *status >= 500 || *status == 429,
			RemoteError::Serialization(_) | RemoteError::Configuration(_) => false,
		}
	}
}

/// Operations offered by a tracking service.
#[async_trait]
pub trait RemoteInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Fetches the tracking record of an order.
	///
	/// An order the service has never seen yields an empty record.
	async fn fetch(&self, order_id: &str) -> Result<TrackingRecord, RemoteError>;

	/// Replaces the tracking record of an order.
	async fn push(&self, order_id: &str, record: &TrackingRecord) -> Result<(), RemoteError>;
}

/// Signature every remote implementation exposes to build itself from TOML.
pub type RemoteFactory = fn(&toml::Value) -> Result<Box<dyn RemoteInterface>, RemoteError>;

/// Registry trait for remote implementations.
pub trait RemoteRegistry: ImplementationRegistry<Factory = RemoteFactory> {}

/// Returns (name, factory) pairs for all available remote implementations.
pub fn get_all_implementations() -> Vec<(&'static str, RemoteFactory)> {
	use implementations::{http, memory};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Front for the configured tracking service implementation.
///
/// Uploads replace the full record for an order, which makes them safe to
/// repeat; when retry is enabled, transient upload failures are retried with
/// exponential backoff. Fetches are never retried.
pub struct RemoteService {
	implementation: Arc<dyn RemoteInterface>,
	retry: RetryConfig,
}

impl RemoteService {
	pub fn new(implementation: Arc<dyn RemoteInterface>, retry: RetryConfig) -> Self {
		Self {
			implementation,
			retry,
		}
	}

	pub async fn fetch(&self, order_id: &str) -> Result<TrackingRecord, RemoteError> {
		self.implementation.fetch(order_id).await
	}

	pub async fn push(&self, order_id: &str, record: &TrackingRecord) -> Result<(), RemoteError> {
		if !self.retry.enabled {
			return self.implementation.push(order_id, record).await;
		}

		let policy = ExponentialBackoffBuilder::new()
			.with_initial_interval(Duration::from_millis(self.retry.initial_interval_ms))
			.with_max_interval(Duration::from_millis(self.retry.max_interval_ms))
			.with_max_elapsed_time(Some(Duration::from_secs(self.retry.max_elapsed_seconds)))
			.build();

		let implementation = Arc::clone(&self.implementation);
		backoff::future::retry_notify(
			policy,
			|| {
				let implementation = Arc::clone(&implementation);
				async move {
					implementation.push(order_id, record).await.map_err(|e| {
						if e.is_transient() {
							backoff::Error::transient(e)
						} else {
							backoff::Error::permanent(e)
						}
					})
				}
			},
			|err: RemoteError, wait: Duration| {
				tracing::warn!(
					order_id = %order_id,
					"Tracking upload failed, retrying in {:?}: {}",
					wait,
					err
				);
			},
		)
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	/// Fails the first `failures` pushes with the given status.
	struct FlakyRemote {
		failures: usize,
		status: u16,
		attempts: AtomicUsize,
	}

	#[async_trait]
	impl RemoteInterface for FlakyRemote {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(implementations::memory::MemoryRemoteSchema)
		}

		async fn fetch(&self, _order_id: &str) -> Result<TrackingRecord, RemoteError> {
			Ok(TrackingRecord::new())
		}

		async fn push(&self, _order_id: &str, _record: &TrackingRecord) -> Result<(), RemoteError> {
			let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
			if attempt < self.failures {
				return Err(RemoteError::Status {
					status: self.status,
					message: "unavailable".into(),
				});
			}
			Ok(())
		}
	}

	fn fast_retry() -> RetryConfig {
		RetryConfig {
			enabled: true,
			initial_interval_ms: 1,
			max_interval_ms: 5,
			max_elapsed_seconds: 5,
		}
	}

	#[tokio::test]
	async fn test_push_retries_transient_failures() {
		let remote = Arc::new(FlakyRemote {
			failures: 2,
			status: 503,
			attempts: AtomicUsize::new(0),
		});
		let service = RemoteService::new(remote.clone(), fast_retry());

		service.push("1", &TrackingRecord::new()).await.unwrap();

		assert_eq!(remote.attempts.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn test_push_does_not_retry_client_errors() {
		let remote = Arc::new(FlakyRemote {
			failures: 5,
			status: 400,
			attempts: AtomicUsize::new(0),
		});
		let service = RemoteService::new(remote.clone(), fast_retry());

		let err = service.push("1", &TrackingRecord::new()).await.unwrap_err();

		assert!(matches!(err, RemoteError::Status { status: 400, .. }));
		assert_eq!(remote.attempts.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_push_without_retry_fails_once() {
		let remote = Arc::new(FlakyRemote {
			failures: 1,
			status: 503,
			attempts: AtomicUsize::new(0),
		});
		let service = RemoteService::new(remote.clone(), RetryConfig::default());

		assert!(service.push("1", &TrackingRecord::new()).await.is_err());
		assert_eq!(remote.attempts.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn test_transient_classification() {
		assert!(RemoteError::Network("reset".into()).is_transient());
		assert!(RemoteError::Status { status: 502, message: String::new() }.is_transient());
		assert!(RemoteError::Status { status: 429, message: String::new() }.is_transient());
		assert!(!RemoteError::Status { status: 404, message: String::new() }.is_transient());
		assert!(!RemoteError::Serialization("bad".into()).is_transient());
	}
}
