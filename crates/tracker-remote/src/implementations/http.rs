//! HTTP client for the tracking service.
//!
//! Talks to `GET {base_url}/projectTracking/{order_id}` and uploads the full
//! record to the same path. The upload verb defaults to POST; PUT is
//! available because some deployments of the ERP backend expose the upload
//! under PUT.

use crate::{RemoteError, RemoteFactory, RemoteInterface, RemoteRegistry};
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use std::time::Duration;
use tracker_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, TrackingRecord,
	ValidationError,
};

const TRACKING_PATH: &str = "projectTracking";

/// HTTP verb used to upload a tracking record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMethod {
	#[default]
	Post,
	Put,
}

impl From<UpdateMethod> for Method {
	fn from(method: UpdateMethod) -> Self {
		match method {
			UpdateMethod::Post => Method::POST,
			UpdateMethod::Put => Method::PUT,
		}
	}
}

/// Configuration accepted by [`HttpRemote`].
#[derive(Debug, Clone, Deserialize)]
pub struct HttpRemoteConfig {
	/// Root URL of the tracking service.
	pub base_url: String,
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
	#[serde(default)]
	pub update_method: UpdateMethod,
	/// Bearer token sent in the Authorization header.
	#[serde(default)]
	pub access_token: Option<String>,
}

fn default_timeout_seconds() -> u64 {
	30
}

/// Tracking service reached over HTTP.
pub struct HttpRemote {
	client: Client,
	base_url: Url,
	update_method: UpdateMethod,
	access_token: Option<String>,
}

impl HttpRemote {
	pub fn new(config: HttpRemoteConfig) -> Result<Self, RemoteError> {
		let base_url = Url::parse(&config.base_url).map_err(|e| {
			RemoteError::Configuration(format!("Invalid base_url '{}': {}", config.base_url, e))
		})?;
		if base_url.cannot_be_a_base() {
			return Err(RemoteError::Configuration(format!(
				"base_url '{}' cannot be used as a base",
				config.base_url
			)));
		}

		let client = Client::builder()
			.timeout(Duration::from_secs(config.timeout_seconds))
			.pool_idle_timeout(Duration::from_secs(90))
			.build()
			.map_err(|e| RemoteError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			base_url,
			update_method: config.update_method,
			access_token: config.access_token,
		})
	}

	/// Builds `{base_url}/projectTracking/{order_id}` with the id percent-encoded.
	fn tracking_url(&self, order_id: &str) -> Result<Url, RemoteError> {
		let mut url = self.base_url.clone();
		url.path_segments_mut()
			.map_err(|_| RemoteError::Configuration("base_url cannot be a base".into()))?
			.pop_if_empty()
			.push(TRACKING_PATH)
			.push(order_id);
		Ok(url)
	}

	fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
		let builder = self.client.request(method, url);
		match &self.access_token {
			Some(token) => builder.bearer_auth(token),
			None => builder,
		}
	}
}

/// Maps a non-success response to [`RemoteError::Status`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}

	let message = response.text().await.unwrap_or_default();
	Err(RemoteError::Status {
		status: status.as_u16(),
		message,
	})
}

fn network_error(err: reqwest::Error) -> RemoteError {
	RemoteError::Network(err.to_string())
}

#[async_trait]
impl RemoteInterface for HttpRemote {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpRemoteSchema)
	}

	async fn fetch(&self, order_id: &str) -> Result<TrackingRecord, RemoteError> {
		let url = self.tracking_url(order_id)?;
		tracing::debug!("GET {}", url);

		let response = self
			.request(Method::GET, url)
			.send()
			.await
			.map_err(network_error)?;
		let response = check_status(response).await?;

		let body = response.bytes().await.map_err(network_error)?;
		// Some backends answer an unknown order with an empty body or `null`.
		if body.iter().all(u8::is_ascii_whitespace) {
			return Ok(TrackingRecord::new());
		}
		let record: Option<TrackingRecord> = serde_json::from_slice(&body)
			.map_err(|e| RemoteError::Serialization(e.to_string()))?;
		Ok(record.unwrap_or_default())
	}

	async fn push(&self, order_id: &str, record: &TrackingRecord) -> Result<(), RemoteError> {
		let url = self.tracking_url(order_id)?;
		let method = Method::from(self.update_method);
		tracing::debug!("{} {}", method, url);

		let response = self
			.request(method, url)
			.json(record)
			.send()
			.await
			.map_err(network_error)?;
		check_status(response).await?;
		Ok(())
	}
}

/// Configuration schema for HttpRemote.
pub struct HttpRemoteSchema;

impl ConfigSchema for HttpRemoteSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new("base_url", FieldType::String).with_validator(|value| {
				let url = value.as_str().unwrap_or_default();
				if url.starts_with("http://") || url.starts_with("https://") {
					Ok(())
				} else {
					Err("base_url must start with http:// or https://".to_string())
				}
			})],
			vec![
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
				Field::new("update_method", FieldType::OneOf(&["post", "put"])),
				Field::new("access_token", FieldType::String),
			],
		)
		.validate(config)
	}
}

/// Factory function to create an HTTP remote from configuration.
///
/// Configuration parameters:
/// - `base_url`: root URL of the tracking service (required)
/// - `timeout_seconds`: request timeout (default: 30)
/// - `update_method`: "post" or "put" (default: "post")
/// - `access_token`: optional bearer token
pub fn create_remote(config: &toml::Value) -> Result<Box<dyn RemoteInterface>, RemoteError> {
	HttpRemoteSchema
		.validate(config)
		.map_err(|e| RemoteError::Configuration(e.to_string()))?;

	let http_config: HttpRemoteConfig = config
		.clone()
		.try_into()
		.map_err(|e| RemoteError::Configuration(format!("Invalid http remote config: {}", e)))?;

	Ok(Box::new(HttpRemote::new(http_config)?))
}

/// Registry for the HTTP remote implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = RemoteFactory;

	fn factory() -> Self::Factory {
		create_remote
	}
}

impl RemoteRegistry for Registry {}
