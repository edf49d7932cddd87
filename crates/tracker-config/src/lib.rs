//! Configuration module for the order tracking system.
//!
//! Configuration is read from TOML. String values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`, and a file may pull in other
//! files with `include = ["remote.toml"]` as long as every top-level section
//! is defined only once across all files.

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracker_types::StageLayout;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Tracker identity and stage layout.
	pub tracker: TrackerConfig,
	/// Tracking service the tracker talks to.
	pub remote: RemoteConfig,
	/// Storage used when this process hosts the tracking service itself.
	pub storage: Option<StorageConfig>,
	/// HTTP API of the hosted tracking service.
	pub api: Option<ApiConfig>,
}

/// Tracker identity and stage layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
	/// Name of this tracker instance, used in logs.
	pub id: String,
	/// Stage table to track against.
	#[serde(default)]
	pub layout: StageLayout,
}

/// Configuration of the remote tracking service client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of remote implementation names to their raw configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Retry policy for uploads.
	#[serde(default)]
	pub retry: RetryConfig,
}

/// Exponential backoff applied to tracking uploads.
///
/// Uploads replace the whole record for an order, so repeating one is safe.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_initial_interval_ms")]
	pub initial_interval_ms: u64,
	#[serde(default = "default_max_interval_ms")]
	pub max_interval_ms: u64,
	/// Give up once this much time has passed since the first attempt.
	#[serde(default = "default_max_elapsed_seconds")]
	pub max_elapsed_seconds: u64,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			initial_interval_ms: default_initial_interval_ms(),
			max_interval_ms: default_max_interval_ms(),
			max_elapsed_seconds: default_max_elapsed_seconds(),
		}
	}
}

fn default_initial_interval_ms() -> u64 {
	200
}

fn default_max_interval_ms() -> u64 {
	2_000
}

fn default_max_elapsed_seconds() -> u64 {
	10
}

/// Configuration for the storage backend of the hosted service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			host: default_api_host(),
			port: default_api_port(),
			timeout_seconds: default_api_timeout(),
			max_request_size: default_max_request_size(),
		}
	}
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

fn default_max_request_size() -> usize {
	64 * 1024
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME`, or with `default`
/// for `${VAR_NAME:-default}` when the variable is unset.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut missing = None;
	let resolved = re.replace_all(input, |caps: &regex::Captures<'_>| {
		let var_name = &caps[1];
		match (std::env::var(var_name), caps.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				missing.get_or_insert_with(|| var_name.to_string());
				String::new()
			},
		}
	});

	if let Some(var_name) = missing {
		return Err(ConfigError::Validation(format!(
			"Environment variable '{}' not found",
			var_name
		)));
	}

	Ok(resolved.into_owned())
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
		let file_name = path.file_name().ok_or_else(|| {
			ConfigError::Validation(format!("Invalid path: {}", path.display()))
		})?;

		let mut loader = loader::ConfigLoader::new(base_dir);
		loader.load_config(file_name).await
	}

	/// Returns the API configuration when the hosted service is enabled.
	pub fn enabled_api(&self) -> Option<&ApiConfig> {
		self.api.as_ref().filter(|api| api.enabled)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.tracker.id.trim().is_empty() {
			return Err(ConfigError::Validation("Tracker ID cannot be empty".into()));
		}
		if self.tracker.layout == StageLayout::WithoutInvoice {
			tracing::warn!(
				"Stage layout 'without_invoice' omits the invoice stage; records written with it \
				 differ from the standard nine-stage table"
			);
		}

		if self.remote.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Remote primary implementation cannot be empty".into(),
			));
		}
		if !self
			.remote
			.implementations
			.contains_key(&self.remote.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary remote '{}' not found in implementations",
				self.remote.primary
			)));
		}

		let retry = &self.remote.retry;
		if retry.enabled {
			if retry.initial_interval_ms == 0 {
				return Err(ConfigError::Validation(
					"Retry initial_interval_ms must be greater than 0".into(),
				));
			}
			if retry.max_interval_ms < retry.initial_interval_ms {
				return Err(ConfigError::Validation(
					"Retry max_interval_ms cannot be lower than initial_interval_ms".into(),
				));
			}
			if retry.max_elapsed_seconds > 300 {
				return Err(ConfigError::Validation(
					"Retry max_elapsed_seconds cannot exceed 300".into(),
				));
			}
		}

		if let Some(storage) = &self.storage {
			if !storage.implementations.contains_key(&storage.primary) {
				return Err(ConfigError::Validation(format!(
					"Primary storage '{}' not found in implementations",
					storage.primary
				)));
			}
		}

		if let Some(api) = self.enabled_api() {
			if self.storage.is_none() {
				return Err(ConfigError::Validation(
					"An enabled [api] section requires a [storage] section".into(),
				));
			}
			if api.max_request_size == 0 {
				return Err(ConfigError::Validation(
					"API max_request_size must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses and validates configuration from a TOML string.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[tracker]
id = "press-floor"

[remote]
primary = "memory"
[remote.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("TRACKER_TEST_HOST", "localhost");
		std::env::set_var("TRACKER_TEST_PORT", "8000");

		let input = "url = \"http://${TRACKER_TEST_HOST}:${TRACKER_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "url = \"http://localhost:8000\"");

		std::env::remove_var("TRACKER_TEST_HOST");
		std::env::remove_var("TRACKER_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${TRACKER_MISSING_VAR:-fallback}\"";
		assert_eq!(resolve_env_vars(input).unwrap(), "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${TRACKER_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("TRACKER_MISSING_VAR"));
	}

	#[test]
	fn test_minimal_config_defaults() {
		let config: Config = MINIMAL.parse().unwrap();

		assert_eq!(config.tracker.id, "press-floor");
		assert_eq!(config.tracker.layout, StageLayout::Standard);
		assert!(!config.remote.retry.enabled);
		assert_eq!(config.remote.retry.initial_interval_ms, 200);
		assert!(config.storage.is_none());
		assert!(config.enabled_api().is_none());
	}

	#[test]
	fn test_full_config() {
		let config: Config = r#"
[tracker]
id = "press-floor"
layout = "without_invoice"

[remote]
primary = "http"
[remote.implementations.http]
base_url = "http://127.0.0.1:3000"
[remote.retry]
enabled = true
max_elapsed_seconds = 5

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "./data/tracking"

[api]
enabled = true
port = 8080
"#
		.parse()
		.unwrap();

		assert_eq!(config.tracker.layout, StageLayout::WithoutInvoice);
		assert!(config.remote.retry.enabled);
		assert_eq!(config.remote.retry.max_elapsed_seconds, 5);
		let api = config.enabled_api().unwrap();
		assert_eq!(api.port, 8080);
		assert_eq!(api.host, "127.0.0.1");
	}

	#[test]
	fn test_unknown_primary_rejected() {
		let result = MINIMAL.replace("primary = \"memory\"", "primary = \"http\"").parse::<Config>();
		assert!(result.unwrap_err().to_string().contains("Primary remote 'http'"));
	}

	#[test]
	fn test_empty_id_rejected() {
		let result = MINIMAL.replace("press-floor", " ").parse::<Config>();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_api_requires_storage() {
		let input = format!("{}\n[api]\nenabled = true\n", MINIMAL);
		let result = input.parse::<Config>();
		assert!(result.unwrap_err().to_string().contains("[storage]"));
	}

	#[test]
	fn test_unknown_layout_rejected() {
		let input = MINIMAL.replace("id = \"press-floor\"", "id = \"x\"\nlayout = \"short\"");
		assert!(matches!(input.parse::<Config>(), Err(ConfigError::Parse(_))));
	}
}
