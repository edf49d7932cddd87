//! File-based storage backend.
//!
//! Every key maps to one `.json` file under the configured directory. Writes
//! go to a temporary file first and are renamed into place, so a reader never
//! observes a half-written record.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tokio::fs;
use tracker_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};

const DEFAULT_STORAGE_PATH: &str = "./data/tracking";

/// File-based storage implementation.
pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Maps a storage key to a filesystem-safe path.
	///
	/// ASCII letters, digits and `-` are kept; every other byte is written as
	/// `_` followed by two hex digits, so distinct keys never share a file.
	fn file_path(&self, key: &str) -> PathBuf {
		let mut safe_key = String::with_capacity(key.len());
		for byte in key.bytes() {
			match byte {
				b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' => safe_key.push(byte as char),
				_ => {
					let _ = write!(safe_key, "_{:02x}", byte);
				},
			}
		}
		self.base_path.join(format!("{}.json", safe_key))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		match fs::read(self.file_path(key)).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.file_path(key);

		fs::create_dir_all(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		// Each write gets its own temporary file so concurrent writers of the
		// same key never share one; the last rename wins.
		let base_path = self.base_path.clone();
		let target = path.clone();
		tokio::task::spawn_blocking(move || -> std::io::Result<()> {
			let mut temp = NamedTempFile::new_in(&base_path)?;
			temp.write_all(&value)?;
			temp.as_file().sync_all()?;
			temp.persist(&target).map_err(|e| e.error)?;
			Ok(())
		})
		.await
		.map_err(|e| StorageError::Backend(e.to_string()))?
		.map_err(|e| StorageError::Backend(e.to_string()))?;

		tracing::trace!("Wrote {}", path.display());
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		match fs::remove_file(self.file_path(key)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		fs::try_exists(self.file_path(key))
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(path) if !path.trim().is_empty() => Ok(()),
					_ => Err("storage_path cannot be empty".to_string()),
				}
			})],
		)
		.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: directory holding the record files (default: "./data/tracking")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
