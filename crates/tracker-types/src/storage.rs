//! Storage-related types for the tracking service.

use std::str::FromStr;

/// Namespaces under which the tracking service stores records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Per-order tracking records.
	ProjectTracking,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::ProjectTracking => "project_tracking",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[Self::ProjectTracking].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"project_tracking" => Ok(Self::ProjectTracking),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
