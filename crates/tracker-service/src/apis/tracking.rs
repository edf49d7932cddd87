//! Project tracking endpoints.
//!
//! Stores one tracking record per order under the `project_tracking`
//! namespace. Records are kept exactly as uploaded; stage ordering is the
//! client's concern.

use tracker_storage::{StorageError, StorageService};
use tracker_types::{APIError, StorageKey, TrackingRecord};

/// Returns the stored record for `order_id`, or an empty record.
pub async fn get_tracking(
	order_id: &str,
	storage: &StorageService,
) -> Result<TrackingRecord, APIError> {
	let record = storage
		.retrieve_optional::<TrackingRecord>(StorageKey::ProjectTracking.as_str(), order_id)
		.await
		.map_err(storage_error)?;

	match record {
		Some(record) => Ok(record),
		None => {
			tracing::debug!(order_id = %order_id, "No tracking stored yet");
			Ok(TrackingRecord::new())
		},
	}
}

/// Parses `body` as a tracking record and replaces the stored one.
pub async fn put_tracking(
	order_id: &str,
	body: &[u8],
	storage: &StorageService,
) -> Result<(), APIError> {
	let record: TrackingRecord = serde_json::from_slice(body).map_err(|e| {
		APIError::bad_request(
			"INVALID_TRACKING_RECORD",
			format!("Expected a JSON object of stage flags: {}", e),
		)
	})?;

	storage
		.store(StorageKey::ProjectTracking.as_str(), order_id, &record)
		.await
		.map_err(storage_error)?;

	tracing::info!(
		order_id = %order_id,
		active = record.iter().filter(|(_, active)| *active).count(),
		"Stored tracking"
	);
	Ok(())
}

fn storage_error(err: StorageError) -> APIError {
	tracing::warn!("Tracking storage failed: {}", err);
	match err {
		StorageError::Backend(message) => APIError::ServiceUnavailable {
			error_type: "STORAGE_UNAVAILABLE".to_string(),
			message,
		},
		other => APIError::internal("STORAGE_ERROR", other.to_string()),
	}
}
