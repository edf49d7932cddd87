//! API types for the tracking service HTTP endpoints.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body returned by the service on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug, Error)]
pub enum APIError {
	/// Malformed request (400)
	#[error("Bad Request: {message}")]
	BadRequest { error_type: String, message: String },
	/// Backing store unavailable (503)
	#[error("Service Unavailable: {message}")]
	ServiceUnavailable { error_type: String, message: String },
	/// Anything else (500)
	#[error("Internal Server Error: {message}")]
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn bad_request(error_type: &str, message: impl Into<String>) -> Self {
		APIError::BadRequest {
			error_type: error_type.to_string(),
			message: message.into(),
		}
	}

	pub fn internal(error_type: &str, message: impl Into<String>) -> Self {
		APIError::InternalServerError {
			error_type: error_type.to_string(),
			message: message.into(),
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message) = match self {
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::ServiceUnavailable {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type, message),
		};

		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
			details: None,
		}
	}
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
