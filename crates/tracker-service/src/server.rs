//! HTTP server for the reference tracking service.
//!
//! Serves `GET`, `POST` and `PUT` on `/projectTracking/{id}` so trackers can
//! run against this process instead of the ERP backend.

use axum::{
	body::Bytes,
	extract::{DefaultBodyLimit, Path, State},
	http::StatusCode,
	response::Json,
	routing::get,
	Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracker_config::ApiConfig;
use tracker_storage::StorageService;
use tracker_types::{APIError, TrackingRecord};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Storage holding one record per order.
	pub storage: Arc<StorageService>,
}

/// Builds the router with its middleware stack.
pub fn router(api_config: &ApiConfig, storage: Arc<StorageService>) -> Router {
	Router::new()
		.route(
			"/projectTracking/{id}",
			get(handle_get_tracking)
				.post(handle_put_tracking)
				.put(handle_put_tracking),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(TimeoutLayer::new(Duration::from_secs(
					api_config.timeout_seconds,
				)))
				.layer(CorsLayer::permissive())
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(AppState { storage })
}

/// Binds the configured address and serves until the process stops.
pub async fn start_server(
	api_config: ApiConfig,
	storage: Arc<StorageService>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(&api_config, storage);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Tracking service listening on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles GET /projectTracking/{id}.
async fn handle_get_tracking(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<TrackingRecord>, APIError> {
	crate::apis::tracking::get_tracking(&id, &state.storage)
		.await
		.map(Json)
}

/// Handles POST and PUT /projectTracking/{id}.
///
/// The body is taken raw so that malformed records map to a 400 with the
/// service's error shape instead of the extractor's plain-text rejection.
async fn handle_put_tracking(
	Path(id): Path<String>,
	State(state): State<AppState>,
	body: Bytes,
) -> Result<StatusCode, APIError> {
	crate::apis::tracking::put_tracking(&id, &body, &state.storage).await?;
	Ok(StatusCode::NO_CONTENT)
}
