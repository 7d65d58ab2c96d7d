//! Axum router configuration with middleware.
//!
//! All routes are under `/api/`. The read routes keep the paths the
//! dashboard frontend already calls.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// CORS for the configured dashboard origins. A `*` entry, or a list
/// with no parseable origin, allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if parsed.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    let api_routes = Router::new()
        // Dashboard reads
        .route("/allEvents", get(handlers::events::all_events))
        .route("/events/{id}", get(handlers::events::get_event))
        .route("/getEventTypes", get(handlers::events::event_types))
        .route("/getEventLocations", get(handlers::events::event_locations))
        .route("/getEventCategories", get(handlers::events::event_categories))
        .route("/getFilteredEvents", get(handlers::events::filtered_events))
        // Ingestion
        .route("/events", post(handlers::ingest::create_event))
        .route("/submitTweet", post(handlers::ingest::submit_tweet))
        // Operator
        .route("/admin/events/{id}", delete(handlers::admin::delete_event))
        .route("/admin/reconcile", post(handlers::admin::reconcile))
        // Dashboard stats
        .route("/stats", get(handlers::stats::get_stats));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
