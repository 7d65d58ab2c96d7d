//! Dashboard statistics endpoint.
//!
//! GET /api/stats - Aggregate counts for the dashboard header.

use axum::Json;
use axum::extract::State;

use eventwatch_core::catalog::query::catalog_stats;
use eventwatch_core::catalog::vector::VectorIndex;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// GET /api/stats - Event counts by type and category, plus index size.
///
/// `indexed` differing from `total_events` means a reconciliation pass is due.
pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();

    let records = state.catalog.list().await?;
    let stats = catalog_stats(&records);
    let indexed = state
        .catalog
        .vector_index()
        .count()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to count index entries: {e}")))?;

    let data = serde_json::json!({
        "events": stats,
        "indexed": indexed,
        "threshold": state.catalog.threshold(),
        "pipeline_enabled": state.pipeline.is_some(),
    });

    Ok(Json(timer.finish(data)))
}
