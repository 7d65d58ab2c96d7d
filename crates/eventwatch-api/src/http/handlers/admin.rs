//! Operator handlers: deletion and store reconciliation.

use axum::Json;
use axum::extract::{Path, State};

use eventwatch_core::catalog::reconcile::ReconcileReport;
use eventwatch_types::error::CatalogError;
use eventwatch_types::event::EventId;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// DELETE /api/admin/events/{id} - Remove an event from both stores.
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();
    let id: EventId = id
        .parse()
        .map_err(|_| AppError::Validation(format!("'{id}' is not a valid event id")))?;

    if !state.catalog.delete(&id).await? {
        return Err(CatalogError::NotFound(id).into());
    }

    Ok(Json(timer.finish(serde_json::json!({ "id": id, "deleted": true }))))
}

/// POST /api/admin/reconcile - Repair divergence between the stores.
pub async fn reconcile(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ReconcileReport>>, AppError> {
    let timer = RequestTimer::start();
    let report = state.catalog.reconcile().await?;
    Ok(Json(timer.finish(report)))
}
