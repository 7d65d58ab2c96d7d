//! Write-side ingestion handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;

use eventwatch_core::ingest::payload::{IngestPayload, parse_payload};
use eventwatch_core::ingest::pipeline::PipelineOutcome;
use eventwatch_types::event::DedupOutcome;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// POST /api/events - Catalog an already-extracted event.
///
/// The body is either a JSON object or a JSON string holding one.
pub async fn create_event(
    State(state): State<AppState>,
    body: Result<Json<IngestPayload>, JsonRejection>,
) -> Result<Json<ApiResponse<DedupOutcome>>, AppError> {
    let timer = RequestTimer::start();
    let Json(payload) = body.map_err(|e| AppError::Validation(e.body_text()))?;

    let event = parse_payload(payload)?;
    let outcome = state.catalog.decide_and_apply(event).await?;

    let self_link = format!("/api/events/{}", outcome.id());
    Ok(Json(timer.finish(outcome).with_link("self", &self_link)))
}

#[derive(Debug, Deserialize)]
pub struct SubmitReportRequest {
    #[serde(default)]
    pub tweet: String,
}

/// POST /api/submitTweet - Classify and catalog a free-text report.
pub async fn submit_tweet(
    State(state): State<AppState>,
    body: Result<Json<SubmitReportRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<PipelineOutcome>>, AppError> {
    let timer = RequestTimer::start();
    let Json(request) = body.map_err(|e| AppError::Validation(e.body_text()))?;

    if request.tweet.trim().is_empty() {
        return Err(AppError::Validation("Tweet text is required".to_string()));
    }

    let pipeline = state.pipeline.as_ref().ok_or_else(|| {
        AppError::PipelineDisabled(format!(
            "Report submission is disabled: set {} on the server",
            state.config.llm.api_key_env
        ))
    })?;

    let outcome = pipeline.submit(&request.tweet).await?;

    let event_link = match &outcome {
        PipelineOutcome::Catalogued { outcome, .. } => Some(format!("/api/events/{}", outcome.id())),
        PipelineOutcome::NotInformative => None,
    };

    let mut resp = timer.finish(outcome);
    if let Some(link) = event_link {
        resp = resp.with_link("event", &link);
    }
    Ok(Json(resp))
}
