//! Read-side event handlers for the dashboard.
//!
//! All of these read a snapshot of the record store; none take the
//! catalog's mutation lock.

use axum::Json;
use axum::extract::{Path, Query, State};

use eventwatch_core::catalog::query::{
    distinct_categories, distinct_event_types, distinct_locations, filter_events,
};
use eventwatch_types::error::CatalogError;
use eventwatch_types::event::{EventFilter, EventId, EventRecord};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// GET /api/allEvents - Every catalogued event.
pub async fn all_events(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<EventRecord>>>, AppError> {
    let timer = RequestTimer::start();
    let events = state.catalog.list().await?;
    Ok(Json(timer.finish(events).with_link("self", "/api/allEvents")))
}

/// GET /api/events/{id} - One event by id.
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<EventRecord>>, AppError> {
    let timer = RequestTimer::start();
    let id: EventId = id
        .parse()
        .map_err(|_| AppError::Validation(format!("'{id}' is not a valid event id")))?;

    let record = state
        .catalog
        .get(&id)
        .await?
        .ok_or(CatalogError::NotFound(id))?;

    let self_link = format!("/api/events/{id}");
    Ok(Json(timer.finish(record).with_link("self", &self_link)))
}

/// GET /api/getEventTypes - Distinct event types.
pub async fn event_types(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let timer = RequestTimer::start();
    let records = state.catalog.list().await?;
    Ok(Json(timer.finish(distinct_event_types(&records))))
}

/// GET /api/getEventLocations - Distinct locations, split from each
/// event's comma-separated list.
pub async fn event_locations(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let timer = RequestTimer::start();
    let records = state.catalog.list().await?;
    Ok(Json(timer.finish(distinct_locations(&records))))
}

/// GET /api/getEventCategories - Distinct humanitarian categories.
pub async fn event_categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let timer = RequestTimer::start();
    let records = state.catalog.list().await?;
    Ok(Json(timer.finish(distinct_categories(&records))))
}

/// Build a filter from repeated query parameters.
///
/// `event_types`, `locations` and `categories` may each repeat; the
/// bracketed `event_types[]` form is accepted too. Unknown keys are ignored.
pub fn filter_from_pairs(pairs: Vec<(String, String)>) -> EventFilter {
    let mut filter = EventFilter::default();
    for (key, value) in pairs {
        let target = match key.trim_end_matches("[]") {
            "event_types" => &mut filter.event_types,
            "locations" => &mut filter.locations,
            "categories" => &mut filter.categories,
            _ => continue,
        };
        target.push(value);
    }
    filter
}

/// GET /api/getFilteredEvents - Events matching every non-empty criterion.
pub async fn filtered_events(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ApiResponse<Vec<EventRecord>>>, AppError> {
    let timer = RequestTimer::start();
    let filter = filter_from_pairs(pairs);
    let records = state.catalog.list().await?;
    Ok(Json(timer.finish(filter_events(&records, &filter))))
}
