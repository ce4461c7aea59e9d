use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{timestamp, Booking};
use crate::services::query::{build_list_query, build_search_query, ListParams};
use crate::services::validation::{self, ValidationError};
use crate::state::AppState;

/// Canonical form of a path id; anything that is not a UUID is malformed.
pub(crate) fn parse_id(raw: &str) -> Result<String, AppError> {
    Uuid::parse_str(raw)
        .map(|id| id.to_string())
        .map_err(|_| AppError::MalformedId(raw.to_string()))
}

// POST /bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let Json(payload) = payload?;
    let changes = validation::normalize_create(&payload)?;
    let booking = changes
        .into_booking(Uuid::new_v4().to_string(), timestamp::now())
        .ok_or_else(|| ValidationError::single("customerName", "is required"))?;

    state
        .store
        .insert(&booking)
        .await
        .map_err(AppError::Rejected)?;

    tracing::info!(id = %booking.id, "booking created");
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /bookings
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPage {
    pub items: Vec<Booking>,
    pub total: u64,
    pub page: i64,
    pub page_size: i64,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<BookingPage>, AppError> {
    let query = build_list_query(&ListParams::from_pairs(&pairs))?;

    let (items, total) = tokio::try_join!(
        state.store.find(&query.find),
        state.store.count(&query.find.filter),
    )
    .map_err(AppError::Database)?;

    Ok(Json(BookingPage {
        items,
        total,
        page: query.page,
        page_size: query.page_size,
    }))
}

// GET /bookings/search
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub items: Vec<Booking>,
}

pub async fn search_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>, AppError> {
    let Some(spec) = build_search_query(query.q.as_deref()) else {
        return Ok(Json(SearchResults { items: vec![] }));
    };

    let items = state.store.find(&spec).await.map_err(AppError::Rejected)?;
    Ok(Json(SearchResults { items }))
}

// GET /bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let id = parse_id(&raw_id)?;
    let booking = state
        .store
        .find_by_id(&id)
        .await
        .map_err(AppError::Database)?
        .ok_or(AppError::NotFound)?;
    Ok(Json(booking))
}

// PUT /bookings/:id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let id = parse_id(&raw_id)?;
    let Json(payload) = payload?;
    let changes = validation::normalize_update(&payload)?;

    let booking = state
        .store
        .update_by_id(&id, changes)
        .await
        .map_err(AppError::Rejected)?
        .ok_or(AppError::NotFound)?;

    tracing::info!(%id, "booking updated");
    Ok(Json(booking))
}

// DELETE /bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&raw_id)?;
    let removed = state
        .store
        .delete_by_id(&id)
        .await
        .map_err(AppError::Rejected)?;

    if removed {
        tracing::info!(%id, "booking deleted");
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_normalizes() {
        let id = parse_id("67E55044-10B1-426F-9247-BB680E5FE0C8").unwrap();
        assert_eq!(id, "67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(matches!(
            parse_id("not-an-id"),
            Err(AppError::MalformedId(raw)) if raw == "not-an-id"
        ));
    }
}
