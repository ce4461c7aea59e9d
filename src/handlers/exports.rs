use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::errors::AppError;
use crate::handlers::bookings::parse_id;
use crate::models::Booking;
use crate::services::calendar::generate_ics;
use crate::services::invoice::render_invoice;
use crate::state::AppState;

async fn load_booking(state: &AppState, raw_id: &str) -> Result<Booking, AppError> {
    let id = parse_id(raw_id)?;
    state
        .store
        .find_by_id(&id)
        .await
        .map_err(AppError::Database)?
        .ok_or(AppError::NotFound)
}

// GET /bookings/:id/invoice
pub async fn download_invoice(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let booking = load_booking(&state, &raw_id).await?;
    let invoice = render_invoice(&booking, &state.config.business_name);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", invoice.filename),
            ),
        ],
        invoice.body,
    )
        .into_response())
}

// GET /bookings/:id/calendar.ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let booking = load_booking(&state, &raw_id).await?;
    let Some(ics) = generate_ics(&booking, &state.config.business_name) else {
        return Err(AppError::NotFound);
    };
    let filename = format!("booking-{}.ics", booking.id);

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
