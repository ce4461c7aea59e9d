pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::any::Any;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::state::AppState;

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked");
    AppError::Internal.into_response()
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route("/bookings/search", get(handlers::bookings::search_bookings))
        .route(
            "/bookings/:id",
            get(handlers::bookings::get_booking)
                .put(handlers::bookings::update_booking)
                .delete(handlers::bookings::delete_booking),
        )
        .route(
            "/bookings/:id/invoice",
            get(handlers::exports::download_invoice),
        )
        .route(
            "/bookings/:id/calendar.ics",
            get(handlers::exports::download_ics),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
