use axum::{
    extract::State,
    response::IntoResponse,
    routing::patch,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::events::DomainEvent;
use crate::models::showtime::Showtime;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seats/block", patch(block_seats))
        .route("/seats/release", patch(release_seats))
        .route("/seats/book", patch(book_seats))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoldRequest {
    showtime_id: Uuid,
    seat_ids: Vec<String>,
    user_id: Uuid,
    session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookRequest {
    showtime_id: Uuid,
    seat_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeatStateResponse {
    success: bool,
    showtime_id: Uuid,
    available_seats: u32,
    blocked_seats: u32,
    booked_seats: u32,
}

fn respond(state: &AppState, showtime: &Showtime) -> Json<SeatStateResponse> {
    let response = SeatStateResponse {
        success: true,
        showtime_id: showtime.id,
        available_seats: showtime.available_seats,
        blocked_seats: showtime.blocked_seats.len() as u32,
        booked_seats: showtime.booked_seats.len() as u32,
    };
    state.events.publish(DomainEvent::SeatStateChanged {
        showtime_id: showtime.id,
        available_seats: response.available_seats,
        blocked_seats: response.blocked_seats,
        booked_seats: response.booked_seats,
    });
    Json(response)
}

// PATCH /api/seats/block
async fn block_seats(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HoldRequest>,
) -> Result<impl IntoResponse> {
    let showtime = state
        .repo
        .block_seats(req.showtime_id, &req.seat_ids, req.user_id, &req.session_id)
        .await?;
    tracing::debug!(
        "blocked {} seat(s) on showtime {} for user {}",
        req.seat_ids.len(),
        req.showtime_id,
        req.user_id
    );
    Ok(respond(&state, &showtime))
}

// PATCH /api/seats/release
async fn release_seats(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HoldRequest>,
) -> Result<impl IntoResponse> {
    let showtime = state
        .repo
        .release_seats(req.showtime_id, &req.seat_ids, req.user_id, &req.session_id)
        .await?;
    Ok(respond(&state, &showtime))
}

// PATCH /api/seats/book
async fn book_seats(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookRequest>,
) -> Result<impl IntoResponse> {
    let showtime = state.repo.book_seats(req.showtime_id, &req.seat_ids).await?;
    tracing::info!(
        "booked {} seat(s) on showtime {}",
        req.seat_ids.len(),
        req.showtime_id
    );
    Ok(respond(&state, &showtime))
}
