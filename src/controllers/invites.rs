use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use std::sync::Arc;

use crate::error::Result;
use crate::models::pricing::{compute_joiner_price, GroupInvite};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/invites/quote", post(quote_joiner))
}

// POST /api/invites/quote
//
// Prices the next unfilled seat of a group invite. Pure computation; the
// join flow blocks/books the seat through the seats endpoints afterwards.
async fn quote_joiner(
    State(_state): State<Arc<AppState>>,
    Json(invite): Json<GroupInvite>,
) -> Result<impl IntoResponse> {
    let quote = compute_joiner_price(&invite)?;
    Ok(Json(quote))
}
