pub mod invites;
pub mod seats;
pub mod showtimes;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(showtimes::routes())
        .merge(seats::routes())
        .merge(invites::routes())
}
