use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::query::{ShowtimeFilters, SortField, SortOrder};
use crate::models::showtime::{NewShowtime, RowSpec, ShowFormat, ShowtimeUpdate};
use crate::services::schedule;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/showtimes", post(create_showtime).get(list_showtimes))
        .route(
            "/showtimes/{id}",
            get(get_showtime).patch(update_showtime).delete(delete_showtime),
        )
        .route("/showtimes/{id}/status", patch(update_status))
        .route("/showtimes/overlap", get(check_overlap))
        .route("/showtimes/exists", get(exists_at_time))
        .route("/owners/{owner_id}/showtimes", get(by_owner))
        .route("/movies/{movie_id}/showtimes", get(by_movie_and_date))
        .route("/theaters/{theater_id}/showtimes", get(by_theater_and_date))
        .route("/screens/{screen_id}/showtimes", get(by_screen_paginated))
        .route("/screens/{screen_id}/schedule", get(screen_schedule))
}

/* ---------- CRUD ---------- */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateShowtimeRequest {
    owner_id: Uuid,
    movie_id: Uuid,
    theater_id: Uuid,
    screen_id: Uuid,
    show_date: NaiveDate,
    show_time: NaiveTime,
    /// Either an explicit end time or a movie runtime to derive it from.
    end_time: Option<NaiveTime>,
    runtime_minutes: Option<u32>,
    format: ShowFormat,
    language: String,
    row_pricing: Vec<RowSpec>,
}

async fn create_showtime(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateShowtimeRequest>,
) -> Result<impl IntoResponse> {
    let end_time = match (req.end_time, req.runtime_minutes) {
        (Some(end), _) => end,
        (None, Some(runtime)) => schedule::end_time_for(
            req.show_time,
            runtime,
            schedule::DEFAULT_RUNTIME_BUFFER_MINUTES,
        )?,
        (None, None) => {
            return Err(Error::InvalidRequest(
                "either endTime or runtimeMinutes is required".to_string(),
            ))
        }
    };

    let created = state
        .repo
        .create(NewShowtime {
            owner_id: req.owner_id,
            movie_id: req.movie_id,
            theater_id: req.theater_id,
            screen_id: req.screen_id,
            show_date: req.show_date,
            show_time: req.show_time,
            end_time,
            format: req.format,
            language: req.language,
            rows: req.row_pricing,
        })
        .await?;

    tracing::info!(
        "showtime {} created on screen {} at {} {}",
        created.id,
        created.screen_id,
        created.show_date,
        created.show_time
    );
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_showtime(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.repo.find_by_id(id).await?))
}

async fn update_showtime(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<ShowtimeUpdate>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.repo.update_by_id(id, update).await?))
}

async fn delete_showtime(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.repo.delete_by_id(id).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusRequest {
    is_active: bool,
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.repo.update_status(id, req.is_active).await?))
}

/* ---------- listings ---------- */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    search: Option<String>,
    show_date: Option<NaiveDate>,
    is_active: Option<bool>,
    format: Option<ShowFormat>,
    language: Option<String>,
    theater_id: Option<Uuid>,
    screen_id: Option<Uuid>,
    movie_id: Option<Uuid>,
    sort_by: Option<SortField>,
    sort_order: Option<SortOrder>,
}

impl ListQuery {
    fn filters(&self) -> ShowtimeFilters {
        ShowtimeFilters {
            search: self.search.clone(),
            show_date: self.show_date,
            is_active: self.is_active,
            format: self.format,
            language: self.language.clone(),
            theater_id: self.theater_id,
            screen_id: self.screen_id,
            movie_id: self.movie_id,
            sort_by: self.sort_by.unwrap_or_default(),
            sort_order: self.sort_order.unwrap_or_default(),
        }
    }
}

async fn list_showtimes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(state.config.pagination.default_page_size)
        .clamp(1, state.config.pagination.max_page_size);
    let page_result = state
        .repo
        .find_all_paginated(page, limit, &params.filters())
        .await?;
    Ok(Json(page_result))
}

async fn by_screen_paginated(
    State(state): State<Arc<AppState>>,
    Path(screen_id): Path<Uuid>,
    Query(params): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(state.config.pagination.default_page_size)
        .clamp(1, state.config.pagination.max_page_size);
    let page_result = state
        .repo
        .find_by_screen_paginated(screen_id, page, limit, &params.filters())
        .await?;
    Ok(Json(page_result))
}

async fn by_owner(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.repo.find_by_owner(owner_id).await?))
}

#[derive(Debug, Deserialize)]
struct DateQuery {
    date: NaiveDate,
}

async fn by_movie_and_date(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<Uuid>,
    Query(q): Query<DateQuery>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.repo.find_by_movie_and_date(movie_id, q.date).await?))
}

async fn by_theater_and_date(
    State(state): State<Arc<AppState>>,
    Path(theater_id): Path<Uuid>,
    Query(q): Query<DateQuery>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.repo.find_by_theater_and_date(theater_id, q.date).await?))
}

async fn screen_schedule(
    State(state): State<Arc<AppState>>,
    Path(screen_id): Path<Uuid>,
    Query(q): Query<DateQuery>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.repo.find_by_screen_and_date(screen_id, q.date).await?))
}

/* ---------- schedule checks ---------- */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverlapQuery {
    screen_id: Uuid,
    show_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    exclude_id: Option<Uuid>,
}

async fn check_overlap(
    State(state): State<Arc<AppState>>,
    Query(q): Query<OverlapQuery>,
) -> Result<impl IntoResponse> {
    let overlap = state
        .repo
        .check_time_slot_overlap(q.screen_id, q.show_date, q.start_time, q.end_time, q.exclude_id)
        .await?;
    Ok(Json(json!({ "overlap": overlap })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExistsQuery {
    screen_id: Uuid,
    show_date: NaiveDate,
    show_time: NaiveTime,
}

async fn exists_at_time(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ExistsQuery>,
) -> Result<impl IntoResponse> {
    let exists = state
        .repo
        .exists_by_screen_and_time(q.screen_id, q.show_date, q.show_time)
        .await?;
    Ok(Json(json!({ "exists": exists })))
}
