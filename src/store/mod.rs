pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::query::{ShowtimeFilters, ShowtimePage};
use crate::models::showtime::{NewShowtime, Showtime, ShowtimeUpdate};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// Outcome of reclaiming expired blocks on one showtime.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub showtime_id: Uuid,
    pub purged_blocks: usize,
    pub available_seats: u32,
    pub blocked_seats: u32,
    pub booked_seats: u32,
}

/// Storage contract for the showtime aggregate.
///
/// All seat mutations (`block_seats`, `release_seats`, `book_seats`) are
/// atomic read-modify-write operations against one showtime, serialized via
/// an optimistic compare-and-swap on the record's version field. Losing
/// writers are retried internally up to a configured bound and then surfaced
/// as `Conflict`; callers never implement their own retry loop. Operations on
/// different showtimes never contend.
#[async_trait]
pub trait ShowtimeRepository: Send + Sync {
    /// Persists a new showtime. Schedule overlap on the same screen and date
    /// is a hard rejection, as is an exact screen/date/time duplicate.
    async fn create(&self, req: NewShowtime) -> Result<Showtime>;

    async fn find_by_id(&self, id: Uuid) -> Result<Showtime>;
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Showtime>>;
    async fn find_by_movie_and_date(&self, movie_id: Uuid, date: NaiveDate) -> Result<Vec<Showtime>>;
    async fn find_by_theater_and_date(&self, theater_id: Uuid, date: NaiveDate) -> Result<Vec<Showtime>>;
    async fn find_by_screen_and_date(&self, screen_id: Uuid, date: NaiveDate) -> Result<Vec<Showtime>>;

    /// Applies an owner edit; re-validates schedule overlap (excluding the
    /// showtime itself) when the exhibition window moves.
    async fn update_by_id(&self, id: Uuid, update: ShowtimeUpdate) -> Result<Showtime>;

    /// Soft-deactivates when bookings reference the showtime, removes it
    /// otherwise.
    async fn delete_by_id(&self, id: Uuid) -> Result<()>;
    async fn update_status(&self, id: Uuid, is_active: bool) -> Result<Showtime>;

    async fn find_all_paginated(
        &self,
        page: u32,
        limit: u32,
        filters: &ShowtimeFilters,
    ) -> Result<ShowtimePage>;

    /// Same filter/sort/paginate semantics as `find_all_paginated`, scoped to
    /// one screen.
    async fn find_by_screen_paginated(
        &self,
        screen_id: Uuid,
        page: u32,
        limit: u32,
        filters: &ShowtimeFilters,
    ) -> Result<ShowtimePage>;

    async fn check_time_slot_overlap(
        &self,
        screen_id: Uuid,
        show_date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        exclude_id: Option<Uuid>,
    ) -> Result<bool>;

    async fn exists_by_screen_and_time(
        &self,
        screen_id: Uuid,
        show_date: NaiveDate,
        show_time: NaiveTime,
    ) -> Result<bool>;

    async fn block_seats(
        &self,
        id: Uuid,
        seat_ids: &[String],
        user_id: Uuid,
        session_id: &str,
    ) -> Result<Showtime>;

    async fn release_seats(
        &self,
        id: Uuid,
        seat_ids: &[String],
        user_id: Uuid,
        session_id: &str,
    ) -> Result<Showtime>;

    async fn book_seats(&self, id: Uuid, seat_ids: &[String]) -> Result<Showtime>;

    /// Physically reclaims expired blocks. Availability answers never depend
    /// on this having run; it only bounds counter drift and memory.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<SweepReport>>;
}
