use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::config::BookingConfig;
use crate::error::{Error, Result};
use crate::models::query::{total_pages, ShowtimeFilters, ShowtimePage, SortField, SortOrder};
use crate::models::showtime::{NewShowtime, ShowFormat, Showtime, ShowtimeUpdate};
use crate::services::{blocking, booking};

use super::{ShowtimeRepository, SweepReport};

const COLUMNS: &str = "id, owner_id, movie_id, theater_id, screen_id, show_date, show_time, \
     end_time, format, language, total_seats, available_seats, row_pricing, booked_seats, \
     blocked_seats, is_active, version, created_at, updated_at";

/// Postgres-backed showtime store.
///
/// Seat mutations are optimistic: load the row, apply the pure transition,
/// then `UPDATE ... WHERE id = $1 AND version = $2`. A zero-row update means
/// a concurrent writer won; the losing write retries on a fresh snapshot.
pub struct PgRepository {
    pool: PgPool,
    hold: Duration,
    max_retries: u32,
}

#[derive(sqlx::FromRow)]
struct ShowtimeRow {
    id: Uuid,
    owner_id: Uuid,
    movie_id: Uuid,
    theater_id: Uuid,
    screen_id: Uuid,
    show_date: NaiveDate,
    show_time: NaiveTime,
    end_time: NaiveTime,
    format: String,
    language: String,
    total_seats: i32,
    available_seats: i32,
    row_pricing: serde_json::Value,
    booked_seats: serde_json::Value,
    blocked_seats: serde_json::Value,
    is_active: bool,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ShowtimeRow {
    fn into_showtime(self) -> Result<Showtime> {
        let format = ShowFormat::parse(&self.format)
            .ok_or_else(|| Error::Internal(format!("unknown format '{}' in storage", self.format)))?;
        Ok(Showtime {
            id: self.id,
            owner_id: self.owner_id,
            movie_id: self.movie_id,
            theater_id: self.theater_id,
            screen_id: self.screen_id,
            show_date: self.show_date,
            show_time: self.show_time,
            end_time: self.end_time,
            format,
            language: self.language,
            row_pricing: serde_json::from_value(self.row_pricing)?,
            total_seats: self.total_seats as u32,
            available_seats: self.available_seats as u32,
            booked_seats: serde_json::from_value(self.booked_seats)?,
            blocked_seats: serde_json::from_value(self.blocked_seats)?,
            is_active: self.is_active,
            version: self.version as u64,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PgRepository {
    pub async fn connect(url: &str, pool_size: u32, booking: &BookingConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(url)
            .await?;
        Ok(Self {
            pool,
            hold: Duration::seconds(booking.hold_duration_secs as i64),
            max_retries: booking.max_cas_retries,
        })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Internal(format!("migration failed: {e}")))?;
        info!("Migrations completed");
        Ok(())
    }

    /// Raw row as stored, expired blocks included. Seat-mutation snapshots
    /// need the stored version untouched.
    async fn fetch_raw(&self, id: Uuid) -> Result<Showtime> {
        let sql = format!("SELECT {COLUMNS} FROM showtimes WHERE id = $1");
        let row = sqlx::query_as::<_, ShowtimeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("showtime {id} not found")))?;
        row.into_showtime()
    }

    /// Compare-and-swap write of a fully-transitioned record.
    /// Returns false when a concurrent writer advanced the version first.
    async fn commit(&self, next: &Showtime, expected_version: u64) -> Result<bool> {
        let res = sqlx::query(
            "UPDATE showtimes SET \
                show_date = $2, show_time = $3, end_time = $4, format = $5, language = $6, \
                total_seats = $7, available_seats = $8, row_pricing = $9, booked_seats = $10, \
                blocked_seats = $11, is_active = $12, version = $13, updated_at = $14 \
             WHERE id = $1 AND version = $15",
        )
        .bind(next.id)
        .bind(next.show_date)
        .bind(next.show_time)
        .bind(next.end_time)
        .bind(next.format.as_str())
        .bind(&next.language)
        .bind(next.total_seats as i32)
        .bind(next.available_seats as i32)
        .bind(serde_json::to_value(&next.row_pricing)?)
        .bind(serde_json::to_value(&next.booked_seats)?)
        .bind(serde_json::to_value(&next.blocked_seats)?)
        .bind(next.is_active)
        .bind(next.version as i64)
        .bind(next.updated_at)
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Optimistic read-modify-write against one showtime; bounded retries,
    /// then `Conflict`. Callers never run their own retry loop.
    async fn mutate<F>(&self, id: Uuid, transition: F) -> Result<Showtime>
    where
        F: Fn(&mut Showtime, DateTime<Utc>) -> Result<()> + Send + Sync,
    {
        for _ in 0..=self.max_retries {
            let now = Utc::now();
            let snapshot = self.fetch_raw(id).await?;
            let mut next = snapshot.clone();
            transition(&mut next, now)?;
            next.version += 1;
            next.updated_at = now;
            if self.commit(&next, snapshot.version).await? {
                return Ok(next);
            }
        }
        Err(Error::Conflict(
            "showtime is being modified concurrently, try again".to_string(),
        ))
    }

    async fn paginated(
        &self,
        scope_screen: Option<Uuid>,
        page: u32,
        limit: u32,
        filters: &ShowtimeFilters,
    ) -> Result<ShowtimePage> {
        let page = page.max(1);
        let limit = limit.max(1);

        let mut clause = String::from("1 = 1");
        let mut idx: u32 = 0;
        let mut next = |c: &mut String, frag: &str| {
            idx += 1;
            c.push_str(&frag.replace("$?", &format!("${idx}")));
        };

        if scope_screen.is_some() {
            next(&mut clause, " AND screen_id = $?");
        }
        if filters.search.is_some() {
            next(&mut clause, " AND (language ILIKE $? OR format ILIKE $?)");
        }
        if filters.show_date.is_some() {
            next(&mut clause, " AND show_date = $?");
        }
        if filters.is_active.is_some() {
            next(&mut clause, " AND is_active = $?");
        }
        if filters.format.is_some() {
            next(&mut clause, " AND format = $?");
        }
        if filters.language.is_some() {
            next(&mut clause, " AND LOWER(language) = LOWER($?)");
        }
        if filters.theater_id.is_some() {
            next(&mut clause, " AND theater_id = $?");
        }
        if filters.screen_id.is_some() {
            next(&mut clause, " AND screen_id = $?");
        }
        if filters.movie_id.is_some() {
            next(&mut clause, " AND movie_id = $?");
        }

        let binder = Binder { scope_screen, filters };

        let count_sql = format!("SELECT COUNT(*) FROM showtimes WHERE {clause}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        count_q = binder.apply_scalar(count_q);
        let total = count_q.fetch_one(&self.pool).await? as u64;

        let order = order_clause(filters.sort_by, filters.sort_order);
        let page_sql = format!(
            "SELECT {COLUMNS} FROM showtimes WHERE {clause} \
             ORDER BY {order} LIMIT ${} OFFSET ${}",
            idx + 1,
            idx + 2
        );
        let mut page_q = sqlx::query_as::<_, ShowtimeRow>(&page_sql);
        page_q = binder.apply_as(page_q);
        let rows = page_q
            .bind(limit as i64)
            .bind(((page - 1) as i64) * limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let now = Utc::now();
        let showtimes = rows
            .into_iter()
            .map(|r| {
                let mut st = r.into_showtime()?;
                st.purge_expired(now);
                Ok(st)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ShowtimePage {
            showtimes,
            total,
            current_page: page,
            total_pages: total_pages(total, limit),
            page_size: limit,
        })
    }
}

/// ORDER BY body for a listing. The direction applies to the whole sort key,
/// id tiebreak included, matching the in-memory engine's ordering.
fn order_clause(sort_by: SortField, sort_order: SortOrder) -> String {
    let dir = match sort_order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    let cols: &[&str] = match sort_by {
        SortField::ShowDate => &["show_date", "show_time"],
        SortField::ShowTime => &["show_time"],
        SortField::Language => &["language"],
        SortField::Format => &["format"],
        SortField::TotalSeats => &["total_seats"],
        SortField::AvailableSeats => &["available_seats"],
        SortField::CreatedAt => &["created_at"],
    };
    let mut parts: Vec<String> = cols.iter().map(|c| format!("{c} {dir}")).collect();
    parts.push(format!("id {dir}"));
    parts.join(", ")
}

/// Transaction-scoped advisory lock on one screen's calendar date. Released
/// automatically at commit/rollback.
async fn lock_schedule_slot(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    screen_id: Uuid,
    show_date: NaiveDate,
) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1), hashtext($2))")
        .bind(screen_id.to_string())
        .bind(show_date.to_string())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Replays the same bind order used when the WHERE clause was built.
#[derive(Clone, Copy)]
struct Binder<'a> {
    scope_screen: Option<Uuid>,
    filters: &'a ShowtimeFilters,
}

impl Binder<'_> {
    fn apply_as<'q, O>(
        &self,
        mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    ) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
        if let Some(screen) = self.scope_screen {
            q = q.bind(screen);
        }
        if let Some(search) = &self.filters.search {
            q = q.bind(format!("%{search}%"));
        }
        if let Some(date) = self.filters.show_date {
            q = q.bind(date);
        }
        if let Some(active) = self.filters.is_active {
            q = q.bind(active);
        }
        if let Some(format) = self.filters.format {
            q = q.bind(format.as_str());
        }
        if let Some(language) = &self.filters.language {
            q = q.bind(language.clone());
        }
        if let Some(theater) = self.filters.theater_id {
            q = q.bind(theater);
        }
        if let Some(screen) = self.filters.screen_id {
            q = q.bind(screen);
        }
        if let Some(movie) = self.filters.movie_id {
            q = q.bind(movie);
        }
        q
    }

    fn apply_scalar<'q, O>(
        &self,
        mut q: sqlx::query::QueryScalar<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    ) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
        if let Some(screen) = self.scope_screen {
            q = q.bind(screen);
        }
        if let Some(search) = &self.filters.search {
            q = q.bind(format!("%{search}%"));
        }
        if let Some(date) = self.filters.show_date {
            q = q.bind(date);
        }
        if let Some(active) = self.filters.is_active {
            q = q.bind(active);
        }
        if let Some(format) = self.filters.format {
            q = q.bind(format.as_str());
        }
        if let Some(language) = &self.filters.language {
            q = q.bind(language.clone());
        }
        if let Some(theater) = self.filters.theater_id {
            q = q.bind(theater);
        }
        if let Some(screen) = self.filters.screen_id {
            q = q.bind(screen);
        }
        if let Some(movie) = self.filters.movie_id {
            q = q.bind(movie);
        }
        q
    }
}

#[async_trait]
impl ShowtimeRepository for PgRepository {
    async fn create(&self, req: NewShowtime) -> Result<Showtime> {
        let now = Utc::now();
        let showtime = Showtime::new(req, now)?;

        // Row locks cannot cover rows that do not exist yet, so schedule
        // writers for one screen/date are serialized with an advisory lock
        // held for the rest of the transaction.
        let mut tx = self.pool.begin().await?;
        lock_schedule_slot(&mut tx, showtime.screen_id, showtime.show_date).await?;

        let conflict: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM showtimes \
             WHERE screen_id = $1 AND show_date = $2 AND show_time < $4 AND end_time > $3 \
             LIMIT 1",
        )
        .bind(showtime.screen_id)
        .bind(showtime.show_date)
        .bind(showtime.show_time)
        .bind(showtime.end_time)
        .fetch_optional(&mut *tx)
        .await?;
        if conflict.is_some() {
            return Err(Error::Conflict(
                "time slot conflicts with an existing show on this screen".to_string(),
            ));
        }

        let duplicate: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM showtimes \
             WHERE screen_id = $1 AND show_date = $2 AND show_time = $3 LIMIT 1",
        )
        .bind(showtime.screen_id)
        .bind(showtime.show_date)
        .bind(showtime.show_time)
        .fetch_optional(&mut *tx)
        .await?;
        if duplicate.is_some() {
            return Err(Error::Conflict(
                "a show already exists at this exact time on this screen".to_string(),
            ));
        }

        sqlx::query(
            "INSERT INTO showtimes (id, owner_id, movie_id, theater_id, screen_id, show_date, \
                show_time, end_time, format, language, total_seats, available_seats, \
                row_pricing, booked_seats, blocked_seats, is_active, version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)",
        )
        .bind(showtime.id)
        .bind(showtime.owner_id)
        .bind(showtime.movie_id)
        .bind(showtime.theater_id)
        .bind(showtime.screen_id)
        .bind(showtime.show_date)
        .bind(showtime.show_time)
        .bind(showtime.end_time)
        .bind(showtime.format.as_str())
        .bind(&showtime.language)
        .bind(showtime.total_seats as i32)
        .bind(showtime.available_seats as i32)
        .bind(serde_json::to_value(&showtime.row_pricing)?)
        .bind(serde_json::to_value(&showtime.booked_seats)?)
        .bind(serde_json::to_value(&showtime.blocked_seats)?)
        .bind(showtime.is_active)
        .bind(showtime.version as i64)
        .bind(showtime.created_at)
        .bind(showtime.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(showtime)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Showtime> {
        let mut st = self.fetch_raw(id).await?;
        st.purge_expired(Utc::now());
        Ok(st)
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Showtime>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM showtimes WHERE owner_id = $1 ORDER BY show_date, show_time, id"
        );
        let rows = sqlx::query_as::<_, ShowtimeRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        let now = Utc::now();
        rows.into_iter()
            .map(|r| {
                let mut st = r.into_showtime()?;
                st.purge_expired(now);
                Ok(st)
            })
            .collect()
    }

    async fn find_by_movie_and_date(&self, movie_id: Uuid, date: NaiveDate) -> Result<Vec<Showtime>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM showtimes \
             WHERE movie_id = $1 AND show_date = $2 AND is_active = TRUE \
             ORDER BY show_date, show_time, id"
        );
        let rows = sqlx::query_as::<_, ShowtimeRow>(&sql)
            .bind(movie_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        let now = Utc::now();
        rows.into_iter()
            .map(|r| {
                let mut st = r.into_showtime()?;
                st.purge_expired(now);
                Ok(st)
            })
            .collect()
    }

    async fn find_by_theater_and_date(&self, theater_id: Uuid, date: NaiveDate) -> Result<Vec<Showtime>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM showtimes \
             WHERE theater_id = $1 AND show_date = $2 AND is_active = TRUE \
             ORDER BY show_date, show_time, id"
        );
        let rows = sqlx::query_as::<_, ShowtimeRow>(&sql)
            .bind(theater_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        let now = Utc::now();
        rows.into_iter()
            .map(|r| {
                let mut st = r.into_showtime()?;
                st.purge_expired(now);
                Ok(st)
            })
            .collect()
    }

    async fn find_by_screen_and_date(&self, screen_id: Uuid, date: NaiveDate) -> Result<Vec<Showtime>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM showtimes \
             WHERE screen_id = $1 AND show_date = $2 \
             ORDER BY show_date, show_time, id"
        );
        let rows = sqlx::query_as::<_, ShowtimeRow>(&sql)
            .bind(screen_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        let now = Utc::now();
        rows.into_iter()
            .map(|r| {
                let mut st = r.into_showtime()?;
                st.purge_expired(now);
                Ok(st)
            })
            .collect()
    }

    async fn update_by_id(&self, id: Uuid, update: ShowtimeUpdate) -> Result<Showtime> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {COLUMNS} FROM showtimes WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, ShowtimeRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("showtime {id} not found")))?;
        let mut next = row.into_showtime()?;

        let reschedule = update.touches_schedule();
        if let Some(date) = update.show_date {
            next.show_date = date;
        }
        if let Some(start) = update.show_time {
            next.show_time = start;
        }
        if let Some(end) = update.end_time {
            next.end_time = end;
        }
        if let Some(format) = update.format {
            next.format = format;
        }
        if let Some(language) = update.language {
            if language.trim().is_empty() {
                return Err(Error::InvalidRequest("language must not be empty".to_string()));
            }
            next.language = language;
        }

        if reschedule {
            if next.show_time >= next.end_time {
                return Err(Error::InvalidRequest(
                    "showTime must be strictly before endTime".to_string(),
                ));
            }
            lock_schedule_slot(&mut tx, next.screen_id, next.show_date).await?;
            let conflict: Option<Uuid> = sqlx::query_scalar(
                "SELECT id FROM showtimes \
                 WHERE screen_id = $1 AND show_date = $2 AND show_time < $4 AND end_time > $3 \
                   AND id <> $5 \
                 LIMIT 1",
            )
            .bind(next.screen_id)
            .bind(next.show_date)
            .bind(next.show_time)
            .bind(next.end_time)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
            if conflict.is_some() {
                return Err(Error::Conflict(
                    "time slot conflicts with an existing show on this screen".to_string(),
                ));
            }
        }

        next.version += 1;
        next.updated_at = now;
        sqlx::query(
            "UPDATE showtimes SET show_date = $2, show_time = $3, end_time = $4, format = $5, \
                language = $6, version = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(id)
        .bind(next.show_date)
        .bind(next.show_time)
        .bind(next.end_time)
        .bind(next.format.as_str())
        .bind(&next.language)
        .bind(next.version as i64)
        .bind(next.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(next)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let booked: Option<i32> = sqlx::query_scalar(
            "SELECT jsonb_array_length(booked_seats) FROM showtimes WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let booked = booked.ok_or_else(|| Error::NotFound(format!("showtime {id} not found")))?;

        if booked == 0 {
            sqlx::query("DELETE FROM showtimes WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        } else {
            // Bookings still reference this showtime: soft-deactivate only.
            sqlx::query(
                "UPDATE showtimes SET is_active = FALSE, version = version + 1, updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_status(&self, id: Uuid, is_active: bool) -> Result<Showtime> {
        self.mutate(id, |showtime, _| {
            showtime.is_active = is_active;
            Ok(())
        })
        .await
    }

    async fn find_all_paginated(
        &self,
        page: u32,
        limit: u32,
        filters: &ShowtimeFilters,
    ) -> Result<ShowtimePage> {
        self.paginated(None, page, limit, filters).await
    }

    async fn find_by_screen_paginated(
        &self,
        screen_id: Uuid,
        page: u32,
        limit: u32,
        filters: &ShowtimeFilters,
    ) -> Result<ShowtimePage> {
        self.paginated(Some(screen_id), page, limit, filters).await
    }

    async fn check_time_slot_overlap(
        &self,
        screen_id: Uuid,
        show_date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        exclude_id: Option<Uuid>,
    ) -> Result<bool> {
        if start >= end {
            return Err(Error::InvalidRequest(
                "startTime must be strictly before endTime".to_string(),
            ));
        }
        let found = match exclude_id {
            Some(exclude) => {
                sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM showtimes \
                     WHERE screen_id = $1 AND show_date = $2 AND show_time < $4 AND end_time > $3 \
                       AND id <> $5)",
                )
                .bind(screen_id)
                .bind(show_date)
                .bind(start)
                .bind(end)
                .bind(exclude)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM showtimes \
                     WHERE screen_id = $1 AND show_date = $2 AND show_time < $4 AND end_time > $3)",
                )
                .bind(screen_id)
                .bind(show_date)
                .bind(start)
                .bind(end)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(found)
    }

    async fn exists_by_screen_and_time(
        &self,
        screen_id: Uuid,
        show_date: NaiveDate,
        show_time: NaiveTime,
    ) -> Result<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM showtimes \
             WHERE screen_id = $1 AND show_date = $2 AND show_time = $3)",
        )
        .bind(screen_id)
        .bind(show_date)
        .bind(show_time)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn block_seats(
        &self,
        id: Uuid,
        seat_ids: &[String],
        user_id: Uuid,
        session_id: &str,
    ) -> Result<Showtime> {
        self.mutate(id, |showtime, now| {
            blocking::block_seats(showtime, seat_ids, user_id, session_id, now, self.hold)
        })
        .await
    }

    async fn release_seats(
        &self,
        id: Uuid,
        seat_ids: &[String],
        user_id: Uuid,
        session_id: &str,
    ) -> Result<Showtime> {
        self.mutate(id, |showtime, now| {
            blocking::release_seats(showtime, seat_ids, user_id, session_id, now)
        })
        .await
    }

    async fn book_seats(&self, id: Uuid, seat_ids: &[String]) -> Result<Showtime> {
        self.mutate(id, |showtime, now| booking::book_seats(showtime, seat_ids, now))
            .await
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<SweepReport>> {
        let candidates: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM showtimes WHERE jsonb_array_length(blocked_seats) > 0",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut reports = Vec::new();
        for id in candidates {
            // Best-effort per showtime: contention is left for the next pass.
            for _ in 0..=self.max_retries {
                let snapshot = match self.fetch_raw(id).await {
                    Ok(s) => s,
                    Err(Error::NotFound(_)) => break,
                    Err(e) => return Err(e),
                };
                if !snapshot.blocked_seats.iter().any(|b| b.is_expired(now)) {
                    break;
                }
                let mut next = snapshot.clone();
                let purged = next.purge_expired(now);
                next.version += 1;
                next.updated_at = now;
                if self.commit(&next, snapshot.version).await? {
                    reports.push(SweepReport {
                        showtime_id: id,
                        purged_blocks: purged,
                        available_seats: next.available_seats,
                        blocked_seats: next.blocked_seats.len() as u32,
                        booked_seats: next.booked_seats.len() as u32,
                    });
                    break;
                }
            }
        }
        Ok(reports)
    }
}
